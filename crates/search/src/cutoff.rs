//! Smart-TopK: score-adaptive seed cutoff.

use weaver_protocol::SearchConfig;

/// Given reranked scores in descending order, return how many chunks
/// survive as seeds.
///
/// - Dynamic threshold: `s1 * smart_top_score_ratio`, recomputed from `s2`
///   when `s2 < s1 * delta_guard_ratio` (a lone outlier top hit must not
///   collapse recall).
/// - Safe harbor: the first `smart_min_k` chunks only need to clear the
///   absolute floor.
/// - Hard cap at `smart_max_k`.
pub fn smart_top_k(scores: &[f32], config: &SearchConfig) -> usize {
    if scores.is_empty() {
        return 0;
    }

    let s1 = scores[0];
    let anchor = match scores.get(1) {
        Some(&s2) if s2 < s1 * config.delta_guard_ratio => s2,
        _ => s1,
    };
    let tau_dyn = anchor * config.smart_top_score_ratio;
    let tau_abs = config.smart_min_score;
    let threshold = tau_dyn.max(tau_abs);

    let mut k = 0;
    for (i, &score) in scores.iter().enumerate() {
        if i >= config.smart_max_k {
            break;
        }
        let passes = if i < config.smart_min_k {
            score >= tau_abs
        } else {
            score >= threshold
        };
        if !passes {
            break;
        }
        k += 1;
    }
    k
}
