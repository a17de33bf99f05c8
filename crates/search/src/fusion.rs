//! Reciprocal Rank Fusion of the vector and lexical recall streams.

use std::collections::HashMap;

/// One entry of a recall stream, best first.
#[derive(Debug, Clone)]
pub struct RankedChunk {
    pub chunk_id: String,
    pub relative_path: String,
    pub chunk_index: usize,
}

/// A chunk surviving fusion, with the ranks that produced its score.
#[derive(Debug, Clone)]
pub struct FusedCandidate {
    pub chunk_id: String,
    pub relative_path: String,
    pub chunk_index: usize,
    pub score: f32,
    /// 1-based rank in the vector list, if present there.
    pub vector_rank: Option<usize>,
    /// 1-based rank in the lexical list, if present there.
    pub lexical_rank: Option<usize>,
}

/// `rrf(chunk) = w_vec / (k0 + rank_vec) + w_lex / (k0 + rank_lex)`, with an
/// absent list contributing zero. Ties break on better vector rank, then
/// lexicographic chunk id, so output is deterministic given its inputs.
pub fn fuse(
    vector_list: &[RankedChunk],
    lexical_list: &[RankedChunk],
    k0: f32,
    weight_vector: f32,
    weight_lexical: f32,
    top_m: usize,
) -> Vec<FusedCandidate> {
    let mut by_id: HashMap<&str, FusedCandidate> = HashMap::new();

    for (rank0, entry) in vector_list.iter().enumerate() {
        let rank = rank0 + 1;
        let candidate = by_id
            .entry(entry.chunk_id.as_str())
            .or_insert_with(|| FusedCandidate {
                chunk_id: entry.chunk_id.clone(),
                relative_path: entry.relative_path.clone(),
                chunk_index: entry.chunk_index,
                score: 0.0,
                vector_rank: None,
                lexical_rank: None,
            });
        candidate.vector_rank = Some(rank);
        candidate.score += weight_vector / (k0 + rank as f32);
    }

    for (rank0, entry) in lexical_list.iter().enumerate() {
        let rank = rank0 + 1;
        let candidate = by_id
            .entry(entry.chunk_id.as_str())
            .or_insert_with(|| FusedCandidate {
                chunk_id: entry.chunk_id.clone(),
                relative_path: entry.relative_path.clone(),
                chunk_index: entry.chunk_index,
                score: 0.0,
                vector_rank: None,
                lexical_rank: None,
            });
        candidate.lexical_rank = Some(rank);
        candidate.score += weight_lexical / (k0 + rank as f32);
    }

    let mut fused: Vec<FusedCandidate> = by_id.into_values().collect();
    fused.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| {
                a.vector_rank
                    .unwrap_or(usize::MAX)
                    .cmp(&b.vector_rank.unwrap_or(usize::MAX))
            })
            .then_with(|| a.chunk_id.cmp(&b.chunk_id))
    });
    fused.truncate(top_m);
    fused
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ranked(id: &str) -> RankedChunk {
        RankedChunk {
            chunk_id: id.to_string(),
            relative_path: format!("{id}.rs"),
            chunk_index: 0,
        }
    }

    #[test]
    fn test_chunk_in_both_lists_wins() {
        let vector = vec![ranked("a"), ranked("b")];
        let lexical = vec![ranked("b"), ranked("c")];

        let fused = fuse(&vector, &lexical, 60.0, 1.0, 0.5, 10);
        assert_eq!(fused[0].chunk_id, "b");
        assert_eq!(fused[0].vector_rank, Some(2));
        assert_eq!(fused[0].lexical_rank, Some(1));

        let expected = 1.0 / 62.0 + 0.5 / 61.0;
        assert!((fused[0].score - expected).abs() < 1e-6);
    }

    #[test]
    fn test_absent_list_contributes_zero() {
        let vector = vec![ranked("a")];
        let fused = fuse(&vector, &[], 60.0, 1.0, 0.5, 10);
        assert_eq!(fused.len(), 1);
        assert!((fused[0].score - 1.0 / 61.0).abs() < 1e-6);
        assert_eq!(fused[0].lexical_rank, None);
    }

    #[test]
    fn test_ties_break_on_vector_rank_then_id() {
        // Two chunks only in the lexical list at symmetric positions would
        // tie; give them equal scores through identical ranks in separate
        // streams instead.
        let vector = vec![ranked("x")];
        let lexical = vec![ranked("y")];
        let fused = fuse(&vector, &lexical, 60.0, 1.0, 1.0, 10);
        // Equal score (1/61): the one with a vector rank sorts first.
        assert_eq!(fused[0].chunk_id, "x");
        assert_eq!(fused[1].chunk_id, "y");
    }

    #[test]
    fn test_deterministic_output() {
        let vector = vec![ranked("a"), ranked("b"), ranked("c")];
        let lexical = vec![ranked("c"), ranked("a")];
        let once = fuse(&vector, &lexical, 60.0, 1.0, 0.5, 10);
        let twice = fuse(&vector, &lexical, 60.0, 1.0, 0.5, 10);
        let ids = |list: &[FusedCandidate]| -> Vec<String> {
            list.iter().map(|c| c.chunk_id.clone()).collect::<Vec<_>>()
        };
        assert_eq!(ids(&once), ids(&twice));
    }

    #[test]
    fn test_top_m_truncation() {
        let vector: Vec<RankedChunk> = (0..10).map(|i| ranked(&format!("c{i}"))).collect();
        let fused = fuse(&vector, &[], 60.0, 1.0, 0.5, 3);
        assert_eq!(fused.len(), 3);
        assert_eq!(fused[0].chunk_id, "c0");
    }
}
