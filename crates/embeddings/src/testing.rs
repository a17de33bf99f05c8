//! Deterministic in-process contract implementations for tests.
//!
//! Nothing here touches the network; vectors and scores are pure functions
//! of their inputs, so indexing and search flows stay byte-reproducible in
//! test suites across the workspace.

use crate::error::{EmbeddingError, Result};
use crate::progress::{ProgressEvent, ProgressSender};
use crate::{Embedder, Reranker};
use async_trait::async_trait;

fn fnv1a64(bytes: &[u8]) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in bytes {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    hash
}

/// Token-hash embedder: every token bumps one dimension, vectors are
/// normalized. Similar texts get similar vectors, which is enough to drive
/// recall in tests.
pub struct FakeEmbedder {
    dimension: usize,
}

impl FakeEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
        }
    }

    fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0_f32; self.dimension];
        for token in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let slot = (fnv1a64(token.to_lowercase().as_bytes()) % self.dimension as u64) as usize;
            vector[slot] += 1.0;
        }
        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for value in &mut vector {
                *value /= norm;
            }
        }
        vector
    }
}

#[async_trait]
impl Embedder for FakeEmbedder {
    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed_batch(
        &self,
        texts: &[String],
        progress: Option<ProgressSender>,
    ) -> Result<Vec<Vec<f32>>> {
        let vectors = texts.iter().map(|t| self.embed_one(t)).collect();
        if let Some(sender) = progress {
            let _ = sender.send(ProgressEvent {
                batches_done: 1,
                batches_total: 1,
                texts_done: texts.len(),
                texts_total: texts.len(),
            });
        }
        Ok(vectors)
    }
}

/// Token-overlap reranker: the score of a passage is the fraction of query
/// tokens it contains.
pub struct FakeReranker;

#[async_trait]
impl Reranker for FakeReranker {
    async fn rerank(&self, query: &str, passages: &[String], _top_n: usize) -> Result<Vec<f32>> {
        let query_tokens: Vec<String> = query
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
            .map(str::to_lowercase)
            .collect();
        let denominator = query_tokens.len().max(1) as f32;

        Ok(passages
            .iter()
            .map(|passage| {
                let haystack = passage.to_lowercase();
                let hits = query_tokens
                    .iter()
                    .filter(|token| haystack.contains(token.as_str()))
                    .count();
                hits as f32 / denominator
            })
            .collect())
    }
}

/// Reranker that always fails, for exercising the fusion-order fallback.
pub struct FailingReranker;

#[async_trait]
impl Reranker for FailingReranker {
    async fn rerank(&self, _query: &str, _passages: &[String], _top_n: usize) -> Result<Vec<f32>> {
        Err(EmbeddingError::Rerank("rerank endpoint unavailable".into()))
    }
}

/// Reranker returning a fixed score list regardless of input, for driving
/// cutoff edge cases.
pub struct ScriptedReranker {
    pub scores: Vec<f32>,
}

#[async_trait]
impl Reranker for ScriptedReranker {
    async fn rerank(&self, _query: &str, passages: &[String], _top_n: usize) -> Result<Vec<f32>> {
        Ok((0..passages.len())
            .map(|i| self.scores.get(i).copied().unwrap_or(0.0))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fake_embedder_is_deterministic() {
        let embedder = FakeEmbedder::new(64);
        let texts = vec!["fn login() {}".to_string()];
        let a = embedder.embed_batch(&texts, None).await.unwrap();
        let b = embedder.embed_batch(&texts, None).await.unwrap();
        assert_eq!(a, b);
        assert_eq!(a[0].len(), 64);
    }

    #[tokio::test]
    async fn test_similar_texts_score_higher() {
        let embedder = FakeEmbedder::new(128);
        let texts = vec![
            "user login session auth".to_string(),
            "matrix multiply kernel".to_string(),
            "login".to_string(),
        ];
        let vectors = embedder.embed_batch(&texts, None).await.unwrap();
        let dot = |a: &[f32], b: &[f32]| a.iter().zip(b).map(|(x, y)| x * y).sum::<f32>();

        assert!(dot(&vectors[0], &vectors[2]) > dot(&vectors[1], &vectors[2]));
    }

    #[tokio::test]
    async fn test_fake_reranker_scores_overlap() {
        let passages = vec!["login handler".to_string(), "unrelated".to_string()];
        let scores = FakeReranker
            .rerank("login flow", &passages, 10)
            .await
            .unwrap();
        assert!(scores[0] > scores[1]);
    }
}
