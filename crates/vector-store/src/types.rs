use serde::{Deserialize, Serialize};
use weaver_code_chunker::Chunk;

/// A chunk plus its embedding vector, as stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkRecord {
    pub chunk: Chunk,
    pub vector: Vec<f32>,
}

impl ChunkRecord {
    pub fn chunk_id(&self) -> String {
        self.chunk.chunk_id()
    }
}

/// A search result with its similarity score.
#[derive(Debug, Clone)]
pub struct VectorHit {
    pub record: ChunkRecord,
    pub score: f32,
}

/// Scale a vector to unit length in place. Zero vectors are left unchanged.
pub fn normalize_in_place(vector: &mut [f32]) {
    let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        for value in vector {
            *value /= norm;
        }
    }
}

pub(crate) fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize() {
        let mut v = vec![3.0, 4.0];
        normalize_in_place(&mut v);
        assert!((v[0] - 0.6).abs() < 1e-6);
        assert!((v[1] - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_normalize_zero_vector_is_noop() {
        let mut v = vec![0.0, 0.0];
        normalize_in_place(&mut v);
        assert_eq!(v, vec![0.0, 0.0]);
    }
}
