use crate::error::{EmbeddingError, Result};
use crate::Reranker;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use weaver_protocol::RerankConfig;

/// HTTP client for the cross-encoder rerank endpoint.
pub struct HttpReranker {
    client: reqwest::Client,
    config: RerankConfig,
}

impl HttpReranker {
    pub fn new(config: RerankConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| EmbeddingError::Http(e.to_string()))?;
        Ok(Self { client, config })
    }
}

#[derive(Serialize)]
struct RerankRequest<'a> {
    model: &'a str,
    query: &'a str,
    documents: &'a [String],
    top_n: usize,
}

#[derive(Deserialize)]
struct RerankResponse {
    results: Vec<RerankResult>,
}

#[derive(Deserialize)]
struct RerankResult {
    index: usize,
    relevance_score: f32,
}

#[async_trait]
impl Reranker for HttpReranker {
    async fn rerank(&self, query: &str, passages: &[String], top_n: usize) -> Result<Vec<f32>> {
        if passages.is_empty() {
            return Ok(Vec::new());
        }

        let url = format!("{}/rerank", self.config.base_url.trim_end_matches('/'));
        let request = RerankRequest {
            model: &self.config.model,
            query,
            documents: passages,
            top_n,
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| EmbeddingError::Rerank(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EmbeddingError::Rerank(format!("HTTP {status}: {body}")));
        }

        let parsed: RerankResponse = response
            .json()
            .await
            .map_err(|e| EmbeddingError::Rerank(format!("invalid rerank response: {e}")))?;

        // Passages outside the returned top_n keep a zero score.
        let mut scores = vec![0.0; passages.len()];
        for result in parsed.results {
            if let Some(slot) = scores.get_mut(result.index) {
                *slot = result.relevance_score;
            }
        }
        Ok(scores)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_shape() {
        let documents = vec!["doc a".to_string(), "doc b".to_string()];
        let request = RerankRequest {
            model: "rerank-1",
            query: "login flow",
            documents: &documents,
            top_n: 2,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["query"], "login flow");
        assert_eq!(json["top_n"], 2);
        assert_eq!(json["documents"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_missing_indexes_score_zero() {
        let raw = r#"{"results":[{"index":1,"relevance_score":0.9}]}"#;
        let parsed: RerankResponse = serde_json::from_str(raw).unwrap();
        let mut scores = vec![0.0_f32; 3];
        for result in parsed.results {
            if let Some(slot) = scores.get_mut(result.index) {
                *slot = result.relevance_score;
            }
        }
        assert_eq!(scores, vec![0.0, 0.9, 0.0]);
    }
}
