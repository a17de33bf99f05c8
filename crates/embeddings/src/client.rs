use crate::error::{EmbeddingError, Result};
use crate::progress::{ProgressEvent, ProgressSender};
use crate::rate_limit::RateController;
use crate::Embedder;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use weaver_protocol::EmbeddingConfig;

const NETWORK_RETRIES: u32 = 3;
const NETWORK_RETRY_BASE: Duration = Duration::from_secs(1);

/// HTTP client for the embedding endpoint.
///
/// Splits input into API batches, runs them concurrently under the rate
/// controller, and reassembles vectors in input order.
pub struct HttpEmbedder {
    client: reqwest::Client,
    config: Arc<EmbeddingConfig>,
    controller: Arc<RateController>,
}

impl HttpEmbedder {
    pub fn new(config: EmbeddingConfig) -> Result<Self> {
        let controller = Arc::new(RateController::new(config.max_concurrency));
        Self::with_controller(config, controller)
    }

    /// Build with an externally owned controller, letting several clients of
    /// the same endpoint share one rate-limit state.
    pub fn with_controller(
        config: EmbeddingConfig,
        controller: Arc<RateController>,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| EmbeddingError::Http(e.to_string()))?;

        Ok(Self {
            client,
            config: Arc::new(config),
            controller,
        })
    }
}

#[async_trait]
impl Embedder for HttpEmbedder {
    fn dimension(&self) -> usize {
        self.config.dimensions
    }

    async fn embed_batch(
        &self,
        texts: &[String],
        progress: Option<ProgressSender>,
    ) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let batch_size = self.config.batch_size.max(1);
        let batches: Vec<Vec<String>> = texts.chunks(batch_size).map(<[String]>::to_vec).collect();
        let batches_total = batches.len();
        let texts_total = texts.len();

        let mut join_set = JoinSet::new();
        for (batch_index, batch) in batches.into_iter().enumerate() {
            let client = self.client.clone();
            let config = Arc::clone(&self.config);
            let controller = Arc::clone(&self.controller);
            join_set.spawn(async move {
                let vectors = run_batch(client, config, controller, &batch).await;
                (batch_index, batch.len(), vectors)
            });
        }

        let mut slots: Vec<Option<Vec<Vec<f32>>>> = vec![None; batches_total];
        let mut batches_done = 0;
        let mut texts_done = 0;

        while let Some(joined) = join_set.join_next().await {
            let (batch_index, batch_len, vectors) =
                joined.map_err(|e| EmbeddingError::Http(format!("embedding task failed: {e}")))?;
            let vectors = vectors?;
            slots[batch_index] = Some(vectors);

            batches_done += 1;
            texts_done += batch_len;
            if let Some(sender) = &progress {
                let _ = sender.send(ProgressEvent {
                    batches_done,
                    batches_total,
                    texts_done,
                    texts_total,
                });
            }
        }

        let mut out = Vec::with_capacity(texts_total);
        for slot in slots {
            out.extend(slot.ok_or_else(|| {
                EmbeddingError::Http("embedding batch produced no result".to_string())
            })?);
        }
        Ok(out)
    }
}

/// One API batch: acquire a slot, post, and classify failures into the
/// retry pathways.
async fn run_batch(
    client: reqwest::Client,
    config: Arc<EmbeddingConfig>,
    controller: Arc<RateController>,
    batch: &[String],
) -> Result<Vec<Vec<f32>>> {
    let mut network_attempts: u32 = 0;

    loop {
        let permit = controller.acquire().await;
        match post_embeddings(&client, &config, batch).await {
            Ok(vectors) => {
                controller.note_success();
                for vector in &vectors {
                    if vector.len() != config.dimensions {
                        return Err(EmbeddingError::Dimension {
                            expected: config.dimensions,
                            actual: vector.len(),
                        });
                    }
                }
                return Ok(vectors);
            }
            Err(Classified::RateLimited(msg)) => {
                drop(permit);
                log::debug!("rate limited: {msg}");
                controller.pause_and_wait().await;
            }
            Err(Classified::Network(msg)) => {
                drop(permit);
                network_attempts += 1;
                if network_attempts > NETWORK_RETRIES {
                    return Err(EmbeddingError::Network(msg));
                }
                let delay = NETWORK_RETRY_BASE * 2u32.saturating_pow(network_attempts - 1);
                log::debug!("network error ({msg}); retry {network_attempts} in {delay:?}");
                tokio::time::sleep(delay).await;
            }
            Err(Classified::Permanent(msg)) => {
                return Err(EmbeddingError::Endpoint(msg));
            }
        }
    }
}

enum Classified {
    RateLimited(String),
    Network(String),
    Permanent(String),
}

fn classify_transport(e: &reqwest::Error) -> Classified {
    if e.is_timeout() || e.is_connect() || e.is_request() {
        Classified::Network(e.to_string())
    } else {
        Classified::Permanent(e.to_string())
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
    encoding_format: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    index: usize,
    embedding: Vec<f32>,
}

async fn post_embeddings(
    client: &reqwest::Client,
    config: &EmbeddingConfig,
    batch: &[String],
) -> std::result::Result<Vec<Vec<f32>>, Classified> {
    let url = format!("{}/embeddings", config.base_url.trim_end_matches('/'));
    let request = EmbeddingRequest {
        model: &config.model,
        input: batch,
        encoding_format: "float",
    };

    let response = client
        .post(&url)
        .bearer_auth(&config.api_key)
        .json(&request)
        .send()
        .await
        .map_err(|e| classify_transport(&e))?;

    let status = response.status();
    if status.as_u16() == 429 {
        return Err(Classified::RateLimited("HTTP 429".to_string()));
    }
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        if status.is_server_error() && body.to_lowercase().contains("rate") {
            return Err(Classified::RateLimited(format!("HTTP {status}: {body}")));
        }
        return Err(Classified::Permanent(format!("HTTP {status}: {body}")));
    }

    let parsed: EmbeddingResponse = response
        .json()
        .await
        .map_err(|e| Classified::Permanent(format!("invalid embedding response: {e}")))?;

    if parsed.data.len() != batch.len() {
        return Err(Classified::Permanent(format!(
            "embedding response covered {} of {} inputs",
            parsed.data.len(),
            batch.len()
        )));
    }

    let mut indexed: Vec<(usize, Vec<f32>)> = parsed
        .data
        .into_iter()
        .map(|d| (d.index, d.embedding))
        .collect();
    indexed.sort_by_key(|(index, _)| *index);
    Ok(indexed.into_iter().map(|(_, v)| v).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_serializes_to_endpoint_shape() {
        let input = vec!["fn main() {}".to_string()];
        let request = EmbeddingRequest {
            model: "text-embedding-3-small",
            input: &input,
            encoding_format: "float",
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model"], "text-embedding-3-small");
        assert_eq!(json["encoding_format"], "float");
        assert_eq!(json["input"][0], "fn main() {}");
    }

    #[test]
    fn test_response_vectors_sorted_by_index() {
        let raw = r#"{"data":[{"index":1,"embedding":[2.0]},{"index":0,"embedding":[1.0]}]}"#;
        let parsed: EmbeddingResponse = serde_json::from_str(raw).unwrap();
        let mut indexed: Vec<(usize, Vec<f32>)> = parsed
            .data
            .into_iter()
            .map(|d| (d.index, d.embedding))
            .collect();
        indexed.sort_by_key(|(index, _)| *index);
        assert_eq!(indexed[0].1, vec![1.0]);
        assert_eq!(indexed[1].1, vec![2.0]);
    }

    #[tokio::test]
    async fn test_empty_input_short_circuits() {
        let embedder = HttpEmbedder::new(EmbeddingConfig::default()).unwrap();
        let vectors = embedder.embed_batch(&[], None).await.unwrap();
        assert!(vectors.is_empty());
    }
}
