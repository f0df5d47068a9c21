use super::ContentGenerator;
use super::types::{
    BootstrapRequest, ExerciseRequest, GeneratedExercise, NewWordRequest, NewWordResponse,
    WordLevelRequest, WordLevelResponse,
};
use crate::config::GeneratorConfig;
use crate::language::Language;

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::time::Duration;

pub const ENDPOINT_EXERCISE: &str = "/exercise";
pub const ENDPOINT_WORD_LEVEL: &str = "/word_level";
pub const ENDPOINT_NEW_WORD: &str = "/new_word";
pub const ENDPOINT_BOOTSTRAP: &str = "/bootstrap";

/// Talks to a generation service that accepts and returns JSON documents.
pub struct HttpContentGenerator {
    http_client: reqwest::Client,
    base_url: String,
    timeout: Duration,
    attempts: usize,
}

impl HttpContentGenerator {
    pub fn new(base_url: &str, config: &GeneratorConfig) -> Self {
        Self {
            http_client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout: config.timeout(),
            attempts: config.attempts.max(1),
        }
    }

    /// POSTs `payload` with jittered exponential backoff on transport errors.
    /// Non-success statuses are returned to the caller, not retried.
    async fn post_with_retry<T: Serialize>(&self, url: String, payload: &T) -> Result<reqwest::Response> {
        let mut delay_ms = 150u64;

        for attempt in 0..self.attempts {
            let response = self
                .http_client
                .post(url.clone())
                .json(payload)
                .timeout(self.timeout)
                .send()
                .await;

            match response {
                Ok(resp) => return Ok(resp),
                Err(e) => {
                    if attempt + 1 == self.attempts {
                        return Err(anyhow!(e));
                    }
                    tracing::warn!(
                        "Generator request to {} failed (attempt {}): {}",
                        url,
                        attempt + 1,
                        e
                    );
                    let jitter = rand::random::<u64>() % 50;
                    tokio::time::sleep(Duration::from_millis(delay_ms + jitter)).await;
                    delay_ms = (delay_ms * 2).min(1200);
                }
            }
        }

        Err(anyhow!("Retry attempts exhausted"))
    }

    async fn call<T: Serialize, R: DeserializeOwned>(&self, endpoint: &str, payload: &T) -> Result<R> {
        let url = format!("{}{}", self.base_url, endpoint);
        let response = self.post_with_retry(url, payload).await?;

        if !response.status().is_success() {
            return Err(anyhow!("{} failed {}", endpoint, response.status()));
        }

        response
            .json::<R>()
            .await
            .with_context(|| format!("malformed response from {endpoint}"))
    }
}

#[async_trait]
impl ContentGenerator for HttpContentGenerator {
    async fn generate_exercise(&self, request: &ExerciseRequest) -> Result<GeneratedExercise> {
        self.call(ENDPOINT_EXERCISE, request).await
    }

    async fn estimate_word_level(&self, word: &str, language: Language) -> Result<i64> {
        let payload = WordLevelRequest {
            word: word.to_string(),
            language,
        };
        let response: WordLevelResponse = self.call(ENDPOINT_WORD_LEVEL, &payload).await?;
        Ok(response.level)
    }

    async fn suggest_new_word(&self, language: Language, existing: &[String]) -> Result<String> {
        let payload = NewWordRequest {
            language,
            existing_vocabulary: existing.to_vec(),
        };
        let response: NewWordResponse = self.call(ENDPOINT_NEW_WORD, &payload).await?;
        Ok(response.word)
    }

    async fn bootstrap_vocabulary(&self, language: Language) -> Result<HashMap<String, Vec<String>>> {
        self.call(ENDPOINT_BOOTSTRAP, &BootstrapRequest { language })
            .await
    }
}
