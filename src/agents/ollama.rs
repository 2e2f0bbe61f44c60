//! Minimal Ollama text-generation client

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;
use url::Url;

use crate::error::{Error, Result};

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
}

pub struct OllamaClient {
    client: reqwest::Client,
    generate_url: Url,
    model: String,
}

impl OllamaClient {
    pub fn new(endpoint: &str, model: &str, timeout: Duration) -> Result<Self> {
        let invalid = |reason: String| Error::InvalidUrl {
            url: endpoint.to_string(),
            reason,
        };

        // append to the endpoint path instead of replacing its last segment
        let mut generate_url = Url::parse(endpoint).map_err(|e| invalid(e.to_string()))?;
        generate_url
            .path_segments_mut()
            .map_err(|_| invalid("cannot be a base".to_string()))?
            .pop_if_empty()
            .extend(["api", "generate"]);

        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            generate_url,
            model: model.to_string(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Run a single non-streaming completion
    pub async fn generate(&self, prompt: &str) -> Result<String> {
        debug!(model = %self.model, "Requesting completion ({} chars)", prompt.len());

        let resp = self
            .client
            .post(self.generate_url.clone())
            .json(&GenerateRequest {
                model: &self.model,
                prompt,
                stream: false,
            })
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(Error::HttpStatus {
                status: status.as_u16(),
                endpoint: self.generate_url.path().to_string(),
            });
        }

        let body: GenerateResponse = resp.json().await?;
        Ok(body.response.trim().to_string())
    }
}
