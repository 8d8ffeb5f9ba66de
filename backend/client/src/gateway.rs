use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::json;
use tracing::debug;

use signshuffle_core::{ExtractRequest, LetterCount};

/// The two remote operations an upload depends on.
#[async_trait]
pub trait AnagramGateway: Send + Sync {
    /// `Ok(None)` when the image holds no text.
    async fn extract_letters(&self, request: &ExtractRequest) -> Result<Option<LetterCount>>;

    async fn generate_sentences(&self, letters: &LetterCount) -> Result<Vec<String>>;
}

/// [`AnagramGateway`] over HTTP against a running signshuffle gateway.
pub struct HttpGateway {
    client: Client,
    base_url: String,
}

impl HttpGateway {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl AnagramGateway for HttpGateway {
    async fn extract_letters(&self, request: &ExtractRequest) -> Result<Option<LetterCount>> {
        let url = format!("{}/api/get-letters", self.base_url);
        debug!(%url, filetype = %request.filetype, "Requesting letters");

        let response = self
            .client
            .post(&url)
            .json(request)
            .send()
            .await
            .context("Letter extraction request failed")?;

        let status = response.status();
        let body = response
            .text()
            .await
            .context("Failed to read letter extraction response")?;
        if status != StatusCode::OK {
            anyhow::bail!("Letter extraction returned {}: {}", status, body);
        }
        if body.trim().is_empty() {
            return Ok(None);
        }

        let letters: LetterCount =
            serde_json::from_str(&body).context("Failed to parse letter mapping")?;
        Ok(Some(letters))
    }

    async fn generate_sentences(&self, letters: &LetterCount) -> Result<Vec<String>> {
        let url = format!("{}/api/get-sentences", self.base_url);
        debug!(%url, letters = %letters, "Requesting sentences");

        let response = self
            .client
            .post(&url)
            .json(&json!({ "letters": letters }))
            .send()
            .await
            .context("Sentence generation request failed")?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Sentence generation returned {}: {}", status, body);
        }

        response
            .json()
            .await
            .context("Failed to parse sentence list")
    }
}
