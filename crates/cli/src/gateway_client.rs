//! HTTP client for the invocation gateway.

use std::pin::Pin;

use anyhow::{bail, Context, Result};
use bytes::Bytes;
use futures::Stream;
use serde::Deserialize;

use amber_stream::EventStream;

pub type ByteStream = Pin<Box<dyn Stream<Item = reqwest::Result<Bytes>> + Send>>;

pub struct GatewayClient {
    base_url: String,
    http: reqwest::Client,
}

/// Error body the gateway answers with before streaming starts.
#[derive(Debug, Deserialize)]
struct GatewayError {
    error: String,
    #[serde(default)]
    details: Option<String>,
    #[serde(default)]
    cause: Option<String>,
    #[serde(rename = "type", default)]
    kind: Option<String>,
}

impl GatewayError {
    fn describe(&self) -> String {
        let mut out = match &self.kind {
            Some(kind) => format!("{} ({})", self.error, kind),
            None => self.error.clone(),
        };
        if let Some(details) = &self.details {
            out.push_str(&format!(": {}", details));
        }
        if let Some(cause) = &self.cause {
            out.push_str(&format!(" [cause: {}]", cause));
        }
        out
    }
}

impl GatewayClient {
    pub fn new(base_url: &str) -> Self {
        let base_url = base_url.trim_end_matches('/').to_string();
        Self {
            base_url,
            http: reqwest::Client::new(),
        }
    }

    pub fn invoke_url(&self) -> String {
        format!("{}/api/invoke-agent", self.base_url)
    }

    /// Post `query` and decode the relayed stream as it arrives.
    pub async fn invoke(&self, query: &str) -> Result<EventStream<ByteStream>> {
        let url = self.invoke_url();
        let resp = self
            .http
            .post(&url)
            .json(&serde_json::json!({ "query": query }))
            .send()
            .await
            .with_context(|| format!("gateway not reachable at {}", self.base_url))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            match serde_json::from_str::<GatewayError>(&body) {
                Ok(err) => bail!("gateway returned {}: {}", status, err.describe()),
                Err(_) => bail!("gateway returned {}: {}", status, body),
            }
        }

        let bytes: ByteStream = Box::pin(resp.bytes_stream());
        Ok(EventStream::new(bytes))
    }
}
