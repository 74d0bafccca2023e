//! The outbound request for one invocation: target URL, headers and the exact
//! body bytes that were (for remote backends) signed.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};

use amber_core::InvokeError;

use crate::backend::BackendDescriptor;
use crate::signer::SigningRequest;

/// Correlates every request and log line of one conversation on AgentCore.
pub const SESSION_ID_HEADER: &str = "x-amzn-bedrock-agentcore-runtime-session-id";

/// Built immediately before sending and never reused: remote signatures are
/// bound to both the body bytes and the signing time.
#[derive(Debug)]
pub struct RequestEnvelope {
    url: String,
    headers: Vec<(String, String)>,
    body: Bytes,
    payload_hash: Option<String>,
}

impl RequestEnvelope {
    /// Build the request for `backend`, signing `body` at `timestamp` in remote mode.
    pub fn build(
        backend: &BackendDescriptor,
        body: Bytes,
        session_id: &str,
        timestamp: DateTime<Utc>,
    ) -> Result<Self, InvokeError> {
        let mut headers = vec![("content-type".to_string(), "application/json".to_string())];

        match backend {
            BackendDescriptor::Local { url } => Ok(Self {
                url: url.clone(),
                headers,
                body,
                payload_hash: None,
            }),
            BackendDescriptor::Remote(remote) => {
                headers.push((SESSION_ID_HEADER.to_string(), session_id.to_string()));
                let signed = remote.signer().sign(
                    &SigningRequest {
                        method: "POST",
                        host: &remote.host,
                        path: &remote.path,
                        query: &remote.query,
                        headers: &headers,
                        body: &body,
                    },
                    remote.credentials.as_ref(),
                    timestamp,
                )?;
                Ok(Self {
                    url: remote.url(),
                    headers: signed.headers,
                    body,
                    payload_hash: Some(signed.payload_hash),
                })
            }
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// SHA-256 of the signed payload; `None` for unsigned (local) requests.
    pub fn payload_hash(&self) -> Option<&str> {
        self.payload_hash.as_deref()
    }

    pub fn is_signed(&self) -> bool {
        self.payload_hash.is_some()
    }

    pub fn header_map(&self) -> Result<HeaderMap, InvokeError> {
        let mut map = HeaderMap::with_capacity(self.headers.len());
        for (name, value) in &self.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| InvokeError::Config(format!("invalid header name {}: {}", name, e)))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| InvokeError::Config(format!("invalid value for {}: {}", name, e)))?;
            map.insert(name, value);
        }
        Ok(map)
    }
}
