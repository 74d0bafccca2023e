//! Backend selection: local plain-HTTP agent or remote AgentCore runtime.

use serde::Serialize;
use tracing::warn;

use amber_core::config::{AwsConfig, BackendConfig, AGENTCORE_SERVICE};
use amber_core::InvokeError;

use crate::signer::{canonical_query, Credentials, Signer};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendMode {
    Local,
    Remote,
}

impl std::fmt::Display for BackendMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendMode::Local => write!(f, "local"),
            BackendMode::Remote => write!(f, "remote"),
        }
    }
}

/// Where invocations go. Resolved once from configuration and shared
/// read-only by every request.
#[derive(Debug, Clone)]
pub enum BackendDescriptor {
    /// Unauthenticated agent, e.g. `http://localhost:8080/invocations`.
    Local { url: String },
    /// AgentCore runtime reached through SigV4-signed requests.
    Remote(RemoteBackend),
}

#[derive(Debug, Clone)]
pub struct RemoteBackend {
    pub runtime_arn: String,
    pub scheme: String,
    /// Authority used both on the request line and in the signed `host` header.
    pub host: String,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub region: String,
    pub service: String,
    /// `None` when credentials are missing; invocations then fail with
    /// `AuthConfigError` before anything is signed.
    pub credentials: Option<Credentials>,
}

impl RemoteBackend {
    pub fn url(&self) -> String {
        let query = canonical_query(&self.query);
        if query.is_empty() {
            format!("{}://{}{}", self.scheme, self.host, self.path)
        } else {
            format!("{}://{}{}?{}", self.scheme, self.host, self.path, query)
        }
    }

    pub fn signer(&self) -> Signer {
        Signer::new(&self.region, &self.service)
    }
}

impl BackendDescriptor {
    /// Map the configuration flag to a backend.
    ///
    /// Remote mode needs a runtime ARN whose 4th `:`-separated field is the
    /// region. Missing credentials do not fail selection: they surface per
    /// invocation as `AuthConfigError`.
    pub fn select(backend: &BackendConfig, aws: &AwsConfig) -> Result<Self, InvokeError> {
        if backend.use_local {
            return Ok(BackendDescriptor::Local {
                url: backend.local_url.clone(),
            });
        }

        let runtime_arn = backend
            .runtime_arn
            .clone()
            .ok_or_else(|| InvokeError::Config("AGENT_RUNTIME_ARN not set".into()))?;
        let region = region_from_runtime_arn(&runtime_arn)
            .ok_or_else(|| {
                InvokeError::Config(format!(
                    "cannot derive region from runtime ARN '{}'",
                    runtime_arn
                ))
            })?
            .to_string();

        let (scheme, host) = match &aws.endpoint_url {
            Some(endpoint) => endpoint_authority(endpoint)?,
            None => (
                "https".to_string(),
                format!("{}.{}.amazonaws.com", AGENTCORE_SERVICE, region),
            ),
        };

        let credentials = match Credentials::from_config(aws) {
            Ok(credentials) => Some(credentials),
            Err(e) => {
                warn!("{}; remote invocations will be rejected", e);
                None
            }
        };

        let query = backend
            .qualifier
            .iter()
            .map(|q| ("qualifier".to_string(), q.clone()))
            .collect();

        Ok(BackendDescriptor::Remote(RemoteBackend {
            path: runtime_invocation_path(&runtime_arn),
            runtime_arn,
            scheme,
            host,
            query,
            region,
            service: AGENTCORE_SERVICE.to_string(),
            credentials,
        }))
    }

    pub fn mode(&self) -> BackendMode {
        match self {
            BackendDescriptor::Local { .. } => BackendMode::Local,
            BackendDescriptor::Remote(_) => BackendMode::Remote,
        }
    }

    /// Full target URL, for logs and the request line.
    pub fn url(&self) -> String {
        match self {
            BackendDescriptor::Local { url } => url.clone(),
            BackendDescriptor::Remote(remote) => remote.url(),
        }
    }
}

/// Region is the 4th `:` field of `arn:aws:bedrock-agentcore:<region>:<account>:runtime/<id>`.
pub fn region_from_runtime_arn(arn: &str) -> Option<&str> {
    arn.split(':').nth(3).filter(|region| !region.is_empty())
}

pub fn runtime_invocation_path(runtime_arn: &str) -> String {
    format!(
        "/runtimes/{}/invocations",
        urlencoding::encode(runtime_arn)
    )
}

fn endpoint_authority(endpoint: &str) -> Result<(String, String), InvokeError> {
    let parsed = url::Url::parse(endpoint).map_err(|e| {
        InvokeError::Config(format!("invalid AWS_ENDPOINT_URL '{}': {}", endpoint, e))
    })?;
    let host = parsed
        .host_str()
        .ok_or_else(|| InvokeError::Config(format!("AWS_ENDPOINT_URL '{}' has no host", endpoint)))?;
    let authority = match parsed.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    };
    Ok((parsed.scheme().to_string(), authority))
}
