use std::env;

use serde::{Deserialize, Serialize};

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

/// Read a profiled env var: tries {PROFILE}_{KEY} first, falls back to {KEY}.
fn profiled_env_opt(profile: &str, key: &str) -> Option<String> {
    if !profile.is_empty() {
        let prefixed = format!("{}_{}", profile, key);
        if let Some(v) = env_opt(&prefixed) {
            return Some(v);
        }
    }
    env_opt(key)
}

fn profiled_env_or(profile: &str, key: &str, default: &str) -> String {
    profiled_env_opt(profile, key).unwrap_or_else(|| default.to_string())
}

fn profiled_env_u16(profile: &str, key: &str, default: u16) -> u16 {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Interpret a boolean-ish env value (`true`, `1`, `yes`, `on`).
pub fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "true" | "1" | "yes" | "on"
    )
}

pub const DEFAULT_LOCAL_AGENT_URL: &str = "http://localhost:8080/invocations";
pub const DEFAULT_GATEWAY_URL: &str = "http://localhost:3000";
pub const AGENTCORE_SERVICE: &str = "bedrock-agentcore";

// ── Top-level config ──────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Active profile name (empty = default).
    pub profile: String,
    pub server: ServerConfig,
    pub backend: BackendConfig,
    pub aws: AwsConfig,
}

impl Config {
    /// Build config from environment variables (call `load_dotenv()` first).
    /// Profile is read from `AMBER_PROFILE` env var. When set (e.g. `PROD`),
    /// every key is first looked up as `{PROFILE}_{KEY}`, falling back to `{KEY}`.
    pub fn from_env() -> Self {
        let profile = env_or("AMBER_PROFILE", "").to_uppercase();
        Self::for_profile(&profile)
    }

    /// Build config for a specific named profile (empty string = default).
    pub fn for_profile(profile: &str) -> Self {
        let p = profile.to_uppercase();
        let p = p.as_str();
        Self {
            profile: p.to_string(),
            server: ServerConfig::from_env_profiled(p),
            backend: BackendConfig::from_env_profiled(p),
            aws: AwsConfig::from_env_profiled(p),
        }
    }

    pub fn profile_label(&self) -> &str {
        if self.profile.is_empty() { "default" } else { &self.profile }
    }

    /// Print a redacted summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!("Config loaded (profile: {}):", self.profile_label());
        tracing::info!("  server:   {}:{}", self.server.host, self.server.port);
        if self.backend.use_local {
            tracing::info!("  backend:  local ({})", self.backend.local_url);
        } else {
            tracing::info!(
                "  backend:  remote (runtime={}, qualifier={})",
                self.backend.runtime_arn.as_deref().unwrap_or("(none)"),
                self.backend.qualifier.as_deref().unwrap_or("(none)")
            );
            tracing::info!(
                "  aws:      credentials={}, session_token={}",
                if self.aws.has_credentials() { "set" } else { "missing" },
                if self.aws.session_token.is_some() { "set" } else { "none" }
            );
        }
    }

    /// Return a redacted view safe for API responses (no secrets).
    pub fn redacted_summary(&self) -> serde_json::Value {
        serde_json::json!({
            "profile": self.profile_label(),
            "server": { "host": self.server.host, "port": self.server.port },
            "backend": {
                "mode": self.backend.mode_label(),
                "local_url": self.backend.local_url,
                "runtime_arn": self.backend.runtime_arn,
                "qualifier": self.backend.qualifier,
            },
            "aws": {
                "configured": self.aws.has_credentials(),
                "session_token": self.aws.session_token.is_some(),
                "endpoint_url": self.aws.endpoint_url,
            },
        })
    }
}

// ── Server ────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors_origin: String,
}

impl ServerConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            host: profiled_env_or(p, "HOST", "0.0.0.0"),
            port: profiled_env_u16(p, "PORT", 3000),
            cors_origin: profiled_env_or(p, "CORS_ORIGIN", "*"),
        }
    }
}

// ── Agent backend ─────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Route invocations to the local plain-HTTP agent instead of AgentCore.
    pub use_local: bool,
    pub local_url: String,
    /// AgentCore runtime ARN; its 4th `:` field is the region.
    pub runtime_arn: Option<String>,
    /// Optional endpoint qualifier (e.g. `DEFAULT`).
    pub qualifier: Option<String>,
}

impl BackendConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            use_local: profiled_env_opt(p, "USE_LOCAL_AGENT")
                .map(|v| parse_flag(&v))
                .unwrap_or(false),
            local_url: profiled_env_or(p, "LOCAL_AGENT_URL", DEFAULT_LOCAL_AGENT_URL),
            runtime_arn: profiled_env_opt(p, "AGENT_RUNTIME_ARN"),
            qualifier: profiled_env_opt(p, "AGENT_RUNTIME_QUALIFIER"),
        }
    }

    pub fn local(url: impl Into<String>) -> Self {
        Self {
            use_local: true,
            local_url: url.into(),
            runtime_arn: None,
            qualifier: None,
        }
    }

    pub fn remote(runtime_arn: impl Into<String>) -> Self {
        Self {
            use_local: false,
            local_url: DEFAULT_LOCAL_AGENT_URL.to_string(),
            runtime_arn: Some(runtime_arn.into()),
            qualifier: None,
        }
    }

    pub fn mode_label(&self) -> &'static str {
        if self.use_local { "local" } else { "remote" }
    }
}

// ── AWS credentials ───────────────────────────────────────────

#[derive(Clone, Default, Serialize, Deserialize)]
pub struct AwsConfig {
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    pub session_token: Option<String>,
    /// Overrides `https://bedrock-agentcore.{region}.amazonaws.com`.
    pub endpoint_url: Option<String>,
}

impl AwsConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            access_key_id: profiled_env_opt(p, "AWS_ACCESS_KEY_ID"),
            secret_access_key: profiled_env_opt(p, "AWS_SECRET_ACCESS_KEY"),
            session_token: profiled_env_opt(p, "AWS_SESSION_TOKEN"),
            endpoint_url: profiled_env_opt(p, "AWS_ENDPOINT_URL"),
        }
    }

    pub fn has_credentials(&self) -> bool {
        self.access_key_id.is_some() && self.secret_access_key.is_some()
    }
}

impl std::fmt::Debug for AwsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AwsConfig")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &self.secret_access_key.as_ref().map(|_| "***"))
            .field("session_token", &self.session_token.as_ref().map(|_| "***"))
            .field("endpoint_url", &self.endpoint_url)
            .finish()
    }
}
