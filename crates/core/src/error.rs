use thiserror::Error;

/// Failures of one invocation, from request validation to stream decoding.
#[derive(Error, Debug)]
pub enum InvokeError {
    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("AWS credentials not configured: {0}")]
    AuthConfig(String),

    #[error("Backend configuration error: {0}")]
    Config(String),

    #[error("Failed to reach agent backend: {message}")]
    Transport {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Agent backend returned {status}: {body}")]
    Backend { status: u16, body: String },

    #[error("Malformed stream frame: {0}")]
    FrameParse(String),
}

impl InvokeError {
    pub fn transport(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        InvokeError::Transport {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Name reported in the `type` field of gateway error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            InvokeError::Validation(_) => "ValidationError",
            InvokeError::AuthConfig(_) => "AuthConfigError",
            InvokeError::Config(_) => "ConfigError",
            InvokeError::Transport { .. } => "TransportError",
            InvokeError::Backend { .. } => "BackendError",
            InvokeError::FrameParse(_) => "FrameParseError",
        }
    }

    /// HTTP status the gateway answers with when this error happens before streaming.
    pub fn http_status(&self) -> u16 {
        match self {
            InvokeError::Validation(_) => 400,
            _ => 500,
        }
    }

    /// Whether re-running the whole invocation could succeed without operator action.
    pub fn is_retryable(&self) -> bool {
        matches!(self, InvokeError::Transport { .. } | InvokeError::Backend { .. })
    }

    /// Render the `source()` chain, if any, as a single line.
    pub fn cause_chain(&self) -> Option<String> {
        let mut causes = Vec::new();
        let mut current = std::error::Error::source(self);
        while let Some(err) = current {
            causes.push(err.to_string());
            current = std::error::Error::source(err);
        }
        if causes.is_empty() {
            None
        } else {
            Some(causes.join(": "))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_and_statuses() {
        let validation = InvokeError::Validation("Query is required".into());
        assert_eq!(validation.kind(), "ValidationError");
        assert_eq!(validation.http_status(), 400);
        assert!(!validation.is_retryable());

        let auth = InvokeError::AuthConfig("missing AWS_ACCESS_KEY_ID".into());
        assert_eq!(auth.kind(), "AuthConfigError");
        assert_eq!(auth.http_status(), 500);
        assert!(!auth.is_retryable());

        let backend = InvokeError::Backend {
            status: 503,
            body: "unavailable".into(),
        };
        assert_eq!(backend.kind(), "BackendError");
        assert_eq!(backend.to_string(), "Agent backend returned 503: unavailable");
        assert!(backend.is_retryable());
    }

    #[test]
    fn cause_chain_includes_source() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "connection refused");
        let err = InvokeError::transport("POST http://localhost:8080/invocations", io);
        assert_eq!(err.kind(), "TransportError");
        assert_eq!(err.cause_chain().as_deref(), Some("connection refused"));

        assert!(InvokeError::Validation("x".into()).cause_chain().is_none());
    }
}
