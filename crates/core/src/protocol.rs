//! Wire types shared by the gateway, the relay and stream consumers.

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::InvokeError;

/// One research query, as accepted by `POST /api/invoke-agent` and forwarded
/// verbatim to the agent backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvocationRequest {
    pub query: String,
}

impl InvocationRequest {
    /// Reject blank queries before anything is sent to a backend.
    pub fn new(query: impl Into<String>) -> Result<Self, InvokeError> {
        let query = query.into();
        if query.trim().is_empty() {
            return Err(InvokeError::Validation("Query is required".into()));
        }
        Ok(Self { query })
    }

    /// Serialize to the JSON body sent to the backend.
    pub fn to_body(&self) -> Result<Vec<u8>, InvokeError> {
        serde_json::to_vec(self)
            .map_err(|e| InvokeError::Validation(format!("unserializable query: {}", e)))
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Progress events emitted by the research agent, discriminated by `status`.
///
/// A well-formed stream carries zero or more non-terminal events followed by
/// exactly one `completed` or `error`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StreamEvent {
    Starting {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        session_id: Option<String>,
    },
    AgentCreated {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    ToolExecution {
        #[serde(default, deserialize_with = "null_as_default")]
        tool: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        emoji: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        tool_count: Option<u32>,
    },
    Thinking {
        #[serde(default, deserialize_with = "null_as_default")]
        content: String,
    },
    Completed {
        #[serde(default, deserialize_with = "null_as_default")]
        formatted_response: String,
        #[serde(
            default,
            deserialize_with = "null_as_default",
            skip_serializing_if = "Vec::is_empty"
        )]
        tools_used: Vec<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        tool_count: Option<u32>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        session_id: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    Error {
        #[serde(default, deserialize_with = "null_as_default")]
        error: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
}

impl StreamEvent {
    /// Wire value of the `status` discriminator.
    pub fn status(&self) -> &'static str {
        match self {
            StreamEvent::Starting { .. } => "starting",
            StreamEvent::AgentCreated { .. } => "agent_created",
            StreamEvent::ToolExecution { .. } => "tool_execution",
            StreamEvent::Thinking { .. } => "thinking",
            StreamEvent::Completed { .. } => "completed",
            StreamEvent::Error { .. } => "error",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, StreamEvent::Completed { .. } | StreamEvent::Error { .. })
    }

    /// Human-readable message attached by the backend, if any.
    pub fn message(&self) -> Option<&str> {
        match self {
            StreamEvent::Starting { message, .. }
            | StreamEvent::AgentCreated { message }
            | StreamEvent::ToolExecution { message, .. }
            | StreamEvent::Completed { message, .. }
            | StreamEvent::Error { message, .. } => message.as_deref(),
            StreamEvent::Thinking { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_body_is_compact_json() {
        let req = InvocationRequest::new("What is new in Rust?").unwrap();
        assert_eq!(
            String::from_utf8(req.to_body().unwrap()).unwrap(),
            r#"{"query":"What is new in Rust?"}"#
        );
    }

    #[test]
    fn blank_query_rejected() {
        for q in ["", "   ", "\n\t"] {
            let err = InvocationRequest::new(q).unwrap_err();
            assert_eq!(err.kind(), "ValidationError");
        }
    }

    #[test]
    fn decodes_agent_events_with_extra_fields() {
        let event: StreamEvent = serde_json::from_str(
            r#"{"status":"tool_execution","tool":"web_search","emoji":"search","message":"Executing web_search","tool_count":1}"#,
        )
        .unwrap();
        assert_eq!(
            event,
            StreamEvent::ToolExecution {
                tool: "web_search".into(),
                emoji: Some("search".into()),
                message: Some("Executing web_search".into()),
                tool_count: Some(1),
            }
        );

        let event: StreamEvent = serde_json::from_str(
            r##"{"status":"completed","formatted_response":"# Report","tools_used":["web_search"],"tool_count":1,"session_id":"s-1"}"##,
        )
        .unwrap();
        assert!(event.is_terminal());
        assert_eq!(event.status(), "completed");
    }

    #[test]
    fn null_fields_fall_back_to_empty() {
        let event: StreamEvent =
            serde_json::from_str(r#"{"status":"completed","formatted_response":null}"#).unwrap();
        assert_eq!(
            event,
            StreamEvent::Completed {
                formatted_response: String::new(),
                tools_used: vec![],
                tool_count: None,
                session_id: None,
                message: None,
            }
        );
    }

    #[test]
    fn null_tool_list_falls_back_to_empty() {
        let event: StreamEvent = serde_json::from_str(
            r#"{"status":"completed","formatted_response":"ok","tools_used":null}"#,
        )
        .unwrap();
        assert_eq!(
            event,
            StreamEvent::Completed {
                formatted_response: "ok".into(),
                tools_used: vec![],
                tool_count: None,
                session_id: None,
                message: None,
            }
        );
    }

    #[test]
    fn unknown_status_is_rejected() {
        assert!(serde_json::from_str::<StreamEvent>(r#"{"status":"paused"}"#).is_err());
        assert!(serde_json::from_str::<StreamEvent>(r#"{"tool":"x"}"#).is_err());
    }

    #[test]
    fn serializes_with_status_tag() {
        let json = serde_json::to_string(&StreamEvent::Thinking {
            content: "plan".into(),
        })
        .unwrap();
        assert_eq!(json, r#"{"status":"thinking","content":"plan"}"#);
    }
}
