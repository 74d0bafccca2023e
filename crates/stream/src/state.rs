//! Accumulated view of one invocation, rebuilt from scratch for every query.

use indexmap::IndexSet;
use serde::Serialize;
use tracing::{debug, warn};

use amber_core::StreamEvent;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ClientState {
    /// Most recent status line; empty until the first event.
    pub status: String,
    /// Distinct tool names in first-use order.
    pub tools: IndexSet<String>,
    /// Concatenated `thinking` content, append-only.
    pub thinking: String,
    pub final_response: Option<String>,
    pub error: Option<String>,
    /// Latest human-readable message attached by the backend.
    pub message: Option<String>,
    pub finished: bool,
    /// Set when the stream ended before a terminal event.
    pub disconnected: bool,
    /// Stream lines that could not be decoded.
    pub dropped_frames: u64,
    /// Events that arrived after the terminal event.
    pub ignored_events: u64,
}

impl ClientState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one event into the state. Returns `false` when the event was
    /// ignored, either because the invocation had already finished or
    /// because it names no tool.
    pub fn apply(&mut self, event: &StreamEvent) -> bool {
        if self.finished {
            self.ignored_events += 1;
            warn!(status = event.status(), "ignoring event after terminal event");
            return false;
        }
        if matches!(event, StreamEvent::ToolExecution { tool, .. } if tool.trim().is_empty()) {
            warn!("ignoring tool_execution without a tool name");
            return false;
        }

        if let Some(message) = event.message() {
            self.message = Some(message.to_string());
        }

        match event {
            StreamEvent::Starting { .. } => {
                self.status = "Starting research...".to_string();
            }
            StreamEvent::AgentCreated { .. } => {
                self.status = "Agent initialized".to_string();
            }
            StreamEvent::ToolExecution { tool, .. } => {
                self.status = format!("Executing: {}", tool);
                if self.tools.insert(tool.clone()) {
                    debug!(tool = %tool, count = self.tools.len(), "new tool in use");
                }
            }
            StreamEvent::Thinking { content } => {
                self.thinking.push_str(content);
            }
            StreamEvent::Completed {
                formatted_response,
                ..
            } => {
                self.status = "Research completed!".to_string();
                self.final_response = Some(formatted_response.clone());
                self.finished = true;
            }
            StreamEvent::Error { error, message } => {
                self.status = "Error".to_string();
                let text = if error.is_empty() {
                    message.clone().unwrap_or_else(|| "Unknown error".to_string())
                } else {
                    error.clone()
                };
                self.error = Some(text);
                self.finished = true;
            }
        }
        true
    }

    /// Owned form of [`apply`](Self::apply), for folding over an event sequence.
    pub fn reduce(mut self, event: &StreamEvent) -> Self {
        self.apply(event);
        self
    }

    /// Record that the stream ended without a terminal event. Accumulated
    /// output and the last status are kept.
    pub fn mark_disconnected(&mut self, reason: impl Into<String>) {
        if self.finished {
            return;
        }
        self.disconnected = true;
        self.finished = true;
        self.error = Some(reason.into());
    }

    pub fn record_dropped(&mut self, frames: u64) {
        self.dropped_frames += frames;
    }

    /// Finished with a final response and no error.
    pub fn succeeded(&self) -> bool {
        self.finished && self.error.is_none() && self.final_response.is_some()
    }
}
