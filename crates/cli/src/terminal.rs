use anyhow::Result;
use crossterm::{
    execute,
    style::{Color, Print, ResetColor, SetForegroundColor},
};
use std::io::{self, Write};

use amber_core::StreamEvent;
use amber_stream::ClientState;

/// Color scheme for terminal output.
struct Colors;

impl Colors {
    const STATUS: Color = Color::Green;
    const THINKING: Color = Color::Cyan;
    const TOOL: Color = Color::Yellow;
    const ERROR: Color = Color::Red;
    const DIM: Color = Color::DarkGrey;
    const HEADER: Color = Color::Magenta;
}

/// What changed in the client state after one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Update {
    Status(String),
    NewTool(String),
    Thinking(String),
    FinalResponse(String),
    Error(String),
}

/// Cheap marker of the state before an event; thinking is append-only so
/// its length is enough to find the new text.
#[derive(Debug, Clone, Default)]
pub struct Mark {
    status: String,
    tools: usize,
    thinking: usize,
    finished: bool,
}

impl Mark {
    pub fn of(state: &ClientState) -> Self {
        Self {
            status: state.status.clone(),
            tools: state.tools.len(),
            thinking: state.thinking.len(),
            finished: state.finished,
        }
    }

    /// Updates to render, in display order.
    pub fn updates(&self, state: &ClientState) -> Vec<Update> {
        let mut updates = Vec::new();
        if state.status != self.status {
            updates.push(Update::Status(state.status.clone()));
        }
        for tool in state.tools.iter().skip(self.tools) {
            updates.push(Update::NewTool(tool.clone()));
        }
        if state.thinking.len() > self.thinking {
            updates.push(Update::Thinking(state.thinking[self.thinking..].to_string()));
        }
        if state.finished && !self.finished {
            if let Some(error) = &state.error {
                updates.push(Update::Error(error.clone()));
            } else if let Some(response) = &state.final_response {
                updates.push(Update::FinalResponse(response.clone()));
            }
        }
        updates
    }
}

pub struct Terminal {
    show_thinking: bool,
    /// Thinking text is printed inline; a newline is owed before the next line-based output.
    mid_line: bool,
}

impl Terminal {
    pub fn new(show_thinking: bool) -> Self {
        Self {
            show_thinking,
            mid_line: false,
        }
    }

    pub fn print_banner(&mut self, gateway: &str, query: &str) -> Result<()> {
        let mut stdout = io::stdout();
        execute!(
            stdout,
            SetForegroundColor(Colors::HEADER),
            Print("amber"),
            ResetColor,
            Print(" - research agent\n"),
            SetForegroundColor(Colors::DIM),
            Print(format!("Gateway: {}\nQuery: {}\n---\n", gateway, query)),
            ResetColor,
        )?;
        stdout.flush()?;
        Ok(())
    }

    pub fn render(&mut self, updates: &[Update]) -> Result<()> {
        let mut stdout = io::stdout();
        for update in updates {
            match update {
                Update::Thinking(text) => {
                    if !self.show_thinking {
                        continue;
                    }
                    execute!(
                        stdout,
                        SetForegroundColor(Colors::THINKING),
                        Print(text),
                        ResetColor,
                    )?;
                    self.mid_line = !text.ends_with('\n');
                }
                Update::Status(status) => {
                    self.end_line(&mut stdout)?;
                    execute!(
                        stdout,
                        SetForegroundColor(Colors::STATUS),
                        Print(format!("[{}]\n", status)),
                        ResetColor,
                    )?;
                }
                Update::NewTool(tool) => {
                    self.end_line(&mut stdout)?;
                    execute!(
                        stdout,
                        SetForegroundColor(Colors::TOOL),
                        Print(format!("  + tool: {}\n", tool)),
                        ResetColor,
                    )?;
                }
                Update::FinalResponse(response) => {
                    self.end_line(&mut stdout)?;
                    execute!(
                        stdout,
                        SetForegroundColor(Colors::DIM),
                        Print("---\n"),
                        ResetColor,
                        Print(format!("{}\n", response)),
                    )?;
                }
                Update::Error(error) => {
                    self.end_line(&mut stdout)?;
                    execute!(
                        stdout,
                        SetForegroundColor(Colors::ERROR),
                        Print(format!("[error: {}]\n", error)),
                        ResetColor,
                    )?;
                }
            }
        }
        stdout.flush()?;
        Ok(())
    }

    /// One decoded event as a JSON line.
    pub fn print_raw(&mut self, event: &StreamEvent) -> Result<()> {
        let mut stdout = io::stdout();
        writeln!(stdout, "{}", serde_json::to_string(event)?)?;
        stdout.flush()?;
        Ok(())
    }

    /// Closing lines: tool summary, dropped-frame diagnostic, and the last
    /// known status when the invocation did not succeed.
    pub fn print_summary(&mut self, state: &ClientState) -> Result<()> {
        let mut stdout = io::stdout();
        self.end_line(&mut stdout)?;
        if !state.tools.is_empty() {
            let tools: Vec<&str> = state.tools.iter().map(String::as_str).collect();
            execute!(
                stdout,
                SetForegroundColor(Colors::DIM),
                Print(format!("Tools used: {}\n", tools.join(", "))),
                ResetColor,
            )?;
        }
        if state.dropped_frames > 0 {
            execute!(
                stdout,
                SetForegroundColor(Colors::DIM),
                Print(format!(
                    "note: {} malformed stream line(s) were skipped\n",
                    state.dropped_frames
                )),
                ResetColor,
            )?;
        }
        if !state.succeeded() {
            let status = if state.status.is_empty() { "(none)" } else { state.status.as_str() };
            execute!(
                stdout,
                SetForegroundColor(Colors::ERROR),
                Print(format!("Last status: {}\n", status)),
                ResetColor,
            )?;
        }
        stdout.flush()?;
        Ok(())
    }

    pub fn print_error(&mut self, msg: &str) -> Result<()> {
        let mut stdout = io::stdout();
        self.end_line(&mut stdout)?;
        execute!(
            stdout,
            SetForegroundColor(Colors::ERROR),
            Print(format!("Error: {}\n", msg)),
            ResetColor,
        )?;
        stdout.flush()?;
        Ok(())
    }

    pub fn print_info(&mut self, msg: &str) -> Result<()> {
        let mut stdout = io::stdout();
        self.end_line(&mut stdout)?;
        execute!(
            stdout,
            SetForegroundColor(Colors::DIM),
            Print(format!("{}\n", msg)),
            ResetColor,
        )?;
        stdout.flush()?;
        Ok(())
    }

    fn end_line(&mut self, stdout: &mut io::Stdout) -> Result<()> {
        if self.mid_line {
            execute!(stdout, Print("\n"))?;
            self.mid_line = false;
        }
        Ok(())
    }
}
