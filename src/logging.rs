use anyhow::Result;
use chrono::{DateTime, Local};
use serde_json::{Map, Value, json};
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use crate::llm::{ChatMessage, ChoiceMessageWithTools, TurnContext};

pub fn init_logging(level: &str) -> Result<()> {
    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(io::stderr))
        .try_init()?;
    info!("logging initialized");
    Ok(())
}

/// Append-only JSONL record of everything sent to and received from the
/// model, plus every tool call. One file per local calendar day.
#[derive(Debug, Clone)]
pub struct EventLog {
    dir: PathBuf,
}

impl EventLog {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn day_path(&self, at: &DateTime<Local>) -> PathBuf {
        self.dir.join(format!("agent_{}.log", at.format("%Y-%m-%d")))
    }

    #[cfg(test)]
    pub fn today_path(&self) -> PathBuf {
        self.day_path(&Local::now())
    }

    pub fn log_llm_request(&self, ctx: &TurnContext, model: &str, messages: &[ChatMessage]) {
        self.emit(
            ctx,
            "llm_request",
            json!({
                "model": model,
                "message_count": messages.len(),
                "messages": messages,
            }),
        );
    }

    pub fn log_llm_response(&self, ctx: &TurnContext, message: &ChoiceMessageWithTools) {
        self.emit(
            ctx,
            "llm_response",
            json!({
                "content_len": message.content.as_deref().map_or(0, |c| c.chars().count()),
                "tool_calls_count": message.tool_calls.len(),
                "message": message,
            }),
        );
    }

    pub fn log_tool_call(&self, ctx: &TurnContext, name: &str, arguments: &Map<String, Value>) {
        self.emit(ctx, "tool_call", json!({"name": name, "arguments": arguments}));
    }

    pub fn log_tool_result(&self, ctx: &TurnContext, name: &str, result: &str) {
        self.emit(ctx, "tool_result", json!({"name": name, "result": result}));
    }

    /// Best-effort: a failed write is reported and otherwise ignored.
    fn emit(&self, ctx: &TurnContext, event: &str, payload: Value) {
        if let Err(e) = self.append(&ctx.request_id, event, payload) {
            warn!(error = %e, event, dir = %self.dir.display(), "failed to write event log");
        }
    }

    fn append(&self, request_id: &str, event: &str, payload: Value) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        let now = Local::now();
        let path = self.day_path(&now);
        let record = json!({
            "timestamp": now.to_rfc3339(),
            "request_id": request_id,
            "event": event,
            "payload": payload,
        });
        let mut line = serde_json::to_string(&record)?;
        line.push('\n');
        let mut f = OpenOptions::new().create(true).append(true).open(&path)?;
        f.write_all(line.as_bytes())?;
        Ok(())
    }
}
