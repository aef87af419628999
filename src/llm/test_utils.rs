use anyhow::{Result, anyhow};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;
use tempfile::TempDir;

use crate::config::ToolsConfig;
use crate::llm::client_core::ChatModel;
use crate::llm::tool_runtime::{ToolRuntime, TurnContext};
use crate::llm::types::{
    ChatMessage, ChatResponseWithTools, ChoiceMessageWithTools, ChoiceWithTools, ToolCall, ToolDef,
};
use crate::logging::EventLog;
use crate::metrics::UsageSink;
use crate::session::SessionHandle;
use crate::tools::Toolbox;

/// Replays canned responses and remembers every message list it was sent.
/// Running out of responses behaves like an endpoint failure.
pub struct ScriptedModel {
    replies: Mutex<VecDeque<ChatResponseWithTools>>,
    requests: Mutex<Vec<Vec<ChatMessage>>>,
}

impl ScriptedModel {
    pub fn new(replies: Vec<ChatResponseWithTools>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<Vec<ChatMessage>> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatModel for ScriptedModel {
    async fn chat_tools_once(
        &self,
        _model: &str,
        messages: &[ChatMessage],
        _tools: &[ToolDef],
    ) -> Result<ChatResponseWithTools> {
        self.requests.lock().unwrap().push(messages.to_vec());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| anyhow!("connection refused"))
    }
}

pub fn tool_reply(content: Option<&str>, tool_calls: Vec<ToolCall>) -> ChatResponseWithTools {
    ChatResponseWithTools {
        id: None,
        choices: vec![ChoiceWithTools {
            index: 0,
            message: ChoiceMessageWithTools {
                role: Some("assistant".into()),
                content: content.map(str::to_string),
                tool_calls,
            },
        }],
        usage: None,
    }
}

pub fn final_reply(content: &str) -> ChatResponseWithTools {
    tool_reply(Some(content), vec![])
}

#[derive(Default)]
pub struct RecordingUsage {
    calls: Mutex<Vec<(u64, u64)>>,
}

impl RecordingUsage {
    pub fn calls(&self) -> Vec<(u64, u64)> {
        self.calls.lock().unwrap().clone()
    }
}

impl UsageSink for RecordingUsage {
    fn record_usage(&self, _session: Option<&SessionHandle>, input: u64, output: u64) -> Result<()> {
        self.calls.lock().unwrap().push((input, output));
        Ok(())
    }
}

/// Temporary project root, workspace and log directory wired into a toolbox.
pub struct Fixture {
    pub root: TempDir,
    pub outside: TempDir,
    pub workspace: TempDir,
    pub logs: TempDir,
    pub toolbox: Toolbox,
    pub events: EventLog,
    pub usage: RecordingUsage,
}

impl Fixture {
    pub fn new() -> Self {
        let root = TempDir::new().unwrap();
        let outside = TempDir::new().unwrap();
        let workspace = TempDir::new().unwrap();
        let logs = TempDir::new().unwrap();
        let toolbox = Toolbox::new(root.path(), workspace.path(), ToolsConfig::default()).unwrap();
        let events = EventLog::new(logs.path());
        Self {
            root,
            outside,
            workspace,
            logs,
            toolbox,
            events,
            usage: RecordingUsage::default(),
        }
    }

    pub fn set_exec_timeout_secs(&mut self, secs: u64) {
        let cfg = ToolsConfig {
            exec_timeout_secs: secs,
            ..ToolsConfig::default()
        };
        self.toolbox = Toolbox::new(self.root.path(), self.workspace.path(), cfg).unwrap();
    }

    pub fn ctx(&self) -> TurnContext {
        TurnContext::new(uuid::Uuid::new_v4().to_string(), None)
    }

    pub fn runtime<'a>(&'a self, model: &'a dyn ChatModel) -> ToolRuntime<'a> {
        ToolRuntime::new(model, "test-model", &self.toolbox, &self.events, &self.usage)
    }

    /// Event-log records written today for the given turn.
    pub fn events_for(&self, ctx: &TurnContext) -> Vec<serde_json::Value> {
        let text = std::fs::read_to_string(self.events.today_path()).unwrap_or_default();
        text.lines()
            .map(|l| serde_json::from_str::<serde_json::Value>(l).unwrap())
            .filter(|v| v["request_id"] == ctx.request_id.as_str())
            .collect()
    }
}
