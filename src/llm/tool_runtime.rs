use crate::llm::client_core::ChatModel;
use crate::llm::default_tools_def;
use crate::llm::types::ToolDef;
use crate::logging::EventLog;
use crate::metrics::UsageSink;
use crate::session::SessionHandle;
use crate::tools::Toolbox;

pub const DEFAULT_MAX_TOOL_ROUNDS: usize = 25;

/// Per-turn values threaded through the driver and dispatcher.
#[derive(Debug, Clone)]
pub struct TurnContext {
    /// Correlation token stamped on every event-log record of the turn.
    pub request_id: String,
    pub session: Option<SessionHandle>,
}

impl TurnContext {
    pub fn new(request_id: impl Into<String>, session: Option<SessionHandle>) -> Self {
        Self {
            request_id: request_id.into(),
            session,
        }
    }
}

/// Everything the turn driver needs besides the conversation itself.
pub struct ToolRuntime<'a> {
    pub client: &'a dyn ChatModel,
    pub model: String,
    pub tools: Vec<ToolDef>,
    pub toolbox: &'a Toolbox,
    pub events: &'a EventLog,
    pub usage: &'a dyn UsageSink,
    /// Tool round-trips allowed in one turn; 0 disables the ceiling.
    pub max_rounds: usize,
}

impl<'a> ToolRuntime<'a> {
    pub fn new(
        client: &'a dyn ChatModel,
        model: impl Into<String>,
        toolbox: &'a Toolbox,
        events: &'a EventLog,
        usage: &'a dyn UsageSink,
    ) -> Self {
        Self {
            client,
            model: model.into(),
            tools: default_tools_def(),
            toolbox,
            events,
            usage,
            max_rounds: DEFAULT_MAX_TOOL_ROUNDS,
        }
    }

    pub fn with_max_rounds(mut self, max_rounds: usize) -> Self {
        self.max_rounds = max_rounds;
        self
    }
}
