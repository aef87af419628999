use serde_json::{Map, Value};
use tracing::debug;

use crate::llm::tool_runtime::TurnContext;
use crate::logging::EventLog;
use crate::tools::{BrowseArgs, ToolError, Toolbox};

/// One registered tool together with the arguments it was asked to run with.
///
/// Each variant fixes how the model's argument mapping is sliced into a call:
/// single or paired required strings, the `updates` mapping passed through
/// untouched, or the whole mapping taken as named parameters.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolInvocation {
    ReadFile { path: String },
    WriteFile { path: String, content: String },
    SearchFiles { directory: String, pattern: String },
    ExecCommand { command: String },
    UpdateUserProfile { updates: Option<Value> },
    Browse(BrowseArgs),
}

fn required_str(args: &Map<String, Value>, key: &'static str) -> Result<String, ToolError> {
    match args.get(key) {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(_) => Err(ToolError::InvalidArgument {
            key,
            expected: "string",
        }),
        None => Err(ToolError::MissingArgument(key)),
    }
}

impl ToolInvocation {
    /// Registered tool names, in the order their schemas are offered.
    #[cfg(test)]
    pub const NAMES: [&'static str; 6] = [
        "read_file",
        "write_file",
        "search_files",
        "exec_command",
        "update_user_profile",
        "browse",
    ];

    pub fn parse(name: &str, args: &Map<String, Value>) -> Result<Self, ToolError> {
        match name {
            "read_file" => Ok(Self::ReadFile {
                path: required_str(args, "path")?,
            }),
            "write_file" => Ok(Self::WriteFile {
                path: required_str(args, "path")?,
                content: required_str(args, "content")?,
            }),
            "search_files" => Ok(Self::SearchFiles {
                directory: required_str(args, "directory")?,
                pattern: required_str(args, "pattern")?,
            }),
            "exec_command" => Ok(Self::ExecCommand {
                command: required_str(args, "command")?,
            }),
            "update_user_profile" => Ok(Self::UpdateUserProfile {
                updates: args.get("updates").cloned(),
            }),
            "browse" => serde_json::from_value(Value::Object(args.clone()))
                .map(Self::Browse)
                .map_err(|e| ToolError::InvalidArguments(e.to_string())),
            other => Err(ToolError::UnknownTool(other.to_string())),
        }
    }

    pub async fn run(self, toolbox: &Toolbox) -> Result<String, ToolError> {
        match self {
            Self::ReadFile { path } => toolbox.read_file(&path),
            Self::WriteFile { path, content } => toolbox.write_file(&path, &content),
            Self::SearchFiles { directory, pattern } => toolbox.search_files(&directory, &pattern),
            Self::ExecCommand { command } => toolbox.exec_command(&command).await,
            Self::UpdateUserProfile { updates } => toolbox.update_user_profile(updates.as_ref()),
            Self::Browse(args) => toolbox.browse(args).await,
        }
    }
}

/// Runs one tool call and always yields text for the model.
///
/// Extraction and execution failures come back as `Error: ...` so the turn
/// can carry on; the call and its result are logged either way.
pub async fn dispatch(
    toolbox: &Toolbox,
    events: &EventLog,
    ctx: &TurnContext,
    name: &str,
    arguments: Map<String, Value>,
) -> String {
    events.log_tool_call(ctx, name, &arguments);
    let result = match ToolInvocation::parse(name, &arguments) {
        Ok(invocation) => invocation.run(toolbox).await,
        Err(e) => Err(e),
    };
    let text = match result {
        Ok(text) => text,
        Err(e) => {
            debug!(tool = name, error = %e, "tool call failed");
            format!("Error: {e}")
        }
    };
    events.log_tool_result(ctx, name, &text);
    text
}
