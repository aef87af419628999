use serde_json::json;

use crate::llm::types::{ToolDef, ToolFunctionDef};

fn function(name: &str, description: &str, parameters: serde_json::Value) -> ToolDef {
    ToolDef {
        kind: "function".into(),
        function: ToolFunctionDef {
            name: name.into(),
            description: description.into(),
            parameters,
        },
    }
}

/// Schemas offered to the model on every call. The set is fixed; there is no per-turn filtering.
pub fn default_tools_def() -> Vec<ToolDef> {
    vec![
        function(
            "read_file",
            "Reads a text file. The path is relative to the project root, or absolute inside it.",
            json!({
                "type": "object",
                "properties": {"path": {"type": "string", "description": "File path"}},
                "required": ["path"]
            }),
        ),
        function(
            "write_file",
            "Writes text to a file under the project root, creating parent directories as needed. Existing content is replaced.",
            json!({
                "type": "object",
                "properties": {
                    "path": {"type": "string"},
                    "content": {"type": "string"}
                },
                "required": ["path", "content"]
            }),
        ),
        function(
            "search_files",
            "Lists files under a directory whose content matches a case-insensitive regular expression.",
            json!({
                "type": "object",
                "properties": {
                    "directory": {"type": "string", "description": "Directory under the project root"},
                    "pattern": {"type": "string", "description": "Regular expression to look for"}
                },
                "required": ["directory", "pattern"]
            }),
        ),
        function(
            "exec_command",
            "Runs a shell command in the project root and returns stdout, stderr and a non-zero exit code. Long-running commands are stopped after a time limit.",
            json!({
                "type": "object",
                "properties": {"command": {"type": "string"}},
                "required": ["command"]
            }),
        ),
        function(
            "update_user_profile",
            "Saves facts about the user to long-term memory. Call it in the same turn whenever the user shares their name, interests, preferences, timezone or any other personal detail. Keys are snake_case (name, interests, favorite_language, timezone); existing keys are overwritten, new keys are appended.",
            json!({
                "type": "object",
                "properties": {
                    "updates": {
                        "type": "object",
                        "description": "snake_case key to string value, taken from what the user said.",
                        "additionalProperties": {"type": "string"}
                    }
                },
                "required": ["updates"]
            }),
        ),
        function(
            "browse",
            "Fetches a web page and returns it as readable text. Works for search pages (https://www.google.com/search?q=QUERY), forums such as https://reddit.com/r/SUBREDDIT, or any article URL. Long pages are truncated.",
            json!({
                "type": "object",
                "properties": {
                    "url": {"type": "string", "description": "URL to open; https:// is assumed when no scheme is given"},
                    "wait_selector": {"type": "string", "description": "Optional selector (#id, .class or tag) that must be present in the page"},
                    "wait_time_ms": {"type": "integer", "description": "Optional extra wait in milliseconds after load (default 2000)"},
                    "max_text_chars": {"type": "integer", "description": "Optional maximum length of the returned text (default 80000)"}
                },
                "required": ["url"]
            }),
        ),
    ]
}
