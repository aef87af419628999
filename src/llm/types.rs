use serde::{Deserialize, Deserializer, Serialize};

/// Treats an explicit JSON `null` the same as a missing field.
fn null_as_default<'de, D, T>(de: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(de)?.unwrap_or_default())
}

fn function_kind() -> String {
    "function".to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolFunctionDef {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value, // JSON Schema object
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDef {
    #[serde(rename = "type")]
    pub kind: String, // "function"
    pub function: ToolFunctionDef,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallFunction {
    pub name: String,
    /// Raw JSON text as produced by the model; not guaranteed to parse.
    #[serde(default, deserialize_with = "null_as_default")]
    pub arguments: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    #[serde(default, deserialize_with = "null_as_default")]
    pub id: String,
    #[serde(default = "function_kind")]
    pub r#type: String, // "function"
    pub function: ToolCallFunction,
}

impl ToolCall {
    #[cfg(test)]
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            r#type: function_kind(),
            function: ToolCallFunction {
                name: name.into(),
                arguments: arguments.into(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    #[serde(default, deserialize_with = "null_as_default")]
    pub tool_calls: Vec<ToolCall>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub tool_call_id: Option<String>,
}

impl ChatMessage {
    fn text(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: Some(content.into()),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::text(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::text(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::text(Role::Assistant, content)
    }

    /// An assistant turn that asks for tools; `content` is kept exactly as the model sent it.
    pub fn assistant_with_tools(content: Option<String>, tool_calls: Vec<ToolCall>) -> Self {
        Self {
            role: Role::Assistant,
            content,
            tool_calls,
            tool_call_id: None,
        }
    }

    pub fn tool(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: Role::Tool,
            content: Some(content.into()),
            tool_calls: Vec::new(),
            tool_call_id: Some(tool_call_id.into()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequestWithTools {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<ToolDef>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChoiceMessageWithTools {
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub tool_calls: Vec<ToolCall>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChoiceWithTools {
    #[serde(default)]
    pub index: usize,
    pub message: ChoiceMessageWithTools,
}

/// Token accounting block. Chat-completions style APIs report
/// `prompt_tokens`/`completion_tokens`; newer variants use `input_tokens`/`output_tokens`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Usage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_tokens: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completion_tokens: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_tokens: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_tokens: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_tokens: Option<u64>,
}

impl Usage {
    pub fn input(&self) -> u64 {
        self.prompt_tokens
            .filter(|n| *n > 0)
            .or(self.input_tokens)
            .unwrap_or(0)
    }

    pub fn output(&self) -> u64 {
        self.completion_tokens
            .filter(|n| *n > 0)
            .or(self.output_tokens)
            .unwrap_or(0)
    }

    /// True when neither naming convention supplied a count for one of the two sides.
    pub fn is_partial(&self) -> bool {
        (self.prompt_tokens.is_none() && self.input_tokens.is_none())
            || (self.completion_tokens.is_none() && self.output_tokens.is_none())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponseWithTools {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub choices: Vec<ChoiceWithTools>,
    #[serde(default)]
    pub usage: Option<Usage>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn tool_message_serializes_with_correlation_id() {
        let msg = ChatMessage::tool("call_1", "hello");
        let v = serde_json::to_value(&msg).unwrap();
        assert_eq!(
            v,
            json!({"role": "tool", "content": "hello", "tool_call_id": "call_1"})
        );
    }

    #[test]
    fn assistant_without_tools_omits_tool_calls() {
        let v = serde_json::to_value(ChatMessage::assistant("hi")).unwrap();
        assert_eq!(v, json!({"role": "assistant", "content": "hi"}));
    }

    #[test]
    fn response_tolerates_null_tool_calls_and_content() {
        let body = json!({
            "id": "x",
            "choices": [{"index": 0, "message": {"role": "assistant", "content": null, "tool_calls": null}}]
        });
        let resp: ChatResponseWithTools = serde_json::from_value(body).unwrap();
        let msg = &resp.choices[0].message;
        assert!(msg.content.is_none());
        assert!(msg.tool_calls.is_empty());
        assert!(resp.usage.is_none());
    }

    #[test]
    fn response_parses_tool_calls_in_order() {
        let body = json!({
            "choices": [{"message": {"tool_calls": [
                {"id": "a", "type": "function", "function": {"name": "search_files", "arguments": "{}"}},
                {"id": "b", "type": "function", "function": {"name": "update_user_profile", "arguments": "{}"}}
            ]}}]
        });
        let resp: ChatResponseWithTools = serde_json::from_value(body).unwrap();
        let names: Vec<_> = resp.choices[0]
            .message
            .tool_calls
            .iter()
            .map(|c| c.function.name.as_str())
            .collect();
        assert_eq!(names, ["search_files", "update_user_profile"]);
    }

    #[test]
    fn usage_accepts_either_naming() {
        let chat: Usage =
            serde_json::from_value(json!({"prompt_tokens": 10, "completion_tokens": 3})).unwrap();
        assert_eq!((chat.input(), chat.output()), (10, 3));
        assert!(!chat.is_partial());

        let responses: Usage =
            serde_json::from_value(json!({"input_tokens": 7, "output_tokens": 2})).unwrap();
        assert_eq!((responses.input(), responses.output()), (7, 2));

        let partial: Usage = serde_json::from_value(json!({"prompt_tokens": 4})).unwrap();
        assert_eq!((partial.input(), partial.output()), (4, 0));
        assert!(partial.is_partial());
    }
}
