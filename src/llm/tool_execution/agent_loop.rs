use anyhow::{Result, anyhow};
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::llm::tool_execution::dispatch;
use crate::llm::tool_runtime::{ToolRuntime, TurnContext};
use crate::llm::types::{ChatMessage, ChatResponseWithTools, ChoiceMessageWithTools, Usage};

/// Result of one user turn.
#[derive(Debug, Clone, PartialEq)]
pub struct TurnOutcome {
    pub final_text: String,
    /// The user message, any assistant/tool exchanges, and the final assistant message.
    pub transcript: Vec<ChatMessage>,
}

/// Parses the model's raw argument text, falling back to an empty mapping.
fn parse_arguments(tool: &str, raw: &str) -> Map<String, Value> {
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => map,
        Ok(other) => {
            debug!(tool, arguments = %other, "tool arguments are not an object; using empty arguments");
            Map::new()
        }
        Err(e) => {
            debug!(tool, raw, error = %e, "tool arguments are not valid JSON; using empty arguments");
            Map::new()
        }
    }
}

fn record_usage(runtime: &ToolRuntime<'_>, ctx: &TurnContext, usage: &Usage) {
    if usage.is_partial() {
        debug!(?usage, "usage block is missing token counts; defaulting to 0");
    }
    if let Err(e) = runtime
        .usage
        .record_usage(ctx.session.as_ref(), usage.input(), usage.output())
    {
        warn!(error = %e, "failed to record token usage");
    }
}

/// Drives one user turn to a final answer.
///
/// The outgoing list is `system`, `prior_history`, then the new user message.
/// Each model reply that requests tools is appended together with one `tool`
/// message per request, in request order, before the model is called again.
/// Tool failures are fed back as text; a failed model call ends the turn with
/// an error.
pub async fn run_turn(
    runtime: &ToolRuntime<'_>,
    ctx: &TurnContext,
    instructions: &str,
    prior_history: &[ChatMessage],
    user_text: &str,
) -> Result<TurnOutcome> {
    let user = ChatMessage::user(user_text);
    let mut messages = Vec::with_capacity(prior_history.len() + 2);
    messages.push(ChatMessage::system(instructions));
    messages.extend_from_slice(prior_history);
    messages.push(user.clone());
    let mut transcript = vec![user];
    let mut rounds = 0usize;

    loop {
        runtime.events.log_llm_request(ctx, &runtime.model, &messages);
        let ChatResponseWithTools { choices, usage, .. } = runtime
            .client
            .chat_tools_once(&runtime.model, &messages, &runtime.tools)
            .await?;
        let Some(msg) = choices.into_iter().next().map(|c| c.message) else {
            runtime
                .events
                .log_llm_response(ctx, &ChoiceMessageWithTools::default());
            return Err(anyhow!("no choices returned"));
        };
        runtime.events.log_llm_response(ctx, &msg);

        if let Some(usage) = &usage {
            record_usage(runtime, ctx, usage);
        }

        if msg.tool_calls.is_empty() {
            let final_text = msg.content.as_deref().unwrap_or_default().trim().to_string();
            let reply = ChatMessage::assistant(final_text.clone());
            messages.push(reply.clone());
            transcript.push(reply);
            debug!(rounds, "turn finished");
            return Ok(TurnOutcome {
                final_text,
                transcript,
            });
        }

        if runtime.max_rounds > 0 && rounds >= runtime.max_rounds {
            warn!(rounds, requested = msg.tool_calls.len(), "max tool rounds reached");
            let final_text = format!("Stopped: max iterations reached ({rounds} tool rounds).");
            let reply = ChatMessage::assistant(final_text.clone());
            messages.push(reply.clone());
            transcript.push(reply);
            return Ok(TurnOutcome {
                final_text,
                transcript,
            });
        }
        rounds += 1;

        let calls = msg.tool_calls;
        let assistant = ChatMessage::assistant_with_tools(msg.content, calls.clone());
        messages.push(assistant.clone());
        transcript.push(assistant);

        for call in &calls {
            let name = call.function.name.as_str();
            info!(tool = name, id = %call.id, "running tool");
            let arguments = parse_arguments(name, &call.function.arguments);
            let result = dispatch(runtime.toolbox, runtime.events, ctx, name, arguments).await;
            let tool_msg = ChatMessage::tool(call.id.clone(), result);
            messages.push(tool_msg.clone());
            transcript.push(tool_msg);
        }
    }
}
