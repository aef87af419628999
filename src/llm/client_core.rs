use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use std::time::Duration;
use tracing::{debug, error};

use crate::config::LlmConfig;
use crate::llm::types::{ChatMessage, ChatRequestWithTools, ChatResponseWithTools, ToolDef};

/// A chat-completions endpoint that can be offered tools.
///
/// One call is one request/response exchange; retries and timeouts beyond
/// the transport's own are not this trait's concern.
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn chat_tools_once(
        &self,
        model: &str,
        messages: &[ChatMessage],
        tools: &[ToolDef],
    ) -> Result<ChatResponseWithTools>;
}

#[derive(Debug, Clone)]
pub struct OpenAIClient {
    pub base_url: String,
    pub api_key: String,
    pub(crate) inner: reqwest::Client,
}

impl OpenAIClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Result<Self> {
        let inner = reqwest::Client::builder().build()?;
        Ok(Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            inner,
        })
    }

    pub fn with_llm_config(mut self, cfg: &LlmConfig) -> Result<Self> {
        self.inner = reqwest::Client::builder()
            .connect_timeout(Duration::from_millis(cfg.connect_timeout_ms))
            .timeout(Duration::from_millis(cfg.request_timeout_ms))
            .build()
            .context("build http client")?;
        Ok(self)
    }

    pub(crate) fn endpoint(&self) -> String {
        let base = self.base_url.trim_end_matches('/');
        if base.ends_with("/chat/completions") {
            return base.to_string();
        }
        format!("{base}/chat/completions")
    }

    fn headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            AUTHORIZATION,
            format!("Bearer {}", self.api_key)
                .parse()
                .context("api key is not a valid header value")?,
        );
        Ok(headers)
    }
}

#[async_trait]
impl ChatModel for OpenAIClient {
    async fn chat_tools_once(
        &self,
        model: &str,
        messages: &[ChatMessage],
        tools: &[ToolDef],
    ) -> Result<ChatResponseWithTools> {
        let url = self.endpoint();
        let req = ChatRequestWithTools {
            model: model.to_string(),
            messages: messages.to_vec(),
            temperature: None,
            tools: Some(tools.to_vec()),
        };

        let resp = self
            .inner
            .post(&url)
            .headers(self.headers()?)
            .json(&req)
            .send()
            .await
            .context("send chat request (tools)")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default().trim().to_owned();
            error!(status=%status.as_u16(), body=%text, "llm chat_tools_once non-success status");
            bail!("chat (tools) error: {} - {}", status, text);
        }

        let text = resp
            .text()
            .await
            .context("read chat response body (tools)")?;
        debug!(response_body=%text, "llm chat_tools_once response");
        serde_json::from_str(&text).context("parse chat response (tools)")
    }
}
