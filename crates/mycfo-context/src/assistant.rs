//! Assistant backend client and wire types.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

use crate::config::HttpConfig;
use crate::merge::ContextPayload;
use crate::session::AuthHeaders;
use crate::types::ConversationMessage;

#[derive(Debug, Clone, Serialize)]
pub struct AssistantRequest {
    pub message: String,
    pub module: String,
    pub context: ContextPayload,
    pub history: Vec<ConversationMessage>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssistantReply {
    pub response: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw: Option<String>,
}

/// A `[[route|label]]` navigation token found in a reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReplyLink {
    pub route: String,
    pub label: String,
}

static LINK_RE: LazyLock<regex::Regex> = LazyLock::new(|| {
    regex::Regex::new(r"\[\[([^\]|]+)\|([^\]]+)\]\]").expect("link regex is valid")
});

impl AssistantReply {
    pub fn new(response: impl Into<String>) -> Self {
        Self {
            response: response.into(),
            raw: None,
        }
    }

    pub fn links(&self) -> Vec<ReplyLink> {
        LINK_RE
            .captures_iter(&self.response)
            .map(|caps| ReplyLink {
                route: caps[1].trim().to_string(),
                label: caps[2].trim().to_string(),
            })
            .collect()
    }
}

#[async_trait]
pub trait AssistantBackend: Send + Sync {
    async fn chat(&self, request: &AssistantRequest) -> Result<AssistantReply>;
}

pub struct HttpAssistant {
    client: Client,
    url: String,
    auth: AuthHeaders,
}

impl HttpAssistant {
    pub fn new(url: impl Into<String>, http: &HttpConfig) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(http.connect_timeout())
            .timeout(http.request_timeout())
            .build()
            .context("failed to build assistant HTTP client")?;
        Ok(Self {
            client,
            url: url.into(),
            auth: AuthHeaders::default(),
        })
    }

    pub fn with_auth(mut self, auth: AuthHeaders) -> Self {
        self.auth = auth;
        self
    }
}

#[async_trait]
impl AssistantBackend for HttpAssistant {
    async fn chat(&self, request: &AssistantRequest) -> Result<AssistantReply> {
        let mut builder = self.client.post(&self.url).json(request);
        for (name, value) in self.auth.pairs() {
            builder = builder.header(name, value);
        }

        let response = builder
            .send()
            .await
            .with_context(|| format!("assistant request to {} failed", self.url))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .with_context(|| format!("failed to read assistant response from {}", self.url))?;

        if !status.is_success() {
            let preview: String = body.chars().take(200).collect();
            return Err(anyhow!("assistant returned HTTP {}: {}", status, preview));
        }
        if body.trim_start().starts_with('<') {
            return Err(anyhow!("assistant at {} returned HTML instead of JSON", self.url));
        }
        serde_json::from_str(&body)
            .with_context(|| format!("failed to parse assistant reply from {}", self.url))
    }
}
