//! Language-model client: provider abstraction + OpenAI implementation +
//! a scripted client for tests and offline runs.
//!
//! Both the headline classifier and the briefing narrative go through
//! [`LlmClient::complete`]; interpreting the returned text is the caller's job.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::{ConfigError, LlmConfig};

/// Why a completion call produced no text.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("provider returned HTTP {0}")]
    Status(u16),
    #[error("undecodable provider response: {0}")]
    Decode(String),
    #[error("provider returned no content")]
    Empty,
}

impl LlmError {
    /// Short machine-readable kind, used to annotate records.
    pub fn kind(&self) -> &'static str {
        match self {
            LlmError::Transport(_) => "transport",
            LlmError::Status(401) | LlmError::Status(403) => "auth",
            LlmError::Status(429) => "rate_limited",
            LlmError::Status(_) => "http_status",
            LlmError::Decode(_) => "decode",
            LlmError::Empty => "empty_response",
        }
    }
}

#[async_trait]
pub trait LlmClient: Send + Sync {
    /// One completion: `instructions` as the system prompt, `input` as the user turn.
    async fn complete(&self, instructions: &str, input: &str) -> Result<String, LlmError>;
    /// Provider name for diagnostics.
    fn provider_name(&self) -> &'static str;
}

pub type DynLlmClient = Arc<dyn LlmClient>;

/// Build the configured provider. Fails fast when the credential is missing.
pub fn build_client(cfg: &LlmConfig) -> Result<DynLlmClient, ConfigError> {
    let key = cfg.resolve_api_key()?;
    Ok(Arc::new(OpenAiClient::new(
        key,
        &cfg.model,
        Duration::from_secs(cfg.timeout_secs),
    )?))
}

/// OpenAI Chat Completions client.
pub struct OpenAiClient {
    http: reqwest::Client,
    api_key: String,
    model: String,
}

impl OpenAiClient {
    pub fn new(api_key: String, model: &str, timeout: Duration) -> Result<Self, ConfigError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("gpu-signal-tracker/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(5))
            .timeout(timeout)
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;
        Ok(Self {
            http,
            api_key,
            model: model.to_string(),
        })
    }
}

#[derive(Serialize)]
struct Msg<'a> {
    role: &'a str,
    content: &'a str,
}
#[derive(Serialize)]
struct Req<'a> {
    model: &'a str,
    messages: Vec<Msg<'a>>,
    temperature: f32,
}
#[derive(Deserialize)]
struct Resp {
    choices: Vec<Choice>,
}
#[derive(Deserialize)]
struct Choice {
    message: ChoiceMsg,
}
#[derive(Deserialize)]
struct ChoiceMsg {
    #[serde(default)]
    content: Option<String>,
}

#[async_trait]
impl LlmClient for OpenAiClient {
    async fn complete(&self, instructions: &str, input: &str) -> Result<String, LlmError> {
        let req = Req {
            model: &self.model,
            messages: vec![
                Msg {
                    role: "system",
                    content: instructions,
                },
                Msg {
                    role: "user",
                    content: input,
                },
            ],
            temperature: 0.2,
        };

        let resp = self
            .http
            .post("https://api.openai.com/v1/chat/completions")
            .bearer_auth(&self.api_key)
            .json(&req)
            .send()
            .await
            .map_err(|e| LlmError::Transport(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(LlmError::Status(status.as_u16()));
        }

        let body: Resp = resp
            .json()
            .await
            .map_err(|e| LlmError::Decode(e.to_string()))?;
        let content = body
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();
        if content.trim().is_empty() {
            return Err(LlmError::Empty);
        }
        Ok(content)
    }

    fn provider_name(&self) -> &'static str {
        "openai"
    }
}

/// Replays canned responses in order and records every call.
/// Once the script runs out every call fails with [`LlmError::Empty`].
#[derive(Default)]
pub struct ScriptedClient {
    script: Mutex<VecDeque<Result<String, LlmError>>>,
    calls: Mutex<Vec<(String, String)>>,
}

impl ScriptedClient {
    pub fn new<I>(responses: I) -> Self
    where
        I: IntoIterator<Item = Result<String, LlmError>>,
    {
        Self {
            script: Mutex::new(responses.into_iter().collect()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Every call answered with the same successful text.
    pub fn replies<S: Into<String>>(texts: impl IntoIterator<Item = S>) -> Self {
        Self::new(texts.into_iter().map(|t| Ok(t.into())))
    }

    /// `(instructions, input)` of every call so far.
    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().expect("poisoned calls").clone()
    }
}

#[async_trait]
impl LlmClient for ScriptedClient {
    async fn complete(&self, instructions: &str, input: &str) -> Result<String, LlmError> {
        self.calls
            .lock()
            .expect("poisoned calls")
            .push((instructions.to_string(), input.to_string()));
        self.script
            .lock()
            .expect("poisoned script")
            .pop_front()
            .unwrap_or(Err(LlmError::Empty))
    }

    fn provider_name(&self) -> &'static str {
        "scripted"
    }
}

/// Collapse to one line of printable text, capped at `max_chars` characters.
pub fn sanitize_line(input: &str, max_chars: usize) -> String {
    let mut out = String::with_capacity(max_chars.min(input.len()));
    let mut prev_space = false;
    let mut count = 0usize;
    for ch in input.chars() {
        let c = if ch.is_control() || ch.is_whitespace() {
            ' '
        } else {
            ch
        };
        if c == ' ' {
            if prev_space || out.is_empty() {
                continue;
            }
            prev_space = true;
        } else {
            prev_space = false;
        }
        if count >= max_chars {
            break;
        }
        out.push(c);
        count += 1;
    }
    out.trim_end().to_string()
}
