//! Language-model collaborator.
//!
//! [`LanguageModel`] is a blocking chat-completion call: role-tagged
//! messages in, generated text out. [`OpenAiClient`] speaks the OpenAI
//! `/chat/completions` wire format over ureq, so any compatible server works.

use log::{debug, trace};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

/// One completion call: messages plus sampling bounds.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub messages: Vec<ChatMessage>,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl CompletionRequest {
    #[must_use]
    pub fn new(max_tokens: u32, temperature: f32) -> Self {
        Self {
            messages: Vec::new(),
            max_tokens,
            temperature,
        }
    }

    #[must_use]
    pub fn system(mut self, content: impl Into<String>) -> Self {
        self.messages.push(ChatMessage {
            role: Role::System,
            content: content.into(),
        });
        self
    }

    #[must_use]
    pub fn user(mut self, content: impl Into<String>) -> Self {
        self.messages.push(ChatMessage {
            role: Role::User,
            content: content.into(),
        });
        self
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("no API key configured (set OPENAI_API_KEY)")]
    MissingApiKey,

    #[error("request failed: {0}")]
    Transport(String),

    #[error("service returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("response contained no text")]
    Empty,
}

/// Blocking chat-completion service.
pub trait LanguageModel: Send + Sync {
    /// Generated text, trimmed.
    fn complete(&self, request: &CompletionRequest) -> Result<String, LlmError>;
}

/// OpenAI-compatible HTTP client.
pub struct OpenAiClient {
    agent: ureq::Agent,
    base_url: String,
    model: String,
    api_key: Option<String>,
}

#[derive(Serialize)]
struct ChatCompletionBody<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatCompletion {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

impl OpenAiClient {
    /// The key is not checked here; a missing key fails the first call.
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            agent: ureq::AgentBuilder::new().timeout(timeout).build(),
            base_url: base_url.into(),
            model: model.into(),
            api_key: api_key.filter(|key| !key.trim().is_empty()),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

impl LanguageModel for OpenAiClient {
    fn complete(&self, request: &CompletionRequest) -> Result<String, LlmError> {
        let api_key = self.api_key.as_deref().ok_or(LlmError::MissingApiKey)?;

        let body = ChatCompletionBody {
            model: &self.model,
            messages: &request.messages,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
        };

        let url = self.endpoint();
        debug!("POST {url} ({} messages)", request.messages.len());

        let response = match self
            .agent
            .post(&url)
            .set("Authorization", &format!("Bearer {api_key}"))
            .send_json(&body)
        {
            Ok(response) => response,
            Err(ureq::Error::Status(status, response)) => {
                let body = response.into_string().unwrap_or_default();
                return Err(LlmError::Status {
                    status,
                    body: body.chars().take(200).collect(),
                });
            }
            Err(e) => return Err(LlmError::Transport(e.to_string())),
        };

        let completion: ChatCompletion = response
            .into_json()
            .map_err(|e| LlmError::Malformed(e.to_string()))?;
        extract_text(completion)
    }
}

fn extract_text(completion: ChatCompletion) -> Result<String, LlmError> {
    let text = completion
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .map(|content| content.trim().to_string())
        .unwrap_or_default();

    if text.is_empty() {
        return Err(LlmError::Empty);
    }
    trace!("Model replied with {} chars", text.len());
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_body_shape() {
        let request = CompletionRequest::new(50, 0.8)
            .system("You are a kind and motivational assistant.")
            .user("hello");
        let body = ChatCompletionBody {
            model: DEFAULT_MODEL,
            messages: &request.messages,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
        };

        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["model"], "gpt-3.5-turbo");
        assert_eq!(json["max_tokens"], 50);
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["role"], "user");
        assert_eq!(json["messages"][1]["content"], "hello");
    }

    #[test]
    fn test_extract_text_trims_first_choice() {
        let completion: ChatCompletion = serde_json::from_str(
            r#"{"choices":[{"message":{"role":"assistant","content":"  Keep going.\n"}},
                           {"message":{"role":"assistant","content":"ignored"}}]}"#,
        )
        .unwrap();
        assert_eq!(extract_text(completion).unwrap(), "Keep going.");
    }

    #[test]
    fn test_extract_text_empty() {
        let completion: ChatCompletion = serde_json::from_str(r#"{"choices":[]}"#).unwrap();
        assert!(matches!(extract_text(completion), Err(LlmError::Empty)));

        let completion: ChatCompletion =
            serde_json::from_str(r#"{"choices":[{"message":{"content":null}}]}"#).unwrap();
        assert!(matches!(extract_text(completion), Err(LlmError::Empty)));
    }

    #[test]
    fn test_missing_key_fails_at_call_time() {
        let client = OpenAiClient::new(DEFAULT_API_BASE, DEFAULT_MODEL, None, Duration::from_secs(1));
        let request = CompletionRequest::new(10, 0.8).user("hi");
        assert!(matches!(client.complete(&request), Err(LlmError::MissingApiKey)));

        let blank = OpenAiClient::new(
            DEFAULT_API_BASE,
            DEFAULT_MODEL,
            Some("  ".to_string()),
            Duration::from_secs(1),
        );
        assert!(matches!(blank.complete(&request), Err(LlmError::MissingApiKey)));
    }

    #[test]
    fn test_endpoint_joins_cleanly() {
        let client = OpenAiClient::new(
            "http://localhost:8080/v1/",
            DEFAULT_MODEL,
            None,
            Duration::from_secs(1),
        );
        assert_eq!(client.endpoint(), "http://localhost:8080/v1/chat/completions");
    }
}
