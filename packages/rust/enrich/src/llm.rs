//! Minimal client for an OpenAI-compatible chat completions endpoint.
//!
//! Works against OpenRouter (the default) or any API speaking the same
//! request format; only the non-streaming, single-choice path is needed
//! here.

use docketwatch_shared::{DocketwatchError, EnrichmentConfig, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Low temperature keeps summaries and yes/no classifications stable.
const TEMPERATURE: f32 = 0.2;

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: String,
}

/// Chat completions client bound to one endpoint, key, and model.
pub(crate) struct ChatClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl ChatClient {
    pub(crate) fn new(http: reqwest::Client, config: &EnrichmentConfig, api_key: String) -> Self {
        Self {
            http,
            base_url: config.base_url.clone(),
            api_key,
            model: config.model.clone(),
        }
    }

    pub(crate) fn model(&self) -> &str {
        &self.model
    }

    fn completions_url(&self) -> String {
        let base = self.base_url.trim_end_matches('/');
        format!("{base}/chat/completions")
    }

    /// Send a system + user message pair and return the assistant's text.
    pub(crate) async fn complete(
        &self,
        system: &str,
        user: &str,
        max_tokens: u32,
    ) -> Result<String> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: user,
                },
            ],
            max_tokens,
            temperature: TEMPERATURE,
        };

        debug!(model = %self.model, "sending chat completion request");

        let response = self
            .http
            .post(self.completions_url())
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await
            .map_err(|e| DocketwatchError::enrichment(format!("model request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            // Clip char-wise; a byte cut could land inside a multi-byte
            // character and panic.
            let snippet: String = body.chars().take(200).collect();
            return Err(DocketwatchError::enrichment(format!(
                "model returned HTTP {status}: {snippet}"
            )));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| DocketwatchError::enrichment(format!("invalid model response: {e}")))?;

        parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| DocketwatchError::enrichment("model response had no choices"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_client(base_url: &str) -> ChatClient {
        let config = EnrichmentConfig {
            base_url: base_url.to_string(),
            model: "test-model".into(),
            ..Default::default()
        };
        ChatClient::new(reqwest::Client::new(), &config, "test-key".into())
    }

    #[tokio::test]
    async fn returns_assistant_content() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer test-key"))
            .and(body_partial_json(json!({"model": "test-model"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"role": "assistant", "content": "Affirmed."}}]
            })))
            .mount(&server)
            .await;

        let content = test_client(&server.uri())
            .complete("You summarize court decisions.", "Summarize this.", 64)
            .await
            .expect("completion");
        assert_eq!(content, "Affirmed.");
    }

    #[tokio::test]
    async fn error_status_is_surfaced() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(500).set_body_string("upstream broke"))
            .mount(&server)
            .await;

        let err = test_client(&server.uri())
            .complete("sys", "user", 64)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("500"));
    }

    #[tokio::test]
    async fn error_body_is_clipped_on_a_char_boundary() {
        let server = MockServer::start().await;
        // Byte 200 lands inside the two-byte 'é'.
        let body = format!("{}é rest of the upstream error page", "a".repeat(199));
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(500).set_body_string(body))
            .mount(&server)
            .await;

        let err = test_client(&server.uri())
            .complete("sys", "user", 64)
            .await
            .unwrap_err();
        let message = err.to_string();
        assert!(message.contains("500"));
        assert!(message.contains('é'));
        assert!(!message.contains("rest of the upstream error page"));
    }

    #[tokio::test]
    async fn empty_choices_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
            .mount(&server)
            .await;

        let err = test_client(&server.uri())
            .complete("sys", "user", 64)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("no choices"));
    }

    #[test]
    fn trailing_slash_on_base_url_is_tolerated() {
        let client = test_client("https://openrouter.ai/api/v1/");
        assert_eq!(
            client.completions_url(),
            "https://openrouter.ai/api/v1/chat/completions"
        );
    }
}
