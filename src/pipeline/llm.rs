use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::LlmConfig;
use crate::errors::LlmError;

/// Chat-completion backend used by the generation pipeline.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Model identifier recorded with every generation attempt.
    fn model_name(&self) -> &str;

    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String, LlmError>;
}

/// Mistral chat-completions client (`POST {base_url}/chat/completions`).
pub struct MistralClient {
    api_key: Option<String>,
    base_url: String,
    model: String,
    temperature: f32,
    client: Client,
}

impl MistralClient {
    pub fn new(config: &LlmConfig) -> Result<Self, LlmError> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self {
            api_key: config.api_key.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            temperature: config.temperature,
            client,
        })
    }

    fn headers(&self) -> Result<HeaderMap, LlmError> {
        let api_key = self
            .api_key
            .as_deref()
            .filter(|key| !key.trim().is_empty())
            .ok_or(LlmError::MissingApiKey)?;

        let mut headers = HeaderMap::new();
        let auth = format!("Bearer {}", api_key.trim());
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&auth).map_err(|_| LlmError::MissingApiKey)?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(headers)
    }
}

#[async_trait]
impl LlmClient for MistralClient {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String, LlmError> {
        let headers = self.headers()?;
        let body = ChatRequest {
            model: &self.model,
            temperature: self.temperature,
            response_format: ResponseFormat {
                kind: "json_object",
            },
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: user_prompt,
                },
            ],
        };

        tracing::debug!(
            model = %self.model,
            system_prompt_chars = system_prompt.len(),
            user_prompt_chars = user_prompt.len(),
            "Sending chat completion request"
        );

        let resp = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .headers(headers)
            .json(&body)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let text = resp
                .text()
                .await
                .unwrap_or_else(|_| "<body unavailable>".to_string());
            return Err(LlmError::Status { status, body: text });
        }

        let parsed: ChatResponse = resp.json().await?;
        parsed
            .choices
            .into_iter()
            .find_map(|choice| choice.message.content)
            .ok_or(LlmError::EmptyResponse)
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    response_format: ResponseFormat,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: AssistantMessage,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn config(api_key: Option<&str>) -> LlmConfig {
        LlmConfig {
            api_key: api_key.map(str::to_string),
            base_url: "https://api.mistral.ai/v1/".to_string(),
            model: "mistral-small-latest".to_string(),
            temperature: 0.2,
            request_timeout: Duration::from_secs(5),
        }
    }

    #[tokio::test]
    async fn missing_api_key_fails_before_sending() {
        let client = MistralClient::new(&config(None)).unwrap();
        let err = client.complete("system", "user").await.unwrap_err();
        assert!(matches!(err, LlmError::MissingApiKey));
    }

    #[test]
    fn trailing_slash_is_trimmed() {
        let client = MistralClient::new(&config(Some("key"))).unwrap();
        assert_eq!(client.base_url, "https://api.mistral.ai/v1");
        assert_eq!(client.model_name(), "mistral-small-latest");
    }

    #[test]
    fn response_content_is_extracted() {
        let parsed: ChatResponse = serde_json::from_str(
            r#"{"choices":[{"message":{"role":"assistant","content":"{\"title\":\"X\"}"}}]}"#,
        )
        .unwrap();
        assert_eq!(
            parsed.choices[0].message.content.as_deref(),
            Some("{\"title\":\"X\"}")
        );
    }
}
