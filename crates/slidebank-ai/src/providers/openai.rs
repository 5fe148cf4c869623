//! OpenAI and OpenAI-compatible servers (`/chat/completions`).

use super::{base_url, check_status, http_client, pricing};
use crate::error::{AiError, AiResult};
use crate::generator::Generator;
use crate::types::{Completion, Persona, Pricing, Usage};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use slidebank_config::ProviderConfig;
use tracing::debug;

const DEFAULT_BASE: &str = "https://api.openai.com/v1";

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
}

/// Generator speaking the chat-completions protocol.
///
/// The API key is optional so self-hosted compatible servers work unauthenticated.
#[derive(Clone)]
pub struct OpenAiGenerator {
    client: Client,
    base: String,
    model: String,
    api_key: Option<String>,
    temperature: f32,
    max_tokens: u32,
    timeout_seconds: u64,
    pricing: Pricing,
}

impl OpenAiGenerator {
    pub fn from_config(name: &str, config: &ProviderConfig) -> AiResult<Self> {
        let base = base_url(&config.endpoint, DEFAULT_BASE);
        let api_key = config.resolved_api_key();
        if api_key.is_none() && base == DEFAULT_BASE {
            return Err(AiError::MissingApiKey {
                provider: name.to_string(),
            });
        }

        Ok(Self {
            client: http_client(config.timeout_seconds)?,
            base,
            model: config.model.clone(),
            api_key,
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            timeout_seconds: config.timeout_seconds,
            pricing: pricing(config),
        })
    }

    fn request<'a>(&'a self, persona: &Persona, prompt: &str) -> ChatRequest<'a> {
        ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: persona.system_prompt(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: prompt.to_string(),
                },
            ],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        }
    }

    fn completion(&self, response: ChatResponse) -> AiResult<Completion> {
        let content = response
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| AiError::EmptyResponse {
                provider: "openai".to_string(),
            })?;

        let usage = response
            .usage
            .map(|u| Usage::new(u.prompt_tokens, u.completion_tokens))
            .unwrap_or_default();
        Ok(Completion {
            content,
            cost: self.pricing.cost(&usage),
            usage,
        })
    }
}

#[async_trait]
impl Generator for OpenAiGenerator {
    async fn generate(&self, persona: &Persona, prompt: &str) -> AiResult<Completion> {
        let url = format!("{}/chat/completions", self.base);
        debug!("Generating with chat model {}", self.model);

        let mut request = self.client.post(&url).json(&self.request(persona, prompt));
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| AiError::from_request(e, &self.base, self.timeout_seconds))?;

        let response = check_status(response, &self.model).await?;
        let body: ChatResponse = response.json().await?;
        self.completion(body)
    }

    fn provider(&self) -> &str {
        "openai"
    }

    fn model(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PRESENTATION_ARCHIVIST;
    use slidebank_config::ProviderDriver;

    fn config() -> ProviderConfig {
        ProviderConfig {
            driver: ProviderDriver::OpenAi,
            model: "gpt-4o-mini".to_string(),
            api_key: Some("sk-test".to_string()),
            input_price_per_1m: 0.15,
            output_price_per_1m: 0.60,
            ..Default::default()
        }
    }

    #[test]
    fn test_request_body() {
        let generator = OpenAiGenerator::from_config("openai", &config()).unwrap();
        let body = serde_json::to_value(generator.request(&PRESENTATION_ARCHIVIST, "Title?")).unwrap();
        assert_eq!(body["model"], "gpt-4o-mini");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "Title?");
    }

    #[test]
    fn test_response_cost() {
        let generator = OpenAiGenerator::from_config("openai", &config()).unwrap();
        let body: ChatResponse = serde_json::from_str(
            r#"{"choices":[{"index":0,"message":{"role":"assistant","content":"Q3 Review"}}],
                "usage":{"prompt_tokens":1000000,"completion_tokens":1000000,"total_tokens":2000000}}"#,
        )
        .unwrap();
        let completion = generator.completion(body).unwrap();
        assert_eq!(completion.content, "Q3 Review");
        assert!((completion.cost - 0.75).abs() < 1e-9);
    }

    #[test]
    fn test_compatible_server_without_key() {
        let local = ProviderConfig {
            endpoint: "http://localhost:8080/v1".to_string(),
            api_key: None,
            ..config()
        };
        let generator = OpenAiGenerator::from_config("local", &local).unwrap();
        assert!(generator.api_key.is_none());

        let hosted = ProviderConfig {
            api_key: None,
            ..config()
        };
        assert!(matches!(
            OpenAiGenerator::from_config("openai", &hosted),
            Err(AiError::MissingApiKey { .. })
        ));
    }

    #[test]
    fn test_no_choices() {
        let generator = OpenAiGenerator::from_config("openai", &config()).unwrap();
        let body: ChatResponse = serde_json::from_str(r#"{"choices":[]}"#).unwrap();
        assert!(matches!(
            generator.completion(body),
            Err(AiError::EmptyResponse { .. })
        ));
    }
}
