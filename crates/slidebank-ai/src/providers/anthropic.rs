//! Anthropic Messages API (`/v1/messages`).

use super::{base_url, check_status, http_client, pricing};
use crate::error::{AiError, AiResult};
use crate::generator::Generator;
use crate::types::{Completion, Persona, Pricing, Usage};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use slidebank_config::ProviderConfig;
use tracing::debug;

const DEFAULT_BASE: &str = "https://api.anthropic.com";
const API_VERSION: &str = "2023-06-01";

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    system: String,
    messages: Vec<Message<'a>>,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
    usage: MessagesUsage,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
struct MessagesUsage {
    input_tokens: u32,
    output_tokens: u32,
}

/// Generator backed by Claude models.
#[derive(Clone)]
pub struct AnthropicGenerator {
    client: Client,
    base: String,
    model: String,
    api_key: String,
    temperature: f32,
    max_tokens: u32,
    timeout_seconds: u64,
    pricing: Pricing,
}

impl AnthropicGenerator {
    pub fn from_config(name: &str, config: &ProviderConfig) -> AiResult<Self> {
        let api_key = config.resolved_api_key().ok_or_else(|| AiError::MissingApiKey {
            provider: name.to_string(),
        })?;

        Ok(Self {
            client: http_client(config.timeout_seconds)?,
            base: base_url(&config.endpoint, DEFAULT_BASE),
            model: config.model.clone(),
            api_key,
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            timeout_seconds: config.timeout_seconds,
            pricing: pricing(config),
        })
    }

    fn request<'a>(&'a self, persona: &Persona, prompt: &'a str) -> MessagesRequest<'a> {
        MessagesRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            system: persona.system_prompt(),
            messages: vec![Message {
                role: "user",
                content: prompt,
            }],
        }
    }

    fn completion(&self, response: MessagesResponse) -> AiResult<Completion> {
        let content: String = response
            .content
            .into_iter()
            .filter(|block| block.kind == "text")
            .map(|block| block.text)
            .collect::<Vec<_>>()
            .join("");
        if content.trim().is_empty() {
            return Err(AiError::EmptyResponse {
                provider: "anthropic".to_string(),
            });
        }

        let usage = Usage::new(response.usage.input_tokens, response.usage.output_tokens);
        Ok(Completion {
            content,
            cost: self.pricing.cost(&usage),
            usage,
        })
    }
}

#[async_trait]
impl Generator for AnthropicGenerator {
    async fn generate(&self, persona: &Persona, prompt: &str) -> AiResult<Completion> {
        let url = format!("{}/v1/messages", self.base);
        debug!("Generating with Anthropic model {}", self.model);

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&self.request(persona, prompt))
            .send()
            .await
            .map_err(|e| AiError::from_request(e, &self.base, self.timeout_seconds))?;

        let response = check_status(response, &self.model).await?;
        let body: MessagesResponse = response.json().await?;
        self.completion(body)
    }

    fn provider(&self) -> &str {
        "anthropic"
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

    fn generator() -> AnthropicGenerator {
        AnthropicGenerator::from_config(
            "claude",
            &ProviderConfig {
                driver: ProviderDriver::Anthropic,
                model: "claude-3-5-haiku-latest".to_string(),
                api_key: Some("key".to_string()),
                input_price_per_1m: 1.0,
                output_price_per_1m: 5.0,
                ..Default::default()
            },
        )
        .unwrap()
    }

    #[test]
    fn test_request_body() {
        let generator = generator();
        assert_eq!(generator.base, DEFAULT_BASE);
        let body = serde_json::to_value(generator.request(&PRESENTATION_ARCHIVIST, "Summarize")).unwrap();
        assert_eq!(body["max_tokens"], 512);
        assert_eq!(body["messages"][0]["role"], "user");
        assert!(body["system"].as_str().unwrap().contains("archivist"));
    }

    #[test]
    fn test_response_joins_text_blocks() {
        let body: MessagesResponse = serde_json::from_str(
            r#"{"content":[{"type":"text","text":"Market "},{"type":"text","text":"Overview"}],
                "usage":{"input_tokens":200000,"output_tokens":100000}}"#,
        )
        .unwrap();
        let completion = generator().completion(body).unwrap();
        assert_eq!(completion.content, "Market Overview");
        assert_eq!(completion.usage.total_tokens, 300000);
        assert!((completion.cost - 0.7).abs() < 1e-9);
    }
}
