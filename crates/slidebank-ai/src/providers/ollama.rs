//! Local Ollama server (`/api/generate`).

use super::{base_url, check_status, http_client, pricing};
use crate::error::{AiError, AiResult};
use crate::generator::Generator;
use crate::types::{Completion, Persona, Pricing, Usage};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use slidebank_config::ProviderConfig;
use tracing::debug;

const DEFAULT_HOST: &str = "http://localhost:11434";

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    system: String,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Debug, Serialize)]
struct GenerateOptions {
    temperature: f32,
    num_predict: u32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
    #[serde(default)]
    prompt_eval_count: Option<u32>,
    #[serde(default)]
    eval_count: Option<u32>,
}

/// Generator backed by an Ollama server.
#[derive(Clone)]
pub struct OllamaGenerator {
    client: Client,
    host: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
    timeout_seconds: u64,
    pricing: Pricing,
}

impl OllamaGenerator {
    pub fn from_config(config: &ProviderConfig) -> AiResult<Self> {
        Ok(Self {
            client: http_client(config.timeout_seconds)?,
            host: base_url(&config.endpoint, DEFAULT_HOST),
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            timeout_seconds: config.timeout_seconds,
            pricing: pricing(config),
        })
    }

    fn request<'a>(&'a self, persona: &Persona, prompt: &'a str) -> GenerateRequest<'a> {
        GenerateRequest {
            model: &self.model,
            prompt,
            system: persona.system_prompt(),
            stream: false,
            options: GenerateOptions {
                temperature: self.temperature,
                num_predict: self.max_tokens,
            },
        }
    }

    fn completion(&self, response: GenerateResponse) -> AiResult<Completion> {
        if response.response.trim().is_empty() {
            return Err(AiError::EmptyResponse {
                provider: "ollama".to_string(),
            });
        }
        let usage = Usage::new(
            response.prompt_eval_count.unwrap_or(0),
            response.eval_count.unwrap_or(0),
        );
        Ok(Completion {
            content: response.response,
            cost: self.pricing.cost(&usage),
            usage,
        })
    }
}

#[async_trait]
impl Generator for OllamaGenerator {
    async fn generate(&self, persona: &Persona, prompt: &str) -> AiResult<Completion> {
        let url = format!("{}/api/generate", self.host);
        debug!("Generating with Ollama model {}", self.model);

        let response = self
            .client
            .post(&url)
            .json(&self.request(persona, prompt))
            .send()
            .await
            .map_err(|e| AiError::from_request(e, &self.host, self.timeout_seconds))?;

        let response = check_status(response, &self.model).await?;
        let body: GenerateResponse = response.json().await?;
        self.completion(body)
    }

    fn provider(&self) -> &str {
        "ollama"
    }

    fn model(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PRESENTATION_ARCHIVIST;

    fn generator() -> OllamaGenerator {
        OllamaGenerator::from_config(&ProviderConfig::default()).unwrap()
    }

    #[test]
    fn test_request_body() {
        let generator = generator();
        let body = serde_json::to_value(generator.request(&PRESENTATION_ARCHIVIST, "Summarize")).unwrap();
        assert_eq!(body["model"], "llama3.1");
        assert_eq!(body["prompt"], "Summarize");
        assert_eq!(body["stream"], false);
        assert_eq!(body["options"]["num_predict"], 512);
        assert!(body["system"].as_str().unwrap().contains("archivist"));
    }

    #[test]
    fn test_response_usage() {
        let body: GenerateResponse = serde_json::from_str(
            r#"{"model":"llama3.1","response":"Revenue grew.","done":true,"prompt_eval_count":40,"eval_count":6}"#,
        )
        .unwrap();
        let completion = generator().completion(body).unwrap();
        assert_eq!(completion.content, "Revenue grew.");
        assert_eq!(completion.usage.total_tokens, 46);
        assert_eq!(completion.cost, 0.0);
    }

    #[test]
    fn test_empty_response() {
        let body: GenerateResponse = serde_json::from_str(r#"{"response":"  "}"#).unwrap();
        assert!(matches!(
            generator().completion(body),
            Err(AiError::EmptyResponse { .. })
        ));
    }
}
