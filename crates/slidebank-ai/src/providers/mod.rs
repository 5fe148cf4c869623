//! One [`Generator`] per provider protocol.

mod anthropic;
mod mock;
mod ollama;
mod openai;

pub use anthropic::AnthropicGenerator;
pub use mock::MockGenerator;
pub use ollama::OllamaGenerator;
pub use openai::OpenAiGenerator;

use crate::error::{AiError, AiResult};
use crate::generator::Generator;
use crate::types::Pricing;
use reqwest::{Client, Response};
use slidebank_config::{ProviderConfig, ProviderDriver};
use std::sync::Arc;
use std::time::Duration;

/// Build the generator for a configured provider.
pub fn from_config(name: &str, config: &ProviderConfig) -> AiResult<Arc<dyn Generator>> {
    if config.model.trim().is_empty() && config.driver != ProviderDriver::Mock {
        return Err(AiError::InvalidConfig(format!("provider '{}' has no model", name)));
    }

    let generator: Arc<dyn Generator> = match config.driver {
        ProviderDriver::Ollama => Arc::new(OllamaGenerator::from_config(config)?),
        ProviderDriver::OpenAi => Arc::new(OpenAiGenerator::from_config(name, config)?),
        ProviderDriver::Anthropic => Arc::new(AnthropicGenerator::from_config(name, config)?),
        ProviderDriver::Mock => Arc::new(MockGenerator::new(&config.model)),
    };
    Ok(generator)
}

fn http_client(timeout_seconds: u64) -> AiResult<Client> {
    Client::builder()
        .timeout(Duration::from_secs(timeout_seconds))
        .build()
        .map_err(AiError::Http)
}

fn base_url(configured: &str, default: &str) -> String {
    let base = if configured.trim().is_empty() {
        default
    } else {
        configured.trim()
    };
    base.trim_end_matches('/').to_string()
}

fn pricing(config: &ProviderConfig) -> Pricing {
    Pricing {
        input_per_1m: config.input_price_per_1m,
        output_per_1m: config.output_price_per_1m,
    }
}

/// Turn a non-success status into an error carrying the response body.
async fn check_status(response: Response, model: &str) -> AiResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let message = response.text().await.unwrap_or_default();
    if status.as_u16() == 404 && message.contains("model") {
        return Err(AiError::ModelNotFound {
            model: model.to_string(),
        });
    }
    Err(AiError::ApiError {
        status: status.as_u16(),
        message,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url() {
        assert_eq!(base_url("", "http://localhost:11434"), "http://localhost:11434");
        assert_eq!(base_url("http://gpu-box:8080/v1/", "x"), "http://gpu-box:8080/v1");
    }

    #[test]
    fn test_from_config_selects_driver() {
        let config = ProviderConfig {
            driver: ProviderDriver::Mock,
            model: "mock-1".to_string(),
            ..Default::default()
        };
        let generator = from_config("test", &config).unwrap();
        assert_eq!(generator.provider(), "mock");
        assert_eq!(generator.model(), "mock-1");

        let generator = from_config("local", &ProviderConfig::default()).unwrap();
        assert_eq!(generator.provider(), "ollama");
    }

    #[test]
    fn test_from_config_requires_model() {
        let config = ProviderConfig {
            model: " ".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            from_config("local", &config),
            Err(AiError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_paid_provider_requires_key() {
        let config = ProviderConfig {
            driver: ProviderDriver::Anthropic,
            model: "claude-3-5-haiku-latest".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            from_config("claude", &config),
            Err(AiError::MissingApiKey { .. })
        ));
    }
}
