//! Offline generator for tests and dry runs.

use crate::error::AiResult;
use crate::generator::Generator;
use crate::types::{truncate_chars, Completion, Persona, Usage};
use async_trait::async_trait;

/// Echoes the start of the prompt with fixed usage.
#[derive(Debug, Clone)]
pub struct MockGenerator {
    model: String,
}

impl MockGenerator {
    pub fn new(model: &str) -> Self {
        let model = if model.is_empty() { "mock" } else { model };
        Self {
            model: model.to_string(),
        }
    }
}

impl Default for MockGenerator {
    fn default() -> Self {
        Self::new("mock")
    }
}

#[async_trait]
impl Generator for MockGenerator {
    async fn generate(&self, _persona: &Persona, prompt: &str) -> AiResult<Completion> {
        Ok(Completion {
            content: format!("[MOCK for: {}...]", truncate_chars(prompt, 30)),
            usage: Usage::new(10, 20),
            cost: 0.0,
        })
    }

    fn provider(&self) -> &str {
        "mock"
    }

    fn model(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PRESENTATION_ARCHIVIST;

    #[tokio::test]
    async fn test_mock_is_deterministic() {
        let generator = MockGenerator::default();
        let first = generator.generate(&PRESENTATION_ARCHIVIST, "Revenue up 12% year over year in every region").await.unwrap();
        let second = generator.generate(&PRESENTATION_ARCHIVIST, "Revenue up 12% year over year in every region").await.unwrap();
        assert_eq!(first, second);
        assert_eq!(first.content, "[MOCK for: Revenue up 12% year over year ...]");
        assert_eq!(first.usage.total_tokens, 30);
    }
}
