//! Enrichment prompts on top of a [`Generator`].

use crate::error::{AiError, AiResult};
use crate::generator::Generator;
use crate::providers;
use crate::types::{truncate_chars, Completion, PRESENTATION_ARCHIVIST};
use async_trait::async_trait;
use chrono::Utc;
use slidebank_config::AiConfig;
use slidebank_core::{AiUsageRecord, Repository};
use std::sync::Arc;
use tracing::{debug, warn};

/// Longest slide or deck text sent in a single prompt.
const DEFAULT_MAX_INPUT_CHARS: usize = 8_000;

/// Summaries and titles for slides and decks.
///
/// Every call is fallible; callers treat a failure as "no enrichment".
#[async_trait]
pub trait Enricher: Send + Sync {
    /// One or two sentences about a slide, or about a deck when given the
    /// joined slide summaries.
    async fn summarize(&self, text: &str) -> AiResult<Completion>;

    /// Deck title from the text of its first slide.
    async fn extract_title(&self, first_slide_text: &str) -> AiResult<Completion>;

    /// Short slide title from its content.
    async fn extract_slide_title(&self, slide_text: &str) -> AiResult<Completion>;

    /// Short slide title from reviewer comments and speaker notes.
    async fn extract_title_from_comments(&self, comments: &str) -> AiResult<Completion>;
}

/// The configured provider wrapped with the archivist prompts.
#[derive(Clone)]
pub struct AiClient {
    generator: Arc<dyn Generator>,
    usage_log: Option<Arc<dyn Repository>>,
    max_input_chars: usize,
}

impl AiClient {
    /// Select the active provider once.
    pub fn from_config(config: &AiConfig) -> AiResult<Self> {
        let provider = config.active().ok_or_else(|| {
            AiError::InvalidConfig(format!(
                "active provider '{}' is not configured",
                config.active_provider
            ))
        })?;
        let generator = providers::from_config(&config.active_provider, provider)?;
        debug!(
            "AI provider '{}' ({} / {})",
            config.active_provider,
            generator.provider(),
            generator.model()
        );
        let client = Self::new(generator);
        Ok(match config.max_input_chars {
            Some(max) => client.with_max_input_chars(max),
            None => client,
        })
    }

    pub fn new(generator: Arc<dyn Generator>) -> Self {
        Self {
            generator,
            usage_log: None,
            max_input_chars: DEFAULT_MAX_INPUT_CHARS,
        }
    }

    /// Record the usage of every successful call.
    pub fn with_usage_log(mut self, repository: Arc<dyn Repository>) -> Self {
        self.usage_log = Some(repository);
        self
    }

    pub fn with_max_input_chars(mut self, max_input_chars: usize) -> Self {
        self.max_input_chars = max_input_chars;
        self
    }

    pub fn provider(&self) -> &str {
        self.generator.provider()
    }

    pub fn model(&self) -> &str {
        self.generator.model()
    }

    async fn ask(&self, instruction: &str, content: &str) -> AiResult<Completion> {
        let prompt = format!("{}{}", instruction, truncate_chars(content, self.max_input_chars));
        let completion = self
            .generator
            .generate(&PRESENTATION_ARCHIVIST, &prompt)
            .await?;
        self.record(&completion);
        Ok(completion)
    }

    fn record(&self, completion: &Completion) {
        let Some(repository) = &self.usage_log else {
            return;
        };
        let record = AiUsageRecord {
            provider: self.generator.provider().to_string(),
            model: self.generator.model().to_string(),
            prompt_tokens: completion.usage.prompt_tokens,
            completion_tokens: completion.usage.completion_tokens,
            total_tokens: completion.usage.total_tokens,
            cost: completion.cost,
            created_at: Utc::now(),
        };
        if let Err(e) = repository.log_ai_usage(&record) {
            warn!("Failed to record AI usage: {}", e);
        }
    }
}

#[async_trait]
impl Enricher for AiClient {
    async fn summarize(&self, text: &str) -> AiResult<Completion> {
        self.ask(
            "Summarize the following text from a presentation slide in one or two concise sentences: ",
            text,
        )
        .await
    }

    async fn extract_title(&self, first_slide_text: &str) -> AiResult<Completion> {
        self.ask(
            "Based on the following text from the first slide of a presentation, extract the main title of the deck: ",
            first_slide_text,
        )
        .await
    }

    async fn extract_slide_title(&self, slide_text: &str) -> AiResult<Completion> {
        self.ask(
            "Generate a very short title (max 5 words) for this slide content: ",
            slide_text,
        )
        .await
    }

    async fn extract_title_from_comments(&self, comments: &str) -> AiResult<Completion> {
        self.ask(
            "Generate a very short title (max 5 words) for a slide based on these user comments: ",
            comments,
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::MockGenerator;
    use crate::types::{Persona, Usage};
    use slidebank_config::{ProviderConfig, ProviderDriver};
    use slidebank_db::Database;
    use std::sync::Mutex;

    /// Remembers every prompt it receives.
    #[derive(Default)]
    struct RecordingGenerator {
        prompts: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Generator for RecordingGenerator {
        async fn generate(&self, _persona: &Persona, prompt: &str) -> AiResult<Completion> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            Ok(Completion {
                content: "ok".to_string(),
                usage: Usage::new(100, 10),
                cost: 0.01,
            })
        }

        fn provider(&self) -> &str {
            "recording"
        }

        fn model(&self) -> &str {
            "r-1"
        }
    }

    #[tokio::test]
    async fn test_prompts() {
        let generator = Arc::new(RecordingGenerator::default());
        let client = AiClient::new(generator.clone());

        client.summarize("Revenue up 12%").await.unwrap();
        client.extract_slide_title("Revenue up 12%").await.unwrap();
        client.extract_title_from_comments("Ana: use the new numbers").await.unwrap();

        let prompts = generator.prompts.lock().unwrap();
        assert!(prompts[0].starts_with("Summarize the following text"));
        assert!(prompts[0].ends_with("Revenue up 12%"));
        assert!(prompts[1].contains("max 5 words"));
        assert!(prompts[2].ends_with("Ana: use the new numbers"));
    }

    #[tokio::test]
    async fn test_content_is_truncated() {
        let generator = Arc::new(RecordingGenerator::default());
        let client = AiClient::new(generator.clone()).with_max_input_chars(4);

        client.summarize("ééééééé").await.unwrap();

        let prompts = generator.prompts.lock().unwrap();
        assert!(prompts[0].ends_with(": éééé"));
    }

    #[tokio::test]
    async fn test_usage_is_logged() {
        let db = Database::open_in_memory().unwrap();
        let client = AiClient::new(Arc::new(RecordingGenerator::default()))
            .with_usage_log(Arc::new(db.clone()));

        client.summarize("a").await.unwrap();
        client.extract_title("b").await.unwrap();

        let (cost, tokens) = db.total_ai_usage().unwrap();
        assert!((cost - 0.02).abs() < 1e-9);
        assert_eq!(tokens, 220);
    }

    #[tokio::test]
    async fn test_from_config_mock() {
        let mut config = AiConfig {
            enabled: true,
            active_provider: "offline".to_string(),
            ..Default::default()
        };
        config.providers.insert(
            "offline".to_string(),
            ProviderConfig {
                driver: ProviderDriver::Mock,
                ..Default::default()
            },
        );

        let client = AiClient::from_config(&config).unwrap();
        assert_eq!(client.provider(), "mock");
        let title = client.extract_slide_title("Q3 Review").await.unwrap();
        assert!(title.content.starts_with("[MOCK for:"));
    }

    #[test]
    fn test_from_config_unknown_provider() {
        let config = AiConfig {
            active_provider: "missing".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            AiClient::from_config(&config),
            Err(AiError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_new_with_mock() {
        let client = AiClient::new(Arc::new(MockGenerator::new("m")));
        assert_eq!(client.model(), "m");
    }
}
