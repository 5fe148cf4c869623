//! Request and response types shared by every provider.

use serde::{Deserialize, Serialize};

/// Behavioural framing sent as the system prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Persona {
    pub name: &'static str,
    pub role: &'static str,
    pub instruction: &'static str,
}

impl Persona {
    /// Role and instruction as a single system prompt.
    pub fn system_prompt(&self) -> String {
        format!("{}\n{}", self.role, self.instruction)
    }
}

/// The persona used for every enrichment prompt.
pub const PRESENTATION_ARCHIVIST: Persona = Persona {
    name: "Presentation Archivist",
    role: "You are the presentation archivist for SlideBank, a library of reusable slide decks. \
           You are an expert in slide structure, visual hierarchy and information density.",
    instruction: "Respond concisely and professionally. When extracting titles or summaries, \
                  provide the content directly without preamble or quotes.",
};

/// Token accounting reported by a provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

impl Usage {
    pub fn new(prompt_tokens: u32, completion_tokens: u32) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
        }
    }
}

/// One finished generation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Completion {
    pub content: String,
    pub usage: Usage,
    pub cost: f64,
}

impl Completion {
    /// The content with surrounding whitespace and quotes removed.
    pub fn cleaned(&self) -> String {
        self.content
            .trim()
            .trim_matches(|c| c == '"' || c == '\'')
            .trim()
            .to_string()
    }
}

/// Per-million-token prices of a provider.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Pricing {
    pub input_per_1m: f64,
    pub output_per_1m: f64,
}

impl Pricing {
    pub fn cost(&self, usage: &Usage) -> f64 {
        (usage.prompt_tokens as f64 / 1_000_000.0) * self.input_per_1m
            + (usage.completion_tokens as f64 / 1_000_000.0) * self.output_per_1m
    }
}

/// Cut `text` to at most `max_chars` characters without splitting a code point.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pricing() {
        let pricing = Pricing {
            input_per_1m: 3.0,
            output_per_1m: 15.0,
        };
        let usage = Usage::new(1_000_000, 100_000);
        assert_eq!(usage.total_tokens, 1_100_000);
        assert!((pricing.cost(&usage) - 4.5).abs() < 1e-9);
        assert_eq!(Pricing::default().cost(&usage), 0.0);
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("hello", 10), "hello");
        assert_eq!(truncate_chars("hello", 2), "he");
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("日本語", 1), "日");
        assert_eq!(truncate_chars("", 3), "");
    }

    #[test]
    fn test_cleaned() {
        let completion = Completion {
            content: "  \"Quarterly Results\"\n".to_string(),
            ..Default::default()
        };
        assert_eq!(completion.cleaned(), "Quarterly Results");
    }

    #[test]
    fn test_system_prompt() {
        let prompt = PRESENTATION_ARCHIVIST.system_prompt();
        assert!(prompt.starts_with("You are the presentation archivist"));
        assert!(prompt.contains('\n'));
    }
}
