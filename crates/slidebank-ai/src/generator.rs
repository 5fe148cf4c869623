//! The provider capability.

use crate::error::AiResult;
use crate::types::{Completion, Persona};
use async_trait::async_trait;

/// A model backend able to answer one prompt under a persona.
#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(&self, persona: &Persona, prompt: &str) -> AiResult<Completion>;

    /// Provider name recorded with usage.
    fn provider(&self) -> &str;

    fn model(&self) -> &str;
}
