use crate::GenerationError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Generation {
    pub text: String,
    /// Usage reported by the provider, 0 when it reports none.
    pub token_usage: u64,
}

/// The only network seam of the pipeline: one prompt in, one completion out.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str, temperature: f32) -> Result<Generation, GenerationError>;
}
