mod openai;
mod provider;

pub use openai::{OpenAIConfig, OpenAIProvider, RetryPolicy};
pub use provider::EmbeddingProvider;

#[cfg(test)]
pub use provider::MockEmbeddingProvider;
