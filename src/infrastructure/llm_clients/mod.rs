pub mod openai;

use crate::domain::completion::CompletionResult;
use crate::domain::prompt::PromptPair;
use async_trait::async_trait;

pub use openai::OpenAIClient;

/// One completion request per call. Failures come back classified so the
/// caller can decide between degrading and aborting; nothing is retried here.
#[async_trait]
pub trait CompletionClient {
    async fn complete(&self, prompt: &PromptPair) -> CompletionResult;
}
