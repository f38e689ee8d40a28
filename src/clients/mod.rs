pub mod llm_client;
pub mod openai_client;

pub use llm_client::{ChatMessage, ChatRole, CompletionRequest, LlmClient};
pub use openai_client::OpenAiClient;
