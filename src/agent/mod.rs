pub mod conversation;
pub mod core;
pub mod llm;

pub use conversation::Conversation;
pub use self::core::{Agent, Exchange, LoopState, ITERATION_LIMIT_REPLY};
pub use llm::{LlmClient, ReasoningService};
