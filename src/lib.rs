pub mod agent;
pub mod cli;
pub mod config;
pub mod error;
pub mod server;
pub mod tools;
pub mod types;

pub use agent::{Agent, Conversation, Exchange, LlmClient, LoopState, ReasoningService};
pub use cli::run_cli;
pub use config::{AgentConfig, Config, ProviderConfig, ServerConfig};
pub use error::{AgentError, ConversationError, ValidationError};
