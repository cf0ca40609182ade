mod chat;
mod function;

pub use chat::{ChatChoice, ChatRequest, ChatResponse, Message, Role};
pub use function::{FunctionCall, FunctionDefinition, Tool, ToolCall};
