use thiserror::Error;

/// 参数校验失败；两种情况都会作为工具消息回传给模型
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("could not parse arguments for {function}: {detail}")]
    Parse { function: String, detail: String },

    #[error("invalid argument `{parameter}` for {function}: {detail}")]
    Argument {
        function: String,
        parameter: String,
        detail: String,
    },
}

impl ValidationError {
    /// 出错的参数名（仅 Argument）
    pub fn parameter(&self) -> Option<&str> {
        match self {
            ValidationError::Parse { .. } => None,
            ValidationError::Argument { parameter, .. } => Some(parameter.as_str()),
        }
    }
}

/// 违反对话序列不变式，属于编程错误
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConversationError {
    #[error("tool message has no tool_call_id")]
    MissingToolCallId,

    #[error("tool message answers unknown or already answered call `{0}`")]
    UnmatchedToolCall(String),

    #[error("assistant message carries {0} tool calls, only one is allowed")]
    MultipleToolCalls(usize),

    #[error("tool call request has an empty id")]
    EmptyCallId,
}

/// 一次交换中无法在循环内恢复的错误
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("reasoning service request failed")]
    ReasoningService(#[source] anyhow::Error),

    #[error(transparent)]
    Conversation(#[from] ConversationError),
}
