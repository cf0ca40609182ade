use std::collections::HashSet;

use crate::error::ConversationError;
use crate::types::{Message, Role};

/// 一次交换的对话序列，只追加不修改
#[derive(Debug, Clone, Default)]
pub struct Conversation {
    messages: Vec<Message>,
    /// 已请求但尚未回复的调用 id
    pending: HashSet<String>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    /// 以系统提示和用户消息开始
    pub fn seeded(system_prompt: &str, user_input: &str) -> Self {
        let mut conversation = Conversation::new();
        conversation.messages.push(Message::system(system_prompt));
        conversation.messages.push(Message::user(user_input));
        conversation
    }

    /// 追加消息；工具消息必须回应一个尚未回复的调用请求
    pub fn append(&mut self, message: Message) -> Result<(), ConversationError> {
        match message.role {
            Role::Assistant => {
                if let Some(calls) = &message.tool_calls {
                    if calls.len() > 1 {
                        return Err(ConversationError::MultipleToolCalls(calls.len()));
                    }
                    if let Some(call) = calls.first() {
                        if call.id.is_empty() {
                            return Err(ConversationError::EmptyCallId);
                        }
                        self.pending.insert(call.id.clone());
                    }
                }
            }
            Role::Tool => {
                let id = message
                    .tool_call_id
                    .as_deref()
                    .ok_or(ConversationError::MissingToolCallId)?;
                if !self.pending.remove(id) {
                    return Err(ConversationError::UnmatchedToolCall(id.to_string()));
                }
            }
            Role::System | Role::User => {}
        }

        self.messages.push(message);
        Ok(())
    }

    /// 按顺序原样提供给推理服务
    pub fn as_reasoning_service_input(&self) -> &[Message] {
        &self.messages
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// 是否还有未回复的调用
    pub fn has_pending_call(&self) -> bool {
        !self.pending.is_empty()
    }

    /// 消息数量
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}
