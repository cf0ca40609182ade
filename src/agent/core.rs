use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::config::AgentConfig;
use crate::error::AgentError;
use crate::tools::{CallArgs, ToolExecutor, ToolOutcome};
use crate::types::{Message, ToolCall};

use super::conversation::Conversation;
use super::llm::ReasoningService;

/// 达到迭代上限时返回给用户的回复
pub const ITERATION_LIMIT_REPLY: &str =
    "Sorry, I could not complete your request within the allowed number of steps. \
Please simplify your question or try again.";

/// 编排循环的状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    AwaitingModel,
    ModelFinal,
    ModelRequestsTool,
    ToolExecuting,
    Aborted,
}

impl LoopState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, LoopState::ModelFinal | LoopState::Aborted)
    }
}

/// 状态及其携带的数据
enum Step {
    AwaitingModel,
    ModelRequestsTool(ToolCall),
    ToolExecuting {
        call_id: String,
        prepared: Result<CallArgs, ToolOutcome>,
    },
    ModelFinal(String),
    Aborted,
}

impl Step {
    fn state(&self) -> LoopState {
        match self {
            Step::AwaitingModel => LoopState::AwaitingModel,
            Step::ModelRequestsTool(_) => LoopState::ModelRequestsTool,
            Step::ToolExecuting { .. } => LoopState::ToolExecuting,
            Step::ModelFinal(_) => LoopState::ModelFinal,
            Step::Aborted => LoopState::Aborted,
        }
    }
}

/// 一次完整交换的结果
#[derive(Debug)]
pub struct Exchange {
    pub reply: String,
    /// 终止状态：ModelFinal 或 Aborted
    pub state: LoopState,
    /// 推理服务调用次数
    pub round_trips: usize,
    pub conversation: Conversation,
}

impl Exchange {
    pub fn completed(&self) -> bool {
        self.state == LoopState::ModelFinal
    }
}

pub struct Agent {
    llm: Arc<dyn ReasoningService>,
    tool_executor: ToolExecutor,
    config: AgentConfig,
}

impl Agent {
    pub fn new(config: AgentConfig, llm: Arc<dyn ReasoningService>, tool_executor: ToolExecutor) -> Self {
        Agent {
            llm,
            tool_executor,
            config,
        }
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// 运行一次交换，只返回回复文本
    pub async fn ask(&self, user_input: &str) -> Result<String, AgentError> {
        self.chat(user_input).await.map(|exchange| exchange.reply)
    }

    /// 运行编排循环直到模型给出最终回复或达到迭代上限
    pub async fn chat(&self, user_input: &str) -> Result<Exchange, AgentError> {
        let mut conversation = Conversation::seeded(&self.config.system_prompt, user_input);
        let tools = self.tool_executor.get_tools();
        let max_iterations = self.config.max_iterations;
        let mut round_trips = 0;
        let mut step = Step::AwaitingModel;

        loop {
            debug!(state = ?step.state(), round_trips, "orchestration step");

            step = match step {
                Step::AwaitingModel if round_trips >= max_iterations => Step::Aborted,
                Step::AwaitingModel => {
                    round_trips += 1;
                    info!(
                        round_trip = round_trips,
                        max = max_iterations,
                        messages = conversation.len(),
                        "calling reasoning service"
                    );

                    let response = self
                        .llm
                        .complete(conversation.as_reasoning_service_input(), tools)
                        .await
                        .map_err(|e| {
                            error!(error = %format!("{:#}", e), "reasoning service call failed");
                            AgentError::ReasoningService(e)
                        })?;

                    accept_response(&mut conversation, response)?
                }
                Step::ModelRequestsTool(call) => {
                    let prepared = self
                        .tool_executor
                        .prepare(&call.function.name, &call.function.arguments);
                    Step::ToolExecuting {
                        call_id: call.id,
                        prepared,
                    }
                }
                Step::ToolExecuting { call_id, prepared } => {
                    let outcome = match prepared {
                        Ok(args) => self.tool_executor.dispatch(args).await,
                        Err(outcome) => outcome,
                    };
                    conversation.append(Message::tool(call_id, outcome.to_content()))?;
                    Step::AwaitingModel
                }
                Step::ModelFinal(reply) => {
                    info!(round_trips, "exchange completed");
                    return Ok(Exchange {
                        reply,
                        state: LoopState::ModelFinal,
                        round_trips,
                        conversation,
                    });
                }
                Step::Aborted => {
                    warn!(round_trips, max = max_iterations, "iteration limit reached, aborting exchange");
                    let reply = ITERATION_LIMIT_REPLY.to_string();
                    conversation.append(Message::assistant(reply.clone()))?;
                    return Ok(Exchange {
                        reply,
                        state: LoopState::Aborted,
                        round_trips,
                        conversation,
                    });
                }
            };
        }
    }

    /// 不带工具的单轮补全，用于生成摘要
    pub async fn complete_once(&self, prompt: &str) -> Result<String, AgentError> {
        let messages = [Message::system(self.config.system_prompt.clone()), Message::user(prompt)];

        let response = self.llm.complete(&messages, &[]).await.map_err(|e| {
            error!(error = %format!("{:#}", e), "reasoning service call failed");
            AgentError::ReasoningService(e)
        })?;

        Ok(response.content.unwrap_or_default())
    }
}

/// 把模型回复写入对话并决定下一个状态。
/// 一轮中请求多个调用时只执行第一个，其余丢弃。
fn accept_response(conversation: &mut Conversation, response: Message) -> Result<Step, AgentError> {
    let mut calls = response.tool_calls.unwrap_or_default();

    if calls.is_empty() {
        let reply = response.content.unwrap_or_default();
        conversation.append(Message::assistant(reply.clone()))?;
        return Ok(Step::ModelFinal(reply));
    }

    if calls.len() > 1 {
        let dropped: Vec<&str> = calls[1..].iter().map(|c| c.function.name.as_str()).collect();
        warn!(?dropped, "model requested several tool calls, only the first is honored");
    }

    let mut call = calls.swap_remove(0);
    if call.id.is_empty() {
        call.id = format!("call_{}", uuid::Uuid::new_v4().simple());
    }

    debug!(function = %call.function.name, call_id = %call.id, "model requested a tool");
    conversation.append(Message::assistant_tool_call(response.content, call.clone()))?;
    Ok(Step::ModelRequestsTool(call))
}
