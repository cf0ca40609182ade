use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{info, warn};

use crate::error::ValidationError;
use crate::types::Tool;

use super::builtins::{FlightSearch, TravelLookups};
use super::registry::{self, FunctionKind};
use super::validator::{self, CallArgs};

/// 工具调用对外暴露的失败原因：函数不存在
pub const FUNCTION_NOT_AVAILABLE: &str = "function not available";

/// 工具调用结果
#[derive(Debug, Clone, PartialEq)]
pub enum ToolOutcome {
    Success(Value),
    Failure(String),
}

impl ToolOutcome {
    pub fn failure(reason: impl Into<String>) -> Self {
        ToolOutcome::Failure(reason.into())
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ToolOutcome::Success(_))
    }

    /// 序列化为工具消息正文：成功时为原始 JSON，失败时为 `{"error": ...}`
    pub fn to_content(&self) -> String {
        match self {
            ToolOutcome::Success(value) => value.to_string(),
            ToolOutcome::Failure(reason) => json!({ "error": reason }).to_string(),
        }
    }
}

impl From<ValidationError> for ToolOutcome {
    fn from(err: ValidationError) -> Self {
        ToolOutcome::Failure(err.to_string())
    }
}

fn success<T: Serialize>(value: &T) -> ToolOutcome {
    match serde_json::to_value(value) {
        Ok(value) => ToolOutcome::Success(value),
        Err(e) => ToolOutcome::failure(format!("failed to encode result: {}", e)),
    }
}

/// 工具执行器：每次调用只执行一个函数，失败被捕获为 Failure
#[derive(Clone)]
pub struct ToolExecutor {
    lookups: Arc<dyn TravelLookups>,
}

impl ToolExecutor {
    pub fn new(lookups: Arc<dyn TravelLookups>) -> Self {
        ToolExecutor { lookups }
    }

    /// 获取所有工具定义
    pub fn get_tools(&self) -> &'static [Tool] {
        registry::get_tools_static()
    }

    /// 按名称解析函数
    pub fn resolve(&self, name: &str) -> Result<FunctionKind, ToolOutcome> {
        registry::lookup(name).ok_or_else(|| {
            warn!(function = name, "model requested an unknown function");
            ToolOutcome::failure(FUNCTION_NOT_AVAILABLE)
        })
    }

    /// 解析函数名并校验参数；失败时给出应回传给模型的 Failure
    pub fn prepare(&self, name: &str, raw_arguments: &Value) -> Result<CallArgs, ToolOutcome> {
        let kind = self.resolve(name)?;

        validator::validate(kind, raw_arguments).map_err(|e| {
            warn!(function = name, error = %e, "tool arguments rejected");
            ToolOutcome::from(e)
        })
    }

    /// 解析 + 校验 + 执行，任何一步失败都转换为 Failure
    pub async fn execute(&self, name: &str, raw_arguments: &Value) -> ToolOutcome {
        match self.prepare(name, raw_arguments) {
            Ok(args) => self.dispatch(args).await,
            Err(outcome) => outcome,
        }
    }

    /// 执行一个已校验的调用
    pub async fn dispatch(&self, args: CallArgs) -> ToolOutcome {
        let function = args.kind().name();
        info!(function, "dispatching tool call");

        let outcome = match &args {
            CallArgs::Weather(query) => match self.lookups.weather(query).await {
                Ok(report) => success(&report),
                Err(e) => ToolOutcome::failure(format!("{:#}", e)),
            },
            CallArgs::Hotels(query) => match self.lookups.hotels(query).await {
                Ok(search) => match &search.error {
                    Some(error) => ToolOutcome::failure(error.clone()),
                    None => success(&search),
                },
                Err(e) => ToolOutcome::failure(format!("{:#}", e)),
            },
            CallArgs::Flights(query) => match self.lookups.flights(query).await {
                Ok(FlightSearch::Error { error }) => ToolOutcome::Failure(error),
                Ok(search) => success(&search),
                Err(e) => ToolOutcome::failure(format!("{:#}", e)),
            },
        };

        if let ToolOutcome::Failure(reason) = &outcome {
            warn!(function, reason = %reason, "tool execution failed");
        }

        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Message;

    #[test]
    fn success_round_trips_through_tool_message() {
        let value = json!({
            "city": "Paris",
            "condition": "Clear",
            "temperature": "18°C",
            "nested": {"list": [1, 2, 3], "flag": true}
        });

        let message = Message::tool("call_1", ToolOutcome::Success(value.clone()).to_content());
        let wire = serde_json::to_string(&message).unwrap();

        let decoded: Message = serde_json::from_str(&wire).unwrap();
        let restored: Value = serde_json::from_str(decoded.text()).unwrap();
        assert_eq!(restored, value);
        assert_eq!(decoded.tool_call_id.as_deref(), Some("call_1"));
    }

    #[test]
    fn failure_content_carries_reason() {
        let content = ToolOutcome::failure("Destination not found for location: Atlantis").to_content();
        let parsed: Value = serde_json::from_str(&content).unwrap();
        assert_eq!(parsed["error"], "Destination not found for location: Atlantis");
    }

    #[test]
    fn validation_errors_become_failures() {
        let outcome: ToolOutcome = ValidationError::Parse {
            function: "getWeather".to_string(),
            detail: "EOF".to_string(),
        }
        .into();
        assert!(!outcome.is_success());
        assert!(outcome.to_content().contains("could not parse arguments for getWeather"));
    }
}
