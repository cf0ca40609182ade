#![allow(dead_code)]

use anyhow::Result;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tripmate::tools::builtins::{
    FlightQuery, FlightSearch, HotelQuery, HotelSearch, TravelLookups, WeatherQuery, WeatherReport,
};
use tripmate::tools::ToolExecutor;
use tripmate::types::{Message, Role, Tool, ToolCall};
use tripmate::{Agent, AgentConfig, ReasoningService};

/// 按脚本依次返回回复的推理服务
#[derive(Default)]
pub struct ScriptedModel {
    responses: Mutex<VecDeque<Message>>,
    fallback: Option<Message>,
    fail: bool,
    calls: AtomicUsize,
    seen: Mutex<Vec<Vec<Message>>>,
}

impl ScriptedModel {
    pub fn new(responses: Vec<Message>) -> Self {
        ScriptedModel {
            responses: Mutex::new(responses.into()),
            ..Default::default()
        }
    }

    /// 脚本用完后一直返回同一条回复
    pub fn repeating(response: Message) -> Self {
        ScriptedModel {
            fallback: Some(response),
            ..Default::default()
        }
    }

    pub fn failing() -> Self {
        ScriptedModel {
            fail: true,
            ..Default::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// 第 n 次调用时收到的消息
    pub fn seen(&self, n: usize) -> Vec<Message> {
        self.seen.lock().unwrap()[n].clone()
    }
}

#[async_trait]
impl ReasoningService for ScriptedModel {
    async fn complete(&self, messages: &[Message], _tools: &[Tool]) -> Result<Message> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().unwrap().push(messages.to_vec());

        if self.fail {
            anyhow::bail!("upstream returned 503: secret-internal-detail");
        }

        let next = self.responses.lock().unwrap().pop_front();
        next.or_else(|| self.fallback.clone())
            .ok_or_else(|| anyhow::anyhow!("script exhausted"))
    }
}

pub fn final_text(text: &str) -> Message {
    Message::assistant(text)
}

pub fn tool_request(id: &str, name: &str, arguments: Value) -> Message {
    Message::assistant_tool_call(None, ToolCall::new(id, name, arguments))
}

pub fn multi_tool_request(calls: Vec<ToolCall>) -> Message {
    Message {
        role: Role::Assistant,
        content: None,
        tool_calls: Some(calls),
        tool_call_id: None,
    }
}

/// 内存中的查询实现，记录每次调用
pub struct FakeLookups {
    pub weather: WeatherReport,
    pub hotels: std::result::Result<HotelSearch, String>,
    pub flights: FlightSearch,
    calls: Mutex<Vec<String>>,
}

impl FakeLookups {
    pub fn new() -> Self {
        FakeLookups {
            weather: paris_weather(),
            hotels: Ok(HotelSearch {
                location: "Goa".to_string(),
                from_date: "2025-03-01".to_string(),
                to_date: "2025-03-04".to_string(),
                travellers: 2,
                hotels: Vec::new(),
                error: None,
            }),
            flights: FlightSearch::NotFound {
                message: "No flights found.".to_string(),
            },
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl TravelLookups for FakeLookups {
    async fn weather(&self, query: &WeatherQuery) -> Result<WeatherReport> {
        self.calls.lock().unwrap().push(format!("weather:{}", query.location));
        Ok(self.weather.clone())
    }

    async fn hotels(&self, query: &HotelQuery) -> Result<HotelSearch> {
        self.calls.lock().unwrap().push(format!("hotels:{}", query.location));
        self.hotels.clone().map_err(|e| anyhow::anyhow!(e))
    }

    async fn flights(&self, query: &FlightQuery) -> Result<FlightSearch> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("flights:{}->{}", query.from_city, query.to_city));
        Ok(self.flights.clone())
    }
}

pub fn paris_weather() -> WeatherReport {
    WeatherReport {
        city: "Paris".to_string(),
        condition: "Clear".to_string(),
        temperature: "18°C".to_string(),
        humidity: "60%".to_string(),
        wind: "3.6 km/h".to_string(),
    }
}

pub fn agent_with(model: Arc<ScriptedModel>, lookups: Arc<FakeLookups>, max_iterations: usize) -> Agent {
    let config = AgentConfig {
        max_iterations,
        ..AgentConfig::default()
    };
    Agent::new(config, model, ToolExecutor::new(lookups))
}

pub fn tool_messages(messages: &[Message]) -> Vec<&Message> {
    messages.iter().filter(|m| m.role == Role::Tool).collect()
}

pub fn content_json(message: &Message) -> Value {
    serde_json::from_str(message.text()).unwrap_or_else(|_| json!(null))
}
