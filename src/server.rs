//! HTTP 接口
//!
//! `POST /api/ask` 运行一次完整的编排循环；`POST /api/details` 直接查询
//! 天气和酒店，再让推理服务各写一段摘要。两者都不保存状态。

use anyhow::Result;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer};
use tracing::{error, info};

use crate::agent::{Agent, LlmClient};
use crate::config::Config;
use crate::error::AgentError;
use crate::tools::builtins::{HotelQuery, HotelSearch, WeatherQuery, WeatherReport};
use crate::tools::{ToolExecutor, TravelApis, TravelLookups};

/// 所有请求共享的只读状态
pub struct AppState {
    pub agent: Agent,
    pub lookups: Arc<dyn TravelLookups>,
}

impl AppState {
    pub fn new(agent: Agent, lookups: Arc<dyn TravelLookups>) -> Self {
        AppState { agent, lookups }
    }

    /// 用进程配置组装线上依赖
    pub fn from_config(config: &Config) -> Self {
        let lookups: Arc<dyn TravelLookups> = Arc::new(TravelApis::new(config.providers.clone()));
        let llm = Arc::new(LlmClient::new(config.agent.clone()));
        let agent = Agent::new(config.agent.clone(), llm, ToolExecutor::new(lookups.clone()));
        AppState::new(agent, lookups)
    }
}

type AppStateArc = Arc<AppState>;

/// 返回给调用方的错误，只暴露概括信息
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        ApiError {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    fn internal() -> Self {
        ApiError {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: "Something went wrong".to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

impl From<AgentError> for ApiError {
    fn from(err: AgentError) -> Self {
        error!(error = ?err, "exchange failed");
        ApiError::internal()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::bad_request(rejection.body_text())
    }
}

/// 结构化出行意图
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TripIntent {
    pub from_city: String,
    pub to_city: String,
    pub date: String,
    #[serde(default)]
    pub return_date: Option<String>,
    #[serde(default, alias = "travelers")]
    pub travellers: Option<u32>,
}

impl TripIntent {
    /// 渲染为一句用户消息
    pub fn to_message(&self) -> String {
        let mut message = format!(
            "I want to travel from {} to {} on {}",
            self.from_city, self.to_city, self.date
        );
        if let Some(return_date) = &self.return_date {
            message.push_str(&format!(", returning on {}", return_date));
        }
        if let Some(travellers) = self.travellers {
            message.push_str(&format!(", for {} traveller(s)", travellers));
        }
        message.push_str(". Please help me plan the trip.");
        message
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum AskRequest {
    Text { message: String },
    Trip(TripIntent),
}

impl AskRequest {
    fn into_message(self) -> String {
        match self {
            AskRequest::Text { message } => message,
            AskRequest::Trip(intent) => intent.to_message(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AskResponse {
    pub reply: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetailsRequest {
    #[serde(alias = "fromCity")]
    pub location: String,
    pub from_date: NaiveDate,
    pub to_date: NaiveDate,
    #[serde(alias = "travelers")]
    pub travellers: u32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DetailsResponse {
    pub weather_data: WeatherReport,
    pub hotel_data: HotelSearch,
    pub weather_reply: String,
    pub hotel_reply: String,
}

pub fn api_routes() -> Router<AppStateArc> {
    Router::new()
        .route("/api/ask", post(ask))
        .route("/api/details", post(details))
}

pub fn health_routes() -> Router<AppStateArc> {
    Router::new().route("/health", get(health))
}

/// 构建完整的路由
pub fn build_app(state: AppStateArc, request_timeout: Duration) -> Router {
    Router::new()
        .merge(api_routes())
        .merge(health_routes())
        .with_state(state)
        .layer(TimeoutLayer::new(request_timeout))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn ask(
    State(state): State<AppStateArc>,
    body: Result<Json<AskRequest>, JsonRejection>,
) -> Result<Json<AskResponse>, ApiError> {
    let Json(request) = body?;
    let message = request.into_message();

    if message.trim().is_empty() {
        return Err(ApiError::bad_request("message must not be empty"));
    }

    info!("ask request received");
    let exchange = state.agent.chat(&message).await?;
    info!(state = ?exchange.state, round_trips = exchange.round_trips, "ask request finished");

    Ok(Json(AskResponse { reply: exchange.reply }))
}

async fn details(
    State(state): State<AppStateArc>,
    body: Result<Json<DetailsRequest>, JsonRejection>,
) -> Result<Json<DetailsResponse>, ApiError> {
    let Json(request) = body?;

    if request.location.trim().is_empty() {
        return Err(ApiError::bad_request("location must not be empty"));
    }

    let weather_query = WeatherQuery {
        location: request.location.clone(),
    };
    let hotel_query = HotelQuery {
        location: request.location.clone(),
        from_date: request.from_date,
        to_date: request.to_date,
        travellers: request.travellers,
    };
    hotel_query
        .check()
        .map_err(|(parameter, detail)| ApiError::bad_request(format!("{} {}", parameter, detail)))?;

    let weather = state.lookups.weather(&weather_query).await.map_err(|e| {
        error!(error = %format!("{:#}", e), "weather lookup failed");
        ApiError::internal()
    })?;
    let hotels = state.lookups.hotels(&hotel_query).await.map_err(|e| {
        error!(error = %format!("{:#}", e), "hotel lookup failed");
        ApiError::internal()
    })?;

    let weather_json = serde_json::to_string(&weather).map_err(|_| ApiError::internal())?;
    let hotels_json = serde_json::to_string(&hotels).map_err(|_| ApiError::internal())?;

    let weather_reply = state
        .agent
        .complete_once(&format!(
            "Give just a short conversational summary of this weather data for a trip: {}. \
Do not start with phrases like \"I will give you a summary\".",
            weather_json
        ))
        .await?;

    let hotel_reply = state
        .agent
        .complete_once(&format!(
            "Based on these hotels in {}, suggest one good option which is lowest in cost \
and ask the user if they want to book: {}",
            request.location, hotels_json
        ))
        .await?;

    Ok(Json(DetailsResponse {
        weather_data: weather,
        hotel_data: hotels,
        weather_reply,
        hotel_reply,
    }))
}

/// 启动 HTTP 服务
pub async fn run(config: Config) -> Result<()> {
    let state = Arc::new(AppState::from_config(&config));
    let app = build_app(state, Duration::from_secs(config.server.request_timeout_secs));

    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
    info!("Listening on http://{}", config.server.bind);

    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trip_intent_renders_sentence() {
        let intent = TripIntent {
            from_city: "Delhi".to_string(),
            to_city: "Goa".to_string(),
            date: "2025-03-01".to_string(),
            return_date: Some("2025-03-05".to_string()),
            travellers: Some(2),
        };

        assert_eq!(
            intent.to_message(),
            "I want to travel from Delhi to Goa on 2025-03-01, returning on 2025-03-05, \
for 2 traveller(s). Please help me plan the trip."
        );
    }

    #[test]
    fn ask_body_accepts_text_or_trip() {
        let text: AskRequest = serde_json::from_value(json!({"message": "hi"})).unwrap();
        assert!(matches!(text, AskRequest::Text { .. }));

        let trip: AskRequest = serde_json::from_value(json!({
            "fromCity": "Delhi", "toCity": "Goa", "date": "2025-03-01", "travelers": 3
        }))
        .unwrap();
        match trip {
            AskRequest::Trip(intent) => assert_eq!(intent.travellers, Some(3)),
            other => panic!("unexpected body: {:?}", other),
        }
    }

    #[test]
    fn details_body_accepts_alias_field_names() {
        let body: DetailsRequest = serde_json::from_value(json!({
            "fromCity": "Goa", "fromDate": "2025-03-01", "toDate": "2025-03-04", "travelers": 2
        }))
        .unwrap();
        assert_eq!(body.location, "Goa");
        assert_eq!(body.travellers, 2);
    }
}
