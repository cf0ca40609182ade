use anyhow::{Context, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::config::ProviderConfig;

const UNAVAILABLE: &str = "Unavailable";
const NOT_AVAILABLE: &str = "N/A";

/// 天气查询结果；失败时 condition 为 "Unavailable"
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeatherReport {
    pub city: String,
    pub condition: String,
    pub temperature: String,
    pub humidity: String,
    pub wind: String,
}

impl WeatherReport {
    pub fn unavailable(city: &str) -> Self {
        WeatherReport {
            city: city.to_string(),
            condition: UNAVAILABLE.to_string(),
            temperature: NOT_AVAILABLE.to_string(),
            humidity: NOT_AVAILABLE.to_string(),
            wind: NOT_AVAILABLE.to_string(),
        }
    }

    pub fn is_available(&self) -> bool {
        self.condition != UNAVAILABLE
    }
}

/// 查询城市当前天气，从不返回错误
pub async fn fetch(client: &Client, config: &ProviderConfig, city: &str) -> WeatherReport {
    match try_fetch(client, config, city).await {
        Ok(report) => report,
        Err(e) => {
            warn!(city, error = %format!("{:#}", e), "weather lookup failed");
            WeatherReport::unavailable(city)
        }
    }
}

async fn try_fetch(client: &Client, config: &ProviderConfig, city: &str) -> Result<WeatherReport> {
    let url = format!("{}/weather", config.weather_base_url);

    let response = client
        .get(&url)
        .query(&[
            ("q", city),
            ("appid", config.weather_api_key.as_str()),
            ("units", "metric"),
        ])
        .send()
        .await
        .context("weather request failed")?;

    let status = response.status();
    let text = response.text().await.context("failed to read weather response")?;

    let data: Value = serde_json::from_str(&text)
        .with_context(|| format!("failed to parse weather response: {}", text))?;

    if !status.is_success() {
        let message = data
            .get("message")
            .and_then(|v| v.as_str())
            .unwrap_or("Failed to fetch weather");
        return Err(anyhow::anyhow!("weather API error {}: {}", status, message));
    }

    parse_report(&data)
}

fn parse_report(data: &Value) -> Result<WeatherReport> {
    let city = data.get("name").and_then(|v| v.as_str()).context("missing city name")?;
    let condition = data
        .pointer("/weather/0/main")
        .and_then(|v| v.as_str())
        .context("missing weather condition")?;
    let temp = data.pointer("/main/temp").context("missing temperature")?;
    let humidity = data.pointer("/main/humidity").context("missing humidity")?;
    let wind = data.pointer("/wind/speed").context("missing wind speed")?;

    Ok(WeatherReport {
        city: city.to_string(),
        condition: condition.to_string(),
        temperature: format!("{}°C", temp),
        humidity: format!("{}%", humidity),
        wind: format!("{} km/h", wind),
    })
}
