use anyhow::{Context, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::ProviderConfig;

use super::HotelQuery;

const MAX_OFFERS: usize = 3;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HotelOffer {
    pub name: String,
    /// 价格或 "Not available"
    pub price: String,
    /// 评分或 "N/A"
    pub rating: Value,
}

/// 酒店查询结果；失败时 hotels 为空并带 error
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HotelSearch {
    pub location: String,
    pub from_date: String,
    pub to_date: String,
    pub travellers: u32,
    pub hotels: Vec<HotelOffer>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl HotelSearch {
    fn empty(query: &HotelQuery) -> Self {
        HotelSearch {
            location: query.location.clone(),
            from_date: query.from_date.to_string(),
            to_date: query.to_date.to_string(),
            travellers: query.travellers,
            hotels: Vec::new(),
            error: None,
        }
    }
}

pub async fn search(client: &Client, config: &ProviderConfig, query: &HotelQuery) -> HotelSearch {
    let mut result = HotelSearch::empty(query);

    match try_search(client, config, query).await {
        Ok(hotels) => result.hotels = hotels,
        Err(e) => {
            warn!(location = %query.location, error = %format!("{:#}", e), "hotel lookup failed");
            result.error = Some(e.to_string());
        }
    }

    result
}

async fn get_json(client: &Client, config: &ProviderConfig, url: &str, query: &[(&str, String)]) -> Result<Value> {
    let response = client
        .get(url)
        .header("X-RapidAPI-Key", &config.rapidapi_key)
        .header("X-RapidAPI-Host", &config.hotels_host)
        .query(query)
        .send()
        .await
        .context("hotel service unreachable")?;

    let status = response.status();
    let text = response.text().await.context("failed to read hotel response")?;

    if !status.is_success() {
        warn!(%status, body = %text, "hotel API returned an error");
        return Err(anyhow::anyhow!("hotel API error: {}", status));
    }

    serde_json::from_str(&text).map_err(|e| {
        debug!(body = %text, "unparseable hotel response");
        anyhow::Error::new(e).context("failed to parse hotel response")
    })
}

async fn try_search(client: &Client, config: &ProviderConfig, query: &HotelQuery) -> Result<Vec<HotelOffer>> {
    let locations = get_json(
        client,
        config,
        &format!("{}/v1/hotels/locations", config.hotels_base_url),
        &[
            ("name", query.location.clone()),
            ("locale", config.hotel_locale.clone()),
        ],
    )
    .await?;

    let dest_id = destination_id(&locations)
        .ok_or_else(|| anyhow::anyhow!("Destination not found for location: {}", query.location))?;
    debug!(location = %query.location, dest_id = %dest_id, "resolved hotel destination");

    let hotels = get_json(
        client,
        config,
        &format!("{}/v1/hotels/search", config.hotels_base_url),
        &[
            ("dest_id", dest_id),
            ("dest_type", "city".to_string()),
            ("checkin_date", query.from_date.to_string()),
            ("checkout_date", query.to_date.to_string()),
            ("adults_number", query.travellers.to_string()),
            ("room_number", "1".to_string()),
            ("units", "metric".to_string()),
            ("filter_by_currency", config.hotel_currency.clone()),
            ("locale", config.hotel_locale.clone()),
            ("order_by", "popularity".to_string()),
        ],
    )
    .await?;

    Ok(top_offers(&hotels))
}

fn destination_id(locations: &Value) -> Option<String> {
    let first = locations.as_array()?.first()?;
    match first.get("dest_id")? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn top_offers(data: &Value) -> Vec<HotelOffer> {
    let Some(results) = data.get("result").and_then(|v| v.as_array()) else {
        return Vec::new();
    };

    results
        .iter()
        .take(MAX_OFFERS)
        .map(|hotel| HotelOffer {
            name: hotel
                .get("hotel_name")
                .and_then(|v| v.as_str())
                .unwrap_or("Unknown hotel")
                .to_string(),
            price: hotel
                .pointer("/price_breakdown/gross_price")
                .filter(|v| !v.is_null())
                .map(|v| match v {
                    Value::String(s) => format!("₹{}", s),
                    other => format!("₹{}", other),
                })
                .unwrap_or_else(|| "Not available".to_string()),
            rating: hotel
                .get("review_score")
                .filter(|v| !v.is_null())
                .cloned()
                .unwrap_or_else(|| Value::String("N/A".to_string())),
        })
        .collect()
}
