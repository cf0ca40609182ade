use anyhow::{Context, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::ProviderConfig;

use super::FlightQuery;

const NOT_AVAILABLE: &str = "N/A";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlightSummary {
    pub airline: String,
    pub price: String,
    pub departure: String,
    pub arrival: String,
    pub origin_city: String,
    pub destination_city: String,
}

/// 航班查询结果：`{flight}`、`{message}` 或 `{error}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FlightSearch {
    Found { flight: FlightSummary },
    NotFound { message: String },
    Error { error: String },
}

impl FlightSearch {
    fn error(message: &str) -> Self {
        FlightSearch::Error {
            error: message.to_string(),
        }
    }
}

pub async fn search(client: &Client, config: &ProviderConfig, query: &FlightQuery) -> FlightSearch {
    match try_search(client, config, query).await {
        Ok(result) => result,
        Err(e) => {
            warn!(from = %query.from_city, to = %query.to_city, error = %format!("{:#}", e), "flight lookup failed");
            FlightSearch::error("Something went wrong while fetching flight data.")
        }
    }
}

async fn get_json(client: &Client, config: &ProviderConfig, path: &str, query: &[(&str, &str)]) -> Result<(bool, Value)> {
    let url = format!("{}{}", config.flights_base_url, path);

    let response = client
        .get(&url)
        .header("x-rapidapi-key", &config.rapidapi_key)
        .header("x-rapidapi-host", &config.flights_host)
        .query(query)
        .send()
        .await
        .with_context(|| format!("flight request failed: {}", url))?;

    let ok = response.status().is_success();
    let text = response.text().await.context("failed to read flight response")?;
    let data = serde_json::from_str(&text).with_context(|| format!("failed to parse flight response: {}", text))?;

    Ok((ok, data))
}

/// 城市名 → skyId；查不到时返回 None
async fn sky_id(client: &Client, config: &ProviderConfig, city: &str) -> Result<Option<String>> {
    let (ok, data) = get_json(client, config, "/flights/auto-complete", &[("query", city)]).await?;
    if !ok {
        warn!(city, "skyId lookup failed");
        return Ok(None);
    }

    let id = data
        .pointer("/data/0/navigation/relevantFlightParams/skyId")
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .map(str::to_string);

    if id.is_none() {
        warn!(city, "no skyId found for city");
    }
    Ok(id)
}

async fn try_search(client: &Client, config: &ProviderConfig, query: &FlightQuery) -> Result<FlightSearch> {
    let from_id = sky_id(client, config, &query.from_city).await?;
    let to_id = sky_id(client, config, &query.to_city).await?;

    let (Some(from_id), Some(to_id)) = (from_id, to_id) else {
        return Ok(FlightSearch::error("Could not resolve skyIds for given cities."));
    };

    let date = query.date.to_string();
    let (_, search) = get_json(
        client,
        config,
        "/flights/search-one-way",
        &[
            ("fromEntityId", from_id.as_str()),
            ("toEntityId", to_id.as_str()),
            ("departDate", date.as_str()),
        ],
    )
    .await?;

    let Some(session_id) = search
        .pointer("/data/context/sessionId")
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
    else {
        return Ok(FlightSearch::error("No session ID returned from search-one-way."));
    };
    debug!(session_id, "flight search session opened");

    let (_, results) = get_json(client, config, "/flights/search-incomplete", &[("sessionId", session_id)]).await?;

    Ok(match summarize(&results) {
        Some(flight) => FlightSearch::Found { flight },
        None => FlightSearch::NotFound {
            message: "No flights found.".to_string(),
        },
    })
}

fn summarize(results: &Value) -> Option<FlightSummary> {
    let itinerary = results.pointer("/data/itineraries/0")?;
    let leg = itinerary.pointer("/legs/0");

    let text = |value: Option<&Value>| -> String {
        match value {
            Some(Value::String(s)) if !s.is_empty() => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            _ => NOT_AVAILABLE.to_string(),
        }
    };
    let from_leg = |pointer: &str| text(leg.and_then(|l| l.pointer(pointer)));

    Some(FlightSummary {
        airline: from_leg("/carriers/marketing/0/name"),
        price: text(itinerary.pointer("/price/formatted")),
        departure: from_leg("/departure"),
        arrival: from_leg("/arrival"),
        origin_city: from_leg("/origin/city"),
        destination_city: from_leg("/destination/city"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn summarizes_first_itinerary() {
        let results = json!({
            "data": {
                "itineraries": [{
                    "price": {"formatted": "$120"},
                    "legs": [{
                        "carriers": {"marketing": [{"name": "IndiGo"}]},
                        "departure": "2025-05-01T06:00:00",
                        "arrival": "2025-05-01T08:10:00",
                        "origin": {"city": "Delhi"},
                        "destination": {"city": "Mumbai"}
                    }]
                }, {
                    "price": {"formatted": "$999"}
                }]
            }
        });

        let flight = summarize(&results).unwrap();
        assert_eq!(flight.airline, "IndiGo");
        assert_eq!(flight.price, "$120");
        assert_eq!(flight.origin_city, "Delhi");
        assert_eq!(flight.destination_city, "Mumbai");
    }

    #[test]
    fn missing_leg_fields_fall_back() {
        let results = json!({"data": {"itineraries": [{"legs": []}]}});
        let flight = summarize(&results).unwrap();
        assert_eq!(flight.airline, "N/A");
        assert_eq!(flight.price, "N/A");
    }

    #[test]
    fn no_itineraries_means_none() {
        assert!(summarize(&json!({"data": {"itineraries": []}})).is_none());
    }

    #[test]
    fn result_shapes_serialize_flat() {
        let not_found = serde_json::to_value(FlightSearch::NotFound {
            message: "No flights found.".to_string(),
        })
        .unwrap();
        assert_eq!(not_found, json!({"message": "No flights found."}));

        let error = serde_json::to_value(FlightSearch::error("boom")).unwrap();
        assert_eq!(error, json!({"error": "boom"}));
    }
}
