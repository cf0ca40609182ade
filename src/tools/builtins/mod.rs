//! 旅行数据查询：天气、酒店、航班
//!
//! 每个查询都是对第三方 HTTP API 的一次无状态请求。失败时返回约定的
//! 占位结构，而不是把错误抛给调用方。

pub mod flights;
pub mod hotels;
pub mod weather;

use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::ProviderConfig;

pub use flights::{FlightSearch, FlightSummary};
pub use hotels::{HotelOffer, HotelSearch};
pub use weather::WeatherReport;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeatherQuery {
    pub location: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HotelQuery {
    pub location: String,
    pub from_date: NaiveDate,
    pub to_date: NaiveDate,
    pub travellers: u32,
}

impl HotelQuery {
    /// 退房日期必须晚于入住日期，人数至少为 1。出错时给出参数名和原因
    pub fn check(&self) -> Result<(), (&'static str, &'static str)> {
        if self.to_date <= self.from_date {
            return Err(("toDate", "must be after fromDate"));
        }
        if self.travellers == 0 {
            return Err(("travellers", "must be a positive number"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlightQuery {
    pub from_city: String,
    pub to_city: String,
    pub date: NaiveDate,
}

/// 外部查询能力
#[async_trait]
pub trait TravelLookups: Send + Sync {
    async fn weather(&self, query: &WeatherQuery) -> Result<WeatherReport>;

    async fn hotels(&self, query: &HotelQuery) -> Result<HotelSearch>;

    async fn flights(&self, query: &FlightQuery) -> Result<FlightSearch>;
}

/// 基于第三方 HTTP API 的实现
pub struct TravelApis {
    client: Client,
    config: ProviderConfig,
}

impl TravelApis {
    pub fn new(config: ProviderConfig) -> Self {
        TravelApis {
            client: Client::new(),
            config,
        }
    }
}

#[async_trait]
impl TravelLookups for TravelApis {
    async fn weather(&self, query: &WeatherQuery) -> Result<WeatherReport> {
        Ok(weather::fetch(&self.client, &self.config, &query.location).await)
    }

    async fn hotels(&self, query: &HotelQuery) -> Result<HotelSearch> {
        Ok(hotels::search(&self.client, &self.config, query).await)
    }

    async fn flights(&self, query: &FlightQuery) -> Result<FlightSearch> {
        Ok(flights::search(&self.client, &self.config, query).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stay(from: &str, to: &str, travellers: u32) -> HotelQuery {
        HotelQuery {
            location: "Goa".to_string(),
            from_date: NaiveDate::parse_from_str(from, "%Y-%m-%d").unwrap(),
            to_date: NaiveDate::parse_from_str(to, "%Y-%m-%d").unwrap(),
            travellers,
        }
    }

    #[test]
    fn hotel_query_check() {
        assert_eq!(stay("2025-03-01", "2025-03-04", 2).check(), Ok(()));
        assert_eq!(stay("2025-03-04", "2025-03-04", 2).check().unwrap_err().0, "toDate");
        assert_eq!(stay("2025-03-04", "2025-03-01", 0).check().unwrap_err().0, "toDate");
        assert_eq!(stay("2025-03-01", "2025-03-04", 0).check().unwrap_err().0, "travellers");
    }
}
