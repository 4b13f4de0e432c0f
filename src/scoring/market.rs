//! Market data provider integration
//!
//! Real traffic and bidding metrics per keyword. The provider is optional and
//! any failure here only downgrades scoring to the rule-based estimator.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Client;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::json;

use crate::error::{KeywordMinerError, Result};

/// Bid competition grade reported when a record omits it (low)
const DEFAULT_BID_GRADE: u8 = 3;

/// Maximum page size accepted by the keyword endpoint
const MAX_PAGE_SIZE: usize = 100;

/// Traffic and bidding metrics for one keyword
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeywordRecord {
    #[serde(default)]
    pub keyword: String,
    /// Overall traffic index
    #[serde(default, deserialize_with = "lenient_u64")]
    pub index: u64,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub mobile_index: u64,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub haosou_index: u64,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub douyin_index: u64,
    #[serde(default, rename = "long_keyword_count", deserialize_with = "lenient_u64")]
    pub long_tail_count: u64,
    #[serde(default, rename = "bidword_company_count", deserialize_with = "lenient_u64")]
    pub bid_company_count: u64,
    /// 1 high, 2 medium, 3 low
    #[serde(default = "default_bid_grade", rename = "bidword_kwc", deserialize_with = "lenient_grade")]
    pub bid_grade: u8,
    #[serde(default, rename = "bidword_pcpv", deserialize_with = "lenient_u64")]
    pub pc_daily_volume: u64,
    #[serde(default, rename = "bidword_wisepv", deserialize_with = "lenient_u64")]
    pub mobile_daily_volume: u64,
    #[serde(default, rename = "sem_reason")]
    pub traffic_reason: String,
    #[serde(default)]
    pub sem_price: String,
    #[serde(default)]
    pub page_url: String,
}

impl Default for KeywordRecord {
    fn default() -> Self {
        Self {
            keyword: String::new(),
            index: 0,
            mobile_index: 0,
            haosou_index: 0,
            douyin_index: 0,
            long_tail_count: 0,
            bid_company_count: 0,
            bid_grade: DEFAULT_BID_GRADE,
            pc_daily_volume: 0,
            mobile_daily_volume: 0,
            traffic_reason: String::new(),
            sem_price: String::new(),
            page_url: String::new(),
        }
    }
}

impl KeywordRecord {
    pub fn daily_volume(&self) -> u64 {
        self.pc_daily_volume.saturating_add(self.mobile_daily_volume)
    }

    /// Highest price in the bid price range (e.g. `"0.35~1.20"` gives 1.2)
    pub fn max_bid_price(&self) -> Option<f64> {
        self.sem_price
            .split(|c: char| !(c.is_ascii_digit() || c == '.'))
            .filter_map(|part| part.parse::<f64>().ok())
            .filter(|p| p.is_finite())
            .fold(None, |max: Option<f64>, p| Some(max.map_or(p, |m| m.max(p))))
    }
}

fn default_bid_grade() -> u8 {
    DEFAULT_BID_GRADE
}

fn lenient_u64<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<u64, D::Error> {
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f > 0.0).map(|f| f as u64))
            .unwrap_or(0),
        serde_json::Value::String(s) => s.trim().parse().unwrap_or(0),
        _ => 0,
    })
}

fn lenient_grade<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<u8, D::Error> {
    let grade = lenient_u64(deserializer)?;
    Ok(match grade {
        1..=3 => grade as u8,
        _ => DEFAULT_BID_GRADE,
    })
}

/// Trait for market data sources
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Records for `keyword` and its related traffic words, highest mobile volume first
    async fn keyword_data(&self, keyword: &str) -> Result<Vec<KeywordRecord>>;

    /// Get provider name
    fn name(&self) -> &'static str;
}

/// HTTP client for the 5118 keyword metrics API
pub struct MarketDataClient {
    client: Client,
    base_url: String,
}

impl MarketDataClient {
    pub fn new(api_key: &str, base_url: impl Into<String>) -> Result<Self> {
        let mut headers = HeaderMap::new();
        let auth = HeaderValue::from_str(api_key)
            .map_err(|_| KeywordMinerError::config("MARKET_API_KEY contains invalid characters"))?;
        headers.insert(AUTHORIZATION, auth);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .default_headers(headers)
            .build()
            .map_err(|e| KeywordMinerError::config(format!("Failed to create market data client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn provider_error(&self, message: impl Into<String>, code: Option<String>) -> KeywordMinerError {
        KeywordMinerError::market_data(self.name(), message, code)
    }

    /// Decode the `{errcode, errmsg, data: {word: [...]}}` envelope
    pub fn parse_response(&self, body: &serde_json::Value) -> Result<Vec<KeywordRecord>> {
        let code = match body.get("errcode") {
            Some(serde_json::Value::String(s)) => s.clone(),
            Some(serde_json::Value::Number(n)) => n.to_string(),
            _ => return Err(self.provider_error("Response has no errcode", None)),
        };
        if code != "0" {
            let message = body
                .get("errmsg")
                .and_then(|m| m.as_str())
                .unwrap_or("unknown error")
                .to_string();
            return Err(self.provider_error(message, Some(code)));
        }

        let words = body
            .get("data")
            .and_then(|d| d.get("word"))
            .and_then(|w| w.as_array())
            .cloned()
            .unwrap_or_default();

        let mut records = Vec::with_capacity(words.len());
        for word in words {
            match serde_json::from_value::<KeywordRecord>(word) {
                Ok(record) => records.push(record),
                Err(e) => tracing::warn!(provider = self.name(), error = %e, "Skipping malformed keyword record"),
            }
        }
        Ok(records)
    }
}

#[async_trait]
impl MarketDataProvider for MarketDataClient {
    async fn keyword_data(&self, keyword: &str) -> Result<Vec<KeywordRecord>> {
        let start_time = Instant::now();
        let url = format!("{}/keyword/word/v2", self.base_url);
        let params = json!({
            "keyword": keyword,
            "page_index": 1,
            "page_size": MAX_PAGE_SIZE,
            // 8 sorts by mobile volume
            "sort_fields": 8,
            "sort_type": "desc",
            // all traffic words
            "filter": 2,
        });

        let response = self
            .client
            .post(&url)
            .json(&params)
            .send()
            .await
            .map_err(|e| self.provider_error(e.to_string(), None))?;

        let status = response.status();
        if !status.is_success() {
            return Err(self.provider_error(format!("HTTP {}", status.as_u16()), None));
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| self.provider_error(format!("Invalid JSON: {}", e), None))?;
        let records = self.parse_response(&body)?;

        tracing::info!(
            provider = self.name(),
            keyword = %keyword,
            records = records.len(),
            duration_ms = %start_time.elapsed().as_millis(),
            "Market data fetched"
        );
        Ok(records)
    }

    fn name(&self) -> &'static str {
        "5118"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> MarketDataClient {
        MarketDataClient::new("test-key", "http://localhost/").unwrap()
    }

    #[test]
    fn test_parse_success_envelope() {
        let body = json!({
            "errcode": "0",
            "errmsg": "",
            "data": {"word": [
                {"keyword": "减肥药", "mobile_index": "320", "bidword_company_count": 4,
                 "bidword_kwc": 2, "bidword_wisepv": 180, "long_keyword_count": 5400,
                 "sem_reason": "品牌推荐", "sem_price": "0.80~2.50"},
                {"keyword": "减肥餐"}
            ]}
        });
        let records = client().parse_response(&body).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].mobile_index, 320);
        assert_eq!(records[0].bid_grade, 2);
        assert_eq!(records[0].max_bid_price(), Some(2.5));
        assert_eq!(records[1].bid_grade, 3);
        assert_eq!(records[1].max_bid_price(), None);
    }

    #[test]
    fn test_parse_error_envelope() {
        let body = json!({"errcode": "100102", "errmsg": "key expired"});
        let err = client().parse_response(&body).unwrap_err();
        assert!(err.to_string().contains("key expired"));
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_out_of_range_grade_defaults_low() {
        let record: KeywordRecord = serde_json::from_value(json!({"bidword_kwc": 9})).unwrap();
        assert_eq!(record.bid_grade, 3);
    }

    #[test]
    fn test_base_url_normalized() {
        assert_eq!(client().base_url, "http://localhost");
    }
}
