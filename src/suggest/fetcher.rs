//! Autosuggest client with retry and jittered backoff

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use rand::seq::SliceRandom;
use rand::Rng;
use regex::Regex;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CONNECTION, REFERER, USER_AGENT};
use reqwest::Client;
use serde::Deserialize;

use super::SuggestionSource;
use crate::error::{KeywordMinerError, Result};
use crate::internal_error;
use crate::types::{FetchConfig, MetricsSnapshot, PerformanceMetrics};

/// Browser identities rotated per request
const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/130.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:132.0) Gecko/20100101 Firefox/132.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 14_6) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.6 Safari/605.1.15",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/129.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36 Edg/131.0.0.0",
];

/// Client for the Baidu `sugrec` autosuggest endpoint
pub struct BaiduSuggestClient {
    client: Client,
    config: FetchConfig,
    jsonp: Regex,
    metrics: Arc<PerformanceMetrics>,
}

impl BaiduSuggestClient {
    /// Create a new client with default configuration
    pub fn new() -> Self {
        Self::with_config(FetchConfig::default())
    }

    /// Create a new client with custom configuration
    pub fn with_config(config: FetchConfig) -> Self {
        let client = Client::builder()
            .timeout(config.timeout)
            .pool_max_idle_per_host(config.concurrency)
            .pool_idle_timeout(Duration::from_secs(90))
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!("Failed to create HTTP client: {}. Using default.", e);
                Client::new()
            });

        // Greedy so nested parentheses inside the payload are kept
        let jsonp = Regex::new(r"(?s)jQuery\d+_\d+\((.*)\)").expect("static JSONP pattern");

        Self {
            client,
            config,
            jsonp,
            metrics: Arc::new(PerformanceMetrics::new()),
        }
    }

    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    /// Get current metrics snapshot
    pub fn get_metrics_snapshot(&self) -> MetricsSnapshot {
        self.metrics.get_stats()
    }

    fn headers() -> HeaderMap {
        let user_agent = USER_AGENTS
            .choose(&mut rand::thread_rng())
            .copied()
            .unwrap_or(USER_AGENTS[0]);

        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("text/javascript, application/javascript, application/ecmascript, application/x-ecmascript, */*; q=0.01"),
        );
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("zh-CN,zh;q=0.9"));
        headers.insert(CONNECTION, HeaderValue::from_static("keep-alive"));
        headers.insert(USER_AGENT, HeaderValue::from_static(user_agent));
        headers.insert("X-Requested-With", HeaderValue::from_static("XMLHttpRequest"));
        headers.insert(REFERER, HeaderValue::from_static("https://www.baidu.com/"));
        headers
    }

    /// Query parameters with a fresh callback name and cache buster
    fn params(query: &str) -> Vec<(&'static str, String)> {
        let mut rng = rand::thread_rng();
        let callback = format!(
            "jQuery{}_{}",
            rng.gen_range(10u128.pow(20)..10u128.pow(21)),
            rng.gen_range(10u64.pow(12)..10u64.pow(13))
        );
        let cache_buster = rng.gen_range(10u64.pow(12)..10u64.pow(13)).to_string();

        vec![
            ("pre", "1".to_string()),
            ("p", "3".to_string()),
            ("ie", "utf-8".to_string()),
            ("json", "1".to_string()),
            ("prod", "pc".to_string()),
            ("from", "pc_web".to_string()),
            ("wd", query.to_string()),
            ("req", "2".to_string()),
            ("csor", query.chars().count().to_string()),
            ("cb", callback),
            ("_", cache_buster),
        ]
    }

    fn retry_delay(&self) -> Duration {
        let min = self.config.delay_min.as_secs_f64();
        let max = self.config.delay_max.as_secs_f64();
        if max <= min {
            return self.config.delay_min;
        }
        Duration::from_secs_f64(rand::thread_rng().gen_range(min..=max))
    }

    async fn request_once(&self, query: &str) -> Result<Vec<String>> {
        self.metrics.increment_requests();
        let url = self.config.suggest_url.as_str();

        let response = self
            .client
            .get(url)
            .query(&Self::params(query))
            .headers(Self::headers())
            .send()
            .await
            .map_err(|e| self.map_transport_error(e))?;

        let status = response.status();
        if status.as_u16() != 200 {
            return Err(KeywordMinerError::network(
                format!("Suggest request failed with status {}", status),
                Some(status.as_u16()),
                Some(url.to_string()),
            ));
        }

        let text = response.text().await.map_err(|e| self.map_transport_error(e))?;
        self.parse_jsonp(&text)
    }

    fn map_transport_error(&self, err: reqwest::Error) -> KeywordMinerError {
        if err.is_timeout() {
            KeywordMinerError::timeout("Suggest request", self.config.timeout.as_secs())
        } else {
            KeywordMinerError::from(err)
        }
    }

    /// Extract suggestions from a JSONP body such as `jQuery1_2({"g":[{"q":".."}]})`
    pub fn parse_jsonp(&self, text: &str) -> Result<Vec<String>> {
        let payload = match self.jsonp.captures(text).and_then(|c| c.get(1)) {
            Some(m) => m.as_str(),
            None => {
                let start = text.find('{');
                let end = text.rfind('}');
                match (start, end) {
                    (Some(s), Some(e)) if s < e => &text[s..=e],
                    _ => {
                        return Err(KeywordMinerError::parse(
                            "Response is not a JSONP payload",
                            Some(truncate(text)),
                        ))
                    }
                }
            }
        };

        let data: SuggestPayload = serde_json::from_str(payload).map_err(|e| {
            tracing::debug!(error = %e, "Failed to decode suggest payload");
            KeywordMinerError::parse(e.to_string(), Some(truncate(payload)))
        })?;

        let items = data.g.ok_or_else(|| {
            KeywordMinerError::parse("Suggest payload has no `g` field", Some(truncate(payload)))
        })?;

        Ok(items.into_iter().filter_map(|item| item.q).collect())
    }
}

impl Default for BaiduSuggestClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SuggestionSource for BaiduSuggestClient {
    async fn try_fetch(&self, query: &str) -> Result<Vec<String>> {
        let start_time = Instant::now();
        let max_retries = self.config.max_retries.max(1);
        let mut last_error = None;

        for attempt in 0..max_retries {
            if attempt > 0 {
                self.metrics.increment_retries();
                tokio::time::sleep(self.retry_delay()).await;
            }

            match self.request_once(query).await {
                Ok(suggestions) => {
                    let elapsed = start_time.elapsed();
                    self.metrics
                        .record_success(suggestions.len(), elapsed.as_millis() as u64);
                    tracing::debug!(
                        query = %query,
                        attempt = attempt + 1,
                        suggestions = suggestions.len(),
                        duration_ms = %elapsed.as_millis(),
                        "Suggest request completed"
                    );
                    return Ok(suggestions);
                }
                Err(e) => {
                    tracing::warn!(
                        query = %query,
                        attempt = attempt + 1,
                        max_retries = max_retries,
                        kind = e.kind(),
                        error = %e,
                        "Suggest request failed"
                    );
                    let retryable = e.is_retryable();
                    last_error = Some(e);
                    if !retryable {
                        break;
                    }
                }
            }
        }

        self.metrics
            .record_failure(start_time.elapsed().as_millis() as u64);
        Err(last_error.unwrap_or_else(|| internal_error!("No suggest attempt was made for {}", query)))
    }

    fn name(&self) -> &'static str {
        "baidu"
    }
}

fn truncate(text: &str) -> String {
    text.chars().take(200).collect()
}

/// Decoded suggest payload
#[derive(Debug, Deserialize)]
struct SuggestPayload {
    #[serde(default)]
    g: Option<Vec<SuggestItem>>,
}

#[derive(Debug, Deserialize)]
struct SuggestItem {
    #[serde(default)]
    q: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_jsonp_payload() {
        let client = BaiduSuggestClient::new();
        let body = r#"jQuery110208283_1700000000000({"q":"减肥","p":false,"g":[{"type":"sug","sa":"s_1","q":"减肥餐"},{"type":"sug","sa":"s_2","q":"减肥药(正品)"}],"slid":"1"})"#;
        let suggestions = client.parse_jsonp(body).unwrap();
        assert_eq!(suggestions, vec!["减肥餐", "减肥药(正品)"]);
    }

    #[test]
    fn test_parse_bare_json_fallback() {
        let client = BaiduSuggestClient::new();
        let body = r#"callback({"g":[{"q":"seo tools"}]});"#;
        assert_eq!(client.parse_jsonp(body).unwrap(), vec!["seo tools"]);
    }

    #[test]
    fn test_missing_g_is_parse_error() {
        let client = BaiduSuggestClient::new();
        let err = client
            .parse_jsonp(r#"jQuery1_2({"q":"x","p":false})"#)
            .unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(err.kind(), "parse");
    }

    #[test]
    fn test_garbage_body_rejected() {
        let client = BaiduSuggestClient::new();
        assert!(client.parse_jsonp("<html>blocked</html>").is_err());
    }

    #[test]
    fn test_params_are_unique_per_request() {
        let a = BaiduSuggestClient::params("seo");
        let b = BaiduSuggestClient::params("seo");
        let cb = |p: &[(&str, String)]| p.iter().find(|(k, _)| *k == "cb").map(|(_, v)| v.clone());
        assert!(cb(&a).unwrap().starts_with("jQuery"));
        assert_ne!(cb(&a), cb(&b));
        assert!(a.iter().any(|(k, v)| *k == "wd" && v == "seo"));
    }

    #[test]
    fn test_retry_delay_within_bounds() {
        let config = FetchConfig {
            delay_min: Duration::from_millis(100),
            delay_max: Duration::from_millis(200),
            ..Default::default()
        };
        let client = BaiduSuggestClient::with_config(config);
        for _ in 0..20 {
            let d = client.retry_delay();
            assert!(d >= Duration::from_millis(100) && d <= Duration::from_millis(200));
        }
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_degrades_to_empty() {
        let config = FetchConfig {
            suggest_url: "http://127.0.0.1:9/sugrec".to_string(),
            timeout: Duration::from_secs(2),
            delay_min: Duration::ZERO,
            delay_max: Duration::ZERO,
            max_retries: 2,
            ..Default::default()
        };
        let client = BaiduSuggestClient::with_config(config);

        assert!(client.try_fetch("seo").await.is_err());
        assert!(client.fetch("seo").await.is_empty());

        let stats = client.get_metrics_snapshot();
        assert_eq!(stats.requests_sent, 4);
        assert_eq!(stats.retries, 2);
        assert_eq!(stats.queries_failed, 2);
    }

    #[tokio::test]
    async fn test_timeout_reports_configured_duration() {
        // accepts connections into the backlog but never answers
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let config = FetchConfig {
            suggest_url: format!("http://{}/sugrec", listener.local_addr().unwrap()),
            timeout: Duration::from_secs(1),
            delay_min: Duration::ZERO,
            delay_max: Duration::ZERO,
            max_retries: 1,
            ..Default::default()
        };
        let client = BaiduSuggestClient::with_config(config);

        match client.try_fetch("seo").await {
            Err(KeywordMinerError::Timeout { timeout_secs, .. }) => assert_eq!(timeout_secs, 1),
            other => panic!("expected timeout, got {:?}", other),
        }
        drop(listener);
    }
}
