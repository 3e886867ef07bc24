use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use tracing::debug;

use crate::config::ApodConfig;
use crate::traits::PictureSource;
use crate::types::PictureRecord;

/// Classified fetch error — tells the worker *why* the APOD call failed so it
/// can pick the right recovery strategy.
#[derive(Debug)]
pub struct FetchError {
    pub kind: FetchErrorKind,
    pub status: Option<u16>,
    pub message: String,
    /// Seconds to wait before retrying (from a 429 Retry-After header).
    pub retry_after_secs: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchErrorKind {
    /// Connectivity failure or request timeout.
    Network,
    /// Response arrived but the JSON body did not parse.
    Decode,
    /// Non-success HTTP status, including rate limiting.
    Remote,
}

impl FetchError {
    pub fn from_status(status: u16, retry_after_secs: Option<u64>, body: &str) -> Self {
        Self {
            kind: FetchErrorKind::Remote,
            status: Some(status),
            message: truncate_body(body),
            retry_after_secs,
        }
    }

    pub fn network(err: &reqwest::Error) -> Self {
        Self {
            kind: FetchErrorKind::Network,
            status: None,
            message: err.to_string(),
            retry_after_secs: None,
        }
    }

    pub fn decode(err: &reqwest::Error) -> Self {
        Self {
            kind: FetchErrorKind::Decode,
            status: None,
            message: err.to_string(),
            retry_after_secs: None,
        }
    }
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(status) = self.status {
            write!(f, "APOD fetch error ({}, {:?}): {}", status, self.kind, self.message)
        } else {
            write!(f, "APOD fetch error ({:?}): {}", self.kind, self.message)
        }
    }
}

impl std::error::Error for FetchError {}

fn truncate_body(body: &str) -> String {
    if body.len() > 300 {
        let cut: String = body.chars().take(300).collect();
        format!("{}...", cut)
    } else {
        body.to_string()
    }
}

/// HTTP client for the APOD endpoint. One GET per fetch, bounded timeout,
/// no retries at this layer.
pub struct ApodClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl ApodClient {
    pub fn new(config: &ApodConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        })
    }
}

#[async_trait]
impl PictureSource for ApodClient {
    async fn fetch(&self, date: Option<NaiveDate>) -> Result<PictureRecord, FetchError> {
        let url = format!("{}/planetary/apod", self.base_url);
        let mut query: Vec<(&str, String)> = vec![("api_key", self.api_key.clone())];
        if let Some(date) = date {
            query.push(("date", date.format("%Y-%m-%d").to_string()));
        }

        debug!(url = %url, date = ?date, "Fetching picture of the day");

        let response = self
            .client
            .get(&url)
            .query(&query)
            .send()
            .await
            .map_err(|e| FetchError::network(&e))?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok());
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::from_status(status.as_u16(), retry_after, &body));
        }

        response
            .json::<PictureRecord>()
            .await
            .map_err(|e| FetchError::decode(&e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_error_carries_status_and_retry_after() {
        let err = FetchError::from_status(429, Some(30), "{\"error\": \"rate limited\"}");
        assert_eq!(err.kind, FetchErrorKind::Remote);
        assert_eq!(err.status, Some(429));
        assert_eq!(err.retry_after_secs, Some(30));
    }

    #[test]
    fn long_error_bodies_are_truncated() {
        let err = FetchError::from_status(500, None, &"x".repeat(2000));
        assert!(err.message.len() <= 303);
        assert!(err.message.ends_with("..."));
    }

    #[test]
    fn display_includes_kind() {
        let err = FetchError::from_status(503, None, "unavailable");
        let text = err.to_string();
        assert!(text.contains("503"));
        assert!(text.contains("Remote"));
    }

    #[test]
    fn record_parses_service_response() {
        let json = r#"{
            "date": "2024-01-15",
            "explanation": "A galaxy far away. It glows.",
            "hdurl": "https://apod.nasa.gov/image/hd.jpg",
            "media_type": "image",
            "service_version": "v1",
            "title": "Distant Galaxy",
            "url": "https://apod.nasa.gov/image/sd.jpg"
        }"#;
        let record: PictureRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.title, "Distant Galaxy");
        assert_eq!(record.best_image_url(), Some("https://apod.nasa.gov/image/hd.jpg"));
    }

    #[test]
    fn record_parses_video_entry_without_urls() {
        let json = r#"{
            "date": "2024-01-16",
            "explanation": "A video entry.",
            "media_type": "video",
            "service_version": "v1",
            "title": "Some Video"
        }"#;
        let record: PictureRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.best_image_url(), None);
    }
}
