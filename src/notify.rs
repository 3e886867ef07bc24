use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, info};

use crate::config::NotifyConfig;
use crate::traits::Notifier;
use crate::types::{DeepLink, EnrichedPicture};

#[derive(Debug)]
pub struct NotifyError {
    pub kind: NotifyErrorKind,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyErrorKind {
    /// The push server refused our credentials (401/403). Terminal for the
    /// cycle: a missed notification is an acceptable degraded outcome.
    PermissionDenied,
    /// Could not reach the push server.
    Network,
    /// Push server returned a non-success status.
    Remote,
}

impl NotifyError {
    pub fn is_permission_denied(&self) -> bool {
        self.kind == NotifyErrorKind::PermissionDenied
    }
}

impl fmt::Display for NotifyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Notify error ({:?}): {}", self.kind, self.message)
    }
}

impl std::error::Error for NotifyError {}

/// Pushes the daily notification to an ntfy-compatible server. The reserved
/// topic acts as the notification channel: creating it is implicit and
/// idempotent, and subscribers see each day's message under the same identity.
pub struct NtfyNotifier {
    client: Client,
    enabled: bool,
    server: String,
    topic: String,
    token: Option<String>,
}

impl NtfyNotifier {
    pub fn new(config: &NotifyConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(15))
            .build()?;
        Ok(Self {
            client,
            enabled: config.enabled,
            server: config.server.trim_end_matches('/').to_string(),
            topic: config.topic.clone(),
            token: config.token.clone(),
        })
    }
}

#[async_trait]
impl Notifier for NtfyNotifier {
    async fn show(&self, enriched: &EnrichedPicture) -> Result<(), NotifyError> {
        if !self.enabled {
            info!(date = %enriched.record.date, "Notifications disabled, skipping delivery");
            return Ok(());
        }

        let url = format!("{}/{}", self.server, self.topic);
        let deep_link = DeepLink::for_picture(enriched.record.date).to_uri();

        let mut request = self
            .client
            .post(&url)
            .header("Title", sanitize_header(&enriched.notification_title))
            .header("Priority", "high")
            .header("Click", deep_link.as_str())
            .header(
                "Actions",
                format!("view, View Picture, {}, clear=true", deep_link),
            )
            .body(enriched.notification_body.clone());

        // Best-effort rich image: only attached when the record carries a
        // preview URL. Absence degrades to a text-only notification.
        if let Some(image_url) = enriched.record.preview_url() {
            request = request.header("Attach", image_url);
        } else {
            debug!(date = %enriched.record.date, "No image URL, sending text-only notification");
        }

        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|e| NotifyError {
            kind: NotifyErrorKind::Network,
            message: e.to_string(),
        })?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(NotifyError {
                kind: NotifyErrorKind::PermissionDenied,
                message: format!("push server refused delivery ({})", status),
            });
        }
        if !status.is_success() {
            return Err(NotifyError {
                kind: NotifyErrorKind::Remote,
                message: format!("push server returned {}", status),
            });
        }

        info!(
            topic = %self.topic,
            date = %enriched.record.date,
            "Notification delivered"
        );
        Ok(())
    }
}

/// HTTP header values must stay within visible ASCII; anything else is
/// replaced so a picture title can never poison the request.
fn sanitize_header(value: &str) -> String {
    value
        .chars()
        .map(|c| {
            if c == ' ' || c.is_ascii_graphic() {
                c
            } else {
                '?'
            }
        })
        .collect()
}
