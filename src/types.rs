use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;

/// One day's picture metadata as returned by the APOD endpoint.
/// Immutable once fetched.
#[derive(Debug, Clone, Deserialize)]
pub struct PictureRecord {
    pub date: NaiveDate,
    pub title: String,
    pub explanation: String,
    pub media_type: MediaType,
    #[serde(default)]
    pub service_version: String,
    /// Preview-resolution image URL. Absent for video entries.
    #[serde(default)]
    pub url: Option<String>,
    /// High-definition image URL, when the service provides one.
    #[serde(default)]
    pub hdurl: Option<String>,
}

impl PictureRecord {
    /// Preview image URL, used for notification attachments.
    pub fn preview_url(&self) -> Option<&str> {
        self.url.as_deref().filter(|u| !u.is_empty())
    }

    /// Best available image URL: prefer high-definition, fall back to preview.
    /// None when the record has no usable image (e.g. a video entry) —
    /// image-dependent steps skip rather than fail in that case.
    pub fn best_image_url(&self) -> Option<&str> {
        self.hdurl
            .as_deref()
            .filter(|u| !u.is_empty())
            .or_else(|| self.preview_url())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Image,
    Video,
    #[serde(other)]
    Other,
}

/// A fetched record combined with a display fact and derived notification
/// text. Created per fetch cycle, never persisted.
#[derive(Debug, Clone)]
pub struct EnrichedPicture {
    pub record: PictureRecord,
    pub fact: String,
    pub notification_title: String,
    pub notification_body: String,
}

/// Which display surface(s) a wallpaper apply targets.
/// Chosen by the user per action, not persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WallpaperTarget {
    Home,
    Lock,
    Both,
}

impl WallpaperTarget {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "home" => Some(Self::Home),
            "lock" => Some(Self::Lock),
            "both" => Some(Self::Both),
            _ => None,
        }
    }
}

impl std::fmt::Display for WallpaperTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Home => write!(f, "home"),
            Self::Lock => write!(f, "lock"),
            Self::Both => write!(f, "both"),
        }
    }
}

/// Broadcast by the scheduler when a daily run is due.
#[derive(Debug, Clone)]
pub struct FireEvent {
    pub source: String,
    pub fired_at: DateTime<Utc>,
}

/// Deep link opened from the notification action: navigates straight to the
/// picture for a given date and clears the notification on open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeepLink {
    pub date: NaiveDate,
    pub clear: bool,
}

impl DeepLink {
    pub const SCHEME: &'static str = "apodd";

    pub fn for_picture(date: NaiveDate) -> Self {
        Self { date, clear: true }
    }

    pub fn to_uri(&self) -> String {
        if self.clear {
            format!("{}://picture/{}?clear=1", Self::SCHEME, self.date)
        } else {
            format!("{}://picture/{}", Self::SCHEME, self.date)
        }
    }

    pub fn parse(uri: &str) -> Option<Self> {
        let rest = uri.strip_prefix("apodd://picture/")?;
        let (date_part, query) = match rest.split_once('?') {
            Some((d, q)) => (d, Some(q)),
            None => (rest, None),
        };
        let date = date_part.parse::<NaiveDate>().ok()?;
        let clear = query
            .map(|q| q.split('&').any(|kv| kv == "clear=1"))
            .unwrap_or(false);
        Some(Self { date, clear })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(url: Option<&str>, hdurl: Option<&str>) -> PictureRecord {
        PictureRecord {
            date: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
            title: "Test".into(),
            explanation: "Test explanation.".into(),
            media_type: MediaType::Image,
            service_version: "v1".into(),
            url: url.map(String::from),
            hdurl: hdurl.map(String::from),
        }
    }

    #[test]
    fn best_image_url_prefers_hd() {
        let r = record(Some("http://p/small.jpg"), Some("http://p/big.jpg"));
        assert_eq!(r.best_image_url(), Some("http://p/big.jpg"));
    }

    #[test]
    fn best_image_url_falls_back_to_preview() {
        let r = record(Some("http://p/small.jpg"), None);
        assert_eq!(r.best_image_url(), Some("http://p/small.jpg"));
    }

    #[test]
    fn best_image_url_treats_empty_as_absent() {
        let r = record(Some(""), Some(""));
        assert_eq!(r.best_image_url(), None);
    }

    #[test]
    fn deep_link_round_trip() {
        let link = DeepLink::for_picture(NaiveDate::from_ymd_opt(2024, 1, 15).unwrap());
        assert_eq!(link.to_uri(), "apodd://picture/2024-01-15?clear=1");
        assert_eq!(DeepLink::parse(&link.to_uri()), Some(link));
    }

    #[test]
    fn deep_link_without_clear() {
        let parsed = DeepLink::parse("apodd://picture/2023-06-01").unwrap();
        assert_eq!(parsed.date, NaiveDate::from_ymd_opt(2023, 6, 1).unwrap());
        assert!(!parsed.clear);
    }

    #[test]
    fn deep_link_rejects_garbage() {
        assert_eq!(DeepLink::parse("https://example.com/x"), None);
        assert_eq!(DeepLink::parse("apodd://picture/not-a-date"), None);
    }

    #[test]
    fn media_type_deserializes_unknown_values() {
        let r: MediaType = serde_json::from_str("\"hologram\"").unwrap();
        assert_eq!(r, MediaType::Other);
        let r: MediaType = serde_json::from_str("\"image\"").unwrap();
        assert_eq!(r, MediaType::Image);
    }
}
