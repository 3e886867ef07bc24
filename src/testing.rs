//! Test doubles: scripted picture sources and recording notifiers.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::fetch::{FetchError, FetchErrorKind};
use crate::notify::{NotifyError, NotifyErrorKind};
use crate::traits::{Notifier, PictureSource};
use crate::types::{EnrichedPicture, MediaType, PictureRecord};

pub fn sample_record() -> PictureRecord {
    PictureRecord {
        date: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
        title: "Horsehead Nebula".into(),
        explanation: "A dark nebula in Orion. It hides young stars behind thick dust.".into(),
        media_type: MediaType::Image,
        service_version: "v1".into(),
        url: Some("https://apod.nasa.gov/image/sd.jpg".into()),
        hdurl: Some("https://apod.nasa.gov/image/hd.jpg".into()),
    }
}

pub fn sample_record_without_image() -> PictureRecord {
    PictureRecord {
        media_type: MediaType::Video,
        url: None,
        hdurl: None,
        ..sample_record()
    }
}

fn network_error() -> FetchError {
    FetchError {
        kind: FetchErrorKind::Network,
        status: None,
        message: "connection refused".into(),
        retry_after_secs: None,
    }
}

fn rate_limit_error(retry_after_secs: u64) -> FetchError {
    FetchError {
        kind: FetchErrorKind::Remote,
        status: Some(429),
        message: "rate limited".into(),
        retry_after_secs: Some(retry_after_secs),
    }
}

/// Scripted picture source: fails the first `failures` calls, then returns
/// the configured record. Counts every call.
pub struct MockSource {
    failures: usize,
    /// Retry-After carried by scripted failures; None means a plain
    /// network error.
    retry_after_secs: Option<u64>,
    record: Option<PictureRecord>,
    calls: AtomicUsize,
}

impl MockSource {
    pub fn succeeding() -> Self {
        Self {
            failures: 0,
            retry_after_secs: None,
            record: Some(sample_record()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn succeeding_without_image() -> Self {
        Self {
            failures: 0,
            retry_after_secs: None,
            record: Some(sample_record_without_image()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn always_network_error() -> Self {
        Self {
            failures: usize::MAX,
            retry_after_secs: None,
            record: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn always_rate_limited(retry_after_secs: u64) -> Self {
        Self {
            failures: usize::MAX,
            retry_after_secs: Some(retry_after_secs),
            record: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing_then_succeeding(failures: usize) -> Self {
        Self {
            failures,
            retry_after_secs: None,
            record: Some(sample_record()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PictureSource for MockSource {
    async fn fetch(&self, _date: Option<NaiveDate>) -> Result<PictureRecord, FetchError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        if n < self.failures {
            return Err(match self.retry_after_secs {
                Some(secs) => rate_limit_error(secs),
                None => network_error(),
            });
        }
        match &self.record {
            Some(record) => Ok(record.clone()),
            None => Err(network_error()),
        }
    }
}

enum NotifierScript {
    Accept,
    DenyPermission,
    FailThenAccept(usize),
}

/// Recording notifier with a scripted response policy.
pub struct MockNotifier {
    script: NotifierScript,
    attempts: AtomicUsize,
    shown: Mutex<Vec<EnrichedPicture>>,
}

impl MockNotifier {
    pub fn accepting() -> Self {
        Self::with_script(NotifierScript::Accept)
    }

    pub fn denying_permission() -> Self {
        Self::with_script(NotifierScript::DenyPermission)
    }

    pub fn failing_then_accepting(failures: usize) -> Self {
        Self::with_script(NotifierScript::FailThenAccept(failures))
    }

    fn with_script(script: NotifierScript) -> Self {
        Self {
            script,
            attempts: AtomicUsize::new(0),
            shown: Mutex::new(Vec::new()),
        }
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn shown(&self) -> Vec<EnrichedPicture> {
        self.shown.lock().unwrap_or_else(|p| p.into_inner()).clone()
    }
}

#[async_trait]
impl Notifier for MockNotifier {
    async fn show(&self, enriched: &EnrichedPicture) -> Result<(), NotifyError> {
        let n = self.attempts.fetch_add(1, Ordering::SeqCst);
        match self.script {
            NotifierScript::Accept => {}
            NotifierScript::DenyPermission => {
                return Err(NotifyError {
                    kind: NotifyErrorKind::PermissionDenied,
                    message: "push server refused delivery (403)".into(),
                })
            }
            NotifierScript::FailThenAccept(failures) => {
                if n < failures {
                    return Err(NotifyError {
                        kind: NotifyErrorKind::Remote,
                        message: "push server returned 503".into(),
                    });
                }
            }
        }
        self.shown
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push(enriched.clone());
        Ok(())
    }
}
