use async_trait::async_trait;
use chrono::NaiveDate;

use crate::fetch::FetchError;
use crate::notify::NotifyError;
use crate::types::{EnrichedPicture, PictureRecord};

/// Source of daily picture metadata. `None` means "today" on the service's
/// calendar. Implementations perform a single attempt; retry policy lives in
/// the worker.
#[async_trait]
pub trait PictureSource: Send + Sync {
    async fn fetch(&self, date: Option<NaiveDate>) -> Result<PictureRecord, FetchError>;
}

/// Delivery surface for the daily notification.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn show(&self, enriched: &EnrichedPicture) -> Result<(), NotifyError>;
}
