//! Practice Journal
//!
//! Domain operations above the raw stores for logging a day against a
//! cultivation path. The store itself accepts any record; the journal
//! is where the one-record-per-day rule is enforced and where the
//! practiced-day counter is kept honest (incremented exactly once per
//! practiced day).

use crate::entities::{Cultivation, CultivationPatch, Practice};
use crate::store::{EntityStore, StoreError};
use chrono::NaiveDate;
use serde_json::json;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum JournalError {
    #[error("no cultivation path with id {0}")]
    UnknownPath(String),

    /// A record already exists for this path and day.
    #[error("day {0} already logged for this path")]
    DuplicateDay(NaiveDate),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// The record logged for one (path, day), if any.
pub async fn entry_for_day(
    practices: &EntityStore<Practice>,
    cultivation_id: &str,
    date: NaiveDate,
) -> Option<Practice> {
    practices
        .filter(
            &[
                ("cultivation_id", json!(cultivation_id)),
                ("date", json!(date.to_string())),
            ],
            None,
            None,
        )
        .await
        .into_iter()
        .next()
}

async fn check_new_entry(
    cultivations: &EntityStore<Cultivation>,
    practices: &EntityStore<Practice>,
    cultivation_id: &str,
    date: NaiveDate,
) -> Result<Cultivation, JournalError> {
    let cultivation = cultivations
        .get(cultivation_id)
        .await
        .ok_or_else(|| JournalError::UnknownPath(cultivation_id.to_string()))?;
    if entry_for_day(practices, cultivation_id, date).await.is_some() {
        return Err(JournalError::DuplicateDay(date));
    }
    Ok(cultivation)
}

/// Log a practiced day and bump the path's counter by exactly one.
pub async fn log_practice(
    cultivations: &EntityStore<Cultivation>,
    practices: &EntityStore<Practice>,
    cultivation_id: &str,
    date: NaiveDate,
    duration_minutes: Option<u32>,
) -> Result<Practice, JournalError> {
    let cultivation = check_new_entry(cultivations, practices, cultivation_id, date).await?;

    let record = practices
        .create(Practice::practiced(cultivation_id, date, duration_minutes))
        .await?;
    cultivations
        .update(
            cultivation_id,
            CultivationPatch {
                total_days_practiced: Some(cultivation.total_days_practiced + 1),
                ..Default::default()
            },
        )
        .await?;

    info!(path = cultivation_id, %date, "practice logged");
    Ok(record)
}

/// Log an explicit rest day. The counter is untouched.
pub async fn log_rest(
    cultivations: &EntityStore<Cultivation>,
    practices: &EntityStore<Practice>,
    cultivation_id: &str,
    date: NaiveDate,
) -> Result<Practice, JournalError> {
    check_new_entry(cultivations, practices, cultivation_id, date).await?;

    let record = practices
        .create(Practice::rested(cultivation_id, date))
        .await?;
    info!(path = cultivation_id, %date, "rest logged");
    Ok(record)
}
