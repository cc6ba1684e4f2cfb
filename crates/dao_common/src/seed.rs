//! First-run seeding
//!
//! On an empty cultivation collection, populate the default paths so
//! the first `daoctl paths` has something to show. Runs before any
//! other read on first launch; a non-empty collection is left alone.

use crate::entities::Cultivation;
use crate::store::{EntityStore, StoreError};
use chrono::NaiveDate;
use tracing::info;

/// Dao names seeded on first run.
pub const DEFAULT_PATHS: &[&str] = &["Building", "Cooking", "Programming", "GYM"];

/// Seed the default paths when the collection is empty. Every seeded
/// record starts at (Mortal, Early), Advancing, zero practiced days,
/// started `today`. Returns how many records were created.
pub async fn seed_default_paths(
    cultivations: &EntityStore<Cultivation>,
    today: NaiveDate,
) -> Result<usize, StoreError> {
    if cultivations.count().await > 0 {
        return Ok(0);
    }

    for dao_name in DEFAULT_PATHS {
        cultivations.create(Cultivation::new(dao_name, today)).await?;
    }
    info!(count = DEFAULT_PATHS.len(), "seeded default cultivation paths");
    Ok(DEFAULT_PATHS.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{CultivationState, Phase, Realm};
    use tempfile::tempdir;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 30).unwrap()
    }

    #[tokio::test]
    async fn test_seed_populates_empty_collection() {
        let dir = tempdir().unwrap();
        let store: EntityStore<Cultivation> = EntityStore::open(dir.path()).unwrap();

        let seeded = seed_default_paths(&store, today()).await.unwrap();
        assert_eq!(seeded, DEFAULT_PATHS.len());

        let paths = store.list(Some("dao_name"), None).await;
        assert_eq!(paths.len(), 4);
        for path in &paths {
            assert_eq!(path.current_realm, Realm::Mortal);
            assert_eq!(path.realm_phase, Phase::Early);
            assert_eq!(path.cultivation_state, CultivationState::Advancing);
            assert_eq!(path.total_days_practiced, 0);
            assert_eq!(path.cultivation_started, today());
        }
    }

    #[tokio::test]
    async fn test_seed_is_a_noop_when_populated() {
        let dir = tempdir().unwrap();
        let store: EntityStore<Cultivation> = EntityStore::open(dir.path()).unwrap();

        store
            .create(Cultivation::new("Tea", today()))
            .await
            .unwrap();
        let seeded = seed_default_paths(&store, today()).await.unwrap();
        assert_eq!(seeded, 0);
        assert_eq!(store.count().await, 1);
    }
}
