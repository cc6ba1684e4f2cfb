//! End-to-end flow over a real on-disk store: seed, log a practice
//! streak, watch eligibility flip, break through, and confirm deletes
//! leave practice records orphaned (no cascade).

use chrono::{Days, NaiveDate};
use dao_common::journal::log_practice;
use dao_common::progression::{self, attempt_breakthrough};
use dao_common::seed::{seed_default_paths, DEFAULT_PATHS};
use dao_common::{Cultivation, EntityStore, Phase, Practice, Realm};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde_json::json;
use tempfile::tempdir;

fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

#[tokio::test]
async fn full_path_lifecycle() {
    let dir = tempdir().unwrap();
    let cultivations: EntityStore<Cultivation> = EntityStore::open(dir.path()).unwrap();
    let practices: EntityStore<Practice> = EntityStore::open(dir.path()).unwrap();

    // First launch seeds the defaults; a second call is a no-op.
    let started = day(2024, 1, 1);
    assert_eq!(
        seed_default_paths(&cultivations, started).await.unwrap(),
        DEFAULT_PATHS.len()
    );
    assert_eq!(seed_default_paths(&cultivations, started).await.unwrap(), 0);

    let path = cultivations
        .list(Some("dao_name"), None)
        .await
        .into_iter()
        .find(|c| c.dao_name == "Programming")
        .unwrap();

    // Forty practiced days in a row.
    for offset in 0..40u64 {
        let date = started.checked_add_days(Days::new(offset)).unwrap();
        log_practice(&cultivations, &practices, &path.id, date, Some(30))
            .await
            .unwrap();
    }

    let today = started.checked_add_days(Days::new(39)).unwrap();
    let mine = practices
        .filter(&[("cultivation_id", json!(path.id))], Some("-date"), None)
        .await;
    assert_eq!(mine.len(), 40);
    assert_eq!(mine[0].date, today);

    let density90 = progression::density(90, &mine, today);
    assert_eq!(density90, 44); // 40/90 rounded

    let refreshed = cultivations.get(&path.id).await.unwrap();
    assert_eq!(refreshed.total_days_practiced, 40);
    assert!(progression::is_eligible(&refreshed, density90));

    // Keep attempting until the roll lands; each failure only stamps.
    let mut rng = StdRng::seed_from_u64(11);
    let outcome = loop {
        let out = attempt_breakthrough(&cultivations, &path.id, density90, today, &mut rng)
            .await
            .unwrap();
        if out.success {
            break out;
        }
    };
    assert_eq!(outcome.from, (Realm::Mortal, Phase::Early));
    assert_eq!(outcome.target, (Realm::Mortal, Phase::Mid));

    let advanced = cultivations.get(&path.id).await.unwrap();
    assert_eq!(advanced.realm_phase, Phase::Mid);
    assert_eq!(advanced.last_breakthrough_attempt, Some(today));

    // Deleting the path leaves its practice records orphaned.
    cultivations.delete(&path.id).await.unwrap();
    assert!(cultivations.get(&path.id).await.is_none());
    let orphaned = practices
        .filter(&[("cultivation_id", json!(path.id))], None, None)
        .await;
    assert_eq!(orphaned.len(), 40);
}
