//! Progression Calculator
//!
//! Derived statistics and stage transitions for a cultivation path:
//! practice density over a trailing window, a two-bucket trend
//! heuristic, breakthrough eligibility against the per-realm
//! requirement table, and the probabilistic breakthrough roll itself.
//!
//! Everything here is pure except `attempt_breakthrough`, which commits
//! the outcome through the entity store.

use crate::entities::{Cultivation, CultivationPatch, Phase, Practice, Realm};
use crate::store::{EntityStore, StoreError};
use chrono::{Days, NaiveDate};
use rand::Rng;
use thiserror::Error;

/// Trend threshold: the newer half must differ from the older half by
/// more than this (on the [0,1] scale) to leave `Stable`.
const TREND_THRESHOLD: f64 = 0.1;

/// Base breakthrough success chance, in percent.
const BASE_CHANCE: f64 = 50.0;
/// Success chance ceiling, in percent.
const MAX_CHANCE: f64 = 85.0;
/// Chance gained per practiced day beyond the requirement.
const CHANCE_PER_EXTRA_DAY: f64 = 0.5;
/// Chance gained per density point beyond the requirement.
const CHANCE_PER_EXTRA_DENSITY: f64 = 1.0;

#[derive(Debug, Error)]
pub enum ProgressionError {
    #[error("no cultivation path with id {0}")]
    UnknownPath(String),

    /// The path sits at (Immortal Ascension, Peak); nothing follows.
    #[error("already at the peak of Immortal Ascension")]
    TerminalStage,

    /// Requirements for the current realm are not met.
    #[error("foundation insufficient: {days_practiced}/{required_days} days, {density90}%/{required_density}% density")]
    NotEligible {
        days_practiced: u32,
        required_days: u32,
        density90: u32,
        required_density: u32,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Per-realm breakthrough requirements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Requirements {
    /// Minimum `total_days_practiced`.
    pub days: u32,
    /// Minimum 90-day density, integer percent.
    pub density: u32,
}

/// Requirement table keyed by the current realm. Realms absent from
/// the table fall back to 30 days / 40% density.
pub fn requirements(realm: Realm) -> Requirements {
    match realm {
        Realm::Mortal => Requirements { days: 30, density: 40 },
        Realm::QiCondensation => Requirements { days: 60, density: 50 },
        Realm::FoundationEstablishment => Requirements { days: 90, density: 55 },
        Realm::CoreFormation => Requirements { days: 120, density: 60 },
        Realm::NascentSoul => Requirements { days: 180, density: 65 },
        Realm::SpiritSevering => Requirements { days: 270, density: 70 },
        Realm::DaoSeeking => Requirements { days: 365, density: 75 },
        _ => Requirements { days: 30, density: 40 },
    }
}

/// Classification of the practice trend within a window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trend {
    Increasing,
    Stable,
    Decreasing,
}

impl Trend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Trend::Increasing => "Increasing",
            Trend::Stable => "Stable",
            Trend::Decreasing => "Decreasing",
        }
    }
}

fn days_back(date: NaiveDate, days: u32) -> NaiveDate {
    date.checked_sub_days(Days::new(u64::from(days)))
        .unwrap_or(NaiveDate::MIN)
}

/// Practiced-day density over the trailing `window_days`, as an integer
/// percentage rounded to nearest. Days with `date >= reference -
/// window_days` count. Duplicate same-day records overcount; the
/// journal prevents them at write time.
pub fn density(window_days: u32, practices: &[Practice], reference: NaiveDate) -> u32 {
    if window_days == 0 {
        return 0;
    }
    let cutoff = days_back(reference, window_days);
    let practiced = practices
        .iter()
        .filter(|p| p.practiced && p.date >= cutoff)
        .count();
    ((practiced as f64 / window_days as f64) * 100.0).round() as u32
}

/// Two-bucket trend heuristic: split the window at `floor(window/2)`
/// days before `reference`, compare per-half densities, and call any
/// delta within [`TREND_THRESHOLD`] stable. Deliberately not a
/// regression.
pub fn trend(window_days: u32, practices: &[Practice], reference: NaiveDate) -> Trend {
    let half_window = window_days / 2;
    if half_window == 0 {
        return Trend::Stable;
    }
    let cutoff = days_back(reference, window_days);
    let midpoint = days_back(reference, half_window);

    let older = practices
        .iter()
        .filter(|p| p.practiced && p.date >= cutoff && p.date < midpoint)
        .count();
    let newer = practices
        .iter()
        .filter(|p| p.practiced && p.date >= midpoint)
        .count();

    let older_density = older as f64 / half_window as f64;
    let newer_density = newer as f64 / half_window as f64;

    if newer_density > older_density + TREND_THRESHOLD {
        Trend::Increasing
    } else if newer_density < older_density - TREND_THRESHOLD {
        Trend::Decreasing
    } else {
        Trend::Stable
    }
}

/// Density, practiced-day count, and trend for one window.
#[derive(Debug, Clone, Copy)]
pub struct WindowStats {
    pub window_days: u32,
    pub density_pct: u32,
    pub practiced_days: u32,
    pub trend: Trend,
}

pub fn window_stats(window_days: u32, practices: &[Practice], reference: NaiveDate) -> WindowStats {
    let cutoff = days_back(reference, window_days);
    let practiced_days = practices
        .iter()
        .filter(|p| p.practiced && p.date >= cutoff)
        .count() as u32;
    WindowStats {
        window_days,
        density_pct: density(window_days, practices, reference),
        practiced_days,
        trend: trend(window_days, practices, reference),
    }
}

/// Whole days since the path was started.
pub fn days_on_path(cultivation: &Cultivation, today: NaiveDate) -> i64 {
    (today - cultivation.cultivation_started).num_days()
}

/// What one logged day looked like, for the history grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayStatus {
    Practiced,
    Rested,
    Unlogged,
}

#[derive(Debug, Clone, Copy)]
pub struct DayMark {
    pub date: NaiveDate,
    pub status: DayStatus,
}

/// Per-day classification over the trailing window, oldest first. The
/// window covers `window_days` calendar days ending at `reference`.
pub fn day_marks(window_days: u32, practices: &[Practice], reference: NaiveDate) -> Vec<DayMark> {
    let start = days_back(reference, window_days.saturating_sub(1));
    start
        .iter_days()
        .take_while(|d| *d <= reference)
        .map(|date| {
            let status = match practices.iter().find(|p| p.date == date) {
                Some(p) if p.practiced => DayStatus::Practiced,
                Some(_) => DayStatus::Rested,
                None => DayStatus::Unlogged,
            };
            DayMark { date, status }
        })
        .collect()
}

/// Next point on the 32-step ladder, or `None` at the terminal stage.
pub fn next_stage(realm: Realm, phase: Phase) -> Option<(Realm, Phase)> {
    match phase.next() {
        Some(next_phase) => Some((realm, next_phase)),
        None => realm.next().map(|next_realm| (next_realm, Phase::Early)),
    }
}

/// True when both requirement axes are met.
pub fn is_eligible(cultivation: &Cultivation, density90: u32) -> bool {
    let req = requirements(cultivation.current_realm);
    cultivation.total_days_practiced >= req.days && density90 >= req.density
}

/// Success chance in percent: 50 base, plus half a point per practiced
/// day beyond the requirement and one point per density point beyond
/// it, capped at 85.
pub fn success_chance(cultivation: &Cultivation, density90: u32) -> f64 {
    let req = requirements(cultivation.current_realm);
    let extra_days = cultivation.total_days_practiced.saturating_sub(req.days) as f64;
    let extra_density = density90.saturating_sub(req.density) as f64;
    (BASE_CHANCE + extra_days * CHANCE_PER_EXTRA_DAY + extra_density * CHANCE_PER_EXTRA_DENSITY)
        .min(MAX_CHANCE)
}

/// One uniform draw in [0, 100); success iff it lands under `chance`.
fn roll<R: Rng>(chance: f64, rng: &mut R) -> bool {
    rng.gen_range(0.0..100.0) < chance
}

/// Result of a breakthrough attempt.
#[derive(Debug, Clone)]
pub struct BreakthroughOutcome {
    pub success: bool,
    pub chance: f64,
    pub from: (Realm, Phase),
    /// The stage that was (success) or would have been (failure)
    /// reached.
    pub target: (Realm, Phase),
}

/// Attempt a breakthrough for one cultivation path.
///
/// Reads the current counters, checks the next stage exists and the
/// requirements are met, draws the outcome, and commits: on success the
/// new realm/phase plus the attempt date, on failure the attempt date
/// alone. The store serializes the commit, so a racing second
/// submission observes the already-advanced stage rather than
/// advancing twice.
pub async fn attempt_breakthrough<R: Rng>(
    cultivations: &EntityStore<Cultivation>,
    id: &str,
    density90: u32,
    today: NaiveDate,
    rng: &mut R,
) -> Result<BreakthroughOutcome, ProgressionError> {
    let cultivation = cultivations
        .get(id)
        .await
        .ok_or_else(|| ProgressionError::UnknownPath(id.to_string()))?;

    let target = next_stage(cultivation.current_realm, cultivation.realm_phase)
        .ok_or(ProgressionError::TerminalStage)?;

    let req = requirements(cultivation.current_realm);
    if !is_eligible(&cultivation, density90) {
        return Err(ProgressionError::NotEligible {
            days_practiced: cultivation.total_days_practiced,
            required_days: req.days,
            density90,
            required_density: req.density,
        });
    }

    let chance = success_chance(&cultivation, density90);
    let success = roll(chance, rng);

    let patch = if success {
        CultivationPatch {
            current_realm: Some(target.0),
            realm_phase: Some(target.1),
            last_breakthrough_attempt: Some(today),
            ..Default::default()
        }
    } else {
        CultivationPatch {
            last_breakthrough_attempt: Some(today),
            ..Default::default()
        }
    };
    cultivations.update(id, patch).await?;

    Ok(BreakthroughOutcome {
        success,
        chance,
        from: (cultivation.current_realm, cultivation.realm_phase),
        target,
    })
}
