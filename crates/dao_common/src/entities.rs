//! Entity Schema
//!
//! Typed record shapes for the two persisted collections: Cultivation
//! (one per pursuit) and Practice (at most one per pursuit per day).
//! Records round-trip through JSON, so field names and value formats
//! match the stored blobs exactly (`yyyy-MM-dd` dates, ISO-8601
//! timestamps).

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// The eight cultivation realms, in strict ascending order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Realm {
    Mortal,
    #[serde(rename = "Qi Condensation")]
    QiCondensation,
    #[serde(rename = "Foundation Establishment")]
    FoundationEstablishment,
    #[serde(rename = "Core Formation")]
    CoreFormation,
    #[serde(rename = "Nascent Soul")]
    NascentSoul,
    #[serde(rename = "Spirit Severing")]
    SpiritSevering,
    #[serde(rename = "Dao Seeking")]
    DaoSeeking,
    #[serde(rename = "Immortal Ascension")]
    ImmortalAscension,
}

/// Realm order for successor lookup.
pub const REALM_ORDER: &[Realm] = &[
    Realm::Mortal,
    Realm::QiCondensation,
    Realm::FoundationEstablishment,
    Realm::CoreFormation,
    Realm::NascentSoul,
    Realm::SpiritSevering,
    Realm::DaoSeeking,
    Realm::ImmortalAscension,
];

impl Realm {
    pub fn as_str(&self) -> &'static str {
        match self {
            Realm::Mortal => "Mortal",
            Realm::QiCondensation => "Qi Condensation",
            Realm::FoundationEstablishment => "Foundation Establishment",
            Realm::CoreFormation => "Core Formation",
            Realm::NascentSoul => "Nascent Soul",
            Realm::SpiritSevering => "Spirit Severing",
            Realm::DaoSeeking => "Dao Seeking",
            Realm::ImmortalAscension => "Immortal Ascension",
        }
    }

    /// Next realm in the ladder, or `None` at Immortal Ascension.
    pub fn next(&self) -> Option<Realm> {
        let idx = REALM_ORDER.iter().position(|r| r == self)?;
        REALM_ORDER.get(idx + 1).copied()
    }
}

/// The four phases within a realm, in ascending order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Phase {
    Early,
    Mid,
    Late,
    Peak,
}

/// Phase order for successor lookup.
pub const PHASE_ORDER: &[Phase] = &[Phase::Early, Phase::Mid, Phase::Late, Phase::Peak];

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Early => "Early",
            Phase::Mid => "Mid",
            Phase::Late => "Late",
            Phase::Peak => "Peak",
        }
    }

    /// Next phase within the realm, or `None` at Peak.
    pub fn next(&self) -> Option<Phase> {
        let idx = PHASE_ORDER.iter().position(|p| p == self)?;
        PHASE_ORDER.get(idx + 1).copied()
    }
}

/// Descriptive state of a cultivation path. Never derived by the
/// calculator; the user sets it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CultivationState {
    Advancing,
    Stagnating,
    Recovering,
}

impl CultivationState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CultivationState::Advancing => "Advancing",
            CultivationState::Stagnating => "Stagnating",
            CultivationState::Recovering => "Recovering",
        }
    }
}

/// One tracked pursuit and its position on the 32-step ladder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cultivation {
    /// Store-assigned identifier, immutable after creation.
    #[serde(default)]
    pub id: String,
    /// User-chosen label for the pursuit.
    pub dao_name: String,
    pub current_realm: Realm,
    pub realm_phase: Phase,
    pub cultivation_state: CultivationState,
    /// Incremented exactly once per practiced day logged.
    pub total_days_practiced: u32,
    /// Immutable after creation.
    pub cultivation_started: NaiveDate,
    /// Set on every breakthrough attempt, success or not.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_breakthrough_attempt: Option<NaiveDate>,
    #[serde(default)]
    pub created_date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_date: Option<DateTime<Utc>>,
}

impl Cultivation {
    /// Fresh path at the bottom of the ladder, per the seed contract.
    pub fn new(dao_name: &str, started: NaiveDate) -> Self {
        Self {
            id: String::new(),
            dao_name: dao_name.to_string(),
            current_realm: Realm::Mortal,
            realm_phase: Phase::Early,
            cultivation_state: CultivationState::Advancing,
            total_days_practiced: 0,
            cultivation_started: started,
            last_breakthrough_attempt: None,
            created_date: None,
            updated_date: None,
        }
    }

    /// Display form of the current ladder position.
    pub fn stage_label(&self) -> String {
        format!("{} — {}", self.current_realm.as_str(), self.realm_phase.as_str())
    }
}

/// Shallow patch for a Cultivation record; every `Some` overwrites.
#[derive(Debug, Clone, Default)]
pub struct CultivationPatch {
    pub dao_name: Option<String>,
    pub current_realm: Option<Realm>,
    pub realm_phase: Option<Phase>,
    pub cultivation_state: Option<CultivationState>,
    pub total_days_practiced: Option<u32>,
    pub last_breakthrough_attempt: Option<NaiveDate>,
}

/// One logged day for a cultivation path: practice or explicit rest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Practice {
    #[serde(default)]
    pub id: String,
    /// Foreign reference; the store does not enforce integrity.
    pub cultivation_id: String,
    pub date: NaiveDate,
    /// `true` = practice logged, `false` = explicit rest.
    pub practiced: bool,
    /// Present only for practiced days where a duration was supplied.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_minutes: Option<u32>,
    #[serde(default)]
    pub created_date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_date: Option<DateTime<Utc>>,
}

impl Practice {
    pub fn practiced(cultivation_id: &str, date: NaiveDate, duration_minutes: Option<u32>) -> Self {
        Self {
            id: String::new(),
            cultivation_id: cultivation_id.to_string(),
            date,
            practiced: true,
            duration_minutes,
            created_date: None,
            updated_date: None,
        }
    }

    pub fn rested(cultivation_id: &str, date: NaiveDate) -> Self {
        Self {
            id: String::new(),
            cultivation_id: cultivation_id.to_string(),
            date,
            practiced: false,
            duration_minutes: None,
            created_date: None,
            updated_date: None,
        }
    }
}

/// Shallow patch for a Practice record.
#[derive(Debug, Clone, Default)]
pub struct PracticePatch {
    pub date: Option<NaiveDate>,
    pub practiced: Option<bool>,
    pub duration_minutes: Option<u32>,
}

impl crate::store::Entity for Cultivation {
    const COLLECTION: &'static str = "cultivations";

    type Patch = CultivationPatch;

    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }

    fn set_created(&mut self, ts: DateTime<Utc>) {
        self.created_date = Some(ts);
    }

    fn set_updated(&mut self, ts: DateTime<Utc>) {
        self.updated_date = Some(ts);
    }

    fn apply_patch(&mut self, patch: CultivationPatch) {
        if let Some(dao_name) = patch.dao_name {
            self.dao_name = dao_name;
        }
        if let Some(realm) = patch.current_realm {
            self.current_realm = realm;
        }
        if let Some(phase) = patch.realm_phase {
            self.realm_phase = phase;
        }
        if let Some(state) = patch.cultivation_state {
            self.cultivation_state = state;
        }
        if let Some(days) = patch.total_days_practiced {
            self.total_days_practiced = days;
        }
        if let Some(date) = patch.last_breakthrough_attempt {
            self.last_breakthrough_attempt = Some(date);
        }
    }
}

impl crate::store::Entity for Practice {
    const COLLECTION: &'static str = "practices";

    type Patch = PracticePatch;

    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }

    fn set_created(&mut self, ts: DateTime<Utc>) {
        self.created_date = Some(ts);
    }

    fn set_updated(&mut self, ts: DateTime<Utc>) {
        self.updated_date = Some(ts);
    }

    fn apply_patch(&mut self, patch: PracticePatch) {
        if let Some(date) = patch.date {
            self.date = date;
        }
        if let Some(practiced) = patch.practiced {
            self.practiced = practiced;
        }
        if let Some(minutes) = patch.duration_minutes {
            self.duration_minutes = Some(minutes);
        }
    }
}
