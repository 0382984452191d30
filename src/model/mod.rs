use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Name of the bucket holding cases not assigned to any municipality.
///
/// This bucket has no stable code, so it is matched across snapshots by
/// name only.
pub const UNKNOWN_BUCKET: &str = "Ukjent";

/// Tracked count metric
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    Confirmed,
    Dead,
    Recovered,
}

impl Metric {
    /// All metrics in display order
    pub const ALL: [Metric; 3] = [Metric::Confirmed, Metric::Dead, Metric::Recovered];

    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::Confirmed => "confirmed",
            Metric::Dead => "dead",
            Metric::Recovered => "recovered",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Aggregate counts for the whole dataset
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Totals {
    pub confirmed: u64,
    pub dead: u64,
    pub recovered: u64,
}

impl Totals {
    pub fn get(&self, metric: Metric) -> u64 {
        match metric {
            Metric::Confirmed => self.confirmed,
            Metric::Dead => self.dead,
            Metric::Recovered => self.recovered,
        }
    }
}

/// A tracked sub-population (a municipality, or the unknown bucket)
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    /// Stable municipality code; absent for the unknown bucket
    pub code: Option<String>,

    /// Display name (e.g., "Bergen")
    pub name: String,

    /// Parent region shown next to the name (e.g., "Vestland")
    pub parent: Option<String>,

    pub confirmed: u64,
    pub dead: u64,
    pub recovered: u64,

    /// Confirmed cases per 1000 inhabitants
    pub confirmed_per_capita: f64,
}

/// Key used to match an entity across two snapshots
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum EntityIdentity<'a> {
    /// The unknown bucket, matched by name
    Unknown,
    /// Any other entity, matched by code
    Code(&'a str),
}

impl Entity {
    pub fn get(&self, metric: Metric) -> u64 {
        match metric {
            Metric::Confirmed => self.confirmed,
            Metric::Dead => self.dead,
            Metric::Recovered => self.recovered,
        }
    }

    pub fn is_unknown_bucket(&self) -> bool {
        self.name == UNKNOWN_BUCKET
    }

    /// Returns the matching key for this entity.
    ///
    /// The unknown bucket always yields `Unknown`, whatever its code field
    /// holds. Returns None for a regular entity without a code.
    pub fn identity(&self) -> Option<EntityIdentity<'_>> {
        if self.is_unknown_bucket() {
            return Some(EntityIdentity::Unknown);
        }
        self.code.as_deref().map(EntityIdentity::Code)
    }

    /// Name with parent label, e.g. "Bergen (Vestland)"
    pub fn display_name(&self) -> String {
        match &self.parent {
            Some(parent) => format!("{} ({})", self.name, parent),
            None => self.name.clone(),
        }
    }
}

/// Full state of the tracked dataset at a point in time
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub totals: Totals,

    /// Entities in source order
    pub entities: Vec<Entity>,
}

impl Snapshot {
    /// Get entity count (for logging)
    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }
}

/// Persisted record of the last observed snapshot
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StoredState {
    /// When the snapshot was stored
    pub last_updated: DateTime<Utc>,

    /// None until the first successful fetch has been stored
    pub snapshot: Option<Snapshot>,
}

impl StoredState {
    /// State written on first run, before any data was fetched
    pub fn empty() -> Self {
        Self {
            last_updated: Utc::now(),
            snapshot: None,
        }
    }
}
