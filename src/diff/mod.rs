//! Change detection between the stored snapshot and a freshly fetched one.
//!
//! Only growth, change and appearance are reported. An entity present in
//! the stored snapshot but missing from the current one produces nothing.

use crate::error::{Result, WatchError};
use crate::model::{Entity, EntityIdentity, Metric, Snapshot, StoredState, Totals};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};


/// Sparse per-metric deltas; zero deltas are never stored
pub type MetricDeltas = BTreeMap<Metric, i64>;

/// Current national totals plus their nonzero deltas
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TotalsChange {
    pub current: Totals,
    pub deltas: MetricDeltas,
}

/// Deltas for one entity
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct EntityDeltas {
    pub counts: MetricDeltas,

    /// Per-capita delta, present only when nonzero. Not rendered.
    pub confirmed_per_capita: Option<f64>,
}

impl EntityDeltas {
    pub fn is_empty(&self) -> bool {
        self.counts.is_empty() && self.confirmed_per_capita.is_none()
    }
}

/// A changed or newly appeared entity
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EntityChange {
    /// Entity as it appears in the current snapshot
    pub entity: Entity,
    pub deltas: EntityDeltas,
    /// True when the entity had no counterpart in the stored snapshot
    pub is_new: bool,
}

/// Changes between the stored snapshot and the current one
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChangeSet {
    /// When the stored snapshot was taken
    pub reference_time: DateTime<Utc>,
    pub totals: TotalsChange,
    /// Changed entities in current snapshot order
    pub entities: Vec<EntityChange>,
}

/// Compute the change set between `previous` and `current`.
///
/// Returns None on first run (nothing stored yet) and when the national
/// totals are unchanged on every metric. Entity changes are only looked at
/// once the totals moved. Counts whose delta does not fit an `i64` are a
/// `FormatInconsistency`.
pub fn compute_changes(previous: &StoredState, current: &Snapshot) -> Result<Option<ChangeSet>> {
    let stored = match &previous.snapshot {
        Some(snapshot) => snapshot,
        None => return Ok(None),
    };

    if stored.totals == current.totals {
        return Ok(None);
    }

    let totals = TotalsChange {
        current: current.totals.clone(),
        deltas: count_deltas(|m| current.totals.get(m), |m| stored.totals.get(m))?,
    };

    let index = index_by_identity(stored);
    let mut entities = Vec::new();

    for entity in &current.entities {
        let identity = entity.identity().ok_or_else(|| {
            WatchError::FormatInconsistency(format!(
                "entity '{}' has no municipality code",
                entity.name
            ))
        })?;
        ensure_finite(entity)?;

        let change = match index.get(&identity) {
            Some(counterpart) => {
                ensure_finite(counterpart)?;
                let deltas = EntityDeltas {
                    counts: count_deltas(|m| entity.get(m), |m| counterpart.get(m))?,
                    confirmed_per_capita: nonzero(
                        entity.confirmed_per_capita - counterpart.confirmed_per_capita,
                    ),
                };
                if deltas.is_empty() {
                    continue;
                }
                EntityChange {
                    entity: entity.clone(),
                    deltas,
                    is_new: false,
                }
            }
            // Implicit zero baseline
            None => EntityChange {
                entity: entity.clone(),
                deltas: EntityDeltas {
                    counts: count_deltas(|m| entity.get(m), |_| 0)?,
                    confirmed_per_capita: nonzero(entity.confirmed_per_capita),
                },
                is_new: true,
            },
        };

        entities.push(change);
    }

    Ok(Some(ChangeSet {
        reference_time: previous.last_updated,
        totals,
        entities,
    }))
}

/// Map each stored entity to its matching key.
///
/// The unknown bucket is keyed as `Unknown` only, so a regular entity can
/// never match it by code. Entities without identity cannot be matched and
/// are skipped. On duplicate keys the first entity wins, same as a linear
/// scan would.
fn index_by_identity(snapshot: &Snapshot) -> HashMap<EntityIdentity<'_>, &Entity> {
    let mut index = HashMap::with_capacity(snapshot.entities.len());
    for entity in &snapshot.entities {
        if let Some(identity) = entity.identity() {
            index.entry(identity).or_insert(entity);
        }
    }
    index
}

/// Nonzero deltas per metric; counts beyond the `i64` range are rejected.
fn count_deltas(
    current: impl Fn(Metric) -> u64,
    previous: impl Fn(Metric) -> u64,
) -> Result<MetricDeltas> {
    let mut deltas = MetricDeltas::new();
    for metric in Metric::ALL {
        let (now, before) = (current(metric), previous(metric));
        let delta = signed_delta(now, before).ok_or_else(|| {
            WatchError::FormatInconsistency(format!(
                "{} delta out of range ({} -> {})",
                metric, before, now
            ))
        })?;
        if delta != 0 {
            deltas.insert(metric, delta);
        }
    }
    Ok(deltas)
}

fn signed_delta(current: u64, previous: u64) -> Option<i64> {
    i64::try_from(current)
        .ok()?
        .checked_sub(i64::try_from(previous).ok()?)
}

fn nonzero(delta: f64) -> Option<f64> {
    (delta != 0.0).then_some(delta)
}

fn ensure_finite(entity: &Entity) -> Result<()> {
    if entity.confirmed_per_capita.is_finite() {
        Ok(())
    } else {
        Err(WatchError::FormatInconsistency(format!(
            "entity '{}' has non-finite per-capita value",
            entity.name
        )))
    }
}
