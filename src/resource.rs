//! # Resource Module
//!
//! Depletable deposits and the stockpiles they feed. The
//! [`ResourceLedger`] owns the remaining amount of every deposit, the
//! current gold and wood totals, and the [`Goal`] those totals must reach.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::error::{PlanError, Result};
use crate::goal::Goal;

/// Planner-internal identity of a deposit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ResourceId(pub u32);

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "resource#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum ResourceKind {
    Gold,
    Wood,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 2] = [ResourceKind::Gold, ResourceKind::Wood];

    /// Name of the goal criterion this kind is measured against.
    pub fn key(self) -> &'static str {
        match self {
            ResourceKind::Gold => "gold",
            ResourceKind::Wood => "wood",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// A deposit. Its distance to the stockpile is fixed for the episode.
#[derive(Debug, Clone, Copy)]
pub struct Resource {
    id: ResourceId,
    kind: ResourceKind,
    distance: f64,
}

impl Resource {
    pub fn new(id: ResourceId, kind: ResourceKind, distance: f64) -> Self {
        Self { id, kind, distance }
    }

    pub fn id(&self) -> ResourceId {
        self.id
    }

    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    pub fn distance(&self) -> f64 {
        self.distance
    }
}

impl PartialEq for Resource {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Resource {}

impl Hash for Resource {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

/// Remaining amounts, stockpile totals and the goal.
///
/// The resource catalog and goal are shared between all states of an
/// episode; equality and hashing only look at the amounts.
#[derive(Debug, Clone)]
pub struct ResourceLedger {
    catalog: Arc<BTreeMap<ResourceId, Resource>>,
    remaining: BTreeMap<ResourceId, i64>,
    gold: i64,
    wood: i64,
    goal: Arc<Goal<i64>>,
}

impl ResourceLedger {
    pub fn new(
        resources: impl IntoIterator<Item = (Resource, i64)>,
        gold: i64,
        wood: i64,
        goal: Goal<i64>,
    ) -> Self {
        let mut catalog = BTreeMap::new();
        let mut remaining = BTreeMap::new();
        for (resource, amount) in resources {
            catalog.insert(resource.id, resource);
            remaining.insert(resource.id, amount);
        }
        Self {
            catalog: Arc::new(catalog),
            remaining,
            gold,
            wood,
            goal: Arc::new(goal),
        }
    }

    /// Applies `delta` to a deposit's remaining amount.
    ///
    /// Returns `true` when the deposit is depleted afterwards. Depleted
    /// deposits stay in the ledger.
    pub fn adjust_remaining(&mut self, resource: ResourceId, delta: i64) -> Result<bool> {
        let remaining = self
            .remaining
            .get_mut(&resource)
            .ok_or(PlanError::UnknownResource(resource))?;
        *remaining += delta;
        Ok(*remaining <= 0)
    }

    /// Applies `delta` to a stockpile. Not clamped.
    pub fn adjust_stockpile(&mut self, kind: ResourceKind, delta: i64) {
        match kind {
            ResourceKind::Gold => self.gold += delta,
            ResourceKind::Wood => self.wood += delta,
        }
    }

    pub fn stockpile(&self, kind: ResourceKind) -> i64 {
        match kind {
            ResourceKind::Gold => self.gold,
            ResourceKind::Wood => self.wood,
        }
    }

    pub fn has_enough(&self, kind: ResourceKind, amount: i64) -> bool {
        self.stockpile(kind) >= amount
    }

    pub fn resource(&self, resource: ResourceId) -> Option<&Resource> {
        self.catalog.get(&resource)
    }

    pub fn remaining(&self, resource: ResourceId) -> Option<i64> {
        self.remaining.get(&resource).copied()
    }

    pub fn is_eligible(&self, resource: ResourceId) -> bool {
        self.remaining(resource).map_or(false, |r| r > 0)
    }

    /// Every deposit in identity order with its remaining amount.
    pub fn resources(&self) -> impl Iterator<Item = (&Resource, i64)> {
        self.catalog
            .values()
            .map(move |r| (r, self.remaining.get(&r.id).copied().unwrap_or(0)))
    }

    /// Deposits that can still be gathered from.
    pub fn eligible_resources(&self) -> impl Iterator<Item = &Resource> {
        self.resources()
            .filter(|(_, remaining)| *remaining > 0)
            .map(|(r, _)| r)
    }

    pub fn nearest_eligible_distance(&self, kind: ResourceKind) -> Option<f64> {
        self.eligible_resources()
            .filter(|r| r.kind == kind)
            .map(|r| r.distance)
            .min_by(f64::total_cmp)
    }

    pub fn goal(&self) -> &Goal<i64> {
        &self.goal
    }

    /// Stockpile totals keyed by goal criterion name.
    pub fn goal_values(&self) -> HashMap<String, i64> {
        ResourceKind::ALL
            .iter()
            .map(|k| (k.key().to_string(), self.stockpile(*k)))
            .collect()
    }

    pub fn is_goal_met(&self) -> bool {
        self.goal.is_satisfied(&self.goal_values())
    }

    pub fn is_goal_exceeded(&self) -> bool {
        self.goal.is_exceeded(&self.goal_values())
    }

    /// Sum of remaining shortfall across criteria; negative on overshoot.
    pub fn diff_from_goal(&self) -> i64 {
        self.goal.difference(&self.goal_values())
    }

    /// Amount of `kind` still missing, or zero if the goal does not name it.
    pub fn shortfall(&self, kind: ResourceKind) -> i64 {
        self.goal
            .criterion(kind.key())
            .map_or(0, |c| c.objective() - self.stockpile(kind))
    }
}

impl PartialEq for ResourceLedger {
    fn eq(&self, other: &Self) -> bool {
        self.gold == other.gold && self.wood == other.wood && self.remaining == other.remaining
    }
}

impl Eq for ResourceLedger {}

impl Hash for ResourceLedger {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.gold.hash(state);
        self.wood.hash(state);
        self.remaining.hash(state);
    }
}
