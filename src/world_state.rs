//! # World State Module
//!
//! A [`WorldState`] is one node of the planner's search graph. It combines
//! a [`UnitLedger`] and a [`ResourceLedger`] with the cargo workers are
//! carrying back to the stockpile, the cost accumulated from the initial
//! state, and the heuristic estimate to the goal.
//!
//! States are never mutated once the successor generator has produced
//! them; actions build new states from copies. The predecessor is stored
//! as an index into the search arena instead of a reference.

use std::collections::BTreeMap;
use std::fmt;

use crate::resource::{ResourceId, ResourceKind, ResourceLedger};
use crate::unit::{UnitId, UnitLedger};

/// How two states are judged to be the same during duplicate detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DuplicatePolicy {
    /// Full ledger content: unit statuses, remaining amounts, stockpiles
    /// and cargo. Accumulated cost is not part of the key.
    #[default]
    Exact,
    /// Stockpile totals, worker count and accumulated cost only. Cheaper to
    /// hash but conflates states that deplete deposits differently.
    Coarse,
}

/// Hashable identity of a [`WorldState`] under a [`DuplicatePolicy`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StateKey {
    Exact {
        units: UnitLedger,
        resources: ResourceLedger,
        cargo: BTreeMap<UnitId, ResourceId>,
    },
    Coarse {
        gold: i64,
        wood: i64,
        workers: usize,
        cost: u64,
    },
}

#[derive(Debug, Clone)]
pub struct WorldState {
    units: UnitLedger,
    resources: ResourceLedger,
    cargo: BTreeMap<UnitId, ResourceId>,
    cost: f64,
    heuristic: f64,
    parent: Option<usize>,
}

impl WorldState {
    /// Creates a root state with zero cost and no predecessor.
    pub fn new(units: UnitLedger, resources: ResourceLedger) -> Self {
        Self {
            units,
            resources,
            cargo: BTreeMap::new(),
            cost: 0.0,
            heuristic: 0.0,
            parent: None,
        }
    }

    pub fn units(&self) -> &UnitLedger {
        &self.units
    }

    pub fn resources(&self) -> &ResourceLedger {
        &self.resources
    }

    pub(crate) fn units_mut(&mut self) -> &mut UnitLedger {
        &mut self.units
    }

    pub(crate) fn resources_mut(&mut self) -> &mut ResourceLedger {
        &mut self.resources
    }

    /// Deposit the unit gathered from and has not delivered yet.
    pub fn carrying(&self, unit: UnitId) -> Option<ResourceId> {
        self.cargo.get(&unit).copied()
    }

    /// All cargo currently on its way to the stockpile.
    pub fn cargo(&self) -> impl Iterator<Item = (UnitId, ResourceId)> + '_ {
        self.cargo.iter().map(|(u, r)| (*u, *r))
    }

    pub(crate) fn load_cargo(&mut self, unit: UnitId, resource: ResourceId) {
        self.cargo.insert(unit, resource);
    }

    pub(crate) fn unload_cargo(&mut self, unit: UnitId) -> Option<ResourceId> {
        self.cargo.remove(&unit)
    }

    pub fn cost(&self) -> f64 {
        self.cost
    }

    pub(crate) fn set_cost(&mut self, cost: f64) {
        self.cost = cost;
    }

    pub fn heuristic(&self) -> f64 {
        self.heuristic
    }

    pub(crate) fn set_heuristic(&mut self, heuristic: f64) {
        self.heuristic = heuristic;
    }

    /// `cost + heuristic`, the A* priority.
    pub fn estimate(&self) -> f64 {
        self.cost + self.heuristic
    }

    pub fn parent(&self) -> Option<usize> {
        self.parent
    }

    pub(crate) fn set_parent(&mut self, parent: Option<usize>) {
        self.parent = parent;
    }

    pub fn is_goal(&self) -> bool {
        self.resources.is_goal_met()
    }

    pub fn is_goal_exceeded(&self) -> bool {
        self.resources.is_goal_exceeded()
    }

    pub fn key(&self, policy: DuplicatePolicy) -> StateKey {
        match policy {
            DuplicatePolicy::Exact => StateKey::Exact {
                units: self.units.clone(),
                resources: self.resources.clone(),
                cargo: self.cargo.clone(),
            },
            DuplicatePolicy::Coarse => StateKey::Coarse {
                gold: self.resources.stockpile(ResourceKind::Gold),
                wood: self.resources.stockpile(ResourceKind::Wood),
                workers: self.units.worker_count(),
                cost: self.cost.to_bits(),
            },
        }
    }
}

impl fmt::Display for WorldState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "gold: {}, wood: {}, workers: {}, in transit: {}, cost: {}, heuristic: {}",
            self.resources.stockpile(ResourceKind::Gold),
            self.resources.stockpile(ResourceKind::Wood),
            self.units.worker_count(),
            self.cargo.len(),
            self.cost,
            self.heuristic
        )
    }
}
