//! # Planner Module
//!
//! The planner is the entry point of the crate. It:
//! - validates a [`Snapshot`] of the economy handed over by state ingestion,
//! - builds the initial [`WorldState`] and the episode [`Rules`],
//! - runs a search algorithm (A* by default) and returns the [`Plan`].
//!
//! ## Basic Usage
//!
//! ```
//! use stripsrs::{
//!     Action, Planner, ProducerDescriptor, ResourceDescriptor, ResourceId, ResourceKind,
//!     Snapshot, UnitId, WorkerDescriptor,
//! };
//!
//! let snapshot = Snapshot {
//!     workers: vec![WorkerDescriptor::new(UnitId(1), 400, 0)],
//!     producer: Some(ProducerDescriptor::new(UnitId(2), 400, 0)),
//!     resources: vec![ResourceDescriptor::new(ResourceId(10), ResourceKind::Gold, 5.0, 300)],
//!     required_gold: 200,
//!     ..Snapshot::default()
//! };
//!
//! let plan = Planner::default().plan(&snapshot).unwrap();
//! let names: Vec<_> = plan.actions().map(Action::name).collect();
//! assert_eq!(names, ["gather", "deposit", "gather", "deposit"]);
//! assert_eq!(plan.cost(), 10.0);
//! ```
//!
//! An unreachable goal is reported as [`PlanError::NoPlanFound`], not as an
//! empty plan:
//!
//! ```
//! use stripsrs::{PlanError, Planner, ProducerDescriptor, Snapshot, UnitId};
//!
//! let snapshot = Snapshot {
//!     producer: Some(ProducerDescriptor::new(UnitId(1), 400, 0)),
//!     required_gold: 100,
//!     ..Snapshot::default()
//! };
//! assert!(matches!(Planner::default().plan(&snapshot), Err(PlanError::NoPlanFound)));
//! ```

use std::collections::HashSet;

use crate::action::Rules;
use crate::error::{PlanError, Result};
use crate::goal::Goal;
use crate::resource::{Resource, ResourceId, ResourceKind, ResourceLedger};
use crate::search::{AStarSearch, ExceededPolicy, HeuristicKind, Plan, SearchAlgorithm};
use crate::unit::{IdGenerator, ProductionCost, Status, Unit, UnitId, UnitLedger};
use crate::world_state::{DuplicatePolicy, WorldState};

/// A worker as seen by state ingestion.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WorkerDescriptor {
    pub id: UnitId,
    pub cost: ProductionCost,
}

impl WorkerDescriptor {
    pub fn new(id: UnitId, gold_cost: i64, wood_cost: i64) -> Self {
        Self {
            id,
            cost: ProductionCost::new(gold_cost, wood_cost),
        }
    }
}

/// The stockpile building that also trains new workers.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ProducerDescriptor {
    pub id: UnitId,
    /// Stockpile cost of one trained worker.
    pub worker_cost: ProductionCost,
}

impl ProducerDescriptor {
    pub fn new(id: UnitId, worker_gold: i64, worker_wood: i64) -> Self {
        Self {
            id,
            worker_cost: ProductionCost::new(worker_gold, worker_wood),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ResourceDescriptor {
    pub id: ResourceId,
    pub kind: ResourceKind,
    /// Euclidean distance to the stockpile.
    pub distance: f64,
    pub remaining: i64,
}

impl ResourceDescriptor {
    pub fn new(id: ResourceId, kind: ResourceKind, distance: f64, remaining: i64) -> Self {
        Self {
            id,
            kind,
            distance,
            remaining,
        }
    }
}

/// Everything the planner needs to know about the economy.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Snapshot {
    pub workers: Vec<WorkerDescriptor>,
    pub producer: Option<ProducerDescriptor>,
    pub resources: Vec<ResourceDescriptor>,
    pub gold: i64,
    pub wood: i64,
    pub required_gold: i64,
    pub required_wood: i64,
    /// Whether the plan may train additional workers.
    pub produce_workers: bool,
}

impl Snapshot {
    /// Checks the snapshot for missing or inconsistent entities.
    pub fn validate(&self) -> Result<()> {
        let producer = self
            .producer
            .ok_or_else(|| PlanError::MissingEntity("producer".to_string()))?;

        let mut unit_ids = HashSet::new();
        for id in self.workers.iter().map(|w| w.id).chain(Some(producer.id)) {
            if !unit_ids.insert(id) {
                return Err(PlanError::InvalidSnapshot(format!("duplicate {}", id)));
            }
            if id.0 == u32::MAX {
                return Err(PlanError::InvalidSnapshot(format!(
                    "{} leaves no identity for planned units",
                    id
                )));
            }
        }

        let mut resource_ids = HashSet::new();
        for resource in &self.resources {
            if !resource_ids.insert(resource.id) {
                return Err(PlanError::InvalidSnapshot(format!("duplicate {}", resource.id)));
            }
            if !resource.distance.is_finite() || resource.distance < 0.0 {
                return Err(PlanError::InvalidSnapshot(format!(
                    "{} has distance {}",
                    resource.id, resource.distance
                )));
            }
            if resource.remaining < 0 {
                return Err(PlanError::InvalidSnapshot(format!(
                    "{} has negative remaining amount {}",
                    resource.id, resource.remaining
                )));
            }
        }

        let amounts = [
            ("gold stockpile", self.gold),
            ("wood stockpile", self.wood),
            ("required gold", self.required_gold),
            ("required wood", self.required_wood),
            ("worker gold cost", producer.worker_cost.gold),
            ("worker wood cost", producer.worker_cost.wood),
        ];
        if let Some((name, value)) = amounts.iter().find(|(_, v)| *v < 0) {
            return Err(PlanError::InvalidSnapshot(format!("{} is negative ({})", name, value)));
        }
        Ok(())
    }
}

/// Tunables of a planning run.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannerConfig {
    /// Amount moved by one Gather/Deposit pair.
    pub batch_size: i64,
    pub idle_cost: f64,
    pub produce_cost: f64,
    /// Expansion budget; `None` searches until the open set is empty.
    pub max_expansions: Option<usize>,
    pub duplicate_policy: DuplicatePolicy,
    pub exceeded_policy: ExceededPolicy,
    pub heuristic: HeuristicKind,
    /// Lowest identity handed to planned units. The planner always starts
    /// above every identity in the snapshot.
    pub id_floor: u32,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            batch_size: 100,
            idle_cost: 0.0,
            produce_cost: 1.0,
            max_expansions: Some(250_000),
            duplicate_policy: DuplicatePolicy::Exact,
            exceeded_policy: ExceededPolicy::Prune,
            heuristic: HeuristicKind::TripLowerBound,
            id_floor: 0,
        }
    }
}

impl PlannerConfig {
    pub fn with_max_expansions(mut self, limit: Option<usize>) -> Self {
        self.max_expansions = limit;
        self
    }

    pub fn with_duplicate_policy(mut self, policy: DuplicatePolicy) -> Self {
        self.duplicate_policy = policy;
        self
    }

    pub fn with_exceeded_policy(mut self, policy: ExceededPolicy) -> Self {
        self.exceeded_policy = policy;
        self
    }

    pub fn with_heuristic(mut self, heuristic: HeuristicKind) -> Self {
        self.heuristic = heuristic;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.batch_size <= 0 {
            return Err(PlanError::InvalidConfig(format!(
                "batch size must be positive, got {}",
                self.batch_size
            )));
        }
        for (name, cost) in [("idle cost", self.idle_cost), ("produce cost", self.produce_cost)] {
            if !cost.is_finite() || cost < 0.0 {
                return Err(PlanError::InvalidConfig(format!(
                    "{} must be a non-negative number, got {}",
                    name, cost
                )));
            }
        }
        Ok(())
    }

    /// Search algorithm described by this configuration.
    pub fn search_algorithm(&self) -> AStarSearch {
        AStarSearch::new(self.heuristic.strategy())
            .with_duplicate_policy(self.duplicate_policy)
            .with_exceeded_policy(self.exceeded_policy)
            .with_max_expansions(self.max_expansions)
    }
}

pub struct Planner {
    config: PlannerConfig,
    search_algorithm: Box<dyn SearchAlgorithm + Send + Sync>,
}

impl Planner {
    pub fn new(config: PlannerConfig) -> Self {
        let search_algorithm = Box::new(config.search_algorithm());
        Self {
            config,
            search_algorithm,
        }
    }

    pub fn with_search_algorithm(
        config: PlannerConfig,
        search_algorithm: Box<dyn SearchAlgorithm + Send + Sync>,
    ) -> Self {
        Self {
            config,
            search_algorithm,
        }
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    pub fn rules(&self, snapshot: &Snapshot) -> Rules {
        Rules {
            batch_size: self.config.batch_size,
            idle_cost: self.config.idle_cost,
            produce_cost: self.config.produce_cost,
            produce_workers: snapshot.produce_workers,
            worker_cost: snapshot
                .producer
                .map(|p| p.worker_cost)
                .unwrap_or_default(),
        }
    }

    /// Builds the root search node for `snapshot`.
    pub fn initial_state(&self, snapshot: &Snapshot) -> Result<WorldState> {
        snapshot.validate()?;
        let producer = snapshot
            .producer
            .ok_or_else(|| PlanError::MissingEntity("producer".to_string()))?;

        let largest = snapshot
            .workers
            .iter()
            .map(|w| w.id.0)
            .chain(Some(producer.id.0))
            .max()
            .unwrap_or(0);
        let first_free = largest.checked_add(1).ok_or_else(|| {
            PlanError::InvalidSnapshot(format!("no identity left above {}", UnitId(largest)))
        })?;
        let mut units = UnitLedger::new(IdGenerator::starting_at(first_free.max(self.config.id_floor)));

        for worker in &snapshot.workers {
            units.track(Unit::worker(worker.id, worker.cost), Status::Idle);
        }
        units.track(Unit::producer(producer.id), Status::Idle);

        let goal = Goal::new()
            .specify(ResourceKind::Gold.key(), snapshot.required_gold)
            .specify(ResourceKind::Wood.key(), snapshot.required_wood);
        let resources = ResourceLedger::new(
            snapshot
                .resources
                .iter()
                .map(|r| (Resource::new(r.id, r.kind, r.distance), r.remaining)),
            snapshot.gold,
            snapshot.wood,
            goal,
        );

        Ok(WorldState::new(units, resources))
    }

    /// Finds the cheapest sequence of rounds that reaches the goal.
    pub fn plan(&self, snapshot: &Snapshot) -> Result<Plan> {
        self.config.validate()?;
        let initial = self.initial_state(snapshot)?;
        let rules = self.rules(snapshot);

        log::info!(
            "planning for gold={} wood={} with {} workers and {} deposits (produce: {})",
            snapshot.required_gold,
            snapshot.required_wood,
            snapshot.workers.len(),
            snapshot.resources.len(),
            snapshot.produce_workers
        );

        match self.search_algorithm.search(initial, &rules) {
            Ok(plan) => {
                log::info!(
                    "found plan with {} rounds, cost {}, {} states expanded",
                    plan.len(),
                    plan.cost(),
                    plan.expanded()
                );
                for (i, step) in plan.steps().iter().enumerate() {
                    log::debug!("  Round {}: {}", i + 1, step.action);
                }
                Ok(plan)
            }
            Err(e) => {
                log::info!("no plan: {}", e);
                Err(e)
            }
        }
    }
}

impl Default for Planner {
    fn default() -> Self {
        Self::new(PlannerConfig::default())
    }
}

impl Clone for Planner {
    fn clone(&self) -> Self {
        // Boxed algorithms cannot be cloned; rebuild the one the config describes.
        Self::new(self.config.clone())
    }
}
