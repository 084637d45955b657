mod action;
mod error;
mod goal;
mod planner;
mod resource;
mod search;
mod successor;
mod unit;
mod visualizer;
mod world_state;

pub use action::{Action, CompositeAction, Rules};
pub use error::{PlanError, Result};
pub use goal::{Criterion, Goal};
pub use planner::{
    Planner, PlannerConfig, ProducerDescriptor, ResourceDescriptor, Snapshot, WorkerDescriptor,
};
pub use resource::{Resource, ResourceId, ResourceKind, ResourceLedger};
pub use search::{
    AStarSearch, ExceededPolicy, GoalDifference, HeuristicKind, HeuristicStrategy, Plan, PlanStep,
    SearchAlgorithm, TripLowerBound, ZeroHeuristic,
};
pub use successor::{candidates, successors, Successor};
pub use unit::{
    IdGenerator, ProductionCost, Status, StatusSet, Unit, UnitId, UnitLedger,
};
pub use visualizer::PlanVisualizer;
pub use world_state::{DuplicatePolicy, StateKey, WorldState};
