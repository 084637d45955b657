//! # Action Module
//!
//! The four STRIPS actions a planning episode is built from, and the
//! [`CompositeAction`] that groups one action per unit into a single round.
//!
//! Every action has
//! - a precondition ([`Action::preconditions_met`]),
//! - a copy-on-write effect ([`Action::apply`]),
//! - a cost ([`Action::cost`]),
//! - the follow-on actions its result makes plausible ([`Action::effects`]).
//!
//! | action    | requires                                        | cost          |
//! |-----------|-------------------------------------------------|---------------|
//! | `Idle`    | unit may become idle                            | `idle_cost`   |
//! | `Gather`  | unit may gather, carries nothing, deposit left  | distance / 2  |
//! | `Deposit` | unit may deposit and carries from that deposit  | distance / 2  |
//! | `Produce` | growth enabled, stockpiles cover cost, id left  | `produce_cost`|
//!
//! ## Basic Usage
//!
//! ```
//! use stripsrs::{
//!     Action, Goal, IdGenerator, ProductionCost, Resource, ResourceId, ResourceKind,
//!     ResourceLedger, Rules, Status, Unit, UnitId, UnitLedger, WorldState,
//! };
//!
//! let mut units = UnitLedger::new(IdGenerator::starting_at(100));
//! units.track(Unit::worker(UnitId(1), ProductionCost::new(400, 0)), Status::Idle);
//! let resources = ResourceLedger::new(
//!     vec![(Resource::new(ResourceId(7), ResourceKind::Gold, 6.0), 500)],
//!     0,
//!     0,
//!     Goal::new().specify("gold", 100).specify("wood", 0),
//! );
//! let state = WorldState::new(units, resources);
//! let rules = Rules::default();
//!
//! let gather = Action::Gather { unit: UnitId(1), resource: ResourceId(7) };
//! assert!(gather.preconditions_met(&state, &rules));
//!
//! let gathered = gather.apply(&state, &rules).unwrap();
//! let deposit = Action::Deposit { unit: UnitId(1), resource: ResourceId(7) };
//! let done = deposit.apply(&gathered, &rules).unwrap();
//!
//! assert!(done.is_goal());
//! assert_eq!(done.cost(), 6.0);
//! // The source state is untouched.
//! assert_eq!(state.resources().remaining(ResourceId(7)), Some(500));
//! ```

use std::collections::BTreeSet;
use std::fmt;

use crate::error::{PlanError, Result};
use crate::resource::{ResourceId, ResourceKind};
use crate::unit::{ProductionCost, Status, StatusSet, UnitId};
use crate::world_state::WorldState;

/// Constants shared by every action of one planning episode.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rules {
    /// Amount moved by one Gather and the Deposit that follows it.
    pub batch_size: i64,
    pub idle_cost: f64,
    pub produce_cost: f64,
    /// Whether Produce may be considered at all.
    pub produce_workers: bool,
    /// Stockpile cost of one new worker.
    pub worker_cost: ProductionCost,
}

impl Default for Rules {
    fn default() -> Self {
        Self {
            batch_size: 100,
            idle_cost: 0.0,
            produce_cost: 1.0,
            produce_workers: false,
            worker_cost: ProductionCost::default(),
        }
    }
}

/// A primitive STRIPS action performed by a single unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "kind", rename_all = "lowercase"))]
pub enum Action {
    Idle {
        unit: UnitId,
    },
    Gather {
        unit: UnitId,
        resource: ResourceId,
    },
    Deposit {
        unit: UnitId,
        resource: ResourceId,
    },
    Produce {
        producer: UnitId,
        cost: ProductionCost,
    },
}

impl Action {
    /// The acting unit.
    pub fn unit(&self) -> UnitId {
        match *self {
            Action::Idle { unit }
            | Action::Gather { unit, .. }
            | Action::Deposit { unit, .. } => unit,
            Action::Produce { producer, .. } => producer,
        }
    }

    /// Status the acting unit holds after this action.
    pub fn status(&self) -> Status {
        match self {
            Action::Idle { .. } => Status::Idle,
            Action::Gather { .. } => Status::Gather,
            Action::Deposit { .. } => Status::Deposit,
            Action::Produce { .. } => Status::Produce,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Action::Idle { .. } => "idle",
            Action::Gather { .. } => "gather",
            Action::Deposit { .. } => "deposit",
            Action::Produce { .. } => "produce",
        }
    }

    /// Target deposit of a Gather or Deposit.
    pub fn resource(&self) -> Option<ResourceId> {
        match *self {
            Action::Gather { resource, .. } | Action::Deposit { resource, .. } => Some(resource),
            Action::Idle { .. } | Action::Produce { .. } => None,
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, Action::Idle { .. })
    }

    pub fn preconditions_met(&self, state: &WorldState, rules: &Rules) -> bool {
        if !state.units().can_transition(self.unit(), self.status()) {
            return false;
        }
        match *self {
            Action::Idle { .. } => true,
            Action::Gather { unit, resource } => {
                state.carrying(unit).is_none() && state.resources().is_eligible(resource)
            }
            Action::Deposit { unit, resource } => state.carrying(unit) == Some(resource),
            Action::Produce { cost, .. } => {
                let resources = state.resources();
                rules.produce_workers
                    && state.units().next_id().is_some()
                    && resources.has_enough(ResourceKind::Gold, cost.gold)
                    && resources.has_enough(ResourceKind::Wood, cost.wood)
            }
        }
    }

    /// Returns the state that results from performing this action.
    ///
    /// `state` is left untouched. The returned state's cost includes this
    /// action's cost. Fails with [`PlanError::PreconditionNotMet`] if the
    /// precondition does not hold.
    pub fn apply(&self, state: &WorldState, rules: &Rules) -> Result<WorldState> {
        if !self.preconditions_met(state, rules) {
            return Err(PlanError::PreconditionNotMet(format!("{} in state [{}]", self, state)));
        }

        let mut next = state.clone();
        next.set_cost(state.cost() + self.cost(state, rules));
        self.transition(&mut next)?;

        match *self {
            Action::Idle { .. } => {}
            Action::Gather { unit, resource } => {
                next.resources_mut()
                    .adjust_remaining(resource, -rules.batch_size)?;
                next.load_cargo(unit, resource);
            }
            Action::Deposit { unit, resource } => {
                next.unload_cargo(unit);
                let kind = next
                    .resources()
                    .resource(resource)
                    .map(|r| r.kind())
                    .ok_or(PlanError::UnknownResource(resource))?;
                next.resources_mut().adjust_stockpile(kind, rules.batch_size);
            }
            Action::Produce { cost, .. } => {
                let resources = next.resources_mut();
                resources.adjust_stockpile(ResourceKind::Gold, -cost.gold);
                resources.adjust_stockpile(ResourceKind::Wood, -cost.wood);
                let worker = next
                    .units_mut()
                    .create_and_track(Status::Idle, StatusSet::WORKER, cost)?;
                log::trace!("planned production of {}", worker.id());
            }
        }
        Ok(next)
    }

    fn transition(&self, state: &mut WorldState) -> Result<()> {
        if state.units_mut().validate_and_set(self.unit(), self.status()) {
            Ok(())
        } else {
            Err(PlanError::PreconditionNotMet(format!(
                "{} may not take status {}",
                self.unit(),
                self.status()
            )))
        }
    }

    pub fn cost(&self, state: &WorldState, rules: &Rules) -> f64 {
        match *self {
            Action::Idle { .. } => rules.idle_cost,
            Action::Gather { resource, .. } | Action::Deposit { resource, .. } => state
                .resources()
                .resource(resource)
                .map_or(0.0, |r| r.distance() / 2.0),
            Action::Produce { .. } => rules.produce_cost,
        }
    }

    /// Actions the acting unit may plausibly take after this one.
    ///
    /// This bounds successor enumeration; it does not check preconditions.
    pub fn effects(&self, state: &WorldState, rules: &Rules) -> BTreeSet<Action> {
        let cargo = match *self {
            Action::Gather { resource, .. } => Some(resource),
            Action::Deposit { .. } => None,
            Action::Idle { unit } | Action::Produce { producer: unit, .. } => state.carrying(unit),
        };
        follow_ons(self.unit(), self.status(), cargo, state, rules)
    }
}

/// Actions reachable from `status` through the transition table, limited
/// to what the unit is allowed to do.
pub(crate) fn follow_ons(
    unit: UnitId,
    status: Status,
    cargo: Option<ResourceId>,
    state: &WorldState,
    rules: &Rules,
) -> BTreeSet<Action> {
    let allowed = state
        .units()
        .unit(unit)
        .map_or(StatusSet::empty(), |u| u.allowed());
    let mut actions = BTreeSet::new();
    for next in status.valid_next().iter().filter(|s| allowed.contains(*s)) {
        match next {
            Status::Idle => {
                actions.insert(Action::Idle { unit });
            }
            Status::Gather => {
                actions.extend(
                    state
                        .resources()
                        .eligible_resources()
                        .map(|r| Action::Gather { unit, resource: r.id() }),
                );
            }
            Status::Deposit => {
                if let Some(resource) = cargo {
                    actions.insert(Action::Deposit { unit, resource });
                }
            }
            Status::Produce => {
                if rules.produce_workers {
                    actions.insert(Action::Produce {
                        producer: unit,
                        cost: rules.worker_cost,
                    });
                }
            }
            Status::Build => {}
        }
    }
    actions
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Idle { unit } => write!(f, "idle({})", unit),
            Action::Gather { unit, resource } => write!(f, "gather({}, {})", unit, resource),
            Action::Deposit { unit, resource } => write!(f, "deposit({}, {})", unit, resource),
            Action::Produce { producer, cost } => write!(
                f,
                "produce({}, gold={}, wood={})",
                producer, cost.gold, cost.wood
            ),
        }
    }
}

/// One planning round: at most one action per unit, applied together.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CompositeAction {
    actions: Vec<Action>,
}

impl CompositeAction {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, action: Action) {
        self.actions.push(action);
    }

    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Members an executor has to issue; idling needs no command.
    pub fn commands(&self) -> impl Iterator<Item = &Action> {
        self.actions.iter().filter(|a| !a.is_idle())
    }

    pub fn action_for(&self, unit: UnitId) -> Option<&Action> {
        self.actions.iter().find(|a| a.unit() == unit)
    }

    /// Checks every member against the state left by the members before it.
    pub fn preconditions_met(&self, state: &WorldState, rules: &Rules) -> bool {
        self.apply(state, rules).is_ok()
    }

    pub fn apply(&self, state: &WorldState, rules: &Rules) -> Result<WorldState> {
        let mut seen = BTreeSet::new();
        let mut current = state.clone();
        for action in &self.actions {
            if !seen.insert(action.unit()) {
                return Err(PlanError::PreconditionNotMet(format!(
                    "{} acts twice in one round",
                    action.unit()
                )));
            }
            current = action.apply(&current, rules)?;
        }
        Ok(current)
    }

    pub fn cost(&self, state: &WorldState, rules: &Rules) -> f64 {
        self.actions.iter().map(|a| a.cost(state, rules)).sum()
    }

    pub fn effects(&self, state: &WorldState, rules: &Rules) -> BTreeSet<Action> {
        self.actions
            .iter()
            .flat_map(|a| a.effects(state, rules))
            .collect()
    }
}

impl From<Vec<Action>> for CompositeAction {
    fn from(actions: Vec<Action>) -> Self {
        Self { actions }
    }
}

impl fmt::Display for CompositeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.actions.iter().map(|a| a.to_string()).collect();
        write!(f, "[{}]", parts.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::goal::Goal;
    use crate::resource::{Resource, ResourceLedger};
    use crate::unit::{IdGenerator, Unit, UnitLedger};

    const WORKER: UnitId = UnitId(1);
    const HALL: UnitId = UnitId(2);
    const MINE: ResourceId = ResourceId(10);
    const FOREST: ResourceId = ResourceId(11);

    fn state(gold: i64, wood: i64) -> WorldState {
        let mut units = UnitLedger::new(IdGenerator::starting_at(100));
        units.track(Unit::worker(WORKER, ProductionCost::new(400, 0)), Status::Idle);
        units.track(Unit::producer(HALL), Status::Idle);
        let resources = ResourceLedger::new(
            vec![
                (Resource::new(MINE, ResourceKind::Gold, 5.0), 300),
                (Resource::new(FOREST, ResourceKind::Wood, 9.0), 0),
            ],
            gold,
            wood,
            Goal::new().specify("gold", 1000).specify("wood", 0),
        );
        WorldState::new(units, resources)
    }

    fn producing_rules() -> Rules {
        Rules {
            produce_workers: true,
            worker_cost: ProductionCost::new(400, 0),
            ..Rules::default()
        }
    }

    #[test]
    fn test_gather_then_deposit_conserves_amounts() {
        let rules = Rules::default();
        let start = state(0, 0);
        let gathered = Action::Gather { unit: WORKER, resource: MINE }
            .apply(&start, &rules)
            .unwrap();
        assert_eq!(gathered.resources().remaining(MINE), Some(200));
        assert_eq!(gathered.units().status_of(WORKER), Some(Status::Gather));
        assert_eq!(gathered.carrying(WORKER), Some(MINE));
        assert_eq!(gathered.cost(), 2.5);

        let deposited = Action::Deposit { unit: WORKER, resource: MINE }
            .apply(&gathered, &rules)
            .unwrap();
        assert_eq!(deposited.resources().stockpile(ResourceKind::Gold), 100);
        assert_eq!(deposited.carrying(WORKER), None);
        assert_eq!(deposited.units().status_of(WORKER), Some(Status::Deposit));
        assert_eq!(deposited.cost(), 5.0);
    }

    #[test]
    fn test_gather_rejects_depleted_resource() {
        let rules = Rules::default();
        let gather = Action::Gather { unit: WORKER, resource: FOREST };
        assert!(!gather.preconditions_met(&state(0, 0), &rules));
        assert!(matches!(
            gather.apply(&state(0, 0), &rules),
            Err(PlanError::PreconditionNotMet(_))
        ));
    }

    #[test]
    fn test_deposit_requires_prior_gather() {
        let rules = Rules::default();
        let deposit = Action::Deposit { unit: WORKER, resource: MINE };
        assert!(!deposit.preconditions_met(&state(0, 0), &rules));
    }

    #[test]
    fn test_gather_twice_in_a_row_is_rejected() {
        let rules = Rules::default();
        let gather = Action::Gather { unit: WORKER, resource: MINE };
        let gathered = gather.apply(&state(0, 0), &rules).unwrap();
        assert!(!gather.preconditions_met(&gathered, &rules));
        assert!(!Action::Idle { unit: WORKER }.preconditions_met(&gathered, &rules));
    }

    #[test]
    fn test_producer_cannot_gather() {
        let rules = Rules::default();
        let gather = Action::Gather { unit: HALL, resource: MINE };
        assert!(!gather.preconditions_met(&state(0, 0), &rules));
    }

    #[test]
    fn test_produce_requires_flag_and_stockpile() {
        let produce = Action::Produce {
            producer: HALL,
            cost: ProductionCost::new(400, 0),
        };
        assert!(!produce.preconditions_met(&state(400, 0), &Rules::default()));
        assert!(!produce.preconditions_met(&state(399, 0), &producing_rules()));
        assert!(produce.preconditions_met(&state(400, 0), &producing_rules()));
    }

    #[test]
    fn test_produce_creates_worker_and_debits_stockpile() {
        let rules = producing_rules();
        let produce = Action::Produce {
            producer: HALL,
            cost: ProductionCost::new(400, 0),
        };
        let next = produce.apply(&state(450, 20), &rules).unwrap();
        assert_eq!(next.resources().stockpile(ResourceKind::Gold), 50);
        assert_eq!(next.resources().stockpile(ResourceKind::Wood), 20);
        assert_eq!(next.units().worker_count(), 2);
        assert_eq!(next.units().status_of(UnitId(100)), Some(Status::Idle));
        assert_eq!(next.units().status_of(HALL), Some(Status::Produce));
        assert_eq!(next.cost(), 1.0);
    }

    #[test]
    fn test_effects_follow_transition_table() {
        let rules = producing_rules();
        let start = state(0, 0);

        let gather = Action::Gather { unit: WORKER, resource: MINE };
        let after_gather: Vec<_> = gather.effects(&start, &rules).into_iter().collect();
        assert_eq!(after_gather, vec![Action::Deposit { unit: WORKER, resource: MINE }]);

        let deposit = Action::Deposit { unit: WORKER, resource: MINE };
        let after_deposit = deposit.effects(&start, &rules);
        assert!(after_deposit.contains(&Action::Idle { unit: WORKER }));
        assert!(after_deposit.contains(&Action::Gather { unit: WORKER, resource: MINE }));
        assert!(!after_deposit.contains(&Action::Gather { unit: WORKER, resource: FOREST }));

        let idle = Action::Idle { unit: HALL };
        let after_idle = idle.effects(&start, &rules);
        assert!(after_idle.contains(&Action::Idle { unit: HALL }));
        assert!(after_idle.iter().any(|a| matches!(a, Action::Produce { .. })));
        assert!(!after_idle.iter().any(|a| matches!(a, Action::Gather { .. })));
    }

    #[test]
    fn test_composite_effects_merge_members() {
        let rules = producing_rules();
        let start = state(0, 0);
        let round = CompositeAction::from(vec![
            Action::Gather { unit: WORKER, resource: MINE },
            Action::Idle { unit: HALL },
        ]);
        let effects = round.effects(&start, &rules);

        assert!(effects.contains(&Action::Deposit { unit: WORKER, resource: MINE }));
        assert!(effects.contains(&Action::Idle { unit: HALL }));
        assert!(effects.contains(&Action::Produce {
            producer: HALL,
            cost: ProductionCost::new(400, 0),
        }));
        assert!(!effects.contains(&Action::Idle { unit: WORKER }));
        assert_eq!(effects.len(), 3);
        assert!(CompositeAction::new().effects(&start, &rules).is_empty());
    }

    #[test]
    fn test_produce_needs_a_free_identity() {
        let rules = producing_rules();
        let mut units = UnitLedger::new(IdGenerator::starting_at(0));
        units.track(Unit::producer(UnitId(u32::MAX)), Status::Idle);
        let resources = ResourceLedger::new(
            Vec::new(),
            400,
            0,
            Goal::new().specify("gold", 0).specify("wood", 0),
        );
        let full = WorldState::new(units, resources);
        let produce = Action::Produce {
            producer: UnitId(u32::MAX),
            cost: ProductionCost::new(400, 0),
        };
        assert!(!produce.preconditions_met(&full, &rules));
        assert!(matches!(
            produce.apply(&full, &rules),
            Err(PlanError::PreconditionNotMet(_))
        ));
    }

    #[test]
    fn test_apply_never_mutates_source() {
        let rules = Rules::default();
        let start = state(0, 0);
        let before = start.key(crate::DuplicatePolicy::Exact);
        let _ = Action::Gather { unit: WORKER, resource: MINE }.apply(&start, &rules);
        assert_eq!(start.key(crate::DuplicatePolicy::Exact), before);
    }

    #[test]
    fn test_composite_applies_members_in_order() {
        let rules = Rules::default();
        let round = CompositeAction::from(vec![
            Action::Gather { unit: WORKER, resource: MINE },
            Action::Idle { unit: HALL },
        ]);
        assert!(round.preconditions_met(&state(0, 0), &rules));
        let next = round.apply(&state(0, 0), &rules).unwrap();
        assert_eq!(next.cost(), 2.5);
        assert_eq!(round.cost(&state(0, 0), &rules), 2.5);
        assert_eq!(round.commands().count(), 1);
        assert_eq!(round.action_for(HALL), Some(&Action::Idle { unit: HALL }));
    }

    #[test]
    fn test_composite_rejects_double_booking() {
        let rules = Rules::default();
        let round = CompositeAction::from(vec![
            Action::Idle { unit: WORKER },
            Action::Idle { unit: WORKER },
        ]);
        assert!(!round.preconditions_met(&state(0, 0), &rules));
    }

    #[test]
    fn test_display() {
        let round = CompositeAction::from(vec![
            Action::Gather { unit: WORKER, resource: MINE },
            Action::Produce {
                producer: HALL,
                cost: ProductionCost::new(400, 0),
            },
        ]);
        assert_eq!(
            round.to_string(),
            "[gather(unit#1, resource#10), produce(unit#2, gold=400, wood=0)]"
        );
    }
}
