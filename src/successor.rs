//! # Successor Module
//!
//! Expands a [`WorldState`] into every state reachable in one round. A round
//! gives each unit present at the start of the round one action. Choices
//! come from the status transition table ([`Action::effects`] style
//! follow-ons) and are checked against the state left by the units before
//! it, so two workers cannot both empty the same deposit.
//!
//! Rounds that lead to the same [`StateKey`] are coalesced and only the
//! cheapest is kept, which keeps the `(choices)^(units)` fan-out in check.

use std::collections::HashMap;

use crate::action::{follow_ons, Action, CompositeAction, Rules};
use crate::error::Result;
use crate::unit::UnitId;
use crate::world_state::{DuplicatePolicy, StateKey, WorldState};

/// A child state together with the round that produced it.
#[derive(Debug, Clone)]
pub struct Successor {
    pub action: CompositeAction,
    pub state: WorldState,
}

/// Legal actions for `unit` in `state`.
pub fn candidates(unit: UnitId, state: &WorldState, rules: &Rules) -> Vec<Action> {
    let Some(status) = state.units().status_of(unit) else {
        return Vec::new();
    };
    follow_ons(unit, status, state.carrying(unit), state, rules)
        .into_iter()
        .filter(|a| a.preconditions_met(state, rules))
        .collect()
}

/// All distinct children of `state`, in a deterministic order.
pub fn successors(
    state: &WorldState,
    rules: &Rules,
    policy: DuplicatePolicy,
) -> Result<Vec<Successor>> {
    let units: Vec<UnitId> = state.units().units().map(|(u, _)| u.id()).collect();

    let mut rounds = Vec::new();
    combine(&units, state, CompositeAction::new(), rules, &mut rounds)?;

    let mut index: HashMap<StateKey, usize> = HashMap::new();
    let mut children: Vec<Successor> = Vec::new();
    for (action, child) in rounds {
        let key = child.key(policy);
        match index.get(&key) {
            Some(&i) => {
                if child.cost() < children[i].state.cost() {
                    children[i] = Successor { action, state: child };
                }
            }
            None => {
                index.insert(key, children.len());
                children.push(Successor { action, state: child });
            }
        }
    }
    Ok(children)
}

fn combine(
    units: &[UnitId],
    partial: &WorldState,
    round: CompositeAction,
    rules: &Rules,
    out: &mut Vec<(CompositeAction, WorldState)>,
) -> Result<()> {
    let Some((unit, rest)) = units.split_first() else {
        out.push((round, partial.clone()));
        return Ok(());
    };

    let options = candidates(*unit, partial, rules);
    if options.is_empty() {
        // Nothing legal: the unit keeps its status this round.
        return combine(rest, partial, round, rules, out);
    }
    for action in options {
        let next = action.apply(partial, rules)?;
        let mut extended = round.clone();
        extended.push(action);
        combine(rest, &next, extended, rules, out)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::goal::Goal;
    use crate::resource::{Resource, ResourceId, ResourceKind, ResourceLedger};
    use crate::unit::{IdGenerator, ProductionCost, Status, Unit, UnitLedger};

    const HALL: UnitId = UnitId(9);
    const MINE: ResourceId = ResourceId(20);

    fn state(workers: &[u32], mine: i64, gold: i64) -> WorldState {
        let mut units = UnitLedger::new(IdGenerator::starting_at(100));
        for id in workers {
            units.track(Unit::worker(UnitId(*id), ProductionCost::new(400, 0)), Status::Idle);
        }
        units.track(Unit::producer(HALL), Status::Idle);
        let resources = ResourceLedger::new(
            vec![(Resource::new(MINE, ResourceKind::Gold, 4.0), mine)],
            gold,
            0,
            Goal::new().specify("gold", 1000).specify("wood", 0),
        );
        WorldState::new(units, resources)
    }

    #[test]
    fn test_single_worker_children() {
        let children = successors(&state(&[1], 300, 0), &Rules::default(), DuplicatePolicy::Exact).unwrap();
        assert_eq!(children.len(), 2);
        assert!(children.iter().any(|c| c
            .action
            .commands()
            .eq([Action::Gather { unit: UnitId(1), resource: MINE }].iter())));
        assert!(children.iter().any(|c| c.action.commands().count() == 0));
    }

    #[test]
    fn test_every_unit_acts_once_per_round() {
        let children = successors(&state(&[1, 2], 300, 0), &Rules::default(), DuplicatePolicy::Exact).unwrap();
        assert_eq!(children.len(), 4);
        for child in &children {
            assert_eq!(child.action.len(), 3);
            assert!(child.action.action_for(HALL).is_some());
        }
    }

    #[test]
    fn test_shared_deposit_is_not_overdrawn() {
        let children = successors(&state(&[1, 2], 100, 0), &Rules::default(), DuplicatePolicy::Exact).unwrap();
        // Both workers cannot take the last batch in the same round.
        assert_eq!(children.len(), 3);
        assert!(children.iter().all(|c| c.action.commands().count() <= 1));
    }

    #[test]
    fn test_coarse_policy_coalesces_children() {
        let children = successors(&state(&[1, 2], 300, 0), &Rules::default(), DuplicatePolicy::Coarse).unwrap();
        assert_eq!(children.len(), 3);
    }

    #[test]
    fn test_gathering_worker_must_deposit() {
        let rules = Rules::default();
        let start = state(&[1], 300, 0);
        let gathered = Action::Gather { unit: UnitId(1), resource: MINE }
            .apply(&start, &rules)
            .unwrap();
        assert_eq!(
            candidates(UnitId(1), &gathered, &rules),
            vec![Action::Deposit { unit: UnitId(1), resource: MINE }]
        );
    }

    #[test]
    fn test_produce_only_when_enabled() {
        let disabled = successors(&state(&[], 0, 400), &Rules::default(), DuplicatePolicy::Exact).unwrap();
        assert_eq!(disabled.len(), 1);

        let rules = Rules {
            produce_workers: true,
            worker_cost: ProductionCost::new(400, 0),
            ..Rules::default()
        };
        let enabled = successors(&state(&[], 0, 400), &rules, DuplicatePolicy::Exact).unwrap();
        assert_eq!(enabled.len(), 2);
        let produced = enabled
            .iter()
            .find(|c| c.state.units().worker_count() == 1)
            .unwrap();
        assert_eq!(produced.state.resources().stockpile(ResourceKind::Gold), 0);
    }

    #[test]
    fn test_child_cost_is_parent_plus_round() {
        let rules = Rules::default();
        let mut parent = state(&[1], 300, 0);
        parent.set_cost(7.0);
        for child in successors(&parent, &rules, DuplicatePolicy::Exact).unwrap() {
            let expected = 7.0 + child.action.cost(&parent, &rules);
            assert_eq!(child.state.cost(), expected);
        }
    }

    #[test]
    fn test_unknown_unit_has_no_candidates() {
        assert!(candidates(UnitId(77), &state(&[1], 300, 0), &Rules::default()).is_empty());
    }
}
