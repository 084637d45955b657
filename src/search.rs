//! # Search Module
//!
//! Best-first (A*) search over [`WorldState`] nodes.
//!
//! Nodes live in an arena (`Vec`) and point at their predecessor by index.
//! The open set is a binary min-heap ordered by `cost + heuristic`; the
//! closed set holds the [`StateKey`]s of expanded nodes. When a goal node is
//! popped the plan is rebuilt by following predecessor indices back to the
//! root.
//!
//! ## Heuristics
//!
//! - [`TripLowerBound`]: remaining trips times the nearest deposit distance.
//!   Never overestimates, so the returned plan is cost-optimal.
//! - [`GoalDifference`]: remaining shortfall in resource units. Cheap but
//!   measured in different units from the cost, so not admissible.
//! - [`ZeroHeuristic`]: uniform-cost search.
//!
//! States whose stockpiles overshoot the goal are handled by
//! [`ExceededPolicy`].

use std::cmp::Ordering;
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, HashSet};

use crate::action::{Action, CompositeAction, Rules};
use crate::error::{PlanError, Result};
use crate::resource::ResourceKind;
use crate::successor::{successors, Successor};
use crate::world_state::{DuplicatePolicy, StateKey, WorldState};

pub trait SearchAlgorithm {
    fn search(&self, initial: WorldState, rules: &Rules) -> Result<Plan>;
}

pub trait HeuristicStrategy: Send + Sync {
    /// Estimated remaining cost from `state` to a goal state.
    fn estimate(&self, state: &WorldState, rules: &Rules) -> f64;
}

/// What to do with states that overshoot a goal criterion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExceededPolicy {
    /// Give the state an infinite estimate so it is never expanded.
    #[default]
    Prune,
    /// Keep the state; its estimate ignores the overshoot.
    Explore,
}

/// Selects one of the built-in heuristic strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HeuristicKind {
    #[default]
    TripLowerBound,
    GoalDifference,
    Zero,
}

impl HeuristicKind {
    pub fn strategy(self) -> Box<dyn HeuristicStrategy> {
        match self {
            HeuristicKind::TripLowerBound => Box::new(TripLowerBound),
            HeuristicKind::GoalDifference => Box::new(GoalDifference),
            HeuristicKind::Zero => Box::new(ZeroHeuristic),
        }
    }
}

pub struct TripLowerBound;

impl HeuristicStrategy for TripLowerBound {
    fn estimate(&self, state: &WorldState, rules: &Rules) -> f64 {
        let resources = state.resources();
        let batch = rules.batch_size.max(1);
        ResourceKind::ALL
            .iter()
            .map(|&kind| {
                let shortfall = resources.shortfall(kind).max(0);
                if shortfall == 0 {
                    return 0.0;
                }
                let needed = shortfall / batch + i64::from(shortfall % batch != 0);

                // Cargo already on its way only needs the trip back.
                let mut legs: Vec<f64> = state
                    .cargo()
                    .filter_map(|(_, r)| resources.resource(r))
                    .filter(|r| r.kind() == kind)
                    .map(|r| r.distance() / 2.0)
                    .collect();
                legs.sort_by(f64::total_cmp);
                let carried = legs.len().min(needed as usize);
                let mut estimate: f64 = legs[..carried].iter().sum();

                let trips = needed - carried as i64;
                if trips > 0 {
                    match resources.nearest_eligible_distance(kind) {
                        Some(distance) => estimate += trips as f64 * distance,
                        None => return f64::INFINITY,
                    }
                }
                estimate
            })
            .sum()
    }
}

pub struct GoalDifference;

impl HeuristicStrategy for GoalDifference {
    fn estimate(&self, state: &WorldState, _rules: &Rules) -> f64 {
        let resources = state.resources();
        ResourceKind::ALL
            .iter()
            .map(|&kind| resources.shortfall(kind).max(0) as f64)
            .sum()
    }
}

pub struct ZeroHeuristic;

impl HeuristicStrategy for ZeroHeuristic {
    fn estimate(&self, _state: &WorldState, _rules: &Rules) -> f64 {
        0.0
    }
}

/// One round of a plan with the cost accumulated up to and including it.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PlanStep {
    pub action: CompositeAction,
    pub cost_so_far: f64,
}

/// An ordered sequence of rounds leading from the initial state to a goal.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Plan {
    steps: Vec<PlanStep>,
    cost: f64,
    expanded: usize,
}

impl Plan {
    pub fn new(steps: Vec<PlanStep>, cost: f64, expanded: usize) -> Self {
        Self {
            steps,
            cost,
            expanded,
        }
    }

    pub fn steps(&self) -> &[PlanStep] {
        &self.steps
    }

    pub fn rounds(&self) -> impl Iterator<Item = &CompositeAction> {
        self.steps.iter().map(|s| &s.action)
    }

    /// Every non-idle action in execution order.
    pub fn actions(&self) -> impl Iterator<Item = &Action> {
        self.rounds().flat_map(|r| r.commands())
    }

    pub fn cost(&self) -> f64 {
        self.cost
    }

    /// Number of states expanded while searching.
    pub fn expanded(&self) -> usize {
        self.expanded
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

#[derive(Debug, Clone)]
struct Node {
    state: WorldState,
    action: Option<CompositeAction>,
    key: StateKey,
}

#[derive(Debug, Clone)]
struct NodeWrapper {
    idx: usize,
    f_cost: f64,
    g_cost: f64,
}

impl PartialEq for NodeWrapper {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for NodeWrapper {}

impl PartialOrd for NodeWrapper {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for NodeWrapper {
    fn cmp(&self, other: &Self) -> Ordering {
        // Lowest f first; among equals prefer the node further along, then
        // the one created first.
        self.f_cost
            .total_cmp(&other.f_cost)
            .then_with(|| other.g_cost.total_cmp(&self.g_cost))
            .then_with(|| self.idx.cmp(&other.idx))
    }
}

struct SearchContext<'a> {
    nodes: Vec<Node>,
    open_set: BinaryHeap<Reverse<NodeWrapper>>,
    closed_set: HashSet<StateKey>,
    best_cost: HashMap<StateKey, f64>,
    expanded: usize,
    search: &'a AStarSearch,
    rules: &'a Rules,
}

impl<'a> SearchContext<'a> {
    fn new(mut initial: WorldState, search: &'a AStarSearch, rules: &'a Rules) -> Self {
        let heuristic = search.evaluate(&initial, rules);
        initial.set_heuristic(heuristic);
        initial.set_parent(None);
        let key = initial.key(search.duplicate_policy);

        let mut context = Self {
            nodes: Vec::new(),
            open_set: BinaryHeap::new(),
            closed_set: HashSet::new(),
            best_cost: HashMap::new(),
            expanded: 0,
            search,
            rules,
        };
        context.best_cost.insert(key.clone(), initial.cost());
        context.push(Node {
            state: initial,
            action: None,
            key,
        });
        context
    }

    fn push(&mut self, node: Node) {
        let idx = self.nodes.len();
        self.open_set.push(Reverse(NodeWrapper {
            idx,
            f_cost: node.state.estimate(),
            g_cost: node.state.cost(),
        }));
        self.nodes.push(node);
    }

    fn next_node(&mut self) -> Option<usize> {
        while let Some(Reverse(wrapper)) = self.open_set.pop() {
            let node = &self.nodes[wrapper.idx];
            if self.closed_set.contains(&node.key) {
                continue;
            }
            let best = self.best_cost.get(&node.key).copied().unwrap_or(f64::INFINITY);
            if node.state.cost() > best {
                continue; // stale entry
            }
            return Some(wrapper.idx);
        }
        None
    }

    fn mark_visited(&mut self, idx: usize) {
        self.closed_set.insert(self.nodes[idx].key.clone());
        self.expanded += 1;
    }

    fn process_successor(&mut self, parent_idx: usize, successor: Successor) {
        let Successor { action, mut state } = successor;

        let key = state.key(self.search.duplicate_policy);
        if key == self.nodes[parent_idx].key {
            return;
        }

        let heuristic = self.search.evaluate(&state, self.rules);
        if heuristic.is_infinite() {
            log::trace!("pruned {} after {}", state, action);
            return;
        }

        let cost = state.cost();
        if let Some(&best) = self.best_cost.get(&key) {
            if best <= cost {
                return;
            }
        }
        self.best_cost.insert(key.clone(), cost);
        // A cheaper route reopens a state that was already expanded.
        self.closed_set.remove(&key);

        state.set_parent(Some(parent_idx));
        state.set_heuristic(heuristic);
        self.push(Node {
            state,
            action: Some(action),
            key,
        });
    }

    fn reconstruct_plan(&self, node_idx: usize) -> Plan {
        let mut steps = Vec::new();
        let mut current = Some(node_idx);

        while let Some(idx) = current {
            let node = &self.nodes[idx];
            if let Some(action) = &node.action {
                steps.push(PlanStep {
                    action: action.clone(),
                    cost_so_far: node.state.cost(),
                });
            }
            current = node.state.parent();
        }

        steps.reverse();
        Plan::new(steps, self.nodes[node_idx].state.cost(), self.expanded)
    }
}

/// A* over world states.
pub struct AStarSearch {
    heuristic: Box<dyn HeuristicStrategy>,
    duplicate_policy: DuplicatePolicy,
    exceeded_policy: ExceededPolicy,
    max_expansions: Option<usize>,
}

impl AStarSearch {
    pub fn new(heuristic: Box<dyn HeuristicStrategy>) -> Self {
        Self {
            heuristic,
            duplicate_policy: DuplicatePolicy::default(),
            exceeded_policy: ExceededPolicy::default(),
            max_expansions: None,
        }
    }

    pub fn with_default_heuristic() -> Self {
        Self::new(HeuristicKind::default().strategy())
    }

    pub fn with_duplicate_policy(mut self, policy: DuplicatePolicy) -> Self {
        self.duplicate_policy = policy;
        self
    }

    pub fn with_exceeded_policy(mut self, policy: ExceededPolicy) -> Self {
        self.exceeded_policy = policy;
        self
    }

    pub fn with_max_expansions(mut self, limit: Option<usize>) -> Self {
        self.max_expansions = limit;
        self
    }

    /// Heuristic value of `state`: zero at the goal, infinite for pruned
    /// overshoot, the strategy's estimate otherwise.
    pub fn evaluate(&self, state: &WorldState, rules: &Rules) -> f64 {
        if state.is_goal() {
            return 0.0;
        }
        if state.is_goal_exceeded() && self.exceeded_policy == ExceededPolicy::Prune {
            return f64::INFINITY;
        }
        self.heuristic.estimate(state, rules)
    }
}

impl Default for AStarSearch {
    fn default() -> Self {
        Self::with_default_heuristic()
    }
}

impl SearchAlgorithm for AStarSearch {
    fn search(&self, initial: WorldState, rules: &Rules) -> Result<Plan> {
        if initial.is_goal() {
            return Ok(Plan::default());
        }

        let mut context = SearchContext::new(initial, self, rules);
        if context.nodes[0].state.heuristic().is_infinite() {
            log::debug!("initial state cannot reach the goal: {}", context.nodes[0].state);
            return Err(PlanError::NoPlanFound);
        }

        while let Some(current_idx) = context.next_node() {
            let node = context.nodes[current_idx].clone();

            if node.state.is_goal() {
                log::debug!(
                    "goal reached after {} expansions, {} states generated",
                    context.expanded,
                    context.nodes.len()
                );
                return Ok(context.reconstruct_plan(current_idx));
            }

            if let Some(limit) = self.max_expansions {
                if context.expanded >= limit {
                    log::warn!("search budget of {} expansions exhausted", limit);
                    return Err(PlanError::ExpansionLimit(context.expanded));
                }
            }

            context.mark_visited(current_idx);
            log::trace!("expanding {}", node.state);

            for successor in successors(&node.state, rules, self.duplicate_policy)? {
                context.process_successor(current_idx, successor);
            }
        }

        log::debug!("open set exhausted after {} expansions", context.expanded);
        Err(PlanError::NoPlanFound)
    }
}
