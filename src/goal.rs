//! # Goal Module
//!
//! A [`Goal`] is a set of named [`Criterion`] values. It is tested against a
//! map of observed values and is satisfied only when every criterion has an
//! observed value that is exactly equal to its objective.
//!
//! ```
//! use std::collections::HashMap;
//! use stripsrs::Goal;
//!
//! let goal = Goal::new().specify("gold", 200).specify("wood", 0);
//!
//! let mut values = HashMap::new();
//! values.insert("gold".to_string(), 200);
//! assert!(!goal.is_satisfied(&values)); // "wood" is missing
//!
//! values.insert("wood".to_string(), 0);
//! assert!(goal.is_satisfied(&values));
//! assert_eq!(goal.difference(&values), 0);
//! ```

use std::collections::{BTreeMap, HashMap};
use std::ops::{Add, Sub};

/// One named objective of a [`Goal`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Criterion<T> {
    id: String,
    objective: T,
}

impl<T: PartialEq> Criterion<T> {
    pub fn new(id: impl Into<String>, objective: T) -> Self {
        Self {
            id: id.into(),
            objective,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn objective(&self) -> &T {
        &self.objective
    }

    /// A missing test value never satisfies the criterion.
    pub fn is_satisfied(&self, values: &HashMap<String, T>) -> bool {
        values.get(&self.id).map_or(false, |v| *v == self.objective)
    }
}

/// A conjunction of criteria keyed by name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Goal<T> {
    criteria: BTreeMap<String, Criterion<T>>,
}

impl<T: PartialEq> Goal<T> {
    pub fn new() -> Self {
        Self {
            criteria: BTreeMap::new(),
        }
    }

    /// Adds (or replaces) the criterion named `id`.
    pub fn specify(mut self, id: impl Into<String>, objective: T) -> Self {
        let criterion = Criterion::new(id, objective);
        self.criteria.insert(criterion.id.clone(), criterion);
        self
    }

    pub fn criterion(&self, id: &str) -> Option<&Criterion<T>> {
        self.criteria.get(id)
    }

    pub fn criteria(&self) -> impl Iterator<Item = &Criterion<T>> {
        self.criteria.values()
    }

    pub fn len(&self) -> usize {
        self.criteria.len()
    }

    pub fn is_empty(&self) -> bool {
        self.criteria.is_empty()
    }

    /// Returns `true` only when every criterion has a matching value.
    ///
    /// Keys in `values` that no criterion names are ignored.
    pub fn is_satisfied(&self, values: &HashMap<String, T>) -> bool {
        self.criteria.values().all(|c| c.is_satisfied(values))
    }
}

impl<T: PartialOrd> Goal<T> {
    /// Returns `true` if any observed value is strictly above its objective.
    pub fn is_exceeded(&self, values: &HashMap<String, T>) -> bool {
        self.criteria
            .values()
            .any(|c| values.get(&c.id).map_or(false, |v| *v > c.objective))
    }
}

impl<T> Goal<T>
where
    T: PartialEq + Copy + Default + Add<Output = T> + Sub<Output = T>,
{
    /// Sums `objective - value` over all criteria.
    ///
    /// The result is negative when the values overshoot the goal. A missing
    /// value counts as `T::default()`.
    pub fn difference(&self, values: &HashMap<String, T>) -> T {
        self.criteria.values().fold(T::default(), |acc, c| {
            let value = values.get(&c.id).copied().unwrap_or_default();
            acc + (c.objective - value)
        })
    }
}

impl<T: PartialEq> Default for Goal<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(pairs: &[(&str, i64)]) -> HashMap<String, i64> {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn test_empty_goal_is_always_satisfied() {
        let goal: Goal<i64> = Goal::new();
        assert!(goal.is_empty());
        assert!(goal.is_satisfied(&values(&[])));
    }

    #[test]
    fn test_missing_key_fails_closed() {
        let goal = Goal::new().specify("gold", 200).specify("wood", 0);
        assert!(!goal.is_satisfied(&values(&[("gold", 200)])));
    }

    #[test]
    fn test_extraneous_keys_are_ignored() {
        let goal = Goal::new().specify("gold", 200);
        assert!(goal.is_satisfied(&values(&[("gold", 200), ("stone", 5)])));
    }

    #[test]
    fn test_satisfaction_is_exact_equality() {
        let goal = Goal::new().specify("gold", 200);
        assert!(!goal.is_satisfied(&values(&[("gold", 199)])));
        assert!(!goal.is_satisfied(&values(&[("gold", 300)])));
        assert!(goal.is_satisfied(&values(&[("gold", 200)])));
    }

    #[test]
    fn test_difference_may_be_negative() {
        let goal = Goal::new().specify("gold", 200).specify("wood", 100);
        assert_eq!(goal.difference(&values(&[("gold", 50), ("wood", 0)])), 250);
        assert_eq!(goal.difference(&values(&[("gold", 300), ("wood", 100)])), -100);
        assert_eq!(goal.difference(&values(&[("gold", 200)])), 100);
    }

    #[test]
    fn test_is_exceeded() {
        let goal = Goal::new().specify("gold", 200).specify("wood", 0);
        assert!(!goal.is_exceeded(&values(&[("gold", 200), ("wood", 0)])));
        assert!(goal.is_exceeded(&values(&[("gold", 100), ("wood", 100)])));
        assert!(!goal.is_exceeded(&values(&[])));
    }

    #[test]
    fn test_specify_replaces_existing_criterion() {
        let goal = Goal::new().specify("gold", 100).specify("gold", 300);
        assert_eq!(goal.len(), 1);
        assert_eq!(goal.criterion("gold").map(|c| *c.objective()), Some(300));
    }

    #[test]
    fn test_criterion_alone() {
        let criterion = Criterion::new("wood", 40);
        assert_eq!(criterion.id(), "wood");
        assert!(criterion.is_satisfied(&values(&[("wood", 40)])));
        assert!(!criterion.is_satisfied(&values(&[("gold", 40)])));
    }
}
