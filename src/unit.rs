//! # Unit Module
//!
//! Units are the actors of a planning episode: workers that gather and
//! deposit resources, and the producer that trains new workers. The
//! [`UnitLedger`] records the STRIPS [`Status`] each unit currently holds and
//! is the only place where unit preconditions are enforced.
//!
//! Status changes follow a fixed transition table:
//!
//! | current   | valid next                 |
//! |-----------|----------------------------|
//! | `Gather`  | `Deposit`                  |
//! | `Deposit` | `Idle`, `Gather`           |
//! | `Idle`    | `Idle`, `Gather`, `Produce`|
//! | `Produce` | `Idle`, `Produce`          |
//! | `Build`   | `Idle`                     |

use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};

use crate::error::{PlanError, Result};

/// Planner-internal identity of a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct UnitId(pub u32);

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unit#{}", self.0)
    }
}

/// STRIPS status of a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Status {
    Idle,
    Gather,
    Deposit,
    Produce,
    /// Reserved; no action currently leads here.
    Build,
}

impl Status {
    pub const ALL: [Status; 5] = [
        Status::Idle,
        Status::Gather,
        Status::Deposit,
        Status::Produce,
        Status::Build,
    ];

    /// Statuses a unit may move to from `self`.
    pub fn valid_next(self) -> StatusSet {
        match self {
            Status::Gather => StatusSet::of(&[Status::Deposit]),
            Status::Deposit => StatusSet::of(&[Status::Idle, Status::Gather]),
            Status::Idle => StatusSet::of(&[Status::Idle, Status::Gather, Status::Produce]),
            Status::Produce => StatusSet::of(&[Status::Idle, Status::Produce]),
            Status::Build => StatusSet::of(&[Status::Idle]),
        }
    }

    fn bit(self) -> u8 {
        match self {
            Status::Idle => 1,
            Status::Gather => 1 << 1,
            Status::Deposit => 1 << 2,
            Status::Produce => 1 << 3,
            Status::Build => 1 << 4,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Status::Idle => "idle",
            Status::Gather => "gather",
            Status::Deposit => "deposit",
            Status::Produce => "produce",
            Status::Build => "build",
        };
        f.write_str(name)
    }
}

/// A small set of [`Status`] values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct StatusSet(u8);

impl StatusSet {
    /// Statuses a gathering worker may hold.
    pub const WORKER: StatusSet = StatusSet(1 | 1 << 1 | 1 << 2);
    /// Statuses the producer may hold.
    pub const PRODUCER: StatusSet = StatusSet(1 | 1 << 3);

    pub fn empty() -> Self {
        Self(0)
    }

    pub fn of(statuses: &[Status]) -> Self {
        statuses.iter().fold(Self::empty(), |set, s| set.with(*s))
    }

    pub fn with(self, status: Status) -> Self {
        Self(self.0 | status.bit())
    }

    pub fn contains(self, status: Status) -> bool {
        self.0 & status.bit() != 0
    }

    pub fn intersects(self, other: StatusSet) -> bool {
        self.0 & other.0 != 0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn iter(self) -> impl Iterator<Item = Status> {
        Status::ALL.into_iter().filter(move |s| self.contains(*s))
    }
}

/// Gold and wood needed to produce one unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ProductionCost {
    pub gold: i64,
    pub wood: i64,
}

impl ProductionCost {
    pub fn new(gold: i64, wood: i64) -> Self {
        Self { gold, wood }
    }
}

/// A worker or producer. Units compare by identity only.
#[derive(Debug, Clone, Copy)]
pub struct Unit {
    id: UnitId,
    allowed: StatusSet,
    cost: ProductionCost,
}

impl Unit {
    pub fn new(id: UnitId, allowed: StatusSet, cost: ProductionCost) -> Self {
        Self { id, allowed, cost }
    }

    /// A gathering worker.
    pub fn worker(id: UnitId, cost: ProductionCost) -> Self {
        Self::new(id, StatusSet::WORKER, cost)
    }

    /// The abstract producer; it cannot itself be produced.
    pub fn producer(id: UnitId) -> Self {
        Self::new(id, StatusSet::PRODUCER, ProductionCost::default())
    }

    pub fn id(&self) -> UnitId {
        self.id
    }

    pub fn allowed(&self) -> StatusSet {
        self.allowed
    }

    pub fn allows(&self, status: Status) -> bool {
        self.allowed.contains(status)
    }

    pub fn cost(&self) -> ProductionCost {
        self.cost
    }

    pub fn is_worker(&self) -> bool {
        self.allows(Status::Gather)
    }
}

impl PartialEq for Unit {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Unit {}

impl Hash for Unit {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

/// Allocates planner identities for units created during planning.
///
/// The generator lives inside the [`UnitLedger`] and is copied with it, so
/// two states with the same production history hand out the same ids.
/// Once `u32::MAX` has been handed out or reserved the generator is
/// exhausted and allocates nothing further.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IdGenerator {
    next: Option<u32>,
}

impl IdGenerator {
    pub fn starting_at(first: u32) -> Self {
        Self { next: Some(first) }
    }

    /// The identity the next allocation returns, if any is left.
    pub fn peek(&self) -> Option<UnitId> {
        self.next.map(UnitId)
    }

    pub fn allocate(&mut self) -> Option<UnitId> {
        let id = self.next?;
        self.next = id.checked_add(1);
        Some(UnitId(id))
    }

    /// Makes sure `id` is never handed out again.
    pub fn reserve(&mut self, id: UnitId) {
        if let Some(next) = self.next {
            if id.0 >= next {
                self.next = id.0.checked_add(1);
            }
        }
    }

    pub fn is_exhausted(&self) -> bool {
        self.next.is_none()
    }
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::starting_at(0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct Entry {
    unit: Unit,
    status: Status,
}

/// Current status of every unit in a world state.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct UnitLedger {
    entries: BTreeMap<UnitId, Entry>,
    ids: IdGenerator,
}

impl UnitLedger {
    pub fn new(ids: IdGenerator) -> Self {
        Self {
            entries: BTreeMap::new(),
            ids,
        }
    }

    /// Inserts `unit` with `status`, replacing any previous entry.
    ///
    /// Returns `false` without writing if `status` is not allowed for it.
    pub fn track(&mut self, unit: Unit, status: Status) -> bool {
        if !unit.allows(status) {
            return false;
        }
        self.ids.reserve(unit.id);
        self.entries.insert(unit.id, Entry { unit, status });
        true
    }

    /// Unconditional write; the caller is responsible for validity.
    pub fn set_status(&mut self, unit: UnitId, status: Status) -> Result<()> {
        let entry = self
            .entries
            .get_mut(&unit)
            .ok_or(PlanError::UnknownUnit(unit))?;
        entry.status = status;
        Ok(())
    }

    /// Writes `status` only if the unit allows it.
    pub fn validate_and_set(&mut self, unit: UnitId, status: Status) -> bool {
        match self.entries.get_mut(&unit) {
            Some(entry) if entry.unit.allows(status) => {
                entry.status = status;
                true
            }
            _ => false,
        }
    }

    /// Allocates a fresh identity and tracks the new unit.
    ///
    /// Fails with [`PlanError::IdentitiesExhausted`] once no identity is left.
    pub fn create_and_track(
        &mut self,
        initial: Status,
        allowed: StatusSet,
        cost: ProductionCost,
    ) -> Result<Unit> {
        let id = self.ids.allocate().ok_or(PlanError::IdentitiesExhausted)?;
        let unit = Unit::new(id, allowed.with(initial), cost);
        self.entries.insert(unit.id, Entry { unit, status: initial });
        Ok(unit)
    }

    pub fn count_matching(&self, status: Status) -> usize {
        self.entries.values().filter(|e| e.status == status).count()
    }

    pub fn contains_any(&self, statuses: &[Status]) -> bool {
        self.entries.values().any(|e| statuses.contains(&e.status))
    }

    pub fn status_of(&self, unit: UnitId) -> Option<Status> {
        self.entries.get(&unit).map(|e| e.status)
    }

    pub fn unit(&self, unit: UnitId) -> Option<&Unit> {
        self.entries.get(&unit).map(|e| &e.unit)
    }

    /// Units in identity order with their current status.
    pub fn units(&self) -> impl Iterator<Item = (&Unit, Status)> {
        self.entries.values().map(|e| (&e.unit, e.status))
    }

    pub fn worker_count(&self) -> usize {
        self.entries.values().filter(|e| e.unit.is_worker()).count()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Identity the next created unit would get; `None` once exhausted.
    pub fn next_id(&self) -> Option<UnitId> {
        self.ids.peek()
    }

    /// Whether `unit` may move to `status` from its current status.
    pub fn can_transition(&self, unit: UnitId, status: Status) -> bool {
        self.entries
            .get(&unit)
            .map_or(false, |e| e.unit.allows(status) && e.status.valid_next().contains(status))
    }
}
