use thiserror::Error;

use crate::resource::ResourceId;
use crate::unit::UnitId;

/// Errors produced while building or searching a planning episode.
#[derive(Error, Debug)]
pub enum PlanError {
    #[error("No valid plan found to achieve the goal")]
    NoPlanFound,
    #[error("Search stopped after expanding {0} states")]
    ExpansionLimit(usize),
    #[error("Action precondition not met: {0}")]
    PreconditionNotMet(String),
    #[error("Snapshot is missing a required entity: {0}")]
    MissingEntity(String),
    #[error("Invalid snapshot: {0}")]
    InvalidSnapshot(String),
    #[error("Invalid planner configuration: {0}")]
    InvalidConfig(String),
    #[error("No unit identities left to allocate")]
    IdentitiesExhausted,
    #[error("Unknown unit: {0}")]
    UnknownUnit(UnitId),
    #[error("Unknown resource: {0}")]
    UnknownResource(ResourceId),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, PlanError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_no_plan_found_display() {
        let err = PlanError::NoPlanFound;
        assert_eq!(
            format!("{}", err),
            "No valid plan found to achieve the goal"
        );
    }

    #[test]
    fn test_expansion_limit_display() {
        let err = PlanError::ExpansionLimit(42);
        assert_eq!(format!("{}", err), "Search stopped after expanding 42 states");
    }

    #[test]
    fn test_precondition_not_met_display() {
        let err = PlanError::PreconditionNotMet("bar".to_string());
        assert_eq!(format!("{}", err), "Action precondition not met: bar");
    }

    #[test]
    fn test_missing_entity_display() {
        let err = PlanError::MissingEntity("producer".to_string());
        assert_eq!(
            format!("{}", err),
            "Snapshot is missing a required entity: producer"
        );
    }

    #[test]
    fn test_identities_exhausted_display() {
        assert_eq!(
            format!("{}", PlanError::IdentitiesExhausted),
            "No unit identities left to allocate"
        );
    }

    #[test]
    fn test_unknown_ids_display() {
        assert_eq!(
            format!("{}", PlanError::UnknownUnit(UnitId(7))),
            "Unknown unit: unit#7"
        );
        assert_eq!(
            format!("{}", PlanError::UnknownResource(ResourceId(3))),
            "Unknown resource: resource#3"
        );
    }

    #[test]
    fn test_error_trait() {
        let err = PlanError::NoPlanFound;
        assert!(err.source().is_none());

        let io = PlanError::from(std::io::Error::new(std::io::ErrorKind::Other, "disk"));
        assert!(io.source().is_some());
    }
}
