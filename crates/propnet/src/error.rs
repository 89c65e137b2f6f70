use std::fmt;

use crate::connector::ConnectorId;
use crate::constraint::{ConstraintId, Role};

/// A violated relation, reported back to the caller of the write that
/// started the cascade.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contradiction {
    /// Connector whose write was refused, if the conflict was an overwrite.
    pub connector: Option<ConnectorId>,
    /// Constraint whose reaction failed or whose write was refused.
    pub constraint: Option<ConstraintId>,
    /// Relation kind of `constraint`, when known.
    pub relation: Option<&'static str>,
    pub detail: String,
}

impl fmt::Display for Contradiction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "contradiction")?;
        match (self.constraint, self.relation) {
            (Some(id), Some(kind)) => write!(f, " in {kind} {id}")?,
            (Some(id), None) => write!(f, " in constraint {id}")?,
            _ => {}
        }
        if let Some(connector) = self.connector {
            write!(f, " at connector {connector}")?;
        }
        write!(f, ": {}", self.detail)
    }
}

/// Errors returned by [`Network`](crate::Network) operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NetworkError {
    /// Value read from a connector that holds none.
    InvalidState { connector: ConnectorId },
    Contradiction(Contradiction),
    /// Value a connector cannot hold (NaN), written by the caller or by
    /// `constraint`.
    InvalidValue { connector: ConnectorId, constraint: Option<ConstraintId>, value: String },
    /// Constraint still missing a binding.
    UnboundConstraint { constraint: ConstraintId, role: String },
    /// Stale or foreign connector handle.
    UnknownConnector(ConnectorId),
    /// Stale or foreign constraint handle.
    UnknownConstraint(ConstraintId),
    /// Role index outside the constraint's arity.
    UnknownRole { constraint: ConstraintId, role: Role, arity: usize },
}

impl NetworkError {
    pub fn is_contradiction(&self) -> bool {
        matches!(self, NetworkError::Contradiction(_))
    }
}

impl fmt::Display for NetworkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NetworkError::InvalidState { connector } => {
                write!(f, "connector {connector} has no value")
            }
            NetworkError::Contradiction(contradiction) => contradiction.fmt(f),
            NetworkError::InvalidValue { connector, constraint: Some(constraint), value } => {
                write!(f, "constraint {constraint} derived {value} for connector {connector}")
            }
            NetworkError::InvalidValue { connector, constraint: None, value } => {
                write!(f, "connector {connector} cannot hold {value}")
            }
            NetworkError::UnboundConstraint { constraint, role } => {
                write!(f, "constraint {constraint} has no connector bound to role '{role}'")
            }
            NetworkError::UnknownConnector(id) => write!(f, "unknown connector {id}"),
            NetworkError::UnknownConstraint(id) => write!(f, "unknown constraint {id}"),
            NetworkError::UnknownRole { constraint, role, arity } => {
                write!(f, "constraint {constraint} has {arity} roles, role {role} does not exist")
            }
        }
    }
}

impl std::error::Error for NetworkError {}

impl From<Contradiction> for NetworkError {
    fn from(contradiction: Contradiction) -> Self {
        NetworkError::Contradiction(contradiction)
    }
}
