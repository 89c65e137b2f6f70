//! Serializable view of a network's state.
//!
//! Note: JSON encoding requires the `cli` feature.

use serde::{Deserialize, Serialize};

use crate::network::Network;
use crate::value::CellValue;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectorSnapshot<T> {
    /// Arena slot index
    pub id: u32,
    pub label: Option<String>,
    pub value: Option<T>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstraintSnapshot {
    pub id: u32,
    pub kind: String,
    /// Role name -> connector slot index, in role order
    pub roles: Vec<(String, Option<u32>)>,
}

/// Point-in-time state of every connector and constraint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkSnapshot<T> {
    /// Version for migration support
    pub version: u32,
    pub connectors: Vec<ConnectorSnapshot<T>>,
    pub constraints: Vec<ConstraintSnapshot>,
}

impl<T: CellValue> NetworkSnapshot<T> {
    /// Current snapshot version.
    pub const VERSION: u32 = 1;

    pub fn capture(network: &Network<T>) -> Self {
        let connectors = network
            .connectors()
            .map(|(id, cell)| ConnectorSnapshot {
                id: id.slot().index,
                label: cell.label().map(str::to_string),
                value: cell.value(),
            })
            .collect();

        let constraints = network
            .constraints()
            .filter_map(|id| {
                let constraint = network.constraint(id)?;
                let bindings = network.bindings(id)?;
                let roles = bindings
                    .iter()
                    .enumerate()
                    .map(|(role, binding)| {
                        (
                            constraint.role_name(role).into_owned(),
                            binding.map(|c| c.slot().index),
                        )
                    })
                    .collect();
                Some(ConstraintSnapshot {
                    id: id.slot().index,
                    kind: constraint.kind().to_string(),
                    roles,
                })
            })
            .collect();

        Self {
            version: Self::VERSION,
            connectors,
            constraints,
        }
    }

    /// Value of the connector with the given label.
    pub fn value_of(&self, label: &str) -> Option<T> {
        self.connectors
            .iter()
            .find(|c| c.label.as_deref() == Some(label))
            .and_then(|c| c.value)
    }

    /// Serialize snapshot to JSON string.
    #[cfg(feature = "cli")]
    pub fn to_json(&self) -> Result<String, serde_json::Error>
    where
        T: Serialize,
    {
        serde_json::to_string_pretty(self)
    }

    /// Deserialize snapshot from JSON string.
    #[cfg(feature = "cli")]
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error>
    where
        T: serde::de::DeserializeOwned,
    {
        serde_json::from_str(json)
    }
}
