//! Connector cells.
//!
//! A connector holds at most one value and remembers which constraints want
//! to hear about its transitions. Writes go through [`Network`], which owns
//! the notification cascade; the cell itself only stores state.
//!
//! [`Network`]: crate::network::Network

use smallvec::SmallVec;
use std::fmt;

use crate::arena::SlotId;
use crate::constraint::ConstraintId;
use crate::value::CellValue;

/// Stable handle to a connector inside a network.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectorId(pub(crate) SlotId);

impl ConnectorId {
    pub fn slot(self) -> SlotId {
        self.0
    }
}

impl fmt::Debug for ConnectorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Connector({}v{})", self.0.index, self.0.generation)
    }
}

impl fmt::Display for ConnectorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0.index)
    }
}

/// A single-valued cell.
#[derive(Debug, Clone)]
pub struct Connector<T> {
    value: Option<T>,
    /// Insertion-ordered, duplicate-free
    subscribers: SmallVec<[ConstraintId; 4]>,
    label: Option<String>,
}

impl<T: CellValue> Connector<T> {
    pub fn new() -> Self {
        Self {
            value: None,
            subscribers: SmallVec::new(),
            label: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn has_value(&self) -> bool {
        self.value.is_some()
    }

    pub fn value(&self) -> Option<T> {
        self.value
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn subscribers(&self) -> &[ConstraintId] {
        &self.subscribers
    }

    /// Subscribe a constraint. Returns false if it was already subscribed.
    pub(crate) fn connect(&mut self, constraint: ConstraintId) -> bool {
        if self.subscribers.contains(&constraint) {
            return false;
        }
        self.subscribers.push(constraint);
        true
    }

    pub(crate) fn disconnect(&mut self, constraint: ConstraintId) {
        self.subscribers.retain(|c| *c != constraint);
    }

    /// Raw store without notification; returns the previous value.
    pub(crate) fn replace(&mut self, value: Option<T>) -> Option<T> {
        std::mem::replace(&mut self.value, value)
    }
}

impl<T: CellValue> Default for Connector<T> {
    fn default() -> Self {
        Self::new()
    }
}
