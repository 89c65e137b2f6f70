//! The propagation engine.
//!
//! A [`Network`] owns every connector and constraint in two arenas. Clients
//! drive it with [`Network::set_value`] and [`Network::drop_value`]; each call
//! runs a depth-first cascade:
//!
//! 1. The connector stores the new state (a different value over an existing
//!    one is a contradiction, an unchanged value stops here).
//! 2. Every subscriber except the origin of the write is notified.
//! 3. The notified constraint answers with a [`Reaction`], whose writes are
//!    applied with the constraint as origin, recursing into step 1.
//!
//! Each external call is a transaction: under
//! [`ContradictionPolicy::Rollback`] a failing call leaves every connector as
//! it was before the call.
//!
//! # Invariants
//!
//! 1. A connector never silently changes from one value to another.
//! 2. A constraint never processes a notification it caused itself.
//! 3. Constraints are only consulted once every role is bound.
//! 4. Subscribers are notified in subscription order, so identical call
//!    sequences produce identical cascades.

use log::{debug, trace, warn};
use smallvec::SmallVec;
use std::fmt;

use crate::arena::Arena;
use crate::connector::{Connector, ConnectorId};
use crate::constraint::{Constraint, ConstraintId, Effect, Reaction, Role, RoleValues};
use crate::error::{Contradiction, NetworkError};
use crate::ledger::{ChangeRecord, Ledger};
use crate::relations::{Adder, Constant, Equality, Multiplier, Summation};
use crate::snapshot::NetworkSnapshot;
use crate::value::{CellValue, Numeric};

/// What happens to the writes of a call that ends in an error.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ContradictionPolicy {
    /// Undo every write of the failed call.
    #[default]
    Rollback,
    /// Keep writes made before the failure; the error is still returned.
    KeepPartial,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NetworkConfig {
    pub contradiction_policy: ContradictionPolicy,
    /// Keep committed changes for [`Network::history`] and [`Network::explain`].
    pub record_history: bool,
}

/// Counters for one external call (or the network's lifetime).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PropagationStats {
    /// Constraint hooks invoked
    pub reactions: u64,
    /// Connector transitions performed
    pub writes: u64,
    /// Deepest cascade level reached
    pub max_depth: u32,
}

impl PropagationStats {
    fn merge(&mut self, other: PropagationStats) {
        self.reactions += other.reactions;
        self.writes += other.writes;
        self.max_depth = self.max_depth.max(other.max_depth);
    }
}

struct ConstraintEntry<T: CellValue> {
    constraint: Box<dyn Constraint<T>>,
    bindings: SmallVec<[Option<ConnectorId>; 4]>,
}

impl<T: CellValue> ConstraintEntry<T> {
    fn is_wired(&self) -> bool {
        self.bindings.iter().all(Option::is_some)
    }
}

type Values<T> = SmallVec<[Option<T>; 4]>;

/// Current value of every role, or `None` while any binding is missing.
fn role_values<T: CellValue>(
    connectors: &Arena<Connector<T>>,
    bindings: &[Option<ConnectorId>],
) -> Option<Values<T>> {
    bindings
        .iter()
        .map(|binding| {
            let id = (*binding)?;
            connectors.get(id.0).map(Connector::value)
        })
        .collect()
}

/// A constraint network over values of type `T`.
pub struct Network<T: CellValue> {
    connectors: Arena<Connector<T>>,
    constraints: Arena<ConstraintEntry<T>>,
    ledger: Ledger<T>,
    config: NetworkConfig,
    /// Counters of the call in progress
    current: PropagationStats,
    last: PropagationStats,
    totals: PropagationStats,
}

impl<T: CellValue> Network<T> {
    pub fn new() -> Self {
        Self::with_config(NetworkConfig::default())
    }

    pub fn with_config(config: NetworkConfig) -> Self {
        Self {
            connectors: Arena::new(),
            constraints: Arena::new(),
            ledger: Ledger::new(config.record_history),
            config,
            current: PropagationStats::default(),
            last: PropagationStats::default(),
            totals: PropagationStats::default(),
        }
    }

    pub fn config(&self) -> NetworkConfig {
        self.config
    }

    // --- Connectors ---

    pub fn add_connector(&mut self) -> ConnectorId {
        ConnectorId(self.connectors.insert(Connector::new()))
    }

    pub fn add_named_connector(&mut self, label: impl Into<String>) -> ConnectorId {
        ConnectorId(self.connectors.insert(Connector::new().with_label(label)))
    }

    /// Remove a connector. Constraints bound to it become unbound and stop
    /// reacting until rebound.
    pub fn remove_connector(&mut self, id: ConnectorId) -> Result<(), NetworkError> {
        let cell = self
            .connectors
            .remove(id.0)
            .ok_or(NetworkError::UnknownConnector(id))?;
        for constraint in cell.subscribers() {
            if let Some(entry) = self.constraints.get_mut(constraint.0) {
                for binding in entry.bindings.iter_mut().filter(|b| **b == Some(id)) {
                    *binding = None;
                }
            }
        }
        debug!("removed connector {id:?} ({} subscribers unbound)", cell.subscribers().len());
        Ok(())
    }

    pub fn connector(&self, id: ConnectorId) -> Option<&Connector<T>> {
        self.connectors.get(id.0)
    }

    pub fn connectors(&self) -> impl Iterator<Item = (ConnectorId, &Connector<T>)> {
        self.connectors.iter().map(|(slot, cell)| (ConnectorId(slot), cell))
    }

    pub fn find_connector(&self, label: &str) -> Option<ConnectorId> {
        self.connectors()
            .find(|(_, cell)| cell.label() == Some(label))
            .map(|(id, _)| id)
    }

    /// Label of a connector, or its handle when unnamed.
    pub fn describe(&self, id: ConnectorId) -> String {
        match self.connector(id).and_then(Connector::label) {
            Some(label) => label.to_string(),
            None => id.to_string(),
        }
    }

    pub fn has_value(&self, id: ConnectorId) -> bool {
        self.connector(id).is_some_and(Connector::has_value)
    }

    pub fn value(&self, id: ConnectorId) -> Option<T> {
        self.connector(id).and_then(Connector::value)
    }

    /// Value held by a connector; an absent value is an `InvalidState` error.
    pub fn get_value(&self, id: ConnectorId) -> Result<T, NetworkError> {
        self.connector(id)
            .ok_or(NetworkError::UnknownConnector(id))?
            .value()
            .ok_or(NetworkError::InvalidState { connector: id })
    }

    pub fn set_value(&mut self, id: ConnectorId, value: T) -> Result<(), NetworkError> {
        self.transaction(|net| net.write(id, Some(value), None, 0))
    }

    pub fn drop_value(&mut self, id: ConnectorId) -> Result<(), NetworkError> {
        self.transaction(|net| net.write(id, None, None, 0))
    }

    // --- Constraints ---

    /// Register a constraint with every role unbound.
    pub fn add_constraint(&mut self, constraint: impl Constraint<T> + 'static) -> ConstraintId {
        let arity = constraint.arity();
        let entry = ConstraintEntry {
            constraint: Box::new(constraint),
            bindings: SmallVec::from_elem(None, arity),
        };
        ConstraintId(self.constraints.insert(entry))
    }

    /// Remove a constraint and its subscriptions. Connector values stay.
    pub fn remove_constraint(&mut self, id: ConstraintId) -> Result<(), NetworkError> {
        let entry = self
            .constraints
            .remove(id.0)
            .ok_or(NetworkError::UnknownConstraint(id))?;
        for connector in entry.bindings.iter().flatten() {
            if let Some(cell) = self.connectors.get_mut(connector.0) {
                cell.disconnect(id);
            }
        }
        debug!("removed {} {id:?}", entry.constraint.kind());
        Ok(())
    }

    /// Bind `connector` to `role` of `constraint` and subscribe the
    /// constraint to it. Once every role is bound, the constraint's attach
    /// hook runs against the values already present.
    pub fn bind(
        &mut self,
        constraint: ConstraintId,
        role: Role,
        connector: ConnectorId,
    ) -> Result<(), NetworkError> {
        if !self.connectors.is_valid(connector.0) {
            return Err(NetworkError::UnknownConnector(connector));
        }
        let entry = self
            .constraints
            .get_mut(constraint.0)
            .ok_or(NetworkError::UnknownConstraint(constraint))?;
        let arity = entry.bindings.len();
        let slot = entry
            .bindings
            .get_mut(role)
            .ok_or(NetworkError::UnknownRole { constraint, role, arity })?;
        let previous = slot.replace(connector);
        let release =
            previous.filter(|prev| *prev != connector && !entry.bindings.contains(&Some(*prev)));
        let wired = entry.is_wired();
        trace!(
            "bind {} {constraint:?} role {role} -> {connector:?}",
            entry.constraint.kind()
        );

        if let Some(prev) = release {
            if let Some(cell) = self.connectors.get_mut(prev.0) {
                cell.disconnect(constraint);
            }
        }
        if let Some(cell) = self.connectors.get_mut(connector.0) {
            cell.connect(constraint);
        }

        if wired {
            self.transaction(|net| net.attach(constraint))
        } else {
            Ok(())
        }
    }

    /// Register a constraint and bind `connectors` to its roles in order.
    /// A constraint whose wiring fails is removed again.
    pub fn add_wired(
        &mut self,
        constraint: impl Constraint<T> + 'static,
        connectors: &[ConnectorId],
    ) -> Result<ConstraintId, NetworkError> {
        let id = self.add_constraint(constraint);
        for (role, connector) in connectors.iter().enumerate() {
            if let Err(err) = self.bind(id, role, *connector) {
                self.remove_constraint(id)?;
                return Err(err);
            }
        }
        Ok(id)
    }

    /// All connectors of an n-ary equality hold the same value.
    pub fn add_equality(&mut self, connectors: &[ConnectorId]) -> Result<ConstraintId, NetworkError> {
        self.add_wired(Equality::new(connectors.len()), connectors)
    }

    pub fn add_constant(&mut self, connector: ConnectorId, value: T) -> Result<ConstraintId, NetworkError> {
        self.add_wired(Constant::new(value), &[connector])
    }

    pub fn constraints(&self) -> impl Iterator<Item = ConstraintId> + '_ {
        self.constraints.iter().map(|(slot, _)| ConstraintId(slot))
    }

    pub fn constraint(&self, id: ConstraintId) -> Option<&dyn Constraint<T>> {
        self.constraints.get(id.0).map(|entry| entry.constraint.as_ref())
    }

    pub fn constraint_kind(&self, id: ConstraintId) -> Option<&'static str> {
        self.constraint(id).map(|c| c.kind())
    }

    pub fn bindings(&self, id: ConstraintId) -> Option<&[Option<ConnectorId>]> {
        self.constraints.get(id.0).map(|entry| entry.bindings.as_slice())
    }

    /// First constraint with a missing binding, as an error.
    pub fn check_wiring(&self) -> Result<(), NetworkError> {
        for (slot, entry) in self.constraints.iter() {
            if let Some(role) = entry.bindings.iter().position(Option::is_none) {
                return Err(NetworkError::UnboundConstraint {
                    constraint: ConstraintId(slot),
                    role: entry.constraint.role_name(role).into_owned(),
                });
            }
        }
        Ok(())
    }

    pub fn unbound_constraints(&self) -> Vec<ConstraintId> {
        self.constraints
            .iter()
            .filter(|(_, entry)| !entry.is_wired())
            .map(|(slot, _)| ConstraintId(slot))
            .collect()
    }

    /// Re-run a constraint's reaction to the current state of `connector`,
    /// as if the connector had just changed.
    pub fn react(&mut self, constraint: ConstraintId, connector: ConnectorId) -> Result<(), NetworkError> {
        if !self.connectors.is_valid(connector.0) {
            return Err(NetworkError::UnknownConnector(connector));
        }
        if !self.constraints.is_valid(constraint.0) {
            return Err(NetworkError::UnknownConstraint(constraint));
        }
        self.transaction(|net| net.notify(constraint, connector, None, 0))
    }

    // --- Diagnostics ---

    /// Counters of the most recent external call.
    pub fn last_stats(&self) -> PropagationStats {
        self.last
    }

    /// Counters accumulated over the network's lifetime.
    pub fn total_stats(&self) -> PropagationStats {
        self.totals
    }

    pub fn enable_history(&mut self) {
        self.config.record_history = true;
        self.ledger.enable();
    }

    pub fn disable_history(&mut self) {
        self.config.record_history = false;
        self.ledger.disable();
    }

    pub fn history(&self) -> &[ChangeRecord<T>] {
        self.ledger.entries()
    }

    pub fn clear_history(&mut self) {
        self.ledger.clear();
    }

    /// Most recent committed change of a connector (history must be enabled).
    pub fn explain(&self, id: ConnectorId) -> Option<&ChangeRecord<T>> {
        self.ledger.last_change(id)
    }

    pub fn snapshot(&self) -> NetworkSnapshot<T> {
        NetworkSnapshot::capture(self)
    }

    // --- Propagation ---

    fn transaction(
        &mut self,
        operation: impl FnOnce(&mut Self) -> Result<(), NetworkError>,
    ) -> Result<(), NetworkError> {
        self.current = PropagationStats::default();
        let result = operation(self);

        match &result {
            Ok(()) => {
                debug!(
                    "commit: {} writes, {} reactions",
                    self.current.writes, self.current.reactions
                );
                self.ledger.commit();
            }
            Err(err) => match self.config.contradiction_policy {
                ContradictionPolicy::Rollback => {
                    let undo = self.ledger.rollback();
                    warn!("rolling back {} writes: {err}", undo.len());
                    for (id, value) in undo {
                        if let Some(cell) = self.connectors.get_mut(id.0) {
                            cell.replace(value);
                        }
                    }
                }
                ContradictionPolicy::KeepPartial => {
                    warn!("keeping {} writes despite: {err}", self.ledger.pending_len());
                    self.ledger.commit();
                }
            },
        }

        self.last = self.current;
        self.totals.merge(self.current);
        result
    }

    /// Store a new state and notify every subscriber except `origin`.
    fn write(
        &mut self,
        id: ConnectorId,
        new: Option<T>,
        origin: Option<ConstraintId>,
        depth: u32,
    ) -> Result<(), NetworkError> {
        let old = self
            .connector(id)
            .ok_or(NetworkError::UnknownConnector(id))?
            .value();
        if let Some(value) = new.filter(|v| !v.is_storable()) {
            return Err(NetworkError::InvalidValue {
                connector: id,
                constraint: origin,
                value: format!("{value:?}"),
            });
        }
        match (old, new) {
            // Retracting an absent value is a no-op
            (None, None) => return Ok(()),
            (Some(old), Some(new)) if old == new => return Ok(()),
            (Some(old), Some(new)) => {
                return Err(Contradiction {
                    connector: Some(id),
                    constraint: origin,
                    relation: origin.and_then(|c| self.constraint_kind(c)),
                    detail: format!("{} holds {old:?}, refusing {new:?}", self.describe(id)),
                }
                .into());
            }
            _ => {}
        }

        let subscribers: SmallVec<[ConstraintId; 4]> = match self.connectors.get_mut(id.0) {
            Some(cell) => {
                cell.replace(new);
                SmallVec::from_slice(cell.subscribers())
            }
            None => return Err(NetworkError::UnknownConnector(id)),
        };
        self.ledger.record(id, old, new, origin, depth);
        self.current.writes += 1;
        self.current.max_depth = self.current.max_depth.max(depth);
        trace!(
            "{}{} {old:?} -> {new:?} (origin {origin:?})",
            "  ".repeat(depth as usize),
            self.describe(id)
        );

        for constraint in subscribers {
            if Some(constraint) == origin {
                continue;
            }
            self.notify(constraint, id, origin, depth + 1)?;
        }
        Ok(())
    }

    /// Deliver a connector transition to one constraint.
    fn notify(
        &mut self,
        constraint: ConstraintId,
        connector: ConnectorId,
        origin: Option<ConstraintId>,
        depth: u32,
    ) -> Result<(), NetworkError> {
        // Self-notification guard
        if origin == Some(constraint) {
            return Ok(());
        }
        let entry = self
            .constraints
            .get(constraint.0)
            .ok_or(NetworkError::UnknownConstraint(constraint))?;
        let Some(values) = role_values(&self.connectors, &entry.bindings) else {
            warn!(
                "{} {constraint:?} notified while unbound, ignoring",
                entry.constraint.kind()
            );
            return Ok(());
        };
        let Some(role) = entry.bindings.iter().position(|b| *b == Some(connector)) else {
            return Ok(());
        };

        self.current.reactions += 1;
        trace!(
            "{}{} {constraint:?} reacts to {}",
            "  ".repeat(depth as usize),
            entry.constraint.kind(),
            self.describe(connector)
        );
        let roles = RoleValues::new(&values);
        let outcome = match values[role] {
            Some(value) => entry.constraint.on_set(roles, role, value),
            None => entry.constraint.on_drop(roles, role),
        };
        let kind = entry.constraint.kind();
        let bindings = entry.bindings.clone();

        let reaction = outcome.map_err(|conflict| {
            debug!("{kind} {constraint:?} rejected state: {conflict}");
            Contradiction {
                connector: None,
                constraint: Some(constraint),
                relation: Some(kind),
                detail: conflict.detail,
            }
        })?;
        self.apply(constraint, &bindings, reaction, depth)
    }

    fn attach(&mut self, constraint: ConstraintId) -> Result<(), NetworkError> {
        let entry = self
            .constraints
            .get(constraint.0)
            .ok_or(NetworkError::UnknownConstraint(constraint))?;
        let Some(values) = role_values(&self.connectors, &entry.bindings) else {
            return Ok(());
        };
        self.current.reactions += 1;
        let kind = entry.constraint.kind();
        let bindings = entry.bindings.clone();
        let reaction = entry
            .constraint
            .on_attach(RoleValues::new(&values))
            .map_err(|conflict| Contradiction {
                connector: None,
                constraint: Some(constraint),
                relation: Some(kind),
                detail: conflict.detail,
            })?;
        self.apply(constraint, &bindings, reaction, 1)
    }

    fn apply(
        &mut self,
        constraint: ConstraintId,
        bindings: &[Option<ConnectorId>],
        reaction: Reaction<T>,
        depth: u32,
    ) -> Result<(), NetworkError> {
        for effect in reaction.into_effects() {
            let (role, value) = match effect {
                Effect::Set { role, value } => (role, Some(value)),
                Effect::Drop { role } => (role, None),
            };
            let target = bindings
                .get(role)
                .copied()
                .flatten()
                .ok_or(NetworkError::UnknownRole { constraint, role, arity: bindings.len() })?;
            self.write(target, value, Some(constraint), depth)?;
        }
        Ok(())
    }
}

impl<T: Numeric> Network<T> {
    /// `lhs + rhs = sum`.
    pub fn add_adder(
        &mut self,
        lhs: ConnectorId,
        rhs: ConnectorId,
        sum: ConnectorId,
    ) -> Result<ConstraintId, NetworkError> {
        self.add_wired(Adder, &[lhs, rhs, sum])
    }

    /// `minuend - subtrahend = difference`, an adder with permuted roles.
    pub fn add_subtractor(
        &mut self,
        minuend: ConnectorId,
        subtrahend: ConnectorId,
        difference: ConnectorId,
    ) -> Result<ConstraintId, NetworkError> {
        self.add_wired(Adder, &[difference, subtrahend, minuend])
    }

    /// `lhs * rhs = product`.
    pub fn add_multiplier(
        &mut self,
        lhs: ConnectorId,
        rhs: ConnectorId,
        product: ConnectorId,
    ) -> Result<ConstraintId, NetworkError> {
        self.add_wired(Multiplier, &[lhs, rhs, product])
    }

    /// `terms[0] + ... + terms[n-1] = total`.
    pub fn add_summation(
        &mut self,
        terms: &[ConnectorId],
        total: ConnectorId,
    ) -> Result<ConstraintId, NetworkError> {
        let mut connectors: SmallVec<[ConnectorId; 8]> = SmallVec::from_slice(terms);
        connectors.push(total);
        self.add_wired(Summation::new(terms.len()), &connectors)
    }
}

impl<T: CellValue> Default for Network<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: CellValue> fmt::Debug for Network<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Network")
            .field("connectors", &self.connectors.len())
            .field("constraints", &self.constraints.len())
            .field("config", &self.config)
            .field("totals", &self.totals)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn adder_network() -> (Network<i64>, [ConnectorId; 3], ConstraintId) {
        let mut net = Network::new();
        let a = net.add_named_connector("a");
        let b = net.add_named_connector("b");
        let c = net.add_named_connector("c");
        let adder = net.add_adder(a, b, c).unwrap();
        (net, [a, b, c], adder)
    }

    #[test]
    fn same_value_does_not_renotify() {
        let (mut net, [a, b, _], _) = adder_network();
        net.set_value(a, 1).unwrap();
        net.set_value(b, 2).unwrap();

        net.set_value(a, 1).unwrap();
        assert_eq!(net.last_stats(), PropagationStats::default());
    }

    #[test]
    fn drop_of_absent_value_is_silent() {
        let (mut net, [a, _, _], _) = adder_network();
        net.drop_value(a).unwrap();
        assert_eq!(net.last_stats().writes, 0);
        assert_eq!(net.last_stats().reactions, 0);
    }

    #[test]
    fn origin_is_skipped_in_cascade() {
        let (mut net, [a, b, c], _) = adder_network();
        net.set_value(a, 1).unwrap();
        net.set_value(b, 2).unwrap();

        // One reaction to b, one write of b and one derived write of c;
        // the adder is not told about its own write to c.
        let stats = net.last_stats();
        assert_eq!(stats.reactions, 1);
        assert_eq!(stats.writes, 2);
        assert_eq!(stats.max_depth, 1);
        assert_eq!(net.get_value(c), Ok(3));
    }

    #[test]
    fn subscribers_are_deduplicated() {
        let mut net: Network<i64> = Network::new();
        let a = net.add_connector();
        let b = net.add_connector();
        let adder = net.add_adder(a, a, b).unwrap();

        assert_eq!(net.connector(a).unwrap().subscribers(), &[adder]);
        net.set_value(a, 4).unwrap();
        assert_eq!(net.get_value(b), Ok(8));
    }

    #[test]
    fn rebinding_moves_the_subscription() {
        let (mut net, [a, _, _], adder) = adder_network();
        let d = net.add_connector();
        net.bind(adder, Adder::LHS, d).unwrap();

        assert!(net.connector(a).unwrap().subscribers().is_empty());
        assert_eq!(net.connector(d).unwrap().subscribers(), &[adder]);
    }

    #[test]
    fn unknown_role_is_rejected() {
        let (mut net, [a, _, _], adder) = adder_network();
        assert_eq!(
            net.bind(adder, 7, a),
            Err(NetworkError::UnknownRole { constraint: adder, role: 7, arity: 3 })
        );
    }

    #[test]
    fn failed_wiring_removes_the_constraint() {
        let mut net: Network<i64> = Network::new();
        let a = net.add_connector();
        net.set_value(a, 3).unwrap();

        let err = net.add_constant(a, 5).unwrap_err();
        assert!(err.is_contradiction());
        assert_eq!(net.constraints().count(), 0);
        assert!(net.connector(a).unwrap().subscribers().is_empty());
        assert_eq!(net.get_value(a), Ok(3));
    }

    #[test]
    fn debug_shows_counts() {
        let (net, _, _) = adder_network();
        let debug = format!("{net:?}");
        assert!(debug.contains("connectors: 3"));
        assert!(debug.contains("constraints: 1"));
    }
}
