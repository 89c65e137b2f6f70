//! The constraint capability.
//!
//! A constraint never writes to connectors itself. Each hook inspects the
//! current values of its roles and answers with a [`Reaction`]: a list of
//! writes the network performs on its behalf, tagged with the constraint as
//! origin. That keeps constraints stateless and the engine the only place
//! where the notification cascade lives.

use smallvec::SmallVec;
use std::borrow::Cow;
use std::fmt;

use crate::arena::SlotId;
use crate::value::CellValue;

/// Stable handle to a constraint inside a network.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConstraintId(pub(crate) SlotId);

impl ConstraintId {
    pub fn slot(self) -> SlotId {
        self.0
    }
}

impl fmt::Debug for ConstraintId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Constraint({}v{})", self.0.index, self.0.generation)
    }
}

impl fmt::Display for ConstraintId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.0.index)
    }
}

/// Position of a connector within a constraint (e.g. lhs = 0).
pub type Role = usize;

/// Values currently held by each role of a fully wired constraint.
#[derive(Debug, Clone, Copy)]
pub struct RoleValues<'a, T> {
    values: &'a [Option<T>],
}

impl<'a, T: CellValue> RoleValues<'a, T> {
    pub fn new(values: &'a [Option<T>]) -> Self {
        Self { values }
    }

    pub fn get(&self, role: Role) -> Option<T> {
        self.values.get(role).copied().flatten()
    }

    pub fn arity(&self) -> usize {
        self.values.len()
    }

    /// How many roles currently hold a value.
    pub fn known(&self) -> usize {
        self.values.iter().filter(|v| v.is_some()).count()
    }

    /// Roles without a value, in role order.
    pub fn unknown_roles(&self) -> impl Iterator<Item = Role> + '_ {
        self.values
            .iter()
            .enumerate()
            .filter_map(|(role, v)| v.is_none().then_some(role))
    }

    pub fn iter(&self) -> impl Iterator<Item = (Role, Option<T>)> + '_ {
        self.values.iter().copied().enumerate()
    }
}

/// A single write requested by a constraint.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect<T> {
    Set { role: Role, value: T },
    Drop { role: Role },
}

/// What a constraint wants done after a notification.
#[derive(Debug, Clone, PartialEq)]
pub struct Reaction<T> {
    effects: SmallVec<[Effect<T>; 2]>,
}

impl<T> Reaction<T> {
    /// Nothing derivable.
    pub fn none() -> Self {
        Self { effects: SmallVec::new() }
    }

    pub fn set(role: Role, value: T) -> Self {
        Self::none().and_set(role, value)
    }

    pub fn and_set(mut self, role: Role, value: T) -> Self {
        self.effects.push(Effect::Set { role, value });
        self
    }

    pub fn and_drop(mut self, role: Role) -> Self {
        self.effects.push(Effect::Drop { role });
        self
    }

    pub fn is_empty(&self) -> bool {
        self.effects.is_empty()
    }

    pub fn effects(&self) -> &[Effect<T>] {
        &self.effects
    }

    pub fn into_effects(self) -> SmallVec<[Effect<T>; 2]> {
        self.effects
    }
}

impl<T> Default for Reaction<T> {
    fn default() -> Self {
        Self::none()
    }
}

/// A relation violated by the values its roles hold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conflict {
    pub detail: String,
}

impl Conflict {
    pub fn new(detail: impl Into<String>) -> Self {
        Self { detail: detail.into() }
    }
}

impl fmt::Display for Conflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.detail)
    }
}

pub type ReactionResult<T> = Result<Reaction<T>, Conflict>;

/// A relation over a fixed number of connectors.
///
/// Hooks are only called once every role is bound, and never for a change
/// the constraint itself caused. Default hooks do nothing.
pub trait Constraint<T: CellValue> {
    /// Short relation name used in logs, errors and snapshots.
    fn kind(&self) -> &'static str;

    /// Number of roles.
    fn arity(&self) -> usize;

    fn role_name(&self, role: Role) -> Cow<'static, str> {
        Cow::Owned(format!("arg{role}"))
    }

    /// A connector bound to `role` now holds `value`.
    fn on_set(&self, roles: RoleValues<'_, T>, role: Role, value: T) -> ReactionResult<T> {
        let _ = (roles, role, value);
        Ok(Reaction::none())
    }

    /// A connector bound to `role` was retracted.
    fn on_drop(&self, roles: RoleValues<'_, T>, role: Role) -> ReactionResult<T> {
        let _ = (roles, role);
        Ok(Reaction::none())
    }

    /// The last missing role was just bound.
    fn on_attach(&self, roles: RoleValues<'_, T>) -> ReactionResult<T> {
        let _ = roles;
        Ok(Reaction::none())
    }
}
