use std::borrow::Cow;

use crate::constraint::{Conflict, Constraint, Reaction, ReactionResult, Role, RoleValues};
use crate::value::CellValue;

/// Injects a fixed value into its single connector when attached.
///
/// Retracting the connector is allowed; the constant does not re-assert it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Constant<T> {
    value: T,
}

impl<T: CellValue> Constant<T> {
    pub const TARGET: Role = 0;

    pub fn new(value: T) -> Self {
        Self { value }
    }

    pub fn value(&self) -> T {
        self.value
    }

    fn check(&self, found: T) -> ReactionResult<T> {
        if found == self.value {
            Ok(Reaction::none())
        } else {
            Err(Conflict::new(format!(
                "constant {:?} cannot hold {found:?}",
                self.value
            )))
        }
    }
}

impl<T: CellValue> Constraint<T> for Constant<T> {
    fn kind(&self) -> &'static str {
        "constant"
    }

    fn arity(&self) -> usize {
        1
    }

    fn role_name(&self, _role: Role) -> Cow<'static, str> {
        Cow::Borrowed("target")
    }

    fn on_set(&self, _roles: RoleValues<'_, T>, _role: Role, value: T) -> ReactionResult<T> {
        self.check(value)
    }

    fn on_attach(&self, roles: RoleValues<'_, T>) -> ReactionResult<T> {
        match roles.get(Self::TARGET) {
            Some(found) => self.check(found),
            None => Ok(Reaction::set(Self::TARGET, self.value)),
        }
    }
}
