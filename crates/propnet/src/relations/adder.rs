use std::borrow::Cow;

use super::checked;
use crate::constraint::{Conflict, Constraint, Reaction, ReactionResult, Role, RoleValues};
use crate::value::Numeric;

/// `lhs + rhs = sum`.
///
/// Subtraction is the same relation with roles permuted:
/// `minuend - subtrahend = difference` is `difference + subtrahend = minuend`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Adder;

impl Adder {
    pub const LHS: Role = 0;
    pub const RHS: Role = 1;
    pub const SUM: Role = 2;

    fn derive<T: Numeric>(roles: RoleValues<'_, T>) -> ReactionResult<T> {
        let lhs = roles.get(Self::LHS);
        let rhs = roles.get(Self::RHS);
        let sum = roles.get(Self::SUM);

        match (lhs, rhs, sum) {
            (Some(lhs), Some(rhs), None) => {
                let sum = checked(lhs.checked_add(rhs), || format!("{lhs:?} + {rhs:?}"))?;
                Ok(Reaction::set(Self::SUM, sum))
            }
            (Some(lhs), None, Some(sum)) => {
                let rhs = checked(sum.checked_sub(lhs), || format!("{sum:?} - {lhs:?}"))?;
                Ok(Reaction::set(Self::RHS, rhs))
            }
            (None, Some(rhs), Some(sum)) => {
                let lhs = checked(sum.checked_sub(rhs), || format!("{sum:?} - {rhs:?}"))?;
                Ok(Reaction::set(Self::LHS, lhs))
            }
            // An overflowing sum cannot equal a representable one
            (Some(lhs), Some(rhs), Some(sum)) => match lhs.checked_add(rhs) {
                Some(total) if total == sum => Ok(Reaction::none()),
                _ => Err(Conflict::new(format!("{lhs:?} + {rhs:?} != {sum:?}"))),
            },
            _ => Ok(Reaction::none()),
        }
    }
}

impl<T: Numeric> Constraint<T> for Adder {
    fn kind(&self) -> &'static str {
        "adder"
    }

    fn arity(&self) -> usize {
        3
    }

    fn role_name(&self, role: Role) -> Cow<'static, str> {
        match role {
            Self::LHS => Cow::Borrowed("lhs"),
            Self::RHS => Cow::Borrowed("rhs"),
            Self::SUM => Cow::Borrowed("sum"),
            other => Cow::Owned(format!("arg{other}")),
        }
    }

    fn on_set(&self, roles: RoleValues<'_, T>, _role: Role, _value: T) -> ReactionResult<T> {
        Self::derive(roles)
    }

    fn on_attach(&self, roles: RoleValues<'_, T>) -> ReactionResult<T> {
        Self::derive(roles)
    }
}
