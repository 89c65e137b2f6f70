use std::borrow::Cow;

use super::checked;
use crate::constraint::{Conflict, Constraint, Reaction, ReactionResult, Role, RoleValues};
use crate::value::Numeric;

/// `lhs * rhs = product`.
///
/// A zero factor fixes the product to zero even while the other factor is
/// unknown. Backward derivation only happens when the quotient is exact.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Multiplier;

impl Multiplier {
    pub const LHS: Role = 0;
    pub const RHS: Role = 1;
    pub const PRODUCT: Role = 2;

    fn solve_factor<T: Numeric>(role: Role, product: T, known: T) -> ReactionResult<T> {
        if known == T::ZERO {
            return if product == T::ZERO {
                // Any factor works
                Ok(Reaction::none())
            } else {
                Err(Conflict::new(format!("0 * x = {product:?} has no solution")))
            };
        }
        match product.exact_div(known) {
            Some(factor) => Ok(Reaction::set(role, factor)),
            None => Err(Conflict::new(format!(
                "{product:?} is not divisible by {known:?}"
            ))),
        }
    }

    fn derive<T: Numeric>(roles: RoleValues<'_, T>) -> ReactionResult<T> {
        let lhs = roles.get(Self::LHS);
        let rhs = roles.get(Self::RHS);
        let product = roles.get(Self::PRODUCT);

        match (lhs, rhs, product) {
            (Some(lhs), Some(rhs), None) => {
                let product = checked(lhs.checked_mul(rhs), || format!("{lhs:?} * {rhs:?}"))?;
                Ok(Reaction::set(Self::PRODUCT, product))
            }
            (Some(zero), None, None) | (None, Some(zero), None) if zero == T::ZERO => {
                Ok(Reaction::set(Self::PRODUCT, T::ZERO))
            }
            (Some(lhs), None, Some(product)) => Self::solve_factor(Self::RHS, product, lhs),
            (None, Some(rhs), Some(product)) => Self::solve_factor(Self::LHS, product, rhs),
            (Some(lhs), Some(rhs), Some(product)) => match lhs.checked_mul(rhs) {
                Some(total) if total == product => Ok(Reaction::none()),
                _ => Err(Conflict::new(format!("{lhs:?} * {rhs:?} != {product:?}"))),
            },
            _ => Ok(Reaction::none()),
        }
    }
}

impl<T: Numeric> Constraint<T> for Multiplier {
    fn kind(&self) -> &'static str {
        "multiplier"
    }

    fn arity(&self) -> usize {
        3
    }

    fn role_name(&self, role: Role) -> Cow<'static, str> {
        match role {
            Self::LHS => Cow::Borrowed("lhs"),
            Self::RHS => Cow::Borrowed("rhs"),
            Self::PRODUCT => Cow::Borrowed("product"),
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
