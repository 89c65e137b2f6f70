use std::borrow::Cow;

use super::checked;
use crate::constraint::{Conflict, Constraint, Reaction, ReactionResult, Role, RoleValues};
use crate::value::Numeric;

/// `term0 + term1 + ... + termN-1 = total`, total bound to the last role.
///
/// Derives whichever single role is unknown; with every role known it only
/// checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Summation {
    terms: usize,
}

impl Summation {
    pub fn new(terms: usize) -> Self {
        Self { terms }
    }

    pub fn terms(&self) -> usize {
        self.terms
    }

    /// Role of the total.
    pub fn total(&self) -> Role {
        self.terms
    }

    /// Sum of the known terms, `None` if it overflows.
    fn sum_terms<T: Numeric>(&self, roles: RoleValues<'_, T>, skip: Option<Role>) -> Option<T> {
        (0..self.terms)
            .filter(|role| Some(*role) != skip)
            .filter_map(|role| roles.get(role))
            .try_fold(T::ZERO, |acc, v| acc.checked_add(v))
    }

    fn derive<T: Numeric>(&self, roles: RoleValues<'_, T>) -> ReactionResult<T> {
        let mut unknown = roles.unknown_roles();
        let (missing, more) = (unknown.next(), unknown.next());
        match (missing, more) {
            (None, _) => {
                let total = roles.get(self.total());
                match self.sum_terms(roles, None) {
                    Some(sum) if total == Some(sum) => Ok(Reaction::none()),
                    Some(sum) => Err(Conflict::new(format!(
                        "terms sum to {sum:?} but total is {total:?}"
                    ))),
                    None => Err(Conflict::new(format!(
                        "terms overflow but total is {total:?}"
                    ))),
                }
            }
            (Some(role), None) if role == self.total() => {
                let sum = checked(self.sum_terms(roles, None), || "sum of terms".to_owned())?;
                Ok(Reaction::set(role, sum))
            }
            (Some(role), None) => {
                let Some(total) = roles.get(self.total()) else {
                    return Ok(Reaction::none());
                };
                let rest = checked(self.sum_terms(roles, Some(role)), || {
                    "sum of known terms".to_owned()
                })?;
                let value = checked(total.checked_sub(rest), || format!("{total:?} - {rest:?}"))?;
                Ok(Reaction::set(role, value))
            }
            _ => Ok(Reaction::none()),
        }
    }
}

impl<T: Numeric> Constraint<T> for Summation {
    fn kind(&self) -> &'static str {
        "sum"
    }

    fn arity(&self) -> usize {
        self.terms + 1
    }

    fn role_name(&self, role: Role) -> Cow<'static, str> {
        if role == self.total() {
            Cow::Borrowed("total")
        } else {
            Cow::Owned(format!("term{role}"))
        }
    }

    fn on_set(&self, roles: RoleValues<'_, T>, _role: Role, _value: T) -> ReactionResult<T> {
        self.derive(roles)
    }

    fn on_attach(&self, roles: RoleValues<'_, T>) -> ReactionResult<T> {
        self.derive(roles)
    }
}
