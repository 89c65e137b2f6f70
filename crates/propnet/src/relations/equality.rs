use crate::constraint::{Conflict, Constraint, Reaction, ReactionResult, Role, RoleValues};
use crate::value::CellValue;

/// All bound connectors hold the same value (aliasing).
///
/// Unlike the arithmetic relations, a retraction is forwarded: dropping one
/// alias drops the others.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Equality {
    arity: usize,
}

impl Equality {
    pub fn new(arity: usize) -> Self {
        Self { arity }
    }

    fn spread<T: CellValue>(roles: RoleValues<'_, T>, source: Role, value: T) -> ReactionResult<T> {
        let mut reaction = Reaction::none();
        for (role, current) in roles.iter() {
            if role == source {
                continue;
            }
            match current {
                None => reaction = reaction.and_set(role, value),
                Some(other) if other != value => {
                    return Err(Conflict::new(format!(
                        "arg{source} = {value:?} but arg{role} = {other:?}"
                    )));
                }
                Some(_) => {}
            }
        }
        Ok(reaction)
    }
}

impl<T: CellValue> Constraint<T> for Equality {
    fn kind(&self) -> &'static str {
        "equality"
    }

    fn arity(&self) -> usize {
        self.arity
    }

    fn on_set(&self, roles: RoleValues<'_, T>, role: Role, value: T) -> ReactionResult<T> {
        Self::spread(roles, role, value)
    }

    fn on_drop(&self, roles: RoleValues<'_, T>, role: Role) -> ReactionResult<T> {
        Ok(roles
            .iter()
            .filter(|(other, value)| *other != role && value.is_some())
            .fold(Reaction::none(), |reaction, (other, _)| reaction.and_drop(other)))
    }

    fn on_attach(&self, roles: RoleValues<'_, T>) -> ReactionResult<T> {
        match roles.iter().find_map(|(role, value)| value.map(|v| (role, v))) {
            Some((role, value)) => Self::spread(roles, role, value),
            None => Ok(Reaction::none()),
        }
    }
}
