//! Built-in relations.

pub mod adder;
pub mod constant;
pub mod equality;
pub mod multiplier;
pub mod summation;

pub use adder::Adder;
pub use constant::Constant;
pub use equality::Equality;
pub use multiplier::Multiplier;
pub use summation::Summation;

use std::fmt::Debug;

use crate::constraint::Conflict;

/// Unwrap a checked arithmetic step, reporting `expr` as overflowing.
pub(crate) fn checked<T: Debug>(
    result: Option<T>,
    expr: impl FnOnce() -> String,
) -> Result<T, Conflict> {
    result.ok_or_else(|| Conflict::new(format!("{} overflows", expr())))
}
