//! Value types a connector can hold.

use std::fmt::Debug;

/// Anything a connector can store: equatable, copyable, printable.
pub trait CellValue: Copy + PartialEq + Debug + 'static {
    /// Whether a connector may hold this value. Values unequal to
    /// themselves (NaN) are refused, since a connector could never confirm
    /// them.
    #[allow(clippy::eq_op)]
    fn is_storable(&self) -> bool {
        self == self
    }
}

impl<T: Copy + PartialEq + Debug + 'static> CellValue for T {}

/// Arithmetic needed by the built-in numeric relations.
///
/// Every operation is checked: `None` means the result is not representable
/// and the relation reports a conflict instead of wrapping.
pub trait Numeric: CellValue {
    const ZERO: Self;

    fn checked_add(self, rhs: Self) -> Option<Self>;

    fn checked_sub(self, rhs: Self) -> Option<Self>;

    fn checked_mul(self, rhs: Self) -> Option<Self>;

    /// `self / divisor` when the quotient is exact and the divisor non-zero.
    fn exact_div(self, divisor: Self) -> Option<Self>;
}

macro_rules! impl_numeric_int {
    ($($t:ty),*) => {
        $(
            impl Numeric for $t {
                const ZERO: Self = 0;

                fn checked_add(self, rhs: Self) -> Option<Self> {
                    <$t>::checked_add(self, rhs)
                }

                fn checked_sub(self, rhs: Self) -> Option<Self> {
                    <$t>::checked_sub(self, rhs)
                }

                fn checked_mul(self, rhs: Self) -> Option<Self> {
                    <$t>::checked_mul(self, rhs)
                }

                fn exact_div(self, divisor: Self) -> Option<Self> {
                    if divisor == 0 || self.checked_rem(divisor)? != 0 {
                        return None;
                    }
                    self.checked_div(divisor)
                }
            }
        )*
    };
}

macro_rules! impl_numeric_float {
    ($($t:ty),*) => {
        $(
            impl Numeric for $t {
                const ZERO: Self = 0.0;

                fn checked_add(self, rhs: Self) -> Option<Self> {
                    Some(self + rhs)
                }

                fn checked_sub(self, rhs: Self) -> Option<Self> {
                    Some(self - rhs)
                }

                fn checked_mul(self, rhs: Self) -> Option<Self> {
                    Some(self * rhs)
                }

                fn exact_div(self, divisor: Self) -> Option<Self> {
                    if divisor == 0.0 { None } else { Some(self / divisor) }
                }
            }
        )*
    };
}

impl_numeric_int!(i8, i16, i32, i64, i128, isize);
impl_numeric_float!(f32, f64);
