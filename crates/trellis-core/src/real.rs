// Arithmetic policy for probabilities inside the forward-backward recursion.

use std::fmt::Debug;
use std::ops::{Add, AddAssign, Div, Mul, MulAssign};

/// Numeric representation of a (non-negative) probability mass.
///
/// The decoding engine is monomorphized over this trait, so the choice of
/// representation costs nothing at runtime beyond the arithmetic itself.
/// Implementations must treat [`Real::zero`] as an absorbing element for
/// multiplication and never produce NaN from `zero + zero` or `zero * x`.
pub trait Real:
    Copy
    + Debug
    + PartialOrd
    + Add<Output = Self>
    + Mul<Output = Self>
    + Div<Output = Self>
    + AddAssign
    + MulAssign
    + Send
    + Sync
    + 'static
{
    /// Whether long products underflow in this representation, so the engine
    /// should rescale metrics after every timestep.
    const NEEDS_NORMALIZATION: bool;

    /// Short human-readable name, used in logs and benchmark labels.
    const NAME: &'static str;

    fn zero() -> Self;

    fn one() -> Self;

    /// Convert from an ordinary probability (or density) `p >= 0`.
    fn from_f64(p: f64) -> Self;

    /// Convert back to an ordinary probability. May underflow to `0.0`.
    fn to_f64(self) -> f64;

    #[inline]
    fn is_zero(self) -> bool {
        self == Self::zero()
    }

    /// False for values the representation cannot carry forward: overflowed
    /// to infinity, or NaN.
    fn is_finite(self) -> bool;
}

impl Real for f64 {
    const NEEDS_NORMALIZATION: bool = true;
    const NAME: &'static str = "f64";

    #[inline]
    fn zero() -> Self {
        0.0
    }

    #[inline]
    fn one() -> Self {
        1.0
    }

    #[inline]
    fn from_f64(p: f64) -> Self {
        p
    }

    #[inline]
    fn to_f64(self) -> f64 {
        self
    }

    #[inline]
    fn is_finite(self) -> bool {
        f64::is_finite(self)
    }
}

impl Real for f32 {
    const NEEDS_NORMALIZATION: bool = true;
    const NAME: &'static str = "f32";

    #[inline]
    fn zero() -> Self {
        0.0
    }

    #[inline]
    fn one() -> Self {
        1.0
    }

    #[inline]
    fn from_f64(p: f64) -> Self {
        p as f32
    }

    #[inline]
    fn to_f64(self) -> f64 {
        self as f64
    }

    #[inline]
    fn is_finite(self) -> bool {
        f32::is_finite(self)
    }
}

/// Sum of a slice in the given representation.
#[inline]
pub fn sum<R: Real>(values: &[R]) -> R {
    values.iter().fold(R::zero(), |acc, &v| acc + v)
}

/// Rescale `values` in place so they sum to one.
///
/// Returns the pre-normalization sum, or `None` (leaving `values` untouched)
/// when every entry is zero or the sum is not finite.
pub fn normalize<R: Real>(values: &mut [R]) -> Option<R> {
    let total = sum(values);
    if total.is_zero() || !total.is_finite() {
        return None;
    }
    for v in values.iter_mut() {
        *v = *v / total;
    }
    Some(total)
}

/// Index of the largest entry (first one on ties).
pub fn argmax<R: Real>(values: &[R]) -> usize {
    let mut best = 0;
    for (i, v) in values.iter().enumerate().skip(1) {
        if *v > values[best] {
            best = i;
        }
    }
    best
}
