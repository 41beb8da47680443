// Log-domain probability surrogates.
// Origin: logreal.cpp
//
// A value p is stored as ln(p). Multiplication and division become addition
// and subtraction of logarithms; addition uses the Jacobian logarithm
//
//     ln(e^a + e^b) = max(a, b) + ln(1 + e^-|a - b|)
//
// so products of thousands of small likelihoods stay representable. The two
// public types differ only in how the correction term ln(1 + e^-d) is
// evaluated.

use std::cmp::Ordering;
use std::fmt;
use std::marker::PhantomData;
use std::ops::{Add, AddAssign, Div, Mul, MulAssign};
use std::sync::LazyLock;

use crate::real::Real;

/// Evaluation strategy for the correction term `ln(1 + e^-d)`, `d >= 0`.
pub trait Jacobian: Copy + Send + Sync + 'static {
    const NAME: &'static str;

    fn correction(delta: f64) -> f64;
}

/// Evaluates the correction term with `ln_1p(exp(-d))`.
#[derive(Debug, Clone, Copy)]
pub struct Exact;

impl Jacobian for Exact {
    const NAME: &'static str = "logreal";

    #[inline]
    fn correction(delta: f64) -> f64 {
        (-delta).exp().ln_1p()
    }
}

/// Evaluates the correction term by linear interpolation in a lookup table.
///
/// The table covers `[0, TABLE_RANGE)` at `1 / TABLE_RESOLUTION` spacing, which
/// bounds the interpolation error below 3e-8. Beyond the range the term is
/// smaller than 1.3e-14 and is dropped.
#[derive(Debug, Clone, Copy)]
pub struct Tabulated;

const TABLE_RANGE: f64 = 32.0;
const TABLE_RESOLUTION: f64 = 1024.0;

static CORRECTION_TABLE: LazyLock<Box<[f64]>> = LazyLock::new(|| {
    let len = (TABLE_RANGE * TABLE_RESOLUTION) as usize + 1;
    (0..len)
        .map(|i| Exact::correction(i as f64 / TABLE_RESOLUTION))
        .collect()
});

impl Jacobian for Tabulated {
    const NAME: &'static str = "logrealfast";

    #[inline]
    fn correction(delta: f64) -> f64 {
        if delta >= TABLE_RANGE {
            return 0.0;
        }
        let table = &*CORRECTION_TABLE;
        let x = delta * TABLE_RESOLUTION;
        let i = x as usize;
        let frac = x - i as f64;
        table[i] + frac * (table[i + 1] - table[i])
    }
}

/// A probability represented by its natural logarithm.
///
/// Zero is represented by `ln = -inf`. Use the [`LogReal`] and [`LogRealFast`]
/// aliases rather than naming this type directly.
#[derive(Clone, Copy)]
pub struct LogDomain<J> {
    ln: f64,
    _jacobian: PhantomData<J>,
}

/// Log-domain probability with exact log-sum-exp addition.
pub type LogReal = LogDomain<Exact>;

/// Log-domain probability with table-driven log-sum-exp addition.
pub type LogRealFast = LogDomain<Tabulated>;

impl<J: Jacobian> LogDomain<J> {
    /// Construct directly from a natural logarithm.
    #[inline]
    pub const fn from_ln(ln: f64) -> Self {
        Self {
            ln,
            _jacobian: PhantomData,
        }
    }

    /// The stored natural logarithm (`-inf` for zero).
    #[inline]
    pub const fn ln(self) -> f64 {
        self.ln
    }
}

impl<J: Jacobian> Add for LogDomain<J> {
    type Output = Self;

    #[inline]
    fn add(self, rhs: Self) -> Self {
        let (hi, lo) = if self.ln >= rhs.ln {
            (self.ln, rhs.ln)
        } else {
            (rhs.ln, self.ln)
        };
        if lo == f64::NEG_INFINITY {
            return Self::from_ln(hi);
        }
        Self::from_ln(hi + J::correction(hi - lo))
    }
}

impl<J: Jacobian> AddAssign for LogDomain<J> {
    #[inline]
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl<J: Jacobian> Mul for LogDomain<J> {
    type Output = Self;

    #[inline]
    fn mul(self, rhs: Self) -> Self {
        Self::from_ln(self.ln + rhs.ln)
    }
}

impl<J: Jacobian> MulAssign for LogDomain<J> {
    #[inline]
    fn mul_assign(&mut self, rhs: Self) {
        self.ln += rhs.ln;
    }
}

impl<J: Jacobian> Div for LogDomain<J> {
    type Output = Self;

    #[inline]
    fn div(self, rhs: Self) -> Self {
        debug_assert!(rhs.ln != f64::NEG_INFINITY, "division by log-domain zero");
        if self.ln == f64::NEG_INFINITY {
            return self;
        }
        Self::from_ln(self.ln - rhs.ln)
    }
}

impl<J: Jacobian> PartialEq for LogDomain<J> {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.ln == other.ln
    }
}

impl<J: Jacobian> PartialOrd for LogDomain<J> {
    #[inline]
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        self.ln.partial_cmp(&other.ln)
    }
}

impl<J: Jacobian> Real for LogDomain<J> {
    const NEEDS_NORMALIZATION: bool = false;
    const NAME: &'static str = J::NAME;

    #[inline]
    fn zero() -> Self {
        Self::from_ln(f64::NEG_INFINITY)
    }

    #[inline]
    fn one() -> Self {
        Self::from_ln(0.0)
    }

    #[inline]
    fn from_f64(p: f64) -> Self {
        debug_assert!(p >= 0.0, "negative probability {p}");
        Self::from_ln(p.ln())
    }

    #[inline]
    fn to_f64(self) -> f64 {
        self.ln.exp()
    }

    // Magnitudes past f64::MAX are fine here; only ln = +inf or NaN is lost.
    #[inline]
    fn is_finite(self) -> bool {
        self.ln < f64::INFINITY
    }
}

impl<J: Jacobian> fmt::Debug for LogDomain<J> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", J::NAME, self)
    }
}

/// Decimal scientific notation, e.g. `3.162278e-5000`, so values far below
/// `f64::MIN_POSITIVE` still print meaningfully.
impl<J: Jacobian> fmt::Display for LogDomain<J> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.ln == f64::NEG_INFINITY {
            return write!(f, "0");
        }
        let lg = self.ln / std::f64::consts::LN_10;
        let exponent = lg.floor();
        let mantissa = 10f64.powf(lg - exponent);
        write!(f, "{mantissa:.6}e{:+}", exponent as i64)
    }
}
