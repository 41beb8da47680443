// Decoder configuration: termination policy and normalization.

use trellis_core::Real;

/// Constraint on the trellis state at one end of the block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "snake_case")
)]
pub enum Boundary {
    /// The encoder is known to be in this state.
    State(usize),
    /// Nothing is known; all states are equally likely.
    Uniform,
}

/// How the start and end of the trellis are tied down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "snake_case")
)]
pub enum Termination {
    /// Independent start and end constraints.
    Open { start: Boundary, end: Boundary },
    /// Tail-biting: start and end state are equal but unknown. Boundary
    /// distributions are the stationary vectors of the block operator.
    Circular,
}

impl Termination {
    /// Start and end in state 0 (zero-tailed blocks).
    pub const fn zero_terminated() -> Self {
        Termination::Open {
            start: Boundary::State(0),
            end: Boundary::State(0),
        }
    }

    /// Start in state 0, end anywhere (unterminated blocks).
    pub const fn start_at_zero() -> Self {
        Termination::Open {
            start: Boundary::State(0),
            end: Boundary::Uniform,
        }
    }

    /// Neither end constrained.
    pub const fn unknown() -> Self {
        Termination::Open {
            start: Boundary::Uniform,
            end: Boundary::Uniform,
        }
    }

    pub const fn circular() -> Self {
        Termination::Circular
    }
}

impl Default for Termination {
    fn default() -> Self {
        Termination::start_at_zero()
    }
}

/// Whether forward and backward metrics are rescaled to unit sum after every
/// timestep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "snake_case")
)]
pub enum Normalization {
    /// Normalize iff the representation needs it
    /// ([`Real::NEEDS_NORMALIZATION`]).
    #[default]
    Auto,
    Always,
    /// Never normalize. With linear representations long blocks underflow.
    Never,
}

impl Normalization {
    /// Resolve to a concrete on/off decision for representation `R`.
    pub fn resolve<R: Real>(self) -> bool {
        match self {
            Normalization::Auto => R::NEEDS_NORMALIZATION,
            Normalization::Always => true,
            Normalization::Never => false,
        }
    }
}

/// Configuration for a [`crate::Bcjr`] instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BcjrConfig {
    pub termination: Termination,
    pub normalization: Normalization,
}

impl BcjrConfig {
    pub fn new(termination: Termination) -> Self {
        Self {
            termination,
            normalization: Normalization::Auto,
        }
    }

    pub fn with_normalization(mut self, normalization: Normalization) -> Self {
        self.normalization = normalization;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trellis_core::LogReal;

    #[test]
    fn default_starts_at_zero() {
        let config = BcjrConfig::default();
        assert_eq!(config.termination, Termination::start_at_zero());
        assert_eq!(config.normalization, Normalization::Auto);
    }

    #[test]
    fn auto_follows_representation() {
        assert!(Normalization::Auto.resolve::<f64>());
        assert!(Normalization::Auto.resolve::<f32>());
        assert!(!Normalization::Auto.resolve::<LogReal>());
    }

    #[test]
    fn explicit_overrides() {
        assert!(!Normalization::Never.resolve::<f64>());
        assert!(Normalization::Always.resolve::<LogReal>());
    }

    #[test]
    fn builder() {
        let config = BcjrConfig::new(Termination::circular()).with_normalization(Normalization::Never);
        assert_eq!(config.termination, Termination::Circular);
        assert_eq!(config.normalization, Normalization::Never);
    }
}
