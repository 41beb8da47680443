//! Soft-input/soft-output trellis decoding with the BCJR algorithm.
//!
//! [`Bcjr`] runs the forward-backward recursion over the trellis of any
//! [`trellis_fsm::Fsm`], consuming per-timestep channel likelihoods (and
//! optional a-priori input probabilities) and producing symbol-wise
//! a-posteriori probabilities.
//!
//! The engine is generic over the probability representation
//! ([`trellis_core::Real`]): plain `f64`/`f32`, the same with per-step
//! normalization, or the log-domain [`trellis_core::LogReal`] types. The
//! representation changes precision and speed, never the decoded result.
//!
//! ```
//! use trellis_bcjr::{Bcjr, BcjrConfig};
//! use trellis_core::Table;
//! use trellis_fsm::Rscc;
//!
//! let code = Rscc::new(0o7, &[0o5]).unwrap();
//! let mut bcjr = Bcjr::<f64>::new(&code, 4, BcjrConfig::default());
//! // Uninformative channel: every output symbol equally likely.
//! let likelihoods = Table::new(4, 4, 1.0);
//! let app = bcjr.decode(&likelihoods, None).unwrap();
//! assert!((app.inputs[(0, 0)] - 0.5).abs() < 1e-12);
//! ```
//!
//! # Architecture
//!
//! - [`config`] -- Termination policy and normalization switch
//! - [`trellis`] -- Transition lookup tables built from an FSM
//! - [`metrics`] -- Branch metrics (gamma)
//! - [`engine`] -- Forward pass, backward pass and combination
//! - [`circular`] -- Boundary distributions for tail-biting trellises

pub mod circular;
pub mod config;
pub mod engine;
pub mod metrics;
pub mod trellis;

use std::fmt;

pub use config::{BcjrConfig, Boundary, Normalization, Termination};
pub use engine::{Bcjr, Posterior};
pub use metrics::BranchMetrics;
pub use trellis::Trellis;

/// Stage of the recursion at which an infeasibility was detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Pass {
    Forward,
    Backward,
    Posterior,
    Circular,
}

impl fmt::Display for Pass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Pass::Forward => "forward",
            Pass::Backward => "backward",
            Pass::Posterior => "a-posteriori",
            Pass::Circular => "circular boundary",
        })
    }
}

/// Error type for a decode that has no valid answer.
///
/// This is the only recoverable failure: the block's inputs leave no path
/// through the trellis with non-zero mass (contradictory hard a-priori
/// information), or an unnormalized linear representation underflowed or
/// overflowed. In either case no NaN posterior is ever returned.
/// Shape mismatches and out-of-range states are caller defects and panic.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("no feasible trellis path: {pass} metrics vanish or overflow at timestep {timestep}")]
    Infeasible { pass: Pass, timestep: usize },
}
