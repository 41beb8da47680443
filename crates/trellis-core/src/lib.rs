//! Shared building blocks for the trellis decoding workspace.
//!
//! This crate holds the pieces every other crate leans on: a dense row-major
//! [`table::Table`] used for likelihood and probability tables, and the
//! arithmetic policies that decide how probabilities are represented inside
//! the forward-backward recursion.
//!
//! # Architecture
//!
//! - [`table`] -- Row-major `rows x cols` table (timestep x symbol)
//! - [`real`] -- The [`Real`] policy trait and its linear `f64`/`f32` impls
//! - [`logreal`] -- Log-domain surrogates ([`LogReal`], [`LogRealFast`])

pub mod logreal;
pub mod real;
pub mod table;

pub use logreal::{LogReal, LogRealFast};
pub use real::Real;
pub use table::Table;

/// Error type for building tables from caller-supplied data.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ShapeError {
    #[error("ragged table: row {row} has {actual} columns, expected {expected}")]
    Ragged {
        row: usize,
        expected: usize,
        actual: usize,
    },
    #[error("data length {actual} does not match {rows} x {cols}")]
    Length {
        rows: usize,
        cols: usize,
        actual: usize,
    },
}
