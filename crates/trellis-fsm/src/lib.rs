//! Finite state machines for convolutional encoders.
//!
//! An [`Fsm`] exposes the transition relation of an encoder: for every state
//! and input symbol it yields the next state and the output symbol. Decoders
//! work off this relation only; the mutable cursor (`reset`/`step`) exists for
//! encoding.
//!
//! Two capabilities are split out as separate traits so that machines which
//! cannot support them simply do not implement them:
//!
//! - [`Recursive`] -- feed-in/input recovery for feedback (recursive) encoders
//! - [`Circular`] -- circulation-state computation for tail-biting blocks
//!
//! # Architecture
//!
//! - [`polynomial`] -- Generator polynomial parsing and bit helpers
//! - [`gf2`] -- Linear algebra over GF(2) and the circulation-state solver
//! - [`rscc`] -- Recursive systematic convolutional code
//! - [`nrcc`] -- Non-recursive (feedforward) convolutional code
//! - [`table`] -- Arbitrary q-ary machine given by explicit tables

pub mod gf2;
pub mod nrcc;
pub mod polynomial;
pub mod rscc;
pub mod table;

pub use nrcc::Nrcc;
pub use rscc::Rscc;
pub use table::TableFsm;

/// Error type for FSM construction and circulation-state computation.
///
/// Out-of-range states and inputs are caller defects and panic instead.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FsmError {
    #[error("invalid generator polynomial: {0}")]
    InvalidGenerator(String),
    #[error("invalid transition table: {0}")]
    InvalidTable(String),
    #[error("no circulation state exists for block length {block_length}")]
    NoCirculationState { block_length: usize },
}

/// Result of taking one edge of the trellis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Transition {
    pub next: usize,
    pub output: usize,
}

/// A deterministic finite state machine with a fixed input/output alphabet.
pub trait Fsm {
    /// Number of states `S`.
    fn num_states(&self) -> usize;

    /// Input alphabet size `q_in`.
    fn num_inputs(&self) -> usize;

    /// Output alphabet size `q_out`.
    fn num_outputs(&self) -> usize;

    /// Take the edge labelled `input` out of `state`.
    ///
    /// # Panics
    ///
    /// Panics if `state >= num_states()` or `input >= num_inputs()`.
    fn transition(&self, state: usize, input: usize) -> Transition;

    /// Number of tail steps that drive any state to state 0 when fed
    /// [`Fsm::tail_input`], or `None` if the machine cannot be flushed.
    fn memory(&self) -> Option<usize>;

    /// The input that moves `state` one step closer to state 0.
    fn tail_input(&self, state: usize) -> usize;

    /// Current encoder state.
    fn state(&self) -> usize;

    /// Set the encoder state.
    ///
    /// # Panics
    ///
    /// Panics if `state >= num_states()`.
    fn reset(&mut self, state: usize);

    /// Encode one input symbol from the current state, returning the output.
    fn step(&mut self, input: usize) -> usize {
        let t = self.transition(self.state(), input);
        self.reset(t.next);
        t.output
    }

    /// Encode a sequence of inputs from the current state.
    fn encode(&mut self, inputs: &[usize]) -> Vec<usize> {
        inputs.iter().map(|&input| self.step(input)).collect()
    }
}

/// Feed-in recovery for recursive (feedback) encoders.
///
/// The feed-in is the value shifted into the register on a step: the input
/// combined with the feedback term of the current state.
pub trait Recursive: Fsm {
    /// Register feed-in produced by applying `input` in `state`.
    fn determine_feedin(&self, state: usize, input: usize) -> usize;

    /// The input that makes the register receive `feedin` from `state`.
    /// A feed-in of 0 gives the tail input.
    fn determine_input(&self, state: usize, feedin: usize) -> usize;
}

/// Circulation-state computation for tail-biting encoding.
pub trait Circular: Fsm {
    /// Compute the state `s` from which encoding a block of `n` inputs ends in
    /// `s` again, given `zero_state`, the state the same block reaches when
    /// encoded from state 0. The cursor is reset to `s`, which is returned.
    fn reset_circular(&mut self, zero_state: usize, n: usize) -> Result<usize, FsmError>;
}

impl<F: Fsm + ?Sized> Fsm for Box<F> {
    fn num_states(&self) -> usize {
        (**self).num_states()
    }

    fn num_inputs(&self) -> usize {
        (**self).num_inputs()
    }

    fn num_outputs(&self) -> usize {
        (**self).num_outputs()
    }

    fn transition(&self, state: usize, input: usize) -> Transition {
        (**self).transition(state, input)
    }

    fn memory(&self) -> Option<usize> {
        (**self).memory()
    }

    fn tail_input(&self, state: usize) -> usize {
        (**self).tail_input(state)
    }

    fn state(&self) -> usize {
        (**self).state()
    }

    fn reset(&mut self, state: usize) {
        (**self).reset(state)
    }
}

impl<F: Circular + ?Sized> Circular for Box<F> {
    fn reset_circular(&mut self, zero_state: usize, n: usize) -> Result<usize, FsmError> {
        (**self).reset_circular(zero_state, n)
    }
}

/// Panic with a uniform message when a state or input is out of range.
#[inline]
pub(crate) fn check_range(what: &str, value: usize, limit: usize) {
    assert!(value < limit, "{what} {value} out of range (limit {limit})");
}
