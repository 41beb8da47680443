// Recursive systematic convolutional coder.
// Origin: rscc.h

use std::fmt;

use crate::polynomial::{degree, format_octal, parity};
use crate::{Circular, Fsm, FsmError, Recursive, Transition, check_range, gf2};

/// Binary recursive systematic convolutional (RSC) encoder of rate `1/n`.
///
/// Built from a feedback polynomial and `n - 1` feedforward polynomials. With
/// memory `nu` (the feedback degree) the register holds `nu` bits; state bit
/// `nu - 1` is the most recent feed-in. On each step the feed-in
///
/// ```text
/// f = x XOR parity(state & feedback)
/// ```
///
/// is shifted in, output bit 0 is the systematic input `x` and output bit
/// `j >= 1` is `parity(((f << nu) | state) & feedforward[j - 1])`. Output
/// symbols pack bit `j` at position `j`.
#[derive(Debug, Clone)]
pub struct Rscc {
    feedback: u32,
    feedforward: Vec<u32>,
    nu: usize,
    state: usize,
}

impl Rscc {
    /// Create an RSC encoder, e.g. `Rscc::new(0o7, &[0o5])` for the classic
    /// four-state (7, 5) code.
    ///
    /// # Errors
    ///
    /// Returns [`FsmError::InvalidGenerator`] if there is no feedforward
    /// polynomial, if the feedback polynomial has no taps below its leading
    /// term (i.e. is 0 or a power of two), or if any feedforward polynomial is
    /// 0, exceeds the feedback degree or equals the feedback polynomial.
    pub fn new(feedback: u32, feedforward: &[u32]) -> Result<Self, FsmError> {
        if feedforward.is_empty() {
            return Err(FsmError::InvalidGenerator(
                "at least one feedforward polynomial is required".to_string(),
            ));
        }
        if feedback == 0 || feedback.is_power_of_two() {
            return Err(FsmError::InvalidGenerator(format!(
                "feedback polynomial {feedback:o} has no feedback taps"
            )));
        }
        let nu = degree(feedback).unwrap_or(0);
        if nu > 16 {
            return Err(FsmError::InvalidGenerator(format!(
                "memory {nu} exceeds the supported maximum of 16"
            )));
        }
        for &g in feedforward {
            if g == 0 || g == feedback || degree(g).unwrap_or(0) > nu {
                return Err(FsmError::InvalidGenerator(format!(
                    "feedforward polynomial {g:o} must be non-zero, differ from the \
                     feedback polynomial {feedback:o} and have degree at most {nu}"
                )));
            }
        }
        Ok(Self {
            feedback,
            feedforward: feedforward.to_vec(),
            nu,
            state: 0,
        })
    }

    /// Create from a generator list whose first entry is the feedback
    /// polynomial, as written on the command line (`"7,5"`).
    pub fn from_generators(generators: &[u32]) -> Result<Self, FsmError> {
        match generators.split_first() {
            Some((&feedback, feedforward)) => Self::new(feedback, feedforward),
            None => Err(FsmError::InvalidGenerator("no generators given".to_string())),
        }
    }

    pub fn feedback(&self) -> u32 {
        self.feedback
    }

    pub fn feedforward(&self) -> &[u32] {
        &self.feedforward
    }

    /// Number of output bits per step (`n`).
    pub fn output_bits(&self) -> usize {
        1 + self.feedforward.len()
    }

    #[inline]
    fn feedback_term(&self, state: usize) -> usize {
        parity(state & self.feedback as usize)
    }
}

impl Fsm for Rscc {
    fn num_states(&self) -> usize {
        1 << self.nu
    }

    fn num_inputs(&self) -> usize {
        2
    }

    fn num_outputs(&self) -> usize {
        1 << self.output_bits()
    }

    fn transition(&self, state: usize, input: usize) -> Transition {
        check_range("state", state, self.num_states());
        check_range("input", input, 2);
        let feedin = input ^ self.feedback_term(state);
        let register = (feedin << self.nu) | state;
        let mut output = input;
        for (j, &g) in self.feedforward.iter().enumerate() {
            output |= parity(register & g as usize) << (j + 1);
        }
        Transition {
            next: register >> 1,
            output,
        }
    }

    fn memory(&self) -> Option<usize> {
        Some(self.nu)
    }

    fn tail_input(&self, state: usize) -> usize {
        self.determine_input(state, 0)
    }

    fn state(&self) -> usize {
        self.state
    }

    fn reset(&mut self, state: usize) {
        check_range("state", state, self.num_states());
        self.state = state;
    }
}

impl Recursive for Rscc {
    fn determine_feedin(&self, state: usize, input: usize) -> usize {
        check_range("state", state, self.num_states());
        check_range("input", input, 2);
        input ^ self.feedback_term(state)
    }

    fn determine_input(&self, state: usize, feedin: usize) -> usize {
        check_range("state", state, self.num_states());
        check_range("feed-in", feedin, 2);
        feedin ^ self.feedback_term(state)
    }
}

impl Circular for Rscc {
    fn reset_circular(&mut self, zero_state: usize, n: usize) -> Result<usize, FsmError> {
        check_range("state", zero_state, self.num_states());
        let s = gf2::circulation_state(self.nu, |s| self.transition(s, 0).next, zero_state, n)?;
        self.state = s;
        Ok(s)
    }
}

impl fmt::Display for Rscc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut gens = vec![self.feedback];
        gens.extend(&self.feedforward);
        write!(
            f,
            "RSC code (K={}, rate 1/{}, generators {} octal)",
            self.nu + 1,
            self.output_bits(),
            format_octal(&gens)
        )
    }
}
