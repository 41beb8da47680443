// Non-recursive (feedforward) convolutional coder.

use std::fmt;

use crate::polynomial::{degree, format_octal, parity};
use crate::{Circular, Fsm, FsmError, Transition, check_range, gf2};

/// Binary feedforward convolutional encoder of rate `1/n`.
///
/// The register holds the last `nu` inputs, most recent in bit `nu - 1`.
/// Output bit `j` is `parity(((x << nu) | state) & generators[j])`.
#[derive(Debug, Clone)]
pub struct Nrcc {
    generators: Vec<u32>,
    nu: usize,
    state: usize,
}

impl Nrcc {
    /// Create a feedforward encoder, e.g. `Nrcc::new(&[0o7, 0o5])`.
    ///
    /// # Errors
    ///
    /// Returns [`FsmError::InvalidGenerator`] if no generators are given, any
    /// generator is zero, or all generators have degree 0 (no memory).
    pub fn new(generators: &[u32]) -> Result<Self, FsmError> {
        if generators.is_empty() {
            return Err(FsmError::InvalidGenerator("no generators given".to_string()));
        }
        let mut nu = 0;
        for &g in generators {
            match degree(g) {
                Some(d) => nu = nu.max(d),
                None => {
                    return Err(FsmError::InvalidGenerator(
                        "generator polynomial must be non-zero".to_string(),
                    ));
                }
            }
        }
        if nu == 0 {
            return Err(FsmError::InvalidGenerator(
                "generators have no memory".to_string(),
            ));
        }
        if nu > 16 {
            return Err(FsmError::InvalidGenerator(format!(
                "memory {nu} exceeds the supported maximum of 16"
            )));
        }
        Ok(Self {
            generators: generators.to_vec(),
            nu,
            state: 0,
        })
    }

    pub fn generators(&self) -> &[u32] {
        &self.generators
    }

    /// Number of output bits per step (`n`).
    pub fn output_bits(&self) -> usize {
        self.generators.len()
    }
}

impl Fsm for Nrcc {
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
        // Generators may have lower degree than nu; align their leading tap
        // with the register input.
        let register = (input << self.nu) | state;
        let output = self
            .generators
            .iter()
            .enumerate()
            .fold(0, |acc, (j, &g)| {
                let shift = self.nu - degree(g).unwrap_or(0);
                acc | (parity(register & ((g as usize) << shift)) << j)
            });
        Transition {
            next: register >> 1,
            output,
        }
    }

    fn memory(&self) -> Option<usize> {
        Some(self.nu)
    }

    fn tail_input(&self, _state: usize) -> usize {
        0
    }

    fn state(&self) -> usize {
        self.state
    }

    fn reset(&mut self, state: usize) {
        check_range("state", state, self.num_states());
        self.state = state;
    }
}

impl Circular for Nrcc {
    fn reset_circular(&mut self, zero_state: usize, n: usize) -> Result<usize, FsmError> {
        check_range("state", zero_state, self.num_states());
        let s = gf2::circulation_state(self.nu, |s| s >> 1, zero_state, n)?;
        self.state = s;
        Ok(s)
    }
}

impl fmt::Display for Nrcc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "NRC code (K={}, rate 1/{}, generators {} octal)",
            self.nu + 1,
            self.output_bits(),
            format_octal(&self.generators)
        )
    }
}
