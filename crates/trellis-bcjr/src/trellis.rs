// Transition lookup tables for the decoder.
//
// The decoder never touches the FSM in its inner loops; it reads these flat
// tables, indexed by `state * num_inputs + input`.

use trellis_fsm::Fsm;

/// Snapshot of an FSM's transition relation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trellis {
    num_states: usize,
    num_inputs: usize,
    num_outputs: usize,
    next: Vec<usize>,
    output: Vec<usize>,
}

impl Trellis {
    /// Tabulate every edge of `fsm`.
    pub fn from_fsm<F: Fsm + ?Sized>(fsm: &F) -> Self {
        let num_states = fsm.num_states();
        let num_inputs = fsm.num_inputs();
        let mut next = Vec::with_capacity(num_states * num_inputs);
        let mut output = Vec::with_capacity(num_states * num_inputs);
        for s in 0..num_states {
            for i in 0..num_inputs {
                let t = fsm.transition(s, i);
                next.push(t.next);
                output.push(t.output);
            }
        }
        Self {
            num_states,
            num_inputs,
            num_outputs: fsm.num_outputs(),
            next,
            output,
        }
    }

    #[inline]
    pub fn num_states(&self) -> usize {
        self.num_states
    }

    #[inline]
    pub fn num_inputs(&self) -> usize {
        self.num_inputs
    }

    #[inline]
    pub fn num_outputs(&self) -> usize {
        self.num_outputs
    }

    /// Edges per timestep (`S * q_in`).
    #[inline]
    pub fn num_edges(&self) -> usize {
        self.next.len()
    }

    #[inline]
    pub fn next(&self, state: usize, input: usize) -> usize {
        self.next[state * self.num_inputs + input]
    }

    #[inline]
    pub fn output(&self, state: usize, input: usize) -> usize {
        self.output[state * self.num_inputs + input]
    }
}
