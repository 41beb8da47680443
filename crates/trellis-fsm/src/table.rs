// FSM given by explicit next-state and output tables.

use crate::{Fsm, FsmError, Transition, check_range};

/// An arbitrary q-ary finite state machine.
///
/// Tables are indexed by `state * num_inputs + input`. The flush behaviour is
/// derived at construction: if feeding input 0 drives every state to state 0
/// (and keeps it there), [`Fsm::memory`] reports the longest such run.
#[derive(Debug, Clone)]
pub struct TableFsm {
    num_states: usize,
    num_inputs: usize,
    num_outputs: usize,
    next: Vec<usize>,
    output: Vec<usize>,
    memory: Option<usize>,
    state: usize,
}

impl TableFsm {
    /// Build from flat tables.
    ///
    /// # Errors
    ///
    /// Returns [`FsmError::InvalidTable`] if any dimension is zero, a table has
    /// the wrong length, or an entry is out of range.
    pub fn new(
        num_states: usize,
        num_inputs: usize,
        num_outputs: usize,
        next: Vec<usize>,
        output: Vec<usize>,
    ) -> Result<Self, FsmError> {
        if num_states == 0 || num_inputs == 0 || num_outputs == 0 {
            return Err(FsmError::InvalidTable(
                "state, input and output counts must be non-zero".to_string(),
            ));
        }
        let edges = num_states * num_inputs;
        if next.len() != edges || output.len() != edges {
            return Err(FsmError::InvalidTable(format!(
                "expected {edges} entries per table, got {} next and {} output",
                next.len(),
                output.len()
            )));
        }
        if let Some(bad) = next.iter().position(|&s| s >= num_states) {
            return Err(FsmError::InvalidTable(format!(
                "edge {bad} leads to state {} (only {num_states} states)",
                next[bad]
            )));
        }
        if let Some(bad) = output.iter().position(|&o| o >= num_outputs) {
            return Err(FsmError::InvalidTable(format!(
                "edge {bad} emits symbol {} (only {num_outputs} symbols)",
                output[bad]
            )));
        }
        let memory = flush_length(num_states, |s| next[s * num_inputs]);
        Ok(Self {
            num_states,
            num_inputs,
            num_outputs,
            next,
            output,
            memory,
            state: 0,
        })
    }

    /// Build by evaluating `f(state, input) -> (next, output)` on every edge.
    pub fn from_fn(
        num_states: usize,
        num_inputs: usize,
        num_outputs: usize,
        f: impl Fn(usize, usize) -> (usize, usize),
    ) -> Result<Self, FsmError> {
        let (next, output) = (0..num_states)
            .flat_map(|s| (0..num_inputs).map(move |i| (s, i)))
            .map(|(s, i)| f(s, i))
            .unzip();
        Self::new(num_states, num_inputs, num_outputs, next, output)
    }
}

/// Longest number of zero-input steps any state needs to reach state 0, or
/// `None` if some state never gets there or state 0 does not stay put.
fn flush_length(num_states: usize, zero_step: impl Fn(usize) -> usize) -> Option<usize> {
    if zero_step(0) != 0 {
        return None;
    }
    let mut longest = 0;
    for start in 0..num_states {
        let mut s = start;
        let mut steps = 0;
        while s != 0 {
            if steps == num_states {
                return None;
            }
            s = zero_step(s);
            steps += 1;
        }
        longest = longest.max(steps);
    }
    Some(longest)
}

impl Fsm for TableFsm {
    fn num_states(&self) -> usize {
        self.num_states
    }

    fn num_inputs(&self) -> usize {
        self.num_inputs
    }

    fn num_outputs(&self) -> usize {
        self.num_outputs
    }

    fn transition(&self, state: usize, input: usize) -> Transition {
        check_range("state", state, self.num_states);
        check_range("input", input, self.num_inputs);
        let edge = state * self.num_inputs + input;
        Transition {
            next: self.next[edge],
            output: self.output[edge],
        }
    }

    fn memory(&self) -> Option<usize> {
        self.memory
    }

    fn tail_input(&self, _state: usize) -> usize {
        0
    }

    fn state(&self) -> usize {
        self.state
    }

    fn reset(&mut self, state: usize) {
        check_range("state", state, self.num_states);
        self.state = state;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Differential encoder: state is the previous output bit.
    fn differential() -> TableFsm {
        TableFsm::from_fn(2, 2, 2, |s, x| (s ^ x, s ^ x)).unwrap()
    }

    #[test]
    fn from_fn_fills_tables() {
        let fsm = differential();
        assert_eq!(fsm.transition(0, 1), Transition { next: 1, output: 1 });
        assert_eq!(fsm.transition(1, 1), Transition { next: 0, output: 0 });
    }

    #[test]
    fn rejects_bad_tables() {
        assert!(TableFsm::new(0, 2, 2, vec![], vec![]).is_err());
        assert!(TableFsm::new(2, 2, 2, vec![0; 3], vec![0; 4]).is_err());
        assert!(TableFsm::new(2, 2, 2, vec![0, 1, 2, 0], vec![0; 4]).is_err());
        assert!(TableFsm::new(2, 2, 2, vec![0; 4], vec![0, 0, 3, 0]).is_err());
    }

    #[test]
    fn memory_of_shift_register() {
        // Two-bit shift register: zero input flushes in two steps.
        let fsm = TableFsm::from_fn(4, 2, 2, |s, x| ((x << 1) | (s >> 1), x)).unwrap();
        assert_eq!(fsm.memory(), Some(2));
    }

    #[test]
    fn unflushable_machine_has_no_memory() {
        // Differential encoder holds its state under zero input.
        assert_eq!(differential().memory(), None);
        // Toggle machine never settles.
        let toggle = TableFsm::from_fn(2, 1, 1, |s, _| (1 - s, 0)).unwrap();
        assert_eq!(toggle.memory(), None);
    }

    #[test]
    fn ternary_alphabets() {
        let fsm = TableFsm::from_fn(3, 3, 9, |s, x| ((s + x) % 3, s * 3 + x)).unwrap();
        assert_eq!(fsm.num_inputs(), 3);
        assert_eq!(fsm.transition(2, 2), Transition { next: 1, output: 8 });
    }

    #[test]
    #[should_panic(expected = "input 3 out of range")]
    fn out_of_range_input_panics() {
        let fsm = TableFsm::from_fn(3, 3, 9, |s, x| ((s + x) % 3, s * 3 + x)).unwrap();
        fsm.transition(0, 3);
    }
}
