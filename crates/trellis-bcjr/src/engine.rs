// Forward-backward recursion and a-posteriori extraction.
// Origin: safe_bcjr.h

use tracing::{debug, trace};
use trellis_core::{Real, Table, real};
use trellis_fsm::Fsm;

use crate::circular;
use crate::config::{BcjrConfig, Boundary, Termination};
use crate::metrics::BranchMetrics;
use crate::trellis::Trellis;
use crate::{DecodeError, Pass};

/// A-posteriori probabilities of one decoded block.
///
/// Both tables have one row per timestep; every row sums to one.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Posterior {
    /// `tau x q_in`: probability of each input symbol.
    pub inputs: Table<f64>,
    /// `tau x q_out`: probability of each output symbol.
    pub outputs: Table<f64>,
}

impl Posterior {
    /// Most probable input symbol per timestep.
    pub fn hard_decisions(&self) -> Vec<usize> {
        self.inputs.iter_rows().map(real::argmax).collect()
    }

    /// Most probable output symbol per timestep.
    pub fn output_decisions(&self) -> Vec<usize> {
        self.outputs.iter_rows().map(real::argmax).collect()
    }
}

/// BCJR decoder for a fixed trellis and block length.
///
/// Scratch tables for alpha, beta and gamma are allocated once and reused by
/// every [`Bcjr::decode`] call.
#[derive(Debug, Clone)]
pub struct Bcjr<R: Real> {
    trellis: Trellis,
    tau: usize,
    config: BcjrConfig,
    normalize: bool,
    gamma: BranchMetrics<R>,
    alpha: Table<R>,
    beta: Table<R>,
}

impl<R: Real> Bcjr<R> {
    /// Build a decoder for `tau` timesteps of `fsm`'s trellis.
    ///
    /// # Panics
    ///
    /// Panics if `tau` is zero or a [`Boundary::State`] is not a state of
    /// `fsm`.
    pub fn new<F: Fsm + ?Sized>(fsm: &F, tau: usize, config: BcjrConfig) -> Self {
        assert!(tau > 0, "block length must be positive");
        let trellis = Trellis::from_fsm(fsm);
        let n = trellis.num_states();
        if let Termination::Open { start, end } = config.termination {
            for boundary in [start, end] {
                if let Boundary::State(s) = boundary {
                    assert!(s < n, "boundary state {s} out of range (limit {n})");
                }
            }
        }
        let normalize = config.normalization.resolve::<R>();
        debug!(
            states = n,
            inputs = trellis.num_inputs(),
            outputs = trellis.num_outputs(),
            tau,
            policy = R::NAME,
            normalize,
            termination = ?config.termination,
            "built BCJR decoder"
        );
        Self {
            gamma: BranchMetrics::new(&trellis, tau),
            alpha: Table::new(tau + 1, n, R::zero()),
            beta: Table::new(tau + 1, n, R::zero()),
            trellis,
            tau,
            config,
            normalize,
        }
    }

    pub fn trellis(&self) -> &Trellis {
        &self.trellis
    }

    /// Number of trellis steps per block.
    pub fn block_length(&self) -> usize {
        self.tau
    }

    pub fn config(&self) -> &BcjrConfig {
        &self.config
    }

    /// Whether alpha and beta are rescaled after every step.
    pub fn normalizes(&self) -> bool {
        self.normalize
    }

    /// Decode one block from a `tau x q_out` likelihood table and an optional
    /// `tau x q_in` a-priori table.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::Infeasible`] if no path through the trellis has
    /// non-zero mass.
    ///
    /// # Panics
    ///
    /// Panics on table shape mismatches or negative entries.
    pub fn decode(
        &mut self,
        likelihoods: &Table<f64>,
        prior: Option<&Table<f64>>,
    ) -> Result<Posterior, DecodeError> {
        assert_eq!(
            likelihoods.rows(),
            self.tau,
            "likelihood table has {} rows, block length is {}",
            likelihoods.rows(),
            self.tau
        );
        let mut gamma = std::mem::take(&mut self.gamma);
        gamma.compute(&self.trellis, likelihoods, prior);
        let result = self.decode_metrics(&gamma);
        self.gamma = gamma;
        result
    }

    /// Decode one block from precomputed branch metrics.
    pub fn decode_metrics(&mut self, gamma: &BranchMetrics<R>) -> Result<Posterior, DecodeError> {
        assert_eq!(
            (gamma.block_length(), gamma.num_edges()),
            (self.tau, self.trellis.num_edges()),
            "branch metrics do not match the trellis"
        );
        trace!(tau = self.tau, policy = R::NAME, "decoding block");
        self.init_boundaries(gamma)?;
        self.forward(gamma)?;
        self.backward(gamma)?;
        self.posterior(gamma)
    }

    /// Forward metrics of the last decode, one normalized row per time
    /// `0..=tau`.
    pub fn forward_metrics(&self) -> Table<f64> {
        normalized_rows(&self.alpha)
    }

    /// Backward metrics of the last decode, one normalized row per time
    /// `0..=tau`.
    pub fn backward_metrics(&self) -> Table<f64> {
        normalized_rows(&self.beta)
    }

    fn init_boundaries(&mut self, gamma: &BranchMetrics<R>) -> Result<(), DecodeError> {
        match self.config.termination {
            Termination::Open { start, end } => {
                set_boundary(self.alpha.row_mut(0), start);
                set_boundary(self.beta.row_mut(self.tau), end);
            }
            Termination::Circular => {
                let m = circular::block_operator(&self.trellis, gamma, self.normalize)?;
                let left = circular::left_stationary(&m)?;
                let right = circular::right_stationary(&m)?;
                self.alpha.row_mut(0).copy_from_slice(&left);
                self.beta.row_mut(self.tau).copy_from_slice(&right);
            }
        }
        Ok(())
    }

    fn forward(&mut self, gamma: &BranchMetrics<R>) -> Result<(), DecodeError> {
        let n = self.trellis.num_states();
        let q_in = self.trellis.num_inputs();
        for t in 0..self.tau {
            let g = gamma.step(t);
            let (head, tail) = self.alpha.split_rows_mut(t + 1);
            let cur = &head[t * n..];
            let next = &mut tail[..n];
            next.fill(R::zero());
            for (s, &a) in cur.iter().enumerate() {
                if a.is_zero() {
                    continue;
                }
                for i in 0..q_in {
                    let w = g[s * q_in + i];
                    if !w.is_zero() {
                        next[self.trellis.next(s, i)] += a * w;
                    }
                }
            }
            rescale(self.normalize, next, Pass::Forward, t + 1)?;
        }
        Ok(())
    }

    fn backward(&mut self, gamma: &BranchMetrics<R>) -> Result<(), DecodeError> {
        let n = self.trellis.num_states();
        let q_in = self.trellis.num_inputs();
        for t in (0..self.tau).rev() {
            let g = gamma.step(t);
            let (head, tail) = self.beta.split_rows_mut(t + 1);
            let cur = &mut head[t * n..];
            let next = &tail[..n];
            for (s, b) in cur.iter_mut().enumerate() {
                let mut acc = R::zero();
                for i in 0..q_in {
                    let w = g[s * q_in + i];
                    if !w.is_zero() {
                        acc += w * next[self.trellis.next(s, i)];
                    }
                }
                *b = acc;
            }
            rescale(self.normalize, cur, Pass::Backward, t)?;
        }
        Ok(())
    }

    fn posterior(&self, gamma: &BranchMetrics<R>) -> Result<Posterior, DecodeError> {
        let q_in = self.trellis.num_inputs();
        let q_out = self.trellis.num_outputs();
        let mut inputs = Table::new(self.tau, q_in, 0.0);
        let mut outputs = Table::new(self.tau, q_out, 0.0);
        let mut in_mass = vec![R::zero(); q_in];
        let mut out_mass = vec![R::zero(); q_out];
        for t in 0..self.tau {
            let g = gamma.step(t);
            let alpha = self.alpha.row(t);
            let beta = self.beta.row(t + 1);
            in_mass.fill(R::zero());
            out_mass.fill(R::zero());
            for (s, &a) in alpha.iter().enumerate() {
                if a.is_zero() {
                    continue;
                }
                for i in 0..q_in {
                    let w = g[s * q_in + i];
                    if w.is_zero() {
                        continue;
                    }
                    let mass = a * w * beta[self.trellis.next(s, i)];
                    in_mass[i] += mass;
                    out_mass[self.trellis.output(s, i)] += mass;
                }
            }
            if !to_probabilities(&mut in_mass, inputs.row_mut(t))
                || !to_probabilities(&mut out_mass, outputs.row_mut(t))
            {
                return Err(DecodeError::Infeasible {
                    pass: Pass::Posterior,
                    timestep: t,
                });
            }
        }
        Ok(Posterior { inputs, outputs })
    }
}

/// Rescale a freshly computed metric row, or check it for vanishing or
/// overflowed mass.
fn rescale<R: Real>(
    normalize: bool,
    row: &mut [R],
    pass: Pass,
    timestep: usize,
) -> Result<(), DecodeError> {
    let feasible = if normalize {
        real::normalize(row).is_some()
    } else {
        let total = real::sum(row);
        !total.is_zero() && total.is_finite()
    };
    if feasible {
        Ok(())
    } else {
        Err(DecodeError::Infeasible { pass, timestep })
    }
}

fn set_boundary<R: Real>(row: &mut [R], boundary: Boundary) {
    match boundary {
        Boundary::State(s) => {
            row.fill(R::zero());
            row[s] = R::one();
        }
        Boundary::Uniform => row.fill(R::from_f64(1.0 / row.len() as f64)),
    }
}

/// Normalize `mass` in the working representation, then convert to `f64`
/// and renormalize there. Returns `false` if all mass is zero or the total
/// is not finite.
fn to_probabilities<R: Real>(mass: &mut [R], out: &mut [f64]) -> bool {
    if real::normalize(mass).is_none() {
        return false;
    }
    for (dst, &m) in out.iter_mut().zip(mass.iter()) {
        *dst = m.to_f64();
    }
    real::normalize(out).is_some()
}

fn normalized_rows<R: Real>(table: &Table<R>) -> Table<f64> {
    let mut out = Table::new(table.rows(), table.cols(), 0.0);
    let mut scratch = vec![R::zero(); table.cols()];
    for (r, row) in table.iter_rows().enumerate() {
        scratch.copy_from_slice(row);
        // An all-zero row stays zero.
        if real::normalize(&mut scratch).is_some() {
            for (dst, &v) in out.row_mut(r).iter_mut().zip(&scratch) {
                *dst = v.to_f64();
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Normalization;
    use trellis_core::{LogReal, LogRealFast};
    use trellis_fsm::{Circular, Nrcc, Rscc, TableFsm};

    /// Deterministic likelihoods in (0.05, 1].
    fn likelihoods(tau: usize, q_out: usize, seed: u64) -> Table<f64> {
        let mut x = seed;
        let mut table = Table::new(tau, q_out, 0.0);
        for t in 0..tau {
            for o in 0..q_out {
                x = x.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
                table[(t, o)] = 0.05 + 0.95 * ((x >> 11) as f64 / (1u64 << 53) as f64);
            }
        }
        table
    }

    /// Reference APPs by summing over every path through the trellis.
    fn brute_force(
        fsm: &dyn Fsm,
        lik: &Table<f64>,
        prior: Option<&Table<f64>>,
        termination: Termination,
    ) -> Table<f64> {
        let tau = lik.rows();
        let (n, q) = (fsm.num_states(), fsm.num_inputs());
        let mut app = Table::new(tau, q, 0.0);
        for start in 0..n {
            let start_weight = match termination {
                Termination::Open { start: Boundary::State(s), .. } if s != start => continue,
                _ => 1.0,
            };
            for code in 0..q.pow(tau as u32) {
                let inputs: Vec<usize> = (0..tau).map(|t| (code / q.pow(t as u32)) % q).collect();
                let mut state = start;
                let mut weight = start_weight;
                for (t, &i) in inputs.iter().enumerate() {
                    let tr = fsm.transition(state, i);
                    weight *= lik[(t, tr.output)] * prior.map_or(1.0, |p| p[(t, i)]);
                    state = tr.next;
                }
                let keep = match termination {
                    Termination::Open { end: Boundary::State(e), .. } => state == e,
                    Termination::Open { .. } => true,
                    Termination::Circular => state == start,
                };
                if keep {
                    for (t, &i) in inputs.iter().enumerate() {
                        app[(t, i)] += weight;
                    }
                }
            }
        }
        for t in 0..tau {
            real::normalize(app.row_mut(t));
        }
        app
    }

    fn assert_close(a: &Table<f64>, b: &Table<f64>, tol: f64) {
        assert_eq!(a.shape(), b.shape());
        for (x, y) in a.as_slice().iter().zip(b.as_slice()) {
            assert!((x - y).abs() <= tol, "{x} vs {y} (tolerance {tol})");
        }
    }

    fn decode<R: Real>(
        fsm: &dyn Fsm,
        lik: &Table<f64>,
        prior: Option<&Table<f64>>,
        config: BcjrConfig,
    ) -> Posterior {
        let mut bcjr = Bcjr::<R>::new(fsm, lik.rows(), config);
        bcjr.decode(lik, prior).unwrap()
    }

    #[test]
    fn matches_brute_force_for_open_terminations() {
        let code = Rscc::new(0o7, &[0o5]).unwrap();
        let lik = likelihoods(6, 4, 7);
        for termination in [
            Termination::start_at_zero(),
            Termination::zero_terminated(),
            Termination::unknown(),
        ] {
            let expected = brute_force(&code, &lik, None, termination);
            let config = BcjrConfig::new(termination);
            assert_close(&decode::<f64>(&code, &lik, None, config).inputs, &expected, 1e-9);
            assert_close(&decode::<LogReal>(&code, &lik, None, config).inputs, &expected, 1e-9);
            assert_close(&decode::<LogRealFast>(&code, &lik, None, config).inputs, &expected, 1e-5);
            assert_close(&decode::<f32>(&code, &lik, None, config).inputs, &expected, 1e-4);
            let plain = config.with_normalization(Normalization::Never);
            assert_close(&decode::<f64>(&code, &lik, None, plain).inputs, &expected, 1e-9);
        }
    }

    #[test]
    fn prior_enters_like_brute_force() {
        let code = Nrcc::new(&[0o7, 0o5]).unwrap();
        let lik = likelihoods(5, 4, 3);
        let prior = Table::from_rows(vec![
            vec![0.9, 0.1],
            vec![0.5, 0.5],
            vec![0.2, 0.8],
            vec![0.6, 0.4],
            vec![0.5, 0.5],
        ])
        .unwrap();
        let config = BcjrConfig::default();
        let expected = brute_force(&code, &lik, Some(&prior), config.termination);
        assert_close(&decode::<f64>(&code, &lik, Some(&prior), config).inputs, &expected, 1e-9);
        assert_close(
            &decode::<LogReal>(&code, &lik, Some(&prior), config).inputs,
            &expected,
            1e-9,
        );
    }

    #[test]
    fn noiseless_tail_biting_block_is_recovered() {
        let mut code = Rscc::new(0o7, &[0o5]).unwrap();
        let data = [1, 1, 0, 1, 0, 0, 1, 0, 1, 1];
        code.reset(0);
        code.encode(&data);
        let zero_state = code.state();
        let start = code.reset_circular(zero_state, data.len()).unwrap();
        assert_eq!(start, 3);
        let sent = code.encode(&data);
        assert_eq!(code.state(), start);

        let mut lik = Table::new(data.len(), 4, 0.0);
        for (t, &y) in sent.iter().enumerate() {
            lik[(t, y)] = 1.0;
        }
        let mut bcjr = Bcjr::<f64>::new(&code, data.len(), BcjrConfig::new(Termination::Circular));
        let app = bcjr.decode(&lik, None).unwrap();
        assert_eq!(app.hard_decisions(), data.to_vec());
        assert_eq!(app.output_decisions(), sent);
        assert_eq!(bcjr.forward_metrics().row(0), &[0.0, 0.0, 0.0, 1.0]);
        assert_eq!(bcjr.backward_metrics().row(data.len()), &[0.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn rows_sum_to_one() {
        let fsm = TableFsm::from_fn(3, 3, 9, |s, x| ((s + x) % 3, s * 3 + x)).unwrap();
        let lik = likelihoods(8, 9, 11);
        let app = decode::<LogReal>(&fsm, &lik, None, BcjrConfig::default());
        for row in app.inputs.iter_rows().chain(app.outputs.iter_rows()) {
            assert!((row.iter().sum::<f64>() - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn output_posterior_marginalizes_inputs() {
        // Differential code: output symbol equals the next state, so output
        // APPs are state APPs and must agree with alpha * beta at t + 1.
        let fsm = TableFsm::from_fn(2, 2, 2, |s, x| (s ^ x, s ^ x)).unwrap();
        let lik = likelihoods(4, 2, 5);
        let mut bcjr = Bcjr::<f64>::new(&fsm, 4, BcjrConfig::default());
        let app = bcjr.decode(&lik, None).unwrap();
        let alpha = bcjr.forward_metrics();
        let beta = bcjr.backward_metrics();
        for t in 0..4 {
            let joint: Vec<f64> = (0..2).map(|s| alpha[(t + 1, s)] * beta[(t + 1, s)]).collect();
            let total: f64 = joint.iter().sum();
            for s in 0..2 {
                assert!((app.outputs[(t, s)] - joint[s] / total).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn hard_prior_forces_decision() {
        let code = Rscc::new(0o7, &[0o5]).unwrap();
        let lik = Table::new(3, 4, 0.25);
        let prior = Table::from_rows(vec![vec![0.0, 1.0], vec![1.0, 0.0], vec![0.0, 1.0]]).unwrap();
        let app = decode::<f64>(&code, &lik, Some(&prior), BcjrConfig::default());
        assert_eq!(app.hard_decisions(), vec![1, 0, 1]);
        assert_eq!(app.inputs[(0, 1)], 1.0);
        assert!(app.inputs.as_slice().iter().all(|p| p.is_finite()));
    }

    #[test]
    fn vanishing_step_is_infeasible() {
        let fsm = TableFsm::from_fn(2, 2, 2, |s, x| (s ^ x, s ^ x)).unwrap();
        let mut lik = Table::new(5, 2, 0.5);
        lik.row_mut(2).fill(0.0);
        let mut bcjr = Bcjr::<f64>::new(&fsm, 5, BcjrConfig::default());
        assert_eq!(
            bcjr.decode(&lik, None),
            Err(DecodeError::Infeasible {
                pass: Pass::Forward,
                timestep: 3
            })
        );
    }

    #[test]
    fn contradictory_termination_is_infeasible() {
        // The differential code ends in the state equal to the last output;
        // forbidding output 0 at the last step makes ending in 0 impossible.
        let fsm = TableFsm::from_fn(2, 2, 2, |s, x| (s ^ x, s ^ x)).unwrap();
        let mut lik = Table::new(3, 2, 0.5);
        lik[(2, 0)] = 0.0;
        let mut bcjr = Bcjr::<LogReal>::new(&fsm, 3, BcjrConfig::new(Termination::zero_terminated()));
        assert_eq!(
            bcjr.decode(&lik, None),
            Err(DecodeError::Infeasible {
                pass: Pass::Backward,
                timestep: 2
            })
        );
    }

    #[test]
    fn plain_linear_arithmetic_underflows_on_long_blocks() {
        let code = Rscc::new(0o7, &[0o5]).unwrap();
        let lik = Table::new(2000, 4, 0.01);
        let plain = BcjrConfig::default().with_normalization(Normalization::Never);
        let mut bcjr = Bcjr::<f64>::new(&code, 2000, plain);
        assert!(matches!(
            bcjr.decode(&lik, None),
            Err(DecodeError::Infeasible {
                pass: Pass::Forward,
                ..
            })
        ));
        let mut log = Bcjr::<LogReal>::new(&code, 2000, plain);
        assert!(log.decode(&lik, None).is_ok());
        let mut normalized = Bcjr::<f64>::new(&code, 2000, BcjrConfig::default());
        assert!(normalized.decode(&lik, None).is_ok());
    }

    #[test]
    fn plain_linear_arithmetic_overflows_on_dense_likelihoods() {
        // Every state spreads mass 4 along both edges, so row k holds
        // 2^(3k - 1) per state and row 342 is the first to leave f64 range.
        let fsm = TableFsm::from_fn(2, 2, 2, |s, x| (s ^ x, s ^ x)).unwrap();
        let lik = Table::new(400, 2, 4.0);
        let plain = BcjrConfig::default().with_normalization(Normalization::Never);
        let mut bcjr = Bcjr::<f64>::new(&fsm, 400, plain);
        assert_eq!(
            bcjr.decode(&lik, None),
            Err(DecodeError::Infeasible {
                pass: Pass::Forward,
                timestep: 342
            })
        );

        let mut log = Bcjr::<LogReal>::new(&fsm, 400, plain);
        let app = log.decode(&lik, None).unwrap();
        assert!(app.inputs.as_slice().iter().all(|p| p.is_finite()));
        let mut normalized = Bcjr::<f64>::new(&fsm, 400, BcjrConfig::default());
        let app = normalized.decode(&lik, None).unwrap();
        assert!(app.inputs.iter_rows().all(|row| (row[0] + row[1] - 1.0).abs() < 1e-9));
    }

    #[test]
    fn forward_metrics_start_at_boundary() {
        let code = Rscc::new(0o7, &[0o5]).unwrap();
        let lik = likelihoods(4, 4, 1);
        let mut bcjr = Bcjr::<f64>::new(&code, 4, BcjrConfig::new(Termination::zero_terminated()));
        bcjr.decode(&lik, None).unwrap();
        let alpha = bcjr.forward_metrics();
        let beta = bcjr.backward_metrics();
        assert_eq!(alpha.shape(), (5, 4));
        assert_eq!(alpha.row(0), &[1.0, 0.0, 0.0, 0.0]);
        assert_eq!(beta.row(4), &[1.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn normalization_follows_policy() {
        let code = Rscc::new(0o7, &[0o5]).unwrap();
        let linear = Bcjr::<f64>::new(&code, 4, BcjrConfig::default());
        assert!(linear.normalizes());
        assert_eq!(linear.trellis().num_states(), 4);
        assert_eq!(linear.trellis().num_outputs(), 4);
        assert!(!Bcjr::<LogReal>::new(&code, 4, BcjrConfig::default()).normalizes());
        let forced = BcjrConfig::default().with_normalization(Normalization::Always);
        assert!(Bcjr::<LogReal>::new(&code, 4, forced).normalizes());
    }

    #[test]
    fn scratch_is_reused_across_calls() {
        let code = Rscc::new(0o7, &[0o5]).unwrap();
        let mut bcjr = Bcjr::<f64>::new(&code, 6, BcjrConfig::default());
        let first = bcjr.decode(&likelihoods(6, 4, 2), None).unwrap();
        bcjr.decode(&likelihoods(6, 4, 9), None).unwrap();
        let again = bcjr.decode(&likelihoods(6, 4, 2), None).unwrap();
        assert_eq!(first, again);
    }

    #[test]
    #[should_panic(expected = "likelihood table has 3 rows")]
    fn wrong_block_length_panics() {
        let code = Rscc::new(0o7, &[0o5]).unwrap();
        let mut bcjr = Bcjr::<f64>::new(&code, 4, BcjrConfig::default());
        let _ = bcjr.decode(&Table::new(3, 4, 1.0), None);
    }

    #[test]
    #[should_panic(expected = "boundary state 9 out of range")]
    fn bad_boundary_state_panics() {
        let code = Rscc::new(0o7, &[0o5]).unwrap();
        let config = BcjrConfig::new(Termination::Open {
            start: Boundary::State(9),
            end: Boundary::Uniform,
        });
        Bcjr::<f64>::new(&code, 4, config);
    }
}
