// Branch metrics (gamma) for every edge at every timestep.

use trellis_core::{Real, Table};

use crate::trellis::Trellis;

/// Per-timestep branch metrics.
///
/// Row `t` holds `gamma_t(s, i)` at column `s * q_in + i`: the weight of
/// leaving state `s` with input `i` between time `t` and `t + 1`. A zero entry
/// marks an impossible transition.
#[derive(Debug, Clone, PartialEq)]
pub struct BranchMetrics<R> {
    table: Table<R>,
    num_inputs: usize,
}

impl<R: Real> Default for BranchMetrics<R> {
    fn default() -> Self {
        Self {
            table: Table::new(0, 0, R::zero()),
            num_inputs: 0,
        }
    }
}

impl<R: Real> BranchMetrics<R> {
    /// All-zero metrics for `tau` timesteps of `trellis`, to be filled with
    /// [`BranchMetrics::set`].
    pub fn new(trellis: &Trellis, tau: usize) -> Self {
        Self {
            table: Table::new(tau, trellis.num_edges(), R::zero()),
            num_inputs: trellis.num_inputs(),
        }
    }

    /// Metrics from a `tau x q_out` channel likelihood table and an optional
    /// `tau x q_in` a-priori input table.
    pub fn from_likelihoods(
        trellis: &Trellis,
        likelihoods: &Table<f64>,
        prior: Option<&Table<f64>>,
    ) -> Self {
        let mut metrics = Self::default();
        metrics.compute(trellis, likelihoods, prior);
        metrics
    }

    /// Recompute in place, reusing the allocation when the shape is unchanged.
    ///
    /// `gamma_t(s, i) = likelihoods[t][output(s, i)] * prior[t][i]`, with a
    /// uniform prior when none is given.
    ///
    /// # Panics
    ///
    /// Panics if the table shapes do not match the trellis, or if any entry is
    /// negative or NaN.
    pub fn compute(
        &mut self,
        trellis: &Trellis,
        likelihoods: &Table<f64>,
        prior: Option<&Table<f64>>,
    ) {
        let tau = likelihoods.rows();
        let q_in = trellis.num_inputs();
        assert_eq!(
            likelihoods.cols(),
            trellis.num_outputs(),
            "likelihood table has {} columns, trellis emits {} symbols",
            likelihoods.cols(),
            trellis.num_outputs()
        );
        if let Some(prior) = prior {
            assert_eq!(
                prior.shape(),
                (tau, q_in),
                "a-priori table must be {tau} x {q_in}"
            );
        }
        if self.table.shape() != (tau, trellis.num_edges()) {
            self.table.reset(tau, trellis.num_edges(), R::zero());
        }
        self.num_inputs = q_in;

        let mut lik = vec![R::zero(); trellis.num_outputs()];
        let mut app = vec![R::one(); q_in];
        for t in 0..tau {
            for (dst, &p) in lik.iter_mut().zip(likelihoods.row(t)) {
                assert!(p >= 0.0, "likelihood {p} at timestep {t} is not a probability");
                *dst = R::from_f64(p);
            }
            if let Some(prior) = prior {
                for (dst, &p) in app.iter_mut().zip(prior.row(t)) {
                    assert!(p >= 0.0, "a-priori value {p} at timestep {t} is not a probability");
                    *dst = R::from_f64(p);
                }
            }
            let row = self.table.row_mut(t);
            for s in 0..trellis.num_states() {
                for i in 0..q_in {
                    row[s * q_in + i] = lik[trellis.output(s, i)] * app[i];
                }
            }
        }
    }

    /// Number of timesteps.
    #[inline]
    pub fn block_length(&self) -> usize {
        self.table.rows()
    }

    /// Edges per timestep.
    #[inline]
    pub fn num_edges(&self) -> usize {
        self.table.cols()
    }

    /// All edge weights of timestep `t`.
    #[inline]
    pub fn step(&self, t: usize) -> &[R] {
        self.table.row(t)
    }

    #[inline]
    pub fn get(&self, t: usize, state: usize, input: usize) -> R {
        self.table[(t, state * self.num_inputs + input)]
    }

    #[inline]
    pub fn set(&mut self, t: usize, state: usize, input: usize, value: R) {
        self.table[(t, state * self.num_inputs + input)] = value;
    }
}
