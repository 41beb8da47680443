// Boundary distributions for tail-biting (circular) trellises.
//
// The block operator M = Gamma_0 Gamma_1 ... Gamma_{tau-1} maps a start-state
// distribution to the end-state distribution. For a tail-biting block the
// forward recursion starts from the left stationary vector of M and the
// backward recursion from the right one.

use tracing::{debug, warn};
use trellis_core::{Real, Table, real};

use crate::metrics::BranchMetrics;
use crate::trellis::Trellis;
use crate::{DecodeError, Pass};

/// Convergence threshold on the largest per-state change, in probability.
pub const TOLERANCE: f64 = 1e-12;

/// Power-iteration cap.
pub const MAX_ITERATIONS: usize = 1000;

/// Form the `S x S` block operator from per-step transition matrices.
///
/// With `normalize` set, the partial product is rescaled to unit total mass
/// after every step.
pub fn block_operator<R: Real>(
    trellis: &Trellis,
    gamma: &BranchMetrics<R>,
    normalize: bool,
) -> Result<Table<R>, DecodeError> {
    let n = trellis.num_states();
    let q_in = trellis.num_inputs();
    let mut m = Table::new(n, n, R::zero());
    for s in 0..n {
        m[(s, s)] = R::one();
    }
    let mut next = Table::new(n, n, R::zero());
    for t in 0..gamma.block_length() {
        let g = gamma.step(t);
        next.fill(R::zero());
        for r in 0..n {
            let src = m.row(r);
            let dst = next.row_mut(r);
            for (s, &mass) in src.iter().enumerate() {
                if mass.is_zero() {
                    continue;
                }
                for i in 0..q_in {
                    let w = g[s * q_in + i];
                    if !w.is_zero() {
                        dst[trellis.next(s, i)] += mass * w;
                    }
                }
            }
        }
        std::mem::swap(&mut m, &mut next);
        let total = real::sum(m.as_slice());
        if total.is_zero() || !total.is_finite() {
            return Err(DecodeError::Infeasible {
                pass: Pass::Circular,
                timestep: t + 1,
            });
        }
        if normalize {
            for r in 0..n {
                for v in m.row_mut(r) {
                    *v = *v / total;
                }
            }
        }
    }
    Ok(m)
}

/// Left stationary vector `v = v M` (normalized), by power iteration from
/// the uniform vector.
pub fn left_stationary<R: Real>(m: &Table<R>) -> Result<Vec<R>, DecodeError> {
    power_iteration(m, "left", |v, out| {
        out.fill(R::zero());
        for (r, &vr) in v.iter().enumerate() {
            if vr.is_zero() {
                continue;
            }
            for (dst, &x) in out.iter_mut().zip(m.row(r)) {
                *dst += vr * x;
            }
        }
    })
}

/// Right stationary vector `u = M u` (normalized), by power iteration from
/// the uniform vector.
pub fn right_stationary<R: Real>(m: &Table<R>) -> Result<Vec<R>, DecodeError> {
    power_iteration(m, "right", |u, out| {
        for (r, dst) in out.iter_mut().enumerate() {
            *dst = m
                .row(r)
                .iter()
                .zip(u)
                .fold(R::zero(), |acc, (&x, &ur)| acc + x * ur);
        }
    })
}

fn power_iteration<R: Real>(
    m: &Table<R>,
    side: &str,
    apply: impl Fn(&[R], &mut [R]),
) -> Result<Vec<R>, DecodeError> {
    let n = m.rows();
    assert_eq!(m.cols(), n, "block operator must be square");
    let mut v = vec![R::from_f64(1.0 / n as f64); n];
    let mut next = vec![R::zero(); n];
    for iteration in 1..=MAX_ITERATIONS {
        apply(&v, &mut next);
        if real::normalize(&mut next).is_none() {
            return Err(DecodeError::Infeasible {
                pass: Pass::Circular,
                timestep: 0,
            });
        }
        let delta = v
            .iter()
            .zip(&next)
            .map(|(a, b)| (a.to_f64() - b.to_f64()).abs())
            .fold(0.0, f64::max);
        std::mem::swap(&mut v, &mut next);
        if delta < TOLERANCE {
            debug!(side, iteration, "stationary vector converged");
            return Ok(v);
        }
    }
    warn!(
        side,
        iterations = MAX_ITERATIONS,
        "stationary vector did not converge; using last iterate"
    );
    Ok(v)
}
