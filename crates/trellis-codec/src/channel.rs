// Channel likelihood models and the antipodal bit mapping.
// Origin: channel.cpp, channel/laplacian.h
//
// Channels here only answer "how likely is this observation given that
// symbol was sent"; generating noise is left to the caller.

use std::f64::consts::PI;

use trellis_core::Table;

/// Energy per bit of the antipodal constellation.
pub const EB: f64 = 1.0;

/// One-sided noise spectral density for a signal-to-noise ratio in dB
/// (`No = 0.5 * 10^(-snr_db / 10)`, with `Eb = 1`).
pub fn spectral_density(snr_db: f64) -> f64 {
    0.5 * 10f64.powf(-snr_db / 10.0)
}

/// A memoryless channel over real-valued signal points.
pub trait Channel {
    /// Set the signal-to-noise ratio in dB and derive the noise scale.
    fn set_parameter(&mut self, snr_db: f64);

    /// The signal-to-noise ratio in dB.
    fn parameter(&self) -> f64;

    /// Probability density of receiving `rx` when `tx` was sent.
    fn pdf(&self, tx: f64, rx: f64) -> f64;

    /// `rx.len() x candidates.len()` table of `pdf(candidate, rx[t])`.
    fn likelihoods(&self, candidates: &[f64], rx: &[f64]) -> Table<f64> {
        let mut table = Table::new(rx.len(), candidates.len(), 0.0);
        for (t, &r) in rx.iter().enumerate() {
            for (dst, &tx) in table.row_mut(t).iter_mut().zip(candidates) {
                *dst = self.pdf(tx, r);
            }
        }
        table
    }
}

/// Additive white Gaussian noise.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Awgn {
    snr_db: f64,
    sigma: f64,
}

impl Awgn {
    pub fn new(snr_db: f64) -> Self {
        let mut channel = Self {
            snr_db,
            sigma: 0.0,
        };
        channel.set_parameter(snr_db);
        channel
    }

    /// Noise standard deviation.
    pub fn sigma(&self) -> f64 {
        self.sigma
    }
}

impl Channel for Awgn {
    fn set_parameter(&mut self, snr_db: f64) {
        self.snr_db = snr_db;
        self.sigma = (EB * spectral_density(snr_db)).sqrt();
    }

    fn parameter(&self) -> f64 {
        self.snr_db
    }

    fn pdf(&self, tx: f64, rx: f64) -> f64 {
        let x = (rx - tx) / self.sigma;
        (-0.5 * x * x).exp() / ((2.0 * PI).sqrt() * self.sigma)
    }
}

/// Additive Laplacian noise.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Laplacian {
    snr_db: f64,
    lambda: f64,
}

impl Laplacian {
    pub fn new(snr_db: f64) -> Self {
        let mut channel = Self {
            snr_db,
            lambda: 0.0,
        };
        channel.set_parameter(snr_db);
        channel
    }

    /// Scale parameter of the noise density.
    pub fn lambda(&self) -> f64 {
        self.lambda
    }
}

impl Channel for Laplacian {
    fn set_parameter(&mut self, snr_db: f64) {
        self.snr_db = snr_db;
        self.lambda = (EB * spectral_density(snr_db) / 2.0).sqrt();
    }

    fn parameter(&self) -> f64 {
        self.snr_db
    }

    fn pdf(&self, tx: f64, rx: f64) -> f64 {
        (-(rx - tx).abs() / self.lambda).exp() / (2.0 * self.lambda)
    }
}

/// A channel that delivers every symbol intact.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Noiseless;

impl Channel for Noiseless {
    fn set_parameter(&mut self, _snr_db: f64) {}

    fn parameter(&self) -> f64 {
        f64::INFINITY
    }

    fn pdf(&self, tx: f64, rx: f64) -> f64 {
        if tx == rx { 1.0 } else { 0.0 }
    }
}

/// Antipodal signal point of a bit: 0 maps to `+1`, 1 maps to `-1`.
#[inline]
pub fn antipodal(bit: usize) -> f64 {
    if bit == 0 { 1.0 } else { -1.0 }
}

/// Map a bit stream to antipodal signal points.
pub fn modulate(bits: &[usize]) -> Vec<f64> {
    bits.iter().map(|&b| antipodal(b)).collect()
}

/// Per-symbol likelihood table from per-bit observations.
///
/// Every `bits_per_symbol` consecutive samples of `rx` carry one symbol,
/// least significant bit first. Entry `[t][x]` is the product over the bits
/// `j` of `pdf(antipodal(bit j of x), rx[t * n + j])`.
///
/// # Panics
///
/// Panics if `bits_per_symbol` is zero or does not divide `rx.len()`.
pub fn symbol_likelihoods<C: Channel + ?Sized>(
    channel: &C,
    rx: &[f64],
    bits_per_symbol: usize,
) -> Table<f64> {
    assert!(bits_per_symbol > 0, "symbols need at least one bit");
    assert!(
        rx.len() % bits_per_symbol == 0,
        "{} received samples do not split into {bits_per_symbol}-bit symbols",
        rx.len()
    );
    let n = bits_per_symbol;
    let bit_lik = channel.likelihoods(&[antipodal(0), antipodal(1)], rx);
    let tau = rx.len() / n;
    let mut table = Table::new(tau, 1 << n, 1.0);
    for t in 0..tau {
        for (x, dst) in table.row_mut(t).iter_mut().enumerate() {
            for j in 0..n {
                *dst *= bit_lik[(t * n + j, (x >> j) & 1)];
            }
        }
    }
    table
}
