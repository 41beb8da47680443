// Convolutional codec: encoder cursor plus a BCJR decoder for its trellis.

use std::fmt;
use std::str::FromStr;

use tracing::{debug, trace};
use trellis_bcjr::{Bcjr, BcjrConfig, DecodeError, Normalization, Termination};
use trellis_core::{Real, Table};
use trellis_fsm::{Circular, Fsm, FsmError};

use crate::CodecError;

/// How a block is terminated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "snake_case")
)]
pub enum TailMode {
    /// Start at 0, end wherever the data leaves the encoder.
    #[default]
    Unterminated,
    /// Append `memory()` tail steps that drive the encoder back to 0.
    ZeroTail,
    /// Start and end in the same (circulation) state.
    TailBiting,
}

impl fmt::Display for TailMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TailMode::Unterminated => "unterminated",
            TailMode::ZeroTail => "zero-tail",
            TailMode::TailBiting => "tail-biting",
        })
    }
}

impl FromStr for TailMode {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" | "unterminated" => Ok(TailMode::Unterminated),
            "zero" | "zero-tail" => Ok(TailMode::ZeroTail),
            "biting" | "tail-biting" | "circular" => Ok(TailMode::TailBiting),
            other => Err(CodecError::UnknownTailMode(other.to_string())),
        }
    }
}

/// Result of decoding one block.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Decoded {
    /// Most probable input symbol per data step.
    pub symbols: Vec<usize>,
    /// `block_length x q_in` input posteriors (data steps only).
    pub posterior: Table<f64>,
    /// `trellis_length x q_out` output posteriors (tail steps included).
    pub output_posterior: Table<f64>,
}

type CirculationFn<F> = fn(&mut F, usize, usize) -> Result<usize, FsmError>;

/// A convolutional code of fixed block length over an [`Fsm`], decoded with
/// BCJR in representation `R`.
///
/// Decoding is split in two so that iterative decoders can re-run the BCJR
/// pass with fresh a-priori information against the same channel
/// observations: [`ConvCodec::init_decoder`] once per block, then
/// [`ConvCodec::set_prior`] and [`ConvCodec::decode`] as often as needed.
#[derive(Debug, Clone)]
pub struct ConvCodec<F: Fsm, R: Real> {
    encoder: F,
    mode: TailMode,
    tau: usize,
    tail: usize,
    circulation: Option<CirculationFn<F>>,
    bcjr: Bcjr<R>,
    likelihoods: Option<Table<f64>>,
    prior: Option<Table<f64>>,
}

impl<F: Fsm, R: Real> ConvCodec<F, R> {
    /// Unterminated or zero-tailed codec for blocks of `tau` input symbols.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::NeedsCircular`] for [`TailMode::TailBiting`] (use
    /// [`ConvCodec::tail_biting`]) and [`CodecError::Unflushable`] for
    /// [`TailMode::ZeroTail`] on a machine that cannot be driven to state 0.
    ///
    /// # Panics
    ///
    /// Panics if `tau` is zero.
    pub fn new(encoder: F, tau: usize, mode: TailMode) -> Result<Self, CodecError> {
        let (tail, termination) = match mode {
            TailMode::Unterminated => (0, Termination::start_at_zero()),
            TailMode::ZeroTail => {
                let nu = encoder.memory().ok_or(CodecError::Unflushable)?;
                (nu, Termination::zero_terminated())
            }
            TailMode::TailBiting => return Err(CodecError::NeedsCircular),
        };
        Ok(Self::build(encoder, tau, mode, tail, termination, None))
    }

    fn build(
        encoder: F,
        tau: usize,
        mode: TailMode,
        tail: usize,
        termination: Termination,
        circulation: Option<CirculationFn<F>>,
    ) -> Self {
        assert!(tau > 0, "block length must be positive");
        let bcjr = Bcjr::new(&encoder, tau + tail, BcjrConfig::new(termination));
        debug!(%mode, block_length = tau, tail, policy = R::NAME, "built convolutional codec");
        Self {
            encoder,
            mode,
            tau,
            tail,
            circulation,
            bcjr,
            likelihoods: None,
            prior: None,
        }
    }

    /// Switch the decoder's normalization policy. Discards any cached
    /// observations.
    pub fn set_normalization(&mut self, normalization: Normalization) {
        let config = self.bcjr.config().with_normalization(normalization);
        self.bcjr = Bcjr::new(&self.encoder, self.trellis_length(), config);
        self.likelihoods = None;
    }

    pub fn encoder(&self) -> &F {
        &self.encoder
    }

    pub fn mode(&self) -> TailMode {
        self.mode
    }

    /// Input symbols per block.
    pub fn block_length(&self) -> usize {
        self.tau
    }

    /// Trellis steps per block (data plus tail).
    pub fn trellis_length(&self) -> usize {
        self.tau + self.tail
    }

    /// Channel bits carried by one output symbol, `log2(q_out)`.
    pub fn bits_per_output(&self) -> f64 {
        (self.encoder.num_outputs() as f64).log2()
    }

    /// Code rate in information bits per channel bit, tail overhead included.
    pub fn rate(&self) -> f64 {
        let info = self.tau as f64 * (self.encoder.num_inputs() as f64).log2();
        info / (self.trellis_length() as f64 * self.bits_per_output())
    }

    /// Encode one block, returning one output symbol per trellis step.
    ///
    /// # Errors
    ///
    /// For tail-biting codecs, returns the FSM error if the block has no
    /// circulation state.
    ///
    /// # Panics
    ///
    /// Panics if `source` does not hold exactly `block_length()` symbols.
    pub fn encode(&mut self, source: &[usize]) -> Result<Vec<usize>, CodecError> {
        assert_eq!(
            source.len(),
            self.tau,
            "source has {} symbols, block length is {}",
            source.len(),
            self.tau
        );
        self.encoder.reset(0);
        let mut encoded = match self.circulation {
            Some(reset_circular) => {
                self.encoder.encode(source);
                let zero_state = self.encoder.state();
                let start = reset_circular(&mut self.encoder, zero_state, self.tau)?;
                let encoded = self.encoder.encode(source);
                debug_assert_eq!(self.encoder.state(), start);
                encoded
            }
            None => self.encoder.encode(source),
        };
        for _ in 0..self.tail {
            let input = self.encoder.tail_input(self.encoder.state());
            encoded.push(self.encoder.step(input));
        }
        trace!(symbols = encoded.len(), end_state = self.encoder.state(), "encoded block");
        Ok(encoded)
    }

    /// Cache the `trellis_length() x q_out` channel likelihood table for the
    /// next block and drop any a-priori information.
    ///
    /// # Panics
    ///
    /// Panics on a shape mismatch.
    pub fn init_decoder(&mut self, likelihoods: &Table<f64>) {
        let expected = (self.trellis_length(), self.encoder.num_outputs());
        assert_eq!(
            likelihoods.shape(),
            expected,
            "likelihood table must be {} x {}",
            expected.0,
            expected.1
        );
        self.likelihoods = Some(likelihoods.clone());
        self.prior = None;
    }

    /// Set the `block_length() x q_in` a-priori input table. Tail steps get a
    /// uniform prior.
    ///
    /// # Panics
    ///
    /// Panics on a shape mismatch.
    pub fn set_prior(&mut self, prior: &Table<f64>) {
        let q_in = self.encoder.num_inputs();
        assert_eq!(
            prior.shape(),
            (self.tau, q_in),
            "a-priori table must be {} x {q_in}",
            self.tau
        );
        let full = self
            .prior
            .get_or_insert_with(|| Table::new(self.tau + self.tail, q_in, 1.0));
        for t in 0..self.tau {
            full.row_mut(t).copy_from_slice(prior.row(t));
        }
    }

    pub fn clear_prior(&mut self) {
        self.prior = None;
    }

    /// Run one BCJR pass over the cached observations.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::Infeasible`] if the observations and prior
    /// admit no path.
    ///
    /// # Panics
    ///
    /// Panics if [`ConvCodec::init_decoder`] has not been called.
    pub fn decode(&mut self) -> Result<Decoded, DecodeError> {
        let Some(likelihoods) = self.likelihoods.as_ref() else {
            panic!("decode called before init_decoder");
        };
        let app = self.bcjr.decode(likelihoods, self.prior.as_ref())?;
        let posterior = app.inputs.slice_rows(0, self.tau);
        let symbols = app.hard_decisions()[..self.tau].to_vec();
        Ok(Decoded {
            symbols,
            posterior,
            output_posterior: app.outputs,
        })
    }
}

impl<F: Circular, R: Real> ConvCodec<F, R> {
    /// Tail-biting codec: the encoder starts in the circulation state of each
    /// block and the decoder uses the circular trellis.
    pub fn tail_biting(encoder: F, tau: usize) -> Self {
        Self::build(
            encoder,
            tau,
            TailMode::TailBiting,
            0,
            Termination::Circular,
            Some(<F as Circular>::reset_circular),
        )
    }
}

impl<F: Fsm + fmt::Display, R: Real> fmt::Display for ConvCodec<F, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}, {} blocks of {} ({} arithmetic)",
            self.encoder,
            self.mode,
            self.tau,
            R::NAME
        )
    }
}

/// Expand output symbols into their bits, least significant first.
pub fn symbols_to_bits(symbols: &[usize], width: usize) -> Vec<usize> {
    symbols
        .iter()
        .flat_map(|&y| (0..width).map(move |j| (y >> j) & 1))
        .collect()
}
