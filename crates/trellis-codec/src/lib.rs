//! Convolutional codecs on top of the BCJR engine.
//!
//! [`ConvCodec`] pairs an FSM-driven encoder with a [`trellis_bcjr::Bcjr`]
//! decoder for the same trellis and takes care of block termination
//! (unterminated, zero-tailed or tail-biting). The [`channel`] module is the
//! boundary to the channel model: it turns received samples into the
//! per-symbol likelihood tables the decoder consumes.
//!
//! ```
//! use trellis_codec::channel::{Awgn, modulate, symbol_likelihoods};
//! use trellis_codec::{ConvCodec, TailMode, symbols_to_bits};
//! use trellis_fsm::Rscc;
//!
//! let code = Rscc::new(0o7, &[0o5]).unwrap();
//! let mut codec = ConvCodec::<_, f64>::new(code, 8, TailMode::ZeroTail).unwrap();
//! let source = [1, 0, 1, 1, 0, 0, 1, 0];
//! let encoded = codec.encode(&source).unwrap();
//!
//! // A clean channel observation at 6 dB.
//! let rx = modulate(&symbols_to_bits(&encoded, 2));
//! codec.init_decoder(&symbol_likelihoods(&Awgn::new(6.0), &rx, 2));
//! assert_eq!(codec.decode().unwrap().symbols, source.to_vec());
//! ```
//!
//! # Architecture
//!
//! - [`channel`] -- Channel likelihood models and antipodal mapping
//! - [`codec`] -- Block encoder/decoder with tail handling

pub mod channel;
pub mod codec;

pub use codec::{ConvCodec, Decoded, TailMode, symbols_to_bits};

use trellis_bcjr::DecodeError;
use trellis_fsm::FsmError;

/// Error type for codec construction, encoding and decoding.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    #[error(transparent)]
    Fsm(#[from] FsmError),
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error("zero-tail termination needs a machine that can be flushed to state 0")]
    Unflushable,
    #[error("tail-biting needs a circular encoder; use ConvCodec::tail_biting")]
    NeedsCircular,
    #[error("unknown tail mode '{0}' (expected none, zero or biting)")]
    UnknownTailMode(String),
}
