// trellis-cli: shared utilities for CLI tools.

use std::fmt;
use std::io::Read;
use std::process;
use std::str::FromStr;

use tracing::debug;
use tracing_subscriber::EnvFilter;
use trellis_codec::{CodecError, ConvCodec, TailMode};
use trellis_core::Real;
use trellis_fsm::polynomial::parse_generators;
use trellis_fsm::{Circular, Fsm, Nrcc, Rscc};

/// Environment variable holding the log filter (e.g. `debug`,
/// `trellis_bcjr=trace`).
pub const LOG_ENV: &str = "TRELLIS_LOG";

/// Install a stderr `tracing` subscriber filtered by [`LOG_ENV`] (default
/// `warn`).
pub fn init_logging() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Arithmetic policy selected with `--policy`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Policy {
    F64,
    F32,
    LogReal,
    LogRealFast,
}

impl FromStr for Policy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "f64" => Ok(Policy::F64),
            "f32" => Ok(Policy::F32),
            "logreal" => Ok(Policy::LogReal),
            "logrealfast" => Ok(Policy::LogRealFast),
            other => Err(format!(
                "unknown policy '{other}' (expected f64, f32, logreal or logrealfast)"
            )),
        }
    }
}

/// Code options shared by the encoder and decoder tools.
#[derive(Debug, Clone, PartialEq)]
pub struct CodeOptions {
    /// Octal generators; for a recursive code the first is the feedback.
    pub generators: Vec<u32>,
    /// Build a feedforward code instead of an RSC code.
    pub feedforward: bool,
    /// Input symbols per block; `None` means the whole input is one block.
    pub block_length: Option<usize>,
    pub tail: TailMode,
}

impl Default for CodeOptions {
    fn default() -> Self {
        Self {
            generators: vec![0o7, 0o5],
            feedforward: false,
            block_length: None,
            tail: TailMode::ZeroTail,
        }
    }
}

/// An encoder chosen at runtime, with what the tools need to know about it.
pub struct Encoder {
    pub fsm: Box<dyn Circular>,
    /// Channel bits per trellis step.
    pub output_bits: usize,
    pub description: String,
}

impl fmt::Debug for Encoder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Encoder")
            .field("output_bits", &self.output_bits)
            .field("description", &self.description)
            .finish()
    }
}

impl Encoder {
    /// Trellis steps appended to every block under `tail`.
    pub fn tail_steps(&self, tail: TailMode) -> Result<usize, String> {
        match tail {
            TailMode::ZeroTail => self
                .fsm
                .memory()
                .ok_or_else(|| CodecError::Unflushable.to_string()),
            TailMode::Unterminated | TailMode::TailBiting => Ok(0),
        }
    }

    /// Wrap the encoder in a codec for blocks of `block_length` inputs.
    pub fn into_codec<R: Real>(
        self,
        block_length: usize,
        tail: TailMode,
    ) -> Result<ConvCodec<Box<dyn Circular>, R>, String> {
        match tail {
            TailMode::TailBiting => Ok(ConvCodec::tail_biting(self.fsm, block_length)),
            mode => ConvCodec::new(self.fsm, block_length, mode).map_err(|e| e.to_string()),
        }
    }
}

impl CodeOptions {
    /// Build the encoder FSM described by these options.
    pub fn build_encoder(&self) -> Result<Encoder, String> {
        let encoder = if self.feedforward {
            let code = Nrcc::new(&self.generators).map_err(|e| e.to_string())?;
            Encoder {
                output_bits: code.output_bits(),
                description: code.to_string(),
                fsm: Box::new(code),
            }
        } else {
            let code = Rscc::from_generators(&self.generators).map_err(|e| e.to_string())?;
            Encoder {
                output_bits: code.output_bits(),
                description: code.to_string(),
                fsm: Box::new(code),
            }
        };
        debug!(code = %encoder.description, tail = %self.tail, "built encoder");
        Ok(encoder)
    }
}

/// Split `--flag=value` into its parts; anything else is returned whole.
fn split_flag(arg: &str) -> (&str, Option<&str>) {
    match arg.split_once('=') {
        Some((flag, value)) if flag.starts_with("--") => (flag, Some(value)),
        _ => (arg, None),
    }
}

/// Parse the code options (`-g/--generators`, `--feedforward`, `-n`,
/// `--tail`) out of `args`.
///
/// Returns `(options, remaining_args)`.
pub fn parse_code_options(args: &[String]) -> Result<(CodeOptions, Vec<String>), String> {
    let mut options = CodeOptions::default();
    let mut remaining = Vec::new();
    let mut iter = args.iter();

    while let Some(arg) = iter.next() {
        let (flag, inline) = split_flag(arg);
        let mut value = |name: &str| -> Result<String, String> {
            inline
                .map(str::to_string)
                .or_else(|| iter.next().cloned())
                .ok_or_else(|| format!("{name} requires a value"))
        };
        match flag {
            "-g" | "--generators" => {
                options.generators =
                    parse_generators(&value(flag)?).map_err(|e| e.to_string())?;
            }
            "-n" | "--block-length" => {
                let v = value(flag)?;
                let n: usize = v
                    .parse()
                    .map_err(|_| format!("invalid block length '{v}'"))?;
                if n == 0 {
                    return Err("block length must be positive".to_string());
                }
                options.block_length = Some(n);
            }
            "--tail" => {
                options.tail = value(flag)?
                    .parse()
                    .map_err(|e: CodecError| e.to_string())?;
            }
            "--feedforward" => options.feedforward = true,
            _ => remaining.push(arg.clone()),
        }
    }

    Ok((options, remaining))
}

/// Options read by `trellis-decode` on top of the code options.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodeOptions {
    pub policy: Policy,
    /// Channel Eb/No in dB.
    pub snr_db: f64,
    /// Score samples with a Laplacian rather than a Gaussian density.
    pub laplacian: bool,
    pub json: bool,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            policy: Policy::F64,
            snr_db: 0.0,
            laplacian: false,
            json: false,
        }
    }
}

/// Parse `--policy`, `--snr`, `--laplacian` and `--json`. Any other
/// argument is an error, so call this on what [`parse_code_options`] left.
pub fn parse_decode_options(args: &[String]) -> Result<DecodeOptions, String> {
    let mut options = DecodeOptions::default();
    let mut iter = args.iter();

    while let Some(arg) = iter.next() {
        let (flag, inline) = split_flag(arg);
        let mut value = |name: &str| -> Result<String, String> {
            inline
                .map(str::to_string)
                .or_else(|| iter.next().cloned())
                .ok_or_else(|| format!("{name} requires a value"))
        };
        match flag {
            "--policy" => options.policy = value(flag)?.parse()?,
            "--snr" => {
                let v = value(flag)?;
                options.snr_db = v
                    .parse()
                    .map_err(|_| format!("invalid number for --snr: '{v}'"))?;
            }
            "--laplacian" => options.laplacian = true,
            "--json" => options.json = true,
            _ => return Err(format!("unexpected argument '{arg}'")),
        }
    }

    Ok(options)
}

/// Read a stream of `0`/`1` characters; whitespace is ignored.
pub fn read_bits(mut reader: impl Read) -> Result<Vec<usize>, String> {
    let mut text = String::new();
    reader
        .read_to_string(&mut text)
        .map_err(|e| format!("failed to read input: {e}"))?;
    text.chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| match c {
            '0' => Ok(0),
            '1' => Ok(1),
            other => Err(format!("invalid bit '{other}' in input")),
        })
        .collect()
}

/// Read whitespace-separated real samples.
pub fn read_samples(mut reader: impl Read) -> Result<Vec<f64>, String> {
    let mut text = String::new();
    reader
        .read_to_string(&mut text)
        .map_err(|e| format!("failed to read input: {e}"))?;
    text.split_whitespace()
        .map(|tok| {
            tok.parse::<f64>()
                .map_err(|_| format!("invalid sample '{tok}' in input"))
        })
        .collect()
}

/// Render bits as a `0`/`1` string.
pub fn format_bits(bits: &[usize]) -> String {
    bits.iter().map(|&b| if b == 0 { '0' } else { '1' }).collect()
}

/// Print an error message and exit with code 1.
pub fn fatal(msg: &str) -> ! {
    eprintln!("error: {msg}");
    process::exit(1);
}

/// Check if `--help` or `-h` is in the args.
pub fn wants_help(args: &[String]) -> bool {
    args.iter().any(|a| a == "--help" || a == "-h")
}
