// trellis-decode: BCJR-decode soft channel samples from stdin.
//
// Reads whitespace-separated received values (antipodal: bit 0 sent as +1,
// bit 1 as -1, plus noise) and prints the decoded data bits of each block on
// its own line. With --json, prints one JSON object per block carrying the
// decisions and the input-symbol posteriors instead.
//
// Usage:
//   trellis-decode [OPTIONS] < samples.txt
//
// Options:
//   -g, --generators LIST   Octal generators, feedback first (default: 7,5)
//   --feedforward           Non-recursive code; all generators are feedforward
//   -n, --block-length N    Input bits per block (default: whole input)
//   --tail MODE             none, zero or biting (default: zero)
//   --policy NAME           f64, f32, logreal or logrealfast (default: f64)
//   --snr DB                Channel Eb/No in dB (default: 0)
//   --laplacian             Laplacian rather than Gaussian noise model
//   --json                  Print soft output as JSON lines
//   -h, --help              Print help

use std::io::{self, Write};

use trellis_cli::{Encoder, Policy};
use trellis_codec::TailMode;
use trellis_codec::channel::{Awgn, Channel, Laplacian, symbol_likelihoods};
use trellis_core::{LogReal, LogRealFast, Real};

struct Blocks<'a> {
    samples: &'a [f64],
    block_length: usize,
    tail: TailMode,
    output_bits: usize,
    json: bool,
}

fn run<R: Real>(encoder: Encoder, blocks: &Blocks<'_>, channel: &dyn Channel) -> Result<(), String> {
    let output_bits = blocks.output_bits;
    let mut codec = encoder.into_codec::<R>(blocks.block_length, blocks.tail)?;
    let block_samples = codec.trellis_length() * output_bits;

    let stdout = io::stdout();
    let mut out = io::BufWriter::new(stdout.lock());
    for (k, rx) in blocks.samples.chunks(block_samples).enumerate() {
        codec.init_decoder(&symbol_likelihoods(channel, rx, output_bits));
        let decoded = codec.decode().map_err(|e| format!("block {k}: {e}"))?;
        let line = if blocks.json {
            let posterior: Vec<Vec<f64>> = decoded
                .posterior
                .iter_rows()
                .map(|row| row.to_vec())
                .collect();
            serde_json::json!({
                "block": k,
                "bits": decoded.symbols,
                "posterior": posterior,
            })
            .to_string()
        } else {
            trellis_cli::format_bits(&decoded.symbols)
        };
        writeln!(out, "{line}").map_err(|e| format!("failed to write output: {e}"))?;
    }
    Ok(())
}

fn main() {
    trellis_cli::init_logging();
    let args: Vec<String> = std::env::args().skip(1).collect();

    if trellis_cli::wants_help(&args) {
        println!("trellis-decode: BCJR-decode soft channel samples from stdin.");
        println!();
        println!("Usage: trellis-decode [OPTIONS] < samples.txt");
        println!();
        println!("Samples are antipodal (+1 for bit 0, -1 for bit 1) plus noise.");
        println!("Prints one line of decoded bits per block.");
        println!();
        println!("Options:");
        println!("  -g, --generators LIST   Octal generators, feedback first (default: 7,5)");
        println!("  --feedforward           Non-recursive code; all generators are feedforward");
        println!("  -n, --block-length N    Input bits per block (default: whole input)");
        println!("  --tail MODE             none, zero or biting (default: zero)");
        println!("  --policy NAME           f64, f32, logreal or logrealfast (default: f64)");
        println!("  --snr DB                Channel Eb/No in dB (default: 0)");
        println!("  --laplacian             Laplacian rather than Gaussian noise model");
        println!("  --json                  Print soft output as JSON lines");
        println!("  -h, --help              Print this help");
        return;
    }

    let (options, rest) =
        trellis_cli::parse_code_options(&args).unwrap_or_else(|e| trellis_cli::fatal(&e));

    let decode_options =
        trellis_cli::parse_decode_options(&rest).unwrap_or_else(|e| trellis_cli::fatal(&e));

    let samples =
        trellis_cli::read_samples(io::stdin().lock()).unwrap_or_else(|e| trellis_cli::fatal(&e));
    let encoder = options
        .build_encoder()
        .unwrap_or_else(|e| trellis_cli::fatal(&e));
    let output_bits = encoder.output_bits;
    let tail_steps = encoder
        .tail_steps(options.tail)
        .unwrap_or_else(|e| trellis_cli::fatal(&e));

    if samples.is_empty() || samples.len() % output_bits != 0 {
        trellis_cli::fatal(&format!(
            "{} samples do not form whole {output_bits}-bit symbols",
            samples.len()
        ));
    }
    let steps = samples.len() / output_bits;
    let block_length = match options.block_length {
        Some(n) => n,
        None if steps > tail_steps => steps - tail_steps,
        None => trellis_cli::fatal(&format!("{steps} symbols are too few for a {tail_steps}-step tail")),
    };
    if steps % (block_length + tail_steps) != 0 {
        trellis_cli::fatal(&format!(
            "{steps} symbols do not fill blocks of {block_length} + {tail_steps} tail steps"
        ));
    }

    let channel: Box<dyn Channel> = if decode_options.laplacian {
        Box::new(Laplacian::new(decode_options.snr_db))
    } else {
        Box::new(Awgn::new(decode_options.snr_db))
    };
    let blocks = Blocks {
        samples: &samples,
        block_length,
        tail: options.tail,
        output_bits,
        json: decode_options.json,
    };

    let result = match decode_options.policy {
        Policy::F64 => run::<f64>(encoder, &blocks, channel.as_ref()),
        Policy::F32 => run::<f32>(encoder, &blocks, channel.as_ref()),
        Policy::LogReal => run::<LogReal>(encoder, &blocks, channel.as_ref()),
        Policy::LogRealFast => run::<LogRealFast>(encoder, &blocks, channel.as_ref()),
    };
    if let Err(e) = result {
        trellis_cli::fatal(&e);
    }
}
