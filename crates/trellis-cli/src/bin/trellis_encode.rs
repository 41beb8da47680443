// trellis-encode: Convolutionally encode bits from stdin.
//
// Reads a stream of 0/1 characters from stdin (whitespace ignored), splits it
// into blocks and prints the channel bits of each encoded block on its own
// line. Output symbols are written least significant bit first.
//
// Usage:
//   trellis-encode [OPTIONS] < bits.txt
//
// Options:
//   -g, --generators LIST   Octal generators, feedback first (default: 7,5)
//   --feedforward           Non-recursive code; all generators are feedforward
//   -n, --block-length N    Input bits per block (default: whole input)
//   --tail MODE             none, zero or biting (default: zero)
//   -h, --help              Print help

use std::io::{self, Write};

use trellis_codec::symbols_to_bits;

fn main() {
    trellis_cli::init_logging();
    let args: Vec<String> = std::env::args().skip(1).collect();

    if trellis_cli::wants_help(&args) {
        println!("trellis-encode: Convolutionally encode bits from stdin.");
        println!();
        println!("Usage: trellis-encode [OPTIONS] < bits.txt");
        println!();
        println!("Prints one line of channel bits per input block.");
        println!();
        println!("Options:");
        println!("  -g, --generators LIST   Octal generators, feedback first (default: 7,5)");
        println!("  --feedforward           Non-recursive code; all generators are feedforward");
        println!("  -n, --block-length N    Input bits per block (default: whole input)");
        println!("  --tail MODE             none, zero or biting (default: zero)");
        println!("  -h, --help              Print this help");
        return;
    }

    let (options, rest) =
        trellis_cli::parse_code_options(&args).unwrap_or_else(|e| trellis_cli::fatal(&e));
    if let Some(arg) = rest.first() {
        trellis_cli::fatal(&format!("unexpected argument '{arg}'"));
    }

    let bits = trellis_cli::read_bits(io::stdin().lock()).unwrap_or_else(|e| trellis_cli::fatal(&e));
    if bits.is_empty() {
        trellis_cli::fatal("no input bits");
    }
    let block_length = options.block_length.unwrap_or(bits.len());
    if bits.len() % block_length != 0 {
        trellis_cli::fatal(&format!(
            "{} input bits do not fill blocks of {block_length}",
            bits.len()
        ));
    }

    let encoder = options
        .build_encoder()
        .unwrap_or_else(|e| trellis_cli::fatal(&e));
    let output_bits = encoder.output_bits;
    let mut codec = encoder
        .into_codec::<f64>(block_length, options.tail)
        .unwrap_or_else(|e| trellis_cli::fatal(&e));

    let stdout = io::stdout();
    let mut out = io::BufWriter::new(stdout.lock());
    for block in bits.chunks(block_length) {
        let symbols = codec
            .encode(block)
            .unwrap_or_else(|e| trellis_cli::fatal(&e.to_string()));
        let _ = writeln!(
            out,
            "{}",
            trellis_cli::format_bits(&symbols_to_bits(&symbols, output_bits))
        );
    }
}
