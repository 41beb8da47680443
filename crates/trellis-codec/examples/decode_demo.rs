// Encode a block, pass it through a noisy antipodal channel and decode it
// with every arithmetic policy, printing bit errors and the confidence of
// the first few decisions.
//
// Run:
//   cargo run -p trellis-codec --example decode_demo
//   TRELLIS_DEMO_SNR=0.5 cargo run -p trellis-codec --example decode_demo

use trellis_codec::channel::{Awgn, modulate, symbol_likelihoods};
use trellis_codec::{CodecError, ConvCodec, TailMode, symbols_to_bits};
use trellis_core::{LogReal, LogRealFast, Real, Table};
use trellis_fsm::Rscc;

const BLOCK: usize = 64;

/// xorshift64 stream: bits and unit-variance Gaussian samples.
struct Noise(u64);

impl Noise {
    fn unit(&mut self) -> f64 {
        self.0 ^= self.0 << 13;
        self.0 ^= self.0 >> 7;
        self.0 ^= self.0 << 17;
        ((self.0 >> 11) as f64 + 0.5) / (1u64 << 53) as f64
    }

    fn gaussian(&mut self) -> f64 {
        let (u, v) = (self.unit(), self.unit());
        (-2.0 * u.ln()).sqrt() * (2.0 * std::f64::consts::PI * v).cos()
    }
}

fn decode<R: Real>(lik: &Table<f64>, source: &[usize]) -> Result<(), CodecError> {
    let code = Rscc::new(0o7, &[0o5])?;
    let mut codec = ConvCodec::<_, R>::new(code, BLOCK, TailMode::ZeroTail)?;
    codec.init_decoder(lik);
    let decoded = codec.decode()?;
    let errors = decoded
        .symbols
        .iter()
        .zip(source)
        .filter(|(a, b)| a != b)
        .count();
    let confidence: Vec<String> = (0..4)
        .map(|t| format!("{:.4}", decoded.posterior[(t, decoded.symbols[t])]))
        .collect();
    println!(
        "{:<12} {errors:>3} bit errors, first decisions at p = [{}]",
        R::NAME,
        confidence.join(", ")
    );
    Ok(())
}

fn main() -> Result<(), CodecError> {
    let snr_db: f64 = std::env::var("TRELLIS_DEMO_SNR")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(1.5);

    let mut noise = Noise(0x2545_f491_4f6c_dd1d);
    let source: Vec<usize> = (0..BLOCK).map(|_| usize::from(noise.unit() < 0.5)).collect();

    let mut codec = ConvCodec::<_, f64>::new(Rscc::new(0o7, &[0o5])?, BLOCK, TailMode::ZeroTail)?;
    println!("{codec}");
    let encoded = codec.encode(&source)?;

    let channel = Awgn::new(snr_db);
    let rx: Vec<f64> = modulate(&symbols_to_bits(&encoded, 2))
        .into_iter()
        .map(|x| x + channel.sigma() * noise.gaussian())
        .collect();
    let lik = symbol_likelihoods(&channel, &rx, 2);
    println!("Eb/No = {snr_db} dB, sigma = {:.4}", channel.sigma());

    decode::<f64>(&lik, &source)?;
    decode::<f32>(&lik, &source)?;
    decode::<LogReal>(&lik, &source)?;
    decode::<LogRealFast>(&lik, &source)?;
    Ok(())
}
