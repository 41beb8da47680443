// Generator polynomial helpers.
//
// Polynomials are written in the usual octal notation: the most significant
// set bit is the tap on the current register input, lower bits are taps on
// progressively older register contents. 0o13 = 1011b has constraint
// length 4 and memory 3.

use crate::FsmError;

/// Parse one octal generator, e.g. `"13"` or `"0o13"`.
pub fn parse_octal(text: &str) -> Result<u32, FsmError> {
    let digits = text.trim();
    let digits = digits.strip_prefix("0o").unwrap_or(digits);
    if digits.is_empty() {
        return Err(FsmError::InvalidGenerator("empty generator".to_string()));
    }
    u32::from_str_radix(digits, 8)
        .map_err(|e| FsmError::InvalidGenerator(format!("{text:?} is not octal: {e}")))
}

/// Parse a comma-separated list of octal generators, e.g. `"7,5"`.
pub fn parse_generators(text: &str) -> Result<Vec<u32>, FsmError> {
    text.split(',').map(parse_octal).collect()
}

/// Polynomial degree (memory contributed by this generator); `None` for 0.
#[inline]
pub fn degree(poly: u32) -> Option<usize> {
    if poly == 0 {
        None
    } else {
        Some((u32::BITS - 1 - poly.leading_zeros()) as usize)
    }
}

/// Modulo-2 sum of the bits of `x`.
#[inline]
pub fn parity(x: usize) -> usize {
    (x.count_ones() & 1) as usize
}

/// Format generators in octal for descriptions, e.g. `[7, 5]`.
pub fn format_octal(polys: &[u32]) -> String {
    let parts: Vec<String> = polys.iter().map(|p| format!("{p:o}")).collect();
    format!("[{}]", parts.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_plain_and_prefixed() {
        assert_eq!(parse_octal("7").unwrap(), 7);
        assert_eq!(parse_octal("13").unwrap(), 0b1011);
        assert_eq!(parse_octal("0o15").unwrap(), 13);
        assert_eq!(parse_octal(" 5 ").unwrap(), 5);
    }

    #[test]
    fn parse_rejects_non_octal() {
        assert!(matches!(parse_octal("8"), Err(FsmError::InvalidGenerator(_))));
        assert!(matches!(parse_octal(""), Err(FsmError::InvalidGenerator(_))));
    }

    #[test]
    fn parse_list() {
        assert_eq!(parse_generators("7,5").unwrap(), vec![7, 5]);
        assert_eq!(parse_generators("13, 15, 17").unwrap(), vec![11, 13, 15]);
        assert!(parse_generators("7,,5").is_err());
    }

    #[test]
    fn degree_of_generators() {
        assert_eq!(degree(0), None);
        assert_eq!(degree(1), Some(0));
        assert_eq!(degree(0o7), Some(2));
        assert_eq!(degree(0o13), Some(3));
    }

    #[test]
    fn parity_counts_bits() {
        assert_eq!(parity(0), 0);
        assert_eq!(parity(0b1011), 1);
        assert_eq!(parity(0b1001), 0);
    }

    #[test]
    fn octal_description() {
        assert_eq!(format_octal(&[0o13, 0o15]), "[13, 15]");
    }
}
