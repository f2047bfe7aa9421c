//! Human-readable access code tokens.

use rand::Rng;

/// Alphabet the token characters are drawn from.
const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Number of characters in a token, not counting separators.
const CODE_LEN: usize = 9;

/// Generate a token shaped like `XXX-XXX-XXX`.
///
/// Each character is an independent uniform pick; this is not suitable
/// for anything security sensitive.
pub fn generate_code() -> String {
    let mut rng = rand::thread_rng();
    let mut out = String::with_capacity(CODE_LEN + 2);
    for i in 0..CODE_LEN {
        if i == 3 || i == 6 {
            out.push('-');
        }
        let idx = rng.gen_range(0..CHARSET.len());
        out.push(CHARSET[idx] as char);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use regex::Regex;

    #[test]
    fn test_generate_code_shape() {
        let re = Regex::new(r"^[A-Z0-9]{3}-[A-Z0-9]{3}-[A-Z0-9]{3}$").unwrap();
        for _ in 0..500 {
            let code = generate_code();
            assert!(re.is_match(&code), "unexpected code {code}");
        }
    }

    #[test]
    fn test_generate_code_varies() {
        // 500 draws from 36^9 values colliding into one is not a real outcome.
        let first = generate_code();
        assert!((0..500).any(|_| generate_code() != first));
    }
}
