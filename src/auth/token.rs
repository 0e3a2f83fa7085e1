use rand::rngs::OsRng;
use rand::{CryptoRng, RngCore};

use crate::error::AuthError;

/// Digits, lowercase, uppercase.
pub const TOKEN_ALPHABET: &[u8; 62] =
    b"0123456789abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

// Largest multiple of 62 that fits in a byte. Bytes at or above it are
// discarded so every symbol is equally likely.
const ACCEPT_BELOW: u8 = 248;

/// Length of every issued access token.
pub const TOKEN_LENGTH: usize = 64;

/// Generates an opaque token of exactly `length` characters from the OS CSPRNG.
pub fn generate_token(length: usize) -> Result<String, AuthError> {
    generate_token_with(&mut OsRng, length)
}

pub fn generate_token_with<R>(rng: &mut R, length: usize) -> Result<String, AuthError>
where
    R: RngCore + CryptoRng,
{
    let mut token = String::with_capacity(length);
    let mut buf = [0u8; 64];

    while token.len() < length {
        rng.try_fill_bytes(&mut buf)
            .map_err(|e| AuthError::RandomnessUnavailable(e.to_string()))?;

        for byte in buf.iter().copied().filter(|b| *b < ACCEPT_BELOW) {
            if token.len() == length {
                break;
            }
            token.push(TOKEN_ALPHABET[(byte % 62) as usize] as char);
        }
    }

    Ok(token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    struct BrokenRng;

    impl RngCore for BrokenRng {
        fn next_u32(&mut self) -> u32 {
            unreachable!()
        }

        fn next_u64(&mut self) -> u64 {
            unreachable!()
        }

        fn fill_bytes(&mut self, _dest: &mut [u8]) {
            unreachable!()
        }

        fn try_fill_bytes(&mut self, _dest: &mut [u8]) -> Result<(), rand::Error> {
            Err(rand::Error::new("entropy source unavailable"))
        }
    }

    impl CryptoRng for BrokenRng {}

    // Yields 0, 1, 2, ..., 255, 0, 1, ...
    struct CountingRng(u8);

    impl RngCore for CountingRng {
        fn next_u32(&mut self) -> u32 {
            unreachable!()
        }

        fn next_u64(&mut self) -> u64 {
            unreachable!()
        }

        fn fill_bytes(&mut self, dest: &mut [u8]) {
            for b in dest.iter_mut() {
                *b = self.0;
                self.0 = self.0.wrapping_add(1);
            }
        }

        fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
            self.fill_bytes(dest);
            Ok(())
        }
    }

    impl CryptoRng for CountingRng {}

    #[test]
    fn test_token_length_and_alphabet() {
        for length in [1, 16, 64, 200] {
            let token = generate_token(length).unwrap();
            assert_eq!(token.len(), length);
            assert!(token.bytes().all(|b| TOKEN_ALPHABET.contains(&b)));
        }
    }

    #[test]
    fn test_zero_length() {
        assert_eq!(generate_token(0).unwrap(), "");
    }

    #[test]
    fn test_tokens_do_not_repeat() {
        let tokens: HashSet<String> = (0..1000).map(|_| generate_token(64).unwrap()).collect();
        assert_eq!(tokens.len(), 1000);
    }

    #[test]
    fn test_randomness_failure_is_an_error() {
        let err = generate_token_with(&mut BrokenRng, 64).unwrap_err();
        assert!(matches!(err, AuthError::RandomnessUnavailable(_)));
    }

    #[test]
    fn test_zero_length_never_touches_rng() {
        assert_eq!(generate_token_with(&mut BrokenRng, 0).unwrap(), "");
    }

    #[test]
    fn test_bytes_above_bound_are_skipped() {
        // One pass over 0..=255 accepts 248 bytes: the alphabet exactly four
        // times. The 8 high bytes are dropped rather than folded onto 0..7.
        let token = generate_token_with(&mut CountingRng(0), 248 + 62).unwrap();
        let alphabet = std::str::from_utf8(TOKEN_ALPHABET).unwrap();
        assert_eq!(token, alphabet.repeat(5));
    }

    #[test]
    fn test_every_symbol_is_reachable() {
        let mut seen = HashSet::new();
        for _ in 0..200 {
            seen.extend(generate_token(64).unwrap().bytes());
        }
        assert_eq!(seen.len(), TOKEN_ALPHABET.len());
    }
}
