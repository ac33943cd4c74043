//! Random tokens for new secret values (API keys, session secrets, ...)

use rand::{rngs::OsRng, RngCore};

/// Default token length
pub const SECRET_LENGTH: usize = 64;

/// Token alphabet: ASCII letters, digits, `&` and `*`
pub const TOKEN_CHARS: &[u8; 64] =
    b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789&*";

/// Generate a token of `length` characters.
///
/// The alphabet has exactly 64 symbols, so masking a random byte to six
/// bits picks each one with equal probability.
pub fn generate_token(length: usize) -> String {
    let mut bytes = vec![0u8; length];
    OsRng.fill_bytes(&mut bytes);
    bytes
        .iter()
        .map(|b| TOKEN_CHARS[(b & 0x3f) as usize] as char)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_length() {
        assert_eq!(generate_token(SECRET_LENGTH).len(), 64);
        assert_eq!(generate_token(10).len(), 10);
        assert_eq!(generate_token(0), "");
    }

    #[test]
    fn test_alphabet() {
        let unique: HashSet<u8> = TOKEN_CHARS.iter().copied().collect();
        assert_eq!(unique.len(), 64);

        let token = generate_token(4096);
        assert!(token.bytes().all(|c| TOKEN_CHARS.contains(&c)));
    }

    #[test]
    fn test_tokens_differ() {
        assert_ne!(generate_token(SECRET_LENGTH), generate_token(SECRET_LENGTH));
    }

    #[test]
    fn test_whole_alphabet_is_reachable() {
        // 64 symbols over 20k draws: missing one has negligible probability
        let token = generate_token(20_000);
        let seen: HashSet<char> = token.chars().collect();
        assert_eq!(seen.len(), 64);
    }
}
