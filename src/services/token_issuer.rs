use rand::RngCore;

/// Byte length of issued tokens before hex encoding.
pub const TOKEN_BYTES: usize = 32;

/// Issues an opaque single-use token: 256 bits from the thread CSPRNG, hex encoded.
pub fn issue() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_issue_produces_hex_of_expected_length() {
        let token = issue();
        assert_eq!(token.len(), TOKEN_BYTES * 2);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_issue_does_not_repeat() {
        let tokens: HashSet<String> = (0..256).map(|_| issue()).collect();
        assert_eq!(tokens.len(), 256);
    }
}
