//! API key verification.
//!
//! The expected key is compared with `subtle::ConstantTimeEq`, so the time
//! taken does not depend on where the first differing byte is. Unequal
//! lengths are rejected without inspecting content; the length of a guess
//! is already known to whoever sent it.

use subtle::ConstantTimeEq;

use crate::config::ValidationError;

/// Header carrying the presented API key.
pub const API_KEY_HEADER: &str = "X-API-Key";

/// Compare a presented credential against the expected one.
///
/// Empty presented values never match.
pub fn check(presented: &[u8], expected: &[u8]) -> bool {
    if presented.is_empty() {
        return false;
    }
    presented.ct_eq(expected).into()
}

/// Holds the expected API key for the lifetime of the process.
#[derive(Clone)]
pub struct CredentialGate {
    expected: Box<[u8]>,
}

impl CredentialGate {
    /// Fails if `expected` is empty: a gate with no secret would reject
    /// everything and almost certainly means the key was never configured.
    pub fn new(expected: impl Into<String>) -> Result<Self, ValidationError> {
        let expected = expected.into();
        if expected.is_empty() {
            return Err(ValidationError::Missing("APP_API_KEY"));
        }
        Ok(Self {
            expected: expected.into_bytes().into_boxed_slice(),
        })
    }

    pub fn check(&self, presented: impl AsRef<[u8]>) -> bool {
        check(presented.as_ref(), &self.expected)
    }
}

impl std::fmt::Debug for CredentialGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CredentialGate([REDACTED])")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matching_key() {
        assert!(check(b"k1", b"k1"));
        let gate = CredentialGate::new("test-api-key-12345").unwrap();
        assert!(gate.check("test-api-key-12345"));
    }

    #[test]
    fn test_wrong_key() {
        assert!(!check(b"k2", b"k1"));
        assert!(!check(b"", b"k1"));
    }

    #[test]
    fn test_single_byte_change_anywhere_rejected() {
        let secret = b"test-api-key-12345";
        for i in 0..secret.len() {
            let mut guess = secret.to_vec();
            guess[i] ^= 0x01;
            assert!(!check(&guess, secret), "byte {} flipped should not match", i);
        }
    }

    #[test]
    fn test_length_mismatch_rejected() {
        let gate = CredentialGate::new("test-api-key-12345").unwrap();
        for guess in ["a", "test", "test-api-key-1234", "test-api-key-123456", "wrong-key-with-same-length-x"] {
            assert!(!gate.check(guess), "{} should not match", guess);
        }
    }

    #[test]
    fn test_result_independent_of_mismatch_position() {
        // Every equal-length guess goes through the same full-width
        // comparison; the only observable is the boolean, which must agree
        // whether the difference is first, middle or last.
        let secret = b"abcdefghijklmnop";
        let outcomes: Vec<u8> = [0usize, secret.len() / 2, secret.len() - 1]
            .iter()
            .map(|&i| {
                let mut guess = secret.to_vec();
                guess[i] = b'#';
                guess.ct_eq(&secret[..]).unwrap_u8()
            })
            .collect();
        assert_eq!(outcomes, vec![0, 0, 0]);
    }

    #[test]
    fn test_empty_expected_rejected_at_construction() {
        assert_eq!(
            CredentialGate::new("").unwrap_err(),
            ValidationError::Missing("APP_API_KEY")
        );
    }

    #[test]
    fn test_debug_redacts_secret() {
        let gate = CredentialGate::new("k1-secret").unwrap();
        assert!(!format!("{:?}", gate).contains("k1-secret"));
    }
}
