use crate::error::{CsrfError, Result};
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::RngCore;
use subtle::ConstantTimeEq;

/// Number of random bytes in a token.
pub const TOKEN_LEN: usize = 32;

/// The per-session secret token.
///
/// The token itself only lives in the session. Pages get a masked copy from
/// [`masked`](Self::masked): a fresh one-time pad followed by the token XORed
/// with that pad, so no two responses carry the same bytes.
#[derive(Clone, PartialEq, Eq)]
pub struct CsrfToken {
    bytes: [u8; TOKEN_LEN],
}

impl CsrfToken {
    /// Generate a new CSRF token
    pub fn generate() -> Self {
        let mut bytes = [0u8; TOKEN_LEN];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self { bytes }
    }

    /// Read a token back from its stored form.
    pub fn decode(encoded: &str) -> Result<Self> {
        let raw = URL_SAFE_NO_PAD.decode(encoded)?;
        let bytes: [u8; TOKEN_LEN] = raw.try_into().map_err(|_| CsrfError::InvalidToken)?;
        Ok(Self { bytes })
    }

    /// Stored form of the token.
    pub fn encode(&self) -> String {
        URL_SAFE_NO_PAD.encode(self.bytes)
    }

    /// A masked copy of the token for embedding in a page.
    pub fn masked(&self) -> String {
        let mut pad = [0u8; TOKEN_LEN];
        rand::thread_rng().fill_bytes(&mut pad);

        let mut out = Vec::with_capacity(TOKEN_LEN * 2);
        out.extend_from_slice(&pad);
        out.extend(pad.iter().zip(self.bytes.iter()).map(|(p, b)| p ^ b));
        URL_SAFE_NO_PAD.encode(out)
    }

    /// Check a submitted token, masked or not, in constant time.
    pub fn verify(&self, submitted: &str) -> bool {
        let Ok(raw) = URL_SAFE_NO_PAD.decode(submitted.trim()) else {
            return false;
        };

        let candidate: Vec<u8> = match raw.len() {
            len if len == TOKEN_LEN * 2 => {
                let (pad, masked) = raw.split_at(TOKEN_LEN);
                pad.iter().zip(masked).map(|(p, m)| p ^ m).collect()
            }
            TOKEN_LEN => raw,
            _ => return false,
        };

        bool::from(candidate.as_slice().ct_eq(&self.bytes))
    }
}

impl std::fmt::Debug for CsrfToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("CsrfToken(..)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_generation() {
        let a = CsrfToken::generate();
        let b = CsrfToken::generate();
        assert_ne!(a, b);
        assert_eq!(a.encode().len(), 43);
    }

    #[test]
    fn test_stored_form_decodes() {
        let token = CsrfToken::generate();
        assert_eq!(CsrfToken::decode(&token.encode()).unwrap(), token);
        assert!(CsrfToken::decode("c2hvcnQ").is_err());
        assert!(CsrfToken::decode("***").is_err());
    }

    #[test]
    fn test_masked_copies_differ_but_verify() {
        let token = CsrfToken::generate();
        let first = token.masked();
        let second = token.masked();

        assert_ne!(first, second);
        assert!(token.verify(&first));
        assert!(token.verify(&second));
        assert!(token.verify(&token.encode()));
    }

    #[test]
    fn test_foreign_tokens_rejected() {
        let token = CsrfToken::generate();
        let other = CsrfToken::generate();

        assert!(!token.verify(&other.masked()));
        assert!(!token.verify(&other.encode()));
        assert!(!token.verify(""));
        assert!(!token.verify("not base64!"));
    }

    #[test]
    fn test_debug_hides_value() {
        let token = CsrfToken::generate();
        assert_eq!(format!("{:?}", token), "CsrfToken(..)");
    }
}
