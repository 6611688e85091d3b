use std::fmt;

use sha2::{Digest, Sha256};

/// Bytes of OS randomness behind every token (128 bits).
pub const TOKEN_SECRET_BYTES: usize = 16;

/// Length of the rendered token: uppercase hex, no separators.
#[cfg(test)]
pub const TOKEN_SECRET_LEN: usize = TOKEN_SECRET_BYTES * 2;

/// Plaintext token value. Only ever handed out once, right after issuance.
#[derive(Clone, PartialEq, Eq)]
pub struct TokenSecret(String);

impl TokenSecret {
    pub fn generate() -> Result<Self, getrandom::Error> {
        let mut bytes = [0u8; TOKEN_SECRET_BYTES];
        getrandom::fill(&mut bytes)?;

        Ok(Self(hex::encode_upper(bytes)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    pub fn digest(&self) -> Vec<u8> {
        digest_secret(&self.0)
    }
}

impl fmt::Debug for TokenSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("TokenSecret(**redacted**)")
    }
}

/// sha256(token) -> raw 32 bytes (stored as BYTEA)
///
/// Presented values are hashed verbatim, so anything that is not a token we
/// issued simply fails to resolve.
pub fn digest_secret(value: &str) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(value.as_bytes());
    hasher.finalize().to_vec()
}
