//! Public key tokens, the signer fingerprint used for binding.
//!
//! ECMA-335 II.6.2.1.3 defines the token as the low 8 bytes of the SHA-1 hash of the full
//! public key, in reverse order. The resolver compares tokens byte-for-byte and never
//! interprets them further; signature verification is out of scope.

use std::{fmt, fmt::Write as _, str::FromStr};

use sha1::{Digest, Sha1};

use crate::{Error, Result};

/// Length of a token derived from a public key.
pub const PUBLIC_KEY_TOKEN_LEN: usize = 8;

/// A signer fingerprint.
///
/// Absence of a fingerprint is modelled as `Option<PublicKeyToken>::None` by every user of
/// this type. A token of eight zero bytes is a present token and never equals `None`.
///
/// # Examples
///
/// ```rust
/// use bindscope::identity::PublicKeyToken;
///
/// let token = PublicKeyToken::parse("b77a5c561934e089")?;
/// assert_eq!(token.as_bytes()[0], 0xb7);
/// assert_eq!(token.to_string(), "b77a5c561934e089");
/// # Ok::<(), bindscope::Error>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PublicKeyToken(Vec<u8>);

impl PublicKeyToken {
    /// Wrap raw token bytes as stored in metadata or supplied by a host.
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        PublicKeyToken(bytes.into())
    }

    /// Derive the token of a full public key blob.
    #[must_use]
    pub fn from_public_key(public_key: &[u8]) -> Self {
        let mut hasher = Sha1::new();
        hasher.update(public_key);
        let hash = hasher.finalize();

        let token = hash[hash.len() - PUBLIC_KEY_TOKEN_LEN..]
            .iter()
            .rev()
            .copied()
            .collect();
        PublicKeyToken(token)
    }

    /// Parse a hex string such as `b77a5c561934e089`.
    ///
    /// # Errors
    /// Returns an error if the string is empty, has an odd length or contains non-hex characters.
    pub fn parse(hex: &str) -> Result<Self> {
        let hex = hex.trim();
        if hex.is_empty() || hex.len() % 2 != 0 || !hex.bytes().all(|b| b.is_ascii_hexdigit())
        {
            return Err(malformed_error!("Invalid public key token '{}'", hex));
        }

        let bytes = (0..hex.len())
            .step_by(2)
            .map(|i| {
                u8::from_str_radix(&hex[i..i + 2], 16)
                    .map_err(|e| malformed_error!("Invalid hex in token '{}': {}", hex, e))
            })
            .collect::<Result<Vec<u8>>>()?;

        Ok(PublicKeyToken(bytes))
    }

    /// The raw token bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Number of bytes in the token.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// `true` for a token without bytes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for PublicKeyToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut hex = String::with_capacity(self.0.len() * 2);
        for byte in &self.0 {
            let _ = write!(hex, "{:02x}", byte);
        }
        f.write_str(&hex)
    }
}

impl FromStr for PublicKeyToken {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl AsRef<[u8]> for PublicKeyToken {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}
