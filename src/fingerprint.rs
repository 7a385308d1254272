use sha2::{Digest, Sha256};
use std::fmt;

/// Opaque 16-byte client identity derived from connection metadata.
///
/// The fingerprint is the truncated SHA-256 digest of the
/// `peer-IP | Authorization | User-Agent` triple. Missing header values
/// participate as empty strings, so two anonymous clients behind the same
/// address collapse into one identity while an authenticated client keeps
/// its own. The same triple always produces the same fingerprint within a
/// process lifetime.
///
/// Rendered as 32 lowercase hex characters via [`Display`](fmt::Display).
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClientFingerprint([u8; 16]);

impl ClientFingerprint {
    /// Derives the fingerprint for a `(peer-IP, Authorization, User-Agent)`
    /// triple. Fields are joined with `|` before hashing.
    pub fn derive(ip: &str, authorization: &str, user_agent: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(ip.as_bytes());
        hasher.update(b"|");
        hasher.update(authorization.as_bytes());
        hasher.update(b"|");
        hasher.update(user_agent.as_bytes());
        let digest = hasher.finalize();

        let mut bytes = [0u8; 16];
        bytes.copy_from_slice(&digest[..16]);
        ClientFingerprint(bytes)
    }

    /// The raw 16 fingerprint bytes.
    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }
}

impl fmt::Display for ClientFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in self.0 {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

impl fmt::Debug for ClientFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}
