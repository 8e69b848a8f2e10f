//! Idempotency keys for transaction submission.

use std::fmt;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Header the ledger service reads the key from.
pub const IDEMPOTENCY_HEADER: &str = "X-Idempotency";

/// Client-supplied token used by the service to reject re-submission of an
/// already-applied transaction. Reuse the same key across every retry of one
/// logical transaction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdempotencyKey(String);

impl IdempotencyKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Random key (UUID v4).
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Deterministic key derived from the parts that identify a transaction.
    ///
    /// SHA-256 over the parts (unit-separator delimited), base64url encoded.
    /// Equal parts always give equal keys, so a process restart re-derives the
    /// key of a submission it may already have sent.
    pub fn derive<I, P>(parts: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: AsRef<[u8]>,
    {
        let mut hasher = Sha256::new();
        for (i, part) in parts.into_iter().enumerate() {
            if i > 0 {
                hasher.update([0x1f_u8]);
            }
            hasher.update(part.as_ref());
        }
        Self(URL_SAFE_NO_PAD.encode(hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IdempotencyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
