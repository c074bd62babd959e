//! Transaction identifiers.
//!
//! Every dispatched operation gets a 32-byte BLAKE3-derived id:
//!
//!   tx_id = BLAKE3(nonce || channel || contract || operation || args…)
//!
//! The nonce is random per submission unless the caller pins it with a
//! request id, in which case the same request always derives the same
//! transaction id — the hook the dispatcher uses to deduplicate retries
//! after an ambiguous commit outcome.

use rand::RngCore;

/// 32-byte transaction identifier. Displays as lowercase hex.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct TxId([u8; 32]);

impl TxId {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl std::fmt::Display for TxId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl std::fmt::Debug for TxId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "TxId({})", &hex::encode(self.0)[..16])
    }
}

/// Generate a cryptographically random 16-byte nonce.
pub fn generate_nonce() -> [u8; 16] {
    let mut nonce = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut nonce);
    nonce
}

/// Derive the fixed nonce for a caller-supplied request id.
pub fn nonce_for_request_id(request_id: &str) -> [u8; 16] {
    let digest = blake3::hash(request_id.as_bytes());
    let mut nonce = [0u8; 16];
    nonce.copy_from_slice(&digest.as_bytes()[..16]);
    nonce
}

/// Derive a transaction id from a nonce and the full call coordinates.
///
/// Length-prefixed fields so ("ab","c") and ("a","bc") never collide.
pub fn derive_tx_id(
    nonce: &[u8; 16],
    channel: &str,
    contract: &str,
    operation: &str,
    args: &[String],
) -> TxId {
    let mut hasher = blake3::Hasher::new();
    hasher.update(nonce);
    for field in [channel, contract, operation] {
        hasher.update(&(field.len() as u64).to_le_bytes());
        hasher.update(field.as_bytes());
    }
    for arg in args {
        hasher.update(&(arg.len() as u64).to_le_bytes());
        hasher.update(arg.as_bytes());
    }
    TxId(*hasher.finalize().as_bytes())
}
