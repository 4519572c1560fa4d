//! Ledger hashing with domain separation
//!
//! - RFC 8785 JSON Canonicalization Scheme (JCS) for block payloads
//! - Domain separation prefixes for every hash
//! - Big-endian integers and length-prefixed strings
//!
//! # Block hash
//!
//! ```text
//! block_preimage =
//!   b"GRACKER_LEDGER_BLOCK_V1" ||
//!   U64_BE(index) ||
//!   ENC_STR(timestamp) ||
//!   ENC_STR(JCS(payload)) ||
//!   ENC_STR(previous_hash)
//!
//! block_hash = HEX(SHA256(block_preimage))
//! ```

use serde::Serialize;
use sha2::{Digest, Sha256};

/// 32-byte SHA-256 hash
pub type Hash256 = [u8; 32];

/// Domain prefix for ledger block hashing
pub const DOMAIN_BLOCK: &[u8] = b"GRACKER_LEDGER_BLOCK_V1";

/// Domain prefix for subject identifier derivation
pub const DOMAIN_SUBJECT: &[u8] = b"GRACKER_SUBJECT_V1";

/// Length of a derived subject identifier in hex characters
pub const SUBJECT_ID_LEN: usize = 16;

/// Encode a u32 as 4 bytes big-endian
#[inline]
pub fn u32_be(n: u32) -> [u8; 4] {
    n.to_be_bytes()
}

/// Encode a u64 as 8 bytes big-endian
#[inline]
pub fn u64_be(n: u64) -> [u8; 8] {
    n.to_be_bytes()
}

/// Encode a string as length-prefixed UTF-8 bytes
/// Format: U32_BE(len) || UTF8_bytes
pub fn encode_string(s: &str) -> Vec<u8> {
    let utf8_bytes = s.as_bytes();
    let mut result = Vec::with_capacity(4 + utf8_bytes.len());
    result.extend_from_slice(&u32_be(utf8_bytes.len() as u32));
    result.extend_from_slice(utf8_bytes);
    result
}

/// Canonical JSON string per RFC 8785 (JCS).
///
/// Keys are sorted lexicographically, whitespace is removed and numbers are
/// normalised, so structurally equal payloads always hash identically.
/// Fails only for values JSON cannot represent (NaN, infinities).
pub fn canonicalize_json<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    serde_json_canonicalizer::to_string(value)
}

/// Inputs to the block hash
pub struct BlockHashParams<'a> {
    pub index: u64,
    /// RFC 3339, microsecond precision
    pub timestamp: &'a str,
    /// JCS form of the payload
    pub canonical_payload: &'a str,
    pub previous_hash: &'a str,
}

/// Compute a block hash as lowercase hex
pub fn compute_block_hash(params: &BlockHashParams) -> String {
    let mut hasher = Sha256::new();

    hasher.update(DOMAIN_BLOCK);
    hasher.update(u64_be(params.index));
    hasher.update(encode_string(params.timestamp));
    hasher.update(encode_string(params.canonical_payload));
    hasher.update(encode_string(params.previous_hash));

    let digest: Hash256 = hasher.finalize().into();
    hex::encode(digest)
}

/// Deterministic subject identifier for a claimed email.
///
/// The email is trimmed and lower-cased first so that case variants of one
/// address map to the same subject.
pub fn derive_subject_id(email: &str) -> String {
    let normalized = email.trim().to_lowercase();

    let mut hasher = Sha256::new();
    hasher.update(DOMAIN_SUBJECT);
    hasher.update(encode_string(&normalized));
    let digest: Hash256 = hasher.finalize().into();

    let mut id = hex::encode(digest);
    id.truncate(SUBJECT_ID_LEN);
    id
}
