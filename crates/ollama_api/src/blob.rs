use sha2::{Digest, Sha256};

/// Prefix of every content-addressed blob identifier.
pub const BLOB_DIGEST_PREFIX: &str = "sha256:";

/// Returns the content-addressed identifier `sha256:<lowercase hex>` for `bytes`.
///
/// Identical content always maps to the identical identifier, which is what makes
/// blob uploads idempotent.
pub fn blob_digest(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    format!("{BLOB_DIGEST_PREFIX}{}", hex::encode(digest))
}
