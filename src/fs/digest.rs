//! Content digests using SHA-256
//!
//! Files are streamed through the hasher, so memory use does not depend
//! on file size. The file handle is closed before returning on every path.

use crate::error::EntryError;
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io;
use std::path::Path;

/// Name of the digest algorithm, used in mismatch details
pub const DIGEST_NAME: &str = "SHA256";

/// Compute the hex-encoded SHA-256 digest of a file's contents
///
/// Open and read failures are returned as [`EntryError::Hash`].
pub fn file_digest(path: &Path) -> Result<String, EntryError> {
    let mut file = File::open(path)
        .map_err(|e| EntryError::hash(path, format!("opening for hashing: {}", e)))?;

    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher)
        .map_err(|e| EntryError::hash(path, format!("reading for hashing: {}", e)))?;

    Ok(hex::encode(hasher.finalize()))
}

/// Compute the hex-encoded SHA-256 digest of an in-memory buffer
pub fn bytes_digest(content: &[u8]) -> String {
    hex::encode(Sha256::digest(content))
}
