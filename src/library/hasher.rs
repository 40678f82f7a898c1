//! Streaming content digests.

use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::Path;

use sha2::{Digest as _, Sha256};

use crate::domain::Digest;
use crate::library::error::{LibraryError, LibraryResult};

/// Read buffer size used while hashing
pub const CHUNK_SIZE: usize = 8192;

/// Compute the SHA-256 digest of a file, reading it in fixed-size chunks.
///
/// The digest depends on the file bytes only, never on its name or metadata.
pub fn hash_file(path: &Path) -> LibraryResult<Digest> {
    let mut file = File::open(path).map_err(|e| LibraryError::io(path, e))?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; CHUNK_SIZE];

    loop {
        let n = match file.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(LibraryError::io(path, e)),
        };
        hasher.update(&buf[..n]);
    }

    Ok(Digest::from_hex(hex::encode(hasher.finalize())))
}
