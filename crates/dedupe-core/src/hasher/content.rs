use std::fmt;
use std::fs::File;
use std::io::{self, BufReader};
use std::path::Path;

const READ_BUFFER_SIZE: usize = 64 * 1024;

/// Content identity of a file: BLAKE3 digest (lowercase hex) plus the number
/// of bytes that went through the hasher.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint {
    pub digest: String,
    pub size: u64,
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", &self.digest[..self.digest.len().min(16)], self.size)
    }
}

/// Stream a file through BLAKE3 once.
///
/// The size is what the hasher consumed, not `metadata().len()`, so a file
/// that is growing or shrinking during the read still yields a consistent pair.
pub fn fingerprint(path: &Path) -> io::Result<Fingerprint> {
    let file = File::open(path)?;
    let mut reader = BufReader::with_capacity(READ_BUFFER_SIZE, file);
    let mut hasher = blake3::Hasher::new();
    let size = io::copy(&mut reader, &mut hasher)?;

    Ok(Fingerprint {
        digest: hasher.finalize().to_hex().to_string(),
        size,
    })
}
