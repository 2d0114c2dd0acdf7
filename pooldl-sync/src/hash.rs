//! MD5 content hashing.
//!
//! The remote API identifies files by MD5, so local files are compared with
//! the same digest. File names embed the expected hash but are never trusted
//! for integrity: the digest is always recomputed from content.

use std::fs::File;
use std::io::{self, BufReader};
use std::path::Path;

use md5::{Digest, Md5};

/// Lowercase hex MD5 of `bytes`.
pub fn md5_hex(bytes: &[u8]) -> String {
    let mut h = Md5::new();
    h.update(bytes);
    hex::encode(h.finalize())
}

/// Lowercase hex MD5 of the file at `path`, streamed from disk.
pub fn md5_file(path: &Path) -> io::Result<String> {
    let mut reader = BufReader::new(File::open(path)?);
    let mut h = Md5::new();
    io::copy(&mut reader, &mut h)?;
    Ok(hex::encode(h.finalize()))
}

/// `true` if the file at `path` hashes to `expected` (case-insensitive).
pub fn file_matches(path: &Path, expected: &str) -> io::Result<bool> {
    Ok(md5_file(path)?.eq_ignore_ascii_case(expected))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn known_digests() {
        assert_eq!(md5_hex(b""), "d41d8cd98f00b204e9800998ecf8427e");
        assert_eq!(md5_hex(b"abc"), "900150983cd24fb0d6963f7d28e17f72");
    }

    #[test]
    fn file_digest_matches_bytes_digest() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("f.bin");
        let data: Vec<u8> = (0..200_000u32).map(|i| (i % 251) as u8).collect();
        std::fs::write(&path, &data).unwrap();
        assert_eq!(md5_file(&path).unwrap(), md5_hex(&data));
    }

    #[test]
    fn comparison_ignores_case() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("abc.txt");
        std::fs::write(&path, b"abc").unwrap();
        assert!(file_matches(&path, "900150983CD24FB0D6963F7D28E17F72").unwrap());
        assert!(!file_matches(&path, "d41d8cd98f00b204e9800998ecf8427e").unwrap());
    }

    #[test]
    fn missing_file_is_an_error() {
        let tmp = TempDir::new().unwrap();
        assert!(md5_file(&tmp.path().join("nope")).is_err());
    }
}
