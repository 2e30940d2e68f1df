//! Checksum verification for downloaded archives.
//!
//! Digests are computed by streaming the file through a fixed-size buffer,
//! so memory use does not depend on archive size.

use std::io::Read;
use std::path::Path;

use sha1::Sha1;
use sha2::{Digest, Sha256, Sha512};

use super::package::{ChecksumAlgorithm, Package};
use crate::errors::ChecksumError;

/// Outcome of verifying a package.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verification {
    Verified,
    /// The package carried no expected digest.
    Skipped,
}

/// Verifies that a file matches the expected hex digest.
///
/// The comparison ignores case.
///
/// # Errors
///
/// Returns an error if the algorithm is unknown, the file cannot be read,
/// or the digest does not match.
pub fn verify_checksum(
    file_path: &Path,
    expected: &str,
    algorithm: &str,
) -> Result<(), ChecksumError> {
    let algorithm: ChecksumAlgorithm = algorithm.parse()?;
    let computed = compute_digest(file_path, algorithm)?;
    let expected = expected.trim();

    if !computed.eq_ignore_ascii_case(expected) {
        return Err(ChecksumError::Mismatch {
            path: file_path.to_path_buf(),
            expected: expected.to_lowercase(),
            actual: computed,
        });
    }
    Ok(())
}

/// Verifies a downloaded package against its catalog digest.
///
/// # Errors
///
/// Same as [`verify_checksum`].
pub fn verify_package(package: &Package, file_path: &Path) -> Result<Verification, ChecksumError> {
    let Some(expected) = package.checksum() else {
        tracing::warn!(
            tag = package.tag(),
            "no checksum published for {}, skipping verification",
            package.file_name()
        );
        return Ok(Verification::Skipped);
    };
    verify_checksum(file_path, expected, package.algorithm())?;
    tracing::debug!(file = %file_path.display(), "checksum verified");
    Ok(Verification::Verified)
}

/// Computes the lowercase hex digest of a file.
///
/// # Errors
///
/// Returns an error if the file cannot be opened or read.
pub fn compute_digest(file_path: &Path, algorithm: ChecksumAlgorithm) -> Result<String, ChecksumError> {
    match algorithm {
        ChecksumAlgorithm::Sha1 => digest_file::<Sha1>(file_path),
        ChecksumAlgorithm::Sha256 => digest_file::<Sha256>(file_path),
        ChecksumAlgorithm::Sha512 => digest_file::<Sha512>(file_path),
    }
}

fn digest_file<D: Digest>(file_path: &Path) -> Result<String, ChecksumError> {
    let io_err = |source| ChecksumError::Io {
        path: file_path.to_path_buf(),
        source,
    };
    let mut file = std::fs::File::open(file_path).map_err(io_err)?;

    let mut hasher = D::new();
    let mut buffer = [0u8; 8192];

    loop {
        let bytes_read = file.read(&mut buffer).map_err(io_err)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(hex::encode(hasher.finalize()))
}
