// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Snapshot artifact storage.
//!
//! Artifacts are opaque blobs stored as `<root>/<locator>.zst`. The checksum
//! is the SHA-256 of the uncompressed content and is verified on every read.

use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

rb_core::define_id! {
    /// Locator for a stored artifact.
    pub struct ArtifactId("art-");
}

const COMPRESSION_LEVEL: i32 = 3;
const PROBE_FILE: &str = ".probe";

#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("artifact not found: {0}")]
    NotFound(String),
    #[error("invalid artifact locator: {0}")]
    InvalidLocator(String),
    #[error("artifact {locator} checksum mismatch (expected {expected}, found {actual})")]
    ChecksumMismatch { locator: String, expected: String, actual: String },
}

/// Result of storing an artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredArtifact {
    pub locator: String,
    /// Uncompressed content size.
    pub size_bytes: u64,
    pub checksum: String,
}

/// Hex-encoded SHA-256 digest.
pub fn sha256_hex(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, ArtifactError> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Store `content` as a new artifact. Each call produces a fresh locator.
    pub fn put(&self, content: &[u8]) -> Result<StoredArtifact, ArtifactError> {
        let locator = ArtifactId::new().to_string();
        let path = self.path_for(&locator)?;
        let compressed = zstd::encode_all(content, COMPRESSION_LEVEL)?;

        let tmp_path = path.with_extension("zst.tmp");
        fs::write(&tmp_path, &compressed)?;
        fs::rename(&tmp_path, &path)?;

        let stored = StoredArtifact {
            locator,
            size_bytes: content.len() as u64,
            checksum: sha256_hex(content),
        };
        tracing::debug!(
            locator = %stored.locator,
            size_bytes = stored.size_bytes,
            compressed_bytes = compressed.len(),
            "stored artifact"
        );
        Ok(stored)
    }

    /// Read an artifact, verifying its checksum when one is given.
    pub fn get(&self, locator: &str, checksum: Option<&str>) -> Result<Vec<u8>, ArtifactError> {
        let path = self.path_for(locator)?;
        let compressed = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ArtifactError::NotFound(locator.to_string()));
            }
            Err(e) => return Err(e.into()),
        };
        let content = zstd::decode_all(compressed.as_slice())?;
        if let Some(expected) = checksum {
            let actual = sha256_hex(&content);
            if actual != expected {
                return Err(ArtifactError::ChecksumMismatch {
                    locator: locator.to_string(),
                    expected: expected.to_string(),
                    actual,
                });
            }
        }
        Ok(content)
    }

    pub fn exists(&self, locator: &str) -> bool {
        self.path_for(locator).map(|p| p.is_file()).unwrap_or(false)
    }

    /// True when the artifact exists, decompresses, and matches `checksum`.
    pub fn verify(&self, locator: &str, checksum: &str) -> bool {
        self.get(locator, Some(checksum)).is_ok()
    }

    /// Remove an artifact. Removing a missing artifact succeeds.
    pub fn remove(&self, locator: &str) -> Result<(), ArtifactError> {
        let path = self.path_for(locator)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Check the store is reachable by writing and removing a probe file.
    pub fn probe(&self) -> Result<(), ArtifactError> {
        let path = self.root.join(PROBE_FILE);
        fs::write(&path, b"ok")?;
        fs::remove_file(&path)?;
        Ok(())
    }

    fn path_for(&self, locator: &str) -> Result<PathBuf, ArtifactError> {
        let valid = !locator.is_empty()
            && locator.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(ArtifactError::InvalidLocator(locator.to_string()));
        }
        Ok(self.root.join(format!("{}.zst", locator)))
    }
}

#[cfg(test)]
#[path = "artifacts_tests.rs"]
mod tests;
