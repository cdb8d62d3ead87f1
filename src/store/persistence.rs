//! Persistence layer for the version record
//!
//! The record is encoded as JSON, gzip-compressed, and written through a
//! temporary file in the control directory that is renamed over the old
//! record, so an interrupted save never leaves a half-written file behind.

use crate::error::StorageError;
use crate::store::{Versioning, CONTROL_DIR, VERSION_FILE};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::{self, File};
use std::io::{self, BufReader, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, instrument};

/// File-backed store for the version record of one working directory
#[derive(Debug, Clone)]
pub struct VersionStore {
    root: PathBuf,
}

impl VersionStore {
    /// Create a store for the working directory at `root`
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn control_dir(&self) -> PathBuf {
        self.root.join(CONTROL_DIR)
    }

    pub fn version_file(&self) -> PathBuf {
        self.control_dir().join(VERSION_FILE)
    }

    /// True when both the control directory and the record file exist.
    pub fn exists(&self) -> bool {
        self.control_dir().is_dir() && self.version_file().is_file()
    }

    /// Persist `versioning`, creating the control directory when absent.
    #[instrument(skip(self, versioning), fields(root = %self.root.display(), head = %versioning.head))]
    pub fn save(&self, versioning: &Versioning) -> Result<(), StorageError> {
        let control_dir = self.control_dir();
        create_control_dir(&control_dir)?;

        let encoded = serde_json::to_vec_pretty(versioning).map_err(|e| {
            StorageError::CorruptState(format!("Failed to encode version record: {}", e))
        })?;

        let mut temp = NamedTempFile::new_in(&control_dir)?;
        {
            let mut encoder = GzEncoder::new(temp.as_file_mut(), Compression::default());
            encoder.write_all(&encoded)?;
            encoder.finish()?;
        }
        temp.as_file().sync_all()?;
        temp.persist(self.version_file())
            .map_err(|e| StorageError::IoError(e.error))?;

        debug!(bytes = encoded.len(), "Version record saved");
        Ok(())
    }

    /// Load the record.
    ///
    /// Fails with `NotFound` when the record is absent and with
    /// `CorruptState` when it cannot be decompressed or decoded.
    #[instrument(skip(self), fields(root = %self.root.display()))]
    pub fn load(&self) -> Result<Versioning, StorageError> {
        if !self.exists() {
            return Err(StorageError::NotFound(self.root.clone()));
        }

        let file = File::open(self.version_file()).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => StorageError::NotFound(self.root.clone()),
            _ => StorageError::IoError(e),
        })?;
        let decoder = GzDecoder::new(BufReader::new(file));
        let versioning: Versioning = serde_json::from_reader(decoder).map_err(|e| {
            StorageError::CorruptState(format!(
                "Failed to decode {:?}: {}",
                self.version_file(),
                e
            ))
        })?;

        debug!(head = %versioning.head, "Version record loaded");
        Ok(versioning)
    }
}

#[cfg(unix)]
fn create_control_dir(dir: &Path) -> Result<(), StorageError> {
    use std::os::unix::fs::DirBuilderExt;

    if dir.is_dir() {
        return Ok(());
    }
    fs::DirBuilder::new().recursive(true).mode(0o700).create(dir)?;
    Ok(())
}

#[cfg(not(unix))]
fn create_control_dir(dir: &Path) -> Result<(), StorageError> {
    fs::create_dir_all(dir)?;
    Ok(())
}
