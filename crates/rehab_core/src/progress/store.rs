//! On-disk progress archive.
//!
//! ```text
//! "RHPA" | version: u32 LE | LZ4(MessagePack body), size prepended | SHA-256 of everything before it
//! ```
//!
//! The version lives in the header so an archive from a newer build is
//! rejected before its body is decompressed.

use std::fs::{rename, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use lz4_flex::{compress_prepend_size, decompress_size_prepended};
use rmp_serde::{from_slice, to_vec_named};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::error::StoreError;
use super::history::ProgressLog;
use super::table::TherapyProgress;
use super::{ProgressRecord, ProgressSink};

pub const ARCHIVE_VERSION: u32 = 1;

const MAGIC: &[u8; 4] = b"RHPA";
const HEADER_LEN: usize = 8;
const CHECKSUM_LEN: usize = 32;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ProgressArchive {
    /// Format version read from the file header
    #[serde(skip)]
    pub version: u32,

    /// Last write time
    pub updated_at: DateTime<Utc>,

    /// Per-mode percent table
    pub progress: TherapyProgress,

    /// Every finished level, oldest first
    pub history: ProgressLog,
}

impl Default for ProgressArchive {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressArchive {
    pub fn new() -> Self {
        Self {
            version: ARCHIVE_VERSION,
            updated_at: Utc::now(),
            progress: TherapyProgress::new(),
            history: ProgressLog::default(),
        }
    }

    /// Apply one finished level to both the table and the history.
    pub fn record(&mut self, record: &ProgressRecord) {
        self.progress.set_percent(record.mode, record.level_index, record.percent as u32);
        self.history.push(record);
        self.updated_at = record.recorded_at;
    }

    pub fn validate(&self) -> Result<(), StoreError> {
        if !self.progress.is_consistent() {
            return Err(StoreError::Corrupted);
        }
        if self.history.entries().iter().any(|e| e.percent > 100) {
            return Err(StoreError::Corrupted);
        }
        Ok(())
    }

    /// Encode with header, compressed body and checksum trailer.
    pub fn to_bytes(&self) -> Result<Vec<u8>, StoreError> {
        self.validate()?;

        let body = compress_prepend_size(&to_vec_named(self)?);
        let mut bytes = Vec::with_capacity(HEADER_LEN + body.len() + CHECKSUM_LEN);
        bytes.extend_from_slice(MAGIC);
        bytes.extend_from_slice(&ARCHIVE_VERSION.to_le_bytes());
        bytes.extend_from_slice(&body);
        let checksum = Sha256::digest(&bytes);
        bytes.extend_from_slice(&checksum);
        Ok(bytes)
    }

    /// Decode and validate. Checks run cheapest first: length, magic,
    /// checksum, version, then the body itself.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, StoreError> {
        if bytes.len() < HEADER_LEN + CHECKSUM_LEN || &bytes[..4] != MAGIC {
            return Err(StoreError::Corrupted);
        }

        let (signed, checksum) = bytes.split_at(bytes.len() - CHECKSUM_LEN);
        if Sha256::digest(signed).as_slice() != checksum {
            return Err(StoreError::ChecksumMismatch);
        }

        let mut version = [0u8; 4];
        version.copy_from_slice(&signed[4..HEADER_LEN]);
        let version = u32::from_le_bytes(version);
        if version == 0 || version > ARCHIVE_VERSION {
            return Err(StoreError::VersionMismatch { found: version, expected: ARCHIVE_VERSION });
        }

        let body = decompress_size_prepended(&signed[HEADER_LEN..]).map_err(|_| StoreError::Decompression)?;
        let mut archive: ProgressArchive = from_slice(&body)?;
        archive.version = version;
        archive.validate()?;
        Ok(archive)
    }
}

pub struct ProgressStore;

impl ProgressStore {
    /// Atomic save: write a temp file, sync, then rename over the target.
    pub fn save_to_path(path: &Path, archive: &ProgressArchive) -> Result<(), StoreError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let data = archive.to_bytes()?;
        let temp_path = path.with_extension("tmp");
        {
            let mut file = File::create(&temp_path)?;
            file.write_all(&data)?;
            file.flush()?;
            file.sync_all()?;
        }
        rename(&temp_path, path)?;

        log::debug!("Saved {} bytes of progress to {:?}", data.len(), path);
        Ok(())
    }

    pub fn load_from_path(path: &Path) -> Result<ProgressArchive, StoreError> {
        if !path.exists() {
            return Err(StoreError::FileNotFound { path: path.display().to_string() });
        }

        let mut file = File::open(path)?;
        let mut data = Vec::new();
        file.read_to_end(&mut data)?;

        let archive = ProgressArchive::from_bytes(&data)?;
        log::debug!("Loaded {} bytes of progress from {:?}", data.len(), path);
        Ok(archive)
    }

    /// Existing archive, or a fresh one when the file does not exist yet.
    pub fn load_or_default(path: &Path) -> Result<ProgressArchive, StoreError> {
        match Self::load_from_path(path) {
            Err(StoreError::FileNotFound { .. }) => Ok(ProgressArchive::new()),
            other => other,
        }
    }
}

/// Sink that rewrites the archive file after every finished level.
#[derive(Debug)]
pub struct FileSink {
    path: PathBuf,
    archive: ProgressArchive,
}

impl FileSink {
    /// Opens `path`, continuing an existing archive when present.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let archive = ProgressStore::load_or_default(&path)?;
        log::info!("Progress archive at {:?} ({} history entries)", path, archive.history.len());
        Ok(Self { path, archive })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn archive(&self) -> &ProgressArchive {
        &self.archive
    }
}

impl ProgressSink for FileSink {
    fn persist(&mut self, record: &ProgressRecord) {
        self.archive.record(record);
        if let Err(e) = ProgressStore::save_to_path(&self.path, &self.archive) {
            log::warn!("Failed to write progress archive {:?}: {}", self.path, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::ActivityMode;
    use tempfile::TempDir;
    use uuid::Uuid;

    fn sample_archive() -> ProgressArchive {
        let mut archive = ProgressArchive::new();
        let session = Uuid::new_v4();
        archive.record(&ProgressRecord::new(ActivityMode::Reach, 0, 100, session));
        archive.record(&ProgressRecord::new(ActivityMode::Sort, 2, 50, session));
        archive
    }

    #[test]
    fn test_bytes_roundtrip() {
        let archive = sample_archive();
        let bytes = archive.to_bytes().unwrap();
        assert_eq!(&bytes[..4], b"RHPA");

        let restored = ProgressArchive::from_bytes(&bytes).unwrap();
        assert_eq!(restored.version, ARCHIVE_VERSION);
        assert_eq!(restored.progress, archive.progress);
        assert_eq!(restored.history.len(), 2);
    }

    #[test]
    fn test_checksum_and_magic() {
        let mut bytes = sample_archive().to_bytes().unwrap();
        if let Some(last) = bytes.last_mut() {
            *last = last.wrapping_add(1);
        }
        assert!(matches!(ProgressArchive::from_bytes(&bytes), Err(StoreError::ChecksumMismatch)));
        assert!(matches!(ProgressArchive::from_bytes(&bytes[..10]), Err(StoreError::Corrupted)));

        let mut foreign = sample_archive().to_bytes().unwrap();
        foreign[0] = b'X';
        assert!(matches!(ProgressArchive::from_bytes(&foreign), Err(StoreError::Corrupted)));
    }

    #[test]
    fn test_newer_version_rejected_from_header() {
        let mut bytes = sample_archive().to_bytes().unwrap();
        let n = bytes.len() - CHECKSUM_LEN;
        bytes.truncate(n);
        bytes[4..HEADER_LEN].copy_from_slice(&(ARCHIVE_VERSION + 1).to_le_bytes());
        let checksum = Sha256::digest(&bytes);
        bytes.extend_from_slice(&checksum);

        let err = ProgressArchive::from_bytes(&bytes).unwrap_err();
        assert!(matches!(err, StoreError::VersionMismatch { found, .. } if found == ARCHIVE_VERSION + 1));
    }

    #[test]
    fn test_atomic_save() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("progress.dat");

        ProgressStore::save_to_path(&path, &sample_archive()).unwrap();
        assert!(path.exists());
        assert!(!path.with_extension("tmp").exists());

        let loaded = ProgressStore::load_from_path(&path).unwrap();
        assert_eq!(loaded.progress.get_percent(ActivityMode::Sort, 2), 50);
    }

    #[test]
    fn test_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nope.dat");
        let err = ProgressStore::load_from_path(&path).unwrap_err();
        assert!(err.is_recoverable());
        assert!(ProgressStore::load_or_default(&path).unwrap().history.is_empty());
    }

    #[test]
    fn test_file_sink_continues_archive() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("patient").join("progress.dat");

        let mut sink = FileSink::open(&path).unwrap();
        sink.persist(&ProgressRecord::new(ActivityMode::Grip, 0, 100, Uuid::new_v4()));
        drop(sink);

        let mut reopened = FileSink::open(&path).unwrap();
        assert_eq!(reopened.archive().progress.last_full_index(ActivityMode::Grip), Some(0));
        reopened.persist(&ProgressRecord::new(ActivityMode::Grip, 1, 40, Uuid::new_v4()));

        let loaded = ProgressStore::load_from_path(&path).unwrap();
        assert_eq!(loaded.history.len(), 2);
        assert_eq!(loaded.progress.levels(ActivityMode::Grip), &[100, 40]);
    }
}
