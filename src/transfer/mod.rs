//! Transfer Packager
//!
//! Packs tracked files into zip archives for the wire and unpacks received
//! archives into a working directory. Entries are deflated, named by their
//! `/`-separated relative path, and carry their modification time both as
//! a DOS timestamp and as an extended-timestamp extra field so whole-second
//! precision survives the trip.

pub mod channel;

use crate::error::TransferError;
use crate::tree::{path, TrackingRules};
use chrono::{DateTime, Datelike, NaiveDate, Timelike, Utc};
use filetime::FileTime;
use std::fs::{self, File};
use std::io::{self, Cursor, Read, Seek, Write};
use std::path::{Component, Path, PathBuf};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};
use walkdir::WalkDir;
use zip::extra_fields::ExtraField;
use zip::write::FullFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

/// Info-ZIP extended timestamp extra field
const EXTENDED_TIMESTAMP_ID: u16 = 0x5455;

/// A file to pack: where it lives and what it is called inside the archive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    pub absolute: PathBuf,
    pub relative: String,
}

impl FileEntry {
    /// Entry for a stored relative path under a working directory
    pub fn under(root: &Path, relative: &str) -> Self {
        Self {
            absolute: path::to_native(root, relative),
            relative: relative.to_string(),
        }
    }
}

/// Incremental archive writer over any zip sink.
///
/// Built from a seekable `ZipWriter::new` for in-memory archives or from
/// `ZipWriter::new_stream` for archives streamed while they are produced.
pub struct ArchiveWriter<W: Write + Seek> {
    zip: ZipWriter<W>,
    entries: usize,
}

impl<W: Write + Seek> ArchiveWriter<W> {
    pub fn from_zip(zip: ZipWriter<W>) -> Self {
        Self { zip, entries: 0 }
    }

    pub fn entries(&self) -> usize {
        self.entries
    }

    /// Append one regular file under `relative`, preserving its mtime.
    pub fn append_file(&mut self, absolute: &Path, relative: &str) -> Result<(), TransferError> {
        let mut file = File::open(absolute).map_err(|e| {
            TransferError::IoError(io::Error::new(
                e.kind(),
                format!("Failed to open {:?}: {}", absolute, e),
            ))
        })?;
        let metadata = file.metadata()?;
        let modified: DateTime<Utc> = metadata.modified()?.into();

        let mut options = FullFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .last_modified_time(dos_time(&modified))
            .large_file(metadata.len() >= u32::MAX as u64);
        options.add_extra_data(EXTENDED_TIMESTAMP_ID, extended_timestamp(&modified), false)?;

        self.zip.start_file(relative.to_string(), options)?;
        io::copy(&mut file, &mut self.zip)?;
        self.entries += 1;

        debug!(path = %relative, size = metadata.len(), "Packed file");
        Ok(())
    }

    /// Write the central directory and hand back the sink.
    pub fn finish(self) -> Result<W, TransferError> {
        let mut sink = self.zip.finish()?;
        sink.flush()?;
        Ok(sink)
    }
}

/// Pack `files` into an in-memory zip archive.
#[instrument(skip(files), fields(files = files.len()))]
pub fn pack(files: &[FileEntry]) -> Result<Vec<u8>, TransferError> {
    let mut archive = ArchiveWriter::from_zip(ZipWriter::new(Cursor::new(Vec::new())));
    for entry in files {
        archive.append_file(&entry.absolute, &entry.relative)?;
    }
    let bytes = archive.finish()?.into_inner();

    info!(bytes = bytes.len(), "Packed archive");
    Ok(bytes)
}

/// Append every entry of `files` to `archive`, checking `cancel` before each
/// file, then finish the archive and return its sink.
///
/// Cancellation and entry errors abort the archive; the caller decides what
/// to do with the partially written sink.
pub fn pack_into<W, I>(
    mut archive: ArchiveWriter<W>,
    files: I,
    cancel: &CancellationToken,
) -> Result<W, TransferError>
where
    W: Write + Seek,
    I: IntoIterator<Item = Result<FileEntry, TransferError>>,
{
    for entry in files {
        if cancel.is_cancelled() {
            warn!(packed = archive.entries(), "Archive canceled");
            return Err(TransferError::IoError(io::Error::new(
                io::ErrorKind::Interrupted,
                "archive canceled",
            )));
        }
        let entry = entry?;
        archive.append_file(&entry.absolute, &entry.relative)?;
    }

    info!(files = archive.entries(), "Archive complete");
    archive.finish()
}

/// Walk `root` lazily and yield every file `rules` track, in name order.
///
/// Matches the tree builder's filtering: ignored names prune whole
/// directories and the control directory is always skipped.
pub fn tracked_files(
    root: &Path,
    rules: &TrackingRules,
) -> impl Iterator<Item = Result<FileEntry, TransferError>> {
    let walk_root = root.to_path_buf();
    let filter_rules = rules.clone();
    let file_rules = rules.clone();

    WalkDir::new(root)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(move |entry| {
            entry.depth() == 0 || !filter_rules.is_ignored(&entry.file_name().to_string_lossy())
        })
        .filter_map(move |entry| {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    return Some(Err(TransferError::IoError(
                        e.into_io_error()
                            .unwrap_or_else(|| io::Error::new(io::ErrorKind::Other, "walk failed")),
                    )))
                }
            };
            if !entry.file_type().is_file()
                || !file_rules.allows_file(&entry.file_name().to_string_lossy())
            {
                return None;
            }
            Some(
                path::relative_path(&walk_root, entry.path())
                    .map(|relative| FileEntry {
                        absolute: entry.path().to_path_buf(),
                        relative,
                    })
                    .map_err(|e| TransferError::Archive(e.to_string())),
            )
        })
}

/// Extract every entry of `reader` under `destination`.
///
/// Each entry is checked before anything is written for it; an entry that
/// would land outside `destination` fails with `PathTraversal`. Files
/// extracted before a failing entry stay on disk. Returns the relative
/// paths of the extracted files.
#[instrument(skip(reader), fields(destination = %destination.display()))]
pub fn unpack<R: Read + Seek>(reader: R, destination: &Path) -> Result<Vec<String>, TransferError> {
    let mut archive = ZipArchive::new(reader)?;
    fs::create_dir_all(destination)?;
    let root = dunce::canonicalize(destination)?;

    let mut extracted = Vec::with_capacity(archive.len());
    for index in 0..archive.len() {
        let mut entry = archive.by_index(index)?;
        let name = entry.name().to_string();
        let target = resolve_entry_path(destination, &name)?;
        confine(&root, &target)?;

        if entry.is_dir() {
            fs::create_dir_all(&target)?;
            continue;
        }
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut out = File::create(&target).map_err(|e| {
            TransferError::IoError(io::Error::new(
                e.kind(),
                format!("Failed to create {:?}: {}", target, e),
            ))
        })?;
        io::copy(&mut entry, &mut out)?;
        drop(out);

        #[allow(unreachable_patterns)]
        let extended = entry.extra_data_fields().find_map(|field| match field {
            ExtraField::ExtendedTimestamp(ts) => ts.mod_time(),
            _ => None,
        });
        let modified = match extended {
            Some(secs) => Some(FileTime::from_unix_time(secs as i64, 0)),
            None => entry.last_modified().and_then(filetime_from_dos),
        };
        if let Some(modified) = modified {
            filetime::set_file_mtime(&target, modified)?;
        }

        debug!(path = %name, "Extracted file");
        extracted.push(path::normalize_path_string(&name));
    }

    info!(files = extracted.len(), "Unpacked archive");
    Ok(extracted)
}

/// Resolve an archive entry name (or a peer-supplied relative path) under
/// `destination`, rejecting anything that would escape it.
pub fn resolve_entry_path(destination: &Path, name: &str) -> Result<PathBuf, TransferError> {
    let normalized = path::normalize_path_string(name);
    let mut resolved = destination.to_path_buf();
    let mut depth = 0usize;

    for part in normalized.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                if depth == 0 {
                    return Err(TransferError::PathTraversal(name.to_string()));
                }
                resolved.pop();
                depth -= 1;
            }
            part => {
                let mut components = Path::new(part).components();
                match (components.next(), components.next()) {
                    (Some(Component::Normal(_)), None) => {}
                    _ => return Err(TransferError::PathTraversal(name.to_string())),
                }
                resolved.push(part);
                depth += 1;
            }
        }
    }

    Ok(resolved)
}

/// Check that `target`, a lexically resolved path under `root`, does not
/// leave `root` through a symlink already on disk.
///
/// `root` must be canonical. The nearest existing ancestor of `target`
/// (the target itself included) is resolved and must stay under `root`;
/// a dangling link cannot be resolved and is refused.
pub fn confine(root: &Path, target: &Path) -> Result<(), TransferError> {
    let existing = target
        .ancestors()
        .find(|candidate| fs::symlink_metadata(candidate).is_ok())
        .unwrap_or(root);
    let resolved = dunce::canonicalize(existing)
        .map_err(|_| TransferError::PathTraversal(target.display().to_string()))?;
    if !resolved.starts_with(root) {
        warn!(path = %target.display(), resolved = %resolved.display(), "Entry escapes destination through a link");
        return Err(TransferError::PathTraversal(target.display().to_string()));
    }
    Ok(())
}

fn dos_time(modified: &DateTime<Utc>) -> zip::DateTime {
    zip::DateTime::from_date_and_time(
        modified.year().clamp(1980, 2107) as u16,
        modified.month() as u8,
        modified.day() as u8,
        modified.hour() as u8,
        modified.minute() as u8,
        modified.second() as u8,
    )
    .unwrap_or_default()
}

fn extended_timestamp(modified: &DateTime<Utc>) -> Box<[u8]> {
    let secs = modified.timestamp().clamp(0, u32::MAX as i64) as u32;
    let mut data = Vec::with_capacity(5);
    data.push(0x01);
    data.extend_from_slice(&secs.to_le_bytes());
    data.into_boxed_slice()
}

fn filetime_from_dos(dos: zip::DateTime) -> Option<FileTime> {
    let timestamp = NaiveDate::from_ymd_opt(dos.year() as i32, dos.month() as u32, dos.day() as u32)?
        .and_hms_opt(dos.hour() as u32, dos.minute() as u32, dos.second() as u32)?
        .and_utc()
        .timestamp();
    Some(FileTime::from_unix_time(timestamp, 0))
}
