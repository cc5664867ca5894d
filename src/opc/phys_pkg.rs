//! Provides a general interface to a physical package.
//!
//! A physical package is either a ZIP archive or an expanded directory tree.
//! Both are read into, and written from, a flat mapping of forward-slash uri
//! to blob. The package model only depends on the [`PhysPkgBackend`] trait,
//! so the two representations are interchangeable.
//!
//! # Policy
//!
//! - ZIP directory entries (names ending in `/`) are skipped.
//! - ZIP entry names are normalized: `\` becomes `/` and leading slashes are
//!   stripped. Entries whose normalized name is empty are skipped.
//! - ZIP entries with `.` or `..` segments are skipped with a warning, so no
//!   item can address a path outside the package root. Writing such a uri to
//!   a directory fails with [`OpcError::UnsafeUri`].
//! - When two ZIP entries normalize to the same uri, the first one is kept and
//!   the later one is skipped with a warning.
//! - Directory walks do not follow symbolic links, and only regular files
//!   become items. Zero-length files become zero-length items.
//! - ZIP archives are written in sorted uri order with Deflate compression.
//! - Writes are not transactional; a failure may leave a partial result.

use crate::opc::constants::uri as names;
use crate::opc::error::{OpcError, Result};
use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, trace, warn};
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

/// Item blobs keyed by uri, iterated in sorted uri order.
pub type BlobCollection = BTreeMap<String, Vec<u8>>;

/// Contents of a physical package as read from disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhysPkg {
    /// Origin of the package (archive path or directory path)
    root_uri: Arc<str>,

    blobs: BlobCollection,
}

impl PhysPkg {
    pub fn new(root_uri: impl Into<Arc<str>>, blobs: BlobCollection) -> Self {
        Self {
            root_uri: root_uri.into(),
            blobs,
        }
    }

    /// Read a package from `path`, choosing the backend from what is there:
    /// a directory is read as an expanded package, anything else as a ZIP.
    ///
    /// # Errors
    /// Returns [`OpcError::PackageNotFound`] if nothing exists at `path`.
    pub fn read<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if path.is_dir() {
            DirPhysPkg.read(path)
        } else {
            ZipPhysPkg.read(path)
        }
    }

    pub fn root_uri(&self) -> &str {
        &self.root_uri
    }

    pub fn len(&self) -> usize {
        self.blobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.is_empty()
    }

    /// Iterate over `(uri, blob)` pairs in uri order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[u8])> {
        self.blobs.iter().map(|(uri, blob)| (uri.as_str(), blob.as_slice()))
    }

    /// Consume self and return the shared root uri and the blobs.
    pub fn into_parts(self) -> (Arc<str>, BlobCollection) {
        (self.root_uri, self.blobs)
    }
}

/// A physical representation a package can be loaded from and saved to.
pub trait PhysPkgBackend {
    /// Read every item at `path`.
    fn read(&self, path: &Path) -> Result<PhysPkg>;

    /// Write `blobs` to `path`, replacing whatever is there item by item.
    fn write(&self, blobs: &BlobCollection, path: &Path) -> Result<()>;
}

/// ZIP archive backend.
#[derive(Debug, Clone, Copy, Default)]
pub struct ZipPhysPkg;

/// Expanded directory backend.
#[derive(Debug, Clone, Copy, Default)]
pub struct DirPhysPkg;

impl PhysPkgBackend for ZipPhysPkg {
    fn read(&self, path: &Path) -> Result<PhysPkg> {
        if !path.exists() {
            return Err(OpcError::PackageNotFound(path.display().to_string()));
        }

        let file = File::open(path)?;
        let mut archive = ZipArchive::new(BufReader::new(file))?;
        let mut blobs = BlobCollection::new();

        for idx in 0..archive.len() {
            let mut entry = archive.by_index(idx)?;
            if entry.is_dir() {
                continue;
            }

            let uri = normalize_member_name(entry.name());
            if uri.is_empty() {
                continue;
            }
            if !is_enclosed_uri(&uri) {
                warn!(name = entry.name(), "skipping zip entry outside the package root");
                continue;
            }

            match blobs.entry(uri) {
                Entry::Occupied(existing) => {
                    warn!(
                        name = entry.name(),
                        uri = %existing.key(),
                        "skipping zip entry with duplicate uri"
                    );
                },
                Entry::Vacant(slot) => {
                    let mut blob = Vec::new();
                    entry.read_to_end(&mut blob)?;
                    trace!(uri = %slot.key(), bytes = blob.len(), "read zip entry");
                    slot.insert(blob);
                },
            }
        }

        debug!(path = %path.display(), items = blobs.len(), "read zip package");
        Ok(PhysPkg::new(path.to_string_lossy().as_ref(), blobs))
    }

    fn write(&self, blobs: &BlobCollection, path: &Path) -> Result<()> {
        write_to_zip(blobs, path)
    }
}

impl PhysPkgBackend for DirPhysPkg {
    fn read(&self, path: &Path) -> Result<PhysPkg> {
        if !path.is_dir() {
            return Err(OpcError::PackageNotFound(path.display().to_string()));
        }

        let mut blobs = BlobCollection::new();
        for entry in WalkDir::new(path).follow_links(false) {
            let entry = entry?;
            let file_type = entry.file_type();
            if file_type.is_dir() {
                continue;
            }
            if !file_type.is_file() {
                warn!(path = %entry.path().display(), "skipping non-regular file");
                continue;
            }

            let uri = relative_uri(path, entry.path());
            let blob = fs::read(entry.path())?;
            trace!(uri = %uri, bytes = blob.len(), "read file");
            blobs.insert(uri, blob);
        }

        debug!(path = %path.display(), items = blobs.len(), "read directory package");
        Ok(PhysPkg::new(path.to_string_lossy().as_ref(), blobs))
    }

    fn write(&self, blobs: &BlobCollection, path: &Path) -> Result<()> {
        write_to_dir(blobs, path)
    }
}

/// Create a new ZIP archive at `path` with one entry per uri, overwriting any
/// existing file.
pub fn write_to_zip(blobs: &BlobCollection, path: &Path) -> Result<()> {
    let file = File::create(path)?;
    let mut zip = ZipWriter::new(BufWriter::new(file));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for (uri, blob) in blobs {
        zip.start_file(uri.as_str(), options)?;
        zip.write_all(blob)?;
    }

    let mut writer = zip.finish()?;
    writer.flush()?;
    debug!(path = %path.display(), items = blobs.len(), "wrote zip package");
    Ok(())
}

/// Write one file per uri under `dir`, creating `dir` and any intermediate
/// directories as needed and overwriting existing files.
pub fn write_to_dir(blobs: &BlobCollection, dir: &Path) -> Result<()> {
    fs::create_dir_all(dir)?;

    for (uri, blob) in blobs {
        let path = uri_to_path(dir, uri)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, blob)?;
        trace!(path = %path.display(), bytes = blob.len(), "wrote file");
    }

    debug!(path = %dir.display(), items = blobs.len(), "wrote directory package");
    Ok(())
}

/// Normalize a ZIP member name to forward-slash uri form.
fn normalize_member_name(name: &str) -> String {
    name.replace('\\', "/")
        .trim_start_matches(names::SEPARATOR)
        .to_string()
}

/// Whether every segment of `uri` names a child, never `.` or `..`.
fn is_enclosed_uri(uri: &str) -> bool {
    uri.split(names::SEPARATOR)
        .all(|segment| segment != "." && segment != "..")
}

/// Compute the forward-slash uri of `path` relative to `root`, whatever the
/// host separator.
fn relative_uri(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Map a uri onto a filesystem path below `dir`.
///
/// # Errors
/// [`OpcError::UnsafeUri`] if the uri has `.` or `..` segments.
fn uri_to_path(dir: &Path, uri: &str) -> Result<PathBuf> {
    if !is_enclosed_uri(uri) {
        return Err(OpcError::UnsafeUri(uri.to_string()));
    }
    let mut path = dir.to_path_buf();
    for segment in uri.split(names::SEPARATOR).filter(|s| !s.is_empty()) {
        path.push(segment);
    }
    Ok(path)
}
