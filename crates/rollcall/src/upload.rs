//! Proof-of-payment uploads.
//!
//! Uploaded files are validated as a whole (kind and size) and then written
//! once into the upload directory under a timestamp-based name. Existing files
//! are never overwritten.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};

/// Default upload size limit: 2 MiB.
pub const DEFAULT_MAX_FILE_SIZE: u64 = 2 * 1024 * 1024;

/// Timestamp layout used for stored file names (day, month, year, time).
const TIMESTAMP_FORMAT: &str = "%d%m%Y_%H%M%S";

/// Kinds of file accepted as proof of payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProofKind {
    /// Spreadsheet export.
    Csv,
    /// PNG image.
    Png,
    /// JPEG image.
    Jpg,
    /// PDF document.
    Pdf,
}

impl ProofKind {
    /// Every supported kind.
    pub const ALL: [Self; 4] = [Self::Csv, Self::Png, Self::Jpg, Self::Pdf];

    /// Look up the kind for a file extension, ignoring case.
    #[must_use]
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "csv" => Some(Self::Csv),
            "png" => Some(Self::Png),
            "jpg" | "jpeg" => Some(Self::Jpg),
            "pdf" => Some(Self::Pdf),
            _ => None,
        }
    }

    /// Look up the kind from a file name's extension.
    #[must_use]
    pub fn from_file_name(file_name: &str) -> Option<Self> {
        extension_of(file_name).and_then(|ext| Self::from_extension(&ext))
    }

    /// Canonical extension for this kind.
    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Png => "png",
            Self::Jpg => "jpg",
            Self::Pdf => "pdf",
        }
    }

    /// MIME types that browsers and tools report for this kind.
    #[must_use]
    pub fn mime_types(self) -> &'static [&'static str] {
        match self {
            Self::Csv => &[
                "text/csv",
                "application/csv",
                "application/vnd.ms-excel",
                "text/plain",
            ],
            Self::Png => &["image/png"],
            Self::Jpg => &["image/jpeg", "image/jpg", "image/pjpeg"],
            Self::Pdf => &["application/pdf"],
        }
    }

    /// The MIME type to assume when the caller did not report one.
    #[must_use]
    pub fn default_mime(self) -> &'static str {
        self.mime_types()[0]
    }

    /// Check if a reported MIME type is consistent with this kind.
    ///
    /// An empty type or `application/octet-stream` carries no information and
    /// is accepted. Parameters such as `; charset=utf-8` are ignored.
    #[must_use]
    pub fn accepts_mime(self, mime: &str) -> bool {
        let essence = mime
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        essence.is_empty()
            || essence == "application/octet-stream"
            || self.mime_types().contains(&essence.as_str())
    }
}

impl std::fmt::Display for ProofKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.extension())
    }
}

/// Lower-cased extension of `file_name`, if it has one.
fn extension_of(file_name: &str) -> Option<String> {
    Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty())
        .map(str::to_ascii_lowercase)
}

/// Turn a display name into a file-name fragment: whitespace becomes `_`,
/// anything that is not alphanumeric, `-` or `_` is dropped, and the result
/// is lower-cased.
#[must_use]
pub fn safe_label(label: &str) -> String {
    label
        .trim()
        .chars()
        .filter_map(|c| {
            if c.is_whitespace() {
                Some('_')
            } else if c.is_alphanumeric() || c == '-' || c == '_' {
                Some(c)
            } else {
                None
            }
        })
        .collect::<String>()
        .to_lowercase()
}

/// Remove a file left behind by a failed write. Returns whether it is gone.
fn discard_partial(path: &Path) -> bool {
    match std::fs::remove_file(path) {
        Ok(()) => true,
        Err(e) => {
            warn!("Could not remove partial upload {}: {}", path.display(), e);
            false
        }
    }
}

/// Validates and writes proof-of-payment files.
#[derive(Debug, Clone)]
pub struct UploadHandler {
    /// Directory receiving stored files.
    dir: PathBuf,
    /// Largest accepted file, in bytes.
    max_file_size: u64,
    /// Accepted kinds.
    allowed: Vec<ProofKind>,
}

impl UploadHandler {
    /// Create a handler with the default limits (2 MiB; csv, png, jpg, pdf).
    ///
    /// # Errors
    ///
    /// Returns an error if the upload directory cannot be created.
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        Self::with_limits(dir, DEFAULT_MAX_FILE_SIZE, ProofKind::ALL.to_vec())
    }

    /// Create a handler with explicit limits.
    ///
    /// # Errors
    ///
    /// Returns an error if the upload directory cannot be created.
    pub fn with_limits(
        dir: impl AsRef<Path>,
        max_file_size: u64,
        allowed: Vec<ProofKind>,
    ) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        if !dir.exists() {
            std::fs::create_dir_all(&dir).map_err(|source| Error::DirectoryCreate {
                path: dir.clone(),
                source,
            })?;
            debug!("Created upload directory {}", dir.display());
        }

        Ok(Self {
            dir,
            max_file_size,
            allowed,
        })
    }

    /// Get the upload directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Get the size limit in bytes.
    #[must_use]
    pub fn max_file_size(&self) -> u64 {
        self.max_file_size
    }

    /// Get the accepted kinds.
    #[must_use]
    pub fn allowed(&self) -> &[ProofKind] {
        &self.allowed
    }

    fn accepted_list(&self) -> String {
        self.allowed
            .iter()
            .map(|k| k.extension())
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Check a prospective upload without writing anything.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedType`] if the extension is not an accepted
    /// kind or the MIME type contradicts it, and [`Error::TooLarge`] if `size`
    /// exceeds the limit.
    pub fn validate(&self, size: u64, file_name: &str, mime_type: &str) -> Result<ProofKind> {
        let kind = ProofKind::from_file_name(file_name)
            .filter(|kind| self.allowed.contains(kind) && kind.accepts_mime(mime_type));
        let Some(kind) = kind else {
            warn!(
                "Rejected upload '{}' ({}): unsupported type",
                file_name, mime_type
            );
            return Err(Error::UnsupportedType {
                file_name: file_name.to_string(),
                accepted: self.accepted_list(),
            });
        };

        if size > self.max_file_size {
            warn!(
                "Rejected upload '{}': {} bytes over the {} byte limit",
                file_name, size, self.max_file_size
            );
            return Err(Error::TooLarge {
                size,
                limit: self.max_file_size,
            });
        }

        Ok(kind)
    }

    /// Validate and store `bytes`, returning the stored path.
    ///
    /// The file is named `<ddmmYYYY_HHMMSS>.<ext>` using the original
    /// extension.
    ///
    /// # Errors
    ///
    /// Returns a validation error before anything is written, or an I/O error
    /// if the file cannot be created.
    pub fn store(&self, bytes: &[u8], file_name: &str, mime_type: &str) -> Result<PathBuf> {
        self.store_at(bytes, file_name, mime_type, None, Local::now())
    }

    /// Like [`store`](Self::store), with `_<label>` appended to the timestamp.
    ///
    /// # Errors
    ///
    /// Same as [`store`](Self::store).
    pub fn store_labeled(
        &self,
        bytes: &[u8],
        file_name: &str,
        mime_type: &str,
        label: &str,
    ) -> Result<PathBuf> {
        self.store_at(bytes, file_name, mime_type, Some(label), Local::now())
    }

    fn store_at(
        &self,
        bytes: &[u8],
        file_name: &str,
        mime_type: &str,
        label: Option<&str>,
        now: DateTime<Local>,
    ) -> Result<PathBuf> {
        let size = u64::try_from(bytes.len()).unwrap_or(u64::MAX);
        let kind = self.validate(size, file_name, mime_type)?;
        let ext = extension_of(file_name).unwrap_or_else(|| kind.extension().to_string());

        let mut stem = now.format(TIMESTAMP_FORMAT).to_string();
        if let Some(label) = label.map(safe_label).filter(|l| !l.is_empty()) {
            stem.push('_');
            stem.push_str(&label);
        }

        let (path, mut file) = self.create_unique(&stem, &ext)?;
        if let Err(err) = file.write_all(bytes).and_then(|()| file.sync_all()) {
            drop(file);
            discard_partial(&path);
            return Err(err.into());
        }

        info!("Stored {} proof ({} bytes) at {}", kind, size, path.display());
        Ok(path)
    }

    /// Create `<stem>.<ext>`, or `<stem>-N.<ext>` if that name is taken.
    fn create_unique(&self, stem: &str, ext: &str) -> Result<(PathBuf, File)> {
        let mut attempt = 0u32;
        loop {
            let name = if attempt == 0 {
                format!("{stem}.{ext}")
            } else {
                format!("{stem}-{attempt}.{ext}")
            };
            let path = self.dir.join(name);
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(file) => return Ok((path, file)),
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => attempt += 1,
                Err(e) => return Err(e.into()),
            }
        }
    }
}
