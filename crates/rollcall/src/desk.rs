//! The registration desk: user-facing flows over the table and uploads.

use std::path::Path;

use tracing::{info, warn};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::record::AttendeeRecord;
use crate::storage::RecordStore;
use crate::upload::UploadHandler;

/// Combines the [`RecordStore`] and the [`UploadHandler`].
#[derive(Debug)]
pub struct RegistrationDesk {
    store: RecordStore,
    uploads: UploadHandler,
}

impl RegistrationDesk {
    /// Create a desk from an opened store and upload handler.
    #[must_use]
    pub fn new(store: RecordStore, uploads: UploadHandler) -> Self {
        Self { store, uploads }
    }

    /// Open the table and upload directory named by `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the table cannot be loaded or the upload directory
    /// cannot be created.
    pub fn open(config: &Config) -> Result<Self> {
        let store = RecordStore::open(config.table_path())?;
        let uploads = UploadHandler::with_limits(
            config.upload_dir(),
            config.uploads.max_file_size,
            config.allowed_kinds(),
        )?;
        Ok(Self::new(store, uploads))
    }

    /// The underlying record store.
    #[must_use]
    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    /// The underlying upload handler.
    #[must_use]
    pub fn uploads(&self) -> &UploadHandler {
        &self.uploads
    }

    /// Register a new attendee.
    ///
    /// # Errors
    ///
    /// See [`RecordStore::register`].
    pub fn register(&self, name: &str, phone: &str) -> Result<AttendeeRecord> {
        self.store.register(name, phone)
    }

    /// Names containing `query`, for the attendee to pick from.
    #[must_use]
    pub fn lookup(&self, query: &str) -> Vec<AttendeeRecord> {
        self.store.search(query)
    }

    /// Store a proof of payment for `name` and confirm the payment.
    ///
    /// Nothing is written unless the attendee exists, is still pending, and
    /// the file passes validation.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`], [`Error::AlreadyConfirmed`],
    /// [`Error::UnsupportedType`] or [`Error::TooLarge`] for rejected
    /// submissions, or an I/O error if writing fails.
    pub fn submit_proof(
        &self,
        name: &str,
        bytes: &[u8],
        file_name: &str,
        mime_type: &str,
    ) -> Result<AttendeeRecord> {
        let record = self
            .store
            .find(name)
            .ok_or_else(|| Error::not_found(name.trim()))?;
        if record.is_confirmed() {
            warn!("Proof submitted for {} after confirmation", record.name);
            return Err(Error::AlreadyConfirmed { name: record.name });
        }

        let path = self
            .uploads
            .store_labeled(bytes, file_name, mime_type, &record.name)?;
        let updated = self
            .store
            .confirm_payment(&record.name, &path_text(&path))?;

        info!("Attendance confirmed for {}", updated.name);
        Ok(updated)
    }
}

fn path_text(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
