//! Storage layer for rollcall.
//!
//! This module provides the attendee table: an in-memory list of records kept
//! in lockstep with a single CSV file. Every mutation rewrites the whole file
//! while holding the table lock, so concurrent callers never overwrite each
//! other's changes with a stale copy.

pub mod table;

use std::fs::File;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::record::{name_key, AttendeeRecord, PaymentStatus};

/// The attendee table and its backing file.
///
/// Provides:
/// - Case-insensitive lookup and substring search by name
/// - Registration with duplicate-name prevention
/// - Payment confirmation, at most once per record
/// - Whole-file rewrite after every mutation
#[derive(Debug)]
pub struct RecordStore {
    /// Path to the table file.
    path: PathBuf,
    /// Rows in file order.
    table: Mutex<Vec<AttendeeRecord>>,
}

impl RecordStore {
    /// Open the table at `path`, creating it if it does not exist.
    ///
    /// Creates the parent directories and a header-only file for a new table.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or created, or if any row
    /// fails validation.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let parent = parent_dir(&path);
        if !parent.exists() {
            std::fs::create_dir_all(parent).map_err(|source| Error::DirectoryCreate {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let records = if path.exists() {
            Self::load(&path)?
        } else {
            debug!("Creating attendee table at {}", path.display());
            write_atomic(&path, &[])?;
            Vec::new()
        };

        info!(
            "Attendee table opened at {} ({} records)",
            path.display(),
            records.len()
        );
        Ok(Self {
            path,
            table: Mutex::new(records),
        })
    }

    fn load(path: &Path) -> Result<Vec<AttendeeRecord>> {
        let file = File::open(path).map_err(|source| Error::TableOpen {
            path: path.to_path_buf(),
            source,
        })?;
        let records = table::read_table(file)?;
        debug!("Loaded {} records from {}", records.len(), path.display());
        Ok(records)
    }

    /// Get the path to the table file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Find the record whose name matches `name`, ignoring case and
    /// surrounding whitespace.
    #[must_use]
    pub fn find(&self, name: &str) -> Option<AttendeeRecord> {
        let key = name_key(name);
        if key.is_empty() {
            return None;
        }
        self.table.lock().iter().find(|r| r.key() == key).cloned()
    }

    /// Search names containing `query`, ignoring case.
    ///
    /// Results keep table order. A blank query matches nothing.
    #[must_use]
    pub fn search(&self, query: &str) -> Vec<AttendeeRecord> {
        let needle = name_key(query);
        if needle.is_empty() {
            return Vec::new();
        }
        self.table
            .lock()
            .iter()
            .filter(|r| r.key().contains(&needle))
            .cloned()
            .collect()
    }

    /// Snapshot of every record, in table order.
    #[must_use]
    pub fn records(&self) -> Vec<AttendeeRecord> {
        self.table.lock().clone()
    }

    /// Number of records in the table.
    #[must_use]
    pub fn len(&self) -> usize {
        self.table.lock().len()
    }

    /// Check if the table has no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.table.lock().is_empty()
    }

    /// Register a new attendee as `Novo` / `Pendente`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingField`] if the name or phone is blank,
    /// [`Error::DuplicateName`] if the name is already present, or an I/O
    /// error if the table cannot be rewritten. On error the table is left
    /// unchanged.
    pub fn register(&self, name: &str, phone: &str) -> Result<AttendeeRecord> {
        if name.trim().is_empty() {
            return Err(Error::MissingField { field: "name" });
        }
        if phone.trim().is_empty() {
            return Err(Error::MissingField { field: "phone" });
        }

        let mut table = self.table.lock();
        if table.iter().any(|r| r.matches_name(name)) {
            debug!("Rejecting duplicate registration for {}", name.trim());
            return Err(Error::duplicate_name(name.trim()));
        }

        let record = AttendeeRecord::registration(name, phone);
        table.push(record.clone());
        if let Err(err) = write_atomic(&self.path, &table) {
            table.pop();
            return Err(err);
        }

        info!("Registered attendee {}", record.name);
        Ok(record)
    }

    /// Mark the attendee's payment as confirmed and link the stored proof.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingField`] if `proof_path` is blank,
    /// [`Error::NotFound`] if no record matches, [`Error::AlreadyConfirmed`]
    /// if the payment was confirmed before, or an I/O error if the table
    /// cannot be rewritten. On error the table is left unchanged.
    pub fn confirm_payment(&self, name: &str, proof_path: &str) -> Result<AttendeeRecord> {
        let proof_path = proof_path.trim();
        if proof_path.is_empty() {
            return Err(Error::MissingField {
                field: "proof_path",
            });
        }

        let mut table = self.table.lock();
        let index = table
            .iter()
            .position(|r| r.matches_name(name))
            .ok_or_else(|| Error::not_found(name.trim()))?;

        if table[index].is_confirmed() {
            warn!(
                "Payment for {} was already confirmed; ignoring new proof",
                table[index].name
            );
            return Err(Error::AlreadyConfirmed {
                name: table[index].name.clone(),
            });
        }

        let previous = table[index].clone();
        table[index].status = PaymentStatus::Confirmado;
        table[index].proof_path = Some(proof_path.to_string());
        if let Err(err) = write_atomic(&self.path, &table) {
            table[index] = previous;
            return Err(err);
        }

        info!("Confirmed payment for {} ({})", table[index].name, proof_path);
        Ok(table[index].clone())
    }

    /// Rewrite the table file from memory.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn flush(&self) -> Result<()> {
        let table = self.table.lock();
        write_atomic(&self.path, &table)
    }

    /// Replace the in-memory table with the file's contents.
    ///
    /// Returns the number of records loaded. On error the in-memory table is
    /// kept as it was.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or fails validation.
    pub fn reload(&self) -> Result<usize> {
        let mut table = self.table.lock();
        *table = Self::load(&self.path)?;
        Ok(table.len())
    }

    /// Get table statistics.
    #[must_use]
    pub fn stats(&self) -> TableStats {
        let table = self.table.lock();
        let confirmed = table.iter().filter(|r| r.is_confirmed()).count();
        TableStats {
            total: table.len(),
            pending: table.len() - confirmed,
            confirmed,
        }
    }
}

/// Directory holding `path`; the current directory for bare file names.
fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

/// Write `records` to a temp file next to `path`, then rename it into place.
fn write_atomic(path: &Path, records: &[AttendeeRecord]) -> Result<()> {
    let mut temp = NamedTempFile::new_in(parent_dir(path))?;
    table::write_table(temp.as_file_mut(), records)?;
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|e| Error::Persist {
        path: path.to_path_buf(),
        source: e.error,
    })?;

    debug!("Flushed {} records to {}", records.len(), path.display());
    Ok(())
}

/// Counts by payment status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize)]
pub struct TableStats {
    /// Total number of records.
    pub total: usize,
    /// Records still waiting for a proof of payment.
    pub pending: usize,
    /// Records with a confirmed payment.
    pub confirmed: usize,
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::record::AttendeeType;

    fn create_test_store() -> (tempfile::TempDir, RecordStore) {
        crate::logging::init_test_logging();
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let store = RecordStore::open(dir.path().join("attendees.csv"))
            .expect("failed to open test store");
        (dir, store)
    }

    #[test]
    fn test_open_creates_header_only_file() {
        let (dir, store) = create_test_store();

        assert!(store.is_empty());
        let text = std::fs::read_to_string(dir.path().join("attendees.csv")).unwrap();
        assert_eq!(text, "name,phone,type,status,proof_path\n");
    }

    #[test]
    fn test_open_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("event/2025/attendees.csv");

        let store = RecordStore::open(&nested).unwrap();
        assert!(nested.exists());
        assert_eq!(store.path(), nested);
    }

    #[test]
    fn test_open_rejects_invalid_table() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("attendees.csv");
        std::fs::write(
            &path,
            "name,phone,type,status,proof_path\nAna,555,Novo,Talvez,\n",
        )
        .unwrap();

        let err = RecordStore::open(&path).unwrap_err();
        assert!(matches!(err, Error::InvalidRecord { line: 2, .. }));
    }

    #[test]
    fn test_register_new_attendee() {
        let (_dir, store) = create_test_store();

        let record = store.register("Ana", "555-1111").unwrap();
        assert_eq!(record.attendee_type, AttendeeType::Novo);
        assert_eq!(record.status, PaymentStatus::Pendente);
        assert!(record.proof_path.is_none());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_register_duplicate_fails() {
        let (_dir, store) = create_test_store();

        store.register("Ana", "555-1111").unwrap();
        let err = store.register("Ana", "555-2222").unwrap_err();

        assert!(matches!(err, Error::DuplicateName { .. }));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_register_duplicate_ignores_case_and_spaces() {
        let (_dir, store) = create_test_store();

        store.register("Ana Souza", "555-1111").unwrap();
        let err = store.register("  ana souza ", "555-2222").unwrap_err();
        assert!(matches!(err, Error::DuplicateName { .. }));
    }

    #[test]
    fn test_register_requires_name_and_phone() {
        let (_dir, store) = create_test_store();

        assert!(matches!(
            store.register("  ", "555").unwrap_err(),
            Error::MissingField { field: "name" }
        ));
        assert!(matches!(
            store.register("Ana", "").unwrap_err(),
            Error::MissingField { field: "phone" }
        ));
        assert!(store.is_empty());
    }

    #[test]
    fn test_register_persists_immediately() {
        let (dir, store) = create_test_store();
        store.register("Ana", "555-1111").unwrap();

        let reopened = RecordStore::open(dir.path().join("attendees.csv")).unwrap();
        assert_eq!(reopened.records(), store.records());
    }

    #[test]
    fn test_find_is_case_insensitive_exact() {
        let (_dir, store) = create_test_store();
        store.register("Ana", "555-1111").unwrap();
        store.register("Anabela", "555-3333").unwrap();

        assert_eq!(store.find("ANA").unwrap().name, "Ana");
        assert_eq!(store.find(" anabela ").unwrap().name, "Anabela");
        assert!(store.find("An").is_none());
        assert!(store.find("").is_none());
    }

    #[test]
    fn test_search_substring() {
        let (_dir, store) = create_test_store();
        store.register("Ana Souza", "1").unwrap();
        store.register("Bruno Lima", "2").unwrap();
        store.register("Mariana", "3").unwrap();

        let names: Vec<_> = store
            .search("ana")
            .into_iter()
            .map(|r| r.name)
            .collect();
        assert_eq!(names, vec!["Ana Souza", "Mariana"]);
        assert!(store.search("   ").is_empty());
        assert!(store.search("zzz").is_empty());
    }

    #[test]
    fn test_confirm_payment() {
        let (_dir, store) = create_test_store();
        store.register("Ana", "555-1111").unwrap();

        let record = store
            .confirm_payment("ana", "uploads/01022025_101500.png")
            .unwrap();
        assert_eq!(record.status, PaymentStatus::Confirmado);
        assert_eq!(
            record.proof_path.as_deref(),
            Some("uploads/01022025_101500.png")
        );
    }

    #[test]
    fn test_confirm_payment_round_trips_through_file() {
        let (dir, store) = create_test_store();
        store.register("Ana", "555-1111").unwrap();
        store.confirm_payment("Ana", "uploads/a.pdf").unwrap();

        let reopened = RecordStore::open(dir.path().join("attendees.csv")).unwrap();
        let record = reopened.find("Ana").unwrap();
        assert_eq!(record.status, PaymentStatus::Confirmado);
        assert_eq!(record.proof_path.as_deref(), Some("uploads/a.pdf"));
    }

    #[test]
    fn test_confirm_payment_trims_proof_path() {
        let (dir, store) = create_test_store();
        store.register("Ana", "555-1111").unwrap();

        let record = store.confirm_payment("Ana", " uploads/a.pdf ").unwrap();
        assert_eq!(record.proof_path.as_deref(), Some("uploads/a.pdf"));

        let reopened = RecordStore::open(dir.path().join("attendees.csv")).unwrap();
        assert_eq!(reopened.records(), store.records());
    }

    #[test]
    fn test_register_failed_flush_rolls_back() {
        let dir = tempfile::tempdir().unwrap();
        let table_dir = dir.path().join("event");
        let store = RecordStore::open(table_dir.join("attendees.csv")).unwrap();
        std::fs::remove_dir_all(&table_dir).unwrap();

        assert!(store.register("Ana", "555-1111").is_err());
        assert!(store.is_empty());
    }

    #[test]
    fn test_confirm_payment_failed_flush_rolls_back() {
        let dir = tempfile::tempdir().unwrap();
        let table_dir = dir.path().join("event");
        let store = RecordStore::open(table_dir.join("attendees.csv")).unwrap();
        store.register("Ana", "555-1111").unwrap();
        std::fs::remove_dir_all(&table_dir).unwrap();

        assert!(store.confirm_payment("Ana", "uploads/a.pdf").is_err());
        let record = store.find("Ana").unwrap();
        assert!(!record.is_confirmed());
        assert!(record.proof_path.is_none());
    }

    #[test]
    fn test_confirm_payment_unknown_name_leaves_table_unchanged() {
        let (dir, store) = create_test_store();
        store.register("Ana", "555-1111").unwrap();
        let path = dir.path().join("attendees.csv");
        let before = std::fs::read_to_string(&path).unwrap();

        let err = store.confirm_payment("Carla", "uploads/c.pdf").unwrap_err();

        assert!(err.is_not_found());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), before);
        assert!(!store.find("Ana").unwrap().is_confirmed());
    }

    #[test]
    fn test_confirm_payment_only_once() {
        let (_dir, store) = create_test_store();
        store.register("Ana", "555-1111").unwrap();
        store.confirm_payment("Ana", "uploads/first.png").unwrap();

        let err = store
            .confirm_payment("Ana", "uploads/second.png")
            .unwrap_err();
        assert!(matches!(err, Error::AlreadyConfirmed { .. }));
        assert_eq!(
            store.find("Ana").unwrap().proof_path.as_deref(),
            Some("uploads/first.png")
        );
    }

    #[test]
    fn test_confirm_payment_requires_proof_path() {
        let (_dir, store) = create_test_store();
        store.register("Ana", "555-1111").unwrap();

        let err = store.confirm_payment("Ana", " ").unwrap_err();
        assert!(matches!(err, Error::MissingField { .. }));
        assert!(!store.find("Ana").unwrap().is_confirmed());
    }

    #[test]
    fn test_reload_picks_up_external_edits() {
        let (dir, store) = create_test_store();
        store.register("Ana", "555-1111").unwrap();

        std::fs::write(
            dir.path().join("attendees.csv"),
            "name,phone,type,status,proof_path\n\
             Ana,555-1111,Novo,Pendente,\n\
             Bruno,555-2222,Existente,Pendente,\n",
        )
        .unwrap();

        assert_eq!(store.reload().unwrap(), 2);
        assert_eq!(
            store.find("bruno").unwrap().attendee_type,
            AttendeeType::Existente
        );
    }

    #[test]
    fn test_reload_failure_keeps_memory() {
        let (dir, store) = create_test_store();
        store.register("Ana", "555-1111").unwrap();
        std::fs::write(dir.path().join("attendees.csv"), "garbage\n").unwrap();

        assert!(store.reload().is_err());
        assert_eq!(store.len(), 1);

        store.flush().unwrap();
        let reopened = RecordStore::open(dir.path().join("attendees.csv")).unwrap();
        assert_eq!(reopened.len(), 1);
    }

    #[test]
    fn test_stats() {
        let (_dir, store) = create_test_store();
        assert_eq!(store.stats(), TableStats::default());

        store.register("Ana", "1").unwrap();
        store.register("Bruno", "2").unwrap();
        store.confirm_payment("Bruno", "uploads/b.jpg").unwrap();

        let stats = store.stats();
        assert_eq!(stats.total, 2);
        assert_eq!(stats.pending, 1);
        assert_eq!(stats.confirmed, 1);
    }

    #[test]
    fn test_concurrent_registrations_all_persist() {
        let (dir, store) = create_test_store();
        let store = Arc::new(store);

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    store
                        .register(&format!("Attendee {i}"), &format!("555-000{i}"))
                        .unwrap();
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let reopened = RecordStore::open(dir.path().join("attendees.csv")).unwrap();
        assert_eq!(reopened.len(), 8);
    }

    #[test]
    fn test_concurrent_duplicate_registration_admits_one() {
        let (_dir, store) = create_test_store();
        let store = Arc::new(store);

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || store.register("Ana", "555-1111").is_ok())
            })
            .collect();
        let successes = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|ok| *ok)
            .count();

        assert_eq!(successes, 1);
        assert_eq!(store.len(), 1);
    }
}
