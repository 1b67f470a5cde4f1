//! Storage Layer
//!
//! Records SOS incidents raised by driver monitoring sessions, either in
//! memory or appended to a local JSON-lines file.

mod file_store;
mod record;
mod repository;

pub use file_store::JsonFileStore;
pub use record::{SosRecord, SosStatus, SOS_DETAILS};
pub use repository::Repository;

use dms::ReportError;
use thiserror::Error;

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Record not found: {0}")]
    NotFound(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("Lock error: {0}")]
    Lock(String),
}

impl From<StorageError> for ReportError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::Lock(msg) => ReportError::Unavailable(msg),
            other => ReportError::Write(other.to_string()),
        }
    }
}

/// Common operations over stored SOS records
pub trait SosStore {
    /// Persist a record
    fn insert(&self, record: SosRecord) -> Result<(), StorageError>;

    /// All records, oldest first
    fn list(&self) -> Result<Vec<SosRecord>, StorageError>;

    /// Mark a record as handled
    fn action(&self, id: &str) -> Result<SosRecord, StorageError>;

    fn get(&self, id: &str) -> Result<SosRecord, StorageError> {
        self.list()?
            .into_iter()
            .find(|r| r.id == id)
            .ok_or_else(|| StorageError::NotFound(id.to_string()))
    }

    /// Records not yet actioned
    fn pending(&self) -> Result<Vec<SosRecord>, StorageError> {
        Ok(self
            .list()?
            .into_iter()
            .filter(|r| r.status == SosStatus::New)
            .collect())
    }

    fn count(&self) -> Result<usize, StorageError> {
        Ok(self.list()?.len())
    }
}
