//! Repository Implementation

use crate::{SosRecord, SosStore, StorageError};
use dms::{IncidentReporter, Location, ReportError};
use std::collections::VecDeque;
use std::sync::Mutex;
use tracing::{debug, info};

/// In-memory SOS repository
pub struct Repository {
    /// Records, oldest first
    records: Mutex<VecDeque<SosRecord>>,
    /// Max records kept
    max_records: usize,
}

impl Repository {
    /// Create a new in-memory repository
    pub fn new() -> Self {
        Self::with_capacity(10_000)
    }

    /// Create a repository that keeps at most `max_records`
    pub fn with_capacity(max_records: usize) -> Self {
        info!("Creating in-memory SOS repository (max {} records)", max_records);
        Self {
            records: Mutex::new(VecDeque::new()),
            max_records: max_records.max(1),
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, VecDeque<SosRecord>>, StorageError> {
        self.records
            .lock()
            .map_err(|e| StorageError::Lock(e.to_string()))
    }
}

impl SosStore for Repository {
    fn insert(&self, record: SosRecord) -> Result<(), StorageError> {
        let mut records = self.lock()?;

        // Enforce retention
        while records.len() >= self.max_records {
            records.pop_front();
        }

        debug!("Inserted SOS record {}", record.id);
        records.push_back(record);
        Ok(())
    }

    fn list(&self) -> Result<Vec<SosRecord>, StorageError> {
        Ok(self.lock()?.iter().cloned().collect())
    }

    fn action(&self, id: &str) -> Result<SosRecord, StorageError> {
        let mut records = self.lock()?;
        let record = records
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| StorageError::NotFound(id.to_string()))?;
        record.mark_actioned();
        info!("SOS record {} actioned", id);
        Ok(record.clone())
    }
}

impl IncidentReporter for Repository {
    fn raise_sos(&self, location: Option<&Location>) -> Result<String, ReportError> {
        let record = SosRecord::new(location);
        let id = record.id.clone();
        self.insert(record)?;
        Ok(id)
    }
}

impl Default for Repository {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SosStatus;

    #[test]
    fn test_raise_and_retrieve() {
        let repo = Repository::new();
        let location = Location::new(1.3, 103.8, "Depot");

        let id = repo.raise_sos(Some(&location)).unwrap();

        let record = repo.get(&id).unwrap();
        assert_eq!(record.status, SosStatus::New);
        assert_eq!(record.location, Some(location));
        assert_eq!(repo.count().unwrap(), 1);
    }

    #[test]
    fn test_action_removes_from_pending() {
        let repo = Repository::new();
        let first = repo.raise_sos(None).unwrap();
        let second = repo.raise_sos(None).unwrap();

        let actioned = repo.action(&first).unwrap();
        assert_eq!(actioned.status, SosStatus::Actioned);

        let pending = repo.pending().unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, second);
    }

    #[test]
    fn test_unknown_id() {
        let repo = Repository::new();
        assert!(matches!(repo.get("missing"), Err(StorageError::NotFound(_))));
        assert!(matches!(repo.action("missing"), Err(StorageError::NotFound(_))));
    }

    #[test]
    fn test_retention_limit() {
        let repo = Repository::with_capacity(5);
        let ids: Vec<_> = (0..10).map(|_| repo.raise_sos(None).unwrap()).collect();

        let records = repo.list().unwrap();
        assert_eq!(records.len(), 5);
        assert_eq!(records[0].id, ids[5]);
    }
}
