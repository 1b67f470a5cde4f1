//! Local JSON-lines SOS store
//!
//! One record per line, appended on insert. Used when no remote backend
//! is configured; the file survives restarts and can be tailed.

use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, info, warn};

use crate::{SosRecord, SosStore, StorageError};
use dms::{IncidentReporter, Location, ReportError};

/// One non-blank line of the store file
enum StoredLine {
    Record(SosRecord),
    /// Unparsable line, written back untouched on rewrite
    Raw(String),
}

/// Append-only SOS file
pub struct JsonFileStore {
    path: PathBuf,
    /// Serializes writers within this process
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    /// Open a store at `path`; the file is created on first insert
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        info!("Using SOS file store at {}", path.display());
        Self {
            path,
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn guard(&self) -> Result<std::sync::MutexGuard<'_, ()>, StorageError> {
        self.write_lock
            .lock()
            .map_err(|e| StorageError::Lock(e.to_string()))
    }

    fn ensure_parent(&self) -> Result<(), StorageError> {
        match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => Ok(fs::create_dir_all(dir)?),
            _ => Ok(()),
        }
    }

    fn read_records(&self) -> Result<Vec<SosRecord>, StorageError> {
        Ok(self
            .read_lines()?
            .into_iter()
            .filter_map(|line| match line {
                StoredLine::Record(record) => Some(record),
                StoredLine::Raw(_) => None,
            })
            .collect())
    }

    fn read_lines(&self) -> Result<Vec<StoredLine>, StorageError> {
        let file = match File::open(&self.path) {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut lines = Vec::new();
        for (line_no, line) in BufReader::new(file).lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<SosRecord>(&line) {
                Ok(record) => lines.push(StoredLine::Record(record)),
                Err(e) => {
                    warn!(
                        "Skipping corrupt SOS line {} in {}: {}",
                        line_no + 1,
                        self.path.display(),
                        e
                    );
                    lines.push(StoredLine::Raw(line));
                }
            }
        }
        Ok(lines)
    }

    /// Replace the file contents atomically
    ///
    /// The temp file is synced before the rename so a crash leaves either
    /// the old or the new contents on disk.
    fn rewrite(&self, lines: &[StoredLine]) -> Result<(), StorageError> {
        let tmp = self.path.with_extension("tmp");
        {
            let mut writer = BufWriter::new(File::create(&tmp)?);
            for line in lines {
                match line {
                    StoredLine::Record(record) => {
                        let json = serde_json::to_string(record)
                            .map_err(|e| StorageError::Serialization(e.to_string()))?;
                        writeln!(writer, "{}", json)?;
                    }
                    StoredLine::Raw(raw) => writeln!(writer, "{}", raw)?,
                }
            }
            writer.flush()?;
            writer.get_ref().sync_all()?;
        }
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl SosStore for JsonFileStore {
    fn insert(&self, record: SosRecord) -> Result<(), StorageError> {
        let line = serde_json::to_string(&record)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;

        let _guard = self.guard()?;
        self.ensure_parent()?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{}", line)?;
        file.sync_data()?;

        debug!("Appended SOS record {} to {}", record.id, self.path.display());
        Ok(())
    }

    fn list(&self) -> Result<Vec<SosRecord>, StorageError> {
        let _guard = self.guard()?;
        self.read_records()
    }

    fn action(&self, id: &str) -> Result<SosRecord, StorageError> {
        let _guard = self.guard()?;
        let mut lines = self.read_lines()?;
        let record = lines
            .iter_mut()
            .find_map(|line| match line {
                StoredLine::Record(r) if r.id == id => Some(r),
                _ => None,
            })
            .ok_or_else(|| StorageError::NotFound(id.to_string()))?;
        record.mark_actioned();
        let updated = record.clone();

        self.rewrite(&lines)?;
        info!("SOS record {} actioned", id);
        Ok(updated)
    }
}

impl IncidentReporter for JsonFileStore {
    fn raise_sos(&self, location: Option<&Location>) -> Result<String, ReportError> {
        let record = SosRecord::new(location);
        let id = record.id.clone();
        self.insert(record)?;
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SosStatus;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_is_empty() {
        let dir = tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("sos.jsonl"));
        assert!(store.list().unwrap().is_empty());
    }

    #[test]
    fn test_records_survive_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("sos.jsonl");

        let id = {
            let store = JsonFileStore::new(&path);
            store.raise_sos(Some(&Location::new(1.0, 2.0, "Here"))).unwrap()
        };

        let reopened = JsonFileStore::new(&path);
        let record = reopened.get(&id).unwrap();
        assert_eq!(record.status, SosStatus::New);
        assert_eq!(record.location.unwrap().address, "Here");
    }

    #[test]
    fn test_action_rewrites_file() {
        let dir = tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("sos.jsonl"));
        let first = store.raise_sos(None).unwrap();
        let second = store.raise_sos(None).unwrap();

        store.action(&second).unwrap();

        let records = store.list().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id, first);
        assert_eq!(records[0].status, SosStatus::New);
        assert_eq!(records[1].status, SosStatus::Actioned);
        assert!(records[1].actioned_at.is_some());
    }

    #[test]
    fn test_corrupt_lines_are_skipped() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("sos.jsonl");
        let store = JsonFileStore::new(&path);
        store.raise_sos(None).unwrap();

        let mut file = OpenOptions::new().append(true).open(&path).unwrap();
        writeln!(file, "{{not json").unwrap();
        drop(file);
        store.raise_sos(None).unwrap();

        assert_eq!(store.count().unwrap(), 2);
    }

    #[test]
    fn test_action_keeps_unreadable_lines() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("sos.jsonl");
        let store = JsonFileStore::new(&path);
        let id = store.raise_sos(None).unwrap();

        // Torn write from an earlier crash
        let truncated = r#"{"id":"8f1c","status":"NEW","creat"#;
        let mut file = OpenOptions::new().append(true).open(&path).unwrap();
        writeln!(file, "{}", truncated).unwrap();
        drop(file);

        store.action(&id).unwrap();

        let contents = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().filter(|l| !l.trim().is_empty()).collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1], truncated);
        assert_eq!(store.get(&id).unwrap().status, SosStatus::Actioned);
        assert!(!path.with_extension("tmp").exists());
    }

    #[test]
    fn test_unwritable_path_reports_error() {
        let dir = tempdir().unwrap();
        // A directory where the file should be
        let store = JsonFileStore::new(dir.path());
        assert!(store.raise_sos(None).is_err());
    }
}
