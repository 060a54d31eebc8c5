//! Typed view over a record file

use std::marker::PhantomData;
use std::path::Path;

use tracing::{debug, warn};

use super::codec::{line_id, split_fields, LineRecord, MalformedRecord};
use super::error::StorageResult;
use super::file::RecordFile;

/// Records of one type stored one per line
#[derive(Debug, Clone)]
pub struct Table<T> {
    file: RecordFile,
    _record: PhantomData<T>,
}

impl<T: LineRecord> Table<T> {
    pub fn new(file: RecordFile) -> Self {
        Self {
            file,
            _record: PhantomData,
        }
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Load every well-formed record
    ///
    /// Malformed lines are reported with their line number and skipped so
    /// that one bad line never aborts the load.
    pub fn load(&self) -> StorageResult<Vec<T>> {
        let (records, rejected) = self.load_with_rejects()?;
        for (line_no, err) in &rejected {
            warn!(path = ?self.path(), line = *line_no, "Skipping {}", err);
        }
        debug!(
            path = ?self.path(),
            loaded = records.len(),
            skipped = rejected.len(),
            "Loaded {} records",
            T::KIND
        );
        Ok(records)
    }

    /// Load records, returning the rejected lines (1-based) alongside
    pub fn load_with_rejects(&self) -> StorageResult<(Vec<T>, Vec<(usize, MalformedRecord)>)> {
        let mut records = Vec::new();
        let mut rejected = Vec::new();

        for (idx, line) in self.file.read_lines()?.iter().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match T::decode(line) {
                Ok(record) => records.push(record),
                Err(err) => rejected.push((idx + 1, err)),
            }
        }
        Ok((records, rejected))
    }

    pub fn append(&self, record: &T) -> StorageResult<()> {
        self.file.append_line(&record.encode())
    }

    /// Overwrite the file with exactly `records`
    pub fn save_all<'a, I>(&self, records: I) -> StorageResult<()>
    where
        I: IntoIterator<Item = &'a T>,
        T: 'a,
    {
        self.file.rewrite(records.into_iter().map(LineRecord::encode))
    }

    /// Rewrite the line whose identifier matches `record`
    ///
    /// Returns `false`, leaving the file untouched, when no line matched.
    pub fn replace(&self, record: &T) -> StorageResult<bool> {
        let id = record.record_id();
        self.file.update_where(|line| {
            (line_id(line) == Some(id) && split_fields(line).len() == T::FIELD_COUNT)
                .then(|| record.encode())
        })
    }

    /// Rewrite every line whose identifier `record_for` maps to a record
    ///
    /// Lines mapped to `None` are kept as stored. All changes land in a
    /// single rewrite. Returns the number of lines changed.
    pub fn replace_each<'a, F>(&self, mut record_for: F) -> StorageResult<usize>
    where
        F: FnMut(&str) -> Option<&'a T>,
        T: 'a,
    {
        let mut changed = 0;
        self.file.update_where(|line| {
            if split_fields(line).len() != T::FIELD_COUNT {
                return None;
            }
            let record = record_for(line_id(line)?)?;
            changed += 1;
            Some(record.encode())
        })?;
        Ok(changed)
    }
}
