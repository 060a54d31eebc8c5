//! Flat line-record files
//!
//! One record per line, no header. Full rewrites go through a temp file that
//! is synced and renamed over the target, so a crash mid-write leaves the
//! previous content in place.
//!
//! The files are not locked. A second process writing the same data
//! directory can interleave with this one and corrupt state; each data
//! directory must be owned by a single running instance.

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use super::error::{StorageError, StorageResult};

/// A durable file of newline-terminated records
#[derive(Debug, Clone)]
pub struct RecordFile {
    path: PathBuf,
}

impl RecordFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read every line of the file
    ///
    /// A missing file reads as empty: a fresh data directory has no records yet.
    pub fn read_lines(&self) -> StorageResult<Vec<String>> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StorageError::from_read(e, self.path.clone())),
        };

        BufReader::new(file)
            .lines()
            .collect::<io::Result<Vec<_>>>()
            .map_err(|e| StorageError::from_read(e, self.path.clone()))
    }

    /// Append a single line, creating the file if needed
    pub fn append_line(&self, line: &str) -> StorageResult<()> {
        ensure_parent(&self.path)?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| StorageError::from_io(e, self.path.clone()))?;

        writeln!(file, "{}", line)
            .and_then(|_| file.sync_all())
            .map_err(|e| StorageError::from_io(e, self.path.clone()))
    }

    /// Replace the whole file with `lines`
    pub fn rewrite<I, S>(&self, lines: I) -> StorageResult<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut data = String::new();
        for line in lines {
            data.push_str(line.as_ref());
            data.push('\n');
        }
        atomic_write(&self.path, data.as_bytes())
    }

    /// Rewrite lines for which `edit` returns a replacement
    ///
    /// Returns `false` without touching the file when no line matched.
    pub fn update_where<F>(&self, mut edit: F) -> StorageResult<bool>
    where
        F: FnMut(&str) -> Option<String>,
    {
        let mut matched = false;
        let lines: Vec<String> = self
            .read_lines()?
            .into_iter()
            .map(|line| match edit(&line) {
                Some(replacement) => {
                    matched = true;
                    replacement
                }
                None => line,
            })
            .collect();

        if matched {
            self.rewrite(lines)?;
        }
        Ok(matched)
    }
}

fn ensure_parent(path: &Path) -> StorageResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|source| StorageError::CreateDirectory {
                path: parent.to_path_buf(),
                source,
            })?;
        }
    }
    Ok(())
}

/// Write data to a file atomically
///
/// 1. Write to a temporary file in the same directory
/// 2. Sync the file to disk
/// 3. Rename the temp file to the target path
fn atomic_write(path: &Path, data: &[u8]) -> StorageResult<()> {
    ensure_parent(path)?;

    let temp_path = path.with_extension("tmp");

    {
        let mut file =
            File::create(&temp_path).map_err(|e| StorageError::from_io(e, temp_path.clone()))?;
        file.write_all(data)
            .and_then(|_| file.sync_all())
            .map_err(|e| StorageError::from_io(e, temp_path.clone()))?;
    }

    fs::rename(&temp_path, path).map_err(|source| {
        let _ = fs::remove_file(&temp_path);
        StorageError::AtomicWriteFailed {
            from: temp_path.clone(),
            to: path.to_path_buf(),
            source,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_reads_empty() {
        let temp_dir = TempDir::new().unwrap();
        let file = RecordFile::new(temp_dir.path().join("equipment.txt"));

        assert!(!file.path().exists());
        assert!(file.read_lines().unwrap().is_empty());
    }

    #[test]
    fn test_append_and_read() {
        let temp_dir = TempDir::new().unwrap();
        let file = RecordFile::new(temp_dir.path().join("equipment.txt"));

        file.append_line("EQ001, Camera, Available, 2024-01-01, Good")
            .unwrap();
        file.append_line("EQ002, Tripod, Available, N/A, Brand New")
            .unwrap();

        let lines = file.read_lines().unwrap();
        assert_eq!(lines.len(), 2);
        assert!(lines[1].starts_with("EQ002"));
    }

    #[test]
    fn test_rewrite_replaces_content() {
        let temp_dir = TempDir::new().unwrap();
        let file = RecordFile::new(temp_dir.path().join("lending_records.txt"));

        file.append_line("first").unwrap();
        file.append_line("second").unwrap();
        file.rewrite(["only"]).unwrap();

        assert_eq!(file.read_lines().unwrap(), vec!["only"]);
        assert!(!temp_dir.path().join("lending_records.tmp").exists());
    }

    #[test]
    fn test_rewrite_empty_truncates() {
        let temp_dir = TempDir::new().unwrap();
        let file = RecordFile::new(temp_dir.path().join("lending_records.txt"));

        file.append_line("first").unwrap();
        file.rewrite(Vec::<String>::new()).unwrap();

        assert!(file.path().exists());
        assert!(file.read_lines().unwrap().is_empty());
    }

    #[test]
    fn test_update_where_without_match_leaves_file() {
        let temp_dir = TempDir::new().unwrap();
        let file = RecordFile::new(temp_dir.path().join("equipment.txt"));
        file.append_line("EQ001, Camera").unwrap();

        let matched = file
            .update_where(|line| line.starts_with("EQ999").then(|| "x".to_string()))
            .unwrap();

        assert!(!matched);
        assert_eq!(file.read_lines().unwrap(), vec!["EQ001, Camera"]);
    }

    #[test]
    fn test_update_where_rewrites_matching_lines() {
        let temp_dir = TempDir::new().unwrap();
        let file = RecordFile::new(temp_dir.path().join("equipment.txt"));
        file.append_line("EQ001, Camera").unwrap();
        file.append_line("EQ002, Tripod").unwrap();

        let matched = file
            .update_where(|line| {
                line.starts_with("EQ002")
                    .then(|| "EQ002, Light Stand".to_string())
            })
            .unwrap();

        assert!(matched);
        assert_eq!(
            file.read_lines().unwrap(),
            vec!["EQ001, Camera", "EQ002, Light Stand"]
        );
    }

    #[test]
    fn test_append_creates_parent_dirs() {
        let temp_dir = TempDir::new().unwrap();
        let nested = temp_dir.path().join("a").join("b").join("records.txt");
        let file = RecordFile::new(&nested);

        file.append_line("line").unwrap();
        assert!(nested.exists());
    }
}
