use super::record::LogRecord;
use chrono::Local;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Append-only log file that archives itself once it reaches `max_bytes`.
#[derive(Debug)]
pub struct RotatingFile {
    path: PathBuf,
    max_bytes: u64,
    size: u64,
}

impl RotatingFile {
    /// Open (creating if missing) the active log file.
    pub fn open(path: impl Into<PathBuf>, max_bytes: u64) -> io::Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        let size = file.metadata()?.len();
        Ok(Self {
            path,
            max_bytes,
            size,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    /// Rotate if the active file is at or over the limit, then append the batch.
    ///
    /// Returns the archive path when a rotation happened.
    pub fn write_batch(&mut self, batch: &[LogRecord]) -> io::Result<Option<PathBuf>> {
        let archived = self.rotate_if_needed()?;

        let mut buffer = String::new();
        for record in batch {
            buffer.push_str(&record.to_string());
            buffer.push('\n');
        }

        let mut file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        file.write_all(buffer.as_bytes())?;
        file.flush()?;
        self.size = file.metadata()?.len();

        Ok(archived)
    }

    fn rotate_if_needed(&mut self) -> io::Result<Option<PathBuf>> {
        // The file may have been removed or truncated externally.
        self.size = match fs::metadata(&self.path) {
            Ok(meta) => meta.len(),
            Err(e) if e.kind() == io::ErrorKind::NotFound => 0,
            Err(e) => return Err(e),
        };
        if self.size < self.max_bytes {
            return Ok(None);
        }

        let archive = self.archive_path();
        fs::rename(&self.path, &archive)?;
        File::create(&self.path)?;
        self.size = 0;
        Ok(Some(archive))
    }

    /// `<stem>_<YYYYmmdd_HHMMSS>.log`, with a counter when that name is taken.
    fn archive_path(&self) -> PathBuf {
        let stem = self
            .path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "log".to_string());
        let stamp = Local::now().format("%Y%m%d_%H%M%S").to_string();
        let dir = self.path.parent().unwrap_or_else(|| Path::new(""));

        let mut candidate = dir.join(format!("{stem}_{stamp}.log"));
        let mut counter = 1;
        while candidate.exists() {
            candidate = dir.join(format!("{stem}_{stamp}_{counter}.log"));
            counter += 1;
        }
        candidate
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::record::Severity;
    use tempfile::TempDir;

    fn batch(count: usize) -> Vec<LogRecord> {
        (0..count)
            .map(|i| LogRecord::new(Severity::Info, "TEST", format!("message number {i}")))
            .collect()
    }

    fn archives(dir: &Path) -> Vec<PathBuf> {
        fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().path())
            .filter(|p| p.file_name().unwrap() != "app.log")
            .collect()
    }

    #[test]
    fn test_creates_missing_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested/app.log");
        let file = RotatingFile::open(&path, 1024).unwrap();
        assert!(path.exists());
        assert_eq!(file.size(), 0);
    }

    #[test]
    fn test_no_rotation_below_limit() {
        let dir = TempDir::new().unwrap();
        let mut file = RotatingFile::open(dir.path().join("app.log"), 10_000).unwrap();
        assert!(file.write_batch(&batch(3)).unwrap().is_none());
        assert!(file.write_batch(&batch(3)).unwrap().is_none());
        assert!(archives(dir.path()).is_empty());
        let content = fs::read_to_string(file.path()).unwrap();
        assert_eq!(content.lines().count(), 6);
    }

    #[test]
    fn test_rotates_once_limit_exceeded() {
        let dir = TempDir::new().unwrap();
        let limit = 200;
        let mut file = RotatingFile::open(dir.path().join("app.log"), limit).unwrap();

        file.write_batch(&batch(10)).unwrap();
        assert!(file.size() > limit);

        let archived = file.write_batch(&batch(1)).unwrap().expect("should rotate");
        assert!(file.size() < limit);

        let found = archives(dir.path());
        assert_eq!(found, vec![archived.clone()]);
        let name = archived.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("app_") && name.ends_with(".log"));
        assert_eq!(fs::read_to_string(&archived).unwrap().lines().count(), 10);
    }

    #[test]
    fn test_archive_names_stay_distinct() {
        let dir = TempDir::new().unwrap();
        let mut file = RotatingFile::open(dir.path().join("app.log"), 1).unwrap();
        file.write_batch(&batch(1)).unwrap();
        let first = file.write_batch(&batch(1)).unwrap().unwrap();
        let second = file.write_batch(&batch(1)).unwrap().unwrap();
        assert_ne!(first, second);
        assert_eq!(archives(dir.path()).len(), 2);
    }
}
