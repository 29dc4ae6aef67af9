use std::collections::HashSet;
use std::fs::{self, OpenOptions};
use std::io::{BufRead, BufReader, ErrorKind, Write};
use std::path::{Path, PathBuf};

use crate::error::Result;

/// One finished date range.
#[derive(Debug, Clone, PartialEq)]
pub struct RunLogEntry {
    pub born_before: String,
    pub born_after: String,
    /// Identifiers collected for the range, whether or not all were stored.
    pub animal_count: usize,
    pub elapsed_secs: f64,
}

impl RunLogEntry {
    pub fn to_line(&self) -> String {
        format!(
            "{},{},{},{}\n",
            self.born_before, self.born_after, self.animal_count, self.elapsed_secs
        )
    }
}

/// Append-only `born_before,born_after,animal_count,elapsed_seconds` file.
pub struct RunLog {
    path: PathBuf,
}

impl RunLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        RunLog { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&self, entry: &RunLogEntry) -> Result<()> {
        let mut f = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        f.write_all(entry.to_line().as_bytes())?;
        Ok(())
    }

    /// Sidecar holding the search filters the log was written under.
    fn filters_path(&self) -> PathBuf {
        let mut p = self.path.clone().into_os_string();
        p.push(".filters");
        p.into()
    }

    pub fn filters(&self) -> Result<Option<String>> {
        match fs::read_to_string(self.filters_path()) {
            Ok(s) => Ok(Some(s.trim().to_string())),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn set_filters(&self, key: &str) -> Result<()> {
        fs::write(self.filters_path(), format!("{}\n", key))?;
        Ok(())
    }

    /// `(born_before, born_after)` pairs already logged. A missing file
    /// means nothing has run yet.
    pub fn completed(&self) -> Result<HashSet<(String, String)>> {
        let file = match fs::File::open(&self.path) {
            Ok(f) => f,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(HashSet::new()),
            Err(e) => return Err(e.into()),
        };
        let mut done = HashSet::new();
        for line in BufReader::new(file).lines() {
            let line = line?;
            let mut parts = line.splitn(3, ',');
            if let (Some(before), Some(after), Some(_)) = (parts.next(), parts.next(), parts.next()) {
                done.insert((before.to_string(), after.to_string()));
            }
        }
        Ok(done)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(before: &str, after: &str, count: usize) -> RunLogEntry {
        RunLogEntry {
            born_before: before.into(),
            born_after: after.into(),
            animal_count: count,
            elapsed_secs: 12.5,
        }
    }

    #[test]
    fn line_format() {
        assert_eq!(
            entry("06/30/2008", "01/01/2008", 42).to_line(),
            "06/30/2008,01/01/2008,42,12.5\n"
        );
        assert_eq!(entry("", "07/01/2008", 0).to_line(), ",07/01/2008,0,12.5\n");
    }

    #[test]
    fn appends_never_rewrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("written.txt");
        std::fs::write(&path, "earlier,run,1,1.0\n").unwrap();

        let log = RunLog::new(&path);
        log.append(&entry("06/30/2008", "01/01/2008", 3)).unwrap();
        log.append(&entry("12/31/2008", "07/01/2008", 5)).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            text,
            "earlier,run,1,1.0\n06/30/2008,01/01/2008,3,12.5\n12/31/2008,07/01/2008,5,12.5\n"
        );
    }

    #[test]
    fn filters_sit_next_to_the_log() {
        let dir = tempfile::tempdir().unwrap();
        let log = RunLog::new(dir.path().join("written.txt"));
        assert_eq!(log.filters().unwrap(), None);

        log.set_filters("object31,object:29,0").unwrap();
        assert_eq!(log.filters().unwrap().as_deref(), Some("object31,object:29,0"));
        assert!(dir.path().join("written.txt.filters").exists());
        assert!(!log.path().exists());
    }

    #[test]
    fn completed_reads_pairs_back() {
        let dir = tempfile::tempdir().unwrap();
        let log = RunLog::new(dir.path().join("written.txt"));
        assert!(log.completed().unwrap().is_empty());

        log.append(&entry("06/30/2008", "01/01/2008", 3)).unwrap();
        log.append(&entry("", "07/01/2008", 0)).unwrap();
        let done = log.completed().unwrap();
        assert_eq!(done.len(), 2);
        assert!(done.contains(&("06/30/2008".to_string(), "01/01/2008".to_string())));
        assert!(done.contains(&(String::new(), "07/01/2008".to_string())));
    }
}
