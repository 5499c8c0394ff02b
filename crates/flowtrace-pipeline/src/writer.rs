//! Main log writer: append-only, line-serialized so concurrent emitters
//! never interleave partial lines (§4.4 "Concurrency").

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::sync::Mutex;

use camino::Utf8Path;

/// Append-only writer for the main JSONL log, guarded by a mutex so a
/// full line is always written atomically with respect to other
/// emitters in the same process.
pub struct LogWriter {
    file: Mutex<File>,
    stdout: bool,
}

impl LogWriter {
    pub fn open(path: &Utf8Path, stdout: bool) -> std::io::Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
            stdout,
        })
    }

    /// Write one complete JSON line. Writer errors are the caller's to
    /// handle (§7 `EmissionError`: logged once, rate-limited, and the
    /// event dropped -- never propagated into the instrumented program).
    pub fn write_line(&self, line: &str) -> std::io::Result<()> {
        let mut file = self
            .file
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        writeln!(file, "{line}")?;
        file.flush()?;
        if self.stdout {
            println!("{line}");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino::Utf8PathBuf;

    #[test]
    fn appends_lines_without_interleaving() {
        let dir = tempfile::tempdir().unwrap();
        let path = Utf8PathBuf::from_path_buf(dir.path().join("log.jsonl")).unwrap();
        let writer = LogWriter::open(&path, false).unwrap();
        writer.write_line("{\"a\":1}").unwrap();
        writer.write_line("{\"a\":2}").unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "{\"a\":1}\n{\"a\":2}\n");
    }

    #[test]
    fn creates_parent_directory_on_open() {
        let dir = tempfile::tempdir().unwrap();
        let path = Utf8PathBuf::from_path_buf(dir.path().join("nested/log.jsonl")).unwrap();
        let writer = LogWriter::open(&path, false).unwrap();
        writer.write_line("{}").unwrap();
        assert!(path.is_file());
    }
}
