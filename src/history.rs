use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

/// Store of previously accepted lines, shared by the read loop, the
/// `history` built-in and `!N` recall. Lookup is 1-indexed because
/// that is how the listing is printed and recalled.
pub struct HistoryStore {
    entries: Vec<String>,
    max_len: usize,
    file_path: Option<PathBuf>,
}

impl HistoryStore {
    /// An in-memory store with no backing file.
    pub fn new(max_len: usize) -> Self {
        HistoryStore {
            entries: Vec::new(),
            max_len,
            file_path: None,
        }
    }

    /// Loads the backing file; a missing or unreadable file yields an
    /// empty store bound to the same path.
    pub fn load(path: &Path, max_len: usize) -> Self {
        let mut entries = Vec::new();
        if let Ok(file) = File::open(path) {
            for line in BufReader::new(file).lines().map_while(Result::ok) {
                if !line.trim().is_empty() {
                    entries.push(line);
                }
            }
        }
        // Keep only the newest max_len entries.
        if entries.len() > max_len {
            entries.drain(..entries.len() - max_len);
        }
        HistoryStore {
            entries,
            max_len,
            file_path: Some(path.to_path_buf()),
        }
    }

    pub fn save(&self) -> std::io::Result<()> {
        if let Some(path) = &self.file_path {
            let mut file = OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(true)
                .open(path)?;
            for line in &self.entries {
                writeln!(file, "{}", line)?;
            }
        }
        Ok(())
    }

    /// Records one accepted line. Blank lines and a line identical to
    /// the previous entry are not recorded; the oldest entry is evicted
    /// once the store is full.
    pub fn add(&mut self, line: &str) {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return;
        }
        if self.entries.last().is_some_and(|last| last == trimmed) {
            return;
        }
        self.entries.push(trimmed.to_string());
        if self.entries.len() > self.max_len {
            self.entries.remove(0);
        }
    }

    /// The n'th stored line, 1-indexed; `None` for 0 or out of range.
    pub fn entry(&self, n: usize) -> Option<&str> {
        if n == 0 {
            return None;
        }
        self.entries.get(n - 1).map(|s| s.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn last(&self) -> Option<&str> {
        self.entries.last().map(|s| s.as_str())
    }
}
