use std::fmt;
use std::fs::{File, OpenOptions};
use std::io;
use std::os::unix::fs::OpenOptionsExt;

/// A redirection file that could not be opened: the path as the user
/// wrote it plus the OS reason. Aborts the pipeline launch.
#[derive(Debug)]
pub struct RedirectError {
    pub path: String,
    pub source: io::Error,
}

impl RedirectError {
    fn new(path: &str, source: io::Error) -> Self {
        RedirectError {
            path: path.to_string(),
            source,
        }
    }
}

impl fmt::Display for RedirectError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.source)
    }
}

/// `< path`: read-only, the file must already exist.
pub fn open_input(path: &str) -> Result<File, RedirectError> {
    File::open(path).map_err(|e| RedirectError::new(path, e))
}

/// `> path`: created 0644 when absent, truncated when present.
pub fn open_output(path: &str) -> Result<File, RedirectError> {
    OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o644)
        .open(path)
        .map_err(|e| RedirectError::new(path, e))
}
