use std::fs::{self, File};
use std::io::{BufRead, BufReader, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use super::error::SourceError;

/// Follows one append-only log file from a byte offset.
///
/// Only complete lines are returned. A trailing line the client has not
/// finished writing stays unread until its newline arrives.
pub struct LogTailer {
    file: File,
    position: u64,
    path: PathBuf,
}

impl LogTailer {
    /// Open positioned at the current end of file, so only new lines are read.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, SourceError> {
        let mut tailer = Self::open_from_start(path)?;
        tailer.position = tailer
            .file
            .metadata()
            .map_err(|source| tailer.read_error(source))?
            .len();
        Ok(tailer)
    }

    pub fn open_from_start(path: impl AsRef<Path>) -> Result<Self, SourceError> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path).map_err(|source| SourceError::Open {
            path: path.clone(),
            source,
        })?;
        Ok(Self {
            file,
            position: 0,
            path,
        })
    }

    fn read_error(&self, source: std::io::Error) -> SourceError {
        SourceError::Read {
            path: self.path.clone(),
            source,
        }
    }

    pub fn read_new_lines(&mut self) -> Result<Vec<String>, SourceError> {
        let mut lines = Vec::new();

        let len = self
            .file
            .metadata()
            .map_err(|source| self.read_error(source))?
            .len();
        if len < self.position {
            log::info!("{} was truncated, reading from the start", self.path.display());
            self.position = 0;
        }

        self.file
            .seek(SeekFrom::Start(self.position))
            .map_err(|source| self.read_error(source))?;
        let mut reader = BufReader::new(&self.file);
        let mut buffer = Vec::new();

        loop {
            buffer.clear();
            let bytes_read = reader
                .read_until(b'\n', &mut buffer)
                .map_err(|source| SourceError::Read {
                    path: self.path.clone(),
                    source,
                })?;
            if bytes_read == 0 || buffer.last() != Some(&b'\n') {
                break;
            }
            self.position += bytes_read as u64;
            // The client writes Latin-1 item names now and then.
            let line = String::from_utf8_lossy(&buffer);
            lines.push(line.trim_end_matches(&['\r', '\n'][..]).to_string());
        }

        Ok(lines)
    }

    pub fn position(&self) -> u64 {
        self.position
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Every line of a finished log, from the start.
pub fn read_full_lines(path: impl AsRef<Path>) -> Result<Vec<String>, SourceError> {
    let path = path.as_ref();
    let bytes = fs::read(path).map_err(|source| SourceError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(String::from_utf8_lossy(&bytes)
        .lines()
        .map(str::to_string)
        .collect())
}
