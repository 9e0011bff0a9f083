use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use super::error::SourceError;
use super::log_io::LogTailer;

/// Pull-model line source: `Ok(None)` means nothing new right now.
pub trait LineSource {
    fn read_line(&mut self) -> Result<Option<String>, SourceError>;
}

impl LineSource for VecDeque<String> {
    fn read_line(&mut self) -> Result<Option<String>, SourceError> {
        Ok(self.pop_front())
    }
}

/// One character's log, tailed and buffered a line at a time.
pub struct TrackedGamelog {
    tailer: LogTailer,
    buffered: VecDeque<String>,
    pub character: String,
    path: PathBuf,
}

impl TrackedGamelog {
    /// Start following `path` from its current end.
    pub fn new(character: impl Into<String>, path: impl AsRef<Path>) -> Result<Self, SourceError> {
        let path = path.as_ref().to_path_buf();
        Ok(Self {
            tailer: LogTailer::open(&path)?,
            buffered: VecDeque::new(),
            character: character.into(),
            path,
        })
    }

    /// Every line the tailer has that was not handed out yet.
    pub fn read_new_lines(&mut self) -> Result<Vec<String>, SourceError> {
        let mut lines: Vec<String> = self.buffered.drain(..).collect();
        lines.extend(self.tailer.read_new_lines()?);
        Ok(lines)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl LineSource for TrackedGamelog {
    fn read_line(&mut self) -> Result<Option<String>, SourceError> {
        if self.buffered.is_empty() {
            self.buffered.extend(self.tailer.read_new_lines()?);
        }
        Ok(self.buffered.pop_front())
    }
}
