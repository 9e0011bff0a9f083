use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use super::discovery;
use super::error::SourceError;
use super::tracker::{LineSource, TrackedGamelog};

/// Keeps the newest character log open.
///
/// The log directory is rescanned at most once per heartbeat; when a newer
/// log shows up (the player logged in another character, or the client
/// rotated the file) the watcher switches to it and starts at its end.
pub struct LogWatcher {
    log_dir: PathBuf,
    character: Option<String>,
    heartbeat: Duration,
    current: Option<TrackedGamelog>,
    last_scan: Option<Instant>,
}

impl LogWatcher {
    pub fn new(log_dir: PathBuf, character: Option<String>, heartbeat: Duration) -> Self {
        Self {
            log_dir,
            character,
            heartbeat,
            current: None,
            last_scan: None,
        }
    }

    pub fn log_dir(&self) -> &Path {
        &self.log_dir
    }

    /// Owner of the log currently being followed.
    pub fn character(&self) -> Option<&str> {
        self.current.as_ref().map(|log| log.character.as_str())
    }

    pub fn current_path(&self) -> Option<&Path> {
        self.current.as_ref().map(TrackedGamelog::path)
    }

    fn scan_due(&self, now: Instant) -> bool {
        self.last_scan
            .map_or(true, |last| now.duration_since(last) >= self.heartbeat)
    }

    /// Re-open the newest log if the heartbeat is due.
    /// Returns status messages (e.g. "Started tracking ...").
    pub fn update(&mut self, now: Instant) -> Vec<String> {
        let mut messages = Vec::new();
        if !self.scan_due(now) {
            return messages;
        }
        self.last_scan = Some(now);

        let latest = match discovery::find_latest_log(&self.log_dir, self.character.as_deref()) {
            Ok(Some(latest)) => latest,
            Ok(None) => {
                if self.current.is_none() {
                    log::debug!("No character logs in {}", self.log_dir.display());
                }
                return messages;
            }
            Err(e) => {
                log::warn!("{}", e);
                messages.push(format!("Failed to scan log directory: {:?}", self.log_dir));
                return messages;
            }
        };

        if self.current_path() == Some(latest.path.as_path()) {
            return messages;
        }

        match TrackedGamelog::new(latest.character.clone(), &latest.path) {
            Ok(log) => {
                log::info!("Tracking {} ({})", latest.character, latest.path.display());
                messages.push(format!("Started tracking: {}", latest.character));
                self.current = Some(log);
            }
            Err(e) => {
                log::warn!("{}", e);
                messages.push(format!("Failed to track {:?}: {}", latest.path, e));
            }
        }
        messages
    }

}

impl LineSource for LogWatcher {
    fn read_line(&mut self) -> Result<Option<String>, SourceError> {
        match self.current.as_mut() {
            Some(log) => log.read_line(),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::{File, OpenOptions};
    use std::io::Write;
    use std::time::SystemTime;
    use tempfile::tempdir;

    fn create_log(dir: &Path, name: &str, age_secs: u64) -> PathBuf {
        let path = dir.join(name);
        let mut file = File::create(&path).unwrap();
        writeln!(file, "[Wed Mar 13 21:00:00 2024] Welcome to EverQuest!").unwrap();
        file.set_modified(SystemTime::now() - Duration::from_secs(age_secs))
            .unwrap();
        path
    }

    #[test]
    fn test_watcher_lifecycle() {
        let dir = tempdir().unwrap();
        let path = create_log(dir.path(), "eqlog_Soandso_P1999Green.txt", 60);

        let mut watcher = LogWatcher::new(dir.path().to_path_buf(), None, Duration::from_secs(60));
        assert_eq!(watcher.read_line().unwrap(), None);

        let start = Instant::now();
        let msgs = watcher.update(start);
        assert_eq!(msgs, vec!["Started tracking: Soandso".to_string()]);
        assert_eq!(watcher.character(), Some("Soandso"));

        // Existing content is skipped.
        assert_eq!(watcher.read_line().unwrap(), None);

        let mut file = OpenOptions::new().append(true).open(&path).unwrap();
        writeln!(file, "[Wed Mar 13 21:00:05 2024] You gain experience!!").unwrap();
        file.sync_all().unwrap();
        assert_eq!(
            watcher.read_line().unwrap().as_deref(),
            Some("[Wed Mar 13 21:00:05 2024] You gain experience!!")
        );

        // Same newest file on the next heartbeat: nothing changes.
        assert!(watcher.update(start + Duration::from_secs(61)).is_empty());
    }

    #[test]
    fn test_heartbeat_switches_to_newer_log() {
        let dir = tempdir().unwrap();
        create_log(dir.path(), "eqlog_Soandso_P1999Green.txt", 600);

        let mut watcher = LogWatcher::new(dir.path().to_path_buf(), None, Duration::from_secs(60));
        let start = Instant::now();
        watcher.update(start);
        assert_eq!(watcher.character(), Some("Soandso"));

        create_log(dir.path(), "eqlog_Gobaner_P1999Green.txt", 0);
        assert!(watcher.update(start + Duration::from_secs(30)).is_empty());
        assert_eq!(watcher.character(), Some("Soandso"));

        let msgs = watcher.update(start + Duration::from_secs(60));
        assert_eq!(msgs, vec!["Started tracking: Gobaner".to_string()]);
        assert_eq!(watcher.character(), Some("Gobaner"));
    }

    #[test]
    fn test_character_filter() {
        let dir = tempdir().unwrap();
        create_log(dir.path(), "eqlog_Soandso_P1999Green.txt", 600);
        create_log(dir.path(), "eqlog_Gobaner_P1999Green.txt", 0);

        let mut watcher = LogWatcher::new(
            dir.path().to_path_buf(),
            Some("Soandso".to_string()),
            Duration::ZERO,
        );
        watcher.update(Instant::now());
        assert_eq!(watcher.character(), Some("Soandso"));
    }

    #[test]
    fn test_missing_dir_reports_once_per_scan() {
        let dir = tempdir().unwrap();
        let mut watcher = LogWatcher::new(dir.path().join("nope"), None, Duration::ZERO);
        let msgs = watcher.update(Instant::now());
        assert_eq!(msgs.len(), 1);
        assert!(msgs[0].starts_with("Failed to scan"));
    }
}
