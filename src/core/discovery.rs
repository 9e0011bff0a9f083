//! Log discovery for EverQuest log files.
//!
//! The client writes one file per character and server into its `Logs`
//! directory, named `eqlog_<Character>_<server>.txt`. The character name in
//! the file name is the only place the log owner is recorded.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

use super::error::SourceError;

const LOG_PREFIX: &str = "eqlog_";

/// One character log found on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharacterLog {
    pub character: String,
    pub server: String,
    pub path: PathBuf,
    pub last_modified: SystemTime,
    pub file_size: u64,
}

/// Split `eqlog_Soandso_P1999Green.txt` into `("Soandso", "P1999Green")`.
pub fn parse_log_filename(filename: &str) -> Option<(String, String)> {
    let stem = filename
        .strip_suffix(".txt")
        .or_else(|| filename.strip_suffix(".TXT"))?;
    let rest = stem.strip_prefix(LOG_PREFIX)?;
    let (character, server) = rest.split_once('_')?;
    if character.is_empty() || server.is_empty() {
        return None;
    }
    Some((character.to_string(), server.to_string()))
}

/// Character name of a log file path, if it follows the client's naming.
pub fn character_from_path(path: &Path) -> Option<String> {
    path.file_name()
        .and_then(|n| n.to_str())
        .and_then(parse_log_filename)
        .map(|(character, _)| character)
}

/// Every character log in `dir`, most recently written first.
pub fn scan_logs_dir(dir: impl AsRef<Path>) -> Result<Vec<CharacterLog>, SourceError> {
    let dir = dir.as_ref();
    let scan_error = |source| SourceError::Scan {
        path: dir.to_path_buf(),
        source,
    };

    let mut logs = Vec::new();
    for entry in fs::read_dir(dir).map_err(scan_error)? {
        let path = entry.map_err(scan_error)?.path();
        if !path.is_file() {
            continue;
        }

        let Some((character, server)) = path
            .file_name()
            .and_then(|n| n.to_str())
            .and_then(parse_log_filename)
        else {
            continue;
        };

        let metadata = fs::metadata(&path).map_err(scan_error)?;
        logs.push(CharacterLog {
            character,
            server,
            last_modified: metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH),
            file_size: metadata.len(),
            path,
        });
    }

    logs.sort_by(|a, b| b.last_modified.cmp(&a.last_modified));
    Ok(logs)
}

/// Most recently written log, optionally restricted to one character.
pub fn find_latest_log(
    dir: impl AsRef<Path>,
    character: Option<&str>,
) -> Result<Option<CharacterLog>, SourceError> {
    let logs = scan_logs_dir(dir)?;
    Ok(logs.into_iter().find(|log| {
        character.map_or(true, |wanted| log.character.eq_ignore_ascii_case(wanted))
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use std::time::Duration;
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
    fn test_parse_log_filename() {
        assert_eq!(
            parse_log_filename("eqlog_Soandso_P1999Green.txt"),
            Some(("Soandso".to_string(), "P1999Green".to_string()))
        );
        assert_eq!(
            parse_log_filename("eqlog_Soandso_project_1999.txt"),
            Some(("Soandso".to_string(), "project_1999".to_string()))
        );
        assert_eq!(parse_log_filename("eqlog_Soandso.txt"), None);
        assert_eq!(parse_log_filename("dbg.txt"), None);
        assert_eq!(parse_log_filename("eqlog_Soandso_server.log"), None);
    }

    #[test]
    fn test_character_from_path() {
        let path = PathBuf::from("/games/EverQuest/Logs/eqlog_Gobaner_P1999Green.txt");
        assert_eq!(character_from_path(&path), Some("Gobaner".to_string()));
        assert_eq!(character_from_path(Path::new("/tmp/notes.txt")), None);
    }

    #[test]
    fn test_scan_sorts_newest_first() {
        let dir = tempdir().unwrap();
        create_log(dir.path(), "eqlog_Soandso_P1999Green.txt", 600);
        create_log(dir.path(), "eqlog_Gobaner_P1999Green.txt", 10);
        create_log(dir.path(), "UIErrors.txt", 0);
        fs::create_dir(dir.path().join("eqlog_Dir_notafile.txt")).unwrap();

        let logs = scan_logs_dir(dir.path()).unwrap();
        assert_eq!(logs.len(), 2);
        assert_eq!(logs[0].character, "Gobaner");
        assert_eq!(logs[1].character, "Soandso");
    }

    #[test]
    fn test_find_latest_log_by_character() {
        let dir = tempdir().unwrap();
        create_log(dir.path(), "eqlog_Soandso_P1999Green.txt", 600);
        create_log(dir.path(), "eqlog_Gobaner_P1999Green.txt", 10);

        let newest = find_latest_log(dir.path(), None).unwrap().unwrap();
        assert_eq!(newest.character, "Gobaner");

        let wanted = find_latest_log(dir.path(), Some("soandso")).unwrap().unwrap();
        assert_eq!(wanted.character, "Soandso");

        assert!(find_latest_log(dir.path(), Some("Nobody")).unwrap().is_none());
    }

    #[test]
    fn test_missing_dir_is_scan_error() {
        let dir = tempdir().unwrap();
        let err = scan_logs_dir(dir.path().join("nope")).unwrap_err();
        assert!(matches!(err, SourceError::Scan { .. }));
    }
}
