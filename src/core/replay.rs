use std::collections::VecDeque;
use std::path::Path;

use super::discovery;
use super::emit::Emitter;
use super::error::SourceError;
use super::log_io;
use super::names::NameSet;
use super::session::{CombatSession, SessionConfig};
use super::tracker::LineSource;

/// Owner name used when a replayed file does not follow the client's naming.
pub const FALLBACK_PLAYER: &str = "You";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReplaySummary {
    pub lines: usize,
    pub messages: usize,
}

/// Drain `source` through `session`, then close whatever is still active at
/// the last timestamp seen.
pub fn replay_source<S: LineSource, E: Emitter>(
    source: &mut S,
    session: &mut CombatSession,
    emitter: &mut E,
) -> Result<ReplaySummary, SourceError> {
    let mut summary = ReplaySummary::default();

    while let Some(line) = source.read_line()? {
        summary.lines += 1;
        for message in session.process_line(&line) {
            emitter.emit(&message);
            summary.messages += 1;
        }
    }

    if let Some(at) = session.last_timestamp() {
        for message in session.flush(at) {
            emitter.emit(&message);
            summary.messages += 1;
        }
    }
    Ok(summary)
}

/// Replay a finished log file from its first line.
pub fn replay_file<E: Emitter>(
    path: impl AsRef<Path>,
    player: Option<&str>,
    config: SessionConfig,
    known_players: &NameSet,
    emitter: &mut E,
) -> Result<(CombatSession, ReplaySummary), SourceError> {
    let path = path.as_ref();
    let player = player
        .map(str::to_string)
        .or_else(|| discovery::character_from_path(path))
        .unwrap_or_else(|| FALLBACK_PLAYER.to_string());

    let mut lines: VecDeque<String> = log_io::read_full_lines(path)?.into();
    log::info!("Replaying {} lines of {} as {}", lines.len(), path.display(), player);

    let mut session = CombatSession::new(&player, config);
    for name in known_players.iter() {
        session.add_known_player(name);
    }
    let summary = replay_source(&mut lines, &mut session, emitter)?;
    Ok((session, summary))
}
