use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use super::config::Settings;
use super::emit::Emitter;
use super::players::PlayerStore;
use super::session::CombatSession;
use super::tracker::LineSource;
use super::watcher::LogWatcher;

/// Upper bound on lines handled by one `tick`, so commands are not starved
/// while a large backlog is processed.
const MAX_LINES_PER_TICK: usize = 1000;

/// Operator commands, delivered between lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Status,
    Flush,
    Quit,
}

impl Command {
    pub fn parse(input: &str) -> Option<Self> {
        match input.trim().to_ascii_lowercase().as_str() {
            "status" => Some(Self::Status),
            "flush" => Some(Self::Flush),
            "quit" | "exit" => Some(Self::Quit),
            _ => None,
        }
    }
}

pub struct CoordinatorOutput {
    pub lines_read: usize,
    pub logs: Vec<String>,
}

pub struct Coordinator<E: Emitter> {
    watcher: LogWatcher,
    session: Option<CombatSession>,
    settings: Settings,
    emitter: E,
    players: Option<PlayerStore>,
    /// When the last log line was read, to age the log clock while idle.
    last_line_at: Option<Instant>,
}

impl<E: Emitter> Coordinator<E> {
    pub fn new(settings: Settings, emitter: E, players: Option<PlayerStore>) -> Self {
        let watcher = LogWatcher::new(
            settings.log_dir.clone(),
            settings.character.clone(),
            settings.heartbeat(),
        );
        Self {
            watcher,
            session: None,
            settings,
            emitter,
            players,
            last_line_at: None,
        }
    }

    pub fn emitter(&self) -> &E {
        &self.emitter
    }

    pub fn session(&self) -> Option<&CombatSession> {
        self.session.as_ref()
    }

    /// Rescan if due, then process available lines until none are left or `stop` is set.
    pub fn tick(&mut self, now: Instant, stop: &AtomicBool) -> CoordinatorOutput {
        let mut logs = self.watcher.update(now);
        self.sync_session(&mut logs);

        let mut lines_read = 0;
        while lines_read < MAX_LINES_PER_TICK && !stop.load(Ordering::Relaxed) {
            let line = match self.watcher.read_line() {
                Ok(Some(line)) => line,
                Ok(None) => break,
                Err(e) => {
                    log::warn!("Error reading log: {}", e);
                    logs.push(format!("Error reading log: {}", e));
                    break;
                }
            };
            lines_read += 1;

            let Some(session) = self.session.as_mut() else {
                continue;
            };
            for message in session.process_line(&line) {
                self.emitter.emit(&message);
            }
            let discovered = session.take_discovered_players();
            if !discovered.is_empty() {
                self.remember_players(&discovered);
            }
        }

        if lines_read > 0 {
            self.last_line_at = Some(now);
        } else {
            self.poll_idle(now);
        }

        CoordinatorOutput { lines_read, logs }
    }

    /// Timeouts still fire while the log is quiet: the log clock is advanced
    /// by the wall-clock time since the last line arrived.
    fn poll_idle(&mut self, now: Instant) {
        let (Some(session), Some(seen)) = (self.session.as_mut(), self.last_line_at) else {
            return;
        };
        let Some(last) = session.last_timestamp() else {
            return;
        };
        let Ok(idle) = chrono::Duration::from_std(now.saturating_duration_since(seen)) else {
            return;
        };
        for message in session.poll_timeouts(last + idle) {
            self.emitter.emit(&message);
        }
    }

    /// Start a fresh session whenever the followed log changes owner.
    fn sync_session(&mut self, logs: &mut Vec<String>) {
        let Some(character) = self.watcher.character() else {
            return;
        };
        if self
            .session
            .as_ref()
            .is_some_and(|session| session.player().eq_ignore_ascii_case(character))
        {
            return;
        }

        let character = character.to_string();
        self.flush_session();

        let mut session = CombatSession::new(&character, self.settings.session_config());
        if let Some(store) = &self.players {
            for name in store.players().iter() {
                session.add_known_player(name);
            }
        }
        logs.push(format!("Tracking combat for {}", character));
        self.session = Some(session);
        self.last_line_at = None;
    }

    fn remember_players(&mut self, names: &[String]) {
        let Some(store) = self.players.as_mut() else {
            return;
        };
        if store.extend(names.iter().map(String::as_str)) == 0 {
            return;
        }
        if let Err(e) = store.save() {
            log::warn!("Failed to save player cache {}: {}", store.path().display(), e);
        }
    }

    fn flush_session(&mut self) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let Some(at) = session.last_timestamp() else {
            return;
        };
        for message in session.flush(at) {
            self.emitter.emit(&message);
        }
    }

    /// Apply one operator command. Returns false when the loop should stop.
    pub fn handle_command(&mut self, command: Command) -> bool {
        match command {
            Command::Status => {
                let status = match &self.session {
                    Some(session) => session.status(),
                    None => format!("Waiting for a log in {}", self.watcher.log_dir().display()),
                };
                self.emitter.emit(&status);
                true
            }
            Command::Flush => {
                self.flush_session();
                true
            }
            Command::Quit => {
                self.flush_session();
                false
            }
        }
    }
}
