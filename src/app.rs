use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

use crate::core::{
    config::{ConfigManager, Settings},
    coordinator::{Command, Coordinator},
    emit::StdoutEmitter,
    players::PlayerStore,
    replay,
};

/// Tail an EverQuest log and report damage per fight.
#[derive(Parser, Debug)]
#[command(name = "eqtracker", version, about)]
struct Cli {
    /// Directory holding settings.json and the player cache.
    #[arg(long)]
    config_dir: Option<PathBuf>,

    /// EverQuest Logs directory.
    #[arg(long)]
    log_dir: Option<PathBuf>,

    /// Only follow this character's log.
    #[arg(long)]
    character: Option<String>,

    /// Process a finished log file from the start and exit.
    #[arg(long, value_name = "FILE")]
    replay: Option<PathBuf>,

    /// Debug logging.
    #[arg(short, long)]
    verbose: bool,

    /// Write the effective settings back to settings.json.
    #[arg(long)]
    save_config: bool,
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = if verbose {
        EnvFilter::new(default)
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn apply_cli(settings: &mut Settings, cli: &Cli) {
    if let Some(dir) = &cli.log_dir {
        settings.log_dir = dir.clone();
    }
    if let Some(character) = &cli.character {
        settings.character = Some(character.clone());
    }
}

/// Forward operator commands typed on stdin to the run loop.
async fn read_commands(tx: mpsc::Sender<Command>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                if line.trim().is_empty() {
                    continue;
                }
                match Command::parse(&line) {
                    Some(command) => {
                        if tx.send(command).await.is_err() {
                            return;
                        }
                    }
                    None => log::warn!("Unknown command {:?} (status, flush, quit)", line.trim()),
                }
            }
            Ok(None) => return,
            Err(e) => {
                log::warn!("Failed to read stdin: {}", e);
                return;
            }
        }
    }
}

async fn run_live(settings: Settings, players: PlayerStore) {
    let poll_interval = settings.poll_interval();
    let emitter = StdoutEmitter::new(settings.chunk_limit);
    let mut coordinator = Coordinator::new(settings, emitter, Some(players));

    let stop = Arc::new(AtomicBool::new(false));
    let ctrl_c_stop = stop.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c_stop.store(true, Ordering::Relaxed);
        }
    });

    let (tx, mut rx) = mpsc::channel(32);
    tokio::spawn(read_commands(tx));

    let mut quit_handled = false;
    while !stop.load(Ordering::Relaxed) {
        while let Ok(command) = rx.try_recv() {
            if !coordinator.handle_command(command) {
                quit_handled = true;
                stop.store(true, Ordering::Relaxed);
                break;
            }
        }
        if stop.load(Ordering::Relaxed) {
            break;
        }

        let output = coordinator.tick(Instant::now(), &stop);
        for message in &output.logs {
            log::info!("{}", message);
        }

        if output.lines_read == 0 {
            tokio::time::sleep(poll_interval).await;
        } else {
            tokio::task::yield_now().await;
        }
    }

    if !quit_handled {
        coordinator.handle_command(Command::Quit);
    }
    log::info!("Stopped");
}

fn run_replay(path: PathBuf, settings: &Settings, players: &PlayerStore) {
    let mut emitter = StdoutEmitter::new(settings.chunk_limit);
    match replay::replay_file(
        &path,
        settings.character.as_deref(),
        settings.session_config(),
        players.players(),
        &mut emitter,
    ) {
        Ok((_, summary)) => log::info!(
            "Replayed {} lines, {} messages",
            summary.lines,
            summary.messages
        ),
        Err(e) => {
            log::error!("{}", e);
            std::process::exit(1);
        }
    }
}

pub fn run() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config_manager = ConfigManager::new(
        cli.config_dir
            .clone()
            .unwrap_or_else(ConfigManager::default_dir),
    );
    let mut settings = config_manager.load();
    apply_cli(&mut settings, &cli);

    if cli.save_config {
        match config_manager.save(&settings) {
            Ok(()) => log::info!("Saved settings to {}", config_manager.config_dir().display()),
            Err(e) => log::warn!("Failed to save settings: {}", e),
        }
    }

    let players = PlayerStore::load(config_manager.player_cache_path(&settings));
    log::debug!("{} known players", players.players().len());

    if let Some(path) = cli.replay.clone() {
        run_replay(path, &settings, &players);
        return;
    }

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            log::error!("Failed to start runtime: {}", e);
            std::process::exit(1);
        }
    };

    log::info!("Monitoring {}", settings.log_dir.display());
    runtime.block_on(run_live(settings, players));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_overrides_settings() {
        let cli = Cli::parse_from([
            "eqtracker",
            "--log-dir",
            "/tmp/Logs",
            "--character",
            "Soandso",
            "--verbose",
        ]);
        let mut settings = Settings::default();
        apply_cli(&mut settings, &cli);
        assert_eq!(settings.log_dir, PathBuf::from("/tmp/Logs"));
        assert_eq!(settings.character.as_deref(), Some("Soandso"));
        assert!(cli.verbose);
        assert!(cli.replay.is_none());
    }

    #[test]
    fn test_cli_replay_flag() {
        let cli = Cli::parse_from(["eqtracker", "--replay", "eqlog_Soandso_P1999Green.txt"]);
        assert_eq!(
            cli.replay,
            Some(PathBuf::from("eqlog_Soandso_P1999Green.txt"))
        );
        let mut settings = Settings::default();
        let before = settings.clone();
        apply_cli(&mut settings, &cli);
        assert_eq!(settings, before);
    }
}
