use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use ghost_maze_sim::config::SimConfig;
use ghost_maze_sim::constants::{TICK_MS, TICK_RATE};
use ghost_maze_sim::engine::GameEngine;
use ghost_maze_sim::players::StartPlayer;
use ghost_maze_sim::types::Vec2;
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::Mutex;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

type SharedState = Arc<Mutex<RunnerState>>;

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    #[arg(long, default_value_t = 2)]
    players: usize,
    #[arg(long)]
    seed: Option<u32>,
    #[arg(long)]
    config: Option<PathBuf>,
    /// Ticks between printed snapshots.
    #[arg(long, default_value_t = TICK_RATE as u64)]
    snapshot_every: u64,
}

struct RunnerState {
    game: GameEngine,
    snapshot_every: u64,
    ticks_since_snapshot: u64,
    summary_sent: bool,
}

#[derive(Clone, Debug, PartialEq)]
enum Command {
    Pause,
    Resume,
    Reset,
    Strike,
    Interrupt,
    Spawn { delay_ms: u64 },
    Kill { ghost_id: String, player_id: Option<String> },
    Hit { ghost_id: String, player_id: String },
    Move { player_id: String, position: Vec2 },
    Snapshot,
    Quit,
}

#[tokio::main]
async fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    let cli = Cli::parse();
    let config = match cli.config.as_deref() {
        Some(path) => match SimConfig::load(path) {
            Ok(config) => config,
            Err(err) => {
                error!(error = %err, "config_load_failed");
                std::process::exit(2);
            }
        },
        None => SimConfig::default(),
    };
    let seed = cli.seed.unwrap_or_else(rand::random);
    let start_players: Vec<StartPlayer> = (0..cli.players)
        .map(|idx| StartPlayer {
            id: format!("p{}", idx + 1),
            name: format!("Player {}", idx + 1),
        })
        .collect();
    let game = match GameEngine::new(config, &start_players, seed) {
        Ok(game) => game,
        Err(err) => {
            error!(error = %err, "engine_setup_failed");
            std::process::exit(2);
        }
    };
    info!(seed, players = cli.players, "runner started");

    let state = Arc::new(Mutex::new(RunnerState {
        game,
        snapshot_every: cli.snapshot_every.max(1),
        ticks_since_snapshot: 0,
        summary_sent: false,
    }));
    start_tick_loop(state.clone());

    tokio::select! {
        _ = read_commands(state.clone()) => {}
        result = tokio::signal::ctrl_c() => {
            if let Err(err) = result {
                warn!(error = %err, "ctrl_c_listener_failed");
            }
            let mut guard = state.lock().await;
            guard.game.pause();
            guard.game.interrupt_lightning();
            info!("interrupted by ctrl-c");
        }
    }

    let guard = state.lock().await;
    emit(&json!({
        "type": "summary",
        "summary": guard.game.build_summary(),
    }));
}

fn start_tick_loop(state: SharedState) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_millis(TICK_MS));
        loop {
            interval.tick().await;
            let mut guard = state.lock().await;
            tick_game(&mut guard);
        }
    });
}

fn tick_game(state: &mut RunnerState) {
    state.game.step(TICK_MS);
    state.ticks_since_snapshot += 1;
    if state.ticks_since_snapshot >= state.snapshot_every {
        state.ticks_since_snapshot = 0;
        emit(&json!({
            "type": "state",
            "snapshot": state.game.build_snapshot(true),
        }));
    }

    if state.game.is_ended() && !state.summary_sent {
        state.summary_sent = true;
        emit(&json!({
            "type": "game_over",
            "summary": state.game.build_summary(),
        }));
    }
}

async fn read_commands(state: SharedState) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => return,
            Err(err) => {
                warn!(error = %err, "stdin_read_failed");
                return;
            }
        };
        let Some(command) = parse_command(&line) else {
            if !line.trim().is_empty() {
                warn!(line = %line.trim(), "unknown_command");
            }
            continue;
        };
        if command == Command::Quit {
            return;
        }
        let mut guard = state.lock().await;
        let reply = apply_command(&mut guard, command);
        emit(&reply);
    }
}

fn apply_command(state: &mut RunnerState, command: Command) -> Value {
    let game = &mut state.game;
    match command {
        Command::Pause => json!({ "type": "ack", "command": "pause", "changed": game.pause() }),
        Command::Resume => json!({ "type": "ack", "command": "resume", "changed": game.resume() }),
        Command::Reset => {
            game.reset();
            state.summary_sent = false;
            json!({ "type": "ack", "command": "reset" })
        }
        Command::Strike => {
            let outcome = game.trigger_lightning();
            json!({ "type": "ack", "command": "strike", "outcome": format!("{outcome:?}") })
        }
        Command::Interrupt => {
            let cancelled = game.interrupt_lightning();
            json!({ "type": "ack", "command": "interrupt", "cancelled": cancelled })
        }
        Command::Spawn { delay_ms } => {
            game.request_spawn(delay_ms);
            json!({ "type": "ack", "command": "spawn", "delayMs": delay_ms })
        }
        Command::Kill {
            ghost_id,
            player_id,
        } => {
            let ack = game.notify_ghost_killed(&ghost_id, player_id.as_deref(), None);
            json!({ "type": "ack", "command": "kill", "result": format!("{ack:?}") })
        }
        Command::Hit {
            ghost_id,
            player_id,
        } => {
            let outcome = game.notify_player_hit(&ghost_id, &player_id);
            json!({ "type": "ack", "command": "hit", "result": format!("{outcome:?}") })
        }
        Command::Move {
            player_id,
            position,
        } => {
            let moved = game.set_player_position(&player_id, position);
            json!({ "type": "ack", "command": "move", "changed": moved })
        }
        Command::Snapshot => json!({
            "type": "state",
            "snapshot": game.build_snapshot(false),
        }),
        Command::Quit => json!({ "type": "ack", "command": "quit" }),
    }
}

fn parse_command(raw: &str) -> Option<Command> {
    let mut parts = raw.split_whitespace();
    let name = parts.next()?.to_ascii_lowercase();
    let command = match name.as_str() {
        "pause" => Command::Pause,
        "resume" => Command::Resume,
        "reset" | "r" => Command::Reset,
        "strike" => Command::Strike,
        "interrupt" => Command::Interrupt,
        "spawn" => Command::Spawn {
            delay_ms: match parts.next() {
                None => 0,
                Some(value) => value.parse().ok()?,
            },
        },
        "kill" => Command::Kill {
            ghost_id: parts.next()?.to_string(),
            player_id: parts.next().map(str::to_string),
        },
        "hit" => Command::Hit {
            ghost_id: parts.next()?.to_string(),
            player_id: parts.next()?.to_string(),
        },
        "move" => {
            let player_id = parts.next()?.to_string();
            let x: f32 = parts.next()?.parse().ok()?;
            let y: f32 = parts.next()?.parse().ok()?;
            if !x.is_finite() || !y.is_finite() {
                return None;
            }
            Command::Move {
                player_id,
                position: Vec2::new(x, y),
            }
        }
        "snapshot" => Command::Snapshot,
        "quit" | "exit" => Command::Quit,
        _ => return None,
    };
    if parts.next().is_some() {
        return None;
    }
    Some(command)
}

fn emit(message: &Value) {
    println!("{message}");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_simple_commands() {
        assert_eq!(parse_command("pause"), Some(Command::Pause));
        assert_eq!(parse_command("  RESUME "), Some(Command::Resume));
        assert_eq!(parse_command("r"), Some(Command::Reset));
        assert_eq!(parse_command("quit"), Some(Command::Quit));
    }

    #[test]
    fn parse_spawn_delay() {
        assert_eq!(parse_command("spawn"), Some(Command::Spawn { delay_ms: 0 }));
        assert_eq!(
            parse_command("spawn 1500"),
            Some(Command::Spawn { delay_ms: 1_500 })
        );
        assert_eq!(parse_command("spawn soon"), None);
    }

    #[test]
    fn parse_kill_with_optional_player() {
        assert_eq!(
            parse_command("kill ghost_3"),
            Some(Command::Kill {
                ghost_id: "ghost_3".to_string(),
                player_id: None
            })
        );
        assert_eq!(
            parse_command("kill ghost_3 p2"),
            Some(Command::Kill {
                ghost_id: "ghost_3".to_string(),
                player_id: Some("p2".to_string())
            })
        );
    }

    #[test]
    fn parse_move_rejects_non_finite_coordinates() {
        assert_eq!(
            parse_command("move p1 3 4.5"),
            Some(Command::Move {
                player_id: "p1".to_string(),
                position: Vec2::new(3.0, 4.5)
            })
        );
        assert_eq!(parse_command("move p1 NaN 2"), None);
        assert_eq!(parse_command("move p1 2"), None);
    }

    #[test]
    fn trailing_arguments_are_rejected() {
        assert_eq!(parse_command("pause now"), None);
        assert_eq!(parse_command("spawn 10 20"), None);
        assert_eq!(parse_command("hit ghost_1 p1 p2"), None);
    }

    #[test]
    fn missing_arguments_and_unknown_commands_are_rejected() {
        assert_eq!(parse_command("hit ghost_1"), None);
        assert_eq!(parse_command("kill"), None);
        assert_eq!(parse_command("dance"), None);
        assert_eq!(parse_command(""), None);
    }

    #[test]
    fn apply_command_toggles_pause() {
        let players = [StartPlayer {
            id: "p1".to_string(),
            name: "P1".to_string(),
        }];
        let game = GameEngine::new(SimConfig::default(), &players, 3).expect("engine should build");
        let mut state = RunnerState {
            game,
            snapshot_every: 1,
            ticks_since_snapshot: 0,
            summary_sent: false,
        };
        let reply = apply_command(&mut state, Command::Pause);
        assert_eq!(reply["changed"], true);
        let reply = apply_command(&mut state, Command::Pause);
        assert_eq!(reply["changed"], false);
        tick_game(&mut state);
        assert_eq!(state.game.tick(), 0);
    }
}
