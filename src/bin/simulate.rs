use chrono::{SecondsFormat, Utc};
use clap::Parser;
use ghost_maze_sim::config::SimConfig;
use ghost_maze_sim::constants::{TICK_MS, TICK_RATE};
use ghost_maze_sim::engine::GameEngine;
use ghost_maze_sim::graph::WaypointGraph;
use ghost_maze_sim::players::StartPlayer;
use ghost_maze_sim::rng::Rng;
use ghost_maze_sim::types::{
    Direction, GameOverReason, GhostPhase, NodeId, RuntimeEvent, Snapshot, Vec2,
};
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

const BOT_SPEED: f32 = 3.0;
const TORCH_RANGE: f32 = 1.5;
const TORCH_WIDTH: f32 = 0.45;
const TORCH_COOLDOWN_MS: u64 = 1_000;
const RECOIL_DISTANCE: f32 = 1.0;

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    #[arg(long)]
    single: bool,
    #[arg(long)]
    players: Option<usize>,
    #[arg(long)]
    seconds: Option<u64>,
    #[arg(long)]
    seed: Option<u64>,
    #[arg(long)]
    match_id: Option<String>,
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    summary_out: Option<PathBuf>,
}

#[derive(Clone, Debug, Serialize)]
struct Scenario {
    name: String,
    players: usize,
    seconds: u64,
    seed: u32,
}

#[derive(Clone, Debug, Serialize)]
struct ScenarioResultLine {
    scenario: String,
    seed: u32,
    players: usize,
    seconds: u64,
    reason: String,
    #[serde(rename = "durationMs")]
    duration_ms: u64,
    spawns: u32,
    #[serde(rename = "spawnsDeferred")]
    spawns_deferred: u32,
    #[serde(rename = "spawnsAbandoned")]
    spawns_abandoned: u32,
    #[serde(rename = "ghostsKilled")]
    ghosts_killed: u32,
    #[serde(rename = "playerDeaths")]
    player_deaths: u32,
    strikes: u32,
    interrupts: u32,
    anomalies: Vec<String>,
}

#[derive(Clone, Debug, Serialize)]
struct AnomalyRecord {
    tick: u64,
    message: String,
}

#[derive(Clone, Debug, Serialize)]
struct ScenarioRunResult {
    #[serde(flatten)]
    result: ScenarioResultLine,
    #[serde(rename = "anomalyRecords")]
    anomaly_records: Vec<AnomalyRecord>,
    finished_tick: u64,
}

#[derive(Clone, Debug, Serialize)]
struct RunSummary {
    #[serde(rename = "matchId")]
    match_id: String,
    #[serde(rename = "startedAt")]
    started_at: String,
    #[serde(rename = "finishedAt")]
    finished_at: String,
    #[serde(rename = "scenarioCount")]
    scenario_count: usize,
    #[serde(rename = "anomalyCount")]
    anomaly_count: usize,
    #[serde(rename = "averageDurationMs")]
    average_duration_ms: u64,
    #[serde(rename = "reasonCounts")]
    reason_counts: BTreeMap<String, usize>,
    scenarios: Vec<ScenarioResultLine>,
}

/// A scripted player: walks the maze like a ghost does and sweeps its torch at nearby ghosts.
#[derive(Clone, Debug)]
struct Bot {
    id: String,
    position: Vec2,
    last_node: Option<NodeId>,
    target_node: NodeId,
    torch_ready_ms: u64,
}

impl Bot {
    fn seat(id: String, position: Vec2, graph: &WaypointGraph) -> Self {
        let node = graph.nearest_node(position).unwrap_or(NodeId(0));
        Self {
            id,
            position,
            last_node: None,
            target_node: node,
            torch_ready_ms: 0,
        }
    }

    fn walk(&mut self, dt_secs: f32, graph: &WaypointGraph, rng: &mut Rng) {
        let Some(target) = graph.position(self.target_node) else {
            return;
        };
        if self.position.distance(target) > 0.05 {
            self.position = self.position.step_toward(target, BOT_SPEED * dt_secs);
            return;
        }
        let reached = self.target_node;
        self.target_node = graph.next_node(reached, self.last_node, 0.05, rng);
        self.last_node = Some(reached);
    }

    fn aim(&self, snapshot: &Snapshot) -> Option<(String, Direction)> {
        snapshot
            .ghosts
            .iter()
            .filter(|ghost| ghost.active)
            .find_map(|ghost| {
                let delta = ghost.position - self.position;
                let direction = if delta.y.abs() <= TORCH_WIDTH && delta.x.abs() <= TORCH_RANGE {
                    if delta.x >= 0.0 {
                        Direction::Right
                    } else {
                        Direction::Left
                    }
                } else if delta.x.abs() <= TORCH_WIDTH && delta.y.abs() <= TORCH_RANGE {
                    if delta.y >= 0.0 {
                        Direction::Down
                    } else {
                        Direction::Up
                    }
                } else {
                    return None;
                };
                Some((ghost.id.clone(), direction))
            })
    }
}

fn main() {
    init_tracing();
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

    let scenarios = resolve_scenarios(&cli);
    let run_started_at = timestamp();
    let seed_hint = scenarios.first().map(|scenario| scenario.seed).unwrap_or(0);
    let match_id = cli
        .match_id
        .clone()
        .unwrap_or_else(|| default_match_id(seed_hint, Utc::now().timestamp_millis()));
    let mut has_anomaly = false;
    let mut scenario_results = Vec::new();
    let mut reason_counts: BTreeMap<String, usize> = BTreeMap::new();
    let mut total_duration_ms = 0u64;
    let mut total_anomalies = 0usize;

    for scenario in scenarios {
        emit_log(
            "info",
            "scenario_started",
            &match_id,
            Some(&scenario.name),
            Some(scenario.seed),
            None,
            json!({
                "players": scenario.players,
                "seconds": scenario.seconds,
            }),
        );
        let scenario_run = match run_scenario(&scenario, &config) {
            Ok(run) => run,
            Err(err) => {
                error!(error = %err, scenario = %scenario.name, "scenario_setup_failed");
                std::process::exit(2);
            }
        };

        for anomaly in &scenario_run.anomaly_records {
            emit_log(
                "warn",
                "anomaly_detected",
                &match_id,
                Some(&scenario.name),
                Some(scenario.seed),
                Some(anomaly.tick),
                json!({
                    "message": anomaly.message,
                }),
            );
        }

        if !scenario_run.result.anomalies.is_empty() {
            has_anomaly = true;
        }
        total_anomalies += scenario_run.anomaly_records.len();
        total_duration_ms += scenario_run.result.duration_ms;
        *reason_counts
            .entry(scenario_run.result.reason.clone())
            .or_insert(0) += 1;

        emit_log(
            "info",
            "scenario_finished",
            &match_id,
            Some(&scenario.name),
            Some(scenario.seed),
            Some(scenario_run.finished_tick),
            json!({
                "reason": scenario_run.result.reason,
                "durationMs": scenario_run.result.duration_ms,
                "ghostsKilled": scenario_run.result.ghosts_killed,
                "anomalyCount": scenario_run.anomaly_records.len(),
            }),
        );

        match serde_json::to_string(&scenario_run.result) {
            Ok(line) => println!("{line}"),
            Err(err) => error!(error = %err, "scenario_result_serialize_failed"),
        }
        scenario_results.push(scenario_run.result);
    }

    let summary = build_run_summary(
        match_id.clone(),
        run_started_at,
        timestamp(),
        scenario_results,
        reason_counts,
        total_anomalies,
        total_duration_ms,
    );

    let mut summary_out_written: Option<String> = None;
    if let Some(path) = cli.summary_out.as_ref() {
        if let Err(error) = write_summary(path, &summary) {
            emit_log(
                "error",
                "summary_write_failed",
                &match_id,
                None,
                None,
                None,
                json!({
                    "path": path.to_string_lossy(),
                    "error": error.to_string(),
                }),
            );
            std::process::exit(2);
        }
        summary_out_written = Some(path.to_string_lossy().to_string());
    }

    emit_log(
        "info",
        "run_finished",
        &match_id,
        None,
        None,
        None,
        json!({
            "scenarioCount": summary.scenario_count,
            "anomalyCount": summary.anomaly_count,
            "averageDurationMs": summary.average_duration_ms,
            "reasonCounts": summary.reason_counts,
            "summaryOut": summary_out_written,
        }),
    );

    if has_anomaly {
        std::process::exit(1);
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .json()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

fn run_scenario(
    scenario: &Scenario,
    config: &SimConfig,
) -> ghost_maze_sim::error::SimResult<ScenarioRunResult> {
    let start_players: Vec<StartPlayer> = (0..scenario.players)
        .map(|idx| StartPlayer {
            id: format!("bot_{}", idx + 1),
            name: format!("BOT-{:02}", idx + 1),
        })
        .collect();
    let mut engine = GameEngine::new(config.clone(), &start_players, scenario.seed)?;
    let mut bot_rng = Rng::new(scenario.seed.wrapping_mul(31).wrapping_add(7));
    let mut bots: Vec<Bot> = engine
        .build_snapshot(false)
        .players
        .iter()
        .map(|player| Bot::seat(player.id.clone(), player.position, engine.graph()))
        .collect();

    let mut anomalies = Vec::new();
    let mut anomaly_records = Vec::new();
    let mut anomaly_seen = HashSet::new();
    let mut strike_audit = StrikeAudit::default();
    let mut abandoned = 0u32;
    let mut last_tick = 0u64;
    let dt_secs = TICK_MS as f32 / 1_000.0;
    let max_ticks = scenario.seconds.saturating_mul(TICK_RATE as u64);

    while !engine.is_ended() && engine.tick() < max_ticks {
        for bot in &mut bots {
            bot.walk(dt_secs, engine.graph(), &mut bot_rng);
            engine.set_player_position(&bot.id, bot.position);
        }

        engine.step(TICK_MS);
        let snapshot = engine.build_snapshot(true);
        last_tick = snapshot.tick;

        for event in &snapshot.events {
            if let RuntimeEvent::SpawnAbandoned { .. } = event {
                abandoned += 1;
            }
            if let Some(message) = strike_audit.observe(event) {
                push_anomaly(
                    &mut anomalies,
                    &mut anomaly_records,
                    &mut anomaly_seen,
                    snapshot.tick,
                    message,
                );
            }
        }
        for message in collect_snapshot_anomalies(&snapshot, config, abandoned) {
            push_anomaly(
                &mut anomalies,
                &mut anomaly_records,
                &mut anomaly_seen,
                snapshot.tick,
                message,
            );
        }

        for bot in &mut bots {
            let Some(player) = snapshot.players.iter().find(|player| player.id == bot.id) else {
                continue;
            };
            if player.position != bot.position {
                *bot = Bot::seat(bot.id.clone(), player.position, engine.graph());
                bot.torch_ready_ms = snapshot.elapsed_ms + TORCH_COOLDOWN_MS;
                continue;
            }
            if snapshot.elapsed_ms < bot.torch_ready_ms {
                continue;
            }
            if let Some((ghost_id, direction)) = bot.aim(&snapshot) {
                let Some(ghost) = snapshot.ghosts.iter().find(|ghost| ghost.id == ghost_id) else {
                    continue;
                };
                let recoil = ghost.position + direction.unit() * RECOIL_DISTANCE;
                engine.notify_ghost_killed(&ghost_id, Some(&bot.id), Some(recoil));
                bot.torch_ready_ms = snapshot.elapsed_ms + TORCH_COOLDOWN_MS;
            }
        }
    }

    let summary = engine.build_summary();
    Ok(ScenarioRunResult {
        result: ScenarioResultLine {
            scenario: scenario.name.clone(),
            seed: scenario.seed,
            players: scenario.players,
            seconds: scenario.seconds,
            reason: game_over_reason_key(summary.reason),
            duration_ms: summary.duration_ms,
            spawns: summary.stats.spawns,
            spawns_deferred: summary.stats.spawns_deferred,
            spawns_abandoned: summary.stats.spawns_abandoned,
            ghosts_killed: summary.stats.ghosts_killed,
            player_deaths: summary.stats.player_deaths,
            strikes: summary.stats.strikes,
            interrupts: summary.stats.interrupts,
            anomalies,
        },
        anomaly_records,
        finished_tick: last_tick,
    })
}

/// Tracks the strike journal across ticks and flags out-of-order phases.
#[derive(Clone, Debug, Default)]
struct StrikeAudit {
    striking: bool,
    completed: Vec<usize>,
    running: Option<usize>,
}

impl StrikeAudit {
    fn observe(&mut self, event: &RuntimeEvent) -> Option<String> {
        match event {
            RuntimeEvent::LightningStarted => {
                let overlap = self.striking;
                *self = Self {
                    striking: true,
                    ..Self::default()
                };
                overlap.then(|| "strike started while another was running".to_string())
            }
            RuntimeEvent::LightningPhaseStarted { phase } => {
                let expected = self.completed.len();
                let ordered = self.striking && self.running.is_none() && *phase == expected;
                self.running = Some(*phase);
                (!ordered).then(|| format!("phase {phase} started out of order"))
            }
            RuntimeEvent::LightningPhaseCompleted { phase } => {
                let matched = self.running == Some(*phase);
                self.running = None;
                self.completed.push(*phase);
                (!matched).then(|| format!("phase {phase} completed without starting"))
            }
            RuntimeEvent::LightningFinished | RuntimeEvent::LightningInterrupted { .. } => {
                *self = Self::default();
                None
            }
            _ => None,
        }
    }
}

fn collect_snapshot_anomalies(
    snapshot: &Snapshot,
    config: &SimConfig,
    abandoned: u32,
) -> Vec<String> {
    let mut anomalies = Vec::new();
    let lightning = &snapshot.lightning;
    let tint = lightning.tint;
    if [tint.r, tint.g, tint.b, tint.a]
        .iter()
        .any(|value| !value.is_finite() || *value < 0.0 || *value > 1.0)
    {
        anomalies.push(format!("tint out of range: {tint:?}"));
    }
    if !lightning.striking {
        if lightning.pending_tasks > 0 {
            anomalies.push(format!(
                "idle lightning holds {} pending tasks",
                lightning.pending_tasks
            ));
        }
        if !tint.approx_eq(config.lightning.dark_tint, 1e-4) {
            anomalies.push("idle tint is not the dark baseline".to_string());
        }
        if lightning.ambient_light {
            anomalies.push("ambient light left on while idle".to_string());
        }
    }

    for ghost in &snapshot.ghosts {
        if !ghost.position.x.is_finite() || !ghost.position.y.is_finite() {
            anomalies.push(format!("ghost position is not finite: {}", ghost.id));
        }
        if ghost.active && matches!(ghost.phase, GhostPhase::Suppressed | GhostPhase::Removed) {
            anomalies.push(format!("ghost {} is active while {:?}", ghost.id, ghost.phase));
        }
        if ghost.phase == GhostPhase::Removed {
            anomalies.push(format!("removed ghost still tracked: {}", ghost.id));
        }
    }

    let accounted = snapshot.ghosts.len() + snapshot.pending_spawns + abandoned as usize;
    if !snapshot.ended && accounted < config.ghosts.start_count {
        anomalies.push(format!(
            "ghost population leaked: {accounted} of {} accounted for",
            config.ghosts.start_count
        ));
    }

    for player in &snapshot.players {
        if player.lives > config.players.lives {
            anomalies.push(format!("player {} has too many lives", player.id));
        }
    }
    anomalies
}

fn resolve_scenarios(cli: &Cli) -> Vec<Scenario> {
    let seed = normalize_seed(cli.seed.unwrap_or_else(|| {
        u64::try_from(Utc::now().timestamp_millis()).unwrap_or_default()
    }));

    if cli.single || cli.players.is_some() || cli.seconds.is_some() {
        let players = cli.players.unwrap_or(2).clamp(1, 4);
        return vec![Scenario {
            name: format!("custom-bots{players}"),
            players,
            seconds: cli.seconds.unwrap_or(60).clamp(1, 3_600),
            seed,
        }];
    }

    vec![
        Scenario {
            name: "quick-check-bots2".to_string(),
            players: 2,
            seconds: 60,
            seed,
        },
        Scenario {
            name: "crowded-check-bots4".to_string(),
            players: 4,
            seconds: 180,
            seed: normalize_seed(seed as u64 + 1),
        },
    ]
}

fn normalize_seed(seed: u64) -> u32 {
    seed as u32
}

fn push_anomaly(
    anomalies: &mut Vec<String>,
    anomaly_records: &mut Vec<AnomalyRecord>,
    anomaly_seen: &mut HashSet<String>,
    tick: u64,
    message: String,
) {
    anomaly_records.push(AnomalyRecord {
        tick,
        message: message.clone(),
    });
    if anomaly_seen.insert(message.clone()) {
        anomalies.push(message);
    }
}

fn default_match_id(seed: u32, timestamp_ms: i64) -> String {
    format!("sim-{seed}-{timestamp_ms}")
}

fn build_run_summary(
    match_id: String,
    started_at: String,
    finished_at: String,
    scenarios: Vec<ScenarioResultLine>,
    reason_counts: BTreeMap<String, usize>,
    anomaly_count: usize,
    total_duration_ms: u64,
) -> RunSummary {
    let scenario_count = scenarios.len();
    let average_duration_ms = if scenario_count == 0 {
        0
    } else {
        total_duration_ms / scenario_count as u64
    };
    RunSummary {
        match_id,
        started_at,
        finished_at,
        scenario_count,
        anomaly_count,
        average_duration_ms,
        reason_counts,
        scenarios,
    }
}

fn emit_log(
    level: &str,
    event: &str,
    match_id: &str,
    scenario: Option<&str>,
    seed: Option<u32>,
    tick: Option<u64>,
    details: Value,
) {
    match level {
        "error" => error!(event, match_id, scenario, seed, tick, details = %details),
        "warn" => warn!(event, match_id, scenario, seed, tick, details = %details),
        _ => info!(event, match_id, scenario, seed, tick, details = %details),
    }
}

fn game_over_reason_key(reason: Option<GameOverReason>) -> String {
    match reason {
        Some(GameOverReason::AllLivesLost) => "all_lives_lost",
        Some(GameOverReason::Aborted) => "aborted",
        None => "time_limit",
    }
    .to_string()
}

fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn write_summary(path: &Path, summary: &RunSummary) -> io::Result<()> {
    let summary_text = serde_json::to_string_pretty(summary).map_err(io::Error::other)?;
    std::fs::write(path, summary_text)
}
