use tracing::{debug, info, warn};

use crate::config::SimConfig;
use crate::constants::{
    get_spawn_retry_delay_ms, ALERT_COLOR, ANNOUNCE_HIDE_MS, LIGHT_TINT, TEXT_GAME_OVER,
    TEXT_GHOST_KILLED, TEXT_PLAYER_KILLED,
};
use crate::error::{SimError, SimResult};
use crate::graph::WaypointGraph;
use crate::hooks::{Announcer, AudioSink, EventBuffer, EventSink, HideSchedule};
use crate::lightning::{LightningOrchestrator, TriggerOutcome};
use crate::players::{KillOutcome, PlayerRegistry, PlayerRoster, StartPlayer};
use crate::population::{GhostHit, GhostPopulation, KillAck, PendingSpawn};
use crate::rng::Rng;
use crate::types::{
    Announcement, AudioCue, Color, GameOverReason, GameSummary, RuntimeEvent, SimStats, Snapshot,
    Vec2,
};

mod combat_system;
mod spawn_system;
mod utils;

use self::utils::{first_hit_per_player, ms_to_secs, now_ms, player_oracle, sighting_positions};

#[derive(Clone, Debug)]
pub struct GameEngine<R = PlayerRoster, H = EventBuffer> {
    pub started_at_ms: u64,
    pub config: SimConfig,

    graph: WaypointGraph,
    rng: Rng,
    registry: R,
    population: GhostPopulation,
    lightning: LightningOrchestrator,
    events: H,
    hide_schedule: HideSchedule,
    stats: SimStats,

    elapsed_ms: u64,
    tick_counter: u64,
    paused: bool,
    ended: bool,
    end_reason: Option<GameOverReason>,
}

impl GameEngine<PlayerRoster> {
    pub fn new(config: SimConfig, start_players: &[StartPlayer], seed: u32) -> SimResult<Self> {
        config.validate()?;
        let graph = WaypointGraph::from_layout(&config.maze.layout)?;
        let roster = PlayerRoster::new(start_players, &graph, &config.players)?;
        Self::with_registry(config, graph, roster, seed)
    }

    pub fn set_player_position(&mut self, player_id: &str, position: Vec2) -> bool {
        self.registry.set_position(player_id, position)
    }
}

impl<R: PlayerRegistry> GameEngine<R> {
    pub fn with_registry(
        config: SimConfig,
        graph: WaypointGraph,
        registry: R,
        seed: u32,
    ) -> SimResult<Self> {
        Self::with_hooks(config, graph, registry, EventBuffer::default(), seed)
    }
}

impl<R: PlayerRegistry, H: EventSink> GameEngine<R, H> {
    pub fn with_hooks(
        config: SimConfig,
        graph: WaypointGraph,
        registry: R,
        hooks: H,
        seed: u32,
    ) -> SimResult<Self> {
        config.validate()?;
        graph.validate()?;
        let mut rng = Rng::new(seed);
        let lightning = LightningOrchestrator::new(config.lightning.clone(), &mut rng);
        let population = GhostPopulation::new(config.ghosts.clone(), config.spawn.min_distance);

        let mut engine = Self {
            started_at_ms: now_ms(),
            config,
            graph,
            rng,
            registry,
            population,
            lightning,
            events: hooks,
            hide_schedule: HideSchedule::default(),
            stats: SimStats::default(),
            elapsed_ms: 0,
            tick_counter: 0,
            paused: false,
            ended: false,
            end_reason: None,
        };
        engine.population.start_game(0);
        info!(
            nodes = engine.graph.len(),
            ghosts = engine.config.ghosts.start_count,
            seed,
            "game started"
        );
        Ok(engine)
    }

    pub fn is_ended(&self) -> bool {
        self.ended
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed_ms
    }

    pub fn tick(&self) -> u64 {
        self.tick_counter
    }

    pub fn graph(&self) -> &WaypointGraph {
        &self.graph
    }

    pub fn population(&self) -> &GhostPopulation {
        &self.population
    }

    pub fn lightning(&self) -> &LightningOrchestrator {
        &self.lightning
    }

    pub fn registry(&self) -> &R {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut R {
        &mut self.registry
    }

    pub fn stats(&self) -> &SimStats {
        &self.stats
    }

    pub fn hooks(&self) -> &H {
        &self.events
    }

    pub fn step(&mut self, dt_ms: u64) {
        if self.paused || self.ended {
            return;
        }
        self.tick_counter += 1;
        self.elapsed_ms = self.elapsed_ms.saturating_add(dt_ms);
        let now_ms = self.elapsed_ms;
        let dt_secs = ms_to_secs(dt_ms);

        self.expire_announcements(dt_ms);
        self.process_due_spawns(now_ms);

        let players = player_oracle(&self.registry.sightings());
        let update = self
            .population
            .update(now_ms, dt_secs, &self.graph, &players, &mut self.rng);
        self.record_removals(update.removed);
        self.apply_hits(update.hits);

        if !self.paused && !self.ended {
            self.lightning.tick(dt_secs, &mut self.rng);
        }
        self.collect_lightning_events();
    }

    /// Stops delivering ticks and cuts any strike short.
    pub fn pause(&mut self) -> bool {
        if self.paused {
            return false;
        }
        self.paused = true;
        self.interrupt_lightning();
        info!(elapsed_ms = self.elapsed_ms, "game paused");
        true
    }

    pub fn resume(&mut self) -> bool {
        if !self.paused || self.ended {
            return false;
        }
        self.paused = false;
        info!(elapsed_ms = self.elapsed_ms, "game resumed");
        true
    }

    pub fn reset(&mut self) {
        let destroyed = self.population.destroy_all();
        let cancelled = self.population.cancel_pending();
        self.interrupt_lightning();
        self.hide_schedule.clear();
        self.registry.restore();
        self.stats = SimStats::default();
        self.started_at_ms = now_ms();
        self.elapsed_ms = 0;
        self.tick_counter = 0;
        self.paused = false;
        self.ended = false;
        self.end_reason = None;
        self.population.start_game(0);
        info!(destroyed, cancelled, "game reset");
    }

    pub fn abort(&mut self) {
        self.game_over(GameOverReason::Aborted);
    }

    pub fn trigger_lightning(&mut self) -> TriggerOutcome {
        self.strike()
    }

    pub fn interrupt_lightning(&mut self) -> usize {
        let cancelled = self.lightning.interrupt();
        self.collect_lightning_events();
        cancelled
    }

    /// Queues a spawn attempt `delay_ms` from now. Failed attempts are retried with backoff.
    pub fn request_spawn(&mut self, delay_ms: u64) {
        debug!(delay_ms, "spawn requested");
        self.population.schedule_spawn(self.elapsed_ms, delay_ms);
    }

    pub fn build_snapshot(&mut self, include_events: bool) -> Snapshot {
        self.collect_lightning_events();
        Snapshot {
            tick: self.tick_counter,
            elapsed_ms: self.elapsed_ms,
            paused: self.paused,
            ended: self.ended,
            players: self.registry.views(),
            ghosts: self.population.views(),
            lightning: self.lightning.view(),
            pending_spawns: self.population.pending().len(),
            ghosts_killed: self.stats.ghosts_killed,
            events: if include_events {
                self.events.drain()
            } else {
                Vec::new()
            },
        }
    }

    pub fn build_summary(&self) -> GameSummary {
        GameSummary {
            reason: self.end_reason,
            duration_ms: self.elapsed_ms,
            ticks: self.tick_counter,
            stats: self.stats.clone(),
            players: self.registry.views(),
        }
    }

    fn strike(&mut self) -> TriggerOutcome {
        let outcome = self.lightning.trigger(&mut self.rng);
        self.collect_lightning_events();
        outcome
    }

    fn collect_lightning_events(&mut self) {
        for event in self.lightning.drain_events() {
            match event {
                RuntimeEvent::LightningStarted => {
                    self.stats.strikes += 1;
                    self.events.push(event);
                    self.events.play(AudioCue::Thunder);
                }
                RuntimeEvent::LightningInterrupted { .. } => {
                    self.stats.interrupts += 1;
                    self.events.push(event);
                }
                other => self.events.push(other),
            }
        }
    }
}
