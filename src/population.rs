use tracing::debug;

use crate::config::GhostConfig;
use crate::error::SimResult;
use crate::ghost::GhostAgent;
use crate::graph::WaypointGraph;
use crate::proximity::{AgentKind, ProximityOracle};
use crate::rng::Rng;
use crate::spawn_planner::SpawnPlanner;
use crate::types::{GhostView, NodeId, Vec2};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PendingSpawn {
    pub due_ms: u64,
    /// Failed attempts so far for this request.
    pub attempt: u32,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GhostHit {
    pub ghost_id: String,
    pub player_id: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KillAck {
    Accepted,
    Ignored,
}

#[derive(Clone, Debug, Default)]
pub struct PopulationUpdate {
    pub hits: Vec<GhostHit>,
    pub removed: Vec<String>,
}

#[derive(Clone, Debug)]
pub struct GhostPopulation {
    settings: GhostConfig,
    planner: SpawnPlanner,
    ghosts: Vec<GhostAgent>,
    pending: Vec<PendingSpawn>,
    next_id_counter: u64,
}

impl GhostPopulation {
    pub fn new(settings: GhostConfig, min_spawn_distance: f32) -> Self {
        Self {
            settings,
            planner: SpawnPlanner::new(min_spawn_distance),
            ghosts: Vec::new(),
            pending: Vec::new(),
            next_id_counter: 1,
        }
    }

    pub fn settings(&self) -> &GhostConfig {
        &self.settings
    }

    pub fn start_game(&mut self, now_ms: u64) {
        for _ in 0..self.settings.start_count {
            self.schedule_spawn(now_ms, self.settings.initial_spawn_delay_ms);
        }
    }

    pub fn schedule_spawn(&mut self, now_ms: u64, delay_ms: u64) {
        self.schedule_attempt(now_ms, delay_ms, 0);
    }

    pub fn schedule_attempt(&mut self, now_ms: u64, delay_ms: u64, attempt: u32) {
        self.pending.push(PendingSpawn {
            due_ms: now_ms.saturating_add(delay_ms),
            attempt,
        });
    }

    pub fn take_due(&mut self, now_ms: u64) -> Vec<PendingSpawn> {
        let (due, waiting): (Vec<PendingSpawn>, Vec<PendingSpawn>) = self
            .pending
            .drain(..)
            .partition(|spawn| spawn.due_ms <= now_ms);
        self.pending = waiting;
        due
    }

    pub fn try_spawn(
        &mut self,
        graph: &WaypointGraph,
        players: &[Vec2],
        rng: &mut Rng,
    ) -> SimResult<(String, NodeId)> {
        let mut oracle = ProximityOracle::new();
        for (idx, position) in players.iter().enumerate() {
            oracle.track(AgentKind::Player, format!("player_{idx}"), *position, 0.0);
        }
        for ghost in self.ghosts.iter().filter(|ghost| !ghost.is_removed()) {
            oracle.track(AgentKind::Ghost, ghost.id.clone(), ghost.position, 0.0);
        }

        let node = self.planner.find_valid_spawn(graph, &oracle, rng)?;
        let position = graph.position(node).unwrap_or_default();
        let id = self.make_id("ghost");
        self.ghosts
            .push(GhostAgent::new(id.clone(), node, position));
        debug!(ghost_id = %id, %node, "ghost placed");
        Ok((id, node))
    }

    /// Runs one tick for every ghost: movement, attack probes, then due death sequences.
    /// Hits are only collected here; the caller applies them after the tick.
    pub fn update(
        &mut self,
        now_ms: u64,
        dt_secs: f32,
        graph: &WaypointGraph,
        players: &ProximityOracle,
        rng: &mut Rng,
    ) -> PopulationUpdate {
        let mut update = PopulationUpdate::default();
        for ghost in &mut self.ghosts {
            ghost.update_movement(dt_secs, graph, &self.settings, rng);
        }

        let probe_length = self.settings.probe_length();
        for ghost in &self.ghosts {
            if let Some(player_id) = ghost.detect_attack(players, probe_length) {
                update.hits.push(GhostHit {
                    ghost_id: ghost.id.clone(),
                    player_id,
                });
            }
        }

        let respawn_delay_ms = self.settings.respawn_delay_ms;
        let mut respawns = 0;
        for ghost in &mut self.ghosts {
            if ghost.is_removal_due(now_ms) {
                ghost.kill();
                update.removed.push(ghost.id.clone());
                respawns += 1;
            }
        }
        for _ in 0..respawns {
            self.schedule_spawn(now_ms, respawn_delay_ms);
        }
        self.ghosts.retain(|ghost| !ghost.is_removed());
        update
    }

    pub fn mark_killed(&mut self, ghost_id: &str, now_ms: u64, recoil_to: Option<Vec2>) -> KillAck {
        let kill_delay_ms = self.settings.kill_delay_ms;
        let Some(ghost) = self.ghosts.iter_mut().find(|ghost| ghost.id == ghost_id) else {
            return KillAck::Ignored;
        };
        if !ghost.suppress(now_ms, kill_delay_ms) {
            return KillAck::Ignored;
        }
        if let Some(target) = recoil_to {
            ghost.slide_to(target);
        }
        KillAck::Accepted
    }

    /// Removes every ghost without scheduling respawns. Returns how many were removed.
    pub fn destroy_all(&mut self) -> usize {
        let count = self.ghosts.len();
        self.ghosts.clear();
        count
    }

    pub fn cancel_pending(&mut self) -> usize {
        let count = self.pending.len();
        self.pending.clear();
        count
    }

    pub fn ghosts(&self) -> &[GhostAgent] {
        &self.ghosts
    }

    pub fn get(&self, ghost_id: &str) -> Option<&GhostAgent> {
        self.ghosts.iter().find(|ghost| ghost.id == ghost_id)
    }

    pub fn positions(&self) -> Vec<Vec2> {
        self.ghosts.iter().map(|ghost| ghost.position).collect()
    }

    pub fn views(&self) -> Vec<GhostView> {
        self.ghosts.iter().map(GhostAgent::view).collect()
    }

    pub fn len(&self) -> usize {
        self.ghosts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ghosts.is_empty()
    }

    pub fn pending(&self) -> &[PendingSpawn] {
        &self.pending
    }

    fn make_id(&mut self, prefix: &str) -> String {
        let id = format!("{}_{}", prefix, self.next_id_counter);
        self.next_id_counter = self.next_id_counter.saturating_add(1);
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SimError;

    fn line_graph(count: usize) -> WaypointGraph {
        let positions = (0..count)
            .map(|idx| Vec2::new(idx as f32 * 10.0, 0.0))
            .collect();
        let edges: Vec<(usize, usize)> = (1..count).map(|idx| (idx - 1, idx)).collect();
        WaypointGraph::from_edges(positions, &edges).expect("line should build")
    }

    fn population() -> GhostPopulation {
        GhostPopulation::new(GhostConfig::default(), 3.0)
    }

    #[test]
    fn start_game_schedules_initial_spawns() {
        let mut pop = population();
        pop.start_game(500);
        assert_eq!(pop.pending().len(), 4);
        assert!(pop.take_due(1_499).is_empty());
        assert_eq!(pop.take_due(1_500).len(), 4);
        assert!(pop.pending().is_empty());
    }

    #[test]
    fn spawned_ghosts_never_share_a_waypoint() {
        let graph = line_graph(3);
        let mut pop = population();
        let mut rng = Rng::new(8);
        for _ in 0..3 {
            pop.try_spawn(&graph, &[], &mut rng).expect("room for three");
        }
        let result = pop.try_spawn(&graph, &[], &mut rng);
        assert!(matches!(result, Err(SimError::EmptyCandidateSet { .. })));
        assert_eq!(pop.len(), 3);

        let mut nodes: Vec<NodeId> = pop.ghosts().iter().map(|ghost| ghost.target_node).collect();
        nodes.sort();
        nodes.dedup();
        assert_eq!(nodes.len(), 3);
    }

    #[test]
    fn kill_is_idempotent_and_schedules_one_respawn() {
        let graph = line_graph(3);
        let mut pop = population();
        let mut rng = Rng::new(2);
        let (id, _) = pop.try_spawn(&graph, &[], &mut rng).expect("spawn");

        assert_eq!(pop.mark_killed(&id, 0, None), KillAck::Accepted);
        assert_eq!(pop.mark_killed(&id, 10, None), KillAck::Ignored);
        assert_eq!(pop.mark_killed("ghost_999", 10, None), KillAck::Ignored);

        let players = ProximityOracle::new();
        let early = pop.update(999, 0.02, &graph, &players, &mut rng);
        assert!(early.removed.is_empty());
        assert_eq!(pop.len(), 1);

        let due = pop.update(1_000, 0.02, &graph, &players, &mut rng);
        assert_eq!(due.removed, vec![id]);
        assert!(pop.is_empty());
        assert_eq!(pop.pending().len(), 1);
        assert_eq!(pop.pending()[0].due_ms, 4_000);
    }

    #[test]
    fn destroy_all_schedules_no_respawn() {
        let graph = line_graph(4);
        let mut pop = population();
        let mut rng = Rng::new(6);
        pop.try_spawn(&graph, &[], &mut rng).expect("spawn");
        pop.try_spawn(&graph, &[], &mut rng).expect("spawn");
        assert_eq!(pop.destroy_all(), 2);
        assert!(pop.is_empty());
        assert!(pop.pending().is_empty());
    }

    #[test]
    fn hits_are_collected_for_active_ghosts_only() {
        let graph = line_graph(2);
        let mut pop = population();
        let mut rng = Rng::new(12);
        let (first, node) = pop.try_spawn(&graph, &[], &mut rng).expect("spawn");
        let position = graph.position(node).expect("node exists");

        let mut players = ProximityOracle::new();
        players.track(
            AgentKind::Player,
            "p1".to_string(),
            position + Vec2::new(0.0, 0.5),
            0.4,
        );
        let update = pop.update(0, 0.0, &graph, &players, &mut rng);
        assert_eq!(
            update.hits,
            vec![GhostHit {
                ghost_id: first.clone(),
                player_id: "p1".to_string()
            }]
        );

        pop.mark_killed(&first, 0, None);
        let update = pop.update(10, 0.0, &graph, &players, &mut rng);
        assert!(update.hits.is_empty());
    }
}
