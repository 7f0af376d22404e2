use crate::error::{SimError, SimResult};
use crate::graph::WaypointGraph;
use crate::proximity::ProximityOracle;
use crate::rng::Rng;
use crate::types::{NodeId, Vec2};

#[derive(Clone, Debug)]
pub struct SpawnPlanner {
    pub min_distance: f32,
}

impl SpawnPlanner {
    pub fn new(min_distance: f32) -> Self {
        Self { min_distance }
    }

    /// Every waypoint strictly farther than `min_distance` from all tracked agents, in graph order.
    pub fn candidates(&self, graph: &WaypointGraph, oracle: &ProximityOracle) -> Vec<NodeId> {
        graph
            .nodes()
            .iter()
            .filter(|node| oracle.is_clear(node.position, self.min_distance))
            .map(|node| node.id)
            .collect()
    }

    pub fn find_valid_spawn(
        &self,
        graph: &WaypointGraph,
        oracle: &ProximityOracle,
        rng: &mut Rng,
    ) -> SimResult<NodeId> {
        let candidates = self.candidates(graph, oracle);
        rng.pick(&candidates)
            .copied()
            .ok_or(SimError::EmptyCandidateSet {
                min_distance: self.min_distance,
            })
    }
}

pub fn find_valid_spawn(
    graph: &WaypointGraph,
    players: &[Vec2],
    ghosts: &[Vec2],
    min_distance: f32,
    rng: &mut Rng,
) -> SimResult<NodeId> {
    let oracle = ProximityOracle::from_positions(players, ghosts);
    SpawnPlanner::new(min_distance).find_valid_spawn(graph, &oracle, rng)
}
