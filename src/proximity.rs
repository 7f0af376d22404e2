use crate::types::{Direction, Vec2};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AgentKind {
    Player,
    Ghost,
}

#[derive(Clone, Debug)]
pub struct TrackedAgent {
    pub kind: AgentKind,
    pub id: String,
    pub position: Vec2,
    pub half_extent: f32,
}

/// Read-only view over agent positions for one query batch.
#[derive(Clone, Debug, Default)]
pub struct ProximityOracle {
    agents: Vec<TrackedAgent>,
}

impl ProximityOracle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_positions(players: &[Vec2], ghosts: &[Vec2]) -> Self {
        let mut oracle = Self::new();
        for (idx, position) in players.iter().enumerate() {
            oracle.track(AgentKind::Player, format!("player_{idx}"), *position, 0.0);
        }
        for (idx, position) in ghosts.iter().enumerate() {
            oracle.track(AgentKind::Ghost, format!("ghost_{idx}"), *position, 0.0);
        }
        oracle
    }

    pub fn track(&mut self, kind: AgentKind, id: String, position: Vec2, half_extent: f32) {
        self.agents.push(TrackedAgent {
            kind,
            id,
            position,
            half_extent,
        });
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    pub fn any_within(&self, point: Vec2, radius: f32) -> bool {
        self.agents
            .iter()
            .any(|agent| point.distance(agent.position) <= radius)
    }

    pub fn is_clear(&self, point: Vec2, radius: f32) -> bool {
        !self.any_within(point, radius)
    }

    /// Casts an axis-aligned probe and returns the first agent of `kind` whose box it touches.
    pub fn probe(
        &self,
        origin: Vec2,
        direction: Direction,
        length: f32,
        kind: AgentKind,
    ) -> Option<&TrackedAgent> {
        self.agents
            .iter()
            .filter(|agent| agent.kind == kind)
            .find(|agent| {
                segment_hits_box(
                    origin,
                    direction.unit(),
                    length,
                    agent.position,
                    agent.half_extent,
                )
            })
    }
}

/// Slab test between the segment `origin + dir * [0, length]` and a square box.
/// A segment that starts inside the box counts as a hit.
pub fn segment_hits_box(
    origin: Vec2,
    dir: Vec2,
    length: f32,
    center: Vec2,
    half_extent: f32,
) -> bool {
    let min = Vec2::new(center.x - half_extent, center.y - half_extent);
    let max = Vec2::new(center.x + half_extent, center.y + half_extent);
    let mut t_enter = 0.0f32;
    let mut t_exit = length.max(0.0);

    for (o, d, lo, hi) in [
        (origin.x, dir.x, min.x, max.x),
        (origin.y, dir.y, min.y, max.y),
    ] {
        if d.abs() <= f32::EPSILON {
            if o < lo || o > hi {
                return false;
            }
            continue;
        }
        let t1 = (lo - o) / d;
        let t2 = (hi - o) / d;
        let (near, far) = if t1 <= t2 { (t1, t2) } else { (t2, t1) };
        t_enter = t_enter.max(near);
        t_exit = t_exit.min(far);
        if t_enter > t_exit {
            return false;
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clear_requires_strictly_greater_distance() {
        let oracle = ProximityOracle::from_positions(&[Vec2::new(3.0, 0.0)], &[]);
        assert!(!oracle.is_clear(Vec2::ZERO, 3.0));
        assert!(oracle.is_clear(Vec2::ZERO, 2.99));
    }

    #[test]
    fn empty_oracle_is_always_clear() {
        let oracle = ProximityOracle::new();
        assert!(oracle.is_empty());
        assert!(oracle.is_clear(Vec2::ZERO, 100.0));
    }

    #[test]
    fn probe_reaches_box_edge_within_length() {
        assert!(segment_hits_box(
            Vec2::ZERO,
            Direction::Right.unit(),
            0.45,
            Vec2::new(0.8, 0.0),
            0.4
        ));
        assert!(!segment_hits_box(
            Vec2::ZERO,
            Direction::Right.unit(),
            0.35,
            Vec2::new(0.8, 0.0),
            0.4
        ));
    }

    #[test]
    fn probe_ignores_boxes_behind_or_beside() {
        assert!(!segment_hits_box(
            Vec2::ZERO,
            Direction::Right.unit(),
            1.0,
            Vec2::new(-0.8, 0.0),
            0.4
        ));
        assert!(!segment_hits_box(
            Vec2::ZERO,
            Direction::Right.unit(),
            1.0,
            Vec2::new(0.5, 0.9),
            0.4
        ));
    }

    #[test]
    fn probe_starting_inside_box_hits() {
        assert!(segment_hits_box(
            Vec2::new(0.1, 0.1),
            Direction::Up.unit(),
            0.1,
            Vec2::ZERO,
            0.4
        ));
    }

    #[test]
    fn oracle_probe_filters_by_kind() {
        let mut oracle = ProximityOracle::new();
        oracle.track(AgentKind::Ghost, "g".to_string(), Vec2::new(0.0, 0.6), 0.4);
        oracle.track(AgentKind::Player, "p".to_string(), Vec2::new(0.0, 0.6), 0.4);
        let hit = oracle
            .probe(Vec2::ZERO, Direction::Down, 0.45, AgentKind::Player)
            .expect("player below should be hit");
        assert_eq!(hit.id, "p");
        assert!(oracle
            .probe(Vec2::ZERO, Direction::Up, 0.45, AgentKind::Player)
            .is_none());
    }
}
