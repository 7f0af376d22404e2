use std::collections::HashSet;

use chrono::Utc;

use crate::players::PlayerSighting;
use crate::population::GhostHit;
use crate::proximity::{AgentKind, ProximityOracle};
use crate::types::Vec2;

pub(super) fn now_ms() -> u64 {
    u64::try_from(Utc::now().timestamp_millis()).unwrap_or_default()
}

pub(super) fn ms_to_secs(ms: u64) -> f32 {
    ms as f32 / 1_000.0
}

pub(super) fn player_oracle(sightings: &[PlayerSighting]) -> ProximityOracle {
    let mut oracle = ProximityOracle::new();
    for sighting in sightings {
        oracle.track(
            AgentKind::Player,
            sighting.id.clone(),
            sighting.position,
            sighting.hitbox_size / 2.0,
        );
    }
    oracle
}

pub(super) fn sighting_positions(sightings: &[PlayerSighting]) -> Vec<Vec2> {
    sightings.iter().map(|sighting| sighting.position).collect()
}

/// Keeps the first hit on each player; later ghosts touching the same player this tick are dropped.
pub(super) fn first_hit_per_player(hits: Vec<GhostHit>) -> Vec<GhostHit> {
    let mut seen = HashSet::new();
    hits.into_iter()
        .filter(|hit| seen.insert(hit.player_id.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit(ghost: &str, player: &str) -> GhostHit {
        GhostHit {
            ghost_id: ghost.to_string(),
            player_id: player.to_string(),
        }
    }

    #[test]
    fn only_first_hit_per_player_survives() {
        let hits = vec![hit("g1", "p1"), hit("g2", "p1"), hit("g3", "p2")];
        let kept = first_hit_per_player(hits);
        assert_eq!(kept, vec![hit("g1", "p1"), hit("g3", "p2")]);
    }

    #[test]
    fn oracle_uses_half_hitbox_extents() {
        let sightings = vec![PlayerSighting {
            id: "p1".to_string(),
            position: Vec2::new(1.0, 0.0),
            hitbox_size: 0.8,
        }];
        let oracle = player_oracle(&sightings);
        let tracked = oracle
            .probe(
                Vec2::ZERO,
                crate::types::Direction::Right,
                0.65,
                AgentKind::Player,
            )
            .expect("box edge at 0.6 is within reach");
        assert_eq!(tracked.half_extent, 0.4);
    }

    #[test]
    fn seconds_conversion() {
        assert_eq!(ms_to_secs(20), 0.02);
        assert_eq!(ms_to_secs(1_500), 1.5);
    }
}
