use tracing::info;

use crate::config::PlayerConfig;
use crate::constants::{get_player_color, MAX_PLAYERS};
use crate::error::{SimError, SimResult};
use crate::graph::WaypointGraph;
use crate::types::{Color, PlayerView, Vec2};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StartPlayer {
    pub id: String,
    pub name: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct PlayerSighting {
    pub id: String,
    pub position: Vec2,
    pub hitbox_size: f32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KillOutcome {
    LifeLost { remaining: u32 },
    GameOver,
}

/// The simulation's window onto the players, which it never moves except through a kill.
pub trait PlayerRegistry {
    fn sightings(&self) -> Vec<PlayerSighting>;

    /// Applies a ghost kill. `None` if the player is unknown.
    fn apply_ghost_kill(&mut self, player_id: &str) -> Option<KillOutcome>;

    fn credit_ghost_kill(&mut self, player_id: &str) -> bool;

    fn color_of(&self, player_id: &str) -> Option<Color>;

    fn views(&self) -> Vec<PlayerView>;

    fn restore(&mut self);
}

#[derive(Clone, Debug)]
struct RosterEntry {
    view: PlayerView,
    home: Vec2,
}

#[derive(Clone, Debug)]
pub struct PlayerRoster {
    entries: Vec<RosterEntry>,
    lives: u32,
    hitbox_size: f32,
}

impl PlayerRoster {
    pub fn new(
        start_players: &[StartPlayer],
        graph: &WaypointGraph,
        config: &PlayerConfig,
    ) -> SimResult<Self> {
        if start_players.len() > MAX_PLAYERS {
            return Err(SimError::InvalidConfig(format!(
                "at most {MAX_PLAYERS} players are supported, got {}",
                start_players.len()
            )));
        }
        let homes: Vec<Vec2> = if graph.home_slots().is_empty() {
            graph.nodes().iter().map(|node| node.position).collect()
        } else {
            graph
                .home_slots()
                .iter()
                .filter_map(|node| graph.position(*node))
                .collect()
        };
        if homes.is_empty() {
            return Err(SimError::EmptyGraph);
        }

        let entries = start_players
            .iter()
            .enumerate()
            .map(|(index, start)| {
                let home = homes[index % homes.len()];
                RosterEntry {
                    view: PlayerView {
                        id: start.id.clone(),
                        name: start.name.clone(),
                        position: home,
                        color: config
                            .colors
                            .get(index % config.colors.len().max(1))
                            .copied()
                            .unwrap_or_else(|| get_player_color(index)),
                        lives: config.lives,
                        ghosts_killed: 0,
                        deaths: 0,
                    },
                    home,
                }
            })
            .collect();

        Ok(Self {
            entries,
            lives: config.lives,
            hitbox_size: config.hitbox_size,
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, player_id: &str) -> Option<&PlayerView> {
        self.entry(player_id).map(|entry| &entry.view)
    }

    pub fn home_of(&self, player_id: &str) -> Option<Vec2> {
        self.entry(player_id).map(|entry| entry.home)
    }

    pub fn set_position(&mut self, player_id: &str, position: Vec2) -> bool {
        match self.entry_mut(player_id) {
            Some(entry) => {
                entry.view.position = position;
                true
            }
            None => false,
        }
    }

    pub fn total_ghosts_killed(&self) -> u32 {
        self.entries.iter().map(|entry| entry.view.ghosts_killed).sum()
    }

    fn entry(&self, player_id: &str) -> Option<&RosterEntry> {
        self.entries.iter().find(|entry| entry.view.id == player_id)
    }

    fn entry_mut(&mut self, player_id: &str) -> Option<&mut RosterEntry> {
        self.entries
            .iter_mut()
            .find(|entry| entry.view.id == player_id)
    }
}

impl PlayerRegistry for PlayerRoster {
    fn sightings(&self) -> Vec<PlayerSighting> {
        self.entries
            .iter()
            .map(|entry| PlayerSighting {
                id: entry.view.id.clone(),
                position: entry.view.position,
                hitbox_size: self.hitbox_size,
            })
            .collect()
    }

    fn apply_ghost_kill(&mut self, player_id: &str) -> Option<KillOutcome> {
        let entry = self.entry_mut(player_id)?;
        entry.view.deaths += 1;
        entry.view.position = entry.home;
        if entry.view.lives > 1 {
            entry.view.lives -= 1;
            info!(player_id, lives = entry.view.lives, "player lost a life");
            Some(KillOutcome::LifeLost {
                remaining: entry.view.lives,
            })
        } else {
            entry.view.lives = 0;
            info!(player_id, "player lost their last life");
            Some(KillOutcome::GameOver)
        }
    }

    fn credit_ghost_kill(&mut self, player_id: &str) -> bool {
        match self.entry_mut(player_id) {
            Some(entry) => {
                entry.view.ghosts_killed += 1;
                true
            }
            None => false,
        }
    }

    fn color_of(&self, player_id: &str) -> Option<Color> {
        self.entry(player_id).map(|entry| entry.view.color)
    }

    fn views(&self) -> Vec<PlayerView> {
        self.entries.iter().map(|entry| entry.view.clone()).collect()
    }

    fn restore(&mut self) {
        for entry in &mut self.entries {
            entry.view.position = entry.home;
            entry.view.lives = self.lives;
            entry.view.ghosts_killed = 0;
            entry.view.deaths = 0;
        }
    }
}
