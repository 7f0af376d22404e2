use std::fmt;
use std::ops::{Add, Mul, Sub};

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn length(self) -> f32 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    pub fn distance(self, other: Vec2) -> f32 {
        (other - self).length()
    }

    pub fn normalized(self) -> Vec2 {
        let len = self.length();
        if len <= f32::EPSILON {
            return Vec2::ZERO;
        }
        Vec2::new(self.x / len, self.y / len)
    }

    pub fn step_toward(self, target: Vec2, max_step: f32) -> Vec2 {
        let delta = target - self;
        let dist = delta.length();
        if dist <= max_step || dist <= f32::EPSILON {
            return target;
        }
        self + delta.normalized() * max_step
    }
}

impl Add for Vec2 {
    type Output = Vec2;

    fn add(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Vec2 {
    type Output = Vec2;

    fn sub(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f32> for Vec2 {
    type Output = Vec2;

    fn mul(self, rhs: f32) -> Vec2 {
        Vec2::new(self.x * rhs, self.y * rhs)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    /// Component-wise interpolation; `t` is clamped to `[0, 1]`.
    pub fn lerp(self, other: Color, t: f32) -> Color {
        let t = t.clamp(0.0, 1.0);
        Color {
            r: self.r + (other.r - self.r) * t,
            g: self.g + (other.g - self.g) * t,
            b: self.b + (other.b - self.b) * t,
            a: self.a + (other.a - self.a) * t,
        }
    }

    pub fn approx_eq(self, other: Color, eps: f32) -> bool {
        (self.r - other.r).abs() <= eps
            && (self.g - other.g).abs() <= eps
            && (self.b - other.b).abs() <= eps
            && (self.a - other.a).abs() <= eps
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(pub usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node_{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Right,
    Left,
    Up,
    Down,
}

impl Direction {
    pub const PROBE_ORDER: [Direction; 4] = [
        Direction::Right,
        Direction::Left,
        Direction::Up,
        Direction::Down,
    ];

    /// Maze rows grow downward, so `Up` is negative y.
    pub fn unit(self) -> Vec2 {
        match self {
            Direction::Right => Vec2::new(1.0, 0.0),
            Direction::Left => Vec2::new(-1.0, 0.0),
            Direction::Up => Vec2::new(0.0, -1.0),
            Direction::Down => Vec2::new(0.0, 1.0),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GhostPhase {
    Traveling,
    AtNode,
    Suppressed,
    Removed,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AudioCue {
    PlayerDeath,
    GhostDeath,
    GhostSpawn,
    Thunder,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GameOverReason {
    AllLivesLost,
    Aborted,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Announcement {
    pub text: String,
    pub color: Color,
    pub permanent: bool,
    #[serde(rename = "autoHideMs")]
    pub auto_hide_ms: Option<u64>,
}

#[derive(Clone, Debug, Serialize)]
pub struct PlayerView {
    pub id: String,
    pub name: String,
    pub position: Vec2,
    pub color: Color,
    pub lives: u32,
    #[serde(rename = "ghostsKilled")]
    pub ghosts_killed: u32,
    pub deaths: u32,
}

#[derive(Clone, Debug, Serialize)]
pub struct GhostView {
    pub id: String,
    pub position: Vec2,
    pub phase: GhostPhase,
    pub active: bool,
    #[serde(rename = "lastNode")]
    pub last_node: Option<NodeId>,
    #[serde(rename = "targetNode")]
    pub target_node: NodeId,
    pub sliding: bool,
}

#[derive(Clone, Debug, Serialize)]
pub struct LightningView {
    pub striking: bool,
    pub tint: Color,
    #[serde(rename = "backgroundTint")]
    pub background_tint: Color,
    #[serde(rename = "ambientLight")]
    pub ambient_light: bool,
    #[serde(rename = "tickerSecs")]
    pub ticker_secs: f32,
    #[serde(rename = "pendingTasks")]
    pub pending_tasks: usize,
}

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RuntimeEvent {
    GhostSpawned {
        #[serde(rename = "ghostId")]
        ghost_id: String,
        node: NodeId,
    },
    GhostKilled {
        #[serde(rename = "ghostId")]
        ghost_id: String,
        by: Option<String>,
    },
    GhostRemoved {
        #[serde(rename = "ghostId")]
        ghost_id: String,
    },
    PlayerHit {
        #[serde(rename = "ghostId")]
        ghost_id: String,
        #[serde(rename = "playerId")]
        player_id: String,
        #[serde(rename = "livesLeft")]
        lives_left: u32,
    },
    SpawnDeferred {
        attempt: u32,
        #[serde(rename = "retryInMs")]
        retry_in_ms: u64,
    },
    SpawnAbandoned {
        attempts: u32,
    },
    LightningStarted,
    LightningPhaseStarted {
        phase: usize,
    },
    LightningPhaseCompleted {
        phase: usize,
    },
    LightningFinished,
    LightningInterrupted {
        cancelled: usize,
    },
    Announcement(Announcement),
    AnnouncementHidden {
        text: String,
    },
    Audio {
        cue: AudioCue,
    },
    GameOver {
        reason: GameOverReason,
    },
}

#[derive(Clone, Debug, Serialize)]
pub struct Snapshot {
    pub tick: u64,
    #[serde(rename = "elapsedMs")]
    pub elapsed_ms: u64,
    pub paused: bool,
    pub ended: bool,
    pub players: Vec<PlayerView>,
    pub ghosts: Vec<GhostView>,
    pub lightning: LightningView,
    #[serde(rename = "pendingSpawns")]
    pub pending_spawns: usize,
    #[serde(rename = "ghostsKilled")]
    pub ghosts_killed: u32,
    pub events: Vec<RuntimeEvent>,
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct SimStats {
    pub spawns: u32,
    #[serde(rename = "spawnsDeferred")]
    pub spawns_deferred: u32,
    #[serde(rename = "spawnsAbandoned")]
    pub spawns_abandoned: u32,
    #[serde(rename = "ghostsKilled")]
    pub ghosts_killed: u32,
    #[serde(rename = "playerDeaths")]
    pub player_deaths: u32,
    pub strikes: u32,
    pub interrupts: u32,
}

#[derive(Clone, Debug, Serialize)]
pub struct GameSummary {
    pub reason: Option<GameOverReason>,
    #[serde(rename = "durationMs")]
    pub duration_ms: u64,
    pub ticks: u64,
    pub stats: SimStats,
    pub players: Vec<PlayerView>,
}
