use crate::config::GhostConfig;
use crate::constants::OFF_STAGE;
use crate::graph::WaypointGraph;
use crate::proximity::{AgentKind, ProximityOracle};
use crate::rng::Rng;
use crate::types::{Direction, GhostPhase, GhostView, NodeId, Vec2};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SlideTask {
    pub target: Vec2,
}

#[derive(Clone, Debug)]
pub struct GhostAgent {
    pub id: String,
    pub position: Vec2,
    pub last_node: Option<NodeId>,
    pub target_node: NodeId,
    pub active: bool,
    pub phase: GhostPhase,
    slide: Option<SlideTask>,
    removal_due_ms: Option<u64>,
}

impl GhostAgent {
    pub fn new(id: String, node: NodeId, position: Vec2) -> Self {
        Self {
            id,
            position,
            last_node: None,
            target_node: node,
            active: true,
            phase: GhostPhase::AtNode,
            slide: None,
            removal_due_ms: None,
        }
    }

    pub fn is_sliding(&self) -> bool {
        self.slide.is_some()
    }

    pub fn is_removed(&self) -> bool {
        self.phase == GhostPhase::Removed
    }

    pub fn removal_due_ms(&self) -> Option<u64> {
        self.removal_due_ms
    }

    /// Advances one tick of movement. A running slide takes priority over graph travel,
    /// and a suppressed ghost only ever slides.
    pub fn update_movement(
        &mut self,
        dt_secs: f32,
        graph: &WaypointGraph,
        settings: &GhostConfig,
        rng: &mut Rng,
    ) {
        if self.is_removed() {
            return;
        }
        let max_step = settings.speed * dt_secs;

        if let Some(slide) = self.slide {
            self.position = self.position.step_toward(slide.target, max_step);
            if self.position.distance(slide.target) <= settings.arrive_epsilon {
                self.position = slide.target;
                self.slide = None;
            }
            return;
        }
        if !self.active {
            return;
        }

        let Some(target) = graph.position(self.target_node) else {
            return;
        };
        if self.position.distance(target) > settings.arrive_epsilon {
            self.position = self.position.step_toward(target, max_step);
            self.phase = if self.position.distance(target) > settings.arrive_epsilon {
                GhostPhase::Traveling
            } else {
                GhostPhase::AtNode
            };
            return;
        }

        let reached = self.target_node;
        self.target_node = graph.next_node(reached, self.last_node, settings.last_bias, rng);
        self.last_node = Some(reached);
        self.phase = GhostPhase::Traveling;
    }

    pub fn detect_attack(&self, players: &ProximityOracle, probe_length: f32) -> Option<String> {
        if !self.active {
            return None;
        }
        Direction::PROBE_ORDER.iter().find_map(|direction| {
            players
                .probe(self.position, *direction, probe_length, AgentKind::Player)
                .map(|agent| agent.id.clone())
        })
    }

    pub fn slide_to(&mut self, target: Vec2) {
        self.slide = Some(SlideTask { target });
    }

    /// Disarms the ghost and schedules its death sequence.
    /// Returns false if it was already inactive.
    pub fn suppress(&mut self, now_ms: u64, kill_delay_ms: u64) -> bool {
        if !self.active || self.is_removed() {
            return false;
        }
        self.active = false;
        self.phase = GhostPhase::Suppressed;
        self.removal_due_ms = Some(now_ms.saturating_add(kill_delay_ms));
        true
    }

    pub fn is_removal_due(&self, now_ms: u64) -> bool {
        !self.is_removed() && self.removal_due_ms.is_some_and(|due| now_ms >= due)
    }

    pub fn kill(&mut self) {
        self.active = false;
        self.position = OFF_STAGE;
        self.slide = None;
        self.removal_due_ms = None;
        self.phase = GhostPhase::Removed;
    }

    pub fn view(&self) -> GhostView {
        GhostView {
            id: self.id.clone(),
            position: self.position,
            phase: self.phase,
            active: self.active,
            last_node: self.last_node,
            target_node: self.target_node,
            sliding: self.is_sliding(),
        }
    }
}
