use std::collections::BTreeMap;

use crate::error::{SimError, SimResult};
use crate::rng::Rng;
use crate::types::{NodeId, Vec2};

const WAYPOINT: u8 = b'o';
const HOME_WAYPOINT: u8 = b'H';
const HORIZONTAL_LINK: u8 = b'-';
const VERTICAL_LINK: u8 = b'|';

#[derive(Clone, Debug)]
pub struct WaypointNode {
    pub id: NodeId,
    pub position: Vec2,
    pub adjacent: Vec<NodeId>,
}

/// Immutable patrol graph. Every node is guaranteed at least one neighbour.
#[derive(Clone, Debug)]
pub struct WaypointGraph {
    nodes: Vec<WaypointNode>,
    home_slots: Vec<NodeId>,
}

impl WaypointGraph {
    pub fn new(positions: Vec<Vec2>, adjacency: Vec<Vec<NodeId>>) -> SimResult<Self> {
        if positions.is_empty() {
            return Err(SimError::EmptyGraph);
        }
        if adjacency.len() != positions.len() {
            return Err(SimError::InvalidConfig(format!(
                "{} waypoints but {} adjacency lists",
                positions.len(),
                adjacency.len()
            )));
        }
        let nodes = positions
            .into_iter()
            .zip(adjacency)
            .enumerate()
            .map(|(idx, (position, adjacent))| WaypointNode {
                id: NodeId(idx),
                position,
                adjacent,
            })
            .collect();
        let graph = Self {
            nodes,
            home_slots: Vec::new(),
        };
        graph.validate()?;
        Ok(graph)
    }

    pub fn from_edges(positions: Vec<Vec2>, edges: &[(usize, usize)]) -> SimResult<Self> {
        let mut adjacency = vec![Vec::new(); positions.len()];
        for &(a, b) in edges {
            if a >= positions.len() || b >= positions.len() {
                return Err(SimError::UnknownNeighbour {
                    node: NodeId(a.min(b)),
                    neighbour: NodeId(a.max(b)),
                });
            }
            link(&mut adjacency, a, b);
        }
        Self::new(positions, adjacency)
    }

    /// Parses an ASCII maze: `o`/`H` waypoints joined by runs of `-` or `|`.
    pub fn from_layout(layout: &str) -> SimResult<Self> {
        let rows: Vec<&[u8]> = layout
            .lines()
            .map(|line| line.trim_end().as_bytes())
            .collect();
        let cell = |row: usize, col: usize| -> u8 {
            rows.get(row)
                .and_then(|line| line.get(col))
                .copied()
                .unwrap_or(b' ')
        };

        let mut index_by_cell: BTreeMap<(usize, usize), usize> = BTreeMap::new();
        let mut positions = Vec::new();
        let mut home_cells = Vec::new();
        for (row, line) in rows.iter().enumerate() {
            for (col, ch) in line.iter().enumerate() {
                match *ch {
                    WAYPOINT | HOME_WAYPOINT => {
                        index_by_cell.insert((row, col), positions.len());
                        if *ch == HOME_WAYPOINT {
                            home_cells.push(positions.len());
                        }
                        positions.push(Vec2::new(col as f32, row as f32));
                    }
                    HORIZONTAL_LINK | VERTICAL_LINK | b' ' => {}
                    other => {
                        return Err(SimError::InvalidLayout {
                            line: row + 1,
                            column: col + 1,
                            reason: format!("unexpected character '{}'", other as char),
                        });
                    }
                }
            }
        }

        let mut adjacency = vec![Vec::new(); positions.len()];
        for (&(row, col), &idx) in &index_by_cell {
            if cell(row, col + 1) == HORIZONTAL_LINK {
                let mut end = col + 1;
                while cell(row, end) == HORIZONTAL_LINK {
                    end += 1;
                }
                let Some(&other) = index_by_cell.get(&(row, end)) else {
                    return Err(dangling_link(row, end));
                };
                link(&mut adjacency, idx, other);
            }
            if cell(row + 1, col) == VERTICAL_LINK {
                let mut end = row + 1;
                while cell(end, col) == VERTICAL_LINK {
                    end += 1;
                }
                let Some(&other) = index_by_cell.get(&(end, col)) else {
                    return Err(dangling_link(end, col));
                };
                link(&mut adjacency, idx, other);
            }
        }

        let mut graph = Self::new(positions, adjacency)?;
        graph.home_slots = home_cells.into_iter().map(NodeId).collect();
        Ok(graph)
    }

    pub fn validate(&self) -> SimResult<()> {
        if self.nodes.is_empty() {
            return Err(SimError::EmptyGraph);
        }
        for node in &self.nodes {
            if node.adjacent.is_empty() {
                return Err(SimError::DisconnectedGraphNode { node: node.id });
            }
            if let Some(bad) = node
                .adjacent
                .iter()
                .find(|neighbour| neighbour.0 >= self.nodes.len())
            {
                return Err(SimError::UnknownNeighbour {
                    node: node.id,
                    neighbour: *bad,
                });
            }
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn nodes(&self) -> &[WaypointNode] {
        &self.nodes
    }

    pub fn node(&self, id: NodeId) -> Option<&WaypointNode> {
        self.nodes.get(id.0)
    }

    pub fn position(&self, id: NodeId) -> Option<Vec2> {
        self.node(id).map(|node| node.position)
    }

    pub fn neighbours(&self, id: NodeId) -> &[NodeId] {
        self.node(id)
            .map(|node| node.adjacent.as_slice())
            .unwrap_or(&[])
    }

    pub fn home_slots(&self) -> &[NodeId] {
        &self.home_slots
    }

    pub fn nearest_node(&self, point: Vec2) -> Option<NodeId> {
        self.nodes
            .iter()
            .min_by(|a, b| {
                point
                    .distance(a.position)
                    .total_cmp(&point.distance(b.position))
            })
            .map(|node| node.id)
    }

    /// Picks the next patrol waypoint after reaching `current`.
    ///
    /// With no `last` the pick is uniform over the neighbours. Otherwise the walk turns back
    /// with probability `last_bias`, or always at a dead end, and picks uniformly among the
    /// other neighbours the rest of the time.
    pub fn next_node(
        &self,
        current: NodeId,
        last: Option<NodeId>,
        last_bias: f32,
        rng: &mut Rng,
    ) -> NodeId {
        let adjacent = self.neighbours(current);
        let Some(last) = last else {
            return rng.pick(adjacent).copied().unwrap_or(current);
        };

        let turning_back = rng.chance(last_bias);
        if turning_back || adjacent.len() == 1 {
            return last;
        }

        let forward: Vec<NodeId> = adjacent
            .iter()
            .copied()
            .filter(|node| *node != last)
            .collect();
        rng.pick(&forward).copied().unwrap_or(last)
    }
}

fn link(adjacency: &mut [Vec<NodeId>], a: usize, b: usize) {
    if a == b {
        return;
    }
    if !adjacency[a].contains(&NodeId(b)) {
        adjacency[a].push(NodeId(b));
    }
    if !adjacency[b].contains(&NodeId(a)) {
        adjacency[b].push(NodeId(a));
    }
}

fn dangling_link(row: usize, col: usize) -> SimError {
    SimError::InvalidLayout {
        line: row + 1,
        column: col + 1,
        reason: "link does not end on a waypoint".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::DEFAULT_MAZE;

    fn path_abc() -> WaypointGraph {
        WaypointGraph::from_edges(
            vec![
                Vec2::new(0.0, 0.0),
                Vec2::new(4.0, 0.0),
                Vec2::new(8.0, 0.0),
            ],
            &[(0, 1), (1, 2)],
        )
        .expect("path graph is valid")
    }

    fn star(arms: usize) -> WaypointGraph {
        let mut positions = vec![Vec2::ZERO];
        let mut edges = Vec::new();
        for arm in 0..arms {
            positions.push(Vec2::new(arm as f32 * 3.0 + 3.0, 0.0));
            edges.push((0, arm + 1));
        }
        WaypointGraph::from_edges(positions, &edges).expect("star graph is valid")
    }

    #[test]
    fn first_step_from_endpoint_takes_only_neighbour() {
        let graph = path_abc();
        let mut rng = Rng::new(5);
        for _ in 0..50 {
            assert_eq!(graph.next_node(NodeId(0), None, 0.1, &mut rng), NodeId(1));
        }
    }

    #[test]
    fn zero_bias_moves_forward_deterministically_on_path() {
        let graph = path_abc();
        let mut rng = Rng::new(11);
        for _ in 0..50 {
            assert_eq!(
                graph.next_node(NodeId(1), Some(NodeId(0)), 0.0, &mut rng),
                NodeId(2)
            );
        }
    }

    #[test]
    fn dead_end_always_turns_back() {
        let graph = path_abc();
        let mut rng = Rng::new(2);
        for _ in 0..50 {
            assert_eq!(
                graph.next_node(NodeId(2), Some(NodeId(1)), 0.0, &mut rng),
                NodeId(1)
            );
        }
    }

    #[test]
    fn zero_bias_never_returns_last_when_alternatives_exist() {
        let graph = star(4);
        let mut rng = Rng::new(77);
        for draw in 0..5_000 {
            let last = NodeId(draw % 4 + 1);
            let next = graph.next_node(NodeId(0), Some(last), 0.0, &mut rng);
            assert_ne!(next, last);
            assert!(graph.neighbours(NodeId(0)).contains(&next));
        }
    }

    #[test]
    fn backtrack_rate_converges_to_bias() {
        let graph = star(3);
        let mut rng = Rng::new(2024);
        let samples = 40_000;
        let mut backtracks = 0;
        for _ in 0..samples {
            if graph.next_node(NodeId(0), Some(NodeId(1)), 0.1, &mut rng) == NodeId(1) {
                backtracks += 1;
            }
        }
        let rate = backtracks as f32 / samples as f32;
        assert!((rate - 0.1).abs() < 0.01, "backtrack rate {rate}");
    }

    #[test]
    fn isolated_node_is_rejected() {
        let result = WaypointGraph::from_edges(
            vec![Vec2::ZERO, Vec2::new(1.0, 0.0), Vec2::new(5.0, 5.0)],
            &[(0, 1)],
        );
        assert!(matches!(
            result,
            Err(SimError::DisconnectedGraphNode { node: NodeId(2) })
        ));
    }

    #[test]
    fn unknown_neighbour_is_rejected() {
        let result = WaypointGraph::new(
            vec![Vec2::ZERO, Vec2::new(1.0, 0.0)],
            vec![vec![NodeId(1)], vec![NodeId(7)]],
        );
        assert!(matches!(result, Err(SimError::UnknownNeighbour { .. })));
    }

    #[test]
    fn empty_graph_is_rejected() {
        assert!(matches!(
            WaypointGraph::new(Vec::new(), Vec::new()),
            Err(SimError::EmptyGraph)
        ));
    }

    #[test]
    fn layout_links_waypoints_through_runs() {
        let graph = WaypointGraph::from_layout("o---o\n|   |\nH---o").expect("layout parses");
        assert_eq!(graph.len(), 4);
        assert_eq!(graph.home_slots(), &[NodeId(2)]);
        assert_eq!(graph.position(NodeId(1)), Some(Vec2::new(4.0, 0.0)));
        assert_eq!(graph.position(NodeId(2)), Some(Vec2::new(0.0, 2.0)));
        for node in graph.nodes() {
            assert_eq!(node.adjacent.len(), 2);
        }
    }

    #[test]
    fn layout_with_dangling_link_is_rejected() {
        let result = WaypointGraph::from_layout("o---o--");
        assert!(matches!(result, Err(SimError::InvalidLayout { line: 1, .. })));
    }

    #[test]
    fn layout_with_lonely_waypoint_is_rejected() {
        let result = WaypointGraph::from_layout("o---o\n\n    o");
        assert!(matches!(
            result,
            Err(SimError::DisconnectedGraphNode { .. })
        ));
    }

    #[test]
    fn layout_rejects_unknown_characters() {
        let result = WaypointGraph::from_layout("o-x-o");
        assert!(matches!(
            result,
            Err(SimError::InvalidLayout { column: 3, .. })
        ));
    }

    #[test]
    fn default_maze_is_valid_and_has_four_homes() {
        let graph = WaypointGraph::from_layout(DEFAULT_MAZE).expect("default maze parses");
        assert_eq!(graph.home_slots().len(), 4);
        assert!(graph.len() > 30);
        graph.validate().expect("default maze validates");
    }

    #[test]
    fn nearest_node_picks_closest_waypoint() {
        let graph = path_abc();
        assert_eq!(graph.nearest_node(Vec2::new(7.0, 1.0)), Some(NodeId(2)));
    }
}
