use std::path::PathBuf;

use thiserror::Error;

use crate::types::NodeId;

#[derive(Debug, Error)]
pub enum SimError {
    #[error("waypoint graph has no nodes")]
    EmptyGraph,
    #[error("waypoint {node} has no adjacent waypoints")]
    DisconnectedGraphNode { node: NodeId },
    #[error("waypoint {node} lists unknown neighbour {neighbour}")]
    UnknownNeighbour { node: NodeId, neighbour: NodeId },
    #[error("maze layout line {line}, column {column}: {reason}")]
    InvalidLayout {
        line: usize,
        column: usize,
        reason: String,
    },
    #[error("no waypoint is farther than {min_distance} from every player and ghost")]
    EmptyCandidateSet { min_distance: f32 },
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("failed to read config {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

pub type SimResult<T> = Result<T, SimError>;
