pub mod config;
pub mod constants;
pub mod engine;
pub mod error;
pub mod ghost;
pub mod graph;
pub mod hooks;
pub mod lightning;
pub mod players;
pub mod population;
pub mod proximity;
pub mod rng;
pub mod spawn_planner;
pub mod types;
