pub mod constants;
pub mod engine;
pub mod error;
pub mod pathfinding;
pub mod rng;
pub mod server_protocol;
pub mod server_utils;
pub mod session;
pub mod types;
pub mod world;
