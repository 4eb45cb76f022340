//! duomaze-core: the concurrent simulation core of a two-agent
//! cooperative tile maze.
//!
//! The host drives everything through `lifecycle::LevelLifecycle`.

pub mod audio;
pub mod collision;
pub mod command;
pub mod config;
pub mod error;
pub mod event;
pub mod grid;
pub mod input;
pub mod levels;
pub mod lifecycle;
pub mod movement;
pub mod notify;
pub mod rng;
pub mod snapshot;
pub mod state;
pub mod store;
pub mod types;
pub mod validation;
pub mod worker;
