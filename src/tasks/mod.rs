//! Background Tasks Module
//!
//! Contains background tasks that run periodically during server operation.
//!
//! # Tasks
//! - Stats refresh: Keeps shard statistics warm in the shared cache

mod refresh;

pub use refresh::spawn_refresh_task;
