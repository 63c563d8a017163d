//! Request and Response models for the site data API
//!
//! Payload types of the bot API plus the DTOs used for
//! serializing/deserializing HTTP request and response bodies.

pub mod command;
pub mod outage;
pub mod requests;
pub mod responses;
pub mod shard;

// Re-export commonly used types
pub use command::{CommandData, CommandsResponse, StaticCommandData, StaticCommandsResponse};
pub use outage::{Outage, OutageStatus};
pub use requests::{FetchQuery, NewOutage, OutageUpdate};
pub use responses::{
    CacheStatsResponse, HealthResponse, InvalidateResponse, StatusResponse, StatusState,
};
pub use shard::{total_stats, ShardData, ShardsResponse, TotalStats, DEGRADED_LATENCY_MS};
