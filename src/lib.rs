//! Site Cache - data layer of the greed bot website
//!
//! Fetches bot statistics, commands and outages from the bot API through a
//! shared fetch cache that deduplicates refreshes across tabs using a soft
//! lease in persistent storage and a cross-tab broadcast channel.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod site;
pub mod tasks;
pub mod upstream;

pub use api::AppState;
pub use cache::SharedFetchCache;
pub use config::Config;
pub use site::SiteData;
pub use tasks::spawn_refresh_task;
