//! Cache Module
//!
//! Shared fetch cache coordinated across tabs through a persistent store and
//! a broadcast channel.

mod channel;
mod clock;
mod coordinator;
mod entry;
mod message;
mod stats;
mod storage;


// Re-export public types
pub use channel::{BroadcastHub, Subscription, TabChannel, DEFAULT_CHANNEL_CAPACITY};
pub use clock::{Clock, ManualClock, SystemClock};
pub use coordinator::{CacheSettings, SharedFetchCache, DEFAULT_LEASE_DURATION};
pub use entry::{current_timestamp_ms, CacheEntry, RefreshLease};
pub use message::CrossTabMessage;
pub use stats::CacheStats;
pub use storage::{FileStore, KvStore, MemoryStore};

// == Public Constants ==
/// Maximum allowed key length in bytes
pub const MAX_KEY_LENGTH: usize = 256;
