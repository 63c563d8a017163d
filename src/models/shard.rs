//! Shard statistics reported by the bot API.

use serde::{Deserialize, Serialize};

/// Latency above which a shard (or the fleet average) counts as degraded.
pub const DEGRADED_LATENCY_MS: f64 = 80.0;

/// Live numbers for one gateway shard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShardData {
    pub uptime: f64,
    pub latency: f64,
    pub servers: u64,
    pub users: u64,
    pub shard: u32,
}

/// Body of `GET /status` on the bot API.
#[derive(Debug, Clone, Deserialize)]
pub struct ShardsResponse {
    pub shards: Vec<ShardData>,
}

/// Totals across every shard.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TotalStats {
    pub servers: u64,
    pub users: u64,
    pub average_latency: f64,
    pub shard_count: usize,
}

/// Sums servers and users and averages latency over `shards`.
///
/// The average is kept as a running value rounded after every shard, which is
/// what the status page has always displayed.
pub fn total_stats(shards: &[ShardData]) -> TotalStats {
    shards.iter().fold(TotalStats::default(), |acc, shard| {
        let count = acc.shard_count as f64;
        TotalStats {
            servers: acc.servers + shard.servers,
            users: acc.users + shard.users,
            average_latency: ((acc.average_latency * count + shard.latency) / (count + 1.0))
                .round(),
            shard_count: acc.shard_count + 1,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shard(shard: u32, latency: f64, servers: u64, users: u64) -> ShardData {
        ShardData {
            uptime: 1000.0,
            latency,
            servers,
            users,
            shard,
        }
    }

    #[test]
    fn test_total_stats_empty() {
        assert_eq!(total_stats(&[]), TotalStats::default());
    }

    #[test]
    fn test_total_stats_sums() {
        let totals = total_stats(&[shard(0, 40.0, 10, 100), shard(1, 60.0, 5, 50)]);

        assert_eq!(totals.servers, 15);
        assert_eq!(totals.users, 150);
        assert_eq!(totals.average_latency, 50.0);
        assert_eq!(totals.shard_count, 2);
    }

    #[test]
    fn test_total_stats_rounds_running_average() {
        // 41 -> 41; (41 + 42) / 2 = 41.5 -> 42; (42 * 2 + 40) / 3 = 41.33 -> 41
        let totals = total_stats(&[
            shard(0, 41.0, 0, 0),
            shard(1, 42.0, 0, 0),
            shard(2, 40.0, 0, 0),
        ]);
        assert_eq!(totals.average_latency, 41.0);
    }

    #[test]
    fn test_shards_response_deserialize() {
        let json = r#"{"shards":[{"uptime":12.5,"latency":33,"servers":4,"users":9,"shard":0}]}"#;
        let parsed: ShardsResponse = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.shards.len(), 1);
        assert_eq!(parsed.shards[0].latency, 33.0);
    }
}
