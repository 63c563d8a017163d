//! Bundled static command list.

use std::path::Path;

use tracing::error;

use crate::models::{command, CommandsResponse, StaticCommandsResponse};

/// Reads the static commands file and expands it to the API shape.
///
/// Any failure is logged and yields an empty map.
pub async fn load_static_commands(path: &Path) -> CommandsResponse {
    let raw = match tokio::fs::read_to_string(path).await {
        Ok(raw) => raw,
        Err(err) => {
            error!(path = %path.display(), error = %err, "failed to load static commands data");
            return CommandsResponse::new();
        }
    };

    match serde_json::from_str::<StaticCommandsResponse>(&raw) {
        Ok(data) => command::from_static(data),
        Err(err) => {
            error!(path = %path.display(), error = %err, "failed to parse static commands data");
            CommandsResponse::new()
        }
    }
}
