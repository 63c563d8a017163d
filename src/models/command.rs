//! Bot command metadata shown in the command browser.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// One command as returned by the API.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommandData {
    pub name: String,
    #[serde(default)]
    pub brief: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub permissions: Option<Vec<String>>,
    #[serde(default)]
    pub bot_permissions: Option<Vec<String>>,
    #[serde(default)]
    pub usage: Option<String>,
    #[serde(default)]
    pub example: Option<String>,
}

/// Commands grouped by category.
pub type CommandsResponse = BTreeMap<String, Vec<CommandData>>;

/// Reduced command shape of the bundled static commands file.
#[derive(Debug, Clone, Deserialize)]
pub struct StaticCommandData {
    pub name: String,
    #[serde(default)]
    pub brief: Option<String>,
    #[serde(default)]
    pub example: Option<String>,
}

pub type StaticCommandsResponse = BTreeMap<String, Vec<StaticCommandData>>;

impl From<StaticCommandData> for CommandData {
    fn from(cmd: StaticCommandData) -> Self {
        Self {
            name: cmd.name,
            brief: cmd.brief.filter(|b| !b.is_empty()),
            example: cmd.example.filter(|e| !e.is_empty()),
            ..Self::default()
        }
    }
}

/// Expands static commands into the API response shape.
pub fn from_static(data: StaticCommandsResponse) -> CommandsResponse {
    data.into_iter()
        .map(|(category, commands)| {
            (
                category,
                commands.into_iter().map(CommandData::from).collect(),
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_commands_response_deserialize() {
        let json = r#"{"Moderation":[{"name":"ban","brief":"Ban a member","permissions":["ban_members"]}]}"#;
        let parsed: CommandsResponse = serde_json::from_str(json).unwrap();

        let ban = &parsed["Moderation"][0];
        assert_eq!(ban.name, "ban");
        assert_eq!(ban.permissions.as_deref(), Some(&["ban_members".to_string()][..]));
        assert!(ban.usage.is_none());
    }

    #[test]
    fn test_from_static_fills_missing_fields() {
        let json = r#"{"Fun":[{"name":"8ball","brief":"","example":"8ball will it rain"}]}"#;
        let data: StaticCommandsResponse = serde_json::from_str(json).unwrap();
        let converted = from_static(data);

        let cmd = &converted["Fun"][0];
        assert_eq!(cmd.name, "8ball");
        assert!(cmd.brief.is_none());
        assert_eq!(cmd.example.as_deref(), Some("8ball will it rain"));
        assert!(cmd.description.is_none());
        assert!(cmd.bot_permissions.is_none());
    }
}
