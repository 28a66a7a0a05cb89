use std::collections::HashMap;
use std::fs;
use std::path::Path;

use bevy_ecs::prelude::*;
use bevy_utils::tracing::warn;
use serde::{Deserialize, Serialize};
use thiserror::Error;

const DEFAULT_PUNISH_INTERVAL: u64 = 10;

/// What happens to a block selected for punishment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PunishmentType {
    #[default]
    None,
    #[serde(alias = "ShutOffBlock")]
    Disable,
    #[serde(alias = "DeleteBlock")]
    Delete,
    Explode,
}

impl PunishmentType {
    /// Destructive punishments remove the block, so the recorded count can be
    /// lowered right away.
    pub fn is_destructive(self) -> bool {
        matches!(self, PunishmentType::Delete | PunishmentType::Explode)
    }
}

/// Which relation between a player identity and a block counts as ownership.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BlockOwnerState {
    #[default]
    OwnedBy,
    BuiltBy,
    GridMajorityOwner,
    GridShareholder,
}

/// One quota rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitItem {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub block_list: Vec<String>,
    pub limit: u32,
    #[serde(default)]
    pub limit_grids: bool,
    #[serde(default)]
    pub limit_players: bool,
    #[serde(default)]
    pub limit_faction: bool,
    #[serde(default)]
    pub ignore_npcs: bool,
    #[serde(default)]
    pub block_owner_state: BlockOwnerState,
    #[serde(default)]
    pub punishment: PunishmentType,
    #[serde(default)]
    pub exceptions: Vec<String>,
    /// Owner id -> matching block count, kept current by the usage counter.
    #[serde(default)]
    pub found_entities: HashMap<i64, u32>,
}

impl LimitItem {
    pub fn new(limit: u32, punishment: PunishmentType) -> Self {
        Self {
            name: None,
            block_list: Vec::new(),
            limit,
            limit_grids: false,
            limit_players: false,
            limit_faction: false,
            ignore_npcs: false,
            block_owner_state: BlockOwnerState::default(),
            punishment,
            exceptions: Vec::new(),
            found_entities: HashMap::new(),
        }
    }

    pub fn label(&self) -> &str {
        self.name.as_deref().unwrap_or("unnamed limit")
    }

    /// Record the current count for an owner, replacing the previous value.
    pub fn record_usage(&mut self, owner_id: i64, count: u32) {
        self.found_entities.insert(owner_id, count);
    }

    pub fn usage(&self, owner_id: i64) -> Option<u32> {
        self.found_entities.get(&owner_id).copied()
    }
}

/// Resource: the whole limiter configuration.
#[derive(Resource, Debug, Clone, Serialize, Deserialize)]
pub struct LimiterConfig {
    #[serde(default = "default_enabled")]
    pub enable_limits: bool,
    #[serde(default)]
    pub enable_log: bool,
    /// Ticks between two enforcement cycles.
    #[serde(default = "default_punish_interval")]
    pub punish_interval: u64,
    #[serde(default)]
    pub limits: Vec<LimitItem>,
}

fn default_enabled() -> bool {
    true
}

fn default_punish_interval() -> u64 {
    DEFAULT_PUNISH_INTERVAL
}

impl Default for LimiterConfig {
    fn default() -> Self {
        Self {
            enable_limits: true,
            enable_log: false,
            punish_interval: DEFAULT_PUNISH_INTERVAL,
            limits: Vec::new(),
        }
    }
}

#[derive(Debug, Error)]
pub enum DataError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("{0}")]
    Validation(String),
}

impl LimiterConfig {
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, DataError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| DataError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let config: LimiterConfig =
            serde_json::from_str(&raw).map_err(|source| DataError::Json {
                path: path.display().to_string(),
                source,
            })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), DataError> {
        if self.punish_interval == 0 {
            return Err(DataError::Validation(
                "punish_interval must be at least 1 tick".to_string(),
            ));
        }
        for item in &self.limits {
            if item.block_list.is_empty() {
                warn!(limit = item.label(), "limit has an empty block list and will never match");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn legacy_punishment_names_are_accepted() {
        let parsed: Vec<PunishmentType> =
            serde_json::from_str(r#"["ShutOffBlock", "DeleteBlock", "Explode", "None"]"#).unwrap();
        assert_eq!(
            parsed,
            vec![
                PunishmentType::Disable,
                PunishmentType::Delete,
                PunishmentType::Explode,
                PunishmentType::None
            ]
        );
    }

    #[test]
    fn only_delete_and_explode_are_destructive() {
        assert!(PunishmentType::Delete.is_destructive());
        assert!(PunishmentType::Explode.is_destructive());
        assert!(!PunishmentType::Disable.is_destructive());
        assert!(!PunishmentType::None.is_destructive());
    }

    #[test]
    fn loads_config_with_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
                "enable_log": true,
                "limits": [
                    {{
                        "name": "reactors",
                        "block_list": ["Reactor"],
                        "limit": 5,
                        "limit_grids": true,
                        "punishment": "DeleteBlock",
                        "found_entities": {{ "42": 8 }}
                    }}
                ]
            }}"#
        )
        .unwrap();

        let config = LimiterConfig::load_from_path(file.path()).unwrap();
        assert!(config.enable_limits);
        assert!(config.enable_log);
        assert_eq!(config.punish_interval, DEFAULT_PUNISH_INTERVAL);

        let item = &config.limits[0];
        assert_eq!(item.label(), "reactors");
        assert_eq!(item.punishment, PunishmentType::Delete);
        assert_eq!(item.block_owner_state, BlockOwnerState::OwnedBy);
        assert!(item.limit_grids && !item.limit_players && !item.limit_faction);
        assert_eq!(item.usage(42), Some(8));
    }

    #[test]
    fn zero_interval_is_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "punish_interval": 0 }}"#).unwrap();

        let err = LimiterConfig::load_from_path(file.path()).unwrap_err();
        assert!(matches!(err, DataError::Validation(_)));
    }

    #[test]
    fn missing_file_reports_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = LimiterConfig::load_from_path(dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, DataError::Io { .. }));
    }

    #[test]
    fn malformed_json_reports_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();

        let err = LimiterConfig::load_from_path(file.path()).unwrap_err();
        assert!(matches!(err, DataError::Json { .. }));
    }
}
