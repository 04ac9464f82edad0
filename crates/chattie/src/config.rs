//! Per-guild settings: whether to learn, and where to learn and speak.

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chain_store::{GuildId, write_atomic};
use serde::{Deserialize, Serialize};

use crate::ChattieError;

/// Identifier of a text channel.
#[derive(Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Serialize, Deserialize)]
pub struct ChannelId(pub u64);

impl ChannelId {
    /// Chat mention markup, e.g. `<#123>`.
    pub fn mention(self) -> String {
        format!("<#{}>", self.0)
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Settings of one guild.
///
/// Missing fields in a stored document fall back to the defaults, so older
/// documents keep loading when fields are added.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuildConfig {
    /// Learn from conversation in `learn_channels`.
    pub learn: bool,
    /// Channels whose messages extend the corpus.
    pub learn_channels: Vec<ChannelId>,
    /// Channels the bot may reply in. Empty means anywhere.
    pub speak_channels: Vec<ChannelId>,
}

impl Default for GuildConfig {
    fn default() -> Self {
        GuildConfig {
            learn: true,
            learn_channels: Vec::new(),
            speak_channels: Vec::new(),
        }
    }
}

impl GuildConfig {
    /// Whether messages in `channel` should be learned.
    pub fn learns_in(&self, channel: ChannelId) -> bool {
        self.learn && self.learn_channels.contains(&channel)
    }

    /// Whether the bot may reply in `channel`.
    pub fn speaks_in(&self, channel: ChannelId) -> bool {
        self.speak_channels.is_empty() || self.speak_channels.contains(&channel)
    }
}

/// Load/save access to every guild's [`GuildConfig`].
pub trait ConfigStore: Send + Sync {
    /// The guild's settings, or the defaults if none were saved.
    fn load(&self, guild: GuildId) -> Result<GuildConfig, ChattieError>;

    fn save(&self, guild: GuildId, config: &GuildConfig) -> Result<(), ChattieError>;
}

/// One JSON document per guild under `<data_dir>/guilds/`.
#[derive(Debug, Clone)]
pub struct FileConfigStore {
    dir: PathBuf,
}

impl FileConfigStore {
    pub fn new(data_dir: impl AsRef<Path>) -> Self {
        FileConfigStore {
            dir: data_dir.as_ref().join("guilds"),
        }
    }

    pub fn path(&self, guild: GuildId) -> PathBuf {
        self.dir.join(format!("{guild}.json"))
    }
}

impl ConfigStore for FileConfigStore {
    fn load(&self, guild: GuildId) -> Result<GuildConfig, ChattieError> {
        let path = self.path(guild);
        match fs::read(&path) {
            Ok(bytes) => serde_json::from_slice(&bytes)
                .map_err(|source| ChattieError::ConfigCorrupt { guild, source }),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(GuildConfig::default()),
            Err(source) => Err(ChattieError::Io { path, source }),
        }
    }

    fn save(&self, guild: GuildId, config: &GuildConfig) -> Result<(), ChattieError> {
        let bytes = serde_json::to_vec_pretty(config)
            .map_err(|source| ChattieError::ConfigCorrupt { guild, source })?;
        write_atomic(&self.path(guild), &bytes)?;
        Ok(())
    }
}

/// Guild settings held in memory.
#[derive(Debug, Default)]
pub struct MemoryConfigStore {
    configs: Mutex<HashMap<GuildId, GuildConfig>>,
}

impl MemoryConfigStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ConfigStore for MemoryConfigStore {
    fn load(&self, guild: GuildId) -> Result<GuildConfig, ChattieError> {
        let configs = self.configs.lock().unwrap_or_else(|e| e.into_inner());
        Ok(configs.get(&guild).cloned().unwrap_or_default())
    }

    fn save(&self, guild: GuildId, config: &GuildConfig) -> Result<(), ChattieError> {
        let mut configs = self.configs.lock().unwrap_or_else(|e| e.into_inner());
        configs.insert(guild, config.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_learn_nowhere_and_speak_anywhere() {
        let config = GuildConfig::default();
        assert!(config.learn);
        assert!(!config.learns_in(ChannelId(1)));
        assert!(config.speaks_in(ChannelId(1)));
    }

    #[test]
    fn learn_needs_toggle_and_channel() {
        let mut config = GuildConfig {
            learn_channels: vec![ChannelId(10)],
            ..GuildConfig::default()
        };
        assert!(config.learns_in(ChannelId(10)));
        assert!(!config.learns_in(ChannelId(11)));
        config.learn = false;
        assert!(!config.learns_in(ChannelId(10)));
    }

    #[test]
    fn speak_list_restricts() {
        let config = GuildConfig {
            speak_channels: vec![ChannelId(3)],
            ..GuildConfig::default()
        };
        assert!(config.speaks_in(ChannelId(3)));
        assert!(!config.speaks_in(ChannelId(4)));
    }

    #[test]
    fn mention_markup() {
        assert_eq!(ChannelId(99).mention(), "<#99>");
    }

    #[test]
    fn partial_document_uses_defaults() {
        let config: GuildConfig = serde_json::from_str(r#"{"speak_channels":[5]}"#).unwrap();
        assert!(config.learn);
        assert_eq!(config.speak_channels, vec![ChannelId(5)]);
    }

    #[test]
    fn file_store_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileConfigStore::new(dir.path());
        let guild = GuildId(8);

        assert_eq!(store.load(guild).unwrap(), GuildConfig::default());

        let config = GuildConfig {
            learn: false,
            learn_channels: vec![ChannelId(1), ChannelId(2)],
            speak_channels: vec![ChannelId(3)],
        };
        store.save(guild, &config).unwrap();
        assert_eq!(store.load(guild).unwrap(), config);
    }

    #[test]
    fn file_store_reports_corruption() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileConfigStore::new(dir.path());
        let guild = GuildId(8);
        fs::create_dir_all(store.path(guild).parent().unwrap()).unwrap();
        fs::write(store.path(guild), "{learn: maybe").unwrap();
        assert!(matches!(store.load(guild), Err(ChattieError::ConfigCorrupt { .. })));
    }

    #[test]
    fn memory_store_roundtrip() {
        let store = MemoryConfigStore::new();
        let config = GuildConfig {
            learn: false,
            ..GuildConfig::default()
        };
        store.save(GuildId(1), &config).unwrap();
        assert_eq!(store.load(GuildId(1)).unwrap(), config);
        assert_eq!(store.load(GuildId(2)).unwrap(), GuildConfig::default());
    }
}
