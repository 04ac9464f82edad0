use std::path::PathBuf;

use chain_store::{CorruptError, GuildId, StoreError};

/// Everything that can go wrong in a chattie operation.
#[derive(Debug, thiserror::Error)]
pub enum ChattieError {
    /// Training text produced no sentences.
    #[error("no data found to train with")]
    NoData,

    /// Speaking was requested before the guild was ever trained.
    #[error("guild {0} has no corpus yet")]
    NoCorpus(GuildId),

    /// The stored corpus cannot be decoded. Retraining with erase replaces it.
    #[error("corpus for guild {guild} is corrupt: {source}")]
    CorpusCorrupt {
        guild: GuildId,
        #[source]
        source: CorruptError,
    },

    /// The stored guild configuration cannot be parsed.
    #[error("configuration for guild {guild} is corrupt: {source}")]
    ConfigCorrupt {
        guild: GuildId,
        #[source]
        source: serde_json::Error,
    },

    /// The corpus could not be serialized; nothing was written.
    #[error("cannot encode corpus for guild {guild}: {source}")]
    CorpusEncode {
        guild: GuildId,
        #[source]
        source: serde_json::Error,
    },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl From<StoreError> for ChattieError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Corrupt { guild, source } => ChattieError::CorpusCorrupt { guild, source },
            StoreError::Encode { guild, source } => {
                ChattieError::CorpusEncode { guild, source }
            }
            StoreError::Io { path, source } => ChattieError::Io { path, source },
        }
    }
}

impl ChattieError {
    /// Short status line suitable for showing to chat users.
    pub fn user_message(&self) -> &'static str {
        match self {
            ChattieError::NoData => "No data found to train with",
            ChattieError::NoCorpus(_) => "I haven't been trained yet",
            ChattieError::CorpusCorrupt { .. } => {
                "My memory is unreadable, please retrain me with erase_memory"
            }
            ChattieError::ConfigCorrupt { .. } => "My settings are unreadable",
            ChattieError::CorpusEncode { .. } | ChattieError::Io { .. } => "Something went wrong while saving my memory",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_errors_convert() {
        let corrupt = StoreError::Corrupt {
            guild: GuildId(5),
            source: CorruptError::ZeroOrder,
        };
        assert!(matches!(
            ChattieError::from(corrupt),
            ChattieError::CorpusCorrupt { guild: GuildId(5), .. }
        ));

        let io = StoreError::Io {
            path: PathBuf::from("x"),
            source: std::io::Error::other("disk full"),
        };
        assert!(matches!(ChattieError::from(io), ChattieError::Io { .. }));

        let encode = StoreError::Encode {
            guild: GuildId(6),
            source: serde_json::from_str::<u8>("x").unwrap_err(),
        };
        let err = ChattieError::from(encode);
        assert!(matches!(err, ChattieError::CorpusEncode { guild: GuildId(6), .. }));
        assert_eq!(err.user_message(), "Something went wrong while saving my memory");
    }

    #[test]
    fn user_messages() {
        assert_eq!(ChattieError::NoData.user_message(), "No data found to train with");
        assert_eq!(
            ChattieError::NoCorpus(GuildId(1)).to_string(),
            "guild 1 has no corpus yet"
        );
    }
}
