//! Chattie: a per-guild Markov chain chat bot.
//!
//! This is the facade crate that wires together the lower-level components:
//! - [`chattie_tokenizer`]: sentence splitting and message tidying
//! - `chain-token`: tokens, sentence markers and chain states
//! - [`markov_chain`]: chain building and additive merge
//! - [`chain_store`]: corpus encoding and per-guild stores
//! - [`chattie_gen`]: sentence generation
//!
//! On top of those it adds the per-guild [`CorpusManager`], guild settings
//! ([`GuildConfig`] behind a [`ConfigStore`]) and the chat-facing [`Chattie`]
//! bot, which turns incoming messages into [`Action`]s.
//!
//! # Quick Start
//!
//! ```
//! use chattie::{Chattie, ChannelId, GuildId, IncomingMessage, MemoryConfigStore,
//!               MemoryCorpusStore, Settings, UserId};
//! use rand::SeedableRng;
//! use rand::rngs::SmallRng;
//!
//! let mut bot = Chattie::new(
//!     MemoryCorpusStore::new(),
//!     MemoryConfigStore::new(),
//!     Settings::default(),
//!     UserId(1),
//!     SmallRng::seed_from_u64(42),
//! );
//! bot.corpus().train(GuildId(7), "The cat sat on the mat.", true).unwrap();
//!
//! let actions = bot.handle_message(&IncomingMessage {
//!     guild: Some(GuildId(7)),
//!     channel: ChannelId(3),
//!     author: UserId(2),
//!     content: "@chattie say something".into(),
//!     mentions_bot: true,
//!     is_command: false,
//! });
//! assert_eq!(actions.len(), 1);
//! ```

mod bot;
mod config;
mod corpus;
mod error;
mod locks;

pub use bot::{
    Action, ChannelList, Chattie, IncomingMessage, MAX_MESSAGE_CHARS, Reply, Settings, THINKING,
    UserId,
};
pub use config::{ChannelId, ConfigStore, FileConfigStore, GuildConfig, MemoryConfigStore};
pub use corpus::{CorpusManager, TrainReport};
pub use error::ChattieError;
pub use locks::GuildLocks;

// Re-export types that consumers (like the CLI) need.
pub use chain_store::{CorpusStore, FileCorpusStore, GuildId, MemoryCorpusStore};
pub use chattie_gen::SpeakLimit;
pub use markov_chain::{Chain, DEFAULT_ORDER, MAX_ORDER};
