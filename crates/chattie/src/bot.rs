//! The chat-facing side: message handling and admin commands.
//!
//! Nothing here talks to a chat platform. [`Chattie::handle_message`] takes a
//! plain description of an incoming message and returns the [`Action`]s the
//! caller should perform; the admin commands return a [`Reply`] to show.

use std::fmt;
use std::time::Duration;

use chain_store::{CorpusStore, GuildId};
use chattie_gen::SpeakLimit;
use chattie_tokenizer::{join_messages, tidy_message};
use markov_chain::DEFAULT_ORDER;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::{
    ChannelId, ChattieError, ConfigStore, CorpusManager, GuildConfig, GuildLocks, TrainReport,
};

/// Identifier of a chat user.
#[derive(Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Serialize, Deserialize)]
pub struct UserId(pub u64);

/// Longest message the bot will send.
pub const MAX_MESSAGE_CHARS: usize = 2000;

/// Reply used when no sentence could be generated.
pub const THINKING: &str = ":thinking:";

/// Runtime knobs.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Order of newly created corpora.
    pub order: usize,
    /// Bounds on sentence generation.
    pub limit: SpeakLimit,
    /// Simulated typing speed used to pace replies.
    pub typing_chars_per_sec: f64,
    /// Typing delay before the [`THINKING`] reply.
    pub thinking_delay: Duration,
    /// Messages read from channel history when training without a limit.
    pub history_limit: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            order: DEFAULT_ORDER,
            limit: SpeakLimit {
                max_chars: Some(MAX_MESSAGE_CHARS),
                ..SpeakLimit::default()
            },
            typing_chars_per_sec: 20.0,
            thinking_delay: Duration::from_millis(200),
            history_limit: 100,
        }
    }
}

impl Settings {
    /// How long to show "typing" before sending `text`.
    pub fn typing_delay(&self, text: &str) -> Duration {
        if self.typing_chars_per_sec <= 0.0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(text.chars().count() as f64 / self.typing_chars_per_sec)
    }
}

/// A message seen by the bot.
#[derive(Debug, Clone)]
pub struct IncomingMessage {
    /// `None` for direct messages.
    pub guild: Option<GuildId>,
    pub channel: ChannelId,
    pub author: UserId,
    /// Message text with mentions already rendered as plain text.
    pub content: String,
    /// Whether the bot itself is mentioned.
    pub mentions_bot: bool,
    /// Whether the message invoked a bot command.
    pub is_command: bool,
}

/// A side effect requested by the bot.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Show "typing" in `channel` for `typing`, then send `text`.
    Say {
        channel: ChannelId,
        text: String,
        typing: Duration,
    },
}

/// Response to an admin command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Text(String),
    /// A titled list, shown as an embed by chat front ends.
    Listing { title: String, description: String },
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reply::Text(text) => f.write_str(text),
            Reply::Listing { title, description } => write!(f, "{title}: {description}"),
        }
    }
}

/// Which per-guild channel list a command works on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelList {
    Learn,
    Speak,
}

impl ChannelList {
    fn title(self) -> &'static str {
        match self {
            ChannelList::Learn => "Learn channels",
            ChannelList::Speak => "Speak channels",
        }
    }

    fn get(self, config: &mut GuildConfig) -> &mut Vec<ChannelId> {
        match self {
            ChannelList::Learn => &mut config.learn_channels,
            ChannelList::Speak => &mut config.speak_channels,
        }
    }

    fn added(self, channel: ChannelId) -> String {
        match self {
            ChannelList::Learn => format!("{} is now a learn channel", channel.mention()),
            ChannelList::Speak => format!("I can now speak in {}", channel.mention()),
        }
    }

    fn already_added(self, channel: ChannelId) -> String {
        match self {
            ChannelList::Learn => format!("{} is already a learn channel", channel.mention()),
            ChannelList::Speak => format!("I can already speak in {}", channel.mention()),
        }
    }

    fn removed(self, channel: ChannelId) -> String {
        match self {
            ChannelList::Learn => format!("{} is no longer a learn channel", channel.mention()),
            ChannelList::Speak => format!("I can no longer speak in {}", channel.mention()),
        }
    }

    fn not_present(self, channel: ChannelId) -> String {
        match self {
            ChannelList::Learn => format!("{} is not a learn channel", channel.mention()),
            ChannelList::Speak => format!("I cannot speak in {}", channel.mention()),
        }
    }
}

/// The chattie bot.
///
/// Generic over the corpus store, the config store and the PRNG so it can run
/// against files, memory, or a seeded generator in tests.
pub struct Chattie<S: CorpusStore, C: ConfigStore, R: Rng> {
    corpus: CorpusManager<S>,
    config: C,
    config_locks: GuildLocks,
    settings: Settings,
    bot_user: UserId,
    rng: R,
}

impl<S: CorpusStore, C: ConfigStore, R: Rng> Chattie<S, C, R> {
    pub fn new(corpus: S, config: C, settings: Settings, bot_user: UserId, rng: R) -> Self {
        Chattie {
            corpus: CorpusManager::new(corpus, settings.order),
            config,
            config_locks: GuildLocks::new(),
            settings,
            bot_user,
            rng,
        }
    }

    /// The corpus manager, for direct train/learn/speak access.
    pub fn corpus(&self) -> &CorpusManager<S> {
        &self.corpus
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// A guild's current configuration.
    pub fn guild_config(&self, guild: GuildId) -> Result<GuildConfig, ChattieError> {
        self.config.load(guild)
    }

    /// React to a message: learn from it and/or reply to it.
    ///
    /// Failures never escape: a missing corpus is silently ignored and any
    /// other error is logged and produces no action.
    pub fn handle_message(&mut self, message: &IncomingMessage) -> Vec<Action> {
        match self.try_handle(message) {
            Ok(actions) => actions,
            Err(ChattieError::NoCorpus(_)) => Vec::new(),
            Err(e) => {
                tracing::warn!(
                    guild = ?message.guild,
                    channel = %message.channel,
                    error = %e,
                    "failed to handle message"
                );
                Vec::new()
            }
        }
    }

    fn try_handle(&mut self, message: &IncomingMessage) -> Result<Vec<Action>, ChattieError> {
        let Some(guild) = message.guild else {
            return Ok(Vec::new());
        };
        if message.is_command || message.author == self.bot_user {
            return Ok(Vec::new());
        }
        if !self.corpus.has_corpus(guild)? {
            return Ok(Vec::new());
        }

        let config = self.config.load(guild)?;
        if config.learns_in(message.channel)
            && let Some(text) = tidy_message(&message.content)
        {
            self.corpus.learn(guild, &text)?;
        }

        if !(message.mentions_bot && config.speaks_in(message.channel)) {
            return Ok(Vec::new());
        }

        let action = match self.corpus.speak(guild, &self.settings.limit, &mut self.rng)? {
            Some(text) => Action::Say {
                channel: message.channel,
                typing: self.settings.typing_delay(&text),
                text,
            },
            None => Action::Say {
                channel: message.channel,
                text: THINKING.to_owned(),
                typing: self.settings.thinking_delay,
            },
        };
        Ok(vec![action])
    }

    /// Flip whether the guild learns from conversation.
    pub fn toggle_learn(&self, guild: GuildId) -> Result<Reply, ChattieError> {
        self.update_config(guild, |config| {
            config.learn = !config.learn;
            if config.learn {
                let channels = mentions(&config.learn_channels);
                format!("I will learn from conversations in **{channels}**")
            } else {
                "I will not learn from conversations".to_owned()
            }
        })
        .map(Reply::Text)
    }

    /// Add a channel to one of the guild's lists.
    pub fn add_channel(
        &self,
        guild: GuildId,
        list: ChannelList,
        channel: ChannelId,
    ) -> Result<Reply, ChattieError> {
        self.update_config(guild, |config| {
            let channels = list.get(config);
            if channels.contains(&channel) {
                list.already_added(channel)
            } else {
                channels.push(channel);
                list.added(channel)
            }
        })
        .map(Reply::Text)
    }

    /// Remove a channel from one of the guild's lists.
    pub fn remove_channel(
        &self,
        guild: GuildId,
        list: ChannelList,
        channel: ChannelId,
    ) -> Result<Reply, ChattieError> {
        self.update_config(guild, |config| {
            let channels = list.get(config);
            match channels.iter().position(|&c| c == channel) {
                Some(idx) => {
                    channels.remove(idx);
                    list.removed(channel)
                }
                None => list.not_present(channel),
            }
        })
        .map(Reply::Text)
    }

    /// Show one of the guild's lists.
    pub fn list_channels(&self, guild: GuildId, list: ChannelList) -> Result<Reply, ChattieError> {
        let mut config = self.config.load(guild)?;
        let channels = list.get(&mut config);
        let description = if channels.is_empty() {
            "None".to_owned()
        } else {
            mentions(channels)
        };
        Ok(Reply::Listing {
            title: list.title().to_owned(),
            description,
        })
    }

    /// Train from a channel's message history, newest first.
    ///
    /// Reads at most `limit` messages (the configured history limit when
    /// `None`). With `erase_memory` the result replaces the corpus.
    pub fn train_channel<I, T>(
        &self,
        guild: GuildId,
        history: I,
        limit: Option<usize>,
        erase_memory: bool,
    ) -> Result<TrainReport, ChattieError>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        let limit = limit.unwrap_or(self.settings.history_limit);
        let corpus = join_messages(history.into_iter().take(limit));
        self.corpus.train(guild, &corpus, erase_memory)
    }

    /// [`train_channel`](Self::train_channel) reported as status lines.
    ///
    /// `progress` receives the "Training from channel" line before any
    /// history is read; the returned reply is the final status.
    pub fn train_channel_status<I, T>(
        &self,
        guild: GuildId,
        channel: ChannelId,
        history: I,
        limit: Option<usize>,
        erase_memory: bool,
        mut progress: impl FnMut(Reply),
    ) -> Reply
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        progress(Reply::Text(format!(
            ":brain: Training from channel {}",
            channel.mention()
        )));
        match self.train_channel(guild, history, limit, erase_memory) {
            Ok(_) => Reply::Text(":white_check_mark: Successfully trained!".to_owned()),
            Err(e) => {
                if !matches!(e, ChattieError::NoData) {
                    tracing::warn!(%guild, error = %e, "training failed");
                }
                Reply::Text(format!(":x: {}", e.user_message()))
            }
        }
    }

    fn update_config<T>(
        &self,
        guild: GuildId,
        f: impl FnOnce(&mut GuildConfig) -> T,
    ) -> Result<T, ChattieError> {
        self.config_locks.with(guild, || {
            let mut config = self.config.load(guild)?;
            let out = f(&mut config);
            self.config.save(guild, &config)?;
            Ok(out)
        })
    }
}

fn mentions(channels: &[ChannelId]) -> String {
    channels
        .iter()
        .map(|c| c.mention())
        .collect::<Vec<_>>()
        .join(", ")
}
