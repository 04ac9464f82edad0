//! Per-guild corpus lifecycle: train, learn, speak.
//!
//! Every operation is a whole-corpus read-modify-write against a
//! [`CorpusStore`], run under the guild's lock. Nothing is cached between
//! calls.

use chain_store::{CorpusStore, GuildId};
use chattie_gen::{SpeakLimit, generate};
use chattie_tokenizer::split;
use markov_chain::{Chain, MAX_ORDER};
use rand::Rng;

use crate::{ChattieError, GuildLocks};

/// What a successful [`CorpusManager::train`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrainReport {
    /// Sentences found in the training text.
    pub sentences: usize,
    /// States in the stored corpus afterwards.
    pub states: usize,
    /// Whether the text was merged into an existing corpus (as opposed to
    /// starting a new one).
    pub merged: bool,
}

/// Owns corpus access for every guild.
pub struct CorpusManager<S: CorpusStore> {
    store: S,
    order: usize,
    locks: GuildLocks,
}

impl<S: CorpusStore> CorpusManager<S> {
    /// Manage corpora in `store`. New corpora use the given chain order;
    /// existing corpora keep the order they were created with.
    ///
    /// # Panics
    ///
    /// Panics if `order` is zero or greater than [`MAX_ORDER`].
    pub fn new(store: S, order: usize) -> Self {
        assert!(order > 0, "chain order must be at least 1");
        assert!(order <= MAX_ORDER, "chain order must be at most {MAX_ORDER}");
        CorpusManager {
            store,
            order,
            locks: GuildLocks::new(),
        }
    }

    /// The underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Order used for newly created corpora.
    pub fn order(&self) -> usize {
        self.order
    }

    /// Whether the guild has a stored corpus.
    pub fn has_corpus(&self, guild: GuildId) -> Result<bool, ChattieError> {
        self.locks
            .with(guild, || Ok(self.store.load(guild)?.is_some()))
    }

    /// Train the guild's corpus on `text`.
    ///
    /// With `reset`, or when the guild has no corpus yet, the chain built from
    /// `text` becomes the corpus. Otherwise it is merged into the stored one.
    /// Fails with [`ChattieError::NoData`], leaving storage untouched, if the
    /// text contains no sentences.
    pub fn train(&self, guild: GuildId, text: &str, reset: bool) -> Result<TrainReport, ChattieError> {
        let sentences = split(text).count();
        if sentences == 0 {
            return Err(ChattieError::NoData);
        }

        self.locks.with(guild, || {
            let existing = if reset { None } else { self.store.load(guild)? };
            let merged = existing.is_some();

            let corpus = match existing {
                Some(mut corpus) => {
                    corpus.absorb(&Chain::build(split(text), corpus.order()));
                    corpus
                }
                None => Chain::build(split(text), self.order),
            };
            self.store.save(guild, &corpus)?;

            tracing::info!(%guild, sentences, states = corpus.len(), merged, "trained corpus");
            Ok(TrainReport {
                sentences,
                states: corpus.len(),
                merged,
            })
        })
    }

    /// Extend an existing corpus with `text`.
    ///
    /// Returns `Ok(false)` without creating anything when the guild has no
    /// corpus: learning only grows a corpus that training started.
    pub fn learn(&self, guild: GuildId, text: &str) -> Result<bool, ChattieError> {
        self.locks.with(guild, || {
            let Some(mut corpus) = self.store.load(guild)? else {
                return Ok(false);
            };
            let update = Chain::build(split(text), corpus.order());
            if update.is_empty() {
                return Err(ChattieError::NoData);
            }
            corpus.absorb(&update);
            self.store.save(guild, &corpus)?;

            tracing::debug!(%guild, states = corpus.len(), "learned message");
            Ok(true)
        })
    }

    /// Generate a sentence from the guild's corpus.
    ///
    /// `Ok(None)` means every attempt failed; the caller decides how to say so.
    pub fn speak<R: Rng>(
        &self,
        guild: GuildId,
        limit: &SpeakLimit,
        rng: &mut R,
    ) -> Result<Option<String>, ChattieError> {
        let corpus = self
            .locks
            .with(guild, || self.store.load(guild))?
            .ok_or(ChattieError::NoCorpus(guild))?;
        Ok(generate(&corpus, limit, rng))
    }
}
