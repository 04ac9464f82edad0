//! Persistence for per-guild Markov chains.
//!
//! A chain is stored as one self-describing JSON document holding its order
//! and every (state, successor, count) entry. [`encode`] and [`decode`]
//! round-trip exactly; [`decode`] validates structure and refuses anything
//! that could not have been produced by a real chain.
//!
//! The [`CorpusStore`] trait addresses those documents by [`GuildId`].
//! [`FileCorpusStore`] keeps one file per guild and replaces it atomically;
//! [`MemoryCorpusStore`] keeps the encoded bytes in memory.

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chain_token::{State, Token};
use markov_chain::{Chain, MAX_ORDER};
use serde::{Deserialize, Serialize};
use serde_json::Number;
use tempfile::NamedTempFile;

/// Identifier of the guild that owns a corpus.
#[derive(Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Serialize, Deserialize)]
pub struct GuildId(pub u64);

impl fmt::Display for GuildId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Why a stored corpus could not be decoded.
#[derive(Debug, thiserror::Error)]
pub enum CorruptError {
    #[error("malformed corpus document: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("corpus order must be at least 1")]
    ZeroOrder,

    #[error("corpus order {0} exceeds the maximum of {max}", max = MAX_ORDER)]
    OrderTooLarge(usize),

    #[error("state has {found} tokens, expected {expected}")]
    Arity { expected: usize, found: usize },

    #[error("count {count} for {state} -> {next} is not a positive integer")]
    BadCount {
        state: String,
        next: String,
        count: String,
    },

    #[error("unknown marker {0:?}")]
    UnknownMarker(String),

    #[error("misplaced marker in state {0}")]
    MisplacedMarker(String),

    #[error("BEGIN cannot follow state {0}")]
    BeginSuccessor(String),

    #[error("state {0} has no successors")]
    NoSuccessors(String),

    #[error("count for {state} -> {next} overflows")]
    CountOverflow { state: String, next: String },
}

/// Failure reading or writing a store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("corpus for guild {guild} is corrupt: {source}")]
    Corrupt {
        guild: GuildId,
        #[source]
        source: CorruptError,
    },

    #[error("cannot encode corpus for guild {guild}: {source}")]
    Encode {
        guild: GuildId,
        #[source]
        source: serde_json::Error,
    },
}

// ---------------------------------------------------------------------------
// Wire format
// ---------------------------------------------------------------------------

#[derive(Serialize, Deserialize)]
struct WireCorpus {
    order: usize,
    chain: Vec<WireEntry>,
}

#[derive(Serialize, Deserialize)]
struct WireEntry {
    state: Vec<WireToken>,
    next: Vec<(WireToken, Number)>,
}

/// Words are bare strings; markers are `{"marker": "BEGIN"}` objects, so no
/// word can ever be mistaken for a marker.
#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum WireToken {
    Word(String),
    Marker { marker: String },
}

const BEGIN: &str = "BEGIN";
const END: &str = "END";

impl From<&Token> for WireToken {
    fn from(token: &Token) -> Self {
        match token {
            Token::Begin => WireToken::Marker {
                marker: BEGIN.to_owned(),
            },
            Token::Word(w) => WireToken::Word(w.clone()),
            Token::End => WireToken::Marker {
                marker: END.to_owned(),
            },
        }
    }
}

impl TryFrom<WireToken> for Token {
    type Error = CorruptError;

    fn try_from(wire: WireToken) -> Result<Self, Self::Error> {
        match wire {
            WireToken::Word(w) => Ok(Token::Word(w)),
            WireToken::Marker { marker } => match marker.as_str() {
                BEGIN => Ok(Token::Begin),
                END => Ok(Token::End),
                _ => Err(CorruptError::UnknownMarker(marker)),
            },
        }
    }
}

/// Serialize a chain to its stored form.
pub fn encode(chain: &Chain) -> Result<Vec<u8>, serde_json::Error> {
    let wire = WireCorpus {
        order: chain.order(),
        chain: chain
            .iter()
            .map(|(state, successors)| WireEntry {
                state: state.tokens().iter().map(WireToken::from).collect(),
                next: successors
                    .iter()
                    .map(|(token, &count)| (WireToken::from(token), Number::from(count)))
                    .collect(),
            })
            .collect(),
    };
    serde_json::to_vec(&wire)
}

/// Parse and validate a stored chain.
pub fn decode(bytes: &[u8]) -> Result<Chain, CorruptError> {
    let wire: WireCorpus = serde_json::from_slice(bytes)?;
    if wire.order == 0 {
        return Err(CorruptError::ZeroOrder);
    }
    if wire.order > MAX_ORDER {
        return Err(CorruptError::OrderTooLarge(wire.order));
    }

    let mut chain = Chain::new(wire.order);
    for entry in wire.chain {
        let state = decode_state(entry.state, wire.order)?;
        if entry.next.is_empty() {
            return Err(CorruptError::NoSuccessors(state.to_string()));
        }
        for (next, count) in entry.next {
            let next = Token::try_from(next)?;
            if next == Token::Begin {
                return Err(CorruptError::BeginSuccessor(state.to_string()));
            }
            let count = match count.as_u64() {
                Some(n) if n > 0 => n,
                _ => {
                    return Err(CorruptError::BadCount {
                        state: state.to_string(),
                        next: next.to_string(),
                        count: count.to_string(),
                    });
                }
            };
            if !chain.checked_add_transition(state.clone(), next.clone(), count) {
                return Err(CorruptError::CountOverflow {
                    state: state.to_string(),
                    next: next.to_string(),
                });
            }
        }
    }
    Ok(chain)
}

/// BEGIN markers may only pad the front of a state; END never appears in one.
fn decode_state(tokens: Vec<WireToken>, order: usize) -> Result<State, CorruptError> {
    if tokens.len() != order {
        return Err(CorruptError::Arity {
            expected: order,
            found: tokens.len(),
        });
    }
    let tokens = tokens
        .into_iter()
        .map(Token::try_from)
        .collect::<Result<Vec<_>, _>>()?;
    let state = State::from_tokens(tokens);

    let mut seen_word = false;
    for token in state.tokens() {
        match token {
            Token::Word(_) => seen_word = true,
            Token::Begin if !seen_word => {}
            _ => return Err(CorruptError::MisplacedMarker(state.to_string())),
        }
    }
    Ok(state)
}

// ---------------------------------------------------------------------------
// Stores
// ---------------------------------------------------------------------------

/// Load/save access to the corpus of each guild.
pub trait CorpusStore: Send + Sync {
    /// The guild's chain, or `None` if it has never been saved.
    fn load(&self, guild: GuildId) -> Result<Option<Chain>, StoreError>;

    /// Replace the guild's chain.
    fn save(&self, guild: GuildId, chain: &Chain) -> Result<(), StoreError>;
}

/// One JSON file per guild under `<data_dir>/corpa/`.
#[derive(Debug, Clone)]
pub struct FileCorpusStore {
    dir: PathBuf,
}

impl FileCorpusStore {
    /// Store rooted at `data_dir`. Nothing is created until the first save.
    pub fn new(data_dir: impl AsRef<Path>) -> Self {
        FileCorpusStore {
            dir: data_dir.as_ref().join("corpa"),
        }
    }

    /// Path of the guild's corpus file.
    pub fn path(&self, guild: GuildId) -> PathBuf {
        self.dir.join(format!("{guild}.json"))
    }
}

impl CorpusStore for FileCorpusStore {
    fn load(&self, guild: GuildId) -> Result<Option<Chain>, StoreError> {
        let path = self.path(guild);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(StoreError::Io { path, source }),
        };
        tracing::debug!(%guild, bytes = bytes.len(), "loaded corpus");
        decode(&bytes)
            .map(Some)
            .map_err(|source| StoreError::Corrupt { guild, source })
    }

    fn save(&self, guild: GuildId, chain: &Chain) -> Result<(), StoreError> {
        let bytes = encode(chain).map_err(|source| StoreError::Encode { guild, source })?;
        write_atomic(&self.path(guild), &bytes)?;
        tracing::debug!(%guild, states = chain.len(), "saved corpus");
        Ok(())
    }
}

/// Write `bytes` to `path` through a sibling temp file and a rename, so a
/// crash mid-write never leaves a truncated document behind.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
    let io_err = |source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    };
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent).map_err(io_err)?;

    let mut temp = NamedTempFile::new_in(parent).map_err(io_err)?;
    temp.write_all(bytes).map_err(io_err)?;
    temp.flush().map_err(io_err)?;
    temp.persist(path).map_err(|e| io_err(e.error))?;
    Ok(())
}

/// Encoded chains held in memory. Goes through [`encode`]/[`decode`] like the
/// file store, so corrupt documents can be injected with [`insert_raw`].
///
/// [`insert_raw`]: MemoryCorpusStore::insert_raw
#[derive(Debug, Default)]
pub struct MemoryCorpusStore {
    blobs: Mutex<HashMap<GuildId, Vec<u8>>>,
}

impl MemoryCorpusStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store raw bytes for a guild, bypassing encoding.
    pub fn insert_raw(&self, guild: GuildId, bytes: Vec<u8>) {
        self.lock().insert(guild, bytes);
    }

    /// Raw stored bytes for a guild.
    pub fn raw(&self, guild: GuildId) -> Option<Vec<u8>> {
        self.lock().get(&guild).cloned()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<GuildId, Vec<u8>>> {
        // A poisoned map still holds complete blobs; keep serving them.
        self.blobs.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl CorpusStore for MemoryCorpusStore {
    fn load(&self, guild: GuildId) -> Result<Option<Chain>, StoreError> {
        match self.lock().get(&guild) {
            None => Ok(None),
            Some(bytes) => decode(bytes)
                .map(Some)
                .map_err(|source| StoreError::Corrupt { guild, source }),
        }
    }

    fn save(&self, guild: GuildId, chain: &Chain) -> Result<(), StoreError> {
        let bytes = encode(chain).map_err(|source| StoreError::Encode { guild, source })?;
        self.lock().insert(guild, bytes);
        Ok(())
    }
}
