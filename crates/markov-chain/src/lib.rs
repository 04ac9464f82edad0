//! Word-level Markov chain with additive merge.
//!
//! This crate provides [`Chain`], a weighted transition table from a [`State`]
//! (the last `order` tokens) to the tokens observed next and how often each
//! was seen. Chains are built from tokenized sentences, extended one sentence
//! at a time, and combined with [`Chain::merge`], which sums counts and never
//! loses an observation.
//!
//! Both the state map and each successor map are ordered, so two chains with
//! the same counts compare equal and encode to identical bytes regardless of
//! the order sentences were learned in.

use std::collections::BTreeMap;
use std::collections::btree_map;
use std::collections::{HashSet, VecDeque};

use chain_token::{State, Token};

/// Successor table of a single state: next token → occurrence count.
pub type Successors = BTreeMap<Token, u64>;

/// Default chain order (context window size).
pub const DEFAULT_ORDER: usize = 2;

/// Largest supported chain order.
pub const MAX_ORDER: usize = 16;

/// A Markov chain over word tokens.
///
/// Invariants kept by every method:
/// - stored counts are always ≥ 1 and saturate at `u64::MAX`;
/// - every key has exactly `order` tokens;
/// - a state only exists as a key if it has at least one successor.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Chain {
    order: usize,
    states: BTreeMap<State, Successors>,
}

impl Chain {
    /// Create an empty chain.
    ///
    /// # Panics
    ///
    /// Panics if `order` is zero or greater than [`MAX_ORDER`].
    pub fn new(order: usize) -> Self {
        assert!(order > 0, "chain order must be at least 1");
        assert!(order <= MAX_ORDER, "chain order must be at most {MAX_ORDER}");
        Chain {
            order,
            states: BTreeMap::new(),
        }
    }

    /// Build a chain from tokenized sentences.
    ///
    /// ```
    /// use markov_chain::Chain;
    /// use chain_token::{State, Token};
    ///
    /// let chain = Chain::build([["Hello", "world."]], 2);
    /// let start = State::start(2);
    /// assert_eq!(chain.count(&start, &Token::word("Hello")), 1);
    /// ```
    pub fn build<I>(sentences: I, order: usize) -> Self
    where
        I: IntoIterator,
        I::Item: IntoIterator,
        <I::Item as IntoIterator>::Item: AsRef<str>,
    {
        let mut chain = Chain::new(order);
        for sentence in sentences {
            chain.learn(sentence);
        }
        chain
    }

    /// Learn a single sentence.
    ///
    /// The sentence is padded with `order` BEGIN markers and one END marker,
    /// and every window of `order` tokens records the token that follows it.
    /// Returns `false` (and learns nothing) for an empty sentence.
    pub fn learn<I>(&mut self, words: I) -> bool
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let mut state = State::start(self.order);
        let mut learned = false;

        for word in words {
            let token = Token::word(word.as_ref());
            self.add_transition(state.clone(), token.clone(), 1);
            state = state.advance(token);
            learned = true;
        }

        if learned {
            self.add_transition(state, Token::End, 1);
        }
        learned
    }

    /// Add `count` observations of `next` following `state`.
    ///
    /// A zero count is ignored so that zero entries are never stored. The
    /// stored count saturates at `u64::MAX`.
    pub fn add_transition(&mut self, state: State, next: Token, count: u64) {
        debug_assert_eq!(state.order(), self.order, "state arity must match chain order");
        if count == 0 {
            return;
        }
        let slot = self.states.entry(state).or_default().entry(next).or_insert(0);
        *slot = slot.saturating_add(count);
    }

    /// Like [`add_transition`](Chain::add_transition), but returns `false`
    /// and leaves the chain untouched if the count would overflow.
    pub fn checked_add_transition(&mut self, state: State, next: Token, count: u64) -> bool {
        match self.count(&state, &next).checked_add(count) {
            Some(_) => {
                self.add_transition(state, next, count);
                true
            }
            None => false,
        }
    }

    /// Additive union of two chains. Neither input is modified.
    ///
    /// # Panics
    ///
    /// Panics if the two chains have different orders.
    pub fn merge(&self, other: &Chain) -> Chain {
        let mut merged = self.clone();
        merged.absorb(other);
        merged
    }

    /// Add every count of `other` into `self`.
    ///
    /// # Panics
    ///
    /// Panics if the two chains have different orders.
    pub fn absorb(&mut self, other: &Chain) {
        assert_eq!(
            self.order, other.order,
            "cannot merge chains of different order"
        );
        for (state, successors) in &other.states {
            let mine = self.states.entry(state.clone()).or_default();
            for (token, &count) in successors {
                let slot = mine.entry(token.clone()).or_insert(0);
                *slot = slot.saturating_add(count);
            }
        }
    }

    /// Successor table of `state`, if it has been observed.
    #[inline]
    pub fn successors(&self, state: &State) -> Option<&Successors> {
        self.states.get(state)
    }

    /// Count of `next` following `state` (0 if never seen).
    pub fn count(&self, state: &State, next: &Token) -> u64 {
        self.states
            .get(state)
            .and_then(|s| s.get(next))
            .copied()
            .unwrap_or(0)
    }

    /// Iterate over every state and its successor table, in order.
    pub fn iter(&self) -> btree_map::Iter<'_, State, Successors> {
        self.states.iter()
    }

    /// Context window size.
    #[inline]
    pub fn order(&self) -> usize {
        self.order
    }

    /// Number of distinct states with at least one successor.
    #[inline]
    pub fn len(&self) -> usize {
        self.states.len()
    }

    /// Whether nothing has been learned.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Number of distinct (state, next) edges.
    pub fn edge_count(&self) -> usize {
        self.states.values().map(BTreeMap::len).sum()
    }

    /// Non-terminal states reachable from the start state that have no
    /// successors. Empty for any chain built with [`Chain::learn`].
    pub fn dead_ends(&self) -> Vec<State> {
        let start = State::start(self.order);
        if self.is_empty() {
            return Vec::new();
        }

        let mut seen = HashSet::new();
        let mut queue = VecDeque::from([start.clone()]);
        let mut dead = Vec::new();
        seen.insert(start);

        while let Some(state) = queue.pop_front() {
            let Some(successors) = self.states.get(&state) else {
                dead.push(state);
                continue;
            };
            for token in successors.keys() {
                let next = state.advance(token.clone());
                if !next.is_terminal() && seen.insert(next.clone()) {
                    queue.push_back(next);
                }
            }
        }
        dead
    }
}

impl Default for Chain {
    fn default() -> Self {
        Chain::new(DEFAULT_ORDER)
    }
}

impl<'a> IntoIterator for &'a Chain {
    type Item = (&'a State, &'a Successors);
    type IntoIter = btree_map::Iter<'a, State, Successors>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
