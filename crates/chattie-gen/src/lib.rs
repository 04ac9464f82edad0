//! Sentence generation: a count-weighted random walk over a [`Chain`].
//!
//! Each walk starts at the all-BEGIN state and repeatedly picks a successor
//! of the current state with probability proportional to its count, until
//! it draws END. A walk gives up when it runs into a state with no
//! successors or emits [`SpeakLimit::max_length`] words without ending.
//!
//! [`generate`] retries failed walks up to [`SpeakLimit::max_attempts`] times,
//! so the total work is bounded by `max_attempts × max_length` words even on
//! a sparse or degenerate chain.

use chain_token::{State, Token};
use markov_chain::{Chain, Successors};
use rand::Rng;

/// Bounds on sentence generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeakLimit {
    /// Walks to try before reporting that no sentence is available.
    pub max_attempts: usize,
    /// Words a single walk may emit before it is abandoned.
    pub max_length: usize,
    /// Reject sentences longer than this many characters, if set.
    pub max_chars: Option<usize>,
}

impl Default for SpeakLimit {
    fn default() -> Self {
        SpeakLimit {
            max_attempts: 10,
            max_length: 1000,
            max_chars: None,
        }
    }
}

/// How a single walk ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Walk {
    /// Reached END. Holds the emitted words.
    Sentence(Vec<String>),
    /// Reached a state with no successors.
    DeadEnd,
    /// Emitted `max_length` words without reaching END.
    TooLong,
}

/// Result of [`generate_traced`]: the sentence plus the work spent on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Generation {
    pub sentence: Option<String>,
    /// Walks started.
    pub attempts: usize,
    /// Words emitted across every walk.
    pub steps: usize,
}

/// Generate one sentence, or `None` if every attempt failed.
///
/// ```
/// use chattie_gen::{generate, SpeakLimit};
/// use markov_chain::Chain;
/// use rand::SeedableRng;
/// use rand::rngs::SmallRng;
///
/// let chain = Chain::build([["Hello", "world."]], 2);
/// let mut rng = SmallRng::seed_from_u64(1);
/// assert_eq!(generate(&chain, &SpeakLimit::default(), &mut rng).as_deref(), Some("Hello world."));
/// ```
pub fn generate<R: Rng>(chain: &Chain, limit: &SpeakLimit, rng: &mut R) -> Option<String> {
    generate_traced(chain, limit, rng).sentence
}

/// Like [`generate`], also reporting how many attempts and steps were used.
pub fn generate_traced<R: Rng>(
    chain: &Chain,
    limit: &SpeakLimit,
    rng: &mut R,
) -> Generation {
    let mut generation = Generation {
        sentence: None,
        attempts: 0,
        steps: 0,
    };

    while generation.attempts < limit.max_attempts {
        generation.attempts += 1;
        let (walk, steps) = walk_counted(chain, limit.max_length, rng);
        generation.steps += steps;

        let words = match walk {
            Walk::Sentence(words) if !words.is_empty() => words,
            _ => continue,
        };
        let sentence = words.join(" ");
        if limit.max_chars.is_some_and(|max| sentence.chars().count() > max) {
            continue;
        }
        generation.sentence = Some(sentence);
        break;
    }

    tracing::trace!(
        attempts = generation.attempts,
        steps = generation.steps,
        found = generation.sentence.is_some(),
        "generation finished"
    );
    generation
}

/// Perform a single walk from the start state.
pub fn walk<R: Rng>(chain: &Chain, max_length: usize, rng: &mut R) -> Walk {
    walk_counted(chain, max_length, rng).0
}

fn walk_counted<R: Rng>(chain: &Chain, max_length: usize, rng: &mut R) -> (Walk, usize) {
    let mut state = State::start(chain.order());
    let mut words: Vec<String> = Vec::new();

    loop {
        let Some(successors) = chain.successors(&state) else {
            let steps = words.len();
            return (Walk::DeadEnd, steps);
        };
        let Some(next) = pick(successors, rng) else {
            return (Walk::DeadEnd, words.len());
        };

        let word = match next {
            Token::End => {
                let steps = words.len();
                return (Walk::Sentence(words), steps);
            }
            Token::Word(w) => w,
            // Decoded chains never have BEGIN as a successor.
            Token::Begin => return (Walk::DeadEnd, words.len()),
        };

        if words.len() >= max_length {
            return (Walk::TooLong, words.len());
        }
        words.push(word.clone());
        state = state.advance(next.clone());
    }
}

/// Count-weighted choice among successors.
///
/// Draws a number below the total count and walks the table subtracting
/// counts until it goes negative. `None` only for an empty table.
fn pick<'a, R: Rng>(successors: &'a Successors, rng: &mut R) -> Option<&'a Token> {
    let total: u128 = successors.values().map(|&c| c as u128).sum();
    if total == 0 {
        return None;
    }
    let mut remaining = rng.random_range(0..total);

    for (token, &count) in successors {
        let count = count as u128;
        if remaining < count {
            return Some(token);
        }
        remaining -= count;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;
    use std::collections::{HashMap, HashSet};

    fn make_rng(seed: u64) -> SmallRng {
        SmallRng::seed_from_u64(seed)
    }

    fn chain_of(order: usize, sentences: &[&[&str]]) -> Chain {
        Chain::build(sentences.iter().map(|s| s.iter().copied()), order)
    }

    #[test]
    fn speak_limit_defaults() {
        let limit = SpeakLimit::default();
        assert_eq!(limit.max_attempts, 10);
        assert_eq!(limit.max_length, 1000);
        assert_eq!(limit.max_chars, None);
    }

    #[test]
    fn single_sentence_chain_reproduces_it() {
        let chain = chain_of(2, &[&["the", "only", "line."]]);
        for seed in 0..20 {
            let out = generate(&chain, &SpeakLimit::default(), &mut make_rng(seed));
            assert_eq!(out.as_deref(), Some("the only line."));
        }
    }

    #[test]
    fn output_uses_only_known_words() {
        let chain = chain_of(2, &[&["Hello", "world."], &["Foo", "bar."]]);
        let vocab: HashSet<&str> = ["Hello", "world.", "Foo", "bar."].into();
        for seed in 0..50 {
            let out = generate(&chain, &SpeakLimit::default(), &mut make_rng(seed)).unwrap();
            assert!(!out.is_empty());
            assert!(out.split(' ').all(|w| vocab.contains(w)), "unexpected output {out:?}");
        }
    }

    #[test]
    fn empty_chain_gives_none() {
        let chain = Chain::new(2);
        let generation = generate_traced(&chain, &SpeakLimit::default(), &mut make_rng(3));
        assert_eq!(generation.sentence, None);
        assert_eq!(generation.attempts, 10);
        assert_eq!(generation.steps, 0);
    }

    #[test]
    fn zero_attempts_gives_none() {
        let chain = chain_of(2, &[&["a."]]);
        let limit = SpeakLimit {
            max_attempts: 0,
            ..SpeakLimit::default()
        };
        assert_eq!(generate(&chain, &limit, &mut make_rng(0)), None);
    }

    #[test]
    fn dead_end_walk() {
        let mut chain = Chain::new(1);
        chain.add_transition(State::start(1), Token::word("stuck"), 1);
        assert_eq!(walk(&chain, 100, &mut make_rng(1)), Walk::DeadEnd);
        assert_eq!(generate(&chain, &SpeakLimit::default(), &mut make_rng(1)), None);
    }

    #[test]
    fn endless_loop_is_cut_at_max_length() {
        // (a) -> a forever, END never reachable.
        let mut chain = Chain::new(1);
        chain.add_transition(State::start(1), Token::word("a"), 1);
        chain.add_transition(State::from_tokens(vec![Token::word("a")]), Token::word("a"), 1);

        assert_eq!(walk(&chain, 5, &mut make_rng(0)), Walk::TooLong);

        let limit = SpeakLimit {
            max_attempts: 4,
            max_length: 7,
            max_chars: None,
        };
        let generation = generate_traced(&chain, &limit, &mut make_rng(0));
        assert_eq!(generation.sentence, None);
        assert_eq!(generation.attempts, 4);
        assert_eq!(generation.steps, 4 * 7);
    }

    #[test]
    fn termination_is_bounded() {
        // END is reachable but unlikely.
        let mut chain = Chain::new(1);
        let a = State::from_tokens(vec![Token::word("a")]);
        chain.add_transition(State::start(1), Token::word("a"), 1);
        chain.add_transition(a.clone(), Token::word("a"), 50);
        chain.add_transition(a, Token::End, 1);

        let limit = SpeakLimit {
            max_attempts: 3,
            max_length: 20,
            max_chars: None,
        };
        for seed in 0..30 {
            let generation = generate_traced(&chain, &limit, &mut make_rng(seed));
            assert!(generation.attempts <= limit.max_attempts);
            assert!(generation.steps <= limit.max_attempts * limit.max_length);
        }
    }

    #[test]
    fn max_chars_rejects_long_sentences() {
        let chain = chain_of(2, &[&["this", "sentence", "is", "rather", "long."]]);
        let limit = SpeakLimit {
            max_chars: Some(10),
            ..SpeakLimit::default()
        };
        assert_eq!(generate(&chain, &limit, &mut make_rng(0)), None);

        let roomy = SpeakLimit {
            max_chars: Some(100),
            ..SpeakLimit::default()
        };
        assert!(generate(&chain, &roomy, &mut make_rng(0)).is_some());
    }

    #[test]
    fn sampling_follows_counts() {
        let mut successors = Successors::new();
        successors.insert(Token::word("common"), 9);
        successors.insert(Token::word("rare"), 1);

        let mut rng = make_rng(11);
        let mut tally: HashMap<String, usize> = HashMap::new();
        for _ in 0..2000 {
            let t = pick(&successors, &mut rng).unwrap();
            *tally.entry(t.to_string()).or_default() += 1;
        }
        let common = tally["common"];
        let rare = tally["rare"];
        assert!(common > rare * 4, "common={common} rare={rare}");
        assert!(rare > 0);
    }

    #[test]
    fn same_seed_same_sentence() {
        let chain = chain_of(
            1,
            &[
                &["the", "cat", "sat."],
                &["the", "dog", "ran."],
                &["a", "cat", "ran."],
            ],
        );
        let run = |seed| generate(&chain, &SpeakLimit::default(), &mut make_rng(seed));
        assert_eq!(run(99), run(99));
    }
}
