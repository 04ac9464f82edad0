//! Token and State types for sentence-level Markov chains.
//!
//! A [`Token`] is either a word taken verbatim from the input text or one of
//! the two synthetic sentence markers, [`Token::Begin`] and [`Token::End`].
//! A [`State`] is the fixed-length window of the most recent tokens that a
//! chain uses as its lookup key.
//!
//! The markers are structurally necessary for any chain that models sentence
//! boundaries, so they live here rather than in the chain crate.

use std::fmt;

/// A single unit of a sentence.
///
/// Ordering places `Begin` before every word and `End` after every word, which
/// keeps encoded chains stable and readable.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub enum Token {
    /// Sentence start marker. Appears only as the leading padding of a state.
    Begin,
    /// A word, with any attached punctuation kept as-is.
    Word(String),
    /// Sentence end marker. Appears only as a successor, never inside a state.
    End,
}

impl Token {
    /// Create a word token.
    pub fn word(s: impl Into<String>) -> Self {
        Token::Word(s.into())
    }

    /// The word text, or `None` for a marker.
    pub fn as_word(&self) -> Option<&str> {
        match self {
            Token::Word(w) => Some(w),
            _ => None,
        }
    }

    /// Whether this is `Begin` or `End`.
    #[inline]
    pub fn is_marker(&self) -> bool {
        !matches!(self, Token::Word(_))
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Begin => f.write_str("<BEGIN>"),
            Token::Word(w) => f.write_str(w),
            Token::End => f.write_str("<END>"),
        }
    }
}

/// The last `order` tokens of a walk, oldest first.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct State(Vec<Token>);

impl State {
    /// The all-`Begin` start state for a chain of the given order.
    ///
    /// # Panics
    ///
    /// Panics if `order` is zero.
    pub fn start(order: usize) -> Self {
        assert!(order > 0, "chain order must be at least 1");
        State(vec![Token::Begin; order])
    }

    /// Wrap an explicit token window. No validation is done here; decoders
    /// check arity and marker placement themselves.
    pub fn from_tokens(tokens: Vec<Token>) -> Self {
        State(tokens)
    }

    /// The state reached by observing `next`: drop the oldest token, append `next`.
    pub fn advance(&self, next: Token) -> Self {
        let mut tokens = Vec::with_capacity(self.0.len());
        tokens.extend(self.0.iter().skip(1).cloned());
        tokens.push(next);
        State(tokens)
    }

    /// Tokens in the window, oldest first.
    #[inline]
    pub fn tokens(&self) -> &[Token] {
        &self.0
    }

    /// Window size.
    #[inline]
    pub fn order(&self) -> usize {
        self.0.len()
    }

    /// Whether every token is `Begin`.
    pub fn is_start(&self) -> bool {
        self.0.iter().all(|t| *t == Token::Begin)
    }

    /// Whether the most recent token is `End`. Such states are terminal.
    pub fn is_terminal(&self) -> bool {
        self.0.last() == Some(&Token::End)
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(")?;
        for (i, token) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{token}")?;
        }
        f.write_str(")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn markers_sort_around_words() {
        let mut tokens = vec![Token::End, Token::word("zebra"), Token::Begin, Token::word("apple")];
        tokens.sort();
        assert_eq!(
            tokens,
            vec![Token::Begin, Token::word("apple"), Token::word("zebra"), Token::End]
        );
    }

    #[test]
    fn as_word_and_is_marker() {
        assert_eq!(Token::word("hi").as_word(), Some("hi"));
        assert_eq!(Token::Begin.as_word(), None);
        assert!(Token::End.is_marker());
        assert!(!Token::word("x").is_marker());
    }

    #[test]
    fn start_state_is_all_begin() {
        let s = State::start(3);
        assert_eq!(s.order(), 3);
        assert!(s.is_start());
        assert!(!s.is_terminal());
    }

    #[test]
    #[should_panic(expected = "chain order must be at least 1")]
    fn zero_order_panics() {
        State::start(0);
    }

    #[test]
    fn advance_slides_window() {
        let s = State::start(2).advance(Token::word("a"));
        assert_eq!(s.tokens(), &[Token::Begin, Token::word("a")]);

        let s = s.advance(Token::word("b"));
        assert_eq!(s.tokens(), &[Token::word("a"), Token::word("b")]);
        assert!(!s.is_start());

        let s = s.advance(Token::End);
        assert!(s.is_terminal());
        assert_eq!(s.order(), 2);
    }

    #[test]
    fn display_forms() {
        let s = State::start(1).advance(Token::word("well,"));
        assert_eq!(s.to_string(), "(well,)");
        assert_eq!(State::start(2).to_string(), "(<BEGIN>, <BEGIN>)");
        assert_eq!(Token::End.to_string(), "<END>");
    }
}
