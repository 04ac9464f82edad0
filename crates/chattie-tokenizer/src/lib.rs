//! Sentence splitting and word tokenization for chat messages.
//!
//! Text is cut into sentences at `.`, `!` or `?` when followed by whitespace
//! or the end of input, then each sentence is split on runs of whitespace.
//! Tokens keep their punctuation and case exactly as typed, so "don't" and
//! "well," survive untouched.
//!
//! This crate has no dependencies on the other chattie crates. It produces
//! plain `Vec<String>` sentences.

/// Characters that can end a sentence.
const TERMINALS: [char; 3] = ['.', '!', '?'];

/// Split text into sentences of word tokens.
///
/// The returned iterator is lazy and cheap to clone, so the same text can be
/// walked more than once.
///
/// # Examples
///
/// ```
/// use chattie_tokenizer::split;
///
/// let sentences: Vec<Vec<String>> = split("Hello world. Don't panic!").collect();
/// assert_eq!(sentences, vec![vec!["Hello", "world."], vec!["Don't", "panic!"]]);
/// ```
pub fn split(text: &str) -> Sentences<'_> {
    Sentences { rest: text }
}

/// Iterator over the sentences of a text. See [`split`].
#[derive(Clone, Debug)]
pub struct Sentences<'a> {
    rest: &'a str,
}

impl Iterator for Sentences<'_> {
    type Item = Vec<String>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.rest.is_empty() {
            let end = sentence_end(self.rest);
            let (sentence, rest) = self.rest.split_at(end);
            self.rest = rest;

            let tokens: Vec<String> = sentence.split_whitespace().map(str::to_owned).collect();
            if !tokens.is_empty() {
                return Some(tokens);
            }
        }
        None
    }
}

/// Byte offset just past the first sentence in `text`, or `text.len()` when
/// the text holds a single unterminated fragment.
fn sentence_end(text: &str) -> usize {
    let mut chars = text.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        if !TERMINALS.contains(&c) {
            continue;
        }
        match chars.peek() {
            None => return text.len(),
            Some((_, next)) if next.is_whitespace() => return i + c.len_utf8(),
            Some(_) => {}
        }
    }
    text.len()
}

/// Whether `text` already ends with sentence-terminal punctuation.
fn is_terminated(text: &str) -> bool {
    text.ends_with(TERMINALS)
}

/// Normalize one chat message for training.
///
/// Trims surrounding whitespace and appends `.` when the message does not
/// already end a sentence. Returns `None` for blank messages.
///
/// ```
/// use chattie_tokenizer::tidy_message;
///
/// assert_eq!(tidy_message("  hi there "), Some("hi there.".to_string()));
/// assert_eq!(tidy_message("what?"), Some("what?".to_string()));
/// assert_eq!(tidy_message("   "), None);
/// ```
pub fn tidy_message(text: &str) -> Option<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    let mut out = trimmed.to_owned();
    if !is_terminated(&out) {
        out.push('.');
    }
    Some(out)
}

/// Tidy every message and join them into one training text.
///
/// Messages are separated by a single space, so each one always lands in
/// its own sentence (or sentences).
pub fn join_messages<I, S>(messages: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut corpus = String::new();
    for message in messages {
        if let Some(tidy) = tidy_message(message.as_ref()) {
            if !corpus.is_empty() {
                corpus.push(' ');
            }
            corpus.push_str(&tidy);
        }
    }
    corpus
}
