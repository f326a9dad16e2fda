use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::error::TutorError;
use crate::word_source::{Word, WordSource};

/// Number of words sampled per refill
pub const BATCH_SIZE: usize = 100;

/// Growing sequence of words with a cursor at the word being typed.
///
/// Words before the cursor are committed history and are kept for
/// rendering; the buffer only ever grows until it is cleared.
#[derive(Debug, Clone)]
pub struct StreamBuffer {
    words: Vec<Word>,
    cursor: usize,
    rng: StdRng,
}

impl StreamBuffer {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    /// Deterministic word order, for tests and replays
    pub fn seeded(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    pub fn with_rng(rng: StdRng) -> Self {
        Self::with_words(Vec::<Word>::new(), rng)
    }

    /// Start from a known run of words; later refills sample from `rng`
    pub fn with_words<I, W>(words: I, rng: StdRng) -> Self
    where
        I: IntoIterator<Item = W>,
        W: Into<Word>,
    {
        Self {
            words: words.into_iter().map(Into::into).collect(),
            cursor: 0,
            rng,
        }
    }

    /// Append batches of sampled words until at least `n` words sit at or
    /// after the cursor.
    pub fn ensure_lookahead(&mut self, source: &WordSource, n: usize) -> Result<(), TutorError> {
        while self.remaining() < n {
            self.words.reserve(BATCH_SIZE);
            for _ in 0..BATCH_SIZE {
                let word = source.sample(&mut self.rng)?;
                self.words.push(word.to_owned());
            }
        }
        Ok(())
    }

    /// Move past the current word. The cursor never runs past the end.
    pub fn advance(&mut self) {
        if self.cursor < self.words.len() {
            self.cursor += 1;
        }
    }

    /// Up to `n` words starting at the cursor
    pub fn window(&self, n: usize) -> &[Word] {
        let end = self.cursor.saturating_add(n).min(self.words.len());
        &self.words[self.cursor..end]
    }

    pub fn current(&self) -> Option<&str> {
        self.words.get(self.cursor).map(String::as_str)
    }

    pub fn history(&self) -> &[Word] {
        &self.words[..self.cursor]
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.words.get(index).map(String::as_str)
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Words at or after the cursor
    pub fn remaining(&self) -> usize {
        self.words.len() - self.cursor
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Back to the first word, keeping every buffered word
    pub fn rewind(&mut self) {
        self.cursor = 0;
    }

    pub fn clear(&mut self) {
        self.words.clear();
        self.cursor = 0;
    }
}

impl Default for StreamBuffer {
    fn default() -> Self {
        Self::new()
    }
}
