use std::fs;
use std::path::Path;

use rand::seq::SliceRandom;
use rand::Rng;
use tracing::debug;

use crate::error::TutorError;

static DEFAULT_WORDS: &str = include_str!("lang/default.txt");

/// A single expected token. Words are never edited once loaded.
pub type Word = String;

/// The active vocabulary that words are drawn from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WordSource {
    words: Vec<Word>,
}

impl WordSource {
    /// Split `raw_text` on any whitespace, discarding empty tokens.
    pub fn load(raw_text: &str) -> Result<Self, TutorError> {
        let words = split_words(raw_text);
        if words.is_empty() {
            return Err(TutorError::EmptyVocabulary);
        }

        Ok(Self { words })
    }

    /// Read a UTF-8 word list from disk
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, TutorError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| TutorError::FileLoad {
            path: path.to_path_buf(),
            source,
        })?;

        let source = Self::load(&raw)?;
        debug!(path = %path.display(), words = source.len(), "word_file_loaded");
        Ok(source)
    }

    pub fn words(&self) -> &[Word] {
        &self.words
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn contains(&self, word: &str) -> bool {
        self.words.iter().any(|w| w == word)
    }

    /// Uniformly random word from the vocabulary
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<&str, TutorError> {
        self.words
            .choose(rng)
            .map(String::as_str)
            .ok_or(TutorError::EmptyVocabulary)
    }
}

impl Default for WordSource {
    /// The built-in list of common English words
    fn default() -> Self {
        Self {
            words: split_words(DEFAULT_WORDS),
        }
    }
}

fn split_words(raw_text: &str) -> Vec<Word> {
    raw_text.split_whitespace().map(str::to_owned).collect()
}
