use tracing::trace;

use crate::error::TutorError;
use crate::stream::StreamBuffer;
use crate::word_source::{Word, WordSource};

/// The verdict recorded for one completed word
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WordJudgment {
    expected: Word,
    typed: String,
    correct: bool,
}

impl WordJudgment {
    /// Exact, case-sensitive comparison. No partial credit.
    pub fn new(expected: impl Into<Word>, typed: impl Into<String>) -> Self {
        let expected = expected.into();
        let typed = typed.into();
        let correct = expected == typed;
        Self {
            expected,
            typed,
            correct,
        }
    }

    pub fn expected(&self) -> &str {
        &self.expected
    }

    pub fn typed(&self) -> &str {
        &self.typed
    }

    pub fn is_correct(&self) -> bool {
        self.correct
    }
}

/// Rendering state of a buffered word
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WordState {
    Pending,
    Typing { mismatch: bool },
    Committed { correct: bool },
}

/// Result of a word boundary event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitOutcome {
    /// Input was empty after trimming; nothing happened
    Ignored,
    Committed(WordJudgment),
}

/// True when `input` has diverged from `expected`, including running past
/// its end.
pub fn is_partial_mismatch(input: &str, expected: &str) -> bool {
    !expected.starts_with(input)
}

/// Tracks the in-progress input and the append-only list of judgments
#[derive(Debug, Clone, Default)]
pub struct MatchEngine {
    input: String,
    judgments: Vec<WordJudgment>,
}

impl MatchEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the current input with `text`
    pub fn keystroke(&mut self, text: &str, buffer: &StreamBuffer) -> WordState {
        self.input.clear();
        self.input.push_str(text);
        self.current_state(buffer)
    }

    pub fn push_char(&mut self, c: char, buffer: &StreamBuffer) -> WordState {
        self.input.push(c);
        self.current_state(buffer)
    }

    pub fn backspace(&mut self, buffer: &StreamBuffer) -> WordState {
        self.input.pop();
        self.current_state(buffer)
    }

    /// Judge the current input against the word at the cursor.
    ///
    /// Whitespace-only input is ignored, so repeated delimiters never skip a
    /// word. On commit the buffer advances and is topped back up to
    /// `lookahead` words.
    pub fn commit(
        &mut self,
        buffer: &mut StreamBuffer,
        source: &WordSource,
        lookahead: usize,
    ) -> Result<CommitOutcome, TutorError> {
        let typed = self.input.trim();
        if typed.is_empty() {
            return Ok(CommitOutcome::Ignored);
        }

        buffer.ensure_lookahead(source, lookahead.max(1))?;
        let expected = buffer.current().ok_or(TutorError::EmptyVocabulary)?;
        let judgment = WordJudgment::new(expected, typed);
        trace!(
            expected = judgment.expected(),
            typed = judgment.typed(),
            correct = judgment.is_correct(),
            "word_committed"
        );

        self.judgments.push(judgment.clone());
        buffer.advance();
        self.input.clear();
        buffer.ensure_lookahead(source, lookahead)?;

        Ok(CommitOutcome::Committed(judgment))
    }

    /// State of the word at the cursor
    pub fn current_state(&self, buffer: &StreamBuffer) -> WordState {
        if self.input.is_empty() {
            return WordState::Pending;
        }
        let expected = buffer.current().unwrap_or_default();
        WordState::Typing {
            mismatch: is_partial_mismatch(&self.input, expected),
        }
    }

    /// State of any buffered word by absolute index
    pub fn word_state(&self, index: usize, buffer: &StreamBuffer) -> WordState {
        if index < buffer.cursor() {
            let correct = self.judgments.get(index).is_some_and(|j| j.is_correct());
            WordState::Committed { correct }
        } else if index == buffer.cursor() {
            self.current_state(buffer)
        } else {
            WordState::Pending
        }
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn judgments(&self) -> &[WordJudgment] {
        &self.judgments
    }

    pub fn clear(&mut self) {
        self.input.clear();
        self.judgments.clear();
    }
}
