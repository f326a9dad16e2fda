use std::path::Path;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::clock::{TestClock, DEFAULT_TIME_LIMIT_SECS};
use crate::error::TutorError;
use crate::matcher::{CommitOutcome, MatchEngine, WordJudgment, WordState};
use crate::stats::LiveStats;
use crate::stream::StreamBuffer;
use crate::word_source::{Word, WordSource};

/// Words kept buffered ahead of the cursor, and shown in the window
pub const DEFAULT_LOOKAHEAD: usize = 200;

/// Everything a session is constructed with
#[derive(Debug, Clone)]
pub struct SessionConfig {
    clock: TestClock,
    lookahead: usize,
    vocabulary: WordSource,
}

impl SessionConfig {
    pub fn new(
        time_limit_secs: u64,
        lookahead: usize,
        vocabulary: WordSource,
    ) -> Result<Self, TutorError> {
        Ok(Self {
            clock: TestClock::new(time_limit_secs)?,
            lookahead: validate_lookahead(lookahead)?,
            vocabulary,
        })
    }

    pub fn time_limit_secs(&self) -> u64 {
        self.clock.limit_secs()
    }

    pub fn lookahead(&self) -> usize {
        self.lookahead
    }

    pub fn vocabulary(&self) -> &WordSource {
        &self.vocabulary
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            clock: TestClock::default(),
            lookahead: DEFAULT_LOOKAHEAD,
            vocabulary: WordSource::default(),
        }
    }
}

fn validate_lookahead(lookahead: usize) -> Result<usize, TutorError> {
    if lookahead == 0 {
        return Err(TutorError::InvalidConfig("lookahead must be > 0".into()));
    }
    Ok(lookahead)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
#[strum(serialize_all = "lowercase")]
pub enum SessionPhase {
    Idle,
    Running {
        started_at: Instant,
    },
    Finished {
        started_at: Instant,
        ended_at: Instant,
    },
}

/// Identity of the session a scheduled tick belongs to.
///
/// Every `start` and `reset` moves the controller to a new generation, so a
/// tick scheduled before either of them is recognised as stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickToken(u64);

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TickOutcome {
    /// The token belongs to an earlier session
    Stale,
    /// No test is running
    Inactive,
    Remaining(f64),
    /// The clock ran out on this tick; carries the final numbers
    Finished(LiveStats),
}

/// Everything the front end needs to draw one frame
#[derive(Debug, Clone)]
pub struct RenderSnapshot<'a> {
    pub phase: SessionPhase,
    pub window: &'a [Word],
    pub history: &'a [Word],
    pub current_input: &'a str,
    pub partial_mismatch: bool,
    pub judgments: &'a [WordJudgment],
    pub remaining_secs: f64,
    pub time_limit_secs: u64,
    pub live_stats: LiveStats,
    pub final_stats: Option<LiveStats>,
}

/// Owns one typing test from idle through finished
#[derive(Debug, Clone)]
pub struct SessionController {
    config: SessionConfig,
    phase: SessionPhase,
    buffer: StreamBuffer,
    matcher: MatchEngine,
    generation: u64,
    final_stats: Option<LiveStats>,
}

impl SessionController {
    pub fn new(config: SessionConfig) -> Result<Self, TutorError> {
        Self::with_buffer(config, StreamBuffer::new())
    }

    /// Use `buffer` as the preview; it is topped up to the lookahead
    pub fn with_buffer(config: SessionConfig, buffer: StreamBuffer) -> Result<Self, TutorError> {
        let mut controller = Self {
            config,
            phase: SessionPhase::Idle,
            buffer,
            matcher: MatchEngine::new(),
            generation: 0,
            final_stats: None,
        };
        controller.fill_lookahead()?;
        Ok(controller)
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn is_running(&self) -> bool {
        matches!(self.phase, SessionPhase::Running { .. })
    }

    /// Begin timing. The preview words shown while idle become the test.
    pub fn start(&mut self, now: Instant) -> Result<TickToken, TutorError> {
        if self.phase != SessionPhase::Idle {
            return Err(self.refuse("start a test"));
        }

        self.matcher.clear();
        self.buffer.rewind();
        self.fill_lookahead()?;
        self.final_stats = None;
        self.generation += 1;
        let started_at = self.config.clock.start(now);
        self.phase = SessionPhase::Running { started_at };

        info!(
            time_limit_secs = self.config.time_limit_secs(),
            vocabulary = self.config.vocabulary.len(),
            "test_started"
        );
        Ok(TickToken(self.generation))
    }

    /// Drop all session data and go back to idle with a fresh preview.
    /// Outstanding tick tokens stop matching.
    pub fn reset(&mut self) {
        self.generation += 1;
        self.phase = SessionPhase::Idle;
        self.matcher.clear();
        self.buffer.clear();
        self.final_stats = None;

        if let Err(err) = self.fill_lookahead() {
            warn!(%err, "preview_refill_failed");
        }
        debug!(generation = self.generation, "session_reset");
    }

    pub fn tick(&mut self, token: TickToken, now: Instant) -> TickOutcome {
        if token.0 != self.generation {
            return TickOutcome::Stale;
        }

        match self.phase {
            SessionPhase::Running { started_at } => {
                if self.config.clock.is_expired(started_at, now) {
                    TickOutcome::Finished(self.finalize(started_at, now))
                } else {
                    TickOutcome::Remaining(self.config.clock.remaining(started_at, now))
                }
            }
            SessionPhase::Idle | SessionPhase::Finished { .. } => TickOutcome::Inactive,
        }
    }

    fn finalize(&mut self, started_at: Instant, now: Instant) -> LiveStats {
        let elapsed = self.config.clock.elapsed(started_at, now);
        let stats = LiveStats::compute(self.matcher.judgments(), elapsed);
        self.phase = SessionPhase::Finished {
            started_at,
            ended_at: now,
        };
        self.final_stats = Some(stats);

        info!(
            wpm = stats.wpm,
            accuracy = stats.accuracy,
            correct = stats.correct,
            incorrect = stats.incorrect,
            "test_finished"
        );
        stats
    }

    /// Replace the in-progress input with `text`
    pub fn keystroke(&mut self, text: &str) -> Result<WordState, TutorError> {
        self.require_running("type")?;
        Ok(self.matcher.keystroke(text, &self.buffer))
    }

    pub fn push_char(&mut self, c: char) -> Result<WordState, TutorError> {
        self.require_running("type")?;
        Ok(self.matcher.push_char(c, &self.buffer))
    }

    pub fn backspace(&mut self) -> Result<WordState, TutorError> {
        self.require_running("type")?;
        Ok(self.matcher.backspace(&self.buffer))
    }

    /// Word boundary (space): judge and commit the current input
    pub fn boundary(&mut self) -> Result<CommitOutcome, TutorError> {
        self.require_running("commit a word")?;
        self.matcher.commit(
            &mut self.buffer,
            &self.config.vocabulary,
            self.config.lookahead,
        )
    }

    pub fn set_time_limit(&mut self, secs: u64) -> Result<(), TutorError> {
        self.require_idle("change the time limit")?;
        self.config.clock.set_limit(secs)?;
        debug!(secs, "time_limit_changed");
        Ok(())
    }

    pub fn set_lookahead(&mut self, lookahead: usize) -> Result<(), TutorError> {
        self.require_idle("change the lookahead")?;
        self.config.lookahead = validate_lookahead(lookahead)?;
        self.fill_lookahead()
    }

    /// Swap in a new vocabulary and regenerate the preview from it
    pub fn replace_vocabulary(&mut self, vocabulary: WordSource) -> Result<(), TutorError> {
        self.require_idle("load words")?;
        self.config.vocabulary = vocabulary;
        self.buffer.clear();
        self.fill_lookahead()?;
        debug!(words = self.config.vocabulary.len(), "vocabulary_replaced");
        Ok(())
    }

    /// Load a word file. On any failure the current vocabulary stays.
    /// Returns the number of words loaded.
    pub fn load_vocabulary_file<P: AsRef<Path>>(&mut self, path: P) -> Result<usize, TutorError> {
        self.require_idle("load words")?;
        let vocabulary = WordSource::from_file(path)?;
        let count = vocabulary.len();
        self.replace_vocabulary(vocabulary)?;
        Ok(count)
    }

    pub fn remaining_secs(&self, now: Instant) -> f64 {
        match self.phase {
            SessionPhase::Idle => self.config.time_limit_secs() as f64,
            SessionPhase::Running { started_at } => self.config.clock.remaining(started_at, now),
            SessionPhase::Finished { .. } => 0.0,
        }
    }

    pub fn live_stats(&self, now: Instant) -> LiveStats {
        let elapsed = match self.phase {
            SessionPhase::Idle => Duration::ZERO,
            SessionPhase::Running { started_at } => self.config.clock.elapsed(started_at, now),
            SessionPhase::Finished {
                started_at,
                ended_at,
            } => ended_at.saturating_duration_since(started_at),
        };
        LiveStats::compute(self.matcher.judgments(), elapsed)
    }

    /// Final numbers, once the clock has run out
    pub fn results(&self) -> Option<LiveStats> {
        self.final_stats
    }

    pub fn snapshot(&self, now: Instant) -> RenderSnapshot<'_> {
        RenderSnapshot {
            phase: self.phase,
            window: self.buffer.window(self.config.lookahead),
            history: self.buffer.history(),
            current_input: self.matcher.input(),
            partial_mismatch: matches!(
                self.matcher.current_state(&self.buffer),
                WordState::Typing { mismatch: true }
            ),
            judgments: self.matcher.judgments(),
            remaining_secs: self.remaining_secs(now),
            time_limit_secs: self.config.time_limit_secs(),
            live_stats: self.live_stats(now),
            final_stats: self.final_stats,
        }
    }

    /// Rendering state of the buffered word at absolute `index`
    pub fn word_state(&self, index: usize) -> WordState {
        self.matcher.word_state(index, &self.buffer)
    }

    pub fn cursor(&self) -> usize {
        self.buffer.cursor()
    }

    pub fn current_input(&self) -> &str {
        self.matcher.input()
    }

    pub fn judgments(&self) -> &[WordJudgment] {
        self.matcher.judgments()
    }

    fn fill_lookahead(&mut self) -> Result<(), TutorError> {
        self.buffer
            .ensure_lookahead(&self.config.vocabulary, self.config.lookahead)
    }

    fn require_running(&self, action: &'static str) -> Result<(), TutorError> {
        if self.is_running() {
            return Ok(());
        }
        debug!(action, phase = %self.phase, "input_ignored");
        Err(self.invalid_transition(action))
    }

    fn require_idle(&self, action: &'static str) -> Result<(), TutorError> {
        if self.phase == SessionPhase::Idle {
            return Ok(());
        }
        Err(self.refuse(action))
    }

    fn refuse(&self, action: &'static str) -> TutorError {
        warn!(action, phase = %self.phase, "transition_refused");
        self.invalid_transition(action)
    }

    fn invalid_transition(&self, action: &'static str) -> TutorError {
        TutorError::InvalidStateTransition {
            action,
            phase: self.phase.to_string(),
        }
    }
}
