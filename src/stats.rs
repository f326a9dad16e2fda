use std::fmt::{self, Display, Formatter};
use std::time::Duration;

use crate::matcher::WordJudgment;

/// Words-per-minute and accuracy derived from judgments so far.
///
/// `wpm` counts *correct* words only, so mistakes lower the score rather
/// than padding it.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LiveStats {
    pub wpm: f64,
    pub accuracy: f64,
    pub correct: usize,
    pub incorrect: usize,
    pub elapsed_secs: f64,
}

/// Elapsed time used as the divisor, never below one second
pub fn effective_elapsed_secs(elapsed: Duration) -> f64 {
    elapsed.as_secs_f64().max(1.0)
}

impl LiveStats {
    pub fn compute(judgments: &[WordJudgment], elapsed: Duration) -> Self {
        let correct = judgments.iter().filter(|j| j.is_correct()).count();
        let incorrect = judgments.len() - correct;
        let elapsed_secs = effective_elapsed_secs(elapsed);

        let wpm = correct as f64 / elapsed_secs * 60.0;
        let accuracy = if judgments.is_empty() {
            0.0
        } else {
            correct as f64 / judgments.len() as f64 * 100.0
        };

        Self {
            wpm,
            accuracy,
            correct,
            incorrect,
            elapsed_secs,
        }
    }

    pub fn total(&self) -> usize {
        self.correct + self.incorrect
    }

    /// Multi-line summary shown once the test is over
    pub fn summary(&self) -> String {
        format!(
            "WPM: {}\nCorrect Words: {}\nIncorrect Words: {}\nAccuracy: {:.1} %",
            self.wpm as u64, self.correct, self.incorrect, self.accuracy
        )
    }
}

impl Display for LiveStats {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "WPM: {} | Correct: {} | Incorrect: {} | Accuracy: {:.1}%",
            self.wpm as u64, self.correct, self.incorrect, self.accuracy
        )
    }
}
