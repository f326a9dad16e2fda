use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors surfaced by the typing engine. All of them are recoverable at the
/// session level; the caller reports them and carries on.
#[derive(Debug, Error)]
pub enum TutorError {
    /// The vocabulary has no usable words
    #[error("word list does not contain any words")]
    EmptyVocabulary,

    /// Reading or decoding a word file failed
    #[error("error loading {}: {source}", path.display())]
    FileLoad {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A configuration value was rejected
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    /// The operation is not allowed in the current session phase
    #[error("cannot {action} while the test is {phase}")]
    InvalidStateTransition { action: &'static str, phase: String },
}
