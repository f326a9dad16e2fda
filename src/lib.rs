// Library surface: the typing engine plus the headless runtime pieces.
// The terminal front end lives in main.rs and only consumes snapshots.
pub mod app_dirs;
pub mod clock;
pub mod config;
pub mod error;
pub mod matcher;
pub mod runtime;
pub mod session;
pub mod stats;
pub mod stream;
pub mod word_source;

pub use error::TutorError;
pub use session::{RenderSnapshot, SessionConfig, SessionController, SessionPhase, TickOutcome};
