use std::time::{Duration, Instant};

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use rand::{rngs::StdRng, SeedableRng};
use typetutor::{
    runtime::{FixedTicker, Runner, TestEventSource, TutorEvent},
    stream::StreamBuffer,
    word_source::WordSource,
    SessionConfig, SessionController, SessionPhase, TickOutcome,
};

fn key(c: char) -> TutorEvent {
    TutorEvent::Key(KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE))
}

fn controller(words: &[&str], limit_secs: u64) -> SessionController {
    let vocabulary = WordSource::load("filler").unwrap();
    let config = SessionConfig::new(limit_secs, 10, vocabulary).unwrap();
    let buffer = StreamBuffer::with_words(words.iter().copied(), StdRng::seed_from_u64(3));
    SessionController::with_buffer(config, buffer).unwrap()
}

// Drives the session through Runner/TestEventSource without a TTY. Every
// synthesized tick advances a simulated clock by one poll interval.
#[test]
fn headless_timed_test_runs_to_results() {
    let mut session = controller(&["the", "be"], 1);

    let (tx, source) = TestEventSource::channel();
    let runner = Runner::new(source, FixedTicker::new(Duration::from_millis(5)));

    for c in "the bee ".chars() {
        tx.send(key(c)).unwrap();
    }

    let started = Instant::now();
    let mut now = started;
    let token = session.start(now).unwrap();
    let mut finished = None;

    for _ in 0..100u32 {
        match runner.step() {
            TutorEvent::Tick => {
                now += Duration::from_millis(100);
                if let TickOutcome::Finished(stats) = session.tick(token, now) {
                    finished = Some(stats);
                    break;
                }
            }
            TutorEvent::Resize => {}
            TutorEvent::Key(key) => {
                if let KeyCode::Char(' ') = key.code {
                    session.boundary().unwrap();
                } else if let KeyCode::Char(c) = key.code {
                    session.push_char(c).unwrap();
                }
            }
        }
    }

    let stats = finished.expect("the clock should run out");
    assert_eq!(stats.correct, 1);
    assert_eq!(stats.incorrect, 1);
    assert!((stats.accuracy - 50.0).abs() < 1e-9);
    assert!((stats.wpm - 60.0).abs() < 1e-9);
    assert!(matches!(session.phase(), SessionPhase::Finished { .. }));
    assert_eq!(session.results(), Some(stats));
}

#[test]
fn headless_input_after_timeout_is_refused() {
    let mut session = controller(&["one"], 1);
    let start = Instant::now();
    let token = session.start(start).unwrap();

    session.keystroke("on").unwrap();
    let outcome = session.tick(token, start + Duration::from_secs(1));
    assert!(matches!(outcome, TickOutcome::Finished(_)));

    assert!(session.push_char('e').is_err());
    assert!(session.boundary().is_err());
    assert_eq!(session.results().unwrap().total(), 0);
}

#[test]
fn headless_reset_then_restart_uses_fresh_token() {
    let mut session = controller(&["alpha", "beta"], 30);
    let start = Instant::now();

    let first = session.start(start).unwrap();
    session.keystroke("alpha").unwrap();
    session.boundary().unwrap();
    session.reset();

    let second = session.start(start + Duration::from_secs(1)).unwrap();
    assert_ne!(first, second);
    assert_eq!(
        session.tick(first, start + Duration::from_secs(40)),
        TickOutcome::Stale
    );
    assert!(session.is_running());
    assert!(session.judgments().is_empty());

    match session.tick(second, start + Duration::from_secs(11)) {
        TickOutcome::Remaining(secs) => assert!((secs - 20.0).abs() < 1e-9),
        other => panic!("expected remaining time, got {other:?}"),
    }
}
