use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::time::Duration;

use crossterm::event::{self, Event as CtEvent, KeyEvent, KeyEventKind};

use crate::clock::TestClock;

/// Everything the main loop reacts to, in arrival order
#[derive(Clone, Debug)]
pub enum TutorEvent {
    Key(KeyEvent),
    Resize,
    Tick,
}

/// Where key presses and resizes come from.
///
/// `next_event` waits at most `wait`; `None` means nothing arrived in time,
/// or the source has shut down.
pub trait TutorEventSource: Send + 'static {
    fn next_event(&self, wait: Duration) -> Option<TutorEvent>;
}

fn receive(rx: &Receiver<TutorEvent>, wait: Duration) -> Option<TutorEvent> {
    match rx.recv_timeout(wait) {
        Ok(ev) => Some(ev),
        Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => None,
    }
}

/// Terminal input read on a background thread
pub struct CrosstermEventSource {
    rx: Receiver<TutorEvent>,
}

impl CrosstermEventSource {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();

        std::thread::spawn(move || loop {
            let forwarded = match event::read() {
                // key releases would otherwise double every keystroke on some platforms
                Ok(CtEvent::Key(key)) if key.kind == KeyEventKind::Press => {
                    Some(TutorEvent::Key(key))
                }
                Ok(CtEvent::Resize(_, _)) => Some(TutorEvent::Resize),
                Ok(_) => None,
                Err(err) => {
                    tracing::warn!(target: "runtime", %err, "event_read_failed");
                    break;
                }
            };

            if let Some(ev) = forwarded {
                if tx.send(ev).is_err() {
                    break;
                }
            }
        });

        Self { rx }
    }
}

impl Default for CrosstermEventSource {
    fn default() -> Self {
        Self::new()
    }
}

impl TutorEventSource for CrosstermEventSource {
    fn next_event(&self, wait: Duration) -> Option<TutorEvent> {
        receive(&self.rx, wait)
    }
}

/// How long the loop may stay quiet before the countdown is polled again
pub trait Ticker: Send + Sync + 'static {
    fn period(&self) -> Duration;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FixedTicker {
    period: Duration,
}

impl FixedTicker {
    pub fn new(period: Duration) -> Self {
        Self { period }
    }
}

impl Default for FixedTicker {
    /// Ticks at the countdown's poll cadence
    fn default() -> Self {
        Self::new(TestClock::default().poll_interval())
    }
}

impl Ticker for FixedTicker {
    fn period(&self) -> Duration {
        self.period
    }
}

/// Scripted input for driving a session without a terminal
pub struct TestEventSource {
    rx: Receiver<TutorEvent>,
}

impl TestEventSource {
    pub fn new(rx: Receiver<TutorEvent>) -> Self {
        Self { rx }
    }

    /// A source plus the sender that feeds it
    pub fn channel() -> (Sender<TutorEvent>, Self) {
        let (tx, rx) = mpsc::channel();
        (tx, Self::new(rx))
    }
}

impl TutorEventSource for TestEventSource {
    fn next_event(&self, wait: Duration) -> Option<TutorEvent> {
        receive(&self.rx, wait)
    }
}

/// Pulls one event per call, standing in a `Tick` when the ticker's period
/// passes with no input
pub struct Runner<E: TutorEventSource, T: Ticker> {
    source: E,
    ticker: T,
}

impl<E: TutorEventSource, T: Ticker> Runner<E, T> {
    pub fn new(source: E, ticker: T) -> Self {
        Self { source, ticker }
    }

    pub fn step(&self) -> TutorEvent {
        self.source
            .next_event(self.ticker.period())
            .unwrap_or(TutorEvent::Tick)
    }
}
