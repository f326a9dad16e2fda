pub mod ui;

use clap::{error::ErrorKind, CommandFactory, Parser};
use crossterm::{
    event::{KeyCode, KeyEvent, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Frame, Terminal,
};
use std::{
    error::Error,
    io::{self, stdin},
    path::PathBuf,
    sync::Once,
    time::Instant,
};
use tracing::{debug, info, trace, warn};
use tracing_appender::non_blocking::WorkerGuard;
use typetutor::{
    app_dirs::AppDirs,
    clock::{parse_time_limit, TIME_PRESETS_SECS},
    config::{ConfigStore, FileConfigStore, Settings},
    matcher::CommitOutcome,
    runtime::{CrosstermEventSource, FixedTicker, Runner, TutorEvent},
    session::{SessionController, TickOutcome, TickToken},
    word_source::WordSource,
    TutorError,
};

/// timed typing tutor: type the random word stream until the clock runs out
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "A timed typing test over a stream of random words. Words are judged as you press space; words per minute counts correct words only."
)]
pub struct Cli {
    /// number of seconds the test runs for
    #[clap(short = 's', long, value_parser = clap::value_parser!(u64).range(1..))]
    seconds: Option<u64>,

    /// plain-text word list to draw from (whitespace separated, UTF-8)
    #[clap(short = 'w', long)]
    word_file: Option<PathBuf>,

    /// number of words kept buffered ahead of the current word
    #[clap(long, value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..))]
    lookahead: Option<usize>,

    /// do not remember settings changed during this run
    #[clap(long)]
    no_save: bool,
}

impl Cli {
    /// Command-line values win over remembered settings
    fn apply(&self, settings: &mut Settings) {
        if let Some(secs) = self.seconds {
            settings.time_limit_secs = secs;
        }
        if let Some(path) = &self.word_file {
            settings.word_file = Some(path.clone());
        }
        if let Some(lookahead) = self.lookahead {
            settings.lookahead = lookahead;
        }
    }
}

/// Text entry that temporarily takes over the input line
#[derive(Debug, Clone, PartialEq)]
pub enum Prompt {
    TimeLimit(String),
    WordFile(String),
}

/// One-line message shown under the input line
#[derive(Debug, Clone, PartialEq)]
pub enum Notice {
    Info(String),
    Warning(String),
    Error(String),
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Flow {
    Continue,
    Quit,
}

pub struct App {
    pub session: SessionController,
    pub tick: Option<TickToken>,
    pub prompt: Option<Prompt>,
    pub notice: Option<Notice>,
    pub settings: Settings,
    pub now: Instant,
    store: Option<FileConfigStore>,
}

impl App {
    pub fn new(mut settings: Settings, store: Option<FileConfigStore>) -> Result<Self, TutorError> {
        let mut notice = None;

        let vocabulary = match settings.vocabulary() {
            Ok(vocabulary) => vocabulary,
            Err(err) => {
                warn!(%err, "word_file_unavailable");
                notice = Some(Notice::Error(format!("{err}; using the built-in words")));
                settings.word_file = None;
                WordSource::default()
            }
        };

        let defaults = Settings::default();
        if settings.time_limit_secs == 0 {
            settings.time_limit_secs = defaults.time_limit_secs;
        }
        if settings.lookahead == 0 {
            settings.lookahead = defaults.lookahead;
        }

        let session = SessionController::new(settings.session_config(vocabulary)?)?;

        Ok(Self {
            session,
            tick: None,
            prompt: None,
            notice,
            settings,
            now: Instant::now(),
            store,
        })
    }

    fn start(&mut self) {
        match self.session.start(self.now) {
            Ok(token) => {
                self.tick = Some(token);
                self.notice = None;
            }
            Err(err) => self.notice = Some(Notice::Error(err.to_string())),
        }
    }

    fn reset(&mut self) {
        self.session.reset();
        self.tick = None;
    }

    /// Poll the countdown. Safe to call on every loop turn.
    fn on_tick(&mut self, now: Instant) {
        self.now = now;
        let Some(token) = self.tick else {
            return;
        };

        match self.session.tick(token, now) {
            TickOutcome::Finished(stats) => {
                info!(summary = %stats, "results_shown");
                self.tick = None;
            }
            TickOutcome::Stale | TickOutcome::Inactive => self.tick = None,
            TickOutcome::Remaining(_) => {}
        }
    }

    fn on_key(&mut self, key: KeyEvent, now: Instant) -> Flow {
        self.now = now;

        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            return Flow::Quit;
        }

        if self.prompt.is_some() {
            self.on_prompt_key(key);
            return Flow::Continue;
        }

        if self.session.is_running() {
            self.on_typing_key(key);
            return Flow::Continue;
        }

        if self.session.results().is_some() {
            return match key.code {
                KeyCode::Enter | KeyCode::Char('r') => {
                    self.reset();
                    Flow::Continue
                }
                KeyCode::Esc | KeyCode::Char('q') => Flow::Quit,
                _ => Flow::Continue,
            };
        }

        match key.code {
            KeyCode::Esc | KeyCode::Char('q') => return Flow::Quit,
            KeyCode::Enter => self.start(),
            KeyCode::Char(c @ '1'..='4') => {
                let index = c as usize - '1' as usize;
                self.set_time_limit(TIME_PRESETS_SECS[index]);
            }
            KeyCode::Char('t') => {
                self.prompt = Some(Prompt::TimeLimit(self.settings.time_limit_secs.to_string()))
            }
            KeyCode::Char('o') => {
                let current = self
                    .settings
                    .word_file
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_default();
                self.prompt = Some(Prompt::WordFile(current));
            }
            KeyCode::Char('d') => self.use_default_words(),
            _ => {}
        }
        Flow::Continue
    }

    fn on_typing_key(&mut self, key: KeyEvent) {
        let handled = match key.code {
            KeyCode::Esc => {
                self.reset();
                return;
            }
            KeyCode::Char(' ') => self.session.boundary().map(|outcome| {
                if let CommitOutcome::Committed(judgment) = outcome {
                    trace!(correct = judgment.is_correct(), "word_judged");
                }
            }),
            KeyCode::Char(c) => self.session.push_char(c).map(drop),
            KeyCode::Backspace => self.session.backspace().map(drop),
            _ => Ok(()),
        };

        if let Err(err) = handled {
            debug!(key = ?key.code, %err, "typing_key_dropped");
        }
    }

    fn on_prompt_key(&mut self, key: KeyEvent) {
        let Some(prompt) = self.prompt.as_mut() else {
            return;
        };
        let text = match prompt {
            Prompt::TimeLimit(text) | Prompt::WordFile(text) => text,
        };

        match key.code {
            KeyCode::Esc => self.prompt = None,
            KeyCode::Backspace => {
                text.pop();
            }
            KeyCode::Char(c) => text.push(c),
            KeyCode::Enter => {
                if let Some(prompt) = self.prompt.take() {
                    self.submit_prompt(prompt);
                }
            }
            _ => {}
        }
    }

    fn submit_prompt(&mut self, prompt: Prompt) {
        match prompt {
            Prompt::TimeLimit(text) => match parse_time_limit(&text) {
                Ok(secs) => self.set_time_limit(secs),
                Err(_) => {
                    self.notice = Some(Notice::Error(
                        "Please enter a valid integer number of seconds.".to_string(),
                    ))
                }
            },
            Prompt::WordFile(text) => {
                let path = PathBuf::from(text.trim());
                if !path.as_os_str().is_empty() {
                    self.load_word_file(path);
                }
            }
        }
    }

    fn set_time_limit(&mut self, secs: u64) {
        match self.session.set_time_limit(secs) {
            Ok(()) => {
                self.settings.time_limit_secs = secs;
                self.persist();
                self.notice = Some(Notice::Info(format!("Time limit set to {secs}s")));
            }
            Err(TutorError::InvalidStateTransition { .. }) => {
                self.notice = Some(Notice::Warning(
                    "Cannot change time while a test is running. Reset first.".to_string(),
                ))
            }
            Err(err) => self.notice = Some(Notice::Error(err.to_string())),
        }
    }

    fn load_word_file(&mut self, path: PathBuf) {
        match self.session.load_vocabulary_file(&path) {
            Ok(count) => {
                self.settings.word_file = Some(path);
                self.persist();
                self.notice = Some(Notice::Info(format!("Loaded {count} words from file.")));
            }
            Err(TutorError::EmptyVocabulary) => {
                self.notice = Some(Notice::Warning(
                    "Selected file did not contain any words.".to_string(),
                ))
            }
            Err(err) => self.notice = Some(Notice::Error(err.to_string())),
        }
    }

    fn use_default_words(&mut self) {
        match self.session.replace_vocabulary(WordSource::default()) {
            Ok(()) => {
                self.settings.word_file = None;
                self.persist();
                self.notice = Some(Notice::Info("Using the built-in words.".to_string()));
            }
            Err(err) => self.notice = Some(Notice::Error(err.to_string())),
        }
    }

    fn persist(&self) {
        if let Some(store) = &self.store {
            if let Err(err) = store.save(&self.settings) {
                warn!(path = %store.path().display(), %err, "settings_save_failed");
            }
        }
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    let _log_guard = init_logging();
    install_panic_hook();

    let store = FileConfigStore::new();
    let mut settings = store.load();
    cli.apply(&mut settings);
    let mut app = App::new(settings, (!cli.no_save).then_some(store))?;

    enable_raw_mode()?;

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = start_tui(&mut terminal, &mut app);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen,)?;
    terminal.show_cursor()?;

    result
}

/// Log to a file under the state directory; the terminal belongs to the UI.
/// Filtering follows RUST_LOG, defaulting to info.
fn init_logging() -> Option<WorkerGuard> {
    let log_dir = AppDirs::log_dir()?;
    std::fs::create_dir_all(&log_dir).ok()?;

    let file_appender = tracing_appender::rolling::never(&log_dir, "typetutor.log");
    let (writer, guard) = tracing_appender::non_blocking(file_appender);
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .try_init()
        .ok()?;
    Some(guard)
}

fn install_panic_hook() {
    static HOOK: Once = Once::new();
    HOOK.call_once(|| {
        let default_panic = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |panic_info| {
            tracing::error!(target: "runtime.panic", %panic_info, "panic");
            default_panic(panic_info);
        }));
    });
}

fn start_tui<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<(), Box<dyn Error>> {
    let runner = Runner::new(CrosstermEventSource::new(), FixedTicker::default());

    loop {
        terminal.draw(|f| ui(app, f))?;

        let event = runner.step();
        // the clock is polled before the event so input never lands after expiry
        app.on_tick(Instant::now());

        match event {
            TutorEvent::Tick | TutorEvent::Resize => {}
            TutorEvent::Key(key) => {
                if app.on_key(key, Instant::now()) == Flow::Quit {
                    break;
                }
            }
        }
    }

    Ok(())
}

fn ui(app: &App, f: &mut Frame) {
    f.render_widget(app, f.area());
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::tempdir;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn test_app() -> App {
        App::new(Settings::default(), None).unwrap()
    }

    fn type_text(app: &mut App, text: &str) {
        for c in text.chars() {
            assert_eq!(app.on_key(key(KeyCode::Char(c)), app.now), Flow::Continue);
        }
    }

    fn current_word(app: &App) -> String {
        app.session.snapshot(app.now).window[0].clone()
    }

    #[test]
    fn test_cli_default_values() {
        let cli = Cli::parse_from(["typetutor"]);

        assert_eq!(cli.seconds, None);
        assert_eq!(cli.word_file, None);
        assert_eq!(cli.lookahead, None);
        assert!(!cli.no_save);
    }

    #[test]
    fn test_cli_flags() {
        let cli = Cli::parse_from([
            "typetutor",
            "-s",
            "30",
            "--word-file",
            "words.txt",
            "--lookahead",
            "50",
            "--no-save",
        ]);

        assert_eq!(cli.seconds, Some(30));
        assert_eq!(cli.word_file, Some(PathBuf::from("words.txt")));
        assert_eq!(cli.lookahead, Some(50));
        assert!(cli.no_save);
    }

    #[test]
    fn test_cli_rejects_zero() {
        assert!(Cli::try_parse_from(["typetutor", "--seconds", "0"]).is_err());
        assert!(Cli::try_parse_from(["typetutor", "--lookahead", "0"]).is_err());
        assert!(Cli::try_parse_from(["typetutor", "--seconds", "-3"]).is_err());
    }

    #[test]
    fn test_cli_overrides_settings() {
        let cli = Cli::parse_from(["typetutor", "-s", "120"]);
        let mut settings = Settings {
            lookahead: 80,
            ..Settings::default()
        };

        cli.apply(&mut settings);

        assert_eq!(settings.time_limit_secs, 120);
        assert_eq!(settings.lookahead, 80);
        assert_eq!(settings.word_file, None);
    }

    #[test]
    fn test_app_new_with_missing_word_file() {
        let settings = Settings {
            word_file: Some(PathBuf::from("/definitely/not/here.txt")),
            ..Settings::default()
        };

        let app = App::new(settings, None).unwrap();

        assert!(matches!(app.notice, Some(Notice::Error(_))));
        assert_eq!(app.settings.word_file, None);
        assert_eq!(
            app.session.config().vocabulary(),
            &WordSource::default()
        );
    }

    #[test]
    fn test_app_new_repairs_zero_settings() {
        let settings = Settings {
            time_limit_secs: 0,
            lookahead: 0,
            word_file: None,
        };

        let app = App::new(settings, None).unwrap();

        assert_eq!(app.session.config().time_limit_secs(), 60);
        assert_eq!(app.session.config().lookahead(), 200);
    }

    #[test]
    fn test_enter_starts_and_typing_commits() {
        let mut app = test_app();
        app.on_key(key(KeyCode::Enter), app.now);
        assert!(app.session.is_running());
        assert!(app.tick.is_some());

        let word = current_word(&app);
        type_text(&mut app, &word);
        type_text(&mut app, " ");

        assert_eq!(app.session.judgments().len(), 1);
        assert!(app.session.judgments()[0].is_correct());
        assert_eq!(app.session.current_input(), "");
    }

    #[test]
    fn test_double_space_commits_nothing() {
        let mut app = test_app();
        app.on_key(key(KeyCode::Enter), app.now);

        type_text(&mut app, "  ");

        assert!(app.session.judgments().is_empty());
        assert_eq!(app.session.cursor(), 0);
    }

    #[test]
    fn test_backspace_edits_input() {
        let mut app = test_app();
        app.on_key(key(KeyCode::Enter), app.now);

        type_text(&mut app, "ab");
        app.on_key(key(KeyCode::Backspace), app.now);

        assert_eq!(app.session.current_input(), "a");
    }

    #[test]
    fn test_typing_keys_outside_a_test_change_nothing() {
        let mut app = test_app();
        let before = app.session.snapshot(app.now).window.to_vec();

        for code in [KeyCode::Char('a'), KeyCode::Char(' '), KeyCode::Backspace] {
            app.on_typing_key(key(code));
        }

        assert!(!app.session.is_running());
        assert_eq!(app.session.current_input(), "");
        assert!(app.session.judgments().is_empty());
        assert_eq!(app.session.snapshot(app.now).window, before.as_slice());

        app.on_key(key(KeyCode::Enter), app.now);
        app.on_tick(app.now + Duration::from_secs(60));
        app.on_typing_key(key(KeyCode::Char('z')));
        app.on_typing_key(key(KeyCode::Char(' ')));

        assert_eq!(app.session.current_input(), "");
        assert!(app.session.judgments().is_empty());
        assert!(app.session.results().is_some());
    }

    #[test]
    fn test_keys_ignored_while_idle() {
        let mut app = test_app();

        app.on_key(key(KeyCode::Char('x')), app.now);
        app.on_key(key(KeyCode::Char(' ')), app.now);

        assert!(!app.session.is_running());
        assert_eq!(app.session.current_input(), "");
    }

    #[test]
    fn test_escape_resets_running_test() {
        let mut app = test_app();
        app.on_key(key(KeyCode::Enter), app.now);
        type_text(&mut app, "abc");

        assert_eq!(app.on_key(key(KeyCode::Esc), app.now), Flow::Continue);

        assert!(!app.session.is_running());
        assert!(app.tick.is_none());
        assert_eq!(app.session.current_input(), "");
    }

    #[test]
    fn test_quit_keys() {
        let mut app = test_app();
        assert_eq!(app.on_key(key(KeyCode::Esc), app.now), Flow::Quit);
        assert_eq!(app.on_key(key(KeyCode::Char('q')), app.now), Flow::Quit);

        app.on_key(key(KeyCode::Enter), app.now);
        let ctrl_c = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert_eq!(app.on_key(ctrl_c, app.now), Flow::Quit);
    }

    #[test]
    fn test_timeout_shows_results() {
        let mut app = test_app();
        app.on_key(key(KeyCode::Enter), app.now);
        let word = current_word(&app);
        type_text(&mut app, &format!("{word} "));

        let later = app.now + Duration::from_secs(61);
        app.on_tick(later);

        assert!(app.tick.is_none());
        let results = app.session.results().unwrap();
        assert_eq!(results.correct, 1);

        type_text(&mut app, "x");
        assert_eq!(app.session.judgments().len(), 1);

        app.on_key(key(KeyCode::Enter), later);
        assert!(app.session.results().is_none());
        assert!(!app.session.is_running());
    }

    #[test]
    fn test_tick_before_expiry_keeps_running() {
        let mut app = test_app();
        app.on_key(key(KeyCode::Enter), app.now);

        app.on_tick(app.now + Duration::from_secs(30));

        assert!(app.session.is_running());
        assert!(app.tick.is_some());
    }

    #[test]
    fn test_presets_change_time_limit() {
        let mut app = test_app();

        app.on_key(key(KeyCode::Char('1')), app.now);
        assert_eq!(app.session.config().time_limit_secs(), 30);

        app.on_key(key(KeyCode::Char('4')), app.now);
        assert_eq!(app.session.config().time_limit_secs(), 300);
        assert_eq!(app.settings.time_limit_secs, 300);
        assert_eq!(
            app.notice,
            Some(Notice::Info("Time limit set to 300s".to_string()))
        );
    }

    #[test]
    fn test_custom_time_prompt() {
        let mut app = test_app();

        app.on_key(key(KeyCode::Char('t')), app.now);
        assert_eq!(app.prompt, Some(Prompt::TimeLimit("60".to_string())));

        app.on_key(key(KeyCode::Backspace), app.now);
        app.on_key(key(KeyCode::Backspace), app.now);
        type_text(&mut app, "45");
        app.on_key(key(KeyCode::Enter), app.now);

        assert_eq!(app.prompt, None);
        assert_eq!(app.session.config().time_limit_secs(), 45);
    }

    #[test]
    fn test_custom_time_prompt_rejects_garbage() {
        let mut app = test_app();

        app.on_key(key(KeyCode::Char('t')), app.now);
        type_text(&mut app, "x");
        app.on_key(key(KeyCode::Enter), app.now);

        assert!(matches!(app.notice, Some(Notice::Error(_))));
        assert_eq!(app.session.config().time_limit_secs(), 60);
    }

    #[test]
    fn test_prompt_escape_cancels() {
        let mut app = test_app();

        app.on_key(key(KeyCode::Char('o')), app.now);
        type_text(&mut app, "/tmp/x");
        assert_eq!(app.on_key(key(KeyCode::Esc), app.now), Flow::Continue);

        assert_eq!(app.prompt, None);
        assert_eq!(app.settings.word_file, None);
    }

    #[test]
    fn test_word_file_prompt_loads_words() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("words.txt");
        std::fs::write(&path, "kiwi mango\nplum").unwrap();
        let mut app = test_app();

        app.on_key(key(KeyCode::Char('o')), app.now);
        type_text(&mut app, &path.display().to_string());
        app.on_key(key(KeyCode::Enter), app.now);

        assert_eq!(
            app.notice,
            Some(Notice::Info("Loaded 3 words from file.".to_string()))
        );
        assert_eq!(app.settings.word_file, Some(path));
        let snapshot = app.session.snapshot(app.now);
        assert!(snapshot
            .window
            .iter()
            .all(|w| ["kiwi", "mango", "plum"].contains(&w.as_str())));
    }

    #[test]
    fn test_word_file_prompt_empty_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("blank.txt");
        std::fs::write(&path, "  \n\t\n").unwrap();
        let mut app = test_app();

        app.on_key(key(KeyCode::Char('o')), app.now);
        type_text(&mut app, &path.display().to_string());
        app.on_key(key(KeyCode::Enter), app.now);

        assert_eq!(
            app.notice,
            Some(Notice::Warning(
                "Selected file did not contain any words.".to_string()
            ))
        );
        assert_eq!(app.session.config().vocabulary(), &WordSource::default());
    }

    #[test]
    fn test_default_words_key() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("words.txt");
        std::fs::write(&path, "kiwi").unwrap();
        let mut app = test_app();
        app.load_word_file(path);

        app.on_key(key(KeyCode::Char('d')), app.now);

        assert_eq!(app.settings.word_file, None);
        assert_eq!(app.session.config().vocabulary(), &WordSource::default());
    }

    #[test]
    fn test_persist_writes_settings() {
        let dir = tempdir().unwrap();
        let store = FileConfigStore::with_path(dir.path().join("config.json"));
        let mut app = App::new(Settings::default(), Some(store.clone())).unwrap();

        app.on_key(key(KeyCode::Char('3')), app.now);

        assert_eq!(store.load().time_limit_secs, 120);
    }
}
