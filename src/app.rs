use std::sync::mpsc::Sender;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::clock::Clock;
use crate::config::{Config, DEFAULT_LEADERBOARD_LIMIT, DEFAULT_TICK_INTERVAL_MS};
use crate::difficulty::Difficulty;
use crate::identity::{Identity, IdentityProvider};
use crate::metrics::Metrics;
use crate::runtime::{AppEvent, SessionTimer};
use crate::score_store::{Leaderboard, LeaderboardEntry, NewScore, ScoreStore};
use crate::session::TypingSession;
use crate::submit::ScoreSink;
use crate::text::{TextProvider, TextSample};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    /// Waiting for an identity; typing is disabled
    Loading,
    Typing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppSettings {
    pub difficulty: Difficulty,
    pub leaderboard_limit: usize,
    pub tick_interval: Duration,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            difficulty: Difficulty::Easy,
            leaderboard_limit: DEFAULT_LEADERBOARD_LIMIT,
            tick_interval: Duration::from_millis(DEFAULT_TICK_INTERVAL_MS),
        }
    }
}

impl From<&Config> for AppSettings {
    fn from(cfg: &Config) -> Self {
        Self {
            difficulty: cfg.difficulty,
            leaderboard_limit: cfg.leaderboard_limit,
            tick_interval: Duration::from_millis(cfg.tick_interval_ms.max(1)),
        }
    }
}

/// Detects the false -> true transition of `completed` across snapshots
#[derive(Debug, Default, Clone, Copy)]
pub struct CompletionEdge {
    completed: bool,
}

impl CompletionEdge {
    /// True only for the first completed snapshot since the last reset
    pub fn observe(&mut self, metrics: &Metrics) -> bool {
        let rising = metrics.completed && !self.completed;
        self.completed = metrics.completed;
        rising
    }

    pub fn reset(&mut self) {
        self.completed = false;
    }
}

/// Collaborators the host is built from
pub struct AppParts {
    pub texts: Box<dyn TextProvider>,
    pub scores: Box<dyn ScoreStore>,
    pub sink: Box<dyn ScoreSink>,
    pub events: Sender<AppEvent>,
    pub clock: Arc<dyn Clock>,
    pub settings: AppSettings,
}

/// Owns the typing session and everything around it: the tick timer,
/// identity, leaderboard and score submission.
pub struct App {
    pub state: AppState,
    pub identity: Option<Identity>,
    pub identity_error: Option<String>,
    pub difficulty: Difficulty,
    pub sample: TextSample,
    pub session: TypingSession,
    /// Last snapshot taken on a keystroke or tick; what the UI shows
    pub metrics: Metrics,
    pub leaderboard: Vec<LeaderboardEntry>,
    pub status: Option<String>,
    pub should_quit: bool,
    settings: AppSettings,
    edge: CompletionEdge,
    timer: Option<SessionTimer>,
    runs: u64,
    texts: Box<dyn TextProvider>,
    scores: Box<dyn ScoreStore>,
    sink: Box<dyn ScoreSink>,
    events: Sender<AppEvent>,
    clock: Arc<dyn Clock>,
}

impl App {
    pub fn new(parts: AppParts) -> Self {
        let AppParts {
            texts,
            scores,
            sink,
            events,
            clock,
            settings,
        } = parts;

        let difficulty = settings.difficulty;
        let sample = texts.random_text(difficulty);
        let session = TypingSession::with_clock(&sample.text, clock.clone());
        let leaderboard = Leaderboard::fetch(scores.as_ref(), difficulty, settings.leaderboard_limit);

        Self {
            state: AppState::Loading,
            identity: None,
            identity_error: None,
            difficulty,
            sample,
            session,
            metrics: Metrics::baseline(),
            leaderboard,
            status: None,
            should_quit: false,
            settings,
            edge: CompletionEdge::default(),
            timer: None,
            runs: 0,
            texts,
            scores,
            sink,
            events,
            clock,
        }
    }

    pub fn settings(&self) -> &AppSettings {
        &self.settings
    }

    /// A session is running between its first keystroke and completion;
    /// difficulty is locked while it runs
    pub fn is_running(&self) -> bool {
        self.session.is_active() && !self.session.is_completed()
    }

    pub fn has_timer(&self) -> bool {
        self.timer.is_some()
    }

    pub fn handle_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::Key(key) => self.on_key(key),
            AppEvent::Tick { epoch } => self.on_tick(epoch),
            AppEvent::IdentityReady(identity) => {
                log::info!("identity ready: {}", identity.display_name);
                self.identity = Some(identity);
                self.identity_error = None;
                self.state = AppState::Typing;
            }
            AppEvent::IdentityFailed(e) => {
                log::error!("identity provisioning failed: {e}");
                self.identity_error = Some(e);
            }
            AppEvent::ScoreSaved(difficulty) => {
                self.status = Some("Score saved to the leaderboard".to_string());
                if difficulty == self.difficulty {
                    self.refresh_leaderboard();
                }
            }
            AppEvent::ScoreFailed(_) => {
                self.status = Some("Could not save score".to_string());
            }
            AppEvent::Resize | AppEvent::Heartbeat => {}
        }
    }

    fn on_key(&mut self, key: KeyEvent) {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Esc => self.should_quit = true,
            KeyCode::Char('c') if ctrl => self.should_quit = true,
            _ if self.state == AppState::Loading => {}
            KeyCode::Tab => self.reset(),
            KeyCode::Char('r') if ctrl => self.reset(),
            KeyCode::Left => {
                self.change_difficulty(self.difficulty.prev());
            }
            KeyCode::Right => {
                self.change_difficulty(self.difficulty.next());
            }
            KeyCode::Backspace => {
                if self.session.typed_len() > 0 {
                    let candidate = self.session.with_last_removed();
                    self.submit_input(&candidate);
                }
            }
            KeyCode::Char(c) if !ctrl => {
                let candidate = self.session.with_appended(c);
                self.submit_input(&candidate);
            }
            _ => {}
        }
    }

    /// Feed a candidate to the session; acquires the tick timer on the
    /// keystroke that starts the session
    pub fn submit_input(&mut self, candidate: &str) {
        if self.state == AppState::Loading {
            return;
        }

        let was_active = self.session.is_active();
        let outcome = self.session.submit_input(candidate);
        if !outcome.is_accepted() {
            log::debug!("input rejected: {outcome:?}");
            return;
        }

        if !was_active && self.session.is_active() {
            self.acquire_timer();
        }

        let snapshot = self.session.snapshot();
        self.apply_snapshot(snapshot);
    }

    fn on_tick(&mut self, epoch: u64) {
        let current = self.timer.as_ref().map(SessionTimer::epoch);
        if current != Some(epoch) || !self.session.is_active() {
            log::debug!("ignoring stale tick for run {epoch}");
            return;
        }
        let snapshot = self.session.tick();
        self.apply_snapshot(snapshot);
    }

    fn apply_snapshot(&mut self, snapshot: Metrics) {
        self.metrics = snapshot;
        if self.edge.observe(&snapshot) {
            self.on_completed(snapshot);
        }
    }

    fn on_completed(&mut self, snapshot: Metrics) {
        // the result is final, stop ticking
        self.release_timer();

        let Some(identity) = &self.identity else {
            log::warn!("session completed without an identity, score not saved");
            return;
        };

        if snapshot.time_elapsed_seconds == 0 {
            log::info!("session completed in under a second, score not saved");
            self.status = Some("Too fast to score, try a longer run".to_string());
            return;
        }

        self.sink.submit(NewScore {
            user_id: identity.user_id.clone(),
            display_name: identity.display_name.clone(),
            wpm: snapshot.wpm,
            accuracy: snapshot.accuracy,
            difficulty: self.difficulty,
        });
        self.status = Some("Saving score...".to_string());
    }

    fn acquire_timer(&mut self) {
        self.release_timer();
        self.runs += 1;
        self.timer = Some(SessionTimer::start(
            self.events.clone(),
            self.settings.tick_interval,
            self.runs,
        ));
    }

    fn release_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.cancel();
        }
    }

    /// Start over on a freshly selected text of the current difficulty
    pub fn reset(&mut self) {
        self.release_timer();
        self.sample = self.texts.random_text(self.difficulty);
        self.session = TypingSession::with_clock(&self.sample.text, self.clock.clone());
        self.metrics = Metrics::baseline();
        self.edge.reset();
        self.status = None;
    }

    /// Switch tiers; refused while a session is running
    pub fn change_difficulty(&mut self, difficulty: Difficulty) -> bool {
        if self.is_running() {
            self.status = Some("Finish or reset (Tab) before changing difficulty".to_string());
            return false;
        }
        self.difficulty = difficulty;
        self.reset();
        self.refresh_leaderboard();
        true
    }

    pub fn refresh_leaderboard(&mut self) {
        self.leaderboard = Leaderboard::fetch(
            self.scores.as_ref(),
            self.difficulty,
            self.settings.leaderboard_limit,
        );
    }
}

/// Provision the identity on a background thread and report the result as
/// an app event
pub fn provision_identity(
    provider: Box<dyn IdentityProvider>,
    events: Sender<AppEvent>,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let event = match provider.provision() {
            Ok(identity) => AppEvent::IdentityReady(identity),
            Err(e) => AppEvent::IdentityFailed(e.to_string()),
        };
        let _ = events.send(event);
    })
}
