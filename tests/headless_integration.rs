use std::sync::{mpsc, Arc};
use std::time::Duration;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use typemaster::app::{provision_identity, App, AppParts, AppSettings, AppState};
use typemaster::clock::ManualClock;
use typemaster::difficulty::Difficulty;
use typemaster::error::IdentityError;
use typemaster::identity::{Identity, IdentityProvider, StaticIdentityProvider};
use typemaster::runtime::{AppEvent, FixedTicker, Runner, TestEventSource};
use typemaster::score_store::SqliteScoreStore;
use typemaster::submit::{RecordingSink, ScoreSubmitter};
use typemaster::text::FixedTextProvider;

type TestRunner = Runner<TestEventSource, FixedTicker>;

fn key(c: char) -> AppEvent {
    AppEvent::Key(KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE))
}

/// Step the runner until `done` holds or the step budget runs out
fn pump_until(runner: &TestRunner, app: &mut App, done: impl Fn(&App) -> bool) -> bool {
    for _ in 0..400u32 {
        if done(app) {
            return true;
        }
        app.handle_event(runner.step());
    }
    done(app)
}

fn settings(tick: Duration) -> AppSettings {
    AppSettings {
        tick_interval: tick,
        ..AppSettings::default()
    }
}

// Full flow over a real database file: identity arrives, the text is typed,
// the worker saves the score and the leaderboard picks it up.
#[test]
fn headless_session_lands_on_leaderboard() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("scores.db");
    let reader = SqliteScoreStore::open(&db).unwrap();
    let writer = SqliteScoreStore::open(&db).unwrap();

    let (tx, rx) = mpsc::channel();
    let clock = ManualClock::new();
    let submitter = ScoreSubmitter::spawn(Box::new(writer), tx.clone());
    let mut app = App::new(AppParts {
        texts: Box::new(FixedTextProvider::new("cat")),
        scores: Box::new(reader),
        sink: Box::new(submitter),
        events: tx.clone(),
        clock: Arc::new(clock.clone()),
        settings: settings(Duration::from_secs(3600)),
    });
    assert!(app.leaderboard.is_empty());

    provision_identity(
        Box::new(StaticIdentityProvider::new("u-1", "QuickFingers42")),
        tx.clone(),
    )
    .join()
    .unwrap();

    let runner = Runner::new(
        TestEventSource::new(rx),
        FixedTicker::new(Duration::from_millis(5)),
    );
    assert!(pump_until(&runner, &mut app, |a| a.state == AppState::Typing));

    tx.send(key('c')).unwrap();
    tx.send(key('a')).unwrap();
    assert!(pump_until(&runner, &mut app, |a| a.metrics.total_chars == 2));

    clock.advance_secs(6);
    tx.send(key('t')).unwrap();
    assert!(pump_until(&runner, &mut app, |a| a.metrics.completed));
    assert_eq!(app.metrics.wpm, 6);
    assert_eq!(app.metrics.accuracy, 100);

    assert!(pump_until(&runner, &mut app, |a| !a.leaderboard.is_empty()));
    assert_eq!(
        app.status.as_deref(),
        Some("Score saved to the leaderboard")
    );
    let top = &app.leaderboard[0];
    assert_eq!(top.rank, 1);
    assert_eq!(top.display_name, "QuickFingers42");
    assert_eq!(top.wpm, 6);

    // leaderboards are per difficulty
    assert!(app.change_difficulty(Difficulty::Medium));
    assert!(app.leaderboard.is_empty());
    assert!(app.change_difficulty(Difficulty::Easy));
    assert_eq!(app.leaderboard.len(), 1);
}

// Ticks from the real session timer refresh the elapsed time while the
// user is idle mid-run.
#[test]
fn headless_timer_refreshes_metrics() {
    let (tx, rx) = mpsc::channel();
    let clock = ManualClock::new();
    let mut app = App::new(AppParts {
        texts: Box::new(FixedTextProvider::new("hello world")),
        scores: Box::new(SqliteScoreStore::open_in_memory().unwrap()),
        sink: Box::new(RecordingSink::new()),
        events: tx.clone(),
        clock: Arc::new(clock.clone()),
        settings: settings(Duration::from_millis(10)),
    });
    app.handle_event(AppEvent::IdentityReady(Identity {
        user_id: "u".into(),
        display_name: "Ticker".into(),
    }));

    let runner = Runner::new(
        TestEventSource::new(rx),
        FixedTicker::new(Duration::from_millis(5)),
    );

    tx.send(key('h')).unwrap();
    assert!(pump_until(&runner, &mut app, |a| a.has_timer()));

    clock.advance_secs(2);
    assert!(pump_until(&runner, &mut app, |a| a
        .metrics
        .time_elapsed_seconds
        == 2));
    assert!(!app.metrics.completed);

    // reset stops the clock
    tx.send(AppEvent::Key(KeyEvent::new(KeyCode::Tab, KeyModifiers::NONE)))
        .unwrap();
    assert!(pump_until(&runner, &mut app, |a| !a.has_timer()));
    clock.advance_secs(5);
    for _ in 0..5 {
        app.handle_event(runner.step());
    }
    assert_eq!(app.metrics.time_elapsed_seconds, 0);
}

struct BrokenIdentity;

impl IdentityProvider for BrokenIdentity {
    fn provision(&self) -> Result<Identity, IdentityError> {
        Err(IdentityError::NoLocation)
    }
}

#[test]
fn headless_identity_failure_blocks_typing() {
    let (tx, rx) = mpsc::channel();
    let sink = RecordingSink::new();
    let mut app = App::new(AppParts {
        texts: Box::new(FixedTextProvider::new("ab")),
        scores: Box::new(SqliteScoreStore::open_in_memory().unwrap()),
        sink: Box::new(sink.clone()),
        events: tx.clone(),
        clock: Arc::new(ManualClock::new()),
        settings: settings(Duration::from_secs(3600)),
    });

    provision_identity(Box::new(BrokenIdentity), tx.clone())
        .join()
        .unwrap();
    tx.send(key('a')).unwrap();
    tx.send(key('b')).unwrap();

    let runner = Runner::new(
        TestEventSource::new(rx),
        FixedTicker::new(Duration::from_millis(5)),
    );
    for _ in 0..3 {
        app.handle_event(runner.step());
    }

    assert_eq!(app.state, AppState::Loading);
    assert!(app.identity_error.is_some());
    assert_eq!(app.session.typed(), "");
    assert!(sink.scores().is_empty());
}
