use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossterm::event::{self, Event as CtEvent, KeyEvent};

use crate::difficulty::Difficulty;
use crate::identity::Identity;

/// Unified event type consumed by the app runner
#[derive(Clone, Debug)]
pub enum AppEvent {
    Key(KeyEvent),
    Resize,
    /// Periodic session tick, tagged with the epoch of the session that
    /// acquired the timer
    Tick { epoch: u64 },
    IdentityReady(Identity),
    IdentityFailed(String),
    ScoreSaved(Difficulty),
    ScoreFailed(String),
    /// Nothing arrived within the runner interval
    Heartbeat,
}

/// Source of application events (keyboard, resize, timers, workers)
pub trait AppEventSource: Send + 'static {
    /// Block for up to `timeout` waiting for an event.
    /// Returns Ok(event) if an event arrives before the timeout, or Err(Timeout) if it expires.
    fn recv_timeout(&self, timeout: Duration) -> Result<AppEvent, RecvTimeoutError>;
}

/// Production event source: terminal events forwarded from a reader thread,
/// merged with everything else sent on the same channel
pub struct CrosstermEventSource {
    rx: Receiver<AppEvent>,
}

impl CrosstermEventSource {
    pub fn new(tx: Sender<AppEvent>, rx: Receiver<AppEvent>) -> Self {
        thread::spawn(move || loop {
            match event::read() {
                Ok(CtEvent::Key(key)) => {
                    if tx.send(AppEvent::Key(key)).is_err() {
                        break;
                    }
                }
                Ok(CtEvent::Resize(_, _)) => {
                    if tx.send(AppEvent::Resize).is_err() {
                        break;
                    }
                }
                Ok(_) => {}
                Err(e) => {
                    log::error!("terminal event reader stopped: {e}");
                    break;
                }
            }
        });

        Self { rx }
    }
}

impl AppEventSource for CrosstermEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<AppEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

/// Configurable ticker interface
pub trait Ticker: Send + Sync + 'static {
    fn interval(&self) -> Duration;
}

/// Fixed interval ticker
#[derive(Clone, Copy, Debug)]
pub struct FixedTicker {
    interval: Duration,
}

impl FixedTicker {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }
}

impl Ticker for FixedTicker {
    fn interval(&self) -> Duration {
        self.interval
    }
}

/// Test event source for unit tests
pub struct TestEventSource {
    rx: Receiver<AppEvent>,
}

impl TestEventSource {
    pub fn new(rx: Receiver<AppEvent>) -> Self {
        Self { rx }
    }
}

impl AppEventSource for TestEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<AppEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

/// Runner that advances the application one event at a time
pub struct Runner<E: AppEventSource, T: Ticker> {
    event_source: E,
    ticker: T,
}

impl<E: AppEventSource, T: Ticker> Runner<E, T> {
    pub fn new(event_source: E, ticker: T) -> Self {
        Self {
            event_source,
            ticker,
        }
    }

    /// Blocks up to the ticker interval and returns the next event, or Heartbeat on timeout
    pub fn step(&self) -> AppEvent {
        match self.event_source.recv_timeout(self.ticker.interval()) {
            Ok(ev) => ev,
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => {
                AppEvent::Heartbeat
            }
        }
    }
}

/// Repeating session timer.
///
/// Sends `AppEvent::Tick { epoch }` every `interval` until cancelled.
/// Dropping the handle cancels the timer and joins its thread, so no tick
/// is sent after the handle is gone.
#[derive(Debug)]
pub struct SessionTimer {
    epoch: u64,
    cancel: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl SessionTimer {
    pub fn start(tx: Sender<AppEvent>, interval: Duration, epoch: u64) -> Self {
        let (cancel_tx, cancel_rx) = mpsc::channel::<()>();
        let handle = thread::spawn(move || loop {
            match cancel_rx.recv_timeout(interval) {
                Err(RecvTimeoutError::Timeout) => {
                    if tx.send(AppEvent::Tick { epoch }).is_err() {
                        break;
                    }
                }
                // explicit cancel or handle dropped
                Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
            }
        });
        log::debug!("session timer started for epoch {epoch}");

        Self {
            epoch,
            cancel: Some(cancel_tx),
            handle: Some(handle),
        }
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Stop the timer and wait for its thread to exit
    pub fn cancel(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            let _ = cancel.send(());
        }
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::warn!("session timer thread for epoch {} panicked", self.epoch);
            } else {
                log::debug!("session timer stopped for epoch {}", self.epoch);
            }
        }
    }
}

impl Drop for SessionTimer {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    #[test]
    fn step_returns_heartbeat_on_timeout() {
        let (_tx, rx) = mpsc::channel();
        let es = TestEventSource::new(rx);
        let ticker = FixedTicker::new(Duration::from_millis(1));
        let runner = Runner::new(es, ticker);

        // With no events available, step should yield Heartbeat
        match runner.step() {
            AppEvent::Heartbeat => {}
            other => panic!("expected Heartbeat on timeout, got {other:?}"),
        }
    }

    #[test]
    fn step_passes_through_events() {
        let (tx, rx) = mpsc::channel();
        tx.send(AppEvent::Resize).unwrap();
        let es = TestEventSource::new(rx);
        let ticker = FixedTicker::new(Duration::from_millis(10));
        let runner = Runner::new(es, ticker);

        match runner.step() {
            AppEvent::Resize => {}
            other => panic!("expected Resize event, got {other:?}"),
        }
    }

    #[test]
    fn timer_emits_ticks_for_its_epoch() {
        let (tx, rx) = mpsc::channel();
        let timer = SessionTimer::start(tx, Duration::from_millis(5), 7);
        assert_eq!(timer.epoch(), 7);

        match rx.recv_timeout(Duration::from_secs(2)) {
            Ok(AppEvent::Tick { epoch }) => assert_eq!(epoch, 7),
            other => panic!("expected Tick, got {other:?}"),
        }
        timer.cancel();
    }

    #[test]
    fn timer_is_silent_after_drop() {
        let (tx, rx) = mpsc::channel();
        let timer = SessionTimer::start(tx, Duration::from_millis(2), 1);
        std::thread::sleep(Duration::from_millis(20));
        drop(timer);

        // drain whatever was sent before the drop
        while rx.try_recv().is_ok() {}
        std::thread::sleep(Duration::from_millis(20));
        // the timer thread owned the only sender; it has exited
        assert!(matches!(
            rx.try_recv(),
            Err(mpsc::TryRecvError::Disconnected)
        ));
    }

    #[test]
    fn cancel_before_first_tick_sends_nothing() {
        let (tx, rx) = mpsc::channel();
        let timer = SessionTimer::start(tx, Duration::from_secs(60), 3);
        timer.cancel();
        assert!(matches!(
            rx.try_recv(),
            Err(mpsc::TryRecvError::Disconnected)
        ));
    }
}
