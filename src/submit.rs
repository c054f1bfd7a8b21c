use std::sync::mpsc::{self, Sender};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use crate::runtime::AppEvent;
use crate::score_store::{NewScore, ScoreStore};

/// Fire-and-forget destination for finished sessions
pub trait ScoreSink {
    fn submit(&self, score: NewScore);
}

/// Runs score persistence on a worker thread so the keystroke path never
/// waits on the database.
///
/// Each outcome is reported back on the app event channel. Failures are
/// logged and not retried.
pub struct ScoreSubmitter {
    jobs: Option<Sender<NewScore>>,
    handle: Option<JoinHandle<()>>,
}

impl ScoreSubmitter {
    pub fn spawn(mut store: Box<dyn ScoreStore + Send>, events: Sender<AppEvent>) -> Self {
        let (jobs_tx, jobs_rx) = mpsc::channel::<NewScore>();

        let handle = thread::spawn(move || {
            for job in jobs_rx {
                let event = match store.submit_score(&job) {
                    Ok(saved) => {
                        log::info!(
                            "saved score #{} for {}: {} wpm, {}% ({})",
                            saved.id,
                            saved.display_name,
                            saved.wpm,
                            saved.accuracy,
                            saved.difficulty
                        );
                        AppEvent::ScoreSaved(saved.difficulty)
                    }
                    Err(e) => {
                        log::error!("failed to save score for {}: {e}", job.display_name);
                        AppEvent::ScoreFailed(e.to_string())
                    }
                };
                // the app may already be gone during shutdown
                let _ = events.send(event);
            }
        });

        Self {
            jobs: Some(jobs_tx),
            handle: Some(handle),
        }
    }
}

impl ScoreSink for ScoreSubmitter {
    /// Queue a score; returns immediately
    fn submit(&self, score: NewScore) {
        let queued = self
            .jobs
            .as_ref()
            .map(|jobs| jobs.send(score).is_ok())
            .unwrap_or(false);
        if !queued {
            log::error!("score worker is not running, dropping score");
        }
    }
}

impl Drop for ScoreSubmitter {
    fn drop(&mut self) {
        // closing the job channel lets the worker finish queued scores and exit
        self.jobs.take();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

/// Keeps submitted scores in memory; for tests and dry runs
#[derive(Clone, Debug, Default)]
pub struct RecordingSink {
    scores: Arc<Mutex<Vec<NewScore>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn scores(&self) -> Vec<NewScore> {
        self.scores.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

impl ScoreSink for RecordingSink {
    fn submit(&self, score: NewScore) {
        if let Ok(mut scores) = self.scores.lock() {
            scores.push(score);
        }
    }
}
