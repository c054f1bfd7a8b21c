use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Instant;

use crate::clock::{Clock, SystemClock};
use crate::metrics::Metrics;

/// Why a candidate input was not applied
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RejectReason {
    /// Candidate has more characters than the target text
    TooLong { len: usize, max: usize },
    /// The whole target has already been typed
    Completed,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputOutcome {
    Accepted,
    Rejected(RejectReason),
}

impl InputOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, InputOutcome::Accepted)
    }
}

/// How a single target character is displayed
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CharState {
    Correct,
    Incorrect,
    Cursor,
    Pending,
}

/// One typing attempt against a fixed target text.
///
/// All input goes through `submit_input`, which replaces the typed prefix
/// wholesale and recomputes the error set from scratch.
pub struct TypingSession {
    target: Vec<char>,
    typed: Vec<char>,
    errors: BTreeSet<usize>,
    started_at: Option<Instant>,
    active: bool,
    epoch: u64,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for TypingSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypingSession")
            .field("target", &self.target.iter().collect::<String>())
            .field("typed", &self.typed.iter().collect::<String>())
            .field("errors", &self.errors)
            .field("started_at", &self.started_at)
            .field("active", &self.active)
            .field("epoch", &self.epoch)
            .finish()
    }
}

impl TypingSession {
    pub fn new(target: &str) -> Self {
        Self::with_clock(target, Arc::new(SystemClock))
    }

    pub fn with_clock(target: &str, clock: Arc<dyn Clock>) -> Self {
        Self {
            target: target.chars().collect(),
            typed: Vec::new(),
            errors: BTreeSet::new(),
            started_at: None,
            active: false,
            epoch: 0,
            clock,
        }
    }

    /// Mark the session active and start timing. Ignored while already active.
    pub fn start(&mut self) {
        if self.active {
            return;
        }
        self.active = true;
        self.started_at = Some(self.clock.now());
        self.epoch += 1;
    }

    /// Replace the typed prefix with `candidate`.
    ///
    /// The first accepted input of an inactive session starts it, so timing
    /// begins at the first keystroke rather than at construction.
    pub fn submit_input(&mut self, candidate: &str) -> InputOutcome {
        if self.is_completed() {
            return InputOutcome::Rejected(RejectReason::Completed);
        }

        let chars: Vec<char> = candidate.chars().collect();
        if chars.len() > self.target.len() {
            return InputOutcome::Rejected(RejectReason::TooLong {
                len: chars.len(),
                max: self.target.len(),
            });
        }

        if !self.active {
            self.start();
        }

        self.errors = chars
            .iter()
            .zip(self.target.iter())
            .enumerate()
            .filter(|(_, (typed, expected))| typed != expected)
            .map(|(idx, _)| idx)
            .collect();
        self.typed = chars;

        InputOutcome::Accepted
    }

    /// Snapshot for the periodic timer. Does not mutate the session.
    pub fn tick(&self) -> Metrics {
        self.snapshot()
    }

    /// Back to the pre-first-keystroke state; the target text is kept
    pub fn reset(&mut self) {
        self.typed.clear();
        self.errors.clear();
        self.started_at = None;
        self.active = false;
    }

    pub fn snapshot(&self) -> Metrics {
        let total_chars = self.typed.len();
        let correct_chars = total_chars - self.errors.len();
        Metrics::from_counts(
            correct_chars,
            total_chars,
            self.time_elapsed_seconds(),
            self.target.len(),
        )
    }

    pub fn time_elapsed_seconds(&self) -> u64 {
        match self.started_at {
            Some(started) => self
                .clock
                .now()
                .saturating_duration_since(started)
                .as_secs(),
            None => 0,
        }
    }

    pub fn target_text(&self) -> String {
        self.target.iter().collect()
    }

    pub fn target_len(&self) -> usize {
        self.target.len()
    }

    pub fn typed(&self) -> String {
        self.typed.iter().collect()
    }

    pub fn typed_len(&self) -> usize {
        self.typed.len()
    }

    pub fn error_positions(&self) -> &BTreeSet<usize> {
        &self.errors
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn started_at(&self) -> Option<Instant> {
        self.started_at
    }

    /// Number of times this session has been started; identifies the
    /// current active interval
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn is_completed(&self) -> bool {
        self.typed.len() >= self.target.len()
    }

    /// Candidate produced by typing `c` at the end of the current prefix
    pub fn with_appended(&self, c: char) -> String {
        let mut candidate = self.typed();
        candidate.push(c);
        candidate
    }

    /// Candidate produced by deleting the last typed character
    pub fn with_last_removed(&self) -> String {
        let mut candidate = self.typed();
        candidate.pop();
        candidate
    }

    /// Display state for every character of the target
    pub fn char_states(&self) -> Vec<(char, CharState)> {
        self.target
            .iter()
            .enumerate()
            .map(|(idx, &c)| {
                let state = if idx < self.typed.len() {
                    if self.errors.contains(&idx) {
                        CharState::Incorrect
                    } else {
                        CharState::Correct
                    }
                } else if idx == self.typed.len() {
                    CharState::Cursor
                } else {
                    CharState::Pending
                };
                (c, state)
            })
            .collect()
    }
}
