/// Characters per "word" when converting typed characters to WPM
pub const CHARS_PER_WORD: f64 = 5.0;

/// Read-only view of a session's progress, derived on demand
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Metrics {
    pub wpm: u32,
    pub accuracy: u32,
    pub correct_chars: usize,
    pub total_chars: usize,
    pub time_elapsed_seconds: u64,
    pub completed: bool,
}

impl Metrics {
    /// Baseline shown before the first keystroke and after a reset
    pub fn baseline() -> Self {
        Self {
            wpm: 0,
            accuracy: 100,
            correct_chars: 0,
            total_chars: 0,
            time_elapsed_seconds: 0,
            completed: false,
        }
    }

    pub fn from_counts(
        correct_chars: usize,
        total_chars: usize,
        time_elapsed_seconds: u64,
        target_len: usize,
    ) -> Self {
        Self {
            wpm: calculate_wpm(correct_chars, time_elapsed_seconds),
            accuracy: calculate_accuracy(correct_chars, total_chars),
            correct_chars,
            total_chars,
            time_elapsed_seconds,
            completed: total_chars >= target_len,
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::baseline()
    }
}

/// Words per minute over whole elapsed seconds; 0 before the first second
pub fn calculate_wpm(correct_chars: usize, time_elapsed_seconds: u64) -> u32 {
    if time_elapsed_seconds == 0 {
        return 0;
    }
    let minutes = time_elapsed_seconds as f64 / 60.0;
    let words = correct_chars as f64 / CHARS_PER_WORD;
    // f64::round rounds half away from zero
    (words / minutes).round() as u32
}

/// Percentage of typed characters that match the target; 100 when nothing is typed
pub fn calculate_accuracy(correct_chars: usize, total_chars: usize) -> u32 {
    if total_chars == 0 {
        return 100;
    }
    ((correct_chars as f64 / total_chars as f64) * 100.0).round() as u32
}

/// Format seconds as `m:ss`
pub fn format_time(seconds: u64) -> String {
    format!("{}:{:02}", seconds / 60, seconds % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wpm_zero_time() {
        assert_eq!(calculate_wpm(50, 0), 0);
    }

    #[test]
    fn test_wpm_one_minute() {
        // 250 chars in 60s = 50 words per minute
        assert_eq!(calculate_wpm(250, 60), 50);
    }

    #[test]
    fn test_wpm_short_burst() {
        // 10 chars in 3s = 2 words in 0.05 min = 40
        assert_eq!(calculate_wpm(10, 3), 40);
    }

    #[test]
    fn test_wpm_rounds_half_away_from_zero() {
        // 1 char in 24s: 0.2 words / 0.4 min = 0.5 -> 1
        assert_eq!(calculate_wpm(1, 24), 1);
        // 1 char in 25s: 0.2 / (25/60) = 0.48 -> 0
        assert_eq!(calculate_wpm(1, 25), 0);
    }

    #[test]
    fn test_accuracy_empty() {
        assert_eq!(calculate_accuracy(0, 0), 100);
    }

    #[test]
    fn test_accuracy_partial() {
        assert_eq!(calculate_accuracy(2, 3), 67);
        assert_eq!(calculate_accuracy(1, 3), 33);
        assert_eq!(calculate_accuracy(1, 8), 13);
    }

    #[test]
    fn test_accuracy_half_rounds_up() {
        // 1/200 = 0.5%
        assert_eq!(calculate_accuracy(1, 200), 1);
    }

    #[test]
    fn test_format_time() {
        assert_eq!(format_time(0), "0:00");
        assert_eq!(format_time(9), "0:09");
        assert_eq!(format_time(65), "1:05");
        assert_eq!(format_time(600), "10:00");
    }

    #[test]
    fn test_from_counts_completion() {
        let m = Metrics::from_counts(3, 3, 0, 3);
        assert!(m.completed);
        assert_eq!(m.wpm, 0);
        assert_eq!(m.accuracy, 100);

        let m = Metrics::from_counts(1, 2, 6, 3);
        assert!(!m.completed);
        assert_eq!(m.accuracy, 50);
        assert_eq!(m.wpm, 2);
    }

    #[test]
    fn test_baseline() {
        let m = Metrics::baseline();
        assert_eq!(m, Metrics::default());
        assert_eq!(m.wpm, 0);
        assert_eq!(m.accuracy, 100);
        assert!(!m.completed);
    }
}
