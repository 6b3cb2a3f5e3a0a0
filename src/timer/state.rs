use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum RestTimerStatus {
    #[default]
    Idle,
    Running,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RestTimerState {
    pub status: RestTimerStatus,
    pub total_seconds: u32,
    pub remaining_seconds: u32,
    pub end_at: Option<DateTime<Utc>>,
    /// Bumped on every new countdown so a stale ticker cannot expire a newer one.
    #[serde(skip)]
    pub generation: u64,
}

impl Default for RestTimerState {
    fn default() -> Self {
        Self {
            status: RestTimerStatus::Idle,
            total_seconds: 0,
            remaining_seconds: 0,
            end_at: None,
            generation: 0,
        }
    }
}

impl RestTimerState {
    pub fn is_running(&self) -> bool {
        self.status == RestTimerStatus::Running
    }

    /// `1 - remaining/total`, or 0 when there is no total.
    pub fn progress(&self) -> f64 {
        if self.total_seconds == 0 {
            return 0.0;
        }
        1.0 - f64::from(self.remaining_seconds) / f64::from(self.total_seconds)
    }

    pub fn begin(&mut self, total_seconds: u32, end_at: DateTime<Utc>, now: DateTime<Utc>) -> u64 {
        self.generation = self.generation.wrapping_add(1);
        self.status = RestTimerStatus::Running;
        self.total_seconds = total_seconds;
        self.end_at = Some(end_at);
        self.remaining_seconds = seconds_until(end_at, now);
        self.generation
    }

    /// Recompute remaining time; returns `true` once the end time is reached.
    pub fn refresh(&mut self, now: DateTime<Utc>) -> bool {
        match self.end_at {
            Some(end_at) if self.is_running() => {
                self.remaining_seconds = seconds_until(end_at, now);
                end_at <= now
            }
            _ => false,
        }
    }

    pub fn reset(&mut self) {
        self.status = RestTimerStatus::Idle;
        self.total_seconds = 0;
        self.remaining_seconds = 0;
        self.end_at = None;
    }
}

/// Whole seconds left, rounded up; 0 once `end_at` has passed.
pub fn seconds_until(end_at: DateTime<Utc>, now: DateTime<Utc>) -> u32 {
    let millis = (end_at - now).num_milliseconds();
    if millis <= 0 {
        return 0;
    }
    let seconds = (millis + 999) / 1000;
    u32::try_from(seconds).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn remaining_rounds_up_to_whole_seconds() {
        let now = Utc::now();
        assert_eq!(seconds_until(now + Duration::milliseconds(89_001), now), 90);
        assert_eq!(seconds_until(now + Duration::seconds(90), now), 90);
        assert_eq!(seconds_until(now - Duration::seconds(1), now), 0);
    }

    #[test]
    fn progress_tracks_remaining_over_total() {
        let mut state = RestTimerState::default();
        assert_eq!(state.progress(), 0.0);

        let now = Utc::now();
        state.begin(100, now + Duration::seconds(100), now);
        assert_eq!(state.progress(), 0.0);

        assert!(!state.refresh(now + Duration::seconds(25)));
        assert_eq!(state.remaining_seconds, 75);
        assert!((state.progress() - 0.25).abs() < f64::EPSILON);

        assert!(state.refresh(now + Duration::seconds(100)));
        state.reset();
        assert_eq!(state.progress(), 0.0);
        assert!(!state.is_running());
    }

    #[test]
    fn each_countdown_gets_a_new_generation() {
        let mut state = RestTimerState::default();
        let now = Utc::now();
        let first = state.begin(30, now + Duration::seconds(30), now);
        let second = state.begin(30, now + Duration::seconds(30), now);
        assert_ne!(first, second);
    }
}
