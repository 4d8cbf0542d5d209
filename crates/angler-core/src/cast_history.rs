//! Real-time and in-game hour of every cast.
//!
//! One in-game day lasts one real hour, so the in-game hour is derived from
//! the minute and second of the local wall clock.

use std::time::Duration;

use chrono::Timelike;
use serde::Serialize;

use crate::clock::Clock;

/// Real seconds per in-game hour.
const SECONDS_PER_GAME_HOUR: u32 = 150;

/// Errors raised by [`CastHistory`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum HistoryError {
    /// A cast was recorded before any sample had been taken.
    #[error("no cast sample to record, update the current sample first")]
    NoCurrentSample,
}

/// Hours observed at one cast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CastSample {
    /// Whole real hours since the session started.
    pub real_hour: u64,
    /// In-game hour of day, `0..24`.
    pub game_hour: u32,
}

impl CastSample {
    /// Sample the clock for a session that started at monotonic reading
    /// `session_start`.
    pub fn take<C: Clock>(clock: &C, session_start: f64) -> Self {
        let elapsed = Duration::try_from_secs_f64(clock.now() - session_start)
            .map_or(0, |d| d.as_secs());
        let wall = clock.local_now();
        let seconds_into_hour = wall.minute().saturating_mul(60).saturating_add(wall.second());
        Self {
            real_hour: elapsed / 3600,
            game_hour: seconds_into_hour / SECONDS_PER_GAME_HOUR,
        }
    }
}

/// Append-only record of cast samples, kept as two index-aligned sequences.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CastHistory {
    #[serde(skip)]
    current: Option<CastSample>,
    real_hours: Vec<u64>,
    game_hours: Vec<u32>,
}

impl CastHistory {
    /// Create an empty history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Take a new current sample without recording it.
    pub fn update_current<C: Clock>(&mut self, clock: &C, session_start: f64) {
        self.current = Some(CastSample::take(clock, session_start));
    }

    /// The sample [`record_current`](Self::record_current) would append.
    pub const fn current(&self) -> Option<CastSample> {
        self.current
    }

    /// Append the current sample to the history.
    ///
    /// Recording the same sample twice appends it twice.
    ///
    /// # Errors
    ///
    /// Returns [`HistoryError::NoCurrentSample`] when
    /// [`update_current`](Self::update_current) has never been called.
    pub fn record_current(&mut self) -> Result<(), HistoryError> {
        let sample = self.current.ok_or(HistoryError::NoCurrentSample)?;
        self.real_hours.push(sample.real_hour);
        self.game_hours.push(sample.game_hour);
        Ok(())
    }

    /// Real hours and in-game hours of every recorded cast, in cast order.
    pub fn history(&self) -> (&[u64], &[u32]) {
        (&self.real_hours, &self.game_hours)
    }

    /// Number of recorded casts.
    pub fn len(&self) -> usize {
        self.real_hours.len()
    }

    /// Whether no cast has been recorded.
    pub fn is_empty(&self) -> bool {
        self.real_hours.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::{Local, TimeZone};

    use super::*;
    use crate::clock::ManualClock;

    fn clock_at(minute: u32, second: u32) -> ManualClock {
        let base = Local
            .with_ymd_and_hms(2024, 5, 1, 9, minute, second)
            .single()
            .unwrap();
        ManualClock::with_base(base)
    }

    #[test]
    fn record_before_update_is_an_error() {
        let mut history = CastHistory::new();
        assert_eq!(history.record_current(), Err(HistoryError::NoCurrentSample));
        assert!(history.is_empty());
    }

    #[test]
    fn game_hour_follows_wall_clock_minutes() {
        let clock = clock_at(30, 0);
        assert_eq!(CastSample::take(&clock, 0.0).game_hour, 12);

        let clock = clock_at(59, 59);
        assert_eq!(CastSample::take(&clock, 0.0).game_hour, 23);

        let clock = clock_at(2, 29);
        assert_eq!(CastSample::take(&clock, 0.0).game_hour, 0);
    }

    #[test]
    fn real_hour_counts_whole_hours_since_start() {
        let clock = clock_at(0, 0);
        clock.advance(Duration::from_secs(3599));
        assert_eq!(CastSample::take(&clock, 0.0).real_hour, 0);
        clock.advance(Duration::from_secs(1));
        assert_eq!(CastSample::take(&clock, 0.0).real_hour, 1);
        assert_eq!(CastSample::take(&clock, 3000.0).real_hour, 0);
    }

    #[test]
    fn sequences_stay_aligned() {
        let clock = clock_at(0, 0);
        let mut history = CastHistory::new();
        history.update_current(&clock, 0.0);
        for expected in 1..=3 {
            history.record_current().unwrap();
            let (real, game) = history.history();
            assert_eq!(real.len(), expected);
            assert_eq!(game.len(), expected);
            clock.advance(Duration::from_secs(3600 + 150));
            history.update_current(&clock, 0.0);
        }
        assert_eq!(history.history(), (&[0, 1, 2][..], &[0, 1, 2][..]));
    }

    #[test]
    fn update_alone_does_not_append() {
        let clock = clock_at(0, 0);
        let mut history = CastHistory::new();
        history.update_current(&clock, 0.0);
        assert!(history.current().is_some());
        assert_eq!(history.len(), 0);
    }
}
