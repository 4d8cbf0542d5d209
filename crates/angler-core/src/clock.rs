//! Time sources for an automation session.
//!
//! Every time-gated decision in a session reads the same [`Clock`]. A clock
//! reports two views of "now":
//!
//! - a monotonic reading in fractional seconds, used for cooldown and
//!   elapsed-time arithmetic, and
//! - a local wall-clock date and time, used for display and file naming.
//!
//! [`SystemClock`] is the production source. [`ManualClock`] only moves when
//! told to, which lets cooldown behavior be pinned to exact instants.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use chrono::{DateTime, Local, TimeDelta, Utc};

/// Display format for run start and current time (`MM/DD HH:MM:SS`).
pub const DISPLAY_FORMAT: &str = "%m/%d %H:%M:%S";

/// Format used when a timestamp becomes part of a file name.
pub const FILE_STAMP_FORMAT: &str = "%Y-%m-%d--%H-%M-%S";

/// A source of session time.
pub trait Clock {
    /// Monotonic seconds since the clock's own origin.
    ///
    /// Successive readings never decrease.
    fn now(&self) -> f64;

    /// Local wall-clock date and time.
    fn local_now(&self) -> DateTime<Local>;

    /// Current local time rendered as `MM/DD HH:MM:SS`.
    fn display_now(&self) -> String {
        self.local_now().format(DISPLAY_FORMAT).to_string()
    }

    /// Current local time rendered as `YYYY-MM-DD--HH-MM-SS`.
    fn file_stamp(&self) -> String {
        self.local_now().format(FILE_STAMP_FORMAT).to_string()
    }
}

/// Production clock backed by [`Instant`] and the system local time.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    /// Create a clock whose monotonic origin is the moment of construction.
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> f64 {
        self.origin.elapsed().as_secs_f64()
    }

    fn local_now(&self) -> DateTime<Local> {
        Local::now()
    }
}

/// A clock that advances only when [`advance`](Self::advance) is called.
///
/// Clones share the same reading, so a test can hold one handle while the
/// code under test owns another.
#[derive(Debug, Clone)]
pub struct ManualClock {
    /// Milliseconds elapsed since the origin.
    elapsed_ms: Arc<AtomicU64>,

    /// Wall-clock time at the origin.
    base: DateTime<Local>,
}

impl ManualClock {
    /// Create a manual clock at reading `0.0` whose wall clock starts at the
    /// Unix epoch.
    pub fn new() -> Self {
        Self::with_base(DateTime::<Utc>::UNIX_EPOCH.with_timezone(&Local))
    }

    /// Create a manual clock at reading `0.0` whose wall clock starts at
    /// `base`.
    pub fn with_base(base: DateTime<Local>) -> Self {
        Self {
            elapsed_ms: Arc::new(AtomicU64::new(0)),
            base,
        }
    }

    /// Move the clock forward by `step`, at millisecond resolution.
    pub fn advance(&self, step: Duration) {
        let step_ms = u64::try_from(step.as_millis()).unwrap_or(u64::MAX);
        // fetch_update only fails when the closure returns None, which it never does.
        let _ = self
            .elapsed_ms
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |ms| {
                Some(ms.saturating_add(step_ms))
            });
    }

    fn elapsed(&self) -> Duration {
        Duration::from_millis(self.elapsed_ms.load(Ordering::Acquire))
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> f64 {
        self.elapsed().as_secs_f64()
    }

    fn local_now(&self) -> DateTime<Local> {
        TimeDelta::from_std(self.elapsed())
            .ok()
            .and_then(|delta| self.base.checked_add_signed(delta))
            .unwrap_or(self.base)
    }
}

/// Render an elapsed number of seconds as `H:MM:SS`, truncated to whole
/// seconds. Hours are not wrapped into days.
pub fn format_running_time(elapsed_secs: f64) -> String {
    let total = Duration::try_from_secs_f64(elapsed_secs).map_or(0, |d| d.as_secs());
    let hours = total / 3600;
    let minutes = total % 3600 / 60;
    let seconds = total % 60;
    format!("{hours}:{minutes:02}:{seconds:02}")
}
