//! The running session and its automation loop.
//!
//! A [`SessionContext`] owns everything that lives only while a session
//! runs: the cooldown gates, the cast history, and the start time. The
//! frozen configuration is shared with it, never copied into a writable form.
//!
//! [`drive`] repeatedly asks a [`Player`] for one step and waits between
//! steps, checking the cancellation token at every iteration boundary and
//! during every wait.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::cast_history::{CastHistory, HistoryError};
use crate::clock::{Clock, format_running_time};
use crate::config::SessionConfig;
use crate::cooldown::{CooldownDelays, CooldownGates};
use crate::routine::{self, GatedAction};

/// Stop reason shown when the user cancels the session.
pub const CANCELLED_REASON: &str = "Terminated by user";

/// Outcome of one automation step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Keep going after waiting `wait`.
    Continue {
        /// Time to wait before the next step.
        wait: Duration,
    },
    /// The automation ended on its own.
    Finished {
        /// Why the automation ended.
        reason: String,
    },
}

/// Why a session stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EndReason {
    /// The user asked the session to stop.
    Cancelled,
    /// The automation finished on its own.
    Completed(String),
    /// An automation step failed.
    Failed(String),
}

impl EndReason {
    /// Whether the session ended without an automation failure.
    pub const fn is_success(&self) -> bool {
        !matches!(self, Self::Failed(_))
    }
}

impl fmt::Display for EndReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cancelled => f.write_str(CANCELLED_REASON),
            Self::Completed(reason) => f.write_str(reason),
            Self::Failed(reason) => write!(f, "Failed: {reason}"),
        }
    }
}

/// Errors raised by an automation step.
#[derive(Debug, thiserror::Error)]
pub enum PlayerError {
    /// An in-game action could not be carried out.
    #[error("action '{action}' failed: {reason}")]
    Action {
        /// The action that failed.
        action: String,
        /// What went wrong.
        reason: String,
    },

    /// A cast could not be recorded.
    #[error("cast history error: {source}")]
    History {
        /// The underlying history error.
        #[from]
        source: HistoryError,
    },
}

/// The automation collaborator driven by a session.
pub trait Player<C: Clock> {
    /// Perform one step of automation.
    fn step(&mut self, ctx: &mut SessionContext<C>) -> Result<Step, PlayerError>;
}

/// State owned by a running session.
#[derive(Debug)]
pub struct SessionContext<C> {
    config: Arc<SessionConfig>,
    clock: C,
    start: f64,
    started_at: String,
    gates: CooldownGates<C>,
    history: CastHistory,
}

impl<C: Clock + Clone> SessionContext<C> {
    /// Start a session at the clock's current reading.
    pub fn new(config: Arc<SessionConfig>, clock: C) -> Self {
        let gates = CooldownGates::new(clock.clone(), CooldownDelays::from_config(&config));
        Self {
            start: clock.now(),
            started_at: clock.display_now(),
            config,
            clock,
            gates,
            history: CastHistory::new(),
        }
    }
}

impl<C: Clock> SessionContext<C> {
    /// The frozen configuration.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// The session clock.
    pub const fn clock(&self) -> &C {
        &self.clock
    }

    /// The cooldown gates, for actions outside the routine set.
    pub const fn gates_mut(&mut self) -> &mut CooldownGates<C> {
        &mut self.gates
    }

    /// The cast history.
    pub const fn history(&self) -> &CastHistory {
        &self.history
    }

    /// Sample the hours of the cast in progress.
    pub fn note_cast(&mut self) {
        self.history.update_current(&self.clock, self.start);
    }

    /// Record the most recently noted cast.
    pub fn record_cast(&mut self) -> Result<(), HistoryError> {
        self.history.record_current()
    }

    /// Routine actions that are due now. Opens and re-arms their gates.
    pub fn due_actions(&mut self) -> Vec<GatedAction> {
        routine::due_actions(&self.config, &mut self.gates)
    }

    /// Seconds since the session started.
    pub fn elapsed(&self) -> f64 {
        self.clock.now() - self.start
    }

    /// Time since the session started, as `H:MM:SS`.
    pub fn running_time(&self) -> String {
        format_running_time(self.elapsed())
    }

    /// Local start time, as `MM/DD HH:MM:SS`.
    pub fn started_at(&self) -> &str {
        &self.started_at
    }
}

/// Drive `player` until it finishes, fails, or `cancel` fires.
pub async fn drive<C: Clock>(
    ctx: &mut SessionContext<C>,
    player: &mut dyn Player<C>,
    cancel: &CancellationToken,
) -> EndReason {
    let mut steps: u64 = 0;

    loop {
        // --- Check cancellation (before step) ---
        if cancel.is_cancelled() {
            info!(steps, "Cancellation requested");
            return EndReason::Cancelled;
        }

        // --- Execute step ---
        let wait = match player.step(ctx) {
            Ok(Step::Continue { wait }) => wait,
            Ok(Step::Finished { reason }) => {
                info!(steps, reason = %reason, "Automation finished");
                return EndReason::Completed(reason);
            }
            Err(e) => {
                error!(steps, error = %e, "Automation step failed");
                return EndReason::Failed(e.to_string());
            }
        };
        steps = steps.saturating_add(1);

        // --- Wait for the next step ---
        tokio::select! {
            biased;
            () = cancel.cancelled() => {
                info!(steps, "Cancellation requested");
                return EndReason::Cancelled;
            }
            () = tokio::time::sleep(wait) => {}
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    /// Casts every second and finishes after a fixed number of casts.
    struct CountingPlayer {
        casts: usize,
        limit: usize,
    }

    impl Player<ManualClock> for CountingPlayer {
        fn step(&mut self, ctx: &mut SessionContext<ManualClock>) -> Result<Step, PlayerError> {
            ctx.note_cast();
            ctx.record_cast()?;
            self.casts = self.casts.saturating_add(1);
            ctx.clock().advance(Duration::from_secs(1));
            if self.casts >= self.limit {
                return Ok(Step::Finished {
                    reason: "Keepnet is full".to_owned(),
                });
            }
            Ok(Step::Continue {
                wait: Duration::from_secs(1),
            })
        }
    }

    struct FailingPlayer;

    impl Player<ManualClock> for FailingPlayer {
        fn step(&mut self, ctx: &mut SessionContext<ManualClock>) -> Result<Step, PlayerError> {
            ctx.record_cast()?;
            Ok(Step::Continue {
                wait: Duration::ZERO,
            })
        }
    }

    fn context() -> SessionContext<ManualClock> {
        SessionContext::new(Arc::new(SessionConfig::default()), ManualClock::new())
    }

    #[tokio::test(start_paused = true)]
    async fn finished_player_completes_the_session() {
        let mut ctx = context();
        let mut player = CountingPlayer { casts: 0, limit: 3 };
        let reason = drive(&mut ctx, &mut player, &CancellationToken::new()).await;
        assert_eq!(reason, EndReason::Completed("Keepnet is full".to_owned()));
        assert_eq!(ctx.history().len(), 3);
        assert_eq!(ctx.running_time(), "0:00:03");
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_before_start_runs_no_step() {
        let mut ctx = context();
        let mut player = CountingPlayer { casts: 0, limit: 3 };
        let cancel = CancellationToken::new();
        cancel.cancel();
        assert_eq!(drive(&mut ctx, &mut player, &cancel).await, EndReason::Cancelled);
        assert!(ctx.history().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_interrupts_the_wait() {
        let mut ctx = context();
        let mut player = CountingPlayer {
            casts: 0,
            limit: usize::MAX,
        };
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(2500)).await;
            trigger.cancel();
        });
        let reason = drive(&mut ctx, &mut player, &cancel).await;
        assert_eq!(reason, EndReason::Cancelled);
        assert_eq!(ctx.history().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn failing_step_ends_the_session() {
        let mut ctx = context();
        let reason = drive(&mut ctx, &mut FailingPlayer, &CancellationToken::new()).await;
        assert!(matches!(reason, EndReason::Failed(_)));
        assert!(!reason.is_success());
    }

    #[test]
    fn end_reason_text() {
        assert_eq!(EndReason::Cancelled.to_string(), CANCELLED_REASON);
        assert_eq!(EndReason::Completed("Done".to_owned()).to_string(), "Done");
    }
}
