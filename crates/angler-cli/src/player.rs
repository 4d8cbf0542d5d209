//! Dry-run automation player.
//!
//! Recognition and input injection are not part of this binary, so the
//! player here only walks the session through its timing: it performs no
//! in-game action, logs the routine actions that come due, and records one
//! cast per cycle.

use std::time::Duration;

use angler_core::clock::Clock;
use angler_core::routine::GatedAction;
use angler_core::session::{Player, PlayerError, SessionContext, Step};
use tracing::info;

/// Default time between two casts.
pub const DEFAULT_CAST_CYCLE: Duration = Duration::from_secs(15);

/// A player that records casts on a fixed cycle without touching the game.
#[derive(Debug, Clone)]
pub struct DryRunPlayer {
    cast_cycle: Duration,
    casts: u64,
}

impl DryRunPlayer {
    /// Create a player that casts every `cast_cycle`.
    pub const fn new(cast_cycle: Duration) -> Self {
        Self {
            cast_cycle,
            casts: 0,
        }
    }

    /// Number of casts performed so far.
    pub const fn casts(&self) -> u64 {
        self.casts
    }
}

impl Default for DryRunPlayer {
    fn default() -> Self {
        Self::new(DEFAULT_CAST_CYCLE)
    }
}

impl<C: Clock> Player<C> for DryRunPlayer {
    fn step(&mut self, ctx: &mut SessionContext<C>) -> Result<Step, PlayerError> {
        let mut wait = self.cast_cycle;
        for action in ctx.due_actions() {
            info!(action = %action, "Routine action due");
            if action == GatedAction::Pause {
                let pause = Duration::try_from_secs_f64(ctx.config().pause.duration)
                    .unwrap_or(Duration::ZERO);
                info!(seconds = pause.as_secs(), "Pausing before the next cast");
                wait = wait.saturating_add(pause);
            }
        }

        ctx.note_cast();
        ctx.record_cast()?;
        self.casts = self.casts.saturating_add(1);
        info!(
            cast = self.casts,
            running_time = %ctx.running_time(),
            "Cast recorded"
        );

        Ok(Step::Continue { wait })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use angler_core::clock::ManualClock;
    use angler_core::config::SessionConfig;

    use super::*;

    fn context(config: SessionConfig) -> (ManualClock, SessionContext<ManualClock>) {
        let clock = ManualClock::new();
        let ctx = SessionContext::new(Arc::new(config), clock.clone());
        (clock, ctx)
    }

    #[test]
    fn every_step_records_one_cast() {
        let (_clock, mut ctx) = context(SessionConfig::default());
        let mut player = DryRunPlayer::default();
        for _ in 0..3 {
            let step = player.step(&mut ctx).unwrap();
            assert_eq!(
                step,
                Step::Continue {
                    wait: DEFAULT_CAST_CYCLE
                }
            );
        }
        assert_eq!(player.casts(), 3);
        assert_eq!(ctx.history().len(), 3);
    }

    #[test]
    fn due_pause_lengthens_the_wait() {
        let mut config = SessionConfig::default();
        config.args.pause = true;
        let (clock, mut ctx) = context(config);
        let mut player = DryRunPlayer::new(Duration::from_secs(10));

        assert_eq!(
            player.step(&mut ctx).unwrap(),
            Step::Continue {
                wait: Duration::from_secs(10)
            }
        );

        clock.advance(Duration::from_secs(1801));
        assert_eq!(
            player.step(&mut ctx).unwrap(),
            Step::Continue {
                wait: Duration::from_secs(610)
            }
        );
    }
}
