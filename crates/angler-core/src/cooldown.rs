//! Cooldown gates for time-gated session actions.
//!
//! A gate permits an action only after a configured minimum interval has
//! elapsed since it last fired. Checking a gate and re-arming it is one step:
//! [`CooldownGates::is_open`] returns `true` only if it has already moved the
//! gate's last-fired timestamp to "now".
//!
//! # Arming policy
//!
//! - Consumable gates ([`GateCategory::Tea`], [`GateCategory::Alcohol`]) start
//!   unfired and open on their first check.
//! - Routine gates ([`GateCategory::LureChange`],
//!   [`GateCategory::SpodRodRecast`], [`GateCategory::Pause`]) start armed at
//!   session start and open only after one full interval.
//!
//! Opening the alcohol gate also re-arms the tea gate, because drinking
//! alcohol refills comfort in the game.

use std::fmt;

use tracing::debug;

use crate::clock::Clock;
use crate::config::SessionConfig;

/// The named categories of time-gated actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum GateCategory {
    /// Drinking tea to refill comfort.
    Tea,
    /// Drinking alcohol, which also refills comfort.
    Alcohol,
    /// Swapping the current lure for another one.
    LureChange,
    /// Recasting the spod rod.
    SpodRodRecast,
    /// Pausing the script.
    Pause,
}

impl GateCategory {
    /// Every category, in declaration order.
    pub const ALL: [Self; 5] = [
        Self::Tea,
        Self::Alcohol,
        Self::LureChange,
        Self::SpodRodRecast,
        Self::Pause,
    ];

    /// Whether the gate is eligible immediately rather than one full
    /// interval after session start.
    pub const fn opens_immediately(self) -> bool {
        matches!(self, Self::Tea | Self::Alcohol)
    }
}

impl fmt::Display for GateCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Tea => "tea",
            Self::Alcohol => "alcohol",
            Self::LureChange => "lure_change",
            Self::SpodRodRecast => "spod_rod_recast",
            Self::Pause => "pause",
        };
        f.write_str(name)
    }
}

/// Minimum interval, in seconds, between two openings of each gate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CooldownDelays {
    /// Interval for [`GateCategory::Tea`].
    pub tea: f64,
    /// Interval for [`GateCategory::Alcohol`].
    pub alcohol: f64,
    /// Interval for [`GateCategory::LureChange`].
    pub lure_change: f64,
    /// Interval for [`GateCategory::SpodRodRecast`].
    pub spod_rod_recast: f64,
    /// Interval for [`GateCategory::Pause`].
    pub pause: f64,
}

impl CooldownDelays {
    /// Read the per-category delays from a session configuration.
    pub const fn from_config(config: &SessionConfig) -> Self {
        Self {
            tea: config.stat.tea_delay,
            alcohol: config.stat.alcohol_delay,
            lure_change: config.script.lure_change_delay,
            spod_rod_recast: config.script.spod_rod_recast_delay,
            pause: config.pause.delay,
        }
    }

    /// The delay configured for `category`.
    pub const fn get(&self, category: GateCategory) -> f64 {
        match category {
            GateCategory::Tea => self.tea,
            GateCategory::Alcohol => self.alcohol,
            GateCategory::LureChange => self.lure_change,
            GateCategory::SpodRodRecast => self.spod_rod_recast,
            GateCategory::Pause => self.pause,
        }
    }
}

/// Last-fired timestamp of every gate. `None` means never fired.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct LastFired {
    tea: Option<f64>,
    alcohol: Option<f64>,
    lure_change: Option<f64>,
    spod_rod_recast: Option<f64>,
    pause: Option<f64>,
}

impl LastFired {
    const fn slot(&self, category: GateCategory) -> Option<f64> {
        match category {
            GateCategory::Tea => self.tea,
            GateCategory::Alcohol => self.alcohol,
            GateCategory::LureChange => self.lure_change,
            GateCategory::SpodRodRecast => self.spod_rod_recast,
            GateCategory::Pause => self.pause,
        }
    }

    const fn slot_mut(&mut self, category: GateCategory) -> &mut Option<f64> {
        match category {
            GateCategory::Tea => &mut self.tea,
            GateCategory::Alcohol => &mut self.alcohol,
            GateCategory::LureChange => &mut self.lure_change,
            GateCategory::SpodRodRecast => &mut self.spod_rod_recast,
            GateCategory::Pause => &mut self.pause,
        }
    }

    /// Move a gate's timestamp forward to `at`. Never moves it backward.
    fn arm(&mut self, category: GateCategory, at: f64) {
        let slot = self.slot_mut(category);
        *slot = Some(slot.map_or(at, |previous| previous.max(at)));
    }
}

/// The cooldown gate service owned by a running session.
#[derive(Debug, Clone)]
pub struct CooldownGates<C> {
    clock: C,
    delays: CooldownDelays,
    last_fired: LastFired,
}

impl<C: Clock> CooldownGates<C> {
    /// Create the gates, arming the routine categories at the clock's
    /// current reading.
    pub fn new(clock: C, delays: CooldownDelays) -> Self {
        let started = clock.now();
        let mut last_fired = LastFired::default();
        for category in GateCategory::ALL {
            if !category.opens_immediately() {
                last_fired.arm(category, started);
            }
        }
        Self {
            clock,
            delays,
            last_fired,
        }
    }

    /// Check whether `category` is open and, if it is, re-arm it.
    ///
    /// Returns `true` iff more than the configured delay has elapsed since
    /// the gate last fired (or it has never fired). A `false` result leaves
    /// all state untouched.
    pub fn is_open(&mut self, category: GateCategory) -> bool {
        let now = self.clock.now();
        let open = self
            .last_fired
            .slot(category)
            .is_none_or(|fired| now - fired > self.delays.get(category));
        if !open {
            return false;
        }

        self.last_fired.arm(category, now);
        if category == GateCategory::Alcohol {
            self.last_fired.arm(GateCategory::Tea, now);
        }
        debug!(gate = %category, at = now, "cooldown gate opened");
        true
    }

    /// Seconds since `category` last fired, or `None` if it never fired.
    pub fn elapsed_since(&self, category: GateCategory) -> Option<f64> {
        self.last_fired
            .slot(category)
            .map(|fired| self.clock.now() - fired)
    }

    /// Whether tea may be drunk now. Re-arms the tea gate on success.
    pub fn is_tea_drinkable(&mut self) -> bool {
        self.is_open(GateCategory::Tea)
    }

    /// Whether alcohol may be drunk now. Re-arms the alcohol and tea gates on
    /// success.
    pub fn is_alcohol_drinkable(&mut self) -> bool {
        self.is_open(GateCategory::Alcohol)
    }

    /// Whether the lure may be changed now.
    pub fn is_lure_changeable(&mut self) -> bool {
        self.is_open(GateCategory::LureChange)
    }

    /// Whether the spod rod may be recast now.
    pub fn is_spod_rod_castable(&mut self) -> bool {
        self.is_open(GateCategory::SpodRodRecast)
    }

    /// Whether the script may pause now.
    pub fn is_script_pausable(&mut self) -> bool {
        self.is_open(GateCategory::Pause)
    }

    /// The configured delays.
    pub const fn delays(&self) -> &CooldownDelays {
        &self.delays
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::clock::ManualClock;

    fn delays() -> CooldownDelays {
        CooldownDelays {
            tea: 300.0,
            alcohol: 900.0,
            lure_change: 1800.0,
            spod_rod_recast: 600.0,
            pause: 3600.0,
        }
    }

    fn gates() -> (ManualClock, CooldownGates<ManualClock>) {
        let clock = ManualClock::new();
        let gates = CooldownGates::new(clock.clone(), delays());
        (clock, gates)
    }

    #[test]
    fn tea_opens_after_delay_and_rearms() {
        let (clock, mut gates) = gates();
        assert!(gates.is_tea_drinkable());

        clock.advance(Duration::from_secs(301));
        assert!(gates.is_tea_drinkable());

        clock.advance(Duration::from_millis(500));
        assert!(!gates.is_tea_drinkable());
    }

    #[test]
    fn unfired_tea_gate_opens_at_three_hundred_and_one_seconds() {
        let (clock, mut gates) = gates();
        clock.advance(Duration::from_secs(301));
        assert!(gates.is_tea_drinkable());
        clock.advance(Duration::from_millis(500));
        assert!(!gates.is_tea_drinkable());
    }

    #[test]
    fn second_check_at_same_instant_is_closed() {
        let (_clock, mut gates) = gates();
        for category in [GateCategory::Tea, GateCategory::Alcohol] {
            assert!(gates.is_open(category));
            assert!(!gates.is_open(category));
        }
    }

    #[test]
    fn elapsed_equal_to_delay_is_still_closed() {
        let (clock, mut gates) = gates();
        assert!(gates.is_tea_drinkable());
        clock.advance(Duration::from_secs(300));
        assert!(!gates.is_tea_drinkable());
        clock.advance(Duration::from_millis(1));
        assert!(gates.is_tea_drinkable());
    }

    #[test]
    fn routine_gates_wait_one_full_interval() {
        let (clock, mut gates) = gates();
        assert!(!gates.is_lure_changeable());
        assert!(!gates.is_spod_rod_castable());
        assert!(!gates.is_script_pausable());

        clock.advance(Duration::from_secs(601));
        assert!(gates.is_spod_rod_castable());
        assert!(!gates.is_lure_changeable());

        clock.advance(Duration::from_secs(1200));
        assert!(gates.is_lure_changeable());
        assert!(!gates.is_script_pausable());

        clock.advance(Duration::from_secs(1800));
        assert!(gates.is_script_pausable());
    }

    #[test]
    fn closed_check_leaves_state_untouched() {
        let (clock, mut gates) = gates();
        clock.advance(Duration::from_secs(100));
        let before = gates.elapsed_since(GateCategory::LureChange).unwrap();
        assert!(!gates.is_lure_changeable());
        let after = gates.elapsed_since(GateCategory::LureChange).unwrap();
        assert!((before - after).abs() < 1e-9);
    }

    #[test]
    fn alcohol_rearms_tea_to_same_instant() {
        let (clock, mut gates) = gates();
        assert!(gates.is_tea_drinkable());

        clock.advance(Duration::from_secs(400));
        assert!(gates.is_alcohol_drinkable());
        let tea = gates.elapsed_since(GateCategory::Tea).unwrap();
        let alcohol = gates.elapsed_since(GateCategory::Alcohol).unwrap();
        assert!((tea - alcohol).abs() < 1e-9);

        // Tea would have been due at 400s, but alcohol just refilled comfort.
        assert!(!gates.is_tea_drinkable());
        clock.advance(Duration::from_secs(301));
        assert!(gates.is_tea_drinkable());
    }

    #[test]
    fn tea_does_not_rearm_alcohol() {
        let (_clock, mut gates) = gates();
        assert!(gates.is_tea_drinkable());
        assert!(gates.elapsed_since(GateCategory::Alcohol).is_none());
        assert!(gates.is_alcohol_drinkable());
    }

    #[test]
    fn every_delay_is_a_strict_lower_bound() {
        for category in GateCategory::ALL {
            let (clock, mut gates) = gates();
            // Fire once so every category starts from a known timestamp.
            clock.advance(Duration::from_secs(10_000));
            assert!(gates.is_open(category));

            clock.advance(Duration::from_secs_f64(gates.delays().get(category)));
            assert!(!gates.is_open(category), "{category} opened at its delay");
            clock.advance(Duration::from_millis(1));
            assert!(gates.is_open(category), "{category} stayed closed");
        }
    }

    #[test]
    fn delays_follow_config() {
        let config = SessionConfig::default();
        let delays = CooldownDelays::from_config(&config);
        assert!((delays.tea - config.stat.tea_delay).abs() < f64::EPSILON);
        assert!((delays.pause - config.pause.delay).abs() < f64::EPSILON);
    }
}
