//! Time-gated routine actions.
//!
//! Each enabled routine feature is backed by one cooldown gate. Asking which
//! actions are due consumes the gates that open, so an action reported here
//! must be performed by the caller.

use std::fmt;

use crate::clock::Clock;
use crate::config::SessionConfig;
use crate::cooldown::{CooldownGates, GateCategory};
use crate::profile::Mode;

/// A routine action whose cooldown has run out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatedAction {
    /// Drink alcohol; also refills comfort.
    DrinkAlcohol,
    /// Drink tea to refill comfort.
    DrinkTea,
    /// Swap the current lure for a random one.
    ChangeLure,
    /// Recast the spod rod.
    RecastSpodRod,
    /// Pause before the next cast.
    Pause,
}

impl GatedAction {
    /// The gate that controls this action.
    pub const fn category(self) -> GateCategory {
        match self {
            Self::DrinkAlcohol => GateCategory::Alcohol,
            Self::DrinkTea => GateCategory::Tea,
            Self::ChangeLure => GateCategory::LureChange,
            Self::RecastSpodRod => GateCategory::SpodRodRecast,
            Self::Pause => GateCategory::Pause,
        }
    }
}

impl fmt::Display for GatedAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::DrinkAlcohol => "drink alcohol",
            Self::DrinkTea => "drink tea",
            Self::ChangeLure => "change lure",
            Self::RecastSpodRod => "recast spod rod",
            Self::Pause => "pause",
        };
        f.write_str(label)
    }
}

/// Check every enabled routine gate and return the actions that are due.
///
/// Alcohol is checked before tea, so a drink that also refills comfort
/// keeps tea from opening in the same round.
pub fn due_actions<C: Clock>(config: &SessionConfig, gates: &mut CooldownGates<C>) -> Vec<GatedAction> {
    let args = &config.args;
    let lure_enabled = args.lure && config.selected_mode() == Some(Mode::Spin);
    let candidates = [
        (args.alcohol, GatedAction::DrinkAlcohol),
        (args.refill, GatedAction::DrinkTea),
        (lure_enabled, GatedAction::ChangeLure),
        (args.spod_rod, GatedAction::RecastSpodRod),
        (args.pause, GatedAction::Pause),
    ];

    candidates
        .into_iter()
        .filter(|(enabled, action)| *enabled && gates.is_open(action.category()))
        .map(|(_, action)| action)
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::clock::ManualClock;
    use crate::cooldown::CooldownDelays;
    use crate::profile::{Profile, SelectedProfile};

    fn config(mode: Mode) -> SessionConfig {
        let mut config = SessionConfig {
            selected: Some(SelectedProfile {
                name: mode.as_str().to_owned(),
                profile: Profile::template(mode),
            }),
            ..SessionConfig::default()
        };
        config.args.alcohol = true;
        config.args.refill = true;
        config.args.lure = true;
        config.args.spod_rod = true;
        config.args.pause = true;
        config
    }

    #[test]
    fn consumables_are_due_at_start_and_routines_are_not() {
        let config = config(Mode::Spin);
        let clock = ManualClock::new();
        let mut gates = CooldownGates::new(clock, CooldownDelays::from_config(&config));
        assert_eq!(due_actions(&config, &mut gates), vec![GatedAction::DrinkAlcohol]);
    }

    #[test]
    fn alcohol_suppresses_tea_in_the_same_round() {
        let config = config(Mode::Spin);
        let clock = ManualClock::new();
        let mut gates = CooldownGates::new(clock.clone(), CooldownDelays::from_config(&config));
        let _ = due_actions(&config, &mut gates);

        clock.advance(Duration::from_secs(301));
        assert_eq!(due_actions(&config, &mut gates), vec![GatedAction::DrinkTea]);
    }

    #[test]
    fn lure_change_only_in_spin_mode() {
        let clock = ManualClock::new();
        for (mode, expect_lure) in [(Mode::Spin, true), (Mode::Bottom, false)] {
            let config = config(mode);
            let mut gates = CooldownGates::new(clock.clone(), CooldownDelays::from_config(&config));
            clock.advance(Duration::from_secs(1801));
            let due = due_actions(&config, &mut gates);
            assert_eq!(due.contains(&GatedAction::ChangeLure), expect_lure, "{mode}");
            assert!(due.contains(&GatedAction::RecastSpodRod));
            assert!(due.contains(&GatedAction::Pause));
        }
    }

    #[test]
    fn disabled_features_leave_gates_alone() {
        let config = SessionConfig::default();
        let clock = ManualClock::new();
        let mut gates = CooldownGates::new(clock.clone(), CooldownDelays::from_config(&config));
        clock.advance(Duration::from_secs(10_000));
        assert!(due_actions(&config, &mut gates).is_empty());
        assert!(gates.is_tea_drinkable());
    }
}
