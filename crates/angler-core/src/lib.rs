//! Session lifecycle controller for the angler automation client.
//!
//! This crate owns everything between "the process started" and "the summary
//! was printed": configuration assembly and freezing, profile selection,
//! startup validation, the cooldown gates consulted by the automation loop,
//! and graceful cancellation and shutdown. Recognition, input injection, and
//! the game actions themselves are external collaborators reached through
//! the [`Player`] trait.
//!
//! # Modules
//!
//! - [`args`] -- Launch arguments parsed with `clap`.
//! - [`builder`] -- Layered configuration assembly and the one-way freeze.
//! - [`cancel`] -- Quit listener that cancels the running session.
//! - [`cast_history`] -- Real and in-game hour of every cast.
//! - [`clock`] -- Monotonic and wall-clock time sources.
//! - [`config`] -- The typed, frozen [`SessionConfig`].
//! - [`cooldown`] -- Cooldown gates for time-gated actions.
//! - [`environment`] -- Notification, asset, window, and feature checks.
//! - [`orchestrator`] -- Phase sequencing from startup to shutdown.
//! - [`profile`] -- Fishing modes and their typed profiles.
//! - [`prompt`] -- Interactive profile selection state machine.
//! - [`report`] -- End-of-session summary and export.
//! - [`routine`] -- Gated routine actions due in the current round.
//! - [`session`] -- The running session and its automation loop.
//! - [`validation`] -- Argument bounds and profile validation failures.
//!
//! [`Player`]: session::Player
//! [`SessionConfig`]: config::SessionConfig

pub mod args;
pub mod builder;
pub mod cancel;
pub mod cast_history;
pub mod clock;
pub mod config;
pub mod cooldown;
pub mod environment;
pub mod orchestrator;
pub mod profile;
pub mod prompt;
pub mod report;
pub mod routine;
pub mod session;
pub mod validation;
