//! Launch arguments for a session.
//!
//! [`SessionArgs`] is parsed once at startup from the configured launch
//! options followed by the process arguments, then merged into the session
//! configuration under the `args` namespace. It is never mutated afterward.

use clap::{CommandFactory, Parser, ValueEnum};
use serde::{Deserialize, Serialize};

/// Program name used when rendering usage text.
pub const PROGRAM_NAME: &str = "angler";

/// Boat ticket durations the game sells, in hours.
pub const BOAT_TICKET_DURATIONS: [u8; 4] = [1, 2, 3, 5];

/// Direction to move while trolling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrollingDirection {
    /// Move straight ahead.
    Forward,
    /// Steer to the left.
    Left,
    /// Steer to the right.
    Right,
}

/// What to do when a broken lure is detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LureAction {
    /// Replace the broken lure with a spare.
    Replace,
    /// Sound an alarm and wait.
    Alarm,
}

/// Command-line arguments of a session.
#[allow(clippy::struct_excessive_bools)] // One field per command-line switch.
#[derive(Parser, Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[command(
    name = PROGRAM_NAME,
    about = "Start an AFK fishing session for Russian Fishing 4",
    args_override_self = true
)]
#[serde(default)]
pub struct SessionArgs {
    /// overwrite configuration, e.g. `script.language=ru` or `stat.tea_delay 600`
    #[arg(value_name = "OPTS")]
    pub opts: Vec<String>,

    /// drink coffee if stamina is low
    #[arg(short = 'c', long)]
    pub coffee: bool,

    /// drink alcohol before keeping the fish regularly
    #[arg(short = 'A', long)]
    pub alcohol: bool,

    /// refill hunger and comfort by consuming tea and carrot
    #[arg(short = 'r', long)]
    pub refill: bool,

    /// harvest baits before casting
    #[arg(short = 'H', long)]
    pub harvest: bool,

    /// switch the gear ratio after the retrieval timed out
    #[arg(short = 'g', long)]
    pub gear_ratio: bool,

    /// enable auto friction brake
    #[arg(short = 'f', long)]
    pub friction_brake: bool,

    /// lift the tackle constantly while pulling a fish
    #[arg(short = 'l', long)]
    pub lift: bool,

    /// immediately start retrieving for the first fish
    #[arg(short = 'C', long)]
    pub skip_cast: bool,

    /// recast spod rod regularly
    #[arg(short = 'o', long)]
    pub spod_rod: bool,

    /// change current lure with a random one regularly, mode: spin
    #[arg(short = 'L', long)]
    pub lure: bool,

    /// move mouse randomly before casting the rod
    #[arg(short = 'x', long)]
    pub mouse: bool,

    /// pause the script before casting the rod regularly
    #[arg(short = 'X', long)]
    pub pause: bool,

    /// take a screenshot after casting (for fish spot)
    #[arg(short = 'b', long)]
    pub bite: bool,

    /// take a screenshot of every fish you caught
    #[arg(short = 'S', long)]
    pub screenshot: bool,

    /// send email notification after the script stop
    #[arg(short = 'e', long)]
    pub email: bool,

    /// save fishing data in the logs directory
    #[arg(short = 'P', long)]
    pub plot: bool,

    /// send miaotixing notification after the script stop
    #[arg(short = 'M', long)]
    pub miaotixing: bool,

    /// shutdown computer after the script stop
    #[arg(short = 's', long)]
    pub shutdown: bool,

    /// sign out instead of closing the game
    #[arg(long, visible_alias = "so")]
    pub signout: bool,

    /// enable groundbait refill, mode: bottom
    #[arg(long, visible_alias = "gb")]
    pub groundbait: bool,

    /// enable dry mix refill, mode: bottom
    #[arg(long, visible_alias = "dm")]
    pub dry_mix: bool,

    /// enable pva refill, mode: bottom
    #[arg(long)]
    pub pva: bool,

    /// enable electric mode for Electro Raptor series reel
    #[arg(short = 'E', long)]
    pub electro: bool,

    /// keep all captured fishes, used by default
    #[arg(short = 'a', long, conflicts_with = "marked")]
    pub all: bool,

    /// keep only the marked fishes
    #[arg(short = 'm', long)]
    pub marked: bool,

    /// use default spool icon for retrieval detection, used by default
    #[arg(short = 'd', long, conflicts_with = "rainbow_line")]
    pub default_spool: bool,

    /// use rainbow line meter for retrieval detection
    #[arg(short = 'R', long)]
    pub rainbow_line: bool,

    /// id of the profile you want to use
    #[arg(
        short = 'p',
        long,
        value_name = "PID",
        conflicts_with = "pname",
        allow_negative_numbers = true
    )]
    pub pid: Option<i64>,

    /// name of the profile you want to use
    #[arg(short = 'N', long, value_name = "PROFILE_NAME")]
    pub pname: Option<String>,

    /// number of fishes in your keepnet, 0 by default
    #[arg(
        short = 'n',
        long,
        value_name = "FISH_COUNT",
        default_value_t = 0,
        allow_negative_numbers = true
    )]
    pub fishes_in_keepnet: i64,

    /// enable boat ticket auto renewal, DURATION: 1, 2, 3 or 5 (5 if not specified)
    #[arg(
        short = 't',
        long,
        value_name = "DURATION",
        num_args = 0..=1,
        default_missing_value = "5",
        value_parser = parse_ticket_duration
    )]
    pub boat_ticket: Option<u8>,

    /// enable trolling mode, DIRECTION: forward, left or right (forward if not specified)
    #[arg(
        short = 'T',
        long,
        value_name = "DIRECTION",
        num_args = 0..=1,
        default_missing_value = "forward",
        value_enum
    )]
    pub trolling: Option<TrollingDirection>,

    /// enable broken lure auto-replace, ACTION: replace or alarm (replace if not specified)
    #[arg(
        long,
        visible_alias = "bl",
        value_name = "ACTION",
        num_args = 0..=1,
        default_missing_value = "replace",
        value_enum
    )]
    pub broken_lure: Option<LureAction>,
}

impl SessionArgs {
    /// Parse arguments from tokens that do not include the program name.
    ///
    /// When an option appears more than once, the last occurrence wins, so
    /// process arguments placed after launch options override them.
    ///
    /// # Errors
    ///
    /// Returns the `clap` error for unknown options, invalid values, or
    /// conflicting options. `--help` is also reported as an error whose kind
    /// is [`clap::error::ErrorKind::DisplayHelp`].
    pub fn parse_tokens<I>(tokens: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = String>,
    {
        Self::try_parse_from(std::iter::once(PROGRAM_NAME.to_owned()).chain(tokens))
    }

    /// Rendered usage text, shown when the user asks for help at the
    /// profile prompt.
    pub fn help_text() -> String {
        Self::command().render_help().to_string()
    }
}

fn parse_ticket_duration(raw: &str) -> Result<u8, String> {
    let hours: u8 = raw
        .parse()
        .map_err(|e| format!("'{raw}' is not a ticket duration: {e}"))?;
    if BOAT_TICKET_DURATIONS.contains(&hours) {
        Ok(hours)
    } else {
        Err(format!(
            "'{hours}' is not one of {BOAT_TICKET_DURATIONS:?} hours"
        ))
    }
}
