//! Interactive profile selection.
//!
//! [`ProfilePrompt`] is a small state machine, `Prompting → Resolved |
//! Exited`, fed one input line at a time. It never reads input itself, so it
//! can be driven by scripted lines in tests; [`ProfilePrompt::run`] connects
//! it to a reader and a writer for real use.

use std::io::{self, BufRead, Write};

use tracing::debug;

use crate::validation::validate_profile_id;

/// Token that redisplays the usage text.
pub const HELP_TOKEN: &str = "h";

/// Token that ends the program from the prompt.
pub const QUIT_TOKEN: &str = "q";

/// Message printed when the user quits from the prompt.
pub const FAREWELL: &str = "Bye.";

/// Message printed for input that is neither a valid id nor a token.
pub const INVALID_INPUT: &str = "Invalid profile id, please try again.";

const INSTRUCTIONS: &str = "Enter profile id to use, h to see help message, q to exit:";
const INPUT_MARKER: &str = ">>> ";

/// Where the prompt stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptState {
    /// Waiting for a line.
    Prompting,
    /// A valid profile id was entered.
    Resolved(usize),
    /// The user quit.
    Exited,
}

/// How the prompt reacted to one line of input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptReply {
    /// The line was a valid id; the prompt is resolved.
    Accepted(usize),
    /// The user asked for help; keep prompting.
    Help,
    /// The user quit; the prompt is exited.
    Quit,
    /// The line was not understood; keep prompting.
    Invalid,
}

/// State machine behind the numbered profile prompt.
#[derive(Debug, Clone)]
pub struct ProfilePrompt {
    profile_count: usize,
    state: PromptState,
}

impl ProfilePrompt {
    /// Create a prompt over a catalog of `profile_count` profiles.
    pub const fn new(profile_count: usize) -> Self {
        Self {
            profile_count,
            state: PromptState::Prompting,
        }
    }

    /// Current state.
    pub const fn state(&self) -> PromptState {
        self.state
    }

    /// Feed one line of input. Surrounding whitespace is ignored. Once the
    /// prompt has left `Prompting`, further lines repeat the final reply.
    pub fn feed(&mut self, line: &str) -> PromptReply {
        match self.state {
            PromptState::Resolved(id) => return PromptReply::Accepted(id),
            PromptState::Exited => return PromptReply::Quit,
            PromptState::Prompting => {}
        }

        let line = line.trim();
        if let Ok(id) = validate_profile_id(line, self.profile_count) {
            self.state = PromptState::Resolved(id);
            return PromptReply::Accepted(id);
        }
        match line {
            QUIT_TOKEN => {
                self.state = PromptState::Exited;
                PromptReply::Quit
            }
            HELP_TOKEN => PromptReply::Help,
            _ => {
                debug!(input = line, "Rejected profile prompt input");
                PromptReply::Invalid
            }
        }
    }

    /// Drive the prompt from `input` until it resolves or exits.
    ///
    /// Writes the numbered profile table, the instructions, and every reply
    /// to `output`. End of input counts as quitting.
    pub fn run<R, W>(
        mut self,
        names: &[&str],
        help: &str,
        input: &mut R,
        output: &mut W,
    ) -> io::Result<PromptState>
    where
        R: BufRead,
        W: Write,
    {
        write_profile_table(names, output)?;
        writeln!(output, "{INSTRUCTIONS}")?;

        let mut line = String::new();
        loop {
            write!(output, "{INPUT_MARKER}")?;
            output.flush()?;
            line.clear();
            let reply = if input.read_line(&mut line)? == 0 {
                self.feed(QUIT_TOKEN)
            } else {
                self.feed(&line)
            };
            match reply {
                PromptReply::Accepted(_) => break,
                PromptReply::Quit => {
                    writeln!(output, "{FAREWELL}")?;
                    break;
                }
                PromptReply::Help => writeln!(output, "{help}")?,
                PromptReply::Invalid => writeln!(output, "{INVALID_INPUT}")?,
            }
        }
        Ok(self.state)
    }
}

/// Write the numbered list of profile names.
pub fn write_profile_table<W: Write>(names: &[&str], output: &mut W) -> io::Result<()> {
    writeln!(output, "Select a profile to start")?;
    for (id, name) in names.iter().enumerate() {
        writeln!(output, "{id:>2}. {name}")?;
    }
    Ok(())
}
