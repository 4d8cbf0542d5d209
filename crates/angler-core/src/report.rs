//! End-of-session summary and data export.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::clock::Clock;
use crate::session::{EndReason, SessionContext};

/// Errors that can occur while exporting a session report.
#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    /// Failed to create the export directory or write the file.
    #[error("failed to write report {}: {source}", path.display())]
    Io {
        /// The path being written.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Failed to serialize the report.
    #[error("failed to serialize report: {source}")]
    Json {
        /// The underlying serialization error.
        #[from]
        source: serde_json::Error,
    },
}

/// Summary of a finished session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionReport {
    /// Why the session stopped.
    pub reason: String,
    /// Whether the session ended without an automation failure.
    pub success: bool,
    /// Local start time, `MM/DD HH:MM:SS`.
    pub started_at: String,
    /// Local end time, `MM/DD HH:MM:SS`.
    pub ended_at: String,
    /// Elapsed time, `H:MM:SS`.
    pub running_time: String,
    /// Number of recorded casts.
    pub casts: usize,
    /// Real hour of every recorded cast.
    pub real_hours: Vec<u64>,
    /// In-game hour of every recorded cast.
    pub game_hours: Vec<u32>,
    /// End time as used in file names, `YYYY-MM-DD--HH-MM-SS`.
    #[serde(skip)]
    pub file_stamp: String,
}

impl SessionReport {
    /// Build the report from a session that just ended.
    pub fn new<C: Clock>(ctx: &SessionContext<C>, reason: &EndReason) -> Self {
        let (real_hours, game_hours) = ctx.history().history();
        Self {
            reason: reason.to_string(),
            success: reason.is_success(),
            started_at: ctx.started_at().to_owned(),
            ended_at: ctx.clock().display_now(),
            running_time: ctx.running_time(),
            casts: ctx.history().len(),
            real_hours: real_hours.to_vec(),
            game_hours: game_hours.to_vec(),
            file_stamp: ctx.clock().file_stamp(),
        }
    }

    /// Render the summary table shown when the session ends.
    pub fn render(&self) -> String {
        self.to_string()
    }

    /// Write the report as JSON to `<dir>/<file_stamp>.json`, creating the
    /// directory if needed.
    pub fn export(&self, dir: &Path) -> Result<PathBuf, ReportError> {
        std::fs::create_dir_all(dir).map_err(|source| ReportError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        let path = dir.join(format!("{}.json", self.file_stamp));
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(&path, json).map_err(|source| ReportError::Io {
            path: path.clone(),
            source,
        })?;
        Ok(path)
    }
}

impl fmt::Display for SessionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Running Results")?;
        for (label, value) in [
            ("Stop reason", self.reason.as_str()),
            ("Start time", self.started_at.as_str()),
            ("End time", self.ended_at.as_str()),
            ("Running time", self.running_time.as_str()),
        ] {
            writeln!(f, "  {label:<14}{value}")?;
        }
        writeln!(f, "  {:<14}{}", "Casts", self.casts)
    }
}
