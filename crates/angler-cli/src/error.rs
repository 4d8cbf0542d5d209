//! Error types for the angler binary.
//!
//! [`AppError`] wraps every failure `main` can propagate with `?`.

/// Top-level error for the angler binary.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// The configuration file could not be loaded.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: angler_core::config::ConfigError,
    },

    /// Startup stopped before the session could run.
    #[error("startup error: {source}")]
    Startup {
        /// The underlying startup error.
        #[from]
        source: angler_core::orchestrator::StartupError,
    },

    /// The async runtime could not be built.
    #[error("runtime error: {source}")]
    Runtime {
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The session report could not be written.
    #[error("report error: {source}")]
    Report {
        /// The underlying report error.
        #[from]
        source: angler_core::report::ReportError,
    },
}
