//! Error types for the Hamlet engine binary.
//!
//! [`EngineError`] is the top-level error type that wraps all possible
//! failure modes during engine startup and the frame loop.

/// Top-level error for the Hamlet engine binary.
///
/// Each variant wraps a specific subsystem error, providing a single
/// error type that `main` can propagate with `?`.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: hamlet_core::ConfigError,
    },

    /// The game rejected a command or an economy operation failed.
    #[error("game error: {source}")]
    Game {
        /// The underlying game error.
        #[from]
        source: hamlet_core::GameError,
    },

    /// Building the road network failed.
    #[error("world error: {source}")]
    World {
        /// The underlying world error.
        #[from]
        source: hamlet_world::WorldError,
    },

    /// The run summary could not be encoded.
    #[error("summary error: {source}")]
    Summary {
        /// The underlying JSON error.
        #[from]
        source: serde_json::Error,
    },

    /// The demo map has no room for this many settlements.
    #[error("scenario error: {message}")]
    Scenario {
        /// Description of the failure.
        message: String,
    },
}
