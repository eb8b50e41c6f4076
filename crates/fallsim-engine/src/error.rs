//! Error types for the engine binary.
//!
//! [`EngineError`] is the top-level error type that wraps all possible
//! failure modes during startup and simulation execution.

/// Top-level error for the engine binary.
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
        source: fallsim_core::ConfigError,
    },

    /// Care network construction failed.
    #[error("world error: {source}")]
    World {
        /// The underlying world error.
        #[from]
        source: fallsim_world::WorldError,
    },

    /// State store access failed.
    #[error("store error: {source}")]
    Store {
        /// The underlying store error.
        #[from]
        source: fallsim_store::StoreError,
    },
}
