//! Error types for the `fallsim-store` crate.

use fallsim_agents::AgentError;
use fallsim_types::AgentId;
use fallsim_world::WorldError;

/// Errors that can occur at the shared-state boundary.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The transaction lost a conflict with a concurrent writer and should
    /// be retried.
    #[error("transaction conflict: {context}")]
    Conflict {
        /// What was being attempted.
        context: String,
    },

    /// No patient record exists for the identifier.
    #[error("unknown patient: {0}")]
    UnknownPatient(AgentId),

    /// No carer record exists for the identifier.
    #[error("unknown carer: {0}")]
    UnknownCarer(AgentId),

    /// Retry budget exhausted without a successful transaction.
    #[error("transaction retries exhausted after {attempts} attempts")]
    RetriesExhausted {
        /// How many attempts were made.
        attempts: u32,
    },

    /// An underlying network-graph operation failed.
    #[error(transparent)]
    World(#[from] WorldError),

    /// An underlying contact-graph operation failed.
    #[error(transparent)]
    Agent(#[from] AgentError),
}
