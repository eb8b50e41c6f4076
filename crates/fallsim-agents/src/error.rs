//! Error types for the `fallsim-agents` crate.

use fallsim_types::AgentId;

/// Errors that can occur during agent-level operations.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    /// An agent was not found in the contact graph.
    #[error("agent not found in contact graph: {0}")]
    UnknownAgent(AgentId),

    /// A contact link references an agent that is not a carer.
    #[error("agent {0} is not a carer")]
    NotACarer(AgentId),

    /// Arithmetic overflow during a checked operation.
    #[error("arithmetic overflow: {context}")]
    ArithmeticOverflow {
        /// What was being computed.
        context: String,
    },
}
