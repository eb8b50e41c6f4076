//! Error types for the `fallsim-world` crate.
//!
//! All fallible operations in this crate return [`WorldError`] through the
//! standard [`Result`] type alias.

use fallsim_types::{AgentId, ConnectionId, LocationId};

/// Errors that can occur during care-network operations.
#[derive(Debug, thiserror::Error)]
pub enum WorldError {
    /// A location was not found in the network.
    #[error("location not found: {0}")]
    LocationNotFound(LocationId),

    /// A connection was not found in the network.
    #[error("connection not found: {0}")]
    ConnectionNotFound(ConnectionId),

    /// The location has reached its maximum occupant capacity.
    #[error("location {location} is at capacity ({capacity})")]
    LocationAtCapacity {
        /// The full location.
        location: LocationId,
        /// Maximum capacity.
        capacity: u32,
    },

    /// The agent is not present at the specified location.
    #[error("agent {agent} is not at location {location}")]
    AgentNotAtLocation {
        /// The agent.
        agent: AgentId,
        /// The location.
        location: LocationId,
    },

    /// A duplicate location was inserted where uniqueness is required.
    #[error("duplicate location id: {0}")]
    DuplicateLocation(LocationId),

    /// A duplicate connection was inserted where uniqueness is required.
    #[error("duplicate connection id: {0}")]
    DuplicateConnection(ConnectionId),

    /// Arithmetic overflow during a checked operation.
    #[error("arithmetic overflow in network calculation")]
    ArithmeticOverflow,
}
