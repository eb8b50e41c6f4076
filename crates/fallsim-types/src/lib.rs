//! Shared type definitions for the fallsim care-network simulation.
//!
//! This crate is dependency-light by design: IDs, enumerations, and plain
//! data records that every other crate in the workspace builds on.
//!
//! # Modules
//!
//! - [`ids`] -- UUID v7 newtype identifiers ([`AgentId`], [`LocationId`],
//!   [`ConnectionId`])
//! - [`enums`] -- Wellbeing states, fall severities, edge kinds, location
//!   kinds
//! - [`structs`] -- Entity records: patients, carers, locations,
//!   connections, pending-queue entries, event-log entries

pub mod enums;
pub mod ids;
pub mod structs;

pub use enums::{EdgeKind, FallSeverity, LocationKind, Wellbeing};
pub use ids::{AgentId, ConnectionId, LocationId};
pub use structs::{
    Carer, Connection, DwellRates, Location, LogEntry, Patient, PendingEntry, event_labels,
};
