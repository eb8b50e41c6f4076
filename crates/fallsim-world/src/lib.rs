//! Care-network graph and location runtime state for the fallsim simulation.
//!
//! This crate owns the spatial layer: the directed graph of care locations,
//! per-location occupant tracking, the pending tables of queued locations,
//! and the standard-topology bootstrap.
//!
//! # Modules
//!
//! - [`network`] -- The [`CareNetwork`] graph: locations, connections,
//!   adjacency, capacity-checked movement
//! - [`location`] -- Per-location runtime state ([`LocationState`])
//! - [`pending`] -- Time-indexed pending table for queued locations
//! - [`bootstrap`] -- Standard topology construction
//! - [`error`] -- Error types ([`WorldError`])

pub mod bootstrap;
pub mod error;
pub mod location;
pub mod network;
pub mod pending;

pub use bootstrap::{NetworkHandles, NetworkOptions, standard_network};
pub use error::WorldError;
pub use location::LocationState;
pub use network::CareNetwork;
pub use pending::PendingQueue;
