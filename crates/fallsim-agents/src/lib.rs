//! Agent-level logic for the fallsim care-network simulation.
//!
//! This crate contains the logic layer for agents -- everything that
//! operates on agent state without touching the store or the network
//! graph. It sits between `fallsim-types` (which defines the data
//! structures) and the core/engine crates (which handle orchestration).
//!
//! # Modules
//!
//! - [`contacts`] -- Contact graph over patients and carers ([`ContactGraph`])
//! - [`error`] -- Error types for agent operations ([`AgentError`])
//! - [`inclination`] -- Post-move reinforcement of choice weights
//! - [`population`] -- Initial cohort generation
//! - [`rng`] -- Seeded sampling: gaussian jitter, Poisson, weighted draws
//! - [`wellbeing`] -- The wellbeing state machine

pub mod contacts;
pub mod error;
pub mod inclination;
pub mod population;
pub mod rng;
pub mod wellbeing;

pub use contacts::{ContactGraph, ContactLink};
pub use error::AgentError;
pub use inclination::reinforce;
pub use population::{Cohort, PopulationParams, generate};
pub use rng::{JITTER_SD, SimRng, positive};
pub use wellbeing::wellbeing_check;
