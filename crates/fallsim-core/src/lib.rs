//! Decision pipeline and tick orchestration for the fall simulation.
//!
//! This crate owns the per-tick agent cycle: Perception, Choice, Payment,
//! Move, and Learning, plus the predictive planning that drives the queued
//! locations and the capacity balancer that reshapes the intervention
//! programme.
//!
//! # Modules
//!
//! - [`balancer`] -- Hysteresis-based intervention capacity balancing.
//! - [`config`] -- Configuration loading from `fallsim-config.yaml` into
//!   strongly-typed structs.
//! - [`pipeline`] -- Choice, Payment, Move, and Learning for one agent.
//! - [`policy`] -- Perception assembly, fall injection, GP routing, and
//!   intervention sessions.
//! - [`predict`] -- Fall forecasting and pending-queue planning for the
//!   queued locations.
//! - [`runner`] -- The outer simulation loop over store transactions.
//! - [`sink`] -- The terminal care sink and its end-of-run statistics.
//! - [`tick`] -- The per-tick processing order over all locations.

pub mod balancer;
pub mod config;
pub mod pipeline;
pub mod policy;
pub mod predict;
pub mod runner;
pub mod sink;
pub mod tick;

pub use balancer::{BalanceAction, CapacityBalancer};
pub use config::{ConfigError, SimulationConfig};
pub use pipeline::MoveOutcome;
pub use policy::Perception;
pub use predict::FallForecast;
pub use runner::{SimulationResult, run_simulation};
pub use sink::CareStats;
pub use tick::{TickEngine, TickSummary};
