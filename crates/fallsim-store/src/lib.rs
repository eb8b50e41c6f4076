//! Shared-state storage for the fallsim care-network simulation.
//!
//! The engine never touches world state directly; it goes through the
//! [`StateTxn`] transaction interface. This crate defines that interface,
//! its retry semantics, and the in-memory reference backend.
//!
//! # Modules
//!
//! - [`txn`] -- The [`StateTxn`] trait and the [`with_retries`] helper
//! - [`memory`] -- The in-memory backend ([`MemoryStore`], [`MemoryTxn`])
//! - [`error`] -- Error types ([`StoreError`])

pub mod error;
pub mod memory;
pub mod txn;

pub use error::StoreError;
pub use memory::{MemoryStore, MemoryTxn};
pub use txn::{StateTxn, with_retries};
