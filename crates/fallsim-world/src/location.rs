//! Location node implementation with occupant tracking and pending queue.
//!
//! A [`LocationState`] wraps the canonical [`Location`] record from
//! `fallsim-types` and adds the mutable runtime state: the set of agents
//! currently present and, for queued location kinds, the time-indexed
//! pending table.

use std::collections::BTreeSet;

use fallsim_types::{AgentId, Location};
use serde::{Deserialize, Serialize};

use crate::error::WorldError;
use crate::pending::PendingQueue;

/// Mutable runtime state for a location in the care network.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationState {
    /// The canonical location record (identity + attribute deltas).
    pub location: Location,
    /// Agents currently present at this location.
    pub occupants: BTreeSet<AgentId>,
    /// Scheduled releases. Only populated for queued location kinds.
    pub pending: PendingQueue,
}

impl LocationState {
    /// Create a new [`LocationState`] from a [`Location`] record.
    ///
    /// Starts with no occupants and an empty pending table.
    pub const fn new(location: Location) -> Self {
        Self {
            location,
            occupants: BTreeSet::new(),
            pending: PendingQueue::new(),
        }
    }

    /// Return the number of agents currently at this location.
    pub fn occupant_count(&self) -> u32 {
        u32::try_from(self.occupants.len()).unwrap_or(u32::MAX)
    }

    /// Check whether the location can accept another occupant.
    ///
    /// Locations without a capacity field are unbounded.
    pub fn has_capacity(&self) -> bool {
        self.location
            .capacity
            .is_none_or(|cap| self.occupant_count() < cap)
    }

    /// Add an agent to this location's occupant set.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::LocationAtCapacity`] if the location is full.
    pub fn add_occupant(&mut self, agent: AgentId) -> Result<(), WorldError> {
        if !self.has_capacity() {
            return Err(WorldError::LocationAtCapacity {
                location: self.location.id,
                capacity: self.location.capacity.unwrap_or(0),
            });
        }
        self.occupants.insert(agent);
        Ok(())
    }

    /// Remove an agent from this location's occupant set, along with any
    /// pending entries it still holds here.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::AgentNotAtLocation`] if the agent is not here.
    pub fn remove_occupant(&mut self, agent: AgentId) -> Result<(), WorldError> {
        if !self.occupants.remove(&agent) {
            return Err(WorldError::AgentNotAtLocation {
                agent,
                location: self.location.id,
            });
        }
        self.pending.remove_agent(agent);
        Ok(())
    }

    /// Check whether a specific agent is at this location.
    pub fn contains_agent(&self, agent: AgentId) -> bool {
        self.occupants.contains(&agent)
    }
}
