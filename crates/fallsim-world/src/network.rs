//! Care-network graph: locations as nodes, connections as directed edges.
//!
//! The [`CareNetwork`] is the spatial backbone of the simulation. It stores
//! all [`LocationState`] nodes and [`Connection`] edges and provides the
//! perception query (outgoing connections of a location), kind lookups, and
//! capacity-checked agent movement.
//!
//! Internally, an adjacency map indexes outbound connections per location:
//! `BTreeMap<LocationId, Vec<ConnectionId>>`.

use std::collections::BTreeMap;

use fallsim_types::{AgentId, Connection, ConnectionId, LocationId, LocationKind};

use crate::error::WorldError;
use crate::location::LocationState;

/// The care-network graph holding all locations and connections.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct CareNetwork {
    /// All locations indexed by their identifier.
    locations: BTreeMap<LocationId, LocationState>,
    /// All connections indexed by their identifier.
    connections: BTreeMap<ConnectionId, Connection>,
    /// Outbound adjacency: location -> connection IDs departing from it.
    outbound: BTreeMap<LocationId, Vec<ConnectionId>>,
}

impl CareNetwork {
    /// Create an empty network.
    pub const fn new() -> Self {
        Self {
            locations: BTreeMap::new(),
            connections: BTreeMap::new(),
            outbound: BTreeMap::new(),
        }
    }

    // -------------------------------------------------------------------
    // Location operations
    // -------------------------------------------------------------------

    /// Add a location to the network.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::DuplicateLocation`] if a location with the same
    /// ID already exists.
    pub fn add_location(&mut self, location: fallsim_types::Location) -> Result<(), WorldError> {
        let id = location.id;
        if self.locations.contains_key(&id) {
            return Err(WorldError::DuplicateLocation(id));
        }
        self.locations.insert(id, LocationState::new(location));
        self.outbound.entry(id).or_default();
        Ok(())
    }

    /// Get an immutable reference to a location's state.
    pub fn get_location(&self, id: LocationId) -> Option<&LocationState> {
        self.locations.get(&id)
    }

    /// Get a mutable reference to a location's state.
    pub fn get_location_mut(&mut self, id: LocationId) -> Option<&mut LocationState> {
        self.locations.get_mut(&id)
    }

    /// Return the number of locations in the network.
    pub fn location_count(&self) -> usize {
        self.locations.len()
    }

    /// Return all location IDs in deterministic order.
    pub fn location_ids(&self) -> Vec<LocationId> {
        self.locations.keys().copied().collect()
    }

    /// Iterate over all locations immutably.
    pub fn locations(&self) -> impl Iterator<Item = (&LocationId, &LocationState)> {
        self.locations.iter()
    }

    /// Find the first location of the given kind.
    ///
    /// The standard topology has at most one location per kind, so this is
    /// the canonical kind -> ID lookup.
    pub fn find_kind(&self, kind: LocationKind) -> Option<LocationId> {
        self.locations
            .iter()
            .find(|(_, state)| state.location.kind == kind)
            .map(|(id, _)| *id)
    }

    /// Agents currently at a location, in deterministic order.
    pub fn agents_at(&self, id: LocationId) -> Vec<AgentId> {
        self.locations
            .get(&id)
            .map(|state| state.occupants.iter().copied().collect())
            .unwrap_or_default()
    }

    // -------------------------------------------------------------------
    // Connection operations
    // -------------------------------------------------------------------

    /// Add a connection to the network.
    ///
    /// Both endpoints must already exist.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::LocationNotFound`] if either endpoint is
    /// missing, or [`WorldError::DuplicateConnection`] if the connection ID
    /// already exists.
    pub fn add_connection(&mut self, connection: Connection) -> Result<(), WorldError> {
        if !self.locations.contains_key(&connection.from) {
            return Err(WorldError::LocationNotFound(connection.from));
        }
        if !self.locations.contains_key(&connection.to) {
            return Err(WorldError::LocationNotFound(connection.to));
        }
        if self.connections.contains_key(&connection.id) {
            return Err(WorldError::DuplicateConnection(connection.id));
        }

        let id = connection.id;
        let from = connection.from;
        self.connections.insert(id, connection);
        self.outbound.entry(from).or_default().push(id);
        Ok(())
    }

    /// Get an immutable reference to a connection.
    pub fn get_connection(&self, id: ConnectionId) -> Option<&Connection> {
        self.connections.get(&id)
    }

    /// Return the number of connections in the network.
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// All connections departing from the given location.
    ///
    /// This is the raw perception view before any filtering.
    pub fn outgoing(&self, location: LocationId) -> Vec<&Connection> {
        let Some(ids) = self.outbound.get(&location) else {
            return Vec::new();
        };
        ids.iter()
            .filter_map(|cid| self.connections.get(cid))
            .collect()
    }

    // -------------------------------------------------------------------
    // Agent movement
    // -------------------------------------------------------------------

    /// Place an agent at a location without a source (initial placement).
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::LocationNotFound`] or
    /// [`WorldError::LocationAtCapacity`].
    pub fn place_agent(&mut self, agent: AgentId, at: LocationId) -> Result<(), WorldError> {
        self.locations
            .get_mut(&at)
            .ok_or(WorldError::LocationNotFound(at))?
            .add_occupant(agent)
    }

    /// Move an agent from one location to another.
    ///
    /// Validates that both locations exist and that the destination has
    /// capacity before modifying anything.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::LocationNotFound`],
    /// [`WorldError::AgentNotAtLocation`], or
    /// [`WorldError::LocationAtCapacity`] as appropriate.
    pub fn move_agent(
        &mut self,
        agent: AgentId,
        from: LocationId,
        to: LocationId,
    ) -> Result<(), WorldError> {
        if !self.locations.contains_key(&from) {
            return Err(WorldError::LocationNotFound(from));
        }

        // Check destination capacity before modifying anything. A self-loop
        // never fails the check because the agent frees its own slot.
        if from != to {
            let dest = self
                .locations
                .get(&to)
                .ok_or(WorldError::LocationNotFound(to))?;
            if !dest.has_capacity() {
                return Err(WorldError::LocationAtCapacity {
                    location: to,
                    capacity: dest.location.capacity.unwrap_or(0),
                });
            }
        }

        {
            let source = self
                .locations
                .get_mut(&from)
                .ok_or(WorldError::LocationNotFound(from))?;
            source.remove_occupant(agent)?;
        }
        {
            let dest = self
                .locations
                .get_mut(&to)
                .ok_or(WorldError::LocationNotFound(to))?;
            dest.add_occupant(agent)?;
        }

        Ok(())
    }

    /// Remove an agent from the network entirely (terminal sink).
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::AgentNotAtLocation`] if the agent is not at the
    /// given location.
    pub fn remove_agent(&mut self, agent: AgentId, from: LocationId) -> Result<(), WorldError> {
        self.locations
            .get_mut(&from)
            .ok_or(WorldError::LocationNotFound(from))?
            .remove_occupant(agent)
    }
}

impl Default for CareNetwork {
    fn default() -> Self {
        Self::new()
    }
}
