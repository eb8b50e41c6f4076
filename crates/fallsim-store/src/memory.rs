//! In-memory shared-state store.
//!
//! The reference backend: the whole world state behind one `RwLock`, with
//! a write guard as the transaction scope. A poisoned lock surfaces as
//! [`StoreError::Conflict`] so callers go through the same retry path a
//! contended backend would use.

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock, RwLockWriteGuard};

use fallsim_agents::ContactGraph;
use fallsim_types::{
    AgentId, Carer, Connection, Location, LocationId, LogEntry, Patient, PendingEntry,
};
use fallsim_world::{CareNetwork, WorldError};

use crate::error::StoreError;
use crate::txn::StateTxn;

#[derive(Debug)]
struct WorldState {
    network: CareNetwork,
    patients: BTreeMap<AgentId, Patient>,
    carers: BTreeMap<AgentId, Carer>,
    contacts: ContactGraph,
    clock: u64,
}

/// Shared in-memory simulation state.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    state: Arc<RwLock<WorldState>>,
}

impl MemoryStore {
    /// Create a store over an existing network with no agents.
    pub fn new(network: CareNetwork) -> Self {
        Self {
            state: Arc::new(RwLock::new(WorldState {
                network,
                patients: BTreeMap::new(),
                carers: BTreeMap::new(),
                contacts: ContactGraph::new(),
                clock: 0,
            })),
        }
    }

    /// Seed the store with a generated cohort, placing each patient at its
    /// recorded location.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if a placement fails or the lock is poisoned.
    pub fn seed(
        &self,
        patients: Vec<Patient>,
        carers: Vec<Carer>,
        contacts: ContactGraph,
    ) -> Result<(), StoreError> {
        let mut txn = self.begin()?;
        for patient in patients {
            txn.guard.network.place_agent(patient.id, patient.location)?;
            txn.guard.patients.insert(patient.id, patient);
        }
        for carer in carers {
            txn.guard.carers.insert(carer.id, carer);
        }
        txn.guard.contacts = contacts;
        Ok(())
    }

    /// Open a transaction.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Conflict`] if the lock is poisoned.
    pub fn begin(&self) -> Result<MemoryTxn<'_>, StoreError> {
        let guard = self.state.write().map_err(|_| StoreError::Conflict {
            context: "state lock poisoned".to_string(),
        })?;
        Ok(MemoryTxn { guard })
    }
}

/// Transaction scope over the in-memory store.
pub struct MemoryTxn<'a> {
    guard: RwLockWriteGuard<'a, WorldState>,
}

impl MemoryTxn<'_> {
    fn location_state(
        &self,
        location: LocationId,
    ) -> Result<&fallsim_world::LocationState, StoreError> {
        self.guard
            .network
            .get_location(location)
            .ok_or(StoreError::World(WorldError::LocationNotFound(location)))
    }

    fn location_state_mut(
        &mut self,
        location: LocationId,
    ) -> Result<&mut fallsim_world::LocationState, StoreError> {
        self.guard
            .network
            .get_location_mut(location)
            .ok_or(StoreError::World(WorldError::LocationNotFound(location)))
    }
}

impl StateTxn for MemoryTxn<'_> {
    fn clock(&self) -> u64 {
        self.guard.clock
    }

    fn advance_clock(&mut self) -> Result<u64, StoreError> {
        self.guard.clock = self.guard.clock.saturating_add(1);
        Ok(self.guard.clock)
    }

    fn get_patient(&self, id: AgentId) -> Result<Patient, StoreError> {
        self.guard
            .patients
            .get(&id)
            .cloned()
            .ok_or(StoreError::UnknownPatient(id))
    }

    fn put_patient(&mut self, patient: Patient) -> Result<(), StoreError> {
        self.guard.patients.insert(patient.id, patient);
        Ok(())
    }

    fn remove_patient(&mut self, id: AgentId) -> Result<Patient, StoreError> {
        let patient = self
            .guard
            .patients
            .remove(&id)
            .ok_or(StoreError::UnknownPatient(id))?;
        self.guard.network.remove_agent(id, patient.location)?;
        self.guard.contacts.remove_member(id);
        Ok(patient)
    }

    fn append_log(&mut self, id: AgentId, entry: LogEntry) -> Result<(), StoreError> {
        self.guard
            .patients
            .get_mut(&id)
            .ok_or(StoreError::UnknownPatient(id))?
            .log
            .push(entry);
        Ok(())
    }

    fn patient_count(&self) -> usize {
        self.guard.patients.len()
    }

    fn patients_at(&self, location: LocationId) -> Result<Vec<AgentId>, StoreError> {
        // Occupant sets may include carers in principle; filter to patients.
        Ok(self
            .guard
            .network
            .agents_at(location)
            .into_iter()
            .filter(|id| self.guard.patients.contains_key(id))
            .collect())
    }

    fn outgoing(&self, location: LocationId) -> Result<Vec<Connection>, StoreError> {
        let _ = self.location_state(location)?;
        Ok(self
            .guard
            .network
            .outgoing(location)
            .into_iter()
            .cloned()
            .collect())
    }

    fn get_location(&self, location: LocationId) -> Result<Location, StoreError> {
        Ok(self.location_state(location)?.location.clone())
    }

    fn location_ids(&self) -> Vec<LocationId> {
        self.guard.network.location_ids()
    }

    fn set_capacity(&mut self, location: LocationId, capacity: u32) -> Result<(), StoreError> {
        self.location_state_mut(location)?.location.capacity = Some(capacity);
        Ok(())
    }

    fn set_load(&mut self, location: LocationId, load: u32) -> Result<(), StoreError> {
        self.location_state_mut(location)?.location.load = load;
        Ok(())
    }

    fn move_patient(
        &mut self,
        id: AgentId,
        from: LocationId,
        to: LocationId,
    ) -> Result<(), StoreError> {
        self.guard.network.move_agent(id, from, to)?;
        if let Some(patient) = self.guard.patients.get_mut(&id) {
            patient.location = to;
        }
        Ok(())
    }

    fn schedule_pending(
        &mut self,
        location: LocationId,
        tick: u64,
        entry: PendingEntry,
    ) -> Result<(), StoreError> {
        self.location_state_mut(location)?.pending.schedule(tick, entry);
        Ok(())
    }

    fn take_due_pending(
        &mut self,
        location: LocationId,
        tick: u64,
    ) -> Result<Vec<PendingEntry>, StoreError> {
        Ok(self.location_state_mut(location)?.pending.take_due(tick))
    }

    fn has_pending(&self, location: LocationId, agent: AgentId) -> Result<bool, StoreError> {
        Ok(self.location_state(location)?.pending.contains_agent(agent))
    }

    fn get_carer(&self, id: AgentId) -> Result<Carer, StoreError> {
        self.guard
            .carers
            .get(&id)
            .cloned()
            .ok_or(StoreError::UnknownCarer(id))
    }

    fn put_carer(&mut self, carer: Carer) -> Result<(), StoreError> {
        self.guard.carers.insert(carer.id, carer);
        Ok(())
    }

    fn carers_of(&self, id: AgentId) -> Result<Vec<AgentId>, StoreError> {
        Ok(self.guard.contacts.carers_of(id))
    }

    fn contact_distance(&self, a: AgentId, b: AgentId) -> Result<Option<u32>, StoreError> {
        Ok(self.guard.contacts.shortest_path(a, b))
    }

    fn mark_contact_usage(
        &mut self,
        a: AgentId,
        b: AgentId,
        tick: u64,
    ) -> Result<(), StoreError> {
        self.guard.contacts.mark_usage(a, b, tick)?;
        Ok(())
    }
}
