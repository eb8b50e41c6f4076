//! The narrow shared-state interface.
//!
//! Everything the decision pipeline, location policies, balancer, and sink
//! touch goes through [`StateTxn`]. Every call carries the transaction
//! (`self`) so alternative backends can scope their own conflict and retry
//! semantics; [`with_retries`] wraps a transaction body and retries it on
//! [`StoreError::Conflict`].

use fallsim_types::{
    AgentId, Carer, Connection, Location, LocationId, LogEntry, Patient, PendingEntry,
};
use tracing::warn;

use crate::error::StoreError;

/// A transaction over the shared simulation state.
///
/// Reads hand out owned copies; writes go back through `put_*` so a
/// backend can track dirty records. Pending tables are reachable only
/// through the scheduling methods, keeping them owned by their location.
pub trait StateTxn {
    // -- clock ----------------------------------------------------------

    /// Current tick.
    fn clock(&self) -> u64;

    /// Advance the clock by one tick and return the new value.
    fn advance_clock(&mut self) -> Result<u64, StoreError>;

    // -- patients -------------------------------------------------------

    /// Read a patient record.
    fn get_patient(&self, id: AgentId) -> Result<Patient, StoreError>;

    /// Write a patient record back.
    fn put_patient(&mut self, patient: Patient) -> Result<(), StoreError>;

    /// Remove a patient from the simulation entirely: record, occupancy,
    /// and contact links. Returns the final record.
    fn remove_patient(&mut self, id: AgentId) -> Result<Patient, StoreError>;

    /// Append an entry to a patient's event log.
    fn append_log(&mut self, id: AgentId, entry: LogEntry) -> Result<(), StoreError>;

    /// Number of patients still in the simulation.
    fn patient_count(&self) -> usize;

    // -- network --------------------------------------------------------

    /// Patients currently at a location, in deterministic order.
    fn patients_at(&self, location: LocationId) -> Result<Vec<AgentId>, StoreError>;

    /// Outgoing connections of a location (the raw perception view).
    fn outgoing(&self, location: LocationId) -> Result<Vec<Connection>, StoreError>;

    /// Read a location record.
    fn get_location(&self, location: LocationId) -> Result<Location, StoreError>;

    /// All location IDs in deterministic order.
    fn location_ids(&self) -> Vec<LocationId>;

    /// Set a capacitated location's capacity.
    fn set_capacity(&mut self, location: LocationId, capacity: u32) -> Result<(), StoreError>;

    /// Set a capacitated location's load counter.
    fn set_load(&mut self, location: LocationId, load: u32) -> Result<(), StoreError>;

    /// Move a patient between locations, capacity-checked.
    fn move_patient(
        &mut self,
        id: AgentId,
        from: LocationId,
        to: LocationId,
    ) -> Result<(), StoreError>;

    // -- pending tables -------------------------------------------------

    /// Schedule a pending entry on a queued location.
    fn schedule_pending(
        &mut self,
        location: LocationId,
        tick: u64,
        entry: PendingEntry,
    ) -> Result<(), StoreError>;

    /// Remove and return the entries due at or before the tick.
    fn take_due_pending(
        &mut self,
        location: LocationId,
        tick: u64,
    ) -> Result<Vec<PendingEntry>, StoreError>;

    /// Whether the agent already has a pending entry at the location.
    fn has_pending(&self, location: LocationId, agent: AgentId) -> Result<bool, StoreError>;

    // -- carers and contacts --------------------------------------------

    /// Read a carer record.
    fn get_carer(&self, id: AgentId) -> Result<Carer, StoreError>;

    /// Write a carer record back.
    fn put_carer(&mut self, carer: Carer) -> Result<(), StoreError>;

    /// Carer contacts of a patient.
    fn carers_of(&self, id: AgentId) -> Result<Vec<AgentId>, StoreError>;

    /// Hop-count distance between two contact-graph members.
    fn contact_distance(&self, a: AgentId, b: AgentId) -> Result<Option<u32>, StoreError>;

    /// Stamp a contact link's usage tick.
    fn mark_contact_usage(
        &mut self,
        a: AgentId,
        b: AgentId,
        tick: u64,
    ) -> Result<(), StoreError>;
}

/// Run a transaction body, retrying on [`StoreError::Conflict`].
///
/// The in-memory store never conflicts; the seam exists for backends that
/// do. Non-conflict errors propagate immediately.
pub fn with_retries<T, F>(attempts: u32, mut body: F) -> Result<T, StoreError>
where
    F: FnMut() -> Result<T, StoreError>,
{
    let mut attempt: u32 = 0;
    while attempt < attempts {
        match body() {
            Err(StoreError::Conflict { context }) => {
                attempt = attempt.saturating_add(1);
                warn!(attempt, context, "transaction conflict, retrying");
            }
            other => return other,
        }
    }
    Err(StoreError::RetriesExhausted { attempts })
}
