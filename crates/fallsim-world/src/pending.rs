//! Time-indexed pending table for queued locations.
//!
//! Home and hospital nodes do not process their occupants every tick.
//! Instead, each agent gets a [`PendingEntry`] scheduled at a future tick;
//! the location only acts on agents whose entry is due. The table is owned
//! by its location and is never mutated from outside it.

use std::collections::BTreeMap;

use fallsim_types::{AgentId, PendingEntry};
use serde::{Deserialize, Serialize};

/// A time-indexed table of scheduled releases, keyed by due tick.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PendingQueue {
    entries: BTreeMap<u64, Vec<PendingEntry>>,
}

impl PendingQueue {
    /// Create an empty queue.
    pub const fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Schedule an entry at the given tick.
    pub fn schedule(&mut self, tick: u64, entry: PendingEntry) {
        self.entries.entry(tick).or_default().push(entry);
    }

    /// Remove and return all entries due at or before the given tick.
    ///
    /// Overdue entries (scheduled in the past, e.g. while the location was
    /// blocked) are released together with the current tick's batch, in
    /// schedule order.
    pub fn take_due(&mut self, tick: u64) -> Vec<PendingEntry> {
        let mut due = Vec::new();
        let later = self.entries.split_off(&tick.saturating_add(1));
        for (_, mut batch) in std::mem::take(&mut self.entries) {
            due.append(&mut batch);
        }
        self.entries = later;
        due
    }

    /// Whether the agent has any entry anywhere in the table.
    pub fn contains_agent(&self, agent: AgentId) -> bool {
        self.entries
            .values()
            .any(|batch| batch.iter().any(|e| e.agent == agent))
    }

    /// Drop every entry belonging to the agent.
    ///
    /// Used when an agent leaves the location through some other path than
    /// its scheduled release.
    pub fn remove_agent(&mut self, agent: AgentId) {
        for batch in self.entries.values_mut() {
            batch.retain(|e| e.agent != agent);
        }
        self.entries.retain(|_, batch| !batch.is_empty());
    }

    /// Total number of scheduled entries.
    pub fn len(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
