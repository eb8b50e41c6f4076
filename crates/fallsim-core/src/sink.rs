//! The terminal care sink.
//!
//! Agents who reach the Care node leave the simulation. Before the record
//! is dropped, its event log feeds the end-of-run statistics: how long the
//! agent lasted and how many falls of each class it accumulated. The full
//! log is emitted as a structured event so a run's history survives the
//! record deletion.

use fallsim_store::{StateTxn, StoreError};
use fallsim_types::{AgentId, FallSeverity};
use tracing::info;

/// Aggregate statistics over all agents admitted to care.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CareStats {
    /// Agents admitted so far.
    pub agents: u64,
    /// Running mean of ticks between an agent's first and last log entry.
    pub mean_interval: f64,
    /// Mild falls across all admitted agents.
    pub mild: u64,
    /// Moderate falls across all admitted agents.
    pub moderate: u64,
    /// Severe falls across all admitted agents.
    pub severe: u64,
}

impl CareStats {
    /// Admit an agent to care: fold its log into the statistics, archive
    /// the log, and remove the agent from the simulation.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the agent cannot be removed.
    pub fn admit<T: StateTxn>(&mut self, txn: &mut T, agent: AgentId) -> Result<(), StoreError> {
        let patient = txn.remove_patient(agent)?;
        let first = patient.log.first().map_or(0, |entry| entry.tick);
        let last = patient.log.last().map_or(0, |entry| entry.tick);
        let span = last.saturating_sub(first);

        #[allow(clippy::cast_precision_loss)]
        {
            let counted = self.agents as f64;
            self.mean_interval =
                self.mean_interval.mul_add(counted, span as f64) / (counted + 1.0);
        }
        for entry in &patient.log {
            if entry.label == FallSeverity::Mild.label() {
                self.mild = self.mild.saturating_add(1);
            } else if entry.label == FallSeverity::Moderate.label() {
                self.moderate = self.moderate.saturating_add(1);
            } else if entry.label == FallSeverity::Severe.label() {
                self.severe = self.severe.saturating_add(1);
            }
        }
        self.agents = self.agents.saturating_add(1);

        info!(
            agent = %patient.id,
            span,
            entries = patient.log.len(),
            log = ?patient.log,
            "agent admitted to care, log archived"
        );
        Ok(())
    }
}
