//! One simulation tick.
//!
//! Locations are processed in a fixed order each tick: the queued wards
//! release their due occupants and re-plan the idle ones, the open
//! locations run every occupant through the decision pipeline, the
//! intervention programmes hold their sessions, and the care sink absorbs
//! arrivals. The capacity balancer observes last.

use fallsim_agents::SimRng;
use fallsim_store::{StateTxn, StoreError};
use fallsim_types::{AgentId, LocationId, LocationKind};
use fallsim_world::NetworkHandles;
use tracing::debug;

use crate::balancer::CapacityBalancer;
use crate::pipeline::{self, MoveOutcome};
use crate::policy::{self, Perception};
use crate::predict;
use crate::sink::CareStats;

/// Counters for a single tick.
#[derive(Debug, Clone, Copy, Default)]
pub struct TickSummary {
    /// The tick these counters cover.
    pub tick: u64,
    /// Completed moves.
    pub moves: u64,
    /// Falls injected during perception this tick.
    pub falls: u64,
    /// Hospital discharges released from the pending queue.
    pub discharges: u64,
    /// Care admissions.
    pub admissions: u64,
}

/// Drives the per-tick processing over a store transaction.
#[derive(Debug)]
pub struct TickEngine {
    handles: NetworkHandles,
    rng: SimRng,
    carer_support: bool,
    balancer: Option<CapacityBalancer>,
    dynamic_capacity: bool,
    care: CareStats,
}

impl TickEngine {
    /// Create an engine over the standard topology handles.
    #[must_use]
    pub const fn new(
        handles: NetworkHandles,
        seed_rng: SimRng,
        carer_support: bool,
        balancer: Option<CapacityBalancer>,
        dynamic_capacity: bool,
    ) -> Self {
        Self {
            handles,
            rng: seed_rng,
            carer_support,
            balancer,
            dynamic_capacity,
            care: CareStats {
                agents: 0,
                mean_interval: 0.0,
                mild: 0,
                moderate: 0,
                severe: 0,
            },
        }
    }

    /// Care statistics accumulated so far.
    #[must_use]
    pub const fn care_stats(&self) -> &CareStats {
        &self.care
    }

    /// Advance the clock and process every location once.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on any state access failure.
    pub fn run_tick<T: StateTxn>(&mut self, txn: &mut T) -> Result<TickSummary, StoreError> {
        let now = txn.advance_clock()?;
        let mut summary = TickSummary {
            tick: now,
            ..TickSummary::default()
        };

        self.process_queued(txn, self.handles.hospital, &mut summary)?;
        self.process_queued(txn, self.handles.home, &mut summary)?;
        self.process_open(txn, self.handles.social, &mut summary)?;
        self.process_intervention(txn, self.handles.intervention, &mut summary)?;
        if let Some(open) = self.handles.intervention_open {
            self.process_intervention(txn, open, &mut summary)?;
        }
        self.process_open(txn, self.handles.gp, &mut summary)?;
        self.process_care(txn, &mut summary)?;

        if let Some(balancer) = self.balancer.as_mut() {
            balancer.observe(
                txn,
                self.handles.intervention,
                self.handles.intervention_open,
                self.dynamic_capacity,
            )?;
        }

        debug!(
            tick = now,
            moves = summary.moves,
            falls = summary.falls,
            discharges = summary.discharges,
            admissions = summary.admissions,
            "tick complete"
        );
        Ok(summary)
    }

    /// Release due occupants of a queued location and plan the idle ones.
    fn process_queued<T: StateTxn>(
        &mut self,
        txn: &mut T,
        location: LocationId,
        summary: &mut TickSummary,
    ) -> Result<(), StoreError> {
        let kind = txn.get_location(location)?.kind;
        let now = txn.clock();
        for entry in txn.take_due_pending(location, now)? {
            if txn.get_patient(entry.agent).is_err() {
                continue;
            }
            if let Some(duration) = entry.duration
                && duration > 0.0
            {
                policy::apply_dwell(txn, &mut self.rng, entry.agent, duration)?;
                if kind == LocationKind::Hospital {
                    summary.discharges = summary.discharges.saturating_add(1);
                }
            }
            let perception = match entry.planned {
                Some(planned) => txn
                    .outgoing(location)?
                    .into_iter()
                    .find(|conn| conn.id == planned)
                    .map(Perception::single),
                None => None,
            };
            let perception = match perception {
                Some(perception) => perception,
                None => policy::perceive(txn, &mut self.rng, entry.agent)?,
            };
            let outcome =
                pipeline::run(txn, &mut self.rng, entry.agent, self.carer_support, perception)?;
            self.absorb(txn, entry.agent, &outcome, summary)?;
        }
        // Occupants with no scheduled release get a fresh prediction.
        for agent in txn.patients_at(location)? {
            if !txn.has_pending(location, agent)? {
                self.predict_for(txn, location, kind, agent)?;
            }
        }
        Ok(())
    }

    /// Run every occupant of an open location through the pipeline.
    fn process_open<T: StateTxn>(
        &mut self,
        txn: &mut T,
        location: LocationId,
        summary: &mut TickSummary,
    ) -> Result<(), StoreError> {
        for agent in txn.patients_at(location)? {
            let perception = policy::perceive(txn, &mut self.rng, agent)?;
            let outcome =
                pipeline::run(txn, &mut self.rng, agent, self.carer_support, perception)?;
            self.absorb(txn, agent, &outcome, summary)?;
        }
        Ok(())
    }

    /// Hold an intervention session for every attendee, then refresh the
    /// load counter from the remaining occupancy.
    fn process_intervention<T: StateTxn>(
        &mut self,
        txn: &mut T,
        location: LocationId,
        summary: &mut TickSummary,
    ) -> Result<(), StoreError> {
        for agent in txn.patients_at(location)? {
            policy::intervention_session(txn, agent)?;
            let perception = policy::perceive(txn, &mut self.rng, agent)?;
            let outcome =
                pipeline::run(txn, &mut self.rng, agent, self.carer_support, perception)?;
            self.absorb(txn, agent, &outcome, summary)?;
        }
        let remaining = txn.patients_at(location)?.len();
        txn.set_load(location, u32::try_from(remaining).unwrap_or(u32::MAX))?;
        Ok(())
    }

    /// Absorb everyone at the care sink into the final statistics.
    fn process_care<T: StateTxn>(
        &mut self,
        txn: &mut T,
        summary: &mut TickSummary,
    ) -> Result<(), StoreError> {
        for agent in txn.patients_at(self.handles.care)? {
            self.care.admit(txn, agent)?;
            summary.admissions = summary.admissions.saturating_add(1);
        }
        Ok(())
    }

    /// Tick bookkeeping for a pipeline outcome, plus arrival prediction at
    /// queued destinations.
    fn absorb<T: StateTxn>(
        &mut self,
        txn: &mut T,
        agent: AgentId,
        outcome: &MoveOutcome,
        summary: &mut TickSummary,
    ) -> Result<(), StoreError> {
        if outcome.fall.is_some() {
            summary.falls = summary.falls.saturating_add(1);
        }
        if !outcome.moved {
            return Ok(());
        }
        summary.moves = summary.moves.saturating_add(1);
        if let (Some(destination), Some(kind)) = (outcome.destination, outcome.destination_kind)
            && kind.is_queued()
        {
            self.predict_for(txn, destination, kind, agent)?;
        }
        Ok(())
    }

    fn predict_for<T: StateTxn>(
        &mut self,
        txn: &mut T,
        location: LocationId,
        kind: LocationKind,
        agent: AgentId,
    ) -> Result<(), StoreError> {
        match kind {
            LocationKind::Home => predict::home_prediction(txn, &mut self.rng, location, agent),
            LocationKind::Hospital => {
                predict::hospital_prediction(txn, &mut self.rng, location, agent)
            }
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use fallsim_agents::{PopulationParams, generate};
    use fallsim_store::MemoryStore;
    use fallsim_world::{NetworkOptions, standard_network};

    use super::*;

    fn make_world(size: u32, seed: u64) -> (MemoryStore, TickEngine) {
        let options = NetworkOptions {
            intervention_capacity: 2,
            open_intervention: false,
            open_intervention_capacity: 0,
            open_intervention_allowed: Vec::new(),
        };
        let (network, handles) = standard_network(&options).unwrap();
        let store = MemoryStore::new(network);
        let mut rng = SimRng::seed_from(seed);
        let cohort = generate(
            &PopulationParams {
                size,
                ..PopulationParams::default()
            },
            handles.home,
            0,
            &mut rng,
        );
        store
            .seed(cohort.patients, cohort.carers, cohort.contacts)
            .unwrap();
        let engine = TickEngine::new(
            handles,
            rng,
            true,
            Some(CapacityBalancer::new()),
            false,
        );
        (store, engine)
    }

    #[test]
    fn first_tick_plans_every_seeded_agent() {
        let (store, mut engine) = make_world(20, 42);
        let mut txn = store.begin().unwrap();
        let summary = engine.run_tick(&mut txn).unwrap();
        assert_eq!(summary.tick, 1);
        // Everyone starts at home with no pending entry; after the tick
        // every remaining home occupant has one.
        let home = engine.handles.home;
        for agent in txn.patients_at(home).unwrap() {
            assert!(txn.has_pending(home, agent).unwrap());
        }
    }

    #[test]
    fn ticks_are_deterministic_for_a_seed() {
        let run = |seed: u64| {
            let (store, mut engine) = make_world(30, seed);
            let mut totals = (0_u64, 0_u64);
            for _ in 0..20 {
                let mut txn = store.begin().unwrap();
                let summary = engine.run_tick(&mut txn).unwrap();
                totals.0 = totals.0.saturating_add(summary.moves);
                totals.1 = totals.1.saturating_add(summary.falls);
            }
            totals
        };
        assert_eq!(run(7), run(7));
    }

    #[test]
    fn population_only_shrinks_through_care() {
        let (store, mut engine) = make_world(30, 9);
        for _ in 0..60 {
            let mut txn = store.begin().unwrap();
            engine.run_tick(&mut txn).unwrap();
        }
        let txn = store.begin().unwrap();
        let remaining = u64::try_from(txn.patient_count()).unwrap();
        assert_eq!(remaining.saturating_add(engine.care_stats().agents), 30);
    }

    #[test]
    fn agents_do_not_linger_at_the_gp() {
        let (store, mut engine) = make_world(40, 21);
        for _ in 0..40 {
            let mut txn = store.begin().unwrap();
            engine.run_tick(&mut txn).unwrap();
            // The GP routes everyone it sees the same tick it sees them.
            assert!(txn.patients_at(engine.handles.gp).unwrap().is_empty());
        }
    }

    #[test]
    fn care_sink_is_drained_every_tick() {
        let (store, mut engine) = make_world(40, 33);
        for _ in 0..80 {
            let mut txn = store.begin().unwrap();
            engine.run_tick(&mut txn).unwrap();
            assert!(txn.patients_at(engine.handles.care).unwrap().is_empty());
        }
    }
}
