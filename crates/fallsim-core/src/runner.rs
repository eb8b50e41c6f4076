//! Simulation driver.
//!
//! Opens one transaction per tick, runs the tick engine inside it with
//! the configured retry budget, and stops at the tick limit or as soon as
//! every agent has entered care.

use fallsim_store::{MemoryStore, StateTxn, StoreError, with_retries};
use tracing::info;

use crate::sink::CareStats;
use crate::tick::{TickEngine, TickSummary};

/// Final outcome of a simulation run.
#[derive(Debug, Clone, Copy)]
pub struct SimulationResult {
    /// Ticks actually executed.
    pub ticks_run: u64,
    /// Agents still in the network when the run stopped.
    pub remaining_patients: usize,
    /// Care-sink statistics.
    pub care: CareStats,
}

/// Run the simulation to the tick limit or until the population is gone.
///
/// `on_tick` observes every completed tick; pass a closure that does
/// nothing if no per-tick reporting is wanted.
///
/// # Errors
///
/// Returns [`StoreError`] if a tick fails or its retry budget is
/// exhausted.
pub fn run_simulation<F>(
    store: &MemoryStore,
    engine: &mut TickEngine,
    max_ticks: u64,
    retry_attempts: u32,
    mut on_tick: F,
) -> Result<SimulationResult, StoreError>
where
    F: FnMut(&TickSummary),
{
    let mut ticks_run: u64 = 0;
    for _ in 0..max_ticks {
        let summary = with_retries(retry_attempts, || {
            let mut txn = store.begin()?;
            engine.run_tick(&mut txn)
        })?;
        ticks_run = ticks_run.saturating_add(1);
        on_tick(&summary);

        let remaining = store.begin()?.patient_count();
        if remaining == 0 {
            info!(tick = summary.tick, "population exhausted, stopping early");
            break;
        }
    }

    let remaining_patients = store.begin()?.patient_count();
    let care = *engine.care_stats();
    info!(
        ticks_run,
        remaining_patients,
        admitted = care.agents,
        "simulation finished"
    );
    Ok(SimulationResult {
        ticks_run,
        remaining_patients,
        care,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use fallsim_agents::{PopulationParams, SimRng, generate};
    use fallsim_world::{NetworkOptions, standard_network};

    use crate::balancer::CapacityBalancer;

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
        let engine = TickEngine::new(handles, rng, true, Some(CapacityBalancer::new()), false);
        (store, engine)
    }

    #[test]
    fn runs_to_the_tick_limit() {
        let (store, mut engine) = make_world(10, 3);
        let mut observed = 0_u64;
        let result = run_simulation(&store, &mut engine, 25, 3, |_| {
            observed = observed.saturating_add(1);
        })
        .unwrap();
        assert!(result.ticks_run <= 25);
        assert_eq!(result.ticks_run, observed);
        let accounted = u64::try_from(result.remaining_patients)
            .unwrap()
            .saturating_add(result.care.agents);
        assert_eq!(accounted, 10);
    }

    #[test]
    fn stops_early_when_everyone_is_in_care() {
        // A tiny immobile cohort collapses into care almost immediately.
        let options = NetworkOptions {
            intervention_capacity: 2,
            open_intervention: false,
            open_intervention_capacity: 0,
            open_intervention_allowed: Vec::new(),
        };
        let (network, handles) = standard_network(&options).unwrap();
        let store = MemoryStore::new(network);
        let mut rng = SimRng::seed_from(5);
        let mut cohort = generate(
            &PopulationParams {
                size: 3,
                ..PopulationParams::default()
            },
            handles.home,
            0,
            &mut rng,
        );
        for patient in &mut cohort.patients {
            patient.mobility = 0.0;
        }
        store
            .seed(cohort.patients, cohort.carers, cohort.contacts)
            .unwrap();
        let mut engine = TickEngine::new(handles, rng, true, None, false);
        let result = run_simulation(&store, &mut engine, 500, 3, |_| {}).unwrap();
        assert_eq!(result.remaining_patients, 0);
        assert_eq!(result.care.agents, 3);
        assert!(result.ticks_run < 500, "ran {} ticks", result.ticks_run);
    }
}
