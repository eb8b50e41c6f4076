//! Simulation engine binary.
//!
//! This is the main entry point that wires together the care network,
//! cohort generation, the in-memory state store, and the tick loop. It
//! loads configuration, initializes all subsystems, runs the simulation
//! to completion, and reports the care-sink statistics.
//!
//! # Startup Sequence
//!
//! 1. Initialize structured logging (tracing)
//! 2. Load configuration from `fallsim-config.yaml` (or the first CLI arg)
//! 3. Build the standard care network topology
//! 4. Generate the patient cohort, carers, and contact graph
//! 5. Seed the in-memory store
//! 6. Run the tick loop
//! 7. Log the result

mod error;

use std::path::Path;

use fallsim_agents::{SimRng, generate};
use fallsim_core::{CapacityBalancer, SimulationConfig, TickEngine, run_simulation};
use fallsim_store::MemoryStore;
use fallsim_world::standard_network;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::error::EngineError;

/// Default configuration file, relative to the working directory.
const DEFAULT_CONFIG_PATH: &str = "fallsim-config.yaml";

/// Application entry point.
///
/// # Errors
///
/// Returns an error if any initialization step or the simulation itself
/// fails.
fn main() -> Result<(), EngineError> {
    // 1. Load configuration. Logging is not up yet, so remember whether
    //    the file was found and report it afterwards.
    let (config, config_found) = load_config()?;

    // 2. Initialize structured logging. `RUST_LOG` wins over the
    //    configured level.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.logging.level.clone())),
        )
        .with_target(true)
        .init();

    info!("fallsim-engine starting");
    if !config_found {
        warn!("config file not found, using defaults");
    }
    info!(
        world_name = config.world.name,
        seed = config.world.seed,
        max_ticks = config.simulation.max_ticks,
        population = config.population.size,
        "Configuration loaded"
    );

    // 3. Build the care network.
    let (network, handles) = standard_network(&config.network.options())?;
    info!(
        intervention_capacity = config.network.intervention_capacity,
        open_intervention = config.network.open_intervention,
        "Care network created"
    );

    // 4. Generate the cohort.
    let mut rng = SimRng::seed_from(config.world.seed);
    let cohort = generate(&config.population.params(), handles.home, 0, &mut rng);
    info!(
        patients = cohort.patients.len(),
        carers = cohort.carers.len(),
        "Cohort generated"
    );

    // 5. Seed the store.
    let store = MemoryStore::new(network);
    store.seed(cohort.patients, cohort.carers, cohort.contacts)?;
    info!("Store seeded");

    // 6. Run the tick loop.
    let balancer = config.balancer.enabled.then(CapacityBalancer::new);
    let mut engine = TickEngine::new(
        handles,
        rng,
        config.population.carer_support,
        balancer,
        config.balancer.dynamic,
    );
    let result = run_simulation(
        &store,
        &mut engine,
        config.simulation.max_ticks,
        config.simulation.retry_attempts,
        |summary| {
            info!(
                tick = summary.tick,
                moves = summary.moves,
                falls = summary.falls,
                discharges = summary.discharges,
                admissions = summary.admissions,
                "tick"
            );
        },
    )?;

    // 7. Report.
    let care = result.care;
    info!(
        ticks_run = result.ticks_run,
        remaining_patients = result.remaining_patients,
        care_admissions = care.agents,
        mean_interval = care.mean_interval,
        mild_falls = care.mild,
        moderate_falls = care.moderate,
        severe_falls = care.severe,
        "Simulation complete"
    );
    Ok(())
}

/// Load configuration from the first CLI argument or the default path.
///
/// A missing file is not an error: the run falls back to the built-in
/// defaults. The boolean reports whether the file was found so the
/// caller can log it once tracing is up.
fn load_config() -> Result<(SimulationConfig, bool), EngineError> {
    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
    let path = Path::new(&path);
    if path.exists() {
        Ok((SimulationConfig::from_file(path)?, true))
    } else {
        Ok((SimulationConfig::default(), false))
    }
}
