//! Initial cohort generation.
//!
//! Builds the starting population: patients drawn from normal
//! distributions around configured means, a carer pool sized as a fraction
//! of the cohort, and the contact links between them. Every patient starts
//! at the home node in the `At risk` state with a `Created` log entry.

use fallsim_types::{AgentId, Carer, LocationId, LogEntry, Patient, Wellbeing};
use tracing::info;

use crate::contacts::ContactGraph;
use crate::rng::{SimRng, positive};

/// Log label for cohort creation.
pub const CREATED: &str = "Created";

/// Distribution means and pool sizes for cohort generation.
#[derive(Debug, Clone)]
pub struct PopulationParams {
    /// Number of patients to generate.
    pub size: u32,
    /// One carer is created per this many patients.
    pub carer_divisor: u32,
    /// Starting support pool of each carer.
    pub carer_resources: f64,
    /// Mean starting mobility.
    pub mean_mobility: f64,
    /// Mean starting mood.
    pub mean_mood: f64,
    /// Mean starting resources.
    pub mean_resources: f64,
    /// Mean inclination vector (social, fall, medical, inactive).
    pub mean_inclination: [f64; 4],
}

impl Default for PopulationParams {
    fn default() -> Self {
        Self {
            size: 100,
            carer_divisor: 4,
            carer_resources: 20.0,
            mean_mobility: 0.8,
            mean_mood: 0.9,
            mean_resources: 1.0,
            mean_inclination: [2.0, 0.0, 1.0, 2.0],
        }
    }
}

/// A freshly generated cohort.
#[derive(Debug, Clone)]
pub struct Cohort {
    /// The generated patients, all placed at home.
    pub patients: Vec<Patient>,
    /// The carer pool.
    pub carers: Vec<Carer>,
    /// Contact links between patients and carers.
    pub contacts: ContactGraph,
}

fn draw_inclination(params: &PopulationParams, rng: &mut SimRng) -> [f64; 4] {
    let mut raw = [0.0_f64; 4];
    for (slot, mean) in raw.iter_mut().zip(params.mean_inclination.iter()) {
        *slot = positive(rng.jitter(*mean));
    }
    let total: f64 = raw.iter().sum();
    if total > 0.0 {
        for slot in &mut raw {
            *slot /= total;
        }
    }
    raw
}

/// Generate the starting cohort.
///
/// Each patient links to one or two carers with probability one half, and
/// to up to two patient friends. Links are undirected and stamped with the
/// creation tick.
pub fn generate(
    params: &PopulationParams,
    home: LocationId,
    tick: u64,
    rng: &mut SimRng,
) -> Cohort {
    let carer_count = if params.carer_divisor == 0 {
        0
    } else {
        params.size / params.carer_divisor
    };

    let mut contacts = ContactGraph::new();
    let carers: Vec<Carer> = (0..carer_count)
        .map(|_| {
            let carer = Carer {
                id: AgentId::new(),
                resources: params.carer_resources,
            };
            contacts.add_member(carer.id);
            carer
        })
        .collect();

    let patients: Vec<Patient> = (0..params.size)
        .map(|_| {
            let patient = Patient {
                id: AgentId::new(),
                mobility: positive(rng.jitter(params.mean_mobility)),
                mood: positive(rng.jitter(params.mean_mood)),
                resources: rng.jitter(params.mean_resources),
                inclination: draw_inclination(params, rng),
                wellbeing: Wellbeing::AtRisk,
                location: home,
                referral: false,
                log: vec![LogEntry::new(CREATED, tick)],
            };
            contacts.add_member(patient.id);
            patient
        })
        .collect();

    // Carer links: half the cohort gets one or two carers.
    for patient in &patients {
        if carers.is_empty() || rng.uniform() >= 0.5 {
            continue;
        }
        let wanted = if rng.uniform() < 0.5 { 2 } else { 1 };
        let mut linked = 0_usize;
        while linked < wanted {
            let Some(index) = rng.index(carers.len()) else {
                break;
            };
            if let Some(carer) = carers.get(index) {
                // Duplicate picks collapse onto the same link.
                let _ = contacts.link(patient.id, carer.id, true, tick);
            }
            linked = linked.saturating_add(1);
        }
    }

    // Friend links: up to two other patients each.
    for patient in &patients {
        let wanted = rng.index(3).unwrap_or(0);
        let mut linked = 0_usize;
        while linked < wanted {
            let Some(index) = rng.index(patients.len()) else {
                break;
            };
            if let Some(friend) = patients.get(index)
                && friend.id != patient.id
            {
                let _ = contacts.link(patient.id, friend.id, false, tick);
            }
            linked = linked.saturating_add(1);
        }
    }

    info!(
        patients = patients.len(),
        carers = carers.len(),
        "cohort generated"
    );

    Cohort {
        patients,
        carers,
        contacts,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn cohort_sizes_follow_params() {
        let params = PopulationParams {
            size: 40,
            ..PopulationParams::default()
        };
        let mut rng = SimRng::seed_from(42);
        let cohort = generate(&params, LocationId::new(), 0, &mut rng);
        assert_eq!(cohort.patients.len(), 40);
        assert_eq!(cohort.carers.len(), 10);
        assert_eq!(cohort.contacts.member_count(), 50);
    }

    #[test]
    fn patients_start_at_risk_at_home() {
        let home = LocationId::new();
        let mut rng = SimRng::seed_from(1);
        let cohort = generate(&PopulationParams::default(), home, 3, &mut rng);
        for patient in &cohort.patients {
            assert_eq!(patient.wellbeing, Wellbeing::AtRisk);
            assert_eq!(patient.location, home);
            assert!(!patient.referral);
            assert_eq!(
                patient.log.first().map(|e| e.label.as_str()),
                Some(CREATED)
            );
        }
    }

    #[test]
    fn attributes_cluster_around_means() {
        let params = PopulationParams {
            size: 500,
            ..PopulationParams::default()
        };
        let mut rng = SimRng::seed_from(9);
        let cohort = generate(&params, LocationId::new(), 0, &mut rng);
        let mean_mob: f64 = cohort.patients.iter().map(|p| p.mobility).sum::<f64>()
            / f64::from(params.size);
        assert!((mean_mob - 0.8).abs() < 0.02, "mean mobility {mean_mob}");
    }

    #[test]
    fn inclination_is_normalized() {
        let mut rng = SimRng::seed_from(5);
        let cohort = generate(&PopulationParams::default(), LocationId::new(), 0, &mut rng);
        for patient in &cohort.patients {
            let total: f64 = patient.inclination.iter().sum();
            assert!((total - 1.0).abs() < 1e-9, "inclination sums to {total}");
            assert!(patient.inclination.iter().all(|w| *w >= 0.0));
        }
    }

    #[test]
    fn some_patients_have_carers() {
        let params = PopulationParams {
            size: 200,
            ..PopulationParams::default()
        };
        let mut rng = SimRng::seed_from(77);
        let cohort = generate(&params, LocationId::new(), 0, &mut rng);
        let with_carers = cohort
            .patients
            .iter()
            .filter(|p| !cohort.contacts.carers_of(p.id).is_empty())
            .count();
        // Half the cohort links to carers in expectation.
        assert!(with_carers > 50, "only {with_carers} patients have carers");
    }
}
