//! Location-specific perception.
//!
//! Every location hands the decision pipeline a filtered view of its
//! outgoing connections. The base filter removes gated and full options;
//! on top of that, most locations inject instantaneous fall checks and the
//! zero-mobility collapse to Care, the GP routes instead of offering a
//! choice, and the intervention programme runs a session before the agent
//! decides where to go. Dwell drift for released queue occupants lives
//! here as well.

use fallsim_agents::{SimRng, positive, wellbeing_check};
use fallsim_store::{StateTxn, StoreError};
use fallsim_types::{
    AgentId, Connection, FallSeverity, LocationKind, LogEntry, Patient, Wellbeing, event_labels,
};
use tracing::debug;

/// Instantaneous fall hazard scale; the severe-fall probability is
/// `exp(-3 * mobility)`.
const FALL_HAZARD_SCALE: f64 = -3.0;

/// Mobility damping for the moderate-fall hazard.
const MODERATE_DAMPING: f64 = 0.9;

/// Mobility damping for the mild-fall hazard.
const MILD_DAMPING: f64 = 0.7;

/// GP routing: below this mobility the agent goes to hospital.
const GP_EMERGENCY_THRESHOLD: f64 = 0.6;

/// GP routing: below this mobility a home-bound agent gets a referral.
const GP_REFERRAL_THRESHOLD: f64 = 0.85;

/// Intervention sessions keep the referral while mobility is at or below
/// this value.
const INTERVENTION_DISCHARGE_THRESHOLD: f64 = 0.6;

/// What an agent sees before choosing: the filtered options, plus the fall
/// the perception itself injected, if any.
#[derive(Debug, Clone)]
pub struct Perception {
    /// Connections the agent may take this tick.
    pub options: Vec<Connection>,
    /// Fall injected during perception; `None` when the agent stayed upright.
    pub fall: Option<FallSeverity>,
}

impl Perception {
    /// A perception collapsed to a single pre-decided connection.
    pub fn single(connection: Connection) -> Self {
        Self {
            options: vec![connection],
            fall: None,
        }
    }
}

/// Outgoing options minus gated, disallowed, and full destinations.
fn base_options<T: StateTxn>(
    txn: &T,
    patient: &Patient,
) -> Result<Vec<(Connection, LocationKind)>, StoreError> {
    let mut options = Vec::new();
    for conn in txn.outgoing(patient.location)? {
        if conn.requires_referral && !patient.referral {
            continue;
        }
        if !conn.admits(patient.wellbeing) {
            continue;
        }
        let dest = txn.get_location(conn.to)?;
        if dest.kind.is_capacitated()
            && let Some(cap) = dest.capacity
            && dest.load >= cap
        {
            continue;
        }
        options.push((conn, dest.kind));
    }
    Ok(options)
}

/// Build an agent's perception at its current location.
///
/// For the GP this routes rather than offering a choice. Everywhere else
/// the base filter applies, then: an immobile agent who can see Care sees
/// only Care, and an agent who can see both Hospital and GP rolls for an
/// instantaneous fall, which collapses the view to the matching medical
/// destination (severe to Hospital, moderate to GP) and marks the agent
/// Fallen.
///
/// # Errors
///
/// Returns [`StoreError`] if agent or location reads fail.
pub fn perceive<T: StateTxn>(
    txn: &mut T,
    rng: &mut SimRng,
    agent: AgentId,
) -> Result<Perception, StoreError> {
    let patient = txn.get_patient(agent)?;
    let here = txn.get_location(patient.location)?;
    if here.kind == LocationKind::Gp {
        return gp_routing(txn, patient);
    }

    let mut options = base_options(txn, &patient)?;

    if patient.mobility <= 0.0 && options.iter().any(|(_, kind)| *kind == LocationKind::Care) {
        options.retain(|(_, kind)| *kind == LocationKind::Care);
        return Ok(Perception {
            options: options.into_iter().map(|(conn, _)| conn).collect(),
            fall: None,
        });
    }

    let sees_hospital = options.iter().any(|(_, kind)| *kind == LocationKind::Hospital);
    let sees_gp = options.iter().any(|(_, kind)| *kind == LocationKind::Gp);
    let mut fall = None;
    if sees_hospital && sees_gp {
        let roll = rng.uniform();
        if roll < (FALL_HAZARD_SCALE * patient.mobility).exp() {
            fall = Some(FallSeverity::Severe);
            options.retain(|(_, kind)| *kind == LocationKind::Hospital);
        } else if roll < (FALL_HAZARD_SCALE * MODERATE_DAMPING * patient.mobility).exp() {
            fall = Some(FallSeverity::Moderate);
            options.retain(|(_, kind)| *kind == LocationKind::Gp);
        } else if roll < (FALL_HAZARD_SCALE * MILD_DAMPING * patient.mobility).exp() {
            // A mild fall leaves the options as they are.
            fall = Some(FallSeverity::Mild);
        }
        if let Some(severity) = fall {
            let now = txn.clock();
            let mut fallen = patient;
            fallen.wellbeing = Wellbeing::Fallen;
            fallen.log.push(LogEntry::new(severity.label(), now));
            txn.put_patient(fallen)?;
            debug!(agent = %agent, severity = ?severity, "fall during perception");
        }
    }

    Ok(Perception {
        options: options.into_iter().map(|(conn, _)| conn).collect(),
        fall,
    })
}

/// GP triage: hospital when mobility is low, home otherwise, with a
/// referral granted to home-bound agents whose mobility is still marginal.
fn gp_routing<T: StateTxn>(txn: &mut T, patient: Patient) -> Result<Perception, StoreError> {
    let mut options = base_options(txn, &patient)?;
    if patient.mobility < GP_EMERGENCY_THRESHOLD {
        options.retain(|(_, kind)| *kind == LocationKind::Hospital);
    } else {
        options.retain(|(_, kind)| *kind == LocationKind::Home);
        if patient.mobility < GP_REFERRAL_THRESHOLD && !patient.referral {
            let mut updated = patient;
            updated.referral = true;
            txn.put_patient(updated)?;
        }
    }
    Ok(Perception {
        options: options.into_iter().map(|(conn, _)| conn).collect(),
        fall: None,
    })
}

/// Run one intervention session for an attendee: log the attendance and
/// re-assess the referral, which is kept only while mobility remains at or
/// below the discharge threshold.
///
/// # Errors
///
/// Returns [`StoreError`] if the agent cannot be read or written.
pub fn intervention_session<T: StateTxn>(txn: &mut T, agent: AgentId) -> Result<(), StoreError> {
    let now = txn.clock();
    let mut patient = txn.get_patient(agent)?;
    patient
        .log
        .push(LogEntry::new(event_labels::INTERVENTION_ATTENDANCE, now));
    patient.referral = patient.mobility <= INTERVENTION_DISCHARGE_THRESHOLD;
    txn.put_patient(patient)
}

/// Apply a queued location's dwell drift to a released occupant, scaled by
/// the stay duration: mobility and confidence drift with jitter, resources
/// recover linearly. A hospital release also restores the referral and
/// logs the discharge.
///
/// # Errors
///
/// Returns [`StoreError`] if the agent or location cannot be read.
pub fn apply_dwell<T: StateTxn>(
    txn: &mut T,
    rng: &mut SimRng,
    agent: AgentId,
    duration: f64,
) -> Result<(), StoreError> {
    let now = txn.clock();
    let mut patient = txn.get_patient(agent)?;
    let location = txn.get_location(patient.location)?;
    let Some(rates) = location.dwell else {
        return Ok(());
    };
    patient.mobility = positive(patient.mobility + rng.jitter(rates.mobility_change * duration));
    patient.mood = positive(patient.mood + rng.jitter(rates.confidence_change * duration));
    patient.resources += rates.recovery_rate * duration;
    if let Some(next) = wellbeing_check(patient.wellbeing, patient.mobility, None) {
        patient.wellbeing = next;
        patient.log.push(LogEntry::new(next.label(), now));
    }
    if location.kind == LocationKind::Hospital {
        patient.referral = true;
        patient
            .log
            .push(LogEntry::new(event_labels::HOSPITAL_DISCHARGE, now));
    }
    txn.put_patient(patient)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use fallsim_agents::ContactGraph;
    use fallsim_store::MemoryStore;
    use fallsim_world::{NetworkHandles, NetworkOptions, standard_network};

    use super::*;

    fn make_store(patient: impl FnOnce(&NetworkHandles) -> Patient) -> (MemoryStore, NetworkHandles, AgentId) {
        let options = NetworkOptions {
            intervention_capacity: 2,
            open_intervention: false,
            open_intervention_capacity: 0,
            open_intervention_allowed: Vec::new(),
        };
        let (network, handles) = standard_network(&options).unwrap();
        let store = MemoryStore::new(network);
        let patient = patient(&handles);
        let id = patient.id;
        store
            .seed(vec![patient], Vec::new(), ContactGraph::new())
            .unwrap();
        (store, handles, id)
    }

    fn make_patient(location: fallsim_types::LocationId, mobility: f64) -> Patient {
        Patient {
            id: AgentId::new(),
            mobility,
            mood: 0.9,
            resources: 1.0,
            inclination: [2.0, 0.0, 1.0, 2.0],
            wellbeing: Wellbeing::AtRisk,
            location,
            referral: false,
            log: Vec::new(),
        }
    }

    #[test]
    fn referral_gated_edge_is_hidden_without_referral() {
        let (store, handles, id) = make_store(|h| make_patient(h.home, 0.9));
        let mut txn = store.begin().unwrap();
        let mut rng = SimRng::seed_from(41);
        let perception = perceive(&mut txn, &mut rng, id).unwrap();
        assert!(
            perception
                .options
                .iter()
                .all(|c| c.to != handles.intervention)
        );
    }

    #[test]
    fn zero_mobility_collapses_to_care() {
        let (store, handles, id) = make_store(|h| make_patient(h.home, 0.0));
        let mut txn = store.begin().unwrap();
        let mut rng = SimRng::seed_from(43);
        let perception = perceive(&mut txn, &mut rng, id).unwrap();
        assert_eq!(perception.options.len(), 1);
        assert_eq!(perception.options.first().unwrap().to, handles.care);
        assert!(perception.fall.is_none());
    }

    #[test]
    fn immobile_agents_fall_when_care_is_out_of_sight() {
        // At Social there is no Care edge, so the zero-mobility collapse
        // cannot apply and the fall roll runs at probability 1.
        let (store, handles, id) = make_store(|h| make_patient(h.social, 0.0));
        let mut txn = store.begin().unwrap();
        let mut rng = SimRng::seed_from(47);
        let perception = perceive(&mut txn, &mut rng, id).unwrap();
        assert_eq!(perception.fall, Some(FallSeverity::Severe));
        assert_eq!(perception.options.len(), 1);
        assert_eq!(perception.options.first().unwrap().to, handles.hospital);
        let patient = txn.get_patient(id).unwrap();
        assert_eq!(patient.wellbeing, Wellbeing::Fallen);
        assert_eq!(
            patient.log.last().map(|e| e.label.as_str()),
            Some("Severe Fall")
        );
    }

    #[test]
    fn mobile_agents_rarely_fall() {
        let mut falls = 0_u32;
        for seed in 0..200 {
            let (store, _, id) = make_store(|h| make_patient(h.home, 0.95));
            let mut txn = store.begin().unwrap();
            let mut rng = SimRng::seed_from(seed);
            if perceive(&mut txn, &mut rng, id).unwrap().fall.is_some() {
                falls = falls.saturating_add(1);
            }
        }
        // At mobility 0.95 the mild-fall bound is about exp(-2) ~ 0.14.
        assert!(falls < 60, "{falls} falls in 200 perceptions");
    }

    #[test]
    fn gp_routes_low_mobility_to_hospital() {
        let (store, handles, id) = make_store(|h| make_patient(h.gp, 0.4));
        let mut txn = store.begin().unwrap();
        let mut rng = SimRng::seed_from(53);
        let perception = perceive(&mut txn, &mut rng, id).unwrap();
        assert_eq!(perception.options.len(), 1);
        assert_eq!(perception.options.first().unwrap().to, handles.hospital);
        // No referral on the emergency path.
        assert!(!txn.get_patient(id).unwrap().referral);
    }

    #[test]
    fn gp_sends_marginal_mobility_home_with_referral() {
        let (store, handles, id) = make_store(|h| make_patient(h.gp, 0.7));
        let mut txn = store.begin().unwrap();
        let mut rng = SimRng::seed_from(59);
        let perception = perceive(&mut txn, &mut rng, id).unwrap();
        assert_eq!(perception.options.len(), 1);
        assert_eq!(perception.options.first().unwrap().to, handles.home);
        assert!(txn.get_patient(id).unwrap().referral);
    }

    #[test]
    fn gp_sends_good_mobility_home_without_referral() {
        let (store, handles, id) = make_store(|h| make_patient(h.gp, 0.9));
        let mut txn = store.begin().unwrap();
        let mut rng = SimRng::seed_from(61);
        let perception = perceive(&mut txn, &mut rng, id).unwrap();
        assert_eq!(perception.options.first().unwrap().to, handles.home);
        assert!(!txn.get_patient(id).unwrap().referral);
    }

    #[test]
    fn intervention_session_toggles_referral_on_mobility() {
        let (store, _, id) = make_store(|h| {
            let mut p = make_patient(h.intervention, 0.5);
            p.referral = true;
            p
        });
        let mut txn = store.begin().unwrap();
        intervention_session(&mut txn, id).unwrap();
        let patient = txn.get_patient(id).unwrap();
        assert!(patient.referral, "low mobility keeps the referral");
        assert_eq!(
            patient.log.last().map(|e| e.label.as_str()),
            Some(event_labels::INTERVENTION_ATTENDANCE)
        );

        let mut recovered = patient;
        recovered.mobility = 0.8;
        txn.put_patient(recovered).unwrap();
        intervention_session(&mut txn, id).unwrap();
        assert!(!txn.get_patient(id).unwrap().referral);
    }

    #[test]
    fn hospital_dwell_restores_referral_and_logs_discharge() {
        let (store, handles, id) = make_store(|h| make_patient(h.home, 0.9));
        let mut txn = store.begin().unwrap();
        txn.move_patient(id, handles.home, handles.hospital).unwrap();
        let before = txn.get_patient(id).unwrap();
        let mut rng = SimRng::seed_from(67);
        apply_dwell(&mut txn, &mut rng, id, 5.0).unwrap();
        let after = txn.get_patient(id).unwrap();
        assert!(after.referral);
        assert!(after.mobility < before.mobility, "stay erodes mobility");
        assert!(after.resources > before.resources, "stay restores resources");
        assert!(
            after
                .log
                .iter()
                .any(|e| e.label == event_labels::HOSPITAL_DISCHARGE)
        );
    }

    #[test]
    fn full_intervention_is_dropped_from_view() {
        let (store, handles, id) = make_store(|h| {
            let mut p = make_patient(h.home, 0.9);
            p.referral = true;
            p.wellbeing = Wellbeing::Fallen;
            p
        });
        let mut txn = store.begin().unwrap();
        txn.set_load(handles.intervention, 2).unwrap();
        let mut rng = SimRng::seed_from(71);
        let perception = perceive(&mut txn, &mut rng, id).unwrap();
        assert!(
            perception
                .options
                .iter()
                .all(|c| c.to != handles.intervention)
        );
    }
}
