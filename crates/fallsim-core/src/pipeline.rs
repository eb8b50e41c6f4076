//! The per-agent decision pipeline.
//!
//! Runs the four phases over a perception built by [`crate::policy`]:
//! affordability filtering, weighted choice, payment (with carer top-up),
//! and post-move learning. Every phase reads and writes through the
//! transaction; an abandoned move leaves the agent untouched apart from
//! anything perception already recorded.

use fallsim_agents::{SimRng, positive, reinforce, wellbeing_check};
use fallsim_store::{StateTxn, StoreError};
use fallsim_types::{
    AgentId, Connection, EdgeKind, FallSeverity, Location, LocationId, LocationKind, LogEntry,
    Patient, event_labels,
};
use fallsim_world::WorldError;
use tracing::{debug, trace};

use crate::policy::Perception;

/// Weight discount per social-distance rank level during choice.
const SOCIAL_RANK_DISCOUNT: f64 = 0.2;

/// What a pipeline run did.
#[derive(Debug, Clone, Copy)]
pub struct MoveOutcome {
    /// Whether the agent changed location.
    pub moved: bool,
    /// Where the agent ended up, when it moved.
    pub destination: Option<LocationId>,
    /// Kind of the destination, when it moved.
    pub destination_kind: Option<LocationKind>,
    /// Fall injected during perception this tick, if any.
    pub fall: Option<FallSeverity>,
    /// Whether the destination was the terminal care sink.
    pub entered_care: bool,
}

impl MoveOutcome {
    /// Outcome for an agent that stayed put.
    const fn stayed(fall: Option<FallSeverity>) -> Self {
        Self {
            moved: false,
            destination: None,
            destination_kind: None,
            fall,
            entered_care: false,
        }
    }
}

/// Affordability filter.
///
/// With more than one option, an agent only considers moves it can pay
/// for: the combined edge-plus-destination resource delta must leave the
/// balance above zero. Emergency and terminal destinations (GP, Hospital,
/// Care) are never picked voluntarily; they reach the agent only through
/// collapsed single-option perceptions, which bypass this filter entirely.
fn affordable_options<T: StateTxn>(
    txn: &T,
    patient: &Patient,
    options: Vec<Connection>,
) -> Result<Vec<Connection>, StoreError> {
    if options.len() <= 1 {
        return Ok(options);
    }
    let mut kept = Vec::new();
    for conn in options {
        let dest = txn.get_location(conn.to)?;
        if matches!(
            dest.kind,
            LocationKind::Care | LocationKind::Gp | LocationKind::Hospital
        ) {
            continue;
        }
        let cost = conn.resource_delta + dest.resource_delta;
        if patient.resources > -cost {
            kept.push(conn);
        }
    }
    Ok(kept)
}

/// Closest contact-graph distance from the agent to anyone currently at
/// the destination. `u32::MAX` when nobody reachable is there.
fn social_distance<T: StateTxn>(
    txn: &T,
    patient: &Patient,
    destination: LocationId,
) -> Result<u32, StoreError> {
    let mut best = u32::MAX;
    for other in txn.patients_at(destination)? {
        if other == patient.id {
            continue;
        }
        if let Some(distance) = txn.contact_distance(patient.id, other)? {
            best = best.min(distance);
        }
    }
    Ok(best)
}

/// Weighted choice over the remaining options.
///
/// Options above the agent's mood are dropped first. Weights come from the
/// inclination vector indexed by edge kind; social options are then
/// re-ranked by contact distance, with each rank level past the closest
/// discounted by 0.2 (floored at zero). The draw is weighted, falling back
/// to uniform when every weight is non-positive.
fn choose<T: StateTxn>(
    txn: &T,
    rng: &mut SimRng,
    patient: &Patient,
    options: Vec<Connection>,
) -> Result<Option<Connection>, StoreError> {
    if options.len() <= 1 {
        return Ok(options.into_iter().next());
    }
    let mut candidates: Vec<Connection> = options
        .into_iter()
        .filter(|conn| conn.mood_barrier <= patient.mood)
        .collect();
    if candidates.len() <= 1 {
        return Ok(candidates.pop());
    }

    let mut weights: Vec<f64> = candidates
        .iter()
        .map(|conn| patient.inclination_for(conn.kind))
        .collect();

    let mut socials: Vec<(usize, u32)> = Vec::new();
    for (index, conn) in candidates.iter().enumerate() {
        if conn.kind == EdgeKind::Social {
            socials.push((index, social_distance(txn, patient, conn.to)?));
        }
    }
    if socials.len() > 1 {
        socials.sort_by_key(|&(_, distance)| distance);
        let mut level: u32 = 0;
        let mut previous: Option<u32> = None;
        for (index, distance) in socials {
            if let Some(prev) = previous
                && distance > prev
            {
                level = level.saturating_add(1);
            }
            previous = Some(distance);
            if let Some(weight) = weights.get_mut(index) {
                *weight = positive(SOCIAL_RANK_DISCOUNT.mul_add(-f64::from(level), *weight));
            }
        }
    }

    let Some(index) = rng.pick_weighted(&weights) else {
        return Ok(None);
    };
    Ok(candidates.into_iter().nth(index))
}

/// Find a linked carer able to cover the shortfall, deduct it from their
/// pool, and stamp the contact link.
fn cover_shortfall<T: StateTxn>(
    txn: &mut T,
    patient: &Patient,
    shortfall: f64,
    now: u64,
) -> Result<bool, StoreError> {
    for carer_id in txn.carers_of(patient.id)? {
        let mut carer = txn.get_carer(carer_id)?;
        if carer.resources >= shortfall {
            carer.resources -= shortfall;
            txn.put_carer(carer)?;
            txn.mark_contact_usage(patient.id, carer_id, now)?;
            debug!(agent = %patient.id, carer = %carer_id, shortfall, "carer covered payment");
            return Ok(true);
        }
    }
    Ok(false)
}

/// Pay the edge: jittered resource, mobility, and confidence deltas, then
/// a wellbeing re-check.
///
/// With carer support enabled, a payment the agent cannot cover is either
/// topped up by a linked carer or the move is abandoned (`false`, nothing
/// changed). Without carer support the balance simply goes negative.
fn pay<T: StateTxn>(
    txn: &mut T,
    rng: &mut SimRng,
    patient: &mut Patient,
    connection: &Connection,
    fall: Option<FallSeverity>,
    carer_support: bool,
) -> Result<bool, StoreError> {
    let now = txn.clock();
    if connection.resource_delta != 0.0 {
        let after = patient.resources + rng.jitter(connection.resource_delta);
        if after < 0.0 && carer_support {
            if !cover_shortfall(txn, patient, -after, now)? {
                return Ok(false);
            }
            patient.resources = 0.0;
        } else {
            patient.resources = after;
        }
    }
    if connection.mobility_delta != 0.0 {
        patient.mobility = positive(patient.mobility + rng.jitter(connection.mobility_delta));
    }
    if connection.confidence_delta != 0.0 {
        patient.mood = positive(patient.mood + rng.jitter(connection.confidence_delta));
    }
    if let Some(next) = wellbeing_check(patient.wellbeing, patient.mobility, fall) {
        patient.wellbeing = next;
        patient.log.push(LogEntry::new(next.label(), now));
    }
    Ok(true)
}

/// Post-move learning: destination deltas with jitter, a wellbeing
/// re-check, inclination reinforcement from the net resource change of the
/// whole move, event logging, and the destination load counter.
fn learn<T: StateTxn>(
    txn: &mut T,
    rng: &mut SimRng,
    patient: &mut Patient,
    connection: &Connection,
    destination: &Location,
    origin_kind: LocationKind,
    resources_before: f64,
) -> Result<bool, StoreError> {
    let now = txn.clock();
    if destination.mobility_delta != 0.0 {
        patient.mobility = positive(patient.mobility + rng.jitter(destination.mobility_delta));
    }
    if destination.confidence_delta != 0.0 {
        patient.mood = positive(patient.mood + rng.jitter(destination.confidence_delta));
    }
    if destination.resource_delta != 0.0 {
        patient.resources += rng.jitter(destination.resource_delta);
    }
    if let Some(next) = wellbeing_check(patient.wellbeing, patient.mobility, None) {
        patient.wellbeing = next;
        patient.log.push(LogEntry::new(next.label(), now));
    }

    let net_change = patient.resources - resources_before;
    reinforce(patient, connection.kind, net_change);

    if origin_kind == LocationKind::Hospital && destination.kind != LocationKind::Hospital {
        patient
            .log
            .push(LogEntry::new(event_labels::DISCHARGED, now));
    }
    let entered_care = destination.kind == LocationKind::Care;
    if entered_care {
        patient
            .log
            .push(LogEntry::new(event_labels::CARE_ADMISSION, now));
    }
    if destination.kind.is_capacitated() {
        txn.set_load(connection.to, destination.load.saturating_add(1))?;
    }
    Ok(entered_care)
}

/// Run the pipeline for one agent over a prepared perception.
///
/// # Errors
///
/// Returns [`StoreError`] on any state access failure. A full destination
/// or an unaffordable move is not an error; the agent just stays.
pub fn run<T: StateTxn>(
    txn: &mut T,
    rng: &mut SimRng,
    agent: AgentId,
    carer_support: bool,
    perception: Perception,
) -> Result<MoveOutcome, StoreError> {
    let patient = txn.get_patient(agent)?;
    let origin = patient.location;
    let origin_kind = txn.get_location(origin)?.kind;

    let options = affordable_options(txn, &patient, perception.options)?;
    let Some(connection) = choose(txn, rng, &patient, options)? else {
        return Ok(MoveOutcome::stayed(perception.fall));
    };

    let mut patient = patient;
    let resources_before = patient.resources;
    if !pay(txn, rng, &mut patient, &connection, perception.fall, carer_support)? {
        debug!(agent = %agent, connection = %connection.id, "move abandoned, unaffordable");
        return Ok(MoveOutcome::stayed(perception.fall));
    }

    match txn.move_patient(agent, origin, connection.to) {
        Ok(()) => {}
        Err(StoreError::World(WorldError::LocationAtCapacity { .. })) => {
            // Lost the race for the last slot; the payment is discarded.
            return Ok(MoveOutcome::stayed(perception.fall));
        }
        Err(other) => return Err(other),
    }
    patient.location = connection.to;

    let destination = txn.get_location(connection.to)?;
    let entered_care = learn(
        txn,
        rng,
        &mut patient,
        &connection,
        &destination,
        origin_kind,
        resources_before,
    )?;
    txn.put_patient(patient)?;
    trace!(agent = %agent, from = %origin, to = %connection.to, "agent moved");

    Ok(MoveOutcome {
        moved: true,
        destination: Some(connection.to),
        destination_kind: Some(destination.kind),
        fall: perception.fall,
        entered_care,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use fallsim_agents::ContactGraph;
    use fallsim_store::MemoryStore;
    use fallsim_types::{Carer, Wellbeing};
    use fallsim_world::{NetworkHandles, NetworkOptions, standard_network};

    use crate::policy;

    use super::*;

    struct Fixture {
        store: MemoryStore,
        handles: NetworkHandles,
        agent: AgentId,
    }

    fn make_fixture(
        carers: Vec<Carer>,
        build: impl FnOnce(&NetworkHandles, &mut Patient, &mut ContactGraph),
    ) -> Fixture {
        let options = NetworkOptions {
            intervention_capacity: 2,
            open_intervention: false,
            open_intervention_capacity: 0,
            open_intervention_allowed: Vec::new(),
        };
        let (network, handles) = standard_network(&options).unwrap();
        let store = MemoryStore::new(network);
        let mut patient = Patient {
            id: AgentId::new(),
            mobility: 0.9,
            mood: 0.9,
            resources: 1.0,
            inclination: [2.0, 0.0, 1.0, 2.0],
            wellbeing: Wellbeing::AtRisk,
            location: handles.home,
            referral: false,
            log: Vec::new(),
        };
        let mut contacts = ContactGraph::new();
        contacts.add_member(patient.id);
        for carer in &carers {
            contacts.add_member(carer.id);
        }
        build(&handles, &mut patient, &mut contacts);
        let agent = patient.id;
        store.seed(vec![patient], carers, contacts).unwrap();
        Fixture {
            store,
            handles,
            agent,
        }
    }

    fn edge_to(
        txn: &impl StateTxn,
        from: LocationId,
        to: LocationId,
    ) -> Connection {
        txn.outgoing(from)
            .unwrap()
            .into_iter()
            .find(|c| c.to == to)
            .unwrap()
    }

    #[test]
    fn empty_perception_means_no_move() {
        let fx = make_fixture(Vec::new(), |_, _, _| {});
        let mut txn = fx.store.begin().unwrap();
        let mut rng = SimRng::seed_from(3);
        let outcome = run(&mut txn, &mut rng, fx.agent, true, Perception {
            options: Vec::new(),
            fall: None,
        })
        .unwrap();
        assert!(!outcome.moved);
        assert!(outcome.destination.is_none());
        assert_eq!(txn.get_patient(fx.agent).unwrap().location, fx.handles.home);
    }

    #[test]
    fn single_option_bypasses_affordability() {
        // A forced hospital transfer goes through even with nothing left.
        let fx = make_fixture(Vec::new(), |_, patient, _| patient.resources = 0.0);
        let mut txn = fx.store.begin().unwrap();
        let conn = edge_to(&txn, fx.handles.home, fx.handles.hospital);
        let mut rng = SimRng::seed_from(5);
        let outcome =
            run(&mut txn, &mut rng, fx.agent, false, Perception::single(conn)).unwrap();
        assert!(outcome.moved);
        assert_eq!(outcome.destination, Some(fx.handles.hospital));
        assert_eq!(
            txn.get_patient(fx.agent).unwrap().location,
            fx.handles.hospital
        );
    }

    #[test]
    fn affordability_filter_drops_expensive_and_medical_routes() {
        let fx = make_fixture(Vec::new(), |_, patient, _| patient.resources = 0.0);
        let txn = fx.store.begin().unwrap();
        let patient = txn.get_patient(fx.agent).unwrap();
        let options = txn.outgoing(fx.handles.home).unwrap();
        let filtered = affordable_options(&txn, &patient, options).unwrap();
        // Social costs 0.4 on arrival and medical routes are never
        // voluntary; with zero resources only the free self-loop survives.
        assert!(!filtered.is_empty());
        assert!(filtered.iter().all(|c| c.to == fx.handles.home));
    }

    #[test]
    fn carer_tops_up_failing_payment() {
        let carer = Carer {
            id: AgentId::new(),
            resources: 20.0,
        };
        let carer_id = carer.id;
        let fx = make_fixture(vec![carer], |handles, patient, contacts| {
            patient.resources = 0.05;
            patient.location = handles.social;
            contacts.link(patient.id, carer_id, true, 0).unwrap();
        });
        let mut txn = fx.store.begin().unwrap();
        // Social -> GP costs 0.3 on the edge; resources cannot cover it.
        let conn = edge_to(&txn, fx.handles.social, fx.handles.gp);
        let mut rng = SimRng::seed_from(7);
        let outcome =
            run(&mut txn, &mut rng, fx.agent, true, Perception::single(conn)).unwrap();
        assert!(outcome.moved);
        assert!(
            txn.get_carer(carer_id).unwrap().resources < 20.0,
            "carer pool untouched"
        );
        let moved = txn.get_patient(fx.agent).unwrap();
        assert!((moved.resources - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn no_carer_means_the_move_fails() {
        let fx = make_fixture(Vec::new(), |handles, patient, _| {
            patient.resources = 0.05;
            patient.location = handles.social;
        });
        let mut txn = fx.store.begin().unwrap();
        let conn = edge_to(&txn, fx.handles.social, fx.handles.gp);
        let mut rng = SimRng::seed_from(7);
        let outcome =
            run(&mut txn, &mut rng, fx.agent, true, Perception::single(conn)).unwrap();
        assert!(!outcome.moved);
        assert_eq!(
            txn.get_patient(fx.agent).unwrap().location,
            fx.handles.social
        );
    }

    #[test]
    fn leaving_hospital_logs_discharge() {
        let fx = make_fixture(Vec::new(), |handles, patient, _| {
            patient.location = handles.hospital;
        });
        let mut txn = fx.store.begin().unwrap();
        let conn = edge_to(&txn, fx.handles.hospital, fx.handles.home);
        let mut rng = SimRng::seed_from(11);
        let outcome =
            run(&mut txn, &mut rng, fx.agent, false, Perception::single(conn)).unwrap();
        assert!(outcome.moved);
        let moved = txn.get_patient(fx.agent).unwrap();
        assert!(moved.log.iter().any(|e| e.label == event_labels::DISCHARGED));
    }

    #[test]
    fn entering_care_is_reported() {
        let fx = make_fixture(Vec::new(), |_, patient, _| patient.mobility = 0.0);
        let mut txn = fx.store.begin().unwrap();
        let mut rng = SimRng::seed_from(13);
        let perception = policy::perceive(&mut txn, &mut rng, fx.agent).unwrap();
        let outcome = run(&mut txn, &mut rng, fx.agent, false, perception).unwrap();
        assert!(outcome.moved);
        assert!(outcome.entered_care);
        assert_eq!(outcome.destination, Some(fx.handles.care));
        let admitted = txn.get_patient(fx.agent).unwrap();
        assert!(
            admitted
                .log
                .iter()
                .any(|e| e.label == event_labels::CARE_ADMISSION)
        );
    }

    #[test]
    fn intervention_arrival_bumps_load() {
        let fx = make_fixture(Vec::new(), |_, patient, _| {
            patient.referral = true;
            patient.wellbeing = Wellbeing::Fallen;
            patient.resources = 1.5;
        });
        let mut txn = fx.store.begin().unwrap();
        let conn = edge_to(&txn, fx.handles.home, fx.handles.intervention);
        let mut rng = SimRng::seed_from(17);
        let outcome =
            run(&mut txn, &mut rng, fx.agent, false, Perception::single(conn)).unwrap();
        assert!(outcome.moved);
        assert_eq!(txn.get_location(fx.handles.intervention).unwrap().load, 1);
    }

    #[test]
    fn choice_prefers_inclined_kinds() {
        // Social weight dwarfs the rest; over many seeds the agent should
        // overwhelmingly pick the social edge over the self-loop.
        let mut social_picks = 0_u32;
        let mut upright = 0_u32;
        for seed in 0..300_u64 {
            let fx = make_fixture(Vec::new(), |_, patient, _| {
                patient.resources = 5.0;
                patient.inclination = [50.0, 0.0, 0.0, 1.0];
            });
            let mut txn = fx.store.begin().unwrap();
            let mut rng = SimRng::seed_from(seed);
            let perception = policy::perceive(&mut txn, &mut rng, fx.agent).unwrap();
            if perception.fall.is_some() {
                continue;
            }
            upright = upright.saturating_add(1);
            let outcome = run(&mut txn, &mut rng, fx.agent, false, perception).unwrap();
            if outcome.destination == Some(fx.handles.social) {
                social_picks = social_picks.saturating_add(1);
            }
        }
        assert!(upright > 200, "too many injected falls: {upright} upright");
        assert!(
            social_picks.saturating_mul(10) > upright.saturating_mul(8),
            "social picked {social_picks}/{upright}"
        );
    }
}
