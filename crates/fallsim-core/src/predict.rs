//! Fall forecasting and queued-location prediction.
//!
//! Queued locations (Home, Hospital) do not re-evaluate their occupants
//! every tick. On arrival, and whenever an occupant has no scheduled
//! release, a prediction runs once and plants a single entry in the
//! location's pending table: a fall event with a fixed destination, a
//! recovery event with no destination, or an immediate re-evaluation.

use fallsim_agents::SimRng;
use fallsim_store::{StateTxn, StoreError};
use fallsim_types::{
    AgentId, FallSeverity, LocationId, LocationKind, LogEntry, PendingEntry, Wellbeing,
    event_labels,
};
use tracing::debug;

/// Forecast mobility is clamped below 1 so the hazard rate stays finite.
const MAX_FORECAST_MOBILITY: f64 = 0.999;

/// Hazard damping factor for moderate falls relative to severe ones.
const MODERATE_DAMPING: f64 = 0.9;

/// Hazard damping factor for mild falls relative to severe ones.
const MILD_DAMPING: f64 = 0.7;

/// Hospital stay sampling: mean stay for an immobile agent, in ticks.
const STAY_BASE: f64 = 14.0;

/// Hospital stay sampling: reduction per unit of mobility.
const STAY_MOBILITY_FACTOR: f64 = 9.0;

/// A predicted fall: how many ticks away, and how bad.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FallForecast {
    /// Ticks until the predicted fall.
    pub ticks: u64,
    /// Predicted severity class.
    pub severity: FallSeverity,
}

/// Sample the time to the agent's next fall.
///
/// Each severity class gets a Poisson draw whose mean grows with mobility
/// (`-ln(1 - m)` for severe, with the mobility damped by 0.9 and 0.7 for
/// moderate and mild). The earliest draw wins; ties go to the more severe
/// class.
pub fn next_fall(rng: &mut SimRng, mobility: f64) -> FallForecast {
    let m = mobility.clamp(0.0, MAX_FORECAST_MOBILITY);
    let mut forecast = FallForecast {
        ticks: rng.poisson(-(1.0 - m).ln()),
        severity: FallSeverity::Severe,
    };
    let moderate = rng.poisson(-(1.0 - MODERATE_DAMPING * m).ln());
    if moderate < forecast.ticks {
        forecast = FallForecast {
            ticks: moderate,
            severity: FallSeverity::Moderate,
        };
    }
    let mild = rng.poisson(-(1.0 - MILD_DAMPING * m).ln());
    if mild < forecast.ticks {
        forecast = FallForecast {
            ticks: mild,
            severity: FallSeverity::Mild,
        };
    }
    forecast
}

/// Cheapest exit from a location, as a positive resource requirement.
///
/// Combined edge-plus-destination deltas per escape option (the self-loop
/// does not count as an escape); options that cost nothing are ignored,
/// and a location with no costly exits requires nothing.
fn min_escape_cost<T: StateTxn>(txn: &T, location: LocationId) -> Result<f64, StoreError> {
    let mut cheapest: Option<f64> = None;
    for conn in txn.outgoing(location)? {
        if conn.to == location {
            continue;
        }
        let dest = txn.get_location(conn.to)?;
        let cost = -(conn.resource_delta + dest.resource_delta);
        if cost > 0.0 {
            cheapest = Some(cheapest.map_or(cost, |best: f64| best.min(cost)));
        }
    }
    Ok(cheapest.unwrap_or(0.0))
}

/// Round a fractional horizon up to a tick offset, at least one tick out.
fn horizon_ticks(horizon: f64) -> u64 {
    if !horizon.is_finite() {
        return 1;
    }
    let ceiled = horizon.ceil();
    if ceiled <= 1.0 {
        return 1;
    }
    if ceiled >= 9_007_199_254_740_992.0 {
        return u64::MAX;
    }
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    {
        ceiled as u64
    }
}

/// Plan a home occupant's next event.
///
/// If the agent can already afford the cheapest exit, it is scheduled for
/// re-evaluation next tick. Otherwise the time to resource sufficiency is
/// weighed against a fall forecast that tracks the agent's mobility decline
/// while waiting: a moderate or severe fall arriving first plants a fall
/// release routed to the GP or Hospital; anything else plants a recovery
/// release (logging the fall and marking the agent Fallen first when the
/// forecast was mild).
///
/// # Errors
///
/// Returns [`StoreError`] if the agent or location cannot be read.
pub fn home_prediction<T: StateTxn>(
    txn: &mut T,
    rng: &mut SimRng,
    home: LocationId,
    agent: AgentId,
) -> Result<(), StoreError> {
    let now = txn.clock();
    let mut patient = txn.get_patient(agent)?;
    let location = txn.get_location(home)?;
    let min_cost = min_escape_cost(txn, home)?;

    let Some(dwell) = location.dwell else {
        txn.schedule_pending(home, now.saturating_add(1), PendingEntry {
            agent,
            planned: None,
            duration: None,
        })?;
        return Ok(());
    };

    if patient.resources >= min_cost {
        txn.schedule_pending(home, now.saturating_add(1), PendingEntry {
            agent,
            planned: None,
            duration: None,
        })?;
        return Ok(());
    }

    let recovery_time = if dwell.recovery_rate > 0.0 {
        (min_cost - patient.resources) / dwell.recovery_rate
    } else {
        f64::INFINITY
    };

    // Re-sample the forecast at each simulated waiting tick; mobility keeps
    // declining while the agent waits, which can pull the fall closer.
    let mut forecast = next_fall(rng, patient.mobility);
    let mut simulated = patient.mobility;
    let mut t: u64 = 1;
    while t < forecast.ticks {
        simulated += dwell.mobility_change;
        let resampled = next_fall(rng, simulated);
        let shifted = resampled.ticks.saturating_add(t);
        if shifted < forecast.ticks {
            forecast = FallForecast {
                ticks: shifted,
                severity: resampled.severity,
            };
        }
        t = t.saturating_add(1);
    }

    #[allow(clippy::cast_precision_loss)]
    let fall_at = forecast.ticks as f64;
    if fall_at < recovery_time && forecast.severity != FallSeverity::Mild {
        let target = if forecast.severity == FallSeverity::Severe {
            LocationKind::Hospital
        } else {
            LocationKind::Gp
        };
        let mut planned = None;
        for conn in txn.outgoing(home)? {
            if txn.get_location(conn.to)?.kind == target {
                planned = Some(conn.id);
                break;
            }
        }
        let due = now.saturating_add(forecast.ticks);
        patient.wellbeing = Wellbeing::Fallen;
        patient.log.push(LogEntry::new(forecast.severity.label(), due));
        txn.put_patient(patient)?;
        txn.schedule_pending(home, due, PendingEntry {
            agent,
            planned,
            duration: Some(fall_at),
        })?;
        debug!(agent = %agent, severity = ?forecast.severity, due, "fall predicted at home");
    } else {
        if forecast.severity == FallSeverity::Mild {
            let fall_due = now.saturating_add(forecast.ticks);
            patient.wellbeing = Wellbeing::Fallen;
            patient.log.push(LogEntry::new(FallSeverity::Mild.label(), fall_due));
            txn.put_patient(patient)?;
        }
        let due = now.saturating_add(horizon_ticks(recovery_time));
        txn.schedule_pending(home, due, PendingEntry {
            agent,
            planned: None,
            duration: Some(recovery_time),
        })?;
        debug!(agent = %agent, due, "recovery scheduled at home");
    }
    Ok(())
}

/// Admit an agent to hospital and plan the discharge.
///
/// The stay is a Poisson draw with mean `14 - 9 * min(mobility, 1)`, so a
/// fully mobile agent stays five ticks on average. The release entry is
/// routed along the edge back home and carries the stay as its duration.
///
/// # Errors
///
/// Returns [`StoreError`] if the agent or location cannot be read.
pub fn hospital_prediction<T: StateTxn>(
    txn: &mut T,
    rng: &mut SimRng,
    hospital: LocationId,
    agent: AgentId,
) -> Result<(), StoreError> {
    let now = txn.clock();
    let patient = txn.get_patient(agent)?;
    txn.append_log(agent, LogEntry::new(event_labels::HOSPITAL_ADMITTED, now))?;

    let mean = STAY_MOBILITY_FACTOR.mul_add(-patient.mobility.min(1.0), STAY_BASE);
    let stay = rng.poisson(mean);
    let mut planned = None;
    for conn in txn.outgoing(hospital)? {
        if txn.get_location(conn.to)?.kind == LocationKind::Home {
            planned = Some(conn.id);
            break;
        }
    }
    #[allow(clippy::cast_precision_loss)]
    let duration = stay as f64;
    txn.schedule_pending(hospital, now.saturating_add(stay), PendingEntry {
        agent,
        planned,
        duration: Some(duration),
    })?;
    debug!(agent = %agent, stay, "hospital stay planned");
    Ok(())
}
