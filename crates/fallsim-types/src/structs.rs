//! Core entity structs for the fallsim care-network simulation.
//!
//! Covers the agent records (`Patient`, `Carer`), the network records
//! (`Location`, `Connection`), the pending-queue entry, and the append-only
//! event log.

use serde::{Deserialize, Serialize};

use crate::enums::{EdgeKind, LocationKind, Wellbeing};
use crate::ids::{AgentId, ConnectionId, LocationId};

// ---------------------------------------------------------------------------
// Event log
// ---------------------------------------------------------------------------

/// A single entry in an agent's append-only event log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// What happened (see [`event_labels`] for the well-known values).
    pub label: String,
    /// The tick at which it happened.
    pub tick: u64,
}

impl LogEntry {
    /// Create a log entry from a label and tick.
    pub fn new(label: impl Into<String>, tick: u64) -> Self {
        Self {
            label: label.into(),
            tick,
        }
    }
}

/// Well-known event-log label constants.
///
/// Fall and wellbeing labels come from [`crate::FallSeverity::label`] and
/// [`crate::Wellbeing::label`]; the constants here cover the remaining
/// location-driven events.
pub mod event_labels {
    /// Agent left the hospital through the decision pipeline.
    pub const DISCHARGED: &str = "Discharged";
    /// Hospital released the agent at the end of a predicted stay.
    pub const HOSPITAL_DISCHARGE: &str = "Hospital discharge";
    /// Hospital admitted the agent and scheduled a stay.
    pub const HOSPITAL_ADMITTED: &str = "Hospital admitted";
    /// Agent entered the terminal care sink.
    pub const CARE_ADMISSION: &str = "Care admission";
    /// Agent attended an intervention session.
    pub const INTERVENTION_ATTENDANCE: &str = "Intervention attendance";
}

// ---------------------------------------------------------------------------
// Agents
// ---------------------------------------------------------------------------

/// A patient moving through the care network.
///
/// All scalar attributes are floored at 0 by every update; `mobility` above
/// 1 means fully mobile. The inclination vector is indexed by
/// [`EdgeKind::index`] and weights the choice phase of the decision
/// pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Patient {
    /// Stable identifier.
    pub id: AgentId,
    /// Physical mobility; the central declining attribute.
    pub mobility: f64,
    /// Confidence; gates connections via their mood barrier.
    pub mood: f64,
    /// Spendable resources (energy); pays for movement.
    pub resources: f64,
    /// Choice weights indexed by [`EdgeKind::index`].
    pub inclination: [f64; 4],
    /// Current wellbeing state.
    pub wellbeing: Wellbeing,
    /// Where the agent currently is.
    pub location: LocationId,
    /// Whether the agent holds a referral for gated connections.
    pub referral: bool,
    /// Append-only event history.
    pub log: Vec<LogEntry>,
}

impl Patient {
    /// Inclination weight for a connection kind.
    pub fn inclination_for(&self, kind: EdgeKind) -> f64 {
        self.inclination.get(kind.index()).copied().unwrap_or(0.0)
    }
}

/// A carer backing one or more patients with a shared resource pool.
///
/// Carers never move; they exist in the contact graph and top up a linked
/// patient's payment when it would otherwise fail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Carer {
    /// Stable identifier.
    pub id: AgentId,
    /// Remaining support pool.
    pub resources: f64,
}

// ---------------------------------------------------------------------------
// Network records
// ---------------------------------------------------------------------------

/// Per-tick attribute drift applied to agents waiting at a queued location,
/// scaled by the duration of the stay.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DwellRates {
    /// Mobility change per tick (negative: decline).
    pub mobility_change: f64,
    /// Resource recovery per tick.
    pub recovery_rate: f64,
    /// Confidence change per tick (negative: decline).
    pub confidence_change: f64,
}

/// A node in the care network.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    /// Stable identifier.
    pub id: LocationId,
    /// Display name ("Home", "Hospital", ...).
    pub name: String,
    /// Behavioral category.
    pub kind: LocationKind,
    /// Resource delta applied on arrival (learning phase).
    pub resource_delta: f64,
    /// Mobility delta applied on arrival.
    pub mobility_delta: f64,
    /// Confidence delta applied on arrival.
    pub confidence_delta: f64,
    /// Maximum simultaneous occupants, for capacitated kinds.
    pub capacity: Option<u32>,
    /// Current load counter, for capacitated kinds.
    pub load: u32,
    /// Waiting drift rates, for queued kinds.
    pub dwell: Option<DwellRates>,
}

/// A directed edge in the care network.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Connection {
    /// Stable identifier.
    pub id: ConnectionId,
    /// Origin location.
    pub from: LocationId,
    /// Destination location.
    pub to: LocationId,
    /// Category tag; indexes the inclination vector.
    pub kind: EdgeKind,
    /// Minimum mood required to consider this connection.
    pub mood_barrier: f64,
    /// Resource delta paid when traversing (negative: cost).
    pub resource_delta: f64,
    /// Mobility delta applied when traversing.
    pub mobility_delta: f64,
    /// Confidence delta applied when traversing.
    pub confidence_delta: f64,
    /// Wellbeing states admitted through this connection; `None` admits all.
    pub allowed: Option<Vec<Wellbeing>>,
    /// Whether traversal requires a referral.
    pub requires_referral: bool,
}

impl Connection {
    /// Whether an agent in the given wellbeing state may perceive this
    /// connection.
    pub fn admits(&self, wellbeing: Wellbeing) -> bool {
        self.allowed
            .as_ref()
            .is_none_or(|states| states.contains(&wellbeing))
    }
}

// ---------------------------------------------------------------------------
// Pending queue
// ---------------------------------------------------------------------------

/// A scheduled release from a queued location.
///
/// Entries live in the owning location's time-indexed pending table. A
/// `planned` connection forces the release to follow that edge; a `duration`
/// scales the dwell drift applied on release.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingEntry {
    /// The waiting agent.
    pub agent: AgentId,
    /// Pre-chosen connection for the release, if the outcome is decided.
    pub planned: Option<ConnectionId>,
    /// Length of the stay in ticks, for dwell scaling.
    pub duration: Option<f64>,
}
