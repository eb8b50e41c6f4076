//! Enumeration types for the fallsim care-network simulation.

use serde::{Deserialize, Serialize};

/// An agent's current wellbeing state.
///
/// Transitions are governed by the wellbeing state machine in
/// `fallsim-agents`: a fall or zero mobility forces [`Wellbeing::Fallen`],
/// mobility above 1 restores [`Wellbeing::Healthy`], and a healthy agent
/// whose mobility drops to 1 or below becomes [`Wellbeing::AtRisk`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Wellbeing {
    /// Mobility comfortably above the at-risk threshold.
    Healthy,
    /// Mobility at or below 1; the agent is vulnerable to falls.
    AtRisk,
    /// The agent has fallen (or mobility reached zero) and has not recovered.
    Fallen,
}

impl Wellbeing {
    /// Human-readable label used in agent event logs.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Healthy => "Healthy",
            Self::AtRisk => "At risk",
            Self::Fallen => "Fallen",
        }
    }
}

/// Severity of a fall, from an instantaneous classification or a prediction.
///
/// Ordering matters: `Severe > Moderate > Mild`, and ties in predicted fall
/// times break toward the more severe outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum FallSeverity {
    /// Agent recovers in place; no care escalation.
    Mild,
    /// Agent is routed to the GP.
    Moderate,
    /// Agent is routed to hospital.
    Severe,
}

impl FallSeverity {
    /// Event-log label for a fall of this severity.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Mild => "Mild Fall",
            Self::Moderate => "Moderate Fall",
            Self::Severe => "Severe Fall",
        }
    }
}

/// Category tag on a connection, indexing the agent's inclination vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EdgeKind {
    /// Social visits: friends, community venues.
    Social,
    /// Edges taken as the result of a fall.
    Fall,
    /// Medical pathways: GP, hospital, intervention programmes.
    Medical,
    /// Staying home or other low-activity options.
    Inactive,
}

impl EdgeKind {
    /// Position of this kind in an agent's inclination vector.
    pub const fn index(self) -> usize {
        match self {
            Self::Social => 0,
            Self::Fall => 1,
            Self::Medical => 2,
            Self::Inactive => 3,
        }
    }
}

/// The behavioral category of a location in the care network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum LocationKind {
    /// Queued residence; agents wait here between activities and falls.
    Home,
    /// Queued clinical ward with predicted length of stay.
    Hospital,
    /// Triage router: sends agents to hospital or back home.
    Gp,
    /// Community venue reached through social edges.
    Social,
    /// Capacity-limited falls-prevention programme (referral required).
    Intervention,
    /// Open-access variant of the intervention programme.
    InterventionOpen,
    /// Terminal sink; agents admitted here leave the simulation.
    Care,
}

impl LocationKind {
    /// Whether this kind owns a pending event queue.
    pub const fn is_queued(self) -> bool {
        matches!(self, Self::Home | Self::Hospital)
    }

    /// Whether this kind tracks capacity and load.
    pub const fn is_capacitated(self) -> bool {
        matches!(self, Self::Intervention | Self::InterventionOpen)
    }
}
