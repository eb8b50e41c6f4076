//! Inclination reinforcement.
//!
//! After each move the agent's choice weights shift: the taken edge kind is
//! reinforced when the move cost resources and discouraged when it yielded
//! them, then threshold rules bias the vector based on the agent's current
//! resources, mood, and mobility. All decrements floor at zero.

use fallsim_types::{EdgeKind, Patient};

use crate::rng::positive;

fn bump(patient: &mut Patient, kind: EdgeKind, delta: f64) {
    if let Some(slot) = patient.inclination.get_mut(kind.index()) {
        *slot = positive(*slot + delta);
    }
}

/// Apply the post-move reinforcement rules.
///
/// `taken` is the kind of the traversed connection and `resource_change`
/// the net resource delta the whole move produced (edge payment plus
/// destination learning).
pub fn reinforce(patient: &mut Patient, taken: EdgeKind, resource_change: f64) {
    if resource_change < 0.0 {
        bump(patient, taken, 1.0);
    } else if resource_change > 0.0 {
        bump(patient, taken, -1.0);
    }

    if patient.resources > 0.8 {
        bump(patient, EdgeKind::Social, 1.0);
    } else if patient.resources < 0.2 {
        bump(patient, EdgeKind::Inactive, 1.0);
    }

    if patient.mood > 0.8 {
        bump(patient, EdgeKind::Social, -1.0);
        bump(patient, EdgeKind::Inactive, 1.0);
    } else if patient.mood < 0.2 {
        bump(patient, EdgeKind::Social, 1.0);
        bump(patient, EdgeKind::Inactive, -1.0);
    }

    if patient.mobility < 0.4 {
        bump(patient, EdgeKind::Medical, 1.0);
        bump(patient, EdgeKind::Inactive, 1.0);
    } else if patient.mobility > 0.8 {
        bump(patient, EdgeKind::Inactive, -1.0);
    }
}
