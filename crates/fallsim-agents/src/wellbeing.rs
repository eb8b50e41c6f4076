//! The wellbeing state machine.
//!
//! Wellbeing is re-evaluated after every mobility-affecting update: edge
//! payment, destination learning, dwell decay, and fall injection. The
//! check is a pure function so every call site shares one rule set.

use fallsim_types::{FallSeverity, Wellbeing};

/// Evaluate a wellbeing transition.
///
/// Returns the new state when a transition applies, `None` otherwise. The
/// rules, in priority order:
///
/// 1. A moderate or severe fall forces [`Wellbeing::Fallen`].
/// 2. Mobility at or below zero forces [`Wellbeing::Fallen`].
/// 3. Mobility above 1 restores [`Wellbeing::Healthy`].
/// 4. A healthy agent at mobility 1 or below becomes [`Wellbeing::AtRisk`].
///
/// The function is idempotent: feeding its own output back with the same
/// inputs yields `None`.
pub fn wellbeing_check(
    current: Wellbeing,
    mobility: f64,
    fall_hint: Option<FallSeverity>,
) -> Option<Wellbeing> {
    if let Some(severity) = fall_hint
        && severity != FallSeverity::Mild
    {
        return (current != Wellbeing::Fallen).then_some(Wellbeing::Fallen);
    }
    if mobility <= 0.0 {
        return (current != Wellbeing::Fallen).then_some(Wellbeing::Fallen);
    }
    if mobility > 1.0 {
        return (current != Wellbeing::Healthy).then_some(Wellbeing::Healthy);
    }
    (current == Wellbeing::Healthy).then_some(Wellbeing::AtRisk)
}
