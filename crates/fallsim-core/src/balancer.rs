//! Hysteresis-based intervention capacity balancing.
//!
//! Once per tick the balancer samples how long ago the current
//! intervention attendees were last discharged from hospital. The running
//! history of that signal drives two guarded adjustments: sustained growth
//! of the interval raises the programme's capacity, sustained shrinkage
//! lowers it. In dynamic mode capacity shifts between the referral-gated
//! programme and its open-access sibling instead of being created or
//! destroyed.

use fallsim_store::{StateTxn, StoreError};
use fallsim_types::{LocationId, event_labels};
use tracing::info;

/// Samples required before any adjustment is considered.
const HISTORY_WINDOW: usize = 20;

/// How far back the trend comparison reaches.
const TREND_LOOKBACK: usize = 5;

/// Trend threshold (lookback minus latest) below which the interval counts
/// as worsening.
const GROW_TREND: f64 = -1.0;

/// Interval level separating the grow and shrink regimes.
const INTERVAL_PIVOT: f64 = 5.0;

/// Fallback sample when there are no attendees and no history yet.
const DEFAULT_INTERVAL: f64 = 14.0;

/// An adjustment the balancer made this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BalanceAction {
    /// Intervention capacity went up by one.
    Grew,
    /// Intervention capacity went down by one.
    Shrank,
}

/// Rolling capacity balancer for the intervention programme.
#[derive(Debug, Clone, Default)]
pub struct CapacityBalancer {
    history: Vec<f64>,
}

impl CapacityBalancer {
    /// Create a balancer with no history.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            history: Vec::new(),
        }
    }

    /// Samples collected since the last adjustment.
    #[must_use]
    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    /// Mean ticks since last hospital discharge over current attendees.
    ///
    /// Attendees who were never discharged are skipped. With no usable
    /// sample the previous value is carried forward, or the default when
    /// the history is empty.
    fn sample<T: StateTxn>(&self, txn: &T, intervention: LocationId) -> Result<f64, StoreError> {
        let now = txn.clock();
        let mut times = Vec::new();
        for agent in txn.patients_at(intervention)? {
            let patient = txn.get_patient(agent)?;
            if let Some(entry) = patient
                .log
                .iter()
                .rev()
                .find(|e| e.label == event_labels::HOSPITAL_DISCHARGE)
            {
                #[allow(clippy::cast_precision_loss)]
                times.push(now.saturating_sub(entry.tick) as f64);
            }
        }
        if times.is_empty() {
            return Ok(self.history.last().copied().unwrap_or(DEFAULT_INTERVAL));
        }
        #[allow(clippy::cast_precision_loss)]
        Ok(times.iter().sum::<f64>() / times.len() as f64)
    }

    /// Record this tick's sample and adjust capacity when the guarded
    /// trend conditions hold. The history resets after every adjustment.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if attendee or location reads fail.
    pub fn observe<T: StateTxn>(
        &mut self,
        txn: &mut T,
        intervention: LocationId,
        open: Option<LocationId>,
        dynamic: bool,
    ) -> Result<Option<BalanceAction>, StoreError> {
        let sample = self.sample(txn, intervention)?;
        self.history.push(sample);
        if self.history.len() < HISTORY_WINDOW {
            return Ok(None);
        }
        let Some(&latest) = self.history.last() else {
            return Ok(None);
        };
        let Some(&lookback) = self.history.get(self.history.len().saturating_sub(TREND_LOOKBACK))
        else {
            return Ok(None);
        };
        let trend = lookback - latest;

        if trend < GROW_TREND && latest > INTERVAL_PIVOT {
            if dynamic {
                let Some(open) = open else {
                    return Ok(None);
                };
                let open_cap = txn.get_location(open)?.capacity.unwrap_or(0);
                if open_cap == 0 {
                    return Ok(None);
                }
                let cap = txn.get_location(intervention)?.capacity.unwrap_or(0);
                txn.set_capacity(intervention, cap.saturating_add(1))?;
                txn.set_capacity(open, open_cap.saturating_sub(1))?;
            } else {
                let cap = txn.get_location(intervention)?.capacity.unwrap_or(0);
                txn.set_capacity(intervention, cap.saturating_add(1))?;
            }
            self.history.clear();
            info!(latest, trend, "intervention capacity raised");
            return Ok(Some(BalanceAction::Grew));
        }

        if trend > 0.0 && latest < INTERVAL_PIVOT {
            let cap = txn.get_location(intervention)?.capacity.unwrap_or(0);
            if cap == 0 {
                return Ok(None);
            }
            txn.set_capacity(intervention, cap.saturating_sub(1))?;
            if dynamic && let Some(open) = open {
                let open_cap = txn.get_location(open)?.capacity.unwrap_or(0);
                txn.set_capacity(open, open_cap.saturating_add(1))?;
            }
            self.history.clear();
            info!(latest, trend, "intervention capacity lowered");
            return Ok(Some(BalanceAction::Shrank));
        }

        Ok(None)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use fallsim_agents::ContactGraph;
    use fallsim_store::MemoryStore;
    use fallsim_world::{NetworkHandles, NetworkOptions, standard_network};

    use super::*;

    fn make_store(open: bool) -> (MemoryStore, NetworkHandles) {
        let options = NetworkOptions {
            intervention_capacity: 2,
            open_intervention: open,
            open_intervention_capacity: 4,
            open_intervention_allowed: Vec::new(),
        };
        let (network, handles) = standard_network(&options).unwrap();
        let store = MemoryStore::new(network);
        store
            .seed(Vec::new(), Vec::new(), ContactGraph::new())
            .unwrap();
        (store, handles)
    }

    fn balancer_with_history(history: &[f64]) -> CapacityBalancer {
        let mut balancer = CapacityBalancer::new();
        balancer.history = history.to_vec();
        balancer
    }

    #[test]
    fn short_history_never_adjusts() {
        let (store, handles) = make_store(false);
        let mut txn = store.begin().unwrap();
        let mut balancer = balancer_with_history(&[20.0; 10]);
        let action = balancer
            .observe(&mut txn, handles.intervention, None, false)
            .unwrap();
        assert!(action.is_none());
        assert_eq!(balancer.history_len(), 11);
        assert_eq!(
            txn.get_location(handles.intervention).unwrap().capacity,
            Some(2)
        );
    }

    #[test]
    fn worsening_interval_grows_capacity_and_resets() {
        let (store, handles) = make_store(false);
        let mut txn = store.begin().unwrap();
        // No attendees: the sample repeats the last value, 10.0. The
        // lookback entry (6.0) minus the latest (10.0) is well under -1.
        let mut history = vec![14.0; 15];
        history.extend([6.0, 10.0, 10.0, 10.0]);
        let mut balancer = balancer_with_history(&history);
        let action = balancer
            .observe(&mut txn, handles.intervention, None, false)
            .unwrap();
        assert_eq!(action, Some(BalanceAction::Grew));
        assert_eq!(balancer.history_len(), 0);
        assert_eq!(
            txn.get_location(handles.intervention).unwrap().capacity,
            Some(3)
        );
    }

    #[test]
    fn improving_low_interval_shrinks_capacity() {
        let (store, handles) = make_store(false);
        let mut txn = store.begin().unwrap();
        // Sample repeats the last value, 2.0; lookback 4.0 gives a
        // positive trend with the latest under the pivot.
        let mut history = vec![14.0; 15];
        history.extend([4.0, 2.0, 2.0, 2.0]);
        let mut balancer = balancer_with_history(&history);
        let action = balancer
            .observe(&mut txn, handles.intervention, None, false)
            .unwrap();
        assert_eq!(action, Some(BalanceAction::Shrank));
        assert_eq!(balancer.history_len(), 0);
        assert_eq!(
            txn.get_location(handles.intervention).unwrap().capacity,
            Some(1)
        );
    }

    #[test]
    fn dynamic_grow_shifts_from_open_pool() {
        let (store, handles) = make_store(true);
        let open = handles.intervention_open.unwrap();
        let mut txn = store.begin().unwrap();
        let mut history = vec![14.0; 15];
        history.extend([6.0, 10.0, 10.0, 10.0]);
        let mut balancer = balancer_with_history(&history);
        let action = balancer
            .observe(&mut txn, handles.intervention, Some(open), true)
            .unwrap();
        assert_eq!(action, Some(BalanceAction::Grew));
        assert_eq!(
            txn.get_location(handles.intervention).unwrap().capacity,
            Some(3)
        );
        assert_eq!(txn.get_location(open).unwrap().capacity, Some(3));
    }

    #[test]
    fn dynamic_grow_needs_spare_open_capacity() {
        let (store, handles) = make_store(true);
        let open = handles.intervention_open.unwrap();
        let mut txn = store.begin().unwrap();
        txn.set_capacity(open, 0).unwrap();
        let mut history = vec![14.0; 15];
        history.extend([6.0, 10.0, 10.0, 10.0]);
        let mut balancer = balancer_with_history(&history);
        let action = balancer
            .observe(&mut txn, handles.intervention, Some(open), true)
            .unwrap();
        assert!(action.is_none());
        assert_eq!(
            txn.get_location(handles.intervention).unwrap().capacity,
            Some(2)
        );
    }

    #[test]
    fn shrink_stops_at_zero_capacity() {
        let (store, handles) = make_store(false);
        let mut txn = store.begin().unwrap();
        txn.set_capacity(handles.intervention, 0).unwrap();
        let mut history = vec![14.0; 15];
        history.extend([4.0, 2.0, 2.0, 2.0]);
        let mut balancer = balancer_with_history(&history);
        let action = balancer
            .observe(&mut txn, handles.intervention, None, false)
            .unwrap();
        assert!(action.is_none());
    }

    #[test]
    fn steady_interval_holds_capacity() {
        let (store, handles) = make_store(false);
        let mut txn = store.begin().unwrap();
        let mut balancer = balancer_with_history(&[14.0; 25]);
        let action = balancer
            .observe(&mut txn, handles.intervention, None, false)
            .unwrap();
        assert!(action.is_none());
        assert_eq!(
            txn.get_location(handles.intervention).unwrap().capacity,
            Some(2)
        );
    }
}
