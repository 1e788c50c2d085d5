//! Three-way classification of local activities against remote events.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use eventsync_domain::{Activity, CorrelationKey, RemoteEvent};
use tracing::warn;

use super::converter::EventConverter;

/// An activity whose remote event is out of date, paired with that event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdatePair {
    pub activity: Activity,
    pub existing: RemoteEvent,
}

/// Outcome of correlating one window. Every list is ordered by correlation
/// key ascending.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reconciliation {
    pub to_create: Vec<Activity>,
    pub to_update: Vec<UpdatePair>,
    pub to_remove: Vec<RemoteEvent>,
    pub unchanged: Vec<CorrelationKey>,
    /// Remote events without a correlation key; never touched.
    pub foreign: usize,
}

impl Reconciliation {
    /// No remote writes are needed.
    pub fn is_empty(&self) -> bool {
        self.to_create.is_empty() && self.to_update.is_empty() && self.to_remove.is_empty()
    }
}

/// Correlate `activities` with `events`.
///
/// Keyed events that no activity claims are scheduled for removal. When
/// several events carry the same key, the first one listed is kept for
/// correlation and the rest are removed.
pub fn reconcile(
    converter: &EventConverter,
    activities: Vec<Activity>,
    events: Vec<RemoteEvent>,
) -> Reconciliation {
    let mut result = Reconciliation::default();
    let mut keyed: BTreeMap<CorrelationKey, RemoteEvent> = BTreeMap::new();
    let mut duplicates = Vec::new();

    for event in events {
        let Some(key) = event.correlation_key() else {
            result.foreign += 1;
            continue;
        };
        match keyed.entry(key) {
            Entry::Vacant(slot) => {
                slot.insert(event);
            }
            Entry::Occupied(_) => {
                warn!(key = %key, event = %event.describe(), "duplicate remote event for key");
                duplicates.push((key, event));
            }
        }
    }

    let mut activities = activities;
    activities.sort_by_key(Activity::correlation_key);

    for activity in activities {
        let key = activity.correlation_key();
        match keyed.remove(&key) {
            None => result.to_create.push(activity),
            Some(existing) if converter.is_current(&existing, &activity) => {
                result.unchanged.push(key);
            }
            Some(existing) => result.to_update.push(UpdatePair { activity, existing }),
        }
    }

    let mut removals: Vec<(CorrelationKey, RemoteEvent)> = keyed.into_iter().collect();
    removals.extend(duplicates);
    removals.sort_by_key(|(key, _)| *key);
    result.to_remove = removals.into_iter().map(|(_, event)| event).collect();

    result
}
