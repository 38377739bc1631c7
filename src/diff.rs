//! Change detection between two line snapshots.

use crate::watch::resolve::Snapshot;

/// Entries of `current` that changed since `last`.
///
/// With no baseline (first traced line of a call) everything counts as
/// changed. Otherwise an entry changed when it is new or when its canonical
/// repr differs: structurally equal values never count as a change, whatever
/// object they were copied from.
pub fn changed(current: &Snapshot, last: Option<&Snapshot>) -> Snapshot {
    let Some(last) = last else {
        return current.clone();
    };

    current
        .iter()
        .filter(|(key, value)| match last.get(*key) {
            None => true,
            Some(prev) => prev.repr() != value.repr(),
        })
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}
