//! Finalized per-call trace records.

use crate::value::Value;
use serde::Serialize;
use serde::ser::{SerializeMap, Serializer};
use std::slice;

/// What was recorded for one watch spec during a call.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Recorded {
    /// Exactly one value was observed.
    Single(Value),
    /// Zero, or two and more values, in observation order.
    Sequence(Vec<Value>),
}

impl Recorded {
    /// Collapse a history: one value becomes [`Recorded::Single`].
    pub fn from_history(mut values: Vec<Value>) -> Self {
        if values.len() == 1 {
            Recorded::Single(values.remove(0))
        } else {
            Recorded::Sequence(values)
        }
    }

    pub fn values(&self) -> &[Value] {
        match self {
            Recorded::Single(v) => slice::from_ref(v),
            Recorded::Sequence(vs) => vs,
        }
    }
}

/// Watch spec -> recorded values, in watch order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TraceRecord {
    entries: Vec<(String, Recorded)>,
}

impl TraceRecord {
    pub fn new(entries: Vec<(String, Recorded)>) -> Self {
        Self { entries }
    }

    pub fn get(&self, spec: &str) -> Option<&Recorded> {
        self.entries
            .iter()
            .find(|(k, _)| k == spec)
            .map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Recorded)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for TraceRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (k, v) in &self.entries {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

/// One persisted call: the record plus the local time it was submitted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogEntry {
    pub data: TraceRecord,
    pub time: String,
}
