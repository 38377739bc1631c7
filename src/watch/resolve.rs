//! Resolution of watch specs against the locals of one traced line.
//!
//! Resolution never fails loudly: a missing local, key or attribute, an index
//! out of range, or an access that does not fit the value's shape just leaves
//! the spec out of this line's snapshot. The object may not have that shape
//! yet (e.g. before a map key is inserted).

use crate::frame::Locals;
use crate::value::{Key, Value};
use crate::watch::{Access, WatchSpec};
use std::collections::BTreeMap;
use tracing::trace;

/// Spec text -> deep-copied value, for one traced line.
pub type Snapshot = BTreeMap<String, Value>;

impl WatchSpec {
    /// Resolve against a line's locals.
    pub fn resolve(&self, locals: &Locals<'_>) -> Option<Value> {
        let root = locals.get(self.root())?.to_value();
        self.resolve_in(&root)
    }

    /// Apply the access path to an already-converted root value.
    pub fn resolve_in(&self, root: &Value) -> Option<Value> {
        walk(root, self.path())
    }
}

/// Resolve every spec. Each watched root is converted once per line even
/// when several specs share it.
pub fn snapshot(specs: &[WatchSpec], locals: &Locals<'_>) -> Snapshot {
    let mut roots: BTreeMap<&str, Option<Value>> = BTreeMap::new();
    let mut out = Snapshot::new();
    for spec in specs {
        let root = roots
            .entry(spec.root())
            .or_insert_with(|| locals.get(spec.root()).map(|v| v.to_value()));
        let Some(root) = root else {
            continue;
        };
        if let Some(v) = spec.resolve_in(root) {
            out.insert(spec.text().to_string(), v);
        }
    }
    out
}

fn walk(value: &Value, path: &[Access]) -> Option<Value> {
    let Some((step, rest)) = path.split_first() else {
        return Some(value.clone());
    };
    match (value, step) {
        (Value::Object { fields, .. }, Access::Attr(name)) => walk(fields.get(name)?, rest),
        (Value::List(items) | Value::Tuple(items), Access::Index(i)) => {
            walk(items.get(normalize(*i, items.len())?)?, rest)
        }
        (Value::Str(s), Access::Index(i)) => {
            let len = s.chars().count();
            let c = s.chars().nth(normalize(*i, len)?)?;
            walk(&Value::Str(c.to_string()), rest)
        }
        (Value::Array(arr), Access::Index(i)) => {
            let item = arr.index(normalize(*i, arr.len())?)?;
            walk(&item, rest)
        }
        (Value::Map(entries), Access::Index(i)) => walk(entries.get(&Key::Int(*i))?, rest),
        (Value::Map(entries), Access::Key(k)) => walk(entries.get(&Key::Str(k.clone()))?, rest),
        _ => {
            trace!(kind = value.kind(), access = ?step, "access does not fit value");
            None
        }
    }
}

/// Negative indices count from the end.
fn normalize(idx: i64, len: usize) -> Option<usize> {
    let len = i64::try_from(len).ok()?;
    let idx = if idx < 0 { idx + len } else { idx };
    if (0..len).contains(&idx) {
        Some(idx as usize)
    } else {
        None
    }
}
