//! The per-call line tracer.
//!
//! Installed as the thread's step hook while one traced call runs. For each
//! probe in the traced call's own frame it:
//! 1) resolves every watch spec into a snapshot
//! 2) diffs the snapshot against the previous line's
//! 3) drops the diff if the previous line carried the ignore marker
//! 4) reads this line's source (the file the probe reports) to decide whether
//!    the next diff is dropped
//! 5) appends surviving changes to the per-spec history
//! 6) keeps the snapshot as the new baseline
//!
//! A probe runs before its line's code, so the diff it computes is the effect
//! of the previous line. That is why a marker suppresses the diff of the
//! *next* probe.

use crate::diff;
use crate::frame::Frame;
use crate::hook::{Step, StepHook};
use crate::record::{Recorded, TraceRecord};
use crate::source::SourceProvider;
use crate::value::Value;
use crate::watch::WatchSpec;
use crate::watch::resolve::{self, Snapshot};
use std::sync::Arc;
use tracing::trace;

pub struct LineTracer {
    target: u64,
    file: Option<String>,
    specs: Arc<[WatchSpec]>,
    sources: Arc<dyn SourceProvider>,
    marker: Arc<str>,
    last: Option<Snapshot>,
    skip_next: bool,
    history: Vec<Vec<Value>>,
    lines: usize,
}

impl LineTracer {
    pub fn new(
        frame: &Frame,
        specs: Arc<[WatchSpec]>,
        sources: Arc<dyn SourceProvider>,
        marker: Arc<str>,
    ) -> Self {
        let history = vec![Vec::new(); specs.len()];
        Self {
            target: frame.id(),
            file: None,
            specs,
            sources,
            marker,
            last: None,
            skip_next: false,
            history,
            lines: 0,
        }
    }

    /// Number of probes traced so far.
    pub fn lines(&self) -> usize {
        self.lines
    }

    /// Source file reported by the first traced probe, if any ran.
    pub fn source_file(&self) -> Option<&str> {
        self.file.as_deref()
    }

    /// Take the finished record, leaving the tracer reset for another call.
    pub fn finish(&mut self) -> TraceRecord {
        let history = std::mem::replace(&mut self.history, vec![Vec::new(); self.specs.len()]);
        self.last = None;
        self.skip_next = false;
        self.lines = 0;
        self.file = None;

        TraceRecord::new(
            self.specs
                .iter()
                .zip(history)
                .map(|(spec, values)| (spec.text().to_string(), Recorded::from_history(values)))
                .collect(),
        )
    }

    fn is_marked(&self, file: &str, line: u32) -> bool {
        match self.sources.line(file, line) {
            Some(text) => text.contains(&*self.marker),
            None => false,
        }
    }
}

impl StepHook for LineTracer {
    fn on_step(&mut self, step: &Step<'_, '_>) {
        // probes from any other frame
        if step.frame.id() != self.target {
            return;
        }
        self.lines += 1;
        if self.file.is_none() {
            self.file = Some(step.file.to_string());
        }

        let current = resolve::snapshot(&self.specs, step.locals);
        let mut changed = diff::changed(&current, self.last.as_ref());

        if self.skip_next {
            trace!(line = step.line, dropped = changed.len(), "diff suppressed");
            changed.clear();
        }
        self.skip_next = self.is_marked(step.file, step.line);

        for (spec, history) in self.specs.iter().zip(self.history.iter_mut()) {
            if let Some(value) = changed.remove(spec.text()) {
                history.push(value);
            }
        }
        self.last = Some(current);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::Locals;
    use crate::source::{InlineSource, NoSource};
    use crate::watch::parse::parse_watch_specs;
    use pretty_assertions::assert_eq;

    const FILE: &str = "calc.rs";

    fn tracer(frame: &Frame, specs: &[&str], sources: Arc<dyn SourceProvider>) -> LineTracer {
        LineTracer::new(
            frame,
            parse_watch_specs(specs).unwrap().into(),
            sources,
            Arc::from("ztrace: ignore"),
        )
    }

    fn feed(t: &mut LineTracer, frame: &Frame, line: u32, res: Option<i64>) {
        feed_from(t, frame, FILE, line, res);
    }

    fn feed_from(t: &mut LineTracer, frame: &Frame, file: &str, line: u32, res: Option<i64>) {
        let mut locals = Locals::new();
        if let Some(res) = &res {
            locals.bind("res", res);
        }
        t.on_step(&Step {
            frame,
            file,
            line,
            locals: &locals,
        });
    }

    fn values(record: &TraceRecord, spec: &str) -> Vec<String> {
        record
            .get(spec)
            .unwrap()
            .values()
            .iter()
            .map(Value::repr)
            .collect()
    }

    #[test]
    fn records_changes_only() {
        let id = Frame::new("calc");
        let mut t = tracer(&id, &["res"], Arc::new(NoSource));
        feed(&mut t, &id, 1, None);
        feed(&mut t, &id, 2, Some(0));
        feed(&mut t, &id, 3, Some(0));
        feed(&mut t, &id, 4, Some(1));
        feed(&mut t, &id, 5, Some(3));
        assert_eq!(t.lines(), 5);
        assert_eq!(t.source_file(), Some(FILE));

        let record = t.finish();
        assert_eq!(values(&record, "res"), vec!["0", "1", "3"]);
        assert_eq!(t.lines(), 0);
        assert_eq!(t.source_file(), None);
    }

    #[test]
    fn other_frames_are_ignored() {
        let id = Frame::new("calc");
        let helper = Frame::new("helper");
        let again = Frame::new("calc");
        let mut t = tracer(&id, &["res"], Arc::new(NoSource));
        feed(&mut t, &id, 1, Some(1));
        feed(&mut t, &helper, 10, Some(99));
        feed(&mut t, &again, 10, Some(98));
        feed(&mut t, &id, 2, Some(2));

        assert_eq!(values(&t.finish(), "res"), vec!["1", "2"]);
    }

    #[test]
    fn marker_suppresses_the_following_diff() {
        let src = InlineSource::new().with_file(
            FILE,
            "res = 0\nres += 1 // ztrace: ignore\nres += 2\nend",
        );
        let id = Frame::new("calc");
        let mut t = tracer(&id, &["res"], Arc::new(src));
        feed(&mut t, &id, 1, None);
        feed(&mut t, &id, 2, Some(0)); // marker on this line
        feed(&mut t, &id, 3, Some(1)); // effect of line 2: dropped
        feed(&mut t, &id, 4, Some(3));

        assert_eq!(values(&t.finish(), "res"), vec!["0", "3"]);
    }

    #[test]
    fn suppressed_change_is_not_replayed() {
        // the dropped diff still moves the baseline, so an unchanged next
        // line records nothing
        let src = InlineSource::new().with_file(FILE, "a\nb // ztrace: ignore\nc\nd");
        let id = Frame::new("calc");
        let mut t = tracer(&id, &["res"], Arc::new(src));
        feed(&mut t, &id, 1, Some(0));
        feed(&mut t, &id, 2, Some(0));
        feed(&mut t, &id, 3, Some(5));
        feed(&mut t, &id, 4, Some(5));

        assert_eq!(values(&t.finish(), "res"), vec!["0"]);
    }

    #[test]
    fn never_resolved_spec_is_empty_sequence() {
        let id = Frame::new("calc");
        let mut t = tracer(&id, &["res", "missing"], Arc::new(NoSource));
        feed(&mut t, &id, 1, Some(7));
        feed(&mut t, &id, 2, Some(7));

        let record = t.finish();
        assert_eq!(record.get("res"), Some(&Recorded::Single(Value::Int(7))));
        assert_eq!(record.get("missing"), Some(&Recorded::Sequence(vec![])));
        let keys: Vec<&str> = record.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["res", "missing"]);
    }

    #[test]
    fn markers_follow_the_reporting_file() {
        // the same line number carries a marker in one file only
        let src = InlineSource::new()
            .with_file(FILE, "a\nb // ztrace: ignore\nc\nd")
            .with_file("lib/other.rs", "a\nb\nc\nd");
        let id = Frame::new("calc");
        let mut t = tracer(&id, &["res"], Arc::new(src));
        feed_from(&mut t, &id, "lib/other.rs", 1, None);
        feed_from(&mut t, &id, "lib/other.rs", 2, Some(0));
        feed_from(&mut t, &id, "lib/other.rs", 3, Some(1));
        feed_from(&mut t, &id, "lib/other.rs", 4, Some(3));

        assert_eq!(t.source_file(), Some("lib/other.rs"));
        assert_eq!(values(&t.finish(), "res"), vec!["0", "1", "3"]);
    }
}
