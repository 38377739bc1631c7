//! Trace sessions and function wrappers.
//!
//! A [`Session`] owns the record sink and the source lookup. It hands out
//! [`Tracer`]s for fixed watch lists, which wrap instrumented functions into
//! [`Traced`] callables:
//!
//! ```
//! use ztrace::{Config, Frame, MemorySink, Session, step};
//!
//! #[rustfmt::skip]
//! fn accumulate(frame: &Frame, t: i64) -> i64 {
//!     step!(frame; t);      let mut res = 0;
//!     for i in 0..t {
//!         step!(frame; t, res); res += i;
//!     }
//!     step!(frame; t, res);
//!     res
//! }
//!
//! let session = Session::with_sink(Config::default(), MemorySink::new());
//! let traced = session.trace(["res"]).unwrap().wrap(accumulate);
//! assert_eq!(traced.call(3), 3);
//! assert_eq!(session.inspect(|sink| sink.submissions()).unwrap(), 1);
//! ```

use crate::Result;
use crate::config::Config;
use crate::frame::{Frame, FunctionId};
use crate::hook;
use crate::record::{LogEntry, TraceRecord};
use crate::sink::{JsonFileSink, Sink, timestamp};
use crate::source::{FileSource, SourceProvider};
use crate::tracer::LineTracer;
use crate::watch::WatchSpec;
use crate::watch::parse::parse_watch_specs;
use anyhow::{anyhow, bail};
use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;
use std::sync::{Arc, Mutex, OnceLock};
use tracing::{debug, error, warn};

pub struct Session<S = JsonFileSink> {
    config: Arc<Config>,
    sink: Arc<Mutex<S>>,
    sources: Arc<dyn SourceProvider>,
}

impl<S> Clone for Session<S> {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            sink: self.sink.clone(),
            sources: self.sources.clone(),
        }
    }
}

impl Session<JsonFileSink> {
    /// Open a session logging to `<log_dir>/<YYYYMMDD>/<HHMMSS>.json`.
    pub fn open(config: Config) -> Result<Self> {
        let sink = JsonFileSink::in_dir(&config.log_dir)?;
        debug!(path = %sink.path().display(), "trace session opened");
        Ok(Self::with_sink(config, sink))
    }

    pub fn log_path(&self) -> Result<PathBuf> {
        self.inspect(|sink| sink.path().to_path_buf())
    }
}

impl<S: Sink> Session<S> {
    pub fn with_sink(config: Config, sink: S) -> Self {
        let sources = Arc::new(FileSource::new(config.source_root.clone()));
        Self {
            config: Arc::new(config),
            sink: Arc::new(Mutex::new(sink)),
            sources,
        }
    }

    /// Replace the source lookup used for ignore markers.
    pub fn with_sources(mut self, sources: Arc<dyn SourceProvider>) -> Self {
        self.sources = sources;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// A tracer watching `specs`. Specs are parsed here; duplicates are
    /// dropped, keeping the first occurrence.
    pub fn trace<I, T>(&self, specs: I) -> Result<Tracer<S>>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        let mut parsed: Vec<WatchSpec> = Vec::new();
        for spec in parse_watch_specs(specs)? {
            if !parsed.iter().any(|p| p.text() == spec.text()) {
                parsed.push(spec);
            }
        }
        if parsed.is_empty() {
            bail!("a tracer needs at least one watch spec");
        }
        Ok(Tracer {
            session: self.clone(),
            specs: parsed.into(),
        })
    }

    /// Append a finished record under the function's log key.
    pub fn submit(&self, function: &FunctionId, record: TraceRecord) -> Result<()> {
        let entry = LogEntry {
            data: record,
            time: timestamp(),
        };
        let key = function.log_key();
        let mut sink = self.lock()?;
        sink.submit(&key, entry)
    }

    pub fn flush(&self) -> Result<()> {
        self.lock()?.flush()
    }

    /// Read access to the sink.
    pub fn inspect<T>(&self, f: impl FnOnce(&S) -> T) -> Result<T> {
        let sink = self.lock()?;
        Ok(f(&sink))
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, S>> {
        self.sink
            .lock()
            .map_err(|_| anyhow!("trace sink lock poisoned"))
    }
}

/// Watch list bound to a session.
pub struct Tracer<S = JsonFileSink> {
    session: Session<S>,
    specs: Arc<[WatchSpec]>,
}

impl<S: Sink> Tracer<S> {
    pub fn specs(&self) -> &[WatchSpec] {
        &self.specs
    }

    /// Wrap the function item `f`, identified by its name and the file its
    /// probes report. Until a traced call has run a probe, the file is the
    /// one `wrap` was called from.
    #[track_caller]
    pub fn wrap<F>(&self, f: F) -> Traced<F, S> {
        let file = std::panic::Location::caller().file();
        self.build(FunctionId::of::<F>(file), true, f)
    }

    /// Wrap `f` under an explicit identity.
    pub fn wrap_as<F>(&self, function: FunctionId, f: F) -> Traced<F, S> {
        self.build(function, false, f)
    }

    fn build<F>(&self, function: FunctionId, locate: bool, f: F) -> Traced<F, S> {
        // the disable switch is consulted once, here
        let session = if self.session.config.disabled {
            debug!(%function, "tracing disabled; wrapper is a pass-through");
            None
        } else {
            Some(self.session.clone())
        };
        Traced {
            f,
            function,
            located: OnceLock::new(),
            locate,
            specs: self.specs.clone(),
            session,
        }
    }
}

/// An instrumented function that records its watched values on every call.
pub struct Traced<F, S = JsonFileSink> {
    f: F,
    function: FunctionId,
    // identity with the file taken from the probes, once known
    located: OnceLock<FunctionId>,
    locate: bool,
    specs: Arc<[WatchSpec]>,
    session: Option<Session<S>>,
}

impl<F, S: Sink> Traced<F, S> {
    pub fn function(&self) -> &FunctionId {
        self.located.get().unwrap_or(&self.function)
    }

    pub fn is_enabled(&self) -> bool {
        self.session.is_some()
    }

    /// Call the function. A record that cannot be persisted is logged and
    /// stays in the sink for the next flush.
    pub fn call<A, R>(&self, args: A) -> R
    where
        F: Fn(&Frame, A) -> R,
    {
        let (out, submitted) = self.invoke(args);
        if let Err(err) = submitted {
            error!(function = %self.function(), "failed to persist trace record: {:#}", err);
        }
        out
    }

    /// Call the function, returning persistence failures to the caller.
    pub fn try_call<A, R>(&self, args: A) -> Result<R>
    where
        F: Fn(&Frame, A) -> R,
    {
        let (out, submitted) = self.invoke(args);
        submitted?;
        Ok(out)
    }

    fn invoke<A, R>(&self, args: A) -> (R, Result<()>)
    where
        F: Fn(&Frame, A) -> R,
    {
        let frame = Frame::new(self.function.name());
        let Some(session) = &self.session else {
            return ((self.f)(&frame, args), Ok(()));
        };

        let tracer = Rc::new(RefCell::new(LineTracer::new(
            &frame,
            self.specs.clone(),
            session.sources.clone(),
            Arc::from(session.config.ignore_marker.as_str()),
        )));
        let guard = match hook::install(tracer.clone()) {
            Ok(guard) => guard,
            Err(err) => {
                warn!(function = %self.function(), "{:#}; running untraced", err);
                return ((self.f)(&frame, args), Ok(()));
            }
        };

        // a panic unwinds through the guard: hook removed, nothing submitted
        let out = (self.f)(&frame, args);
        drop(guard);

        let mut tracer = tracer.borrow_mut();
        let function = self.locate(tracer.source_file());
        debug!(%function, lines = tracer.lines(), "traced call finished");
        let record = tracer.finish();
        (out, session.submit(function, record))
    }

    fn locate(&self, file: Option<&str>) -> &FunctionId {
        match file {
            Some(file) if self.locate => self
                .located
                .get_or_init(|| FunctionId::new(file, self.function.name())),
            _ => self.function(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Recorded;
    use crate::sink::MemorySink;
    use crate::source::{InlineSource, NoSource};
    use crate::step;
    use crate::value::Value;
    use pretty_assertions::assert_eq;

    fn session(config: Config) -> Session<MemorySink> {
        Session::with_sink(config, MemorySink::new()).with_sources(Arc::new(NoSource))
    }

    #[rustfmt::skip]
    fn three_lines(frame: &Frame, _: ()) -> i64 {
        step!(frame);       let mut res = 0;
        step!(frame; res);  res += 1;
        step!(frame; res);  res += 2;
        step!(frame; res);
        res
    }

    fn last_record(s: &Session<MemorySink>, key: &str) -> TraceRecord {
        s.inspect(|sink| sink.log()[key].last().unwrap().data.clone())
            .unwrap()
    }

    #[test]
    fn records_each_change() {
        let s = session(Config::default());
        let traced = s.trace(["res"]).unwrap().wrap(three_lines);
        assert_eq!(traced.function().name(), "three_lines");
        assert_eq!(traced.call(()), 3);

        let record = last_record(&s, &traced.function().log_key());
        assert_eq!(
            record.get("res"),
            Some(&Recorded::Sequence(vec![
                Value::Int(0),
                Value::Int(1),
                Value::Int(3)
            ]))
        );
    }

    #[test]
    fn state_resets_between_calls() {
        let s = session(Config::default());
        let traced = s.trace(["res", "res"]).unwrap().wrap(three_lines);
        assert_eq!(traced.specs.len(), 1);
        traced.call(());
        traced.call(());

        let key = traced.function().log_key();
        let entries = s.inspect(|sink| sink.log()[&key].clone()).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].data, entries[1].data);
        assert_eq!(entries[1].data.get("res").unwrap().values().len(), 3);
    }

    #[test]
    fn disabled_session_is_pass_through() {
        let s = session(Config::default().with_disabled(true));
        let traced = s.trace(["res"]).unwrap().wrap(three_lines);
        assert!(!traced.is_enabled());
        assert_eq!(traced.call(()), three_lines(&crate::frame!("three_lines"), ()));
        assert_eq!(s.inspect(|sink| sink.submissions()).unwrap(), 0);
    }

    #[test]
    fn bad_specs_are_rejected_up_front() {
        let s = session(Config::default());
        assert!(s.trace(["ok", "not ok"]).is_err());
        assert!(s.trace(Vec::<String>::new()).is_err());
    }

    #[test]
    fn panicking_call_submits_nothing_and_releases_hook() {
        let s = session(Config::default());
        let traced = s.trace(["x"]).unwrap().wrap(|frame: &Frame, x: i64| {
            step!(frame; x);
            if x > 0 {
                panic!("boom");
            }
            x
        });
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| traced.call(1)));
        assert!(result.is_err());
        assert!(!hook::is_installed());
        assert_eq!(s.inspect(|sink| sink.submissions()).unwrap(), 0);

        assert_eq!(traced.call(0), 0);
        assert_eq!(s.inspect(|sink| sink.submissions()).unwrap(), 1);
    }

    #[test]
    fn err_results_pass_through_and_are_recorded() {
        fn parse(frame: &Frame, text: &str) -> std::result::Result<i64, String> {
            step!(frame; text);
            text.parse::<i64>().map_err(|e| e.to_string())
        }
        let s = session(Config::default());
        let traced = s.trace(["text"]).unwrap().wrap(parse);
        assert!(traced.call("nope").is_err());
        assert_eq!(traced.call("12"), Ok(12));
        assert_eq!(s.inspect(|sink| sink.submissions()).unwrap(), 2);
    }

    #[test]
    fn nested_traced_call_runs_untraced() {
        let s = session(Config::default());
        let inner = s.trace(["y"]).unwrap().wrap(|frame: &Frame, y: i64| {
            step!(frame; y);
            y * 2
        });
        let outer_session = s.clone();
        let outer = s.trace(["x"]).unwrap().wrap_as(
            FunctionId::new("outer.rs", "outer"),
            move |frame: &Frame, x: i64| {
                step!(frame; x);
                inner.call(x) + 1
            },
        );
        assert_eq!(outer.call(2), 5);
        let keys = outer_session
            .inspect(|sink| sink.log().keys().cloned().collect::<Vec<_>>())
            .unwrap();
        assert_eq!(keys, vec!["outer/outer()".to_string()]);
    }

    #[test]
    fn identity_follows_the_reporting_file() {
        let s = session(Config::default());
        let traced = s.trace(["x"]).unwrap().wrap(|frame: &Frame, x: i64| {
            frame.step("lib/calc.rs", 7, |l| {
                l.bind("x", &x);
            });
            x
        });
        assert_eq!(traced.function().file(), file!());
        traced.call(1);
        assert_eq!(traced.function().file(), "lib/calc.rs");

        let key = format!("lib/calc/{}()", traced.function().name());
        assert_eq!(s.inspect(|sink| sink.log()[&key].len()).unwrap(), 1);
    }

    #[test]
    fn ignore_marker_from_source() {
        let function = FunctionId::new("calc.rs", "calc");
        let src = InlineSource::new().with_file(
            "calc.rs",
            "fn calc() {\n  x = 1\n  x = 2 // ztrace: ignore\n  x = 3\n}",
        );
        let s = Session::with_sink(Config::default(), MemorySink::new()).with_sources(Arc::new(src));
        let traced = s.trace(["x"]).unwrap().wrap_as(function, |frame: &Frame, _: ()| {
            let mut x = 0;
            frame.step("calc.rs", 2, |l| {
                l.bind("x", &x);
            });
            x = 1;
            frame.step("calc.rs", 3, |l| {
                l.bind("x", &x);
            });
            x = 2;
            frame.step("calc.rs", 4, |l| {
                l.bind("x", &x);
            });
            x = 3;
            frame.step("calc.rs", 5, |l| {
                l.bind("x", &x);
            });
        });
        traced.call(());
        let record = s.inspect(|sink| sink.log()["calc/calc()"][0].data.clone()).unwrap();
        assert_eq!(
            record.get("x").unwrap().values(),
            &[Value::Int(0), Value::Int(1), Value::Int(3)]
        );
    }
}
