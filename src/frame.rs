//! Instrumentation surface of a traced function.
//!
//! A traced function receives a [`Frame`] and places a probe at the start of
//! each source line it wants observed:
//!
//! ```
//! use ztrace::{Frame, step};
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
//! # assert_eq!(accumulate(&ztrace::frame!("accumulate"), 3), 3);
//! ```
//!
//! A probe reports the file and line it sits on and the locals it names. It runs before
//! the rest of its line, so the values it sees are the effect of the lines
//! executed before it. With no step hook installed a probe does nothing beyond
//! a thread-local lookup.

use crate::hook;
use crate::value::ToValue;
use std::any::type_name;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Identity of an instrumented function: its source file and name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FunctionId {
    file: String,
    name: String,
}

impl FunctionId {
    pub fn new(file: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            name: name.into(),
        }
    }

    /// Identity of the function item `F` defined in `file`.
    ///
    /// The name is the last path segment of the type name with generics
    /// removed. Closures resolve to their enclosing function.
    pub fn of<F>(file: impl Into<String>) -> Self {
        Self::new(file, short_name(type_name::<F>()))
    }

    pub fn file(&self) -> &str {
        &self.file
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Key the session logs this function's records under:
    /// `<source path without extension>/<name>()`.
    pub fn log_key(&self) -> String {
        let stem = Path::new(&self.file).with_extension("");
        format!("{}/{}()", stem.display(), self.name)
    }
}

impl fmt::Display for FunctionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.name)
    }
}

fn short_name(full: &str) -> String {
    let base = match full.find('<') {
        Some(idx) => &full[..idx],
        None => full,
    };
    base.rsplit("::")
        .find(|seg| !seg.is_empty() && *seg != "{{closure}}")
        .unwrap_or(base)
        .to_string()
}

/// Locals bound by one probe.
///
/// Values are borrowed, not converted: only the roots a session watches are
/// turned into snapshots.
#[derive(Default)]
pub struct Locals<'a> {
    vars: Vec<(&'a str, &'a dyn ToValue)>,
}

impl<'a> Locals<'a> {
    pub fn new() -> Self {
        Self { vars: Vec::new() }
    }

    /// Bind `name`. A later binding of the same name shadows the earlier one.
    pub fn bind(&mut self, name: &'a str, value: &'a dyn ToValue) -> &mut Self {
        self.vars.push((name, value));
        self
    }

    pub fn get(&self, name: &str) -> Option<&'a dyn ToValue> {
        self.vars
            .iter()
            .rev()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| *v)
    }

    pub fn names(&self) -> impl Iterator<Item = &'a str> + '_ {
        self.vars.iter().map(|(n, _)| *n)
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}

impl fmt::Debug for Locals<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

static NEXT_FRAME: AtomicU64 = AtomicU64::new(1);

/// Runtime frame of one call of an instrumented function.
///
/// Every frame gets its own id; a tracer only listens to the frame it was
/// handed, so helpers with frames of their own are never mixed in.
#[derive(Debug, Clone)]
pub struct Frame {
    id: u64,
    name: Arc<str>,
}

impl Frame {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: NEXT_FRAME.fetch_add(1, Ordering::Relaxed),
            name: Arc::from(name.into()),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Report a line boundary of `file`. `bind` is only called when a step
    /// hook is installed on this thread.
    pub fn step<'l>(&self, file: &str, line: u32, bind: impl FnOnce(&mut Locals<'l>)) {
        hook::dispatch(self, file, line, bind);
    }
}

/// Place a line probe: `step!(frame)` or `step!(frame; a, b, c)`.
#[macro_export]
macro_rules! step {
    ($frame:expr) => {
        $frame.step(file!(), line!(), |_| {})
    };
    ($frame:expr; $($name:ident),+ $(,)?) => {
        $frame.step(file!(), line!(), |locals| {
            $( locals.bind(stringify!($name), &$name); )+
        })
    };
}

/// Frame for a function instrumented by hand.
#[macro_export]
macro_rules! frame {
    ($name:expr) => {
        $crate::Frame::new($name)
    };
}
