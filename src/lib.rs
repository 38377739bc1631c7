//! Lightweight execution tracer.
//!
//! Wrap an instrumented function with a list of watch specs and every call
//! records how those values changed, line by line, into a JSON log:
//!
//! - [`watch`]: watch specs and their resolution against a line's locals
//! - [`diff`]: change detection between line snapshots
//! - [`frame`] / [`hook`]: line probes and the thread's step hook
//! - [`tracer`]: the per-call line tracer (diffing, ignore markers)
//! - [`session`]: wrappers, call lifecycle, record submission
//! - [`sink`]: accumulation and persistence of records

pub mod config;
pub mod diff;
pub mod frame;
pub mod hook;
pub mod record;
pub mod session;
pub mod sink;
pub mod source;
pub mod tracer;
pub mod value;
pub mod watch;

pub type Result<T> = anyhow::Result<T>;

pub use config::Config;
pub use frame::{Frame, FunctionId, Locals};
pub use record::{LogEntry, Recorded, TraceRecord};
pub use session::{Session, Traced, Tracer};
pub use sink::{JsonFileSink, MemorySink, Sink};
pub use value::{Key, NdArray, ToValue, Value};
pub use watch::WatchSpec;
