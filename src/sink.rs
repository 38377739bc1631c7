//! Record sinks.
//!
//! A sink accumulates submitted log entries under their function key. The
//! JSON file sink rewrites its whole file after every submission, so the file
//! on disk always holds the complete log of the session.
//!
//! On-disk shape:
//! {
//!   "src/demo/trace_basic()": [
//!     { "data": { "t": 3, "res": [0, 1, 3] }, "time": "20240101120000" },
//!     ...
//!   ]
//! }

use crate::Result;
use crate::record::LogEntry;
use anyhow::{Context, anyhow, bail};
use chrono::Local;
use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Function key -> entries in submission order.
pub type LogBook = BTreeMap<String, Vec<LogEntry>>;

pub trait Sink: Send {
    fn submit(&mut self, key: &str, entry: LogEntry) -> Result<()>;

    /// Persist everything submitted so far.
    fn flush(&mut self) -> Result<()> {
        Ok(())
    }

    fn log(&self) -> &LogBook;
}

/// Keeps entries in memory only.
#[derive(Debug, Default)]
pub struct MemorySink {
    log: LogBook,
    submissions: usize,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn submissions(&self) -> usize {
        self.submissions
    }
}

impl Sink for MemorySink {
    fn submit(&mut self, key: &str, entry: LogEntry) -> Result<()> {
        self.log.entry(key.to_string()).or_default().push(entry);
        self.submissions += 1;
        Ok(())
    }

    fn log(&self) -> &LogBook {
        &self.log
    }
}

/// Writes the whole log as pretty JSON after every submission.
#[derive(Debug)]
pub struct JsonFileSink {
    path: PathBuf,
    log: LogBook,
}

impl JsonFileSink {
    /// Create a sink writing to `path`, creating parent directories.
    pub fn create(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("create log directory {}", parent.display()))?;
        }
        Ok(Self {
            path,
            log: LogBook::new(),
        })
    }

    /// Create a sink at `<dir>/<YYYYMMDD>/<HHMMSS>.json` for the current time.
    ///
    /// The file is claimed on creation. When another session already holds
    /// that name, `<HHMMSS>-1.json`, `<HHMMSS>-2.json`, ... are tried.
    pub fn in_dir(dir: &Path) -> Result<Self> {
        let base = log_path(dir, &timestamp())?;
        let mut sink = Self::create(&base)?;
        for n in 0..MAX_CLAIMS {
            let path = if n == 0 { base.clone() } else { numbered(&base, n) };
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(mut file) => {
                    file.write_all(b"{}\n")
                        .with_context(|| format!("write trace log {}", path.display()))?;
                    sink.path = path;
                    return Ok(sink);
                }
                Err(err) if err.kind() == ErrorKind::AlreadyExists => continue,
                Err(err) => {
                    return Err(err).with_context(|| format!("create trace log {}", path.display()));
                }
            }
        }
        bail!("no free trace log name next to {}", base.display())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write(&self) -> Result<()> {
        let json = serde_json::to_string_pretty(&self.log).context("encode trace log")?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json).with_context(|| format!("write trace log {}", tmp.display()))?;
        fs::rename(&tmp, &self.path)
            .with_context(|| format!("replace trace log {}", self.path.display()))?;
        debug!(path = %self.path.display(), keys = self.log.len(), "trace log written");
        Ok(())
    }
}

impl Sink for JsonFileSink {
    fn submit(&mut self, key: &str, entry: LogEntry) -> Result<()> {
        // accumulate first: a failed write keeps the entry for the next flush
        self.log.entry(key.to_string()).or_default().push(entry);
        self.write()
    }

    fn flush(&mut self) -> Result<()> {
        self.write()
    }

    fn log(&self) -> &LogBook {
        &self.log
    }
}

const MAX_CLAIMS: usize = 1000;

/// `<stem>-<n>.json` next to `path`.
fn numbered(path: &Path, n: usize) -> PathBuf {
    let stem = path.file_stem().map(|s| s.to_string_lossy()).unwrap_or_default();
    path.with_file_name(format!("{}-{}.json", stem, n))
}

/// Local time as `YYYYMMDDHHMMSS`.
pub fn timestamp() -> String {
    Local::now().format("%Y%m%d%H%M%S").to_string()
}

/// `<dir>/<YYYYMMDD>/<HHMMSS>.json` for a `YYYYMMDDHHMMSS` stamp.
pub fn log_path(dir: &Path, stamp: &str) -> Result<PathBuf> {
    if stamp.len() != 14 || !stamp.bytes().all(|b| b.is_ascii_digit()) {
        return Err(anyhow!("bad timestamp {:?}, expected YYYYMMDDHHMMSS", stamp));
    }
    let (day, time) = stamp.split_at(8);
    Ok(dir.join(day).join(format!("{}.json", time)))
}
