//! Watch specs: which values a trace session records.
//!
//! A spec is either a bare local name (`res`) or a local followed by a chain
//! of attribute and index accesses (`obj["a"]["b"]`, `arr[1]`, `cls.a`). Specs
//! are parsed once when the session is built and then resolved against the
//! locals of every traced line.

pub mod parse;
pub mod resolve;

use std::fmt;

/// One access step after the root name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Access {
    /// `.name`
    Attr(String),
    /// `[3]`, `[-1]`
    Index(i64),
    /// `["key"]`, `['key']`
    Key(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchSpec {
    text: String,
    root: String,
    path: Vec<Access>,
}

impl WatchSpec {
    /// The spec as the user wrote it. Records are keyed by this text.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Leading local name.
    pub fn root(&self) -> &str {
        &self.root
    }

    pub fn path(&self) -> &[Access] {
        &self.path
    }

    pub fn is_bare(&self) -> bool {
        self.path.is_empty()
    }
}

impl fmt::Display for WatchSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

impl std::str::FromStr for WatchSpec {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse::parse_watch_spec(s)
    }
}
