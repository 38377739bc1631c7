//! Source text lookup for ignore markers.
//!
//! Lookup failures are never errors: a file that cannot be found or read just
//! has no known lines, and the tracer then never suppresses.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::debug;

pub trait SourceProvider: Send + Sync {
    /// Text of 1-based `line` in `file`, if known.
    fn line(&self, file: &str, line: u32) -> Option<String>;
}

/// Provider that knows no source at all.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoSource;

impl SourceProvider for NoSource {
    fn line(&self, _file: &str, _line: u32) -> Option<String> {
        None
    }
}

type Lines = Arc<Vec<String>>;

/// Reads source files from disk, once per path.
///
/// Paths are tried as given (relative to the working directory for the
/// relative paths `file!()` produces), then under `root` when configured.
#[derive(Debug, Default)]
pub struct FileSource {
    root: Option<PathBuf>,
    cache: Mutex<HashMap<String, Option<Lines>>>,
}

impl FileSource {
    pub fn new(root: Option<PathBuf>) -> Self {
        Self {
            root,
            cache: Mutex::new(HashMap::new()),
        }
    }

    fn load(&self, file: &str) -> Option<Lines> {
        let mut candidates = vec![PathBuf::from(file)];
        if let Some(root) = &self.root {
            let path = Path::new(file);
            if path.is_relative() {
                candidates.push(root.join(path));
            }
        }
        for path in candidates {
            match fs::read(&path) {
                Ok(bytes) => {
                    let text = String::from_utf8_lossy(&bytes);
                    return Some(Arc::new(text.lines().map(str::to_string).collect()));
                }
                Err(err) => debug!(path = %path.display(), %err, "source not readable"),
            }
        }
        None
    }
}

impl SourceProvider for FileSource {
    fn line(&self, file: &str, line: u32) -> Option<String> {
        let lines = {
            let mut cache = self.cache.lock().ok()?;
            cache
                .entry(file.to_string())
                .or_insert_with(|| self.load(file))
                .clone()
        }?;
        let idx = usize::try_from(line).ok()?.checked_sub(1)?;
        lines.get(idx).cloned()
    }
}

/// In-memory sources keyed by file name.
#[derive(Debug, Default, Clone)]
pub struct InlineSource {
    files: HashMap<String, Vec<String>>,
}

impl InlineSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, file: &str, text: &str) -> Self {
        self.files
            .insert(file.to_string(), text.lines().map(str::to_string).collect());
        self
    }
}

impl SourceProvider for InlineSource {
    fn line(&self, file: &str, line: u32) -> Option<String> {
        let idx = usize::try_from(line).ok()?.checked_sub(1)?;
        self.files.get(file)?.get(idx).cloned()
    }
}
