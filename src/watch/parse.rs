use crate::Result;
use crate::watch::{Access, WatchSpec};
use anyhow::{Context, bail};
use regex::Regex;

const IDENT: &str = r"[A-Za-z_][A-Za-z0-9_]*";

fn root_pattern() -> String {
    format!(r"^\s*({})", IDENT)
}

// One access step at the start of the remaining text:
// 1) .attr
// 2) [int]
// 3) ["double quoted"]
// 4) ['single quoted']
fn step_pattern() -> String {
    format!(
        r#"^(?:\.({})|\[\s*(-?\d+)\s*\]|\[\s*"((?:[^"\\]|\\.)*)"\s*\]|\[\s*'((?:[^'\\]|\\.)*)'\s*\])"#,
        IDENT
    )
}

/// Parse `arr[1]`, `obj["a"]['b']`, `cls.a` into a root name and access path.
pub fn parse_watch_spec(text: &str) -> Result<WatchSpec> {
    let root_re = Regex::new(&root_pattern())?;
    let step_re = Regex::new(&step_pattern())?;

    let Some(root_match) = root_re.captures(text).and_then(|c| c.get(1)) else {
        bail!("watch spec {:?} must start with a variable name", text);
    };
    let root = root_match.as_str().to_string();

    let mut path = Vec::new();
    let mut rest = &text[root_match.end()..];
    loop {
        let trimmed = rest.trim_end();
        if trimmed.is_empty() {
            break;
        }
        let Some(caps) = step_re.captures(rest) else {
            bail!("watch spec {:?}: cannot parse access at {:?}", text, trimmed);
        };
        let Some(whole) = caps.get(0) else {
            bail!("watch spec {:?}: empty access", text);
        };
        let step = if let Some(m) = caps.get(1) {
            Access::Attr(m.as_str().to_string())
        } else if let Some(m) = caps.get(2) {
            let idx = m
                .as_str()
                .parse::<i64>()
                .with_context(|| format!("watch spec {:?}: bad index {}", text, m.as_str()))?;
            Access::Index(idx)
        } else if let Some(m) = caps.get(3).or_else(|| caps.get(4)) {
            Access::Key(unescape(m.as_str()))
        } else {
            bail!("watch spec {:?}: empty access", text);
        };
        path.push(step);
        rest = &rest[whole.end()..];
    }

    Ok(WatchSpec {
        text: text.to_string(),
        root,
        path,
    })
}

/// Parse every spec, failing on the first malformed one.
pub fn parse_watch_specs<I, S>(specs: I) -> Result<Vec<WatchSpec>>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    specs
        .into_iter()
        .map(|s| parse_watch_spec(s.as_ref()))
        .collect()
}

fn unescape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
            }
        } else {
            out.push(c);
        }
    }
    out
}
