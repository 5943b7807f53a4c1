//! Path patterns with named placeholders.
//!
//! Syntax, one segment at a time:
//! - `literal` matches itself (case-sensitive)
//! - `:name` captures exactly one non-empty segment
//! - `?name` captures one segment if present (trailing only)
//! - `*name` captures the remaining segments joined by `/` (last only)
//!
//! Empty segments are ignored on both sides, so `/a/`, `a` and `//a`
//! all denote the same path. Request segments are percent-decoded after
//! splitting, so an encoded `%2F` stays inside its segment.

use std::borrow::Cow;
use std::collections::HashSet;
use std::fmt;

use percent_encoding::percent_decode_str;
use sprig_common::Params;

use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Named(String),
    Optional(String),
    Wildcard(String),
}

/// A parsed path pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    source: String,
    segments: Vec<Segment>,
}

fn split(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

impl Pattern {
    pub fn parse(source: &str) -> Result<Self> {
        let mut segments = Vec::new();
        let mut names = HashSet::new();

        for raw in split(source) {
            let segment = match raw.chars().next() {
                Some(sigil @ (':' | '?' | '*')) => {
                    let name = &raw[1..];
                    if name.is_empty() {
                        return Err(Error::invalid_pattern(
                            source,
                            format!("placeholder `{}` has no name", sigil),
                        ));
                    }
                    if !names.insert(name.to_string()) {
                        return Err(Error::invalid_pattern(
                            source,
                            format!("duplicate placeholder `{}`", name),
                        ));
                    }
                    match sigil {
                        ':' => Segment::Named(name.to_string()),
                        '?' => Segment::Optional(name.to_string()),
                        _ => Segment::Wildcard(name.to_string()),
                    }
                }
                _ => Segment::Literal(raw.to_string()),
            };

            match segments.last() {
                Some(Segment::Wildcard(_)) => {
                    return Err(Error::invalid_pattern(source, "wildcard must be the last segment"));
                }
                Some(Segment::Optional(_)) if !matches!(segment, Segment::Optional(_)) => {
                    return Err(Error::invalid_pattern(
                        source,
                        "only optional placeholders may follow an optional placeholder",
                    ));
                }
                _ => {}
            }
            segments.push(segment);
        }

        Ok(Self {
            source: source.to_string(),
            segments,
        })
    }

    /// The pattern as written at declaration time.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Names of all placeholders, in declaration order.
    pub fn placeholders(&self) -> Vec<&str> {
        self.segments
            .iter()
            .filter_map(|s| match s {
                Segment::Literal(_) => None,
                Segment::Named(n) | Segment::Optional(n) | Segment::Wildcard(n) => Some(n.as_str()),
            })
            .collect()
    }

    /// Match a request path, returning the captured placeholders.
    pub fn matches(&self, path: &str) -> Option<Params> {
        let parts: Vec<Cow<'_, str>> = split(path)
            .map(|part| percent_decode_str(part).decode_utf8_lossy())
            .collect();
        let mut captures = Params::new();
        let mut i = 0;

        for segment in &self.segments {
            match segment {
                Segment::Literal(lit) => {
                    if parts.get(i).map(|p| &**p) != Some(lit.as_str()) {
                        return None;
                    }
                    i += 1;
                }
                Segment::Named(name) => {
                    let part = parts.get(i)?;
                    captures.insert(name.clone(), part.to_string());
                    i += 1;
                }
                Segment::Optional(name) => {
                    if let Some(part) = parts.get(i) {
                        captures.insert(name.clone(), part.to_string());
                        i += 1;
                    }
                }
                Segment::Wildcard(name) => {
                    if i >= parts.len() {
                        return None;
                    }
                    captures.insert(name.clone(), parts[i..].join("/"));
                    i = parts.len();
                }
            }
        }

        (i == parts.len()).then_some(captures)
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}
