//! Template rendering.

use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::{PoisonError, RwLock};

use serde_json::Value;

use crate::error::{Error, Result};

/// A template engine the response can render through.
pub trait Templates: Send + Sync {
    fn render(&self, name: &str, data: &Value) -> Result<String>;
}

/// Minimal engine substituting `{{ key }}` and `{{ a.b }}` placeholders.
///
/// Templates registered with [`SimpleTemplates::add`] take precedence over
/// files under the template directory. Missing keys render as nothing.
pub struct SimpleTemplates {
    dir: PathBuf,
    inline: RwLock<HashMap<String, String>>,
}

impl SimpleTemplates {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            inline: RwLock::new(HashMap::new()),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn add(&self, name: impl Into<String>, source: impl Into<String>) {
        self.inline
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.into(), source.into());
    }

    fn source(&self, name: &str) -> Result<String> {
        if let Some(source) = self
            .inline
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
        {
            return Ok(source.clone());
        }
        if !is_relative_name(name) {
            return Err(Error::Template(format!("refusing template path {:?}", name)));
        }
        let path = self.dir.join(name);
        std::fs::read_to_string(&path)
            .map_err(|e| Error::Template(format!("cannot read {}: {}", path.display(), e)))
    }
}

/// Only plain relative names stay under the template directory: no root,
/// drive prefix, `..`, or backslash separators.
fn is_relative_name(name: &str) -> bool {
    !name.is_empty()
        && !name.contains('\\')
        && Path::new(name)
            .components()
            .all(|c| matches!(c, Component::Normal(_)))
}

fn lookup<'a>(data: &'a Value, key: &str) -> Option<&'a Value> {
    key.split('.').try_fold(data, |value, part| match value {
        Value::Object(map) => map.get(part),
        Value::Array(items) => part.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

fn stringify(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Substitute every `{{ key }}` in `source` from `data`.
pub fn substitute(source: &str, data: &Value) -> Result<String> {
    let mut out = String::with_capacity(source.len());
    let mut rest = source;

    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let end = after
            .find("}}")
            .ok_or_else(|| Error::Template("unterminated `{{`".to_string()))?;
        let key = after[..end].trim();
        if let Some(value) = lookup(data, key) {
            out.push_str(&stringify(value));
        }
        rest = &after[end + 2..];
    }
    out.push_str(rest);
    Ok(out)
}

impl Templates for SimpleTemplates {
    fn render(&self, name: &str, data: &Value) -> Result<String> {
        substitute(&self.source(name)?, data)
    }
}
