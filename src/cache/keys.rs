//! Canonical cache keys
//!
//! Keys look like `{prefix}:{module}.{operation}({args})` where `args` is the
//! list of supplied arguments sorted by name, each rendered as `name=<json>`.
//! Every key of one operation shares the prefix `{prefix}:{module}.{operation}(`,
//! which is what family invalidation sweeps on.

use std::fmt;

/// A fully rendered cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Namespace and module under which keys are built.
#[derive(Debug, Clone)]
pub struct KeySpace {
    prefix: String,
    module: String,
}

impl KeySpace {
    pub fn new(prefix: impl Into<String>, module: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            module: module.into(),
        }
    }

    /// Builds the key for one call of `operation`.
    ///
    /// Absent arguments are left out, so the key depends only on what was supplied.
    /// Values are JSON-quoted, which keeps `,`, `=` and `)` inside a value from
    /// colliding with the separators.
    pub fn key(&self, operation: &str, args: &[(&str, Option<String>)]) -> CacheKey {
        let mut supplied: Vec<(&str, &str)> = args
            .iter()
            .filter_map(|(name, value)| value.as_deref().map(|v| (*name, v)))
            .collect();
        supplied.sort_by(|a, b| a.0.cmp(b.0).then_with(|| a.1.cmp(b.1)));

        let rendered: Vec<String> = supplied
            .iter()
            .map(|(name, value)| format!("{}={}", name, serde_json::Value::from(*value)))
            .collect();

        CacheKey(format!(
            "{}{})",
            self.family_prefix(operation),
            rendered.join(",")
        ))
    }

    /// Prefix shared by every key of `operation`, whatever its arguments.
    pub fn family_prefix(&self, operation: &str) -> String {
        format!("{}:{}.{}(", self.prefix, self.module, operation)
    }
}
