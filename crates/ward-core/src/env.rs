//! Fail-fast environment access
//!
//! Missing configuration is reported at the point of lookup. No accessor in this
//! module ever substitutes a default for a required variable.

use std::collections::HashMap;
use std::str::FromStr;

use crate::{Result, WardError};

/// Read a required variable straight from the process environment.
///
/// Fails with [`WardError::MissingEnv`] when the variable is unset or empty.
pub fn require_env_var(name: &str) -> Result<String> {
    match std::env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(WardError::MissingEnv(name.to_string())),
    }
}

/// Immutable snapshot of environment variables.
///
/// Built once at process start (or from explicit pairs in tests) so leaf
/// components never read ambient process state.
#[derive(Debug, Clone, Default)]
pub struct Environment {
    vars: HashMap<String, String>,
}

impl Environment {
    /// Snapshot the current process environment
    pub fn from_process() -> Self {
        Self {
            vars: std::env::vars().collect(),
        }
    }

    /// Build an environment from explicit key/value pairs
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            vars: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Return a copy with one variable set
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.insert(name.into(), value.into());
        self
    }

    /// Return a copy with one variable removed
    pub fn without(mut self, name: &str) -> Self {
        self.vars.remove(name);
        self
    }

    /// Value of a variable, treating empty strings as unset
    pub fn optional(&self, name: &str) -> Option<String> {
        self.vars
            .get(name)
            .filter(|v| !v.trim().is_empty())
            .cloned()
    }

    /// Value of a required variable
    pub fn require(&self, name: &str) -> Result<String> {
        self.optional(name)
            .ok_or_else(|| WardError::MissingEnv(name.to_string()))
    }

    /// First set variable among naming variants, e.g. `ADMIN_USER_EMAIL` | `SYSTEM_ADMIN_EMAIL`
    pub fn require_any(&self, names: &[&str]) -> Result<String> {
        names
            .iter()
            .find_map(|name| self.optional(name))
            .ok_or_else(|| WardError::MissingEnv(names.join(" or ")))
    }

    /// Parse a required variable
    pub fn require_parsed<T>(&self, name: &str) -> Result<T>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        let raw = self.require(name)?;
        raw.trim().parse::<T>().map_err(|e| WardError::InvalidEnv {
            name: name.to_string(),
            reason: format!("{} ({:?})", e, raw),
        })
    }

    /// Parse an optional variable
    pub fn optional_parsed<T>(&self, name: &str) -> Result<Option<T>>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        match self.optional(name) {
            Some(raw) => raw
                .trim()
                .parse::<T>()
                .map(Some)
                .map_err(|e| WardError::InvalidEnv {
                    name: name.to_string(),
                    reason: format!("{} ({:?})", e, raw),
                }),
            None => Ok(None),
        }
    }

    /// Boolean flag: set and not `0`/`false`
    pub fn flag(&self, name: &str) -> bool {
        self.optional(name)
            .map(|v| !matches!(v.trim().to_lowercase().as_str(), "0" | "false" | "no" | "off"))
            .unwrap_or(false)
    }

    /// Comma-separated list, trimmed, empty entries dropped
    pub fn require_list(&self, name: &str) -> Result<Vec<String>> {
        let items: Vec<String> = self
            .require(name)?
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        if items.is_empty() {
            return Err(WardError::MissingEnv(name.to_string()));
        }
        Ok(items)
    }
}
