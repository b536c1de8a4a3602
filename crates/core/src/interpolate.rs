//! `${var}` interpolation.
//!
//! Supported forms:
//!
//! - `${name}` - value of `name`, error if undefined
//! - `${name:-fallback}` - value of `name`, or `fallback` if undefined
//! - `${env.NAME}` - process environment variable `NAME`
//! - `$${` - a literal `${`
//!
//! Variables are layered: later layers override earlier ones, so callers add
//! document-level values first and CLI overrides last.

use crate::error::CoreError;
use indexmap::IndexMap;

/// An ordered set of string variables.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Variables {
    values: IndexMap<String, String>,
}

impl Variables {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a single variable, replacing any previous value.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.values.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Return a copy with `layer` applied on top (layer wins on conflicts).
    pub fn layered<I, K, V>(&self, layer: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut merged = self.clone();
        for (k, v) in layer {
            merged.set(k, v);
        }
        merged
    }

    /// Define variables whose values may reference previously defined ones.
    ///
    /// Each value is interpolated against everything defined so far
    /// (including `overrides`), then stored unless `overrides` already pins
    /// that name.
    pub fn define_interpolated<'a, I>(
        &mut self,
        definitions: I,
        overrides: &Variables,
    ) -> Result<(), CoreError>
    where
        I: IntoIterator<Item = (&'a String, &'a String)>,
    {
        for (name, raw) in definitions {
            if overrides.get(name).is_some() {
                continue;
            }
            let value = self.layered(overrides.iter()).interpolate(raw)?;
            self.set(name.clone(), value);
        }
        for (name, value) in overrides.iter() {
            self.set(name, value);
        }
        Ok(())
    }

    /// Replace every placeholder in `input`.
    pub fn interpolate(&self, input: &str) -> Result<String, CoreError> {
        if !input.contains('$') {
            return Ok(input.to_string());
        }

        let mut out = String::with_capacity(input.len());
        let mut rest = input;

        while let Some(pos) = rest.find('$') {
            out.push_str(&rest[..pos]);
            let tail = &rest[pos..];

            if let Some(after) = tail.strip_prefix("$${") {
                out.push_str("${");
                rest = after;
            } else if let Some(body) = tail.strip_prefix("${") {
                let end = body
                    .find('}')
                    .ok_or_else(|| CoreError::UnterminatedPlaceholder(input.to_string()))?;
                out.push_str(&self.resolve(&body[..end])?);
                rest = &body[end + 1..];
            } else {
                out.push('$');
                rest = &tail[1..];
            }
        }

        out.push_str(rest);
        Ok(out)
    }

    fn resolve(&self, expr: &str) -> Result<String, CoreError> {
        let (name, default) = match expr.split_once(":-") {
            Some((name, default)) => (name.trim(), Some(default)),
            None => (expr.trim(), None),
        };

        if name.is_empty() {
            return Err(CoreError::InvalidPlaceholder(format!("${{{expr}}}")));
        }

        let value = match name.strip_prefix("env.") {
            Some(env_name) => std::env::var(env_name).ok(),
            None => self.get(name).map(|s| s.to_string()),
        };

        match (value, default) {
            (Some(v), _) => Ok(v),
            (None, Some(d)) => Ok(d.to_string()),
            (None, None) => Err(CoreError::UndefinedVariable(name.to_string())),
        }
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Variables {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Variables::new().layered(iter)
    }
}

/// Parse a `KEY=VALUE` CLI argument.
pub fn parse_var_assignment(arg: &str) -> Result<(String, String), CoreError> {
    match arg.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(CoreError::InvalidAssignment(arg.to_string())),
    }
}
