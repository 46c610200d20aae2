//! The parameter capability and its snapshot form.

use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::bounds::Bounds;
use crate::errors::OptResult;

/// A named, actuatable scalar of the controlled system.
///
/// Implementations wrap whatever drives the real quantity (an instrument
/// channel, a simulation input, ...). Reads must reflect the last successful
/// write.
pub trait Parameter: Send + Sync {
    fn name(&self) -> &str;

    /// Read the current value.
    fn get(&self) -> f64;

    /// Actuate to `value`.
    fn set(&self, value: f64) -> OptResult<()>;

    /// Intrinsic limits, or `None` if bounds must be supplied at registration.
    fn bounds(&self) -> Option<Bounds> {
        None
    }
}

/// In-memory parameter whose clones share one live value.
#[derive(Debug, Clone)]
pub struct SharedParameter {
    name: String,
    value: Arc<RwLock<f64>>,
    bounds: Option<Bounds>,
}

impl SharedParameter {
    pub fn new(name: impl Into<String>, value: f64) -> Self {
        Self {
            name: name.into(),
            value: Arc::new(RwLock::new(value)),
            bounds: None,
        }
    }

    pub fn with_bounds(mut self, min: f64, max: f64) -> Self {
        self.bounds = Some(Bounds::new(min, max));
        self
    }

    pub fn into_shared(self) -> Arc<dyn Parameter> {
        Arc::new(self)
    }
}

impl Parameter for SharedParameter {
    fn name(&self) -> &str {
        &self.name
    }

    fn get(&self) -> f64 {
        *self.value.read()
    }

    fn set(&self, value: f64) -> OptResult<()> {
        *self.value.write() = value;
        Ok(())
    }

    fn bounds(&self) -> Option<Bounds> {
        self.bounds
    }
}

/// Immutable, ordered name → value view of parameter state.
///
/// This is the only context an experiment sees when it is sampled.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParameterSnapshot {
    entries: Vec<(String, f64)>,
}

impl ParameterSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Capture the live values of `parameters` in order.
    pub fn capture<'a, I>(parameters: I) -> Self
    where
        I: IntoIterator<Item = &'a Arc<dyn Parameter>>,
    {
        let entries = parameters
            .into_iter()
            .map(|p| (p.name().to_string(), p.get()))
            .collect();
        Self { entries }
    }

    pub fn insert(&mut self, name: impl Into<String>, value: f64) {
        let name = name.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| *v)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), *v))
    }

    pub fn values(&self) -> Vec<f64> {
        self.entries.iter().map(|(_, v)| *v).collect()
    }
}

impl FromIterator<(String, f64)> for ParameterSnapshot {
    fn from_iter<T: IntoIterator<Item = (String, f64)>>(iter: T) -> Self {
        let mut snapshot = Self::new();
        for (name, value) in iter {
            snapshot.insert(name, value);
        }
        snapshot
    }
}
