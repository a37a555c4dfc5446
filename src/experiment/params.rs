//! Control parameters and the live parameter set.

use serde::{Deserialize, Serialize};

/// One user-adjustable numeric control of an experiment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSpec {
    pub id: String,
    pub name: String,
    pub min: f64,
    pub max: f64,
    pub default: f64,
    pub unit: String,
    /// Used as a denominator by the experiment's formulas; `min` must be >= 1
    #[serde(default)]
    pub divisor: bool,
}

impl ParameterSpec {
    pub fn new(id: &str, name: &str, min: f64, max: f64, default: f64, unit: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            min,
            max,
            default,
            unit: unit.to_string(),
            divisor: false,
        }
    }

    /// Mark this parameter as a formula divisor.
    pub fn divisor(mut self) -> Self {
        self.divisor = true;
        self
    }

    pub fn contains(&self, value: f64) -> bool {
        value.is_finite() && value >= self.min && value <= self.max
    }

    /// Clamp `value` into `[min, max]`. Non-finite input falls back to the default.
    pub fn clamp(&self, value: f64) -> f64 {
        if value.is_finite() {
            value.clamp(self.min, self.max)
        } else {
            self.default
        }
    }
}

/// Current values of an experiment's parameters, in descriptor order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParameterSet {
    values: Vec<(String, f64)>,
}

impl ParameterSet {
    pub fn from_specs(specs: &[ParameterSpec]) -> Self {
        Self {
            values: specs.iter().map(|s| (s.id.clone(), s.default)).collect(),
        }
    }

    pub fn get(&self, id: &str) -> Option<f64> {
        self.values.iter().find(|(k, _)| k == id).map(|(_, v)| *v)
    }

    pub fn get_or(&self, id: &str, fallback: f64) -> f64 {
        self.get(id).unwrap_or(fallback)
    }

    /// Overwrite an existing entry. Returns false for unknown ids.
    pub fn set(&mut self, id: &str, value: f64) -> bool {
        match self.values.iter_mut().find(|(k, _)| k == id) {
            Some((_, v)) => {
                *v = value;
                true
            }
            None => false,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> + '_ {
        self.values.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
