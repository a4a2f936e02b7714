//! Feature vectors and the schema they are aligned to.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{EstimatorError, Result};

/// Ordered mapping from feature name to value.
///
/// Insertion order is preserved; inserting an existing name overwrites its
/// value in place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureVector {
    entries: Vec<(String, f64)>,
}

impl FeatureVector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
        }
    }

    /// Set `name` to `value`.
    pub fn insert(&mut self, name: impl Into<String>, value: f64) {
        let name = name.into();
        match self.entries.iter_mut().find(|(existing, _)| *existing == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, value)| *value)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.entries.iter().map(|(name, value)| (name.as_str(), *value))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Ordered, duplicate-free list of feature names a model was trained on.
///
/// Persisted with the model as a plain list of names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct FeatureSchema {
    names: Vec<String>,
    positions: HashMap<String, usize>,
}

impl FeatureSchema {
    /// Create a schema from ordered names.
    pub fn new(names: Vec<String>) -> Result<Self> {
        Self::try_from(names).map_err(EstimatorError::invalid_argument)
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.positions.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.positions.contains_key(name)
    }

    /// Project a vector onto this schema.
    ///
    /// Names the schema lacks are dropped and schema names the vector lacks
    /// are zero-filled, so the result always has `self.len()` columns.
    pub fn align(&self, vector: &FeatureVector) -> Vec<f64> {
        let mut row = vec![0.0; self.names.len()];
        for (name, value) in vector.iter() {
            if let Some(&position) = self.positions.get(name) {
                row[position] = value;
            }
        }
        row
    }

    /// Align every vector into a row-major matrix.
    pub fn align_all(&self, vectors: &[FeatureVector]) -> Vec<Vec<f64>> {
        vectors.iter().map(|vector| self.align(vector)).collect()
    }
}

impl TryFrom<Vec<String>> for FeatureSchema {
    type Error = String;

    fn try_from(names: Vec<String>) -> std::result::Result<Self, Self::Error> {
        if names.is_empty() {
            return Err("feature schema is empty".to_string());
        }
        let mut positions = HashMap::with_capacity(names.len());
        for (position, name) in names.iter().enumerate() {
            if positions.insert(name.clone(), position).is_some() {
                return Err(format!("duplicate feature '{name}' in schema"));
            }
        }
        Ok(Self { names, positions })
    }
}

impl From<FeatureSchema> for Vec<String> {
    fn from(schema: FeatureSchema) -> Self {
        schema.names
    }
}

/// Accumulates a schema from fixed base features plus names discovered in
/// extracted vectors, in order of first appearance.
#[derive(Debug, Clone, Default)]
pub struct SchemaBuilder {
    names: Vec<String>,
    seen: HashMap<String, usize>,
}

impl SchemaBuilder {
    /// Start from the extractor's fixed features.
    pub fn with_base(base: &[&str]) -> Self {
        let mut builder = Self::default();
        for name in base {
            builder.add(name);
        }
        builder
    }

    pub fn add(&mut self, name: &str) {
        if !self.seen.contains_key(name) {
            self.seen.insert(name.to_string(), self.names.len());
            self.names.push(name.to_string());
        }
    }

    /// Add every name of `vector` not seen before.
    pub fn observe(&mut self, vector: &FeatureVector) {
        for name in vector.names() {
            self.add(name);
        }
    }

    pub fn build(self) -> Result<FeatureSchema> {
        FeatureSchema::new(self.names)
    }
}
