//! Compiled Queries
//!
//! `Params` is the backend-neutral product of compilation: field name →
//! matched label or canonical interval. A `CompiledQuery` binds params to
//! the shared connection that can run them.

use crate::error::Result;
use crate::interval::{normalize, Canonical};
use crate::types::{Document, Label};
use indexmap::IndexMap;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Compiled constraint on one field
#[derive(Clone, Debug, PartialEq)]
pub enum Param {
    /// Value / interpolating index: the label as given
    Match(Label),
    /// Interval index: canonical bounds to overlap
    Overlap(Canonical),
}

impl Param {
    pub fn to_json(&self) -> Value {
        match self {
            Param::Match(label) => label.to_json(),
            Param::Overlap(canonical) => canonical.to_json(),
        }
    }
}

/// Ordered field → param mapping
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Params(IndexMap<String, Param>);

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    /// `{name: label}`; a wildcard yields no parameter.
    pub fn matching(name: &str, label: &Label) -> Self {
        let mut params = Self::new();
        if !label.is_any() {
            params.insert(name, Param::Match(label.clone()));
        }
        params
    }

    /// `{name: normalize(label)}`; a wildcard yields no parameter.
    pub fn overlapping(name: &str, label: &Label) -> Self {
        let mut params = Self::new();
        if !label.is_any() {
            params.insert(name, Param::Overlap(normalize(label)));
        }
        params
    }

    pub fn insert(&mut self, name: &str, param: Param) {
        self.0.insert(name.to_string(), param);
    }

    pub fn get(&self, name: &str) -> Option<&Param> {
        self.0.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Param)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Wire form: `{field: value | {left, right} | [...]}`
    pub fn to_json(&self) -> Value {
        Value::Object(self.0.iter().map(|(k, p)| (k.clone(), p.to_json())).collect())
    }
}

/// Something that can run compiled params against a backend.
pub trait QueryTarget: Send + Sync {
    fn run(&self, params: &Params, limit: Option<usize>, skip: Option<usize>) -> Result<Vec<Document>>;
}

/// Executable, backend-bound query. Stateless and re-executable.
#[derive(Clone)]
pub struct CompiledQuery {
    target: Arc<dyn QueryTarget>,
    params: Params,
    limit: Option<usize>,
    skip: Option<usize>,
}

impl CompiledQuery {
    pub fn new(target: Arc<dyn QueryTarget>, params: Params) -> Self {
        Self { target, params, limit: None, skip: None }
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    /// Default limit used when `execute` is called without one
    pub fn limit(mut self, n: usize) -> Self {
        self.limit = Some(n);
        self
    }

    /// Default skip used when `execute` is called without one
    pub fn skip(mut self, n: usize) -> Self {
        self.skip = Some(n);
        self
    }

    pub fn execute(&self, limit: Option<usize>, skip: Option<usize>) -> Result<Vec<Document>> {
        let limit = limit.or(self.limit);
        let skip = skip.or(self.skip);
        tracing::debug!(params = %self.params.to_json(), ?limit, ?skip, "executing query");
        let docs = self.target.run(&self.params, limit, skip)?;
        tracing::debug!(count = docs.len(), "query done");
        Ok(docs)
    }
}

impl fmt::Debug for CompiledQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledQuery")
            .field("params", &self.params)
            .field("limit", &self.limit)
            .field("skip", &self.skip)
            .finish()
    }
}
