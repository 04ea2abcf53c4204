//! In-Memory Document Collection
//!
//! A `DocumentCollection` holding documents in a `parking_lot::RwLock<Vec<_>>`.
//! Evaluates the filter subset produced by `to_filter`:
//! `$and`, `$or`, `$eq`, `$ne`, `$in`, `$gt`, `$gte`, `$lt`, `$lte` and dotted
//! field paths.

use crate::error::{FrameError, Result};
use crate::interfaces::DocumentCollection;
use crate::types::Document;
use parking_lot::RwLock;
use serde_json::Value;
use std::cmp::Ordering;
use std::path::Path;

pub struct MemoryCollection {
    name: String,
    docs: RwLock<Vec<Document>>,
    /// Fields whose combined values must be unique across documents
    unique: Vec<String>,
}

impl MemoryCollection {
    pub fn new(name: &str) -> Self {
        Self::from_documents(name, Vec::new())
    }

    pub fn from_documents(name: &str, docs: Vec<Document>) -> Self {
        Self {
            name: name.to_string(),
            docs: RwLock::new(docs),
            unique: Vec::new(),
        }
    }

    /// Load a JSON file holding a list of documents. `jsonpath` is a dotted
    /// path to the list inside the file; empty selects the root.
    pub fn from_json_file(path: &Path, jsonpath: &str) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| FrameError::Config(format!("{}: {e}", path.display())))?;
        let mut data: Value = serde_json::from_str(&text)?;
        for part in jsonpath.split('.').filter(|p| !p.is_empty()) {
            data = match data {
                Value::Object(mut obj) => obj
                    .remove(part)
                    .ok_or_else(|| FrameError::Config(format!("{}: no '{part}' in {jsonpath}", path.display())))?,
                _ => return Err(FrameError::Config(format!("{}: '{jsonpath}' is not a path", path.display()))),
            };
        }
        let Value::Array(items) = data else {
            return Err(FrameError::Config(format!("{}: JSON must contain a list of documents", path.display())));
        };
        let docs = items
            .into_iter()
            .map(|item| match item {
                Value::Object(doc) => Ok(doc),
                _ => Err(FrameError::Config(format!("{}: list entries must be objects", path.display()))),
            })
            .collect::<Result<Vec<_>>>()?;

        let name = path.file_stem().and_then(|s| s.to_str()).unwrap_or("documents");
        Ok(Self::from_documents(name, docs))
    }

    /// Reject inserts that repeat the values of `fields`
    pub fn unique(mut self, fields: &[&str]) -> Self {
        self.unique = fields.iter().map(|f| f.to_string()).collect();
        self
    }

    pub fn len(&self) -> usize {
        self.docs.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.read().is_empty()
    }

    /// Snapshot of all stored documents
    pub fn documents(&self) -> Vec<Document> {
        self.docs.read().clone()
    }

    fn duplicates(&self, existing: &Document, doc: &Document) -> bool {
        !self.unique.is_empty() && self.unique.iter().all(|f| existing.get(f) == doc.get(f))
    }
}

impl DocumentCollection for MemoryCollection {
    fn name(&self) -> &str {
        &self.name
    }

    fn find(&self, filter: &Value, limit: Option<usize>, skip: Option<usize>) -> Result<Vec<Document>> {
        let docs = self.docs.read();
        Ok(docs
            .iter()
            .filter(|doc| matches(doc, filter))
            .skip(skip.unwrap_or(0))
            .take(limit.unwrap_or(usize::MAX))
            .cloned()
            .collect())
    }

    fn insert_one(&self, doc: &Document) -> Result<()> {
        let mut docs = self.docs.write();
        if docs.iter().any(|existing| self.duplicates(existing, doc)) {
            return Err(FrameError::Insertion(format!(
                "duplicate key {:?} in collection '{}'",
                self.unique, self.name
            )));
        }
        docs.push(doc.clone());
        Ok(())
    }

    fn replace_one(&self, filter: &Value, doc: &Document) -> Result<u64> {
        let mut docs = self.docs.write();
        match docs.iter().position(|existing| matches(existing, filter)) {
            Some(pos) => {
                docs[pos] = doc.clone();
                Ok(1)
            }
            None => Ok(0),
        }
    }
}

/// Does `doc` satisfy `filter`?
pub fn matches(doc: &Document, filter: &Value) -> bool {
    let Some(clauses) = filter.as_object() else {
        return false;
    };
    clauses.iter().all(|(key, cond)| match key.as_str() {
        "$and" => cond.as_array().is_some_and(|fs| fs.iter().all(|f| matches(doc, f))),
        "$or" => cond.as_array().is_some_and(|fs| fs.iter().any(|f| matches(doc, f))),
        path => field_matches(lookup(doc, path), cond),
    })
}

fn lookup<'a>(doc: &'a Document, path: &str) -> Option<&'a Value> {
    let mut parts = path.split('.');
    let mut current = doc.get(parts.next()?)?;
    for part in parts {
        current = current.get(part)?;
    }
    Some(current)
}

fn field_matches(value: Option<&Value>, cond: &Value) -> bool {
    match cond {
        Value::Object(ops) if !ops.is_empty() && ops.keys().all(|k| k.starts_with('$')) => {
            ops.iter().all(|(op, arg)| apply_op(value, op, arg))
        }
        expected => value == Some(expected),
    }
}

fn apply_op(value: Option<&Value>, op: &str, arg: &Value) -> bool {
    match op {
        "$eq" => value == Some(arg),
        "$ne" => value != Some(arg),
        "$in" => match (value, arg.as_array()) {
            (Some(v), Some(options)) => options.contains(v),
            _ => false,
        },
        "$gt" => compare(value, arg) == Some(Ordering::Greater),
        "$gte" => matches!(compare(value, arg), Some(Ordering::Greater | Ordering::Equal)),
        "$lt" => compare(value, arg) == Some(Ordering::Less),
        "$lte" => matches!(compare(value, arg), Some(Ordering::Less | Ordering::Equal)),
        _ => false,
    }
}

fn compare(value: Option<&Value>, arg: &Value) -> Option<Ordering> {
    match (value?, arg) {
        (Value::Number(a), Value::Number(b)) => a.as_f64()?.partial_cmp(&b.as_f64()?),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        _ => None,
    }
}
