//! Document-Store Interface
//!
//! Compiled params are translated into the store's native filter document:
//! - value fields → equality, `$in` for lists, `$gte`/`$lt` for ranges
//! - interval fields → overlap on `<field>.left` / `<field>.right`
//! - several intervals on one field → `$or` of overlaps

use super::{Connection, DatasourceInterface};
use crate::error::{FrameError, Result};
use crate::interval::{Canonical, Interval};
use crate::query::{CompiledQuery, Param, Params, QueryTarget};
use crate::types::{Document, Label};
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tracing::debug;

/// Native driver contract for one collection
pub trait DocumentCollection: Send + Sync {
    fn name(&self) -> &str;

    fn find(&self, filter: &Value, limit: Option<usize>, skip: Option<usize>) -> Result<Vec<Document>>;

    fn insert_one(&self, doc: &Document) -> Result<()>;

    /// Replace the first document matching `filter`, returning the match count
    fn replace_one(&self, filter: &Value, doc: &Document) -> Result<u64>;
}

/// Translate compiled params into a native filter document.
pub fn to_filter(params: &Params) -> Value {
    let mut filter = Map::new();
    let mut alternatives: Vec<Vec<Value>> = Vec::new();

    for (field, param) in params.iter() {
        match param {
            Param::Match(label) => {
                if let Some(cond) = match_condition(label) {
                    filter.insert(field.clone(), cond);
                }
            }
            Param::Overlap(canonical) => {
                let intervals = canonical.intervals();
                match intervals.as_slice() {
                    [] if matches!(canonical, Canonical::Many(_)) => {
                        filter.insert(field.clone(), json!({ "$in": [] }));
                    }
                    [] => {}
                    [one] => filter.extend(overlap_conditions(field, one)),
                    many => alternatives.push(
                        many.iter()
                            .map(|iv| Value::Object(overlap_conditions(field, iv)))
                            .collect(),
                    ),
                }
            }
        }
    }

    match alternatives.len() {
        0 => {}
        1 => {
            filter.insert("$or".to_string(), Value::Array(alternatives.remove(0)));
        }
        _ => {
            let groups = alternatives.into_iter().map(|alts| json!({ "$or": alts })).collect();
            filter.insert("$and".to_string(), Value::Array(groups));
        }
    }
    Value::Object(filter)
}

fn match_condition(label: &Label) -> Option<Value> {
    match label {
        Label::Any => None,
        Label::List(items) | Label::Tuple(items) => {
            Some(json!({ "$in": items.iter().map(|l| l.to_json()).collect::<Vec<_>>() }))
        }
        Label::Range { start, stop } => {
            let mut ops = Map::new();
            if let Some(start) = start {
                ops.insert("$gte".to_string(), start.clone());
            }
            if let Some(stop) = stop {
                ops.insert("$lt".to_string(), stop.clone());
            }
            if ops.is_empty() { None } else { Some(Value::Object(ops)) }
        }
        other => Some(other.to_json()),
    }
}

/// A point selects stored intervals containing it (`left <= x < right`);
/// a proper interval selects stored intervals overlapping it.
/// Unlike the strict overlap test, a point on a stored `left` bound matches,
/// so a point at a boundary lands in the interval starting there.
fn overlap_conditions(field: &str, iv: &Interval) -> Map<String, Value> {
    let mut conds = Map::new();
    let left_key = format!("{field}.left");
    let right_key = format!("{field}.right");
    if iv.is_point() {
        if !iv.left.is_null() {
            conds.insert(left_key, json!({ "$lte": iv.left }));
            conds.insert(right_key, json!({ "$gt": iv.left }));
        }
        return conds;
    }
    if !iv.right.is_null() {
        conds.insert(left_key, json!({ "$lt": iv.right }));
    }
    if !iv.left.is_null() {
        conds.insert(right_key, json!({ "$gt": iv.left }));
    }
    conds
}

/// Runs compiled params as a filtered `find`
struct FilterQuery {
    collection: Arc<dyn DocumentCollection>,
}

impl QueryTarget for FilterQuery {
    fn run(&self, params: &Params, limit: Option<usize>, skip: Option<usize>) -> Result<Vec<Document>> {
        let filter = to_filter(params);
        debug!(collection = self.collection.name(), filter = %filter, "find");
        self.collection.find(&filter, limit, skip)
    }
}

/// Interface over a `DocumentCollection`
pub struct DocumentInterface {
    collection: Arc<dyn DocumentCollection>,
    target: Arc<FilterQuery>,
}

impl DocumentInterface {
    pub fn new(collection: Arc<dyn DocumentCollection>) -> Self {
        let target = Arc::new(FilterQuery { collection: collection.clone() });
        Self { collection, target }
    }

    pub fn collection(&self) -> &Arc<dyn DocumentCollection> {
        &self.collection
    }

    pub(crate) fn factory(connection: &Connection) -> Result<Arc<dyn DatasourceInterface>> {
        match connection {
            Connection::Documents(collection) => Ok(Arc::new(Self::new(collection.clone()))),
            other => Err(FrameError::UnsupportedBackend(format!(
                "DocumentInterface cannot serve {:?} connections",
                other.kind()
            ))),
        }
    }
}

impl DatasourceInterface for DocumentInterface {
    fn name(&self) -> &'static str {
        "DocumentInterface"
    }

    fn bind(&self, params: Params) -> CompiledQuery {
        CompiledQuery::new(self.target.clone(), params)
    }

    fn compile_value(&self, name: &str, label: &Label) -> Result<CompiledQuery> {
        Ok(self.bind(Params::matching(name, label)))
    }

    fn compile_interpolating(&self, name: &str, label: &Label) -> Result<CompiledQuery> {
        Ok(self.bind(Params::matching(name, label)))
    }

    fn compile_interval(&self, name: &str, label: &Label) -> Result<CompiledQuery> {
        Ok(self.bind(Params::overlapping(name, label)))
    }

    fn insert(&self, doc: &Document) -> Result<()> {
        debug!(collection = self.collection.name(), "insert_one");
        self.collection.insert_one(doc).map_err(|e| match e {
            FrameError::Insertion(_) => e,
            other => FrameError::Insertion(other.to_string()),
        })
    }

    fn update(&self, key: &Params, doc: &Document) -> Result<()> {
        let filter = to_filter(key);
        debug!(collection = self.collection.name(), filter = %filter, "replace_one");
        match self.collection.replace_one(&filter, doc)? {
            0 => Err(FrameError::Update(format!("no document matches {filter}"))),
            _ => Ok(()),
        }
    }
}
