//! Entity Schemas
//!
//! `EntitySchema` is the contract the frame needs from a schema: its name,
//! ordered index, columns, and a constructor that validates raw fields into
//! a storable record. `TableSchema` is a plain builder implementation.

use crate::error::{FrameError, Result};
use crate::types::{Document, IndexDescriptor, IndexKind};
use indexmap::IndexMap;
use serde_json::Value;

pub trait EntitySchema: Send + Sync {
    fn name(&self) -> &str;

    /// Ordered index descriptors. A frame flattens composites into their
    /// leaf children, so records carry the child fields.
    fn index(&self) -> &[IndexDescriptor];

    /// Non-index field names
    fn columns(&self) -> &[String];

    /// Validate raw fields into a record. Failures are `FrameError::Insertion`.
    fn construct(&self, fields: Document) -> Result<Document>;

    /// Leaf field names of the index
    fn index_names(&self) -> Vec<&str> {
        self.index().iter().flat_map(|d| d.field_names()).collect()
    }
}

/// Accepted JSON shape of a column
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ColumnType {
    #[default]
    Any,
    Number,
    Integer,
    String,
    Bool,
}

impl ColumnType {
    /// `null` is accepted by every type
    pub fn accepts(&self, value: &Value) -> bool {
        match self {
            ColumnType::Any => true,
            _ if value.is_null() => true,
            ColumnType::Number => value.is_number(),
            ColumnType::Integer => value.is_i64() || value.is_u64(),
            ColumnType::String => value.is_string(),
            ColumnType::Bool => value.is_boolean(),
        }
    }
}

/// Schema built from descriptors and typed columns
#[derive(Clone, Debug)]
pub struct TableSchema {
    name: String,
    index: Vec<IndexDescriptor>,
    columns: Vec<String>,
    types: IndexMap<String, ColumnType>,
}

impl TableSchema {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            index: Vec::new(),
            columns: Vec::new(),
            types: IndexMap::new(),
        }
    }

    /// Add an index dimension. Composite descriptors contribute their children.
    pub fn index(mut self, descriptor: IndexDescriptor) -> Self {
        match descriptor {
            IndexDescriptor::Composite { children, .. } => {
                for child in children {
                    self = self.index(child);
                }
            }
            other => self.index.push(other),
        }
        self
    }

    pub fn column(self, name: &str) -> Self {
        self.typed_column(name, ColumnType::Any)
    }

    pub fn typed_column(mut self, name: &str, ty: ColumnType) -> Self {
        if !self.columns.iter().any(|c| c == name) {
            self.columns.push(name.to_string());
        }
        self.types.insert(name.to_string(), ty);
        self
    }

    fn interval_field(name: &str, value: Value) -> Result<Value> {
        match value {
            Value::Object(obj) if obj.contains_key("left") && obj.contains_key("right") => Ok(Value::Object(obj)),
            Value::Array(pair) if pair.len() == 2 => Ok(serde_json::json!({ "left": pair[0], "right": pair[1] })),
            other => Err(FrameError::Insertion(format!("field '{name}' is not an interval: {other}"))),
        }
    }
}

impl EntitySchema for TableSchema {
    fn name(&self) -> &str {
        &self.name
    }

    fn index(&self) -> &[IndexDescriptor] {
        &self.index
    }

    fn columns(&self) -> &[String] {
        &self.columns
    }

    fn construct(&self, mut fields: Document) -> Result<Document> {
        let mut record = Document::new();

        for descriptor in &self.index {
            let name = descriptor.name();
            let value = match fields.remove(name) {
                Some(v) if !v.is_null() => v,
                _ => return Err(FrameError::Insertion(format!("missing index field '{name}'"))),
            };
            let value = match descriptor.kind() {
                IndexKind::Interval => Self::interval_field(name, value)?,
                _ => value,
            };
            record.insert(name.to_string(), value);
        }

        for column in &self.columns {
            if let Some(value) = fields.remove(column) {
                let ty = self.types.get(column).copied().unwrap_or_default();
                if !ty.accepts(&value) {
                    return Err(FrameError::Insertion(format!(
                        "column '{column}' expects {ty:?}, got {value}"
                    )));
                }
                record.insert(column.clone(), value);
            }
        }

        if let Some(unknown) = fields.keys().next() {
            return Err(FrameError::Insertion(format!(
                "unknown field '{unknown}' for '{}'",
                self.name
            )));
        }
        Ok(record)
    }
}
