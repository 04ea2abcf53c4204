//! Frame Facade
//!
//! A `Frame` is a schema bound to one backend connection. Every call compiles
//! the caller's labels into a single composite query over the index, runs it,
//! and shapes the records. Nothing is cached between calls.
//!
//! Record shape: index fields first, then columns, in declared order. Fields
//! unknown to the schema (a store-assigned `_id`, say) are dropped.

use crate::error::{FrameError, Result};
use crate::indexer::{AtIndexer, LocIndexer};
use crate::interfaces::{Connection, DatasourceInterface, DocumentCollection, InterfaceRegistry};
use crate::interval::{normalize, Canonical};
use crate::query::{CompiledQuery, Param, Params};
use crate::schema::EntitySchema;
use crate::types::{Document, IndexDescriptor, IndexKind, Label, Labels};
use indexmap::IndexMap;
use serde_json::Value;
use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

pub struct Frame {
    schema: Arc<dyn EntitySchema>,
    /// Leaf descriptors of the schema index, composites flattened
    index: Vec<IndexDescriptor>,
    connection: Connection,
    interface: Arc<dyn DatasourceInterface>,
}

/// Result of a batch insert, each list in input order
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ConcatOutcome {
    pub succeeded: Vec<Document>,
    pub failed: Vec<Document>,
    pub errors: Vec<String>,
}

impl Frame {
    /// Bind `schema` to `connection` through the process-wide registry
    pub fn new(schema: Arc<dyn EntitySchema>, connection: Connection) -> Result<Self> {
        Self::with_registry(schema, connection, InterfaceRegistry::global())
    }

    pub fn with_registry(
        schema: Arc<dyn EntitySchema>,
        connection: Connection,
        registry: &InterfaceRegistry,
    ) -> Result<Self> {
        let interface = registry.resolve(&connection)?;
        let index = schema.index().iter().flat_map(|d| d.leaves()).cloned().collect();
        debug!(frame = schema.name(), interface = interface.name(), ?connection, "frame bound");
        Ok(Self { schema, index, connection, interface })
    }

    /// REST-backed frame from an `http://` or `https://` URL
    pub fn from_url(schema: Arc<dyn EntitySchema>, url: &str) -> Result<Self> {
        Self::new(schema, Connection::from_url(url)?)
    }

    pub fn from_collection(schema: Arc<dyn EntitySchema>, collection: Arc<dyn DocumentCollection>) -> Result<Self> {
        Self::new(schema, Connection::Documents(collection))
    }

    pub fn name(&self) -> &str {
        self.schema.name()
    }

    pub fn schema(&self) -> &Arc<dyn EntitySchema> {
        &self.schema
    }

    pub fn index(&self) -> &[IndexDescriptor] {
        &self.index
    }

    pub fn index_names(&self) -> Vec<&str> {
        self.index.iter().map(|d| d.name()).collect()
    }

    pub fn columns(&self) -> &[String] {
        self.schema.columns()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns().iter().any(|c| c == name)
    }

    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    pub fn interface(&self) -> &Arc<dyn DatasourceInterface> {
        &self.interface
    }

    pub fn loc(&self) -> LocIndexer<'_> {
        LocIndexer::new(self)
    }

    pub fn at(&self) -> AtIndexer<'_> {
        AtIndexer::new(self)
    }

    /// Column view. Unknown names are `ColumnNotFound`.
    pub fn column(&self, name: &str) -> Result<Column<'_>> {
        if !self.has_column(name) {
            return Err(FrameError::column_not_found(name, self.columns()));
        }
        Ok(Column { frame: self, name: name.to_string() })
    }

    // ============ SELECTION ============

    /// Compile labels into one composite query over the index.
    ///
    /// Positional labels bind to index fields in order, surplus ones are
    /// ignored. Named labels override by name; a named column becomes an
    /// extra value child.
    pub fn compile(&self, labels: &Labels) -> Result<CompiledQuery> {
        let mut children: Vec<IndexDescriptor> = self.index().to_vec();
        let mut keyed: IndexMap<String, Label> = IndexMap::new();

        for (descriptor, label) in self.index().iter().zip(labels.positional()) {
            keyed.insert(descriptor.name().to_string(), label.clone());
        }
        for (name, label) in labels.named_labels() {
            if !self.index().iter().any(|d| d.name() == name) {
                if !self.has_column(name) {
                    return Err(FrameError::column_not_found(name, self.columns()));
                }
                children.push(IndexDescriptor::value(name));
            }
            keyed.insert(name.clone(), label.clone());
        }

        let composite = IndexDescriptor::composite(self.name(), children);
        let query = self.interface.compile_query(&composite, &Label::Keyed(keyed))?;
        debug!(frame = self.name(), params = %query.params().to_json(), "compiled selection");
        Ok(query)
    }

    /// Selected records, shaped and sorted by index
    pub fn sel(&self, labels: &Labels) -> Result<Vec<Document>> {
        let docs = self.compile(labels)?.execute(None, None)?;
        Ok(self.shape(docs))
    }

    /// First selected record
    pub fn sel_record(&self, labels: &Labels) -> Result<Document> {
        self.sel(labels)?.into_iter().next().ok_or(FrameError::EmptySelection)
    }

    /// First `n` stored records
    pub fn head(&self, n: usize) -> Result<Vec<Document>> {
        let docs = self.compile(&Labels::new())?.execute(Some(n), None)?;
        Ok(self.shape(docs))
    }

    /// Distinct values of `column`, ordered. Values with equal sort keys
    /// (intervals sharing `left`, `true` and `1`) stay distinct.
    pub fn unique(&self, column: &str) -> Result<Vec<Value>> {
        let mut values: Vec<Value> = Vec::new();
        for value in self.all_values(column)? {
            if !values.contains(&value) {
                values.push(value);
            }
        }
        values.sort_by(|a, b| SortKey::from_value(a).cmp_key(&SortKey::from_value(b)));
        Ok(values)
    }

    pub fn min(&self, column: &str) -> Result<Option<Value>> {
        self.extreme(column, Ordering::Less)
    }

    pub fn max(&self, column: &str) -> Result<Option<Value>> {
        self.extreme(column, Ordering::Greater)
    }

    /// Single value of `column` at the index given by named labels
    pub fn value(&self, column: &str, index: &Labels) -> Result<Value> {
        let named = index.named_labels();
        let key: Vec<Label> = self
            .index_names()
            .iter()
            .map(|name| named.get(*name).cloned().unwrap_or_default())
            .collect();
        self.at().get(Label::Tuple(key), column)
    }

    fn all_values(&self, column: &str) -> Result<Vec<Value>> {
        if !self.has_column(column) && !self.index_names().contains(&column) {
            return Err(FrameError::column_not_found(column, self.columns()));
        }
        let docs = self.compile(&Labels::new())?.execute(None, None)?;
        Ok(docs
            .into_iter()
            .filter_map(|mut doc| doc.remove(column))
            .filter(|v| !v.is_null())
            .collect())
    }

    fn extreme(&self, column: &str, wanted: Ordering) -> Result<Option<Value>> {
        let values = self.all_values(column)?;
        Ok(values.into_iter().reduce(|best, v| {
            if SortKey::from_value(&v).cmp_key(&SortKey::from_value(&best)) == wanted {
                v
            } else {
                best
            }
        }))
    }

    fn shape(&self, docs: Vec<Document>) -> Vec<Document> {
        let index_names = self.index_names();
        let fields: Vec<&str> = index_names
            .iter()
            .copied()
            .chain(self.columns().iter().map(|c| c.as_str()))
            .collect();

        let mut records: Vec<Document> = docs
            .into_iter()
            .map(|mut doc| {
                fields
                    .iter()
                    .filter_map(|f| doc.remove(*f).map(|v| (f.to_string(), v)))
                    .collect()
            })
            .collect();

        records.sort_by(|a, b| {
            index_names
                .iter()
                .map(|f| SortKey::from_field(a, f).cmp_key(&SortKey::from_field(b, f)))
                .find(|o| o.is_ne())
                .unwrap_or(Ordering::Equal)
        });
        records
    }

    // ============ WRITES ============

    /// Insert one record. Named labels win; positional labels fill the index
    /// fields left unnamed.
    pub fn set(&self, labels: &Labels) -> Result<Document> {
        let mut fields = Document::new();
        for (name, label) in labels.named_labels() {
            fields.insert(name.clone(), self.field_value(name, label));
        }
        for (descriptor, label) in self.index().iter().zip(labels.positional()) {
            let name = descriptor.name();
            if !fields.contains_key(name) {
                fields.insert(name.to_string(), self.field_value(name, label));
            }
        }

        let record = self.schema.construct(fields)?;
        debug!(frame = self.name(), "set");
        self.interface.insert(&record)?;
        Ok(record)
    }

    /// Insert each record independently. Failures are collected, never fatal.
    pub fn concat(&self, records: impl IntoIterator<Item = Document>) -> ConcatOutcome {
        let mut outcome = ConcatOutcome::default();
        for record in records {
            let written = self
                .schema
                .construct(record.clone())
                .and_then(|doc| self.interface.insert(&doc).map(|_| doc));
            match written {
                Ok(doc) => outcome.succeeded.push(doc),
                Err(e) => {
                    warn!(frame = self.name(), error = %e, "record rejected");
                    outcome.failed.push(record);
                    outcome.errors.push(e.to_string());
                }
            }
        }
        debug!(
            frame = self.name(),
            succeeded = outcome.succeeded.len(),
            failed = outcome.failed.len(),
            "concat done"
        );
        outcome
    }

    /// Replace the stored record whose index fields equal `record`'s
    pub fn update(&self, record: Document) -> Result<Document> {
        let record = self.schema.construct(record)?;
        let mut key = Params::new();
        for name in self.index_names() {
            if let Some(value) = record.get(name) {
                key.insert(name, Param::Match(Label::Value(value.clone())));
            }
        }
        debug!(frame = self.name(), key = %key.to_json(), "update");
        self.interface.update(&key, &record)?;
        Ok(record)
    }

    /// Label → stored field value. Interval fields take their canonical form.
    fn field_value(&self, name: &str, label: &Label) -> Value {
        let interval = self
            .index()
            .iter()
            .any(|d| d.name() == name && d.kind() == IndexKind::Interval);
        match label {
            Label::Any => Value::Null,
            _ if interval => match normalize(label) {
                Canonical::One(iv) => iv.to_json(),
                many => many.to_json(),
            },
            other => other.to_json(),
        }
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Frame")
            .field("name", &self.name())
            .field("index", &self.index_names())
            .field("columns", &self.columns())
            .finish()
    }
}

// ============ COLUMN VIEW ============

/// One column of a frame
pub struct Column<'f> {
    frame: &'f Frame,
    name: String,
}

impl<'f> Column<'f> {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Selected records projected to the index fields and this column
    pub fn sel(&self, labels: &Labels) -> Result<Vec<Document>> {
        let index_names = self.frame.index_names();
        Ok(self
            .frame
            .sel(labels)?
            .into_iter()
            .map(|record| {
                record
                    .into_iter()
                    .filter(|(k, _)| k == &self.name || index_names.contains(&k.as_str()))
                    .collect()
            })
            .collect())
    }

    pub fn sel_values(&self, labels: &Labels) -> Result<Vec<Value>> {
        Ok(self
            .frame
            .sel(labels)?
            .into_iter()
            .map(|mut record| record.remove(&self.name).unwrap_or(Value::Null))
            .collect())
    }

    /// First selected value, `EmptySelection` when nothing matches
    pub fn sel_value(&self, labels: &Labels) -> Result<Value> {
        self.sel_values(labels)?.into_iter().next().ok_or(FrameError::EmptySelection)
    }

    pub fn unique(&self) -> Result<Vec<Value>> {
        self.frame.unique(&self.name)
    }

    pub fn min(&self) -> Result<Option<Value>> {
        self.frame.min(&self.name)
    }

    pub fn max(&self) -> Result<Option<Value>> {
        self.frame.max(&self.name)
    }
}

impl fmt::Debug for Column<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Column")
            .field("index", &self.frame.index_names())
            .field("column", &self.name)
            .finish()
    }
}

// ============ ORDERING ============

enum SortKey {
    Num(f64),
    Str(String),
    Null,
}

impl SortKey {
    /// Intervals order by their left bound
    fn from_value(value: &Value) -> Self {
        match value {
            Value::Number(n) => n.as_f64().map(SortKey::Num).unwrap_or(SortKey::Null),
            Value::Bool(b) => SortKey::Num(if *b { 1.0 } else { 0.0 }),
            Value::String(s) => SortKey::Str(s.clone()),
            Value::Object(obj) => obj.get("left").map(SortKey::from_value).unwrap_or(SortKey::Null),
            _ => SortKey::Null,
        }
    }

    fn from_field(doc: &Document, field: &str) -> Self {
        doc.get(field).map(SortKey::from_value).unwrap_or(SortKey::Null)
    }

    fn cmp_key(&self, other: &Self) -> Ordering {
        match (self, other) {
            (SortKey::Num(a), SortKey::Num(b)) => a.total_cmp(b),
            (SortKey::Str(a), SortKey::Str(b)) => a.cmp(b),
            (SortKey::Null, SortKey::Null) => Ordering::Equal,
            (SortKey::Null, _) => Ordering::Greater, // nulls last
            (_, SortKey::Null) => Ordering::Less,
            (SortKey::Num(_), SortKey::Str(_)) => Ordering::Less,
            (SortKey::Str(_), SortKey::Num(_)) => Ordering::Greater,
        }
    }
}
