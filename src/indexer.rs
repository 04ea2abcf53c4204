//! Label Indexers
//!
//! `LocIndexer` selects by (index, columns) keys with column names told
//! apart from index components by membership. `AtIndexer` reads one value
//! at a fully qualified index.

use crate::error::{FrameError, Result};
use crate::frame::Frame;
use crate::types::{Document, IndexKind, Label, Labels};
use serde_json::Value;

/// A single concrete interval: a bounded pair of scalars or an `Interval`
fn is_concrete_interval(label: &Label) -> bool {
    match label {
        Label::Interval(_) => true,
        Label::Tuple(items) => items.len() == 2 && items.iter().all(Label::is_scalar),
        _ => false,
    }
}

/// Spread a tuple label into its components
fn components(label: Label) -> Vec<Label> {
    match label {
        Label::Tuple(items) => items,
        other => vec![other],
    }
}

pub struct LocIndexer<'f> {
    frame: &'f Frame,
}

impl<'f> LocIndexer<'f> {
    pub(crate) fn new(frame: &'f Frame) -> Self {
        Self { frame }
    }

    /// `loc(labels)` is `sel(labels)`
    pub fn call(&self, labels: &Labels) -> Result<Vec<Document>> {
        self.frame.sel(labels)
    }

    /// Select by key. Accepted shapes:
    /// - `(index, column)` or `(index, [columns])`
    /// - a tuple with one more element than there are columns, the last
    ///   element naming a column
    /// - a bare index label or tuple of index labels
    ///
    /// A trailing element that is not a known column joins the index.
    pub fn get(&self, key: impl Into<Label>) -> Result<Vec<Document>> {
        let (index, columns) = self.split(key.into());
        let records = self.frame.sel(&Labels::from(index))?;
        let Some(columns) = columns else {
            return Ok(records);
        };

        let index_names = self.frame.index_names();
        Ok(records
            .into_iter()
            .map(|record| {
                record
                    .into_iter()
                    .filter(|(k, _)| index_names.contains(&k.as_str()) || columns.contains(k))
                    .collect()
            })
            .collect())
    }

    /// Insert at `key`. A mapping value supplies named fields; anything else
    /// is stored as `{"value": value}`.
    pub fn set(&self, key: impl Into<Label>, value: Value) -> Result<Document> {
        let fields = match value {
            Value::Object(fields) => fields,
            other => {
                let mut fields = Document::new();
                fields.insert("value".to_string(), other);
                fields
            }
        };
        let labels = fields
            .into_iter()
            .fold(Labels::from_tuple(key.into()), |labels, (name, v)| {
                labels.named(&name, Label::from_json(v))
            });
        self.frame.set(&labels)
    }

    fn split(&self, key: Label) -> (Vec<Label>, Option<Vec<String>>) {
        let mut items = match key {
            Label::Tuple(items) => items,
            other => return (vec![other], None),
        };

        if items.len() == 2 {
            let (Some(last), Some(first)) = (items.pop(), items.pop()) else {
                return (items, None);
            };
            let mut index = components(first);
            return match self.column_names(&last) {
                Some(columns) => (index, Some(columns)),
                None => {
                    index.push(last);
                    (index, None)
                }
            };
        }

        if items.len() == self.frame.columns().len() + 1 {
            if let Some(columns) = items.last().and_then(|last| self.column_names(last)) {
                items.pop();
                return (items, Some(columns));
            }
        }
        (items, None)
    }

    /// Column names when `label` is a known column or a list of them
    fn column_names(&self, label: &Label) -> Option<Vec<String>> {
        let known = |l: &Label| l.as_str().filter(|s| self.frame.has_column(s)).map(str::to_string);
        match label {
            Label::List(items) if !items.is_empty() => items.iter().map(known).collect(),
            other => known(other).map(|c| vec![c]),
        }
    }
}

pub struct AtIndexer<'f> {
    frame: &'f Frame,
}

impl<'f> AtIndexer<'f> {
    pub(crate) fn new(frame: &'f Frame) -> Self {
        Self { frame }
    }

    /// Value of `column` at a fully qualified index. Every index field must
    /// be given a concrete scalar; interval fields also take a bounded pair.
    pub fn get(&self, index: impl Into<Label>, column: &str) -> Result<Value> {
        if !self.frame.has_column(column) {
            return Err(FrameError::column_not_found(column, self.frame.columns()));
        }

        let index = components(index.into());
        let descriptors = self.frame.index();
        let concrete = |pos: usize, label: &Label| {
            label.is_scalar()
                || (descriptors.get(pos).is_some_and(|d| d.kind() == IndexKind::Interval)
                    && is_concrete_interval(label))
        };
        if let Some((_, bad)) = index.iter().enumerate().find(|(pos, l)| !concrete(*pos, *l)) {
            return Err(FrameError::IllDefinedLocation(format!(
                "{} is not a unique index",
                bad.to_json()
            )));
        }
        let expected = self.frame.index_names().len();
        if index.len() != expected {
            return Err(FrameError::IllDefinedLocation(format!(
                "index has {} labels, expected {expected}",
                index.len()
            )));
        }

        self.frame.column(column)?.sel_value(&Labels::from(index))
    }

    /// Raw-key form: `key` must be exactly `[index, column]`.
    pub fn lookup(&self, key: &[Label]) -> Result<Value> {
        match key {
            [index, column] => {
                let column = column.as_str().ok_or_else(|| {
                    FrameError::IllDefinedLocation(format!("{} is not a column name", column.to_json()))
                })?;
                self.get(index.clone(), column)
            }
            _ => Err(FrameError::IllDefinedLocation(
                "specify at[index, column] where index can be a tuple".to_string(),
            )),
        }
    }
}
