use crate::interval::Interval;
use indexmap::IndexMap;
use serde_json::Value;
use smallvec::SmallVec;
use std::fmt;
use std::ops::{Range, RangeFrom, RangeFull, RangeTo};

/// A record as stored by a backend: field name → value, insertion ordered.
pub type Document = serde_json::Map<String, Value>;

// ============ INDEX DESCRIPTORS ============

/// Tag of an index descriptor variant, used in error reports.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum IndexKind {
    Value,
    Interpolating,
    Interval,
    Composite,
}

impl fmt::Display for IndexKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            IndexKind::Value => "value",
            IndexKind::Interpolating => "interpolating",
            IndexKind::Interval => "interval",
            IndexKind::Composite => "composite",
        };
        f.write_str(name)
    }
}

/// One addressable dimension of an entity and how labels match it.
#[derive(Clone, Debug, PartialEq)]
pub enum IndexDescriptor {
    /// Exact match
    Value { name: String },
    /// Nearest match. Compiles like `Value`; interpolation happens downstream.
    Interpolating { name: String },
    /// Overlap against a `{left, right}` range
    Interval { name: String },
    /// Ordered group of descriptors treated as one multi-field key
    Composite { name: String, children: Vec<IndexDescriptor> },
}

impl IndexDescriptor {
    pub fn value(name: &str) -> Self {
        IndexDescriptor::Value { name: name.to_string() }
    }

    pub fn interpolating(name: &str) -> Self {
        IndexDescriptor::Interpolating { name: name.to_string() }
    }

    pub fn interval(name: &str) -> Self {
        IndexDescriptor::Interval { name: name.to_string() }
    }

    pub fn composite(name: &str, children: Vec<IndexDescriptor>) -> Self {
        IndexDescriptor::Composite { name: name.to_string(), children }
    }

    pub fn name(&self) -> &str {
        match self {
            IndexDescriptor::Value { name }
            | IndexDescriptor::Interpolating { name }
            | IndexDescriptor::Interval { name }
            | IndexDescriptor::Composite { name, .. } => name,
        }
    }

    pub fn kind(&self) -> IndexKind {
        match self {
            IndexDescriptor::Value { .. } => IndexKind::Value,
            IndexDescriptor::Interpolating { .. } => IndexKind::Interpolating,
            IndexDescriptor::Interval { .. } => IndexKind::Interval,
            IndexDescriptor::Composite { .. } => IndexKind::Composite,
        }
    }

    /// Field names addressed by this descriptor, children first for composites.
    pub fn field_names(&self) -> Vec<&str> {
        match self {
            IndexDescriptor::Composite { children, .. } => {
                children.iter().flat_map(|c| c.field_names()).collect()
            }
            other => vec![other.name()],
        }
    }

    /// Non-composite descriptors in declared order, nested groups flattened.
    pub fn leaves(&self) -> Vec<&IndexDescriptor> {
        match self {
            IndexDescriptor::Composite { children, .. } => {
                children.iter().flat_map(|c| c.leaves()).collect()
            }
            other => vec![other],
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            IndexDescriptor::Composite { name, children } => serde_json::json!({
                "kind": "composite",
                "name": name,
                "children": children.iter().map(|c| c.to_json()).collect::<Vec<_>>(),
            }),
            other => serde_json::json!({ "kind": other.kind().to_string(), "name": other.name() }),
        }
    }
}

// ============ LABELS ============

/// A user-supplied selector for one index dimension.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum Label {
    /// Unconstrained (select all along this dimension)
    #[default]
    Any,
    /// A concrete value (scalar, or a JSON mapping such as `{"left", "right"}`)
    Value(Value),
    /// Half-open range `start..stop`, either bound may be open
    Range { start: Option<Value>, stop: Option<Value> },
    /// A canonical interval
    Interval(Interval),
    /// Several alternatives for one dimension
    List(Vec<Label>),
    /// Positional group: a pair for intervals, per-child labels for composites
    Tuple(Vec<Label>),
    /// Per-child labels addressed by name
    Keyed(IndexMap<String, Label>),
}

impl Label {
    pub fn range(start: impl Into<Value>, stop: impl Into<Value>) -> Self {
        Label::Range { start: Some(start.into()), stop: Some(stop.into()) }
    }

    pub fn is_any(&self) -> bool {
        matches!(self, Label::Any)
    }

    /// A single concrete value: no wildcard, range, list, or group.
    pub fn is_scalar(&self) -> bool {
        matches!(self, Label::Value(v) if !v.is_null() && !v.is_array())
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Label::Value(Value::String(s)) => Some(s),
            _ => None,
        }
    }

    /// Build a label from its JSON form. `null` is a wildcard and arrays are
    /// positional groups, so `[0, 10]` reads as a pair.
    pub fn from_json(value: Value) -> Self {
        match value {
            Value::Null => Label::Any,
            Value::Array(items) => Label::Tuple(items.into_iter().map(Label::from_json).collect()),
            other => Label::Value(other),
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            Label::Any => Value::Null,
            Label::Value(v) => v.clone(),
            Label::Range { start, stop } => serde_json::json!({
                "start": start.clone().unwrap_or(Value::Null),
                "stop": stop.clone().unwrap_or(Value::Null),
            }),
            Label::Interval(iv) => iv.to_json(),
            Label::List(items) | Label::Tuple(items) => {
                Value::Array(items.iter().map(|l| l.to_json()).collect())
            }
            Label::Keyed(map) => Value::Object(
                map.iter().map(|(k, l)| (k.clone(), l.to_json())).collect(),
            ),
        }
    }

    /// Split a composite label into one label per child, in declared order.
    /// Missing components are wildcards; surplus components are ignored.
    pub fn components(&self, children: &[IndexDescriptor]) -> Vec<Label> {
        let mut parts: Vec<Label> = match self {
            Label::Any => Vec::new(),
            Label::Tuple(items) | Label::List(items) => items.clone(),
            Label::Keyed(map) => children
                .iter()
                .map(|c| map.get(c.name()).cloned().unwrap_or_default())
                .collect(),
            Label::Value(Value::Array(items)) => items.iter().cloned().map(Label::from).collect(),
            Label::Value(Value::Object(obj)) => children
                .iter()
                .map(|c| obj.get(c.name()).cloned().map(Label::from).unwrap_or_default())
                .collect(),
            other => vec![other.clone()],
        };
        parts.resize(children.len(), Label::Any);
        parts
    }
}

impl From<Value> for Label {
    fn from(value: Value) -> Self {
        if value.is_null() { Label::Any } else { Label::Value(value) }
    }
}

impl From<&str> for Label {
    fn from(s: &str) -> Self { Label::Value(Value::from(s)) }
}

impl From<String> for Label {
    fn from(s: String) -> Self { Label::Value(Value::from(s)) }
}

impl From<bool> for Label {
    fn from(b: bool) -> Self { Label::Value(Value::from(b)) }
}

impl From<i32> for Label {
    fn from(n: i32) -> Self { Label::Value(Value::from(n)) }
}

impl From<i64> for Label {
    fn from(n: i64) -> Self { Label::Value(Value::from(n)) }
}

impl From<u32> for Label {
    fn from(n: u32) -> Self { Label::Value(Value::from(n)) }
}

impl From<u64> for Label {
    fn from(n: u64) -> Self { Label::Value(Value::from(n)) }
}

impl From<f64> for Label {
    fn from(n: f64) -> Self { Label::Value(Value::from(n)) }
}

impl From<Interval> for Label {
    fn from(iv: Interval) -> Self { Label::Interval(iv) }
}

impl<T: Into<Value>> From<Range<T>> for Label {
    fn from(r: Range<T>) -> Self {
        Label::Range { start: Some(r.start.into()), stop: Some(r.end.into()) }
    }
}

impl<T: Into<Value>> From<RangeFrom<T>> for Label {
    fn from(r: RangeFrom<T>) -> Self {
        Label::Range { start: Some(r.start.into()), stop: None }
    }
}

impl<T: Into<Value>> From<RangeTo<T>> for Label {
    fn from(r: RangeTo<T>) -> Self {
        Label::Range { start: None, stop: Some(r.end.into()) }
    }
}

impl From<RangeFull> for Label {
    fn from(_: RangeFull) -> Self {
        Label::Range { start: None, stop: None }
    }
}

impl<A: Into<Label>, B: Into<Label>> From<(A, B)> for Label {
    fn from((a, b): (A, B)) -> Self {
        Label::Tuple(vec![a.into(), b.into()])
    }
}

impl<A: Into<Label>, B: Into<Label>, C: Into<Label>> From<(A, B, C)> for Label {
    fn from((a, b, c): (A, B, C)) -> Self {
        Label::Tuple(vec![a.into(), b.into(), c.into()])
    }
}

impl<T: Into<Label>> From<Vec<T>> for Label {
    fn from(items: Vec<T>) -> Self {
        Label::List(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Label>> From<Option<T>> for Label {
    fn from(opt: Option<T>) -> Self {
        opt.map(Into::into).unwrap_or(Label::Any)
    }
}

/// Positional and named labels of one facade call.
///
/// Positional labels bind to index fields in declared order; named labels
/// address fields by name.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Labels {
    positional: SmallVec<[Label; 4]>,
    named: IndexMap<String, Label>,
}

impl Labels {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a positional label
    pub fn arg(mut self, label: impl Into<Label>) -> Self {
        self.positional.push(label.into());
        self
    }

    /// Set a named label, replacing an earlier one with the same name
    pub fn named(mut self, name: &str, label: impl Into<Label>) -> Self {
        self.named.insert(name.to_string(), label.into());
        self
    }

    /// Positional labels taken from a tuple label, or the label itself.
    pub fn from_tuple(label: Label) -> Self {
        match label {
            Label::Tuple(items) => Self { positional: items.into_iter().collect(), named: IndexMap::new() },
            other => Self::new().arg(other),
        }
    }

    pub fn positional(&self) -> &[Label] {
        &self.positional
    }

    pub fn named_labels(&self) -> &IndexMap<String, Label> {
        &self.named
    }

    pub fn is_empty(&self) -> bool {
        self.positional.is_empty() && self.named.is_empty()
    }
}

impl From<Vec<Label>> for Labels {
    fn from(items: Vec<Label>) -> Self {
        Self { positional: items.into_iter().collect(), named: IndexMap::new() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_descriptor_field_names() {
        let idx = IndexDescriptor::composite(
            "reading",
            vec![IndexDescriptor::value("sensor"), IndexDescriptor::interval("time")],
        );
        assert_eq!(idx.field_names(), vec!["sensor", "time"]);
        let kinds: Vec<IndexKind> = idx.leaves().iter().map(|d| d.kind()).collect();
        assert_eq!(kinds, vec![IndexKind::Value, IndexKind::Interval]);
        assert_eq!(idx.kind(), IndexKind::Composite);
        assert_eq!(idx.to_json()["children"][1]["kind"], "interval");
    }

    #[test]
    fn test_label_from_json() {
        assert_eq!(Label::from_json(Value::Null), Label::Any);
        assert_eq!(
            Label::from_json(json!([0, 10])),
            Label::Tuple(vec![Label::from(0), Label::from(10)])
        );
        assert_eq!(Label::from_json(json!("a")), Label::from("a"));
    }

    #[test]
    fn test_label_scalar() {
        assert!(Label::from(5).is_scalar());
        assert!(Label::from("x").is_scalar());
        assert!(!Label::Any.is_scalar());
        assert!(!Label::from(..).is_scalar());
        assert!(!Label::from(vec![1, 2]).is_scalar());
        assert!(!Label::from((1, 2)).is_scalar());
    }

    #[test]
    fn test_components_tuple_and_keyed() {
        let children = vec![IndexDescriptor::value("a"), IndexDescriptor::interval("b")];

        let parts = Label::from((5, (0, 10))).components(&children);
        assert_eq!(parts[0], Label::from(5));
        assert_eq!(parts[1], Label::from((0, 10)));

        let mut keyed = IndexMap::new();
        keyed.insert("b".to_string(), Label::from(3));
        let parts = Label::Keyed(keyed).components(&children);
        assert_eq!(parts, vec![Label::Any, Label::from(3)]);

        let parts = Label::from(7).components(&children);
        assert_eq!(parts, vec![Label::from(7), Label::Any]);
    }

    #[test]
    fn test_labels_builder() {
        let labels = Labels::new().arg(1).named("b", "x").named("b", "y");
        assert_eq!(labels.positional(), &[Label::from(1)]);
        assert_eq!(labels.named_labels().get("b"), Some(&Label::from("y")));
        assert!(!labels.is_empty());
    }
}
