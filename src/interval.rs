//! Interval Normalization
//!
//! Every interval-like label is reduced to a canonical `{left, right}` pair.
//! Sequences are normalized element-wise. There is no failure case.

use crate::types::Label;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Canonical interval bounds. Open bounds are `null`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Interval {
    pub left: Value,
    pub right: Value,
}

impl Interval {
    pub fn new(left: impl Into<Value>, right: impl Into<Value>) -> Self {
        Self { left: left.into(), right: right.into() }
    }

    /// Degenerate interval with equal bounds
    pub fn point(value: impl Into<Value>) -> Self {
        let value = value.into();
        Self { left: value.clone(), right: value }
    }

    pub fn is_point(&self) -> bool {
        self.left == self.right
    }

    pub fn to_json(&self) -> Value {
        serde_json::json!({ "left": self.left, "right": self.right })
    }
}

/// Result of normalizing one label: a single interval or a sequence.
#[derive(Clone, Debug, PartialEq)]
pub enum Canonical {
    One(Interval),
    Many(Vec<Canonical>),
}

impl Canonical {
    pub fn to_json(&self) -> Value {
        match self {
            Canonical::One(iv) => iv.to_json(),
            Canonical::Many(items) => Value::Array(items.iter().map(|c| c.to_json()).collect()),
        }
    }

    /// Flattened view of every interval in this form.
    pub fn intervals(&self) -> Vec<&Interval> {
        match self {
            Canonical::One(iv) => vec![iv],
            Canonical::Many(items) => items.iter().flat_map(|c| c.intervals()).collect(),
        }
    }
}

impl From<Canonical> for Label {
    fn from(c: Canonical) -> Self {
        match c {
            Canonical::One(iv) => Label::Interval(iv),
            Canonical::Many(items) => Label::List(items.into_iter().map(Label::from).collect()),
        }
    }
}

/// Normalize an interval-like label.
///
/// - list → each element normalized, order preserved
/// - pair → `(left, right)`
/// - mapping or interval with `left`/`right` → those bounds
/// - half-open range → `(start, stop)`
/// - anything else → scalar, `left == right`
pub fn normalize(label: &Label) -> Canonical {
    match label {
        Label::List(items) => Canonical::Many(items.iter().map(normalize).collect()),
        Label::Value(Value::Array(items)) => Canonical::Many(
            items.iter().map(|v| normalize(&Label::Value(v.clone()))).collect(),
        ),
        Label::Tuple(items) if items.len() == 2 => {
            Canonical::One(Interval { left: items[0].to_json(), right: items[1].to_json() })
        }
        Label::Interval(iv) => Canonical::One(iv.clone()),
        Label::Value(Value::Object(obj)) if obj.contains_key("left") && obj.contains_key("right") => {
            Canonical::One(Interval { left: obj["left"].clone(), right: obj["right"].clone() })
        }
        Label::Range { start, stop } => Canonical::One(Interval {
            left: start.clone().unwrap_or(Value::Null),
            right: stop.clone().unwrap_or(Value::Null),
        }),
        scalar => Canonical::One(Interval::point(scalar.to_json())),
    }
}
