use serde_json::{json, Map, Number, Value};
use std::collections::BTreeSet;

/// Attempt/success counters for a point-valued action.
/// `missed` is informational and never scored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScoringPair {
    pub made: u32,
    pub missed: u32,
}

impl ScoringPair {
    pub fn new(made: u32, missed: u32) -> Self {
        Self { made, missed }
    }
}

/// Which counter of a scoring pair an interaction targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attempt {
    Made,
    Missed,
}

/// A leaf in the state tree. Closed set: anything else is a branch.
#[derive(Debug, Clone, PartialEq)]
pub enum LeafValue {
    Bool(bool),
    Number(f64),
    Text(String),
    /// Ordered selection (multiple-choice).
    Sequence(Vec<String>),
    /// Unordered selection.
    Set(BTreeSet<String>),
    Pair(ScoringPair),
}

/// The shape a bound leaf must keep for the life of the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeafShape {
    Bool,
    Number,
    Text,
    /// Either `Sequence` or `Set`.
    Selection,
    Pair,
}

impl LeafShape {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::Number => "number",
            Self::Text => "text",
            Self::Selection => "selection",
            Self::Pair => "scoring pair",
        }
    }
}

impl LeafValue {
    pub fn shape(&self) -> LeafShape {
        match self {
            Self::Bool(_) => LeafShape::Bool,
            Self::Number(_) => LeafShape::Number,
            Self::Text(_) => LeafShape::Text,
            Self::Sequence(_) | Self::Set(_) => LeafShape::Selection,
            Self::Pair(_) => LeafShape::Pair,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_pair(&self) -> Option<ScoringPair> {
        match self {
            Self::Pair(p) => Some(*p),
            _ => None,
        }
    }

    /// Selected options, in selection order for sequences.
    pub fn selections(&self) -> Option<Vec<&str>> {
        match self {
            Self::Sequence(items) => Some(items.iter().map(String::as_str).collect()),
            Self::Set(items) => Some(items.iter().map(String::as_str).collect()),
            _ => None,
        }
    }

    /// Wire form. Whole numbers serialize as JSON integers so the server sees
    /// `3`, not `3.0`. Pairs use the server's `Made`/`Missed` keys.
    pub fn to_json(&self) -> Value {
        match self {
            Self::Bool(b) => Value::Bool(*b),
            Self::Number(n) => number_to_json(*n),
            Self::Text(s) => Value::String(s.clone()),
            Self::Sequence(items) => json!(items),
            Self::Set(items) => json!(items),
            Self::Pair(p) => json!({ "Made": p.made, "Missed": p.missed }),
        }
    }

    /// Best-effort reading of a JSON leaf. Objects shaped like a scoring pair
    /// (`made`/`missed`, any case) become pairs; other objects are branches
    /// and return `None`, as does `null`.
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(b) => Some(Self::Bool(*b)),
            Value::Number(n) => n.as_f64().map(Self::Number),
            Value::String(s) => Some(Self::Text(s.clone())),
            Value::Array(items) => Some(Self::Sequence(
                items
                    .iter()
                    .map(|item| match item {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    })
                    .collect(),
            )),
            Value::Object(map) => pair_from_map(map).map(Self::Pair),
            Value::Null => None,
        }
    }
}

fn number_to_json(n: f64) -> Value {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < i64::MAX as f64 {
        Value::Number(Number::from(n as i64))
    } else {
        Number::from_f64(n).map(Value::Number).unwrap_or(Value::Null)
    }
}

fn pair_from_map(map: &Map<String, Value>) -> Option<ScoringPair> {
    let mut made = None;
    let mut missed = None;
    for (key, value) in map {
        let count = value.as_u64().map(|n| n.min(u32::MAX as u64) as u32);
        match key.to_ascii_lowercase().as_str() {
            "made" => made = count,
            "missed" => missed = count,
            _ => return None,
        }
    }
    made.map(|made| ScoringPair::new(made, missed.unwrap_or(0)))
}

impl From<bool> for LeafValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<f64> for LeafValue {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<i64> for LeafValue {
    fn from(n: i64) -> Self {
        Self::Number(n as f64)
    }
}

impl From<i32> for LeafValue {
    fn from(n: i32) -> Self {
        Self::Number(f64::from(n))
    }
}

impl From<&str> for LeafValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for LeafValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<Vec<String>> for LeafValue {
    fn from(items: Vec<String>) -> Self {
        Self::Sequence(items)
    }
}

impl From<ScoringPair> for LeafValue {
    fn from(p: ScoringPair) -> Self {
        Self::Pair(p)
    }
}
