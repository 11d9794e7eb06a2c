use crate::kernel::state::{LeafShape, LeafValue, ScoringPair};
use serde::{Deserialize, Serialize};

/// Every leaf field kind the interpreter can produce. Groups are structural
/// and are not a kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FieldKind {
    Boolean,
    /// Checkbox UI; the stored value is the point value when checked, else 0.
    BooleanWithValue,
    Text,
    Integer,
    Float,
    SingleChoice,
    MultipleChoice,
    /// Hundredths of a second, committed on stop or reset.
    Timer,
    /// Server-assigned reference returned by the upload endpoint.
    ImageReference,
    /// `{made, missed}` counters.
    ScoringPair,
}

impl FieldKind {
    /// Resolve a normalized tag (see [`normalize_tag`]).
    pub fn from_tag(tag: &str) -> Option<Self> {
        let kind = match tag {
            "boolean with value" => Self::BooleanWithValue,
            "boolean" => Self::Boolean,
            "string" | "text" => Self::Text,
            "integer" | "typed integer" => Self::Integer,
            "float" => Self::Float,
            "timer" => Self::Timer,
            "image file" | "picture" | "image" | "image reference" => Self::ImageReference,
            t if t.contains("single choice") => Self::SingleChoice,
            t if t.contains("multiple choice") => Self::MultipleChoice,
            _ => return None,
        };
        Some(kind)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Boolean => "boolean",
            Self::BooleanWithValue => "boolean-with-value",
            Self::Text => "string",
            Self::Integer => "integer",
            Self::Float => "float",
            Self::SingleChoice => "single-choice",
            Self::MultipleChoice => "multiple-choice",
            Self::Timer => "timer",
            Self::ImageReference => "image-reference",
            Self::ScoringPair => "scoring-pair",
        }
    }

    pub fn shape(&self) -> LeafShape {
        match self {
            Self::Boolean => LeafShape::Bool,
            Self::BooleanWithValue | Self::Integer | Self::Float | Self::Timer => LeafShape::Number,
            Self::Text | Self::SingleChoice | Self::ImageReference => LeafShape::Text,
            Self::MultipleChoice => LeafShape::Selection,
            Self::ScoringPair => LeafShape::Pair,
        }
    }

    /// Value given to a field the first time it is bound.
    pub fn default_value(&self) -> LeafValue {
        match self.shape() {
            LeafShape::Bool => LeafValue::Bool(false),
            LeafShape::Number => LeafValue::Number(0.0),
            LeafShape::Text => LeafValue::Text(String::new()),
            LeafShape::Selection => LeafValue::Sequence(Vec::new()),
            LeafShape::Pair => LeafValue::Pair(ScoringPair::default()),
        }
    }
}

/// Lowercase, treat `-` and `_` as spaces, collapse runs of whitespace.
/// `"Boolean_with-Value"` and `"boolean with value"` normalize identically.
pub fn normalize_tag(raw: &str) -> String {
    raw.to_lowercase()
        .replace(['-', '_'], " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}
