use super::kind::FieldKind;
use crate::kernel::path::FieldPath;
use crate::kernel::state::LeafValue;

/// The interpreter's resolved view of one schema node.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDescriptor {
    /// The schema key (or section key) this node was found under.
    pub label: String,
    /// Where the field's value lives in the state tree. For groups, the
    /// prefix shared by the children.
    pub path: FieldPath,
    pub spec: FieldSpec,
}

/// Kind-specific parameters, one variant per [`FieldKind`] plus `Group`.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldSpec {
    Boolean {
        points: Option<f64>,
    },
    BooleanWithValue {
        points: f64,
    },
    Text,
    Integer,
    Float,
    SingleChoice {
        options: Vec<String>,
        /// Parallel to `options`.
        values: Option<Vec<f64>>,
        image: Option<String>,
    },
    MultipleChoice {
        options: Vec<String>,
        values: Option<Vec<f64>>,
    },
    Timer,
    ImageReference,
    ScoringPair {
        points: Option<f64>,
    },
    Group {
        children: Vec<FieldDescriptor>,
    },
}

impl FieldSpec {
    /// `None` for groups.
    pub fn kind(&self) -> Option<FieldKind> {
        let kind = match self {
            Self::Boolean { .. } => FieldKind::Boolean,
            Self::BooleanWithValue { .. } => FieldKind::BooleanWithValue,
            Self::Text => FieldKind::Text,
            Self::Integer => FieldKind::Integer,
            Self::Float => FieldKind::Float,
            Self::SingleChoice { .. } => FieldKind::SingleChoice,
            Self::MultipleChoice { .. } => FieldKind::MultipleChoice,
            Self::Timer => FieldKind::Timer,
            Self::ImageReference => FieldKind::ImageReference,
            Self::ScoringPair { .. } => FieldKind::ScoringPair,
            Self::Group { .. } => return None,
        };
        Some(kind)
    }

    /// The single numeric point value the node exposes, if any.
    pub fn points(&self) -> Option<f64> {
        match self {
            Self::Boolean { points } | Self::ScoringPair { points } => *points,
            Self::BooleanWithValue { points } => Some(*points),
            _ => None,
        }
    }

    /// Options and their parallel point values, when both are present.
    pub fn option_values(&self) -> Option<(&[String], &[f64])> {
        match self {
            Self::SingleChoice {
                options,
                values: Some(values),
                ..
            }
            | Self::MultipleChoice {
                options,
                values: Some(values),
            } => Some((options.as_slice(), values.as_slice())),
            _ => None,
        }
    }
}

impl FieldDescriptor {
    pub fn kind(&self) -> Option<FieldKind> {
        self.spec.kind()
    }

    pub fn is_group(&self) -> bool {
        matches!(self.spec, FieldSpec::Group { .. })
    }

    pub fn children(&self) -> &[FieldDescriptor] {
        match &self.spec {
            FieldSpec::Group { children } => children.as_slice(),
            _ => &[],
        }
    }

    /// Direct child by schema key.
    pub fn child(&self, key: &str) -> Option<&FieldDescriptor> {
        self.children().iter().find(|child| child.label == key)
    }

    /// The leaf or group whose state path is exactly `path`.
    pub fn find(&self, path: &FieldPath) -> Option<&FieldDescriptor> {
        if &self.path == path {
            return Some(self);
        }
        self.children().iter().find_map(|child| child.find(path))
    }

    /// Depth-first leaves in schema order.
    pub fn leaves(&self) -> Vec<&FieldDescriptor> {
        let mut out = Vec::new();
        self.collect_leaves(&mut out);
        out
    }

    fn collect_leaves<'a>(&'a self, out: &mut Vec<&'a FieldDescriptor>) {
        match &self.spec {
            FieldSpec::Group { children } => {
                for child in children {
                    child.collect_leaves(out);
                }
            }
            _ => out.push(self),
        }
    }

    pub fn default_value(&self) -> Option<LeafValue> {
        self.kind().map(|kind| kind.default_value())
    }
}
