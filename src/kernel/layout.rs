use super::path::FieldPath;
use super::schema::{interpret_section, FieldDescriptor, FieldSpec};
use super::state::{LeafValue, StateError, StateTree};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The two record types the server accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormKind {
    Match,
    Pit,
}

impl FormKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Match => "match",
            Self::Pit => "pit",
        }
    }

    /// Submission endpoint, relative to the server base URL.
    pub fn endpoint(&self) -> &'static str {
        match self {
            Self::Match => "/api/matches",
            Self::Pit => "/api/pits",
        }
    }

    /// Key of this form's block in the schema document.
    pub fn schema_key(&self) -> &'static str {
        match self {
            Self::Match => "match_form",
            Self::Pit => "pit_form",
        }
    }

    pub fn sections(&self) -> &'static [SectionSpec] {
        match self {
            Self::Match => &MATCH_SECTIONS,
            Self::Pit => &PIT_SECTIONS,
        }
    }
}

impl std::fmt::Display for FormKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fixed top-level section: where its schema comes from, where its state
/// goes, and whether it counts toward the total.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectionSpec {
    pub title: &'static str,
    pub schema_key: &'static str,
    pub state_key: &'static str,
    pub scored: bool,
}

pub const MATCH_SECTIONS: [SectionSpec; 5] = [
    SectionSpec {
        title: "Pre-Match Info",
        schema_key: "pre-match_info",
        state_key: "pre_match_json",
        scored: false,
    },
    SectionSpec {
        title: "Autonomous Period",
        schema_key: "auto_period",
        state_key: "auto_json",
        scored: true,
    },
    SectionSpec {
        title: "Teleop Period",
        schema_key: "teleop_period",
        state_key: "teleop_json",
        scored: true,
    },
    SectionSpec {
        title: "Endgame",
        schema_key: "endgame",
        state_key: "endgame_json",
        scored: true,
    },
    SectionSpec {
        title: "Miscellaneous",
        schema_key: "misc",
        state_key: "misc_json",
        scored: false,
    },
];

pub const PIT_SECTIONS: [SectionSpec; 1] = [SectionSpec {
    title: "Pit Scouting",
    schema_key: "fields",
    state_key: "pit_json",
    scored: false,
}];

/// Top-level slot holding the pit photo reference.
pub const PIT_IMAGE_SLOT: &str = "image_path";

#[derive(Debug, Clone)]
pub struct Section {
    pub spec: SectionSpec,
    pub descriptor: FieldDescriptor,
}

/// Every section of one form, interpreted from the schema document.
#[derive(Debug, Clone)]
pub struct FormLayout {
    pub kind: FormKind,
    pub sections: Vec<Section>,
}

impl FormLayout {
    /// Interpret the part of `document` belonging to `kind`. Missing blocks
    /// and sections come out as empty groups.
    pub fn from_document(kind: FormKind, document: &Value) -> Self {
        let form = document.get(kind.schema_key());
        let sections = kind
            .sections()
            .iter()
            .map(|spec| {
                let node = form.and_then(|f| f.get(spec.schema_key));
                let mut descriptor =
                    interpret_section(node, spec.schema_key, FieldPath::new([spec.state_key]));
                if kind == FormKind::Pit {
                    route_pictures(&mut descriptor);
                }
                Section {
                    spec: *spec,
                    descriptor,
                }
            })
            .collect();
        Self { kind, sections }
    }

    /// A state tree with every section present and every leaf bound to its
    /// kind's default.
    pub fn initial_state(&self) -> Result<StateTree, StateError> {
        let mut tree = StateTree::with_sections(self.sections.iter().map(|s| s.spec.state_key));
        if self.kind == FormKind::Pit {
            tree.bind(&FieldPath::new([PIT_IMAGE_SLOT]), LeafValue::Text(String::new()))?;
        }
        for section in &self.sections {
            for leaf in section.descriptor.leaves() {
                if let Some(default) = leaf.default_value() {
                    tree.bind(&leaf.path, default)?;
                }
            }
        }
        Ok(tree)
    }

    pub fn section(&self, state_key: &str) -> Option<&Section> {
        self.sections.iter().find(|s| s.spec.state_key == state_key)
    }

    /// The descriptor bound at `path`, searching every section.
    pub fn find(&self, path: &FieldPath) -> Option<&FieldDescriptor> {
        self.sections
            .iter()
            .find_map(|section| section.descriptor.find(path))
    }

    pub fn scored_sections(&self) -> impl Iterator<Item = &Section> {
        self.sections.iter().filter(|s| s.spec.scored)
    }
}

/// Pit photos live in the top-level image slot, not inside `pit_json`.
fn route_pictures(section: &mut FieldDescriptor) {
    if let FieldSpec::Group { children } = &mut section.spec {
        for child in children.iter_mut() {
            let is_picture = matches!(child.spec, FieldSpec::ImageReference)
                || child.label.to_lowercase().contains("picture");
            if is_picture {
                child.spec = FieldSpec::ImageReference;
                child.path = FieldPath::new([PIT_IMAGE_SLOT]);
            }
        }
    }
}
