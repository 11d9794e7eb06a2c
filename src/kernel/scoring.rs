//! Point totals derived from the state tree and the schema.
//!
//! Scores are always recomputed from current state; nothing is cached.

use super::layout::FormLayout;
use super::schema::{FieldDescriptor, FieldKind, FieldSpec};
use super::state::{LeafValue, NodeRef, StateTree};
use serde::Serialize;

/// Score one state section against its schema section.
///
/// Each key present in `state` is paired with the schema child of the same
/// name and contributes through the first matching rule. Keys without a
/// matching rule add nothing. A missing section scores 0.
pub fn section_score(state: Option<NodeRef<'_>>, schema: &FieldDescriptor) -> f64 {
    let Some(state) = state else {
        return 0.0;
    };
    state
        .entries()
        .map(|(key, node)| entry_score(node, schema.child(key)))
        .sum()
}

fn entry_score(node: NodeRef<'_>, descriptor: Option<&FieldDescriptor>) -> f64 {
    if node.is_branch() {
        return match descriptor {
            Some(group) if group.is_group() => section_score(Some(node), group),
            _ => 0.0,
        };
    }
    match node.leaf() {
        Some(leaf) => leaf_score(leaf, descriptor.map(|d| &d.spec)),
        None => 0.0,
    }
}

fn leaf_score(leaf: &LeafValue, spec: Option<&FieldSpec>) -> f64 {
    let points = spec.and_then(FieldSpec::points);
    let kind = spec.and_then(FieldSpec::kind);

    match leaf {
        LeafValue::Number(n) if kind == Some(FieldKind::BooleanWithValue) => *n,
        LeafValue::Bool(checked) => match points {
            Some(p) if *checked => p,
            _ => 0.0,
        },
        LeafValue::Pair(pair) => points.map_or(0.0, |p| f64::from(pair.made) * p),
        LeafValue::Sequence(_) | LeafValue::Set(_) => {
            let (Some(selected), Some((options, values))) =
                (leaf.selections(), spec.and_then(FieldSpec::option_values))
            else {
                return 0.0;
            };
            selected
                .into_iter()
                .map(|choice| option_value(options, values, choice))
                .sum()
        }
        // Raw numeric fields only; timers and other numeric kinds are not points.
        LeafValue::Number(n) => match kind {
            None | Some(FieldKind::Integer) | Some(FieldKind::Float) => *n,
            _ => 0.0,
        },
        LeafValue::Text(choice) => match spec {
            Some(FieldSpec::SingleChoice {
                options,
                values: Some(values),
                ..
            }) => option_value(options, values, choice),
            _ => 0.0,
        },
    }
}

fn option_value(options: &[String], values: &[f64], choice: &str) -> f64 {
    options
        .iter()
        .position(|option| option == choice)
        .and_then(|index| values.get(index))
        .copied()
        .unwrap_or(0.0)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SectionScore {
    pub key: &'static str,
    pub title: &'static str,
    pub points: f64,
}

/// Per-section points for every scored section, plus their sum.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ScoreBreakdown {
    pub sections: Vec<SectionScore>,
    pub total: f64,
}

impl ScoreBreakdown {
    pub fn section(&self, key: &str) -> Option<f64> {
        self.sections
            .iter()
            .find(|s| s.key == key)
            .map(|s| s.points)
    }
}

/// Score every scored section of `layout` against `tree`. Pre-match and
/// miscellaneous sections never count.
pub fn score_form(layout: &FormLayout, tree: &StateTree) -> ScoreBreakdown {
    let root = tree.root();
    let sections: Vec<SectionScore> = layout
        .scored_sections()
        .map(|section| SectionScore {
            key: section.spec.state_key,
            title: section.spec.title,
            points: section_score(root.child(section.spec.state_key), &section.descriptor),
        })
        .collect();
    let total = sections.iter().map(|s| s.points).sum();
    ScoreBreakdown { sections, total }
}

