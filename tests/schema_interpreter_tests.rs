mod common;

use scoutbox::kernel::layout::{FormKind, FormLayout, PIT_IMAGE_SLOT};
use scoutbox::kernel::path::FieldPath;
use scoutbox::kernel::schema::{interpret, interpret_section, normalize_tag, FieldKind, FieldSpec};
use serde_json::json;

fn field(node: serde_json::Value) -> FieldSpec {
    interpret(&node, "f", FieldPath::new(["s", "f"])).spec
}

#[test]
fn test_boolean_with_value_carries_points() {
    assert_eq!(
        field(json!({ "type": "boolean with value", "value": 3 })),
        FieldSpec::BooleanWithValue { points: 3.0 }
    );
    // Capitalized meta keys and odd separators resolve the same way.
    assert_eq!(
        field(json!({ "Type": "Boolean_With-Value", "Value": "1.5" })),
        FieldSpec::BooleanWithValue { points: 1.5 }
    );
}

#[test]
fn test_tag_normalization() {
    assert_eq!(normalize_tag("  Typed   Integer "), "typed integer");
    assert_eq!(normalize_tag("single-choice"), "single choice");
    assert_eq!(FieldKind::from_tag("typed integer"), Some(FieldKind::Integer));
    assert_eq!(FieldKind::from_tag("image file"), Some(FieldKind::ImageReference));
    assert_eq!(FieldKind::from_tag("single choice with image"), Some(FieldKind::SingleChoice));
    assert_eq!(FieldKind::from_tag("hologram"), None);
}

#[test]
fn test_scoring_pair_detection() {
    assert_eq!(field(json!({ "Value": 2 })), FieldSpec::ScoringPair { points: Some(2.0) });
    assert_eq!(field(json!({ "made": 0, "missed": 0 })), FieldSpec::ScoringPair { points: None });
}

#[test]
fn test_quoted_point_values_do_not_score() {
    assert_eq!(field(json!({ "Value": "2" })), FieldSpec::ScoringPair { points: None });
    assert_eq!(
        field(json!({ "type": "boolean", "value": "4" })),
        FieldSpec::Boolean { points: None }
    );
    assert_eq!(
        field(json!({ "type": "boolean", "value": 4 })),
        FieldSpec::Boolean { points: Some(4.0) }
    );
}

#[test]
fn test_inferred_single_choice_with_values() {
    assert_eq!(
        field(json!({ "options": ["Parked", "Climbed"], "values": [2, 6] })),
        FieldSpec::SingleChoice {
            options: vec!["Parked".into(), "Climbed".into()],
            values: Some(vec![2.0, 6.0]),
            image: None,
        }
    );
}

#[test]
fn test_multiple_choice_and_list_alias() {
    let spec = field(json!({ "type": "Multiple Choice", "list": ["a", "b"], "values": [1, "x"] }));
    assert_eq!(
        spec,
        FieldSpec::MultipleChoice {
            options: vec!["a".into(), "b".into()],
            values: Some(vec![1.0, 0.0]),
        }
    );
}

#[test]
fn test_unrecognized_nodes_fall_back_to_text() {
    assert_eq!(field(json!("anything")), FieldSpec::Text);
    assert_eq!(field(json!(12)), FieldSpec::Text);
    assert_eq!(field(json!({ "type": "hologram" })), FieldSpec::Text);
}

#[test]
fn test_group_recurses_in_schema_order_and_skips_meta_keys() {
    let node = json!({
        "zeta": { "Value": 1 },
        "alpha": { "type": "integer" },
        "options": "not a field"
    });
    let group = interpret_section(Some(&node), "teleop_period", FieldPath::new(["teleop_json"]));
    let labels: Vec<&str> = group.children().iter().map(|c| c.label.as_str()).collect();
    assert_eq!(labels, vec!["zeta", "alpha"]);
    assert_eq!(group.children()[1].path, FieldPath::new(["teleop_json", "alpha"]));
}

#[test]
fn test_nested_group_paths() {
    let node = json!({ "coral": { "L2": { "Value": 3 } } });
    let group = interpret_section(Some(&node), "teleop_period", FieldPath::new(["teleop_json"]));
    let leaves = group.leaves();
    assert_eq!(leaves.len(), 1);
    assert_eq!(leaves[0].path, FieldPath::new(["teleop_json", "coral", "L2"]));
}

#[test]
fn test_match_layout_sections_and_missing_blocks() {
    let layout = FormLayout::from_document(FormKind::Match, &json!({}));
    let keys: Vec<&str> = layout.sections.iter().map(|s| s.spec.state_key).collect();
    assert_eq!(keys, vec!["pre_match_json", "auto_json", "teleop_json", "endgame_json", "misc_json"]);
    assert!(layout.sections.iter().all(|s| s.descriptor.children().is_empty()));

    let tree = layout.initial_state().unwrap();
    assert_eq!(
        tree.snapshot(),
        json!({ "pre_match_json": {}, "auto_json": {}, "teleop_json": {}, "endgame_json": {}, "misc_json": {} })
    );
}

#[test]
fn test_pit_pictures_bind_to_image_slot() {
    let layout = FormLayout::from_document(FormKind::Pit, &common::sample_document());
    let picture = layout.find(&FieldPath::new([PIT_IMAGE_SLOT])).unwrap();
    assert_eq!(picture.label, "Robot Picture");
    assert_eq!(picture.spec, FieldSpec::ImageReference);

    let tree = layout.initial_state().unwrap();
    assert_eq!(
        tree.snapshot(),
        json!({ "pit_json": { "drivetrain": "", "weight": 0 }, "image_path": "" })
    );
}

#[test]
fn test_initial_state_defaults() {
    let layout = FormLayout::from_document(FormKind::Match, &common::sample_document());
    let snapshot = layout.initial_state().unwrap().snapshot();
    assert_eq!(snapshot["auto_json"]["leave"], json!(0));
    assert_eq!(snapshot["auto_json"]["L1"], json!({ "Made": 0, "Missed": 0 }));
    assert_eq!(snapshot["teleop_json"]["defense"], json!([]));
    assert_eq!(snapshot["teleop_json"]["assist"], json!(false));
    assert_eq!(snapshot["misc_json"]["notes"], json!(""));
}
