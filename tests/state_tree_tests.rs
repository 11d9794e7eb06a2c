use scoutbox::kernel::path::FieldPath;
use scoutbox::kernel::state::{LeafValue, ScoringPair, StateError, StateTree};
use serde_json::json;

#[test]
fn test_sibling_writes_share_intermediates() {
    let mut tree = StateTree::new();
    tree.set(&FieldPath::from(["a", "b", "c"]), 5).unwrap();
    tree.set(&FieldPath::from(["a", "b", "d"]), 7).unwrap();

    assert_eq!(tree.get(&FieldPath::from(["a", "b", "c"])), Some(&LeafValue::Number(5.0)));
    assert_eq!(tree.get(&FieldPath::from(["a", "b", "d"])), Some(&LeafValue::Number(7.0)));
    assert_eq!(tree.snapshot(), json!({ "a": { "b": { "c": 5, "d": 7 } } }));
}

#[test]
fn test_get_on_missing_or_leaf_intermediate() {
    let mut tree = StateTree::new();
    tree.set(&FieldPath::from(["a"]), "leaf").unwrap();

    assert_eq!(tree.get(&FieldPath::from(["missing", "x"])), None);
    assert_eq!(tree.get(&FieldPath::from(["a", "x"])), None);
}

#[test]
fn test_empty_path_is_an_error() {
    let mut tree = StateTree::new();
    assert_eq!(tree.set(&FieldPath::root(), 1), Err(StateError::EmptyPath));
    assert_eq!(tree.version(), 0);
}

#[test]
fn test_leaf_in_the_way_becomes_a_branch() {
    let mut tree = StateTree::new();
    tree.set(&FieldPath::from(["a"]), 1).unwrap();
    tree.set(&FieldPath::from(["a", "b"]), 2).unwrap();

    assert_eq!(tree.get(&FieldPath::from(["a"])), None);
    assert!(tree.node(&FieldPath::from(["a"])).unwrap().is_branch());
    assert_eq!(tree.snapshot(), json!({ "a": { "b": 2 } }));
}

#[test]
fn test_overwriting_a_branch_with_a_leaf() {
    let mut tree = StateTree::new();
    tree.set(&FieldPath::from(["a", "b"]), 2).unwrap();
    tree.set(&FieldPath::from(["a"]), true).unwrap();
    assert_eq!(tree.snapshot(), json!({ "a": true }));

    // Released nodes are reused without disturbing live ones.
    tree.set(&FieldPath::from(["c", "d"]), 4).unwrap();
    assert_eq!(tree.snapshot(), json!({ "a": true, "c": { "d": 4 } }));
}

#[test]
fn test_bound_shape_is_enforced() {
    let mut tree = StateTree::new();
    let path = FieldPath::from(["auto_json", "leave"]);
    tree.bind(&path, LeafValue::Bool(false)).unwrap();

    let err = tree.set(&path, 3).unwrap_err();
    assert!(matches!(err, StateError::ShapeMismatch { expected: "bool", actual: "number", .. }));
    assert_eq!(tree.get(&path), Some(&LeafValue::Bool(false)));

    // Unbound paths take anything.
    tree.set(&FieldPath::from(["auto_json", "free"]), 3).unwrap();
    tree.set(&FieldPath::from(["auto_json", "free"]), "text").unwrap();
}

#[test]
fn test_rebinding_keeps_existing_value() {
    let mut tree = StateTree::new();
    let path = FieldPath::from(["misc_json", "notes"]);
    tree.set(&path, "fast robot").unwrap();
    tree.bind(&path, LeafValue::Text(String::new())).unwrap();
    assert_eq!(tree.get(&path), Some(&LeafValue::Text("fast robot".into())));

    tree.bind(&path, LeafValue::Bool(false)).unwrap();
    assert_eq!(tree.get(&path), Some(&LeafValue::Bool(false)));
}

#[test]
fn test_version_counts_mutations() {
    let mut tree = StateTree::with_sections(["auto_json"]);
    let before = tree.version();
    tree.set(&FieldPath::from(["auto_json", "x"]), 1).unwrap();
    tree.set(&FieldPath::from(["auto_json", "x"]), 2).unwrap();
    assert_eq!(tree.version(), before + 2);
}

#[test]
fn test_snapshot_round_trip_reads_pairs() {
    let snapshot = json!({
        "auto_json": { "L1": { "Made": 3, "Missed": 1 }, "leave": 3.5 },
        "pre_match_json": { "team": "4123", "gone": null }
    });
    let tree = StateTree::from_json(&snapshot);

    assert_eq!(
        tree.get(&FieldPath::from(["auto_json", "L1"])),
        Some(&LeafValue::Pair(ScoringPair::new(3, 1)))
    );
    assert_eq!(tree.get(&FieldPath::from(["pre_match_json", "gone"])), None);
    assert_eq!(
        tree.snapshot(),
        json!({
            "auto_json": { "L1": { "Made": 3, "Missed": 1 }, "leave": 3.5 },
            "pre_match_json": { "team": "4123" }
        })
    );
}

#[test]
fn test_pairs_serialize_with_server_keys() {
    let mut tree = StateTree::new();
    tree.set(&FieldPath::from(["teleop_json", "L4"]), ScoringPair::new(2, 5))
        .unwrap();

    assert_eq!(
        tree.snapshot(),
        json!({ "teleop_json": { "L4": { "Made": 2, "Missed": 5 } } })
    );
    let pair = &tree.snapshot()["teleop_json"]["L4"];
    assert!(pair.get("made").is_none());
    assert!(pair.get("missed").is_none());
}

#[test]
fn test_lowercase_pairs_still_read_back() {
    let tree = StateTree::from_json(&json!({ "auto_json": { "L1": { "made": 4, "missed": 2 } } }));
    assert_eq!(
        tree.get(&FieldPath::from(["auto_json", "L1"])),
        Some(&LeafValue::Pair(ScoringPair::new(4, 2)))
    );
}

#[test]
fn test_write_beneath_bound_leaf_is_rejected() {
    let mut tree = StateTree::new();
    let l1 = FieldPath::from(["auto_json", "L1"]);
    tree.bind(&l1, LeafValue::Pair(ScoringPair::default())).unwrap();
    tree.set(&l1, ScoringPair::new(3, 0)).unwrap();
    let version = tree.version();

    let err = tree
        .set(&FieldPath::from(["auto_json", "L1", "x"]), 1)
        .unwrap_err();
    assert_eq!(
        err,
        StateError::ShapeMismatch {
            path: l1.clone(),
            expected: "scoring pair",
            actual: "branch",
        }
    );
    assert_eq!(tree.get(&l1), Some(&LeafValue::Pair(ScoringPair::new(3, 0))));
    assert_eq!(tree.version(), version);

    assert!(tree.ensure_branch(&l1).is_err());
    assert!(tree.ensure_branch(&FieldPath::from(["auto_json", "L1", "deep"])).is_err());
    assert_eq!(tree.get(&l1), Some(&LeafValue::Pair(ScoringPair::new(3, 0))));
}

#[test]
fn test_overwriting_branch_with_bound_fields_is_rejected() {
    let mut tree = StateTree::new();
    let l1 = FieldPath::from(["auto_json", "L1"]);
    tree.bind(&l1, LeafValue::Pair(ScoringPair::default())).unwrap();
    tree.set(&l1, ScoringPair::new(3, 0)).unwrap();

    let err = tree.set(&FieldPath::from(["auto_json"]), 5).unwrap_err();
    assert!(matches!(
        err,
        StateError::ShapeMismatch { expected: "branch", actual: "number", .. }
    ));
    assert!(tree.node(&FieldPath::from(["auto_json"])).unwrap().is_branch());
    assert_eq!(tree.get(&l1), Some(&LeafValue::Pair(ScoringPair::new(3, 0))));
    assert_eq!(tree.shape_of(&l1), Some(scoutbox::kernel::state::LeafShape::Pair));

    // Siblings of bound fields stay writable.
    tree.set(&FieldPath::from(["auto_json", "note"]), "ok").unwrap();
}

#[test]
fn test_dotted_paths() {
    let path = FieldPath::parse_dotted("teleop_json.coral.L2");
    assert_eq!(path, FieldPath::from(["teleop_json", "coral", "L2"]));
    assert_eq!(path.to_string(), "teleop_json.coral.L2");
    assert!(FieldPath::parse_dotted("").is_empty());
}
