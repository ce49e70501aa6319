use std::collections::BTreeMap;

use hps_core::{
    Coordinate, HpsError, NewRun, ParameterSpace, RunId, RunRecord, SweepId, SweepMethod,
};
use serde_json::json;

fn space() -> ParameterSpace {
    let mut parameters = BTreeMap::new();
    parameters.insert("lr".to_string(), vec![json!(0.1), json!(0.01)]);
    parameters.insert("batch".to_string(), vec![json!({"size": 32}), json!({"size": 64})]);
    ParameterSpace::new(parameters).expect("space")
}

#[test]
fn parameter_space_round_trip_json() {
    let space = space();
    let json = serde_json::to_string(&space).expect("serialize");
    let decoded: ParameterSpace = serde_json::from_str(&json).expect("deserialize");
    assert_eq!(decoded, space);
    assert_eq!(decoded.dimensions().collect::<Vec<_>>(), vec!["batch", "lr"]);
}

#[test]
fn parameter_space_rejects_empty_candidates_on_decode() {
    let err = serde_json::from_str::<ParameterSpace>(r#"{"lr": []}"#).unwrap_err();
    assert!(err.to_string().contains("empty-candidates"));
}

#[test]
fn resolve_maps_digits_in_dimension_order() {
    let assignment = space().resolve(&Coordinate::new(vec![1, 0])).expect("resolve");
    assert_eq!(assignment.get("batch"), Some(&json!({"size": 64})));
    assert_eq!(assignment.get("lr"), Some(&json!(0.1)));
    let encoded = serde_json::to_value(&assignment).expect("serialize");
    assert_eq!(encoded, json!({"batch": {"size": 64}, "lr": 0.1}));
}

#[test]
fn resolve_rejects_out_of_range_digits() {
    let err = space().resolve(&Coordinate::new(vec![0, 2])).unwrap_err();
    assert!(matches!(err, HpsError::Space(ref info) if info.code == "coordinate-range"));
    let err = space().resolve(&Coordinate::new(vec![0])).unwrap_err();
    assert!(matches!(err, HpsError::Space(ref info) if info.code == "coordinate-rank"));
}

#[test]
fn empty_space_resolves_to_empty_assignment() {
    let space = ParameterSpace::default();
    assert!(space.is_empty());
    let assignment = space.resolve(&Coordinate::default()).expect("resolve");
    assert!(assignment.is_empty());
}

#[test]
fn method_tags_round_trip() {
    for method in [SweepMethod::Random, SweepMethod::Grid] {
        assert_eq!(method.as_str().parse::<SweepMethod>().expect("parse"), method);
        let json = serde_json::to_value(method).expect("serialize");
        assert_eq!(json, json!(method.as_str()));
    }
}

#[test]
fn run_record_round_trip_json() {
    let run = RunRecord {
        id: RunId::from_raw(3),
        commit_hash: "asdf".into(),
        command: "thud".into(),
        description: None,
        sweep_id: Some(SweepId::from_raw(1)),
        assignment: Some(space().resolve(&Coordinate::new(vec![0, 1])).expect("resolve")),
        created_at: "2024-01-01T00:00:00Z".into(),
    };
    let json = serde_json::to_string_pretty(&run).expect("serialize");
    let decoded: RunRecord = serde_json::from_str(&json).expect("deserialize");
    assert_eq!(decoded, run);

    let request: NewRun =
        serde_json::from_value(json!({"commit_hash": "a", "command": "b"})).expect("defaults");
    assert_eq!(request.sweep_id, None);
}
