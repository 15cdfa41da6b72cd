use iscc_common::base32;
use iscc_common::codec;
use iscc_common::compare::{self, UnitComparison};
use iscc_common::error::Error;

fn unit_code(maintype: u32, subtype: u32, payload: &[u8]) -> String {
    codec::encode_component(maintype, subtype, 0, payload.len() as u32 * 8, payload)
        .expect("valid unit fixture")
}

fn composite_code(subtype: u32, composition: u32, body: &[u8]) -> String {
    let mut raw = codec::encode_header(5, subtype, 0, composition);
    raw.extend_from_slice(body);
    format!("ISCC:{}", base32::encode(&raw))
}

fn instance_code(payload: &[u8]) -> String {
    unit_code(4, 0, payload)
}

#[test]
fn identical_codes_score_one() {
    let code = unit_code(2, 0, &[0x42; 8]);
    let result = compare::compare(&code, &code).unwrap();

    assert_eq!(result.score, Some(1.0));
    match &result.types["content"] {
        UnitComparison::Similarity(sim) => {
            assert_eq!(sim.score, 1.0);
            assert_eq!(sim.distance, 0);
            assert_eq!(sim.bits, 64);
        }
        other => panic!("expected similarity outcome, got {other:?}"),
    }
}

#[test]
fn different_codes_score_below_one() {
    let a = unit_code(2, 0, &[0b1111_0000; 8]);
    let b = unit_code(2, 0, &[0b1111_0011; 8]);
    let result = compare::compare(&a, &b).unwrap();

    let score = result.score.unwrap();
    assert!(score > 0.0 && score < 1.0, "score was {score}");
    match &result.types["content"] {
        UnitComparison::Similarity(sim) => {
            assert_eq!(sim.distance, 16);
            assert_eq!(sim.bits, 64);
        }
        other => panic!("expected similarity outcome, got {other:?}"),
    }
}

#[test]
fn meta_codes_report_similarity() {
    let a = unit_code(0, 0, &[0x10; 8]);
    let b = unit_code(0, 0, &[0x11; 8]);
    let result = compare::compare(&a, &b).unwrap();
    assert!(matches!(
        result.types["meta"],
        UnitComparison::Similarity(_)
    ));
}

#[test]
fn matching_instances() {
    let a = instance_code(b"testtest");
    let b = instance_code(b"testtest");
    let result = compare::compare(&a, &b).unwrap();

    assert_eq!(
        result.types["instance"],
        UnitComparison::Match { matched: true }
    );
    assert_eq!(result.score, Some(1.0));
}

#[test]
fn mismatched_instances() {
    let a = instance_code(b"testtest");
    let b = instance_code(b"othercod");
    let result = compare::compare(&a, &b).unwrap();

    assert_eq!(
        result.types["instance"],
        UnitComparison::Match { matched: false }
    );
    assert_eq!(result.score, Some(0.0));
}

#[test]
fn no_compatible_units() {
    let meta = unit_code(0, 0, &[1; 8]);
    let content = unit_code(2, 0, &[1; 8]);
    let result = compare::compare(&meta, &content).unwrap();

    assert!(result.types.is_empty());
    assert_eq!(result.score, None);
}

#[test]
fn subtype_mismatch_is_incompatible() {
    let text = unit_code(2, 0, &[1; 8]);
    let image = unit_code(2, 1, &[1; 8]);
    let result = compare::compare(&text, &image).unwrap();
    assert!(result.types.is_empty());
    assert_eq!(result.score, None);
}

#[test]
fn version_mismatch_is_incompatible() {
    let v0 = unit_code(3, 0, &[1; 8]);
    let v1 = codec::encode_component(3, 0, 1, 64, &[1; 8]).unwrap();
    let result = compare::compare(&v0, &v1).unwrap();
    assert!(result.types.is_empty());
}

#[test]
fn different_declared_lengths_compare_on_shared_prefix() {
    let short = unit_code(3, 0, &[0xEE; 8]);
    let long = unit_code(3, 0, &[0xEE; 16]);
    let result = compare::compare(&short, &long).unwrap();

    match &result.types["data"] {
        UnitComparison::Similarity(sim) => {
            assert_eq!(sim.bits, 64);
            assert_eq!(sim.score, 1.0);
        }
        other => panic!("expected similarity outcome, got {other:?}"),
    }
}

#[test]
fn composites_compare_per_unit() {
    let mut body_a = vec![0u8; 24];
    let mut body_b = vec![0u8; 24];
    // Shared content digest, shared data digest, different instance digest.
    body_a[..16].copy_from_slice(&[0xAA; 16]);
    body_b[..16].copy_from_slice(&[0xAA; 16]);
    body_a[16..].copy_from_slice(&[0x01; 8]);
    body_b[16..].copy_from_slice(&[0x02; 8]);

    let a = composite_code(0, 1, &body_a);
    let b = composite_code(0, 1, &body_b);
    let result = compare::compare(&a, &b).unwrap();

    assert_eq!(result.types.len(), 3);
    assert!(matches!(
        result.types["content"],
        UnitComparison::Similarity(_)
    ));
    assert!(matches!(result.types["data"], UnitComparison::Similarity(_)));
    assert_eq!(
        result.types["instance"],
        UnitComparison::Match { matched: false }
    );
    // content 1.0 + data 1.0 + instance 0.0, averaged.
    let score = result.score.unwrap();
    assert!((score - 2.0 / 3.0).abs() < 1e-12);
}

#[test]
fn composite_against_own_unit() {
    let body: Vec<u8> = (0u8..24).collect();
    let composite = composite_code(0, 1, &body);
    let units = codec::decompose(&composite).unwrap();

    // The instance unit of the composite matches itself.
    let result = compare::compare(&composite, &units[2]).unwrap();
    assert_eq!(result.types.len(), 1);
    assert_eq!(
        result.types["instance"],
        UnitComparison::Match { matched: true }
    );
    assert_eq!(result.score, Some(1.0));
}

#[test]
fn self_comparison_of_composite_is_perfect() {
    let body: Vec<u8> = (0u8..40).collect();
    let code = composite_code(0, 7, &body);
    let result = compare::compare(&code, &code).unwrap();

    assert_eq!(result.types.len(), 5);
    assert_eq!(result.score, Some(1.0));
    for (name, outcome) in &result.types {
        match outcome {
            UnitComparison::Match { matched } => assert!(matched, "{name} did not match"),
            UnitComparison::Similarity(sim) => {
                assert_eq!(sim.distance, 0, "{name} had nonzero distance");
            }
        }
    }
}

#[test]
fn malformed_input_is_an_error() {
    let code = unit_code(2, 0, &[1; 8]);
    assert!(matches!(
        compare::compare("INVALID!", &code),
        Err(Error::Malformed(_))
    ));
    assert!(matches!(
        compare::compare(&code, "INVALID!"),
        Err(Error::Malformed(_))
    ));
}

#[test]
fn json_shape_matches_the_toolkit() {
    let a = instance_code(b"testtest");
    let result = compare::compare(&a, &a).unwrap();
    let json = serde_json::to_value(&result).unwrap();

    assert_eq!(json["types"]["instance"]["match"], true);
    assert_eq!(json["score"], 1.0);
    assert!(json.get("degenerate").is_none());

    let content = unit_code(2, 0, &[3; 8]);
    let json = serde_json::to_value(compare::compare(&content, &content).unwrap()).unwrap();
    assert_eq!(json["types"]["content"]["score"], 1.0);
    assert_eq!(json["types"]["content"]["distance"], 0);
    assert_eq!(json["types"]["content"]["bits"], 64);

    let meta = unit_code(0, 0, &[3; 8]);
    let json = serde_json::to_value(compare::compare(&meta, &content).unwrap()).unwrap();
    assert_eq!(json["score"], serde_json::Value::Null);
    assert_eq!(json["types"], serde_json::json!({}));
}
