use iscc_common::codec;
use iscc_common::error::Error;
use iscc_common::metrics::MatchBand;
use iscc_common::rank;

fn content_code(payload: &[u8]) -> String {
    codec::encode_component(2, 0, 0, payload.len() as u32 * 8, payload)
        .expect("valid unit fixture")
}

#[test]
fn exact_duplicate_ranks_first() {
    let reference = content_code(&[0xF0; 8]);
    let candidates = vec![
        content_code(&[0x0F; 8]),
        reference.clone(),
        content_code(&[0xF1; 8]),
    ];
    let result = rank::rank(&reference, &candidates, None).unwrap();

    assert_eq!(result.total_candidates, 3);
    assert_eq!(result.ranked.len(), 3);
    assert_eq!(result.ranked[0].iscc, reference);
    assert_eq!(result.ranked[0].metrics.similarity_percentage, 100.0);
    assert_eq!(result.ranked[0].metrics.assessment, MatchBand::Strong);

    let best = result.best_match.as_ref().unwrap();
    assert_eq!(best.iscc, reference);

    // Descending similarity throughout.
    for pair in result.ranked.windows(2) {
        assert!(
            pair[0].metrics.similarity_percentage >= pair[1].metrics.similarity_percentage
        );
    }
}

#[test]
fn ties_preserve_input_order() {
    let reference = content_code(&[0x00; 8]);
    // Each candidate differs from the reference by exactly one payload bit.
    let mut payload_a = [0x00u8; 8];
    payload_a[0] = 0x80;
    let mut payload_b = [0x00u8; 8];
    payload_b[7] = 0x01;
    let a = content_code(&payload_a);
    let b = content_code(&payload_b);

    let result = rank::rank(&reference, &[a.clone(), b.clone()], None).unwrap();
    assert_eq!(
        result.ranked[0].metrics.similarity_percentage,
        result.ranked[1].metrics.similarity_percentage
    );
    assert_eq!(result.ranked[0].iscc, a);
    assert_eq!(result.ranked[1].iscc, b);

    // Reversed input reverses the tie order.
    let result = rank::rank(&reference, &[b.clone(), a.clone()], None).unwrap();
    assert_eq!(result.ranked[0].iscc, b);
    assert_eq!(result.ranked[1].iscc, a);
}

#[test]
fn threshold_annotates_every_candidate() {
    let reference = content_code(&[0xAA; 8]);
    let candidates = vec![
        reference.clone(),
        content_code(&[0xAB; 8]),
        content_code(&[0x55; 8]),
    ];
    let result = rank::rank(&reference, &candidates, Some(80.0)).unwrap();

    assert_eq!(result.ranked.len(), 3);
    for ranked in &result.ranked {
        assert!(ranked.metrics.meets_threshold.is_some());
    }
    assert_eq!(result.threshold, Some(80.0));

    let qualifying = result.matches_above_threshold.unwrap();
    assert!(qualifying <= 3);
    assert_eq!(
        qualifying,
        result
            .ranked
            .iter()
            .filter(|r| r.metrics.meets_threshold == Some(true))
            .count()
    );
}

#[test]
fn threshold_boundary_is_inclusive() {
    let reference = content_code(&[0xAA; 8]);
    let candidate = content_code(&[0xAB; 8]);

    let probe = rank::rank(&reference, &[candidate.clone()], None).unwrap();
    let observed = probe.ranked[0].metrics.similarity_percentage;

    let result = rank::rank(&reference, &[candidate], Some(observed)).unwrap();
    assert_eq!(result.ranked[0].metrics.meets_threshold, Some(true));
    assert_eq!(result.matches_above_threshold, Some(1));
}

#[test]
fn malformed_candidates_are_annotated_not_fatal() {
    let reference = content_code(&[0x77; 8]);
    let candidates = vec![
        content_code(&[0x77; 8]),
        "not-an-identifier!".to_string(),
        content_code(&[0x78; 8]),
    ];
    let result = rank::rank(&reference, &candidates, None).unwrap();

    assert_eq!(result.total_candidates, 3);
    assert_eq!(result.ranked.len(), 2);
    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0].iscc, "not-an-identifier!");
    assert!(result.errors[0].error.contains("malformed"));
}

#[test]
fn empty_candidate_set() {
    let reference = content_code(&[1; 8]);
    let result = rank::rank(&reference, &[], None).unwrap();

    assert_eq!(result.total_candidates, 0);
    assert!(result.ranked.is_empty());
    assert!(result.best_match.is_none());
    assert_eq!(result.matches_above_threshold, None);
}

#[test]
fn threshold_checked_before_decoding() {
    // The range check fires even when the reference itself is malformed.
    assert_eq!(
        rank::rank("garbage!", &[], Some(150.0)),
        Err(Error::ThresholdOutOfRange(150.0))
    );
    assert_eq!(
        rank::rank("garbage!", &[], Some(-1.0)),
        Err(Error::ThresholdOutOfRange(-1.0))
    );
}

#[test]
fn threshold_endpoints_are_valid() {
    let reference = content_code(&[1; 8]);
    assert!(rank::rank(&reference, &[reference.clone()], Some(0.0)).is_ok());
    let result = rank::rank(&reference, &[reference.clone()], Some(100.0)).unwrap();
    assert_eq!(result.ranked[0].metrics.meets_threshold, Some(true));
}

#[test]
fn malformed_reference_is_an_error() {
    assert!(matches!(
        rank::rank("garbage!", &[content_code(&[1; 8])], None),
        Err(Error::Malformed(_))
    ));
}

#[test]
fn batch_result_serializes_cleanly() {
    let reference = content_code(&[0x01; 8]);
    let candidates = vec![reference.clone(), "bad".to_string()];
    let result = rank::rank(&reference, &candidates, Some(90.0)).unwrap();
    let json = serde_json::to_value(&result).unwrap();

    assert_eq!(json["reference"], reference);
    assert_eq!(json["total_candidates"], 2);
    assert_eq!(json["ranked"][0]["metrics"]["similarity_percentage"], 100.0);
    assert_eq!(json["ranked"][0]["metrics"]["assessment"], "strong match");
    assert_eq!(json["matches_above_threshold"], 1);
    assert_eq!(json["errors"][0]["iscc"], "bad");
}
