//! Ranked batch matching of one reference identifier against candidates.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::codec;
use crate::error::Error;
use crate::metrics::{self, DistanceResult};

/// One ranked candidate with its distance metrics.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RankedCandidate {
    pub iscc: String,
    pub metrics: DistanceResult,
}

/// A candidate that could not be decoded, excluded from ranking.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CandidateError {
    pub iscc: String,
    pub error: String,
}

/// Ranked comparison of a reference against a batch of candidates.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BatchRankResult {
    pub reference: String,
    pub total_candidates: usize,
    /// Candidates sorted by descending similarity, input order on ties.
    pub ranked: Vec<RankedCandidate>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<CandidateError>,
    pub best_match: Option<RankedCandidate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub threshold: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matches_above_threshold: Option<usize>,
}

/// Rank candidates by descending similarity to the reference.
///
/// The threshold, when given, must lie in [0, 100] and is checked before
/// anything is decoded. Candidates score independently on the rayon pool;
/// the order-sensitive part (the stable descending sort, breaking ties by
/// input position) runs after the join. A malformed candidate is recorded
/// with its error and excluded without aborting the rest of the batch.
pub fn rank(
    reference: &str,
    candidates: &[String],
    threshold: Option<f64>,
) -> Result<BatchRankResult, Error> {
    if let Some(t) = threshold {
        if !(0.0..=100.0).contains(&t) {
            return Err(Error::ThresholdOutOfRange(t));
        }
    }
    codec::decode(reference)?;

    let outcomes: Vec<Result<DistanceResult, Error>> = candidates
        .par_iter()
        .map(|candidate| metrics::code_distance(reference, candidate, threshold))
        .collect();

    let mut ranked = Vec::with_capacity(candidates.len());
    let mut errors = Vec::new();
    for (candidate, outcome) in candidates.iter().zip(outcomes) {
        match outcome {
            Ok(result) => ranked.push(RankedCandidate {
                iscc: candidate.clone(),
                metrics: result,
            }),
            Err(err) => errors.push(CandidateError {
                iscc: candidate.clone(),
                error: err.to_string(),
            }),
        }
    }
    // Stable sort: candidates with equal similarity keep input order.
    ranked.sort_by(|a, b| {
        b.metrics
            .similarity_percentage
            .total_cmp(&a.metrics.similarity_percentage)
    });

    let best_match = ranked.first().cloned();
    let matches_above_threshold = threshold.map(|_| {
        ranked
            .iter()
            .filter(|r| r.metrics.meets_threshold == Some(true))
            .count()
    });

    Ok(BatchRankResult {
        reference: reference.to_string(),
        total_candidates: candidates.len(),
        ranked,
        errors,
        best_match,
        threshold,
        matches_above_threshold,
    })
}
