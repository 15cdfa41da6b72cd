//! Unit-by-unit comparison of two identifiers.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::codec;
use crate::error::Error;
use crate::metrics::{self, Similarity};

/// Outcome for one compatible unit pair, tagged by metric family.
///
/// Serializes as either `{"match": bool}` or
/// `{"score": .., "distance": .., "bits": ..}` depending on the category.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UnitComparison {
    Match {
        #[serde(rename = "match")]
        matched: bool,
    },
    Similarity(Similarity),
}

/// Per-category comparison of two identifiers.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ComparisonResult {
    /// Category display name to comparison outcome.
    pub types: BTreeMap<String, UnitComparison>,
    /// Mean of per-category scores, or `None` when no units paired up.
    pub score: Option<f64>,
    /// Categories whose unit pairs shared no bits and were left unscored.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub degenerate: Vec<String>,
}

/// Compare two identifiers unit by unit.
///
/// Units pair up when maintype, subtype and version all match exactly; the
/// first matching unit on each side wins and later duplicates are ignored.
/// Checksum-like categories (instance, id) report payload equality, all
/// others report prefix-Hamming similarity. Identifiers sharing no
/// compatible units produce an empty map and a `None` score, which is a
/// valid outcome rather than an error.
pub fn compare(a: &str, b: &str) -> Result<ComparisonResult, Error> {
    let decoded_a = codec::decode(a)?;
    let decoded_b = codec::decode(b)?;

    let mut types = BTreeMap::new();
    let mut degenerate = Vec::new();
    for unit_a in decoded_a.units() {
        let name = unit_a.category().display_name();
        if types.contains_key(&name) || degenerate.contains(&name) {
            continue;
        }
        let Some(unit_b) = decoded_b
            .units()
            .iter()
            .find(|u| u.type_key() == unit_a.type_key())
        else {
            continue;
        };
        if unit_a.category().is_exact_match() {
            types.insert(
                name,
                UnitComparison::Match {
                    matched: metrics::exact_match(unit_a.payload(), unit_b.payload()),
                },
            );
        } else {
            match metrics::prefix_similarity(unit_a.payload(), unit_b.payload()) {
                Ok(similarity) => {
                    types.insert(name, UnitComparison::Similarity(similarity));
                }
                Err(Error::EmptyPrefix) => degenerate.push(name),
                Err(other) => return Err(other),
            }
        }
    }

    let score = aggregate(&types);
    Ok(ComparisonResult {
        types,
        score,
        degenerate,
    })
}

fn aggregate(types: &BTreeMap<String, UnitComparison>) -> Option<f64> {
    if types.is_empty() {
        return None;
    }
    let sum: f64 = types
        .values()
        .map(|outcome| match outcome {
            UnitComparison::Match { matched } => {
                if *matched {
                    1.0
                } else {
                    0.0
                }
            }
            UnitComparison::Similarity(similarity) => similarity.score,
        })
        .sum();
    Some(sum / types.len() as f64)
}
