//! Bitwise similarity and distance metrics.
//!
//! Two metric families cover the unit categories: full-payload equality for
//! checksum-like units, and normalized prefix-Hamming similarity for units
//! derived from perceptual hashing, which may be declared at different
//! lengths. A third, character-level metric measures raw distance between
//! two whole encoded identifiers for ranking.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::base32;
use crate::codec;
use crate::error::Error;

/// Prefix-Hamming similarity over the shared prefix of two payloads.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Similarity {
    /// Normalized similarity in [0, 1].
    pub score: f64,
    /// Differing bits within the shared prefix.
    pub distance: u32,
    /// Shared prefix length in bits.
    pub bits: u32,
}

/// Qualitative band for a similarity percentage.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchBand {
    #[serde(rename = "strong match")]
    Strong,
    #[serde(rename = "good match")]
    Good,
    #[serde(rename = "weak match")]
    Weak,
    #[serde(rename = "no match")]
    None,
}

impl MatchBand {
    /// Band for a similarity percentage in [0, 100].
    pub fn from_percentage(pct: f64) -> Self {
        if pct >= 90.0 {
            MatchBand::Strong
        } else if pct >= 75.0 {
            MatchBand::Good
        } else if pct >= 50.0 {
            MatchBand::Weak
        } else {
            MatchBand::None
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            MatchBand::Strong => "strong match",
            MatchBand::Good => "good match",
            MatchBand::Weak => "weak match",
            MatchBand::None => "no match",
        }
    }
}

impl fmt::Display for MatchBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Raw distance between two identifiers' encoded bit streams.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DistanceResult {
    pub hamming_distance: u32,
    pub total_bits: u32,
    pub matching_bits: u32,
    pub similarity_percentage: f64,
    pub assessment: MatchBand,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meets_threshold: Option<bool>,
}

/// Full-payload equality for checksum-like units.
pub fn exact_match(a: &[u8], b: &[u8]) -> bool {
    a == b
}

/// Normalized prefix-Hamming similarity between two payloads.
///
/// The payloads align on their shared prefix (`8 * min(len_a, len_b)` bits);
/// differing bits within it determine the score. Payloads sharing no bits
/// have no defined similarity and fail rather than scoring 1.0 or 0.0.
pub fn prefix_similarity(a: &[u8], b: &[u8]) -> Result<Similarity, Error> {
    let common = a.len().min(b.len());
    if common == 0 {
        return Err(Error::EmptyPrefix);
    }
    let bits = common as u32 * 8;
    let distance: u32 = a[..common]
        .iter()
        .zip(&b[..common])
        .map(|(x, y)| (x ^ y).count_ones())
        .sum();
    Ok(Similarity {
        score: 1.0 - f64::from(distance) / f64::from(bits),
        distance,
        bits,
    })
}

/// Global bit distance between two identifiers at minimum common length.
///
/// Both inputs must decode; the metric then runs over the base32 bodies at
/// 5 bits per character, so codes of different resolutions compare over
/// their shared character prefix. The similarity percentage is rounded to
/// two decimals and banded. A threshold, when given, must lie in [0, 100]
/// and is applied inclusively.
pub fn code_distance(a: &str, b: &str, threshold: Option<f64>) -> Result<DistanceResult, Error> {
    if let Some(t) = threshold {
        if !(0.0..=100.0).contains(&t) {
            return Err(Error::ThresholdOutOfRange(t));
        }
    }
    let decoded_a = codec::decode(a)?;
    let decoded_b = codec::decode(b)?;
    let values_a = base32::char_values(decoded_a.body())?;
    let values_b = base32::char_values(decoded_b.body())?;

    let chars = values_a.len().min(values_b.len());
    let total_bits = chars as u32 * 5;
    let hamming_distance: u32 = values_a[..chars]
        .iter()
        .zip(&values_b[..chars])
        .map(|(x, y)| u32::from(x ^ y).count_ones())
        .sum();
    let matching_bits = total_bits - hamming_distance;
    let pct = if total_bits > 0 {
        f64::from(matching_bits) / f64::from(total_bits) * 100.0
    } else {
        0.0
    };
    let similarity_percentage = (pct * 100.0).round() / 100.0;

    Ok(DistanceResult {
        hamming_distance,
        total_bits,
        matching_bits,
        similarity_percentage,
        assessment: MatchBand::from_percentage(similarity_percentage),
        meets_threshold: threshold.map(|t| similarity_percentage >= t),
    })
}
