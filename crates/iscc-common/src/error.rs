//! Error type shared across the comparison engine.

/// Errors produced while decoding or comparing identifiers.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    /// The identifier is not structurally valid.
    #[error("malformed identifier: {0}")]
    Malformed(String),
    /// Two payloads share no bits, so prefix similarity is undefined.
    #[error("empty common prefix: similarity is undefined")]
    EmptyPrefix,
    /// A similarity threshold outside the accepted percentage range.
    #[error("threshold out of range: {0} (expected 0 to 100)")]
    ThresholdOutOfRange(f64),
}
