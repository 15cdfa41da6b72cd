//! Decode, compare and rank ISCC composite identifiers.
//!
//! An identifier packs one or more typed units (meta, semantic, content,
//! data, instance, id) behind a shared packed-header format. This crate
//! implements the binary header codec and the bitwise comparison metrics:
//! exact matching for checksum-like units, prefix-Hamming similarity for
//! perceptual units of possibly different length, and a character-level
//! global distance used for ranked batch matching. Every operation is a
//! pure function of its inputs; generating identifiers from content is out
//! of scope and happens elsewhere.

pub mod base32;
pub mod codec;
pub mod compare;
pub mod error;
pub mod metrics;
pub mod rank;
