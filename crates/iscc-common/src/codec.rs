//! Decoder and encoder for the packed identifier header format.
//!
//! An identifier is the scheme prefix `ISCC:` followed by unpadded base32.
//! The decoded bytes open with a packed header of four variable-length
//! nibble fields (maintype, subtype, version, length) followed by the hash
//! payload. Composite identifiers (maintype ISCC) bundle one 64-bit digest
//! per contained unit and are decomposed into standalone units on decode.
//! Decoding checks structural well-formedness only, never hash content.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::base32;
use crate::error::Error;

/// Scheme prefix carried by canonical identifiers.
pub const PREFIX: &str = "ISCC:";

const MT_META: u32 = 0;
const MT_SEMANTIC: u32 = 1;
const MT_CONTENT: u32 = 2;
const MT_DATA: u32 = 3;
const MT_INSTANCE: u32 = 4;
const MT_ISCC: u32 = 5;
const MT_ID: u32 = 6;

/// Largest value a single header field can carry.
const VARNIBBLE_MAX: u32 = 4679;

/// Optional units present in a composite, indexed by its length field.
/// DATA and INSTANCE are always present and not listed here.
const COMPOSITIONS: [&[Category]; 8] = [
    &[],
    &[Category::Content],
    &[Category::Semantic],
    &[Category::Semantic, Category::Content],
    &[Category::Meta],
    &[Category::Meta, Category::Content],
    &[Category::Meta, Category::Semantic],
    &[Category::Meta, Category::Semantic, Category::Content],
];

/// Semantic kind of a unit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Category {
    Meta,
    Semantic,
    Content,
    Data,
    Instance,
    /// Composite container bundling several units.
    Iscc,
    Id,
    /// Forward-compatible maintype this implementation does not know.
    Other(u32),
}

impl Category {
    /// Map a raw maintype value to its category.
    pub fn from_raw(raw: u32) -> Self {
        match raw {
            MT_META => Category::Meta,
            MT_SEMANTIC => Category::Semantic,
            MT_CONTENT => Category::Content,
            MT_DATA => Category::Data,
            MT_INSTANCE => Category::Instance,
            MT_ISCC => Category::Iscc,
            MT_ID => Category::Id,
            other => Category::Other(other),
        }
    }

    /// Raw maintype value as carried in the header.
    pub fn raw(&self) -> u32 {
        match self {
            Category::Meta => MT_META,
            Category::Semantic => MT_SEMANTIC,
            Category::Content => MT_CONTENT,
            Category::Data => MT_DATA,
            Category::Instance => MT_INSTANCE,
            Category::Iscc => MT_ISCC,
            Category::Id => MT_ID,
            Category::Other(raw) => *raw,
        }
    }

    /// Key used for this category in comparison results.
    pub fn display_name(&self) -> String {
        match self {
            Category::Meta => "meta".to_string(),
            Category::Semantic => "semantic".to_string(),
            Category::Content => "content".to_string(),
            Category::Data => "data".to_string(),
            Category::Instance => "instance".to_string(),
            Category::Iscc => "iscc".to_string(),
            Category::Id => "id".to_string(),
            Category::Other(raw) => format!("type-{raw}"),
        }
    }

    /// True for checksum-like categories compared by full payload equality.
    pub fn is_exact_match(&self) -> bool {
        matches!(self, Category::Instance | Category::Id)
    }

    fn name(&self) -> String {
        match self {
            Category::Meta => "META".to_string(),
            Category::Semantic => "SEMANTIC".to_string(),
            Category::Content => "CONTENT".to_string(),
            Category::Data => "DATA".to_string(),
            Category::Instance => "INSTANCE".to_string(),
            Category::Iscc => "ISCC".to_string(),
            Category::Id => "ID".to_string(),
            Category::Other(raw) => raw.to_string(),
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// One typed, versioned component of a composite identifier.
///
/// Units keep the raw header field values so re-encoding is lossless even
/// for maintypes this implementation does not recognize.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Unit {
    maintype: u32,
    subtype: u32,
    version: u32,
    length: u32,
    payload: Vec<u8>,
}

impl Unit {
    fn new(maintype: u32, subtype: u32, version: u32, length: u32, payload: Vec<u8>) -> Self {
        Unit {
            maintype,
            subtype,
            version,
            length,
            payload,
        }
    }

    pub fn category(&self) -> Category {
        Category::from_raw(self.maintype)
    }

    pub fn subtype(&self) -> u32 {
        self.subtype
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    /// Declared payload length in bits.
    pub fn bits(&self) -> u32 {
        match self.category() {
            Category::Other(_) => self.payload.len() as u32 * 8,
            _ => (self.length + 1) * 32,
        }
    }

    /// Raw hash payload bytes.
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Compatibility tuple; two units are comparable when these match.
    pub fn type_key(&self) -> (u32, u32, u32) {
        (self.maintype, self.subtype, self.version)
    }

    /// Canonical single-unit identifier string.
    pub fn encode(&self) -> String {
        let mut raw = encode_header(self.maintype, self.subtype, self.version, self.length);
        raw.extend_from_slice(&self.payload);
        format!("{PREFIX}{}", base32::encode(&raw))
    }
}

/// A decoded identifier: the normalized input plus its ordered units.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompositeIdentifier {
    iscc: String,
    units: Vec<Unit>,
}

impl CompositeIdentifier {
    /// Normalized `ISCC:` string this value was decoded from.
    pub fn iscc(&self) -> &str {
        &self.iscc
    }

    /// Base32 body without the scheme prefix.
    pub fn body(&self) -> &str {
        self.iscc.trim_start_matches(PREFIX)
    }

    pub fn units(&self) -> &[Unit] {
        &self.units
    }
}

/// Decoded header fields of an identifier, for human-facing display.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Explanation {
    pub iscc: String,
    pub maintype: String,
    pub subtype: String,
    pub version: u32,
    pub bits: u32,
    pub digest: String,
}

/// Structural validation report that collects problems instead of failing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub iscc: String,
    pub valid: bool,
    pub errors: Vec<String>,
    pub unit_count: usize,
    pub units: Vec<String>,
}

/// Strip the scheme prefix and formatting, upper-case the rest.
pub(crate) fn clean(identifier: &str) -> String {
    let trimmed = identifier.trim();
    let body = trimmed
        .get(..PREFIX.len())
        .filter(|p| p.eq_ignore_ascii_case(PREFIX))
        .map_or(trimmed, |_| &trimmed[PREFIX.len()..]);
    body.replace('-', "").to_ascii_uppercase()
}

/// Decode an identifier into its ordered unit sequence.
///
/// Composite containers are decomposed into their constituent units; any
/// other maintype decodes to a single-unit sequence. Structural problems
/// (bad alphabet, truncated header, payload not matching the declared
/// length, composite body too short for its composition) are errors.
pub fn decode(identifier: &str) -> Result<CompositeIdentifier, Error> {
    let body = clean(identifier);
    if body.is_empty() {
        return Err(Error::Malformed("empty identifier".to_string()));
    }
    let raw = base32::decode(&body)?;
    let header = decode_header(&raw)?;
    let units = if header.maintype == MT_ISCC {
        decompose_composite(&header)?
    } else {
        vec![standalone_unit(&header)?]
    };
    Ok(CompositeIdentifier {
        iscc: format!("{PREFIX}{body}"),
        units,
    })
}

/// Canonical single-unit identifier strings for each decoded unit.
pub fn decompose(identifier: &str) -> Result<Vec<String>, Error> {
    let decoded = decode(identifier)?;
    Ok(decoded.units.iter().map(Unit::encode).collect())
}

/// Decoded header fields of the identifier itself (not its subunits).
pub fn explain(identifier: &str) -> Result<Explanation, Error> {
    let body = clean(identifier);
    if body.is_empty() {
        return Err(Error::Malformed("empty identifier".to_string()));
    }
    let raw = base32::decode(&body)?;
    let header = decode_header(&raw)?;
    let category = Category::from_raw(header.maintype);
    let bits = match category {
        Category::Iscc | Category::Other(_) => header.payload.len() as u32 * 8,
        _ => (header.length + 1) * 32,
    };
    Ok(Explanation {
        iscc: format!("{PREFIX}{body}"),
        maintype: category.name(),
        subtype: subtype_name(category, header.subtype),
        version: header.version,
        bits,
        digest: hex(&header.payload),
    })
}

/// Validate an identifier, collecting problems instead of failing fast.
pub fn validate(identifier: &str) -> ValidationReport {
    match decode(identifier) {
        Ok(decoded) => ValidationReport {
            iscc: decoded.iscc.clone(),
            valid: true,
            errors: Vec::new(),
            unit_count: decoded.units.len(),
            units: decoded.units.iter().map(Unit::encode).collect(),
        },
        Err(err) => ValidationReport {
            iscc: identifier.trim().to_string(),
            valid: false,
            errors: vec![err.to_string()],
            unit_count: 0,
            units: Vec::new(),
        },
    }
}

/// Encode a standalone unit identifier from header fields and digest bytes.
///
/// `bits` is the declared payload length: a positive multiple of 32 matching
/// the digest length. Composite containers cannot be built this way.
pub fn encode_component(
    maintype: u32,
    subtype: u32,
    version: u32,
    bits: u32,
    digest: &[u8],
) -> Result<String, Error> {
    if maintype == MT_ISCC {
        return Err(Error::Malformed(
            "cannot encode a composite container as a unit".to_string(),
        ));
    }
    for (field, value) in [
        ("maintype", maintype),
        ("subtype", subtype),
        ("version", version),
    ] {
        if value > VARNIBBLE_MAX {
            return Err(Error::Malformed(format!(
                "{field} value {value} exceeds the header field maximum {VARNIBBLE_MAX}"
            )));
        }
    }
    if bits == 0 || bits % 32 != 0 || bits / 32 - 1 > VARNIBBLE_MAX {
        return Err(Error::Malformed(format!(
            "invalid unit length: {bits} bits (expected a positive multiple of 32)"
        )));
    }
    if digest.len() as u32 * 8 != bits {
        return Err(Error::Malformed(format!(
            "digest is {} bytes but the declared length is {bits} bits",
            digest.len()
        )));
    }
    let unit = Unit::new(maintype, subtype, version, bits / 32 - 1, digest.to_vec());
    Ok(unit.encode())
}

/// Encode the four header fields into padded header bytes.
pub fn encode_header(maintype: u32, subtype: u32, version: u32, length: u32) -> Vec<u8> {
    let mut writer = BitWriter::default();
    for value in [maintype, subtype, version, length] {
        write_varnibble(value, &mut writer);
    }
    if writer.bits % 8 != 0 {
        writer.push(0, 4);
    }
    writer.bytes
}

struct Header {
    maintype: u32,
    subtype: u32,
    version: u32,
    length: u32,
    payload: Vec<u8>,
}

fn decode_header(raw: &[u8]) -> Result<Header, Error> {
    let mut pos = 0usize;
    let maintype = read_varnibble(raw, &mut pos)?;
    let subtype = read_varnibble(raw, &mut pos)?;
    let version = read_varnibble(raw, &mut pos)?;
    let length = read_varnibble(raw, &mut pos)?;
    // An odd number of header nibbles is followed by a padding nibble.
    if pos % 8 != 0 {
        pos += 4;
    }
    let byte = pos / 8;
    if byte > raw.len() {
        return Err(Error::Malformed("truncated header".to_string()));
    }
    Ok(Header {
        maintype,
        subtype,
        version,
        length,
        payload: raw[byte..].to_vec(),
    })
}

fn standalone_unit(header: &Header) -> Result<Unit, Error> {
    match Category::from_raw(header.maintype) {
        // Unknown maintypes are preserved opaquely; their length field
        // semantics are not ours to check.
        Category::Other(_) => Ok(Unit::new(
            header.maintype,
            header.subtype,
            header.version,
            header.length,
            header.payload.clone(),
        )),
        _ => {
            let declared = (header.length + 1) * 32;
            let actual = header.payload.len() as u32 * 8;
            if actual != declared {
                return Err(Error::Malformed(format!(
                    "payload is {actual} bits but the header declares {declared}"
                )));
            }
            Ok(Unit::new(
                header.maintype,
                header.subtype,
                header.version,
                header.length,
                header.payload.clone(),
            ))
        }
    }
}

fn decompose_composite(header: &Header) -> Result<Vec<Unit>, Error> {
    let optional = COMPOSITIONS
        .get(header.length as usize)
        .ok_or_else(|| {
            Error::Malformed(format!("invalid composition index: {}", header.length))
        })?;
    // Every listed unit plus DATA carries 64 bits; INSTANCE takes the rest.
    let minimum = (optional.len() + 2) * 8;
    if header.payload.len() < minimum {
        return Err(Error::Malformed(format!(
            "composite body is {} bytes, expected at least {minimum}",
            header.payload.len()
        )));
    }
    let instance_len = header.payload.len() - optional.len() * 8 - 8;
    if instance_len % 4 != 0 {
        return Err(Error::Malformed(
            "instance digest is not a multiple of 32 bits".to_string(),
        ));
    }

    let mut units = Vec::with_capacity(optional.len() + 2);
    let mut offset = 0usize;
    for category in optional.iter() {
        let subtype = match category {
            Category::Semantic | Category::Content => header.subtype,
            _ => 0,
        };
        units.push(Unit::new(
            category.raw(),
            subtype,
            header.version,
            1,
            header.payload[offset..offset + 8].to_vec(),
        ));
        offset += 8;
    }
    units.push(Unit::new(
        MT_DATA,
        0,
        header.version,
        1,
        header.payload[offset..offset + 8].to_vec(),
    ));
    offset += 8;
    units.push(Unit::new(
        MT_INSTANCE,
        0,
        header.version,
        (instance_len as u32 / 4) - 1,
        header.payload[offset..].to_vec(),
    ));
    Ok(units)
}

fn subtype_name(category: Category, subtype: u32) -> String {
    let known = match category {
        Category::Meta | Category::Data | Category::Instance => match subtype {
            0 => Some("NONE"),
            _ => None,
        },
        Category::Semantic | Category::Content => match subtype {
            0 => Some("TEXT"),
            1 => Some("IMAGE"),
            2 => Some("AUDIO"),
            3 => Some("VIDEO"),
            4 => Some("MIXED"),
            _ => None,
        },
        Category::Iscc => match subtype {
            0 => Some("TEXT"),
            1 => Some("IMAGE"),
            2 => Some("AUDIO"),
            3 => Some("VIDEO"),
            4 => Some("MIXED"),
            5 => Some("SUM"),
            6 => Some("WIDE"),
            _ => None,
        },
        Category::Id => match subtype {
            0 => Some("PRIVATE"),
            1 => Some("BITCOIN"),
            2 => Some("ETHEREUM"),
            3 => Some("POLYGON"),
            _ => None,
        },
        Category::Other(_) => None,
    };
    known.map_or_else(|| subtype.to_string(), str::to_string)
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

#[derive(Default)]
struct BitWriter {
    bytes: Vec<u8>,
    bits: usize,
}

impl BitWriter {
    fn push(&mut self, value: u32, count: usize) {
        for i in (0..count).rev() {
            let bit = (value >> i) & 1;
            if self.bits % 8 == 0 {
                self.bytes.push(0);
            }
            let last = self.bytes.len() - 1;
            self.bytes[last] |= (bit as u8) << (7 - self.bits % 8);
            self.bits += 1;
        }
    }
}

fn read_bits(data: &[u8], pos: usize, count: usize) -> Option<u32> {
    let end = pos.checked_add(count)?;
    if end > data.len() * 8 {
        return None;
    }
    let mut value = 0u32;
    for i in pos..end {
        let bit = (data[i / 8] >> (7 - i % 8)) & 1;
        value = (value << 1) | u32::from(bit);
    }
    Some(value)
}

/// Read one variable-length nibble field.
///
/// The prefix selects the tier: `0xxx` for 0-7, `10xxxxxx` for 8-71,
/// `110xxxxxxxxx` for 72-583, `1110xxxxxxxxxxxx` for 584-4679.
fn read_varnibble(data: &[u8], pos: &mut usize) -> Result<u32, Error> {
    const TIERS: [(u32, usize, u32); 4] = [
        (0b0, 1, 0),
        (0b10, 2, 8),
        (0b110, 3, 72),
        (0b1110, 4, 584),
    ];
    for &(marker, marker_bits, offset) in &TIERS {
        let prefix = read_bits(data, *pos, marker_bits)
            .ok_or_else(|| Error::Malformed("truncated header".to_string()))?;
        if prefix == marker {
            let value_bits = marker_bits * 3;
            let value = read_bits(data, *pos + marker_bits, value_bits)
                .ok_or_else(|| Error::Malformed("truncated header".to_string()))?;
            *pos += marker_bits + value_bits;
            return Ok(value + offset);
        }
    }
    Err(Error::Malformed(
        "invalid header field encoding".to_string(),
    ))
}

fn write_varnibble(value: u32, writer: &mut BitWriter) {
    match value {
        0..=7 => {
            writer.push(0b0, 1);
            writer.push(value, 3);
        }
        8..=71 => {
            writer.push(0b10, 2);
            writer.push(value - 8, 6);
        }
        72..=583 => {
            writer.push(0b110, 3);
            writer.push(value - 72, 9);
        }
        // Callers keep values within VARNIBBLE_MAX; decoded fields cannot
        // exceed it either.
        _ => {
            writer.push(0b1110, 4);
            writer.push(value - 584, 12);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn varnibble_roundtrip_tiers() {
        for value in [0u32, 7, 8, 71, 72, 583, 584, 4679] {
            let mut writer = BitWriter::default();
            write_varnibble(value, &mut writer);
            if writer.bits % 8 != 0 {
                writer.push(0, 8 - writer.bits % 8);
            }
            let mut pos = 0;
            let decoded = read_varnibble(&writer.bytes, &mut pos).unwrap();
            assert_eq!(decoded, value);
        }
    }

    #[test]
    fn header_pads_odd_nibble_counts() {
        // Four single-nibble fields: two bytes, no padding.
        assert_eq!(encode_header(0, 0, 0, 1), vec![0x00, 0x01]);
        // A two-nibble subtype makes five nibbles; padding rounds up to three bytes.
        let header = encode_header(0, 8, 0, 1);
        assert_eq!(header.len(), 3);
        let decoded = decode_header(&header).unwrap();
        assert_eq!(decoded.subtype, 8);
        assert_eq!(decoded.length, 1);
        assert!(decoded.payload.is_empty());
    }
}
