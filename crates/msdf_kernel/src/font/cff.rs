//! Compact Font Format container parsing: the `INDEX` and `DICT` structures
//! that locate a glyph's CharString bytes and its local subroutine array,
//! handed off to [`super::charstring`] for outline decoding.

use std::collections::HashMap;

use super::reader::Reader;
use crate::error::MsdfError;

/// A CFF `INDEX`: a count-prefixed array of variable-length byte strings,
/// each entry located by a run of `offSize`-byte offsets (1-based, one more
/// entry than `count`).
#[derive(Debug, Default)]
pub struct Index<'a> {
    entries: Vec<&'a [u8]>,
}

/// Parses one `INDEX` off a live cursor into `data`. Defined as a free
/// function rather than an inherent constructor because CFF `INDEX`es
/// always read forward from wherever the cursor currently sits (top-level
/// indices in the header, nested ones inside DICT-referenced offsets).
pub fn parse_index<'a>(r: &mut Reader<'a>, data: &'a [u8]) -> Result<Index<'a>, MsdfError> {
    let count = r.u16()?;
    if count == 0 {
        return Ok(Index { entries: Vec::new() });
    }
    let off_size = r.u8()?;
    if !(1..=4).contains(&off_size) {
        return Err(MsdfError::InvalidFontData(format!("invalid CFF INDEX offSize {off_size}")));
    }
    let mut offsets = Vec::with_capacity(count as usize + 1);
    for _ in 0..=count {
        offsets.push(r.uint_n(off_size)?);
    }
    let data_base = r.position() - 1; // offsets are 1-based from byte before the data block
    let mut entries = Vec::with_capacity(count as usize);
    for w in offsets.windows(2) {
        let start = data_base + w[0] as usize;
        let end = data_base + w[1] as usize;
        if end < start || end > data.len() {
            return Err(MsdfError::InvalidFontData("CFF INDEX entry out of bounds".into()));
        }
        entries.push(&data[start..end]);
    }
    r.seek(data_base + *offsets.last().unwrap() as usize);
    Ok(Index { entries })
}

impl<'a> Index<'a> {
    /// Wraps a single pre-decoded CharString; used by tests that want to
    /// exercise the interpreter without a full CFF container.
    pub fn from_single(data: &'a [u8]) -> Index<'a> {
        Index { entries: vec![data] }
    }

    pub fn get(&self, i: usize) -> Option<&'a [u8]> {
        self.entries.get(i).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A parsed CFF Top/Private `DICT`: operator (as its encoded key, `12 xx`
/// escaped operators stored as `1200 + xx`) to operand list.
#[derive(Debug, Default)]
pub struct Dict {
    pub entries: HashMap<u16, Vec<f64>>,
}

impl Dict {
    pub fn parse(data: &[u8]) -> Result<Dict, MsdfError> {
        let mut entries = HashMap::new();
        let mut operands = Vec::new();
        let mut r = Reader::new(data);
        while r.remaining() > 0 {
            let b0 = r.u8()?;
            match b0 {
                0..=21 => {
                    let op = if b0 == 12 { 1200 + r.u8()? as u16 } else { b0 as u16 };
                    entries.insert(op, std::mem::take(&mut operands));
                }
                28 => operands.push(r.i16()? as f64),
                29 => operands.push(r.i32()? as f64),
                30 => operands.push(parse_real(&mut r)?),
                32..=246 => operands.push(b0 as f64 - 139.0),
                247..=250 => {
                    let b1 = r.u8()?;
                    operands.push((b0 as f64 - 247.0) * 256.0 + b1 as f64 + 108.0);
                }
                251..=254 => {
                    let b1 = r.u8()?;
                    operands.push(-(b0 as f64 - 251.0) * 256.0 - b1 as f64 - 108.0);
                }
                _ => return Err(MsdfError::InvalidFontData(format!("invalid CFF DICT byte {b0}"))),
            }
        }
        Ok(Dict { entries })
    }

    pub fn get(&self, op: u16) -> Option<&[f64]> {
        self.entries.get(&op).map(|v| v.as_slice())
    }

    pub fn get_int(&self, op: u16) -> Option<i64> {
        self.get(op).and_then(|v| v.first()).map(|&v| v as i64)
    }
}

/// BCD real number operand (operator 30): packed nibbles, terminated by
/// nibble `0xf`.
fn parse_real(r: &mut Reader) -> Result<f64, MsdfError> {
    let mut s = String::new();
    'outer: loop {
        let byte = r.u8()?;
        for nibble in [byte >> 4, byte & 0xF] {
            match nibble {
                0..=9 => s.push((b'0' + nibble) as char),
                0xa => s.push('.'),
                0xb => s.push('E'),
                0xc => s.push_str("E-"),
                0xe => s.push('-'),
                0xf => break 'outer,
                _ => {}
            }
        }
    }
    s.parse::<f64>().map_err(|_| MsdfError::InvalidFontData(format!("invalid CFF real number {s:?}")))
}

pub const OP_CHARSTRINGS: u16 = 17;
pub const OP_PRIVATE: u16 = 18;
pub const OP_SUBRS: u16 = 19;
pub const OP_CHARSTRING_TYPE: u16 = 1206;

/// The handful of CFF tables the kernel needs: the glyph CharString array
/// plus the (optional) local subroutine array from the Private DICT.
pub struct CffTable<'a> {
    pub charstrings: Index<'a>,
    pub global_subrs: Index<'a>,
    pub local_subrs: Index<'a>,
}

pub fn parse<'a>(data: &'a [u8], cff_offset: u32) -> Result<CffTable<'a>, MsdfError> {
    let cff = &data[cff_offset as usize..];
    let mut r = Reader::new(cff);
    let _major = r.u8()?;
    let _minor = r.u8()?;
    let hdr_size = r.u8()?;
    let _off_size = r.u8()?;
    r.seek(hdr_size as usize);

    let _name_index = parse_index(&mut r, cff)?;
    let top_dict_index = parse_index(&mut r, cff)?;
    let _string_index = parse_index(&mut r, cff)?;
    let global_subrs = parse_index(&mut r, cff)?;

    let top_dict_bytes = top_dict_index
        .get(0)
        .ok_or_else(|| MsdfError::InvalidFontData("CFF has no Top DICT".into()))?;
    let top_dict = Dict::parse(top_dict_bytes)?;

    if let Some(t) = top_dict.get_int(OP_CHARSTRING_TYPE) {
        if t != 2 {
            return Err(MsdfError::UnsupportedFormat(format!("CFF CharString type {t} unsupported")));
        }
    }

    let charstrings_offset = top_dict
        .get_int(OP_CHARSTRINGS)
        .ok_or(MsdfError::MissingTable("CFF CharStrings"))? as usize;
    let mut cs_reader = Reader::at(cff, charstrings_offset);
    let charstrings = parse_index(&mut cs_reader, cff)?;

    let local_subrs = match top_dict.get(OP_PRIVATE) {
        Some(priv_entry) if priv_entry.len() == 2 => {
            let priv_size = priv_entry[0] as usize;
            let priv_offset = priv_entry[1] as usize;
            if priv_offset + priv_size > cff.len() {
                return Err(MsdfError::InvalidFontData("CFF Private DICT out of bounds".into()));
            }
            let private_dict = Dict::parse(&cff[priv_offset..priv_offset + priv_size])?;
            match private_dict.get_int(OP_SUBRS) {
                Some(subrs_rel) => {
                    let mut sr = Reader::at(cff, priv_offset + subrs_rel as usize);
                    parse_index(&mut sr, cff)?
                }
                None => Index::default(),
            }
        }
        _ => Index::default(),
    };

    Ok(CffTable { charstrings, global_subrs, local_subrs })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dict_decodes_single_byte_integers() {
        // operand 139 (encodes to 0, i.e. byte 32+107=139 -> 0), operator 17
        let data = [139u8, 17];
        let dict = Dict::parse(&data).unwrap();
        assert_eq!(dict.get_int(17), Some(0));
    }

    #[test]
    fn dict_decodes_two_byte_positive_range() {
        // 108..1131 via (b0-247)*256+b1+108
        let data = [247u8, 0, 17];
        let dict = Dict::parse(&data).unwrap();
        assert_eq!(dict.get_int(17), Some(108));
    }

    #[test]
    fn dict_decodes_escape_operator() {
        let data = [139u8, 12, 6, 17]; // 12 06 = CharstringType (1206)
        let dict = Dict::parse(&data).unwrap();
        assert_eq!(dict.get_int(1206), Some(0));
        assert!(dict.get(17).is_none());
    }

    #[test]
    fn index_parses_two_entries() {
        // count=2, offSize=1, offsets=[1,3,5], data=[0xAA,0xBB,0xCC,0xDD]
        let data = [0u8, 2, 1, 1, 3, 5, 0xAA, 0xBB, 0xCC, 0xDD];
        let mut r = Reader::new(&data);
        let index = parse_index(&mut r, &data).unwrap();
        assert_eq!(index.len(), 2);
        assert_eq!(index.get(0), Some(&data[6..8]));
        assert_eq!(index.get(1), Some(&data[8..10]));
    }
}
