//! OpenType table directory and the handful of tables the kernel's glyph
//! lookup path needs: `head` (unitsPerEm, loca format), `cmap` (codepoint to
//! glyph id), `hhea`/`hmtx` (advance widths), `loca`/`maxp` (glyph count and
//! offsets feeding `truetype::outline`).

use std::collections::HashMap;

use super::reader::Reader;
use crate::error::MsdfError;

#[derive(Debug, Clone, Copy)]
pub struct TableRecord {
    pub offset: u32,
    pub length: u32,
}

/// Table directory: maps a 4-byte tag to its (offset, length) in the file.
/// Checksums are not verified — the kernel only ever reads tables it needs
/// and a corrupt table surfaces as a parse error downstream regardless.
#[derive(Debug, Default)]
pub struct TableDirectory {
    pub records: HashMap<[u8; 4], TableRecord>,
}

impl TableDirectory {
    pub fn parse(data: &[u8]) -> Result<TableDirectory, MsdfError> {
        let mut r = Reader::new(data);
        let sfnt_version = r.u32()?;
        if sfnt_version != 0x0001_0000 && &sfnt_version.to_be_bytes() != b"OTTO" && sfnt_version != 0x7472_7565 {
            return Err(MsdfError::UnsupportedFormat(format!(
                "unrecognized sfnt version 0x{sfnt_version:08X}"
            )));
        }
        let num_tables = r.u16()?;
        r.advance(6); // searchRange, entrySelector, rangeShift

        let mut records = HashMap::with_capacity(num_tables as usize);
        for _ in 0..num_tables {
            let tag = r.tag()?;
            let _checksum = r.u32()?;
            let offset = r.u32()?;
            let length = r.u32()?;
            records.insert(tag, TableRecord { offset, length });
        }
        Ok(TableDirectory { records })
    }

    pub fn get(&self, tag: &[u8; 4]) -> Option<TableRecord> {
        self.records.get(tag).copied()
    }

    pub fn has(&self, tag: &[u8; 4]) -> bool {
        self.records.contains_key(tag)
    }

    pub fn require(&self, tag: &'static str) -> Result<TableRecord, MsdfError> {
        let bytes: [u8; 4] = tag.as_bytes().try_into().unwrap();
        self.get(&bytes).ok_or(MsdfError::MissingTable(tag))
    }
}

#[derive(Debug, Clone, Copy)]
pub struct HeadTable {
    pub units_per_em: u16,
    /// 0 = `loca` entries are `u16` (offset/2), 1 = `loca` entries are `u32`.
    pub index_to_loc_format: i16,
}

pub fn parse_head(data: &[u8], table: TableRecord) -> Result<HeadTable, MsdfError> {
    let mut r = Reader::at(data, table.offset as usize);
    r.advance(18); // version, fontRevision, checkSumAdjustment, magicNumber, flags
    let units_per_em = r.u16()?;
    r.advance(30); // created, modified, xMin/yMin/xMax/yMax, macStyle, lowestRecPPEM, fontDirectionHint
    let index_to_loc_format = r.i16()?;
    Ok(HeadTable { units_per_em, index_to_loc_format })
}

pub fn parse_maxp_num_glyphs(data: &[u8], table: TableRecord) -> Result<u16, MsdfError> {
    let mut r = Reader::at(data, table.offset as usize);
    r.advance(4); // version
    r.u16()
}

#[derive(Debug, Clone, Copy)]
pub struct HheaTable {
    pub num_h_metrics: u16,
}

pub fn parse_hhea(data: &[u8], table: TableRecord) -> Result<HheaTable, MsdfError> {
    let mut r = Reader::at(data, table.offset as usize);
    r.advance(34);
    let num_h_metrics = r.u16()?;
    Ok(HheaTable { num_h_metrics })
}

/// Advance width of glyph `gid`, per the `hmtx` rule that entries beyond
/// `num_h_metrics` repeat the last recorded advance.
pub fn advance_width(data: &[u8], table: TableRecord, hhea: HheaTable, gid: u16) -> Result<u16, MsdfError> {
    let n = hhea.num_h_metrics.max(1);
    let idx = gid.min(n - 1);
    let mut r = Reader::at(data, table.offset as usize + idx as usize * 4);
    r.u16()
}

/// `loca`: glyph offsets into `glyf`, one more entry than `numGlyphs`.
pub fn parse_loca(data: &[u8], table: TableRecord, num_glyphs: u16, long_format: bool) -> Result<Vec<u32>, MsdfError> {
    let mut r = Reader::at(data, table.offset as usize);
    let mut offsets = Vec::with_capacity(num_glyphs as usize + 1);
    for _ in 0..=num_glyphs {
        offsets.push(if long_format { r.u32()? } else { r.u16()? as u32 * 2 });
    }
    Ok(offsets)
}

/// `cmap` format 4 subtable lookup (the common BMP Unicode subtable).
/// Other formats (0, 6, 12 for astral codepoints) are not implemented; a
/// font lacking a usable format-4 subtable surfaces `UnsupportedFormat`.
pub fn lookup_glyph_id(data: &[u8], table: TableRecord, codepoint: u32) -> Result<Option<u16>, MsdfError> {
    let mut r = Reader::at(data, table.offset as usize);
    let _version = r.u16()?;
    let num_subtables = r.u16()?;

    let mut best_offset: Option<u32> = None;
    for _ in 0..num_subtables {
        let platform_id = r.u16()?;
        let encoding_id = r.u16()?;
        let offset = r.u32()?;
        // Prefer Windows Unicode BMP (3,1) or Unicode platform (0,*).
        let is_unicode = platform_id == 3 && (encoding_id == 1 || encoding_id == 10) || platform_id == 0;
        if is_unicode || best_offset.is_none() {
            best_offset = Some(offset);
        }
    }
    let Some(offset) = best_offset else {
        return Err(MsdfError::UnsupportedFormat("cmap has no usable subtable".into()));
    };

    let mut sub = Reader::at(data, table.offset as usize + offset as usize);
    let format = sub.u16()?;
    if format != 4 {
        return Err(MsdfError::UnsupportedFormat(format!("cmap subtable format {format} unsupported")));
    }
    let _length = sub.u16()?;
    let _language = sub.u16()?;
    let seg_count_x2 = sub.u16()?;
    let seg_count = (seg_count_x2 / 2) as usize;
    sub.advance(6); // searchRange, entrySelector, rangeShift

    let mut end_codes = Vec::with_capacity(seg_count);
    for _ in 0..seg_count {
        end_codes.push(sub.u16()?);
    }
    sub.advance(2); // reservedPad
    let mut start_codes = Vec::with_capacity(seg_count);
    for _ in 0..seg_count {
        start_codes.push(sub.u16()?);
    }
    let mut id_deltas = Vec::with_capacity(seg_count);
    for _ in 0..seg_count {
        id_deltas.push(sub.i16()?);
    }
    let id_range_offsets_pos = sub.position();
    let mut id_range_offsets = Vec::with_capacity(seg_count);
    for _ in 0..seg_count {
        id_range_offsets.push(sub.u16()?);
    }

    if codepoint > 0xFFFF {
        return Ok(None);
    }
    let cp = codepoint as u16;

    for seg in 0..seg_count {
        if cp > end_codes[seg] {
            continue;
        }
        if cp < start_codes[seg] {
            return Ok(None);
        }
        if id_range_offsets[seg] == 0 {
            let gid = (cp as i32 + id_deltas[seg] as i32) as u16;
            return Ok(Some(gid));
        }
        // idRangeOffset is a byte offset from its own field's storage
        // location to the glyphIdArray entry for this code; `Reader`
        // positions are absolute into `data`, so this address is too.
        let glyph_index_addr = id_range_offsets_pos
            + seg * 2
            + id_range_offsets[seg] as usize
            + (cp - start_codes[seg]) as usize * 2;
        let raw = Reader::at(data, glyph_index_addr).u16()?;
        if raw == 0 {
            return Ok(None);
        }
        let gid = (raw as i32 + id_deltas[seg] as i32) as u16;
        return Ok(Some(gid));
    }
    Ok(None)
}
