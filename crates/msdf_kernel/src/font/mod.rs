//! External font collaborators (spec.md §6, expanded by SPEC_FULL.md §4.6):
//! OpenType container parsing, TrueType `glyf` and CFF CharString outline
//! decoding, and codepoint-to-glyph lookup. The kernel itself (`geometry`,
//! `coloring`, `generator`) treats whatever `Shape` this module hands it as
//! opaque input, per spec.md §1.

mod cff;
mod charstring;
mod reader;
mod tables;
mod truetype;

use log::warn;

use crate::error::MsdfError;
use crate::geometry::Shape;
use tables::{HeadTable, HheaTable, TableDirectory};

const TAG_GLYF: [u8; 4] = *b"glyf";
const TAG_HHEA: [u8; 4] = *b"hhea";
const TAG_CFF: [u8; 4] = *b"CFF ";

enum Outlines {
    TrueType { loca: Vec<u32>, glyf_offset: u32 },
    Cff,
}

/// A parsed font: owns the raw byte buffer and the table directory, and
/// resolves codepoints to glyph outlines on demand. Corresponds to the
/// reusable handle described in SPEC_FULL.md §6 (`Font::load` generalizing
/// spec.md's one-shot `load_shape`).
pub struct Font {
    data: Vec<u8>,
    directory: TableDirectory,
    head: HeadTable,
    hhea: Option<HheaTable>,
    outlines: Outlines,
}

impl Font {
    /// Parses the OpenType table directory and the small set of tables
    /// needed for glyph lookup and metrics. Outline data itself is decoded
    /// lazily per glyph by [`Font::glyph_shape`].
    pub fn load(data: Vec<u8>) -> Result<Font, MsdfError> {
        let directory = TableDirectory::parse(&data)?;
        let head_rec = directory.require("head")?;
        let head = tables::parse_head(&data, head_rec)?;

        let hhea = match directory.get(&TAG_HHEA) {
            Some(rec) => Some(tables::parse_hhea(&data, rec)?),
            None => {
                warn!("font has no hhea table; advance_width will be unavailable");
                None
            }
        };

        let outlines = if directory.has(&TAG_GLYF) {
            let maxp = directory.require("maxp")?;
            let num_glyphs = tables::parse_maxp_num_glyphs(&data, maxp)?;
            let loca_rec = directory.require("loca")?;
            let glyf_rec = directory.require("glyf")?;
            let loca = tables::parse_loca(&data, loca_rec, num_glyphs, head.index_to_loc_format != 0)?;
            Outlines::TrueType { loca, glyf_offset: glyf_rec.offset }
        } else if directory.has(&TAG_CFF) {
            Outlines::Cff
        } else {
            return Err(MsdfError::UnsupportedFormat(
                "font has neither a glyf nor a CFF outline table".into(),
            ));
        };

        Ok(Font { data, directory, head, hhea, outlines })
    }

    pub fn units_per_em(&self) -> u16 {
        self.head.units_per_em
    }

    fn glyph_id(&self, codepoint: char) -> Result<u16, MsdfError> {
        let cmap_rec = self.directory.require("cmap")?;
        tables::lookup_glyph_id(&self.data, cmap_rec, codepoint as u32)?
            .ok_or(MsdfError::GlyphNotFound(codepoint as u32))
    }

    /// Decodes `codepoint`'s outline into a normalized (em-unit, Y-up)
    /// `Shape`, per spec.md §6's `load_shape` contract. The shape is
    /// returned unnormalized (orientation not yet canonicalized) and
    /// uncolored — callers run `Shape::normalize` and `coloring::color_shape`
    /// before generation, per the strictly sequential phase order of
    /// spec.md §5.
    pub fn glyph_shape(&self, codepoint: char) -> Result<Shape, MsdfError> {
        let gid = self.glyph_id(codepoint)?;
        match &self.outlines {
            Outlines::TrueType { loca, glyf_offset } => {
                truetype::outline(&self.data, *glyf_offset, loca, gid, self.head.units_per_em)
            }
            Outlines::Cff => {
                let cff_rec = self.directory.require("CFF ")?;
                let table = cff::parse(&self.data, cff_rec.offset)?;
                charstring::outline(
                    &table.charstrings,
                    &table.global_subrs,
                    &table.local_subrs,
                    gid,
                    self.head.units_per_em,
                )
            }
        }
    }

    /// Advance width, normalized by `units_per_em` to em units (spec.md §6:
    /// "metrics are normalized to the font's em unit").
    pub fn advance_width(&self, codepoint: char) -> Result<f64, MsdfError> {
        let gid = self.glyph_id(codepoint)?;
        let hhea = self.hhea.ok_or(MsdfError::MissingTable("hhea"))?;
        let hmtx_rec = self.directory.require("hmtx")?;
        let raw = tables::advance_width(&self.data, hmtx_rec, hhea, gid)?;
        Ok(raw as f64 / self.head.units_per_em.max(1) as f64)
    }
}

/// Shared test fixtures, reused by both this module's tests and the
/// top-level pipeline tests in `lib.rs`.
#[cfg(test)]
pub(crate) mod test_support {
    fn be16(v: u16) -> [u8; 2] {
        v.to_be_bytes()
    }
    fn be32(v: u32) -> [u8; 4] {
        v.to_be_bytes()
    }

    /// Builds a minimal single-glyph TrueType font: one CCW square contour
    /// mapped from codepoint 'A', sufficient to exercise `Font::load` and
    /// `glyph_shape` end to end without a real font file on disk.
    pub(crate) fn minimal_truetype_font() -> Vec<u8> {
        let units_per_em: u16 = 1000;

        // glyf: single contour, 4 points, all on-curve, simple deltas.
        let mut glyf = Vec::new();
        glyf.extend(be16(1)); // numberOfContours
        glyf.extend(be16(0)); // xMin (unused by decoder)
        glyf.extend(be16(0));
        glyf.extend(be16(0));
        glyf.extend(be16(0));
        glyf.extend(be16(3)); // endPtsOfContours[0]
        glyf.extend(be16(0)); // instructionLength
        // flags: ON_CURVE | X_SHORT | X_SAME_OR_POSITIVE | Y_SHORT | Y_SAME_OR_POSITIVE repeated with REPEAT
        let flag = 0x01 | 0x02 | 0x10 | 0x04 | 0x20;
        glyf.push(flag);
        glyf.push(0x08); // REPEAT
        glyf.push(3); // repeat 3 more times (total 4 points)
        // x deltas: 0,10,0,-10 -> square
        glyf.push(0);
        glyf.push(10);
        glyf.push(0);
        glyf.push(10); // magnitude only, sign from X_SAME_OR_POSITIVE flag (always positive here)
        // y deltas: 0,0,10,0 then close back down via last point
        glyf.push(0);
        glyf.push(0);
        glyf.push(10);
        glyf.push(0);

        let mut loca = Vec::new();
        loca.extend(be32(0));
        loca.extend(be32(glyf.len() as u32));

        let mut head = vec![0u8; 54];
        head[18..20].copy_from_slice(&be16(units_per_em));
        head[50..52].copy_from_slice(&be16(0)); // indexToLocFormat = short

        let mut maxp = vec![0u8; 6];
        maxp[4..6].copy_from_slice(&be16(1)); // numGlyphs

        // cmap format 4: single segment mapping 'A'..'A' -> glyph 1.
        let a = 'A' as u16;
        let mut fmt4 = Vec::new();
        fmt4.extend(be16(4)); // format
        fmt4.extend(be16(0)); // length placeholder
        fmt4.extend(be16(0)); // language
        fmt4.extend(be16(4)); // segCountX2 (2 segments incl. terminator)
        fmt4.extend(be16(0)); // searchRange
        fmt4.extend(be16(0)); // entrySelector
        fmt4.extend(be16(0)); // rangeShift
        fmt4.extend(be16(a)); // endCode[0]
        fmt4.extend(be16(0xFFFF)); // endCode[1]
        fmt4.extend(be16(0)); // reservedPad
        fmt4.extend(be16(a)); // startCode[0]
        fmt4.extend(be16(0xFFFF)); // startCode[1]
        fmt4.extend((1i16).to_be_bytes()); // idDelta[0]: gid = code + 1
        fmt4.extend((1i16).to_be_bytes()); // idDelta[1]
        fmt4.extend(be16(0)); // idRangeOffset[0]
        fmt4.extend(be16(0)); // idRangeOffset[1]
        let len = fmt4.len() as u16;
        fmt4[2..4].copy_from_slice(&be16(len));

        let mut cmap = Vec::new();
        cmap.extend(be16(0)); // version
        cmap.extend(be16(1)); // numTables
        cmap.extend(be16(3)); // platformID
        cmap.extend(be16(1)); // encodingID
        cmap.extend(be32(12)); // offset to subtable (right after this header)
        cmap.extend(fmt4);

        let tables_data: [([u8; 4], Vec<u8>); 6] = [
            (*b"head", head),
            (*b"maxp", maxp),
            (*b"loca", loca),
            (*b"glyf", glyf),
            (*b"cmap", cmap),
            (*b"hhea", vec![0u8; 36]),
        ];

        let mut out = Vec::new();
        out.extend(be32(0x0001_0000));
        out.extend(be16(tables_data.len() as u16));
        out.extend([0u8; 6]);

        let header_len = 12 + tables_data.len() * 16;
        let mut offset = header_len;
        let mut directory = Vec::new();
        let mut blob = Vec::new();
        for (tag, bytes) in &tables_data {
            directory.extend(tag);
            directory.extend(be32(0)); // checksum, unchecked by the parser
            directory.extend(be32(offset as u32));
            directory.extend(be32(bytes.len() as u32));
            blob.extend(bytes);
            offset += bytes.len();
        }
        out.extend(directory);
        out.extend(blob);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::minimal_truetype_font;
    use super::*;

    #[test]
    fn loads_minimal_truetype_font_and_decodes_a_square_glyph() {
        let bytes = minimal_truetype_font();
        let font = Font::load(bytes).unwrap();
        assert_eq!(font.units_per_em(), 1000);
        let shape = font.glyph_shape('A').unwrap();
        assert_eq!(shape.contours.len(), 1);
        assert_eq!(shape.contours[0].edges.len(), 4);
        assert!(shape.contours[0].is_closed());
    }

    #[test]
    fn missing_codepoint_reports_glyph_not_found() {
        let bytes = minimal_truetype_font();
        let font = Font::load(bytes).unwrap();
        let err = font.glyph_shape('Z').unwrap_err();
        assert!(matches!(err, MsdfError::GlyphNotFound(_)));
    }
}
