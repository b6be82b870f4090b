//! Shelf-packs per-codepoint MSDF bitmaps into a single RGBA atlas texture
//! (spec.md §6, expanded by SPEC_FULL.md §4.7). Pure CPU layout and bitmap
//! copy — no GPU dependency, keeping the declared GPU Non-goal intact; the
//! caller uploads the returned bytes however it likes.

use log::{debug, warn};

#[cfg(not(target_arch = "wasm32"))]
use rayon::prelude::*;

use crate::error::MsdfError;
use crate::font::Font;
use crate::{generate_glyph, GlyphMetrics, GlyphOptions};

/// One packed glyph's placement and metrics within an [`AtlasResult`].
#[derive(Debug, Clone, Copy)]
pub struct AtlasEntry {
    pub codepoint: char,
    /// Normalized `[u0, v0, u1, v1]` texture coordinates, origin at the
    /// bitmap's top-left, matching the row-major layout of `pixels`.
    pub uv: [f64; 4],
    pub metrics: GlyphMetrics,
}

/// A packed RGBA atlas: `pixels` is `4 * width * height` bytes, alpha
/// channel always 255 (the MSDF itself carries no coverage information).
#[derive(Debug, Clone)]
pub struct AtlasResult {
    pub pixels: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub entries: Vec<AtlasEntry>,
}

struct GeneratedGlyph {
    codepoint: char,
    pixels: Vec<u8>,
    size: u32,
    metrics: GlyphMetrics,
}

/// Generates one MSDF per codepoint (in parallel via `rayon` off wasm32,
/// matching the teacher's own concurrency choice for independent per-item
/// work) and shelf-packs them into a single atlas bitmap.
///
/// Per spec.md §7, a codepoint with no mapped glyph is skipped; every other
/// error aborts the whole packing.
pub fn pack(font: &Font, options: GlyphOptions, codepoints: &[char]) -> Result<AtlasResult, MsdfError> {
    let generated = generate_all(font, options, codepoints)?;

    if generated.is_empty() {
        warn!("atlas pack produced zero glyphs out of {} requested codepoints", codepoints.len());
        return Ok(AtlasResult { pixels: Vec::new(), width: 0, height: 0, entries: Vec::new() });
    }

    let cols = ((generated.len() as f64).sqrt().ceil() as u32 + 1).max(1);
    let rows = (generated.len() as u32).div_ceil(cols);

    // Row height is the tallest glyph placed in that row; all glyphs here
    // are square (`size` x `size`) but kept general in case that changes.
    let mut row_heights = vec![0u32; rows as usize];
    let mut col_widths = vec![0u32; cols as usize];
    for (i, g) in generated.iter().enumerate() {
        let row = (i as u32 / cols) as usize;
        let col = (i as u32 % cols) as usize;
        row_heights[row] = row_heights[row].max(g.size);
        col_widths[col] = col_widths[col].max(g.size);
    }

    let width: u32 = col_widths.iter().sum();
    let height: u32 = row_heights.iter().sum();
    let mut pixels = vec![0u8; 4 * width as usize * height as usize];

    let mut row_offsets = vec![0u32; rows as usize];
    {
        let mut acc = 0u32;
        for (i, h) in row_heights.iter().enumerate() {
            row_offsets[i] = acc;
            acc += h;
        }
    }
    let mut col_offsets = vec![0u32; cols as usize];
    {
        let mut acc = 0u32;
        for (i, w) in col_widths.iter().enumerate() {
            col_offsets[i] = acc;
            acc += w;
        }
    }

    let mut entries = Vec::with_capacity(generated.len());
    for (i, g) in generated.iter().enumerate() {
        let row = (i as u32 / cols) as usize;
        let col = (i as u32 % cols) as usize;
        let x0 = col_offsets[col];
        let y0 = row_offsets[row];
        blit_rgb_into_rgba(&mut pixels, width, x0, y0, &g.pixels, g.size, g.size);

        let uv = [
            x0 as f64 / width as f64,
            y0 as f64 / height as f64,
            (x0 + g.size) as f64 / width as f64,
            (y0 + g.size) as f64 / height as f64,
        ];
        entries.push(AtlasEntry { codepoint: g.codepoint, uv, metrics: g.metrics });
    }

    debug!(
        "packed atlas: {} glyphs into {}x{} ({} cols x {} rows)",
        entries.len(),
        width,
        height,
        cols,
        rows
    );

    Ok(AtlasResult { pixels, width, height, entries })
}

#[cfg(not(target_arch = "wasm32"))]
fn generate_all(font: &Font, options: GlyphOptions, codepoints: &[char]) -> Result<Vec<GeneratedGlyph>, MsdfError> {
    codepoints
        .par_iter()
        .filter_map(|&cp| match generate_glyph(font, cp, options) {
            Ok(result) => Some(Ok(GeneratedGlyph {
                codepoint: cp,
                pixels: result.pixels,
                size: result.width,
                metrics: result.metrics,
            })),
            Err(MsdfError::GlyphNotFound(_)) => {
                warn!("skipping codepoint U+{:04X}: no glyph mapped", cp as u32);
                None
            }
            Err(e) => Some(Err(e)),
        })
        .collect()
}

#[cfg(target_arch = "wasm32")]
fn generate_all(font: &Font, options: GlyphOptions, codepoints: &[char]) -> Result<Vec<GeneratedGlyph>, MsdfError> {
    let mut out = Vec::with_capacity(codepoints.len());
    for &cp in codepoints {
        match generate_glyph(font, cp, options) {
            Ok(result) => out.push(GeneratedGlyph {
                codepoint: cp,
                pixels: result.pixels,
                size: result.width,
                metrics: result.metrics,
            }),
            Err(MsdfError::GlyphNotFound(_)) => {
                warn!("skipping codepoint U+{:04X}: no glyph mapped", cp as u32);
            }
            Err(e) => return Err(e),
        }
    }
    Ok(out)
}

/// Copies an RGB glyph bitmap into the RGBA atlas at `(x0, y0)`, filling
/// alpha to opaque.
fn blit_rgb_into_rgba(dst: &mut [u8], dst_width: u32, x0: u32, y0: u32, src: &[u8], src_w: u32, src_h: u32) {
    for y in 0..src_h {
        for x in 0..src_w {
            let src_i = 3 * (y as usize * src_w as usize + x as usize);
            let dst_i = 4 * ((y0 + y) as usize * dst_width as usize + (x0 + x) as usize);
            dst[dst_i..dst_i + 3].copy_from_slice(&src[src_i..src_i + 3]);
            dst[dst_i + 3] = 255;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::font::test_support::minimal_truetype_font;
    use crate::generator::DEFAULT_RANGE;

    #[test]
    fn packs_single_glyph_atlas_with_opaque_alpha() {
        let font = Font::load(minimal_truetype_font()).unwrap();
        let options = GlyphOptions { size: 16, padding: 2, range: DEFAULT_RANGE };
        let atlas = pack(&font, options, &['A']).unwrap();

        assert_eq!(atlas.entries.len(), 1);
        assert_eq!(atlas.entries[0].codepoint, 'A');
        assert!(atlas.width >= 16 && atlas.height >= 16);
        assert_eq!(atlas.pixels.len(), 4 * atlas.width as usize * atlas.height as usize);
        assert!(atlas.pixels.chunks(4).all(|px| px[3] == 255));
    }

    #[test]
    fn skips_unmapped_codepoints_without_erroring() {
        let font = Font::load(minimal_truetype_font()).unwrap();
        let options = GlyphOptions { size: 16, padding: 2, range: DEFAULT_RANGE };
        let atlas = pack(&font, options, &['A', 'Z']).unwrap();
        assert_eq!(atlas.entries.len(), 1);
        assert_eq!(atlas.entries[0].codepoint, 'A');
    }

    #[test]
    fn empty_codepoint_list_yields_empty_atlas() {
        let font = Font::load(minimal_truetype_font()).unwrap();
        let atlas = pack(&font, GlyphOptions::default(), &[]).unwrap();
        assert_eq!(atlas.width, 0);
        assert_eq!(atlas.height, 0);
        assert!(atlas.entries.is_empty());
    }
}
