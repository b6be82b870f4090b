//! Multi-channel signed distance field generation for font glyphs.
//!
//! Loads TrueType or CFF-flavored OpenType fonts, decodes glyph outlines into
//! the internal [`geometry::Shape`] model, and synthesizes MSDF bitmaps via
//! the pipeline in [`generator`]: normalize orientation, assign per-edge
//! channel colors, rasterize, then run the error-correction pass.

pub mod atlas;
pub mod coloring;
pub mod error;
pub mod font;
pub mod generator;
pub mod geometry;

use log::debug;

pub use atlas::{pack as generate_atlas, AtlasEntry, AtlasResult};
pub use error::MsdfError;
pub use font::Font;

use coloring::{color_shape, DEFAULT_CORNER_ANGLE};
use generator::{correct_errors, generate, Transform, DEFAULT_RANGE};

#[cfg(feature = "config")]
use serde::{Deserialize, Serialize};

/// Per-glyph generation options, normalized across both `generate_glyph` and
/// `generate_atlas`. `size` is the output bitmap's edge length in pixels;
/// `padding` reserves a pixel border inside that edge for the distance
/// transition to safely fall off in; `range` is the shape-unit width of that
/// transition (spec.md §6/§9).
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "config", derive(Serialize, Deserialize))]
pub struct GlyphOptions {
    pub size: u32,
    pub padding: u32,
    pub range: f64,
}

impl Default for GlyphOptions {
    fn default() -> Self {
        GlyphOptions { size: 32, padding: 4, range: DEFAULT_RANGE }
    }
}

/// Packing options for [`generate_atlas`], layered on top of the per-glyph
/// [`GlyphOptions`] every cell in the atlas is generated with.
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "config", derive(Serialize, Deserialize))]
pub struct AtlasOptions {
    pub glyph: GlyphOptions,
}

impl Default for AtlasOptions {
    fn default() -> Self {
        AtlasOptions { glyph: GlyphOptions::default() }
    }
}

/// Normalized glyph metrics, in em units (spec.md §6: "metrics are
/// normalized to the font's em unit").
#[derive(Debug, Clone, Copy)]
pub struct GlyphMetrics {
    pub advance: f64,
}

/// Result of a single [`generate_glyph`] call.
#[derive(Debug, Clone)]
pub struct MsdfResult {
    pub pixels: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub metrics: GlyphMetrics,
}

/// Generates a single glyph's MSDF bitmap (spec.md §6's `generate_msdf`,
/// folded together with `load_shape` + normalize + coloring into one call
/// over an already-parsed [`Font`]).
///
/// Runs the full pipeline in the order spec.md §5 requires: decode outline,
/// normalize orientation, color edges, rasterize, then error-correct.
pub fn generate_glyph(font: &Font, codepoint: char, options: GlyphOptions) -> Result<MsdfResult, MsdfError> {
    let mut shape = font.glyph_shape(codepoint)?;
    shape.normalize();

    let mut seed = codepoint as u64;
    color_shape(&mut shape, DEFAULT_CORNER_ANGLE, &mut seed);

    let bounds = shape.bounds();
    let transform = Transform::fit(bounds, options.size, options.padding);
    let mut bitmap = generate(&shape, &transform, options.size, options.size, options.range);
    correct_errors(&mut bitmap, &shape, &transform);

    debug!(
        "generated glyph U+{:04X}: {}x{} px, {} contours",
        codepoint as u32,
        bitmap.width,
        bitmap.height,
        shape.contours.len()
    );

    let advance = font.advance_width(codepoint).unwrap_or(0.0);
    Ok(MsdfResult {
        pixels: bitmap.pixels,
        width: bitmap.width,
        height: bitmap.height,
        metrics: GlyphMetrics { advance },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build_test_font() -> Font {
        // Reuses the minimal single-glyph TrueType font builder shared with
        // `font::tests`, via the public `Font::load` entry point, to exercise
        // the full `generate_glyph` pipeline end to end (spec.md §8 scenario 1
        // analogue).
        let bytes = crate::font::test_support::minimal_truetype_font();
        Font::load(bytes).unwrap()
    }

    #[test]
    fn generate_glyph_produces_expected_bitmap_dimensions() {
        let font = build_test_font();
        let options = GlyphOptions { size: 24, padding: 2, range: DEFAULT_RANGE };
        let result = generate_glyph(&font, 'A', options).unwrap();
        assert_eq!(result.width, 24);
        assert_eq!(result.height, 24);
        assert_eq!(result.pixels.len(), 3 * 24 * 24);
    }

    #[test]
    fn generate_glyph_reports_missing_codepoint() {
        let font = build_test_font();
        let err = generate_glyph(&font, 'Z', GlyphOptions::default()).unwrap_err();
        assert!(matches!(err, MsdfError::GlyphNotFound(_)));
    }
}
