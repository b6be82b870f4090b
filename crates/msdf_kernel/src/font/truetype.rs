//! TrueType `glyf` simple-glyph outline decoding into a [`Shape`] of
//! `Linear`+`Quadratic` segments, normalized into em-square font units.
//!
//! Grounded on the standard TrueType simple-glyph layout: per-contour end
//! points, a run-length-encoded flag stream, then delta-encoded x then y
//! coordinates. Off-curve points imply an on-curve midpoint between any two
//! consecutive off-curve points, the same walk used by every TrueType
//! outline reader.

use super::reader::Reader;
use crate::error::MsdfError;
use crate::geometry::{Contour, EdgeColor, Segment, Shape, Vec2};

bitflags::bitflags! {
    struct SimpleGlyphFlag: u8 {
        const ON_CURVE = 0x01;
        const X_SHORT = 0x02;
        const Y_SHORT = 0x04;
        const REPEAT = 0x08;
        const X_SAME_OR_POSITIVE = 0x10;
        const Y_SAME_OR_POSITIVE = 0x20;
    }
}

#[derive(Debug, Clone, Copy)]
struct GlyphPoint {
    x: f64,
    y: f64,
    on_curve: bool,
}

/// Decodes glyph `gid`'s outline at `glyf_offset + loca[gid]`, scaled by
/// `1 / units_per_em` so the returned shape is in normalized em units with
/// Y pointing up, matching `load_shape`'s documented contract (spec.md §6).
///
/// Composite glyphs (`number_of_contours < 0`) are out of scope for this
/// expansion (see DESIGN.md) and surface `UnsupportedFormat`.
pub fn outline(data: &[u8], glyf_offset: u32, loca: &[u32], gid: u16, units_per_em: u16) -> Result<Shape, MsdfError> {
    let gid = gid as usize;
    if gid + 1 >= loca.len() {
        return Err(MsdfError::InvalidGlyph(format!("glyph index {gid} out of range")));
    }
    let start = loca[gid];
    let end = loca[gid + 1];
    if start == end {
        // Valid empty glyph (e.g. space): zero contours.
        return Ok(Shape::new(Vec::new()));
    }

    let mut r = Reader::at(data, (glyf_offset + start) as usize);
    let number_of_contours = r.i16()?;
    if number_of_contours < 0 {
        return Err(MsdfError::UnsupportedFormat("composite glyphs are not supported".into()));
    }
    let _x_min = r.i16()?;
    let _y_min = r.i16()?;
    let _x_max = r.i16()?;
    let _y_max = r.i16()?;

    let number_of_contours = number_of_contours as usize;
    let mut end_pts = Vec::with_capacity(number_of_contours);
    for _ in 0..number_of_contours {
        end_pts.push(r.u16()?);
    }
    let num_points = end_pts.last().map(|&e| e as usize + 1).unwrap_or(0);

    let instruction_length = r.u16()?;
    r.advance(instruction_length as usize);

    let mut flags = Vec::with_capacity(num_points);
    while flags.len() < num_points {
        let flag = SimpleGlyphFlag::from_bits_truncate(r.u8()?);
        flags.push(flag);
        if flag.contains(SimpleGlyphFlag::REPEAT) {
            let repeat_count = r.u8()?;
            for _ in 0..repeat_count {
                if flags.len() >= num_points {
                    break;
                }
                flags.push(flag);
            }
        }
    }

    let scale = 1.0 / units_per_em.max(1) as f64;

    let mut xs = Vec::with_capacity(num_points);
    let mut x = 0i32;
    for flag in &flags {
        if flag.contains(SimpleGlyphFlag::X_SHORT) {
            let d = r.u8()? as i32;
            x += if flag.contains(SimpleGlyphFlag::X_SAME_OR_POSITIVE) { d } else { -d };
        } else if !flag.contains(SimpleGlyphFlag::X_SAME_OR_POSITIVE) {
            x += r.i16()? as i32;
        }
        xs.push(x);
    }

    let mut ys = Vec::with_capacity(num_points);
    let mut y = 0i32;
    for flag in &flags {
        if flag.contains(SimpleGlyphFlag::Y_SHORT) {
            let d = r.u8()? as i32;
            y += if flag.contains(SimpleGlyphFlag::Y_SAME_OR_POSITIVE) { d } else { -d };
        } else if !flag.contains(SimpleGlyphFlag::Y_SAME_OR_POSITIVE) {
            y += r.i16()? as i32;
        }
        ys.push(y);
    }

    let points: Vec<GlyphPoint> = (0..num_points)
        .map(|i| GlyphPoint {
            x: xs[i] as f64 * scale,
            y: ys[i] as f64 * scale,
            on_curve: flags[i].contains(SimpleGlyphFlag::ON_CURVE),
        })
        .collect();

    let mut contours = Vec::with_capacity(number_of_contours);
    let mut contour_start = 0usize;
    for &end_pt in &end_pts {
        let contour_end = end_pt as usize + 1;
        if contour_end > contour_start {
            if let Some(contour) = build_contour(&points[contour_start..contour_end]) {
                contours.push(contour);
            }
        }
        contour_start = contour_end;
    }

    Ok(Shape::new(contours))
}

/// Walks one contour's point list starting at a real or synthesized
/// on-curve point, carrying a single pending off-curve control point so
/// that two consecutive off-curve points emit a quadratic through their
/// implied on-curve midpoint, per the standard TrueType contour rule.
fn build_contour(points: &[GlyphPoint]) -> Option<Contour> {
    let n = points.len();
    if n < 2 {
        return None;
    }

    let first_index = points.iter().position(|p| p.on_curve);
    let (loop_start, first_index) = match first_index {
        Some(i) => (Vec2::new(points[i].x, points[i].y), i),
        None => (midpoint(points[0], points[n - 1]), 0),
    };

    let mut edges = Vec::with_capacity(n);
    let mut cursor = loop_start;
    let mut pending_ctrl: Option<Vec2> = None;

    for step in 1..=n {
        let p = points[(first_index + step) % n];
        let here = Vec2::new(p.x, p.y);
        if p.on_curve {
            match pending_ctrl.take() {
                Some(ctrl) => edges.push(Segment::quadratic(cursor, ctrl, here, EdgeColor::WHITE)),
                None => edges.push(Segment::linear(cursor, here, EdgeColor::WHITE)),
            }
            cursor = here;
        } else if let Some(ctrl) = pending_ctrl.replace(here) {
            let mid = ctrl.lerp(here, 0.5);
            edges.push(Segment::quadratic(cursor, ctrl, mid, EdgeColor::WHITE));
            cursor = mid;
        }
    }

    if let Some(ctrl) = pending_ctrl {
        edges.push(Segment::quadratic(cursor, ctrl, loop_start, EdgeColor::WHITE));
    } else if (cursor.x - loop_start.x).abs() > 1e-9 || (cursor.y - loop_start.y).abs() > 1e-9 {
        edges.push(Segment::linear(cursor, loop_start, EdgeColor::WHITE));
    }

    Some(Contour::new(edges))
}

fn midpoint(a: GlyphPoint, b: GlyphPoint) -> Vec2 {
    Vec2::new((a.x + b.x) / 2.0, (a.y + b.y) / 2.0)
}
