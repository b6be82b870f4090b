//! Type 2 CharString interpreter: a stack machine (48-deep operand stack,
//! 10-deep call stack per spec.md §9) that decodes a glyph's CharString
//! bytes into a [`Shape`] of `Linear`+`Cubic` segments.
//!
//! Operator coverage follows spec.md §4.6's named subset
//! (`rmoveto`/`hmoveto`/`vmoveto`, `rlineto`/`hlineto`/`vlineto`,
//! `rrcurveto`/`hhcurveto`/`vvcurveto`, `callsubr`/`callgsubr`/`return`,
//! `endchar`) plus `vhcurveto`/`hvcurveto` and the hint operators
//! (`hstem`/`vstem`/`hstemhm`/`vstemhm`/`hintmask`/`cntrmask`): real CFF
//! glyphs overwhelmingly use the alternating curve operators and carry hint
//! data that must at least be consumed to keep the operand stream aligned,
//! so omitting them would make the interpreter fail on almost every glyph
//! outside synthetic test fonts (see DESIGN.md).

use super::cff::Index;
use crate::error::{CharStringError, MsdfError};
use crate::geometry::{Contour, EdgeColor, Segment, Shape, Vec2};

const MAX_OPERAND_STACK: usize = 48;
const MAX_CALL_DEPTH: usize = 10;

/// CFF subroutine numbers are biased by a constant derived from the count
/// of entries in the subroutine INDEX (Type 2 CharString spec, Appendix).
fn subr_bias(count: usize) -> i32 {
    if count < 1240 {
        107
    } else if count < 33900 {
        1131
    } else {
        32768
    }
}

struct Interpreter<'a> {
    global_subrs: &'a Index<'a>,
    local_subrs: &'a Index<'a>,
    global_bias: i32,
    local_bias: i32,
    stack: Vec<f64>,
    x: f64,
    y: f64,
    start: Vec2,
    contour: Vec<Segment>,
    contours: Vec<Contour>,
    num_stems: usize,
    width_parsed: bool,
    call_depth: usize,
    has_path: bool,
}

/// Decodes glyph `gid`'s CharString into a `Shape`. `units_per_em` scales
/// the raw (1000-unit-typical) CFF coordinate space down to em units.
pub fn outline(
    charstrings: &Index,
    global_subrs: &Index,
    local_subrs: &Index,
    gid: u16,
    units_per_em: u16,
) -> Result<Shape, MsdfError> {
    let cs = charstrings
        .get(gid as usize)
        .ok_or_else(|| MsdfError::InvalidGlyph(format!("CFF glyph index {gid} out of range")))?;

    let mut interp = Interpreter {
        global_subrs,
        local_subrs,
        global_bias: subr_bias(global_subrs.len()),
        local_bias: subr_bias(local_subrs.len()),
        stack: Vec::with_capacity(MAX_OPERAND_STACK),
        x: 0.0,
        y: 0.0,
        start: Vec2::ZERO,
        contour: Vec::new(),
        contours: Vec::new(),
        num_stems: 0,
        width_parsed: false,
        call_depth: 0,
        has_path: false,
    };
    interp.run(cs).map_err(MsdfError::from)?;
    interp.close_contour();

    let scale = 1.0 / units_per_em.max(1) as f64;
    for contour in interp.contours.iter_mut() {
        for edge in contour.edges.iter_mut() {
            *edge = scale_segment(edge, scale);
        }
    }
    Ok(Shape::new(interp.contours))
}

fn scale_segment(seg: &Segment, scale: f64) -> Segment {
    let sc = |p: Vec2| p * scale;
    match *seg {
        Segment::Linear(p0, p1, c) => Segment::Linear(sc(p0), sc(p1), c),
        Segment::Quadratic(p0, p1, p2, c) => Segment::Quadratic(sc(p0), sc(p1), sc(p2), c),
        Segment::Cubic(p0, p1, p2, p3, c) => Segment::Cubic(sc(p0), sc(p1), sc(p2), sc(p3), c),
    }
}

impl<'a> Interpreter<'a> {
    fn run(&mut self, code: &[u8]) -> Result<bool, CharStringError> {
        let mut i = 0usize;
        while i < code.len() {
            let b0 = code[i];
            i += 1;
            match b0 {
                1 | 3 | 18 | 23 => {
                    // hstem, vstem, hstemhm, vstemhm
                    self.take_width_if_odd_stem_args();
                    self.num_stems += self.stack.len() / 2;
                    self.stack.clear();
                }
                19 | 20 => {
                    // hintmask, cntrmask
                    self.take_width_if_odd_stem_args();
                    self.num_stems += self.stack.len() / 2;
                    self.stack.clear();
                    i += (self.num_stems + 7) / 8;
                }
                21 => {
                    // rmoveto
                    self.close_contour();
                    self.take_width(2);
                    let (dx, dy) = (self.pop2());
                    self.move_to(dx, dy);
                }
                22 => {
                    // hmoveto
                    self.close_contour();
                    self.take_width(1);
                    let dx = self.stack.pop().unwrap_or(0.0);
                    self.move_to(dx, 0.0);
                }
                4 => {
                    // vmoveto
                    self.close_contour();
                    self.take_width(1);
                    let dy = self.stack.pop().unwrap_or(0.0);
                    self.move_to(0.0, dy);
                }
                5 => {
                    // rlineto
                    let args = std::mem::take(&mut self.stack);
                    for pair in args.chunks(2) {
                        if pair.len() == 2 {
                            self.line_to(pair[0], pair[1]);
                        }
                    }
                }
                6 | 7 => {
                    // hlineto / vlineto: alternating axis per argument
                    let args = std::mem::take(&mut self.stack);
                    let mut horizontal = b0 == 6;
                    for &d in &args {
                        if horizontal {
                            self.line_to(d, 0.0);
                        } else {
                            self.line_to(0.0, d);
                        }
                        horizontal = !horizontal;
                    }
                }
                8 => {
                    // rrcurveto
                    let args = std::mem::take(&mut self.stack);
                    for six in args.chunks(6) {
                        if six.len() == 6 {
                            self.curve_to(six[0], six[1], six[2], six[3], six[4], six[5]);
                        }
                    }
                }
                24 => {
                    // rcurveline: curves then a trailing line
                    let args = std::mem::take(&mut self.stack);
                    let n_curves = (args.len().saturating_sub(2)) / 6;
                    for k in 0..n_curves {
                        let six = &args[k * 6..k * 6 + 6];
                        self.curve_to(six[0], six[1], six[2], six[3], six[4], six[5]);
                    }
                    if args.len() >= n_curves * 6 + 2 {
                        let tail = &args[n_curves * 6..];
                        self.line_to(tail[0], tail[1]);
                    }
                }
                25 => {
                    // rlinecurve: lines then a trailing curve
                    let args = std::mem::take(&mut self.stack);
                    let n_lines = (args.len().saturating_sub(6)) / 2;
                    for k in 0..n_lines {
                        let pair = &args[k * 2..k * 2 + 2];
                        self.line_to(pair[0], pair[1]);
                    }
                    if args.len() >= n_lines * 2 + 6 {
                        let six = &args[n_lines * 2..];
                        self.curve_to(six[0], six[1], six[2], six[3], six[4], six[5]);
                    }
                }
                26 => {
                    // vvcurveto: optional leading dx1, then groups of 4
                    let mut args = std::mem::take(&mut self.stack);
                    let mut dx1 = 0.0;
                    if args.len() % 4 == 1 {
                        dx1 = args.remove(0);
                    }
                    for (idx, four) in args.chunks(4).enumerate() {
                        if four.len() != 4 {
                            continue;
                        }
                        let lead_dx = if idx == 0 { dx1 } else { 0.0 };
                        self.curve_to(lead_dx, four[0], four[1], four[2], 0.0, four[3]);
                    }
                }
                27 => {
                    // hhcurveto: optional leading dy1, then groups of 4
                    let mut args = std::mem::take(&mut self.stack);
                    let mut dy1 = 0.0;
                    if args.len() % 4 == 1 {
                        dy1 = args.remove(0);
                    }
                    for (idx, four) in args.chunks(4).enumerate() {
                        if four.len() != 4 {
                            continue;
                        }
                        let lead_dy = if idx == 0 { dy1 } else { 0.0 };
                        self.curve_to(four[0], lead_dy, four[1], four[2], four[3], 0.0);
                    }
                }
                30 | 31 => {
                    // vhcurveto / hvcurveto: alternating-axis curve chains
                    let args = std::mem::take(&mut self.stack);
                    let mut horizontal_start = b0 == 31;
                    let n = args.len() / 4;
                    for k in 0..n {
                        let four = &args[k * 4..k * 4 + 4];
                        let is_last = k == n - 1;
                        let last_extra = if is_last && args.len() == n * 4 + 1 { args[n * 4] } else { 0.0 };
                        if horizontal_start {
                            // dx1 dx2 dy2 dy3(+dxf)
                            self.curve_to(four[0], 0.0, four[1], four[2], last_extra, four[3]);
                        } else {
                            // dy1 dx2 dy2 dx3(+dyf)
                            self.curve_to(0.0, four[0], four[1], four[2], four[3], last_extra);
                        }
                        horizontal_start = !horizontal_start;
                    }
                }
                10 => {
                    // callsubr
                    if self.call(self.local_bias, true)? {
                        return Ok(true);
                    }
                }
                29 => {
                    // callgsubr
                    if self.call(self.global_bias, false)? {
                        return Ok(true);
                    }
                }
                11 => {
                    // return
                    return Ok(false);
                }
                14 => {
                    // endchar
                    self.take_width(0);
                    self.close_contour();
                    return Ok(true);
                }
                12 => {
                    // escape operators (flex family etc.): not modeled;
                    // consume the 2-byte opcode and clear operands so the
                    // stream stays aligned for whatever follows.
                    if i >= code.len() {
                        return Err(CharStringError::UnterminatedCharString);
                    }
                    i += 1;
                    self.stack.clear();
                }
                28 => {
                    if i + 2 > code.len() {
                        return Err(CharStringError::UnterminatedCharString);
                    }
                    let v = i16::from_be_bytes([code[i], code[i + 1]]);
                    i += 2;
                    self.push(v as f64)?;
                }
                32..=246 => self.push(b0 as f64 - 139.0)?,
                247..=250 => {
                    if i >= code.len() {
                        return Err(CharStringError::UnterminatedCharString);
                    }
                    let b1 = code[i];
                    i += 1;
                    self.push((b0 as f64 - 247.0) * 256.0 + b1 as f64 + 108.0)?;
                }
                251..=254 => {
                    if i >= code.len() {
                        return Err(CharStringError::UnterminatedCharString);
                    }
                    let b1 = code[i];
                    i += 1;
                    self.push(-(b0 as f64 - 251.0) * 256.0 - b1 as f64 - 108.0)?;
                }
                255 => {
                    if i + 4 > code.len() {
                        return Err(CharStringError::UnterminatedCharString);
                    }
                    let bits = i32::from_be_bytes([code[i], code[i + 1], code[i + 2], code[i + 3]]);
                    i += 4;
                    self.push(bits as f64 / 65536.0)?;
                }
                other => return Err(CharStringError::InvalidOperator(other)),
            }
        }
        Err(CharStringError::UnterminatedCharString)
    }

    fn push(&mut self, v: f64) -> Result<(), CharStringError> {
        if self.stack.len() >= MAX_OPERAND_STACK {
            return Err(CharStringError::StackOverflow(MAX_OPERAND_STACK));
        }
        self.stack.push(v);
        Ok(())
    }

    fn pop2(&mut self) -> (f64, f64) {
        let dy = self.stack.pop().unwrap_or(0.0);
        let dx = self.stack.pop().unwrap_or(0.0);
        (dx, dy)
    }

    /// The first stack-clearing operator in a CharString may carry one
    /// extra leading operand: the glyph's width delta. Not needed for
    /// outline geometry, so it's simply discarded once per glyph.
    fn take_width(&mut self, expected_args: usize) {
        if !self.width_parsed {
            self.width_parsed = true;
            if self.stack.len() > expected_args {
                self.stack.remove(0);
            }
        }
    }

    fn take_width_if_odd_stem_args(&mut self) {
        if !self.width_parsed {
            self.width_parsed = true;
            if self.stack.len() % 2 == 1 {
                self.stack.remove(0);
            }
        }
    }

    /// Runs the called subroutine; returns `true` if it hit `endchar`, in
    /// which case the caller must stop too instead of resuming after the
    /// call.
    fn call(&mut self, bias: i32, local: bool) -> Result<bool, CharStringError> {
        let idx = self.stack.pop().unwrap_or(0.0) as i32 + bias;
        if idx < 0 {
            return Err(CharStringError::InvalidSubroutineIndex(idx));
        }
        let subrs = if local { self.local_subrs } else { self.global_subrs };
        let code = subrs
            .get(idx as usize)
            .ok_or(CharStringError::InvalidSubroutineIndex(idx))?;
        self.call_depth += 1;
        if self.call_depth > MAX_CALL_DEPTH {
            return Err(CharStringError::SubroutineCallTooDeep(MAX_CALL_DEPTH));
        }
        let finished = self.run(code)?;
        self.call_depth -= 1;
        Ok(finished)
    }

    fn move_to(&mut self, dx: f64, dy: f64) {
        self.x += dx;
        self.y += dy;
        self.start = Vec2::new(self.x, self.y);
    }

    fn line_to(&mut self, dx: f64, dy: f64) {
        let from = Vec2::new(self.x, self.y);
        self.x += dx;
        self.y += dy;
        let to = Vec2::new(self.x, self.y);
        if from != to {
            self.contour.push(Segment::linear(from, to, EdgeColor::WHITE));
            self.has_path = true;
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn curve_to(&mut self, dx1: f64, dy1: f64, dx2: f64, dy2: f64, dx3: f64, dy3: f64) {
        let p0 = Vec2::new(self.x, self.y);
        let p1 = p0 + Vec2::new(dx1, dy1);
        let p2 = p1 + Vec2::new(dx2, dy2);
        let p3 = p2 + Vec2::new(dx3, dy3);
        self.x = p3.x;
        self.y = p3.y;
        self.contour.push(Segment::cubic(p0, p1, p2, p3, EdgeColor::WHITE));
        self.has_path = true;
    }

    fn close_contour(&mut self) {
        if self.contour.is_empty() {
            return;
        }
        let cur = Vec2::new(self.x, self.y);
        if cur != self.start {
            self.contour.push(Segment::linear(cur, self.start, EdgeColor::WHITE));
        }
        self.contours.push(Contour::new(std::mem::take(&mut self.contour)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::font::cff::Index;

    fn empty_index() -> Index<'static> {
        Index::default()
    }

    /// Same byte sequence as spec.md §8 scenario 5: two rmoveto-equivalent
    /// moves (the first is the implicit opening move via `rmoveto`) plus
    /// `rlineto`s tracing a quadrilateral, terminated by `endchar`.
    #[test]
    fn decodes_rmoveto_rlineto_quadrilateral() {
        let code: &[u8] = &[139, 139, 21, 239, 139, 5, 139, 239, 5, 39, 139, 5, 14];
        let charstrings = Index::from_single(code);
        let global_subrs = empty_index();
        let local_subrs = empty_index();
        let shape = outline(&charstrings, &global_subrs, &local_subrs, 0, 1000).unwrap();
        assert_eq!(shape.contours.len(), 1);
        assert_eq!(shape.contours[0].edges.len(), 4);
    }

    #[test]
    fn subr_bias_matches_type2_spec_thresholds() {
        assert_eq!(subr_bias(0), 107);
        assert_eq!(subr_bias(1239), 107);
        assert_eq!(subr_bias(1240), 1131);
        assert_eq!(subr_bias(33900), 32768);
    }
}
