//! Three-bit channel mask assigned to each edge by the coloring pass.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EdgeColor(u8);

impl EdgeColor {
    pub const BLACK: EdgeColor = EdgeColor(0b000);
    pub const RED: EdgeColor = EdgeColor(0b001);
    pub const GREEN: EdgeColor = EdgeColor(0b010);
    pub const BLUE: EdgeColor = EdgeColor(0b100);
    pub const CYAN: EdgeColor = EdgeColor(0b110);
    pub const MAGENTA: EdgeColor = EdgeColor(0b101);
    pub const YELLOW: EdgeColor = EdgeColor(0b011);
    pub const WHITE: EdgeColor = EdgeColor(0b111);

    pub fn has_red(self) -> bool {
        self.0 & Self::RED.0 != 0
    }
    pub fn has_green(self) -> bool {
        self.0 & Self::GREEN.0 != 0
    }
    pub fn has_blue(self) -> bool {
        self.0 & Self::BLUE.0 != 0
    }

    /// Cycles Cyan -> Magenta -> Yellow -> Cyan. Colors other than the three
    /// named ones are left unchanged (used defensively; coloring never
    /// switches Black/White).
    pub fn switch(self) -> EdgeColor {
        match self {
            Self::CYAN => Self::MAGENTA,
            Self::MAGENTA => Self::YELLOW,
            Self::YELLOW => Self::CYAN,
            other => other,
        }
    }

    /// Deterministic seeded variant: picks uniformly between the two
    /// non-current colors among {Cyan, Magenta, Yellow} using one xorshift64
    /// step, returning the advanced seed alongside the chosen color.
    pub fn switch_seeded(self, seed: &mut u64) -> EdgeColor {
        *seed ^= *seed << 13;
        *seed ^= *seed >> 7;
        *seed ^= *seed << 17;
        let pick_second = seed.wrapping_mul(3) >> 62 == 0;
        match self {
            Self::CYAN => {
                if pick_second {
                    Self::MAGENTA
                } else {
                    Self::YELLOW
                }
            }
            Self::MAGENTA => {
                if pick_second {
                    Self::YELLOW
                } else {
                    Self::CYAN
                }
            }
            Self::YELLOW => {
                if pick_second {
                    Self::CYAN
                } else {
                    Self::MAGENTA
                }
            }
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_queries() {
        assert!(EdgeColor::CYAN.has_green());
        assert!(EdgeColor::CYAN.has_blue());
        assert!(!EdgeColor::CYAN.has_red());
        assert!(EdgeColor::WHITE.has_red());
        assert!(EdgeColor::WHITE.has_green());
        assert!(EdgeColor::WHITE.has_blue());
        assert!(!EdgeColor::BLACK.has_red());
    }

    #[test]
    fn switch_cycles_through_three_colors() {
        let c = EdgeColor::CYAN;
        let m = c.switch();
        let y = m.switch();
        let back_to_c = y.switch();
        assert_eq!(m, EdgeColor::MAGENTA);
        assert_eq!(y, EdgeColor::YELLOW);
        assert_eq!(back_to_c, EdgeColor::CYAN);
    }
}
