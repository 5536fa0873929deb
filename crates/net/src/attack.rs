//! Line clears to garbage rows.

/// Converts the growth of a cleared-lines counter into garbage rows.
///
/// Fractions left by the ratio carry over to later samples.
#[derive(Debug, Clone, PartialEq)]
pub struct AttackMeter {
    ratio: f64,
    last_lines: u32,
    carry: f64,
}

impl AttackMeter {
    /// Negative or non-finite ratios disable attacks
    pub fn new(ratio: f64) -> Self {
        let ratio = if ratio.is_finite() && ratio > 0.0 {
            ratio
        } else {
            0.0
        };
        Self {
            ratio,
            last_lines: 0,
            carry: 0.0,
        }
    }

    pub fn ratio(&self) -> f64 {
        self.ratio
    }

    /// Rows earned since the previous sample.
    ///
    /// A counter that went backwards (restart) rebases without attacking.
    pub fn sample(&mut self, total_lines: u32) -> u32 {
        if total_lines < self.last_lines {
            self.reset(total_lines);
            return 0;
        }
        let delta = total_lines - self.last_lines;
        self.last_lines = total_lines;
        if delta == 0 {
            return 0;
        }

        self.carry += f64::from(delta) * self.ratio;
        let rows = self.carry.floor();
        self.carry -= rows;
        rows as u32
    }

    pub fn reset(&mut self, total_lines: u32) {
        self.last_lines = total_lines;
        self.carry = 0.0;
    }
}
