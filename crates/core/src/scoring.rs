//! Scoring module - line clear points and the speed curve

use crate::types::{
    BASE_GRAVITY_MS, GRAVITY_STEP_MS, LINES_PER_LEVEL, LINE_SCORES, MIN_GRAVITY_MS,
};

/// Points for clearing `lines` rows at once at `level`.
///
/// Counts beyond a four-row clear are not part of the table and score 0.
pub fn calculate_score(lines: u32, level: u32) -> u32 {
    LINE_SCORES
        .get(lines as usize)
        .copied()
        .unwrap_or(0)
        .saturating_mul(level)
}

/// Level reached after `lines` total cleared lines (starts at 1)
pub fn level_for_lines(lines: u32) -> u32 {
    lines / LINES_PER_LEVEL + 1
}

/// Gravity interval (ms per row) for a level, floored at [`MIN_GRAVITY_MS`]
pub fn gravity_ms_for_level(level: u32) -> u32 {
    let speedup = level.saturating_sub(1).saturating_mul(GRAVITY_STEP_MS);
    BASE_GRAVITY_MS.saturating_sub(speedup).max(MIN_GRAVITY_MS)
}
