//! Synchronized match start.
//!
//! The host announces a shared seed and an absolute start time far enough
//! ahead to absorb latency plus the countdown. Each side then runs its own
//! countdown so that "Go" lands at the same wall-clock instant everywhere.

use rand::Rng;

use crate::protocol::StartPayload;

/// Host lead between announcing and starting
pub const START_LEAD_MS: u64 = 5_000;
pub const COUNTDOWN_STEP_MS: u64 = 1_000;
pub const COUNTDOWN_MS: u64 = 3 * COUNTDOWN_STEP_MS;
pub const COUNTDOWN_LABELS: [&str; 4] = ["3", "2", "1", "Go"];

pub fn random_seed() -> u32 {
    rand::thread_rng().gen()
}

pub fn plan_start(now_ms: u64, lead_ms: u64, seed: u32) -> StartPayload {
    StartPayload {
        seed,
        at: now_ms + lead_ms,
    }
}

/// How long to wait before showing "3": `max(0, at - now - countdown)`
pub fn countdown_delay(at_ms: u64, now_ms: u64, countdown_ms: u64) -> u64 {
    at_ms.saturating_sub(now_ms).saturating_sub(countdown_ms)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountdownStep {
    Waiting,
    Count(u8),
    Go,
}

/// Countdown for one received `start`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Countdown {
    seed: u32,
    begins_at: u64,
}

impl Countdown {
    pub fn schedule(start: &StartPayload, now_ms: u64) -> Self {
        Self {
            seed: start.seed,
            begins_at: now_ms + countdown_delay(start.at, now_ms, COUNTDOWN_MS),
        }
    }

    pub fn seed(&self) -> u32 {
        self.seed
    }

    /// When "3" appears
    pub fn begins_at(&self) -> u64 {
        self.begins_at
    }

    pub fn go_at(&self) -> u64 {
        self.begins_at + COUNTDOWN_MS
    }

    pub fn step(&self, now_ms: u64) -> CountdownStep {
        if now_ms < self.begins_at {
            return CountdownStep::Waiting;
        }
        match (now_ms - self.begins_at) / COUNTDOWN_STEP_MS {
            0 => CountdownStep::Count(3),
            1 => CountdownStep::Count(2),
            2 => CountdownStep::Count(1),
            _ => CountdownStep::Go,
        }
    }

    pub fn label(&self, now_ms: u64) -> Option<&'static str> {
        match self.step(now_ms) {
            CountdownStep::Waiting => None,
            CountdownStep::Count(n) => Some(COUNTDOWN_LABELS[usize::from(3 - n)]),
            CountdownStep::Go => Some(COUNTDOWN_LABELS[3]),
        }
    }

    pub fn is_done(&self, now_ms: u64) -> bool {
        now_ms >= self.go_at()
    }
}
