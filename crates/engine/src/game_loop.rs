//! Fixed-step game loop.
//!
//! Each frame adds the elapsed time to an accumulator and drains it in
//! `FIXED_STEP_MS` updates, then renders once. A frame gap over one second
//! (suspended host, debugger) counts as a single nominal step instead of a
//! burst of catch-up updates.

use tracing::debug;

use crate::clock::{FrameId, FrameScheduler};
use crate::types::FIXED_STEP_MS;

/// Frame gaps above this are replaced by one step
pub const MAX_FRAME_GAP_MS: f64 = 1_000.0;

pub trait LoopCallbacks {
    fn update(&mut self, step_ms: f64);

    fn render(&mut self);
}

pub struct GameLoop<C: LoopCallbacks, S: FrameScheduler> {
    callbacks: C,
    scheduler: S,
    fixed_step_ms: f64,
    accumulator_ms: f64,
    last_time_ms: f64,
    pending: Option<FrameId>,
    running: bool,
}

impl<C: LoopCallbacks, S: FrameScheduler> GameLoop<C, S> {
    pub fn new(callbacks: C, scheduler: S) -> Self {
        Self::with_step(callbacks, scheduler, FIXED_STEP_MS)
    }

    pub fn with_step(callbacks: C, scheduler: S, fixed_step_ms: f64) -> Self {
        Self {
            callbacks,
            scheduler,
            fixed_step_ms,
            accumulator_ms: 0.0,
            last_time_ms: 0.0,
            pending: None,
            running: false,
        }
    }

    /// Begin at monotonic time `now_ms` and request the first frame
    pub fn start(&mut self, now_ms: f64) {
        if self.running {
            return;
        }
        debug!(step_ms = self.fixed_step_ms, "game loop started");
        self.running = true;
        self.last_time_ms = now_ms;
        self.pending = Some(self.scheduler.request_frame());
    }

    /// Run one frame at monotonic time `now_ms`. Returns the number of
    /// updates performed; a stopped loop does nothing.
    pub fn frame(&mut self, now_ms: f64) -> u32 {
        if !self.running {
            return 0;
        }
        self.pending = None;

        let mut frame_ms = now_ms - self.last_time_ms;
        if frame_ms > MAX_FRAME_GAP_MS {
            frame_ms = self.fixed_step_ms;
        }
        self.last_time_ms = now_ms;
        self.accumulator_ms += frame_ms.max(0.0);

        let mut steps = 0;
        while self.accumulator_ms >= self.fixed_step_ms {
            self.callbacks.update(self.fixed_step_ms);
            self.accumulator_ms -= self.fixed_step_ms;
            steps += 1;
        }
        self.callbacks.render();

        if self.running {
            self.pending = Some(self.scheduler.request_frame());
        }
        steps
    }

    /// Stop and cancel the pending frame
    pub fn stop(&mut self) {
        self.running = false;
        if let Some(id) = self.pending.take() {
            self.scheduler.cancel_frame(id);
        }
        debug!("game loop stopped");
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn callbacks(&self) -> &C {
        &self.callbacks
    }

    pub fn callbacks_mut(&mut self) -> &mut C {
        &mut self.callbacks
    }

    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }

    pub fn scheduler_mut(&mut self) -> &mut S {
        &mut self.scheduler
    }
}
