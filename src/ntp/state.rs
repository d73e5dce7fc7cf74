// Shared NTP offset state - one lock around the offset/target/step triple
//
// Writers: the sync thread retargets, the audio thread advances one step per
// frame. Readers (display) take the same lock. Critical sections only copy or
// update three integers.

use parking_lot::Mutex;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SlewState {
    /// Correction applied so far
    pub current_offset_us: i64,
    /// Most recent measurement
    pub target_offset_us: i64,
    /// Per-frame increment, zero once the target is reached
    pub step_us: i64,
}

impl SlewState {
    pub fn remaining_us(&self) -> i64 {
        self.target_offset_us - self.current_offset_us
    }

    pub fn is_converged(&self) -> bool {
        self.current_offset_us == self.target_offset_us
    }

    /// Aim at a new target, spreading the difference over `slew_frames` steps
    pub fn retarget(&mut self, target_offset_us: i64, slew_frames: i64) {
        self.target_offset_us = target_offset_us;
        self.step_us = compute_step(self.remaining_us(), slew_frames);
    }

    /// Move one step toward the target, never past it
    pub fn advance(&mut self) {
        if self.current_offset_us == self.target_offset_us {
            self.step_us = 0;
            return;
        }
        if self.step_us == 0 {
            return;
        }

        self.current_offset_us += self.step_us;

        let arrived = (self.step_us > 0 && self.current_offset_us >= self.target_offset_us)
            || (self.step_us < 0 && self.current_offset_us <= self.target_offset_us);
        if arrived {
            self.current_offset_us = self.target_offset_us;
            self.step_us = 0;
        }
    }
}

/// Per-frame step for a difference spread over `slew_frames` frames.
///
/// The quotient is rounded away from zero so the target is reached within
/// `slew_frames` steps; a nonzero difference always yields at least ±1.
pub fn compute_step(diff_us: i64, slew_frames: i64) -> i64 {
    if diff_us == 0 {
        return 0;
    }

    let frames = slew_frames.max(1);
    let magnitude = (diff_us.unsigned_abs() + frames as u64 - 1) / frames as u64;
    let step = (magnitude as i64).max(1);

    if diff_us > 0 { step } else { -step }
}

/// Number of audio frames in a slew window: `slew_period * fps`
pub fn slew_frames(slew_period_secs: u64, fps: f64) -> i64 {
    ((slew_period_secs as f64 * fps) as i64).max(1)
}

/// Cloneable handle to the shared state
#[derive(Clone, Default)]
pub struct NtpState {
    inner: Arc<Mutex<SlewState>>,
}

impl NtpState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> SlewState {
        *self.inner.lock()
    }

    pub fn current_offset_us(&self) -> i64 {
        self.inner.lock().current_offset_us
    }

    /// Publish a new measurement; returns the state after retargeting
    pub fn retarget(&self, target_offset_us: i64, slew_frames: i64) -> SlewState {
        let mut state = self.inner.lock();
        state.retarget(target_offset_us, slew_frames);
        *state
    }

    /// Apply one slew step; returns the offset that was in effect before it
    pub fn apply_step(&self) -> i64 {
        let mut state = self.inner.lock();
        let applied = state.current_offset_us;
        state.advance();
        applied
    }

    /// Jump straight to the target (used before any audio has been emitted)
    pub fn jump_to_target(&self) {
        let mut state = self.inner.lock();
        state.current_offset_us = state.target_offset_us;
        state.step_us = 0;
    }

    /// Set current and target to the same value, stopping any slew
    pub fn force_offset(&self, offset_us: i64) {
        let mut state = self.inner.lock();
        *state = SlewState {
            current_offset_us: offset_us,
            target_offset_us: offset_us,
            step_us: 0,
        };
    }
}
