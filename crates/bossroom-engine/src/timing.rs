//! Fixed-step clock.
//!
//! Turns variable frame lengths into a whole number of fixed simulation
//! steps, with an optional wall-clock pacer for real-time runs.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Most steps a single frame may run before the backlog is dropped.
const MAX_STEPS_PER_FRAME: u32 = 10;

/// Frame samples kept for averaging.
const MAX_SAMPLES: usize = 120;

/// Accumulator that drives the encounter at a fixed step.
#[derive(Debug)]
pub struct StepClock {
    /// Simulation step in seconds
    fixed_dt: f32,
    /// Longest frame accepted before clamping
    max_dt: f32,
    /// Unsimulated time carried to the next frame
    accumulator: f32,
    /// Steps run since creation or reset
    steps: u64,
    /// Frames whose backlog was dropped
    dropped_frames: u64,
    /// Wall-clock pacing, when running in real time
    pacer: Option<FramePacer>,
    /// Recent frame lengths for averaging
    frame_times: VecDeque<f32>,
}

impl Default for StepClock {
    fn default() -> Self {
        Self::new(1.0 / 60.0)
    }
}

impl StepClock {
    /// Create a clock stepping at `fixed_dt` seconds.
    #[must_use]
    pub fn new(fixed_dt: f32) -> Self {
        Self {
            fixed_dt: fixed_dt.max(0.001), // Minimum 1ms
            max_dt: 0.25,                  // Max 250ms frame (prevents spiral of death)
            accumulator: 0.0,
            steps: 0,
            dropped_frames: 0,
            pacer: None,
            frame_times: VecDeque::with_capacity(MAX_SAMPLES),
        }
    }

    /// Pace frames against the wall clock at `target_fps`.
    #[must_use]
    pub fn with_realtime(mut self, target_fps: u32) -> Self {
        self.pacer = Some(FramePacer::new(target_fps));
        self
    }

    /// The fixed step.
    #[must_use]
    pub fn fixed_dt(&self) -> f32 {
        self.fixed_dt
    }

    /// Whether frames are paced against the wall clock.
    #[must_use]
    pub fn is_realtime(&self) -> bool {
        self.pacer.is_some()
    }

    /// Steps run so far.
    #[must_use]
    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// Frames that fell too far behind and dropped their backlog.
    #[must_use]
    pub fn dropped_frames(&self) -> u64 {
        self.dropped_frames
    }

    /// Length of the next frame.
    ///
    /// Measured from the wall clock in real-time mode, `nominal` otherwise.
    /// Either way it is clamped to `max_dt` and recorded for averaging.
    pub fn frame_dt(&mut self, nominal: f32) -> f32 {
        let dt = match self.pacer.as_mut() {
            Some(pacer) => pacer.measure(),
            None => nominal,
        };
        let dt = dt.clamp(0.0, self.max_dt);

        self.frame_times.push_back(dt);
        if self.frame_times.len() > MAX_SAMPLES {
            self.frame_times.pop_front();
        }

        dt
    }

    /// Accumulate frame time.
    /// Returns the number of fixed steps to run this frame.
    pub fn accumulate(&mut self, dt: f32) -> u32 {
        self.accumulator += dt.max(0.0);
        let mut count = 0;

        while self.accumulator >= self.fixed_dt && count < MAX_STEPS_PER_FRAME {
            self.accumulator -= self.fixed_dt;
            count += 1;
        }

        // Still behind: drop the backlog instead of catching up forever
        if self.accumulator > self.fixed_dt * 2.0 {
            self.accumulator = 0.0;
            self.dropped_frames += 1;
        }

        self.steps += u64::from(count);
        count
    }

    /// Sleep out the rest of the frame budget in real-time mode.
    pub fn sleep_remainder(&self) {
        if let Some(pacer) = &self.pacer {
            pacer.sleep_remainder();
        }
    }

    /// Average frame length in milliseconds.
    #[must_use]
    pub fn average_frame_time_ms(&self) -> f32 {
        if self.frame_times.is_empty() {
            return 0.0;
        }

        (self.frame_times.iter().sum::<f32>() / self.frame_times.len() as f32) * 1000.0
    }

    /// Reset timing (call after pause or loading).
    pub fn reset(&mut self) {
        self.accumulator = 0.0;
        self.frame_times.clear();
        if let Some(pacer) = self.pacer.as_mut() {
            pacer.last_frame = Instant::now();
        }
    }
}

/// Wall-clock frame limiter.
#[derive(Debug)]
struct FramePacer {
    frame_budget: Duration,
    last_frame: Instant,
}

impl FramePacer {
    fn new(target_fps: u32) -> Self {
        let target_fps = target_fps.max(1);
        Self {
            frame_budget: Duration::from_secs_f64(1.0 / f64::from(target_fps)),
            last_frame: Instant::now(),
        }
    }

    fn measure(&mut self) -> f32 {
        let now = Instant::now();
        let dt = (now - self.last_frame).as_secs_f32();
        self.last_frame = now;
        dt
    }

    fn sleep_remainder(&self) {
        let elapsed = self.last_frame.elapsed();
        if elapsed < self.frame_budget {
            let sleep_time = self.frame_budget - elapsed;
            if sleep_time > Duration::from_millis(1) {
                std::thread::sleep(sleep_time - Duration::from_millis(1));
            }
            while self.last_frame.elapsed() < self.frame_budget {
                std::hint::spin_loop();
            }
        }
    }
}
