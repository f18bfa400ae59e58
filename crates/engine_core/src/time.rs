//! Fixed-step time management for the simulation loop.
//!
//! The canopy subsystem is stepped once per physics sub-step, so frame time
//! is fed in explicitly and converted into a whole number of fixed steps.
//! Nothing here reads the wall clock, which keeps replays deterministic.

/// Accumulates frame time and hands out fixed physics sub-steps.
#[derive(Debug, Clone)]
pub struct SimClock {
    /// Fixed timestep for physics (default 60 Hz).
    fixed_timestep: f32,
    /// Accumulated time not yet consumed by a fixed step.
    accumulator: f32,
    /// Total simulated time.
    elapsed: f64,
    /// Fixed steps taken since start.
    tick_count: u64,
    /// Upper bound on sub-steps per frame.
    max_substeps: u32,
}

impl Default for SimClock {
    fn default() -> Self {
        Self::new(60.0)
    }
}

impl SimClock {
    /// Create a clock stepping at `hz` fixed updates per second.
    pub fn new(hz: f32) -> Self {
        Self {
            fixed_timestep: 1.0 / hz.max(1.0),
            accumulator: 0.0,
            elapsed: 0.0,
            tick_count: 0,
            max_substeps: 8,
        }
    }

    /// Feed a frame delta and return how many fixed steps should run.
    ///
    /// Frames that would need more than `max_substeps` steps are truncated
    /// and the excess time is dropped.
    pub fn advance(&mut self, frame_dt: f32) -> u32 {
        self.accumulator += frame_dt.max(0.0);
        let mut steps = 0;
        while self.accumulator >= self.fixed_timestep {
            self.accumulator -= self.fixed_timestep;
            steps += 1;
            if steps == self.max_substeps {
                if self.accumulator >= self.fixed_timestep {
                    log::warn!(
                        "Dropping {:.3}s of simulation time (frame too long)",
                        self.accumulator
                    );
                }
                self.accumulator = 0.0;
                break;
            }
        }
        self.tick_count += steps as u64;
        self.elapsed += (steps as f64) * self.fixed_timestep as f64;
        steps
    }

    /// Get the fixed timestep in seconds.
    pub fn fixed_timestep(&self) -> f32 {
        self.fixed_timestep
    }

    /// Get total simulated time in seconds.
    pub fn elapsed_seconds(&self) -> f64 {
        self.elapsed
    }

    /// Get the number of fixed steps taken.
    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    /// Set the maximum sub-steps handed out per frame.
    pub fn set_max_substeps(&mut self, max: u32) {
        self.max_substeps = max.max(1);
    }
}
