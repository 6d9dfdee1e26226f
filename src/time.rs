//! Frame timing.
//!
//! The engine is frame-driven: one idle tick of the embedding event loop
//! triggers exactly one draw. [`FrameClock`] tracks the time elapsed between
//! frames and aggregates an FPS figure once per second. Camera navigation is
//! scaled by the delta time so movement speed is frame-rate independent.

use instant::{Duration, Instant};

/// Per-frame clock: delta time and a once-per-second FPS aggregate.
pub struct FrameClock {
    delta_time: f64,
    fps: u32,
    frames: u32,
    delta_timer: Instant,
    fps_timer: Instant,
    start: Instant,
}

impl FrameClock {
    /// The delta time is seeded with a nominal 60 Hz frame until the first
    /// full second has been measured.
    pub fn start() -> Self {
        let now = Instant::now();
        Self {
            delta_time: 1.0 / 60.0,
            fps: 0,
            frames: 0,
            delta_timer: now,
            fps_timer: now,
            start: now,
        }
    }

    /// Seconds elapsed between the two most recent frames.
    pub fn delta_time(&self) -> f64 {
        self.delta_time
    }

    /// Frames counted over the last full second.
    pub fn fps(&self) -> u32 {
        self.fps
    }

    pub fn time_elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Call once per frame, before drawing.
    pub fn tick(&mut self) {
        self.delta_time = self.delta_timer.elapsed().as_secs_f64();
        self.delta_timer = Instant::now();
        self.frames += 1;

        if self.fps_timer.elapsed() >= Duration::from_secs(1) {
            self.fps = self.frames;
            self.frames = 0;
            self.fps_timer = Instant::now();
        }
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::start()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delta_time_is_seeded_with_sixty_hz() {
        let clock = FrameClock::start();
        assert_eq!(clock.delta_time(), 1.0 / 60.0);
        assert_eq!(clock.fps(), 0);
    }

    #[test]
    fn tick_updates_delta_time() {
        let mut clock = FrameClock::start();
        std::thread::sleep(Duration::from_millis(2));
        clock.tick();
        assert!(clock.delta_time() > 0.0);
    }
}
