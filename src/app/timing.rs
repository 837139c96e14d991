use crate::scene::animation::FrameTick;
use std::time::{Duration, Instant};
use winit::window::Window;

/// Elapsed time and tick count since the scene was mounted.
pub struct FrameClock {
    start: Instant,
    frame: u64,
}

impl FrameClock {
    pub fn start(now: Instant) -> Self {
        Self { start: now, frame: 0 }
    }

    /// Advance by one tick. The first tick of a mount is frame 1.
    pub fn tick(&mut self, now: Instant) -> FrameTick {
        self.frame = self.frame.saturating_add(1);
        let elapsed = now.saturating_duration_since(self.start).as_secs_f64();
        FrameTick::new(elapsed, self.frame)
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }
}

pub struct FrameTiming {
    last_frame_time: Option<Instant>,
    last_fps_time: Instant,
    frame_count: u32,
    pub frame_dt: f32,
    render_ms: f32,
    base_title: String,
}

impl FrameTiming {
    pub fn new(base_title: String) -> Self {
        Self {
            last_frame_time: None,
            last_fps_time: Instant::now(),
            frame_count: 0,
            frame_dt: 1.0 / 60.0,
            render_ms: 0.0,
            base_title,
        }
    }

    pub fn set_render_ms(&mut self, render_ms: f32) {
        self.render_ms = render_ms;
    }

    /// Record a frame at `now`. Returns the updated title twice a second.
    pub fn record(&mut self, now: Instant) -> Option<String> {
        let dt = match self.last_frame_time {
            Some(last) => now.saturating_duration_since(last),
            None => Duration::from_millis(16),
        };
        self.last_frame_time = Some(now);
        self.frame_dt = dt.as_secs_f32();

        self.frame_count = self.frame_count.saturating_add(1);
        let elapsed = now.saturating_duration_since(self.last_fps_time);
        if elapsed.as_secs_f32() < 0.5 {
            return None;
        }
        let fps = self.frame_count as f32 / elapsed.as_secs_f32();
        self.frame_count = 0;
        self.last_fps_time = now;
        Some(format!(
            "{} - {:.1} fps (cadence {:.2} ms, render {:.2} ms)",
            self.base_title,
            fps,
            self.frame_dt * 1000.0,
            self.render_ms
        ))
    }

    pub fn update(&mut self, window: Option<&Window>, now: Instant) {
        if let Some(title) = self.record(now) {
            if let Some(window) = window {
                window.set_title(&title);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{FrameClock, FrameTiming};
    use std::time::{Duration, Instant};

    #[test]
    fn clock_counts_frames_and_elapsed_time() {
        let start = Instant::now();
        let mut clock = FrameClock::start(start);
        let first = clock.tick(start + Duration::from_millis(16));
        assert_eq!(first.frame, 1);
        let second = clock.tick(start + Duration::from_secs(2));
        assert_eq!(second.frame, 2);
        assert!((second.elapsed - 2.0).abs() < 1e-4);
        assert_eq!(clock.frame(), 2);
    }

    #[test]
    fn clock_never_runs_backwards() {
        let start = Instant::now() + Duration::from_secs(1);
        let mut clock = FrameClock::start(start);
        let tick = clock.tick(start - Duration::from_millis(500));
        assert_eq!(tick.elapsed, 0.0);
    }

    #[test]
    fn clock_resolves_frames_after_a_month() {
        let start = Instant::now();
        let mut clock = FrameClock::start(start);
        let month = Duration::from_secs(30 * 24 * 3600);
        let before = clock.tick(start + month);
        let after = clock.tick(start + month + Duration::from_micros(16_667));
        assert!((after.elapsed - before.elapsed - 0.016667).abs() < 1e-6);
    }

    #[test]
    fn title_refreshes_twice_a_second() {
        let mut timing = FrameTiming::new("Vault".to_string());
        let now = Instant::now();
        timing.set_render_ms(1.25);
        assert!(timing.record(now).is_none());
        let title = timing.record(now + Duration::from_millis(600));
        let title = title.expect("title after half a second");
        assert!(title.starts_with("Vault - "));
        assert!(title.contains("render 1.25 ms"));
        assert!(timing.record(now + Duration::from_millis(616)).is_none());
    }
}
