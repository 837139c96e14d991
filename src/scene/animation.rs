//! Per-frame update rules and the scheduler that drives them.
//!
//! Every rule is a plain function of a [`FrameTick`]; the same tick always
//! produces the same transforms.

use super::{ElementId, Transform, VaultScene};
use std::f64::consts::TAU;

/// Core spin per display frame, in radians.
pub const CORE_SPIN_PER_FRAME: f64 = 0.0045;
/// Refresh rate the per-frame spin was tuned at.
pub const REFERENCE_FRAME_RATE: f64 = 60.0;

/// Input of one scheduler tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameTick {
    /// Seconds since the scene was constructed.
    pub elapsed: f64,
    /// Number of ticks issued since construction, the current one included.
    pub frame: u64,
}

impl FrameTick {
    pub const ZERO: FrameTick = FrameTick {
        elapsed: 0.0,
        frame: 0,
    };

    pub fn new(elapsed: f64, frame: u64) -> Self {
        Self { elapsed, frame }
    }

    /// Elapsed time with a broken clock mapped back to the start state.
    pub fn time(&self) -> f64 {
        if self.elapsed.is_finite() {
            self.elapsed
        } else {
            0.0
        }
    }
}

/// How the core body's y-rotation advances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoreSpin {
    /// Fixed increment per rendered frame; speed follows the refresh rate.
    #[default]
    PerFrame,
    /// Same rate at the reference refresh, independent of the actual one.
    PerSecond,
}

pub type UpdateFn = fn(FrameTick, &mut Transform);

/// Angle reduced to less than one turn, keeping its sign, then narrowed.
fn angle(radians: f64) -> f32 {
    (radians % TAU) as f32
}

pub fn core_body_per_frame(tick: FrameTick, transform: &mut Transform) {
    transform.rotation[1] = angle(tick.frame as f64 * CORE_SPIN_PER_FRAME);
    transform.rotation[0] = core_wobble(tick.time());
}

pub fn core_body_per_second(tick: FrameTick, transform: &mut Transform) {
    let t = tick.time();
    transform.rotation[1] = angle(t * CORE_SPIN_PER_FRAME * REFERENCE_FRAME_RATE);
    transform.rotation[0] = core_wobble(t);
}

pub fn inner_ring(tick: FrameTick, transform: &mut Transform) {
    transform.rotation[2] = angle(tick.time() * 0.25);
}

pub fn outer_ring(tick: FrameTick, transform: &mut Transform) {
    transform.rotation[2] = angle(-tick.time() * 0.18);
}

pub fn particle_field(tick: FrameTick, transform: &mut Transform) {
    transform.rotation[1] = angle(tick.time() * 0.08);
}

/// Breathing scale, bounded in [1.30, 1.40].
pub fn halo(tick: FrameTick, transform: &mut Transform) {
    let scale = (1.35 + ((tick.time() * 1.4) % TAU).sin() * 0.05) as f32;
    transform.scale = [scale, scale, scale];
}

fn core_wobble(t: f64) -> f32 {
    (((t / 3.0) % TAU).sin() * 0.08) as f32
}

impl CoreSpin {
    pub fn rule(self) -> UpdateFn {
        match self {
            CoreSpin::PerFrame => core_body_per_frame,
            CoreSpin::PerSecond => core_body_per_second,
        }
    }
}

/// Registry of update rules, run in registration order once per tick.
#[derive(Default)]
pub struct FrameScheduler {
    rules: Vec<(ElementId, UpdateFn)>,
}

impl FrameScheduler {
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    /// The vault's fixed rule set.
    pub fn for_vault(core_spin: CoreSpin) -> Self {
        let mut scheduler = Self::new();
        scheduler.register(ElementId::CoreBody, core_spin.rule());
        scheduler.register(ElementId::InnerRing, inner_ring);
        scheduler.register(ElementId::OuterRing, outer_ring);
        scheduler.register(ElementId::ParticleField, particle_field);
        scheduler.register(ElementId::Halo, halo);
        scheduler
    }

    pub fn register(&mut self, element: ElementId, rule: UpdateFn) {
        self.rules.push((element, rule));
    }

    pub fn run(&self, tick: FrameTick, scene: &mut VaultScene) {
        for (element, rule) in &self.rules {
            rule(tick, scene.transform_mut(*element));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn apply(rule: UpdateFn, tick: FrameTick) -> Transform {
        let mut transform = Transform::IDENTITY;
        rule(tick, &mut transform);
        transform
    }

    #[test]
    fn initial_state_at_zero() {
        let tick = FrameTick::ZERO;
        assert_eq!(apply(inner_ring, tick).rotation[2], 0.0);
        assert_eq!(apply(outer_ring, tick).rotation[2], 0.0);
        assert_eq!(apply(particle_field, tick).rotation[1], 0.0);
        assert_eq!(apply(halo, tick).scale, [1.35, 1.35, 1.35]);
        let core = apply(core_body_per_frame, tick);
        assert_eq!(core.rotation, [0.0, 0.0, 0.0]);
    }

    #[test]
    fn state_at_ten_seconds() {
        let tick = FrameTick::new(10.0, 600);
        assert!((apply(inner_ring, tick).rotation[2] - 2.5).abs() < 1e-6);
        assert!((apply(outer_ring, tick).rotation[2] + 1.8).abs() < 1e-6);
        assert!((apply(particle_field, tick).rotation[1] - 0.8).abs() < 1e-6);
        let expected = (1.35 + 14.0_f64.sin() * 0.05) as f32;
        assert!((apply(halo, tick).scale[0] - expected).abs() < 1e-6);
    }

    #[test]
    fn halo_scale_is_bounded() {
        for step in 0..2_000 {
            let scale = apply(halo, FrameTick::new(step as f64 * 0.037, step)).scale;
            assert!(scale[0] >= 1.3 - 1e-6 && scale[0] <= 1.4 + 1e-6);
            assert_eq!(scale[0], scale[1]);
            assert_eq!(scale[1], scale[2]);
        }
    }

    #[test]
    fn per_frame_spin_depends_on_frame_count_only() {
        let slow = apply(core_body_per_frame, FrameTick::new(2.0, 60));
        let fast = apply(core_body_per_frame, FrameTick::new(2.0, 240));
        assert!((slow.rotation[1] - 0.27).abs() < 1e-5);
        assert!((fast.rotation[1] - 1.08).abs() < 1e-5);
        assert_eq!(slow.rotation[0], fast.rotation[0]);
    }

    #[test]
    fn per_second_spin_ignores_frame_count() {
        let slow = apply(core_body_per_second, FrameTick::new(2.0, 60));
        let fast = apply(core_body_per_second, FrameTick::new(2.0, 240));
        assert_eq!(slow, fast);
        assert!((slow.rotation[1] - 0.54).abs() < 1e-5);
    }

    #[test]
    fn rules_match_at_reference_rate() {
        let tick = FrameTick::new(5.0, 300);
        let per_frame = apply(core_body_per_frame, tick);
        let per_second = apply(core_body_per_second, tick);
        assert!((per_frame.rotation[1] - per_second.rotation[1]).abs() < 1e-4);
    }

    #[test]
    fn non_finite_time_falls_back_to_start() {
        for elapsed in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let tick = FrameTick::new(elapsed, 0);
            assert_eq!(apply(inner_ring, tick).rotation[2], 0.0);
            assert_eq!(apply(halo, tick).scale[0], 1.35);
        }
    }

    #[test]
    fn vault_scheduler_registers_every_element() {
        let scheduler = FrameScheduler::for_vault(CoreSpin::PerFrame);
        assert_eq!(scheduler.rules.len(), ElementId::ALL.len());
    }

    #[test]
    fn rules_keep_advancing_after_a_month() {
        let month = 30.0 * 24.0 * 3600.0;
        let frame = 155_520_000;
        let before = FrameTick::new(month, frame);
        let after = FrameTick::new(month + 1.0 / 60.0, frame + 1);
        for rule in [
            core_body_per_second as UpdateFn,
            inner_ring,
            outer_ring,
            particle_field,
            halo,
        ] {
            assert_ne!(apply(rule, before), apply(rule, after));
        }
        let step = apply(inner_ring, after).rotation[2] - apply(inner_ring, before).rotation[2];
        assert!((step - 0.25 / 60.0).abs() < 1e-4);
    }

    #[test]
    fn per_frame_spin_advances_past_twenty_million_frames() {
        let before = apply(core_body_per_frame, FrameTick::new(0.0, 20_000_000));
        let after = apply(core_body_per_frame, FrameTick::new(0.0, 20_000_001));
        let step = after.rotation[1] - before.rotation[1];
        assert!((step - 0.0045).abs() < 1e-4);
        assert!(before.rotation[1].abs() < std::f32::consts::TAU);
    }
}
