use super::color::linear_from_hsl;

pub const PARTICLE_COUNT: usize = 450;
pub const RADIUS_BANDS: usize = 89;
pub const HEIGHT_BANDS: usize = 47;

const RADIUS_MIN: f32 = 2.4;
const RADIUS_SPAN: f32 = 1.8;
const HEIGHT_STEP: f32 = 0.045;
const HUE_BANDS: usize = 23;
const LIGHTNESS_BANDS: usize = 17;

/// Golden angle, π(3 − √5).
pub fn golden_angle() -> f32 {
    std::f32::consts::PI * (3.0 - 5.0_f32.sqrt())
}

/// Point placement parameters of the particle field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParticleLayout {
    pub count: usize,
    pub radius_bands: usize,
    pub height_bands: usize,
}

impl Default for ParticleLayout {
    fn default() -> Self {
        Self {
            count: PARTICLE_COUNT,
            radius_bands: RADIUS_BANDS,
            height_bands: HEIGHT_BANDS,
        }
    }
}

impl ParticleLayout {
    pub fn angle(&self, index: usize) -> f32 {
        index as f32 * golden_angle()
    }

    pub fn radius(&self, index: usize) -> f32 {
        let band = (index % self.radius_bands) as f32 / self.radius_bands as f32;
        RADIUS_MIN + band * RADIUS_SPAN
    }

    /// Heights are centered on the middle band, so 47 bands give ±23 steps.
    pub fn height(&self, index: usize) -> f32 {
        let center = (self.height_bands / 2) as f32;
        ((index % self.height_bands) as f32 - center) * HEIGHT_STEP
    }

    pub fn position(&self, index: usize) -> [f32; 3] {
        let angle = self.angle(index);
        let radius = self.radius(index);
        [angle.cos() * radius, self.height(index), angle.sin() * radius]
    }

    pub fn color(&self, index: usize) -> [f32; 3] {
        let hue = 0.55 + ((index % HUE_BANDS) as f32 / HUE_BANDS as f32) * 0.08;
        let lightness =
            0.6 - ((index % LIGHTNESS_BANDS) as f32 / LIGHTNESS_BANDS as f32) * 0.08;
        linear_from_hsl(hue, 0.7, lightness)
    }
}

/// Immutable particle attributes, one position and one color per particle.
#[derive(Debug, Clone, PartialEq)]
pub struct ParticleBuffers {
    positions: Vec<[f32; 3]>,
    colors: Vec<[f32; 3]>,
}

impl ParticleBuffers {
    pub fn generate(layout: ParticleLayout) -> Self {
        let positions = (0..layout.count).map(|i| layout.position(i)).collect();
        let colors = (0..layout.count).map(|i| layout.color(i)).collect();
        Self { positions, colors }
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn positions(&self) -> &[[f32; 3]] {
        &self.positions
    }

    pub fn colors(&self) -> &[[f32; 3]] {
        &self.colors
    }
}

#[cfg(test)]
mod tests {
    use super::{golden_angle, ParticleBuffers, ParticleLayout, PARTICLE_COUNT};
    use std::f32::consts::TAU;

    #[test]
    fn zero_count_layout_is_empty() {
        let layout = ParticleLayout {
            count: 0,
            ..ParticleLayout::default()
        };
        let buffers = ParticleBuffers::generate(layout);
        assert!(buffers.is_empty());
        assert!(!ParticleBuffers::generate(ParticleLayout::default()).is_empty());
    }

    #[test]
    fn generation_is_deterministic() {
        let first = ParticleBuffers::generate(ParticleLayout::default());
        let second = ParticleBuffers::generate(ParticleLayout::default());
        assert_eq!(first.len(), PARTICLE_COUNT);
        let bytes = |buffers: &ParticleBuffers| -> Vec<u32> {
            buffers
                .positions()
                .iter()
                .chain(buffers.colors().iter())
                .flat_map(|v| v.iter().map(|c| c.to_bits()))
                .collect()
        };
        assert_eq!(bytes(&first), bytes(&second));
    }

    #[test]
    fn radius_and_height_stay_in_bands() {
        let layout = ParticleLayout::default();
        for i in 0..PARTICLE_COUNT {
            let r = layout.radius(i);
            let y = layout.height(i);
            assert!((2.4..4.2).contains(&r), "radius {} out of band at {}", r, i);
            assert!((-1.04..=1.04).contains(&y), "height {} out of band at {}", y, i);

            let [x, py, z] = layout.position(i);
            assert_eq!(py, y);
            assert!(((x * x + z * z).sqrt() - r).abs() < 1e-4);
        }
        assert!((layout.height(0) + 1.035).abs() < 1e-6);
        assert!((layout.height(46) - 1.035).abs() < 1e-6);
    }

    #[test]
    fn angular_step_is_golden_angle() {
        let layout = ParticleLayout::default();
        let phi = golden_angle();
        assert!((phi - 2.399_963).abs() < 1e-5);
        for i in 0..PARTICLE_COUNT - 1 {
            let step = (layout.angle(i + 1) - layout.angle(i)).rem_euclid(TAU);
            assert!((step - phi).abs() < 1e-3, "step {} at {}", step, i);
        }
    }

    #[test]
    fn colors_sit_in_cyan_blue_band() {
        let buffers = ParticleBuffers::generate(ParticleLayout::default());
        for color in buffers.colors() {
            let [r, g, b] = *color;
            assert!(color.iter().all(|c| (0.0..=1.0).contains(c)));
            assert!(b > r && g > r);
        }
    }
}
