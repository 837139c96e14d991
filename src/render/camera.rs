use glam::{Mat4, Vec3};
use std::f32::consts::{PI, TAU};

const POLAR_EPSILON: f32 = 1e-6;
const NEAR_PLANE: f32 = 0.1;
const FAR_PLANE: f32 = 1000.0;

/// Recognized orbit control options.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrbitOptions {
    pub enable_rotate: bool,
    pub enable_zoom: bool,
    pub enable_pan: bool,
    pub auto_rotate: bool,
    /// 2.0 is one revolution every 30 seconds.
    pub auto_rotate_speed: f32,
    pub rotate_speed: f32,
    pub enable_damping: bool,
    pub damping_factor: f32,
    pub min_polar_angle: f32,
    pub max_polar_angle: f32,
    pub min_distance: f32,
    pub max_distance: f32,
    /// Distance scale applied per wheel notch.
    pub zoom_step: f32,
}

impl Default for OrbitOptions {
    fn default() -> Self {
        Self {
            enable_rotate: true,
            enable_zoom: true,
            enable_pan: true,
            auto_rotate: false,
            auto_rotate_speed: 2.0,
            rotate_speed: 1.0,
            enable_damping: true,
            damping_factor: 0.05,
            min_polar_angle: 0.0,
            max_polar_angle: PI,
            min_distance: 0.0,
            max_distance: f32::INFINITY,
            zoom_step: 0.95,
        }
    }
}

impl OrbitOptions {
    /// Drag-to-orbit only, slowly turning on its own.
    pub fn vault() -> Self {
        Self {
            enable_pan: false,
            enable_zoom: false,
            auto_rotate: true,
            ..Self::default()
        }
    }
}

/// Camera orbiting a look-at target on a sphere.
///
/// Azimuth is measured around +Y from +Z, polar from +Y, so a camera at
/// `(0, 0, d)` sits at azimuth 0 and polar π/2.
#[derive(Debug, Clone, Copy)]
pub struct OrbitController {
    options: OrbitOptions,
    fov_y_deg: f32,
    target: Vec3,
    radius: f32,
    azimuth: f32,
    polar: f32,
    azimuth_delta: f32,
    polar_delta: f32,
    pan_offset: Vec3,
    scale: f32,
    dragging: bool,
}

impl OrbitController {
    pub fn new(position: [f32; 3], fov_y_deg: f32, options: OrbitOptions) -> Self {
        let offset = Vec3::from(position);
        let radius = offset.length().max(POLAR_EPSILON);
        let azimuth = offset.x.atan2(offset.z);
        let polar = (offset.y / radius).clamp(-1.0, 1.0).acos();
        Self {
            options,
            fov_y_deg,
            target: Vec3::ZERO,
            radius,
            azimuth,
            polar,
            azimuth_delta: 0.0,
            polar_delta: 0.0,
            pan_offset: Vec3::ZERO,
            scale: 1.0,
            dragging: false,
        }
    }

    #[cfg(test)]
    pub fn fov_y_deg(&self) -> f32 {
        self.fov_y_deg
    }

    #[cfg(test)]
    pub fn distance(&self) -> f32 {
        self.radius
    }

    #[cfg(test)]
    pub fn target(&self) -> Vec3 {
        self.target
    }

    #[cfg(test)]
    pub fn azimuth(&self) -> f32 {
        self.azimuth
    }

    #[cfg(test)]
    pub fn polar(&self) -> f32 {
        self.polar
    }

    pub fn eye(&self) -> Vec3 {
        let sin_polar = self.polar.sin();
        self.target
            + self.radius
                * Vec3::new(
                    sin_polar * self.azimuth.sin(),
                    self.polar.cos(),
                    sin_polar * self.azimuth.cos(),
                )
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.eye(), self.target, Vec3::Y)
    }

    pub fn projection_matrix(&self, aspect: f32) -> Mat4 {
        Mat4::perspective_rh(
            self.fov_y_deg.to_radians(),
            aspect.max(1e-3),
            NEAR_PLANE,
            FAR_PLANE,
        )
    }

    pub fn view_projection(&self, aspect: f32) -> Mat4 {
        self.projection_matrix(aspect) * self.view_matrix()
    }

    pub fn begin_drag(&mut self) {
        self.dragging = true;
    }

    pub fn end_drag(&mut self) {
        self.dragging = false;
    }

    /// Pointer moved by `(dx, dy)` logical pixels while dragging. A drag across
    /// the full viewport height turns the camera a full revolution.
    pub fn drag(&mut self, dx: f32, dy: f32, viewport_height: f32) {
        if !self.options.enable_rotate || !self.dragging {
            return;
        }
        let height = viewport_height.max(1.0);
        self.rotate_left(TAU * dx / height * self.options.rotate_speed);
        self.rotate_up(TAU * dy / height * self.options.rotate_speed);
    }

    /// Wheel input in notches; positive moves closer.
    pub fn scroll(&mut self, notches: f32) {
        if !self.options.enable_zoom || notches == 0.0 || !notches.is_finite() {
            return;
        }
        self.scale *= self.options.zoom_step.powf(notches);
    }

    /// Pan by a pointer movement of `(dx, dy)` logical pixels.
    pub fn pan(&mut self, dx: f32, dy: f32, viewport_height: f32) {
        if !self.options.enable_pan {
            return;
        }
        let view = self.view_matrix().inverse();
        let right = view.x_axis.truncate();
        let up = view.y_axis.truncate();
        let target_distance = self.radius * (self.fov_y_deg.to_radians() * 0.5).tan();
        let height = viewport_height.max(1.0);
        self.pan_offset += right * (-2.0 * dx * target_distance / height)
            + up * (2.0 * dy * target_distance / height);
    }

    /// Advance auto rotation and damping by `dt` seconds.
    pub fn update(&mut self, dt: f32) {
        let dt = if dt.is_finite() { dt.max(0.0) } else { 0.0 };
        if self.options.auto_rotate && !self.dragging {
            self.rotate_left(TAU / 60.0 * self.options.auto_rotate_speed * dt);
        }

        let blend = if self.options.enable_damping {
            self.options.damping_factor
        } else {
            1.0
        };

        self.azimuth = wrap_angle(self.azimuth + self.azimuth_delta * blend);
        let min_polar = self.options.min_polar_angle.max(POLAR_EPSILON);
        let max_polar = self.options.max_polar_angle.min(PI - POLAR_EPSILON);
        self.polar = (self.polar + self.polar_delta * blend).clamp(min_polar, max_polar);

        if self.scale != 1.0 {
            self.radius = (self.radius * self.scale)
                .clamp(self.options.min_distance, self.options.max_distance)
                .max(POLAR_EPSILON);
        }
        self.target += self.pan_offset * blend;

        if self.options.enable_damping {
            let keep = 1.0 - self.options.damping_factor;
            self.azimuth_delta *= keep;
            self.polar_delta *= keep;
            self.pan_offset *= keep;
        } else {
            self.azimuth_delta = 0.0;
            self.polar_delta = 0.0;
            self.pan_offset = Vec3::ZERO;
        }
        self.scale = 1.0;
    }

    fn rotate_left(&mut self, angle: f32) {
        self.azimuth_delta -= angle;
    }

    fn rotate_up(&mut self, angle: f32) {
        self.polar_delta -= angle;
    }
}

fn wrap_angle(angle: f32) -> f32 {
    if angle.is_finite() {
        (angle + PI).rem_euclid(TAU) - PI
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::{OrbitController, OrbitOptions};
    use glam::Vec3;
    use std::f32::consts::{FRAC_PI_2, PI};

    fn vault_camera() -> OrbitController {
        OrbitController::new([0.0, 0.0, 8.0], 32.0, OrbitOptions::vault())
    }

    #[test]
    fn default_pose_matches_mount_position() {
        let camera = vault_camera();
        assert!((camera.eye() - Vec3::new(0.0, 0.0, 8.0)).length() < 1e-5);
        assert!((camera.polar() - FRAC_PI_2).abs() < 1e-6);
        assert_eq!(camera.azimuth(), 0.0);
        assert_eq!(camera.fov_y_deg(), 32.0);
    }

    #[test]
    fn zoom_and_pan_stay_disabled_under_any_input() {
        let mut camera = vault_camera();
        camera.begin_drag();
        for step in 0..500 {
            let s = step as f32;
            camera.scroll(if step % 2 == 0 { 3.0 } else { -7.5 });
            camera.pan(s * 3.0, -s, 720.0);
            camera.drag((s * 0.7).sin() * 40.0, (s * 0.3).cos() * 25.0, 720.0);
            if step % 50 == 0 {
                camera.end_drag();
            } else if step % 50 == 25 {
                camera.begin_drag();
            }
            camera.update(1.0 / 60.0);
            assert!((camera.distance() - 8.0).abs() < 1e-4);
            assert!((camera.eye().length() - 8.0).abs() < 1e-3);
            assert_eq!(camera.target(), Vec3::ZERO);
            assert_eq!(camera.fov_y_deg(), 32.0);
        }
    }

    #[test]
    fn zoom_and_pan_work_when_enabled() {
        let mut camera = OrbitController::new(
            [0.0, 0.0, 8.0],
            32.0,
            OrbitOptions {
                enable_damping: false,
                ..OrbitOptions::default()
            },
        );
        camera.scroll(1.0);
        camera.pan(100.0, 0.0, 720.0);
        camera.update(0.0);
        assert!((camera.distance() - 7.6).abs() < 1e-4);
        assert!(camera.target().x < 0.0);
    }

    #[test]
    fn auto_rotation_completes_a_turn_in_thirty_seconds() {
        let mut camera = OrbitController::new(
            [0.0, 0.0, 8.0],
            32.0,
            OrbitOptions {
                enable_damping: false,
                ..OrbitOptions::vault()
            },
        );
        for _ in 0..(60 * 15) {
            camera.update(1.0 / 60.0);
        }
        // Half a revolution: the camera now looks from behind.
        assert!((camera.eye() - Vec3::new(0.0, 0.0, -8.0)).length() < 1e-2);
    }

    #[test]
    fn dragging_suspends_auto_rotation() {
        let mut camera = vault_camera();
        camera.begin_drag();
        for _ in 0..120 {
            camera.update(1.0 / 60.0);
        }
        assert_eq!(camera.azimuth(), 0.0);
    }

    #[test]
    fn full_height_drag_is_full_revolution() {
        let mut camera = OrbitController::new(
            [0.0, 0.0, 8.0],
            32.0,
            OrbitOptions {
                enable_damping: false,
                auto_rotate: false,
                ..OrbitOptions::vault()
            },
        );
        camera.begin_drag();
        camera.drag(180.0, 0.0, 720.0);
        camera.update(1.0 / 60.0);
        assert!((camera.azimuth() + FRAC_PI_2).abs() < 1e-5);
    }

    #[test]
    fn damped_drag_settles_on_the_same_angle() {
        let mut camera = OrbitController::new(
            [0.0, 0.0, 8.0],
            32.0,
            OrbitOptions {
                auto_rotate: false,
                ..OrbitOptions::vault()
            },
        );
        camera.begin_drag();
        camera.drag(90.0, 0.0, 720.0);
        camera.end_drag();
        for _ in 0..2_000 {
            camera.update(1.0 / 60.0);
        }
        assert!((camera.azimuth() + PI / 4.0).abs() < 1e-3);
    }

    #[test]
    fn polar_angle_is_clamped() {
        let mut camera = OrbitController::new(
            [0.0, 0.0, 8.0],
            32.0,
            OrbitOptions {
                enable_damping: false,
                auto_rotate: false,
                ..OrbitOptions::vault()
            },
        );
        camera.begin_drag();
        camera.drag(0.0, -10_000.0, 720.0);
        camera.update(0.0);
        assert!(camera.polar() < PI);
        assert!(camera.eye().is_finite());
        camera.drag(0.0, 20_000.0, 720.0);
        camera.update(0.0);
        assert!(camera.polar() > 0.0);
        assert!(camera.view_projection(16.0 / 9.0).is_finite());
    }

    #[test]
    fn drag_without_press_is_ignored() {
        let mut camera = OrbitController::new(
            [0.0, 0.0, 8.0],
            32.0,
            OrbitOptions {
                auto_rotate: false,
                enable_damping: false,
                ..OrbitOptions::vault()
            },
        );
        camera.drag(300.0, 40.0, 720.0);
        camera.update(1.0 / 60.0);
        assert_eq!(camera.azimuth(), 0.0);
    }
}
