use winit::dpi::PhysicalSize;

pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;
pub const SCENE_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8UnormSrgb;

/// Render resolution rule: logical window size times a clamped pixel ratio.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelRatio {
    pub min: f64,
    pub max: f64,
}

impl Default for PixelRatio {
    fn default() -> Self {
        Self { min: 1.5, max: 2.0 }
    }
}

impl PixelRatio {
    pub fn clamp(&self, scale_factor: f64) -> f64 {
        let (min, max) = if self.min <= self.max {
            (self.min, self.max)
        } else {
            (self.max, self.min)
        };
        if scale_factor.is_finite() {
            scale_factor.clamp(min, max)
        } else {
            min
        }
    }

    /// Offscreen target size for a window of `physical` pixels at
    /// `scale_factor` physical pixels per logical pixel.
    pub fn target_size(&self, physical: PhysicalSize<u32>, scale_factor: f64) -> [u32; 2] {
        let scale_factor = if scale_factor.is_finite() && scale_factor > 0.0 {
            scale_factor
        } else {
            1.0
        };
        let ratio = self.clamp(scale_factor);
        let logical_w = physical.width as f64 / scale_factor;
        let logical_h = physical.height as f64 / scale_factor;
        [
            ((logical_w * ratio).round() as u32).max(1),
            ((logical_h * ratio).round() as u32).max(1),
        ]
    }
}

/// Multisampled color, resolve and depth attachments the scene is drawn into.
pub struct SceneTargets {
    pub size: [u32; 2],
    pub sample_count: u32,
    pub msaa_view: Option<wgpu::TextureView>,
    pub resolve: wgpu::Texture,
    pub resolve_view: wgpu::TextureView,
    pub depth_view: wgpu::TextureView,
}

impl SceneTargets {
    pub fn new(device: &wgpu::Device, size: [u32; 2], sample_count: u32) -> Self {
        let extent = wgpu::Extent3d {
            width: size[0].max(1),
            height: size[1].max(1),
            depth_or_array_layers: 1,
        };
        let resolve = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("vault.scene.resolve"),
            size: extent,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: SCENE_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT
                | wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let resolve_view = resolve.create_view(&wgpu::TextureViewDescriptor::default());

        let msaa_view = (sample_count > 1).then(|| {
            device
                .create_texture(&wgpu::TextureDescriptor {
                    label: Some("vault.scene.msaa"),
                    size: extent,
                    mip_level_count: 1,
                    sample_count,
                    dimension: wgpu::TextureDimension::D2,
                    format: SCENE_FORMAT,
                    usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
                    view_formats: &[],
                })
                .create_view(&wgpu::TextureViewDescriptor::default())
        });

        let depth_view = device
            .create_texture(&wgpu::TextureDescriptor {
                label: Some("vault.scene.depth"),
                size: extent,
                mip_level_count: 1,
                sample_count,
                dimension: wgpu::TextureDimension::D2,
                format: DEPTH_FORMAT,
                usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
                view_formats: &[],
            })
            .create_view(&wgpu::TextureViewDescriptor::default());

        Self {
            size: [extent.width, extent.height],
            sample_count,
            msaa_view,
            resolve,
            resolve_view,
            depth_view,
        }
    }

    /// Attachment the scene pass draws into and where it resolves to.
    pub fn color_attachment(&self) -> (&wgpu::TextureView, Option<&wgpu::TextureView>) {
        match &self.msaa_view {
            Some(msaa) => (msaa, Some(&self.resolve_view)),
            None => (&self.resolve_view, None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::PixelRatio;
    use winit::dpi::PhysicalSize;

    #[test]
    fn ratio_is_clamped_to_range() {
        let ratio = PixelRatio::default();
        assert_eq!(ratio.clamp(1.0), 1.5);
        assert_eq!(ratio.clamp(1.75), 1.75);
        assert_eq!(ratio.clamp(3.0), 2.0);
        assert_eq!(ratio.clamp(f64::NAN), 1.5);
    }

    #[test]
    fn low_density_window_is_supersampled() {
        let ratio = PixelRatio::default();
        assert_eq!(ratio.target_size(PhysicalSize::new(1280, 720), 1.0), [1920, 1080]);
    }

    #[test]
    fn high_density_window_is_capped() {
        let ratio = PixelRatio::default();
        // 3x display, 640x360 logical.
        assert_eq!(ratio.target_size(PhysicalSize::new(1920, 1080), 3.0), [1280, 720]);
        assert_eq!(ratio.target_size(PhysicalSize::new(2560, 1440), 2.0), [2560, 1440]);
    }

    #[test]
    fn degenerate_sizes_stay_drawable() {
        let ratio = PixelRatio::default();
        assert_eq!(ratio.target_size(PhysicalSize::new(0, 0), 1.0), [1, 1]);
        assert_eq!(ratio.target_size(PhysicalSize::new(100, 100), 0.0), [150, 150]);
    }

    #[test]
    fn inverted_range_is_tolerated() {
        let ratio = PixelRatio { min: 2.0, max: 1.5 };
        assert_eq!(ratio.clamp(1.0), 1.5);
    }
}
