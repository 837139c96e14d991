mod input;
mod timing;

use crate::config::VaultConfig;
use crate::render::RenderContext;
use crate::scene::animation::{FrameScheduler, FrameTick};
use crate::scene::VaultScene;
use input::{InputAction, PointerMotion, PointerState};
use timing::{FrameClock, FrameTiming};

use std::sync::Arc;
use std::time::{Duration, Instant};
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowAttributes, WindowId};

/// One mounted vault: scene, its update rules, its clock and its GPU state.
/// Dropping a mount releases everything it acquired.
struct Mount {
    scene: VaultScene,
    scheduler: FrameScheduler,
    clock: FrameClock,
    render: Option<RenderContext>,
}

impl Mount {
    fn new(window: &Arc<Window>, config: &VaultConfig) -> Self {
        let mut scene = VaultScene::new();
        let scheduler = FrameScheduler::for_vault(config.animation.core_spin);
        scheduler.run(FrameTick::ZERO, &mut scene);

        let render =
            match RenderContext::new(window.clone(), &scene, config.viewport.render_settings()) {
                Ok(render) => Some(render),
                Err(err) => {
                    log::error!("Renderer unavailable, viewport stays empty: {err}");
                    None
                }
            };

        Self {
            scene,
            scheduler,
            clock: FrameClock::start(Instant::now()),
            render,
        }
    }

    fn advance(&mut self, now: Instant, dt: f32) {
        let tick = self.clock.tick(now);
        self.scheduler.run(tick, &mut self.scene);
        self.scene.camera.update(dt);

        let Some(render) = &mut self.render else {
            return;
        };
        if let Err(err) = render.render(&self.scene) {
            if err.is_fatal() {
                log::error!("Dropping renderer: {err}");
                self.render = None;
            } else {
                log::warn!("Frame skipped: {err}");
            }
        }
    }
}

pub struct App {
    config: VaultConfig,
    window: Option<Arc<Window>>,
    mount: Option<Mount>,
    pointer: PointerState,
    timing: FrameTiming,
    target_frame_duration: Duration,
    next_frame_time: Instant,
}

impl App {
    fn new(config: VaultConfig) -> Self {
        let title = config.window.title.clone();
        Self {
            config,
            window: None,
            mount: None,
            pointer: PointerState::default(),
            timing: FrameTiming::new(title),
            target_frame_duration: Duration::from_millis(16),
            next_frame_time: Instant::now(),
        }
    }

    fn mount(&mut self) {
        let Some(window) = self.window.clone() else {
            return;
        };
        // Release the previous surface before creating a new one on the same window.
        self.mount = None;
        self.mount = Some(Mount::new(&window, &self.config));
        self.pointer.release_all();
    }

    fn handle_resize(&mut self, new_size: PhysicalSize<u32>, scale_factor: f64) {
        if let Some(render) = self.mount.as_mut().and_then(|mount| mount.render.as_mut()) {
            render.resize(new_size, scale_factor);
        }
    }

    fn update_target_frame_duration(&mut self, window: &Window) {
        let mut target = Duration::from_millis(16);
        if let Some(monitor) = window.current_monitor() {
            if let Some(millihz) = monitor.refresh_rate_millihertz() {
                let hz = millihz as f32 / 1000.0;
                if hz > 1.0 {
                    target = Duration::from_secs_f32(1.0 / hz);
                }
            }
        }
        self.target_frame_duration = target;
        self.next_frame_time = Instant::now() + self.target_frame_duration;
    }

    fn handle_action(&mut self, action: InputAction, event_loop: &ActiveEventLoop) {
        match action {
            InputAction::Quit => event_loop.exit(),
            InputAction::Remount => {
                log::info!("Remounting vault");
                self.mount();
            }
            InputAction::Screenshot => self.save_screenshot(),
            InputAction::None => {}
        }
    }

    fn save_screenshot(&self) {
        let Some(mount) = &self.mount else {
            return;
        };
        let Some(render) = &mount.render else {
            log::warn!("Screenshot skipped: no renderer");
            return;
        };
        let path = self.config.capture.screenshot_path(mount.clock.frame());
        match render.capture_png(&path) {
            Ok(()) => log::info!("Saved screenshot {}", path.display()),
            Err(err) => log::error!("Screenshot failed: {err}"),
        }
    }

    fn handle_pointer_motion(&mut self, motion: PointerMotion) {
        let height = self
            .window
            .as_ref()
            .map(|window| window.inner_size().height as f32)
            .unwrap_or(1.0);
        let Some(mount) = &mut self.mount else {
            return;
        };
        match motion {
            PointerMotion::Orbit { dx, dy } => mount.scene.camera.drag(dx, dy, height),
            PointerMotion::Pan { dx, dy } => mount.scene.camera.pan(dx, dy, height),
            PointerMotion::None => {}
        }
    }

    fn release_pointer(&mut self) {
        self.pointer.release_all();
        if let Some(mount) = &mut self.mount {
            mount.scene.camera.end_drag();
        }
    }

    fn redraw(&mut self) {
        let now = Instant::now();
        self.timing.update(self.window.as_deref(), now);
        let dt = self.timing.frame_dt;
        if let Some(mount) = &mut self.mount {
            let frame_start = Instant::now();
            mount.advance(now, dt);
            self.timing
                .set_render_ms(frame_start.elapsed().as_secs_f32() * 1000.0);
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let window_attrs = WindowAttributes::default()
            .with_title(self.config.window.title.clone())
            .with_inner_size(PhysicalSize::new(
                self.config.window.width.max(1),
                self.config.window.height.max(1),
            ))
            .with_resizable(true);

        let window = match event_loop.create_window(window_attrs) {
            Ok(window) => Arc::new(window),
            Err(err) => {
                log::error!("Failed to create window: {err}");
                event_loop.exit();
                return;
            }
        };

        self.update_target_frame_duration(&window);
        self.window = Some(window);
        self.mount();
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested => {
                event_loop.exit();
            }
            WindowEvent::Focused(false) | WindowEvent::CursorLeft { .. } => {
                self.release_pointer();
            }
            WindowEvent::KeyboardInput { event, .. } => {
                if event.state == ElementState::Pressed && !event.repeat {
                    self.handle_action(input::map_key(event.physical_key), event_loop);
                }
            }
            WindowEvent::Resized(new_size) => {
                let scale_factor = self
                    .window
                    .as_ref()
                    .map(|window| window.scale_factor())
                    .unwrap_or(1.0);
                self.handle_resize(new_size, scale_factor);
                if let Some(window) = self.window.clone() {
                    self.update_target_frame_duration(&window);
                }
            }
            WindowEvent::ScaleFactorChanged { scale_factor, .. } => {
                if let Some(window) = self.window.clone() {
                    self.handle_resize(window.inner_size(), scale_factor);
                }
            }
            WindowEvent::Moved(_) => {
                if let Some(window) = self.window.clone() {
                    self.update_target_frame_duration(&window);
                }
            }
            WindowEvent::CursorMoved { position, .. } => {
                let motion = self.pointer.moved(position.x as f32, position.y as f32);
                self.handle_pointer_motion(motion);
            }
            WindowEvent::MouseInput { state, button, .. } => {
                let pressed = state == ElementState::Pressed;
                if self.pointer.button(button, pressed) {
                    if let Some(mount) = &mut self.mount {
                        if self.pointer.is_orbiting() {
                            mount.scene.camera.begin_drag();
                        } else {
                            mount.scene.camera.end_drag();
                        }
                    }
                }
            }
            WindowEvent::MouseWheel { delta, .. } => {
                if let Some(mount) = &mut self.mount {
                    mount.scene.camera.scroll(input::scroll_notches(delta));
                }
            }
            WindowEvent::RedrawRequested => {
                self.redraw();
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        let now = Instant::now();
        if now >= self.next_frame_time {
            if let Some(window) = &self.window {
                window.request_redraw();
            }
            self.next_frame_time = now + self.target_frame_duration;
        }
        event_loop.set_control_flow(ControlFlow::WaitUntil(self.next_frame_time));
    }
}

pub fn run(config: VaultConfig) -> Result<(), winit::error::EventLoopError> {
    log::info!("🚀 {}", config.window.title);
    log::info!("   ESC quits, R remounts, F12 saves a screenshot");

    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Wait);

    let mut app = App::new(config);
    event_loop.run_app(&mut app)?;

    log::info!("👋 Goodbye!");
    Ok(())
}
