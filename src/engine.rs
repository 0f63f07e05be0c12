use std::sync::Arc;
use std::time::Instant;

use winit::application::ApplicationHandler;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, EventLoop};
use winit::window::{Window, WindowId};

use crate::renderer::RenderContext;
use crate::renderer::texture::Texture2D;

// ── Game trait ──────────────────────────────────────────────────────────────

/// Implemented by the application; the engine host drives it with a fixed
/// timestep and hands it the frame to draw into.
pub trait Game {
    fn on_start(&mut self, _engine: &mut Engine) {}
    /// Called zero or more times per frame with a fixed `dt` of
    /// `1 / target_ups` seconds.
    fn on_update(&mut self, _engine: &mut Engine, _dt: f32) {}
    /// Called once per frame after at least one update ran.  The current
    /// swapchain view is available through [`Engine::frame`].
    fn on_draw(&mut self, _engine: &mut Engine) {}
    fn on_exit(&mut self) {}
}

// ── Engine ──────────────────────────────────────────────────────────────────

/// Window surface, GPU context and the per-frame state the host maintains.
pub struct Engine {
    pub ctx: RenderContext,
    window: Arc<Window>,
    surface: wgpu::Surface<'static>,
    config: wgpu::SurfaceConfiguration,
    /// Swapchain-sized depth buffer for forward passes (e.g. 3D text).
    depth: Texture2D,
    frame_view: Option<wgpu::TextureView>,
    quit_requested: bool,
}

impl Engine {
    async fn new(window: Arc<Window>) -> Self {
        let size = window.inner_size();

        let instance = wgpu::Instance::default();
        let surface = instance.create_surface(Arc::clone(&window)).unwrap();

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                compatible_surface: Some(&surface),
                ..Default::default()
            })
            .await
            .expect("no suitable GPU adapter found");

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor::default())
            .await
            .expect("failed to create device");

        let caps = surface.get_capabilities(&adapter);
        let format = caps.formats[0];

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode: caps.alpha_modes[0],
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let ctx = RenderContext::new(device, queue, format);
        let depth = Texture2D::depth_attachment(
            &ctx,
            "frame_depth",
            config.width,
            config.height,
            wgpu::TextureFormat::Depth32Float,
        );

        Self {
            ctx,
            window,
            surface,
            config,
            depth,
            frame_view: None,
            quit_requested: false,
        }
    }

    pub fn size(&self) -> (u32, u32) {
        (self.config.width, self.config.height)
    }

    pub fn aspect(&self) -> f32 {
        self.config.width as f32 / self.config.height.max(1) as f32
    }

    /// Depth buffer matching the swapchain size (`Depth32Float`).
    pub fn depth_view(&self) -> &wgpu::TextureView {
        &self.depth.view
    }

    /// Split borrow of the GPU context and the current frame's view.
    ///
    /// # Panics
    /// Panics outside `Game::on_draw` — there is no frame to draw into.
    pub fn frame(&mut self) -> (&mut RenderContext, &wgpu::TextureView) {
        let view = self
            .frame_view
            .as_ref()
            .expect("Engine::frame is only available inside Game::on_draw");
        (&mut self.ctx, view)
    }

    /// Clear the current frame and its depth buffer.  Only valid inside
    /// `Game::on_draw`; renderers that clear themselves don't need it.
    pub fn clear(&mut self, color: wgpu::Color) {
        let view = self
            .frame_view
            .as_ref()
            .expect("Engine::clear is only available inside Game::on_draw");
        let mut encoder = self
            .ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: Some("clear") });
        encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("clear_pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view,
                resolve_target: None,
                depth_slice: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(color),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &self.depth.view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });
        self.ctx.queue.submit(std::iter::once(encoder.finish()));
    }

    /// Signal the host to exit after the current update tick completes.
    pub fn request_quit(&mut self) {
        self.quit_requested = true;
    }

    fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.config.width = width;
        self.config.height = height;
        self.surface.configure(&self.ctx.device, &self.config);
        self.depth = Texture2D::depth_attachment(
            &self.ctx,
            "frame_depth",
            width,
            height,
            wgpu::TextureFormat::Depth32Float,
        );
    }
}

// ── EngineBuilder ───────────────────────────────────────────────────────────

pub struct EngineBuilder {
    title: String,
    width: u32,
    height: u32,
    target_ups: u32,
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self { title: "ember".into(), width: 1280, height: 720, target_ups: 60 }
    }
}

impl EngineBuilder {
    pub fn with_title(mut self, title: &str) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Fixed update rate in steps per second (default 60).
    pub fn with_ups(mut self, ups: u32) -> Self {
        self.target_ups = ups.max(1);
        self
    }

    pub fn run(self, game: impl Game + 'static) {
        let event_loop = EventLoop::new().unwrap();
        let fixed_dt = 1.0 / self.target_ups as f32;
        let mut app = App {
            config: self,
            game: Box::new(game),
            engine: None,
            last_instant: None,
            accumulator: 0.0,
            fixed_dt,
        };
        event_loop.run_app(&mut app).unwrap();
    }
}

// ── App (winit ApplicationHandler) ──────────────────────────────────────────

struct App {
    config: EngineBuilder,
    game: Box<dyn Game>,
    engine: Option<Engine>,
    last_instant: Option<Instant>,
    accumulator: f32,
    fixed_dt: f32,
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        let window = Arc::new(
            event_loop
                .create_window(
                    Window::default_attributes()
                        .with_title(&self.config.title)
                        .with_inner_size(winit::dpi::PhysicalSize::new(
                            self.config.width,
                            self.config.height,
                        )),
                )
                .unwrap(),
        );

        let mut engine = pollster::block_on(Engine::new(window));
        self.game.on_start(&mut engine);
        self.engine = Some(engine);
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(engine) = self.engine.as_ref() {
            engine.window.request_redraw();
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        let Some(engine) = self.engine.as_mut() else { return };

        match event {
            WindowEvent::CloseRequested => {
                self.game.on_exit();
                event_loop.exit();
            }

            WindowEvent::Resized(size) => {
                engine.resize(size.width, size.height);
            }

            WindowEvent::RedrawRequested => {
                // Fixed-timestep accumulator: wall-clock delta (clamped so a
                // stall doesn't spiral), zero or more fixed updates, one
                // render only when at least one update ran.
                let now = Instant::now();
                let elapsed = match self.last_instant {
                    Some(prev) => now.duration_since(prev).as_secs_f32().min(0.25),
                    None => self.fixed_dt,
                };
                self.last_instant = Some(now);
                self.accumulator += elapsed;

                let mut can_render = false;
                while self.accumulator >= self.fixed_dt {
                    self.accumulator -= self.fixed_dt;
                    self.game.on_update(engine, self.fixed_dt);
                    can_render = true;
                    if engine.quit_requested {
                        self.game.on_exit();
                        event_loop.exit();
                        return;
                    }
                }

                if !can_render {
                    return;
                }

                let frame = match engine.surface.get_current_texture() {
                    Ok(frame) => frame,
                    Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                        let (w, h) = engine.size();
                        engine.resize(w, h);
                        return;
                    }
                    Err(e) => {
                        eprintln!("engine: surface error: {e}");
                        return;
                    }
                };
                let view = frame.texture.create_view(&wgpu::TextureViewDescriptor::default());

                engine.frame_view = Some(view);
                self.game.on_draw(engine);
                engine.frame_view = None;

                frame.present();
            }

            _ => {}
        }
    }
}
