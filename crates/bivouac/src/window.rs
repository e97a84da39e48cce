//! Window management via winit.
//!
//! Implements [`winit::application::ApplicationHandler`] to drive the event
//! loop: window creation, input forwarding, resize and the frame itself
//! (tick time, run the update closures, draw the batch, clear input edges).

use std::sync::Arc;

use winit::application::ApplicationHandler;
use winit::event::{ElementState, WindowEvent};
use winit::event_loop::ActiveEventLoop;
use winit::keyboard::PhysicalKey;
use winit::window::{Window, WindowId};

use crate::app::{AppSettings, Context, SetupFn, UpdateFn};
use crate::input::{CursorPosition, Input, KeyCode, MouseButton};
use crate::math::Vec2;
use crate::render::{
    BatchRenderSystem, ClearColor, FrameError, GpuContext, StripRenderer, TextureStore, ensure_renderer,
};
use crate::time::Time;

/// The application state that winit drives.
pub(crate) struct WinitApp {
    ctx: Context,
    settings: AppSettings,
    setup: Vec<SetupFn>,
    update: Vec<UpdateFn>,
    window: Option<Arc<Window>>,
    started: bool,
}

impl WinitApp {
    pub fn new(ctx: Context, settings: AppSettings, setup: Vec<SetupFn>, update: Vec<UpdateFn>) -> Self {
        Self {
            ctx,
            settings,
            setup,
            update,
            window: None,
            started: false,
        }
    }

    fn frame(&mut self, event_loop: &ActiveEventLoop) {
        let world = &mut self.ctx.world;
        if let Some(time) = world.get_resource_mut::<Time>() {
            time.tick();
        }
        let dt = world.get_resource::<Time>().map_or(0.0, |t| t.delta_secs());

        for update in &mut self.update {
            update(&mut self.ctx, dt);
        }

        if let Err(FrameError::Fatal) = render_frame(&mut self.ctx) {
            event_loop.exit();
        }

        let world = &mut self.ctx.world;
        if let Some(keys) = world.get_resource_mut::<Input<KeyCode>>() {
            keys.end_frame();
        }
        if let Some(mouse) = world.get_resource_mut::<Input<MouseButton>>() {
            mouse.end_frame();
        }

        if self.ctx.exit_requested() {
            log::info!("Exit requested");
            event_loop.exit();
        }
    }
}

impl ApplicationHandler for WinitApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_none() {
            let attrs = Window::default_attributes()
                .with_title(&self.settings.title)
                .with_inner_size(winit::dpi::LogicalSize::new(
                    self.settings.width as f64,
                    self.settings.height as f64,
                ));
            let window = Arc::new(
                event_loop
                    .create_window(attrs)
                    .expect("Failed to create window"),
            );

            let gpu = GpuContext::new(window.clone(), self.settings.vsync);
            self.ctx.world.insert_resource(gpu);
            ensure_renderer(&mut self.ctx.world);

            self.window = Some(window);
        }

        if !self.started {
            self.started = true;
            for setup in &mut self.setup {
                setup(&mut self.ctx);
            }
            self.ctx.systems.configure();
            log::info!("Setup done; systems: {:?}", self.ctx.systems.names());
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        let world = &mut self.ctx.world;
        match event {
            WindowEvent::CloseRequested => {
                log::info!("Window close requested, exiting.");
                event_loop.exit();
            }

            WindowEvent::Resized(size) => {
                if let Some(gpu) = world.get_resource_mut::<GpuContext>() {
                    gpu.resize(size.width, size.height);
                }
            }

            WindowEvent::KeyboardInput { event, .. } => {
                if let PhysicalKey::Code(key_code) = event.physical_key {
                    if let Some(input) = world.get_resource_mut::<Input<KeyCode>>() {
                        match event.state {
                            ElementState::Pressed => input.press(key_code),
                            ElementState::Released => input.release(key_code),
                        }
                    }
                }
            }

            WindowEvent::MouseInput { button, state, .. } => {
                if let Some(input) = world.get_resource_mut::<Input<MouseButton>>() {
                    match state {
                        ElementState::Pressed => input.press(button),
                        ElementState::Released => input.release(button),
                    }
                }
            }

            WindowEvent::CursorMoved { position, .. } => {
                if let Some(cursor) = world.get_resource_mut::<CursorPosition>() {
                    cursor.0 = Vec2::new(position.x as f32, position.y as f32);
                }
            }

            WindowEvent::Focused(false) => {
                if let Some(input) = world.get_resource_mut::<Input<KeyCode>>() {
                    input.release_all();
                }
                if let Some(input) = world.get_resource_mut::<Input<MouseButton>>() {
                    input.release_all();
                }
            }

            WindowEvent::RedrawRequested => self.frame(event_loop),

            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }
}

/// Upload the batch, clear the frame and draw it.
fn render_frame(ctx: &mut Context) -> Result<(), FrameError> {
    let world = &mut ctx.world;
    if !world.has_resource::<GpuContext>() {
        return Ok(());
    }
    ensure_renderer(world);
    let Some(mut renderer) = world.resource_remove::<StripRenderer>() else {
        return Ok(());
    };

    let result = draw_batch(world, &ctx.systems, &mut renderer);
    world.insert_resource(renderer);
    result
}

fn draw_batch(
    world: &mut crate::ecs::World,
    systems: &crate::ecs::SystemManager,
    renderer: &mut StripRenderer,
) -> Result<(), FrameError> {
    let clear = world.get_resource::<ClearColor>().copied().unwrap_or_default();
    let batch = systems.system::<BatchRenderSystem>();
    let Some(gpu) = world.get_resource_mut::<GpuContext>() else {
        return Ok(());
    };
    let frame = gpu.acquire_frame()?;

    let (width, height) = gpu.surface_size();
    renderer.set_viewport(gpu, width, height);
    if let Some(batch) = batch {
        batch.prepare(renderer, gpu);
    }

    let view = frame
        .texture
        .create_view(&wgpu::TextureViewDescriptor::default());
    let mut encoder = gpu
        .device
        .create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("bivouac frame"),
        });
    {
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("batch pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &view,
                resolve_target: None,
                depth_slice: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(clear.0),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });
        if let (Some(batch), Some(textures)) = (batch, world.get_resource::<TextureStore>()) {
            batch.draw(renderer, textures, &mut pass);
        }
    }

    let gpu = world.resource::<GpuContext>();
    gpu.queue.submit(std::iter::once(encoder.finish()));
    frame.present();
    Ok(())
}
