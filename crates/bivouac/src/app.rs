//! App builder.
//!
//! [`App`] opens a window, hands a [`Context`] to a setup closure once, then
//! calls an update closure every frame with the frame's `dt`. The update
//! closure decides which systems run and in what order; afterwards the host
//! draws whatever the [`BatchRenderSystem`] assembled.
//!
//! # Example
//!
//! ```ignore
//! use bivouac::prelude::*;
//!
//! fn main() {
//!     App::new("Boxes")
//!         .size(1024, 768)
//!         .clear_color(ClearColor::rgb(0.1, 0.1, 0.15))
//!         .setup(|ctx| {
//!             ctx.systems.add(MovementSystem);
//!             ctx.systems.add(BatchRenderSystem::new());
//!             ctx.world.spawn((Locus::at(100.0, 100.0), Mesh::from_box(Rect::new(-8.0, -8.0, 8.0, 8.0))));
//!         })
//!         .update(|ctx, dt| {
//!             ctx.systems.update::<MovementSystem>(&mut ctx.world, dt);
//!             ctx.systems.update::<BatchRenderSystem>(&mut ctx.world, dt);
//!         })
//!         .run();
//! }
//! ```
//!
//! [`BatchRenderSystem`]: crate::render::BatchRenderSystem

use winit::event_loop::EventLoop;

use crate::ecs::{SystemManager, World};
use crate::input::{CursorPosition, Input, KeyCode, MouseButton};
use crate::render::ClearColor;
use crate::time::Time;
use crate::window::WinitApp;

/// Window and frame options.
#[derive(Debug, Clone, PartialEq)]
pub struct AppSettings {
    pub title: String,
    /// Logical pixels.
    pub width: u32,
    pub height: u32,
    pub clear_color: ClearColor,
    pub vsync: bool,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            title: String::from("bivouac"),
            width: 1024,
            height: 768,
            clear_color: ClearColor::default(),
            vsync: true,
        }
    }
}

/// Everything the setup and update closures work with.
pub struct Context {
    pub world: World,
    pub systems: SystemManager,
    exit_requested: bool,
}

impl Context {
    pub(crate) fn new(settings: &AppSettings) -> Self {
        let mut world = World::new();
        world.insert_resource(Time::new());
        world.insert_resource(Input::<KeyCode>::new());
        world.insert_resource(Input::<MouseButton>::new());
        world.insert_resource(CursorPosition::default());
        world.insert_resource(settings.clear_color);
        Self {
            world,
            systems: SystemManager::new(),
            exit_requested: false,
        }
    }

    /// Keyboard state for this frame.
    pub fn keys(&self) -> &Input<KeyCode> {
        self.world.resource::<Input<KeyCode>>()
    }

    /// Mouse button state for this frame.
    pub fn mouse(&self) -> &Input<MouseButton> {
        self.world.resource::<Input<MouseButton>>()
    }

    pub fn cursor(&self) -> CursorPosition {
        self.world.get_resource::<CursorPosition>().copied().unwrap_or_default()
    }

    pub fn time(&self) -> &Time {
        self.world.resource::<Time>()
    }

    /// Close the window after the current frame.
    pub fn exit(&mut self) {
        self.exit_requested = true;
    }

    pub(crate) fn exit_requested(&self) -> bool {
        self.exit_requested
    }
}

pub(crate) type SetupFn = Box<dyn FnMut(&mut Context)>;
pub(crate) type UpdateFn = Box<dyn FnMut(&mut Context, f64)>;

/// Builder for a windowed bivouac program.
pub struct App {
    settings: AppSettings,
    setup: Vec<SetupFn>,
    update: Vec<UpdateFn>,
}

impl App {
    pub fn new(title: impl Into<String>) -> Self {
        Self::with_settings(AppSettings {
            title: title.into(),
            ..AppSettings::default()
        })
    }

    pub fn with_settings(settings: AppSettings) -> Self {
        Self {
            settings,
            setup: Vec::new(),
            update: Vec::new(),
        }
    }

    /// Window size in logical pixels.
    pub fn size(mut self, width: u32, height: u32) -> Self {
        self.settings.width = width;
        self.settings.height = height;
        self
    }

    pub fn clear_color(mut self, color: ClearColor) -> Self {
        self.settings.clear_color = color;
        self
    }

    pub fn vsync(mut self, enabled: bool) -> Self {
        self.settings.vsync = enabled;
        self
    }

    pub fn settings(&self) -> &AppSettings {
        &self.settings
    }

    /// Run once, after the window and GPU exist. Register systems and build
    /// the scene here. `SystemManager::configure` is called right after.
    pub fn setup(mut self, f: impl FnMut(&mut Context) + 'static) -> Self {
        self.setup.push(Box::new(f));
        self
    }

    /// Run every frame with the frame's `dt` in seconds.
    pub fn update(mut self, f: impl FnMut(&mut Context, f64) + 'static) -> Self {
        self.update.push(Box::new(f));
        self
    }

    /// Open the window and run until it is closed.
    ///
    /// # Panics
    ///
    /// Panics if the event loop cannot be created.
    pub fn run(self) {
        let _ = env_logger::try_init();
        log::info!(
            "Starting `{}` at {}x{}",
            self.settings.title,
            self.settings.width,
            self.settings.height
        );

        let event_loop = EventLoop::new().expect("Failed to create event loop");
        let ctx = Context::new(&self.settings);
        let mut app = WinitApp::new(ctx, self.settings, self.setup, self.update);
        if let Err(e) = event_loop.run_app(&mut app) {
            log::error!("Event loop error: {e}");
        }
    }
}
