//! # Bivouac: Small 2D Entity Component Game Framework
//!
//! A registry of entities and typed components, systems that react to
//! structural changes through an explicit event queue, and a batch renderer
//! that joins every mesh into one triangle strip per blend pass.
//!
//! Start with `use bivouac::prelude::*` and build an [`App`](app::App).

pub mod app;
pub mod ecs;
pub mod input;
pub mod lifetime;
pub mod locus;
pub mod math;
pub mod mesh;
pub mod motion;
pub mod particle;
pub mod prelude;
pub mod render;
pub mod script;
pub mod sprite;
pub mod tag;
pub mod time;
pub(crate) mod window;

#[cfg(feature = "physics2d")]
pub mod physics2d;
