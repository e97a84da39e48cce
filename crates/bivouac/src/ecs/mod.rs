//! # Entity Component System
//!
//! Entities are generational handles, components live in one sparse-set pool
//! per type (at most [`MAX_COMPONENTS`] types), and systems are plain structs
//! that update once per frame and react to structural changes through an
//! explicit event queue.
//!
//! - [`entity`]: Generational handles and slot recycling
//! - [`component`]: Families, masks and per-type pools
//! - [`event`]: Added / removed / destroyed notifications
//! - [`world`]: The registry: create, assign, component, remove, destroy
//! - [`query`]: Closure-based iteration by component signature
//! - [`system`]: `System` trait and the `SystemManager`

pub mod component;
pub mod entity;
pub mod event;
pub mod query;
pub mod system;
pub mod world;

pub use component::{ComponentId, ComponentMask, MAX_COMPONENTS};
pub use entity::Entity;
pub use event::{Event, Topic};
pub use system::{Subscriptions, System, SystemManager};
pub use world::{SpawnBundle, World};
