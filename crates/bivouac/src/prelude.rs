//! Convenience re-exports: `use bivouac::prelude::*` for the common items.

pub use crate::app::{App, AppSettings, Context};
pub use crate::ecs::{Entity, Event, Subscriptions, System, SystemManager, World};
pub use crate::input::{CursorPosition, Input, KeyCode, MouseButton};
pub use crate::lifetime::{Expires, ExpiresSystem};
pub use crate::locus::Locus;
pub use crate::math::{Affine2, IVec2, Rect, Vec2, Vec3, hsv_to_rgba8};
pub use crate::mesh::{Mesh, MeshError, Vertex};
pub use crate::motion::{MovementSystem, Spin, Velocity};
pub use crate::particle::{Particle, ParticleEmitter, ParticleSystem};
pub use crate::render::{
    BatchRenderSystem, BlendPass, ClearColor, RenderData, TextureHandle, create_texture_from_rgba,
    load_texture, upload_atlas,
};
pub use crate::script::{ScriptComponent, ScriptSystem};
pub use crate::sprite::{
    AnimationId, AnimationTable, AssetError, SpriteAnimation, SpriteAnimationSystem, SpriteData,
    TextureAtlas,
};
pub use crate::tag::Tag;
pub use crate::time::Time;

#[cfg(feature = "physics2d")]
pub use crate::physics2d::{BodyKind, PhysicsComponent, PhysicsSystem, Shape};
