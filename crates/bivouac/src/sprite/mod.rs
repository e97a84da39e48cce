//! # Sprites
//!
//! - [`atlas`]: Named sub-rectangles of one texture image
//! - [`animation`]: Frame tables and the system that steps through them

pub mod animation;
pub mod atlas;

pub use animation::{
    Animation, AnimationId, AnimationTable, Drawing, SpriteAnimation, SpriteAnimationSystem,
};
pub use atlas::{AssetError, SpriteData, TextureAtlas};
