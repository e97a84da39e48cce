//! # Texture Atlas
//!
//! One RGBA image plus a JSON description naming rectangles inside it.
//!
//! ```json
//! {
//!   "sprites": [
//!     { "name": "walk-01", "frame": { "x": 0, "y": 0, "w": 32, "h": 48 },
//!       "registration": [16, 48] },
//!     { "name": "shadow", "frame": { "x": 32, "y": 0, "w": 16, "h": 8 },
//!       "size": [32, 16] }
//!   ]
//! }
//! ```
//!
//! `frame` is in pixels and is normalized by the image size. `size` is the
//! on-screen size and defaults to the frame size; `registration` is the pivot
//! in on-screen pixels and defaults to the upper-left corner.
//!
//! Lookups never fail: an unknown name hands back the error sprite (the whole
//! texture at 96×96) and logs a warning.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use image::RgbaImage;
use serde::Deserialize;

use crate::math::{IVec2, Rect, Vec2};

// ── Errors ──────────────────────────────────────────────────────────────

/// Errors that can occur while loading an atlas.
#[derive(Debug)]
pub enum AssetError {
    /// Reading a file failed.
    Io(std::io::Error),
    /// Decoding the image failed.
    Image(image::ImageError),
    /// The description is not valid atlas JSON.
    Json(serde_json::Error),
}

impl fmt::Display for AssetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssetError::Io(e) => write!(f, "asset read failed: {e}"),
            AssetError::Image(e) => write!(f, "image decode failed: {e}"),
            AssetError::Json(e) => write!(f, "atlas description invalid: {e}"),
        }
    }
}

impl std::error::Error for AssetError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AssetError::Io(e) => Some(e),
            AssetError::Image(e) => Some(e),
            AssetError::Json(e) => Some(e),
        }
    }
}

impl From<std::io::Error> for AssetError {
    fn from(e: std::io::Error) -> Self {
        AssetError::Io(e)
    }
}

impl From<image::ImageError> for AssetError {
    fn from(e: image::ImageError) -> Self {
        AssetError::Image(e)
    }
}

impl From<serde_json::Error> for AssetError {
    fn from(e: serde_json::Error) -> Self {
        AssetError::Json(e)
    }
}

// ── SpriteData ──────────────────────────────────────────────────────────

/// Where a sprite lives in the texture and how big it draws.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpriteData {
    /// Normalized texture coordinates.
    pub texture_bounds: Rect,
    /// On-screen size in pixels.
    pub size: IVec2,
    /// Pivot, relative to the upper-left corner of the drawn box.
    pub registration_point: Vec2,
}

impl SpriteData {
    pub fn new(texture_bounds: Rect, size: IVec2, registration_point: Vec2) -> Self {
        Self {
            texture_bounds,
            size,
            registration_point,
        }
    }
}

impl Default for SpriteData {
    fn default() -> Self {
        Self {
            texture_bounds: Rect::FULL,
            size: IVec2::new(96, 96),
            registration_point: Vec2::ZERO,
        }
    }
}

// ── Description Format ──────────────────────────────────────────────────

#[derive(Deserialize)]
struct AtlasDescription {
    sprites: Vec<SpriteDescription>,
}

#[derive(Deserialize)]
struct SpriteDescription {
    name: String,
    frame: Frame,
    #[serde(default)]
    size: Option<IVec2>,
    #[serde(default)]
    registration: Option<Vec2>,
}

#[derive(Deserialize)]
struct Frame {
    x: f32,
    y: f32,
    w: f32,
    h: f32,
}

// ── TextureAtlas ────────────────────────────────────────────────────────

/// Named sprites inside one texture.
pub struct TextureAtlas {
    sprites: HashMap<String, SpriteData>,
    error_sprite: SpriteData,
    image: Option<RgbaImage>,
    width: u32,
    height: u32,
}

impl TextureAtlas {
    /// Parse a description for an image of `width` × `height` pixels.
    pub fn from_description(json: &str, width: u32, height: u32) -> Result<Self, AssetError> {
        let description: AtlasDescription = serde_json::from_str(json)?;
        let (tex_w, tex_h) = (width.max(1) as f32, height.max(1) as f32);

        let mut sprites = HashMap::with_capacity(description.sprites.len());
        for sprite in description.sprites {
            let frame = sprite.frame;
            let data = SpriteData {
                texture_bounds: Rect::from_pixels(frame.x, frame.y, frame.w, frame.h, tex_w, tex_h),
                size: sprite
                    .size
                    .unwrap_or_else(|| IVec2::new(frame.w.round() as i32, frame.h.round() as i32)),
                registration_point: sprite.registration.unwrap_or(Vec2::ZERO),
            };
            if sprites.insert(sprite.name.clone(), data).is_some() {
                log::warn!("Atlas lists sprite `{}` more than once; keeping the last", sprite.name);
            }
        }

        log::debug!("Parsed atlas with {} sprite(s) for {}x{} image", sprites.len(), width, height);
        Ok(Self {
            sprites,
            error_sprite: SpriteData::default(),
            image: None,
            width,
            height,
        })
    }

    /// Build an atlas around an already decoded image.
    pub fn from_image(image: RgbaImage, json: &str) -> Result<Self, AssetError> {
        let mut atlas = Self::from_description(json, image.width(), image.height())?;
        atlas.image = Some(image);
        Ok(atlas)
    }

    /// Load the image and its description from disk.
    pub fn load(image_path: impl AsRef<Path>, json_path: impl AsRef<Path>) -> Result<Self, AssetError> {
        let image_path = image_path.as_ref();
        let json_path = json_path.as_ref();
        let image = image::open(image_path)?.to_rgba8();
        let json = std::fs::read_to_string(json_path)?;
        let atlas = Self::from_image(image, &json)?;
        log::info!(
            "Loaded atlas {} ({} sprites) from {}",
            image_path.display(),
            atlas.len(),
            json_path.display()
        );
        Ok(atlas)
    }

    /// The named sprite, or the error sprite if there is none.
    pub fn get(&self, name: &str) -> &SpriteData {
        match self.sprites.get(name) {
            Some(sprite) => sprite,
            None => {
                log::warn!("Sprite `{}` not found in atlas; using error sprite", name);
                &self.error_sprite
            }
        }
    }

    /// The named sprite, without falling back.
    pub fn try_get(&self, name: &str) -> Option<&SpriteData> {
        self.sprites.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.sprites.contains_key(name)
    }

    pub fn error_sprite(&self) -> &SpriteData {
        &self.error_sprite
    }

    pub fn len(&self) -> usize {
        self.sprites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sprites.is_empty()
    }

    /// The decoded image, if this atlas was built with one.
    pub fn image(&self) -> Option<&RgbaImage> {
        self.image.as_ref()
    }

    /// Take the image out, e.g. to hand it to the GPU.
    pub fn take_image(&mut self) -> Option<RgbaImage> {
        self.image.take()
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Sprite names in sorted order.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.sprites.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl fmt::Debug for TextureAtlas {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TextureAtlas")
            .field("sprites", &self.sprites.len())
            .field("width", &self.width)
            .field("height", &self.height)
            .field("has_image", &self.image.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DESCRIPTION: &str = r#"{
        "sprites": [
            { "name": "a", "frame": { "x": 0, "y": 0, "w": 32, "h": 32 } },
            { "name": "b", "frame": { "x": 32, "y": 0, "w": 32, "h": 16 },
              "size": [64, 32], "registration": [32, 16] }
        ]
    }"#;

    #[test]
    fn parses_and_normalizes_frames() {
        let atlas = TextureAtlas::from_description(DESCRIPTION, 128, 64).unwrap();
        assert_eq!(atlas.len(), 2);

        let a = atlas.get("a");
        assert_eq!(a.texture_bounds, Rect::new(0.0, 0.0, 0.25, 0.5));
        assert_eq!(a.size, IVec2::new(32, 32));
        assert_eq!(a.registration_point, Vec2::ZERO);

        let b = atlas.get("b");
        assert_eq!(b.texture_bounds, Rect::new(0.25, 0.0, 0.5, 0.25));
        assert_eq!(b.size, IVec2::new(64, 32));
        assert_eq!(b.registration_point, Vec2::new(32.0, 16.0));
    }

    #[test]
    fn unknown_name_gives_error_sprite() {
        let atlas = TextureAtlas::from_description(DESCRIPTION, 128, 64).unwrap();
        let missing = atlas.get("nope");
        assert_eq!(missing, &SpriteData::default());
        assert_eq!(missing.size, IVec2::new(96, 96));
        assert_eq!(missing.texture_bounds, Rect::FULL);
        assert!(!atlas.contains("nope"));
        assert!(atlas.try_get("nope").is_none());
    }

    #[test]
    fn malformed_description_is_json_error() {
        let result = TextureAtlas::from_description("{ \"sprites\": [ { \"name\": 3 } ] }", 8, 8);
        assert!(matches!(result, Err(AssetError::Json(_))));
    }

    #[test]
    fn from_image_keeps_dimensions() {
        let image = RgbaImage::new(128, 64);
        let mut atlas = TextureAtlas::from_image(image, DESCRIPTION).unwrap();
        assert_eq!(atlas.size(), (128, 64));
        assert!(atlas.image().is_some());
        assert!(atlas.take_image().is_some());
        assert!(atlas.image().is_none());
    }

    #[test]
    fn missing_files_are_io_or_image_errors() {
        let result = TextureAtlas::load("/definitely/not/here.png", "/nor/here.json");
        assert!(matches!(result, Err(AssetError::Image(_)) | Err(AssetError::Io(_))));
    }

    #[test]
    fn names_are_sorted() {
        let atlas = TextureAtlas::from_description(DESCRIPTION, 128, 64).unwrap();
        assert_eq!(atlas.names(), vec!["a", "b"]);
    }
}
