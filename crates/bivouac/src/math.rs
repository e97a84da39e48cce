//! Math types and glam re-exports.
//!
//! Screen space is y-down: (0, 0) is the upper-left corner of the window and
//! a [`Rect`]'s `min` is its upper-left corner.

pub use glam::{Affine2, IVec2, Mat2, Mat4, Vec2, Vec3, Vec4};

/// An axis-aligned rectangle. Used both for pixel bounds and for normalized
/// texture coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub min: Vec2,
    pub max: Vec2,
}

impl Rect {
    /// The full texture (0,0) to (1,1).
    pub const FULL: Self = Self {
        min: Vec2::ZERO,
        max: Vec2::ONE,
    };

    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self {
            min: Vec2::new(x1, y1),
            max: Vec2::new(x2, y2),
        }
    }

    /// A rectangle of `size` with its upper-left corner at `origin`.
    pub fn from_origin_size(origin: Vec2, size: Vec2) -> Self {
        Self {
            min: origin,
            max: origin + size,
        }
    }

    /// A rectangle of `size` centered on the origin.
    pub fn centered(size: Vec2) -> Self {
        Self::from_origin_size(-size * 0.5, size)
    }

    /// Normalize a pixel rectangle by the texture dimensions.
    pub fn from_pixels(x: f32, y: f32, w: f32, h: f32, tex_w: f32, tex_h: f32) -> Self {
        Self {
            min: Vec2::new(x / tex_w, y / tex_h),
            max: Vec2::new((x + w) / tex_w, (y + h) / tex_h),
        }
    }

    pub fn upper_left(&self) -> Vec2 {
        self.min
    }

    pub fn upper_right(&self) -> Vec2 {
        Vec2::new(self.max.x, self.min.y)
    }

    pub fn lower_left(&self) -> Vec2 {
        Vec2::new(self.min.x, self.max.y)
    }

    pub fn lower_right(&self) -> Vec2 {
        self.max
    }

    pub fn size(&self) -> Vec2 {
        self.max - self.min
    }

    /// The rectangle moved by `offset`.
    pub fn offset(&self, offset: Vec2) -> Self {
        Self {
            min: self.min + offset,
            max: self.max + offset,
        }
    }
}

impl Default for Rect {
    fn default() -> Self {
        Self::FULL
    }
}

/// Convert hue/saturation/value (all 0–1) to opaque RGBA8.
pub fn hsv_to_rgba8(hue: f32, saturation: f32, value: f32) -> [u8; 4] {
    let h = hue.rem_euclid(1.0) * 6.0;
    let c = value * saturation;
    let x = c * (1.0 - (h % 2.0 - 1.0).abs());
    let m = value - c;
    let (r, g, b) = match h as u32 {
        0 => (c, x, 0.0),
        1 => (x, c, 0.0),
        2 => (0.0, c, x),
        3 => (0.0, x, c),
        4 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };
    let to_u8 = |v: f32| ((v + m).clamp(0.0, 1.0) * 255.0).round() as u8;
    [to_u8(r), to_u8(g), to_u8(b), 255]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn corners_are_y_down() {
        let r = Rect::new(0.0, 0.0, 10.0, 20.0);
        assert_eq!(r.upper_left(), Vec2::new(0.0, 0.0));
        assert_eq!(r.upper_right(), Vec2::new(10.0, 0.0));
        assert_eq!(r.lower_left(), Vec2::new(0.0, 20.0));
        assert_eq!(r.lower_right(), Vec2::new(10.0, 20.0));
        assert_eq!(r.size(), Vec2::new(10.0, 20.0));
    }

    #[test]
    fn from_pixels_normalizes() {
        let r = Rect::from_pixels(32.0, 0.0, 32.0, 64.0, 128.0, 64.0);
        assert_eq!(r.min, Vec2::new(0.25, 0.0));
        assert_eq!(r.max, Vec2::new(0.5, 1.0));
    }

    #[test]
    fn centered_and_offset() {
        let r = Rect::centered(Vec2::new(4.0, 2.0)).offset(Vec2::new(1.0, 1.0));
        assert_eq!(r.min, Vec2::new(-1.0, 0.0));
        assert_eq!(r.max, Vec2::new(3.0, 2.0));
    }

    #[test]
    fn hsv_primaries() {
        assert_eq!(hsv_to_rgba8(0.0, 1.0, 1.0), [255, 0, 0, 255]);
        assert_eq!(hsv_to_rgba8(1.0 / 3.0, 1.0, 1.0), [0, 255, 0, 255]);
        assert_eq!(hsv_to_rgba8(0.5, 0.0, 1.0), [255, 255, 255, 255]);
    }
}
