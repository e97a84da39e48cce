//! # Mesh: Vertices in Triangle-Strip Order
//!
//! A [`Mesh`] is a list of [`Vertex`]es that the batch renderer reads as one
//! triangle strip, in the owning entity's local space. Strips are cheap to
//! join (two degenerate vertices between shapes), which is what lets a whole
//! scene go out in a single draw call.
//!
//! ```text
//! box:     1 ───── 0          circle segment i:  centre, b, c, c, centre
//!          │ ╲     │
//!          │   ╲   │          ribbon: left0, right0, left1, right1, ...
//!          3 ───── 2
//! ```

use std::fmt;

use crate::math::{Rect, Vec2};
use crate::sprite::atlas::SpriteData;

/// Opaque white.
pub const WHITE: [u8; 4] = [255, 255, 255, 255];

/// One strip vertex: local position, RGBA8 colour, texture coordinate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vertex {
    pub position: Vec2,
    pub color: [u8; 4],
    pub tex_coord: Vec2,
}

impl Vertex {
    pub fn new(position: Vec2) -> Self {
        Self {
            position,
            ..Self::default()
        }
    }
}

impl Default for Vertex {
    fn default() -> Self {
        Self {
            position: Vec2::ZERO,
            color: WHITE,
            tex_coord: Vec2::ZERO,
        }
    }
}

/// Errors from the fallible mesh builders.
#[derive(Debug, Clone, PartialEq)]
pub enum MeshError {
    /// A ribbon needs two or more distinct, consecutive spine points.
    DegenerateRibbon { points: usize },
}

impl fmt::Display for MeshError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MeshError::DegenerateRibbon { points } => {
                write!(f, "cannot build a ribbon from {} spine point(s)", points)
            }
        }
    }
}

impl std::error::Error for MeshError {}

/// A triangle-strip mesh component.
#[derive(Debug, Clone, PartialEq)]
pub struct Mesh {
    pub vertices: Vec<Vertex>,
}

impl Mesh {
    /// A mesh of `vertex_count` white vertices at the origin.
    pub fn new(vertex_count: usize) -> Self {
        Self {
            vertices: vec![Vertex::default(); vertex_count],
        }
    }

    pub fn with_vertices(vertices: Vec<Vertex>) -> Self {
        Self { vertices }
    }

    /// A box mesh covering `bounds`.
    pub fn from_box(bounds: Rect) -> Self {
        let mut mesh = Self::new(4);
        mesh.set_as_box(bounds);
        mesh
    }

    /// A textured quad matching `sprite`.
    pub fn from_sprite(sprite: &SpriteData) -> Self {
        let mut mesh = Self::new(4);
        mesh.set_as_texture(sprite);
        mesh
    }

    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    fn resize(&mut self, count: usize) {
        if self.vertices.len() != count {
            self.vertices = vec![Vertex::default(); count];
        }
    }

    /// Make the mesh a four-vertex box. Existing colours and texture
    /// coordinates are kept when the vertex count already matches.
    pub fn set_as_box(&mut self, bounds: Rect) {
        self.resize(4);
        self.vertices[0].position = bounds.upper_right();
        self.vertices[1].position = bounds.upper_left();
        self.vertices[2].position = bounds.lower_right();
        self.vertices[3].position = bounds.lower_left();
    }

    /// Make the mesh a circle (or arc) of `radius` from `start` to `end`
    /// radians.
    ///
    /// `segments < 2` picks a count from the arc length, never fewer than 3.
    pub fn set_as_circle(&mut self, radius: Vec2, start: f32, end: f32, segments: usize) {
        let mut segments = segments;
        if segments < 2 {
            segments = (radius.max_element() * (end - start).abs() / 3.0).floor() as usize;
        }
        segments = segments.max(3);
        self.resize(segments * 5);

        let centre = Vec2::ZERO;
        for i in 0..segments {
            let t1 = start + (end - start) * i as f32 / segments as f32;
            let t2 = start + (end - start) * (i + 1) as f32 / segments as f32;
            let b = Vec2::new(t1.cos(), t1.sin()) * radius;
            let c = Vec2::new(t2.cos(), t2.sin()) * radius;
            let base = i * 5;
            self.vertices[base].position = centre;
            self.vertices[base + 1].position = b;
            self.vertices[base + 2].position = c;
            self.vertices[base + 3].position = c;
            self.vertices[base + 4].position = centre;
        }
    }

    /// Make the mesh a box of the sprite's size, offset by its registration
    /// point, with matching texture coordinates.
    pub fn set_as_texture(&mut self, sprite: &SpriteData) {
        let bounds = Rect::from_origin_size(Vec2::ZERO, sprite.size.as_vec2())
            .offset(-sprite.registration_point);
        self.set_as_box(bounds);
        let tex = sprite.texture_bounds;
        self.vertices[0].tex_coord = tex.upper_right();
        self.vertices[1].tex_coord = tex.upper_left();
        self.vertices[2].tex_coord = tex.lower_right();
        self.vertices[3].tex_coord = tex.lower_left();
    }

    /// Make the mesh a ribbon of `width` following `spine`.
    ///
    /// On error the mesh is left untouched.
    pub fn set_as_ribbon(&mut self, spine: &[Vec2], width: f32) -> Result<(), MeshError> {
        let degenerate = MeshError::DegenerateRibbon {
            points: spine.len(),
        };
        if spine.len() < 2 {
            return Err(degenerate);
        }
        let half = width * 0.5;
        let mut vertices = Vec::with_capacity(spine.len() * 2);
        for (i, &point) in spine.iter().enumerate() {
            let (from, to) = if i + 1 < spine.len() {
                (point, spine[i + 1])
            } else {
                (spine[i - 1], point)
            };
            let direction = (to - from).try_normalize().ok_or_else(|| degenerate.clone())?;
            let normal = direction.perp() * half;
            let color = self.vertices.get(i * 2).map_or(WHITE, |v| v.color);
            vertices.push(Vertex {
                position: point + normal,
                color,
                tex_coord: Vec2::new(i as f32 / (spine.len() - 1) as f32, 0.0),
            });
            vertices.push(Vertex {
                position: point - normal,
                color,
                tex_coord: Vec2::new(i as f32 / (spine.len() - 1) as f32, 1.0),
            });
        }
        self.vertices = vertices;
        Ok(())
    }

    /// Paint every vertex with `color`.
    pub fn set_color(&mut self, color: [u8; 4]) {
        for vertex in &mut self.vertices {
            vertex.color = color;
        }
    }
}

impl Default for Mesh {
    fn default() -> Self {
        Self::new(3)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::IVec2;

    #[test]
    fn default_has_three_white_vertices() {
        let mesh = Mesh::default();
        assert_eq!(mesh.len(), 3);
        assert!(mesh.vertices.iter().all(|v| v.color == WHITE));
    }

    #[test]
    fn box_corner_order() {
        let mesh = Mesh::from_box(Rect::new(-1.0, -2.0, 3.0, 4.0));
        let p: Vec<Vec2> = mesh.vertices.iter().map(|v| v.position).collect();
        assert_eq!(
            p,
            vec![
                Vec2::new(3.0, -2.0),
                Vec2::new(-1.0, -2.0),
                Vec2::new(3.0, 4.0),
                Vec2::new(-1.0, 4.0),
            ]
        );
    }

    #[test]
    fn box_keeps_colors_when_count_matches() {
        let mut mesh = Mesh::new(4);
        mesh.set_color([1, 2, 3, 4]);
        mesh.set_as_box(Rect::new(0.0, 0.0, 1.0, 1.0));
        assert!(mesh.vertices.iter().all(|v| v.color == [1, 2, 3, 4]));
    }

    #[test]
    fn circle_explicit_segments() {
        let mut mesh = Mesh::default();
        mesh.set_as_circle(Vec2::splat(10.0), 0.0, std::f32::consts::TAU, 8);
        assert_eq!(mesh.len(), 40);
        assert_eq!(mesh.vertices[0].position, Vec2::ZERO);
        assert_eq!(mesh.vertices[4].position, Vec2::ZERO);
        assert!((mesh.vertices[1].position - Vec2::new(10.0, 0.0)).length() < 1e-4);
        assert_eq!(mesh.vertices[2].position, mesh.vertices[3].position);
    }

    #[test]
    fn circle_auto_segments() {
        let mut mesh = Mesh::default();
        // 30 * pi / 3 = 31.4 -> 31 segments
        mesh.set_as_circle(Vec2::new(30.0, 12.0), 0.0, std::f32::consts::PI, 0);
        assert_eq!(mesh.len(), 31 * 5);
    }

    #[test]
    fn circle_minimum_three_segments() {
        let mut mesh = Mesh::default();
        mesh.set_as_circle(Vec2::splat(1.0), 0.0, 0.5, 0);
        assert_eq!(mesh.len(), 15);
    }

    #[test]
    fn texture_uses_size_and_registration() {
        let sprite = SpriteData {
            texture_bounds: Rect::new(0.25, 0.0, 0.5, 0.5),
            size: IVec2::new(32, 16),
            registration_point: Vec2::new(16.0, 8.0),
        };
        let mesh = Mesh::from_sprite(&sprite);
        assert_eq!(mesh.vertices[0].position, Vec2::new(16.0, -8.0));
        assert_eq!(mesh.vertices[3].position, Vec2::new(-16.0, 8.0));
        assert_eq!(mesh.vertices[0].tex_coord, Vec2::new(0.5, 0.0));
        assert_eq!(mesh.vertices[1].tex_coord, Vec2::new(0.25, 0.0));
        assert_eq!(mesh.vertices[2].tex_coord, Vec2::new(0.5, 0.5));
        assert_eq!(mesh.vertices[3].tex_coord, Vec2::new(0.25, 0.5));
    }

    #[test]
    fn ribbon_two_vertices_per_point() {
        let mut mesh = Mesh::default();
        let spine = [Vec2::new(0.0, 0.0), Vec2::new(10.0, 0.0), Vec2::new(20.0, 0.0)];
        assert!(mesh.set_as_ribbon(&spine, 4.0).is_ok());
        assert_eq!(mesh.len(), 6);
        assert!((mesh.vertices[0].position - Vec2::new(0.0, 2.0)).length() < 1e-5);
        assert!((mesh.vertices[1].position - Vec2::new(0.0, -2.0)).length() < 1e-5);
        assert_eq!(mesh.vertices[5].tex_coord, Vec2::new(1.0, 1.0));
    }

    #[test]
    fn degenerate_ribbon_leaves_mesh_unchanged() {
        let mut mesh = Mesh::from_box(Rect::new(0.0, 0.0, 1.0, 1.0));
        let before = mesh.clone();

        let err = mesh.set_as_ribbon(&[Vec2::ZERO], 2.0);
        assert_eq!(err, Err(MeshError::DegenerateRibbon { points: 1 }));
        assert_eq!(mesh, before);

        let repeated = [Vec2::ONE, Vec2::ONE, Vec2::new(2.0, 2.0)];
        assert!(mesh.set_as_ribbon(&repeated, 2.0).is_err());
        assert_eq!(mesh, before);
    }

    #[test]
    fn set_color_paints_all() {
        let mut mesh = Mesh::new(5);
        mesh.set_color([10, 20, 30, 255]);
        assert!(mesh.vertices.iter().all(|v| v.color == [10, 20, 30, 255]));
    }
}
