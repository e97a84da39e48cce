//! # Locus: 2D Placement With an Optional Parent
//!
//! A [`Locus`] says where an entity sits: position, pivot (registration
//! point), rotation, scale and render layer. An optional `parent` makes the
//! locus relative to another entity's locus.
//!
//! ## Matrix
//!
//! ```text
//! local = T(position + registration) · R(rotation) · S(scale) · T(-registration)
//! world = parent.world · local
//! ```
//!
//! Rotation and scale happen about the registration point, so a sprite whose
//! registration point is its centre spins in place. Mesh vertices are in the
//! locus' local space; the batch renderer multiplies them by the world matrix.
//!
//! A parent chain must be acyclic. If a cycle slips in anyway, composition
//! stops at the first repeated entity and a warning is logged, rather than
//! looping forever.

use crate::ecs::{Entity, World};
use crate::math::{Affine2, Vec2};

/// Position, pivot, rotation, scale and layer of an entity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Locus {
    pub position: Vec2,
    pub registration_point: Vec2,
    /// Radians, clockwise on screen (y-down).
    pub rotation: f32,
    pub scale: Vec2,
    /// Sort key for the batch renderer, lower draws first.
    pub render_layer: i32,
    pub parent: Option<Entity>,
}

impl Locus {
    pub fn new(position: Vec2) -> Self {
        Self {
            position,
            ..Self::default()
        }
    }

    pub fn at(x: f32, y: f32) -> Self {
        Self::new(Vec2::new(x, y))
    }

    pub fn with_rotation(mut self, radians: f32) -> Self {
        self.rotation = radians;
        self
    }

    pub fn with_scale(mut self, scale: Vec2) -> Self {
        self.scale = scale;
        self
    }

    pub fn with_registration(mut self, point: Vec2) -> Self {
        self.registration_point = point;
        self
    }

    pub fn with_layer(mut self, layer: i32) -> Self {
        self.render_layer = layer;
        self
    }

    pub fn with_parent(mut self, parent: Entity) -> Self {
        self.parent = Some(parent);
        self
    }

    /// This locus' transform, ignoring any parent.
    pub fn local_matrix(&self) -> Affine2 {
        Affine2::from_translation(self.position + self.registration_point)
            * Affine2::from_angle(self.rotation)
            * Affine2::from_scale(self.scale)
            * Affine2::from_translation(-self.registration_point)
    }

    /// This locus' transform composed with every ancestor's.
    ///
    /// Parents that are dead or carry no `Locus` end the chain. Prefer
    /// [`world_matrix`] when the owning entity is known, so a cycle back to
    /// it is caught before this locus is composed twice.
    pub fn matrix(&self, world: &World) -> Affine2 {
        self.compose(world, None)
    }

    fn compose(&self, world: &World, owner: Option<Entity>) -> Affine2 {
        let mut matrix = self.local_matrix();
        let mut visited: Vec<Entity> = owner.into_iter().collect();
        let mut next = self.parent;
        while let Some(parent) = next {
            if visited.contains(&parent) {
                log::warn!("Locus parent cycle through {:?}; stopping composition", parent);
                break;
            }
            visited.push(parent);
            let Some(parent_locus) = world.component::<Locus>(parent) else {
                break;
            };
            if std::ptr::eq(parent_locus, self) {
                log::warn!("Locus parent cycle through {:?}; stopping composition", parent);
                break;
            }
            matrix = parent_locus.local_matrix() * matrix;
            next = parent_locus.parent;
        }
        matrix
    }

    /// Transform a local-space point to world space.
    pub fn transform_point(&self, world: &World, point: Vec2) -> Vec2 {
        self.matrix(world).transform_point2(point)
    }
}

impl Default for Locus {
    fn default() -> Self {
        Self {
            position: Vec2::ZERO,
            registration_point: Vec2::ZERO,
            rotation: 0.0,
            scale: Vec2::ONE,
            render_layer: 0,
            parent: None,
        }
    }
}

/// World matrix of `entity`'s locus, or identity if it has none.
pub fn world_matrix(world: &World, entity: Entity) -> Affine2 {
    world
        .component::<Locus>(entity)
        .map(|locus| locus.compose(world, Some(entity)))
        .unwrap_or(Affine2::IDENTITY)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_2;

    fn close(a: Vec2, b: Vec2) -> bool {
        (a - b).length() < 1e-4
    }

    #[test]
    fn translation_only() {
        let world = World::new();
        let locus = Locus::at(10.0, 5.0);
        assert!(close(locus.transform_point(&world, Vec2::new(1.0, 1.0)), Vec2::new(11.0, 6.0)));
    }

    #[test]
    fn rotation_about_registration_point() {
        let world = World::new();
        let locus = Locus::at(0.0, 0.0)
            .with_registration(Vec2::new(1.0, 0.0))
            .with_rotation(FRAC_PI_2);
        // the pivot itself does not move
        assert!(close(locus.transform_point(&world, Vec2::new(1.0, 0.0)), Vec2::new(1.0, 0.0)));
        // the origin swings a quarter turn around (1, 0)
        assert!(close(locus.transform_point(&world, Vec2::ZERO), Vec2::new(1.0, -1.0)));
    }

    #[test]
    fn scale_about_registration_point() {
        let world = World::new();
        let locus = Locus::default()
            .with_registration(Vec2::new(2.0, 2.0))
            .with_scale(Vec2::splat(2.0));
        assert!(close(locus.transform_point(&world, Vec2::new(2.0, 2.0)), Vec2::new(2.0, 2.0)));
        assert!(close(locus.transform_point(&world, Vec2::new(3.0, 2.0)), Vec2::new(4.0, 2.0)));
    }

    #[test]
    fn parent_is_composed() {
        let mut world = World::new();
        let parent = world.spawn((Locus::at(100.0, 0.0).with_rotation(FRAC_PI_2),));
        let child = Locus::at(10.0, 0.0).with_parent(parent);
        // child offset (10, 0) rotated a quarter turn becomes (0, 10)
        assert!(close(child.transform_point(&world, Vec2::ZERO), Vec2::new(100.0, 10.0)));
    }

    #[test]
    fn grandparent_chain() {
        let mut world = World::new();
        let root = world.spawn((Locus::at(1.0, 0.0),));
        let mid = world.spawn((Locus::at(0.0, 2.0).with_parent(root),));
        let leaf = world.spawn((Locus::at(3.0, 3.0).with_parent(mid),));
        let m = world_matrix(&world, leaf);
        assert!(close(m.transform_point2(Vec2::ZERO), Vec2::new(4.0, 5.0)));
    }

    #[test]
    fn dead_parent_ends_chain() {
        let mut world = World::new();
        let parent = world.spawn((Locus::at(50.0, 50.0),));
        world.destroy(parent);
        let child = Locus::at(1.0, 1.0).with_parent(parent);
        assert!(close(child.transform_point(&world, Vec2::ZERO), Vec2::new(1.0, 1.0)));
    }

    #[test]
    fn cycle_terminates() {
        let mut world = World::new();
        let a = world.create();
        let b = world.create();
        world.assign(a, Locus::at(1.0, 0.0).with_parent(b));
        world.assign(b, Locus::at(0.0, 1.0).with_parent(a));
        // each locus is composed once: a then b, or b then a
        assert_eq!(world_matrix(&world, a).translation, Vec2::new(1.0, 1.0));
        assert_eq!(world_matrix(&world, b).translation, Vec2::new(1.0, 1.0));

        let lone = world.create();
        world.assign(lone, Locus::at(2.0, 3.0).with_scale(Vec2::splat(2.0)).with_parent(lone));
        let m = world_matrix(&world, lone);
        assert_eq!(m.translation, Vec2::new(2.0, 3.0));
        assert_eq!(m.matrix2, Affine2::from_scale(Vec2::splat(2.0)).matrix2);

        // a borrowed locus catches its own entity too
        let borrowed = world.component::<Locus>(lone).map(|l| l.matrix(&world));
        assert_eq!(borrowed, Some(m));
    }

    #[test]
    fn missing_locus_is_identity() {
        let mut world = World::new();
        let e = world.create();
        assert_eq!(world_matrix(&world, e), Affine2::IDENTITY);
    }
}
