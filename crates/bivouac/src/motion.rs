//! Constant-velocity movement and spinning.

use crate::ecs::{System, World};
use crate::locus::Locus;
use crate::math::Vec2;

/// Units per second, applied to the entity's [`Locus`] position.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Velocity(pub Vec2);

impl Velocity {
    pub fn new(x: f32, y: f32) -> Self {
        Self(Vec2::new(x, y))
    }
}

/// Radians per second, applied to the entity's [`Locus`] rotation.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Spin(pub f32);

/// Moves every (Locus, Velocity) and turns every (Locus, Spin).
#[derive(Debug, Default)]
pub struct MovementSystem;

impl System for MovementSystem {
    fn update(&mut self, world: &mut World, dt: f64) {
        let dt = dt as f32;
        world.query::<(&mut Locus, &Velocity)>(|_, (locus, velocity)| {
            locus.position += velocity.0 * dt;
        });
        world.query::<(&mut Locus, &Spin)>(|_, (locus, spin)| {
            locus.rotation += spin.0 * dt;
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::SystemManager;

    #[test]
    fn velocity_moves_locus() {
        let mut world = World::new();
        let mut systems = SystemManager::new();
        systems.add(MovementSystem);
        let e = world.spawn((Locus::at(1.0, 1.0), Velocity::new(10.0, -4.0)));
        let still = world.spawn((Locus::at(5.0, 5.0),));

        systems.update::<MovementSystem>(&mut world, 0.5);
        assert_eq!(world.component::<Locus>(e).map(|l| l.position), Some(Vec2::new(6.0, -1.0)));
        assert_eq!(world.component::<Locus>(still).map(|l| l.position), Some(Vec2::new(5.0, 5.0)));
    }

    #[test]
    fn spin_turns_locus() {
        let mut world = World::new();
        let mut systems = SystemManager::new();
        systems.add(MovementSystem);
        let e = world.spawn((Locus::default(), Spin(2.0)));
        systems.update::<MovementSystem>(&mut world, 0.25);
        systems.update::<MovementSystem>(&mut world, 0.25);
        assert_eq!(world.component::<Locus>(e).map(|l| l.rotation), Some(1.0));
    }
}
