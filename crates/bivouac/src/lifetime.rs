//! Timed entity removal.

use crate::ecs::{Entity, System, World};

/// Seconds left before the entity is destroyed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Expires {
    pub time: f32,
}

impl Expires {
    pub fn after(seconds: f32) -> Self {
        Self { time: seconds }
    }
}

/// Counts down every [`Expires`] and destroys entities that reach zero.
#[derive(Debug, Default)]
pub struct ExpiresSystem;

impl System for ExpiresSystem {
    fn update(&mut self, world: &mut World, dt: f64) {
        let dt = dt as f32;
        let mut expired: Vec<Entity> = Vec::new();
        world.query::<(&mut Expires,)>(|entity, (expires,)| {
            expires.time -= dt;
            if expires.time <= 0.0 {
                expired.push(entity);
            }
        });
        for entity in expired {
            world.destroy(entity);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::SystemManager;

    #[test]
    fn destroys_when_time_runs_out() {
        let mut world = World::new();
        let mut systems = SystemManager::new();
        systems.add(ExpiresSystem);
        let short = world.spawn((Expires::after(0.3),));
        let long = world.spawn((Expires::after(1.0),));

        systems.update::<ExpiresSystem>(&mut world, 0.2);
        assert!(world.is_alive(short));
        assert_eq!(world.component::<Expires>(long).map(|e| e.time), Some(0.8));

        systems.update::<ExpiresSystem>(&mut world, 0.2);
        assert!(!world.is_alive(short));
        assert!(world.is_alive(long));
    }

    #[test]
    fn zero_time_expires_on_first_update() {
        let mut world = World::new();
        let mut systems = SystemManager::new();
        systems.add(ExpiresSystem);
        let e = world.spawn((Expires::after(0.0),));
        systems.update::<ExpiresSystem>(&mut world, 0.0);
        assert!(!world.is_alive(e));
    }
}
