//! Per-entity closures.
//!
//! A [`ScriptComponent`] holds a closure that runs once per update with the
//! entity, the whole world and `dt`. The closure is taken out of the
//! component while it runs, so it may freely read and write the world,
//! including its own entity. Afterwards it is put back unless the entity was
//! destroyed or a new script was assigned in the meantime.

use std::fmt;

use crate::ecs::{Entity, System, World};

pub type ScriptFn = Box<dyn FnMut(Entity, &mut World, f64) + Send + Sync>;

pub struct ScriptComponent {
    script: Option<ScriptFn>,
}

impl ScriptComponent {
    pub fn new(script: impl FnMut(Entity, &mut World, f64) + Send + Sync + 'static) -> Self {
        Self {
            script: Some(Box::new(script)),
        }
    }

    /// `false` only while the script is running.
    pub fn is_loaded(&self) -> bool {
        self.script.is_some()
    }
}

impl fmt::Debug for ScriptComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScriptComponent")
            .field("loaded", &self.is_loaded())
            .finish()
    }
}

/// Runs every entity's script, in entity order.
#[derive(Debug, Default)]
pub struct ScriptSystem;

impl System for ScriptSystem {
    fn update(&mut self, world: &mut World, dt: f64) {
        for entity in world.entities_with::<ScriptComponent>() {
            let Some(mut script) = world
                .component_mut::<ScriptComponent>(entity)
                .and_then(|c| c.script.take())
            else {
                continue;
            };

            script(entity, world, dt);

            if let Some(component) = world.component_mut::<ScriptComponent>(entity) {
                if component.script.is_none() {
                    component.script = Some(script);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::SystemManager;
    use crate::lifetime::Expires;

    fn systems() -> SystemManager {
        let mut systems = SystemManager::new();
        systems.add(ScriptSystem);
        systems
    }

    #[test]
    fn script_runs_each_update_with_its_entity() {
        let mut world = World::new();
        let mut systems = systems();
        let e = world.create();
        world.assign(e, Expires::after(10.0));
        world.assign(
            e,
            ScriptComponent::new(|me, world, dt| {
                if let Some(expires) = world.component_mut::<Expires>(me) {
                    expires.time -= dt as f32;
                }
            }),
        );

        systems.update::<ScriptSystem>(&mut world, 1.0);
        systems.update::<ScriptSystem>(&mut world, 2.0);
        assert_eq!(world.component::<Expires>(e).map(|x| x.time), Some(7.0));
        assert_eq!(world.component::<ScriptComponent>(e).map(|s| s.is_loaded()), Some(true));
    }

    #[test]
    fn script_may_destroy_its_entity() {
        let mut world = World::new();
        let mut systems = systems();
        let e = world.spawn((ScriptComponent::new(|me, world, _| {
            world.destroy(me);
        }),));
        systems.update::<ScriptSystem>(&mut world, 0.1);
        assert!(!world.is_alive(e));
        // the recycled slot starts clean
        let next = world.create();
        assert!(world.component::<ScriptComponent>(next).is_none());
    }

    #[test]
    fn script_may_replace_itself() {
        let mut world = World::new();
        let mut systems = systems();
        let e = world.spawn((ScriptComponent::new(|me, world, _| {
            world.assign(me, Expires::after(1.0));
            world.assign(
                me,
                ScriptComponent::new(|me, world, _| {
                    world.remove::<Expires>(me);
                }),
            );
        }),));

        systems.update::<ScriptSystem>(&mut world, 0.1);
        assert!(world.has::<Expires>(e));
        systems.update::<ScriptSystem>(&mut world, 0.1);
        assert!(!world.has::<Expires>(e));
    }

    #[test]
    fn scripts_can_spawn() {
        let mut world = World::new();
        let mut systems = systems();
        world.spawn((ScriptComponent::new(|_, world, _| {
            world.spawn((Expires::after(1.0),));
        }),));
        systems.update::<ScriptSystem>(&mut world, 0.1);
        systems.update::<ScriptSystem>(&mut world, 0.1);
        assert_eq!(world.entities_with::<Expires>().len(), 2);
    }
}
