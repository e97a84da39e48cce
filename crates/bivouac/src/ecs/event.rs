//! # Event: Structural Change Notifications
//!
//! Every `assign`, `remove` and `destroy` on the [`World`] appends an [`Event`]
//! to the world's queue. Nothing is delivered immediately: the
//! [`SystemManager`](super::system::SystemManager) drains the queue before
//! each system update and hands each event to the systems that subscribed to
//! its [`Topic`].
//!
//! ```text
//! world.assign(e, Mesh::default())   queue: [Added(e, Mesh)]
//! world.destroy(e)                   queue: [Added(e, Mesh), Removed(e, Mesh),
//!                                            Destroyed(e, {Mesh})]
//! systems.update::<Render>(..)       dispatch: Render sees all three,
//!                                    then Render::update runs
//! ```
//!
//! Events carry plain handles and ids, never component references, so a
//! receiver is free to mutate the world while handling one.

use std::any::TypeId;

use super::component::{ComponentId, ComponentMask};
use super::entity::Entity;
use super::world::World;

/// A structural change to the world.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// A component was attached (or overwritten).
    ComponentAdded { entity: Entity, component: ComponentId },
    /// A component was detached, directly or as part of a destroy.
    ComponentRemoved { entity: Entity, component: ComponentId },
    /// The entity is gone. `mask` lists the families it had at that moment.
    EntityDestroyed { entity: Entity, mask: ComponentMask },
}

impl Event {
    pub fn entity(&self) -> Entity {
        match *self {
            Event::ComponentAdded { entity, .. }
            | Event::ComponentRemoved { entity, .. }
            | Event::EntityDestroyed { entity, .. } => entity,
        }
    }

    /// The subscription topic this event is routed under.
    pub fn topic(&self) -> Topic {
        match *self {
            Event::ComponentAdded { component, .. } => Topic::Added(component.type_id),
            Event::ComponentRemoved { component, .. } => Topic::Removed(component.type_id),
            Event::EntityDestroyed { .. } => Topic::Destroyed,
        }
    }

    /// Returns `true` for a `ComponentAdded` of type `T`.
    pub fn is_added<T: 'static>(&self) -> bool {
        matches!(self, Event::ComponentAdded { component, .. } if component.is::<T>())
    }

    /// Returns `true` for a `ComponentRemoved` of type `T`.
    pub fn is_removed<T: 'static>(&self) -> bool {
        matches!(self, Event::ComponentRemoved { component, .. } if component.is::<T>())
    }

    /// For `EntityDestroyed`, whether the entity had a `T` when it died.
    pub fn had<T: 'static>(&self, world: &World) -> bool {
        match self {
            Event::EntityDestroyed { mask, .. } => world
                .component_id::<T>()
                .is_some_and(|id| mask.has(id)),
            _ => false,
        }
    }
}

/// What a system can subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    Added(TypeId),
    Removed(TypeId),
    Destroyed,
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Mesh;
    struct Locus;

    #[test]
    fn topics_follow_event_kind() {
        let mut world = World::new();
        let e = world.create();
        world.assign(e, Mesh);
        world.remove::<Mesh>(e);
        world.destroy(e);

        let events = world.drain_events();
        let topics: Vec<Topic> = events.iter().map(Event::topic).collect();
        assert_eq!(
            topics,
            vec![
                Topic::Added(TypeId::of::<Mesh>()),
                Topic::Removed(TypeId::of::<Mesh>()),
                Topic::Destroyed,
            ]
        );
        assert!(events.iter().all(|ev| ev.entity() == e));
    }

    #[test]
    fn typed_predicates() {
        let mut world = World::new();
        let e = world.create();
        world.assign(e, Mesh);
        world.assign(e, Locus);
        world.destroy(e);

        let events = world.drain_events();
        assert!(events[0].is_added::<Mesh>());
        assert!(!events[0].is_added::<Locus>());
        assert!(events[2].is_removed::<Mesh>());
        let destroyed = events.last().copied();
        assert!(matches!(destroyed, Some(Event::EntityDestroyed { .. })));
        if let Some(ev) = destroyed {
            assert!(ev.had::<Mesh>(&world));
            assert!(ev.had::<Locus>(&world));
            assert!(!ev.had::<String>(&world));
        }
    }
}
