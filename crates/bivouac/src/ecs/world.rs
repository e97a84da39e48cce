//! # World: Entity/Component Registry
//!
//! The [`World`] owns every entity, every component and every resource. It is
//! the only place structural changes happen, and each one is recorded as an
//! [`Event`] for the systems to react to.
//!
//! ## Layout
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │ World                                                    │
//! │                                                          │
//! │  allocator   generational slot handout                   │
//! │  records     slot -> (live Entity, ComponentMask)        │
//! │  families    TypeId -> ComponentId   (at most 64)        │
//! │  pools       TypeId -> ComponentPool (sparse set)        │
//! │  events      Vec<Event>, drained by the SystemManager    │
//! │  resources   TypeId -> Box<dyn Any>  (singletons)        │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Operations
//!
//! | call | effect | event |
//! |---|---|---|
//! | `create()` | new handle | none |
//! | `assign(e, T)` | attach or overwrite | `ComponentAdded` |
//! | `component::<T>(e)` | `Option<&T>` | none |
//! | `remove::<T>(e)` | detach, `Option<T>` | `ComponentRemoved` if present |
//! | `destroy(e)` | detach all, free slot | one `ComponentRemoved` each, then `EntityDestroyed` |
//!
//! ## Resources
//!
//! Resources are singletons not tied to an entity: the GPU context, input
//! state, frame timing. Use the extract/reinsert pattern
//! ([`resource_remove`](World::resource_remove) then
//! [`insert_resource`](World::insert_resource)) when a resource and the rest
//! of the world are needed at the same time.

use std::any::{Any, TypeId};
use std::collections::HashMap;

use super::component::{ComponentId, ComponentMask, ComponentPool, MAX_COMPONENTS};
use super::entity::{Entity, EntityAllocator};
use super::event::Event;
use super::query::QueryParam;

/// Per-slot bookkeeping for a live entity.
#[derive(Clone, Copy)]
struct EntityRecord {
    entity: Entity,
    mask: ComponentMask,
}

/// The entity/component registry plus global resources.
pub struct World {
    allocator: EntityAllocator,
    records: Vec<Option<EntityRecord>>,
    families: HashMap<TypeId, ComponentId>,
    pools: HashMap<TypeId, ComponentPool>,
    events: Vec<Event>,
    resources: HashMap<TypeId, Box<dyn Any>>,
}

impl World {
    pub fn new() -> Self {
        Self {
            allocator: EntityAllocator::new(),
            records: Vec::new(),
            families: HashMap::new(),
            pools: HashMap::new(),
            events: Vec::new(),
            resources: HashMap::new(),
        }
    }

    // ── Resources ────────────────────────────────────────────────────

    /// Insert a resource, replacing any existing one of the same type.
    pub fn insert_resource<T: 'static + Send + Sync>(&mut self, value: T) {
        self.resources.insert(TypeId::of::<T>(), Box::new(value));
    }

    /// Get a shared reference to a resource.
    ///
    /// # Panics
    ///
    /// Panics if the resource hasn't been inserted.
    pub fn resource<T: 'static + Send + Sync>(&self) -> &T {
        self.get_resource::<T>().unwrap_or_else(|| {
            panic!(
                "Resource `{}` not found. Did you forget to insert it?",
                std::any::type_name::<T>()
            )
        })
    }

    /// Get a mutable reference to a resource.
    ///
    /// # Panics
    ///
    /// Panics if the resource hasn't been inserted.
    pub fn resource_mut<T: 'static + Send + Sync>(&mut self) -> &mut T {
        self.get_resource_mut::<T>().unwrap_or_else(|| {
            panic!(
                "Resource `{}` not found. Did you forget to insert it?",
                std::any::type_name::<T>()
            )
        })
    }

    pub fn get_resource<T: 'static + Send + Sync>(&self) -> Option<&T> {
        self.resources
            .get(&TypeId::of::<T>())
            .and_then(|r| r.downcast_ref::<T>())
    }

    pub fn get_resource_mut<T: 'static + Send + Sync>(&mut self) -> Option<&mut T> {
        self.resources
            .get_mut(&TypeId::of::<T>())
            .and_then(|r| r.downcast_mut::<T>())
    }

    pub fn has_resource<T: 'static + Send + Sync>(&self) -> bool {
        self.resources.contains_key(&TypeId::of::<T>())
    }

    /// Remove a resource, taking ownership. Returns `None` if not present.
    pub fn resource_remove<T: 'static + Send + Sync>(&mut self) -> Option<T> {
        self.resources
            .remove(&TypeId::of::<T>())
            .and_then(|r| r.downcast::<T>().ok())
            .map(|b| *b)
    }

    // ── Component Families ───────────────────────────────────────────

    /// Return the family for `T`, assigning the next free one on first use.
    ///
    /// # Panics
    ///
    /// Panics if `T` would be the 65th distinct component type.
    pub fn register<T: 'static + Send + Sync>(&mut self) -> ComponentId {
        let type_id = TypeId::of::<T>();
        if let Some(&id) = self.families.get(&type_id) {
            return id;
        }
        let next = self.families.len();
        if next >= MAX_COMPONENTS {
            panic!(
                "Component type limit of {} reached while registering `{}`",
                MAX_COMPONENTS,
                std::any::type_name::<T>()
            );
        }
        let id = ComponentId {
            index: next as u8,
            type_id,
            name: std::any::type_name::<T>(),
        };
        self.families.insert(type_id, id);
        self.pools.insert(type_id, ComponentPool::new(id));
        log::debug!("registered component family {:?}", id);
        id
    }

    /// The family of `T`, if the world has seen it.
    pub fn component_id<T: 'static>(&self) -> Option<ComponentId> {
        self.families.get(&TypeId::of::<T>()).copied()
    }

    /// Number of distinct component types registered so far.
    pub fn family_count(&self) -> usize {
        self.families.len()
    }

    // ── Entities ─────────────────────────────────────────────────────

    /// Create an entity with no components.
    pub fn create(&mut self) -> Entity {
        let entity = self.allocator.allocate();
        let slot = entity.index as usize;
        if self.records.len() <= slot {
            self.records.resize(slot + 1, None);
        }
        self.records[slot] = Some(EntityRecord {
            entity,
            mask: ComponentMask::EMPTY,
        });
        entity
    }

    fn record(&self, entity: Entity) -> Option<&EntityRecord> {
        self.records
            .get(entity.index as usize)
            .and_then(Option::as_ref)
            .filter(|r| r.entity == entity)
    }

    fn record_mut(&mut self, entity: Entity) -> Option<&mut EntityRecord> {
        self.records
            .get_mut(entity.index as usize)
            .and_then(Option::as_mut)
            .filter(|r| r.entity == entity)
    }

    pub fn is_alive(&self, entity: Entity) -> bool {
        self.allocator.is_alive(entity) && self.record(entity).is_some()
    }

    pub fn entity_count(&self) -> usize {
        self.allocator.alive_count()
    }

    /// The families attached to `entity`, or `None` if it is dead.
    pub fn mask(&self, entity: Entity) -> Option<ComponentMask> {
        self.record(entity).map(|r| r.mask)
    }

    /// All live entities in ascending slot order.
    pub fn entities(&self) -> Vec<Entity> {
        self.records.iter().flatten().map(|r| r.entity).collect()
    }

    /// Destroy an entity: detach every component, free the slot.
    ///
    /// Queues one `ComponentRemoved` per component (in family order) and then
    /// `EntityDestroyed`. Returns `false` if the handle was already dead.
    pub fn destroy(&mut self, entity: Entity) -> bool {
        let Some(record) = self.record(entity).copied() else {
            return false;
        };

        let mut ids: Vec<ComponentId> = self
            .families
            .values()
            .copied()
            .filter(|id| record.mask.has(*id))
            .collect();
        ids.sort_by_key(|id| id.index);

        for id in ids {
            if let Some(pool) = self.pools.get_mut(&id.type_id) {
                drop(pool.remove_any(entity.index));
            }
            self.events.push(Event::ComponentRemoved {
                entity,
                component: id,
            });
        }
        self.events.push(Event::EntityDestroyed {
            entity,
            mask: record.mask,
        });

        self.records[entity.index as usize] = None;
        self.allocator.deallocate(entity);
        true
    }

    /// Destroy every live entity.
    pub fn destroy_all(&mut self) {
        for entity in self.entities() {
            self.destroy(entity);
        }
    }

    // ── Components ───────────────────────────────────────────────────

    /// Attach `component` to `entity`, overwriting any previous `T`.
    ///
    /// Always queues `ComponentAdded`, including on overwrite.
    ///
    /// # Panics
    ///
    /// Panics if the entity is not alive.
    pub fn assign<T: 'static + Send + Sync>(&mut self, entity: Entity, component: T) -> &mut T {
        assert!(
            self.is_alive(entity),
            "Cannot assign component `{}` to dead entity {:?}",
            std::any::type_name::<T>(),
            entity
        );
        let id = self.register::<T>();
        if let Some(record) = self.record_mut(entity) {
            record.mask.insert(id);
        }
        self.events.push(Event::ComponentAdded {
            entity,
            component: id,
        });
        self.pool_mut(id).insert(entity.index, component)
    }

    /// Shared access to `entity`'s `T`. `None` if dead or absent.
    pub fn component<T: 'static + Send + Sync>(&self, entity: Entity) -> Option<&T> {
        if !self.is_alive(entity) {
            return None;
        }
        self.pools.get(&TypeId::of::<T>())?.get::<T>(entity.index)
    }

    /// Mutable access to `entity`'s `T`. `None` if dead or absent.
    pub fn component_mut<T: 'static + Send + Sync>(&mut self, entity: Entity) -> Option<&mut T> {
        if !self.is_alive(entity) {
            return None;
        }
        self.pools
            .get_mut(&TypeId::of::<T>())?
            .get_mut::<T>(entity.index)
    }

    pub fn has<T: 'static + Send + Sync>(&self, entity: Entity) -> bool {
        match (self.component_id::<T>(), self.mask(entity)) {
            (Some(id), Some(mask)) => mask.has(id),
            _ => false,
        }
    }

    /// Detach and return `entity`'s `T`, queueing `ComponentRemoved`.
    ///
    /// Returns `None` without an event if the entity is dead or has no `T`.
    pub fn remove<T: 'static + Send + Sync>(&mut self, entity: Entity) -> Option<T> {
        let id = self.component_id::<T>()?;
        let record = self.record_mut(entity)?;
        if !record.mask.has(id) {
            return None;
        }
        record.mask.remove(id);
        self.events.push(Event::ComponentRemoved {
            entity,
            component: id,
        });
        self.pool_mut(id).remove::<T>(entity.index)
    }

    /// Every live entity holding a `T`, in ascending slot order.
    pub fn entities_with<T: 'static + Send + Sync>(&self) -> Vec<Entity> {
        let Some(pool) = self.pools.get(&TypeId::of::<T>()) else {
            return Vec::new();
        };
        let mut indices = pool.entity_indices().to_vec();
        indices.sort_unstable();
        indices
            .into_iter()
            .filter_map(|i| self.records.get(i as usize).copied().flatten())
            .map(|r| r.entity)
            .collect()
    }

    fn pool_mut(&mut self, id: ComponentId) -> &mut ComponentPool {
        self.pools
            .entry(id.type_id)
            .or_insert_with(|| ComponentPool::new(id))
    }

    // ── Events ───────────────────────────────────────────────────────

    /// Take every queued event, oldest first.
    pub fn drain_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }

    pub fn pending_events(&self) -> &[Event] {
        &self.events
    }

    // ── Query ────────────────────────────────────────────────────────

    /// Run `f` for every entity holding all of `Q`'s component types, in
    /// ascending slot order.
    ///
    /// # Example
    ///
    /// ```ignore
    /// world.query::<(&mut Locus, &Velocity)>(|_entity, (locus, velocity)| {
    ///     locus.position += velocity.0 * dt;
    /// });
    /// ```
    pub fn query<Q: QueryParam>(&mut self, mut f: impl FnMut(Entity, Q::Item<'_>)) {
        let mut required = ComponentMask::EMPTY;
        for type_id in Q::type_ids() {
            match self.families.get(&type_id) {
                Some(&id) => required.insert(id),
                None => return,
            }
        }

        let matching: Vec<Entity> = self
            .records
            .iter()
            .flatten()
            .filter(|r| r.mask.contains(required))
            .map(|r| r.entity)
            .collect();
        if matching.is_empty() {
            return;
        }

        let mut taken = Q::extract(&mut self.pools);
        for entity in matching {
            f(entity, Q::fetch(&mut taken, entity.index));
        }
        Q::restore(taken, &mut self.pools);
    }

    /// Entities holding all of `Q`'s component types, without fetching.
    pub fn matching<Q: QueryParam>(&self) -> Vec<Entity> {
        let mut required = ComponentMask::EMPTY;
        for type_id in Q::type_ids() {
            match self.families.get(&type_id) {
                Some(&id) => required.insert(id),
                None => return Vec::new(),
            }
        }
        self.records
            .iter()
            .flatten()
            .filter(|r| r.mask.contains(required))
            .map(|r| r.entity)
            .collect()
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

// ── Spawn Bundles ────────────────────────────────────────────────────────

/// A tuple of components that can be assigned in one call.
pub trait SpawnBundle {
    fn assign_into(self, world: &mut World, entity: Entity);
}

macro_rules! impl_spawn_bundle {
    ($($T:ident),+) => {
        impl<$($T: 'static + Send + Sync),+> SpawnBundle for ($($T,)+) {
            #[allow(non_snake_case)]
            fn assign_into(self, world: &mut World, entity: Entity) {
                let ($($T,)+) = self;
                $(world.assign(entity, $T);)+
            }
        }
    };
}

impl_spawn_bundle!(A);
impl_spawn_bundle!(A, B);
impl_spawn_bundle!(A, B, C);
impl_spawn_bundle!(A, B, C, D);
impl_spawn_bundle!(A, B, C, D, E);
impl_spawn_bundle!(A, B, C, D, E, F);
impl_spawn_bundle!(A, B, C, D, E, F, G);
impl_spawn_bundle!(A, B, C, D, E, F, G, H);

impl World {
    /// Create an entity and assign each component of the bundle in order.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let e = world.spawn((Locus::at(10.0, 20.0), Mesh::default()));
    /// ```
    pub fn spawn<B: SpawnBundle>(&mut self, bundle: B) -> Entity {
        let entity = self.create();
        bundle.assign_into(self, entity);
        entity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Position {
        x: f32,
        y: f32,
    }
    #[derive(Debug, PartialEq)]
    struct Velocity {
        dx: f32,
        dy: f32,
    }
    #[derive(Debug, PartialEq)]
    struct Health(u32);

    #[test]
    fn create_assign_and_read() {
        let mut world = World::new();
        let e = world.create();
        world.assign(e, Position { x: 1.0, y: 2.0 });
        assert_eq!(
            world.component::<Position>(e),
            Some(&Position { x: 1.0, y: 2.0 })
        );
        assert!(world.component::<Velocity>(e).is_none());
        assert!(world.has::<Position>(e));
        assert!(!world.has::<Velocity>(e));
    }

    #[test]
    fn assign_overwrites_and_emits_each_time() {
        let mut world = World::new();
        let e = world.create();
        world.assign(e, Health(10));
        world.assign(e, Health(20));
        assert_eq!(world.component::<Health>(e), Some(&Health(20)));

        let events = world.drain_events();
        assert_eq!(events.len(), 2);
        assert!(events.iter().all(|ev| ev.is_added::<Health>()));
    }

    #[test]
    fn assign_returns_mutable_ref() {
        let mut world = World::new();
        let e = world.create();
        world.assign(e, Health(1)).0 += 4;
        assert_eq!(world.component::<Health>(e), Some(&Health(5)));
    }

    #[test]
    fn remove_returns_value_and_emits() {
        let mut world = World::new();
        let e = world.create();
        world.assign(e, Health(7));
        world.drain_events();

        assert_eq!(world.remove::<Health>(e), Some(Health(7)));
        assert!(world.component::<Health>(e).is_none());
        let events = world.drain_events();
        assert_eq!(events.len(), 1);
        assert!(events[0].is_removed::<Health>());

        // absent: no value, no event
        assert_eq!(world.remove::<Health>(e), None);
        assert!(world.pending_events().is_empty());
    }

    #[test]
    fn destroy_releases_components_and_emits_in_order() {
        let mut world = World::new();
        let e = world.spawn((Position { x: 0.0, y: 0.0 }, Velocity { dx: 1.0, dy: 1.0 }));
        world.drain_events();

        assert!(world.destroy(e));
        assert!(!world.is_alive(e));
        assert!(world.component::<Position>(e).is_none());
        assert_eq!(world.entity_count(), 0);

        let events = world.drain_events();
        assert_eq!(events.len(), 3);
        assert!(events[0].is_removed::<Position>());
        assert!(events[1].is_removed::<Velocity>());
        match events[2] {
            Event::EntityDestroyed { entity, mask } => {
                assert_eq!(entity, e);
                assert_eq!(mask.count(), 2);
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn destroy_stale_handle_is_noop() {
        let mut world = World::new();
        let e = world.create();
        assert!(world.destroy(e));
        world.drain_events();
        assert!(!world.destroy(e));
        assert!(world.pending_events().is_empty());
    }

    #[test]
    fn recycled_slot_does_not_inherit_components() {
        let mut world = World::new();
        let old = world.create();
        world.assign(old, Health(3));
        world.destroy(old);

        let new = world.create();
        assert_eq!(new.index(), old.index());
        assert_ne!(new.generation(), old.generation());
        assert!(world.component::<Health>(new).is_none());
        assert!(world.component::<Health>(old).is_none());
        assert_eq!(world.mask(new), Some(ComponentMask::EMPTY));
    }

    #[test]
    fn query_matches_supersets_in_slot_order() {
        let mut world = World::new();
        let a = world.spawn((Position { x: 1.0, y: 0.0 }, Velocity { dx: 1.0, dy: 0.0 }));
        let _b = world.spawn((Position { x: 2.0, y: 0.0 },));
        let c = world.spawn((
            Velocity { dx: 3.0, dy: 0.0 },
            Position { x: 3.0, y: 0.0 },
            Health(1),
        ));

        let mut seen = Vec::new();
        world.query::<(&mut Position, &Velocity)>(|e, (p, v)| {
            p.x += v.dx;
            seen.push(e);
        });
        assert_eq!(seen, vec![a, c]);
        assert_eq!(world.component::<Position>(a).map(|p| p.x), Some(2.0));
        assert_eq!(world.component::<Position>(c).map(|p| p.x), Some(6.0));
        assert_eq!(world.matching::<(&Position, &Velocity)>(), vec![a, c]);
    }

    #[test]
    fn query_unknown_type_matches_nothing() {
        let mut world = World::new();
        world.spawn((Position { x: 0.0, y: 0.0 },));
        let mut count = 0;
        world.query::<(&Position, &Health)>(|_, _| count += 1);
        assert_eq!(count, 0);
    }

    #[test]
    fn pools_survive_query() {
        let mut world = World::new();
        let e = world.spawn((Health(1),));
        world.query::<(&mut Health,)>(|_, (h,)| h.0 = 9);
        world.query::<(&Health,)>(|_, (h,)| assert_eq!(h.0, 9));
        assert_eq!(world.component::<Health>(e), Some(&Health(9)));
    }

    #[test]
    fn entities_with_is_sorted() {
        let mut world = World::new();
        let a = world.create();
        let b = world.create();
        let c = world.create();
        world.assign(c, Health(3));
        world.assign(a, Health(1));
        world.assign(b, Position { x: 0.0, y: 0.0 });
        assert_eq!(world.entities_with::<Health>(), vec![a, c]);
        world.remove::<Health>(a);
        assert_eq!(world.entities_with::<Health>(), vec![c]);
    }

    #[test]
    #[should_panic(expected = "Cannot assign component")]
    fn assign_to_dead_entity_panics() {
        let mut world = World::new();
        let e = world.create();
        world.destroy(e);
        world.assign(e, Health(1));
    }

    struct Marker<const N: usize>;

    macro_rules! register_markers {
        ($world:ident; $($n:literal)*) => {
            $( $world.register::<Marker<$n>>(); )*
        };
    }

    #[test]
    fn sixty_four_families_fit() {
        let mut world = World::new();
        register_markers!(world;
            0 1 2 3 4 5 6 7 8 9 10 11 12 13 14 15
            16 17 18 19 20 21 22 23 24 25 26 27 28 29 30 31
            32 33 34 35 36 37 38 39 40 41 42 43 44 45 46 47
            48 49 50 51 52 53 54 55 56 57 58 59 60 61 62 63);
        assert_eq!(world.family_count(), MAX_COMPONENTS);
        // re-registering a known type is fine
        world.register::<Marker<0>>();
    }

    #[test]
    #[should_panic(expected = "Component type limit of 64")]
    fn sixty_fifth_family_panics() {
        let mut world = World::new();
        register_markers!(world;
            0 1 2 3 4 5 6 7 8 9 10 11 12 13 14 15
            16 17 18 19 20 21 22 23 24 25 26 27 28 29 30 31
            32 33 34 35 36 37 38 39 40 41 42 43 44 45 46 47
            48 49 50 51 52 53 54 55 56 57 58 59 60 61 62 63 64);
    }

    #[test]
    fn resources_insert_and_remove() {
        let mut world = World::new();
        world.insert_resource(Health(100));
        assert_eq!(world.resource::<Health>().0, 100);
        world.resource_mut::<Health>().0 -= 1;
        assert_eq!(world.get_resource::<Health>(), Some(&Health(99)));
        assert_eq!(world.resource_remove::<Health>(), Some(Health(99)));
        assert!(!world.has_resource::<Health>());
    }

    #[test]
    #[should_panic(expected = "Did you forget to insert it?")]
    fn missing_resource_panics() {
        let world = World::new();
        world.resource::<Health>();
    }
}
