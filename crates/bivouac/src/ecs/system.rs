//! # System: Per-Frame Logic and Event Routing
//!
//! A system is a plain struct implementing [`System`]. It may keep its own
//! state (a cached geometry list, a tracked-entity list, an animation table)
//! and it reacts to world changes by subscribing to event [`Topic`]s.
//!
//! ## Lifecycle
//!
//! ```text
//! systems.add(RenderSystem::new());      register (construct outside)
//! systems.add(SpriteAnimationSystem::..);
//! systems.configure();                   each system subscribes, once
//! loop {
//!     systems.update::<Movement>(&mut world, dt);   dispatch events, run one
//!     systems.update::<RenderSystem>(&mut world, dt);
//! }
//! ```
//!
//! `configure` runs after every system is registered so one system may rely
//! on another being present. Systems added later are configured on the spot.
//!
//! ## Dispatch
//!
//! Before any system runs, the manager drains the world's event queue and
//! calls [`System::receive`] on every subscriber of each event's topic.
//! Receivers may mutate the world; anything they queue is dispatched in the
//! same pass, so the queue is always empty when `update` starts.
//!
//! Systems run only when asked. [`SystemManager::update_all`] exists for
//! hosts that want registration order, but nothing here assumes one.

use std::any::{Any, TypeId};
use std::collections::HashMap;

use super::event::{Event, Topic};
use super::world::World;

/// Upcasting helper so boxed systems can be downcast to their concrete type.
pub trait AsAny {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// A unit of per-frame logic.
pub trait System: AsAny + 'static {
    /// Declare which events this system wants. Called once.
    fn configure(&mut self, _subscriptions: &mut Subscriptions) {}

    /// Handle one subscribed event.
    fn receive(&mut self, _world: &mut World, _event: &Event) {}

    /// Advance by `dt` seconds.
    fn update(&mut self, world: &mut World, dt: f64);
}

/// The topics one system listens to.
#[derive(Debug, Default)]
pub struct Subscriptions {
    topics: Vec<Topic>,
}

impl Subscriptions {
    /// Listen for `T` being assigned.
    pub fn added<T: 'static>(&mut self) -> &mut Self {
        self.push(Topic::Added(TypeId::of::<T>()))
    }

    /// Listen for `T` being removed (including by destroy).
    pub fn removed<T: 'static>(&mut self) -> &mut Self {
        self.push(Topic::Removed(TypeId::of::<T>()))
    }

    /// Listen for entity destruction.
    pub fn destroyed(&mut self) -> &mut Self {
        self.push(Topic::Destroyed)
    }

    fn push(&mut self, topic: Topic) -> &mut Self {
        if !self.topics.contains(&topic) {
            self.topics.push(topic);
        }
        self
    }

    pub fn contains(&self, topic: Topic) -> bool {
        self.topics.contains(&topic)
    }

    pub fn is_empty(&self) -> bool {
        self.topics.is_empty()
    }
}

struct SystemEntry {
    name: String,
    system: Box<dyn System>,
    subscriptions: Subscriptions,
}

/// Owns the registered systems and routes events to them.
pub struct SystemManager {
    entries: Vec<SystemEntry>,
    index: HashMap<TypeId, usize>,
    configured: bool,
}

impl SystemManager {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            index: HashMap::new(),
            configured: false,
        }
    }

    /// Register a system, returning a handle to it.
    ///
    /// Adding a second system of the same type replaces the first.
    pub fn add<T: System>(&mut self, system: T) -> &mut T {
        let name = short_system_name(std::any::type_name::<T>());
        let mut entry = SystemEntry {
            name,
            system: Box::new(system),
            subscriptions: Subscriptions::default(),
        };
        if self.configured {
            entry.system.configure(&mut entry.subscriptions);
        }

        let slot = match self.index.get(&TypeId::of::<T>()) {
            Some(&i) => {
                log::warn!("Replacing already registered system `{}`", entry.name);
                self.entries[i] = entry;
                i
            }
            None => {
                log::info!("Registered system `{}`", entry.name);
                self.entries.push(entry);
                self.index.insert(TypeId::of::<T>(), self.entries.len() - 1);
                self.entries.len() - 1
            }
        };

        (*self.entries[slot].system)
            .as_any_mut()
            .downcast_mut::<T>()
            .unwrap_or_else(|| panic!("System slot {} does not hold `{}`", slot, std::any::type_name::<T>()))
    }

    /// Let every system subscribe. Only the first call has an effect.
    pub fn configure(&mut self) {
        if self.configured {
            return;
        }
        self.configured = true;
        for entry in &mut self.entries {
            entry.system.configure(&mut entry.subscriptions);
            log::debug!(
                "Configured `{}` with {} subscription(s)",
                entry.name,
                entry.subscriptions.topics.len()
            );
        }
    }

    pub fn is_configured(&self) -> bool {
        self.configured
    }

    /// Deliver every queued event to its subscribers until the queue is empty.
    pub fn dispatch(&mut self, world: &mut World) {
        loop {
            let events = world.drain_events();
            if events.is_empty() {
                break;
            }
            for event in &events {
                let topic = event.topic();
                for entry in &mut self.entries {
                    if entry.subscriptions.contains(topic) {
                        entry.system.receive(world, event);
                    }
                }
            }
        }
    }

    /// Dispatch pending events, then run exactly one system.
    pub fn update<T: System>(&mut self, world: &mut World, dt: f64) {
        self.dispatch(world);
        match self.index.get(&TypeId::of::<T>()) {
            Some(&i) => self.entries[i].system.update(world, dt),
            None => log::warn!(
                "update::<{}>() called but no such system is registered",
                short_system_name(std::any::type_name::<T>())
            ),
        }
    }

    /// Run every system in registration order, dispatching before each.
    pub fn update_all(&mut self, world: &mut World, dt: f64) {
        for i in 0..self.entries.len() {
            self.dispatch(world);
            self.entries[i].system.update(world, dt);
        }
    }

    pub fn system<T: System>(&self) -> Option<&T> {
        let &i = self.index.get(&TypeId::of::<T>())?;
        (*self.entries[i].system).as_any().downcast_ref::<T>()
    }

    pub fn system_mut<T: System>(&mut self) -> Option<&mut T> {
        let &i = self.index.get(&TypeId::of::<T>())?;
        (*self.entries[i].system).as_any_mut().downcast_mut::<T>()
    }

    /// Registered system names, in registration order.
    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for SystemManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Strip the module path and generics from a type name
/// (`bivouac::render::batch::BatchRenderSystem` → `BatchRenderSystem`).
fn short_system_name(full: &str) -> String {
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base).to_string()
}
