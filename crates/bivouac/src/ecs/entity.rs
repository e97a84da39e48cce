//! # Entity: Opaque Handles With Generations
//!
//! An [`Entity`] carries no data of its own. The [`World`](super::world::World)
//! associates it with components, systems look those components up, and when
//! the entity is destroyed every attached component is released in one go.
//!
//! ## Generations
//!
//! Slots are recycled, so a handle is a slot index plus the generation the
//! slot had when the handle was issued:
//!
//! ```text
//! create()          -> Entity { index: 3, generation: 0 }
//! destroy(3v0)         slot 3 generation becomes 1, slot goes to the free list
//! create()          -> Entity { index: 3, generation: 1 }
//! component(3v0)    -> None   (stale handle)
//! ```
//!
//! Systems that cache handles (the batch renderer, the sprite animator) rely
//! on this: a handle kept past a destroy can never alias the next occupant of
//! the slot.

use std::fmt;

/// A lightweight handle to an entity in the [`World`](super::world::World).
///
/// Only valid for the world that created it, and only while its generation
/// matches the slot's current generation.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Entity {
    /// Slot index. Recycled after destroy.
    pub(crate) index: u32,
    /// Bumped every time the slot is freed.
    pub(crate) generation: u32,
}

impl Entity {
    /// Returns the raw slot index.
    pub fn index(self) -> u32 {
        self.index
    }

    /// Returns the generation.
    pub fn generation(self) -> u32 {
        self.generation
    }
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Entity({}v{})", self.index, self.generation)
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}v{}", self.index, self.generation)
    }
}

/// Hands out entity slots and recycles them.
///
/// ```text
/// generations: [0, 1, 0, 2]   one per slot ever handed out
/// free_list:   [1, 3]         slots waiting for reuse (LIFO)
/// ```
pub(crate) struct EntityAllocator {
    generations: Vec<u32>,
    free_list: Vec<u32>,
}

impl EntityAllocator {
    pub fn new() -> Self {
        Self {
            generations: Vec::new(),
            free_list: Vec::new(),
        }
    }

    /// Allocate a handle, reusing the most recently freed slot if any.
    pub fn allocate(&mut self) -> Entity {
        if let Some(index) = self.free_list.pop() {
            let generation = self.generations[index as usize];
            Entity { index, generation }
        } else {
            let index = self.generations.len() as u32;
            self.generations.push(0);
            Entity {
                index,
                generation: 0,
            }
        }
    }

    /// Free a handle's slot. Returns `false` if the handle was already stale.
    pub fn deallocate(&mut self, entity: Entity) -> bool {
        if !self.is_alive(entity) {
            return false;
        }
        self.generations[entity.index as usize] += 1;
        self.free_list.push(entity.index);
        true
    }

    pub fn is_alive(&self, entity: Entity) -> bool {
        self.generations
            .get(entity.index as usize)
            .is_some_and(|&generation| generation == entity.generation)
    }

    pub fn alive_count(&self) -> usize {
        self.generations.len() - self.free_list.len()
    }

    /// Total number of slots ever handed out.
    pub fn slot_count(&self) -> usize {
        self.generations.len()
    }
}
