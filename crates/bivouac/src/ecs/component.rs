//! # Component: Families, Masks and Per-Type Pools
//!
//! Components are plain data: a `Locus`, a `Mesh`, a `Velocity`. Any
//! `'static + Send + Sync` type qualifies. The first time a world sees a type
//! it assigns it a *family*, a small integer below [`MAX_COMPONENTS`]. Each
//! entity carries a [`ComponentMask`] with one bit per family, so "does this
//! entity have Locus and Mesh?" is a single AND.
//!
//! ## Storage
//!
//! Each family owns one [`ComponentPool`], a sparse set:
//!
//! ```text
//! sparse:   [None, Some(1), None, Some(0)]   entity index -> dense row
//! entities: [3, 1]                           dense row -> entity index
//! dense:    [Box<T>, Box<T>]                 the component values
//! ```
//!
//! Insert pushes onto `dense`; remove swap-removes and patches the sparse
//! entry of whichever entity moved into the hole. Values are boxed as
//! `dyn Any` and downcast on access, which keeps the whole ECS free of
//! `unsafe` at the cost of one pointer hop per lookup.

use std::any::{Any, TypeId};
use std::fmt;

/// Upper bound on distinct component types per world.
pub const MAX_COMPONENTS: usize = 64;

/// Identifies a component family within one [`World`](super::world::World).
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ComponentId {
    pub(crate) index: u8,
    pub(crate) type_id: TypeId,
    pub(crate) name: &'static str,
}

impl ComponentId {
    /// The family index (bit position in a [`ComponentMask`]).
    pub fn index(self) -> usize {
        self.index as usize
    }

    /// The Rust type behind this family.
    pub fn type_id(self) -> TypeId {
        self.type_id
    }

    /// Short type name, for logs.
    pub fn name(self) -> &'static str {
        self.name.rsplit("::").next().unwrap_or(self.name)
    }

    /// Returns `true` if this family stores values of type `T`.
    pub fn is<T: 'static>(self) -> bool {
        self.type_id == TypeId::of::<T>()
    }
}

impl fmt::Debug for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ComponentId({}: {})", self.index, self.name())
    }
}

/// One bit per component family.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ComponentMask(u64);

impl ComponentMask {
    pub const EMPTY: Self = Self(0);

    pub fn insert(&mut self, id: ComponentId) {
        self.0 |= 1 << id.index;
    }

    pub fn remove(&mut self, id: ComponentId) {
        self.0 &= !(1 << id.index);
    }

    pub fn has(self, id: ComponentId) -> bool {
        self.0 & (1 << id.index) != 0
    }

    /// Returns `true` if every bit set in `other` is also set here.
    pub fn contains(self, other: ComponentMask) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn count(self) -> u32 {
        self.0.count_ones()
    }

    /// Family indices present in the mask, ascending.
    pub fn indices(self) -> impl Iterator<Item = usize> {
        (0..MAX_COMPONENTS).filter(move |i| self.0 & (1 << i) != 0)
    }

    pub fn bits(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for ComponentMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ComponentMask({:#b})", self.0)
    }
}

/// Sparse-set storage for one component family.
pub struct ComponentPool {
    id: ComponentId,
    dense: Vec<Box<dyn Any + Send + Sync>>,
    entities: Vec<u32>,
    sparse: Vec<Option<usize>>,
}

impl ComponentPool {
    pub fn new(id: ComponentId) -> Self {
        Self {
            id,
            dense: Vec::new(),
            entities: Vec::new(),
            sparse: Vec::new(),
        }
    }

    pub fn id(&self) -> ComponentId {
        self.id
    }

    fn row(&self, index: u32) -> Option<usize> {
        self.sparse.get(index as usize).copied().flatten()
    }

    pub fn contains(&self, index: u32) -> bool {
        self.row(index).is_some()
    }

    /// Store `value` for the entity slot, replacing any previous value.
    ///
    /// # Panics
    ///
    /// Panics if `T` is not the pool's type.
    pub fn insert<T: 'static + Send + Sync>(&mut self, index: u32, value: T) -> &mut T {
        let row = match self.row(index) {
            Some(row) => {
                self.dense[row] = Box::new(value);
                row
            }
            None => {
                let slot = index as usize;
                if self.sparse.len() <= slot {
                    self.sparse.resize(slot + 1, None);
                }
                self.sparse[slot] = Some(self.dense.len());
                self.dense.push(Box::new(value));
                self.entities.push(index);
                self.dense.len() - 1
            }
        };
        self.downcast_mut(row)
    }

    pub fn get<T: 'static>(&self, index: u32) -> Option<&T> {
        let row = self.row(index)?;
        Some(self.downcast_ref(row))
    }

    pub fn get_mut<T: 'static>(&mut self, index: u32) -> Option<&mut T> {
        let row = self.row(index)?;
        Some(self.downcast_mut(row))
    }

    /// Remove the entity's value as a boxed `Any`.
    pub fn remove_any(&mut self, index: u32) -> Option<Box<dyn Any + Send + Sync>> {
        let row = self.row(index)?;
        self.sparse[index as usize] = None;
        let value = self.dense.swap_remove(row);
        self.entities.swap_remove(row);
        if let Some(&moved) = self.entities.get(row) {
            self.sparse[moved as usize] = Some(row);
        }
        Some(value)
    }

    /// Remove and return the entity's value.
    pub fn remove<T: 'static>(&mut self, index: u32) -> Option<T> {
        let boxed = self.remove_any(index)?;
        match boxed.downcast::<T>() {
            Ok(value) => Some(*value),
            Err(_) => panic!(
                "Component type mismatch: `{}` requested from pool `{}`",
                std::any::type_name::<T>(),
                self.id.name
            ),
        }
    }

    /// Entity slot indices currently stored, in dense order.
    pub fn entity_indices(&self) -> &[u32] {
        &self.entities
    }

    pub fn len(&self) -> usize {
        self.dense.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dense.is_empty()
    }

    fn downcast_ref<T: 'static>(&self, row: usize) -> &T {
        self.dense[row].downcast_ref().unwrap_or_else(|| {
            panic!(
                "Component type mismatch: expected `{}` in pool `{}`",
                std::any::type_name::<T>(),
                self.id.name
            )
        })
    }

    fn downcast_mut<T: 'static>(&mut self, row: usize) -> &mut T {
        let name = self.id.name;
        self.dense[row].downcast_mut().unwrap_or_else(|| {
            panic!(
                "Component type mismatch: expected `{}` in pool `{}`",
                std::any::type_name::<T>(),
                name
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id_of<T: 'static>(index: u8) -> ComponentId {
        ComponentId {
            index,
            type_id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    #[test]
    fn insert_and_get() {
        let mut pool = ComponentPool::new(id_of::<f32>(0));
        pool.insert(4, 1.5f32);
        pool.insert(0, 2.5f32);
        assert_eq!(pool.get::<f32>(4), Some(&1.5));
        assert_eq!(pool.get::<f32>(0), Some(&2.5));
        assert_eq!(pool.get::<f32>(2), None);
        assert_eq!(pool.len(), 2);
    }

    #[test]
    fn insert_overwrites() {
        let mut pool = ComponentPool::new(id_of::<u32>(0));
        pool.insert(1, 10u32);
        *pool.insert(1, 20u32) += 1;
        assert_eq!(pool.len(), 1);
        assert_eq!(pool.get::<u32>(1), Some(&21));
    }

    #[test]
    fn remove_patches_moved_entity() {
        let mut pool = ComponentPool::new(id_of::<u32>(0));
        pool.insert(0, 10u32);
        pool.insert(1, 20u32);
        pool.insert(2, 30u32);
        assert_eq!(pool.remove::<u32>(0), Some(10));
        // entity 2 moved into row 0
        assert_eq!(pool.entity_indices(), &[2, 1]);
        assert_eq!(pool.get::<u32>(2), Some(&30));
        assert_eq!(pool.get::<u32>(1), Some(&20));
        assert!(!pool.contains(0));
        assert_eq!(pool.remove::<u32>(0), None);
    }

    #[test]
    #[should_panic(expected = "Component type mismatch")]
    fn wrong_type_panics() {
        let mut pool = ComponentPool::new(id_of::<u32>(0));
        pool.insert(0, 1u32);
        let _ = pool.get::<f32>(0);
    }

    #[test]
    fn mask_operations() {
        let a = id_of::<u8>(0);
        let b = id_of::<u16>(5);
        let c = id_of::<u32>(63);
        let mut mask = ComponentMask::EMPTY;
        mask.insert(a);
        mask.insert(c);
        assert!(mask.has(a) && mask.has(c) && !mask.has(b));
        assert_eq!(mask.indices().collect::<Vec<_>>(), vec![0, 63]);

        let mut wanted = ComponentMask::EMPTY;
        wanted.insert(c);
        assert!(mask.contains(wanted));
        wanted.insert(b);
        assert!(!mask.contains(wanted));

        mask.remove(a);
        assert_eq!(mask.count(), 1);
    }

    #[test]
    fn short_name() {
        assert_eq!(id_of::<String>(0).name(), "String");
        assert!(id_of::<String>(0).is::<String>());
    }
}
