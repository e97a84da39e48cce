//! # Query: Iterating Entities by Component Signature
//!
//! ```text
//! world.query::<(&Locus, &mut Mesh)>(|entity, (locus, mesh)| { .. });
//!
//! 1. Build the required mask from the families of Locus and Mesh.
//!    A type the world has never seen means nothing can match.
//! 2. Take the Locus and Mesh pools out of the world's pool map.
//! 3. Walk live entity slots in ascending index; every slot whose mask
//!    contains the required mask is fetched from the taken pools.
//! 4. Put the pools back.
//! ```
//!
//! Taking pools out of the map is what lets `&A` and `&mut B` coexist: the
//! borrow checker sees independent owned values instead of two borrows into
//! the same `HashMap`. Asking for the same type twice in one query panics at
//! step 2.

use std::any::TypeId;
use std::collections::HashMap;

use super::component::ComponentPool;

/// Something a query can fetch per entity: `&T`, `&mut T`, or a tuple of them.
pub trait QueryParam {
    type Item<'w>;

    /// Pools taken out of the world for the duration of the query.
    type Pools;

    fn type_ids() -> Vec<TypeId>;

    fn extract(pools: &mut HashMap<TypeId, ComponentPool>) -> Self::Pools;

    fn restore(taken: Self::Pools, pools: &mut HashMap<TypeId, ComponentPool>);

    /// Fetch the item for entity slot `index`.
    fn fetch(taken: &mut Self::Pools, index: u32) -> Self::Item<'_>;
}

fn take_pool<T: 'static>(pools: &mut HashMap<TypeId, ComponentPool>) -> ComponentPool {
    pools.remove(&TypeId::of::<T>()).unwrap_or_else(|| {
        panic!(
            "Query extract: pool for `{}` missing (type requested twice?)",
            std::any::type_name::<T>()
        )
    })
}

fn missing<T>(index: u32) -> ! {
    panic!(
        "Query fetch: entity slot {} has no `{}` despite matching mask",
        index,
        std::any::type_name::<T>()
    )
}

impl<T: 'static + Send + Sync> QueryParam for &T {
    type Item<'w> = &'w T;
    type Pools = ComponentPool;

    fn type_ids() -> Vec<TypeId> {
        vec![TypeId::of::<T>()]
    }

    fn extract(pools: &mut HashMap<TypeId, ComponentPool>) -> Self::Pools {
        take_pool::<T>(pools)
    }

    fn restore(taken: Self::Pools, pools: &mut HashMap<TypeId, ComponentPool>) {
        pools.insert(TypeId::of::<T>(), taken);
    }

    fn fetch(taken: &mut Self::Pools, index: u32) -> Self::Item<'_> {
        taken.get::<T>(index).unwrap_or_else(|| missing::<T>(index))
    }
}

impl<T: 'static + Send + Sync> QueryParam for &mut T {
    type Item<'w> = &'w mut T;
    type Pools = ComponentPool;

    fn type_ids() -> Vec<TypeId> {
        vec![TypeId::of::<T>()]
    }

    fn extract(pools: &mut HashMap<TypeId, ComponentPool>) -> Self::Pools {
        take_pool::<T>(pools)
    }

    fn restore(taken: Self::Pools, pools: &mut HashMap<TypeId, ComponentPool>) {
        pools.insert(TypeId::of::<T>(), taken);
    }

    fn fetch(taken: &mut Self::Pools, index: u32) -> Self::Item<'_> {
        taken.get_mut::<T>(index).unwrap_or_else(|| missing::<T>(index))
    }
}

macro_rules! impl_query_param_tuple {
    ($($P:ident),+) => {
        impl<$($P: QueryParam),+> QueryParam for ($($P,)+) {
            type Item<'w> = ($($P::Item<'w>,)+);
            type Pools = ($($P::Pools,)+);

            fn type_ids() -> Vec<TypeId> {
                let mut ids = Vec::new();
                $(ids.extend($P::type_ids());)+
                ids
            }

            fn extract(pools: &mut HashMap<TypeId, ComponentPool>) -> Self::Pools {
                ($($P::extract(pools),)+)
            }

            #[allow(non_snake_case)]
            fn restore(taken: Self::Pools, pools: &mut HashMap<TypeId, ComponentPool>) {
                let ($($P,)+) = taken;
                $($P::restore($P, pools);)+
            }

            #[allow(non_snake_case)]
            fn fetch(taken: &mut Self::Pools, index: u32) -> Self::Item<'_> {
                let ($($P,)+) = taken;
                ($($P::fetch($P, index),)+)
            }
        }
    };
}

impl_query_param_tuple!(A);
impl_query_param_tuple!(A, B);
impl_query_param_tuple!(A, B, C);
impl_query_param_tuple!(A, B, C, D);
impl_query_param_tuple!(A, B, C, D, E);
impl_query_param_tuple!(A, B, C, D, E, F);
