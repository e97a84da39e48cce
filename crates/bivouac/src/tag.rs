//! String labels for finding entities by name.

use crate::ecs::{Entity, World};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Tag(pub String);

impl Tag {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl World {
    /// Every live entity whose [`Tag`] is `name`, in entity order.
    pub fn tagged(&self, name: &str) -> Vec<Entity> {
        self.entities_with::<Tag>()
            .into_iter()
            .filter(|&e| self.component::<Tag>(e).is_some_and(|t| t.0 == name))
            .collect()
    }

    /// The first entity tagged `name`, if any.
    pub fn find_tagged(&self, name: &str) -> Option<Entity> {
        self.tagged(name).into_iter().next()
    }
}
