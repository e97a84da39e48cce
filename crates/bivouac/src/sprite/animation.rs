//! # Sprite Animation
//!
//! An [`Animation`] is a list of [`Drawing`]s (a sprite plus how many frame
//! durations to hold it). The [`SpriteAnimationSystem`] owns the table of
//! animations and steps every entity carrying a [`SpriteAnimation`]
//! component, writing the current sprite into that entity's [`Mesh`].
//!
//! ## Description Format
//!
//! ```json
//! {
//!   "walk": { "fps": 12, "frames": [["walk-01", 1], ["walk-02", 1], ["walk-03", 2]] },
//!   "idle": { "fps": 4,  "frames": [["idle-01", 1]] }
//! }
//! ```
//!
//! Ids are assigned in document order starting at 0. Sprite names are looked
//! up in the [`TextureAtlas`]; unknown names draw the atlas' error sprite.
//!
//! ## Stepping
//!
//! ```text
//! hold += dt * speed
//! hold > frame_duration * drawing.hold  ->  index + 1, hold = 0
//! hold < 0                              ->  index - 1, hold = frame_duration * drawing.hold
//! index past either end                 ->  wrap if looping, else clamp
//! ```
//!
//! At most one step happens per update, whatever `dt` is.
//! An entity whose animation is missing or empty stays tracked; its frame is
//! written to the mesh as soon as the animation has drawings.

use std::collections::HashMap;

use serde::Deserialize;

use crate::ecs::{Entity, Event, Subscriptions, System, World};
use crate::mesh::Mesh;

use super::atlas::{SpriteData, TextureAtlas};

/// Index into an [`AnimationTable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct AnimationId(pub usize);

/// One frame of an animation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Drawing {
    pub sprite: SpriteData,
    /// Multiple of the animation's frame duration to show this sprite.
    pub hold: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Animation {
    /// Seconds per unit of hold, `1 / fps`.
    pub frame_duration: f32,
    pub drawings: Vec<Drawing>,
}

impl Animation {
    pub fn new(fps: f32, drawings: Vec<Drawing>) -> Self {
        Self {
            frame_duration: 1.0 / fps,
            drawings,
        }
    }

    pub fn len(&self) -> usize {
        self.drawings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.drawings.is_empty()
    }
}

/// Animations by name and by id.
#[derive(Debug, Clone, Default)]
pub struct AnimationTable {
    animations: Vec<Animation>,
    ids: HashMap<String, AnimationId>,
}

#[derive(Deserialize)]
struct AnimationDescription {
    fps: f32,
    frames: Vec<(String, f32)>,
}

impl AnimationTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse an animation description, resolving sprites through `atlas`.
    pub fn from_json(atlas: &TextureAtlas, json: &str) -> Result<Self, serde_json::Error> {
        let entries: serde_json::Map<String, serde_json::Value> = serde_json::from_str(json)?;
        let mut table = Self::new();
        for (name, value) in entries {
            let description: AnimationDescription = serde_json::from_value(value)?;
            let fps = if description.fps > 0.0 {
                description.fps
            } else {
                log::warn!("Animation `{}` has fps {}; using 1", name, description.fps);
                1.0
            };
            let drawings = description
                .frames
                .iter()
                .map(|(sprite, hold)| Drawing {
                    sprite: *atlas.get(sprite),
                    hold: *hold,
                })
                .collect();
            table.insert(name, Animation::new(fps, drawings));
        }
        Ok(table)
    }

    /// Add (or replace) a named animation and return its id.
    pub fn insert(&mut self, name: impl Into<String>, animation: Animation) -> AnimationId {
        let name = name.into();
        if let Some(&id) = self.ids.get(&name) {
            self.animations[id.0] = animation;
            return id;
        }
        let id = AnimationId(self.animations.len());
        self.animations.push(animation);
        self.ids.insert(name, id);
        id
    }

    pub fn id(&self, name: &str) -> Option<AnimationId> {
        self.ids.get(name).copied()
    }

    pub fn get(&self, id: AnimationId) -> Option<&Animation> {
        self.animations.get(id.0)
    }

    pub fn len(&self) -> usize {
        self.animations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.animations.is_empty()
    }
}

/// Playback state of one animated entity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpriteAnimation {
    pub animation: AnimationId,
    pub current_index: usize,
    /// Seconds spent on the current drawing.
    pub hold: f32,
    pub looping: bool,
    /// Multiplies `dt`. Negative values play backwards.
    pub speed: f32,
}

impl SpriteAnimation {
    pub fn new(animation: AnimationId) -> Self {
        Self {
            animation,
            current_index: 0,
            hold: 0.0,
            looping: true,
            speed: 1.0,
        }
    }

    pub fn looping(mut self, looping: bool) -> Self {
        self.looping = looping;
        self
    }

    pub fn with_speed(mut self, speed: f32) -> Self {
        self.speed = speed;
        self
    }

    pub fn starting_at(mut self, index: usize) -> Self {
        self.current_index = index;
        self
    }
}

impl Default for SpriteAnimation {
    fn default() -> Self {
        Self::new(AnimationId::default())
    }
}

/// Steps [`SpriteAnimation`]s and writes frames into meshes.
#[derive(Debug, Default)]
pub struct SpriteAnimationSystem {
    table: AnimationTable,
    tracked: Vec<Entity>,
    /// Tracked entities whose animation had no frames when they were added.
    unshown: Vec<Entity>,
}

impl SpriteAnimationSystem {
    pub fn new(table: AnimationTable) -> Self {
        Self {
            table,
            tracked: Vec::new(),
            unshown: Vec::new(),
        }
    }

    /// Build from a JSON description. A malformed description is logged and
    /// gives an empty table.
    pub fn from_json(atlas: &TextureAtlas, json: &str) -> Self {
        let table = match AnimationTable::from_json(atlas, json) {
            Ok(table) => {
                log::info!("Loaded {} sprite animation(s)", table.len());
                table
            }
            Err(e) => {
                log::error!("Failed to parse sprite animations: {e}");
                AnimationTable::new()
            }
        };
        Self::new(table)
    }

    pub fn table(&self) -> &AnimationTable {
        &self.table
    }

    pub fn animation_id(&self, name: &str) -> Option<AnimationId> {
        self.table.id(name)
    }

    pub fn add_animation(&mut self, name: impl Into<String>, animation: Animation) -> AnimationId {
        self.table.insert(name, animation)
    }

    pub fn animation(&self, id: AnimationId) -> Option<&Animation> {
        self.table.get(id)
    }

    /// A component playing the named animation from its first frame.
    ///
    /// Unknown names fall back to animation 0.
    pub fn sprite_animation(&self, name: &str) -> SpriteAnimation {
        let id = self.animation_id(name).unwrap_or_else(|| {
            log::warn!("Unknown animation `{}`; using animation 0", name);
            AnimationId(0)
        });
        SpriteAnimation::new(id)
    }

    /// Entities currently being stepped.
    pub fn tracked(&self) -> &[Entity] {
        &self.tracked
    }

    fn start_tracking(&mut self, world: &mut World, entity: Entity) {
        if !world.has::<SpriteAnimation>(entity) {
            return;
        }
        if !self.tracked.contains(&entity) {
            self.tracked.push(entity);
        }
        if show_current_frame(&self.table, world, entity) {
            self.unshown.retain(|&e| e != entity);
        } else if !self.unshown.contains(&entity) {
            if let Some(sprite) = world.component::<SpriteAnimation>(entity) {
                log::warn!(
                    "{:?} plays {:?}, which has no frames yet ({} animations)",
                    entity,
                    sprite.animation,
                    self.table.len()
                );
            }
            self.unshown.push(entity);
        }
    }

    fn stop_tracking(&mut self, entity: Entity) {
        self.tracked.retain(|&e| e != entity);
        self.unshown.retain(|&e| e != entity);
    }
}

/// Clamp the index and write the current frame into the entity's mesh,
/// creating the mesh if needed. `false` while the animation has no frames.
fn show_current_frame(table: &AnimationTable, world: &mut World, entity: Entity) -> bool {
    let Some(sprite) = world.component_mut::<SpriteAnimation>(entity) else {
        return false;
    };
    let Some(animation) = table.get(sprite.animation) else {
        return false;
    };
    if animation.is_empty() {
        return false;
    }
    sprite.current_index = sprite.current_index.min(animation.len() - 1);
    let drawing = animation.drawings[sprite.current_index];

    match world.component_mut::<Mesh>(entity) {
        Some(mesh) => mesh.set_as_texture(&drawing.sprite),
        None => {
            world.assign(entity, Mesh::from_sprite(&drawing.sprite));
        }
    }
    true
}

/// Advance one animation by `dt`. Returns the new index if it changed.
fn step(sprite: &mut SpriteAnimation, animation: &Animation, dt: f32) -> Option<usize> {
    let count = animation.drawings.len() as isize;
    let current = sprite.current_index.min(animation.drawings.len() - 1);
    let limit = animation.frame_duration * animation.drawings[current].hold;

    sprite.hold += dt * sprite.speed;
    let mut next = current as isize;
    if sprite.hold > limit {
        next += 1;
        sprite.hold = 0.0;
    } else if sprite.hold < 0.0 {
        next -= 1;
        sprite.hold = limit;
    }

    if next >= count {
        next = if sprite.looping { 0 } else { count - 1 };
    } else if next < 0 {
        next = if sprite.looping { count - 1 } else { 0 };
    }

    let next = next as usize;
    if next != sprite.current_index {
        sprite.current_index = next;
        Some(next)
    } else {
        None
    }
}

impl System for SpriteAnimationSystem {
    fn configure(&mut self, subscriptions: &mut Subscriptions) {
        subscriptions
            .added::<SpriteAnimation>()
            .removed::<SpriteAnimation>()
            .destroyed();
    }

    fn receive(&mut self, world: &mut World, event: &Event) {
        match *event {
            Event::ComponentAdded { entity, .. } => self.start_tracking(world, entity),
            Event::ComponentRemoved { entity, .. } | Event::EntityDestroyed { entity, .. } => {
                self.stop_tracking(entity)
            }
        }
    }

    fn update(&mut self, world: &mut World, dt: f64) {
        let dt = dt as f32;
        let table = &self.table;
        let unshown = &mut self.unshown;
        for &entity in &self.tracked {
            if let Some(i) = unshown.iter().position(|&e| e == entity) {
                if !show_current_frame(table, world, entity) {
                    continue;
                }
                unshown.swap_remove(i);
            }
            if !world.has::<Mesh>(entity) {
                continue;
            }
            let Some(sprite) = world.component_mut::<SpriteAnimation>(entity) else {
                continue;
            };
            let Some(animation) = table.get(sprite.animation) else {
                continue;
            };
            if animation.is_empty() {
                continue;
            }
            let Some(index) = step(sprite, animation, dt) else {
                continue;
            };
            if let Some(mesh) = world.component_mut::<Mesh>(entity) {
                mesh.set_as_texture(&animation.drawings[index].sprite);
            }
        }
    }
}
