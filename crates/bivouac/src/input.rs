//! Keyboard and mouse state as world resources.
//!
//! The host loop feeds window events into `Input<KeyCode>`,
//! `Input<MouseButton>` and [`CursorPosition`], and clears the per-frame
//! edges after each update. Update closures and scripts read them from the
//! [`World`](crate::ecs::World).

use std::collections::HashSet;
use std::hash::Hash;

pub use winit::event::MouseButton;
pub use winit::keyboard::KeyCode;

use crate::math::Vec2;

/// Held / pressed-this-frame / released-this-frame sets for one kind of
/// button.
#[derive(Debug, Clone)]
pub struct Input<T: Eq + Hash + Copy> {
    held: HashSet<T>,
    pressed: HashSet<T>,
    released: HashSet<T>,
}

impl<T: Eq + Hash + Copy> Input<T> {
    pub fn new() -> Self {
        Self {
            held: HashSet::new(),
            pressed: HashSet::new(),
            released: HashSet::new(),
        }
    }

    /// Held down right now.
    pub fn pressed(&self, button: T) -> bool {
        self.held.contains(&button)
    }

    /// Went down since the last frame.
    pub fn just_pressed(&self, button: T) -> bool {
        self.pressed.contains(&button)
    }

    /// Came up since the last frame.
    pub fn just_released(&self, button: T) -> bool {
        self.released.contains(&button)
    }

    pub fn any_pressed(&self, buttons: impl IntoIterator<Item = T>) -> bool {
        buttons.into_iter().any(|b| self.pressed(b))
    }

    /// `-1`, `0` or `1` from a pair of opposing buttons.
    pub fn axis(&self, negative: T, positive: T) -> f32 {
        match (self.pressed(negative), self.pressed(positive)) {
            (true, false) => -1.0,
            (false, true) => 1.0,
            _ => 0.0,
        }
    }

    pub(crate) fn press(&mut self, button: T) {
        // key repeat sends press after press; only the first is an edge
        if self.held.insert(button) {
            self.pressed.insert(button);
        }
    }

    pub(crate) fn release(&mut self, button: T) {
        if self.held.remove(&button) {
            self.released.insert(button);
        }
    }

    /// Forget the per-frame edges. Called once the frame's update is done.
    pub(crate) fn end_frame(&mut self) {
        self.pressed.clear();
        self.released.clear();
    }

    /// Release everything, e.g. when the window loses focus.
    pub(crate) fn release_all(&mut self) {
        let held: Vec<T> = self.held.drain().collect();
        self.released.extend(held);
    }
}

impl<T: Eq + Hash + Copy> Default for Input<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl Input<KeyCode> {
    /// Arrow keys as a direction, y down.
    pub fn arrows(&self) -> Vec2 {
        Vec2::new(
            self.axis(KeyCode::ArrowLeft, KeyCode::ArrowRight),
            self.axis(KeyCode::ArrowUp, KeyCode::ArrowDown),
        )
    }
}

/// Cursor position in window pixels, origin upper-left.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CursorPosition(pub Vec2);
