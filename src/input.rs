//! Keyboard and mouse state fed from window events.
//!
//! Raw state (what is held right now) is updated as events arrive. Frame
//! transitions ([`InputManager::key_down`] / [`InputManager::key_up`]) are
//! computed once per frame in [`InputManager::update`], and only for keys
//! registered with [`InputManager::watch_key`].

use std::collections::{HashMap, HashSet};

use glam::Vec2;
use winit::event::{ElementState, MouseButton};
use winit::keyboard::KeyCode;

/// Per-frame record of a watched key.
#[derive(Debug, Copy, Clone, PartialEq)]
struct WatchedKey {
    /// Seconds since the key was last released, zero while held.
    released_for: f32,
    down: bool,
    up: bool,
}

impl Default for WatchedKey {
    fn default() -> Self {
        Self {
            released_for: 1.0,
            down: false,
            up: false,
        }
    }
}

/// Keyboard and mouse state.
#[derive(Debug, Default)]
pub struct InputManager {
    held_keys: HashSet<KeyCode>,
    held_buttons: HashSet<MouseButton>,
    watched: HashMap<KeyCode, WatchedKey>,
    mouse_position: Vec2,
    last_mouse_position: Vec2,
    mouse_delta: Vec2,
    scroll: Vec2,
    pending_scroll: Vec2,
}

impl InputManager {
    /// No keys held, nothing watched.
    pub fn new() -> Self {
        Self::default()
    }

    /// Track press/release transitions of `key`.
    pub fn watch_key(&mut self, key: KeyCode) {
        self.watched.entry(key).or_default();
    }

    /// Stop tracking `key`.
    pub fn unwatch_key(&mut self, key: KeyCode) {
        self.watched.remove(&key);
    }

    /// Whether `key` is held.
    pub fn key(&self, key: KeyCode) -> bool {
        self.held_keys.contains(&key)
    }

    /// Whether watched `key` went down since the previous frame.
    pub fn key_down(&self, key: KeyCode) -> bool {
        self.watched.get(&key).is_some_and(|watched| watched.down)
    }

    /// Whether watched `key` went up since the previous frame.
    pub fn key_up(&self, key: KeyCode) -> bool {
        self.watched.get(&key).is_some_and(|watched| watched.up)
    }

    /// Whether `button` is held.
    pub fn mouse_button(&self, button: MouseButton) -> bool {
        self.held_buttons.contains(&button)
    }

    /// Cursor position in window pixels, origin top-left.
    pub fn mouse_position(&self) -> Vec2 {
        self.mouse_position
    }

    /// Cursor movement over the last frame.
    pub fn mouse_delta(&self) -> Vec2 {
        self.mouse_delta
    }

    /// Wheel movement over the last frame, in lines.
    pub fn scroll(&self) -> Vec2 {
        self.scroll
    }

    /// Record a key event.
    pub fn handle_key(&mut self, key: KeyCode, state: ElementState) {
        match state {
            ElementState::Pressed => self.held_keys.insert(key),
            ElementState::Released => self.held_keys.remove(&key),
        };
    }

    /// Record a mouse button event.
    pub fn handle_mouse_button(&mut self, button: MouseButton, state: ElementState) {
        match state {
            ElementState::Pressed => self.held_buttons.insert(button),
            ElementState::Released => self.held_buttons.remove(&button),
        };
    }

    /// Record a cursor move.
    pub fn handle_cursor_moved(&mut self, position: Vec2) {
        self.mouse_position = position;
    }

    /// Record wheel movement.
    pub fn handle_scroll(&mut self, delta: Vec2) {
        self.pending_scroll += delta;
    }

    /// Release everything, e.g. when the window loses focus.
    pub fn release_all(&mut self) {
        self.held_keys.clear();
        self.held_buttons.clear();
    }

    /// Advance one frame of `delta` seconds.
    pub fn update(&mut self, delta: f32) {
        for (key, watched) in &mut self.watched {
            if self.held_keys.contains(key) {
                watched.down = watched.released_for > 0.0;
                watched.up = false;
                watched.released_for = 0.0;
            } else {
                watched.up = watched.released_for == 0.0;
                watched.down = false;
                watched.released_for += delta.max(f32::MIN_POSITIVE);
            }
        }

        self.mouse_delta = self.mouse_position - self.last_mouse_position;
        self.last_mouse_position = self.mouse_position;
        self.scroll = std::mem::take(&mut self.pending_scroll);
    }
}
