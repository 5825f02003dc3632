//! Double-tap detection and held-key sampling.
//!
//! Discrete toggles need two presses of the same key inside the double-tap
//! window. Resizing and manual refresh are repeat-while-held, so they are
//! polled once per frame instead of going through the queue.

use crate::overlay::keyboard_hook::{KeyCode, RawKeyEvent};
use crate::overlay::platform::KeyStateSource;
use crate::overlay::state::PendingAction;
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

pub const DEFAULT_DOUBLE_TAP_INTERVAL: Duration = Duration::from_millis(400);

pub fn watched_action(key: KeyCode) -> Option<PendingAction> {
    match key {
        KeyCode::Q => Some(PendingAction::Quit),
        KeyCode::W => Some(PendingAction::ToggleSmartFocus),
        KeyCode::Z => Some(PendingAction::ToggleDarkMode),
        _ => None,
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Shared between the key hook thread (producer) and the render loop
/// (consumer).
#[derive(Debug)]
pub struct GestureDetector {
    interval: Duration,
    last_press: Mutex<HashMap<KeyCode, Duration>>,
    pending: Mutex<VecDeque<PendingAction>>,
}

impl Default for GestureDetector {
    fn default() -> Self {
        Self::new(DEFAULT_DOUBLE_TAP_INTERVAL)
    }
}

impl GestureDetector {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_press: Mutex::new(HashMap::new()),
            pending: Mutex::new(VecDeque::new()),
        }
    }

    pub fn on_raw_event(&self, event: RawKeyEvent) {
        if event.pressed {
            self.on_key_down(event.key, event.timestamp);
        }
    }

    /// Returns the action queued by this press, if it completed a double-tap.
    pub fn on_key_down(&self, key: KeyCode, timestamp: Duration) -> Option<PendingAction> {
        let action = watched_action(key)?;

        let mut last_press = lock(&self.last_press);
        let is_double_tap = last_press
            .get(&key)
            .is_some_and(|last| timestamp.saturating_sub(*last) < self.interval);

        if is_double_tap {
            // Cleared so a third press starts a new pair.
            last_press.remove(&key);
            drop(last_press);
            lock(&self.pending).push_back(action);
            tracing::debug!(?key, ?action, "double-tap detected");
            Some(action)
        } else {
            last_press.insert(key, timestamp);
            None
        }
    }

    /// Take every queued action in arrival order.
    pub fn drain(&self) -> Vec<PendingAction> {
        lock(&self.pending).drain(..).collect()
    }

    pub fn pending_len(&self) -> usize {
        lock(&self.pending).len()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HeldKeys {
    pub grow: bool,
    pub shrink: bool,
    pub refresh: bool,
}

impl HeldKeys {
    pub fn sample(keys: &dyn KeyStateSource) -> Self {
        Self {
            grow: keys.is_pressed(KeyCode::BracketRight),
            shrink: keys.is_pressed(KeyCode::BracketLeft),
            refresh: keys.is_pressed(KeyCode::R),
        }
    }
}
