use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Raw, undebounced button level. `true` means pressed.
pub trait ButtonInput {
    fn is_pressed(&mut self) -> bool;
}

/// Button level shared with another thread (stdin reader, GPIO poller).
#[derive(Debug, Clone, Default)]
pub struct SharedButton {
    pressed: Arc<AtomicBool>,
}

impl SharedButton {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, pressed: bool) {
        self.pressed.store(pressed, Ordering::Relaxed);
    }

    pub fn toggle(&self) -> bool {
        !self.pressed.fetch_xor(true, Ordering::Relaxed)
    }
}

impl ButtonInput for SharedButton {
    fn is_pressed(&mut self) -> bool {
        self.pressed.load(Ordering::Relaxed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonEdge {
    Pressed,
    Released,
}

/// Debounced view of a raw button. The stable level only follows the raw level
/// once the raw level has held still for longer than the debounce window.
#[derive(Debug, Clone)]
pub struct DebouncedButton {
    debounce_ms: u64,
    raw: bool,
    stable: bool,
    last_raw_change_ms: u64,
    last_transition_ms: Option<u64>,
}

impl DebouncedButton {
    pub fn new(debounce_ms: u64) -> Self {
        Self {
            debounce_ms,
            raw: false,
            stable: false,
            last_raw_change_ms: 0,
            last_transition_ms: None,
        }
    }

    pub fn update(&mut self, raw_pressed: bool, now_ms: u64) -> Option<ButtonEdge> {
        if raw_pressed != self.raw {
            self.raw = raw_pressed;
            self.last_raw_change_ms = now_ms;
        }
        if now_ms.saturating_sub(self.last_raw_change_ms) <= self.debounce_ms
            || self.raw == self.stable
        {
            return None;
        }
        self.stable = self.raw;
        self.last_transition_ms = Some(now_ms);
        Some(if self.stable {
            ButtonEdge::Pressed
        } else {
            ButtonEdge::Released
        })
    }

    pub fn raw_pressed(&self) -> bool {
        self.raw
    }

    pub fn is_pressed(&self) -> bool {
        self.stable
    }

    pub fn last_transition_ms(&self) -> Option<u64> {
        self.last_transition_ms
    }
}
