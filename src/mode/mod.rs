//! Operating modes: idle, production (continuous classification), recording
//! (one captured window) and streaming (windows while the button is held).
//!
//! A press starts a hold decision that resolves without blocking the loop:
//! release before `hold_ms` records a single window, holding past it streams.

mod button;
mod controller;

pub use button::{ButtonEdge, ButtonInput, DebouncedButton, SharedButton};
pub use controller::{Mode, ModeController, PendingHoldDecision, Transition};
