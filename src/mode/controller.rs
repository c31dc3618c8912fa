use super::ButtonEdge;
use serde::Serialize;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Mode {
    Idle,
    Production,
    Recording,
    Streaming,
}

impl Mode {
    pub fn is_capturing(self) -> bool {
        matches!(self, Self::Recording | Self::Streaming)
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Production => "production",
            Self::Recording => "recording",
            Self::Streaming => "streaming",
        }
    }
}

/// A press that has not yet been classified as a tap or a hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingHoldDecision {
    pub started_at_ms: u64,
}

/// Mode change reported to the pipeline. Entering (or re-entering) a capture
/// mode means the block queue and the sample counter start over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: Mode,
    pub to: Mode,
}

impl Transition {
    pub fn enters_capture(&self) -> bool {
        self.to.is_capturing()
    }
}

/// Operating-mode state machine driven by the debounced button and the
/// production toggle.
#[derive(Debug, Clone)]
pub struct ModeController {
    base: Mode,
    mode: Mode,
    pending: Option<PendingHoldDecision>,
    collected: usize,
    window_samples: usize,
    hold_ms: u64,
}

impl ModeController {
    pub fn new(production: bool, window_samples: usize, hold_ms: u64) -> Self {
        let base = if production { Mode::Production } else { Mode::Idle };
        Self {
            base,
            mode: base,
            pending: None,
            collected: 0,
            window_samples: window_samples.max(1),
            hold_ms,
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn base_mode(&self) -> Mode {
        self.base
    }

    pub fn pending(&self) -> Option<PendingHoldDecision> {
        self.pending
    }

    pub fn collected(&self) -> usize {
        self.collected
    }

    pub fn on_button(&mut self, edge: ButtonEdge, now_ms: u64) -> Option<Transition> {
        match edge {
            ButtonEdge::Pressed => {
                if !self.mode.is_capturing() && self.pending.is_none() {
                    self.pending = Some(PendingHoldDecision {
                        started_at_ms: now_ms,
                    });
                }
                None
            }
            ButtonEdge::Released => {
                self.pending.take()?;
                Some(self.enter(Mode::Recording))
            }
        }
    }

    /// Resolve a pending decision into streaming once the button has been
    /// held for the hold window.
    pub fn poll(&mut self, now_ms: u64, pressed: bool) -> Option<Transition> {
        let pending = self.pending?;
        if !pressed || now_ms.saturating_sub(pending.started_at_ms) < self.hold_ms {
            return None;
        }
        self.pending = None;
        Some(self.enter(Mode::Streaming))
    }

    /// Count samples collected while capturing; true once a full window is in.
    pub fn record_samples(&mut self, count: usize) -> bool {
        if !self.mode.is_capturing() {
            return false;
        }
        self.collected = self.collected.saturating_add(count);
        self.collected >= self.window_samples
    }

    /// Decide what follows a shipped capture window.
    pub fn finish_window(&mut self, button_held: bool) -> Option<Transition> {
        match self.mode {
            Mode::Streaming if button_held => Some(self.enter(Mode::Streaming)),
            Mode::Recording | Mode::Streaming => {
                self.collected = 0;
                Some(self.switch(self.base))
            }
            Mode::Idle | Mode::Production => None,
        }
    }

    pub fn set_production(&mut self, enabled: bool) -> Option<Transition> {
        let base = if enabled { Mode::Production } else { Mode::Idle };
        if base == self.base {
            return None;
        }
        self.base = base;
        info!(enabled, "production mode toggled");
        if self.mode.is_capturing() {
            return None;
        }
        Some(self.switch(base))
    }

    pub fn toggle_production(&mut self) -> Option<Transition> {
        self.set_production(self.base != Mode::Production)
    }

    fn enter(&mut self, mode: Mode) -> Transition {
        self.collected = 0;
        self.switch(mode)
    }

    fn switch(&mut self, mode: Mode) -> Transition {
        let transition = Transition {
            from: self.mode,
            to: mode,
        };
        if transition.from != transition.to {
            info!(from = transition.from.label(), to = mode.label(), "mode change");
        }
        self.mode = mode;
        transition
    }
}
