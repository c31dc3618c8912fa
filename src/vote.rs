//! Turn a stream of per-window classifications into page commands.

use crate::config::LabelConfig;
use serde::Serialize;
use tracing::warn;

/// Command delivered to the page-turning sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum PageCommand {
    PageUp,
    PageDown,
}

impl PageCommand {
    pub fn label(self) -> &'static str {
        match self {
            Self::PageUp => "page-up",
            Self::PageDown => "page-down",
        }
    }
}

/// What a classifier label means to the voter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelRole {
    Next,
    Prev,
    Silence,
    Other,
}

/// Index-to-role table computed once from the classifier's label names.
#[derive(Debug, Clone)]
pub struct LabelMap {
    names: Vec<String>,
    roles: Vec<LabelRole>,
}

impl LabelMap {
    pub fn new(labels: &[String], config: &LabelConfig) -> Self {
        let matches = |name: &str, candidates: &[String]| {
            candidates.iter().any(|c| c.eq_ignore_ascii_case(name.trim()))
        };
        let roles: Vec<LabelRole> = labels
            .iter()
            .map(|name| {
                if matches(name, &config.next) {
                    LabelRole::Next
                } else if matches(name, &config.prev) {
                    LabelRole::Prev
                } else if name.trim().eq_ignore_ascii_case(&config.silence) {
                    LabelRole::Silence
                } else {
                    LabelRole::Other
                }
            })
            .collect();

        if !labels.is_empty() {
            for (role, description) in [
                (LabelRole::Next, "next-page"),
                (LabelRole::Prev, "previous-page"),
                (LabelRole::Silence, "silence"),
            ] {
                if !roles.contains(&role) {
                    warn!(
                        role = description,
                        labels = ?labels,
                        "classifier exposes no label for this role"
                    );
                }
            }
        }

        Self {
            names: labels.to_vec(),
            roles,
        }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn name(&self, index: usize) -> Option<&str> {
        self.names.get(index).map(String::as_str)
    }

    /// Indices outside the table count as `Other`.
    pub fn role(&self, index: usize) -> LabelRole {
        self.roles.get(index).copied().unwrap_or(LabelRole::Other)
    }
}

/// One voted observation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Candidate {
    /// The energy gate rejected the window.
    Silence,
    Label { index: usize, confidence: f32 },
}

impl Candidate {
    fn key(self) -> Option<usize> {
        match self {
            Self::Silence => None,
            Self::Label { index, .. } => Some(index),
        }
    }
}

/// Read-only snapshot of the voter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VoteState {
    /// Label of the current run; `None` while the run is silence or before
    /// the first observation.
    pub last_label: Option<usize>,
    pub run_length: u32,
    pub last_announcement_ms: Option<u64>,
}

/// Run-length voter with a refractory period. A run fires once, exactly when
/// it reaches the required length.
#[derive(Debug, Clone)]
pub struct CommandVoter {
    required_run: u32,
    refractory_ms: u64,
    state: VoteState,
    started: bool,
}

impl CommandVoter {
    pub fn new(required_run: u32, refractory_ms: u64) -> Self {
        Self {
            required_run: required_run.max(1),
            refractory_ms,
            state: VoteState::default(),
            started: false,
        }
    }

    pub fn state(&self) -> VoteState {
        self.state
    }

    pub fn required_run(&self) -> u32 {
        self.required_run
    }

    pub fn reset(&mut self) {
        self.state = VoteState::default();
        self.started = false;
    }

    pub fn observe(
        &mut self,
        candidate: Candidate,
        labels: &LabelMap,
        now_ms: u64,
    ) -> Option<PageCommand> {
        let key = candidate.key();
        if self.started && key == self.state.last_label {
            self.state.run_length = self.state.run_length.saturating_add(1);
        } else {
            self.state.run_length = 1;
            self.state.last_label = key;
            self.started = true;
        }

        if self.state.run_length != self.required_run {
            return None;
        }
        let command = match labels.role(key?) {
            LabelRole::Next => PageCommand::PageDown,
            LabelRole::Prev => PageCommand::PageUp,
            LabelRole::Silence | LabelRole::Other => return None,
        };
        if let Some(last) = self.state.last_announcement_ms {
            if now_ms.saturating_sub(last) <= self.refractory_ms {
                return None;
            }
        }
        self.state.last_announcement_ms = Some(now_ms);
        Some(command)
    }
}
