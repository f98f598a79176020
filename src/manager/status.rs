//! Purpose: Hold the user-visible status message and expire it on its own timers.
//! Exports: `StatusBoard`, `StatusMessage`, `Severity`, `StatusTimings`.
//! Role: Message slot owned by `SummaryManager`; independent of busy/idle.
//! Invariants: Each message gets a fade timer and a clear timer, both measured from when it was set.
//! Invariants: Replacing or clearing a message aborts the previous message's timers.
//! Invariants: A timer only touches the message generation it was scheduled for.
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::task::JoinHandle;

pub const DEFAULT_FADE_AFTER: Duration = Duration::from_millis(1800);
pub const DEFAULT_CLEAR_AFTER: Duration = Duration::from_millis(2500);

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Severity {
    Success,
    Info,
    Warning,
    Danger,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Success => "success",
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Danger => "danger",
        }
    }

    /// Errors stay on screen until something replaces them.
    pub fn fades(self) -> bool {
        !matches!(self, Severity::Danger)
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct StatusMessage {
    pub text: String,
    pub severity: Severity,
    pub fading: bool,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct StatusTimings {
    pub fade_after: Duration,
    pub clear_after: Duration,
}

impl Default for StatusTimings {
    fn default() -> Self {
        Self {
            fade_after: DEFAULT_FADE_AFTER,
            clear_after: DEFAULT_CLEAR_AFTER,
        }
    }
}

#[derive(Debug, Default)]
struct Slot {
    generation: u64,
    message: Option<StatusMessage>,
}

#[derive(Debug)]
pub struct StatusBoard {
    slot: Arc<Mutex<Slot>>,
    timings: StatusTimings,
    timers: Vec<JoinHandle<()>>,
}

impl StatusBoard {
    pub fn new(timings: StatusTimings) -> Self {
        Self {
            slot: Arc::new(Mutex::new(Slot::default())),
            timings,
            timers: Vec::new(),
        }
    }

    pub fn current(&self) -> Option<StatusMessage> {
        lock(&self.slot).message.clone()
    }

    /// Sets a new message. Fading severities schedule their timers on the
    /// ambient tokio runtime; outside a runtime the message simply stays.
    pub fn set(&mut self, severity: Severity, text: impl Into<String>) {
        let generation = self.replace(Some(StatusMessage {
            text: text.into(),
            severity,
            fading: false,
        }));
        if severity.fades() {
            self.schedule(generation);
        }
    }

    pub fn clear(&mut self) {
        self.replace(None);
    }

    fn replace(&mut self, message: Option<StatusMessage>) -> u64 {
        self.cancel_timers();
        let mut slot = lock(&self.slot);
        slot.generation += 1;
        slot.message = message;
        slot.generation
    }

    fn schedule(&mut self, generation: u64) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            return;
        };
        let fade = {
            let slot = Arc::clone(&self.slot);
            let delay = self.timings.fade_after;
            runtime.spawn(async move {
                tokio::time::sleep(delay).await;
                let mut slot = lock(&slot);
                if slot.generation == generation {
                    if let Some(message) = slot.message.as_mut() {
                        message.fading = true;
                    }
                }
            })
        };
        let clear = {
            let slot = Arc::clone(&self.slot);
            let delay = self.timings.clear_after;
            runtime.spawn(async move {
                tokio::time::sleep(delay).await;
                let mut slot = lock(&slot);
                if slot.generation == generation {
                    slot.message = None;
                }
            })
        };
        self.timers = vec![fade, clear];
    }

    fn cancel_timers(&mut self) {
        for timer in self.timers.drain(..) {
            timer.abort();
        }
    }
}

impl Default for StatusBoard {
    fn default() -> Self {
        Self::new(StatusTimings::default())
    }
}

impl Drop for StatusBoard {
    fn drop(&mut self) {
        self.cancel_timers();
    }
}

fn lock(slot: &Mutex<Slot>) -> MutexGuard<'_, Slot> {
    slot.lock().unwrap_or_else(|poison| poison.into_inner())
}
