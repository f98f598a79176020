//! Purpose: Client-side orchestration of summary management.
//! Exports: `SummaryManager`, `Outcome`, `BusyFlag`, `FormField`, status types.
//! Role: State a presenting layer (CLI, UI) reads and drives; talks to a backend via `api::SummaryApi`.
//! Invariants: Nothing here touches storage directly.

mod form;
mod orchestrator;
mod status;

pub use form::FormField;
pub use orchestrator::{BusyFlag, Outcome, SummaryManager};
pub use status::{
    DEFAULT_CLEAR_AFTER, DEFAULT_FADE_AFTER, Severity, StatusBoard, StatusMessage, StatusTimings,
};
