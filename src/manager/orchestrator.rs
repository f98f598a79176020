//! Purpose: Client-side state machine for the summary lifecycle.
//! Exports: `SummaryManager`, `Outcome`, `BusyFlag`.
//! Role: Owns form state, edit mode, busy flag, status, and the cached result list.
//! Invariants: Validation runs before any network call; a rejected draft never reaches the backend.
//! Invariants: After a successful write the full list is reloaded; results are never patched locally.
//! Invariants: The busy flag is cleared on every exit path, including failures.
//! Notes: Overlapping calls are the presenting layer's job to prevent (watch `busy_flag`).
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use super::form::FormField;
use super::status::{Severity, StatusBoard, StatusMessage, StatusTimings};
use crate::api::SummaryApi;
use crate::core::error::Error;
use crate::core::record::{Summary, SummaryInput};
use crate::core::validate::{Draft, Rejection, derive_word_count, validate_draft};

const LOAD_FAILED: &str = "Failed to load summaries";
const NOT_FOUND: &str = "Summary not found";

/// How a user action ended. `NotFound` is a completed round trip with a
/// negative answer, distinct from `Failed`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Outcome {
    Succeeded,
    Rejected(Rejection),
    NotFound,
    Failed,
}

/// Read-only view of the manager's busy flag.
#[derive(Clone, Debug)]
pub struct BusyFlag(Arc<AtomicBool>);

impl BusyFlag {
    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

struct BusyGuard(Arc<AtomicBool>);

impl BusyGuard {
    fn engage(flag: &Arc<AtomicBool>) -> Self {
        flag.store(true, Ordering::SeqCst);
        Self(Arc::clone(flag))
    }
}

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

pub struct SummaryManager<A> {
    api: A,
    form: Draft,
    editing_id: String,
    results: Vec<Summary>,
    busy: Arc<AtomicBool>,
    status: StatusBoard,
}

impl<A: SummaryApi> SummaryManager<A> {
    pub fn new(api: A) -> Self {
        Self::with_timings(api, StatusTimings::default())
    }

    pub fn with_timings(api: A, timings: StatusTimings) -> Self {
        Self {
            api,
            form: Draft::default(),
            editing_id: String::new(),
            results: Vec::new(),
            busy: Arc::new(AtomicBool::new(false)),
            status: StatusBoard::new(timings),
        }
    }

    pub fn form(&self) -> &Draft {
        &self.form
    }

    /// Empty while the form is in create mode.
    pub fn editing_id(&self) -> &str {
        &self.editing_id
    }

    pub fn results(&self) -> &[Summary] {
        &self.results
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    pub fn busy_flag(&self) -> BusyFlag {
        BusyFlag(Arc::clone(&self.busy))
    }

    pub fn status(&self) -> Option<StatusMessage> {
        self.status.current()
    }

    /// Word count derived from the current original text, regardless of
    /// what the word-count field holds.
    pub fn derived_word_count(&self) -> u32 {
        derive_word_count(&self.form.original_text)
    }

    /// Whether an update control should be enabled. `update` itself does
    /// not check this.
    pub fn can_update(&self) -> bool {
        !self.editing_id.is_empty() && self.form.summary_id.trim() == self.editing_id
    }

    /// Changing the id away from the record being edited drops edit mode.
    pub fn edit_field(&mut self, field: FormField, value: impl Into<String>) {
        let value = value.into();
        if field == FormField::SummaryId && value != self.editing_id {
            self.editing_id.clear();
        }
        *field.slot(&mut self.form) = value;
    }

    pub fn load_for_edit(&mut self, record: &Summary) {
        self.form = Draft::from_summary(record);
        self.editing_id = record.summary_id.clone();
        self.status.set(
            Severity::Info,
            format!("Loaded summary {} into form for editing", record.summary_id),
        );
    }

    pub fn reset_form(&mut self) {
        self.form = Draft::default();
        self.editing_id.clear();
    }

    /// Initial population of the result list.
    pub async fn load(&mut self) -> Outcome {
        let _busy = self.begin();
        match self.refresh().await {
            Ok(()) => self.succeed("Loaded summaries"),
            Err(err) => self.fail(LOAD_FAILED, &err),
        }
    }

    pub async fn add(&mut self) -> Outcome {
        let input = match self.validated() {
            Ok(input) => input,
            Err(rejection) => return self.reject(rejection),
        };
        let _busy = self.begin();
        let created = match self.api.create(&input).await {
            Ok(created) => created,
            Err(err) => return self.fail("Add failed", &err),
        };
        if let Err(err) = self.refresh().await {
            return self.fail("Add failed", &err);
        }
        self.succeed(format!("Added summary {}", created.summary_id))
    }

    /// Replaces the record named by the form's id. A "not found" answer
    /// leaves the form as it is.
    pub async fn update(&mut self) -> Outcome {
        let input = match self.validated() {
            Ok(input) => input,
            Err(rejection) => return self.reject(rejection),
        };
        let _busy = self.begin();
        let id = self.form.summary_id.trim().to_string();
        let updated = match self.api.replace(&id, &input).await {
            Ok(updated) => updated,
            Err(err) => return self.fail("Update failed", &err),
        };
        if let Err(err) = self.refresh().await {
            return self.fail("Update failed", &err);
        }
        match updated {
            Some(_) => {
                self.reset_form();
                self.succeed(format!("Updated summary {id}"))
            }
            None => self.not_found(),
        }
    }

    /// Unconditional delete; any confirmation belongs to the caller.
    pub async fn delete(&mut self, id: &str) -> Outcome {
        let _busy = self.begin();
        let deleted = match self.api.delete(id).await {
            Ok(deleted) => deleted,
            Err(err) => return self.fail("Delete failed", &err),
        };
        if let Err(err) = self.refresh().await {
            return self.fail("Delete failed", &err);
        }
        if self.form.summary_id == id {
            self.reset_form();
        }
        if deleted {
            self.succeed(format!("Deleted summary {id}"))
        } else {
            self.not_found()
        }
    }

    /// Keyword search; a blank keyword shows everything instead.
    pub async fn search(&mut self, keyword: &str) -> Outcome {
        if keyword.trim().is_empty() {
            return self.show_all().await;
        }
        let _busy = self.begin();
        match self.api.get_by_keyword(keyword).await {
            Ok(records) => {
                let found = records.len();
                self.results = records;
                self.succeed(format!("Found {found} summaries"))
            }
            Err(err) => self.fail("Search failed", &err),
        }
    }

    pub async fn show_all(&mut self) -> Outcome {
        let _busy = self.begin();
        match self.refresh().await {
            Ok(()) => self.succeed("Showing all summaries"),
            Err(err) => self.fail(LOAD_FAILED, &err),
        }
    }

    fn validated(&self) -> Result<SummaryInput, Rejection> {
        validate_draft(&self.form)
    }

    fn begin(&mut self) -> BusyGuard {
        self.status.clear();
        BusyGuard::engage(&self.busy)
    }

    async fn refresh(&mut self) -> Result<(), Error> {
        self.results = self.api.list_all().await?;
        Ok(())
    }

    fn succeed(&mut self, text: impl Into<String>) -> Outcome {
        self.status.set(Severity::Success, text);
        Outcome::Succeeded
    }

    fn not_found(&mut self) -> Outcome {
        self.status.set(Severity::Warning, NOT_FOUND);
        Outcome::NotFound
    }

    fn reject(&mut self, rejection: Rejection) -> Outcome {
        tracing::debug!(%rejection, "draft rejected");
        self.status.set(Severity::Danger, rejection.as_str());
        Outcome::Rejected(rejection)
    }

    fn fail(&mut self, text: &str, err: &Error) -> Outcome {
        tracing::warn!(error = %err, "{text}");
        self.status.set(Severity::Danger, text);
        Outcome::Failed
    }
}
