//! Purpose: Resolve query/mutation operations against a `DocumentStore`.
//! Exports: `SummaryService`, `Clock`.
//! Role: Stateless surface between the HTTP endpoint and storage; owns timestamping.
//! Invariants: Timestamps are assigned here on every create and replace, never by callers.
//! Invariants: Replace/delete of an unknown id is a negative result, not an error.
//! Invariants: Each call is independent; no multi-operation transactions.
#![allow(clippy::result_large_err)]

use std::sync::Arc;

use serde_json::Value;
use time::OffsetDateTime;

use super::protocol::Operation;
use crate::core::error::{Error, ErrorKind};
use crate::core::record::{Summary, SummaryInput, format_timestamp, sort_newest_first};
use crate::core::store::{DocumentStore, Filter};
use crate::core::validate::rating_in_range;

pub type ApiResult<T> = Result<T, Error>;

pub type Clock = Arc<dyn Fn() -> OffsetDateTime + Send + Sync>;

#[derive(Clone)]
pub struct SummaryService {
    store: Arc<dyn DocumentStore>,
    clock: Clock,
}

impl SummaryService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            clock: Arc::new(OffsetDateTime::now_utc),
        }
    }

    pub fn with_clock(mut self, clock: impl Fn() -> OffsetDateTime + Send + Sync + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    pub fn list_all(&self) -> ApiResult<Vec<Summary>> {
        let mut records = self.store.find(&Filter::All)?;
        sort_newest_first(&mut records);
        Ok(records)
    }

    pub fn get_by_id(&self, id: &str) -> ApiResult<Option<Summary>> {
        Ok(self.store.find(&Filter::Id(id))?.into_iter().next())
    }

    pub fn get_by_text_fragment(&self, text: &str) -> ApiResult<Vec<Summary>> {
        self.store.find(&Filter::TextFragment(text))
    }

    pub fn get_by_timestamp(&self, ts: &str) -> ApiResult<Vec<Summary>> {
        self.store.find(&Filter::Timestamp(ts))
    }

    pub fn get_by_keyword(&self, keyword: &str) -> ApiResult<Vec<Summary>> {
        self.store.find(&Filter::Keyword(keyword))
    }

    pub fn get_by_rating_range(&self, min: f64, max: f64) -> ApiResult<Vec<Summary>> {
        if !min.is_finite() || !max.is_finite() {
            return Err(Error::new(ErrorKind::Usage)
                .with_message("rating bounds must be finite numbers"));
        }
        if min > max {
            return Ok(Vec::new());
        }
        self.store.find(&Filter::RatingRange { min, max })
    }

    pub fn create(&self, input: SummaryInput) -> ApiResult<Summary> {
        let input = normalize_input(input)?;
        let record = input.stamp(self.now()?);
        let created = self.store.insert(record)?;
        tracing::info!(id = %created.summary_id, "summary created");
        Ok(created)
    }

    /// Everything but identity is replaced; the id argument wins over
    /// `input.summary_id`.
    pub fn replace(&self, id: &str, input: SummaryInput) -> ApiResult<Option<Summary>> {
        let id = id.trim();
        if id.is_empty() {
            return Err(Error::new(ErrorKind::Usage).with_message("replace requires a summary id"));
        }
        let mut input = normalize_input(input)?;
        input.summary_id = id.to_string();
        let record = input.stamp(self.now()?);
        let replaced = self.store.replace(id, record)?;
        match &replaced {
            Some(_) => tracing::info!(id, "summary replaced"),
            None => tracing::debug!(id, "replace target not found"),
        }
        Ok(replaced)
    }

    pub fn delete(&self, id: &str) -> ApiResult<bool> {
        let deleted = self.store.delete(id)?;
        if deleted {
            tracing::info!(id, "summary deleted");
        }
        Ok(deleted)
    }

    /// Runs one wire operation and returns the JSON for the `data` field.
    pub fn execute(&self, operation: Operation) -> ApiResult<Value> {
        match operation {
            Operation::ListAll => to_value(self.list_all()?),
            Operation::GetById { id } => to_value(self.get_by_id(&id)?),
            Operation::GetByTextFragment { text } => to_value(self.get_by_text_fragment(&text)?),
            Operation::GetByTimestamp { ts } => to_value(self.get_by_timestamp(&ts)?),
            Operation::GetByKeyword { keyword } => to_value(self.get_by_keyword(&keyword)?),
            Operation::GetByRatingRange { min, max } => {
                to_value(self.get_by_rating_range(min, max)?)
            }
            Operation::Create { input } => to_value(self.create(input)?),
            Operation::Replace { id, input } => to_value(self.replace(&id, input)?),
            Operation::Delete { id } => to_value(self.delete(&id)?),
        }
    }

    fn now(&self) -> ApiResult<String> {
        format_timestamp((self.clock)())
    }
}

// Mirrors the stored-document schema: trimmed required strings, trimmed
// keywords, rating within bounds.
fn normalize_input(input: SummaryInput) -> ApiResult<SummaryInput> {
    let summary_id = input.summary_id.trim().to_string();
    let original_text = input.original_text.trim().to_string();
    let summary = input.summary.trim().to_string();
    if summary_id.is_empty() || original_text.is_empty() || summary.is_empty() {
        return Err(Error::new(ErrorKind::Usage)
            .with_message("summaryID, originalText, and summary are required"));
    }
    if !rating_in_range(input.rating) {
        return Err(Error::new(ErrorKind::Usage)
            .with_message("rating must be between 1 and 5")
            .with_id(summary_id));
    }
    let keywords = input
        .keywords
        .into_iter()
        .map(|keyword| keyword.trim().to_string())
        .filter(|keyword| !keyword.is_empty())
        .collect();
    Ok(SummaryInput {
        summary_id,
        original_text,
        summary,
        keywords,
        rating: input.rating,
        word_count: input.word_count,
    })
}

fn to_value<T: serde::Serialize>(value: T) -> ApiResult<Value> {
    serde_json::to_value(value).map_err(|err| {
        Error::new(ErrorKind::Internal)
            .with_message("failed to encode response")
            .with_source(err)
    })
}

#[cfg(test)]
mod tests {
    use super::SummaryService;
    use crate::api::protocol::Operation;
    use crate::core::error::ErrorKind;
    use crate::core::record::SummaryInput;
    use crate::core::store::MemoryCollection;
    use serde_json::{Value, json};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicI64, Ordering};
    use time::OffsetDateTime;

    fn input(id: &str, rating: f64, keywords: &[&str]) -> SummaryInput {
        SummaryInput {
            summary_id: id.to_string(),
            original_text: "the quick brown fox".to_string(),
            summary: "fox runs".to_string(),
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
            rating,
            word_count: 4,
        }
    }

    // Each call advances one second from a fixed origin.
    fn ticking_service() -> SummaryService {
        let tick = Arc::new(AtomicI64::new(1_770_000_000));
        SummaryService::new(Arc::new(MemoryCollection::new())).with_clock(move || {
            let secs = tick.fetch_add(1, Ordering::SeqCst);
            OffsetDateTime::from_unix_timestamp(secs).expect("timestamp")
        })
    }

    #[test]
    fn create_then_get_returns_input_plus_timestamp() {
        let service = ticking_service();
        let created = service.create(input("S-1", 4.5, &["animal", "speed"])).expect("create");
        assert!(!created.timestamp.is_empty());

        let fetched = service.get_by_id("S-1").expect("get").expect("present");
        assert_eq!(fetched, created);
        assert_eq!(fetched.to_input(), input("S-1", 4.5, &["animal", "speed"]));
    }

    #[test]
    fn list_all_is_newest_first() {
        let service = ticking_service();
        for id in ["a", "b", "c"] {
            service.create(input(id, 3.0, &["k"])).expect("create");
        }
        service.replace("a", input("a", 2.0, &["k"])).expect("replace");
        let ids: Vec<_> = service
            .list_all()
            .expect("list")
            .into_iter()
            .map(|r| r.summary_id)
            .collect();
        assert_eq!(ids, ["a", "c", "b"]);
    }

    #[test]
    fn duplicate_create_is_an_application_error() {
        let service = ticking_service();
        service.create(input("S-1", 3.0, &["k"])).expect("create");
        let err = service.create(input("S-1", 4.0, &["k"])).expect_err("duplicate");
        assert_eq!(err.kind(), ErrorKind::AlreadyExists);
        assert_eq!(service.get_by_id("S-1").expect("get").expect("kept").rating, 3.0);
    }

    #[test]
    fn replace_restamps_and_keeps_identity() {
        let service = ticking_service();
        let created = service.create(input("S-1", 3.0, &["old"])).expect("create");
        let mut changed = input("OTHER", 5.0, &["new"]);
        changed.summary = "rewritten".to_string();

        let replaced = service.replace("S-1", changed).expect("replace").expect("found");
        assert_eq!(replaced.summary_id, "S-1");
        assert_eq!(replaced.summary, "rewritten");
        assert_eq!(replaced.keywords, ["new"]);
        assert_ne!(replaced.timestamp, created.timestamp);
        assert!(service.get_by_id("OTHER").expect("get").is_none());
    }

    #[test]
    fn unknown_ids_are_negative_results() {
        let service = ticking_service();
        assert!(service.replace("nope", input("nope", 3.0, &["k"])).expect("replace").is_none());
        assert!(!service.delete("nope").expect("delete"));
        assert!(service.get_by_id("nope").expect("get").is_none());
    }

    #[test]
    fn rating_range_is_inclusive() {
        let service = ticking_service();
        service.create(input("two", 2.0, &["k"])).expect("create");
        service.create(input("three", 3.0, &["k"])).expect("create");
        service.create(input("four", 4.0, &["k"])).expect("create");

        let mut ids: Vec<_> = service
            .get_by_rating_range(1.0, 3.0)
            .expect("range")
            .into_iter()
            .map(|r| r.summary_id)
            .collect();
        ids.sort();
        assert_eq!(ids, ["three", "two"]);
        assert!(service.get_by_rating_range(4.5, 1.0).expect("inverted").is_empty());
        let err = service.get_by_rating_range(f64::NAN, 3.0).expect_err("nan");
        assert_eq!(err.kind(), ErrorKind::Usage);
    }

    #[test]
    fn inputs_are_normalized_and_checked() {
        let service = ticking_service();
        let mut raw = input("  S-9  ", 3.0, &[" a ", "", "b"]);
        raw.summary = " trimmed ".to_string();
        let created = service.create(raw).expect("create");
        assert_eq!(created.summary_id, "S-9");
        assert_eq!(created.summary, "trimmed");
        assert_eq!(created.keywords, ["a", "b"]);

        let err = service.create(input("S-10", 0.5, &["k"])).expect_err("rating");
        assert_eq!(err.kind(), ErrorKind::Usage);
        let err = service.create(input(" ", 3.0, &["k"])).expect_err("id");
        assert_eq!(err.kind(), ErrorKind::Usage);
    }

    #[test]
    fn keywords_with_commas_are_stored_whole() {
        let service = ticking_service();
        let raw = input("S-1", 3.0, &["New York, NY", " travel "]);
        service.create(raw).expect("create");

        let fetched = service.get_by_id("S-1").expect("get").expect("present");
        assert_eq!(fetched.keywords, ["New York, NY", "travel"]);
        let found = service.get_by_keyword("New York, NY").expect("search");
        assert_eq!(found.len(), 1);
        assert!(service.get_by_keyword("NY").expect("search").is_empty());
    }

    #[test]
    fn text_timestamp_and_keyword_filters() {
        let service = ticking_service();
        let created = service.create(input("S-1", 3.0, &["animal"])).expect("create");
        service
            .create(SummaryInput {
                original_text: "slow turtle".to_string(),
                ..input("S-2", 3.0, &["reptile"])
            })
            .expect("create");

        assert_eq!(service.get_by_text_fragment("QUICK").expect("text").len(), 1);
        assert_eq!(service.get_by_timestamp(&created.timestamp).expect("ts").len(), 1);
        assert_eq!(service.get_by_keyword("reptile").expect("kw")[0].summary_id, "S-2");
        assert!(service.get_by_keyword("rept").expect("kw").is_empty());
    }

    #[test]
    fn execute_shapes_match_the_schema() {
        let service = ticking_service();
        let created = service
            .execute(Operation::Create {
                input: input("S-1", 4.5, &["animal"]),
            })
            .expect("create");
        assert_eq!(created["summaryID"], "S-1");
        assert_eq!(created["wordCount"], 4);

        let missing = service
            .execute(Operation::GetById { id: "x".to_string() })
            .expect("get");
        assert_eq!(missing, Value::Null);
        let replaced = service
            .execute(Operation::Replace {
                id: "x".to_string(),
                input: input("x", 3.0, &["k"]),
            })
            .expect("replace");
        assert_eq!(replaced, Value::Null);
        let deleted = service
            .execute(Operation::Delete { id: "S-1".to_string() })
            .expect("delete");
        assert_eq!(deleted, json!(true));
        assert_eq!(service.execute(Operation::ListAll).expect("list"), json!([]));
    }
}
