// Summary record types shared by the store, the query surface, and clients.
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::core::error::{Error, ErrorKind};

/// A stored summary. Field names on the wire follow the public schema
/// (`summaryID`, `originalText`, `wordCount`).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    #[serde(rename = "summaryID")]
    pub summary_id: String,
    pub original_text: String,
    pub summary: String,
    pub timestamp: String,
    pub keywords: Vec<String>,
    pub rating: f64,
    pub word_count: u32,
}

/// Everything a caller supplies for create/replace; the timestamp is always
/// assigned server-side.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryInput {
    #[serde(rename = "summaryID")]
    pub summary_id: String,
    pub original_text: String,
    pub summary: String,
    pub keywords: Vec<String>,
    pub rating: f64,
    pub word_count: u32,
}

impl SummaryInput {
    pub fn stamp(self, timestamp: impl Into<String>) -> Summary {
        Summary {
            summary_id: self.summary_id,
            original_text: self.original_text,
            summary: self.summary,
            timestamp: timestamp.into(),
            keywords: self.keywords,
            rating: self.rating,
            word_count: self.word_count,
        }
    }
}

impl Summary {
    pub fn to_input(&self) -> SummaryInput {
        SummaryInput {
            summary_id: self.summary_id.clone(),
            original_text: self.original_text.clone(),
            summary: self.summary.clone(),
            keywords: self.keywords.clone(),
            rating: self.rating,
            word_count: self.word_count,
        }
    }

    /// Parsed timestamp; `None` for values that are not RFC 3339.
    pub fn timestamp_value(&self) -> Option<OffsetDateTime> {
        OffsetDateTime::parse(&self.timestamp, &Rfc3339).ok()
    }
}

pub fn format_timestamp(ts: OffsetDateTime) -> Result<String, Error> {
    ts.format(&Rfc3339).map_err(|err| {
        Error::new(ErrorKind::Internal)
            .with_message("timestamp format failed")
            .with_source(err)
    })
}

/// Newest first. Records whose timestamps do not parse sort after the rest,
/// and ties keep their stored order.
pub fn sort_newest_first(records: &mut [Summary]) {
    records.sort_by(|a, b| {
        match (a.timestamp_value(), b.timestamp_value()) {
            (Some(a), Some(b)) => b.cmp(&a),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => b.timestamp.cmp(&a.timestamp),
        }
    });
}
