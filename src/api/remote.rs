//! Purpose: Provide a blocking HTTP client for the summary query endpoint.
//! Exports: `RemoteClient`.
//! Role: One request per operation; unwraps `data` or surfaces a typed `Error`.
//! Invariants: Request/response envelopes come from `api::protocol`.
//! Invariants: Transport failures map to `ErrorKind::Io`; server errors keep their kind.
//! Invariants: Base URLs carry no path; the endpoint path is fixed.
#![allow(clippy::result_large_err)]

use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use url::Url;

use super::protocol::{DataEnvelope, ErrorEnvelope, Operation, QUERY_PATH};
use crate::core::error::{Error, ErrorKind};
use crate::core::record::{Summary, SummaryInput};

type ApiResult<T> = Result<T, Error>;

#[derive(Clone)]
pub struct RemoteClient {
    inner: Arc<RemoteClientInner>,
}

struct RemoteClientInner {
    query_url: Url,
    agent: ureq::Agent,
}

impl RemoteClient {
    pub fn new(base_url: impl Into<String>) -> ApiResult<Self> {
        let base_url = normalize_base_url(base_url.into())?;
        let query_url = build_url(&base_url, &QUERY_PATH)?;
        let agent = ureq::AgentBuilder::new().build();
        Ok(Self {
            inner: Arc::new(RemoteClientInner {
                query_url,
                agent,
            }),
        })
    }

    /// Applies a per-request timeout (connect + read).
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(timeout).build();
        self.inner = Arc::new(RemoteClientInner {
            query_url: self.inner.query_url.clone(),
            agent,
        });
        self
    }

    pub fn list_all(&self) -> ApiResult<Vec<Summary>> {
        self.execute(&Operation::ListAll)
    }

    pub fn get_by_id(&self, id: &str) -> ApiResult<Option<Summary>> {
        self.execute(&Operation::GetById { id: id.to_string() })
    }

    pub fn get_by_text_fragment(&self, text: &str) -> ApiResult<Vec<Summary>> {
        self.execute(&Operation::GetByTextFragment {
            text: text.to_string(),
        })
    }

    pub fn get_by_timestamp(&self, ts: &str) -> ApiResult<Vec<Summary>> {
        self.execute(&Operation::GetByTimestamp { ts: ts.to_string() })
    }

    pub fn get_by_keyword(&self, keyword: &str) -> ApiResult<Vec<Summary>> {
        self.execute(&Operation::GetByKeyword {
            keyword: keyword.to_string(),
        })
    }

    pub fn get_by_rating_range(&self, min: f64, max: f64) -> ApiResult<Vec<Summary>> {
        self.execute(&Operation::GetByRatingRange { min, max })
    }

    pub fn create(&self, input: &SummaryInput) -> ApiResult<Summary> {
        self.execute(&Operation::Create {
            input: input.clone(),
        })
        .map_err(|err| with_id_if_missing(err, &input.summary_id))
    }

    pub fn replace(&self, id: &str, input: &SummaryInput) -> ApiResult<Option<Summary>> {
        self.execute(&Operation::Replace {
            id: id.to_string(),
            input: input.clone(),
        })
        .map_err(|err| with_id_if_missing(err, id))
    }

    pub fn delete(&self, id: &str) -> ApiResult<bool> {
        self.execute(&Operation::Delete { id: id.to_string() })
            .map_err(|err| with_id_if_missing(err, id))
    }

    pub fn execute<R>(&self, operation: &Operation) -> ApiResult<R>
    where
        R: DeserializeOwned,
    {
        let payload = serde_json::to_string(operation).map_err(|err| {
            Error::new(ErrorKind::Internal)
                .with_message("failed to encode request json")
                .with_source(err)
        })?;
        tracing::debug!(operation = operation.name(), "remote request");
        let response = self
            .inner
            .agent
            .post(self.inner.query_url.as_str())
            .set("Accept", "application/json")
            .set("Content-Type", "application/json")
            .send_string(&payload);

        match response {
            Ok(resp) => {
                let envelope: DataEnvelope<R> = read_json_response(resp)?;
                Ok(envelope.data)
            }
            Err(ureq::Error::Status(code, resp)) => Err(parse_error_response(code, resp)),
            Err(ureq::Error::Transport(err)) => Err(Error::new(ErrorKind::Io)
                .with_message("request failed")
                .with_source(err)),
        }
    }
}

fn with_id_if_missing(err: Error, id: &str) -> Error {
    if err.id().is_some() { err } else { err.with_id(id) }
}

fn normalize_base_url(raw: String) -> ApiResult<Url> {
    let mut url = Url::parse(&raw).map_err(|err| {
        Error::new(ErrorKind::Usage)
            .with_message("invalid remote base url")
            .with_source(err)
    })?;
    let scheme = url.scheme();
    if scheme != "http" && scheme != "https" {
        return Err(Error::new(ErrorKind::Usage)
            .with_message("remote base url must use http or https scheme"));
    }
    if url.path() != "/" && !url.path().is_empty() {
        return Err(
            Error::new(ErrorKind::Usage).with_message("remote base url must not include a path")
        );
    }
    url.set_path("/");
    url.set_query(None);
    url.set_fragment(None);
    Ok(url)
}

fn build_url(base_url: &Url, segments: &[&str]) -> ApiResult<Url> {
    let mut url = base_url.clone();
    {
        let mut path = url.path_segments_mut().map_err(|_| {
            Error::new(ErrorKind::Usage).with_message("remote base url cannot be a base")
        })?;
        path.clear();
        for segment in segments {
            path.push(segment);
        }
    }
    Ok(url)
}

fn read_json_response<R>(response: ureq::Response) -> ApiResult<R>
where
    R: DeserializeOwned,
{
    let body = response.into_string().map_err(|err| {
        Error::new(ErrorKind::Io)
            .with_message("failed to read response body")
            .with_source(err)
    })?;
    serde_json::from_str(&body).map_err(|err| {
        Error::new(ErrorKind::Internal)
            .with_message("invalid response json")
            .with_source(err)
    })
}

fn parse_error_response(status: u16, response: ureq::Response) -> Error {
    let body = response.into_string().unwrap_or_default();
    if let Ok(envelope) = serde_json::from_str::<ErrorEnvelope>(&body) {
        return envelope.error.into_error();
    }
    let kind = error_kind_from_status(status);
    Error::new(kind).with_message(format!("remote error status {status}"))
}

fn error_kind_from_status(status: u16) -> ErrorKind {
    match status {
        400 | 413 | 415 | 422 => ErrorKind::Usage,
        401 | 403 => ErrorKind::Permission,
        404 => ErrorKind::NotFound,
        409 => ErrorKind::AlreadyExists,
        500..=599 => ErrorKind::Internal,
        _ => ErrorKind::Io,
    }
}
