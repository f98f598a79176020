//! Purpose: Async access seam between the orchestrator and a summary backend.
//! Exports: `SummaryApi`.
//! Role: Lets `SummaryManager` drive a remote server or an in-process service alike.
//! Invariants: Each method is a single round trip; results are never partially visible.
//! Invariants: Blocking transports run on tokio's blocking pool, not the async workers.
#![allow(clippy::result_large_err)]

use std::future::Future;

use super::remote::RemoteClient;
use super::service::SummaryService;
use crate::core::error::{Error, ErrorKind};
use crate::core::record::{Summary, SummaryInput};

type ApiResult<T> = Result<T, Error>;

/// The operations the orchestrator sequences. `replace` answers `None` and
/// `delete` answers `false` when the id is unknown.
pub trait SummaryApi {
    fn list_all(&self) -> impl Future<Output = ApiResult<Vec<Summary>>> + Send;

    fn get_by_keyword(&self, keyword: &str)
    -> impl Future<Output = ApiResult<Vec<Summary>>> + Send;

    fn create(&self, input: &SummaryInput) -> impl Future<Output = ApiResult<Summary>> + Send;

    fn replace(
        &self,
        id: &str,
        input: &SummaryInput,
    ) -> impl Future<Output = ApiResult<Option<Summary>>> + Send;

    fn delete(&self, id: &str) -> impl Future<Output = ApiResult<bool>> + Send;
}

async fn run_blocking<T, F>(work: F) -> ApiResult<T>
where
    T: Send + 'static,
    F: FnOnce() -> ApiResult<T> + Send + 'static,
{
    tokio::task::spawn_blocking(work).await.map_err(|err| {
        Error::new(ErrorKind::Internal)
            .with_message("remote call task failed")
            .with_source(err)
    })?
}

impl SummaryApi for RemoteClient {
    fn list_all(&self) -> impl Future<Output = ApiResult<Vec<Summary>>> + Send {
        let client = self.clone();
        run_blocking(move || RemoteClient::list_all(&client))
    }

    fn get_by_keyword(
        &self,
        keyword: &str,
    ) -> impl Future<Output = ApiResult<Vec<Summary>>> + Send {
        let client = self.clone();
        let keyword = keyword.to_string();
        run_blocking(move || RemoteClient::get_by_keyword(&client, &keyword))
    }

    fn create(&self, input: &SummaryInput) -> impl Future<Output = ApiResult<Summary>> + Send {
        let client = self.clone();
        let input = input.clone();
        run_blocking(move || RemoteClient::create(&client, &input))
    }

    fn replace(
        &self,
        id: &str,
        input: &SummaryInput,
    ) -> impl Future<Output = ApiResult<Option<Summary>>> + Send {
        let client = self.clone();
        let id = id.to_string();
        let input = input.clone();
        run_blocking(move || RemoteClient::replace(&client, &id, &input))
    }

    fn delete(&self, id: &str) -> impl Future<Output = ApiResult<bool>> + Send {
        let client = self.clone();
        let id = id.to_string();
        run_blocking(move || RemoteClient::delete(&client, &id))
    }
}

/// In-process backend; used by tests and by embedders that own the store.
impl SummaryApi for SummaryService {
    fn list_all(&self) -> impl Future<Output = ApiResult<Vec<Summary>>> + Send {
        std::future::ready(SummaryService::list_all(self))
    }

    fn get_by_keyword(
        &self,
        keyword: &str,
    ) -> impl Future<Output = ApiResult<Vec<Summary>>> + Send {
        std::future::ready(SummaryService::get_by_keyword(self, keyword))
    }

    fn create(&self, input: &SummaryInput) -> impl Future<Output = ApiResult<Summary>> + Send {
        std::future::ready(SummaryService::create(self, input.clone()))
    }

    fn replace(
        &self,
        id: &str,
        input: &SummaryInput,
    ) -> impl Future<Output = ApiResult<Option<Summary>>> + Send {
        std::future::ready(SummaryService::replace(self, id, input.clone()))
    }

    fn delete(&self, id: &str) -> impl Future<Output = ApiResult<bool>> + Send {
        std::future::ready(SummaryService::delete(self, id))
    }
}
