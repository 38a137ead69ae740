//! Lazy iteration over paginated list endpoints.
//!
//! # Responsibilities
//! - Fetch pages on demand as the consumer pulls records
//! - Yield records in server order without dedup or reordering
//! - One-shot page, find-one and detail lookups
//!
//! # Design Decisions
//! - Each `iterate_all` call starts a fresh cursor at offset 0
//! - A failed fetch ends the stream with the executor's error; no resume
//! - Records added or removed while iterating may be skipped or repeated

use futures_util::stream::{self, Stream, TryStreamExt};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::error::{ApiError, ApiResult};
use crate::http::{ApiRequest, RequestExecutor, Target};
use crate::lifecycle::Cancellation;
use crate::pagination::cursor::PageCursor;

/// One page of a list endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct PageResult<T> {
    pub count: u64,
    pub results: Vec<T>,
}

/// Reads list endpoints through the executor.
#[derive(Debug, Clone)]
pub struct PageIterator {
    executor: RequestExecutor,
    page_size: u64,
}

struct PageState {
    executor: RequestExecutor,
    endpoint: String,
    params: Vec<(String, String)>,
    cancel: Cancellation,
    cursor: PageCursor,
}

impl PageIterator {
    pub fn new(executor: RequestExecutor, page_size: u64) -> Self {
        Self {
            executor,
            page_size: page_size.max(1),
        }
    }

    pub fn page_size(&self) -> u64 {
        self.page_size
    }

    /// Stream every record of `endpoint`, fetching pages lazily.
    pub fn iterate_all<T>(
        &self,
        endpoint: &str,
        params: Vec<(String, String)>,
        cancel: Cancellation,
    ) -> impl Stream<Item = ApiResult<T>> + Send + 'static
    where
        T: DeserializeOwned + Send + 'static,
    {
        let state = PageState {
            executor: self.executor.clone(),
            endpoint: endpoint.to_string(),
            params,
            cancel,
            cursor: PageCursor::new(self.page_size),
        };

        stream::try_unfold(state, |mut state| async move {
            if state.cursor.is_exhausted() {
                return Ok::<_, ApiError>(None);
            }
            let page: PageResult<T> = fetch_page(
                &state.executor,
                &state.endpoint,
                state.cursor.offset,
                state.cursor.limit,
                &state.params,
                &state.cancel,
            )
            .await?;
            state
                .cursor
                .advance(page.results.len() as u64, page.count);
            Ok(Some((page.results, state)))
        })
        .map_ok(|records| stream::iter(records.into_iter().map(Ok::<T, ApiError>)))
        .try_flatten()
    }

    /// Fetch a single page. Caller `offset`/`limit` params are replaced by the arguments.
    pub async fn page<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        offset: u64,
        limit: u64,
        params: &[(String, String)],
        cancel: &Cancellation,
    ) -> ApiResult<PageResult<T>> {
        fetch_page(&self.executor, endpoint, offset, limit, params, cancel).await
    }

    /// The single record matching `params`.
    pub async fn find_one<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &[(String, String)],
        cancel: &Cancellation,
    ) -> ApiResult<T> {
        let page: PageResult<T> = fetch_page(&self.executor, endpoint, 0, 2, params, cancel).await?;
        match page.count {
            0 => Err(ApiError::NotFound),
            1 => page.results.into_iter().next().ok_or(ApiError::NotFound),
            n => Err(ApiError::MultipleObjectsReturned(n)),
        }
    }

    /// Fetch one record by path or platform URL. A 404 becomes `NotFound`.
    pub async fn detail<T: DeserializeOwned>(
        &self,
        location: &str,
        cancel: &Cancellation,
    ) -> ApiResult<T> {
        let request = ApiRequest::new(reqwest::Method::GET, Target::from_location(location));
        match self.executor.execute_json(&request, cancel).await {
            Err(ApiError::Client { status: 404, .. }) => Err(ApiError::NotFound),
            other => other,
        }
    }
}

async fn fetch_page<T: DeserializeOwned>(
    executor: &RequestExecutor,
    endpoint: &str,
    offset: u64,
    limit: u64,
    params: &[(String, String)],
    cancel: &Cancellation,
) -> ApiResult<PageResult<T>> {
    let filters = params
        .iter()
        .filter(|(key, _)| !is_cursor_param(key))
        .cloned();
    let request = ApiRequest::new(reqwest::Method::GET, Target::from_location(endpoint))
        .params(filters)
        .query("offset", offset)
        .query("limit", limit);
    executor.execute_json(&request, cancel).await
}

// The cursor owns the window; a caller's own offset/limit would duplicate it.
fn is_cursor_param(key: &str) -> bool {
    key == "offset" || key == "limit"
}
