//! # Reader Strategies
//!
//! Two ways to turn a store query into an [`ItemReader`]: offset paging and
//! a single open cursor. Both capture their filter parameters at
//! construction, which is how a step pins its horizon to one point in time
//! for the whole run.

use async_trait::async_trait;
use futures::future::BoxFuture;
use std::collections::VecDeque;

use crate::batch::item::ItemReader;
use crate::error::{BatchError, Result};
use crate::store::RecordCursor;

/// Fetches one page: `(offset, limit)` → records ordered by an immutable key.
pub type PageFetcher<T> = Box<dyn FnMut(u64, u64) -> BoxFuture<'static, Result<Vec<T>>> + Send>;

/// Offset/limit reader over a filtered, stably-ordered query.
///
/// Re-issues the query every page, so it is snapshot-inconsistent under
/// concurrent mutation of the filtered set: rows entering the set behind
/// the current offset are missed, and rows leaving it shift later rows
/// across page boundaries. Safe whenever the step's own writes do not
/// change which rows match; the fetcher's filter must be anchored to a
/// point-in-time parameter captured once, before the step starts.
pub struct PagingReader<T> {
    fetch: PageFetcher<T>,
    page_size: u64,
    offset: u64,
    buffer: VecDeque<T>,
    exhausted: bool,
}

impl<T> PagingReader<T> {
    pub fn new(page_size: u64, fetch: PageFetcher<T>) -> Self {
        Self {
            fetch,
            page_size,
            offset: 0,
            buffer: VecDeque::new(),
            exhausted: false,
        }
    }
}

#[async_trait]
impl<T: Send + 'static> ItemReader<T> for PagingReader<T> {
    async fn read(&mut self) -> Result<Option<T>> {
        if self.buffer.is_empty() && !self.exhausted {
            let page = (self.fetch)(self.offset, self.page_size).await?;
            if (page.len() as u64) < self.page_size {
                self.exhausted = true;
            }
            self.offset += page.len() as u64;
            self.buffer.extend(page);
        }
        Ok(self.buffer.pop_front())
    }
}

/// Opens the underlying cursor on first read.
pub type CursorOpener<T> =
    Box<dyn FnOnce() -> BoxFuture<'static, Result<RecordCursor<T>>> + Send>;

enum CursorState<T> {
    Unopened(CursorOpener<T>),
    Open(RecordCursor<T>),
    Failed,
}

/// Reader over one open, strictly sequential store cursor.
///
/// The cursor is opened lazily on the first `read`, with whatever filter
/// parameters the opener captured at construction. Preferred when the
/// step's writes only touch records the cursor has already yielded, as in
/// the notification dispatch step.
pub struct CursorReader<T> {
    state: CursorState<T>,
}

impl<T: Send + 'static> CursorReader<T> {
    pub fn new(opener: CursorOpener<T>) -> Self {
        Self {
            state: CursorState::Unopened(opener),
        }
    }

    pub fn from_cursor(cursor: RecordCursor<T>) -> Self {
        Self {
            state: CursorState::Open(cursor),
        }
    }
}

#[async_trait]
impl<T: Send + 'static> ItemReader<T> for CursorReader<T> {
    async fn read(&mut self) -> Result<Option<T>> {
        if matches!(self.state, CursorState::Unopened(_)) {
            let opener = match std::mem::replace(&mut self.state, CursorState::Failed) {
                CursorState::Unopened(opener) => opener,
                _ => {
                    return Err(BatchError::Concurrency(
                        "cursor reader state changed underneath us".to_string(),
                    ))
                }
            };
            self.state = CursorState::Open(opener().await?);
        }

        match &mut self.state {
            CursorState::Open(cursor) => cursor.next().await,
            CursorState::Failed => Err(BatchError::StoreRead(
                "cursor failed to open; reader is unusable".to_string(),
            )),
            CursorState::Unopened(_) => Err(BatchError::Concurrency(
                "cursor reader state changed underneath us".to_string(),
            )),
        }
    }
}
