//! # Synchronized Reader Wrapper
//!
//! Makes a strictly sequential reader shareable by N step workers. A cursor
//! holds server-side position state that interleaved advancement corrupts,
//! so `read` runs inside a mutual-exclusion critical section: exactly one
//! worker advances the delegate at a time, no record is ever handed to two
//! workers, and once the delegate reports end-of-sequence every later call
//! observes the same terminal signal without touching the delegate again.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::batch::item::ItemReader;
use crate::error::Result;

struct SyncState<R> {
    delegate: R,
    done: bool,
}

/// Mutual-exclusion wrapper around a non-thread-safe [`ItemReader`].
///
/// Cloned handles share the same delegate; each worker owns one handle.
pub struct SynchronizedReader<R> {
    inner: Arc<Mutex<SyncState<R>>>,
}

impl<R> SynchronizedReader<R> {
    pub fn new(delegate: R) -> Self {
        Self {
            inner: Arc::new(Mutex::new(SyncState {
                delegate,
                done: false,
            })),
        }
    }
}

impl<R> Clone for SynchronizedReader<R> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

#[async_trait]
impl<T, R> ItemReader<T> for SynchronizedReader<R>
where
    T: Send + 'static,
    R: ItemReader<T> + Send,
{
    async fn read(&mut self) -> Result<Option<T>> {
        let mut state = self.inner.lock().await;
        if state.done {
            return Ok(None);
        }
        match state.delegate.read().await? {
            Some(item) => Ok(Some(item)),
            None => {
                state.done = true;
                Ok(None)
            }
        }
    }
}
