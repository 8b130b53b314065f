//! # Item Contracts
//!
//! The three seams of a chunk step. Readers are driven by one worker at a
//! time and take `&mut self`; processors and writers are shared across
//! workers and take `&self`.

use async_trait::async_trait;
use std::marker::PhantomData;

use crate::error::Result;

/// A lazy, finite, restartable-per-run sequence of records.
///
/// `Ok(None)` signals end of sequence. Implementations are strictly
/// sequential; sharing one reader between workers requires
/// [`SynchronizedReader`](crate::batch::SynchronizedReader).
#[async_trait]
pub trait ItemReader<T>: Send {
    async fn read(&mut self) -> Result<Option<T>>;
}

/// Transform from input record to output record. May read from the store
/// but must not mutate it; persistence belongs to the writer.
///
/// `Ok(None)` skips the record: it is dropped from the chunk without
/// failing it. Any `Err` aborts the whole chunk.
#[async_trait]
pub trait ItemProcessor<I, O>: Send + Sync {
    async fn process(&self, item: I) -> Result<Option<O>>;
}

/// Persists one chunk's surviving records.
///
/// One call is one commit boundary: the write either applies entirely or
/// not at all, and an `Err` rolls the chunk back.
#[async_trait]
pub trait ItemWriter<O>: Send + Sync {
    async fn write(&self, items: Vec<O>) -> Result<()>;
}

/// Identity processor for steps whose writer does all the work.
pub struct PassThroughProcessor<T> {
    _marker: PhantomData<fn(T) -> T>,
}

impl<T> Default for PassThroughProcessor<T> {
    fn default() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T> PassThroughProcessor<T> {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl<T: Send + 'static> ItemProcessor<T, T> for PassThroughProcessor<T> {
    async fn process(&self, item: T) -> Result<Option<T>> {
        Ok(Some(item))
    }
}
