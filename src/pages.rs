//! Exhaustive retrieval against the 1000-row page ceiling.
//!
//! Requests are strictly sequential: page N+1 is only requested after page N
//! has been consumed, since page numbers are only meaningful relative to the
//! ordering of the first request.

use std::io::Write;

use async_trait::async_trait;
use futures_util::stream::{self, Stream};
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::query::{build_query, QueryMode, PAGE_CEILING};
use crate::resource::Resource;
use crate::sink::JsonArrayWriter;
use crate::Record;

/// Bookkeeping columns the backend adds to some result shapes.
pub const INTERNAL_FIELDS: [&str; 1] = ["PK_ID"];

/// The page fetch primitive: `GET <collection>/records<query>`.
#[async_trait]
pub trait PageSource: Send + Sync {
    async fn fetch_page(&self, resource: &Resource, query: &str) -> Result<Vec<Record>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Cursor {
    Page(u64),
    Done,
}

/// Lazy, finite, non-restartable sequence of record batches.
///
/// The sequence ends after the first batch shorter than the page ceiling or
/// the first empty batch. A failed fetch also ends it; the error is returned
/// once and later calls yield `None`.
pub struct Pages<'a, S: PageSource + ?Sized> {
    source: &'a S,
    resource: &'a Resource,
    criteria: Map<String, Value>,
    cursor: Cursor,
    requests: usize,
}

impl<'a, S: PageSource + ?Sized> Pages<'a, S> {
    /// Validates `criteria` up front so invalid criteria issue no request.
    pub fn new(
        source: &'a S,
        resource: &'a Resource,
        criteria: &Map<String, Value>,
    ) -> Result<Self> {
        build_query(criteria, QueryMode::Bulk { page_number: 1 })?;
        Ok(Self {
            source,
            resource,
            criteria: criteria.clone(),
            cursor: Cursor::Page(1),
            requests: 0,
        })
    }

    /// Number of page requests issued so far.
    pub fn requests(&self) -> usize {
        self.requests
    }

    pub async fn next_batch(&mut self) -> Result<Option<Vec<Record>>> {
        let Cursor::Page(page_number) = self.cursor else {
            return Ok(None);
        };
        self.cursor = Cursor::Done;

        let query = build_query(&self.criteria, QueryMode::Bulk { page_number })?;
        debug!(resource = %self.resource, page_number, "requesting page");
        let batch = self.source.fetch_page(self.resource, &query).await?;
        self.requests += 1;
        debug!(resource = %self.resource, page_number, rows = batch.len(), "received page");

        if batch.is_empty() {
            return Ok(None);
        }
        if batch.len() as u64 >= PAGE_CEILING {
            self.cursor = Cursor::Page(page_number + 1);
        }
        Ok(Some(batch))
    }

    /// The same sequence as a [`Stream`] of batches.
    pub fn into_stream(self) -> impl Stream<Item = Result<Vec<Record>>> + 'a
    where
        S: 'a,
    {
        stream::try_unfold(self, |mut pages| async move {
            let batch = pages.next_batch().await?;
            Ok::<_, Error>(batch.map(|batch| (batch, pages)))
        })
    }
}

/// Fetch one bounded page, honoring the caller's `limit` or `pageNumber`/`pageSize`.
pub async fn fetch_records<S: PageSource + ?Sized>(
    source: &S,
    resource: &Resource,
    criteria: &Map<String, Value>,
) -> Result<Vec<Record>> {
    let query = build_query(criteria, QueryMode::Paginated)?;
    source.fetch_page(resource, &query).await
}

/// Read every matching row into memory.
///
/// Returns nothing on failure; rows from pages before the failing one are
/// discarded. Memory grows with the result set, so prefer [`stream_all`] for
/// large tables.
pub async fn fetch_all<S: PageSource + ?Sized>(
    source: &S,
    resource: &Resource,
    criteria: &Map<String, Value>,
) -> Result<Vec<Record>> {
    let mut pages = Pages::new(source, resource, criteria)?;
    let mut records = Vec::new();
    while let Some(batch) = pages.next_batch().await? {
        records.extend(batch);
    }
    debug!(
        resource = %resource,
        rows = records.len(),
        requests = pages.requests(),
        "fetched all rows"
    );
    Ok(records)
}

/// Write every matching row to `destination` as a JSON array, one batch at a time.
///
/// On success the array is terminated and flushed and the destination is
/// returned. On a failed page request the error propagates and the destination
/// keeps whatever was already flushed, unterminated; callers should discard it.
pub async fn stream_all<S, W>(
    source: &S,
    resource: &Resource,
    criteria: &Map<String, Value>,
    destination: W,
) -> Result<W>
where
    S: PageSource + ?Sized,
    W: Write,
{
    let mut pages = Pages::new(source, resource, criteria)?;
    let mut sink = JsonArrayWriter::open(destination)?;
    while let Some(batch) = pages.next_batch().await? {
        for mut record in batch {
            strip_internal_fields(&mut record);
            sink.write(&record)?;
        }
    }
    let rows = sink.count();
    let destination = sink.close()?;
    info!(resource = %resource, rows, requests = pages.requests(), "stream complete");
    Ok(destination)
}

pub fn strip_internal_fields(record: &mut Record) {
    for field in INTERNAL_FIELDS {
        record.shift_remove(field);
    }
}
