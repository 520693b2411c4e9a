// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

use crate::{Error, Result};
use async_trait::async_trait;
use futures::Stream;
use log::debug;
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::fmt::{self, Debug};
use std::future::Future;
use std::marker::PhantomData;
use tokio_util::sync::CancellationToken;

/// Opaque continuation cursor returned by a paged listing call.
///
/// A cursor is never empty: an empty token returned by a service is the
/// canonical "no more data" sentinel and is represented as `None`.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Cursor(String);

impl Cursor {
    /// Create a cursor from a service token, returning `None` for the empty sentinel.
    pub fn new(token: impl Into<String>) -> Option<Self> {
        let token = token.into();
        if token.is_empty() {
            None
        } else {
            Some(Self(token))
        }
    }

    /// Get the raw token.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Debug for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Cursor({})", self.0)
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One page of a listing: items in service order plus the cursor of the next page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    items: Vec<T>,
    next: Option<Cursor>,
}

impl<T> Page<T> {
    /// Create a page.
    ///
    /// `next` of `None` or `Some("")` marks the final page.
    pub fn new<S: Into<String>>(items: Vec<T>, next: Option<S>) -> Self {
        Self {
            items,
            next: next.and_then(Cursor::new),
        }
    }

    /// Create the final page of a listing.
    pub fn last(items: Vec<T>) -> Self {
        Self { items, next: None }
    }

    /// Items of this page.
    pub fn items(&self) -> &[T] {
        &self.items
    }

    /// Cursor of the next page, `None` if this page is the last one.
    pub fn next_cursor(&self) -> Option<&Cursor> {
        self.next.as_ref()
    }

    /// Split the page into its items and next cursor.
    pub fn into_parts(self) -> (Vec<T>, Option<Cursor>) {
        (self.items, self.next)
    }
}

/// Immutable descriptor of a listing operation.
///
/// The page size is a hint only: services may return more or fewer items per
/// page, and callers must not rely on a fixed page size.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListingRequest {
    prefix: Option<String>,
    include: BTreeSet<String>,
    options: BTreeMap<String, String>,
    page_size: Option<u32>,
}

impl ListingRequest {
    /// Create a listing request without filters, details or page size hint.
    pub fn new() -> Self {
        Self::default()
    }

    /// Only list items whose name starts with `prefix`.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        self.prefix = if prefix.is_empty() { None } else { Some(prefix) };
        self
    }

    /// Ask the service to include an extra detail such as `metadata` or `snapshots`.
    pub fn with_include(mut self, detail: impl Into<String>) -> Self {
        self.include.insert(detail.into());
        self
    }

    /// Set a resource-type specific option recognized by the fetch function.
    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    /// Set the requested page size.
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = Some(page_size);
        self
    }

    /// Set the requested page size, `None` leaves the choice to the service.
    pub fn with_page_size_hint(mut self, page_size: Option<u32>) -> Self {
        self.page_size = page_size;
        self
    }

    /// The name prefix filter.
    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    /// Check whether an extra detail is requested.
    pub fn includes(&self, detail: &str) -> bool {
        self.include.contains(detail)
    }

    /// All requested extra details.
    pub fn include(&self) -> &BTreeSet<String> {
        &self.include
    }

    /// Get a resource-type specific option.
    pub fn option(&self, key: &str) -> Option<&str> {
        self.options.get(key).map(String::as_str)
    }

    /// The requested page size.
    pub fn page_size(&self) -> Option<u32> {
        self.page_size
    }
}

/// FetchPage is the trait used by [`PagedLister`] to request one page.
///
/// Retries and timeouts belong to the implementation of this trait (or the
/// transport behind it), never to the lister.
///
/// The lister hands over its cancellation token, if any, so a transport can
/// abort a request that is already in flight.
#[async_trait]
pub trait FetchPage: Debug + Send + Sync + 'static {
    /// Item produced by the listing.
    type Item: Send + 'static;

    /// Fetch the page starting at `cursor`, or the first page if `cursor` is `None`.
    async fn fetch_page(
        &self,
        req: &ListingRequest,
        cursor: Option<&Cursor>,
        cancel: Option<&CancellationToken>,
    ) -> Result<Page<Self::Item>>;
}

/// Adapts a closure into a [`FetchPage`] implementation.
pub struct FnFetch<T, F> {
    f: F,
    _item: PhantomData<fn() -> T>,
}

impl<T, F, Fut> FnFetch<T, F>
where
    F: Fn(ListingRequest, Option<Cursor>, Option<CancellationToken>) -> Fut,
    Fut: Future<Output = Result<Page<T>>>,
{
    /// Wrap a closure taking the request, the cursor of the page to fetch and
    /// the lister's cancellation token.
    pub fn new(f: F) -> Self {
        Self {
            f,
            _item: PhantomData,
        }
    }
}

impl<T, F> Debug for FnFetch<T, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnFetch").finish_non_exhaustive()
    }
}

#[async_trait]
impl<T, F, Fut> FetchPage for FnFetch<T, F>
where
    T: Send + 'static,
    F: Fn(ListingRequest, Option<Cursor>, Option<CancellationToken>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Page<T>>> + Send + 'static,
{
    type Item = T;

    async fn fetch_page(
        &self,
        req: &ListingRequest,
        cursor: Option<&Cursor>,
        cancel: Option<&CancellationToken>,
    ) -> Result<Page<T>> {
        (self.f)(req.clone(), cursor.cloned(), cancel.cloned()).await
    }
}

#[derive(Debug, Clone)]
enum ListState {
    Start,
    Next(Cursor),
    Done,
}

/// PagedLister turns a cursor-paginated listing primitive into one logical
/// enumeration.
///
/// - Pages are fetched strictly in sequence: the next page is only requested
///   once every item of the current page has been handed out.
/// - The enumeration ends when a page carries no continuation cursor. Pages
///   without items but with a cursor are skipped, not treated as the end.
/// - A lister is not restartable. Once exhausted, failed or cancelled it
///   yields nothing more; build a new one (or [`PagedLister::resume`]) to
///   enumerate again.
pub struct PagedLister<F: FetchPage> {
    fetcher: F,
    request: ListingRequest,
    state: ListState,
    buffer: VecDeque<F::Item>,
    pages: usize,
    cancel: Option<CancellationToken>,
}

impl<F: FetchPage> Debug for PagedLister<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PagedLister")
            .field("fetcher", &self.fetcher)
            .field("request", &self.request)
            .field("state", &self.state)
            .field("buffered", &self.buffer.len())
            .field("pages", &self.pages)
            .finish()
    }
}

impl<F: FetchPage> PagedLister<F> {
    /// Create a lister starting from the first page.
    pub fn new(fetcher: F, request: ListingRequest) -> Self {
        Self {
            fetcher,
            request,
            state: ListState::Start,
            buffer: VecDeque::new(),
            pages: 0,
            cancel: None,
        }
    }

    /// Create a lister that continues from `cursor`, typically the cursor
    /// carried by a `ListingFailed` error.
    pub fn resume(fetcher: F, request: ListingRequest, cursor: Option<Cursor>) -> Self {
        let mut lister = Self::new(fetcher, request);
        if let Some(cursor) = cursor {
            lister.state = ListState::Next(cursor);
        }
        lister
    }

    /// Stop fetching further pages once `token` is cancelled.
    ///
    /// The token is checked before every page fetch and passed on to the
    /// fetcher. Whether a page already in flight is aborted is up to the
    /// fetcher.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// The request this lister enumerates.
    pub fn request(&self) -> &ListingRequest {
        &self.request
    }

    /// Number of pages fetched so far.
    pub fn pages_fetched(&self) -> usize {
        self.pages
    }

    /// Check whether the enumeration has ended and every item was handed out.
    pub fn is_exhausted(&self) -> bool {
        matches!(self.state, ListState::Done) && self.buffer.is_empty()
    }

    /// Get the next item, fetching the next page when the current one is drained.
    pub async fn next(&mut self) -> Result<Option<F::Item>> {
        loop {
            if let Some(item) = self.buffer.pop_front() {
                return Ok(Some(item));
            }

            match self.fetch().await? {
                Some(items) => self.buffer.extend(items),
                None => return Ok(None),
            }
        }
    }

    /// Get the next page of items as returned by the service.
    ///
    /// Items buffered by earlier calls to [`PagedLister::next`] are returned
    /// first. Empty intermediate pages are returned as empty vectors.
    pub async fn next_page(&mut self) -> Result<Option<Vec<F::Item>>> {
        if !self.buffer.is_empty() {
            return Ok(Some(self.buffer.drain(..).collect()));
        }

        self.fetch().await
    }

    /// Drain the whole enumeration into a vector.
    pub async fn collect(mut self) -> Result<Vec<F::Item>> {
        let mut items: Vec<F::Item> = self.buffer.drain(..).collect();
        while let Some(page) = self.fetch().await? {
            items.extend(page);
        }
        Ok(items)
    }

    /// Turn the lister into a stream of items.
    pub fn into_stream(self) -> impl Stream<Item = Result<F::Item>> {
        futures::stream::try_unfold(self, |mut lister| async move {
            Ok(lister.next().await?.map(|item| (item, lister)))
        })
    }

    async fn fetch(&mut self) -> Result<Option<Vec<F::Item>>> {
        let cursor = match &self.state {
            ListState::Start => None,
            ListState::Next(cursor) => Some(cursor.clone()),
            ListState::Done => return Ok(None),
        };

        if self.cancel.as_ref().is_some_and(|t| t.is_cancelled()) {
            self.state = ListState::Done;
            return Err(Error::cancelled(format!(
                "listing cancelled after {} pages",
                self.pages
            ))
            .with_cursor(cursor));
        }

        let page = match self
            .fetcher
            .fetch_page(&self.request, cursor.as_ref(), self.cancel.as_ref())
            .await {
            Ok(page) => page,
            Err(err) => {
                self.state = ListState::Done;
                return Err(Error::listing_failed(format!(
                    "fetch page {} failed",
                    self.pages + 1
                ))
                .with_cursor(cursor)
                .with_source(err));
            }
        };
        self.pages += 1;

        let (items, next) = page.into_parts();
        debug!(
            "fetched page {} with {} items, has next: {}",
            self.pages,
            items.len(),
            next.is_some()
        );

        self.state = match next {
            Some(cursor) => ListState::Next(cursor),
            None => ListState::Done,
        };
        Ok(Some(items))
    }
}
