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

//! Blocking bridge over the async operations.
//!
//! Every operation in storekit is async. Callers that drive storage from
//! synchronous code (test harnesses, scripts) use [`BlockingRuntime`] to run
//! them to completion on a private current-thread runtime. The only place a
//! blocking enumeration waits on I/O is when it crosses a page boundary.

use crate::{FetchPage, PagedLister, Result};
use std::future::Future;

/// A private runtime used to run storekit operations synchronously.
///
/// Must not be used from within an async context: tokio refuses to block a
/// thread that is driving another runtime.
#[derive(Debug)]
pub struct BlockingRuntime {
    rt: tokio::runtime::Runtime,
}

impl BlockingRuntime {
    /// Create a new current-thread runtime.
    pub fn new() -> Result<Self> {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        Ok(Self { rt })
    }

    /// Run a future to completion on this runtime.
    pub fn block_on<F: Future>(&self, fut: F) -> F::Output {
        self.rt.block_on(fut)
    }

    /// Turn a lister into a blocking iterator.
    pub fn iter<F: FetchPage>(&self, lister: PagedLister<F>) -> BlockingIter<'_, F> {
        BlockingIter { rt: self, lister }
    }
}

/// Blocking iterator over a [`PagedLister`].
///
/// Yields `Err` at most once: a failed listing is finished.
#[derive(Debug)]
pub struct BlockingIter<'a, F: FetchPage> {
    rt: &'a BlockingRuntime,
    lister: PagedLister<F>,
}

impl<F: FetchPage> BlockingIter<'_, F> {
    /// Number of pages fetched so far.
    pub fn pages_fetched(&self) -> usize {
        self.lister.pages_fetched()
    }
}

impl<F: FetchPage> Iterator for BlockingIter<'_, F> {
    type Item = Result<F::Item>;

    fn next(&mut self) -> Option<Self::Item> {
        self.rt.block_on(self.lister.next()).transpose()
    }
}
