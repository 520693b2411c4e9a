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

//! Core components for listing and granting access to storage resources.
//!
//! This crate provides the service-independent building blocks of the storekit
//! ecosystem: cursor-driven listing, the shared error taxonomy, and the small
//! set of helpers (time, hashing, redaction) that service crates rely on.
//!
//! ## Overview
//!
//! - **PagedLister**: turns a cursor-paginated listing primitive into one
//!   logical enumeration of items.
//! - **Context**: a container for environment access so configuration loading
//!   can be driven by tests.
//! - **Error**: one error type with a kind per failure condition, so callers
//!   can match on exactly which condition was rejected.
//!
//! ## Example
//!
//! ```no_run
//! use storekit_core::{Cursor, FnFetch, ListingRequest, Page, PagedLister, Result};
//!
//! # async fn example() -> Result<()> {
//! let fetch = FnFetch::new(|_req: ListingRequest, cursor: Option<Cursor>, _| async move {
//!     match cursor {
//!         None => Ok(Page::new(vec!["a", "b"], Some("b"))),
//!         Some(_) => Ok(Page::last(vec!["c"])),
//!     }
//! });
//!
//! let lister = PagedLister::new(fetch, ListingRequest::new().with_page_size(2));
//! let items = lister.collect().await?;
//! assert_eq!(items, vec!["a", "b", "c"]);
//! # Ok(())
//! # }
//! ```
//!
//! ## Traits
//!
//! - [`FetchPage`]: fetch one page of a listing.
//! - [`Env`]: environment variable access.
//!
//! ## Utilities
//!
//! - [`hash`]: HMAC and base64 helpers used for signing
//! - [`time`]: UTC time helpers with whole-second semantics
//! - [`utils`]: general utilities including data redaction
//! - [`blocking`]: synchronous bridge over the async operations

// Make sure all our public APIs have docs.
#![warn(missing_docs)]

pub mod blocking;
pub mod hash;
pub mod time;
pub mod utils;

mod context;
pub use context::{Context, Env, OsEnv, StaticEnv};
mod error;
pub use error::{Error, ErrorKind, Result};
mod paging;
pub use paging::{Cursor, FetchPage, FnFetch, ListingRequest, Page, PagedLister};
pub use tokio_util::sync::CancellationToken;
