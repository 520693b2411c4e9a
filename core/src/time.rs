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

//! Time related utils.
//!
//! All instants are UTC. Comparisons that decide whether an access window is
//! valid are made at whole-second granularity: sub-second components are
//! accepted on input and truncated toward the second.

use crate::{Error, Result};
use chrono::{SecondsFormat, Timelike, Utc};

/// DateTime is the alias for `chrono::DateTime<Utc>`.
pub type DateTime = chrono::DateTime<Utc>;

/// Create datetime of now.
pub fn now() -> DateTime {
    Utc::now()
}

/// Truncate the sub-second component of a datetime.
pub fn truncate_to_second(t: DateTime) -> DateTime {
    // Zero nanoseconds is always representable, so this never falls back.
    t.with_nanosecond(0).unwrap_or(t)
}

/// Check that `start` is strictly before `end` once both are truncated to the second.
pub fn is_strictly_before(start: DateTime, end: DateTime) -> bool {
    truncate_to_second(start) < truncate_to_second(end)
}

/// Format time into the signed-URL form: `2022-03-13T07:20:04Z`.
///
/// Sub-second components are dropped.
pub fn format_rfc3339(t: DateTime) -> String {
    truncate_to_second(t).to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Parse an RFC 3339 string into a UTC datetime.
pub fn parse_rfc3339(s: &str) -> Result<DateTime> {
    chrono::DateTime::parse_from_rfc3339(s)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| Error::unexpected(format!("parse '{s}' into rfc3339 failed")).with_source(e))
}
