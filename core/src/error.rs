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

use crate::Cursor;
use std::fmt;
use thiserror::Error;

/// The error type for storekit operations
#[derive(Error, Debug)]
#[error("{kind}: {message}")]
pub struct Error {
    kind: ErrorKind,
    message: String,
    cursor: Option<Cursor>,
    #[source]
    source: Option<anyhow::Error>,
}

/// The kind of error that occurred
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The underlying network or service call failed.
    Transport,

    /// The addressed resource does not exist on the service.
    NotFound,

    /// A page fetch failed in the middle of an enumeration.
    ///
    /// The error carries the cursor of the page that could not be fetched.
    ListingFailed,

    /// The enumeration was cancelled between two page fetches.
    Cancelled,

    /// More named policies than a resource can hold.
    TooManyPolicies,

    /// A policy name is empty, too long, or duplicated.
    InvalidPolicyName,

    /// A policy or grant has no usable validity window.
    InvalidPolicyWindow,

    /// A permission is not valid for the resource it is applied to.
    InvalidPermissions,

    /// The referenced named policy does not exist on the resource.
    PolicyNotFound,

    /// A client address range is malformed or empty.
    InvalidIpRange,

    /// Configuration error (missing fields, invalid values)
    ConfigInvalid,

    /// Credentials exist but are invalid/malformed
    CredentialInvalid,

    /// Unexpected errors
    Unexpected,
}

impl Error {
    /// Create a new error with the given kind and message
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            cursor: None,
            source: None,
        }
    }

    /// Add a source error
    pub fn with_source(mut self, source: impl Into<anyhow::Error>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Attach the cursor from which an interrupted listing can be resumed.
    pub fn with_cursor(mut self, cursor: Option<Cursor>) -> Self {
        self.cursor = cursor;
        self
    }

    /// Get the error kind
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Get the error message without the kind prefix.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Get the resume cursor carried by a `ListingFailed` or `Cancelled` error.
    ///
    /// `None` means the listing should be restarted from the beginning.
    pub fn cursor(&self) -> Option<&Cursor> {
        self.cursor.as_ref()
    }

    /// Check if this error was raised by local validation before any
    /// network call was made.
    pub fn is_validation_error(&self) -> bool {
        matches!(
            self.kind,
            ErrorKind::TooManyPolicies
                | ErrorKind::InvalidPolicyName
                | ErrorKind::InvalidPolicyWindow
                | ErrorKind::InvalidPermissions
                | ErrorKind::PolicyNotFound
                | ErrorKind::InvalidIpRange
        )
    }

    /// Find the kind of the innermost storekit error in the source chain.
    ///
    /// For a `ListingFailed` error this is the kind reported by the transport.
    pub fn root_kind(&self) -> ErrorKind {
        let mut kind = self.kind;
        let mut source: Option<&(dyn std::error::Error + 'static)> =
            self.source.as_ref().map(|e| e.as_ref());
        while let Some(err) = source {
            if let Some(inner) = err.downcast_ref::<Error>() {
                kind = inner.kind;
            }
            source = err.source();
        }
        kind
    }
}

// Convenience constructors
impl Error {
    /// Create a transport error
    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Transport, message)
    }

    /// Create a not found error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    /// Create a listing failed error
    pub fn listing_failed(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ListingFailed, message)
    }

    /// Create a cancelled error
    pub fn cancelled(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Cancelled, message)
    }

    /// Create a too many policies error
    pub fn too_many_policies(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::TooManyPolicies, message)
    }

    /// Create an invalid policy name error
    pub fn invalid_policy_name(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidPolicyName, message)
    }

    /// Create an invalid policy window error
    pub fn invalid_policy_window(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidPolicyWindow, message)
    }

    /// Create an invalid permissions error
    pub fn invalid_permissions(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidPermissions, message)
    }

    /// Create a policy not found error
    pub fn policy_not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::PolicyNotFound, message)
    }

    /// Create an invalid ip range error
    pub fn invalid_ip_range(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidIpRange, message)
    }

    /// Create a config invalid error
    pub fn config_invalid(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ConfigInvalid, message)
    }

    /// Create a credential invalid error
    pub fn credential_invalid(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::CredentialInvalid, message)
    }

    /// Create an unexpected error
    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unexpected, message)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::Transport => write!(f, "transport error"),
            ErrorKind::NotFound => write!(f, "resource not found"),
            ErrorKind::ListingFailed => write!(f, "listing failed"),
            ErrorKind::Cancelled => write!(f, "cancelled"),
            ErrorKind::TooManyPolicies => write!(f, "too many policies"),
            ErrorKind::InvalidPolicyName => write!(f, "invalid policy name"),
            ErrorKind::InvalidPolicyWindow => write!(f, "invalid policy window"),
            ErrorKind::InvalidPermissions => write!(f, "invalid permissions"),
            ErrorKind::PolicyNotFound => write!(f, "policy not found"),
            ErrorKind::InvalidIpRange => write!(f, "invalid ip range"),
            ErrorKind::ConfigInvalid => write!(f, "invalid configuration"),
            ErrorKind::CredentialInvalid => write!(f, "invalid credentials"),
            ErrorKind::Unexpected => write!(f, "unexpected error"),
        }
    }
}

/// Convenience type alias for Results
pub type Result<T> = std::result::Result<T, Error>;

// Common From implementations
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::unexpected(err.to_string()).with_source(err)
    }
}

impl From<std::fmt::Error> for Error {
    fn from(err: std::fmt::Error) -> Self {
        Self::unexpected(err.to_string()).with_source(anyhow::Error::from(err))
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::unexpected(err.to_string()).with_source(anyhow::Error::from(err))
    }
}
