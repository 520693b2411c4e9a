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

use std::fmt;

use storekit_core::{Error, Result};

use crate::ResourceKind;

/// A single permission that can be granted on a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Permission {
    /// `r`: read content, properties and metadata.
    Read,
    /// `a`: add messages, blocks or entities.
    Add,
    /// `c`: create new blobs or files.
    Create,
    /// `w`: write content.
    Write,
    /// `u`: update messages or entities.
    Update,
    /// `d`: delete.
    Delete,
    /// `p`: get and delete queue messages.
    Process,
    /// `l`: list children.
    List,
}

impl Permission {
    /// The letter used in signed permissions.
    pub fn as_char(&self) -> char {
        match self {
            Permission::Read => 'r',
            Permission::Add => 'a',
            Permission::Create => 'c',
            Permission::Write => 'w',
            Permission::Update => 'u',
            Permission::Delete => 'd',
            Permission::Process => 'p',
            Permission::List => 'l',
        }
    }
}

/// A set of permissions drawn from the alphabet of one resource kind.
///
/// The set always renders in the canonical order of its alphabet, without
/// duplicates, e.g. `rwdl` for containers or `raup` for queues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Permissions {
    kind: ResourceKind,
    // Bit `i` is set when the `i`-th letter of the alphabet is granted.
    mask: u8,
}

impl Permissions {
    /// An empty permission set for `kind`.
    pub fn none(kind: ResourceKind) -> Self {
        Self { kind, mask: 0 }
    }

    /// Every permission of `kind`'s alphabet.
    pub fn all(kind: ResourceKind) -> Self {
        let len = kind.permission_alphabet().len();
        Self {
            kind,
            mask: ((1u16 << len) - 1) as u8,
        }
    }

    /// Parse signed permissions such as `"rl"` for `kind`.
    ///
    /// Letters may come in any order and may repeat. A letter outside `kind`'s
    /// alphabet is rejected.
    pub fn parse(kind: ResourceKind, s: &str) -> Result<Self> {
        let alphabet = kind.permission_alphabet();
        let mut mask = 0u8;
        for c in s.chars() {
            let Some(idx) = alphabet.find(c) else {
                return Err(Error::invalid_permissions(format!(
                    "permission '{c}' is not valid for {kind}, expected letters from '{alphabet}'"
                )));
            };
            mask |= 1 << idx;
        }
        Ok(Self { kind, mask })
    }

    /// Grant one more permission.
    pub fn with(self, permission: Permission) -> Result<Self> {
        let mut buf = [0u8; 4];
        let letter = permission.as_char().encode_utf8(&mut buf);
        let other = Self::parse(self.kind, letter)?;
        Ok(Self {
            kind: self.kind,
            mask: self.mask | other.mask,
        })
    }

    /// The resource kind whose alphabet this set uses.
    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    /// Check whether `permission` is granted.
    pub fn contains(&self, permission: Permission) -> bool {
        self.kind
            .permission_alphabet()
            .find(permission.as_char())
            .is_some_and(|idx| self.mask & (1 << idx) != 0)
    }

    /// Check whether nothing is granted.
    pub fn is_empty(&self) -> bool {
        self.mask == 0
    }

    /// Check whether this set can be used on resources of `kind`.
    pub fn is_compatible_with(&self, kind: ResourceKind) -> bool {
        self.kind.permission_alphabet() == kind.permission_alphabet()
    }
}

impl fmt::Display for Permissions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, c) in self.kind.permission_alphabet().chars().enumerate() {
            if self.mask & (1 << idx) != 0 {
                write!(f, "{c}")?;
            }
        }
        Ok(())
    }
}
