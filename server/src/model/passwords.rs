// Traindesk
// Copyright 2025 Julio Merino
//
// Licensed under the Apache License, Version 2.0 (the "License"); you may not
// use this file except in compliance with the License.  You may obtain a copy
// of the License at:
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS, WITHOUT
// WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.  See the
// License for the specific language governing permissions and limitations
// under the License.

//! Types to manipulate passwords in plain-text and hashed forms.

use std::fmt;
use traindesk_core::model::{ModelError, ModelResult};

/// Minimum length of a password chosen at registration time.
pub(crate) const MIN_PASSWORD_LENGTH: usize = 6;

/// Maximum length of a password.  The bcrypt algorithm imposes this restriction on us.
const MAX_PASSWORD_LENGTH: usize = 56;

/// Cost factor for the bcrypt hash computation.
const BCRYPT_COST: u32 = 10;

/// Represents a plain-text password.
#[derive(Clone, PartialEq)]
pub(crate) struct Password(String);

impl Password {
    /// Creates a new password from an untrusted string, validating its length limits.
    pub(crate) fn new<S: Into<String>>(s: S) -> ModelResult<Self> {
        let s = s.into();
        if s.is_empty() {
            return Err(ModelError("Password cannot be empty".to_owned()));
        }
        if s.len() > MAX_PASSWORD_LENGTH {
            return Err(ModelError("Password is too long".to_owned()));
        }
        Ok(Self(s))
    }

    /// Returns the reason why this password is too weak for account registration, if it is.
    pub(crate) fn weak_reason(&self) -> Option<String> {
        if self.0.len() < MIN_PASSWORD_LENGTH {
            Some(format!("Password must be at least {} characters long", MIN_PASSWORD_LENGTH))
        } else {
            None
        }
    }

    /// Computes the hashed version of this password for storage.
    pub(crate) fn hash(&self) -> ModelResult<HashedPassword> {
        match bcrypt::hash(&self.0, BCRYPT_COST) {
            Ok(hash) => Ok(HashedPassword(hash)),
            Err(e) => Err(ModelError(format!("Cannot hash password: {}", e))),
        }
    }
}

#[cfg(test)]
impl From<&'static str> for Password {
    /// Creates a new password from a hardcoded string, which must be valid.
    fn from(s: &'static str) -> Self {
        Password::new(s).expect("Hardcoded passwords must be valid")
    }
}

impl fmt::Debug for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "scrubbed password")
    }
}

/// Represents a password hashed with bcrypt as stored in the database.
#[derive(Clone, PartialEq)]
pub(crate) struct HashedPassword(String);

impl HashedPassword {
    /// Wraps an already-hashed password as extracted from the database.
    pub(crate) fn new<S: Into<String>>(s: S) -> Self {
        Self(s.into())
    }

    /// Returns a string view of the hash.
    pub(crate) fn as_str(&self) -> &str {
        &self.0
    }

    /// Checks whether this hash corresponds to the plain-text `password`.
    pub(crate) fn verify(&self, password: &Password) -> ModelResult<bool> {
        bcrypt::verify(&password.0, &self.0)
            .map_err(|e| ModelError(format!("Cannot verify password: {}", e)))
    }
}

impl fmt::Debug for HashedPassword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "scrubbed password hash")
    }
}
