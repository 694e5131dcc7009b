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

//! User accounts and their roles.

use crate::model::{HashedPassword, ResetToken};
use serde::{Deserialize, Serialize};
use std::fmt;
use time::OffsetDateTime;
use traindesk_core::model::{EmailAddress, ModelError, ModelResult, Username};

/// Role attached to a user account.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub(crate) enum Role {
    /// A regular user with access to the public surface of the API only.
    #[serde(rename = "USER")]
    User,

    /// An administrator with access to the management APIs.
    #[serde(rename = "ADMIN")]
    Admin,
}

impl Role {
    /// Returns the textual representation of the role as stored in the database.
    pub(crate) fn as_str(&self) -> &'static str {
        match self {
            Role::User => "USER",
            Role::Admin => "ADMIN",
        }
    }
}

impl TryFrom<&str> for Role {
    type Error = ModelError;

    fn try_from(s: &str) -> ModelResult<Self> {
        match s {
            "USER" => Ok(Role::User),
            "ADMIN" => Ok(Role::Admin),
            s => Err(ModelError(format!("Unknown role {}", s))),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.as_str().fmt(f)
    }
}

/// A user account as stored in the database.
#[derive(Clone, Debug)]
pub(crate) struct User {
    /// Identifier of the user.
    id: i32,

    /// Name the user logs in with.
    username: Username,

    /// Email address used for password recovery and notifications.
    email: EmailAddress,

    /// Hash of the user's password.
    password: HashedPassword,

    /// Role of the user.
    role: Role,

    /// Outstanding password reset token, if any.
    reset_token: Option<ResetToken>,

    /// Expiration time of `reset_token`, present if and only if the token is.
    reset_token_expiry: Option<OffsetDateTime>,
}

impl User {
    /// Creates a new user with no outstanding reset token.
    pub(crate) fn new(
        id: i32,
        username: Username,
        email: EmailAddress,
        password: HashedPassword,
        role: Role,
    ) -> Self {
        Self { id, username, email, password, role, reset_token: None, reset_token_expiry: None }
    }

    /// Attaches a reset token and its expiry, as extracted from the database.
    pub(crate) fn with_reset_token(mut self, token: ResetToken, expiry: OffsetDateTime) -> Self {
        self.reset_token = Some(token);
        self.reset_token_expiry = Some(expiry);
        self
    }

    /// Returns the identifier of the user.
    pub(crate) fn id(&self) -> i32 {
        self.id
    }

    /// Returns the name of the user.
    pub(crate) fn username(&self) -> &Username {
        &self.username
    }

    /// Returns the email address of the user.
    pub(crate) fn email(&self) -> &EmailAddress {
        &self.email
    }

    /// Returns the hashed password of the user.
    pub(crate) fn password(&self) -> &HashedPassword {
        &self.password
    }

    /// Returns the role of the user.
    pub(crate) fn role(&self) -> Role {
        self.role
    }

    /// Returns the outstanding reset token and its expiry, if any.
    pub(crate) fn reset_token(&self) -> Option<(&ResetToken, OffsetDateTime)> {
        match (&self.reset_token, self.reset_token_expiry) {
            (Some(token), Some(expiry)) => Some((token, expiry)),
            _ => None,
        }
    }
}
