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

//! Access tokens for API authentication and single-use password reset tokens.

use crate::model::{Role, User};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use time::OffsetDateTime;
use traindesk_core::model::{ModelError, ModelResult};

/// Time until a newly-issued access token expires.
pub(crate) const ACCESS_TOKEN_VALIDITY: Duration = Duration::from_secs(60 * 60);

/// Number of random bytes in a password reset token before hex encoding.
const RESET_TOKEN_BYTES: usize = 32;

/// Claims carried in a signed access token.
#[derive(Debug, Deserialize, Eq, PartialEq, Serialize)]
pub(crate) struct AccessTokenClaims {
    /// Identifier of the authenticated user.
    pub(crate) sub: i32,

    /// Email address of the authenticated user.
    pub(crate) email: String,

    /// Role of the authenticated user at the time the token was issued.
    pub(crate) role: Role,

    /// Expiration time of the token as seconds since the Unix epoch.
    pub(crate) exp: i64,
}

/// A signed bearer token that proves the identity of a user.
#[derive(Clone, Eq, PartialEq)]
pub(crate) struct AccessToken(String);

impl AccessToken {
    /// Wraps a raw token as received from a client.
    pub(crate) fn new<S: Into<String>>(s: S) -> Self {
        Self(s.into())
    }

    /// Issues a token for `user` signed with `secret`, expiring a fixed amount of time
    /// after `now`.
    pub(crate) fn generate(user: &User, secret: &[u8], now: OffsetDateTime) -> ModelResult<Self> {
        let claims = AccessTokenClaims {
            sub: user.id(),
            email: user.email().as_str().to_owned(),
            role: user.role(),
            exp: (now + ACCESS_TOKEN_VALIDITY).unix_timestamp(),
        };
        let key = EncodingKey::from_secret(secret);
        let token = jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &key)
            .map_err(|e| ModelError(format!("Cannot sign access token: {}", e)))?;
        Ok(Self(token))
    }

    /// Verifies the token's signature against `secret` and returns its claims.
    ///
    /// Expiration is intentionally not checked here because the wall clock is not an input
    /// to this function.  The caller must compare the `exp` claim against its own clock.
    pub(crate) fn decode(&self, secret: &[u8]) -> ModelResult<AccessTokenClaims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.required_spec_claims.clear();
        match jsonwebtoken::decode::<AccessTokenClaims>(
            &self.0,
            &DecodingKey::from_secret(secret),
            &validation,
        ) {
            Ok(data) => Ok(data.claims),
            Err(e) => Err(ModelError(format!("Invalid access token: {}", e))),
        }
    }

    /// Returns a string view of the token.
    pub(crate) fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "scrubbed access token")
    }
}

/// A single-use token to reset a forgotten password, stored hex-encoded.
#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) struct ResetToken(String);

impl ResetToken {
    /// Creates a token from an untrusted string, validating its shape.
    pub(crate) fn new<S: Into<String>>(s: S) -> ModelResult<Self> {
        let s = s.into();
        if s.len() != RESET_TOKEN_BYTES * 2 || !s.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(ModelError("Invalid or expired reset token".to_owned()));
        }
        Ok(Self(s))
    }

    /// Generates a new random token.
    pub(crate) fn generate() -> Self {
        let mut bytes = [0u8; RESET_TOKEN_BYTES];
        rand::thread_rng().fill_bytes(&mut bytes);
        let mut s = String::with_capacity(RESET_TOKEN_BYTES * 2);
        for b in bytes {
            s.push_str(&format!("{:02x}", b));
        }
        Self(s)
    }

    /// Returns a string view of the token.
    pub(crate) fn as_str(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::HashedPassword;
    use time::macros::datetime;
    use traindesk_core::model::{EmailAddress, Username};

    fn make_user() -> User {
        User::new(
            42,
            Username::new("some-user").unwrap(),
            EmailAddress::new("some@example.com").unwrap(),
            HashedPassword::new("the-hash"),
            Role::Admin,
        )
    }

    #[test]
    fn test_access_token_round_trip() {
        let now = datetime!(2025-06-01 10:00:00 UTC);
        let token = AccessToken::generate(&make_user(), b"test-secret", now).unwrap();
        let claims = token.decode(b"test-secret").unwrap();
        assert_eq!(42, claims.sub);
        assert_eq!("some@example.com", claims.email);
        assert_eq!(Role::Admin, claims.role);
        assert_eq!((now + ACCESS_TOKEN_VALIDITY).unix_timestamp(), claims.exp);
    }

    #[test]
    fn test_access_token_bad_signature() {
        let now = datetime!(2025-06-01 10:00:00 UTC);
        let token = AccessToken::generate(&make_user(), b"test-secret", now).unwrap();
        token.decode(b"other-secret").unwrap_err();
    }

    #[test]
    fn test_access_token_garbage() {
        AccessToken::new("not-a-jwt").decode(b"test-secret").unwrap_err();
    }

    #[test]
    fn test_access_token_decode_ignores_expiration() {
        // Expiration is the caller's responsibility so decoding a long-expired token must
        // still yield its claims.
        let now = datetime!(2001-01-01 00:00:00 UTC);
        let token = AccessToken::generate(&make_user(), b"test-secret", now).unwrap();
        let claims = token.decode(b"test-secret").unwrap();
        assert!(claims.exp < OffsetDateTime::now_utc().unix_timestamp());
    }

    #[test]
    fn test_reset_token_generate_is_well_formed() {
        let token = ResetToken::generate();
        assert_eq!(token, ResetToken::new(token.as_str().to_owned()).unwrap());
    }

    #[test]
    fn test_reset_token_generate_is_random() {
        assert_ne!(ResetToken::generate(), ResetToken::generate());
    }

    #[test]
    fn test_reset_token_new_bad_shape() {
        ResetToken::new("").unwrap_err();
        ResetToken::new("abc123").unwrap_err();
        ResetToken::new("z".repeat(64)).unwrap_err();
    }
}
