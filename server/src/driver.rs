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

//! Business logic of the service.
//!
//! The public operations exposed by the driver are all "one shot": they start and commit a
//! transaction when they need one, so it's incorrect for the caller to use two separate calls.
//! For this reason, these operations consume the driver in an attempt to minimize the
//! possibility of executing two operations.

use crate::db;
use crate::driver::email::EmailTemplates;
use crate::driver::smtp::SmtpMailer;
use crate::model::{AccessToken, Role, User};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use traindesk_core::clocks::Clock;
use traindesk_core::db::{Db, DbError};
use traindesk_core::driver::{DriverError, DriverResult};
use traindesk_core::env::{get_optional_var, get_required_var};

mod auth;
mod categories;
pub(crate) mod email;
mod enrollments;
pub mod notifier;
mod pdf;
mod reviews;
mod schedules;
pub mod smtp;
#[cfg(any(test, feature = "testutils"))]
pub mod testutils;
mod trainings;

pub(crate) use trainings::ScheduleSpec;

/// Configuration options for the driver.
#[derive(Clone)]
pub struct DriverOptions {
    /// Secret used to sign and verify access tokens.
    pub jwt_secret: String,

    /// Base URL of the frontend, used to build links embedded in emails.
    pub frontend_base_url: String,

    /// Directory where PDF documents are spooled before being emailed.
    pub spool_dir: PathBuf,
}

impl fmt::Debug for DriverOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DriverOptions")
            .field("jwt_secret", &"scrubbed")
            .field("frontend_base_url", &self.frontend_base_url)
            .field("spool_dir", &self.spool_dir)
            .finish()
    }
}

impl DriverOptions {
    /// Creates a new set of options from environment variables.
    ///
    /// Reads `JWT_SECRET`, `FRONTEND_BASE_URL` and the optional `SPOOL_DIR`, which defaults to
    /// the system temporary directory.
    pub fn from_env() -> Result<Self, String> {
        Ok(Self {
            jwt_secret: get_required_var::<String>("JWT", "SECRET")?,
            frontend_base_url: get_required_var::<String>("FRONTEND", "BASE_URL")?,
            spool_dir: get_optional_var::<PathBuf>("SPOOL", "DIR")?
                .unwrap_or_else(std::env::temp_dir),
        })
    }
}

/// Business logic.
#[derive(Clone)]
pub struct Driver {
    /// The database that the driver uses for persistence.
    db: Arc<dyn Db + Send + Sync>,

    /// Clock instance to obtain the current time.
    clock: Arc<dyn Clock + Send + Sync>,

    /// Service to send email notifications with.
    mailer: Arc<dyn SmtpMailer + Send + Sync>,

    /// Templates for the messages the service sends.
    templates: Arc<EmailTemplates>,

    /// Configuration options for the driver.
    opts: Arc<DriverOptions>,
}

impl Driver {
    /// Creates a new driver backed by the given dependencies.
    pub(crate) fn new(
        db: Arc<dyn Db + Send + Sync>,
        clock: Arc<dyn Clock + Send + Sync>,
        mailer: Arc<dyn SmtpMailer + Send + Sync>,
        templates: EmailTemplates,
        opts: DriverOptions,
    ) -> Self {
        Self { db, clock, mailer, templates: Arc::from(templates), opts: Arc::from(opts) }
    }

    /// Obtains the current time from the driver.
    #[cfg(test)]
    pub(crate) fn now_utc(&self) -> time::OffsetDateTime {
        self.clock.now_utc()
    }

    /// Verifies `token` and returns the user it belongs to.
    ///
    /// Signature problems, expiry and a dangling user id all surface as `Unauthorized` so that
    /// the caller cannot distinguish why a token was rejected.
    pub(crate) async fn authenticate(&self, token: &AccessToken) -> DriverResult<User> {
        let claims = token
            .decode(self.opts.jwt_secret.as_bytes())
            .map_err(|e| DriverError::Unauthorized(e.to_string()))?;

        if claims.exp <= self.clock.now_utc().unix_timestamp() {
            return Err(DriverError::Unauthorized("Access token expired".to_owned()));
        }

        match db::get_user_by_id(&mut self.db.ex().await?, claims.sub).await {
            Ok(user) => Ok(user),
            Err(DbError::NotFound) => {
                Err(DriverError::Unauthorized("Invalid access token".to_owned()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Verifies `token` and returns the user it belongs to, requiring the administrator role.
    pub(crate) async fn authenticate_admin(&self, token: &AccessToken) -> DriverResult<User> {
        let user = self.authenticate(token).await?;
        if user.role() != Role::Admin {
            return Err(DriverError::Forbidden("Administrator privileges required".to_owned()));
        }
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::testutils::*;
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_driver_options_from_env_ok() {
        let overrides = [
            ("JWT_SECRET", Some("the-secret")),
            ("FRONTEND_BASE_URL", Some("https://frontend.example.com")),
            ("SPOOL_DIR", Some("/var/spool/traindesk")),
        ];
        temp_env::with_vars(overrides, || {
            let opts = DriverOptions::from_env().unwrap();
            assert_eq!("the-secret", opts.jwt_secret);
            assert_eq!("https://frontend.example.com", opts.frontend_base_url);
            assert_eq!(PathBuf::from("/var/spool/traindesk"), opts.spool_dir);
        });
    }

    #[test]
    fn test_driver_options_from_env_spool_dir_defaults_to_tmp() {
        let overrides = [
            ("JWT_SECRET", Some("the-secret")),
            ("FRONTEND_BASE_URL", Some("https://frontend.example.com")),
            ("SPOOL_DIR", None),
        ];
        temp_env::with_vars(overrides, || {
            let opts = DriverOptions::from_env().unwrap();
            assert_eq!(std::env::temp_dir(), opts.spool_dir);
        });
    }

    #[test]
    fn test_driver_options_debug_scrubs_secret() {
        let opts = DriverOptions {
            jwt_secret: "super-secret".to_owned(),
            frontend_base_url: "https://frontend.example.com".to_owned(),
            spool_dir: PathBuf::from("/var/spool/traindesk"),
        };
        let debug = format!("{:?}", opts);
        assert!(!debug.contains("super-secret"));
        assert!(debug.contains("scrubbed"));
    }

    #[test]
    fn test_driver_options_from_env_missing_required() {
        let overrides = [
            ("JWT_SECRET", None::<&str>),
            ("FRONTEND_BASE_URL", Some("https://frontend.example.com")),
        ];
        temp_env::with_vars(overrides, || {
            let err = DriverOptions::from_env().unwrap_err();
            assert!(err.contains("JWT_SECRET not present"));
        });
    }

    #[tokio::test]
    async fn test_authenticate_ok() {
        let context = TestContext::setup().await;
        let (token, user) = context.do_register_user("some-user", "some@example.com").await;
        let whoami = context.driver().authenticate(&token).await.unwrap();
        assert_eq!(user.id(), whoami.id());
    }

    #[tokio::test]
    async fn test_authenticate_bad_signature() {
        let context = TestContext::setup().await;
        let (_token, user) = context.do_register_user("some-user", "some@example.com").await;

        let forged = AccessToken::generate(
            &user,
            b"not-the-configured-secret",
            context.clock.now_utc(),
        )
        .unwrap();
        match context.driver().authenticate(&forged).await {
            Err(DriverError::Unauthorized(_)) => (),
            e => panic!("Unexpected result: {:?}", e),
        }
    }

    #[tokio::test]
    async fn test_authenticate_expired_token() {
        let context = TestContext::setup().await;
        let (token, _user) = context.do_register_user("some-user", "some@example.com").await;

        context.clock.advance(Duration::from_secs(60 * 60 + 1));
        match context.driver().authenticate(&token).await {
            Err(DriverError::Unauthorized(e)) => assert!(e.contains("expired")),
            e => panic!("Unexpected result: {:?}", e),
        }
    }

    #[tokio::test]
    async fn test_authenticate_admin_requires_role() {
        let context = TestContext::setup().await;
        let (user_token, _user) = context.do_register_user("some-user", "some@example.com").await;
        let (admin_token, _admin) = context.do_register_admin("the-admin", "admin@example.com").await;

        context.driver().authenticate_admin(&admin_token).await.unwrap();
        match context.driver().authenticate_admin(&user_token).await {
            Err(DriverError::Forbidden(_)) => (),
            e => panic!("Unexpected result: {:?}", e),
        }
    }
}
