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

//! Test utilities for the driver.

use crate::driver::smtp::SmtpMailer;
use async_trait::async_trait;
use futures::lock::Mutex;
use lettre::Message;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use traindesk_core::driver::{DriverError, DriverResult};
use traindesk_core::model::EmailAddress;

#[cfg(test)]
use {
    crate::db::init_schema,
    crate::driver::email::EmailTemplates,
    crate::driver::{Driver, DriverOptions},
    crate::model::{AccessToken, Role, Training, User},
    rust_decimal::Decimal,
    time::macros::datetime,
    traindesk_core::clocks::testutils::SettableClock,
    traindesk_core::db::{sqlite, Db, Executor},
};

/// Secret used to sign access tokens in tests.
#[cfg(test)]
pub(crate) const JWT_SECRET: &[u8] = b"test-jwt-secret";

/// Password with which all test users are registered.
#[cfg(test)]
pub(crate) const TEST_PASSWORD: &str = "the-password";

/// Creates a training with hardcoded details in `category_id` for testing purposes.
#[cfg(test)]
pub(crate) fn make_test_training(category_id: i32) -> Training {
    Training {
        id: 0,
        title: "Advanced Kite Flying".to_owned(),
        description: "Learn to fly kites".to_owned(),
        details: "A lot of details about kites".to_owned(),
        duration: "4 weeks".to_owned(),
        instructor: "Some Instructor".to_owned(),
        fee: Decimal::new(8000, 2),
        original_fee: Decimal::new(10000, 2),
        discount_percentage: Decimal::new(20, 0),
        level: "Beginner".to_owned(),
        certification: true,
        what_you_will_learn: vec!["Knots".to_owned(), "Wind".to_owned()],
        address: "123 Fake Street".to_owned(),
        category_id,
        start_date: datetime!(2025-07-01 09:00:00 UTC),
        end_date: datetime!(2025-07-28 17:00:00 UTC),
    }
}

/// Mailer that captures outgoing messages.
#[derive(Clone, Default)]
pub struct RecorderSmtpMailer {
    /// Storage for captured messages.
    pub inboxes: Arc<Mutex<HashMap<EmailAddress, Vec<Message>>>>,

    /// Addresses for which to fail sending a message to.
    errors: Arc<Mutex<HashSet<EmailAddress>>>,
}

impl RecorderSmtpMailer {
    /// Makes trying to send errors to `email` fail with an error.
    pub async fn inject_error_for<E: Into<EmailAddress>>(&self, email: E) {
        let mut errors = self.errors.lock().await;
        errors.insert(email.into());
    }

    /// Expects that no messages were sent.
    pub async fn expect_no_messages(&self) {
        let inboxes = self.inboxes.lock().await;
        assert_eq!(0, inboxes.len(), "Expected to find no messages");
    }

    /// Expects that messages were sent to `exp_to` and nobody else, and returns the list of
    /// messages to that recipient.
    pub async fn expect_one_inbox(&self, exp_to: &EmailAddress) -> Vec<Message> {
        let inboxes = self.inboxes.lock().await;
        assert_eq!(1, inboxes.len(), "Expected to find just one message in one inbox");
        let (to, messages) = inboxes.iter().next().unwrap();
        assert_eq!(exp_to, to);
        messages.clone()
    }

    /// Expects that only one message was sent to `exp_to` and nobody else, and returns the
    /// message.
    pub async fn expect_one_message(&self, exp_to: &EmailAddress) -> Message {
        let mut messages = self.expect_one_inbox(exp_to).await;
        assert_eq!(1, messages.len(), "Expected to find just one message for {}", exp_to.as_str());
        messages.pop().unwrap()
    }
}

#[async_trait]
impl SmtpMailer for RecorderSmtpMailer {
    async fn send(&self, message: Message) -> DriverResult<()> {
        let to = message.headers().get_raw("To").expect("To header must have been present");
        let to = EmailAddress::new(to).expect("Recipient addresses in tests must be valid");

        {
            let errors = self.errors.lock().await;
            if errors.contains(&to) {
                return Err(DriverError::BackendError(format!(
                    "Sending email to {} failed",
                    to.as_str()
                )));
            }
        }

        let mut inboxes = self.inboxes.lock().await;
        inboxes.entry(to).or_insert_with(Vec::default).push(message);
        Ok(())
    }
}

/// Container for the state required to run a driver test.
#[cfg(test)]
pub(crate) struct TestContext {
    driver: Driver,
    db: Arc<dyn Db + Send + Sync>,
    pub(crate) clock: Arc<SettableClock>,
    pub(crate) mailer: RecorderSmtpMailer,
}

#[cfg(test)]
impl TestContext {
    pub(crate) async fn setup() -> Self {
        let _can_fail = env_logger::builder().is_test(true).try_init();

        let db = Arc::from(sqlite::testutils::setup().await);
        let mut ex = db.ex().await.unwrap();
        init_schema(&mut ex).await.unwrap();
        drop(ex);

        let clock = Arc::from(SettableClock::new(datetime!(2025-06-20 06:00:00 UTC)));

        let mailer = RecorderSmtpMailer::default();

        let templates = EmailTemplates::new("Traindesk <noreply@example.com>".parse().unwrap());

        let opts = DriverOptions {
            jwt_secret: String::from_utf8(JWT_SECRET.to_vec()).unwrap(),
            frontend_base_url: "https://frontend.example.com".to_owned(),
            spool_dir: std::env::temp_dir(),
        };

        let driver =
            Driver::new(db.clone(), clock.clone(), Arc::from(mailer.clone()), templates, opts);

        Self { driver, db, clock, mailer }
    }

    /// Returns a copy of the driver to issue one operation against.
    pub(crate) fn driver(&self) -> Driver {
        self.driver.clone()
    }

    /// Obtains a direct executor against the test database.
    pub(crate) async fn ex(&self) -> Executor {
        self.db.ex().await.unwrap()
    }

    /// Registers a regular user with the test password and returns its session.
    pub(crate) async fn do_register_user(
        &self,
        username: &str,
        email: &str,
    ) -> (AccessToken, User) {
        self.driver()
            .register(username.to_owned(), email.to_owned(), TEST_PASSWORD.to_owned(), None)
            .await
            .unwrap()
    }

    /// Registers an administrator with the test password and returns its session.
    pub(crate) async fn do_register_admin(
        &self,
        username: &str,
        email: &str,
    ) -> (AccessToken, User) {
        self.driver()
            .register(
                username.to_owned(),
                email.to_owned(),
                TEST_PASSWORD.to_owned(),
                Some(Role::Admin),
            )
            .await
            .unwrap()
    }

    /// Creates a category named `name` and returns its id.
    pub(crate) async fn do_create_category(&self, token: &AccessToken, name: &str) -> i32 {
        self.driver()
            .create_category(token, name.to_owned(), format!("All about {}", name))
            .await
            .unwrap()
            .id
    }

    /// Creates a category and a training within it, and returns the training's id.
    pub(crate) async fn do_create_training(&self, token: &AccessToken) -> i32 {
        let category_id = self.do_create_category(token, "Outdoors").await;
        self.driver()
            .create_training(token, make_test_training(category_id), None)
            .await
            .unwrap()
            .id
    }

    /// Creates a category, a training and a schedule for it, and returns the schedule's id.
    pub(crate) async fn do_create_schedule(&self, token: &AccessToken) -> i32 {
        let training_id = self.do_create_training(token).await;
        self.driver()
            .create_schedule(
                token,
                training_id,
                datetime!(2025-07-01 09:00:00 UTC),
                datetime!(2025-07-05 17:00:00 UTC),
                20,
            )
            .await
            .unwrap()
            .id
    }
}
