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

//! Account registration, login and credential management.

use crate::db;
use crate::driver::{email, Driver};
use crate::model::{AccessToken, Password, ResetToken, Role, User};
use std::time::Duration;
use time::OffsetDateTime;
use traindesk_core::db::DbError;
use traindesk_core::driver::{DriverError, DriverResult};
use traindesk_core::model::{EmailAddress, ModelError, Username};

/// Time until a password reset token expires.
const RESET_TOKEN_VALIDITY: Duration = Duration::from_secs(60 * 60);

/// Message returned whenever a reset token cannot be used, for whatever reason.
const BAD_RESET_TOKEN: &str = "Invalid or expired reset token";

impl Driver {
    /// Signs an access token for `user` that starts its validity period at `now`.
    fn issue_token(&self, user: &User, now: OffsetDateTime) -> DriverResult<AccessToken> {
        AccessToken::generate(user, self.opts.jwt_secret.as_bytes(), now)
            .map_err(|e| DriverError::BackendError(e.to_string()))
    }

    /// Creates a new account and returns a fresh access token for it.
    ///
    /// All shape problems in the input are collected and reported together so that the caller
    /// can surface them against the individual form fields.
    pub(crate) async fn register(
        self,
        username: String,
        email: String,
        password: String,
        role: Option<Role>,
    ) -> DriverResult<(AccessToken, User)> {
        let password = Password::new(password).and_then(|password| match password.weak_reason() {
            Some(reason) => Err(ModelError(reason)),
            None => Ok(password),
        });
        let (username, email, password) =
            match (Username::new(username), EmailAddress::new(email), password) {
                (Ok(username), Ok(email), Ok(password)) => (username, email, password),
                (username, email, password) => {
                    let errors = [
                        username.err().map(|e| e.to_string()),
                        email.err().map(|e| e.to_string()),
                        password.err().map(|e| e.to_string()),
                    ];
                    return Err(DriverError::Validation(
                        errors.into_iter().flatten().collect(),
                    ));
                }
            };

        let hash = password.hash()?;
        let role = role.unwrap_or(Role::User);
        let now = self.clock.now_utc();

        let mut ex = self.db.ex().await?;
        let id = match db::create_user(&mut ex, &username, &email, &hash, role).await {
            Ok(id) => id,
            Err(DbError::AlreadyExists) => {
                return Err(DriverError::AlreadyExists(
                    "Username or email already exists".to_owned(),
                ));
            }
            Err(e) => return Err(e.into()),
        };

        let user = User::new(id, username, email, hash, role);
        let token = self.issue_token(&user, now)?;
        Ok((token, user))
    }

    /// Validates the given credentials and returns an access token on success.
    pub(crate) async fn login(
        self,
        email: String,
        password: String,
    ) -> DriverResult<(AccessToken, User)> {
        let email = EmailAddress::new(email)?;
        let password = Password::new(password)?;

        let user = db::get_user_by_email(&mut self.db.ex().await?, &email).await?;
        if !user.password().verify(&password)? {
            return Err(DriverError::Unauthorized("Invalid password".to_owned()));
        }

        let token = self.issue_token(&user, self.clock.now_utc())?;
        Ok((token, user))
    }

    /// Issues a password reset token for the account behind `email` and mails a link carrying
    /// it to the account's address.
    pub(crate) async fn forgot_password(self, email: String) -> DriverResult<()> {
        let email = EmailAddress::new(email)?;
        let now = self.clock.now_utc();

        let mut tx = self.db.begin().await?;

        let user = db::get_user_by_email(tx.ex(), &email).await?;
        let token = ResetToken::generate();
        db::set_reset_token(tx.ex(), user.id(), &token, now + RESET_TOKEN_VALIDITY).await?;

        let message = email::reset_password_message(
            &self.templates,
            &self.opts.frontend_base_url,
            &user,
            &token,
        )?;
        self.mailer.send(message).await?;

        tx.commit().await?;
        Ok(())
    }

    /// Replaces the password of the account holding `token`, provided the token has not expired,
    /// and clears the token so it cannot be used twice.
    pub(crate) async fn reset_password(self, token: String, password: String) -> DriverResult<()> {
        let token = ResetToken::new(token)?;
        let password = Password::new(password)?;
        if let Some(reason) = password.weak_reason() {
            return Err(DriverError::InvalidInput(reason));
        }
        let now = self.clock.now_utc();

        let mut tx = self.db.begin().await?;

        let user = match db::get_user_by_reset_token(tx.ex(), &token).await {
            Ok(user) => user,
            Err(DbError::NotFound) => {
                return Err(DriverError::InvalidInput(BAD_RESET_TOKEN.to_owned()));
            }
            Err(e) => return Err(e.into()),
        };
        match user.reset_token() {
            Some((_token, expiry)) if expiry > now => (),
            _ => return Err(DriverError::InvalidInput(BAD_RESET_TOKEN.to_owned())),
        }

        db::update_user_password(tx.ex(), user.id(), &password.hash()?).await?;
        db::clear_reset_token(tx.ex(), user.id()).await?;

        tx.commit().await?;
        Ok(())
    }

    /// Replaces the password of the authenticated user after checking the current one.
    pub(crate) async fn change_password(
        self,
        token: &AccessToken,
        current_password: String,
        new_password: String,
    ) -> DriverResult<()> {
        let user = self.authenticate(token).await?;

        let current_password = Password::new(current_password)?;
        let new_password = Password::new(new_password)?;
        if let Some(reason) = new_password.weak_reason() {
            return Err(DriverError::InvalidInput(reason));
        }

        if !user.password().verify(&current_password)? {
            return Err(DriverError::InvalidInput("Current password is incorrect".to_owned()));
        }

        db::update_user_password(&mut self.db.ex().await?, user.id(), &new_password.hash()?)
            .await?;
        Ok(())
    }

    /// Returns the profile of the authenticated user.
    pub(crate) async fn get_profile(self, token: &AccessToken) -> DriverResult<User> {
        self.authenticate(token).await
    }

    /// Updates the username and email of the authenticated user and returns the new profile.
    pub(crate) async fn update_profile(
        self,
        token: &AccessToken,
        username: String,
        email: String,
    ) -> DriverResult<User> {
        let user = self.authenticate(token).await?;

        let (username, email) = match (Username::new(username), EmailAddress::new(email)) {
            (Ok(username), Ok(email)) => (username, email),
            (username, email) => {
                let errors =
                    [username.err().map(|e| e.to_string()), email.err().map(|e| e.to_string())];
                return Err(DriverError::Validation(errors.into_iter().flatten().collect()));
            }
        };

        let mut ex = self.db.ex().await?;
        match db::update_user(&mut ex, user.id(), &username, &email).await {
            Ok(()) => (),
            Err(DbError::AlreadyExists) => {
                return Err(DriverError::AlreadyExists(
                    "Username or email already exists".to_owned(),
                ));
            }
            Err(e) => return Err(e.into()),
        }
        Ok(db::get_user_by_id(&mut ex, user.id()).await?)
    }

    /// Returns all registered users.  Restricted to administrators.
    pub(crate) async fn list_users(self, token: &AccessToken) -> DriverResult<Vec<User>> {
        self.authenticate_admin(token).await?;
        Ok(db::list_users(&mut self.db.ex().await?).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::email::testutils::parse_message;
    use crate::driver::testutils::*;

    /// Extracts the reset token from the last message sent to `email`.
    async fn get_emailed_reset_token(context: &TestContext, email: &str) -> String {
        let message =
            context.mailer.expect_one_message(&EmailAddress::new(email).unwrap()).await;
        let (_headers, body) = parse_message(&message);
        let (_prefix, tail) =
            body.split_once("token=").expect("Message must contain a reset link");
        tail.chars().take(64).collect()
    }

    #[tokio::test]
    async fn test_register_ok() {
        let context = TestContext::setup().await;

        let (token, user) = context
            .driver()
            .register(
                "some-user".to_owned(),
                "some@example.com".to_owned(),
                "the-password".to_owned(),
                None,
            )
            .await
            .unwrap();

        assert_eq!("some-user", user.username().as_str());
        assert_eq!(Role::User, user.role());

        let claims = token.decode(JWT_SECRET).unwrap();
        assert_eq!(user.id(), claims.sub);
        assert_eq!("some@example.com", claims.email);
        assert_eq!(Role::User, claims.role);

        let stored = db::get_user_by_id(&mut context.ex().await, user.id()).await.unwrap();
        assert_eq!(user.id(), stored.id());
        assert!(stored.password().verify(&Password::from("the-password")).unwrap());
    }

    #[tokio::test]
    async fn test_register_admin_role() {
        let context = TestContext::setup().await;
        let (_token, user) = context
            .driver()
            .register(
                "the-admin".to_owned(),
                "admin@example.com".to_owned(),
                "the-password".to_owned(),
                Some(Role::Admin),
            )
            .await
            .unwrap();
        assert_eq!(Role::Admin, user.role());
    }

    #[tokio::test]
    async fn test_register_collects_field_errors() {
        let context = TestContext::setup().await;
        match context
            .driver()
            .register("ab".to_owned(), "not-an-email".to_owned(), "short".to_owned(), None)
            .await
        {
            Err(DriverError::Validation(errors)) => {
                assert_eq!(3, errors.len());
                assert!(errors[0].contains("Username"));
                assert!(errors[1].contains("email"));
                assert!(errors[2].contains("Password"));
            }
            e => panic!("Unexpected result: {:?}", e),
        }
    }

    #[tokio::test]
    async fn test_register_duplicates() {
        let context = TestContext::setup().await;
        context.do_register_user("some-user", "some@example.com").await;

        for (username, email) in [
            ("some-user", "other@example.com"),
            ("other-user", "some@example.com"),
        ] {
            match context
                .driver()
                .register(username.to_owned(), email.to_owned(), "the-password".to_owned(), None)
                .await
            {
                Err(DriverError::AlreadyExists(e)) => assert!(e.contains("already exists")),
                e => panic!("Unexpected result: {:?}", e),
            }
        }
    }

    #[tokio::test]
    async fn test_login_ok() {
        let context = TestContext::setup().await;
        let (_token, user) = context.do_register_user("some-user", "some@example.com").await;

        let (token, whoami) = context
            .driver()
            .login("some@example.com".to_owned(), TEST_PASSWORD.to_owned())
            .await
            .unwrap();
        assert_eq!(user.id(), whoami.id());
        assert_eq!(user.id(), token.decode(JWT_SECRET).unwrap().sub);
    }

    #[tokio::test]
    async fn test_login_unknown_email() {
        let context = TestContext::setup().await;
        match context
            .driver()
            .login("nobody@example.com".to_owned(), TEST_PASSWORD.to_owned())
            .await
        {
            Err(DriverError::NotFound(_)) => (),
            e => panic!("Unexpected result: {:?}", e),
        }
    }

    #[tokio::test]
    async fn test_login_bad_password() {
        let context = TestContext::setup().await;
        context.do_register_user("some-user", "some@example.com").await;
        match context
            .driver()
            .login("some@example.com".to_owned(), "not-the-password".to_owned())
            .await
        {
            Err(DriverError::Unauthorized(e)) => assert!(e.contains("Invalid password")),
            e => panic!("Unexpected result: {:?}", e),
        }
    }

    #[tokio::test]
    async fn test_forgot_and_reset_password_ok() {
        let context = TestContext::setup().await;
        let (_token, user) = context.do_register_user("some-user", "some@example.com").await;

        context.driver().forgot_password("some@example.com".to_owned()).await.unwrap();
        let token = get_emailed_reset_token(&context, "some@example.com").await;

        context
            .driver()
            .reset_password(token.clone(), "new-password".to_owned())
            .await
            .unwrap();

        let stored = db::get_user_by_id(&mut context.ex().await, user.id()).await.unwrap();
        assert!(stored.password().verify(&Password::from("new-password")).unwrap());
        assert!(stored.reset_token().is_none());

        // The token is single use.
        match context.driver().reset_password(token, "another-password".to_owned()).await {
            Err(DriverError::InvalidInput(e)) => assert_eq!(BAD_RESET_TOKEN, e),
            e => panic!("Unexpected result: {:?}", e),
        }
    }

    #[tokio::test]
    async fn test_forgot_password_unknown_email() {
        let context = TestContext::setup().await;
        match context.driver().forgot_password("nobody@example.com".to_owned()).await {
            Err(DriverError::NotFound(_)) => (),
            e => panic!("Unexpected result: {:?}", e),
        }
        context.mailer.expect_no_messages().await;
    }

    #[tokio::test]
    async fn test_reset_password_expired_token() {
        let context = TestContext::setup().await;
        context.do_register_user("some-user", "some@example.com").await;

        context.driver().forgot_password("some@example.com".to_owned()).await.unwrap();
        let token = get_emailed_reset_token(&context, "some@example.com").await;

        context.clock.advance(RESET_TOKEN_VALIDITY + Duration::from_secs(1));
        match context.driver().reset_password(token, "new-password".to_owned()).await {
            Err(DriverError::InvalidInput(e)) => assert_eq!(BAD_RESET_TOKEN, e),
            e => panic!("Unexpected result: {:?}", e),
        }
    }

    #[tokio::test]
    async fn test_reset_password_garbage_token() {
        let context = TestContext::setup().await;
        match context
            .driver()
            .reset_password("not-a-token".to_owned(), "new-password".to_owned())
            .await
        {
            Err(DriverError::InvalidInput(e)) => assert_eq!(BAD_RESET_TOKEN, e),
            e => panic!("Unexpected result: {:?}", e),
        }
    }

    #[tokio::test]
    async fn test_change_password_ok() {
        let context = TestContext::setup().await;
        let (token, user) = context.do_register_user("some-user", "some@example.com").await;

        context
            .driver()
            .change_password(&token, TEST_PASSWORD.to_owned(), "new-password".to_owned())
            .await
            .unwrap();

        let stored = db::get_user_by_id(&mut context.ex().await, user.id()).await.unwrap();
        assert!(stored.password().verify(&Password::from("new-password")).unwrap());
    }

    #[tokio::test]
    async fn test_change_password_bad_current() {
        let context = TestContext::setup().await;
        let (token, _user) = context.do_register_user("some-user", "some@example.com").await;

        match context
            .driver()
            .change_password(&token, "not-the-password".to_owned(), "new-password".to_owned())
            .await
        {
            Err(DriverError::InvalidInput(e)) => assert!(e.contains("incorrect")),
            e => panic!("Unexpected result: {:?}", e),
        }
    }

    #[tokio::test]
    async fn test_profile_read_and_update() {
        let context = TestContext::setup().await;
        let (token, user) = context.do_register_user("some-user", "some@example.com").await;

        let profile = context.driver().get_profile(&token).await.unwrap();
        assert_eq!(user.id(), profile.id());

        let profile = context
            .driver()
            .update_profile(&token, "renamed-user".to_owned(), "renamed@example.com".to_owned())
            .await
            .unwrap();
        assert_eq!("renamed-user", profile.username().as_str());
        assert_eq!("renamed@example.com", profile.email().as_str());
    }

    #[tokio::test]
    async fn test_update_profile_duplicate() {
        let context = TestContext::setup().await;
        let (token, _user) = context.do_register_user("some-user", "some@example.com").await;
        context.do_register_user("other-user", "other@example.com").await;

        match context
            .driver()
            .update_profile(&token, "other-user".to_owned(), "some@example.com".to_owned())
            .await
        {
            Err(DriverError::AlreadyExists(e)) => assert!(e.contains("already exists")),
            e => panic!("Unexpected result: {:?}", e),
        }
    }

    #[tokio::test]
    async fn test_list_users_requires_admin() {
        let context = TestContext::setup().await;
        let (user_token, _user) = context.do_register_user("some-user", "some@example.com").await;
        let (admin_token, _admin) =
            context.do_register_admin("the-admin", "admin@example.com").await;

        let users = context.driver().list_users(&admin_token).await.unwrap();
        assert_eq!(2, users.len());

        match context.driver().list_users(&user_token).await {
            Err(DriverError::Forbidden(_)) => (),
            e => panic!("Unexpected result: {:?}", e),
        }
    }
}
