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

//! APIs for account management and authentication.

use crate::driver::Driver;
use crate::model::{Role, User};
use crate::rest::httputils::get_bearer_auth;
use axum::extract::State;
use axum::routing::{get, patch, post};
use axum::{http, Json, Router};
use http::header::HeaderMap;
use serde::{Deserialize, Serialize};
use traindesk_core::rest::RestResult;

/// Public view of a user, without any of the password material.
#[derive(Debug, Deserialize, Eq, PartialEq, Serialize)]
pub(super) struct UserResponse {
    /// Identifier of the user.
    id: i32,

    /// Name of the user.
    username: String,

    /// Email address of the user.
    email: String,

    /// Role of the user.
    role: Role,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id(),
            username: user.username().as_str().to_owned(),
            email: user.email().as_str().to_owned(),
            role: user.role(),
        }
    }
}

/// Response to the operations that establish a session.
#[derive(Debug, Deserialize, Serialize)]
struct SessionResponse {
    /// Serialized access token for subsequent requests.
    token: String,

    /// Details of the user the session belongs to.
    user: UserResponse,
}

/// Response carrying just a human-readable confirmation.
#[derive(Debug, Deserialize, Serialize)]
struct MessageResponse {
    /// The confirmation text.
    message: String,
}

impl MessageResponse {
    /// Creates a response carrying `message`.
    fn new<S: Into<String>>(message: S) -> Self {
        Self { message: message.into() }
    }
}

/// Message sent to the server to create an account.
#[derive(Deserialize)]
struct RegisterRequest {
    /// Desired username.
    username: String,

    /// Email address for the user.
    email: String,

    /// Desired password.
    password: String,

    /// Role to grant the account, defaulting to a regular user.
    role: Option<Role>,
}

/// Message sent to the server to log into an account.
#[derive(Deserialize)]
struct LoginRequest {
    /// Email address of the account.
    email: String,

    /// Password of the account.
    password: String,
}

/// Message sent to the server to request a password reset link.
#[derive(Deserialize)]
struct ForgotPasswordRequest {
    /// Email address of the account to reset.
    email: String,
}

/// Message sent to the server to complete a password reset.
#[derive(Deserialize)]
struct ResetPasswordRequest {
    /// Reset token received over email.
    token: String,

    /// New password to set.
    password: String,
}

/// Message sent to the server to replace the password of the session's account.
#[derive(Deserialize)]
struct ChangePasswordRequest {
    /// Current password, required for confirmation.
    current_password: String,

    /// New password to set.
    new_password: String,
}

/// Message sent to the server to update the profile of the session's account.
#[derive(Deserialize)]
struct UpdateProfileRequest {
    /// New username.
    username: String,

    /// New email address.
    email: String,
}

/// Creates the router for these APIs.
pub(super) fn router() -> Router<Driver> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/forgot-password", post(forgot_password))
        .route("/reset-password", post(reset_password))
        .route("/change-password", patch(change_password))
        .route("/profile", get(get_profile).patch(update_profile))
        .route("/users", get(list_users))
}

/// POST handler for account creation.
async fn register(
    State(driver): State<Driver>,
    Json(request): Json<RegisterRequest>,
) -> RestResult<(http::StatusCode, Json<SessionResponse>)> {
    let (token, user) =
        driver.register(request.username, request.email, request.password, request.role).await?;
    let response =
        SessionResponse { token: token.as_str().to_owned(), user: UserResponse::from(&user) };
    Ok((http::StatusCode::CREATED, Json(response)))
}

/// POST handler for logins.
async fn login(
    State(driver): State<Driver>,
    Json(request): Json<LoginRequest>,
) -> RestResult<Json<SessionResponse>> {
    let (token, user) = driver.login(request.email, request.password).await?;
    let response =
        SessionResponse { token: token.as_str().to_owned(), user: UserResponse::from(&user) };
    Ok(Json(response))
}

/// POST handler to request a password reset link.
async fn forgot_password(
    State(driver): State<Driver>,
    Json(request): Json<ForgotPasswordRequest>,
) -> RestResult<Json<MessageResponse>> {
    driver.forgot_password(request.email).await?;
    Ok(Json(MessageResponse::new("Password reset email sent")))
}

/// POST handler to complete a password reset.
async fn reset_password(
    State(driver): State<Driver>,
    Json(request): Json<ResetPasswordRequest>,
) -> RestResult<Json<MessageResponse>> {
    driver.reset_password(request.token, request.password).await?;
    Ok(Json(MessageResponse::new("Password updated")))
}

/// PATCH handler to replace the password of the session's account.
async fn change_password(
    State(driver): State<Driver>,
    headers: HeaderMap,
    Json(request): Json<ChangePasswordRequest>,
) -> RestResult<Json<MessageResponse>> {
    let token = get_bearer_auth(&headers)?;
    driver.change_password(&token, request.current_password, request.new_password).await?;
    Ok(Json(MessageResponse::new("Password updated")))
}

/// GET handler for the session's profile.
async fn get_profile(
    State(driver): State<Driver>,
    headers: HeaderMap,
) -> RestResult<Json<UserResponse>> {
    let token = get_bearer_auth(&headers)?;
    let user = driver.get_profile(&token).await?;
    Ok(Json(UserResponse::from(&user)))
}

/// PATCH handler for the session's profile.
async fn update_profile(
    State(driver): State<Driver>,
    headers: HeaderMap,
    Json(request): Json<UpdateProfileRequest>,
) -> RestResult<Json<UserResponse>> {
    let token = get_bearer_auth(&headers)?;
    let user = driver.update_profile(&token, request.username, request.email).await?;
    Ok(Json(UserResponse::from(&user)))
}

/// GET handler for the full user list, restricted to administrators.
async fn list_users(
    State(driver): State<Driver>,
    headers: HeaderMap,
) -> RestResult<Json<Vec<UserResponse>>> {
    let token = get_bearer_auth(&headers)?;
    let users = driver.list_users(&token).await?;
    Ok(Json(users.iter().map(UserResponse::from).collect()))
}
