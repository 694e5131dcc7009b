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

//! APIs to submit and manage enrollments.

use crate::driver::Driver;
use crate::model::{EnrollmentDetails, EnrollmentStatus};
use crate::rest::httputils::get_bearer_auth;
use axum::extract::{Path, State};
use axum::routing::{get, patch};
use axum::{http, Json, Router};
use http::header::HeaderMap;
use serde::{Deserialize, Serialize};
use traindesk_core::rest::RestResult;

/// Message sent to the server to enroll in a training session.
#[derive(Deserialize)]
struct CreateEnrollmentRequest {
    /// Full name of the enrollee.
    fullname: String,

    /// Email address to send the confirmation documents to.
    email: String,

    /// Contact phone number of the enrollee.
    phone: String,

    /// Postal address of the enrollee.
    address: String,

    /// Identifier of the schedule to enroll in.
    training_schedule_id: i32,
}

/// Response to an enrollment submission.
///
/// The submission only returns the new identifier: the confirmation documents reach the
/// enrollee by email once the background notifier gets to the task.
#[derive(Debug, Deserialize, Serialize)]
struct CreateEnrollmentResponse {
    /// Identifier of the new enrollment.
    id: i32,
}

/// Message sent to the server to transition an enrollment to a new status.
#[derive(Deserialize)]
struct SetStatusRequest {
    /// The status to set.
    status: EnrollmentStatus,
}

/// Response carrying just a human-readable confirmation.
#[derive(Debug, Deserialize, Serialize)]
struct MessageResponse {
    /// The confirmation text.
    message: String,
}

/// Creates the router for these APIs.
pub(super) fn router() -> Router<Driver> {
    Router::new()
        .route("/", axum::routing::post(create).get(list))
        .route("/:id", get(get_one))
        .route("/:id/status", patch(set_status))
}

/// POST handler to submit an enrollment.
async fn create(
    State(driver): State<Driver>,
    Json(request): Json<CreateEnrollmentRequest>,
) -> RestResult<(http::StatusCode, Json<CreateEnrollmentResponse>)> {
    let id = driver
        .create_enrollment(
            request.fullname,
            request.email,
            request.phone,
            request.address,
            request.training_schedule_id,
        )
        .await?;
    Ok((http::StatusCode::CREATED, Json(CreateEnrollmentResponse { id })))
}

/// GET handler for the enrollment list.
async fn list(State(driver): State<Driver>) -> RestResult<Json<Vec<EnrollmentDetails>>> {
    Ok(Json(driver.list_enrollments().await?))
}

/// GET handler for a single enrollment with its schedule and training.
async fn get_one(
    State(driver): State<Driver>,
    Path(id): Path<i32>,
) -> RestResult<Json<EnrollmentDetails>> {
    Ok(Json(driver.get_enrollment(id).await?))
}

/// PATCH handler to transition an enrollment's status.
async fn set_status(
    State(driver): State<Driver>,
    Path(id): Path<i32>,
    headers: HeaderMap,
    Json(request): Json<SetStatusRequest>,
) -> RestResult<Json<MessageResponse>> {
    let token = get_bearer_auth(&headers)?;
    driver.set_enrollment_status(&token, id, request.status).await?;
    Ok(Json(MessageResponse { message: "Enrollment status updated".to_owned() }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rest::testutils::*;
    use serde_json::json;
    use traindesk_core::rest::testutils::*;

    fn route() -> (http::Method, &'static str) {
        (http::Method::POST, "/api/enrollments")
    }

    fn make_payload(training_schedule_id: i32) -> serde_json::Value {
        json!({
            "fullname": "Some Student",
            "email": "student@example.com",
            "phone": "5551234567",
            "address": "456 Other Street",
            "training_schedule_id": training_schedule_id
        })
    }

    #[tokio::test]
    async fn test_create_is_public() {
        let context = TestContext::setup().await;
        let (token, _admin) =
            context.driver.do_register_admin("the-admin", "admin@example.com").await;
        let schedule_id = context.driver.do_create_schedule(&token).await;

        let response = OneShotBuilder::new(context.app(), route())
            .send_json(make_payload(schedule_id))
            .await
            .expect_status(http::StatusCode::CREATED)
            .expect_json::<CreateEnrollmentResponse>()
            .await;

        let details = OneShotBuilder::new(
            context.app(),
            (http::Method::GET, format!("/api/enrollments/{}", response.id)),
        )
        .send_empty()
        .await
        .expect_json::<EnrollmentDetails>()
        .await;
        assert_eq!("Some Student", details.enrollment.fullname);
        assert_eq!(EnrollmentStatus::Pending, details.enrollment.status);
        assert_eq!(schedule_id, details.schedule.id);
    }

    #[tokio::test]
    async fn test_create_validation_errors() {
        let context = TestContext::setup().await;

        OneShotBuilder::new(context.app(), route())
            .send_json(json!({
                "fullname": " ",
                "email": "bad-email",
                "phone": "123",
                "address": "",
                "training_schedule_id": 1
            }))
            .await
            .expect_status(http::StatusCode::BAD_REQUEST)
            .expect_field_error("Full name cannot be empty")
            .await;
    }

    #[tokio::test]
    async fn test_create_dangling_schedule() {
        let context = TestContext::setup().await;

        OneShotBuilder::new(context.app(), route())
            .send_json(make_payload(123))
            .await
            .expect_status(http::StatusCode::NOT_FOUND)
            .expect_error("not found")
            .await;
    }

    #[tokio::test]
    async fn test_list() {
        let context = TestContext::setup().await;
        let (token, _admin) =
            context.driver.do_register_admin("the-admin", "admin@example.com").await;
        let schedule_id = context.driver.do_create_schedule(&token).await;

        for _ in 0..2 {
            OneShotBuilder::new(context.app(), route())
                .send_json(make_payload(schedule_id))
                .await
                .expect_status(http::StatusCode::CREATED)
                .expect_json::<CreateEnrollmentResponse>()
                .await;
        }

        let all = OneShotBuilder::new(context.app(), (http::Method::GET, "/api/enrollments"))
            .send_empty()
            .await
            .expect_json::<Vec<EnrollmentDetails>>()
            .await;
        assert_eq!(2, all.len());
    }

    #[tokio::test]
    async fn test_set_status_requires_admin() {
        let context = TestContext::setup().await;
        let (admin_token, _admin) =
            context.driver.do_register_admin("the-admin", "admin@example.com").await;
        let (user_token, _user) =
            context.driver.do_register_user("some-user", "some@example.com").await;
        let schedule_id = context.driver.do_create_schedule(&admin_token).await;

        let response = OneShotBuilder::new(context.app(), route())
            .send_json(make_payload(schedule_id))
            .await
            .expect_status(http::StatusCode::CREATED)
            .expect_json::<CreateEnrollmentResponse>()
            .await;

        OneShotBuilder::new(
            context.app(),
            (http::Method::PATCH, format!("/api/enrollments/{}/status", response.id)),
        )
        .with_bearer_auth(user_token.as_str())
        .send_json(json!({"status": "active"}))
        .await
        .expect_status(http::StatusCode::FORBIDDEN)
        .expect_error("Administrator privileges required")
        .await;

        OneShotBuilder::new(
            context.app(),
            (http::Method::PATCH, format!("/api/enrollments/{}/status", response.id)),
        )
        .with_bearer_auth(admin_token.as_str())
        .send_json(json!({"status": "active"}))
        .await
        .expect_json::<MessageResponse>()
        .await;

        let details = OneShotBuilder::new(
            context.app(),
            (http::Method::GET, format!("/api/enrollments/{}", response.id)),
        )
        .send_empty()
        .await
        .expect_json::<EnrollmentDetails>()
        .await;
        assert_eq!(EnrollmentStatus::Active, details.enrollment.status);
    }

    test_payload_must_be_json!(TestContext::setup().await.into_app(), route());
}
