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

//! APIs to manage the training catalog.

use crate::driver::{Driver, ScheduleSpec};
use crate::model::Training;
use crate::rest::httputils::get_bearer_auth;
use axum::extract::{Path, State};
use axum::routing::get;
use axum::{http, Json, Router};
use http::header::HeaderMap;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use traindesk_core::rest::RestResult;

/// Request payload for training creation and update.
///
/// The `fee` field carries the pre-discount price; the discounted fee is computed by the
/// server and both values appear in responses.  The fee fields default to zero so that
/// update payloads, which never carry them because fees cannot be changed after creation,
/// can omit them altogether; creation rejects a zero fee.
#[derive(Deserialize)]
struct TrainingRequest {
    /// Title of the training.
    title: String,

    /// Short description for catalog listings.
    description: String,

    /// Long-form details of the training.
    details: String,

    /// Human-readable duration, such as "4 weeks".
    duration: String,

    /// Name of the instructor.
    instructor: String,

    /// Fee before applying the discount.
    #[serde(default)]
    fee: Decimal,

    /// Discount to apply to the original fee, as a percentage.
    #[serde(default)]
    discount_percentage: Decimal,

    /// Difficulty level of the training.
    level: String,

    /// Whether completing the training grants a certification.
    certification: bool,

    /// Topics covered by the training.
    what_you_will_learn: Vec<String>,

    /// Address at which the training takes place.
    address: String,

    /// Identifier of the category the training belongs to.
    category_id: i32,

    /// Date on which the training becomes available.
    #[serde(with = "time::serde::rfc3339")]
    start_date: OffsetDateTime,

    /// Date on which the training stops being available.
    #[serde(with = "time::serde::rfc3339")]
    end_date: OffsetDateTime,

    /// Schedules to create along with the training, if any.
    schedules: Option<Vec<ScheduleSpec>>,
}

impl TrainingRequest {
    /// Splits the request into the training entity, identified by `id`, and the inline
    /// schedule list.
    fn into_training(self, id: i32) -> (Training, Option<Vec<ScheduleSpec>>) {
        let training = Training {
            id,
            title: self.title,
            description: self.description,
            details: self.details,
            duration: self.duration,
            instructor: self.instructor,
            fee: Decimal::ZERO,
            original_fee: self.fee,
            discount_percentage: self.discount_percentage,
            level: self.level,
            certification: self.certification,
            what_you_will_learn: self.what_you_will_learn,
            address: self.address,
            category_id: self.category_id,
            start_date: self.start_date,
            end_date: self.end_date,
        };
        (training, self.schedules)
    }
}

/// Response to a deletion request.
#[derive(Debug, Deserialize, Serialize)]
struct DeleteResponse {
    /// Human-readable confirmation.
    message: String,
}

/// Creates the router for these APIs.
pub(super) fn router() -> Router<Driver> {
    Router::new()
        .route("/", axum::routing::post(create).get(list))
        .route("/:id", get(get_one).put(update).delete(delete))
        .route("/category/:id", get(list_by_category))
}

/// POST handler to create a training, optionally with inline schedules.
async fn create(
    State(driver): State<Driver>,
    headers: HeaderMap,
    Json(request): Json<TrainingRequest>,
) -> RestResult<(http::StatusCode, Json<Training>)> {
    let token = get_bearer_auth(&headers)?;
    let (training, schedules) = request.into_training(0);
    let training = driver.create_training(&token, training, schedules).await?;
    Ok((http::StatusCode::CREATED, Json(training)))
}

/// GET handler for the full catalog.
async fn list(State(driver): State<Driver>) -> RestResult<Json<Vec<Training>>> {
    Ok(Json(driver.list_trainings().await?))
}

/// GET handler for a single training.
async fn get_one(State(driver): State<Driver>, Path(id): Path<i32>) -> RestResult<Json<Training>> {
    Ok(Json(driver.get_training(id).await?))
}

/// GET handler for the trainings within one category.
async fn list_by_category(
    State(driver): State<Driver>,
    Path(id): Path<i32>,
) -> RestResult<Json<Vec<Training>>> {
    Ok(Json(driver.list_trainings_by_category(id).await?))
}

/// PUT handler to update a training.
async fn update(
    State(driver): State<Driver>,
    Path(id): Path<i32>,
    headers: HeaderMap,
    Json(request): Json<TrainingRequest>,
) -> RestResult<Json<Training>> {
    let token = get_bearer_auth(&headers)?;
    let (training, schedules) = request.into_training(id);
    let training = driver.update_training(&token, training, schedules).await?;
    Ok(Json(training))
}

/// DELETE handler to remove a training and its dependent schedules and reviews.
async fn delete(
    State(driver): State<Driver>,
    Path(id): Path<i32>,
    headers: HeaderMap,
) -> RestResult<Json<DeleteResponse>> {
    let token = get_bearer_auth(&headers)?;
    driver.delete_training(&token, id).await?;
    Ok(Json(DeleteResponse { message: "Training deleted".to_owned() }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rest::testutils::*;
    use serde_json::json;
    use traindesk_core::rest::testutils::*;

    fn route() -> (http::Method, &'static str) {
        (http::Method::POST, "/api/training")
    }

    /// Returns a JSON payload with all the fields of a valid training in `category_id`.
    fn make_payload(category_id: i32) -> serde_json::Value {
        json!({
            "title": "Advanced Kite Flying",
            "description": "Learn to fly kites",
            "details": "A lot of details about kites",
            "duration": "4 weeks",
            "instructor": "Some Instructor",
            "fee": "100.00",
            "discount_percentage": "20",
            "level": "Beginner",
            "certification": true,
            "what_you_will_learn": ["Knots", "Wind"],
            "address": "123 Fake Street",
            "category_id": category_id,
            "start_date": "2025-07-01T09:00:00Z",
            "end_date": "2025-07-28T17:00:00Z",
        })
    }

    #[tokio::test]
    async fn test_create_requires_admin() {
        let context = TestContext::setup().await;
        let (token, _user) = context.driver.do_register_user("some-user", "some@example.com").await;

        OneShotBuilder::new(context.app(), route())
            .with_bearer_auth(token.as_str())
            .send_json(make_payload(1))
            .await
            .expect_status(http::StatusCode::FORBIDDEN)
            .expect_error("Administrator privileges required")
            .await;
    }

    #[tokio::test]
    async fn test_create_computes_fee() {
        let context = TestContext::setup().await;
        let (token, _admin) =
            context.driver.do_register_admin("the-admin", "admin@example.com").await;
        let category_id = context.driver.do_create_category(&token, "Outdoors").await;

        let training = OneShotBuilder::new(context.app(), route())
            .with_bearer_auth(token.as_str())
            .send_json(make_payload(category_id))
            .await
            .expect_status(http::StatusCode::CREATED)
            .expect_json::<Training>()
            .await;
        assert_eq!(Decimal::new(8000, 2), training.fee);
        assert_eq!(Decimal::new(100, 0), training.original_fee);
    }

    #[tokio::test]
    async fn test_create_missing_fee() {
        let context = TestContext::setup().await;
        let (token, _admin) =
            context.driver.do_register_admin("the-admin", "admin@example.com").await;
        let category_id = context.driver.do_create_category(&token, "Outdoors").await;

        let mut payload = make_payload(category_id);
        payload.as_object_mut().unwrap().remove("fee");

        OneShotBuilder::new(context.app(), route())
            .with_bearer_auth(token.as_str())
            .send_json(payload)
            .await
            .expect_status(http::StatusCode::BAD_REQUEST)
            .expect_error("Fee must be greater than zero")
            .await;
    }

    #[tokio::test]
    async fn test_create_with_inline_schedules() {
        let context = TestContext::setup().await;
        let (token, _admin) =
            context.driver.do_register_admin("the-admin", "admin@example.com").await;
        let category_id = context.driver.do_create_category(&token, "Outdoors").await;

        let mut payload = make_payload(category_id);
        payload["schedules"] = json!([{
            "start_date": "2025-07-01T09:00:00Z",
            "end_date": "2025-07-05T17:00:00Z",
            "capacity": 20
        }]);
        let training = OneShotBuilder::new(context.app(), route())
            .with_bearer_auth(token.as_str())
            .send_json(payload)
            .await
            .expect_status(http::StatusCode::CREATED)
            .expect_json::<Training>()
            .await;

        let schedules = OneShotBuilder::new(
            context.app(),
            (http::Method::GET, format!("/api/training-schedules/training/{}", training.id)),
        )
        .send_empty()
        .await
        .expect_json::<serde_json::Value>()
        .await;
        assert_eq!(1, schedules.as_array().unwrap().len());
    }

    #[tokio::test]
    async fn test_create_dangling_category() {
        let context = TestContext::setup().await;
        let (token, _admin) =
            context.driver.do_register_admin("the-admin", "admin@example.com").await;

        OneShotBuilder::new(context.app(), route())
            .with_bearer_auth(token.as_str())
            .send_json(make_payload(123))
            .await
            .expect_status(http::StatusCode::NOT_FOUND)
            .expect_error("not found")
            .await;
    }

    #[tokio::test]
    async fn test_get_and_list_by_category() {
        let context = TestContext::setup().await;
        let (token, _admin) =
            context.driver.do_register_admin("the-admin", "admin@example.com").await;
        let training_id = context.driver.do_create_training(&token).await;

        let training = OneShotBuilder::new(
            context.app(),
            (http::Method::GET, format!("/api/training/{}", training_id)),
        )
        .send_empty()
        .await
        .expect_json::<Training>()
        .await;

        let in_category = OneShotBuilder::new(
            context.app(),
            (http::Method::GET, format!("/api/training/category/{}", training.category_id)),
        )
        .send_empty()
        .await
        .expect_json::<Vec<Training>>()
        .await;
        assert_eq!(vec![training], in_category);
    }

    #[tokio::test]
    async fn test_update_preserves_fees() {
        let context = TestContext::setup().await;
        let (token, _admin) =
            context.driver.do_register_admin("the-admin", "admin@example.com").await;
        let training_id = context.driver.do_create_training(&token).await;

        let training = OneShotBuilder::new(
            context.app(),
            (http::Method::GET, format!("/api/training/{}", training_id)),
        )
        .send_empty()
        .await
        .expect_json::<Training>()
        .await;

        let mut payload = make_payload(training.category_id);
        payload["title"] = json!("Renamed");
        payload.as_object_mut().unwrap().remove("fee");
        payload.as_object_mut().unwrap().remove("discount_percentage");

        let updated = OneShotBuilder::new(
            context.app(),
            (http::Method::PUT, format!("/api/training/{}", training_id)),
        )
        .with_bearer_auth(token.as_str())
        .send_json(payload)
        .await
        .expect_json::<Training>()
        .await;
        assert_eq!("Renamed", updated.title);
        assert_eq!(Decimal::new(8000, 2), updated.fee);
    }

    #[tokio::test]
    async fn test_delete() {
        let context = TestContext::setup().await;
        let (token, _admin) =
            context.driver.do_register_admin("the-admin", "admin@example.com").await;
        let training_id = context.driver.do_create_training(&token).await;

        OneShotBuilder::new(
            context.app(),
            (http::Method::DELETE, format!("/api/training/{}", training_id)),
        )
        .with_bearer_auth(token.as_str())
        .send_empty()
        .await
        .expect_json::<DeleteResponse>()
        .await;

        OneShotBuilder::new(
            context.app(),
            (http::Method::GET, format!("/api/training/{}", training_id)),
        )
        .send_empty()
        .await
        .expect_status(http::StatusCode::NOT_FOUND)
        .expect_error("not found")
        .await;
    }

    test_payload_must_be_json!(TestContext::setup().await.into_app(), route());
}
