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

//! APIs to manage training reviews.

use crate::driver::Driver;
use crate::model::{Rating, Review};
use crate::rest::httputils::get_bearer_auth;
use axum::extract::{Path, State};
use axum::routing::get;
use axum::{http, Json, Router};
use http::header::HeaderMap;
use serde::{Deserialize, Serialize};
use traindesk_core::rest::RestResult;

/// Message sent to the server to post a review.
#[derive(Deserialize)]
struct CreateReviewRequest {
    /// Identifier of the training being reviewed.
    training_id: i32,

    /// Email address of the reviewer.
    user_email: String,

    /// Phone number of the reviewer.
    user_phone: String,

    /// Star rating, between 1 and 5.
    stars: i16,

    /// Free-form text of the review.
    description: String,
}

/// Message sent to the server to amend a review.
#[derive(Deserialize)]
struct UpdateReviewRequest {
    /// New star rating, between 1 and 5.
    stars: i16,

    /// New text of the review.
    description: String,
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
        .route("/", axum::routing::post(create))
        .route("/:id", axum::routing::put(update).delete(delete))
        .route("/training/:id", get(list_by_training))
        .route("/training/:id/rating", get(get_rating))
}

/// POST handler to post a review.
async fn create(
    State(driver): State<Driver>,
    Json(request): Json<CreateReviewRequest>,
) -> RestResult<(http::StatusCode, Json<Review>)> {
    let review = driver
        .create_review(
            request.training_id,
            request.user_email,
            request.user_phone,
            request.stars,
            request.description,
        )
        .await?;
    Ok((http::StatusCode::CREATED, Json(review)))
}

/// GET handler for the reviews of one training.
async fn list_by_training(
    State(driver): State<Driver>,
    Path(id): Path<i32>,
) -> RestResult<Json<Vec<Review>>> {
    Ok(Json(driver.list_reviews(id).await?))
}

/// GET handler for the aggregated rating of one training.
async fn get_rating(State(driver): State<Driver>, Path(id): Path<i32>) -> RestResult<Json<Rating>> {
    Ok(Json(driver.get_rating(id).await?))
}

/// PUT handler to amend a review, restricted to administrators.
async fn update(
    State(driver): State<Driver>,
    Path(id): Path<i32>,
    headers: HeaderMap,
    Json(request): Json<UpdateReviewRequest>,
) -> RestResult<Json<Review>> {
    let token = get_bearer_auth(&headers)?;
    let review = driver.update_review(&token, id, request.stars, request.description).await?;
    Ok(Json(review))
}

/// DELETE handler to remove a review, restricted to administrators.
async fn delete(
    State(driver): State<Driver>,
    Path(id): Path<i32>,
    headers: HeaderMap,
) -> RestResult<Json<DeleteResponse>> {
    let token = get_bearer_auth(&headers)?;
    driver.delete_review(&token, id).await?;
    Ok(Json(DeleteResponse { message: "Review deleted".to_owned() }))
}
