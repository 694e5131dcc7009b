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

//! APIs to manage training schedules.

use crate::driver::Driver;
use crate::model::TrainingSchedule;
use crate::rest::httputils::get_bearer_auth;
use axum::extract::{Path, State};
use axum::routing::get;
use axum::{http, Json, Router};
use http::header::HeaderMap;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use traindesk_core::rest::RestResult;

/// Message sent to the server to create or update a schedule.
#[derive(Deserialize)]
struct ScheduleRequest {
    /// Identifier of the training the schedule belongs to.
    training_id: i32,

    /// When the session starts.
    #[serde(with = "time::serde::rfc3339")]
    start_date: OffsetDateTime,

    /// When the session ends.
    #[serde(with = "time::serde::rfc3339")]
    end_date: OffsetDateTime,

    /// Maximum number of enrollees.
    capacity: i32,
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
        .route("/training/:id", get(list_by_training))
}

/// POST handler to create a schedule.
async fn create(
    State(driver): State<Driver>,
    headers: HeaderMap,
    Json(request): Json<ScheduleRequest>,
) -> RestResult<(http::StatusCode, Json<TrainingSchedule>)> {
    let token = get_bearer_auth(&headers)?;
    let schedule = driver
        .create_schedule(
            &token,
            request.training_id,
            request.start_date,
            request.end_date,
            request.capacity,
        )
        .await?;
    Ok((http::StatusCode::CREATED, Json(schedule)))
}

/// GET handler for the full schedule list.
async fn list(State(driver): State<Driver>) -> RestResult<Json<Vec<TrainingSchedule>>> {
    Ok(Json(driver.list_schedules().await?))
}

/// GET handler for a single schedule.
async fn get_one(
    State(driver): State<Driver>,
    Path(id): Path<i32>,
) -> RestResult<Json<TrainingSchedule>> {
    Ok(Json(driver.get_schedule(id).await?))
}

/// GET handler for the schedules of one training.
async fn list_by_training(
    State(driver): State<Driver>,
    Path(id): Path<i32>,
) -> RestResult<Json<Vec<TrainingSchedule>>> {
    Ok(Json(driver.list_schedules_by_training(id).await?))
}

/// PUT handler to update a schedule.
async fn update(
    State(driver): State<Driver>,
    Path(id): Path<i32>,
    headers: HeaderMap,
    Json(request): Json<ScheduleRequest>,
) -> RestResult<Json<TrainingSchedule>> {
    let token = get_bearer_auth(&headers)?;
    let schedule = TrainingSchedule {
        id,
        training_id: request.training_id,
        start_date: request.start_date,
        end_date: request.end_date,
        capacity: request.capacity,
    };
    Ok(Json(driver.update_schedule(&token, schedule).await?))
}

/// DELETE handler to remove a schedule.
async fn delete(
    State(driver): State<Driver>,
    Path(id): Path<i32>,
    headers: HeaderMap,
) -> RestResult<Json<DeleteResponse>> {
    let token = get_bearer_auth(&headers)?;
    driver.delete_schedule(&token, id).await?;
    Ok(Json(DeleteResponse { message: "Training schedule deleted".to_owned() }))
}
