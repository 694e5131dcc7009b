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

//! APIs to manage training categories.

use crate::driver::Driver;
use crate::model::Category;
use crate::rest::httputils::get_bearer_auth;
use axum::extract::{Path, State};
use axum::routing::get;
use axum::{http, Json, Router};
use http::header::HeaderMap;
use serde::{Deserialize, Serialize};
use traindesk_core::rest::RestResult;

/// Message sent to the server to create or update a category.
#[derive(Deserialize)]
struct CategoryRequest {
    /// Name of the category.
    name: String,

    /// Free-form description of the category.
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
        .route("/", axum::routing::post(create).get(list))
        .route("/:id", get(get_one).put(update).delete(delete))
}

/// POST handler to create a category.
async fn create(
    State(driver): State<Driver>,
    headers: HeaderMap,
    Json(request): Json<CategoryRequest>,
) -> RestResult<(http::StatusCode, Json<Category>)> {
    let token = get_bearer_auth(&headers)?;
    let category = driver.create_category(&token, request.name, request.description).await?;
    Ok((http::StatusCode::CREATED, Json(category)))
}

/// GET handler for the category list.
async fn list(State(driver): State<Driver>) -> RestResult<Json<Vec<Category>>> {
    Ok(Json(driver.list_categories().await?))
}

/// GET handler for a single category.
async fn get_one(State(driver): State<Driver>, Path(id): Path<i32>) -> RestResult<Json<Category>> {
    Ok(Json(driver.get_category(id).await?))
}

/// PUT handler to update a category.
async fn update(
    State(driver): State<Driver>,
    Path(id): Path<i32>,
    headers: HeaderMap,
    Json(request): Json<CategoryRequest>,
) -> RestResult<Json<Category>> {
    let token = get_bearer_auth(&headers)?;
    let category = driver.update_category(&token, id, request.name, request.description).await?;
    Ok(Json(category))
}

/// DELETE handler to remove a category.
async fn delete(
    State(driver): State<Driver>,
    Path(id): Path<i32>,
    headers: HeaderMap,
) -> RestResult<Json<DeleteResponse>> {
    let token = get_bearer_auth(&headers)?;
    driver.delete_category(&token, id).await?;
    Ok(Json(DeleteResponse { message: "Category deleted".to_owned() }))
}
