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

//! Entry point to the REST server.

use crate::driver::Driver;
use axum::Router;
use tower_http::cors::CorsLayer;

mod auth;
mod categories;
mod enrollments;
mod httputils;
mod reviews;
mod schedules;
#[cfg(test)]
mod testutils;
mod trainings;

/// Creates the router for the application.
pub(crate) fn app(driver: Driver) -> Router {
    Router::new()
        .nest("/api/auth", auth::router())
        .nest("/api/categories", categories::router())
        .nest("/api/enrollments", enrollments::router())
        .nest("/api/reviews", reviews::router())
        .nest("/api/training", trainings::router())
        .nest("/api/training-schedules", schedules::router())
        .layer(CorsLayer::permissive())
        .with_state(driver)
}

#[cfg(test)]
mod tests {
    use super::testutils::*;
    use crate::model::EnrollmentStatus;
    use axum::http;
    use serde_json::json;
    use traindesk_core::rest::testutils::*;

    /// Walks through the main user journey across all the resources to validate that the
    /// routers are glued together correctly.
    #[tokio::test]
    async fn test_smoke() {
        let context = TestContext::setup().await;
        let (token, _admin) =
            context.driver.do_register_admin("the-admin", "admin@example.com").await;

        let category = OneShotBuilder::new(
            context.app(),
            (http::Method::POST, "/api/categories"),
        )
        .with_bearer_auth(token.as_str())
        .send_json(json!({"name": "Outdoors", "description": "Trainings in the open air"}))
        .await
        .expect_status(http::StatusCode::CREATED)
        .expect_json::<serde_json::Value>()
        .await;
        let category_id = category["id"].as_i64().unwrap();

        let training = OneShotBuilder::new(context.app(), (http::Method::POST, "/api/training"))
            .with_bearer_auth(token.as_str())
            .send_json(json!({
                "title": "Advanced Kite Flying",
                "description": "Learn to fly kites",
                "details": "A lot of details about kites",
                "duration": "4 weeks",
                "instructor": "Some Instructor",
                "original_fee": "100.00",
                "discount_percentage": "20",
                "level": "Beginner",
                "certification": true,
                "what_you_will_learn": ["Knots", "Wind"],
                "address": "123 Fake Street",
                "category_id": category_id,
                "start_date": "2025-07-01T09:00:00Z",
                "end_date": "2025-07-28T17:00:00Z",
                "schedules": [{
                    "start_date": "2025-07-01T09:00:00Z",
                    "end_date": "2025-07-05T17:00:00Z",
                    "capacity": 20
                }],
            }))
            .await
            .expect_status(http::StatusCode::CREATED)
            .expect_json::<serde_json::Value>()
            .await;
        assert_eq!("80.00", training["fee"].as_str().unwrap());
        let training_id = training["id"].as_i64().unwrap();

        let schedules = OneShotBuilder::new(
            context.app(),
            (http::Method::GET, format!("/api/training-schedules/training/{}", training_id)),
        )
        .send_empty()
        .await
        .expect_json::<serde_json::Value>()
        .await;
        let schedule_id = schedules[0]["id"].as_i64().unwrap();

        let enrollment = OneShotBuilder::new(
            context.app(),
            (http::Method::POST, "/api/enrollments"),
        )
        .send_json(json!({
            "fullname": "Some Student",
            "email": "student@example.com",
            "phone": "5551234567",
            "address": "456 Other Street",
            "training_schedule_id": schedule_id,
        }))
        .await
        .expect_status(http::StatusCode::CREATED)
        .expect_json::<serde_json::Value>()
        .await;
        let enrollment_id = enrollment["id"].as_i64().unwrap();

        let details = OneShotBuilder::new(
            context.app(),
            (http::Method::GET, format!("/api/enrollments/{}", enrollment_id)),
        )
        .send_empty()
        .await
        .expect_json::<serde_json::Value>()
        .await;
        assert_eq!("Some Student", details["fullname"].as_str().unwrap());
        assert_eq!(
            EnrollmentStatus::Pending,
            serde_json::from_value(details["status"].clone()).unwrap()
        );
        assert_eq!("Advanced Kite Flying", details["training"]["title"].as_str().unwrap());
    }
}
