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

//! Reviews left against trainings.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use traindesk_core::model::EmailAddress;

/// Minimum number of stars in a review.
const MIN_STARS: i16 = 1;

/// Maximum number of stars in a review.
const MAX_STARS: i16 = 5;

/// Validates the stars of a review, returning a field error message on failure.
///
/// The database schema carries the same restriction as a CHECK constraint so data that
/// bypasses this function cannot be persisted either.
pub(crate) fn validate_stars(stars: i16) -> Result<(), String> {
    if !(MIN_STARS..=MAX_STARS).contains(&stars) {
        return Err(format!("Stars must be between {} and {}", MIN_STARS, MAX_STARS));
    }
    Ok(())
}

/// Validates a contact phone number, returning a field error message on failure.
pub(crate) fn validate_phone(phone: &str) -> Result<(), String> {
    let digits = phone.chars().filter(char::is_ascii_digit).count();
    let well_formed = phone
        .chars()
        .all(|c| c.is_ascii_digit() || c == '+' || c == '-' || c == '(' || c == ')' || c == ' ');
    if digits < 7 || phone.len() > 20 || !well_formed {
        return Err("Phone number is invalid".to_owned());
    }
    Ok(())
}

/// A review as stored in the database.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub(crate) struct Review {
    /// Identifier of the review.
    pub(crate) id: i32,

    /// Identifier of the training the review is about.
    pub(crate) training_id: i32,

    /// Email address of the reviewer.
    pub(crate) user_email: EmailAddress,

    /// Contact phone number of the reviewer.
    pub(crate) user_phone: String,

    /// Star rating, between 1 and 5.
    pub(crate) stars: i16,

    /// Free-form text of the review.
    pub(crate) description: String,

    /// Time at which the review was submitted.
    #[serde(with = "time::serde::rfc3339")]
    pub(crate) created_at: OffsetDateTime,
}

/// Aggregated rating of a training.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub(crate) struct Rating {
    /// Average star rating across all reviews, or zero if there are none.
    pub(crate) average: f64,

    /// Number of reviews behind the average.
    pub(crate) count: i64,
}
