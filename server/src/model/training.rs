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

//! Trainings offered in the catalog.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use traindesk_core::model::{ModelError, ModelResult};

/// Computes the discounted fee for a training.
///
/// The result is `original` reduced by `discount` percent and rounded to two decimal
/// places, which is the precision the fees are stored with.
pub(crate) fn compute_fee(original: Decimal, discount: Decimal) -> ModelResult<Decimal> {
    if original <= Decimal::ZERO {
        return Err(ModelError("Fee must be greater than zero".to_owned()));
    }
    if discount.is_sign_negative() || discount > Decimal::ONE_HUNDRED {
        return Err(ModelError("Discount percentage must be between 0 and 100".to_owned()));
    }
    let fee = original * (Decimal::ONE_HUNDRED - discount) / Decimal::ONE_HUNDRED;
    Ok(fee.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero))
}

/// A training offering as stored in the database.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub(crate) struct Training {
    /// Identifier of the training.
    pub(crate) id: i32,

    /// Title of the training.
    pub(crate) title: String,

    /// Short description shown in catalog listings.
    pub(crate) description: String,

    /// Long-form details shown in the training page.
    pub(crate) details: String,

    /// Human-readable duration of the training.
    pub(crate) duration: String,

    /// Name of the instructor.
    pub(crate) instructor: String,

    /// Effective fee after applying the discount.
    pub(crate) fee: Decimal,

    /// Fee before the discount.
    pub(crate) original_fee: Decimal,

    /// Discount applied to `original_fee`, as a percentage.
    pub(crate) discount_percentage: Decimal,

    /// Difficulty level of the training.
    pub(crate) level: String,

    /// Whether completing the training awards a certification.
    pub(crate) certification: bool,

    /// Headline items covered by the training.
    pub(crate) what_you_will_learn: Vec<String>,

    /// Address where the training takes place.
    pub(crate) address: String,

    /// Identifier of the category the training belongs to.
    pub(crate) category_id: i32,

    /// Date on which the training becomes available.
    #[serde(with = "time::serde::rfc3339")]
    pub(crate) start_date: OffsetDateTime,

    /// Date on which the training stops being available.
    #[serde(with = "time::serde::rfc3339")]
    pub(crate) end_date: OffsetDateTime,
}
