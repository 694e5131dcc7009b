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

//! Management of the training catalog.

use crate::db;
use crate::driver::Driver;
use crate::model::{compute_fee, AccessToken, Training, TrainingSchedule};
use serde::Deserialize;
use time::OffsetDateTime;
use traindesk_core::db::TxExecutor;
use traindesk_core::driver::DriverResult;

/// Details of one schedule supplied inline with a training create or update request.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub(crate) struct ScheduleSpec {
    /// When the session starts.
    #[serde(with = "time::serde::rfc3339")]
    pub(crate) start_date: OffsetDateTime,

    /// When the session ends.
    #[serde(with = "time::serde::rfc3339")]
    pub(crate) end_date: OffsetDateTime,

    /// Maximum number of enrollees for the session.
    pub(crate) capacity: i32,
}

/// Replaces all schedules of `training_id` with those in `specs`.
async fn replace_schedules(
    tx: &mut TxExecutor,
    training_id: i32,
    specs: &[ScheduleSpec],
) -> DriverResult<()> {
    db::delete_schedules_by_training(tx.ex(), training_id).await?;
    for spec in specs {
        db::create_schedule(tx.ex(), training_id, spec.start_date, spec.end_date, spec.capacity)
            .await?;
    }
    Ok(())
}

impl Driver {
    /// Creates a new training, computing the discounted fee from the original fee, and
    /// optionally creates a set of schedules for it.  Restricted to administrators.
    pub(crate) async fn create_training(
        self,
        token: &AccessToken,
        mut training: Training,
        schedules: Option<Vec<ScheduleSpec>>,
    ) -> DriverResult<Training> {
        self.authenticate_admin(token).await?;

        training.fee = compute_fee(training.original_fee, training.discount_percentage)?;

        let mut tx = self.db.begin().await?;
        training.id = db::create_training(tx.ex(), &training).await?;
        if let Some(specs) = schedules {
            for spec in specs {
                db::create_schedule(
                    tx.ex(),
                    training.id,
                    spec.start_date,
                    spec.end_date,
                    spec.capacity,
                )
                .await?;
            }
        }
        tx.commit().await?;

        Ok(training)
    }

    /// Returns one training by id.
    pub(crate) async fn get_training(self, id: i32) -> DriverResult<Training> {
        Ok(db::get_training(&mut self.db.ex().await?, id).await?)
    }

    /// Returns all trainings in the catalog.
    pub(crate) async fn list_trainings(self) -> DriverResult<Vec<Training>> {
        Ok(db::list_trainings(&mut self.db.ex().await?).await?)
    }

    /// Returns the trainings grouped under one category.
    pub(crate) async fn list_trainings_by_category(
        self,
        category_id: i32,
    ) -> DriverResult<Vec<Training>> {
        Ok(db::list_trainings_by_category(&mut self.db.ex().await?, category_id).await?)
    }

    /// Updates a training.  The fee columns are never touched by an update, and when a schedule
    /// list is supplied the training's existing schedules are replaced wholesale.  Restricted
    /// to administrators.
    pub(crate) async fn update_training(
        self,
        token: &AccessToken,
        training: Training,
        schedules: Option<Vec<ScheduleSpec>>,
    ) -> DriverResult<Training> {
        self.authenticate_admin(token).await?;

        let mut tx = self.db.begin().await?;
        db::update_training(tx.ex(), &training).await?;
        if let Some(specs) = schedules {
            replace_schedules(&mut tx, training.id, &specs).await?;
        }
        let training = db::get_training(tx.ex(), training.id).await?;
        tx.commit().await?;

        Ok(training)
    }

    /// Deletes a training together with its schedules and reviews.  Restricted to
    /// administrators.
    pub(crate) async fn delete_training(self, token: &AccessToken, id: i32) -> DriverResult<()> {
        self.authenticate_admin(token).await?;

        let mut tx = self.db.begin().await?;
        db::delete_schedules_by_training(tx.ex(), id).await?;
        db::delete_reviews_by_training(tx.ex(), id).await?;
        db::delete_training(tx.ex(), id).await?;
        tx.commit().await?;

        Ok(())
    }

    /// Returns the schedules of one training.
    pub(crate) async fn list_schedules_by_training(
        self,
        training_id: i32,
    ) -> DriverResult<Vec<TrainingSchedule>> {
        Ok(db::list_schedules_by_training(&mut self.db.ex().await?, training_id).await?)
    }
}
