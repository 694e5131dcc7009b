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

//! Management of training schedules.

use crate::db;
use crate::driver::Driver;
use crate::model::{AccessToken, TrainingSchedule};
use time::OffsetDateTime;
use traindesk_core::driver::{DriverError, DriverResult};

/// Validates the shape of a schedule before it reaches the database.
fn validate(start_date: OffsetDateTime, end_date: OffsetDateTime, capacity: i32) -> DriverResult<()> {
    let mut errors = vec![];
    if end_date <= start_date {
        errors.push("End date must be after the start date".to_owned());
    }
    if capacity <= 0 {
        errors.push("Capacity must be positive".to_owned());
    }
    if errors.is_empty() {
        Ok(())
    } else {
        Err(DriverError::Validation(errors))
    }
}

impl Driver {
    /// Creates a schedule for an existing training.  Restricted to administrators.
    pub(crate) async fn create_schedule(
        self,
        token: &AccessToken,
        training_id: i32,
        start_date: OffsetDateTime,
        end_date: OffsetDateTime,
        capacity: i32,
    ) -> DriverResult<TrainingSchedule> {
        self.authenticate_admin(token).await?;
        validate(start_date, end_date, capacity)?;

        let id =
            db::create_schedule(&mut self.db.ex().await?, training_id, start_date, end_date, capacity)
                .await?;
        Ok(TrainingSchedule { id, training_id, start_date, end_date, capacity })
    }

    /// Returns one schedule by id.
    pub(crate) async fn get_schedule(self, id: i32) -> DriverResult<TrainingSchedule> {
        Ok(db::get_schedule(&mut self.db.ex().await?, id).await?)
    }

    /// Returns all schedules.
    pub(crate) async fn list_schedules(self) -> DriverResult<Vec<TrainingSchedule>> {
        Ok(db::list_schedules(&mut self.db.ex().await?).await?)
    }

    /// Updates a schedule in place.  Restricted to administrators.
    pub(crate) async fn update_schedule(
        self,
        token: &AccessToken,
        schedule: TrainingSchedule,
    ) -> DriverResult<TrainingSchedule> {
        self.authenticate_admin(token).await?;
        validate(schedule.start_date, schedule.end_date, schedule.capacity)?;

        db::update_schedule(&mut self.db.ex().await?, &schedule).await?;
        Ok(schedule)
    }

    /// Deletes a schedule.  Restricted to administrators.
    pub(crate) async fn delete_schedule(self, token: &AccessToken, id: i32) -> DriverResult<()> {
        self.authenticate_admin(token).await?;
        Ok(db::delete_schedule(&mut self.db.ex().await?, id).await?)
    }
}
