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

//! Enrollment submission and management.
//!
//! Creating an enrollment also enqueues a notification task in the same transaction so that
//! the confirmation email with its PDF documents can be delivered in the background.  A
//! notification failure never makes the enrollment itself disappear.

use crate::db;
use crate::driver::Driver;
use crate::model::{validate_phone, AccessToken, EnrollmentDetails, EnrollmentStatus};
use traindesk_core::db::Executor;
use traindesk_core::driver::{DriverError, DriverResult};
use traindesk_core::model::EmailAddress;

/// Loads an enrollment together with its schedule and training.
pub(super) async fn fetch_details(ex: &mut Executor, id: i32) -> DriverResult<EnrollmentDetails> {
    let enrollment = db::get_enrollment(ex, id).await?;
    let schedule = db::get_schedule(ex, enrollment.training_schedule_id).await?;
    let training = db::get_training(ex, schedule.training_id).await?;
    Ok(EnrollmentDetails { enrollment, schedule, training })
}

impl Driver {
    /// Creates an enrollment in `pending` state and enqueues the task that will deliver the
    /// confirmation email.  Open to anonymous callers.
    pub(crate) async fn create_enrollment(
        self,
        fullname: String,
        email: String,
        phone: String,
        address: String,
        training_schedule_id: i32,
    ) -> DriverResult<i32> {
        let mut errors = vec![];
        if fullname.trim().is_empty() {
            errors.push("Full name cannot be empty".to_owned());
        }
        let email = match EmailAddress::new(email) {
            Ok(email) => Some(email),
            Err(e) => {
                errors.push(e.to_string());
                None
            }
        };
        if let Err(e) = validate_phone(&phone) {
            errors.push(e);
        }
        if address.trim().is_empty() {
            errors.push("Address cannot be empty".to_owned());
        }
        let email = match (email, errors.is_empty()) {
            (Some(email), true) => email,
            (_, _) => return Err(DriverError::Validation(errors)),
        };

        let now = self.clock.now_utc();

        let mut tx = self.db.begin().await?;
        db::get_schedule(tx.ex(), training_schedule_id).await?;
        let id = db::create_enrollment(
            tx.ex(),
            &fullname,
            &email,
            &phone,
            &address,
            training_schedule_id,
            now,
        )
        .await?;
        db::put_task(tx.ex(), id, now).await?;
        tx.commit().await?;

        Ok(id)
    }

    /// Returns one enrollment joined with its schedule and training.
    pub(crate) async fn get_enrollment(self, id: i32) -> DriverResult<EnrollmentDetails> {
        fetch_details(&mut self.db.ex().await?, id).await
    }

    /// Returns all enrollments joined with their schedule and training.
    pub(crate) async fn list_enrollments(self) -> DriverResult<Vec<EnrollmentDetails>> {
        let mut ex = self.db.ex().await?;
        let enrollments = db::list_enrollments(&mut ex).await?;
        let mut all = Vec::with_capacity(enrollments.len());
        for enrollment in enrollments {
            let schedule = db::get_schedule(&mut ex, enrollment.training_schedule_id).await?;
            let training = db::get_training(&mut ex, schedule.training_id).await?;
            all.push(EnrollmentDetails { enrollment, schedule, training });
        }
        Ok(all)
    }

    /// Changes the status of an enrollment.  Restricted to administrators.
    pub(crate) async fn set_enrollment_status(
        self,
        token: &AccessToken,
        id: i32,
        status: EnrollmentStatus,
    ) -> DriverResult<()> {
        self.authenticate_admin(token).await?;
        Ok(db::set_enrollment_status(&mut self.db.ex().await?, id, status).await?)
    }
}
