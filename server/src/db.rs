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

//! Database layer in terms of the operations needed by the service.
//!
//! Every function in this module takes an `Executor` and dispatches to the backend-specific
//! implementation of the query.  The functions perform exactly one query each; coordinating
//! multiple operations inside a transaction is the driver's job.

use crate::model::{
    Category, Enrollment, EnrollmentStatus, HashedPassword, Rating, ResetToken, Review, Role,
    Training, TrainingSchedule, User,
};
use time::OffsetDateTime;
use traindesk_core::db::{DbResult, Executor};
use traindesk_core::model::{EmailAddress, Username};
use uuid::Uuid;

pub(crate) mod postgres;
pub(crate) mod sqlite;
#[cfg(test)]
mod tests;

/// Status code of a task that is waiting to run or retrying.
pub(crate) const TASK_RUNNABLE: i16 = 1;

/// Status code of a task that completed successfully.
pub(crate) const TASK_DONE: i16 = 2;

/// Status code of a task that exhausted its runs and will not be retried.
pub(crate) const TASK_ABANDONED: i16 = 3;

/// A queued request to notify an enrollee, as extracted from the database.
#[derive(Debug, Eq, PartialEq)]
pub(crate) struct NotifierTask {
    /// Identifier of the task.
    pub(crate) id: Uuid,

    /// Identifier of the enrollment to send the confirmation documents for.
    pub(crate) enrollment_id: i32,

    /// Number of times the task started to run.
    pub(crate) runs: i16,
}

/// Initializes the database schema.
pub async fn init_schema(ex: &mut Executor) -> DbResult<()> {
    match ex {
        Executor::Postgres(ex) => {
            traindesk_core::db::postgres::run_schema(ex, include_str!("db/postgres.sql")).await
        }
        Executor::Sqlite(ex) => {
            traindesk_core::db::sqlite::run_schema(ex, include_str!("db/sqlite.sql")).await
        }
    }
}

/// Creates a new user and returns its identifier.
pub(crate) async fn create_user(
    ex: &mut Executor,
    username: &Username,
    email: &EmailAddress,
    password: &HashedPassword,
    role: Role,
) -> DbResult<i32> {
    match ex {
        Executor::Postgres(ex) => postgres::create_user(ex, username, email, password, role).await,
        Executor::Sqlite(ex) => sqlite::create_user(ex, username, email, password, role).await,
    }
}

/// Fetches the user with the given `id`.
pub(crate) async fn get_user_by_id(ex: &mut Executor, id: i32) -> DbResult<User> {
    match ex {
        Executor::Postgres(ex) => postgres::get_user_by_id(ex, id).await,
        Executor::Sqlite(ex) => sqlite::get_user_by_id(ex, id).await,
    }
}

/// Fetches the user with the given `email`.
pub(crate) async fn get_user_by_email(ex: &mut Executor, email: &EmailAddress) -> DbResult<User> {
    match ex {
        Executor::Postgres(ex) => postgres::get_user_by_email(ex, email).await,
        Executor::Sqlite(ex) => sqlite::get_user_by_email(ex, email).await,
    }
}

/// Fetches the user holding the given reset `token`.
pub(crate) async fn get_user_by_reset_token(
    ex: &mut Executor,
    token: &ResetToken,
) -> DbResult<User> {
    match ex {
        Executor::Postgres(ex) => postgres::get_user_by_reset_token(ex, token).await,
        Executor::Sqlite(ex) => sqlite::get_user_by_reset_token(ex, token).await,
    }
}

/// Updates the profile data of the user with the given `id`.
pub(crate) async fn update_user(
    ex: &mut Executor,
    id: i32,
    username: &Username,
    email: &EmailAddress,
) -> DbResult<()> {
    match ex {
        Executor::Postgres(ex) => postgres::update_user(ex, id, username, email).await,
        Executor::Sqlite(ex) => sqlite::update_user(ex, id, username, email).await,
    }
}

/// Replaces the password hash of the user with the given `id`.
pub(crate) async fn update_user_password(
    ex: &mut Executor,
    id: i32,
    password: &HashedPassword,
) -> DbResult<()> {
    match ex {
        Executor::Postgres(ex) => postgres::update_user_password(ex, id, password).await,
        Executor::Sqlite(ex) => sqlite::update_user_password(ex, id, password).await,
    }
}

/// Stores a reset `token` with its `expiry` for the user with the given `id`, replacing any
/// previous one.
pub(crate) async fn set_reset_token(
    ex: &mut Executor,
    id: i32,
    token: &ResetToken,
    expiry: OffsetDateTime,
) -> DbResult<()> {
    match ex {
        Executor::Postgres(ex) => postgres::set_reset_token(ex, id, token, expiry).await,
        Executor::Sqlite(ex) => sqlite::set_reset_token(ex, id, token, expiry).await,
    }
}

/// Clears any outstanding reset token of the user with the given `id`.
pub(crate) async fn clear_reset_token(ex: &mut Executor, id: i32) -> DbResult<()> {
    match ex {
        Executor::Postgres(ex) => postgres::clear_reset_token(ex, id).await,
        Executor::Sqlite(ex) => sqlite::clear_reset_token(ex, id).await,
    }
}

/// Lists all users ordered by identifier.
pub(crate) async fn list_users(ex: &mut Executor) -> DbResult<Vec<User>> {
    match ex {
        Executor::Postgres(ex) => postgres::list_users(ex).await,
        Executor::Sqlite(ex) => sqlite::list_users(ex).await,
    }
}

/// Creates a new category and returns its identifier.
pub(crate) async fn create_category(
    ex: &mut Executor,
    name: &str,
    description: &str,
) -> DbResult<i32> {
    match ex {
        Executor::Postgres(ex) => postgres::create_category(ex, name, description).await,
        Executor::Sqlite(ex) => sqlite::create_category(ex, name, description).await,
    }
}

/// Fetches the category with the given `id`.
pub(crate) async fn get_category(ex: &mut Executor, id: i32) -> DbResult<Category> {
    match ex {
        Executor::Postgres(ex) => postgres::get_category(ex, id).await,
        Executor::Sqlite(ex) => sqlite::get_category(ex, id).await,
    }
}

/// Lists all categories ordered by name.
pub(crate) async fn list_categories(ex: &mut Executor) -> DbResult<Vec<Category>> {
    match ex {
        Executor::Postgres(ex) => postgres::list_categories(ex).await,
        Executor::Sqlite(ex) => sqlite::list_categories(ex).await,
    }
}

/// Updates the category with the given `id`.
pub(crate) async fn update_category(
    ex: &mut Executor,
    id: i32,
    name: &str,
    description: &str,
) -> DbResult<()> {
    match ex {
        Executor::Postgres(ex) => postgres::update_category(ex, id, name, description).await,
        Executor::Sqlite(ex) => sqlite::update_category(ex, id, name, description).await,
    }
}

/// Deletes the category with the given `id`.
pub(crate) async fn delete_category(ex: &mut Executor, id: i32) -> DbResult<()> {
    match ex {
        Executor::Postgres(ex) => postgres::delete_category(ex, id).await,
        Executor::Sqlite(ex) => sqlite::delete_category(ex, id).await,
    }
}

/// Creates a new training and returns its identifier.
///
/// The `id` field of `training` is ignored because the database assigns one.
pub(crate) async fn create_training(ex: &mut Executor, training: &Training) -> DbResult<i32> {
    match ex {
        Executor::Postgres(ex) => postgres::create_training(ex, training).await,
        Executor::Sqlite(ex) => sqlite::create_training(ex, training).await,
    }
}

/// Fetches the training with the given `id`.
pub(crate) async fn get_training(ex: &mut Executor, id: i32) -> DbResult<Training> {
    match ex {
        Executor::Postgres(ex) => postgres::get_training(ex, id).await,
        Executor::Sqlite(ex) => sqlite::get_training(ex, id).await,
    }
}

/// Lists all trainings ordered by identifier.
pub(crate) async fn list_trainings(ex: &mut Executor) -> DbResult<Vec<Training>> {
    match ex {
        Executor::Postgres(ex) => postgres::list_trainings(ex).await,
        Executor::Sqlite(ex) => sqlite::list_trainings(ex).await,
    }
}

/// Lists the trainings in the category with the given `category_id`.
pub(crate) async fn list_trainings_by_category(
    ex: &mut Executor,
    category_id: i32,
) -> DbResult<Vec<Training>> {
    match ex {
        Executor::Postgres(ex) => postgres::list_trainings_by_category(ex, category_id).await,
        Executor::Sqlite(ex) => sqlite::list_trainings_by_category(ex, category_id).await,
    }
}

/// Updates the mutable fields of a training, keyed by the `id` field of `training`.
///
/// The fees and the discount are intentionally not part of the update.
pub(crate) async fn update_training(ex: &mut Executor, training: &Training) -> DbResult<()> {
    match ex {
        Executor::Postgres(ex) => postgres::update_training(ex, training).await,
        Executor::Sqlite(ex) => sqlite::update_training(ex, training).await,
    }
}

/// Deletes the training with the given `id`.
///
/// Dependent schedules and reviews must have been deleted beforehand within the same
/// transaction or the foreign key constraints will reject the operation.
pub(crate) async fn delete_training(ex: &mut Executor, id: i32) -> DbResult<()> {
    match ex {
        Executor::Postgres(ex) => postgres::delete_training(ex, id).await,
        Executor::Sqlite(ex) => sqlite::delete_training(ex, id).await,
    }
}

/// Creates a new training schedule and returns its identifier.
pub(crate) async fn create_schedule(
    ex: &mut Executor,
    training_id: i32,
    start_date: OffsetDateTime,
    end_date: OffsetDateTime,
    capacity: i32,
) -> DbResult<i32> {
    match ex {
        Executor::Postgres(ex) => {
            postgres::create_schedule(ex, training_id, start_date, end_date, capacity).await
        }
        Executor::Sqlite(ex) => {
            sqlite::create_schedule(ex, training_id, start_date, end_date, capacity).await
        }
    }
}

/// Fetches the schedule with the given `id`.
pub(crate) async fn get_schedule(ex: &mut Executor, id: i32) -> DbResult<TrainingSchedule> {
    match ex {
        Executor::Postgres(ex) => postgres::get_schedule(ex, id).await,
        Executor::Sqlite(ex) => sqlite::get_schedule(ex, id).await,
    }
}

/// Lists all schedules ordered by identifier.
pub(crate) async fn list_schedules(ex: &mut Executor) -> DbResult<Vec<TrainingSchedule>> {
    match ex {
        Executor::Postgres(ex) => postgres::list_schedules(ex).await,
        Executor::Sqlite(ex) => sqlite::list_schedules(ex).await,
    }
}

/// Lists the schedules of the training with the given `training_id`.
pub(crate) async fn list_schedules_by_training(
    ex: &mut Executor,
    training_id: i32,
) -> DbResult<Vec<TrainingSchedule>> {
    match ex {
        Executor::Postgres(ex) => postgres::list_schedules_by_training(ex, training_id).await,
        Executor::Sqlite(ex) => sqlite::list_schedules_by_training(ex, training_id).await,
    }
}

/// Updates the schedule keyed by the `id` field of `schedule`.
pub(crate) async fn update_schedule(
    ex: &mut Executor,
    schedule: &TrainingSchedule,
) -> DbResult<()> {
    match ex {
        Executor::Postgres(ex) => postgres::update_schedule(ex, schedule).await,
        Executor::Sqlite(ex) => sqlite::update_schedule(ex, schedule).await,
    }
}

/// Deletes the schedule with the given `id`.
pub(crate) async fn delete_schedule(ex: &mut Executor, id: i32) -> DbResult<()> {
    match ex {
        Executor::Postgres(ex) => postgres::delete_schedule(ex, id).await,
        Executor::Sqlite(ex) => sqlite::delete_schedule(ex, id).await,
    }
}

/// Deletes all schedules of the training with the given `training_id` and returns how many
/// were removed.
pub(crate) async fn delete_schedules_by_training(
    ex: &mut Executor,
    training_id: i32,
) -> DbResult<u64> {
    match ex {
        Executor::Postgres(ex) => postgres::delete_schedules_by_training(ex, training_id).await,
        Executor::Sqlite(ex) => sqlite::delete_schedules_by_training(ex, training_id).await,
    }
}

/// Creates a new enrollment in the `pending` status and returns its identifier.
pub(crate) async fn create_enrollment(
    ex: &mut Executor,
    fullname: &str,
    email: &EmailAddress,
    phone: &str,
    address: &str,
    training_schedule_id: i32,
    enrollment_date: OffsetDateTime,
) -> DbResult<i32> {
    match ex {
        Executor::Postgres(ex) => {
            postgres::create_enrollment(
                ex,
                fullname,
                email,
                phone,
                address,
                training_schedule_id,
                enrollment_date,
            )
            .await
        }
        Executor::Sqlite(ex) => {
            sqlite::create_enrollment(
                ex,
                fullname,
                email,
                phone,
                address,
                training_schedule_id,
                enrollment_date,
            )
            .await
        }
    }
}

/// Fetches the enrollment with the given `id`.
pub(crate) async fn get_enrollment(ex: &mut Executor, id: i32) -> DbResult<Enrollment> {
    match ex {
        Executor::Postgres(ex) => postgres::get_enrollment(ex, id).await,
        Executor::Sqlite(ex) => sqlite::get_enrollment(ex, id).await,
    }
}

/// Lists all enrollments ordered by identifier.
pub(crate) async fn list_enrollments(ex: &mut Executor) -> DbResult<Vec<Enrollment>> {
    match ex {
        Executor::Postgres(ex) => postgres::list_enrollments(ex).await,
        Executor::Sqlite(ex) => sqlite::list_enrollments(ex).await,
    }
}

/// Sets the status of the enrollment with the given `id`.
pub(crate) async fn set_enrollment_status(
    ex: &mut Executor,
    id: i32,
    status: EnrollmentStatus,
) -> DbResult<()> {
    match ex {
        Executor::Postgres(ex) => postgres::set_enrollment_status(ex, id, status).await,
        Executor::Sqlite(ex) => sqlite::set_enrollment_status(ex, id, status).await,
    }
}

/// Creates a new review and returns its identifier.
///
/// The `id` field of `review` is ignored because the database assigns one.
pub(crate) async fn create_review(ex: &mut Executor, review: &Review) -> DbResult<i32> {
    match ex {
        Executor::Postgres(ex) => postgres::create_review(ex, review).await,
        Executor::Sqlite(ex) => sqlite::create_review(ex, review).await,
    }
}

/// Fetches the review with the given `id`.
pub(crate) async fn get_review(ex: &mut Executor, id: i32) -> DbResult<Review> {
    match ex {
        Executor::Postgres(ex) => postgres::get_review(ex, id).await,
        Executor::Sqlite(ex) => sqlite::get_review(ex, id).await,
    }
}

/// Lists the reviews of a training, newest first.
pub(crate) async fn list_reviews_by_training(
    ex: &mut Executor,
    training_id: i32,
) -> DbResult<Vec<Review>> {
    match ex {
        Executor::Postgres(ex) => postgres::list_reviews_by_training(ex, training_id).await,
        Executor::Sqlite(ex) => sqlite::list_reviews_by_training(ex, training_id).await,
    }
}

/// Updates the stars and description of the review keyed by the `id` field of `review`.
pub(crate) async fn update_review(ex: &mut Executor, review: &Review) -> DbResult<()> {
    match ex {
        Executor::Postgres(ex) => postgres::update_review(ex, review).await,
        Executor::Sqlite(ex) => sqlite::update_review(ex, review).await,
    }
}

/// Deletes the review with the given `id`.
pub(crate) async fn delete_review(ex: &mut Executor, id: i32) -> DbResult<()> {
    match ex {
        Executor::Postgres(ex) => postgres::delete_review(ex, id).await,
        Executor::Sqlite(ex) => sqlite::delete_review(ex, id).await,
    }
}

/// Deletes all reviews of the training with the given `training_id` and returns how many
/// were removed.
pub(crate) async fn delete_reviews_by_training(
    ex: &mut Executor,
    training_id: i32,
) -> DbResult<u64> {
    match ex {
        Executor::Postgres(ex) => postgres::delete_reviews_by_training(ex, training_id).await,
        Executor::Sqlite(ex) => sqlite::delete_reviews_by_training(ex, training_id).await,
    }
}

/// Computes the aggregated rating of the training with the given `training_id`.
pub(crate) async fn get_rating(ex: &mut Executor, training_id: i32) -> DbResult<Rating> {
    match ex {
        Executor::Postgres(ex) => postgres::get_rating(ex, training_id).await,
        Executor::Sqlite(ex) => sqlite::get_rating(ex, training_id).await,
    }
}

/// Raw persisted state of a task, used by tests to observe the notifier's transitions.
#[cfg(test)]
#[derive(Debug, Eq, PartialEq)]
pub(crate) struct TaskStatusRow {
    /// One of the `TASK_*` status codes.
    pub(crate) status_code: i16,

    /// Reason attached to the last transition, if any.
    pub(crate) status_reason: Option<String>,

    /// Number of times the task started to run.
    pub(crate) runs: i16,

    /// Earliest time at which the task may run again, if throttled.
    pub(crate) only_after: Option<OffsetDateTime>,
}

/// Fetches the raw state of the task with the given `id`.
#[cfg(test)]
pub(crate) async fn get_task_status(ex: &mut Executor, id: Uuid) -> DbResult<TaskStatusRow> {
    match ex {
        Executor::Postgres(ex) => postgres::get_task_status(ex, id).await,
        Executor::Sqlite(ex) => sqlite::get_task_status(ex, id).await,
    }
}

/// Enqueues a notification task for the enrollment with the given `enrollment_id` and
/// returns the task identifier.
pub(crate) async fn put_task(
    ex: &mut Executor,
    enrollment_id: i32,
    now: OffsetDateTime,
) -> DbResult<Uuid> {
    match ex {
        Executor::Postgres(ex) => postgres::put_task(ex, enrollment_id, now).await,
        Executor::Sqlite(ex) => sqlite::put_task(ex, enrollment_id, now).await,
    }
}

/// Fetches up to `limit` tasks that are ready to run at time `now`, oldest first.
pub(crate) async fn get_runnable_tasks(
    ex: &mut Executor,
    now: OffsetDateTime,
    limit: u16,
) -> DbResult<Vec<NotifierTask>> {
    match ex {
        Executor::Postgres(ex) => postgres::get_runnable_tasks(ex, now, limit).await,
        Executor::Sqlite(ex) => sqlite::get_runnable_tasks(ex, now, limit).await,
    }
}

/// Accounts for a new run of the task with the given `id`.
pub(crate) async fn set_task_running(
    ex: &mut Executor,
    id: Uuid,
    now: OffsetDateTime,
) -> DbResult<()> {
    match ex {
        Executor::Postgres(ex) => postgres::set_task_running(ex, id, now).await,
        Executor::Sqlite(ex) => sqlite::set_task_running(ex, id, now).await,
    }
}

/// Marks the task with the given `id` as successfully completed.
pub(crate) async fn set_task_done(ex: &mut Executor, id: Uuid, now: OffsetDateTime) -> DbResult<()> {
    match ex {
        Executor::Postgres(ex) => postgres::set_task_done(ex, id, now).await,
        Executor::Sqlite(ex) => sqlite::set_task_done(ex, id, now).await,
    }
}

/// Reschedules the task with the given `id` to run again at `only_after`, recording the
/// `reason` for the retry.
pub(crate) async fn set_task_retry(
    ex: &mut Executor,
    id: Uuid,
    only_after: OffsetDateTime,
    reason: &str,
    now: OffsetDateTime,
) -> DbResult<()> {
    match ex {
        Executor::Postgres(ex) => postgres::set_task_retry(ex, id, only_after, reason, now).await,
        Executor::Sqlite(ex) => sqlite::set_task_retry(ex, id, only_after, reason, now).await,
    }
}

/// Marks the task with the given `id` as abandoned, recording the `reason`.
pub(crate) async fn set_task_abandoned(
    ex: &mut Executor,
    id: Uuid,
    reason: &str,
    now: OffsetDateTime,
) -> DbResult<()> {
    match ex {
        Executor::Postgres(ex) => postgres::set_task_abandoned(ex, id, reason, now).await,
        Executor::Sqlite(ex) => sqlite::set_task_abandoned(ex, id, reason, now).await,
    }
}
