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

//! Implementation of the database layer using PostgreSQL.

use crate::db::{NotifierTask, TASK_ABANDONED, TASK_DONE, TASK_RUNNABLE};
use crate::model::{
    Category, Enrollment, EnrollmentStatus, HashedPassword, Rating, ResetToken, Review, Role,
    Training, TrainingSchedule, User,
};
use futures::TryStreamExt;
use sqlx::postgres::{PgQueryResult, PgRow};
use sqlx::Row;
use time::OffsetDateTime;
use traindesk_core::db::postgres::{map_sqlx_error, PostgresExecutor};
use traindesk_core::db::{DbError, DbResult};
use traindesk_core::model::{EmailAddress, Username};
use uuid::Uuid;

/// Ensures that a modification query affected exactly one row.
fn ensure_one_modified(done: PgQueryResult) -> DbResult<()> {
    match done.rows_affected() {
        0 => Err(DbError::NotFound),
        1 => Ok(()),
        n => Err(DbError::BackendError(format!("Modification affected {} rows, not 1", n))),
    }
}

/// Rebuilds a `User` from a database row.
fn user_from_row(row: &PgRow) -> DbResult<User> {
    let id: i32 = row.try_get("id").map_err(map_sqlx_error)?;
    let username: String = row.try_get("username").map_err(map_sqlx_error)?;
    let email: String = row.try_get("email").map_err(map_sqlx_error)?;
    let password: String = row.try_get("password").map_err(map_sqlx_error)?;
    let role: String = row.try_get("role").map_err(map_sqlx_error)?;
    let reset_token: Option<String> = row.try_get("reset_token").map_err(map_sqlx_error)?;
    let reset_token_expiry: Option<OffsetDateTime> =
        row.try_get("reset_token_expiry").map_err(map_sqlx_error)?;

    let user = User::new(
        id,
        Username::new(username)?,
        EmailAddress::new(email)?,
        HashedPassword::new(password),
        Role::try_from(role.as_str())?,
    );
    match (reset_token, reset_token_expiry) {
        (Some(token), Some(expiry)) => Ok(user.with_reset_token(ResetToken::new(token)?, expiry)),
        (None, None) => Ok(user),
        _ => Err(DbError::DataIntegrityError(format!(
            "User {} has a reset token without an expiry or vice versa",
            id
        ))),
    }
}

/// Rebuilds a `Training` from a database row.
fn training_from_row(row: &PgRow) -> DbResult<Training> {
    let what_you_will_learn: String =
        row.try_get("what_you_will_learn").map_err(map_sqlx_error)?;
    let what_you_will_learn = serde_json::from_str(&what_you_will_learn)
        .map_err(|e| DbError::DataIntegrityError(format!("Invalid learning items: {}", e)))?;

    Ok(Training {
        id: row.try_get("id").map_err(map_sqlx_error)?,
        title: row.try_get("title").map_err(map_sqlx_error)?,
        description: row.try_get("description").map_err(map_sqlx_error)?,
        details: row.try_get("details").map_err(map_sqlx_error)?,
        duration: row.try_get("duration").map_err(map_sqlx_error)?,
        instructor: row.try_get("instructor").map_err(map_sqlx_error)?,
        fee: row.try_get("fee").map_err(map_sqlx_error)?,
        original_fee: row.try_get("original_fee").map_err(map_sqlx_error)?,
        discount_percentage: row.try_get("discount_percentage").map_err(map_sqlx_error)?,
        level: row.try_get("level").map_err(map_sqlx_error)?,
        certification: row.try_get("certification").map_err(map_sqlx_error)?,
        what_you_will_learn,
        address: row.try_get("address").map_err(map_sqlx_error)?,
        category_id: row.try_get("category_id").map_err(map_sqlx_error)?,
        start_date: row.try_get("start_date").map_err(map_sqlx_error)?,
        end_date: row.try_get("end_date").map_err(map_sqlx_error)?,
    })
}

/// Rebuilds a `TrainingSchedule` from a database row.
fn schedule_from_row(row: &PgRow) -> DbResult<TrainingSchedule> {
    Ok(TrainingSchedule {
        id: row.try_get("id").map_err(map_sqlx_error)?,
        training_id: row.try_get("training_id").map_err(map_sqlx_error)?,
        start_date: row.try_get("start_date").map_err(map_sqlx_error)?,
        end_date: row.try_get("end_date").map_err(map_sqlx_error)?,
        capacity: row.try_get("capacity").map_err(map_sqlx_error)?,
    })
}

/// Rebuilds an `Enrollment` from a database row.
fn enrollment_from_row(row: &PgRow) -> DbResult<Enrollment> {
    let email: String = row.try_get("email").map_err(map_sqlx_error)?;
    let status: String = row.try_get("status").map_err(map_sqlx_error)?;
    Ok(Enrollment {
        id: row.try_get("id").map_err(map_sqlx_error)?,
        fullname: row.try_get("fullname").map_err(map_sqlx_error)?,
        email: EmailAddress::new(email)?,
        phone: row.try_get("phone").map_err(map_sqlx_error)?,
        address: row.try_get("address").map_err(map_sqlx_error)?,
        training_schedule_id: row.try_get("training_schedule_id").map_err(map_sqlx_error)?,
        enrollment_date: row.try_get("enrollment_date").map_err(map_sqlx_error)?,
        status: EnrollmentStatus::try_from(status.as_str())?,
    })
}

/// Rebuilds a `Review` from a database row.
fn review_from_row(row: &PgRow) -> DbResult<Review> {
    let user_email: String = row.try_get("user_email").map_err(map_sqlx_error)?;
    Ok(Review {
        id: row.try_get("id").map_err(map_sqlx_error)?,
        training_id: row.try_get("training_id").map_err(map_sqlx_error)?,
        user_email: EmailAddress::new(user_email)?,
        user_phone: row.try_get("user_phone").map_err(map_sqlx_error)?,
        stars: row.try_get("stars").map_err(map_sqlx_error)?,
        description: row.try_get("description").map_err(map_sqlx_error)?,
        created_at: row.try_get("created_at").map_err(map_sqlx_error)?,
    })
}

pub(super) async fn create_user(
    ex: &mut PostgresExecutor,
    username: &Username,
    email: &EmailAddress,
    password: &HashedPassword,
    role: Role,
) -> DbResult<i32> {
    let query_str = "
        INSERT INTO users (username, email, password, role)
        VALUES ($1, $2, $3, $4)
        RETURNING id
    ";
    let row = sqlx::query(query_str)
        .bind(username.as_str())
        .bind(email.as_str())
        .bind(password.as_str())
        .bind(role.as_str())
        .fetch_one(ex.conn())
        .await
        .map_err(map_sqlx_error)?;
    row.try_get("id").map_err(map_sqlx_error)
}

pub(super) async fn get_user_by_id(ex: &mut PostgresExecutor, id: i32) -> DbResult<User> {
    let query_str = "
        SELECT id, username, email, password, role, reset_token, reset_token_expiry
        FROM users WHERE id = $1
    ";
    let row =
        sqlx::query(query_str).bind(id).fetch_one(ex.conn()).await.map_err(map_sqlx_error)?;
    user_from_row(&row)
}

pub(super) async fn get_user_by_email(
    ex: &mut PostgresExecutor,
    email: &EmailAddress,
) -> DbResult<User> {
    let query_str = "
        SELECT id, username, email, password, role, reset_token, reset_token_expiry
        FROM users WHERE email = $1
    ";
    let row = sqlx::query(query_str)
        .bind(email.as_str())
        .fetch_one(ex.conn())
        .await
        .map_err(map_sqlx_error)?;
    user_from_row(&row)
}

pub(super) async fn get_user_by_reset_token(
    ex: &mut PostgresExecutor,
    token: &ResetToken,
) -> DbResult<User> {
    let query_str = "
        SELECT id, username, email, password, role, reset_token, reset_token_expiry
        FROM users WHERE reset_token = $1
    ";
    let row = sqlx::query(query_str)
        .bind(token.as_str())
        .fetch_one(ex.conn())
        .await
        .map_err(map_sqlx_error)?;
    user_from_row(&row)
}

pub(super) async fn update_user(
    ex: &mut PostgresExecutor,
    id: i32,
    username: &Username,
    email: &EmailAddress,
) -> DbResult<()> {
    let query_str = "UPDATE users SET username = $2, email = $3 WHERE id = $1";
    let done = sqlx::query(query_str)
        .bind(id)
        .bind(username.as_str())
        .bind(email.as_str())
        .execute(ex.conn())
        .await
        .map_err(map_sqlx_error)?;
    ensure_one_modified(done)
}

pub(super) async fn update_user_password(
    ex: &mut PostgresExecutor,
    id: i32,
    password: &HashedPassword,
) -> DbResult<()> {
    let query_str = "UPDATE users SET password = $2 WHERE id = $1";
    let done = sqlx::query(query_str)
        .bind(id)
        .bind(password.as_str())
        .execute(ex.conn())
        .await
        .map_err(map_sqlx_error)?;
    ensure_one_modified(done)
}

pub(super) async fn set_reset_token(
    ex: &mut PostgresExecutor,
    id: i32,
    token: &ResetToken,
    expiry: OffsetDateTime,
) -> DbResult<()> {
    let query_str = "UPDATE users SET reset_token = $2, reset_token_expiry = $3 WHERE id = $1";
    let done = sqlx::query(query_str)
        .bind(id)
        .bind(token.as_str())
        .bind(expiry)
        .execute(ex.conn())
        .await
        .map_err(map_sqlx_error)?;
    ensure_one_modified(done)
}

pub(super) async fn clear_reset_token(ex: &mut PostgresExecutor, id: i32) -> DbResult<()> {
    let query_str = "UPDATE users SET reset_token = NULL, reset_token_expiry = NULL WHERE id = $1";
    let done =
        sqlx::query(query_str).bind(id).execute(ex.conn()).await.map_err(map_sqlx_error)?;
    ensure_one_modified(done)
}

pub(super) async fn list_users(ex: &mut PostgresExecutor) -> DbResult<Vec<User>> {
    let query_str = "
        SELECT id, username, email, password, role, reset_token, reset_token_expiry
        FROM users ORDER BY id
    ";
    let mut rows = sqlx::query(query_str).fetch(ex.conn());
    let mut users = vec![];
    while let Some(row) = rows.try_next().await.map_err(map_sqlx_error)? {
        users.push(user_from_row(&row)?);
    }
    Ok(users)
}

pub(super) async fn create_category(
    ex: &mut PostgresExecutor,
    name: &str,
    description: &str,
) -> DbResult<i32> {
    let query_str = "INSERT INTO categories (name, description) VALUES ($1, $2) RETURNING id";
    let row = sqlx::query(query_str)
        .bind(name)
        .bind(description)
        .fetch_one(ex.conn())
        .await
        .map_err(map_sqlx_error)?;
    row.try_get("id").map_err(map_sqlx_error)
}

pub(super) async fn get_category(ex: &mut PostgresExecutor, id: i32) -> DbResult<Category> {
    let query_str = "SELECT id, name, description FROM categories WHERE id = $1";
    let row =
        sqlx::query(query_str).bind(id).fetch_one(ex.conn()).await.map_err(map_sqlx_error)?;
    Ok(Category {
        id: row.try_get("id").map_err(map_sqlx_error)?,
        name: row.try_get("name").map_err(map_sqlx_error)?,
        description: row.try_get("description").map_err(map_sqlx_error)?,
    })
}

pub(super) async fn list_categories(ex: &mut PostgresExecutor) -> DbResult<Vec<Category>> {
    let query_str = "SELECT id, name, description FROM categories ORDER BY name";
    let mut rows = sqlx::query(query_str).fetch(ex.conn());
    let mut categories = vec![];
    while let Some(row) = rows.try_next().await.map_err(map_sqlx_error)? {
        categories.push(Category {
            id: row.try_get("id").map_err(map_sqlx_error)?,
            name: row.try_get("name").map_err(map_sqlx_error)?,
            description: row.try_get("description").map_err(map_sqlx_error)?,
        });
    }
    Ok(categories)
}

pub(super) async fn update_category(
    ex: &mut PostgresExecutor,
    id: i32,
    name: &str,
    description: &str,
) -> DbResult<()> {
    let query_str = "UPDATE categories SET name = $2, description = $3 WHERE id = $1";
    let done = sqlx::query(query_str)
        .bind(id)
        .bind(name)
        .bind(description)
        .execute(ex.conn())
        .await
        .map_err(map_sqlx_error)?;
    ensure_one_modified(done)
}

pub(super) async fn delete_category(ex: &mut PostgresExecutor, id: i32) -> DbResult<()> {
    let query_str = "DELETE FROM categories WHERE id = $1";
    let done =
        sqlx::query(query_str).bind(id).execute(ex.conn()).await.map_err(map_sqlx_error)?;
    ensure_one_modified(done)
}

pub(super) async fn create_training(
    ex: &mut PostgresExecutor,
    training: &Training,
) -> DbResult<i32> {
    let what_you_will_learn = serde_json::to_string(&training.what_you_will_learn)
        .map_err(|e| DbError::BackendError(format!("Cannot serialize learning items: {}", e)))?;

    let query_str = "
        INSERT INTO trainings
            (title, description, details, duration, instructor, fee, original_fee,
            discount_percentage, level, certification, what_you_will_learn, address,
            category_id, start_date, end_date)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
        RETURNING id
    ";
    let row = sqlx::query(query_str)
        .bind(&training.title)
        .bind(&training.description)
        .bind(&training.details)
        .bind(&training.duration)
        .bind(&training.instructor)
        .bind(training.fee)
        .bind(training.original_fee)
        .bind(training.discount_percentage)
        .bind(&training.level)
        .bind(training.certification)
        .bind(&what_you_will_learn)
        .bind(&training.address)
        .bind(training.category_id)
        .bind(training.start_date)
        .bind(training.end_date)
        .fetch_one(ex.conn())
        .await
        .map_err(map_sqlx_error)?;
    row.try_get("id").map_err(map_sqlx_error)
}

/// Column list shared by all training queries.
const TRAINING_COLS: &str = "id, title, description, details, duration, instructor, fee,
    original_fee, discount_percentage, level, certification, what_you_will_learn, address,
    category_id, start_date, end_date";

pub(super) async fn get_training(ex: &mut PostgresExecutor, id: i32) -> DbResult<Training> {
    let query_str = format!("SELECT {} FROM trainings WHERE id = $1", TRAINING_COLS);
    let row =
        sqlx::query(&query_str).bind(id).fetch_one(ex.conn()).await.map_err(map_sqlx_error)?;
    training_from_row(&row)
}

pub(super) async fn list_trainings(ex: &mut PostgresExecutor) -> DbResult<Vec<Training>> {
    let query_str = format!("SELECT {} FROM trainings ORDER BY id", TRAINING_COLS);
    let mut rows = sqlx::query(&query_str).fetch(ex.conn());
    let mut trainings = vec![];
    while let Some(row) = rows.try_next().await.map_err(map_sqlx_error)? {
        trainings.push(training_from_row(&row)?);
    }
    Ok(trainings)
}

pub(super) async fn list_trainings_by_category(
    ex: &mut PostgresExecutor,
    category_id: i32,
) -> DbResult<Vec<Training>> {
    let query_str =
        format!("SELECT {} FROM trainings WHERE category_id = $1 ORDER BY id", TRAINING_COLS);
    let mut rows = sqlx::query(&query_str).bind(category_id).fetch(ex.conn());
    let mut trainings = vec![];
    while let Some(row) = rows.try_next().await.map_err(map_sqlx_error)? {
        trainings.push(training_from_row(&row)?);
    }
    Ok(trainings)
}

pub(super) async fn update_training(
    ex: &mut PostgresExecutor,
    training: &Training,
) -> DbResult<()> {
    let what_you_will_learn = serde_json::to_string(&training.what_you_will_learn)
        .map_err(|e| DbError::BackendError(format!("Cannot serialize learning items: {}", e)))?;

    let query_str = "
        UPDATE trainings SET
            title = $2, description = $3, details = $4, duration = $5, instructor = $6,
            level = $7, certification = $8, what_you_will_learn = $9, address = $10,
            category_id = $11, start_date = $12, end_date = $13
        WHERE id = $1
    ";
    let done = sqlx::query(query_str)
        .bind(training.id)
        .bind(&training.title)
        .bind(&training.description)
        .bind(&training.details)
        .bind(&training.duration)
        .bind(&training.instructor)
        .bind(&training.level)
        .bind(training.certification)
        .bind(&what_you_will_learn)
        .bind(&training.address)
        .bind(training.category_id)
        .bind(training.start_date)
        .bind(training.end_date)
        .execute(ex.conn())
        .await
        .map_err(map_sqlx_error)?;
    ensure_one_modified(done)
}

pub(super) async fn delete_training(ex: &mut PostgresExecutor, id: i32) -> DbResult<()> {
    let query_str = "DELETE FROM trainings WHERE id = $1";
    let done =
        sqlx::query(query_str).bind(id).execute(ex.conn()).await.map_err(map_sqlx_error)?;
    ensure_one_modified(done)
}

pub(super) async fn create_schedule(
    ex: &mut PostgresExecutor,
    training_id: i32,
    start_date: OffsetDateTime,
    end_date: OffsetDateTime,
    capacity: i32,
) -> DbResult<i32> {
    let query_str = "
        INSERT INTO training_schedules (training_id, start_date, end_date, capacity)
        VALUES ($1, $2, $3, $4)
        RETURNING id
    ";
    let row = sqlx::query(query_str)
        .bind(training_id)
        .bind(start_date)
        .bind(end_date)
        .bind(capacity)
        .fetch_one(ex.conn())
        .await
        .map_err(map_sqlx_error)?;
    row.try_get("id").map_err(map_sqlx_error)
}

pub(super) async fn get_schedule(
    ex: &mut PostgresExecutor,
    id: i32,
) -> DbResult<TrainingSchedule> {
    let query_str = "
        SELECT id, training_id, start_date, end_date, capacity
        FROM training_schedules WHERE id = $1
    ";
    let row =
        sqlx::query(query_str).bind(id).fetch_one(ex.conn()).await.map_err(map_sqlx_error)?;
    schedule_from_row(&row)
}

pub(super) async fn list_schedules(ex: &mut PostgresExecutor) -> DbResult<Vec<TrainingSchedule>> {
    let query_str = "
        SELECT id, training_id, start_date, end_date, capacity
        FROM training_schedules ORDER BY id
    ";
    let mut rows = sqlx::query(query_str).fetch(ex.conn());
    let mut schedules = vec![];
    while let Some(row) = rows.try_next().await.map_err(map_sqlx_error)? {
        schedules.push(schedule_from_row(&row)?);
    }
    Ok(schedules)
}

pub(super) async fn list_schedules_by_training(
    ex: &mut PostgresExecutor,
    training_id: i32,
) -> DbResult<Vec<TrainingSchedule>> {
    let query_str = "
        SELECT id, training_id, start_date, end_date, capacity
        FROM training_schedules WHERE training_id = $1 ORDER BY id
    ";
    let mut rows = sqlx::query(query_str).bind(training_id).fetch(ex.conn());
    let mut schedules = vec![];
    while let Some(row) = rows.try_next().await.map_err(map_sqlx_error)? {
        schedules.push(schedule_from_row(&row)?);
    }
    Ok(schedules)
}

pub(super) async fn update_schedule(
    ex: &mut PostgresExecutor,
    schedule: &TrainingSchedule,
) -> DbResult<()> {
    let query_str = "
        UPDATE training_schedules
        SET training_id = $2, start_date = $3, end_date = $4, capacity = $5
        WHERE id = $1
    ";
    let done = sqlx::query(query_str)
        .bind(schedule.id)
        .bind(schedule.training_id)
        .bind(schedule.start_date)
        .bind(schedule.end_date)
        .bind(schedule.capacity)
        .execute(ex.conn())
        .await
        .map_err(map_sqlx_error)?;
    ensure_one_modified(done)
}

pub(super) async fn delete_schedule(ex: &mut PostgresExecutor, id: i32) -> DbResult<()> {
    let query_str = "DELETE FROM training_schedules WHERE id = $1";
    let done =
        sqlx::query(query_str).bind(id).execute(ex.conn()).await.map_err(map_sqlx_error)?;
    ensure_one_modified(done)
}

pub(super) async fn delete_schedules_by_training(
    ex: &mut PostgresExecutor,
    training_id: i32,
) -> DbResult<u64> {
    let query_str = "DELETE FROM training_schedules WHERE training_id = $1";
    let done = sqlx::query(query_str)
        .bind(training_id)
        .execute(ex.conn())
        .await
        .map_err(map_sqlx_error)?;
    Ok(done.rows_affected())
}

pub(super) async fn create_enrollment(
    ex: &mut PostgresExecutor,
    fullname: &str,
    email: &EmailAddress,
    phone: &str,
    address: &str,
    training_schedule_id: i32,
    enrollment_date: OffsetDateTime,
) -> DbResult<i32> {
    let query_str = "
        INSERT INTO enrollments
            (fullname, email, phone, address, training_schedule_id, enrollment_date, status)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING id
    ";
    let row = sqlx::query(query_str)
        .bind(fullname)
        .bind(email.as_str())
        .bind(phone)
        .bind(address)
        .bind(training_schedule_id)
        .bind(enrollment_date)
        .bind(EnrollmentStatus::Pending.as_str())
        .fetch_one(ex.conn())
        .await
        .map_err(map_sqlx_error)?;
    row.try_get("id").map_err(map_sqlx_error)
}

pub(super) async fn get_enrollment(ex: &mut PostgresExecutor, id: i32) -> DbResult<Enrollment> {
    let query_str = "
        SELECT id, fullname, email, phone, address, training_schedule_id, enrollment_date, status
        FROM enrollments WHERE id = $1
    ";
    let row =
        sqlx::query(query_str).bind(id).fetch_one(ex.conn()).await.map_err(map_sqlx_error)?;
    enrollment_from_row(&row)
}

pub(super) async fn list_enrollments(ex: &mut PostgresExecutor) -> DbResult<Vec<Enrollment>> {
    let query_str = "
        SELECT id, fullname, email, phone, address, training_schedule_id, enrollment_date, status
        FROM enrollments ORDER BY id
    ";
    let mut rows = sqlx::query(query_str).fetch(ex.conn());
    let mut enrollments = vec![];
    while let Some(row) = rows.try_next().await.map_err(map_sqlx_error)? {
        enrollments.push(enrollment_from_row(&row)?);
    }
    Ok(enrollments)
}

pub(super) async fn set_enrollment_status(
    ex: &mut PostgresExecutor,
    id: i32,
    status: EnrollmentStatus,
) -> DbResult<()> {
    let query_str = "UPDATE enrollments SET status = $2 WHERE id = $1";
    let done = sqlx::query(query_str)
        .bind(id)
        .bind(status.as_str())
        .execute(ex.conn())
        .await
        .map_err(map_sqlx_error)?;
    ensure_one_modified(done)
}

pub(super) async fn create_review(ex: &mut PostgresExecutor, review: &Review) -> DbResult<i32> {
    let query_str = "
        INSERT INTO reviews (training_id, user_email, user_phone, stars, description, created_at)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING id
    ";
    let row = sqlx::query(query_str)
        .bind(review.training_id)
        .bind(review.user_email.as_str())
        .bind(&review.user_phone)
        .bind(review.stars)
        .bind(&review.description)
        .bind(review.created_at)
        .fetch_one(ex.conn())
        .await
        .map_err(map_sqlx_error)?;
    row.try_get("id").map_err(map_sqlx_error)
}

pub(super) async fn get_review(ex: &mut PostgresExecutor, id: i32) -> DbResult<Review> {
    let query_str = "
        SELECT id, training_id, user_email, user_phone, stars, description, created_at
        FROM reviews WHERE id = $1
    ";
    let row =
        sqlx::query(query_str).bind(id).fetch_one(ex.conn()).await.map_err(map_sqlx_error)?;
    review_from_row(&row)
}

pub(super) async fn list_reviews_by_training(
    ex: &mut PostgresExecutor,
    training_id: i32,
) -> DbResult<Vec<Review>> {
    let query_str = "
        SELECT id, training_id, user_email, user_phone, stars, description, created_at
        FROM reviews WHERE training_id = $1 ORDER BY created_at DESC, id DESC
    ";
    let mut rows = sqlx::query(query_str).bind(training_id).fetch(ex.conn());
    let mut reviews = vec![];
    while let Some(row) = rows.try_next().await.map_err(map_sqlx_error)? {
        reviews.push(review_from_row(&row)?);
    }
    Ok(reviews)
}

pub(super) async fn update_review(ex: &mut PostgresExecutor, review: &Review) -> DbResult<()> {
    let query_str = "UPDATE reviews SET stars = $2, description = $3 WHERE id = $1";
    let done = sqlx::query(query_str)
        .bind(review.id)
        .bind(review.stars)
        .bind(&review.description)
        .execute(ex.conn())
        .await
        .map_err(map_sqlx_error)?;
    ensure_one_modified(done)
}

pub(super) async fn delete_review(ex: &mut PostgresExecutor, id: i32) -> DbResult<()> {
    let query_str = "DELETE FROM reviews WHERE id = $1";
    let done =
        sqlx::query(query_str).bind(id).execute(ex.conn()).await.map_err(map_sqlx_error)?;
    ensure_one_modified(done)
}

pub(super) async fn delete_reviews_by_training(
    ex: &mut PostgresExecutor,
    training_id: i32,
) -> DbResult<u64> {
    let query_str = "DELETE FROM reviews WHERE training_id = $1";
    let done = sqlx::query(query_str)
        .bind(training_id)
        .execute(ex.conn())
        .await
        .map_err(map_sqlx_error)?;
    Ok(done.rows_affected())
}

pub(super) async fn get_rating(ex: &mut PostgresExecutor, training_id: i32) -> DbResult<Rating> {
    let query_str = "
        SELECT AVG(stars)::DOUBLE PRECISION AS average, COUNT(*) AS count
        FROM reviews WHERE training_id = $1
    ";
    let row = sqlx::query(query_str)
        .bind(training_id)
        .fetch_one(ex.conn())
        .await
        .map_err(map_sqlx_error)?;
    let average: Option<f64> = row.try_get("average").map_err(map_sqlx_error)?;
    let count: i64 = row.try_get("count").map_err(map_sqlx_error)?;
    Ok(Rating { average: average.unwrap_or(0.0), count })
}

pub(super) async fn put_task(
    ex: &mut PostgresExecutor,
    enrollment_id: i32,
    now: OffsetDateTime,
) -> DbResult<Uuid> {
    let id = Uuid::new_v4();
    let query_str = "
        INSERT INTO notifier_tasks
            (id, enrollment_id, status_code, status_reason, runs, created, updated, only_after)
        VALUES ($1, $2, $3, NULL, 0, $4, $4, NULL)
    ";
    let done = sqlx::query(query_str)
        .bind(id)
        .bind(enrollment_id)
        .bind(TASK_RUNNABLE)
        .bind(now)
        .execute(ex.conn())
        .await
        .map_err(map_sqlx_error)?;
    ensure_one_modified(done)?;
    Ok(id)
}

pub(super) async fn get_runnable_tasks(
    ex: &mut PostgresExecutor,
    now: OffsetDateTime,
    limit: u16,
) -> DbResult<Vec<NotifierTask>> {
    let query_str = "
        SELECT id, enrollment_id, runs
        FROM notifier_tasks
        WHERE status_code = $1 AND (only_after IS NULL OR only_after <= $2)
        ORDER BY created
        LIMIT $3
    ";
    let mut rows = sqlx::query(query_str)
        .bind(TASK_RUNNABLE)
        .bind(now)
        .bind(i64::from(limit))
        .fetch(ex.conn());
    let mut tasks = vec![];
    while let Some(row) = rows.try_next().await.map_err(map_sqlx_error)? {
        tasks.push(NotifierTask {
            id: row.try_get("id").map_err(map_sqlx_error)?,
            enrollment_id: row.try_get("enrollment_id").map_err(map_sqlx_error)?,
            runs: row.try_get("runs").map_err(map_sqlx_error)?,
        });
    }
    Ok(tasks)
}

pub(super) async fn set_task_running(
    ex: &mut PostgresExecutor,
    id: Uuid,
    now: OffsetDateTime,
) -> DbResult<()> {
    let query_str = "
        UPDATE notifier_tasks SET runs = runs + 1, updated = $2, only_after = NULL
        WHERE id = $1 AND status_code = $3
    ";
    let done = sqlx::query(query_str)
        .bind(id)
        .bind(now)
        .bind(TASK_RUNNABLE)
        .execute(ex.conn())
        .await
        .map_err(map_sqlx_error)?;
    ensure_one_modified(done)
}

pub(super) async fn set_task_done(
    ex: &mut PostgresExecutor,
    id: Uuid,
    now: OffsetDateTime,
) -> DbResult<()> {
    let query_str = "
        UPDATE notifier_tasks SET status_code = $2, status_reason = NULL, updated = $3
        WHERE id = $1
    ";
    let done = sqlx::query(query_str)
        .bind(id)
        .bind(TASK_DONE)
        .bind(now)
        .execute(ex.conn())
        .await
        .map_err(map_sqlx_error)?;
    ensure_one_modified(done)
}

pub(super) async fn set_task_retry(
    ex: &mut PostgresExecutor,
    id: Uuid,
    only_after: OffsetDateTime,
    reason: &str,
    now: OffsetDateTime,
) -> DbResult<()> {
    let query_str = "
        UPDATE notifier_tasks SET status_reason = $2, only_after = $3, updated = $4
        WHERE id = $1 AND status_code = $5
    ";
    let done = sqlx::query(query_str)
        .bind(id)
        .bind(reason)
        .bind(only_after)
        .bind(now)
        .bind(TASK_RUNNABLE)
        .execute(ex.conn())
        .await
        .map_err(map_sqlx_error)?;
    ensure_one_modified(done)
}

pub(super) async fn set_task_abandoned(
    ex: &mut PostgresExecutor,
    id: Uuid,
    reason: &str,
    now: OffsetDateTime,
) -> DbResult<()> {
    let query_str = "
        UPDATE notifier_tasks SET status_code = $2, status_reason = $3, updated = $4
        WHERE id = $1
    ";
    let done = sqlx::query(query_str)
        .bind(id)
        .bind(TASK_ABANDONED)
        .bind(reason)
        .bind(now)
        .execute(ex.conn())
        .await
        .map_err(map_sqlx_error)?;
    ensure_one_modified(done)
}

#[cfg(test)]
pub(super) async fn get_task_status(
    ex: &mut PostgresExecutor,
    id: Uuid,
) -> DbResult<crate::db::TaskStatusRow> {
    let query_str = "
        SELECT status_code, status_reason, runs, only_after FROM notifier_tasks WHERE id = $1
    ";
    let row =
        sqlx::query(query_str).bind(id).fetch_one(ex.conn()).await.map_err(map_sqlx_error)?;
    Ok(crate::db::TaskStatusRow {
        status_code: row.try_get("status_code").map_err(map_sqlx_error)?,
        status_reason: row.try_get("status_reason").map_err(map_sqlx_error)?,
        runs: row.try_get("runs").map_err(map_sqlx_error)?,
        only_after: row.try_get("only_after").map_err(map_sqlx_error)?,
    })
}

#[cfg(test)]
mod tests {
    use crate::db::tests as db_tests;
    use std::sync::Arc;
    use traindesk_core::db::postgres::testutils::setup;

    #[tokio::test]
    #[ignore = "Requires environment configuration and is expensive"]
    async fn test_users() {
        db_tests::test_users(Arc::from(setup().await)).await;
    }

    #[tokio::test]
    #[ignore = "Requires environment configuration and is expensive"]
    async fn test_categories() {
        db_tests::test_categories(Arc::from(setup().await)).await;
    }

    #[tokio::test]
    #[ignore = "Requires environment configuration and is expensive"]
    async fn test_trainings() {
        db_tests::test_trainings(Arc::from(setup().await)).await;
    }

    #[tokio::test]
    #[ignore = "Requires environment configuration and is expensive"]
    async fn test_schedules() {
        db_tests::test_schedules(Arc::from(setup().await)).await;
    }

    #[tokio::test]
    #[ignore = "Requires environment configuration and is expensive"]
    async fn test_enrollments() {
        db_tests::test_enrollments(Arc::from(setup().await)).await;
    }

    #[tokio::test]
    #[ignore = "Requires environment configuration and is expensive"]
    async fn test_reviews() {
        db_tests::test_reviews(Arc::from(setup().await)).await;
    }

    #[tokio::test]
    #[ignore = "Requires environment configuration and is expensive"]
    async fn test_tasks() {
        db_tests::test_tasks(Arc::from(setup().await)).await;
    }
}
