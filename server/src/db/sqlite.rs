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

//! Implementation of the database layer using SQLite.

use crate::db::{NotifierTask, TASK_ABANDONED, TASK_DONE, TASK_RUNNABLE};
use crate::model::{
    Category, Enrollment, EnrollmentStatus, HashedPassword, Rating, ResetToken, Review, Role,
    Training, TrainingSchedule, User,
};
use futures::TryStreamExt;
use rust_decimal::Decimal;
use sqlx::sqlite::{SqliteQueryResult, SqliteRow};
use sqlx::Row;
use time::OffsetDateTime;
use traindesk_core::db::sqlite::{build_timestamp, map_sqlx_error, unpack_timestamp, SqliteExecutor};
use traindesk_core::db::{DbError, DbResult};
use traindesk_core::model::{EmailAddress, Username};
use uuid::Uuid;

/// Ensures that a modification query affected exactly one row.
fn ensure_one_modified(done: SqliteQueryResult) -> DbResult<()> {
    match done.rows_affected() {
        0 => Err(DbError::NotFound),
        1 => Ok(()),
        n => Err(DbError::BackendError(format!("Modification affected {} rows, not 1", n))),
    }
}

/// Extracts the identifier assigned to the last inserted row.
fn last_insert_id(done: SqliteQueryResult) -> DbResult<i32> {
    i32::try_from(done.last_insert_rowid())
        .map_err(|e| DbError::BackendError(format!("Invalid inserted row id: {}", e)))
}

/// Parses a decimal quantity stored as text in the `field` column.
fn decimal_from_text(field: &str, text: &str) -> DbResult<Decimal> {
    Decimal::from_str_exact(text)
        .map_err(|e| DbError::DataIntegrityError(format!("Invalid decimal in {}: {}", field, e)))
}

/// Extracts a timestamp stored as a pair of `<name>_sec`/`<name>_nsec` columns.
fn timestamp_from_row(row: &SqliteRow, name: &str) -> DbResult<OffsetDateTime> {
    let sec: i64 = row.try_get(format!("{}_sec", name).as_str()).map_err(map_sqlx_error)?;
    let nsec: i64 = row.try_get(format!("{}_nsec", name).as_str()).map_err(map_sqlx_error)?;
    build_timestamp(sec, nsec)
}

/// Rebuilds a `User` from a database row.
fn user_from_row(row: &SqliteRow) -> DbResult<User> {
    let id: i32 = row.try_get("id").map_err(map_sqlx_error)?;
    let username: String = row.try_get("username").map_err(map_sqlx_error)?;
    let email: String = row.try_get("email").map_err(map_sqlx_error)?;
    let password: String = row.try_get("password").map_err(map_sqlx_error)?;
    let role: String = row.try_get("role").map_err(map_sqlx_error)?;
    let reset_token: Option<String> = row.try_get("reset_token").map_err(map_sqlx_error)?;
    let expiry_sec: Option<i64> =
        row.try_get("reset_token_expiry_sec").map_err(map_sqlx_error)?;
    let expiry_nsec: Option<i64> =
        row.try_get("reset_token_expiry_nsec").map_err(map_sqlx_error)?;

    let user = User::new(
        id,
        Username::new(username)?,
        EmailAddress::new(email)?,
        HashedPassword::new(password),
        Role::try_from(role.as_str())?,
    );
    match (reset_token, expiry_sec, expiry_nsec) {
        (Some(token), Some(sec), Some(nsec)) => {
            Ok(user.with_reset_token(ResetToken::new(token)?, build_timestamp(sec, nsec)?))
        }
        (None, None, None) => Ok(user),
        _ => Err(DbError::DataIntegrityError(format!(
            "User {} has a reset token without an expiry or vice versa",
            id
        ))),
    }
}

/// Rebuilds a `Training` from a database row.
fn training_from_row(row: &SqliteRow) -> DbResult<Training> {
    let fee: String = row.try_get("fee").map_err(map_sqlx_error)?;
    let original_fee: String = row.try_get("original_fee").map_err(map_sqlx_error)?;
    let discount_percentage: String =
        row.try_get("discount_percentage").map_err(map_sqlx_error)?;
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
        fee: decimal_from_text("fee", &fee)?,
        original_fee: decimal_from_text("original_fee", &original_fee)?,
        discount_percentage: decimal_from_text("discount_percentage", &discount_percentage)?,
        level: row.try_get("level").map_err(map_sqlx_error)?,
        certification: row.try_get("certification").map_err(map_sqlx_error)?,
        what_you_will_learn,
        address: row.try_get("address").map_err(map_sqlx_error)?,
        category_id: row.try_get("category_id").map_err(map_sqlx_error)?,
        start_date: timestamp_from_row(row, "start_date")?,
        end_date: timestamp_from_row(row, "end_date")?,
    })
}

/// Rebuilds a `TrainingSchedule` from a database row.
fn schedule_from_row(row: &SqliteRow) -> DbResult<TrainingSchedule> {
    Ok(TrainingSchedule {
        id: row.try_get("id").map_err(map_sqlx_error)?,
        training_id: row.try_get("training_id").map_err(map_sqlx_error)?,
        start_date: timestamp_from_row(row, "start_date")?,
        end_date: timestamp_from_row(row, "end_date")?,
        capacity: row.try_get("capacity").map_err(map_sqlx_error)?,
    })
}

/// Rebuilds an `Enrollment` from a database row.
fn enrollment_from_row(row: &SqliteRow) -> DbResult<Enrollment> {
    let email: String = row.try_get("email").map_err(map_sqlx_error)?;
    let status: String = row.try_get("status").map_err(map_sqlx_error)?;
    Ok(Enrollment {
        id: row.try_get("id").map_err(map_sqlx_error)?,
        fullname: row.try_get("fullname").map_err(map_sqlx_error)?,
        email: EmailAddress::new(email)?,
        phone: row.try_get("phone").map_err(map_sqlx_error)?,
        address: row.try_get("address").map_err(map_sqlx_error)?,
        training_schedule_id: row.try_get("training_schedule_id").map_err(map_sqlx_error)?,
        enrollment_date: timestamp_from_row(row, "enrollment_date")?,
        status: EnrollmentStatus::try_from(status.as_str())?,
    })
}

/// Rebuilds a `Review` from a database row.
fn review_from_row(row: &SqliteRow) -> DbResult<Review> {
    let user_email: String = row.try_get("user_email").map_err(map_sqlx_error)?;
    Ok(Review {
        id: row.try_get("id").map_err(map_sqlx_error)?,
        training_id: row.try_get("training_id").map_err(map_sqlx_error)?,
        user_email: EmailAddress::new(user_email)?,
        user_phone: row.try_get("user_phone").map_err(map_sqlx_error)?,
        stars: row.try_get("stars").map_err(map_sqlx_error)?,
        description: row.try_get("description").map_err(map_sqlx_error)?,
        created_at: timestamp_from_row(row, "created_at")?,
    })
}

/// Parses a task identifier stored as text.
fn task_id_from_text(text: &str) -> DbResult<Uuid> {
    Uuid::parse_str(text)
        .map_err(|e| DbError::DataIntegrityError(format!("Invalid task id: {}", e)))
}

pub(super) async fn create_user(
    ex: &mut SqliteExecutor,
    username: &Username,
    email: &EmailAddress,
    password: &HashedPassword,
    role: Role,
) -> DbResult<i32> {
    let query_str = "INSERT INTO users (username, email, password, role) VALUES (?, ?, ?, ?)";
    let done = sqlx::query(query_str)
        .bind(username.as_str())
        .bind(email.as_str())
        .bind(password.as_str())
        .bind(role.as_str())
        .execute(ex.conn())
        .await
        .map_err(map_sqlx_error)?;
    last_insert_id(done)
}

/// Column list shared by all user queries.
const USER_COLS: &str =
    "id, username, email, password, role, reset_token, reset_token_expiry_sec,
    reset_token_expiry_nsec";

pub(super) async fn get_user_by_id(ex: &mut SqliteExecutor, id: i32) -> DbResult<User> {
    let query_str = format!("SELECT {} FROM users WHERE id = ?", USER_COLS);
    let row =
        sqlx::query(&query_str).bind(id).fetch_one(ex.conn()).await.map_err(map_sqlx_error)?;
    user_from_row(&row)
}

pub(super) async fn get_user_by_email(
    ex: &mut SqliteExecutor,
    email: &EmailAddress,
) -> DbResult<User> {
    let query_str = format!("SELECT {} FROM users WHERE email = ?", USER_COLS);
    let row = sqlx::query(&query_str)
        .bind(email.as_str())
        .fetch_one(ex.conn())
        .await
        .map_err(map_sqlx_error)?;
    user_from_row(&row)
}

pub(super) async fn get_user_by_reset_token(
    ex: &mut SqliteExecutor,
    token: &ResetToken,
) -> DbResult<User> {
    let query_str = format!("SELECT {} FROM users WHERE reset_token = ?", USER_COLS);
    let row = sqlx::query(&query_str)
        .bind(token.as_str())
        .fetch_one(ex.conn())
        .await
        .map_err(map_sqlx_error)?;
    user_from_row(&row)
}

pub(super) async fn update_user(
    ex: &mut SqliteExecutor,
    id: i32,
    username: &Username,
    email: &EmailAddress,
) -> DbResult<()> {
    let query_str = "UPDATE users SET username = ?, email = ? WHERE id = ?";
    let done = sqlx::query(query_str)
        .bind(username.as_str())
        .bind(email.as_str())
        .bind(id)
        .execute(ex.conn())
        .await
        .map_err(map_sqlx_error)?;
    ensure_one_modified(done)
}

pub(super) async fn update_user_password(
    ex: &mut SqliteExecutor,
    id: i32,
    password: &HashedPassword,
) -> DbResult<()> {
    let query_str = "UPDATE users SET password = ? WHERE id = ?";
    let done = sqlx::query(query_str)
        .bind(password.as_str())
        .bind(id)
        .execute(ex.conn())
        .await
        .map_err(map_sqlx_error)?;
    ensure_one_modified(done)
}

pub(super) async fn set_reset_token(
    ex: &mut SqliteExecutor,
    id: i32,
    token: &ResetToken,
    expiry: OffsetDateTime,
) -> DbResult<()> {
    let (expiry_sec, expiry_nsec) = unpack_timestamp(expiry);
    let query_str = "
        UPDATE users
        SET reset_token = ?, reset_token_expiry_sec = ?, reset_token_expiry_nsec = ?
        WHERE id = ?
    ";
    let done = sqlx::query(query_str)
        .bind(token.as_str())
        .bind(expiry_sec)
        .bind(expiry_nsec)
        .bind(id)
        .execute(ex.conn())
        .await
        .map_err(map_sqlx_error)?;
    ensure_one_modified(done)
}

pub(super) async fn clear_reset_token(ex: &mut SqliteExecutor, id: i32) -> DbResult<()> {
    let query_str = "
        UPDATE users
        SET reset_token = NULL, reset_token_expiry_sec = NULL, reset_token_expiry_nsec = NULL
        WHERE id = ?
    ";
    let done =
        sqlx::query(query_str).bind(id).execute(ex.conn()).await.map_err(map_sqlx_error)?;
    ensure_one_modified(done)
}

pub(super) async fn list_users(ex: &mut SqliteExecutor) -> DbResult<Vec<User>> {
    let query_str = format!("SELECT {} FROM users ORDER BY id", USER_COLS);
    let mut rows = sqlx::query(&query_str).fetch(ex.conn());
    let mut users = vec![];
    while let Some(row) = rows.try_next().await.map_err(map_sqlx_error)? {
        users.push(user_from_row(&row)?);
    }
    Ok(users)
}

pub(super) async fn create_category(
    ex: &mut SqliteExecutor,
    name: &str,
    description: &str,
) -> DbResult<i32> {
    let query_str = "INSERT INTO categories (name, description) VALUES (?, ?)";
    let done = sqlx::query(query_str)
        .bind(name)
        .bind(description)
        .execute(ex.conn())
        .await
        .map_err(map_sqlx_error)?;
    last_insert_id(done)
}

pub(super) async fn get_category(ex: &mut SqliteExecutor, id: i32) -> DbResult<Category> {
    let query_str = "SELECT id, name, description FROM categories WHERE id = ?";
    let row =
        sqlx::query(query_str).bind(id).fetch_one(ex.conn()).await.map_err(map_sqlx_error)?;
    Ok(Category {
        id: row.try_get("id").map_err(map_sqlx_error)?,
        name: row.try_get("name").map_err(map_sqlx_error)?,
        description: row.try_get("description").map_err(map_sqlx_error)?,
    })
}

pub(super) async fn list_categories(ex: &mut SqliteExecutor) -> DbResult<Vec<Category>> {
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
    ex: &mut SqliteExecutor,
    id: i32,
    name: &str,
    description: &str,
) -> DbResult<()> {
    let query_str = "UPDATE categories SET name = ?, description = ? WHERE id = ?";
    let done = sqlx::query(query_str)
        .bind(name)
        .bind(description)
        .bind(id)
        .execute(ex.conn())
        .await
        .map_err(map_sqlx_error)?;
    ensure_one_modified(done)
}

pub(super) async fn delete_category(ex: &mut SqliteExecutor, id: i32) -> DbResult<()> {
    let query_str = "DELETE FROM categories WHERE id = ?";
    let done =
        sqlx::query(query_str).bind(id).execute(ex.conn()).await.map_err(map_sqlx_error)?;
    ensure_one_modified(done)
}

pub(super) async fn create_training(
    ex: &mut SqliteExecutor,
    training: &Training,
) -> DbResult<i32> {
    let what_you_will_learn = serde_json::to_string(&training.what_you_will_learn)
        .map_err(|e| DbError::BackendError(format!("Cannot serialize learning items: {}", e)))?;
    let (start_sec, start_nsec) = unpack_timestamp(training.start_date);
    let (end_sec, end_nsec) = unpack_timestamp(training.end_date);

    let query_str = "
        INSERT INTO trainings
            (title, description, details, duration, instructor, fee, original_fee,
            discount_percentage, level, certification, what_you_will_learn, address,
            category_id, start_date_sec, start_date_nsec, end_date_sec, end_date_nsec)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
    ";
    let done = sqlx::query(query_str)
        .bind(&training.title)
        .bind(&training.description)
        .bind(&training.details)
        .bind(&training.duration)
        .bind(&training.instructor)
        .bind(training.fee.to_string())
        .bind(training.original_fee.to_string())
        .bind(training.discount_percentage.to_string())
        .bind(&training.level)
        .bind(training.certification)
        .bind(&what_you_will_learn)
        .bind(&training.address)
        .bind(training.category_id)
        .bind(start_sec)
        .bind(start_nsec)
        .bind(end_sec)
        .bind(end_nsec)
        .execute(ex.conn())
        .await
        .map_err(map_sqlx_error)?;
    last_insert_id(done)
}

/// Column list shared by all training queries.
const TRAINING_COLS: &str = "id, title, description, details, duration, instructor, fee,
    original_fee, discount_percentage, level, certification, what_you_will_learn, address,
    category_id, start_date_sec, start_date_nsec, end_date_sec, end_date_nsec";

pub(super) async fn get_training(ex: &mut SqliteExecutor, id: i32) -> DbResult<Training> {
    let query_str = format!("SELECT {} FROM trainings WHERE id = ?", TRAINING_COLS);
    let row =
        sqlx::query(&query_str).bind(id).fetch_one(ex.conn()).await.map_err(map_sqlx_error)?;
    training_from_row(&row)
}

pub(super) async fn list_trainings(ex: &mut SqliteExecutor) -> DbResult<Vec<Training>> {
    let query_str = format!("SELECT {} FROM trainings ORDER BY id", TRAINING_COLS);
    let mut rows = sqlx::query(&query_str).fetch(ex.conn());
    let mut trainings = vec![];
    while let Some(row) = rows.try_next().await.map_err(map_sqlx_error)? {
        trainings.push(training_from_row(&row)?);
    }
    Ok(trainings)
}

pub(super) async fn list_trainings_by_category(
    ex: &mut SqliteExecutor,
    category_id: i32,
) -> DbResult<Vec<Training>> {
    let query_str =
        format!("SELECT {} FROM trainings WHERE category_id = ? ORDER BY id", TRAINING_COLS);
    let mut rows = sqlx::query(&query_str).bind(category_id).fetch(ex.conn());
    let mut trainings = vec![];
    while let Some(row) = rows.try_next().await.map_err(map_sqlx_error)? {
        trainings.push(training_from_row(&row)?);
    }
    Ok(trainings)
}

pub(super) async fn update_training(
    ex: &mut SqliteExecutor,
    training: &Training,
) -> DbResult<()> {
    let what_you_will_learn = serde_json::to_string(&training.what_you_will_learn)
        .map_err(|e| DbError::BackendError(format!("Cannot serialize learning items: {}", e)))?;
    let (start_sec, start_nsec) = unpack_timestamp(training.start_date);
    let (end_sec, end_nsec) = unpack_timestamp(training.end_date);

    let query_str = "
        UPDATE trainings SET
            title = ?, description = ?, details = ?, duration = ?, instructor = ?,
            level = ?, certification = ?, what_you_will_learn = ?, address = ?,
            category_id = ?, start_date_sec = ?, start_date_nsec = ?, end_date_sec = ?,
            end_date_nsec = ?
        WHERE id = ?
    ";
    let done = sqlx::query(query_str)
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
        .bind(start_sec)
        .bind(start_nsec)
        .bind(end_sec)
        .bind(end_nsec)
        .bind(training.id)
        .execute(ex.conn())
        .await
        .map_err(map_sqlx_error)?;
    ensure_one_modified(done)
}

pub(super) async fn delete_training(ex: &mut SqliteExecutor, id: i32) -> DbResult<()> {
    let query_str = "DELETE FROM trainings WHERE id = ?";
    let done =
        sqlx::query(query_str).bind(id).execute(ex.conn()).await.map_err(map_sqlx_error)?;
    ensure_one_modified(done)
}

pub(super) async fn create_schedule(
    ex: &mut SqliteExecutor,
    training_id: i32,
    start_date: OffsetDateTime,
    end_date: OffsetDateTime,
    capacity: i32,
) -> DbResult<i32> {
    let (start_sec, start_nsec) = unpack_timestamp(start_date);
    let (end_sec, end_nsec) = unpack_timestamp(end_date);
    let query_str = "
        INSERT INTO training_schedules
            (training_id, start_date_sec, start_date_nsec, end_date_sec, end_date_nsec, capacity)
        VALUES (?, ?, ?, ?, ?, ?)
    ";
    let done = sqlx::query(query_str)
        .bind(training_id)
        .bind(start_sec)
        .bind(start_nsec)
        .bind(end_sec)
        .bind(end_nsec)
        .bind(capacity)
        .execute(ex.conn())
        .await
        .map_err(map_sqlx_error)?;
    last_insert_id(done)
}

/// Column list shared by all schedule queries.
const SCHEDULE_COLS: &str = "id, training_id, start_date_sec, start_date_nsec, end_date_sec,
    end_date_nsec, capacity";

pub(super) async fn get_schedule(ex: &mut SqliteExecutor, id: i32) -> DbResult<TrainingSchedule> {
    let query_str = format!("SELECT {} FROM training_schedules WHERE id = ?", SCHEDULE_COLS);
    let row =
        sqlx::query(&query_str).bind(id).fetch_one(ex.conn()).await.map_err(map_sqlx_error)?;
    schedule_from_row(&row)
}

pub(super) async fn list_schedules(ex: &mut SqliteExecutor) -> DbResult<Vec<TrainingSchedule>> {
    let query_str = format!("SELECT {} FROM training_schedules ORDER BY id", SCHEDULE_COLS);
    let mut rows = sqlx::query(&query_str).fetch(ex.conn());
    let mut schedules = vec![];
    while let Some(row) = rows.try_next().await.map_err(map_sqlx_error)? {
        schedules.push(schedule_from_row(&row)?);
    }
    Ok(schedules)
}

pub(super) async fn list_schedules_by_training(
    ex: &mut SqliteExecutor,
    training_id: i32,
) -> DbResult<Vec<TrainingSchedule>> {
    let query_str = format!(
        "SELECT {} FROM training_schedules WHERE training_id = ? ORDER BY id",
        SCHEDULE_COLS
    );
    let mut rows = sqlx::query(&query_str).bind(training_id).fetch(ex.conn());
    let mut schedules = vec![];
    while let Some(row) = rows.try_next().await.map_err(map_sqlx_error)? {
        schedules.push(schedule_from_row(&row)?);
    }
    Ok(schedules)
}

pub(super) async fn update_schedule(
    ex: &mut SqliteExecutor,
    schedule: &TrainingSchedule,
) -> DbResult<()> {
    let (start_sec, start_nsec) = unpack_timestamp(schedule.start_date);
    let (end_sec, end_nsec) = unpack_timestamp(schedule.end_date);
    let query_str = "
        UPDATE training_schedules
        SET training_id = ?, start_date_sec = ?, start_date_nsec = ?, end_date_sec = ?,
            end_date_nsec = ?, capacity = ?
        WHERE id = ?
    ";
    let done = sqlx::query(query_str)
        .bind(schedule.training_id)
        .bind(start_sec)
        .bind(start_nsec)
        .bind(end_sec)
        .bind(end_nsec)
        .bind(schedule.capacity)
        .bind(schedule.id)
        .execute(ex.conn())
        .await
        .map_err(map_sqlx_error)?;
    ensure_one_modified(done)
}

pub(super) async fn delete_schedule(ex: &mut SqliteExecutor, id: i32) -> DbResult<()> {
    let query_str = "DELETE FROM training_schedules WHERE id = ?";
    let done =
        sqlx::query(query_str).bind(id).execute(ex.conn()).await.map_err(map_sqlx_error)?;
    ensure_one_modified(done)
}

pub(super) async fn delete_schedules_by_training(
    ex: &mut SqliteExecutor,
    training_id: i32,
) -> DbResult<u64> {
    let query_str = "DELETE FROM training_schedules WHERE training_id = ?";
    let done = sqlx::query(query_str)
        .bind(training_id)
        .execute(ex.conn())
        .await
        .map_err(map_sqlx_error)?;
    Ok(done.rows_affected())
}

pub(super) async fn create_enrollment(
    ex: &mut SqliteExecutor,
    fullname: &str,
    email: &EmailAddress,
    phone: &str,
    address: &str,
    training_schedule_id: i32,
    enrollment_date: OffsetDateTime,
) -> DbResult<i32> {
    let (date_sec, date_nsec) = unpack_timestamp(enrollment_date);
    let query_str = "
        INSERT INTO enrollments
            (fullname, email, phone, address, training_schedule_id, enrollment_date_sec,
            enrollment_date_nsec, status)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
    ";
    let done = sqlx::query(query_str)
        .bind(fullname)
        .bind(email.as_str())
        .bind(phone)
        .bind(address)
        .bind(training_schedule_id)
        .bind(date_sec)
        .bind(date_nsec)
        .bind(EnrollmentStatus::Pending.as_str())
        .execute(ex.conn())
        .await
        .map_err(map_sqlx_error)?;
    last_insert_id(done)
}

/// Column list shared by all enrollment queries.
const ENROLLMENT_COLS: &str = "id, fullname, email, phone, address, training_schedule_id,
    enrollment_date_sec, enrollment_date_nsec, status";

pub(super) async fn get_enrollment(ex: &mut SqliteExecutor, id: i32) -> DbResult<Enrollment> {
    let query_str = format!("SELECT {} FROM enrollments WHERE id = ?", ENROLLMENT_COLS);
    let row =
        sqlx::query(&query_str).bind(id).fetch_one(ex.conn()).await.map_err(map_sqlx_error)?;
    enrollment_from_row(&row)
}

pub(super) async fn list_enrollments(ex: &mut SqliteExecutor) -> DbResult<Vec<Enrollment>> {
    let query_str = format!("SELECT {} FROM enrollments ORDER BY id", ENROLLMENT_COLS);
    let mut rows = sqlx::query(&query_str).fetch(ex.conn());
    let mut enrollments = vec![];
    while let Some(row) = rows.try_next().await.map_err(map_sqlx_error)? {
        enrollments.push(enrollment_from_row(&row)?);
    }
    Ok(enrollments)
}

pub(super) async fn set_enrollment_status(
    ex: &mut SqliteExecutor,
    id: i32,
    status: EnrollmentStatus,
) -> DbResult<()> {
    let query_str = "UPDATE enrollments SET status = ? WHERE id = ?";
    let done = sqlx::query(query_str)
        .bind(status.as_str())
        .bind(id)
        .execute(ex.conn())
        .await
        .map_err(map_sqlx_error)?;
    ensure_one_modified(done)
}

pub(super) async fn create_review(ex: &mut SqliteExecutor, review: &Review) -> DbResult<i32> {
    let (created_sec, created_nsec) = unpack_timestamp(review.created_at);
    let query_str = "
        INSERT INTO reviews
            (training_id, user_email, user_phone, stars, description, created_at_sec,
            created_at_nsec)
        VALUES (?, ?, ?, ?, ?, ?, ?)
    ";
    let done = sqlx::query(query_str)
        .bind(review.training_id)
        .bind(review.user_email.as_str())
        .bind(&review.user_phone)
        .bind(review.stars)
        .bind(&review.description)
        .bind(created_sec)
        .bind(created_nsec)
        .execute(ex.conn())
        .await
        .map_err(map_sqlx_error)?;
    last_insert_id(done)
}

/// Column list shared by all review queries.
const REVIEW_COLS: &str =
    "id, training_id, user_email, user_phone, stars, description, created_at_sec,
    created_at_nsec";

pub(super) async fn get_review(ex: &mut SqliteExecutor, id: i32) -> DbResult<Review> {
    let query_str = format!("SELECT {} FROM reviews WHERE id = ?", REVIEW_COLS);
    let row =
        sqlx::query(&query_str).bind(id).fetch_one(ex.conn()).await.map_err(map_sqlx_error)?;
    review_from_row(&row)
}

pub(super) async fn list_reviews_by_training(
    ex: &mut SqliteExecutor,
    training_id: i32,
) -> DbResult<Vec<Review>> {
    let query_str = format!(
        "SELECT {} FROM reviews WHERE training_id = ?
        ORDER BY created_at_sec DESC, created_at_nsec DESC, id DESC",
        REVIEW_COLS
    );
    let mut rows = sqlx::query(&query_str).bind(training_id).fetch(ex.conn());
    let mut reviews = vec![];
    while let Some(row) = rows.try_next().await.map_err(map_sqlx_error)? {
        reviews.push(review_from_row(&row)?);
    }
    Ok(reviews)
}

pub(super) async fn update_review(ex: &mut SqliteExecutor, review: &Review) -> DbResult<()> {
    let query_str = "UPDATE reviews SET stars = ?, description = ? WHERE id = ?";
    let done = sqlx::query(query_str)
        .bind(review.stars)
        .bind(&review.description)
        .bind(review.id)
        .execute(ex.conn())
        .await
        .map_err(map_sqlx_error)?;
    ensure_one_modified(done)
}

pub(super) async fn delete_review(ex: &mut SqliteExecutor, id: i32) -> DbResult<()> {
    let query_str = "DELETE FROM reviews WHERE id = ?";
    let done =
        sqlx::query(query_str).bind(id).execute(ex.conn()).await.map_err(map_sqlx_error)?;
    ensure_one_modified(done)
}

pub(super) async fn delete_reviews_by_training(
    ex: &mut SqliteExecutor,
    training_id: i32,
) -> DbResult<u64> {
    let query_str = "DELETE FROM reviews WHERE training_id = ?";
    let done = sqlx::query(query_str)
        .bind(training_id)
        .execute(ex.conn())
        .await
        .map_err(map_sqlx_error)?;
    Ok(done.rows_affected())
}

pub(super) async fn get_rating(ex: &mut SqliteExecutor, training_id: i32) -> DbResult<Rating> {
    let query_str =
        "SELECT AVG(stars) AS average, COUNT(*) AS count FROM reviews WHERE training_id = ?";
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
    ex: &mut SqliteExecutor,
    enrollment_id: i32,
    now: OffsetDateTime,
) -> DbResult<Uuid> {
    let id = Uuid::new_v4();
    let (now_sec, now_nsec) = unpack_timestamp(now);
    let query_str = "
        INSERT INTO notifier_tasks
            (id, enrollment_id, status_code, status_reason, runs, created_sec, created_nsec,
            updated_sec, updated_nsec, only_after_sec, only_after_nsec)
        VALUES (?, ?, ?, NULL, 0, ?, ?, ?, ?, NULL, NULL)
    ";
    let done = sqlx::query(query_str)
        .bind(id.to_string())
        .bind(enrollment_id)
        .bind(TASK_RUNNABLE)
        .bind(now_sec)
        .bind(now_nsec)
        .bind(now_sec)
        .bind(now_nsec)
        .execute(ex.conn())
        .await
        .map_err(map_sqlx_error)?;
    ensure_one_modified(done)?;
    Ok(id)
}

pub(super) async fn get_runnable_tasks(
    ex: &mut SqliteExecutor,
    now: OffsetDateTime,
    limit: u16,
) -> DbResult<Vec<NotifierTask>> {
    let (now_sec, now_nsec) = unpack_timestamp(now);
    let query_str = "
        SELECT id, enrollment_id, runs
        FROM notifier_tasks
        WHERE status_code = ?
            AND (only_after_sec IS NULL
                OR only_after_sec < ?
                OR (only_after_sec = ? AND only_after_nsec <= ?))
        ORDER BY created_sec, created_nsec
        LIMIT ?
    ";
    let mut rows = sqlx::query(query_str)
        .bind(TASK_RUNNABLE)
        .bind(now_sec)
        .bind(now_sec)
        .bind(now_nsec)
        .bind(i64::from(limit))
        .fetch(ex.conn());
    let mut tasks = vec![];
    while let Some(row) = rows.try_next().await.map_err(map_sqlx_error)? {
        let id: String = row.try_get("id").map_err(map_sqlx_error)?;
        tasks.push(NotifierTask {
            id: task_id_from_text(&id)?,
            enrollment_id: row.try_get("enrollment_id").map_err(map_sqlx_error)?,
            runs: row.try_get("runs").map_err(map_sqlx_error)?,
        });
    }
    Ok(tasks)
}

pub(super) async fn set_task_running(
    ex: &mut SqliteExecutor,
    id: Uuid,
    now: OffsetDateTime,
) -> DbResult<()> {
    let (now_sec, now_nsec) = unpack_timestamp(now);
    let query_str = "
        UPDATE notifier_tasks
        SET runs = runs + 1, updated_sec = ?, updated_nsec = ?, only_after_sec = NULL,
            only_after_nsec = NULL
        WHERE id = ? AND status_code = ?
    ";
    let done = sqlx::query(query_str)
        .bind(now_sec)
        .bind(now_nsec)
        .bind(id.to_string())
        .bind(TASK_RUNNABLE)
        .execute(ex.conn())
        .await
        .map_err(map_sqlx_error)?;
    ensure_one_modified(done)
}

pub(super) async fn set_task_done(
    ex: &mut SqliteExecutor,
    id: Uuid,
    now: OffsetDateTime,
) -> DbResult<()> {
    let (now_sec, now_nsec) = unpack_timestamp(now);
    let query_str = "
        UPDATE notifier_tasks
        SET status_code = ?, status_reason = NULL, updated_sec = ?, updated_nsec = ?
        WHERE id = ?
    ";
    let done = sqlx::query(query_str)
        .bind(TASK_DONE)
        .bind(now_sec)
        .bind(now_nsec)
        .bind(id.to_string())
        .execute(ex.conn())
        .await
        .map_err(map_sqlx_error)?;
    ensure_one_modified(done)
}

pub(super) async fn set_task_retry(
    ex: &mut SqliteExecutor,
    id: Uuid,
    only_after: OffsetDateTime,
    reason: &str,
    now: OffsetDateTime,
) -> DbResult<()> {
    let (only_after_sec, only_after_nsec) = unpack_timestamp(only_after);
    let (now_sec, now_nsec) = unpack_timestamp(now);
    let query_str = "
        UPDATE notifier_tasks
        SET status_reason = ?, only_after_sec = ?, only_after_nsec = ?, updated_sec = ?,
            updated_nsec = ?
        WHERE id = ? AND status_code = ?
    ";
    let done = sqlx::query(query_str)
        .bind(reason)
        .bind(only_after_sec)
        .bind(only_after_nsec)
        .bind(now_sec)
        .bind(now_nsec)
        .bind(id.to_string())
        .bind(TASK_RUNNABLE)
        .execute(ex.conn())
        .await
        .map_err(map_sqlx_error)?;
    ensure_one_modified(done)
}

pub(super) async fn set_task_abandoned(
    ex: &mut SqliteExecutor,
    id: Uuid,
    reason: &str,
    now: OffsetDateTime,
) -> DbResult<()> {
    let (now_sec, now_nsec) = unpack_timestamp(now);
    let query_str = "
        UPDATE notifier_tasks
        SET status_code = ?, status_reason = ?, updated_sec = ?, updated_nsec = ?
        WHERE id = ?
    ";
    let done = sqlx::query(query_str)
        .bind(TASK_ABANDONED)
        .bind(reason)
        .bind(now_sec)
        .bind(now_nsec)
        .bind(id.to_string())
        .execute(ex.conn())
        .await
        .map_err(map_sqlx_error)?;
    ensure_one_modified(done)
}

#[cfg(test)]
pub(super) async fn get_task_status(
    ex: &mut SqliteExecutor,
    id: Uuid,
) -> DbResult<crate::db::TaskStatusRow> {
    let query_str = "
        SELECT status_code, status_reason, runs, only_after_sec, only_after_nsec
        FROM notifier_tasks WHERE id = ?
    ";
    let row = sqlx::query(query_str)
        .bind(id.to_string())
        .fetch_one(ex.conn())
        .await
        .map_err(map_sqlx_error)?;
    let only_after_sec: Option<i64> = row.try_get("only_after_sec").map_err(map_sqlx_error)?;
    let only_after_nsec: Option<i64> = row.try_get("only_after_nsec").map_err(map_sqlx_error)?;
    let only_after = match (only_after_sec, only_after_nsec) {
        (Some(sec), Some(nsec)) => Some(build_timestamp(sec, nsec)?),
        (None, None) => None,
        _ => {
            return Err(DbError::DataIntegrityError(format!(
                "Task {} has a partial only_after timestamp",
                id
            )))
        }
    };
    Ok(crate::db::TaskStatusRow {
        status_code: row.try_get("status_code").map_err(map_sqlx_error)?,
        status_reason: row.try_get("status_reason").map_err(map_sqlx_error)?,
        runs: row.try_get("runs").map_err(map_sqlx_error)?,
        only_after,
    })
}
