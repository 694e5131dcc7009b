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

//! Test scenarios for the database layer, shared by all backends.

use crate::db::*;
use crate::model::Password;
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Duration;
use time::macros::datetime;
use traindesk_core::db::{Db, DbError};

/// Creates a training with hardcoded details in `category_id` for testing purposes.
fn make_training(category_id: i32) -> Training {
    Training {
        id: 0,
        title: "Advanced Kite Flying".to_owned(),
        description: "Learn to fly kites".to_owned(),
        details: "A lot of details about kites".to_owned(),
        duration: "4 weeks".to_owned(),
        instructor: "Some Instructor".to_owned(),
        fee: Decimal::new(8000, 2),
        original_fee: Decimal::new(10000, 2),
        discount_percentage: Decimal::new(20, 0),
        level: "Beginner".to_owned(),
        certification: true,
        what_you_will_learn: vec!["Knots".to_owned(), "Wind".to_owned()],
        address: "123 Fake Street".to_owned(),
        category_id,
        start_date: datetime!(2025-07-01 09:00:00 UTC),
        end_date: datetime!(2025-07-28 17:00:00 UTC),
    }
}

/// Shorthand to create the category that most scenarios need as an FK target.
async fn make_category(ex: &mut Executor) -> i32 {
    create_category(ex, "Outdoors", "Trainings in the open air").await.unwrap()
}

pub(super) async fn test_users(db: Arc<dyn Db>) {
    let mut ex = db.ex().await.unwrap();
    init_schema(&mut ex).await.unwrap();

    let username = Username::new("some-user").unwrap();
    let email = EmailAddress::new("some@example.com").unwrap();
    let password = Password::from("the-password").hash().unwrap();

    let id = create_user(&mut ex, &username, &email, &password, Role::User).await.unwrap();

    let user = get_user_by_id(&mut ex, id).await.unwrap();
    assert_eq!(&username, user.username());
    assert_eq!(&email, user.email());
    assert_eq!(password.as_str(), user.password().as_str());
    assert_eq!(Role::User, user.role());
    assert!(user.reset_token().is_none());

    let user2 = get_user_by_email(&mut ex, &email).await.unwrap();
    assert_eq!(user.id(), user2.id());

    match get_user_by_id(&mut ex, id + 1).await {
        Err(DbError::NotFound) => (),
        e => panic!("Unexpected result: {:?}", e),
    }

    // Uniqueness of usernames and emails comes from the schema.
    match create_user(
        &mut ex,
        &username,
        &EmailAddress::new("other@example.com").unwrap(),
        &password,
        Role::User,
    )
    .await
    {
        Err(DbError::AlreadyExists) => (),
        e => panic!("Unexpected result: {:?}", e),
    }
    match create_user(&mut ex, &Username::new("other-user").unwrap(), &email, &password, Role::User)
        .await
    {
        Err(DbError::AlreadyExists) => (),
        e => panic!("Unexpected result: {:?}", e),
    }

    let new_username = Username::new("renamed-user").unwrap();
    let new_email = EmailAddress::new("renamed@example.com").unwrap();
    update_user(&mut ex, id, &new_username, &new_email).await.unwrap();
    let user = get_user_by_id(&mut ex, id).await.unwrap();
    assert_eq!(&new_username, user.username());
    assert_eq!(&new_email, user.email());

    let new_password = Password::from("new-password").hash().unwrap();
    update_user_password(&mut ex, id, &new_password).await.unwrap();
    let user = get_user_by_id(&mut ex, id).await.unwrap();
    assert_eq!(new_password.as_str(), user.password().as_str());

    let token = ResetToken::generate();
    let expiry = datetime!(2025-06-01 11:00:00 UTC);
    set_reset_token(&mut ex, id, &token, expiry).await.unwrap();
    let user = get_user_by_reset_token(&mut ex, &token).await.unwrap();
    assert_eq!(id, user.id());
    assert_eq!(Some((&token, expiry)), user.reset_token());

    clear_reset_token(&mut ex, id).await.unwrap();
    match get_user_by_reset_token(&mut ex, &token).await {
        Err(DbError::NotFound) => (),
        e => panic!("Unexpected result: {:?}", e),
    }

    let admin_id = create_user(
        &mut ex,
        &Username::new("the-admin").unwrap(),
        &EmailAddress::new("admin@example.com").unwrap(),
        &password,
        Role::Admin,
    )
    .await
    .unwrap();
    let users = list_users(&mut ex).await.unwrap();
    assert_eq!(vec![id, admin_id], users.iter().map(User::id).collect::<Vec<i32>>());
    assert_eq!(Role::Admin, users[1].role());

    drop(ex);
    db.close().await;
}

pub(super) async fn test_categories(db: Arc<dyn Db>) {
    let mut ex = db.ex().await.unwrap();
    init_schema(&mut ex).await.unwrap();

    let id = create_category(&mut ex, "Music", "Instruments and singing").await.unwrap();
    assert_eq!(
        Category { id, name: "Music".to_owned(), description: "Instruments and singing".to_owned() },
        get_category(&mut ex, id).await.unwrap()
    );

    match create_category(&mut ex, "Music", "Duplicate").await {
        Err(DbError::AlreadyExists) => (),
        e => panic!("Unexpected result: {:?}", e),
    }

    let id2 = create_category(&mut ex, "Art", "Painting").await.unwrap();
    let categories = list_categories(&mut ex).await.unwrap();
    // Listings come back sorted by name.
    assert_eq!(vec![id2, id], categories.iter().map(|c| c.id).collect::<Vec<i32>>());

    update_category(&mut ex, id, "Music and sound", "More instruments").await.unwrap();
    assert_eq!("Music and sound", get_category(&mut ex, id).await.unwrap().name);

    delete_category(&mut ex, id).await.unwrap();
    match get_category(&mut ex, id).await {
        Err(DbError::NotFound) => (),
        e => panic!("Unexpected result: {:?}", e),
    }
    match delete_category(&mut ex, id).await {
        Err(DbError::NotFound) => (),
        e => panic!("Unexpected result: {:?}", e),
    }

    drop(ex);
    db.close().await;
}

pub(super) async fn test_trainings(db: Arc<dyn Db>) {
    let mut ex = db.ex().await.unwrap();
    init_schema(&mut ex).await.unwrap();

    let category_id = make_category(&mut ex).await;

    let mut training = make_training(category_id);
    let id = create_training(&mut ex, &training).await.unwrap();
    training.id = id;
    assert_eq!(training, get_training(&mut ex, id).await.unwrap());

    // A dangling category reference must be detected by the foreign key constraint.
    match create_training(&mut ex, &make_training(category_id + 123)).await {
        Err(DbError::NotFound) => (),
        e => panic!("Unexpected result: {:?}", e),
    }

    let category2_id = create_category(&mut ex, "Indoors", "Other trainings").await.unwrap();
    let mut training2 = make_training(category2_id);
    training2.title = "Intro to Chess".to_owned();
    training2.id = create_training(&mut ex, &training2).await.unwrap();

    assert_eq!(
        vec![training.clone(), training2.clone()],
        list_trainings(&mut ex).await.unwrap()
    );
    assert_eq!(vec![training2.clone()], list_trainings_by_category(&mut ex, category2_id).await.unwrap());
    assert!(list_trainings_by_category(&mut ex, category_id + 123).await.unwrap().is_empty());

    training.title = "Basic Kite Flying".to_owned();
    training.certification = false;
    training.what_you_will_learn = vec!["Patience".to_owned()];
    training.category_id = category2_id;
    // The fee columns must be left alone no matter what the input says.
    training.fee = Decimal::new(1, 2);
    update_training(&mut ex, &training).await.unwrap();
    let updated = get_training(&mut ex, id).await.unwrap();
    assert_eq!("Basic Kite Flying", updated.title);
    assert_eq!(category2_id, updated.category_id);
    assert_eq!(Decimal::new(8000, 2), updated.fee);

    delete_training(&mut ex, id).await.unwrap();
    match get_training(&mut ex, id).await {
        Err(DbError::NotFound) => (),
        e => panic!("Unexpected result: {:?}", e),
    }

    drop(ex);
    db.close().await;
}

pub(super) async fn test_schedules(db: Arc<dyn Db>) {
    let mut ex = db.ex().await.unwrap();
    init_schema(&mut ex).await.unwrap();

    let category_id = make_category(&mut ex).await;
    let training_id = create_training(&mut ex, &make_training(category_id)).await.unwrap();

    let start = datetime!(2025-07-01 09:00:00 UTC);
    let end = datetime!(2025-07-05 17:00:00 UTC);
    let id = create_schedule(&mut ex, training_id, start, end, 20).await.unwrap();
    assert_eq!(
        TrainingSchedule { id, training_id, start_date: start, end_date: end, capacity: 20 },
        get_schedule(&mut ex, id).await.unwrap()
    );

    match create_schedule(&mut ex, training_id + 123, start, end, 20).await {
        Err(DbError::NotFound) => (),
        e => panic!("Unexpected result: {:?}", e),
    }

    let id2 = create_schedule(
        &mut ex,
        training_id,
        start + Duration::from_secs(7 * 24 * 60 * 60),
        end + Duration::from_secs(7 * 24 * 60 * 60),
        10,
    )
    .await
    .unwrap();

    assert_eq!(
        vec![id, id2],
        list_schedules(&mut ex).await.unwrap().iter().map(|s| s.id).collect::<Vec<i32>>()
    );
    assert_eq!(
        vec![id, id2],
        list_schedules_by_training(&mut ex, training_id)
            .await
            .unwrap()
            .iter()
            .map(|s| s.id)
            .collect::<Vec<i32>>()
    );

    let mut schedule = get_schedule(&mut ex, id).await.unwrap();
    schedule.capacity = 25;
    update_schedule(&mut ex, &schedule).await.unwrap();
    assert_eq!(25, get_schedule(&mut ex, id).await.unwrap().capacity);

    delete_schedule(&mut ex, id).await.unwrap();
    match get_schedule(&mut ex, id).await {
        Err(DbError::NotFound) => (),
        e => panic!("Unexpected result: {:?}", e),
    }

    assert_eq!(1, delete_schedules_by_training(&mut ex, training_id).await.unwrap());
    assert_eq!(0, delete_schedules_by_training(&mut ex, training_id).await.unwrap());

    drop(ex);
    db.close().await;
}

pub(super) async fn test_enrollments(db: Arc<dyn Db>) {
    let mut ex = db.ex().await.unwrap();
    init_schema(&mut ex).await.unwrap();

    let category_id = make_category(&mut ex).await;
    let training_id = create_training(&mut ex, &make_training(category_id)).await.unwrap();
    let schedule_id = create_schedule(
        &mut ex,
        training_id,
        datetime!(2025-07-01 09:00:00 UTC),
        datetime!(2025-07-05 17:00:00 UTC),
        20,
    )
    .await
    .unwrap();

    let email = EmailAddress::new("student@example.com").unwrap();
    let date = datetime!(2025-06-20 15:30:00 UTC);
    let id = create_enrollment(
        &mut ex,
        "Some Student",
        &email,
        "5551234567",
        "456 Other Street",
        schedule_id,
        date,
    )
    .await
    .unwrap();

    let enrollment = get_enrollment(&mut ex, id).await.unwrap();
    assert_eq!("Some Student", enrollment.fullname);
    assert_eq!(email, enrollment.email);
    assert_eq!(schedule_id, enrollment.training_schedule_id);
    assert_eq!(date, enrollment.enrollment_date);
    assert_eq!(EnrollmentStatus::Pending, enrollment.status);

    match create_enrollment(
        &mut ex,
        "Some Student",
        &email,
        "5551234567",
        "456 Other Street",
        schedule_id + 123,
        date,
    )
    .await
    {
        Err(DbError::NotFound) => (),
        e => panic!("Unexpected result: {:?}", e),
    }

    assert_eq!(vec![enrollment.clone()], list_enrollments(&mut ex).await.unwrap());

    set_enrollment_status(&mut ex, id, EnrollmentStatus::Active).await.unwrap();
    assert_eq!(
        EnrollmentStatus::Active,
        get_enrollment(&mut ex, id).await.unwrap().status
    );
    match set_enrollment_status(&mut ex, id + 123, EnrollmentStatus::Active).await {
        Err(DbError::NotFound) => (),
        e => panic!("Unexpected result: {:?}", e),
    }

    drop(ex);
    db.close().await;
}

pub(super) async fn test_reviews(db: Arc<dyn Db>) {
    let mut ex = db.ex().await.unwrap();
    init_schema(&mut ex).await.unwrap();

    let category_id = make_category(&mut ex).await;
    let training_id = create_training(&mut ex, &make_training(category_id)).await.unwrap();

    assert_eq!(
        Rating { average: 0.0, count: 0 },
        get_rating(&mut ex, training_id).await.unwrap()
    );

    let mut review = Review {
        id: 0,
        training_id,
        user_email: EmailAddress::new("reviewer@example.com").unwrap(),
        user_phone: "5551234567".to_owned(),
        stars: 4,
        description: "Pretty good".to_owned(),
        created_at: datetime!(2025-06-20 15:30:00 UTC),
    };
    review.id = create_review(&mut ex, &review).await.unwrap();
    assert_eq!(review, get_review(&mut ex, review.id).await.unwrap());

    let mut review2 = review.clone();
    review2.stars = 2;
    review2.description = "Not great".to_owned();
    review2.created_at = datetime!(2025-06-21 10:00:00 UTC);
    review2.id = create_review(&mut ex, &review2).await.unwrap();

    // Newest reviews come first.
    assert_eq!(
        vec![review2.clone(), review.clone()],
        list_reviews_by_training(&mut ex, training_id).await.unwrap()
    );

    assert_eq!(
        Rating { average: 3.0, count: 2 },
        get_rating(&mut ex, training_id).await.unwrap()
    );

    review.stars = 5;
    review.description = "Actually excellent".to_owned();
    update_review(&mut ex, &review).await.unwrap();
    assert_eq!(review, get_review(&mut ex, review.id).await.unwrap());

    delete_review(&mut ex, review2.id).await.unwrap();
    match get_review(&mut ex, review2.id).await {
        Err(DbError::NotFound) => (),
        e => panic!("Unexpected result: {:?}", e),
    }

    assert_eq!(1, delete_reviews_by_training(&mut ex, training_id).await.unwrap());
    assert_eq!(
        Rating { average: 0.0, count: 0 },
        get_rating(&mut ex, training_id).await.unwrap()
    );

    drop(ex);
    db.close().await;
}

pub(super) async fn test_tasks(db: Arc<dyn Db>) {
    let mut ex = db.ex().await.unwrap();
    init_schema(&mut ex).await.unwrap();

    let category_id = make_category(&mut ex).await;
    let training_id = create_training(&mut ex, &make_training(category_id)).await.unwrap();
    let schedule_id = create_schedule(
        &mut ex,
        training_id,
        datetime!(2025-07-01 09:00:00 UTC),
        datetime!(2025-07-05 17:00:00 UTC),
        20,
    )
    .await
    .unwrap();
    let email = EmailAddress::new("student@example.com").unwrap();
    let enrollment_id = create_enrollment(
        &mut ex,
        "Some Student",
        &email,
        "5551234567",
        "456 Other Street",
        schedule_id,
        datetime!(2025-06-20 15:00:00 UTC),
    )
    .await
    .unwrap();

    let now = datetime!(2025-06-20 15:30:00 UTC);

    let task1 = put_task(&mut ex, enrollment_id, now).await.unwrap();
    let task2 = put_task(&mut ex, enrollment_id, now + Duration::from_secs(1)).await.unwrap();

    // Tasks come back oldest first and respect the limit.
    let tasks = get_runnable_tasks(&mut ex, now + Duration::from_secs(2), 10).await.unwrap();
    assert_eq!(vec![task1, task2], tasks.iter().map(|t| t.id).collect::<Vec<_>>());
    assert_eq!(vec![0, 0], tasks.iter().map(|t| t.runs).collect::<Vec<i16>>());
    let tasks = get_runnable_tasks(&mut ex, now + Duration::from_secs(2), 1).await.unwrap();
    assert_eq!(vec![task1], tasks.iter().map(|t| t.id).collect::<Vec<_>>());

    set_task_running(&mut ex, task1, now).await.unwrap();
    let status = get_task_status(&mut ex, task1).await.unwrap();
    assert_eq!(TASK_RUNNABLE, status.status_code);
    assert_eq!(1, status.runs);

    set_task_done(&mut ex, task1, now).await.unwrap();
    let status = get_task_status(&mut ex, task1).await.unwrap();
    assert_eq!(TASK_DONE, status.status_code);
    assert!(status.status_reason.is_none());
    let tasks = get_runnable_tasks(&mut ex, now + Duration::from_secs(2), 10).await.unwrap();
    assert_eq!(vec![task2], tasks.iter().map(|t| t.id).collect::<Vec<_>>());

    // A completed task cannot transition back to running.
    match set_task_running(&mut ex, task1, now).await {
        Err(DbError::NotFound) => (),
        e => panic!("Unexpected result: {:?}", e),
    }

    let retry_at = now + Duration::from_secs(300);
    set_task_retry(&mut ex, task2, retry_at, "SMTP down", now).await.unwrap();
    let status = get_task_status(&mut ex, task2).await.unwrap();
    assert_eq!(TASK_RUNNABLE, status.status_code);
    assert_eq!(Some("SMTP down".to_owned()), status.status_reason);
    assert_eq!(Some(retry_at), status.only_after);
    assert!(get_runnable_tasks(&mut ex, now, 10).await.unwrap().is_empty());
    let tasks = get_runnable_tasks(&mut ex, retry_at, 10).await.unwrap();
    assert_eq!(vec![task2], tasks.iter().map(|t| t.id).collect::<Vec<_>>());

    set_task_abandoned(&mut ex, task2, "Too many retries", now).await.unwrap();
    let status = get_task_status(&mut ex, task2).await.unwrap();
    assert_eq!(TASK_ABANDONED, status.status_code);
    assert_eq!(Some("Too many retries".to_owned()), status.status_reason);
    assert!(get_runnable_tasks(&mut ex, retry_at, 10).await.unwrap().is_empty());

    drop(ex);
    db.close().await;
}
