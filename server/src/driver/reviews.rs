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

//! Management of training reviews and their aggregated ratings.

use crate::db;
use crate::driver::Driver;
use crate::model::{validate_phone, validate_stars, AccessToken, Rating, Review};
use traindesk_core::driver::{DriverError, DriverResult};
use traindesk_core::model::EmailAddress;

impl Driver {
    /// Creates a review for a training.  Open to anonymous callers, so every field is
    /// validated here.
    pub(crate) async fn create_review(
        self,
        training_id: i32,
        user_email: String,
        user_phone: String,
        stars: i16,
        description: String,
    ) -> DriverResult<Review> {
        let mut errors = vec![];
        let user_email = match EmailAddress::new(user_email) {
            Ok(email) => Some(email),
            Err(e) => {
                errors.push(e.to_string());
                None
            }
        };
        if let Err(e) = validate_phone(&user_phone) {
            errors.push(e);
        }
        if let Err(e) = validate_stars(stars) {
            errors.push(e);
        }
        let user_email = match (user_email, errors.is_empty()) {
            (Some(email), true) => email,
            (_, _) => return Err(DriverError::Validation(errors)),
        };

        let mut ex = self.db.ex().await?;

        // Probe the training eagerly to turn a dangling id into a not-found error instead of
        // relying on the foreign key alone.
        db::get_training(&mut ex, training_id).await?;

        let mut review = Review {
            id: 0,
            training_id,
            user_email,
            user_phone,
            stars,
            description,
            created_at: self.clock.now_utc(),
        };
        review.id = db::create_review(&mut ex, &review).await?;
        Ok(review)
    }

    /// Returns the reviews of one training, newest first.
    pub(crate) async fn list_reviews(self, training_id: i32) -> DriverResult<Vec<Review>> {
        Ok(db::list_reviews_by_training(&mut self.db.ex().await?, training_id).await?)
    }

    /// Returns the aggregated rating of one training.
    pub(crate) async fn get_rating(self, training_id: i32) -> DriverResult<Rating> {
        Ok(db::get_rating(&mut self.db.ex().await?, training_id).await?)
    }

    /// Updates the stars and description of a review.  Restricted to administrators.
    pub(crate) async fn update_review(
        self,
        token: &AccessToken,
        id: i32,
        stars: i16,
        description: String,
    ) -> DriverResult<Review> {
        self.authenticate_admin(token).await?;
        if let Err(e) = validate_stars(stars) {
            return Err(DriverError::Validation(vec![e]));
        }

        let mut ex = self.db.ex().await?;
        let mut review = db::get_review(&mut ex, id).await?;
        review.stars = stars;
        review.description = description;
        db::update_review(&mut ex, &review).await?;
        Ok(review)
    }

    /// Deletes a review.  Restricted to administrators.
    pub(crate) async fn delete_review(self, token: &AccessToken, id: i32) -> DriverResult<()> {
        self.authenticate_admin(token).await?;
        Ok(db::delete_review(&mut self.db.ex().await?, id).await?)
    }
}
