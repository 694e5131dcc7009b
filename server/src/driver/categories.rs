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

//! Management of training categories.

use crate::db;
use crate::driver::Driver;
use crate::model::{AccessToken, Category};
use traindesk_core::driver::{DriverError, DriverResult};

/// Validates the free-form fields of a category.
fn validate(name: &str, description: &str) -> DriverResult<()> {
    let mut errors = vec![];
    if name.trim().is_empty() {
        errors.push("Name cannot be empty".to_owned());
    }
    if description.trim().is_empty() {
        errors.push("Description cannot be empty".to_owned());
    }
    if errors.is_empty() {
        Ok(())
    } else {
        Err(DriverError::Validation(errors))
    }
}

impl Driver {
    /// Creates a new category.  Restricted to administrators.
    pub(crate) async fn create_category(
        self,
        token: &AccessToken,
        name: String,
        description: String,
    ) -> DriverResult<Category> {
        self.authenticate_admin(token).await?;
        validate(&name, &description)?;

        let id = db::create_category(&mut self.db.ex().await?, &name, &description).await?;
        Ok(Category { id, name, description })
    }

    /// Returns one category by id.
    pub(crate) async fn get_category(self, id: i32) -> DriverResult<Category> {
        Ok(db::get_category(&mut self.db.ex().await?, id).await?)
    }

    /// Returns all categories.
    pub(crate) async fn list_categories(self) -> DriverResult<Vec<Category>> {
        Ok(db::list_categories(&mut self.db.ex().await?).await?)
    }

    /// Updates a category in place.  Restricted to administrators.
    pub(crate) async fn update_category(
        self,
        token: &AccessToken,
        id: i32,
        name: String,
        description: String,
    ) -> DriverResult<Category> {
        self.authenticate_admin(token).await?;
        validate(&name, &description)?;

        db::update_category(&mut self.db.ex().await?, id, &name, &description).await?;
        Ok(Category { id, name, description })
    }

    /// Deletes a category.  Restricted to administrators.
    pub(crate) async fn delete_category(self, token: &AccessToken, id: i32) -> DriverResult<()> {
        self.authenticate_admin(token).await?;
        Ok(db::delete_category(&mut self.db.ex().await?, id).await?)
    }
}
