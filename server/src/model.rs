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

//! Data types for the entities managed by the service.

mod category;
mod enrollment;
mod passwords;
mod review;
mod schedule;
mod tokens;
mod training;
mod user;

pub(crate) use category::Category;
pub(crate) use enrollment::{Enrollment, EnrollmentDetails, EnrollmentStatus};
pub(crate) use passwords::{HashedPassword, Password};
pub(crate) use review::{validate_phone, validate_stars, Rating, Review};
pub(crate) use schedule::TrainingSchedule;
pub(crate) use tokens::{AccessToken, ResetToken};
pub(crate) use training::{compute_fee, Training};
pub(crate) use user::{Role, User};
