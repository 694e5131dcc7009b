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

//! Enrollments of students into training schedules.

use crate::model::{Training, TrainingSchedule};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use traindesk_core::model::{EmailAddress, ModelError, ModelResult};

/// Lifecycle status of an enrollment.
///
/// New enrollments always start as `Pending` and only administrators can move them to any
/// other status.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum EnrollmentStatus {
    /// The enrollment was submitted but has not been acted upon yet.
    Pending,

    /// The enrollment was confirmed and the student is attending.
    Active,

    /// The student finished the training.
    Completed,

    /// The enrollment was called off.
    Cancelled,
}

impl EnrollmentStatus {
    /// Returns the textual representation of the status as stored in the database.
    pub(crate) fn as_str(&self) -> &'static str {
        match self {
            EnrollmentStatus::Pending => "pending",
            EnrollmentStatus::Active => "active",
            EnrollmentStatus::Completed => "completed",
            EnrollmentStatus::Cancelled => "cancelled",
        }
    }
}

impl TryFrom<&str> for EnrollmentStatus {
    type Error = ModelError;

    fn try_from(s: &str) -> ModelResult<Self> {
        match s {
            "pending" => Ok(EnrollmentStatus::Pending),
            "active" => Ok(EnrollmentStatus::Active),
            "completed" => Ok(EnrollmentStatus::Completed),
            "cancelled" => Ok(EnrollmentStatus::Cancelled),
            s => Err(ModelError(format!("Unknown enrollment status {}", s))),
        }
    }
}

/// An enrollment as stored in the database.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub(crate) struct Enrollment {
    /// Identifier of the enrollment.
    pub(crate) id: i32,

    /// Full name of the enrollee.
    pub(crate) fullname: String,

    /// Email address the confirmation documents are sent to.
    pub(crate) email: EmailAddress,

    /// Contact phone number of the enrollee.
    pub(crate) phone: String,

    /// Postal address of the enrollee.
    pub(crate) address: String,

    /// Identifier of the schedule the student enrolled into.
    pub(crate) training_schedule_id: i32,

    /// Time at which the enrollment was submitted.
    #[serde(with = "time::serde::rfc3339")]
    pub(crate) enrollment_date: OffsetDateTime,

    /// Current status of the enrollment.
    pub(crate) status: EnrollmentStatus,
}

/// An enrollment joined with the schedule and training it refers to.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub(crate) struct EnrollmentDetails {
    /// The enrollment itself.
    #[serde(flatten)]
    pub(crate) enrollment: Enrollment,

    /// The schedule the enrollment points to.
    pub(crate) schedule: TrainingSchedule,

    /// The training the schedule belongs to.
    pub(crate) training: Training,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_as_str_round_trips() {
        for status in [
            EnrollmentStatus::Pending,
            EnrollmentStatus::Active,
            EnrollmentStatus::Completed,
            EnrollmentStatus::Cancelled,
        ] {
            assert_eq!(status, EnrollmentStatus::try_from(status.as_str()).unwrap());
        }
    }

    #[test]
    fn test_status_try_from_unknown() {
        match EnrollmentStatus::try_from("PENDING") {
            Err(ModelError(e)) => assert!(e.contains("Unknown enrollment status")),
            Ok(s) => panic!("Must have failed but got: {:?}", s),
        }
    }

    #[test]
    fn test_status_serde_uses_lowercase_names() {
        assert_eq!("\"pending\"", serde_json::to_string(&EnrollmentStatus::Pending).unwrap());
        assert_eq!(EnrollmentStatus::Cancelled, serde_json::from_str("\"cancelled\"").unwrap());
    }
}
