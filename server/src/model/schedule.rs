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

//! Training schedules.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// A concrete, time-boxed session of a training with its own capacity.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub(crate) struct TrainingSchedule {
    /// Identifier of the schedule.
    pub(crate) id: i32,

    /// Identifier of the training this schedule belongs to.
    pub(crate) training_id: i32,

    /// Time at which the session starts.
    #[serde(with = "time::serde::rfc3339")]
    pub(crate) start_date: OffsetDateTime,

    /// Time at which the session ends.
    #[serde(with = "time::serde::rfc3339")]
    pub(crate) end_date: OffsetDateTime,

    /// Maximum number of enrollees in the session.
    pub(crate) capacity: i32,
}
