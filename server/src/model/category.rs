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

//! Training categories.

use serde::{Deserialize, Serialize};

/// A category under which trainings are grouped in the catalog.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub(crate) struct Category {
    /// Identifier of the category.
    pub(crate) id: i32,

    /// Name of the category, unique across the catalog.
    pub(crate) name: String,

    /// Free-form description of the category.
    pub(crate) description: String,
}
