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

//! Test utilities for the REST API.

use crate::driver;
use crate::rest::app;
use axum::Router;

/// Container for the state required to run a REST test.
///
/// The wrapped driver context keeps direct access to the database, the clock and the mailer
/// so that tests can validate side effects that are not visible over HTTP.
pub(crate) struct TestContext {
    /// Driver-level context backing the app.
    pub(crate) driver: driver::testutils::TestContext,

    /// The router under test.
    app: Router,
}

impl TestContext {
    pub(crate) async fn setup() -> Self {
        let driver = driver::testutils::TestContext::setup().await;
        let app = app(driver.driver());
        Self { driver, app }
    }

    /// Returns a copy of the app to send one request to.
    pub(crate) fn app(&self) -> Router {
        self.app.clone()
    }

    /// Consumes the context and returns the app.
    pub(crate) fn into_app(self) -> Router {
        self.app
    }
}
