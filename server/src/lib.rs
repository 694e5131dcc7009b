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

//! REST service for a training enrollment platform.

// Keep these in sync with other top-level files.
#![warn(anonymous_parameters, bad_style, clippy::missing_docs_in_private_items, missing_docs)]
#![warn(unused, unused_extern_crates, unused_import_braces, unused_qualifications)]
#![warn(unsafe_code)]

use lettre::message::Mailbox;
use std::error::Error;
use std::net::SocketAddr;
use std::sync::Arc;
use traindesk_core::clocks::SystemClock;
use traindesk_core::db::Db;

pub mod db;
pub mod driver;
use driver::email::EmailTemplates;
use driver::notifier::{Notifier, NotifierOptions};
use driver::smtp::{LettreSmtpMailer, SmtpOptions};
use driver::{Driver, DriverOptions};
pub(crate) mod model;
mod rest;
use rest::app;

/// Instantiates all resources to serve the application on `bind_addr`.
///
/// While it'd be nice to push this responsibility to `main`, doing so would force us to expose
/// many crate-internal types to the public, which in turn would make dead code detection harder.
pub async fn serve(
    bind_addr: impl Into<SocketAddr>,
    db: Arc<dyn Db + Send + Sync>,
    smtp_opts: SmtpOptions,
    driver_opts: DriverOptions,
    notifier_opts: NotifierOptions,
) -> Result<(), Box<dyn Error>> {
    let mailer = LettreSmtpMailer::connect(&smtp_opts)?;
    let from = smtp_opts.from.parse::<Mailbox>()?;
    let templates = EmailTemplates::new(from);

    let driver = Driver::new(
        db,
        Arc::from(SystemClock::default()),
        Arc::from(mailer),
        templates,
        driver_opts,
    );

    let notifier = Notifier::new(driver.clone(), notifier_opts);
    tokio::spawn(notifier.run());

    let listener = tokio::net::TcpListener::bind(bind_addr.into()).await?;
    axum::serve(listener, app(driver)).await?;
    Ok(())
}
