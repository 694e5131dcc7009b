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

//! Entry point to the service.

// Keep these in sync with other top-level files.
#![warn(anonymous_parameters, bad_style, clippy::missing_docs_in_private_items, missing_docs)]
#![warn(unused, unused_extern_crates, unused_import_braces, unused_qualifications)]
#![warn(unsafe_code)]

use std::env;
use std::net::Ipv4Addr;
use std::sync::Arc;
use traindesk::db::init_schema;
use traindesk::driver::notifier::NotifierOptions;
use traindesk::driver::smtp::SmtpOptions;
use traindesk::driver::DriverOptions;
use traindesk::serve;
use traindesk_core::db::postgres::{PostgresDb, PostgresOptions};
use traindesk_core::db::Db;

#[tokio::main]
async fn main() {
    env_logger::init();

    let port: u16 = match env::var("PORT") {
        Ok(val) => val.parse().expect("Port has to be a number"),
        Err(_) => 3000,
    };
    let addr = (Ipv4Addr::LOCALHOST, port);

    let db_opts = PostgresOptions::from_env("DB").unwrap();
    let db = Arc::from(PostgresDb::connect(db_opts).unwrap());
    init_schema(&mut db.ex().await.unwrap()).await.unwrap();

    let smtp_opts = SmtpOptions::from_env("SMTP").unwrap();
    let driver_opts = DriverOptions::from_env().unwrap();
    let notifier_opts = NotifierOptions::from_env("NOTIFIER").unwrap();

    serve(addr, db, smtp_opts, driver_opts, notifier_opts).await.unwrap()
}
