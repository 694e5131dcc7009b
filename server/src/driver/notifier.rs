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

//! Background worker that delivers enrollment confirmation emails.
//!
//! Enrollment creation enqueues one task per enrollment.  This worker claims runnable tasks,
//! renders the PDF documents for each enrollment, mails them, and records the outcome.  Failed
//! deliveries are retried with a delay until a bounded number of runs is exhausted, at which
//! point the task is abandoned with the failure reason on record.

use crate::db::{self, NotifierTask};
use crate::driver::enrollments::fetch_details;
use crate::driver::{email, pdf, Driver};
use log::{info, warn};
use std::fs;
use std::path::Path;
use std::time::Duration;
use traindesk_core::driver::{DriverError, DriverResult};
use traindesk_core::env::get_optional_var;

/// Default number of tasks to claim per processing cycle.
const DEFAULT_BATCH_SIZE: u16 = 16;

/// Default number of times a task is allowed to run before being abandoned.
const DEFAULT_MAX_RUNS: u8 = 4;

/// Default delay before a failed task is retried, in seconds.
const DEFAULT_RETRY_DELAY_SECS: u64 = 5 * 60;

/// Default delay between queue polls, in seconds.
const DEFAULT_POLL_INTERVAL_SECS: u64 = 60;

/// Configuration options for the notifier worker.
#[derive(Clone, Debug)]
#[cfg_attr(test, derive(PartialEq))]
pub struct NotifierOptions {
    /// Number of tasks to try to process during each processing cycle.
    pub batch_size: u16,

    /// Number of times a task is allowed to run before being abandoned.
    pub max_runs: u8,

    /// Delay before a failed task becomes runnable again.
    pub retry_delay: Duration,

    /// Delay between queue polls when no work arrives.
    pub poll_interval: Duration,
}

#[cfg(any(test, feature = "testutils"))]
impl Default for NotifierOptions {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            max_runs: DEFAULT_MAX_RUNS,
            retry_delay: Duration::from_secs(DEFAULT_RETRY_DELAY_SECS),
            poll_interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
        }
    }
}

impl NotifierOptions {
    /// Creates a new set of options from environment variables.
    pub fn from_env(prefix: &str) -> Result<Self, String> {
        Ok(Self {
            batch_size: get_optional_var::<u16>(prefix, "BATCH_SIZE")?
                .unwrap_or(DEFAULT_BATCH_SIZE),
            max_runs: get_optional_var::<u8>(prefix, "MAX_RUNS")?.unwrap_or(DEFAULT_MAX_RUNS),
            retry_delay: get_optional_var::<Duration>(prefix, "RETRY_DELAY")?
                .unwrap_or(Duration::from_secs(DEFAULT_RETRY_DELAY_SECS)),
            poll_interval: get_optional_var::<Duration>(prefix, "POLL_INTERVAL")?
                .unwrap_or(Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS)),
        })
    }
}

/// Writes one spooled document, mapping filesystem problems to driver errors.
fn write_spool_file(path: &Path, bytes: &[u8]) -> DriverResult<()> {
    fs::write(path, bytes).map_err(|e| {
        DriverError::BackendError(format!("Cannot write {}: {}", path.display(), e))
    })
}

/// Removes one spooled document.  Removal failures are logged and swallowed because the spool
/// lives in a temporary directory anyway.
fn remove_spool_file(path: &Path) {
    if let Err(e) = fs::remove_file(path) {
        warn!("Cannot remove spool file {}: {}", path.display(), e);
    }
}

/// The background worker.  One instance owns the processing loop; the caller decides whether
/// to run it forever via `run` or to drive individual cycles via `loop_once`.
pub struct Notifier {
    /// The driver whose dependencies (database, clock, mailer, templates) the worker borrows.
    driver: Driver,

    /// Configuration options for the worker.
    opts: NotifierOptions,
}

impl Notifier {
    /// Creates a new worker on top of `driver`.
    pub fn new(driver: Driver, opts: NotifierOptions) -> Self {
        Self { driver, opts }
    }

    /// Polls the queue forever, processing any runnable tasks on every cycle.
    pub async fn run(self) {
        loop {
            if let Err(e) = self.loop_once().await {
                warn!("Task processing cycle failed: {}; will retry later", e);
            }
            self.driver.clock.sleep(self.opts.poll_interval).await;
        }
    }

    /// Performs one cycle to process tasks from the queue until no more runnable tasks are
    /// found.
    ///
    /// This returns an error only if there are problems persisting task state.  Individual
    /// delivery failures are recorded in the tasks themselves.
    pub async fn loop_once(&self) -> DriverResult<()> {
        loop {
            let now = self.driver.clock.now_utc();
            let tasks = db::get_runnable_tasks(
                &mut self.driver.db.ex().await?,
                now,
                self.opts.batch_size,
            )
            .await?;
            if tasks.is_empty() {
                break Ok(());
            }

            for task in tasks {
                info!("Task {}: starting", task.id);
                self.run_task(task).await?;
            }
        }
    }

    /// Runs one claimed task and records its outcome.
    async fn run_task(&self, task: NotifierTask) -> DriverResult<()> {
        let now = self.driver.clock.now_utc();
        db::set_task_running(&mut self.driver.db.ex().await?, task.id, now).await?;
        let runs = task.runs + 1;

        if runs >= i16::from(self.opts.max_runs) {
            let reason = format!(
                "Attempted to run {} times, but max runs is {}",
                runs, self.opts.max_runs
            );
            warn!("Task {}: {}", task.id, reason);
            return db::set_task_abandoned(&mut self.driver.db.ex().await?, task.id, &reason, now)
                .await
                .map_err(DriverError::from);
        }

        match self.exec(task.enrollment_id).await {
            Ok(()) => {
                info!("Task {}: finished", task.id);
                db::set_task_done(&mut self.driver.db.ex().await?, task.id, now).await?;
            }
            Err(e) => {
                let reason = e.to_string();
                warn!("Task {}: failed: {}; will retry", task.id, reason);
                db::set_task_retry(
                    &mut self.driver.db.ex().await?,
                    task.id,
                    now + self.opts.retry_delay,
                    &reason,
                    now,
                )
                .await?;
            }
        }
        Ok(())
    }

    /// Delivers the confirmation email for one enrollment.
    ///
    /// The PDF documents are spooled to disk while the send is in flight and removed once it
    /// concludes, no matter the outcome.
    async fn exec(&self, enrollment_id: i32) -> DriverResult<()> {
        let driver = &self.driver;
        let now = driver.clock.now_utc();

        let details = fetch_details(&mut driver.db.ex().await?, enrollment_id).await?;

        let letter = pdf::render_acceptance_letter(&details, now)?;
        let invoice = pdf::render_invoice(&details, now)?;

        let letter_path = driver
            .opts
            .spool_dir
            .join(pdf::spool_file_name("acceptance_letter", enrollment_id, now));
        let invoice_path =
            driver.opts.spool_dir.join(pdf::spool_file_name("invoice", enrollment_id, now));
        // The removals must run even when an early step fails, or a partially written spool
        // would accumulate files until the next reboot.
        let result = async {
            write_spool_file(&letter_path, &letter)?;
            write_spool_file(&invoice_path, &invoice)?;

            let message = email::enrollment_message(
                &driver.templates,
                &details,
                vec![
                    ("acceptance_letter.pdf".to_owned(), letter),
                    ("invoice.pdf".to_owned(), invoice),
                ],
            )?;
            driver.mailer.send(message).await
        }
        .await;

        remove_spool_file(&letter_path);
        remove_spool_file(&invoice_path);

        result
    }
}
