/*
 *
 *
 *
 *
 * MIT License
 * Copyright (c) 2025. Dwight J. Browne
 * dwight[-at-]dwightjbrowne[-dot-]com
 *
 *
 * Permission is hereby granted, free of charge, to any person obtaining a copy
 * of this software and associated documentation files (the "Software"), to deal
 * in the Software without restriction, including without limitation the rights
 * to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
 * copies of the Software, and to permit persons to whom the Software is
 * furnished to do so, subject to the following conditions:
 *
 * The above copyright notice and this permission notice shall be included in all
 * copies or substantial portions of the Software.
 *
 * THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
 * IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
 * FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
 * AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
 * LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
 * OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
 * SOFTWARE.
 */

//! # qh-datahub
//!
//! The DataHub: a scheduler-driven market data collector.
//!
//! A single cooperative [`Scheduler`] hosts every job. The subscription
//! reconciler diffs the `provider_subscription` table against running jobs,
//! loading and unloading provider plugins through the [`ProviderRegistry`];
//! fired jobs flow into the data-pull dispatcher, which builds gap-aware
//! requests, gates them on the trading calendar, streams bars from the
//! provider, and batches rows into TimescaleDB with a duplicate-tolerant
//! fallback. Index providers get their own sync jobs that POST constituents
//! to the Registry service.

pub mod cron;
pub mod dispatcher;
pub mod error;
pub mod handlers;
pub mod reconciler;
pub mod registry;
pub mod scheduler;

use parking_lot::Mutex;
use qh_core::{Config, SystemContext};
use qh_database_postgres::DbPool;
use qh_providers::ProviderFactory;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

pub use cron::{CronSchedule, OffsetCronTrigger};
pub use error::{DataHubError, DataHubResult};
pub use handlers::ProviderValidateResponse;
pub use registry::ProviderRegistry;
pub use scheduler::{JobArgs, Scheduler, Trigger, safe_job};

/// Whether to pull data immediately upon subscription or wait for the next
/// cron fire (historical data providers only)
pub const IMMEDIATE_PULL: bool = true;

/// Default number of seconds live jobs start before interval close
pub const DEFAULT_LIVE_OFFSET: i64 = 30;

/// Default number of days to back-fill when we have no data yet
pub const DEFAULT_LOOKBACK: i64 = 8000;

/// Number of bars to batch insert into the database
pub const BATCH_SIZE: usize = 500;

const REFRESH_JOB_KEY: &str = "subscription_refresh";
const INDEX_REFRESH_JOB_KEY: &str = "index_sync_refresh";

/// The DataHub service: provider registry, scheduler, and job state.
pub struct DataHub {
  pub(crate) pool: DbPool,
  pub(crate) registry: ProviderRegistry,
  pub(crate) scheduler: Scheduler,
  pub(crate) config: Config,
  pub(crate) http: reqwest::Client,
  pub(crate) job_keys: Mutex<HashSet<String>>,
  pub(crate) index_sync_job_keys: Mutex<HashSet<String>>,
}

impl DataHub {
  pub fn new(
    config: Config,
    pool: DbPool,
    factory: ProviderFactory,
    system_context: SystemContext,
  ) -> Arc<Self> {
    let registry =
      ProviderRegistry::new(factory, system_context, config.provider_dir.clone());
    let http = reqwest::Client::builder()
      .timeout(Duration::from_secs(config.timeout_secs))
      .build()
      .expect("Failed to create HTTP client");
    Arc::new(Self {
      pool,
      registry,
      scheduler: Scheduler::new(),
      config,
      http,
      job_keys: Mutex::new(HashSet::new()),
      index_sync_job_keys: Mutex::new(HashSet::new()),
    })
  }

  /// Start the DataHub: run one reconciliation pass, then schedule the
  /// periodic refresh jobs and start the scheduler loop.
  pub async fn start(self: &Arc<Self>) -> DataHubResult<()> {
    if let Err(e) = self.refresh_subscriptions().await {
      tracing::error!("Initial subscription refresh failed: {}", e);
    }
    if let Err(e) = self.refresh_index_sync_jobs().await {
      tracing::error!("Initial index sync refresh failed: {}", e);
    }

    let hub = Arc::clone(self);
    self.scheduler.add(
      REFRESH_JOB_KEY,
      Trigger::Every(Duration::from_secs(self.config.refresh_seconds)),
      Arc::new(move |_args| {
        let hub = hub.clone();
        Box::pin(async move {
          safe_job("refresh_subscriptions", hub.refresh_subscriptions()).await;
        })
      }),
      JobArgs::None,
    );

    let hub = Arc::clone(self);
    self.scheduler.add(
      INDEX_REFRESH_JOB_KEY,
      Trigger::Every(Duration::from_secs(self.config.refresh_seconds)),
      Arc::new(move |_args| {
        let hub = hub.clone();
        Box::pin(async move {
          safe_job("refresh_index_sync_jobs", hub.refresh_index_sync_jobs()).await;
        })
      }),
      JobArgs::None,
    );

    self.scheduler.start();
    info!("DataHub started, subscription refresh interval: {}s", self.config.refresh_seconds);
    Ok(())
  }

  /// Stop the scheduler; in-flight jobs finish naturally.
  pub async fn stop(&self) {
    info!("DataHub shutting down.");
    self.scheduler.stop();
    self.job_keys.lock().clear();
    self.index_sync_job_keys.lock().clear();
  }
}
