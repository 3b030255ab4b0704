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

//! Subscription reconciliation: keep scheduled jobs in sync with the
//! `provider_subscription` table and the index-provider registry.

use qh_database_postgres::models::registry::{CodeRegistryRow, accepted_interval_cron};
use qh_database_postgres::models::subscription::SubscriptionGroup;
use qh_providers::ProviderType;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::cron::OffsetCronTrigger;
use crate::dispatcher::pref_i64;
use crate::error::DataHubResult;
use crate::scheduler::{JobArgs, JobFn, Trigger};
use crate::{DEFAULT_LIVE_OFFSET, DataHub, IMMEDIATE_PULL};

/// Symbols present in `new` but not in `old`, with their aligned exchanges.
///
/// `syms` and `exchanges` come from the grouped subscription view where the
/// arrays are index-aligned.
pub fn added_symbols(
  old: &[String],
  syms: &[String],
  exchanges: &[Option<String>],
) -> (Vec<String>, Vec<Option<String>>) {
  let old_set: HashSet<&String> = old.iter().collect();
  syms
    .iter()
    .zip(exchanges.iter())
    .filter(|(sym, _)| !old_set.contains(sym))
    .map(|(sym, exc)| (sym.clone(), exc.clone()))
    .unzip()
}

impl DataHub {
  fn pull_job_fn(self: &Arc<Self>) -> JobFn {
    let hub = Arc::clone(self);
    Arc::new(move |args| {
      let hub = hub.clone();
      Box::pin(async move {
        if let JobArgs::DataPull { provider, interval, symbols, exchanges } = args {
          hub.get_data_job(provider, interval, symbols, exchanges).await;
        }
      })
    })
  }

  fn index_sync_job_fn(self: &Arc<Self>) -> JobFn {
    let hub = Arc::clone(self);
    Arc::new(move |args| {
      let hub = hub.clone();
      Box::pin(async move {
        if let JobArgs::IndexSync { provider } = args {
          crate::scheduler::safe_job("sync_index_constituents", hub.sync_index_constituents(&provider))
            .await;
        }
      })
    })
  }

  /// Synchronize scheduled data-pull jobs with the `provider_subscription`
  /// table. Loads new providers, drops obsolete ones (unless in use), and
  /// adds/updates/removes jobs keyed by `provider|interval|cron`.
  pub async fn refresh_subscriptions(self: &Arc<Self>) -> DataHubResult<()> {
    debug!("Refreshing subscriptions.");
    let rows = {
      let mut conn = self.pool.get().await?;
      SubscriptionGroup::fetch_all(&mut conn).await?
    };

    // Load provider objects that just appeared
    let current_providers = self.registry.loaded_names();
    let seen_providers: HashSet<String> = rows.iter().map(|r| r.provider.clone()).collect();
    let mut invalid_providers: HashSet<String> = HashSet::new();
    for name in seen_providers.difference(&current_providers) {
      let mut conn = self.pool.get().await?;
      if !self.registry.load(&mut conn, name).await {
        invalid_providers.insert(name.clone());
      }
    }

    // Drop providers that aren't referenced anymore
    for obsolete in current_providers.difference(&seen_providers) {
      self.registry.drop_provider(obsolete).await;
    }

    // Update scheduled jobs
    let mut new_keys: HashSet<String> = HashSet::new();
    for r in &rows {
      if invalid_providers.contains(&r.provider) {
        continue;
      }
      let Some(loaded) = self.registry.get(&r.provider) else {
        continue;
      };
      let prov_type = loaded.handle.provider_type();
      if prov_type == ProviderType::Index {
        warn!("Provider {} is an index provider; subscriptions are ignored.", r.provider);
        continue;
      }

      let key = format!("{}|{}|{}", r.provider, r.interval, r.cron);
      new_keys.insert(key.clone());

      let args = JobArgs::DataPull {
        provider: r.provider.clone(),
        interval: r.interval.clone(),
        symbols: r.syms.clone(),
        exchanges: r.exchanges.clone(),
      };

      if !self.job_keys.lock().contains(&key) {
        // New subscription schedule detected
        let prefs = loaded.preferences.as_ref();
        let offset_seconds = match prov_type {
          // Historical providers: positive offset delays job execution
          ProviderType::Historical => {
            pref_i64(prefs, "scheduling", "delay_hours").unwrap_or(0) * 3600
          }
          // Live providers: negative offset starts before close
          _ => -pref_i64(prefs, "scheduling", "pre_close_seconds").unwrap_or(DEFAULT_LIVE_OFFSET),
        };
        debug!(
          "Scheduling new job: {}, with offset: {}, from specified cron: {}",
          key, offset_seconds, r.cron
        );
        let trigger = match OffsetCronTrigger::from_crontab(&r.cron, offset_seconds) {
          Ok(trigger) => trigger,
          Err(e) => {
            warn!("Invalid cron '{}' for {}: {}. Skipping.", r.cron, key, e);
            new_keys.remove(&key);
            continue;
          }
        };
        self.scheduler.add(&key, Trigger::Cron(trigger), self.pull_job_fn(), args);

        if IMMEDIATE_PULL && prov_type == ProviderType::Historical {
          info!(
            "Immediate data pull for new subscription: {}, {}, {:?}",
            r.provider, r.interval, r.syms
          );
          let hub = Arc::clone(self);
          let (provider, interval, symbols, exchanges) =
            (r.provider.clone(), r.interval.clone(), r.syms.clone(), r.exchanges.clone());
          tokio::spawn(async move {
            hub.get_data_job(provider, interval, symbols, exchanges).await;
          });
        }
      } else {
        // Existing key: symbol subscription may have changed
        debug!("Updating scheduled job: {}", key);
        if IMMEDIATE_PULL && prov_type == ProviderType::Historical {
          if let Some(JobArgs::DataPull { symbols: old_syms, .. }) = self.scheduler.job_args(&key) {
            let (added, added_exchanges) = added_symbols(&old_syms, &r.syms, &r.exchanges);
            if !added.is_empty() {
              info!(
                "Symbols added to existing subscription {}. Triggering immediate pull for: {:?}",
                key, added
              );
              let hub = Arc::clone(self);
              let (provider, interval) = (r.provider.clone(), r.interval.clone());
              tokio::spawn(async move {
                hub.get_data_job(provider, interval, added, added_exchanges).await;
              });
            }
          }
        }
        self.scheduler.modify_args(&key, args);
      }
    }

    // Remove jobs if no longer subscribed
    let mut job_keys = self.job_keys.lock();
    for gone in job_keys.difference(&new_keys) {
      info!("Removing scheduled job: {}", gone);
      self.scheduler.remove(gone);
    }
    *job_keys = new_keys;
    Ok(())
  }

  /// Synchronize scheduled jobs for IndexProvider constituent sync.
  pub async fn refresh_index_sync_jobs(self: &Arc<Self>) -> DataHubResult<()> {
    debug!("Refreshing index sync jobs.");
    let mut conn = self.pool.get().await?;
    let configs = CodeRegistryRow::index_sync_configs(&mut conn).await?;

    let mut new_keys: HashSet<String> = HashSet::new();
    for config in configs {
      let job_key = format!("index_sync_{}", config.class_name);

      let Some(cron) = accepted_interval_cron(&mut conn, &config.sync_frequency).await? else {
        warn!(
          "No cron template found for sync_frequency '{}' for provider {}. Skipping.",
          config.sync_frequency, config.class_name
        );
        continue;
      };
      new_keys.insert(job_key.clone());

      let trigger = match OffsetCronTrigger::from_crontab(&cron, 0) {
        Ok(trigger) => trigger,
        Err(e) => {
          warn!("Invalid cron template '{}' for {}: {}. Skipping.", cron, job_key, e);
          new_keys.remove(&job_key);
          continue;
        }
      };
      let args = JobArgs::IndexSync { provider: config.class_name.clone() };

      if !self.index_sync_job_keys.lock().contains(&job_key) {
        info!(
          "Scheduling index sync job for {} with frequency {}",
          config.class_name, config.sync_frequency
        );
      } else {
        debug!("Updating index sync job for {}", config.class_name);
      }
      // add() replaces by key, which also refreshes a changed cron
      self.scheduler.add(&job_key, Trigger::Cron(trigger), self.index_sync_job_fn(), args);
    }

    let mut keys = self.index_sync_job_keys.lock();
    for gone in keys.difference(&new_keys) {
      info!("Removing index sync job: {}", gone);
      self.scheduler.remove(gone);
    }
    *keys = new_keys;
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_added_symbols_diff_keeps_exchange_alignment() {
    let old = vec!["AAPL".to_string()];
    let syms = vec!["AAPL".to_string(), "MSFT".to_string(), "TSLA".to_string()];
    let exchanges = vec![Some("XNAS".to_string()), Some("XNAS".to_string()), None];

    let (added, added_exchanges) = added_symbols(&old, &syms, &exchanges);
    assert_eq!(added, vec!["MSFT".to_string(), "TSLA".to_string()]);
    assert_eq!(added_exchanges, vec![Some("XNAS".to_string()), None]);
  }

  #[test]
  fn test_added_symbols_empty_when_unchanged() {
    let old = vec!["AAPL".to_string(), "MSFT".to_string()];
    let syms = vec!["AAPL".to_string(), "MSFT".to_string()];
    let exchanges = vec![Some("XNAS".to_string()), Some("XNAS".to_string())];

    let (added, _) = added_symbols(&old, &syms, &exchanges);
    assert!(added.is_empty());
  }

  #[test]
  fn test_added_symbols_all_new_on_empty_old() {
    let (added, _) = added_symbols(&[], &["A".to_string()], &[None]);
    assert_eq!(added, vec!["A".to_string()]);
  }
}
