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

//! Data-pull dispatch: gap-aware request building, calendar gating, bar
//! streaming, and the batched insert protocol with its conflict fallback.

use chrono::{Duration, NaiveDate, Utc};
use futures::StreamExt;
use qh_core::{Interval, TradingCalendar, normalize_interval};
use qh_database_postgres::is_unique_violation;
use qh_database_postgres::models::price::{NewHistoricalBar, NewLiveBar};
use qh_database_postgres::models::subscription::HistoricalSymbolState;
use qh_providers::{Bar, ProviderHandle, ProviderType, Req};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration as StdDuration;
use tracing::{error, info, warn};

use crate::error::{DataHubError, DataHubResult};
use crate::registry::LoadedProvider;
use crate::scheduler::safe_job;
use crate::{BATCH_SIZE, DEFAULT_LIVE_OFFSET, DEFAULT_LOOKBACK, DataHub};

/// Read an integer preference at `section.key` from a provider's
/// preferences blob.
pub(crate) fn pref_i64(prefs: Option<&serde_json::Value>, section: &str, key: &str) -> Option<i64> {
  prefs?.get(section)?.get(key)?.as_i64()
}

/// Build gap-aware historical requests for one provider pull.
///
/// A symbol with no recorded state is a new subscription: it gets a full
/// `[today - lookback_days, yesterday]` back-fill, bypassing the calendar.
/// Otherwise the window starts the day after the watermark; symbols already
/// caught up, or whose market held no sessions in the gap, are skipped.
pub fn build_historical_requests(
  today: NaiveDate,
  last_map: &HashMap<String, NaiveDate>,
  lookback_days: i64,
  interval: Interval,
  symbols: &[String],
  exchanges: &[Option<String>],
) -> Vec<Req> {
  let yday = today - Duration::days(1);
  let default_start = yday - Duration::days(lookback_days);

  let mut reqs = Vec::new();
  for (sym, mic) in symbols.iter().zip(exchanges.iter()) {
    let start = match last_map.get(sym) {
      None => {
        let start = default_start + Duration::days(1);
        info!(
          "New subscription for {} ({}). Requesting backfill from {}.",
          sym,
          mic.as_deref().unwrap_or("-"),
          start
        );
        start
      }
      Some(last_updated) => {
        let start = *last_updated + Duration::days(1);
        if start > yday {
          continue; // already caught up to yesterday
        }
        // Skip dark markets: a gap with no sessions has no holes to fill
        if let Some(mic) = mic {
          if !TradingCalendar::has_sessions_in_range(mic, start, yday) {
            info!("Skipping {} ({}) - no trading sessions between {} and {}.", sym, mic, start, yday);
            continue;
          }
        }
        start
      }
    };
    reqs.push(Req { sym: sym.clone(), start, end: yday, interval });
  }
  reqs
}

/// Filter a live subscription down to symbols whose market is open,
/// preserving subscription order.
pub fn filter_open_symbols<F>(
  symbols: &[String],
  exchanges: &[Option<String>],
  is_open: F,
) -> Vec<String>
where
  F: Fn(&str) -> bool,
{
  symbols
    .iter()
    .zip(exchanges.iter())
    .filter_map(|(sym, mic)| match mic {
      Some(mic) if !is_open(mic) => {
        info!("Skipping {} ({}) - market is currently closed.", sym, mic);
        None
      }
      _ => Some(sym.clone()),
    })
    .collect()
}

impl DataHub {
  /// Scheduler entry point: dispatch wrapped in the safe-job envelope.
  pub async fn get_data_job(
    self: Arc<Self>,
    provider: String,
    interval: String,
    symbols: Vec<String>,
    exchanges: Vec<Option<String>>,
  ) {
    safe_job("get_data", self.get_data(&provider, &interval, &symbols, &exchanges)).await;
  }

  /// Dispatch one data pull for a provider.
  pub async fn get_data(
    &self,
    provider: &str,
    interval: &str,
    symbols: &[String],
    exchanges: &[Option<String>],
  ) -> DataHubResult<()> {
    let Some(loaded) = self.registry.get(provider) else {
      error!("Provider {} not found.", provider);
      return Err(DataHubError::Provider(format!("provider {provider} not loaded")));
    };

    let parsed_interval = normalize_interval(Some(interval))
      .and_then(|s| Interval::from_str(&s))
      .ok_or_else(|| DataHubError::Provider(format!("invalid interval '{interval}'")))?;

    match loaded.handle.provider_type() {
      ProviderType::Historical => {
        self.dispatch_historical(&loaded, provider, interval, parsed_interval, symbols, exchanges).await
      }
      ProviderType::Realtime => {
        self.dispatch_realtime(&loaded, provider, interval, parsed_interval, symbols, exchanges).await
      }
      ProviderType::Index => {
        error!("Provider {} is not a valid provider type for data pulls.", provider);
        Err(DataHubError::Provider(format!("provider {provider} is an index provider")))
      }
    }
  }

  async fn dispatch_historical(
    &self,
    loaded: &Arc<LoadedProvider>,
    provider: &str,
    interval_str: &str,
    interval: Interval,
    symbols: &[String],
    exchanges: &[Option<String>],
  ) -> DataHubResult<()> {
    info!("Building provider requests for: {}, {}", provider, interval_str);

    let last_map = {
      let mut conn = self.pool.get().await?;
      HistoricalSymbolState::last_updated_map(&mut conn, provider, symbols).await?
    };
    let lookback_days = pref_i64(loaded.preferences.as_ref(), "data", "lookback_days")
      .unwrap_or(DEFAULT_LOOKBACK);

    let today = Utc::now().date_naive();
    let reqs =
      build_historical_requests(today, &last_map, lookback_days, interval, symbols, exchanges);
    if reqs.is_empty() {
      info!("{} has no valid sessions to pull at this time.", provider);
      return Ok(());
    }

    let ProviderHandle::Historical(p) = &loaded.handle else {
      return Err(DataHubError::Provider(format!("provider {provider} is not historical")));
    };

    let _guard = loaded.mark_in_use();
    loaded.limiter.acquire().await;

    info!("Requesting data from provider.");
    let mut stream = p
      .get_data(reqs)
      .await
      .map_err(|e| DataHubError::Provider(format!("{provider} request failed: {e}")))?;

    let mut buf: Vec<Bar> = Vec::with_capacity(BATCH_SIZE);
    while let Some(item) = stream.next().await {
      let bar = item.map_err(|e| DataHubError::Provider(format!("{provider} stream failed: {e}")))?;
      buf.push(bar);
      if buf.len() >= BATCH_SIZE {
        self.insert_bars(ProviderType::Historical, provider, interval_str, &buf).await?;
        buf.clear();
      }
    }
    if !buf.is_empty() {
      self.insert_bars(ProviderType::Historical, provider, interval_str, &buf).await?;
    }
    Ok(())
  }

  async fn dispatch_realtime(
    &self,
    loaded: &Arc<LoadedProvider>,
    provider: &str,
    interval_str: &str,
    interval: Interval,
    symbols: &[String],
    exchanges: &[Option<String>],
  ) -> DataHubResult<()> {
    let open_symbols = filter_open_symbols(symbols, exchanges, TradingCalendar::is_open_now);
    if open_symbols.is_empty() {
      info!("No markets are open for {} realtime session. Skipping.", provider);
      return Ok(());
    }

    let ProviderHandle::Realtime(p) = &loaded.handle else {
      return Err(DataHubError::Provider(format!("provider {provider} is not realtime")));
    };

    let prefs = loaded.preferences.as_ref();
    let pre_close = pref_i64(prefs, "scheduling", "pre_close_seconds").unwrap_or(DEFAULT_LIVE_OFFSET);
    let post_close =
      pref_i64(prefs, "scheduling", "post_close_seconds").unwrap_or(p.close_buffer_seconds());
    // pre-close lead + post-close listening + processing headroom
    let timeout = StdDuration::from_secs((pre_close + post_close + 30).max(1) as u64);

    let _guard = loaded.mark_in_use();
    loaded.limiter.acquire().await;

    info!("Requesting data from provider.");
    let bars = tokio::time::timeout(timeout, p.get_data(interval, open_symbols))
      .await
      .map_err(|_| DataHubError::Timeout(format!("{provider} live pull exceeded {timeout:?}")))?
      .map_err(|e| DataHubError::Provider(format!("{provider} live pull failed: {e}")))?;

    for chunk in bars.chunks(BATCH_SIZE) {
      self.insert_bars(ProviderType::Realtime, provider, interval_str, chunk).await?;
    }
    Ok(())
  }

  /// Batch insert with duplicate handling.
  ///
  /// The fast bulk insert raises a unique violation on duplicate keys and
  /// leaves the connection in an aborted transaction state, so the fallback
  /// acquires a fresh connection and retries with `ON CONFLICT DO NOTHING`.
  pub(crate) async fn insert_bars(
    &self,
    provider_type: ProviderType,
    provider: &str,
    interval: &str,
    bars: &[Bar],
  ) -> DataHubResult<()> {
    let table = provider_type
      .bar_table()
      .ok_or_else(|| DataHubError::Provider("index providers produce no bars".to_string()))?;
    info!("Inserting {} bars into {}: {}, {}", bars.len(), table, provider, interval);

    match provider_type {
      ProviderType::Historical => {
        let records: Vec<NewHistoricalBar> = bars
          .iter()
          .map(|b| NewHistoricalBar {
            ts: b.ts,
            sym: b.sym.clone(),
            provider: provider.to_string(),
            provider_class_type: "provider".to_string(),
            interval: interval.to_string(),
            o: b.o,
            h: b.h,
            l: b.l,
            c: b.c,
            v: b.v,
          })
          .collect();

        let mut conn = self.pool.get().await?;
        match NewHistoricalBar::bulk_insert(&mut conn, &records).await {
          Ok(_) => Ok(()),
          Err(e) if is_unique_violation(&e) => {
            warn!(
              "Duplicate keys detected in batch for {}/{}. Falling back to INSERT with ON CONFLICT handling.",
              provider, interval
            );
            drop(conn); // the aborted connection goes back to the pool first
            let mut fallback_conn = self.pool.get().await?;
            NewHistoricalBar::insert_ignore_duplicates(&mut fallback_conn, &records).await?;
            Ok(())
          }
          Err(e) => {
            error!("Error inserting bars into {}: {}", table, e);
            Err(e.into())
          }
        }
      }
      ProviderType::Realtime => {
        let records: Vec<NewLiveBar> = bars
          .iter()
          .map(|b| NewLiveBar {
            ts: b.ts,
            sym: b.sym.clone(),
            provider: provider.to_string(),
            provider_class_type: "provider".to_string(),
            interval: interval.to_string(),
            o: b.o,
            h: b.h,
            l: b.l,
            c: b.c,
            v: b.v,
          })
          .collect();

        let mut conn = self.pool.get().await?;
        match NewLiveBar::bulk_insert(&mut conn, &records).await {
          Ok(_) => Ok(()),
          Err(e) if is_unique_violation(&e) => {
            warn!(
              "Duplicate keys detected in batch for {}/{}. Falling back to INSERT with ON CONFLICT handling.",
              provider, interval
            );
            drop(conn);
            let mut fallback_conn = self.pool.get().await?;
            NewLiveBar::insert_ignore_duplicates(&mut fallback_conn, &records).await?;
            Ok(())
          }
          Err(e) => {
            error!("Error inserting bars into {}: {}", table, e);
            Err(e.into())
          }
        }
      }
      ProviderType::Index => unreachable!("checked above"),
    }
  }

  /// Index sync job body: fetch constituents and POST them to the Registry.
  pub async fn sync_index_constituents(&self, provider_name: &str) -> DataHubResult<()> {
    info!("Index sync started: {}", provider_name);

    if self.registry.get(provider_name).is_none() {
      let mut conn = self.pool.get().await?;
      if !self.registry.load(&mut conn, provider_name).await {
        return Err(DataHubError::Provider(format!(
          "failed to load IndexProvider: {provider_name}"
        )));
      }
    }
    let loaded = self
      .registry
      .get(provider_name)
      .ok_or_else(|| DataHubError::Provider(format!("provider {provider_name} not loaded")))?;

    let ProviderHandle::Index(p) = &loaded.handle else {
      return Err(DataHubError::Provider(format!("provider {provider_name} is not an index provider")));
    };

    let _guard = loaded.mark_in_use();
    loaded.limiter.acquire().await;
    let constituents = p
      .fetch_constituents(None)
      .await
      .map_err(|e| DataHubError::Provider(format!("{provider_name} constituents failed: {e}")))?;
    info!("Index sync: {} fetched {} constituents", provider_name, constituents.len());

    let url = format!("{}/api/registry/indices/{}/sync", self.config.registry_url, provider_name);
    let response = self
      .http
      .post(&url)
      .json(&serde_json::json!({ "constituents": constituents }))
      .send()
      .await?;

    if response.status().as_u16() != 200 {
      let status = response.status();
      let body = response.text().await.unwrap_or_default();
      return Err(DataHubError::RegistrySync(format!(
        "{provider_name}: status={status}, body={body}"
      )));
    }

    let result: serde_json::Value = response.json().await.unwrap_or_default();
    info!(
      "Index sync complete: {} - added={}, removed={}, unchanged={}",
      provider_name,
      result.get("members_added").and_then(|v| v.as_i64()).unwrap_or(0),
      result.get("members_removed").and_then(|v| v.as_i64()).unwrap_or(0),
      result.get("members_unchanged").and_then(|v| v.as_i64()).unwrap_or(0)
    );
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
  }

  fn one_symbol(sym: &str, mic: &str) -> (Vec<String>, Vec<Option<String>>) {
    (vec![sym.to_string()], vec![Some(mic.to_string())])
  }

  #[test]
  fn test_calendar_gate_skips_saturday_backfill() {
    // last update Friday, today Sunday: the only candidate session is
    // Saturday, which XNAS never trades.
    let (symbols, exchanges) = one_symbol("AAPL", "XNAS");
    let last_map: HashMap<String, NaiveDate> =
      [("AAPL".to_string(), date(2025, 12, 19))].into_iter().collect();

    let reqs = build_historical_requests(
      date(2025, 12, 21),
      &last_map,
      DEFAULT_LOOKBACK,
      Interval::Day1,
      &symbols,
      &exchanges,
    );
    assert!(reqs.is_empty());
  }

  #[test]
  fn test_calendar_gate_permits_midweek_backfill() {
    let (symbols, exchanges) = one_symbol("AAPL", "XNAS");
    let last_map: HashMap<String, NaiveDate> =
      [("AAPL".to_string(), date(2025, 12, 17))].into_iter().collect();

    let reqs = build_historical_requests(
      date(2025, 12, 21),
      &last_map,
      DEFAULT_LOOKBACK,
      Interval::Day1,
      &symbols,
      &exchanges,
    );
    assert_eq!(
      reqs,
      vec![Req {
        sym: "AAPL".to_string(),
        start: date(2025, 12, 18),
        end: date(2025, 12, 20),
        interval: Interval::Day1,
      }]
    );
  }

  #[test]
  fn test_new_subscription_bypasses_calendar() {
    // No watermark: full lookback window even though the range ends on a
    // weekend day for XNAS.
    let (symbols, exchanges) = one_symbol("AAPL", "XNAS");
    let last_map = HashMap::new();

    let reqs = build_historical_requests(
      date(2025, 12, 21),
      &last_map,
      8000,
      Interval::Day1,
      &symbols,
      &exchanges,
    );
    assert_eq!(reqs.len(), 1);
    assert_eq!(reqs[0].end, date(2025, 12, 20));
    assert_eq!(reqs[0].start, date(2025, 12, 20) - Duration::days(8000) + Duration::days(1));
  }

  #[test]
  fn test_caught_up_symbol_produces_no_request() {
    let (symbols, exchanges) = one_symbol("AAPL", "XNAS");
    let last_map: HashMap<String, NaiveDate> =
      [("AAPL".to_string(), date(2025, 12, 20))].into_iter().collect();

    let reqs = build_historical_requests(
      date(2025, 12, 21),
      &last_map,
      DEFAULT_LOOKBACK,
      Interval::Day1,
      &symbols,
      &exchanges,
    );
    assert!(reqs.is_empty());
  }

  #[test]
  fn test_missing_exchange_skips_calendar_gate() {
    let symbols = vec!["MYSTERY".to_string()];
    let exchanges = vec![None];
    let last_map: HashMap<String, NaiveDate> =
      [("MYSTERY".to_string(), date(2025, 12, 19))].into_iter().collect();

    let reqs = build_historical_requests(
      date(2025, 12, 21),
      &last_map,
      DEFAULT_LOOKBACK,
      Interval::Day1,
      &symbols,
      &exchanges,
    );
    assert_eq!(reqs.len(), 1);
  }

  #[test]
  fn test_realtime_filter_drops_closed_markets() {
    let symbols = vec!["AAPL".to_string(), "BTC/USD".to_string()];
    let exchanges = vec![Some("XNAS".to_string()), Some("CRYPTO".to_string())];

    let open = filter_open_symbols(&symbols, &exchanges, |mic| mic == "CRYPTO");
    assert_eq!(open, vec!["BTC/USD".to_string()]);
  }

  #[test]
  fn test_realtime_filter_keeps_unknown_exchange() {
    let symbols = vec!["X".to_string()];
    let exchanges = vec![None];
    let open = filter_open_symbols(&symbols, &exchanges, |_| false);
    assert_eq!(open, vec!["X".to_string()]);
  }

  #[test]
  fn test_pref_lookup() {
    let prefs = serde_json::json!({"scheduling": {"delay_hours": 2}, "data": {"lookback_days": 30}});
    assert_eq!(pref_i64(Some(&prefs), "scheduling", "delay_hours"), Some(2));
    assert_eq!(pref_i64(Some(&prefs), "data", "lookback_days"), Some(30));
    assert_eq!(pref_i64(Some(&prefs), "data", "missing"), None);
    assert_eq!(pref_i64(None, "data", "lookback_days"), None);
  }
}
