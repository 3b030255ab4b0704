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

//! Base traits for data provider plugins and the tagged handle the DataHub
//! dispatches against.

use async_trait::async_trait;
use chrono::NaiveDate;
use futures::stream::{self, BoxStream, StreamExt};
use qh_core::{Interval, Result};
use std::sync::Arc;

use crate::live::RealtimeProvider;
use crate::types::{Constituent, ProviderType, RateLimit, Req, SymbolInfo};

/// Lazy, finite sequence of bars.
pub type BarStream<'a> = BoxStream<'a, Result<crate::types::Bar>>;

/// Capabilities shared by every provider plugin.
#[async_trait]
pub trait DataProvider: Send + Sync {
  /// Stable provider id used as the registry key, e.g. "EODHD".
  fn name(&self) -> &str;

  fn provider_type(&self) -> ProviderType;

  /// Token bucket shape, None for unlimited providers.
  fn rate_limit(&self) -> Option<RateLimit> {
    None
  }

  /// All symbols available for subscription on this provider.
  async fn get_available_symbols(&self) -> Result<Vec<SymbolInfo>>;

  /// Release scoped resources (HTTP session, sockets).
  async fn close(&self) {}
}

/// Historical data providers: finite bar ranges, oldest to newest.
#[async_trait]
pub trait HistoricalProvider: DataProvider {
  /// Return inclusive [start, end] bars ordered oldest to newest.
  async fn get_history(
    &self,
    sym: &str,
    start: NaiveDate,
    end: NaiveDate,
    interval: Interval,
  ) -> Result<BarStream<'_>>;

  /// Stream bars for multiple requests. The default fans out to
  /// [`HistoricalProvider::get_history`] one request at a time; providers with
  /// a bulk endpoint override this.
  async fn get_data(&self, reqs: Vec<Req>) -> Result<BarStream<'_>> {
    let streams = stream::iter(reqs)
      .then(move |r| async move {
        match self.get_history(&r.sym, r.start, r.end, r.interval).await {
          Ok(bars) => bars,
          Err(e) => stream::once(async move { Err(e) }).boxed(),
        }
      })
      .flatten();
    Ok(streams.boxed())
  }
}

/// Index providers: constituent snapshots instead of bars.
#[async_trait]
pub trait IndexProvider: DataProvider {
  /// Current constituents, optionally as of a given date.
  async fn fetch_constituents(&self, as_of: Option<NaiveDate>) -> Result<Vec<Constituent>>;
}

/// Tagged union over the three provider capabilities.
///
/// This is what the provider registry stores and the scheduler dispatches
/// against; the variant fixes which dispatch branch may run.
#[derive(Clone)]
pub enum ProviderHandle {
  Historical(Arc<dyn HistoricalProvider>),
  Realtime(Arc<dyn RealtimeProvider>),
  Index(Arc<dyn IndexProvider>),
}

impl ProviderHandle {
  pub fn name(&self) -> &str {
    match self {
      ProviderHandle::Historical(p) => p.name(),
      ProviderHandle::Realtime(p) => p.name(),
      ProviderHandle::Index(p) => p.name(),
    }
  }

  pub fn provider_type(&self) -> ProviderType {
    match self {
      ProviderHandle::Historical(_) => ProviderType::Historical,
      ProviderHandle::Realtime(_) => ProviderType::Realtime,
      ProviderHandle::Index(_) => ProviderType::Index,
    }
  }

  pub fn rate_limit(&self) -> Option<RateLimit> {
    match self {
      ProviderHandle::Historical(p) => p.rate_limit(),
      ProviderHandle::Realtime(p) => p.rate_limit(),
      ProviderHandle::Index(p) => p.rate_limit(),
    }
  }

  pub async fn get_available_symbols(&self) -> Result<Vec<SymbolInfo>> {
    match self {
      ProviderHandle::Historical(p) => p.get_available_symbols().await,
      ProviderHandle::Realtime(p) => p.get_available_symbols().await,
      ProviderHandle::Index(p) => p.get_available_symbols().await,
    }
  }

  pub async fn close(&self) {
    match self {
      ProviderHandle::Historical(p) => p.close().await,
      ProviderHandle::Realtime(p) => p.close().await,
      ProviderHandle::Index(p) => p.close().await,
    }
  }
}

impl std::fmt::Debug for ProviderHandle {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("ProviderHandle")
      .field("name", &self.name())
      .field("type", &self.provider_type())
      .finish()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::types::Bar;
  use chrono::{TimeZone, Utc};

  struct FakeHistorical;

  #[async_trait]
  impl DataProvider for FakeHistorical {
    fn name(&self) -> &str {
      "FakeHistorical"
    }
    fn provider_type(&self) -> ProviderType {
      ProviderType::Historical
    }
    async fn get_available_symbols(&self) -> Result<Vec<SymbolInfo>> {
      Ok(vec![])
    }
  }

  #[async_trait]
  impl HistoricalProvider for FakeHistorical {
    async fn get_history(
      &self,
      sym: &str,
      start: NaiveDate,
      end: NaiveDate,
      _interval: Interval,
    ) -> Result<BarStream<'_>> {
      let mut bars = Vec::new();
      let mut day = start;
      while day <= end {
        bars.push(Ok(Bar {
          ts: Utc.from_utc_datetime(&day.and_hms_opt(0, 0, 0).unwrap()),
          sym: sym.to_string(),
          o: 1.0,
          h: 2.0,
          l: 0.5,
          c: 1.5,
          v: 100.0,
        }));
        day = day.succ_opt().unwrap();
      }
      Ok(stream::iter(bars).boxed())
    }
  }

  #[tokio::test]
  async fn test_default_get_data_fans_out_over_requests() {
    let provider = FakeHistorical;
    let reqs = vec![
      Req {
        sym: "AAPL".into(),
        start: NaiveDate::from_ymd_opt(2025, 1, 6).unwrap(),
        end: NaiveDate::from_ymd_opt(2025, 1, 7).unwrap(),
        interval: Interval::Day1,
      },
      Req {
        sym: "MSFT".into(),
        start: NaiveDate::from_ymd_opt(2025, 1, 6).unwrap(),
        end: NaiveDate::from_ymd_opt(2025, 1, 6).unwrap(),
        interval: Interval::Day1,
      },
    ];

    let bars: Vec<_> =
      provider.get_data(reqs).await.unwrap().collect::<Vec<_>>().await.into_iter().map(|b| b.unwrap()).collect();

    assert_eq!(bars.len(), 3);
    assert_eq!(bars[0].sym, "AAPL");
    assert_eq!(bars[2].sym, "MSFT");
  }

  #[tokio::test]
  async fn test_handle_exposes_variant_metadata() {
    let handle = ProviderHandle::Historical(Arc::new(FakeHistorical));
    assert_eq!(handle.name(), "FakeHistorical");
    assert_eq!(handle.provider_type(), ProviderType::Historical);
    assert!(handle.rate_limit().is_none());
  }
}
