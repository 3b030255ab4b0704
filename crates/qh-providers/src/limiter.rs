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

//! Per-plugin token bucket shared by all concurrent callers of a provider.

use governor::clock::DefaultClock;
use governor::middleware::NoOpMiddleware;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use crate::types::RateLimit;

type DirectLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock, NoOpMiddleware>;

/// Token bucket wrapper around a provider's declared `rate_limit`.
///
/// A provider without a declared limit gets an unlimited limiter so call
/// sites never branch.
#[derive(Clone)]
pub struct ProviderLimiter {
  inner: Option<Arc<DirectLimiter>>,
}

impl ProviderLimiter {
  pub fn new(limit: Option<RateLimit>) -> Self {
    let inner = limit.and_then(|l| {
      let calls = NonZeroU32::new(l.calls)?;
      let period = Duration::from_secs(l.per_seconds.max(1));
      let replenish = period / l.calls.max(1);
      let quota = Quota::with_period(replenish)?.allow_burst(calls);
      Some(Arc::new(RateLimiter::direct(quota)))
    });
    Self { inner }
  }

  pub fn unlimited() -> Self {
    Self { inner: None }
  }

  /// Wait until a call slot is available.
  pub async fn acquire(&self) {
    if let Some(limiter) = &self.inner {
      limiter.until_ready().await;
    }
  }

  /// Try to take a call slot without waiting.
  pub fn try_acquire(&self) -> bool {
    match &self.inner {
      Some(limiter) => limiter.check().is_ok(),
      None => true,
    }
  }
}

impl std::fmt::Debug for ProviderLimiter {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("ProviderLimiter").field("limited", &self.inner.is_some()).finish()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_unlimited_always_admits() {
    let limiter = ProviderLimiter::unlimited();
    for _ in 0..1000 {
      assert!(limiter.try_acquire());
    }
  }

  #[test]
  fn test_burst_capacity_is_respected() {
    let limiter = ProviderLimiter::new(Some(RateLimit { calls: 3, per_seconds: 3600 }));
    assert!(limiter.try_acquire());
    assert!(limiter.try_acquire());
    assert!(limiter.try_acquire());
    assert!(!limiter.try_acquire());
  }

  #[test]
  fn test_zero_calls_degrades_to_unlimited() {
    let limiter = ProviderLimiter::new(Some(RateLimit { calls: 0, per_seconds: 60 }));
    assert!(limiter.try_acquire());
  }
}
