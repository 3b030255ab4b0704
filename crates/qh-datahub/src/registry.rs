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

//! In-process provider registry.
//!
//! Loads, verifies, and caches provider plugin instances keyed by class
//! name. Activation is gated on the registered module file: it must live
//! under the sandbox prefix and its bytes must re-hash to the stored SHA-256
//! before the secrets envelope is derived and the instance constructed.
//! Every failure path logs and reports "not loaded" without aborting the
//! caller's larger workflow.

use parking_lot::RwLock;
use qh_core::SystemContext;
use qh_providers::{ProviderFactory, ProviderHandle, ProviderLimiter};
use sha2::{Digest, Sha256};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{error, info, warn};

use qh_database_postgres::models::registry::CodeRegistryRow;

/// A constructed plugin with its shared rate limiter and usage tracking.
pub struct LoadedProvider {
  pub handle: ProviderHandle,
  pub limiter: ProviderLimiter,
  pub preferences: Option<serde_json::Value>,
  active_uses: AtomicUsize,
}

impl LoadedProvider {
  pub fn in_use(&self) -> bool {
    self.active_uses.load(Ordering::SeqCst) > 0
  }

  /// Mark the provider busy for the guard's lifetime.
  pub fn mark_in_use(self: &Arc<Self>) -> InUseGuard {
    self.active_uses.fetch_add(1, Ordering::SeqCst);
    InUseGuard { provider: Arc::clone(self) }
  }
}

/// RAII guard backing the `in_use` flag.
pub struct InUseGuard {
  provider: Arc<LoadedProvider>,
}

impl Drop for InUseGuard {
  fn drop(&mut self) {
    self.provider.active_uses.fetch_sub(1, Ordering::SeqCst);
  }
}

/// Registry of loaded provider instances.
pub struct ProviderRegistry {
  factory: ProviderFactory,
  system_context: SystemContext,
  provider_dir: String,
  loaded: RwLock<HashMap<String, Arc<LoadedProvider>>>,
}

impl ProviderRegistry {
  pub fn new(factory: ProviderFactory, system_context: SystemContext, provider_dir: String) -> Self {
    Self { factory, system_context, provider_dir, loaded: RwLock::new(HashMap::new()) }
  }

  pub fn get(&self, name: &str) -> Option<Arc<LoadedProvider>> {
    self.loaded.read().get(name).cloned()
  }

  pub fn loaded_names(&self) -> HashSet<String> {
    self.loaded.read().keys().cloned().collect()
  }

  pub fn factory(&self) -> &ProviderFactory {
    &self.factory
  }

  pub fn provider_dir(&self) -> &str {
    &self.provider_dir
  }

  /// Load a provider by class name. Returns whether the provider is loaded
  /// afterwards; failures are logged, never propagated.
  pub async fn load(&self, conn: &mut diesel_async::AsyncPgConnection, name: &str) -> bool {
    if self.loaded.read().contains_key(name) {
      info!("Provider {} already loaded, skipping.", name);
      return true;
    }

    let row = match CodeRegistryRow::provider_row(conn, name).await {
      Ok(Some(row)) => row,
      Ok(None) => {
        warn!("Provider {} not found in database.", name);
        return false;
      }
      Err(e) => {
        error!("Error querying registration for provider {}: {}", name, e);
        return false;
      }
    };

    let (Some(file_path), Some(file_hash), Some(nonce), Some(ciphertext)) =
      (row.file_path, row.file_hash, row.nonce, row.ciphertext)
    else {
      warn!("Provider {} registration is missing activation artifacts.", name);
      return false;
    };

    if !file_path.starts_with(&self.provider_dir) {
      warn!("File {} not in allowed path {}", file_path, self.provider_dir);
      return false;
    }
    if !Path::new(&file_path).is_file() {
      warn!("File {} not found", file_path);
      return false;
    }

    // Re-hash the registered bytes; a mismatch means tampering or a stale row
    let bytes = match tokio::fs::read(&file_path).await {
      Ok(bytes) => bytes,
      Err(e) => {
        warn!("File {} could not be read: {}", file_path, e);
        return false;
      }
    };
    let digest = Sha256::digest(&bytes);
    if digest.as_slice() != file_hash.as_slice() {
      warn!("File {} hash does not match database hash", file_path);
      return false;
    }

    let context = match self.system_context.derived_context(&file_hash, nonce, ciphertext) {
      Ok(context) => context,
      Err(e) => {
        error!("Error deriving secret context for provider {}: {}", name, e);
        return false;
      }
    };

    let handle = match self.factory.create(name, context) {
      Ok(handle) => handle,
      Err(e) => {
        warn!("Unable to load provider {} class. This provider will be skipped. Error: {}", name, e);
        return false;
      }
    };

    let limiter = ProviderLimiter::new(handle.rate_limit());
    self.loaded.write().insert(
      name.to_string(),
      Arc::new(LoadedProvider {
        handle,
        limiter,
        preferences: row.preferences,
        active_uses: AtomicUsize::new(0),
      }),
    );
    info!("Provider {} instance created successfully.", name);
    true
  }

  /// Drop a provider and release its resources. Providers that are in use
  /// are deferred; returns whether the provider was removed.
  pub async fn drop_provider(&self, name: &str) -> bool {
    let provider = {
      let loaded = self.loaded.read();
      match loaded.get(name) {
        Some(p) if p.in_use() => {
          info!("Skipping unload of {} - currently in use", name);
          return false;
        }
        Some(p) => Arc::clone(p),
        None => return false,
      }
    };
    info!("Removing obsolete provider from registry: {}", name);
    provider.handle.close().await;
    self.loaded.write().remove(name);
    true
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use async_trait::async_trait;
  use qh_core::Result;
  use qh_providers::{DataProvider, IndexProvider, ProviderSubtype, ProviderType};
  use qh_providers::types::{Constituent, SymbolInfo};

  struct StubIndex;

  #[async_trait]
  impl DataProvider for StubIndex {
    fn name(&self) -> &str {
      "StubIndex"
    }
    fn provider_type(&self) -> ProviderType {
      ProviderType::Index
    }
    async fn get_available_symbols(&self) -> Result<Vec<SymbolInfo>> {
      Ok(vec![])
    }
  }

  #[async_trait]
  impl IndexProvider for StubIndex {
    async fn fetch_constituents(&self, _as_of: Option<chrono::NaiveDate>) -> Result<Vec<Constituent>> {
      Ok(vec![])
    }
  }

  fn registry_with_stub() -> ProviderRegistry {
    let mut factory = ProviderFactory::new();
    factory.register("StubIndex", ProviderSubtype::IndexProvider, |_ctx| {
      Ok(ProviderHandle::Index(Arc::new(StubIndex)))
    });
    let system_context = SystemContext::from_bytes(b"registry-test".to_vec()).unwrap();
    ProviderRegistry::new(factory, system_context, "/app/dynamic_providers".to_string())
  }

  #[tokio::test]
  async fn test_in_use_guard_defers_drop() {
    let registry = registry_with_stub();
    let provider = Arc::new(LoadedProvider {
      handle: ProviderHandle::Index(Arc::new(StubIndex)),
      limiter: ProviderLimiter::unlimited(),
      preferences: None,
      active_uses: AtomicUsize::new(0),
    });
    registry.loaded.write().insert("StubIndex".to_string(), Arc::clone(&provider));

    let guard = provider.mark_in_use();
    assert!(!registry.drop_provider("StubIndex").await);
    assert!(registry.get("StubIndex").is_some());

    drop(guard);
    assert!(registry.drop_provider("StubIndex").await);
    assert!(registry.get("StubIndex").is_none());
  }

  #[tokio::test]
  async fn test_drop_unknown_provider_is_noop() {
    let registry = registry_with_stub();
    assert!(!registry.drop_provider("Ghost").await);
  }
}
