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

//! Closed-set provider construction.
//!
//! Provider plugins are compiled into the binary and registered here by name.
//! The uploaded module file still gates activation (sandbox path plus SHA-256
//! hash verification happen in the provider registry before construction),
//! but the executable code is always the in-tree implementation.

use qh_core::{DerivedContext, Error, Result};
use std::collections::HashMap;
use std::sync::Arc;

use crate::provider::ProviderHandle;
use crate::types::ProviderSubtype;

type Ctor = Arc<dyn Fn(DerivedContext) -> Result<ProviderHandle> + Send + Sync>;

struct FactoryEntry {
  subtype: ProviderSubtype,
  ctor: Ctor,
}

/// Registry of provider constructors keyed by provider name.
#[derive(Default)]
pub struct ProviderFactory {
  entries: HashMap<String, FactoryEntry>,
}

impl ProviderFactory {
  pub fn new() -> Self {
    Self { entries: HashMap::new() }
  }

  /// Register a constructor for a provider name. Replaces any prior entry.
  pub fn register<F>(&mut self, name: &str, subtype: ProviderSubtype, ctor: F)
  where
    F: Fn(DerivedContext) -> Result<ProviderHandle> + Send + Sync + 'static,
  {
    self.entries.insert(name.to_string(), FactoryEntry { subtype, ctor: Arc::new(ctor) });
  }

  pub fn contains(&self, name: &str) -> bool {
    self.entries.contains_key(name)
  }

  pub fn subtype(&self, name: &str) -> Option<ProviderSubtype> {
    self.entries.get(name).map(|e| e.subtype)
  }

  /// Construct the provider, verifying the constructed instance reports the
  /// requested name.
  pub fn create(&self, name: &str, context: DerivedContext) -> Result<ProviderHandle> {
    let entry = self
      .entries
      .get(name)
      .ok_or_else(|| Error::NotFound(format!("provider class '{name}' is not built in")))?;
    let handle = (entry.ctor)(context)?;
    if handle.name() != name {
      return Err(Error::Provider(format!(
        "constructed provider reports name '{}', expected '{}'",
        handle.name(),
        name
      )));
    }
    Ok(handle)
  }
}

impl std::fmt::Debug for ProviderFactory {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("ProviderFactory").field("providers", &self.entries.len()).finish()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::provider::{DataProvider, IndexProvider};
  use crate::types::{Constituent, ProviderType, SymbolInfo};
  use async_trait::async_trait;
  use qh_core::SystemContext;

  struct NamedIndex(&'static str);

  #[async_trait]
  impl DataProvider for NamedIndex {
    fn name(&self) -> &str {
      self.0
    }
    fn provider_type(&self) -> ProviderType {
      ProviderType::Index
    }
    async fn get_available_symbols(&self) -> Result<Vec<SymbolInfo>> {
      Ok(vec![])
    }
  }

  #[async_trait]
  impl IndexProvider for NamedIndex {
    async fn fetch_constituents(&self, _as_of: Option<chrono::NaiveDate>) -> Result<Vec<Constituent>> {
      Ok(vec![])
    }
  }

  fn test_context() -> DerivedContext {
    let ctx = SystemContext::from_bytes(b"factory-test".to_vec()).unwrap();
    let (nonce, ciphertext) = ctx.create_context_data(&[1u8; 32], b"{}").unwrap();
    ctx.derived_context(&[1u8; 32], nonce, ciphertext).unwrap()
  }

  #[test]
  fn test_create_unknown_provider_fails() {
    let factory = ProviderFactory::new();
    assert!(factory.create("Ghost", test_context()).is_err());
  }

  #[test]
  fn test_create_checks_reported_name() {
    let mut factory = ProviderFactory::new();
    factory.register("CCI30", ProviderSubtype::IndexProvider, |_ctx| {
      Ok(ProviderHandle::Index(Arc::new(NamedIndex("Imposter"))))
    });
    assert!(factory.create("CCI30", test_context()).is_err());
  }

  #[test]
  fn test_create_returns_matching_provider() {
    let mut factory = ProviderFactory::new();
    factory.register("CCI30", ProviderSubtype::IndexProvider, |_ctx| {
      Ok(ProviderHandle::Index(Arc::new(NamedIndex("CCI30"))))
    });
    let handle = factory.create("CCI30", test_context()).unwrap();
    assert_eq!(handle.name(), "CCI30");
    assert_eq!(factory.subtype("CCI30"), Some(ProviderSubtype::IndexProvider));
  }
}
