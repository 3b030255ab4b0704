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

//! Internal service-to-service handler cores.
//!
//! The HTTP layer is external plumbing; these methods carry the behavior
//! behind `/internal/providers/available-symbols`,
//! `/internal/providers/constituents`, and `/internal/provider/validate`.

use qh_core::{Error, Result};
use qh_providers::{Constituent, ProviderHandle, SymbolInfo};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{info, warn};

use crate::DataHub;

/// Validation result for an uploaded provider module file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProviderValidateResponse {
  pub status: String,
  pub class_name: String,
  pub subclass_type: String,
  pub module_name: String,
  pub file_path: String,
}

/// Strip the upload uniquifier prefix from a module stem.
///
/// Uploaded files are stored as `<8-char-id>_<original>.py`; the original
/// stem names the built-in provider class being activated.
pub(crate) fn provider_name_from_stem(stem: &str) -> &str {
  match stem.split_once('_') {
    Some((prefix, rest)) if prefix.len() == 8 && !rest.is_empty() => rest,
    _ => stem,
  }
}

impl DataHub {
  /// Symbols available on a provider, loading it on demand.
  pub async fn available_symbols(&self, provider_name: &str) -> Result<Vec<SymbolInfo>> {
    info!("API request: Get available symbols for provider '{}'", provider_name);
    let loaded = match self.registry.get(provider_name) {
      Some(loaded) => loaded,
      None => {
        let mut conn = self
          .pool
          .get()
          .await
          .map_err(|e| Error::Database(e.to_string()))?;
        if !self.registry.load(&mut conn, provider_name).await {
          warn!("Provider '{}' not found or not loaded for API request.", provider_name);
          return Err(Error::NotFound(format!("Provider '{provider_name}' not found or not loaded")));
        }
        self
          .registry
          .get(provider_name)
          .ok_or_else(|| Error::NotFound(format!("Provider '{provider_name}' not found or not loaded")))?
      }
    };

    let _guard = loaded.mark_in_use();
    loaded.limiter.acquire().await;
    loaded.handle.get_available_symbols().await
  }

  /// Constituents of an index provider, loading it on demand.
  pub async fn constituents(&self, provider_name: &str) -> Result<Vec<Constituent>> {
    info!("API request: Get constituents for provider '{}'", provider_name);
    let loaded = match self.registry.get(provider_name) {
      Some(loaded) => loaded,
      None => {
        let mut conn = self
          .pool
          .get()
          .await
          .map_err(|e| Error::Database(e.to_string()))?;
        if !self.registry.load(&mut conn, provider_name).await {
          return Err(Error::NotFound(format!("Provider '{provider_name}' not found or not loaded")));
        }
        self
          .registry
          .get(provider_name)
          .ok_or_else(|| Error::NotFound(format!("Provider '{provider_name}' not found or not loaded")))?
      }
    };

    let ProviderHandle::Index(p) = &loaded.handle else {
      return Err(Error::NotImplemented(format!(
        "Provider '{provider_name}' does not support constituent discovery"
      )));
    };

    let _guard = loaded.mark_in_use();
    loaded.limiter.acquire().await;
    p.fetch_constituents(None).await
  }

  /// Validate an uploaded provider module file against the built-in
  /// provider set.
  pub async fn validate_provider(&self, file_path: &str) -> Result<ProviderValidateResponse> {
    if file_path.is_empty() {
      return Err(Error::Validation("file path not provided to datahub".to_string()));
    }
    if !file_path.starts_with(self.registry.provider_dir()) {
      return Err(Error::PermissionDenied(format!(
        "File {} not in allowed path {}",
        file_path,
        self.registry.provider_dir()
      )));
    }
    let path = Path::new(file_path);
    if !path.is_file() {
      return Err(Error::NotFound(format!("File {file_path} not found")));
    }

    let module_name = path
      .file_stem()
      .and_then(|s| s.to_str())
      .ok_or_else(|| Error::Validation(format!("File {file_path} has no module name")))?;
    let class_name = provider_name_from_stem(module_name);

    let Some(subtype) = self.registry.factory().subtype(class_name) else {
      return Err(Error::Validation(format!(
        "No provider class named '{class_name}' is available in {file_path}"
      )));
    };
    if subtype.provider_type().is_none() {
      return Err(Error::Validation(format!(
        "Class '{class_name}' in {file_path} is not a valid provider subclass"
      )));
    }

    info!("Provider {} validated successfully.", class_name);
    Ok(ProviderValidateResponse {
      status: "success".to_string(),
      class_name: class_name.to_string(),
      subclass_type: subtype.as_str().to_string(),
      module_name: module_name.to_string(),
      file_path: file_path.to_string(),
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_provider_name_from_stem_strips_uniquifier() {
    assert_eq!(provider_name_from_stem("a1b2c3d4_Kraken"), "Kraken");
    assert_eq!(provider_name_from_stem("a1b2c3d4_My_Provider"), "My_Provider");
  }

  #[test]
  fn test_provider_name_from_stem_plain_names_pass_through() {
    assert_eq!(provider_name_from_stem("Kraken"), "Kraken");
    // A short prefix is not a uniquifier
    assert_eq!(provider_name_from_stem("ab_Kraken"), "ab_Kraken");
  }
}
