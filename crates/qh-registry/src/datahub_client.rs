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

//! DataHub discovery client: the Registry's view of
//! `/internal/providers/available-symbols` and
//! `/internal/providers/constituents`.

use qh_providers::{Constituent, SymbolInfo};
use serde::de::DeserializeOwned;
use tracing::{error, info, warn};

use crate::Registry;

/// Discovery failure with enough shape to drive the pipeline's status codes.
#[derive(Debug, Clone, PartialEq)]
pub enum DiscoveryError {
  /// Provider not found or not loaded in DataHub (404)
  NotFound(String),
  /// Provider does not support this discovery call (501)
  NotImplemented(String),
  /// Any other upstream status
  Status(u16, String),
  /// DataHub unreachable (503)
  Connect(String),
}

impl DiscoveryError {
  pub fn status(&self) -> u16 {
    match self {
      DiscoveryError::NotFound(_) => 404,
      DiscoveryError::NotImplemented(_) => 501,
      DiscoveryError::Status(status, _) => *status,
      DiscoveryError::Connect(_) => 503,
    }
  }

  pub fn message(&self) -> &str {
    match self {
      DiscoveryError::NotFound(m)
      | DiscoveryError::NotImplemented(m)
      | DiscoveryError::Status(_, m)
      | DiscoveryError::Connect(m) => m,
    }
  }
}

impl Registry {
  async fn fetch_items<T: DeserializeOwned>(
    &self,
    endpoint: &str,
    provider_name: &str,
  ) -> Result<Vec<T>, DiscoveryError> {
    let url = format!("{}{}", self.config.datahub_url, endpoint);
    let response = self
      .http
      .get(&url)
      .query(&[("provider_name", provider_name)])
      .send()
      .await
      .map_err(|e| {
        error!("Cannot connect to DataHub at {}: {}", url, e);
        DiscoveryError::Connect("Cannot connect to DataHub".to_string())
      })?;

    match response.status().as_u16() {
      200 => {
        let body: serde_json::Value = response.json().await.map_err(|e| {
          warn!("Invalid response format from DataHub: {}", e);
          DiscoveryError::Status(500, "Invalid response format from DataHub".to_string())
        })?;
        // Both the wrapped {"items": [...]} shape and a bare list are accepted
        let items = match body {
          serde_json::Value::Object(mut map) => match map.remove("items") {
            Some(serde_json::Value::Array(items)) => items,
            _ => {
              warn!("Invalid response format from DataHub (no items)");
              return Err(DiscoveryError::Status(
                500,
                "Invalid response format from DataHub".to_string(),
              ));
            }
          },
          serde_json::Value::Array(items) => items,
          _ => {
            warn!("Invalid response format from DataHub (not a list)");
            return Err(DiscoveryError::Status(
              500,
              "Invalid response format from DataHub".to_string(),
            ));
          }
        };
        let parsed: Vec<T> = items
          .into_iter()
          .filter_map(|item| match serde_json::from_value(item) {
            Ok(parsed) => Some(parsed),
            Err(e) => {
              warn!("Dropping malformed item from DataHub: {}", e);
              None
            }
          })
          .collect();
        info!("Received {} items from DataHub for {}.", parsed.len(), provider_name);
        Ok(parsed)
      }
      404 => {
        warn!("DataHub reported provider {} not found or not loaded.", provider_name);
        Err(DiscoveryError::NotFound(format!("DataHub: Provider {provider_name} not found/loaded")))
      }
      501 => {
        warn!("DataHub: Provider {} does not support this discovery call.", provider_name);
        Err(DiscoveryError::NotImplemented(format!(
          "DataHub: Provider {provider_name} does not support symbol discovery"
        )))
      }
      status => {
        let detail = response.text().await.unwrap_or_default();
        error!("Error fetching symbols from DataHub for {}: {} - {}", provider_name, status, detail);
        Err(DiscoveryError::Status(status, format!("DataHub error {status}")))
      }
    }
  }

  /// Available symbols for a provider, via DataHub.
  pub async fn fetch_available_symbols(
    &self,
    provider_name: &str,
  ) -> Result<Vec<SymbolInfo>, DiscoveryError> {
    self.fetch_items("/internal/providers/available-symbols", provider_name).await
  }

  /// Index constituents for a provider, via DataHub.
  pub async fn fetch_constituents(
    &self,
    provider_name: &str,
  ) -> Result<Vec<Constituent>, DiscoveryError> {
    self.fetch_items("/internal/providers/constituents", provider_name).await
  }
}
