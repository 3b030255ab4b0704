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

use crate::error::{Error, Result};
use dotenvy::dotenv;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

/// Default DataHub internal API base URL (service-to-service).
pub const DEFAULT_DATAHUB_URL: &str = "http://datahub:8080";

/// Default Registry API base URL (service-to-service).
pub const DEFAULT_REGISTRY_URL: &str = "http://registry:8080";

/// Directory uploaded provider modules must live under.
pub const DEFAULT_PROVIDER_DIR: &str = "/app/dynamic_providers";

/// Main configuration struct for QuoteHub services
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
  /// Postgres / TimescaleDB connection string
  pub database_url: String,

  /// DataHub internal API base URL
  pub datahub_url: String,

  /// Registry API base URL
  pub registry_url: String,

  /// Path to the system context secret file
  pub system_context_path: PathBuf,

  /// Sandbox prefix for uploaded provider modules
  pub provider_dir: String,

  /// Subscription refresh interval in seconds
  pub refresh_seconds: u64,

  /// Service-to-service HTTP timeout in seconds
  pub timeout_secs: u64,
}

impl Config {
  /// Load configuration from environment variables
  pub fn from_env() -> Result<Self> {
    dotenv().ok();

    let database_url =
      env::var("DATABASE_URL").map_err(|_| Error::Config("DATABASE_URL not set".to_string()))?;

    let datahub_url =
      env::var("QH_DATAHUB_URL").unwrap_or_else(|_| DEFAULT_DATAHUB_URL.to_string());

    let registry_url =
      env::var("QH_REGISTRY_URL").unwrap_or_else(|_| DEFAULT_REGISTRY_URL.to_string());

    let system_context_path = PathBuf::from(
      env::var("QH_SYSTEM_CONTEXT")
        .map_err(|_| Error::Config("QH_SYSTEM_CONTEXT not set".to_string()))?,
    );

    let provider_dir =
      env::var("QH_PROVIDER_DIR").unwrap_or_else(|_| DEFAULT_PROVIDER_DIR.to_string());

    let refresh_seconds = env::var("QH_REFRESH_SECONDS")
      .unwrap_or_else(|_| "30".to_string())
      .parse()
      .map_err(|_| Error::Config("Invalid QH_REFRESH_SECONDS".to_string()))?;

    let timeout_secs = env::var("QH_TIMEOUT_SECS")
      .unwrap_or_else(|_| "30".to_string())
      .parse()
      .map_err(|_| Error::Config("Invalid QH_TIMEOUT_SECS".to_string()))?;

    Ok(Config {
      database_url,
      datahub_url,
      registry_url,
      system_context_path,
      provider_dir,
      refresh_seconds,
      timeout_secs,
    })
  }

  /// Create a config with default values (for testing)
  pub fn default_with_database(database_url: String) -> Self {
    Config {
      database_url,
      datahub_url: DEFAULT_DATAHUB_URL.to_string(),
      registry_url: DEFAULT_REGISTRY_URL.to_string(),
      system_context_path: PathBuf::from("/run/secrets/qh_system_context"),
      provider_dir: DEFAULT_PROVIDER_DIR.to_string(),
      refresh_seconds: 30,
      timeout_secs: 30,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_config_defaults() {
    let config = Config::default_with_database("postgresql://pg:pg@localhost/pg".to_string());
    assert_eq!(config.datahub_url, DEFAULT_DATAHUB_URL);
    assert_eq!(config.registry_url, DEFAULT_REGISTRY_URL);
    assert_eq!(config.provider_dir, DEFAULT_PROVIDER_DIR);
    assert_eq!(config.refresh_seconds, 30);
  }
}
