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

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DataHubError {
  #[error("Provider error: {0}")]
  Provider(String),

  #[error("Scheduler error: {0}")]
  Scheduler(String),

  #[error("Invalid cron expression: {0}")]
  Cron(String),

  #[error("Database error: {0}")]
  Database(String),

  #[error("HTTP error: {0}")]
  Http(String),

  #[error("Registry sync failed: {0}")]
  RegistrySync(String),

  #[error("Job timed out: {0}")]
  Timeout(String),

  #[error(transparent)]
  Core(#[from] qh_core::Error),
}

impl From<diesel::result::Error> for DataHubError {
  fn from(err: diesel::result::Error) -> Self {
    DataHubError::Database(err.to_string())
  }
}

impl From<qh_database_postgres::connection::CheckoutError> for DataHubError {
  fn from(err: qh_database_postgres::connection::CheckoutError) -> Self {
    DataHubError::Database(err.to_string())
  }
}

impl From<reqwest::Error> for DataHubError {
  fn from(err: reqwest::Error) -> Self {
    DataHubError::Http(err.to_string())
  }
}

pub type DataHubResult<T> = Result<T, DataHubError>;

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_error_display_provider() {
    let err = DataHubError::Provider("EODHD failed to load".to_string());
    assert_eq!(err.to_string(), "Provider error: EODHD failed to load");
  }

  #[test]
  fn test_error_display_cron() {
    let err = DataHubError::Cron("too few fields".to_string());
    assert_eq!(err.to_string(), "Invalid cron expression: too few fields");
  }

  #[test]
  fn test_error_from_core_passes_through_message() {
    let err = DataHubError::from(qh_core::Error::NotFound("provider 'X'".to_string()));
    assert_eq!(err.to_string(), "Not found: provider 'X'");
  }
}
