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
pub enum RegistryError {
  #[error("Not found: {0}")]
  NotFound(String),

  #[error("Conflict: {0}")]
  Conflict(String),

  #[error("Missing reference: {0}")]
  ForeignKey(String),

  #[error("Validation error: {0}")]
  Validation(String),

  #[error("Permission denied: {0}")]
  PermissionDenied(String),

  #[error("Upstream service failure: {0}")]
  Upstream(String),

  #[error("Database error: {0}")]
  Database(String),

  #[error(transparent)]
  Core(#[from] qh_core::Error),
}

impl RegistryError {
  /// HTTP status the error maps to in a request context.
  pub fn http_status(&self) -> u16 {
    match self {
      RegistryError::NotFound(_) | RegistryError::ForeignKey(_) => 404,
      RegistryError::Conflict(_) => 409,
      RegistryError::Validation(_) => 400,
      RegistryError::PermissionDenied(_) => 403,
      RegistryError::Upstream(_) => 502,
      RegistryError::Database(_) => 500,
      RegistryError::Core(e) => e.http_status(),
    }
  }
}

impl From<diesel::result::Error> for RegistryError {
  fn from(err: diesel::result::Error) -> Self {
    RegistryError::Database(err.to_string())
  }
}

impl From<qh_database_postgres::connection::CheckoutError> for RegistryError {
  fn from(err: qh_database_postgres::connection::CheckoutError) -> Self {
    RegistryError::Database(err.to_string())
  }
}

pub type RegistryResult<T> = Result<T, RegistryError>;

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_http_status_mapping() {
    assert_eq!(RegistryError::NotFound("x".into()).http_status(), 404);
    assert_eq!(RegistryError::ForeignKey("x".into()).http_status(), 404);
    assert_eq!(RegistryError::Conflict("x".into()).http_status(), 409);
    assert_eq!(RegistryError::Validation("x".into()).http_status(), 400);
    assert_eq!(RegistryError::PermissionDenied("x".into()).http_status(), 403);
    assert_eq!(RegistryError::Upstream("x".into()).http_status(), 502);
    assert_eq!(RegistryError::Database("x".into()).http_status(), 500);
  }

  #[test]
  fn test_core_error_status_passes_through() {
    let err = RegistryError::Core(qh_core::Error::FileType("only .py files".into()));
    assert_eq!(err.http_status(), 415);
  }
}
