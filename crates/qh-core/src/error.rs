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
pub enum Error {
  #[error("Environment variable error: {0}")]
  EnvVar(#[from] std::env::VarError),

  #[error("Configuration error: {0}")]
  Config(String),

  #[error("Not found: {0}")]
  NotFound(String),

  #[error("Conflict: {0}")]
  Conflict(String),

  #[error("Missing reference: {0}")]
  ForeignKey(String),

  #[error("Validation error: {0}")]
  Validation(String),

  #[error("Invalid file type: {0}")]
  FileType(String),

  #[error("Permission denied: {0}")]
  PermissionDenied(String),

  #[error("Upstream service failure: {0}")]
  Upstream(String),

  #[error("Not implemented: {0}")]
  NotImplemented(String),

  #[error("Database error: {0}")]
  Database(String),

  #[error("Crypto error: {0}")]
  Crypto(String),

  #[error("Provider error: {0}")]
  Provider(String),

  #[error("Operation timed out: {0}")]
  Timeout(String),

  #[error("Serialization error")]
  Serde(#[from] serde_json::Error),

  #[error("Date parsing error")]
  ParseDate(#[from] chrono::ParseError),

  #[error("IO error: {0}")]
  Io(#[from] std::io::Error),
}

impl Error {
  /// HTTP status the error maps to when surfaced in a request context.
  pub fn http_status(&self) -> u16 {
    match self {
      Error::NotFound(_) | Error::ForeignKey(_) => 404,
      Error::Conflict(_) => 409,
      Error::Validation(_) => 400,
      Error::FileType(_) => 415,
      Error::PermissionDenied(_) => 403,
      Error::Upstream(_) => 502,
      Error::NotImplemented(_) => 501,
      Error::Timeout(_) => 504,
      _ => 500,
    }
  }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_error_display_config() {
    let err = Error::Config("invalid refresh interval".to_string());
    assert_eq!(err.to_string(), "Configuration error: invalid refresh interval");
  }

  #[test]
  fn test_error_display_not_found() {
    let err = Error::NotFound("provider 'EODHD'".to_string());
    assert_eq!(err.to_string(), "Not found: provider 'EODHD'");
  }

  #[test]
  fn test_error_display_conflict() {
    let err = Error::Conflict("common symbol already mapped".to_string());
    assert_eq!(err.to_string(), "Conflict: common symbol already mapped");
  }

  #[test]
  fn test_error_display_validation() {
    let err = Error::Validation("unknown asset class".to_string());
    assert_eq!(err.to_string(), "Validation error: unknown asset class");
  }

  #[test]
  fn test_error_display_permission_denied() {
    let err = Error::PermissionDenied("file outside sandbox".to_string());
    assert_eq!(err.to_string(), "Permission denied: file outside sandbox");
  }

  #[test]
  fn test_error_display_upstream() {
    let err = Error::Upstream("DataHub returned non-JSON".to_string());
    assert_eq!(err.to_string(), "Upstream service failure: DataHub returned non-JSON");
  }

  #[test]
  fn test_http_status_mapping() {
    assert_eq!(Error::NotFound("x".into()).http_status(), 404);
    assert_eq!(Error::ForeignKey("x".into()).http_status(), 404);
    assert_eq!(Error::Conflict("x".into()).http_status(), 409);
    assert_eq!(Error::Validation("x".into()).http_status(), 400);
    assert_eq!(Error::FileType("x".into()).http_status(), 415);
    assert_eq!(Error::PermissionDenied("x".into()).http_status(), 403);
    assert_eq!(Error::Upstream("x".into()).http_status(), 502);
    assert_eq!(Error::NotImplemented("x".into()).http_status(), 501);
    assert_eq!(Error::Database("x".into()).http_status(), 500);
  }

  #[test]
  fn test_error_from_serde_json() {
    let json_err = serde_json::from_str::<String>("invalid").unwrap_err();
    let err = Error::from(json_err);
    assert!(matches!(err, Error::Serde(_)));
    assert_eq!(err.to_string(), "Serialization error");
  }

  #[test]
  fn test_result_type_alias() {
    fn returns_ok() -> Result<i32> {
      Ok(42)
    }
    fn returns_err() -> Result<i32> {
      Err(Error::Config("test".to_string()))
    }
    assert_eq!(returns_ok().unwrap(), 42);
    assert!(returns_err().is_err());
  }
}
