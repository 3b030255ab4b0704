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

//! Secure context derivation for encrypting and decrypting provider secrets.
//!
//! Each uploaded provider module gets its own AES-256-GCM key derived from the
//! process-wide system context and the module's SHA-256 file hash via
//! HKDF-SHA256. A tampered or re-uploaded file therefore cannot decrypt the
//! secrets stored for the original one.

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use hkdf::Hkdf;
use rand::RngCore;
use sha2::Sha256;
use std::path::Path;
use tracing::error;

use crate::error::{Error, Result};

const NONCE_LEN: usize = 12;
const KEY_LEN: usize = 32;

/// Holds the raw system context and derives per-provider cipher keys.
///
/// Constructor-injected and lives for the process lifetime; there is no
/// hidden global.
#[derive(Clone)]
pub struct SystemContext {
  ikm: Vec<u8>,
}

impl std::fmt::Debug for SystemContext {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    // Never print key material
    f.debug_struct("SystemContext").finish_non_exhaustive()
  }
}

impl SystemContext {
  /// Load the system context from the secret file at `path`.
  ///
  /// Leading and trailing whitespace is stripped so a trailing newline in the
  /// mounted secret does not change the derived keys.
  pub fn load(path: &Path) -> Result<Self> {
    let raw = std::fs::read(path).map_err(|e| {
      error!("System context file {} could not be read: {}", path.display(), e);
      Error::Config(format!("system context file {} not readable", path.display()))
    })?;
    let ikm = trim_ascii(&raw).to_vec();
    if ikm.is_empty() {
      return Err(Error::Config(format!("system context file {} is empty", path.display())));
    }
    Ok(Self { ikm })
  }

  /// Construct from raw bytes (tests and embedded deployments).
  pub fn from_bytes(ikm: Vec<u8>) -> Result<Self> {
    if ikm.is_empty() {
      return Err(Error::Config("system context must not be empty".to_string()));
    }
    Ok(Self { ikm })
  }

  /// Derive the AES-GCM cipher for a provider file hash.
  ///
  /// HKDF-SHA256 with no salt, the file hash as info, and the system context
  /// bytes as input key material, expanded to a 32-byte key.
  pub fn derived_cipher(&self, file_hash: &[u8]) -> Result<Aes256Gcm> {
    let hk = Hkdf::<Sha256>::new(None, &self.ikm);
    let mut okm = [0u8; KEY_LEN];
    hk.expand(file_hash, &mut okm)
      .map_err(|e| Error::Crypto(format!("HKDF expand failed: {e}")))?;
    Aes256Gcm::new_from_slice(&okm).map_err(|e| Error::Crypto(format!("invalid key length: {e}")))
  }

  /// Encrypt a secrets payload for storage alongside a provider file.
  ///
  /// Returns the random nonce and the ciphertext.
  pub fn create_context_data(&self, file_hash: &[u8], data: &[u8]) -> Result<(Vec<u8>, Vec<u8>)> {
    let cipher = self.derived_cipher(file_hash)?;
    let mut nonce = [0u8; NONCE_LEN];
    rand::thread_rng().fill_bytes(&mut nonce);
    let ciphertext = cipher
      .encrypt(Nonce::from_slice(&nonce), data)
      .map_err(|e| Error::Crypto(format!("encryption failed: {e}")))?;
    Ok((nonce.to_vec(), ciphertext))
  }

  /// Build the decryption helper handed to a provider instance at load time.
  pub fn derived_context(
    &self,
    file_hash: &[u8],
    nonce: Vec<u8>,
    ciphertext: Vec<u8>,
  ) -> Result<DerivedContext> {
    Ok(DerivedContext { cipher: self.derived_cipher(file_hash)?, nonce, ciphertext })
  }
}

/// Decryption helper holding a derived AES context and the encrypted payload.
///
/// The plaintext is a JSON object of secret fields; [`DerivedContext::get`]
/// decrypts on demand so plaintext secrets never linger in memory.
#[derive(Clone)]
pub struct DerivedContext {
  cipher: Aes256Gcm,
  nonce: Vec<u8>,
  ciphertext: Vec<u8>,
}

impl std::fmt::Debug for DerivedContext {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("DerivedContext").finish_non_exhaustive()
  }
}

impl DerivedContext {
  /// Return a secret field from the encrypted JSON payload.
  pub fn get(&self, key: &str) -> Result<String> {
    let plaintext = self
      .cipher
      .decrypt(Nonce::from_slice(&self.nonce), self.ciphertext.as_slice())
      .map_err(|e| {
        error!("Error accessing derived context: {}", e);
        Error::Crypto(format!("decryption failed: {e}"))
      })?;
    let parsed: serde_json::Value = serde_json::from_slice(&plaintext)?;
    match parsed.get(key).and_then(|v| v.as_str()) {
      Some(v) => Ok(v.to_string()),
      None => Err(Error::Crypto(format!("key {key} not found in derived context"))),
    }
  }
}

fn trim_ascii(bytes: &[u8]) -> &[u8] {
  let start = bytes.iter().position(|b| !b.is_ascii_whitespace()).unwrap_or(bytes.len());
  let end = bytes.iter().rposition(|b| !b.is_ascii_whitespace()).map_or(start, |i| i + 1);
  &bytes[start..end]
}

#[cfg(test)]
mod tests {
  use super::*;

  fn test_context() -> SystemContext {
    SystemContext::from_bytes(b"unit-test-system-context".to_vec()).unwrap()
  }

  #[test]
  fn test_round_trip_secret_field() {
    let ctx = test_context();
    let hash = [7u8; 32];
    let secrets = br#"{"api_key": "k-123", "api_secret": "s-456"}"#;

    let (nonce, ciphertext) = ctx.create_context_data(&hash, secrets).unwrap();
    let derived = ctx.derived_context(&hash, nonce, ciphertext).unwrap();

    assert_eq!(derived.get("api_key").unwrap(), "k-123");
    assert_eq!(derived.get("api_secret").unwrap(), "s-456");
  }

  #[test]
  fn test_missing_key_is_an_error() {
    let ctx = test_context();
    let hash = [7u8; 32];
    let (nonce, ciphertext) = ctx.create_context_data(&hash, br#"{"api_key": "k"}"#).unwrap();
    let derived = ctx.derived_context(&hash, nonce, ciphertext).unwrap();
    assert!(derived.get("absent").is_err());
  }

  #[test]
  fn test_different_file_hash_cannot_decrypt() {
    let ctx = test_context();
    let (nonce, ciphertext) = ctx.create_context_data(&[1u8; 32], br#"{"k": "v"}"#).unwrap();
    let wrong = ctx.derived_context(&[2u8; 32], nonce, ciphertext).unwrap();
    assert!(wrong.get("k").is_err());
  }

  #[test]
  fn test_load_strips_trailing_newline() {
    use std::io::Write;
    let mut f = tempfile::NamedTempFile::new().unwrap();
    f.write_all(b"context-bytes\n").unwrap();

    let from_file = SystemContext::load(f.path()).unwrap();
    let from_bytes = SystemContext::from_bytes(b"context-bytes".to_vec()).unwrap();

    let hash = [9u8; 32];
    let (nonce, ciphertext) = from_bytes.create_context_data(&hash, br#"{"k": "v"}"#).unwrap();
    let derived = from_file.derived_context(&hash, nonce, ciphertext).unwrap();
    assert_eq!(derived.get("k").unwrap(), "v");
  }

  #[test]
  fn test_empty_context_rejected() {
    assert!(SystemContext::from_bytes(Vec::new()).is_err());
  }
}
