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

//! # qh-registry
//!
//! The Registry: authoritative catalog of plugin code, discovered assets,
//! and cross-provider symbol identity.
//!
//! The asset-update pipeline discovers symbols through the DataHub, upserts
//! them with per-row savepoint isolation, resolves identity through the
//! two-phase [`matcher`], proposes `common_symbol` bindings through the
//! automated [`mapper`], and (for index providers) synchronizes constituents
//! through the shared [`membership`] diff engine. The read-only
//! [`suggestions`] scorer serves candidate mappings with cursor pagination.

pub mod datahub_client;
pub mod error;
pub mod mapper;
pub mod mappings;
pub mod matcher;
pub mod membership;
pub mod pagination;
pub mod pipeline;
pub mod schemas;
pub mod suggestions;

use qh_core::Config;
use qh_database_postgres::DbPool;
use std::time::Duration;

pub use error::{RegistryError, RegistryResult};
pub use mapper::AutomatedMapper;
pub use matcher::IdentityMatcher;
pub use schemas::UpdateAssetsResponse;

/// The Registry service: database pool plus the DataHub discovery client.
pub struct Registry {
  pub(crate) pool: DbPool,
  pub(crate) config: Config,
  pub(crate) http: reqwest::Client,
  pub(crate) matcher: IdentityMatcher,
  pub(crate) mapper: AutomatedMapper,
}

impl Registry {
  pub fn new(config: Config, pool: DbPool) -> Self {
    let http = reqwest::Client::builder()
      .timeout(Duration::from_secs(config.timeout_secs))
      .build()
      .expect("Failed to create HTTP client");
    Self { pool, config, http, matcher: IdentityMatcher, mapper: AutomatedMapper }
  }

  pub fn pool(&self) -> &DbPool {
    &self.pool
  }
}
