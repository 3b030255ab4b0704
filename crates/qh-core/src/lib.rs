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

//! # qh-core
//!
//! Core types, configuration, and error handling for the QuoteHub platform.
//!
//! This crate provides the foundational components shared by the DataHub and
//! Registry services:
//!
//! - [`Config`] - service configuration (database, service URLs, sandbox paths)
//! - [`Error`] and [`Result`] - unified error handling with HTTP status mapping
//! - [`SystemContext`] / [`DerivedContext`] - HKDF-derived AES-GCM envelopes
//!   protecting provider secrets at rest
//! - [`TradingCalendar`] - market-session queries keyed by MIC
//! - [`types`] - asset class, interval, and asset-class-group vocabulary

pub mod calendar;
pub mod config;
pub mod context;
pub mod error;
pub mod types;

pub use calendar::TradingCalendar;
pub use config::Config;
pub use context::{DerivedContext, SystemContext};
pub use error::{Error, Result};
pub use types::{
  AssetClass, AssetClassGroup, Interval, normalize_asset_class, normalize_interval,
};
