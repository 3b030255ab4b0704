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

//! # qh-providers
//!
//! Data provider plugin interface consumed by the DataHub collector.
//!
//! Providers come in three capability variants: historical (finite bar
//! streams over date ranges), realtime (websocket bar collection around
//! interval close), and index (constituent snapshots). Each variant is a
//! trait; [`ProviderHandle`] is the tagged union the DataHub schedules and
//! dispatches against. Plugins are constructed through the closed-set
//! [`ProviderFactory`] rather than loaded from arbitrary code.

pub mod boundary;
pub mod factory;
pub mod limiter;
pub mod live;
pub mod provider;
pub mod types;

pub use boundary::next_interval_boundary;
pub use factory::ProviderFactory;
pub use limiter::ProviderLimiter;
pub use live::RealtimeProvider;
pub use provider::{BarStream, DataProvider, HistoricalProvider, IndexProvider, ProviderHandle};
pub use types::{Bar, Constituent, ProviderSubtype, ProviderType, RateLimit, Req, SymbolInfo};
