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

//! Live data providers: websocket bar collection around interval close.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use futures::{SinkExt, StreamExt};
use qh_core::{Error, Interval, Result};
use std::collections::HashMap;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{info, warn};

use crate::boundary::next_interval_boundary;
use crate::provider::DataProvider;
use crate::types::Bar;

/// Websocket connection type shared by all live providers.
pub type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Live data providers collect one bar per symbol around interval close.
///
/// Implementations supply the websocket specifics (connection, subscribe and
/// unsubscribe payloads, message parsing); the provided
/// [`RealtimeProvider::get_data`] runs the collection protocol:
/// connect, subscribe, listen until cutoff, unsubscribe, close.
#[async_trait]
pub trait RealtimeProvider: DataProvider {
  /// Seconds to keep listening for messages after bar close.
  fn close_buffer_seconds(&self) -> i64;

  /// Establish the websocket connection.
  async fn connect(&self) -> Result<WsStream>;

  /// Websocket subscribe payload for the given symbols.
  fn subscribe_payload(&self, interval: Interval, symbols: &[String]) -> Result<serde_json::Value>;

  /// Websocket unsubscribe payload for the given symbols.
  fn unsubscribe_payload(&self, symbols: &[String]) -> Result<serde_json::Value>;

  /// Parse a websocket message and extract OHLCV + timestamp data.
  fn parse_message(&self, message: &str) -> Result<Vec<Bar>>;

  /// Collect live bars for the given symbols.
  ///
  /// The cutoff is the next even interval boundary plus
  /// `close_buffer_seconds`. Bars stamped after the boundary are discarded;
  /// for each symbol the latest remaining bar wins.
  async fn get_data(&self, interval: Interval, symbols: Vec<String>) -> Result<Vec<Bar>> {
    let mut conn = self.connect().await?;

    info!("Subscribing to {} symbols on {} WebSocket API", symbols.len(), self.name());
    let subscribe = self.subscribe_payload(interval, &symbols)?;
    conn
      .send(Message::Text(subscribe.to_string()))
      .await
      .map_err(|e| Error::Provider(format!("subscribe send failed: {e}")))?;

    let bar_end = next_interval_boundary(interval, Utc::now());
    let cutoff = bar_end + Duration::seconds(self.close_buffer_seconds());

    let mut symbol_bars: HashMap<String, Bar> = HashMap::new();
    loop {
      let now = Utc::now();
      if now >= cutoff {
        break;
      }
      let remaining = (cutoff - now).to_std().unwrap_or_default();
      match tokio::time::timeout(remaining, conn.next()).await {
        Err(_) => break, // cutoff reached while waiting
        Ok(None) => {
          warn!("{} websocket closed before cutoff", self.name());
          break;
        }
        Ok(Some(Ok(Message::Text(text)))) => match self.parse_message(&text) {
          Ok(bars) => {
            for bar in bars {
              if bar.ts > bar_end {
                continue;
              }
              symbol_bars.insert(bar.sym.clone(), bar);
            }
          }
          Err(e) => warn!("{}: unparseable message dropped: {}", self.name(), e),
        },
        Ok(Some(Ok(_))) => continue, // ping/pong/binary frames
        Ok(Some(Err(e))) => {
          warn!("{} websocket error: {}", self.name(), e);
          break;
        }
      }
    }

    info!("Unsubscribing from {} symbols on {} WebSocket API", symbols.len(), self.name());
    if let Ok(unsubscribe) = self.unsubscribe_payload(&symbols) {
      if let Err(e) = conn.send(Message::Text(unsubscribe.to_string())).await {
        warn!("Error unsubscribing from {} symbols: {}", symbols.len(), e);
      }
    }
    let _ = conn.close(None).await;

    let missing: Vec<_> = symbols.iter().filter(|s| !symbol_bars.contains_key(*s)).collect();
    if !missing.is_empty() {
      warn!("Did not receive bars for {} symbols: {:?}", missing.len(), missing);
    }

    Ok(symbol_bars.into_values().collect())
  }
}
