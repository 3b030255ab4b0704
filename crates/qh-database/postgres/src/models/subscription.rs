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

//! Provider subscriptions as the scheduler consumes them, plus per-symbol
//! historical watermark state.

use chrono::NaiveDate;
use diesel::sql_types::{Array, Date, Nullable, Text};
use diesel_async::RunQueryDsl;
use std::collections::HashMap;

/// One scheduler group: all symbols a provider pulls on one (interval, cron).
///
/// `syms` and `exchanges` are aligned by index; a symbol whose asset row has
/// no exchange carries a NULL there. Symbols missing from `assets` entirely
/// are dropped by the join.
#[derive(diesel::QueryableByName, Debug, Clone, PartialEq)]
pub struct SubscriptionGroup {
  #[diesel(sql_type = Text)]
  pub provider: String,
  #[diesel(sql_type = Text)]
  pub interval: String,
  #[diesel(sql_type = Text)]
  pub cron: String,
  #[diesel(sql_type = Array<Text>)]
  pub syms: Vec<String>,
  #[diesel(sql_type = Array<Nullable<Text>>)]
  pub exchanges: Vec<Option<String>>,
}

const GET_SUBSCRIPTIONS: &str = r#"
    SELECT ps.provider, ps.interval, ps.cron,
           array_agg(ps.sym ORDER BY ps.sym) AS syms,
           array_agg(a.exchange ORDER BY ps.sym) AS exchanges
    FROM provider_subscription ps
    JOIN assets a ON (
        ps.provider = a.class_name
        AND ps.provider_class_type = a.class_type
        AND ps.sym = a.symbol
    )
    GROUP BY ps.provider, ps.interval, ps.cron
"#;

impl SubscriptionGroup {
  /// Fetch the grouped subscription view.
  pub async fn fetch_all(
    conn: &mut diesel_async::AsyncPgConnection,
  ) -> Result<Vec<SubscriptionGroup>, diesel::result::Error> {
    diesel::sql_query(GET_SUBSCRIPTIONS).load(conn).await
  }
}

#[derive(diesel::QueryableByName, Debug, Clone)]
struct LastUpdatedRow {
  #[diesel(sql_type = Text)]
  sym: String,
  #[diesel(sql_type = Date)]
  d: NaiveDate,
}

const GET_LAST_UPDATED: &str = r#"
    SELECT sym, last_updated::date AS d
    FROM   historical_symbol_state
    WHERE  provider = $1
    AND  sym = ANY($2::text[])
"#;

/// Per-(provider, symbol) last-updated dates used for gap computation.
pub struct HistoricalSymbolState;

impl HistoricalSymbolState {
  pub async fn last_updated_map(
    conn: &mut diesel_async::AsyncPgConnection,
    provider: &str,
    symbols: &[String],
  ) -> Result<HashMap<String, NaiveDate>, diesel::result::Error> {
    let rows: Vec<LastUpdatedRow> = diesel::sql_query(GET_LAST_UPDATED)
      .bind::<Text, _>(provider)
      .bind::<Array<Text>, _>(symbols)
      .load(conn)
      .await?;
    Ok(rows.into_iter().map(|r| (r.sym, r.d)).collect())
  }
}
