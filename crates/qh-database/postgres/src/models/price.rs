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

//! Bar rows for the `historical_data` and `live_data` hypertables.
//!
//! Primary key is `(ts, sym, interval, provider)`. The batch insert protocol
//! is: fast chunked multi-row insert first; on a unique violation the caller
//! acquires a fresh connection and retries through
//! `insert_ignore_duplicates`, which carries `ON CONFLICT DO NOTHING`.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use serde::{Deserialize, Serialize};

use crate::schema::{historical_data, live_data};

const BATCH_SIZE: usize = 1000;

#[derive(Queryable, Selectable, Identifiable, Debug, Clone, Serialize, Deserialize)]
#[diesel(table_name = historical_data)]
#[diesel(primary_key(ts, sym, interval, provider))]
pub struct HistoricalBar {
  pub ts: DateTime<Utc>,
  pub sym: String,
  pub provider: String,
  pub provider_class_type: String,
  pub interval: String,
  pub o: f64,
  pub h: f64,
  pub l: f64,
  pub c: f64,
  pub v: f64,
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = historical_data)]
pub struct NewHistoricalBar {
  pub ts: DateTime<Utc>,
  pub sym: String,
  pub provider: String,
  pub provider_class_type: String,
  pub interval: String,
  pub o: f64,
  pub h: f64,
  pub l: f64,
  pub c: f64,
  pub v: f64,
}

impl NewHistoricalBar {
  /// Fast path batch insert. Raises a unique violation on duplicate keys.
  pub async fn bulk_insert(
    conn: &mut diesel_async::AsyncPgConnection,
    records: &[NewHistoricalBar],
  ) -> Result<usize, diesel::result::Error> {
    use diesel::insert_into;

    let mut total_inserted = 0;
    for chunk in records.chunks(BATCH_SIZE) {
      let inserted = insert_into(historical_data::table).values(chunk).execute(conn).await?;
      total_inserted += inserted;
    }
    Ok(total_inserted)
  }

  /// Duplicate-tolerant fallback insert.
  pub async fn insert_ignore_duplicates(
    conn: &mut diesel_async::AsyncPgConnection,
    records: &[NewHistoricalBar],
  ) -> Result<usize, diesel::result::Error> {
    use diesel::insert_into;

    let mut total_inserted = 0;
    for chunk in records.chunks(BATCH_SIZE) {
      let inserted = insert_into(historical_data::table)
        .values(chunk)
        .on_conflict_do_nothing()
        .execute(conn)
        .await?;
      total_inserted += inserted;
    }
    Ok(total_inserted)
  }
}

#[derive(Queryable, Selectable, Identifiable, Debug, Clone, Serialize, Deserialize)]
#[diesel(table_name = live_data)]
#[diesel(primary_key(ts, sym, interval, provider))]
pub struct LiveBar {
  pub ts: DateTime<Utc>,
  pub sym: String,
  pub provider: String,
  pub provider_class_type: String,
  pub interval: String,
  pub o: f64,
  pub h: f64,
  pub l: f64,
  pub c: f64,
  pub v: f64,
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = live_data)]
pub struct NewLiveBar {
  pub ts: DateTime<Utc>,
  pub sym: String,
  pub provider: String,
  pub provider_class_type: String,
  pub interval: String,
  pub o: f64,
  pub h: f64,
  pub l: f64,
  pub c: f64,
  pub v: f64,
}

impl NewLiveBar {
  /// Fast path batch insert. Raises a unique violation on duplicate keys.
  pub async fn bulk_insert(
    conn: &mut diesel_async::AsyncPgConnection,
    records: &[NewLiveBar],
  ) -> Result<usize, diesel::result::Error> {
    use diesel::insert_into;

    let mut total_inserted = 0;
    for chunk in records.chunks(BATCH_SIZE) {
      let inserted = insert_into(live_data::table).values(chunk).execute(conn).await?;
      total_inserted += inserted;
    }
    Ok(total_inserted)
  }

  /// Duplicate-tolerant fallback insert.
  pub async fn insert_ignore_duplicates(
    conn: &mut diesel_async::AsyncPgConnection,
    records: &[NewLiveBar],
  ) -> Result<usize, diesel::result::Error> {
    use diesel::insert_into;

    let mut total_inserted = 0;
    for chunk in records.chunks(BATCH_SIZE) {
      let inserted = insert_into(live_data::table)
        .values(chunk)
        .on_conflict_do_nothing()
        .execute(conn)
        .await?;
      total_inserted += inserted;
    }
    Ok(total_inserted)
  }
}
