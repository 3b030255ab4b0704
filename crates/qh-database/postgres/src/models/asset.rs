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

//! Asset rows: one tradable symbol as seen by one provider.
//!
//! `asset_class_group`, `sym_norm_full`, and `sym_norm_root` are generated
//! columns and never written from here. Identity invariant: a provider-sourced
//! `primary_id` is never overwritten, neither by a later discovery run without
//! an id nor by the matcher apply step.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::sql_types::{Bool, Nullable, Text};
use diesel_async::RunQueryDsl;
use serde::{Deserialize, Serialize};

use crate::schema::assets;

#[derive(Queryable, Selectable, Identifiable, Debug, Clone, Serialize, Deserialize)]
#[diesel(table_name = assets)]
pub struct Asset {
  pub id: i32,
  pub class_name: String,
  pub class_type: String,
  pub external_id: Option<String>,
  pub primary_id: Option<String>,
  pub primary_id_source: Option<String>,
  pub symbol: String,
  pub matcher_symbol: Option<String>,
  pub name: Option<String>,
  pub exchange: Option<String>,
  pub asset_class: Option<String>,
  pub base_currency: Option<String>,
  pub quote_currency: Option<String>,
  pub country: Option<String>,
  pub identity_conf: Option<f64>,
  pub identity_match_type: Option<String>,
  pub identity_updated_at: Option<DateTime<Utc>>,
  pub asset_class_group: Option<String>,
  pub sym_norm_full: Option<String>,
  pub sym_norm_root: Option<String>,
}

/// Discovery payload for one symbol, already normalized by the caller.
#[derive(Debug, Clone, Default)]
pub struct AssetUpsert {
  pub class_name: String,
  pub class_type: String,
  pub external_id: Option<String>,
  pub primary_id: Option<String>,
  pub symbol: String,
  pub matcher_symbol: String,
  pub name: Option<String>,
  pub exchange: Option<String>,
  pub asset_class: Option<String>,
  pub base_currency: Option<String>,
  pub quote_currency: Option<String>,
  pub country: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
  Inserted,
  Updated,
}

#[derive(QueryableByName)]
struct UpsertRow {
  #[diesel(sql_type = Bool)]
  inserted: bool,
}

// Upsert preserving identity: primary_id/primary_id_source only change when
// the provider supplies an id (xmax = 0 distinguishes insert from update).
const UPSERT_ASSET: &str = r#"
    INSERT INTO assets (
        class_name, class_type, external_id, primary_id, primary_id_source, symbol,
        matcher_symbol, name, exchange, asset_class,
        base_currency, quote_currency, country
    ) VALUES (
        $1, $2, $3, $4::TEXT,
        CASE WHEN $4::TEXT IS NOT NULL THEN 'provider' ELSE NULL END,
        $5, $6, $7, $8, $9, $10, $11, $12
    )
    ON CONFLICT (class_name, class_type, symbol) DO UPDATE SET
        external_id = EXCLUDED.external_id,
        primary_id = CASE
            WHEN EXCLUDED.primary_id IS NOT NULL THEN EXCLUDED.primary_id
            ELSE assets.primary_id
        END,
        primary_id_source = CASE
            WHEN EXCLUDED.primary_id IS NOT NULL THEN 'provider'
            ELSE assets.primary_id_source
        END,
        matcher_symbol = EXCLUDED.matcher_symbol,
        name = EXCLUDED.name,
        exchange = EXCLUDED.exchange,
        asset_class = EXCLUDED.asset_class,
        base_currency = EXCLUDED.base_currency,
        quote_currency = EXCLUDED.quote_currency,
        country = EXCLUDED.country
    RETURNING (xmax = 0) AS inserted
"#;

impl Asset {
  /// Upsert one discovered symbol, reporting whether the row was new.
  pub async fn upsert_from_discovery(
    conn: &mut diesel_async::AsyncPgConnection,
    row: &AssetUpsert,
  ) -> Result<UpsertOutcome, diesel::result::Error> {
    let result: UpsertRow = diesel::sql_query(UPSERT_ASSET)
      .bind::<Text, _>(&row.class_name)
      .bind::<Text, _>(&row.class_type)
      .bind::<Nullable<Text>, _>(row.external_id.as_deref())
      .bind::<Nullable<Text>, _>(row.primary_id.as_deref())
      .bind::<Text, _>(&row.symbol)
      .bind::<Text, _>(&row.matcher_symbol)
      .bind::<Nullable<Text>, _>(row.name.as_deref())
      .bind::<Nullable<Text>, _>(row.exchange.as_deref())
      .bind::<Nullable<Text>, _>(row.asset_class.as_deref())
      .bind::<Nullable<Text>, _>(row.base_currency.as_deref())
      .bind::<Nullable<Text>, _>(row.quote_currency.as_deref())
      .bind::<Nullable<Text>, _>(row.country.as_deref())
      .get_result(conn)
      .await?;
    Ok(if result.inserted { UpsertOutcome::Inserted } else { UpsertOutcome::Updated })
  }

  /// Matcher apply step: set identity fields only while `primary_id` is
  /// still NULL. Returns the number of rows updated (0 == skipped).
  pub async fn apply_identity_match(
    conn: &mut diesel_async::AsyncPgConnection,
    asset_id: i32,
    new_primary_id: &str,
    confidence: f64,
    match_type: &str,
  ) -> Result<usize, diesel::result::Error> {
    use crate::schema::assets::dsl::*;

    diesel::update(assets.filter(id.eq(asset_id)).filter(primary_id.is_null()))
      .set((
        primary_id.eq(new_primary_id),
        primary_id_source.eq("matcher"),
        identity_conf.eq(confidence),
        identity_match_type.eq(match_type),
        identity_updated_at.eq(diesel::dsl::now),
      ))
      .execute(conn)
      .await
  }
}
