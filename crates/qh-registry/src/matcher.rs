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

//! Identity matching: resolve provider symbols to canonical primary IDs
//! against the identity manifest.
//!
//! Two phases per asset-class group. Phase 1 joins each asset's
//! `matcher_symbol` against the manifest's semicolon-delimited alias lists
//! (array overlap, index-friendly). Phase 2 runs GIN-trigram fuzzy
//! similarity over the remainder in bounded batches, scoring symbol
//! similarity tiers plus exchange and name boosts, and keeps only the best
//! candidate per asset at or above the auto-accept threshold.

use diesel::sql_types::{Array, Double, Integer, Nullable, Text};
use diesel_async::RunQueryDsl;
use tracing::info;

use crate::error::RegistryResult;

// Matching parameters (tuned via empirical testing)
pub const SYM_BOOST: f64 = 50.0;
pub const EXCHANGE_BOOST: f64 = 35.0;
pub const NAME_BOOST: f64 = 8.0;
pub const FUZZY_THRESHOLD: f64 = 0.35;
pub const AUTO_THRESHOLD: f64 = 80.0;
pub const FUZZY_BATCH_SIZE: usize = 100;

/// One unidentified asset eligible for matching.
#[derive(diesel::QueryableByName, Debug, Clone, PartialEq)]
pub struct UnidentifiedAsset {
  #[diesel(sql_type = Integer)]
  pub id: i32,
  #[diesel(sql_type = Text)]
  pub symbol: String,
  #[diesel(sql_type = Nullable<Text>)]
  pub name: Option<String>,
  #[diesel(sql_type = Nullable<Text>)]
  pub exchange: Option<String>,
  #[diesel(sql_type = Text)]
  pub asset_class_group: String,
  #[diesel(sql_type = Nullable<Text>)]
  pub matcher_symbol: Option<String>,
}

/// A matching result for one asset.
#[derive(diesel::QueryableByName, Debug, Clone, PartialEq)]
pub struct MatchResult {
  #[diesel(sql_type = Integer)]
  pub asset_id: i32,
  #[diesel(sql_type = Text)]
  pub primary_id: String,
  #[diesel(sql_type = Text)]
  pub identity_symbol: String,
  #[diesel(sql_type = Nullable<Text>)]
  pub identity_name: Option<String>,
  #[diesel(sql_type = Double)]
  pub confidence: f64,
  #[diesel(sql_type = Text)]
  pub match_type: String,
}

const SELECT_UNIDENTIFIED_FOR_CLASS: &str = r#"
    SELECT id, symbol, name, exchange, asset_class_group, matcher_symbol
    FROM assets
    WHERE class_name = $1 AND class_type = $2
      AND primary_id IS NULL
      AND asset_class_group IS NOT NULL
"#;

const SELECT_UNIDENTIFIED_ALL: &str = r#"
    SELECT id, symbol, name, exchange, asset_class_group, matcher_symbol
    FROM assets
    WHERE primary_id IS NULL
      AND asset_class_group IS NOT NULL
"#;

const EXACT_MATCH: &str = r#"
    WITH input AS (
        SELECT unnest($1::int[]) as id, unnest($2::text[]) as matcher_symbol
    )
    SELECT
        i.id as asset_id,
        im.primary_id,
        im.symbol as identity_symbol,
        im.name as identity_name,
        100.0::float8 as confidence,
        'exact_alias' as match_type
    FROM input i
    JOIN identity_manifest im ON (
        im.asset_class_group = $3 AND
        string_to_array(im.symbol, ';') && ARRAY[i.matcher_symbol]
    )
"#;

const FUZZY_MATCH: &str = r#"
    WITH asset_input AS (
        SELECT
            unnest($1::int[]) as id,
            unnest($2::text[]) as matcher_symbol,
            unnest($3::text[]) as name,
            unnest($4::text[]) as exchange
    ),
    candidates AS (
        SELECT
            ai.id as asset_id,
            ai.matcher_symbol,
            ai.name as asset_name,
            ai.exchange as asset_exchange,
            cand.primary_id,
            cand.symbol as identity_symbol,
            cand.name as identity_name,
            cand.exchange as identity_exchange,
            cand.sym_sim
        FROM asset_input ai
        CROSS JOIN LATERAL (
            SELECT
                im.primary_id,
                im.symbol,
                im.name,
                im.exchange,
                similarity(ai.matcher_symbol, im.symbol) as sym_sim
            FROM identity_manifest im
            WHERE im.asset_class_group = $5
              AND im.symbol % ai.matcher_symbol
            LIMIT 20
        ) cand
    ),
    scored AS (
        SELECT
            asset_id,
            primary_id,
            identity_symbol,
            identity_name,
            (
                CASE
                    WHEN sym_sim > 0.8 THEN 80.0
                    WHEN sym_sim > 0.6 THEN 60.0
                    ELSE sym_sim * $6
                END +
                CASE WHEN asset_exchange = identity_exchange THEN $7 ELSE 0.0 END +
                COALESCE(similarity(asset_name, identity_name), 0) * $8
            )::float8 as confidence,
            'fuzzy_symbol' as match_type
        FROM candidates
    ),
    ranked AS (
        SELECT
            asset_id,
            primary_id,
            identity_symbol,
            identity_name,
            confidence,
            match_type,
            ROW_NUMBER() OVER (
                PARTITION BY asset_id
                ORDER BY confidence DESC
            ) as rn
        FROM scored
    )
    SELECT
        asset_id,
        primary_id,
        identity_symbol,
        identity_name,
        confidence,
        match_type
    FROM ranked
    WHERE rn = 1
      AND confidence >= $9
    ORDER BY confidence DESC
"#;

/// Two-phase identity matcher over the identity manifest.
pub struct IdentityMatcher;

impl IdentityMatcher {
  /// Identify unidentified assets for a specific provider/broker.
  pub async fn identify_unidentified_assets(
    &self,
    conn: &mut diesel_async::AsyncPgConnection,
    class_name: &str,
    class_type: &str,
  ) -> RegistryResult<Vec<MatchResult>> {
    info!("IdentityMatcher: Identifying assets for {} ({})", class_name, class_type);

    let rows: Vec<UnidentifiedAsset> = diesel::sql_query(SELECT_UNIDENTIFIED_FOR_CLASS)
      .bind::<Text, _>(class_name)
      .bind::<Text, _>(class_type)
      .load(conn)
      .await?;

    if rows.is_empty() {
      info!("No unidentified assets found for {}", class_name);
      return Ok(vec![]);
    }
    self.process_matching(conn, rows).await
  }

  /// Identify all unidentified assets across all providers.
  pub async fn identify_all_unidentified_assets(
    &self,
    conn: &mut diesel_async::AsyncPgConnection,
  ) -> RegistryResult<Vec<MatchResult>> {
    info!("IdentityMatcher: Identifying all unidentified assets");

    let rows: Vec<UnidentifiedAsset> =
      diesel::sql_query(SELECT_UNIDENTIFIED_ALL).load(conn).await?;

    if rows.is_empty() {
      info!("No unidentified assets found");
      return Ok(vec![]);
    }
    self.process_matching(conn, rows).await
  }

  /// Run the matching pipeline by asset class group.
  async fn process_matching(
    &self,
    conn: &mut diesel_async::AsyncPgConnection,
    asset_rows: Vec<UnidentifiedAsset>,
  ) -> RegistryResult<Vec<MatchResult>> {
    let mut results = Vec::new();
    for group in ["securities", "crypto"] {
      let assets: Vec<&UnidentifiedAsset> =
        asset_rows.iter().filter(|r| r.asset_class_group == group).collect();
      if !assets.is_empty() {
        results.extend(self.run_matching_for_group(conn, &assets, group).await?);
      }
    }
    Ok(results)
  }

  /// Two-phase matching for one asset class group.
  async fn run_matching_for_group(
    &self,
    conn: &mut diesel_async::AsyncPgConnection,
    assets: &[&UnidentifiedAsset],
    group: &str,
  ) -> RegistryResult<Vec<MatchResult>> {
    let exact_results = self.run_exact_matching(conn, assets, group).await?;
    let matched_ids: std::collections::HashSet<i32> =
      exact_results.iter().map(|r| r.asset_id).collect();
    let unmatched: Vec<&UnidentifiedAsset> =
      assets.iter().filter(|a| !matched_ids.contains(&a.id)).copied().collect();

    let mut fuzzy_results = Vec::new();
    for batch in unmatched.chunks(FUZZY_BATCH_SIZE) {
      fuzzy_results.extend(self.process_fuzzy_batch(conn, batch, group).await?);
    }

    info!(
      "IdentityMatcher: group={}, assets={}, exact={}, fuzzy={}",
      group,
      assets.len(),
      exact_results.len(),
      fuzzy_results.len()
    );

    let mut results = exact_results;
    results.extend(fuzzy_results);
    Ok(results)
  }

  /// Exact alias/symbol matching via array overlap.
  async fn run_exact_matching(
    &self,
    conn: &mut diesel_async::AsyncPgConnection,
    assets: &[&UnidentifiedAsset],
    group: &str,
  ) -> RegistryResult<Vec<MatchResult>> {
    let asset_ids: Vec<i32> = assets.iter().map(|a| a.id).collect();
    let matcher_symbols: Vec<String> =
      assets.iter().map(|a| a.matcher_symbol.clone().unwrap_or_else(|| a.symbol.clone())).collect();

    let rows = diesel::sql_query(EXACT_MATCH)
      .bind::<Array<Integer>, _>(&asset_ids)
      .bind::<Array<Text>, _>(&matcher_symbols)
      .bind::<Text, _>(group)
      .load(conn)
      .await?;
    Ok(rows)
  }

  /// One fuzzy batch against the GIN trigram index.
  async fn process_fuzzy_batch(
    &self,
    conn: &mut diesel_async::AsyncPgConnection,
    assets: &[&UnidentifiedAsset],
    group: &str,
  ) -> RegistryResult<Vec<MatchResult>> {
    let asset_ids: Vec<i32> = assets.iter().map(|a| a.id).collect();
    let matcher_symbols: Vec<String> =
      assets.iter().map(|a| a.matcher_symbol.clone().unwrap_or_else(|| a.symbol.clone())).collect();
    let names: Vec<String> = assets.iter().map(|a| a.name.clone().unwrap_or_default()).collect();
    let exchanges: Vec<String> =
      assets.iter().map(|a| a.exchange.clone().unwrap_or_default()).collect();

    diesel::sql_query(format!("SET pg_trgm.similarity_threshold = {FUZZY_THRESHOLD}"))
      .execute(conn)
      .await?;

    let rows = diesel::sql_query(FUZZY_MATCH)
      .bind::<Array<Integer>, _>(&asset_ids)
      .bind::<Array<Text>, _>(&matcher_symbols)
      .bind::<Array<Text>, _>(&names)
      .bind::<Array<Text>, _>(&exchanges)
      .bind::<Text, _>(group)
      .bind::<Double, _>(SYM_BOOST)
      .bind::<Double, _>(EXCHANGE_BOOST)
      .bind::<Double, _>(NAME_BOOST)
      .bind::<Double, _>(AUTO_THRESHOLD)
      .load(conn)
      .await?;
    Ok(rows)
  }
}
