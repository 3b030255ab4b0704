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

//! Mapping-suggestion scorer.
//!
//! One SQL statement built from UNION ALL branches so every join condition
//! (primary id, external id, normalized root, normalized full symbol) uses
//! its own index; an OR'd join would collapse those access paths. DISTINCT ON
//! keeps the highest-scoring branch per (source, target) pair, and keyset
//! cursor pagination orders by `score DESC, source_symbol, target_symbol`.

use diesel::sql_types::{BigInt, Double, Nullable, Text};
use diesel_async::RunQueryDsl;
use tracing::{info, warn};

use crate::Registry;
use crate::error::RegistryResult;
use crate::pagination::{decode_cursor, encode_cursor};
use crate::schemas::{SuggestionItem, SuggestionQuery, SuggestionsResponse};

#[derive(diesel::QueryableByName, Debug)]
struct SuggestionRow {
  #[diesel(sql_type = Text)]
  source_class: String,
  #[diesel(sql_type = Text)]
  source_type: String,
  #[diesel(sql_type = Text)]
  source_symbol: String,
  #[diesel(sql_type = Nullable<Text>)]
  source_name: Option<String>,
  #[diesel(sql_type = Text)]
  target_class: String,
  #[diesel(sql_type = Text)]
  target_type: String,
  #[diesel(sql_type = Text)]
  target_symbol: String,
  #[diesel(sql_type = Nullable<Text>)]
  target_name: Option<String>,
  #[diesel(sql_type = Nullable<Text>)]
  target_common_symbol: Option<String>,
  #[diesel(sql_type = Nullable<Text>)]
  proposed_common_symbol: Option<String>,
  #[diesel(sql_type = Double)]
  score: f64,
  #[diesel(sql_type = diesel::sql_types::Bool)]
  id_match: bool,
  #[diesel(sql_type = diesel::sql_types::Bool)]
  external_id_match: bool,
  #[diesel(sql_type = diesel::sql_types::Bool)]
  norm_match: bool,
  #[diesel(sql_type = diesel::sql_types::Bool)]
  base_quote_match: bool,
  #[diesel(sql_type = diesel::sql_types::Bool)]
  exchange_match: bool,
  #[diesel(sql_type = Double)]
  sym_root_similarity: f64,
  #[diesel(sql_type = Double)]
  name_similarity: f64,
  #[diesel(sql_type = diesel::sql_types::Bool)]
  target_already_mapped: bool,
}

#[derive(diesel::QueryableByName, Debug)]
struct CountRow {
  #[diesel(sql_type = BigInt)]
  total: i64,
}

/// Assemble the suggestion SQL.
///
/// The parameter list is fixed so the optional filters are expressed as
/// `$n IS NULL OR ...` guards: $1 source_class, $2 source_type, $3
/// target_class, $4 target_type, $5 search pattern, $6 min_score, then for
/// the data variant $7-$9 cursor (score, source_symbol, target_symbol) and
/// $10 limit.
fn build_sql(use_similarity: bool, for_count: bool) -> String {
  let sym_sim_col = if use_similarity {
    "COALESCE(similarity(s_sym_root, t_sym_root), 0)::float8"
  } else {
    "0::float8"
  };
  let name_sim_col = if use_similarity {
    "COALESCE(similarity(source_name, target_name), 0)::float8"
  } else {
    "0::float8"
  };
  let sym_sim_expr = if use_similarity {
    "COALESCE(similarity(s_sym_root, t_sym_root) * 15, 0)"
  } else {
    "0"
  };
  let name_sim_expr = if use_similarity {
    "COALESCE(similarity(source_name, target_name) * 10, 0)"
  } else {
    "0"
  };

  let score_expr = format!(
    r#"(
        CASE WHEN t_primary_id IS NOT NULL AND s_primary_id = t_primary_id THEN 70 ELSE 0 END +
        CASE WHEN t_ext_id IS NOT NULL AND s_ext_id = t_ext_id THEN 50 ELSE 0 END +
        CASE WHEN (s_sym_full = t_sym_full OR s_sym_root = t_sym_root) THEN 30 ELSE 0 END +
        CASE WHEN s_base = t_base AND s_quote = t_quote THEN 10 ELSE 0 END +
        CASE WHEN s_exchange = t_exchange THEN 5 ELSE 0 END +
        {sym_sim_expr} +
        {name_sim_expr}
    )::float8"#
  );

  let asset_class_clause =
    "(s.asset_class = t.asset_class OR (s.asset_class IS NULL AND t.asset_class IS NULL))";

  let select_cols = r#"
        s.class_name AS source_class,
        s.class_type AS source_type,
        s.symbol AS source_symbol,
        s.name AS source_name,
        t.class_name AS target_class,
        t.class_type AS target_type,
        t.symbol AS target_symbol,
        t.name AS target_name,
        s.sym_norm_root,
        s.primary_id AS s_primary_id, t.primary_id AS t_primary_id,
        s.external_id AS s_ext_id, t.external_id AS t_ext_id,
        s.sym_norm_full AS s_sym_full, t.sym_norm_full AS t_sym_full,
        s.sym_norm_root AS s_sym_root, t.sym_norm_root AS t_sym_root,
        s.base_currency AS s_base, t.base_currency AS t_base,
        s.quote_currency AS s_quote, t.quote_currency AS t_quote,
        s.exchange AS s_exchange, t.exchange AS t_exchange
  "#;

  let union_query = format!(
    r#"
    WITH src AS (
        SELECT a.* FROM assets a
        WHERE a.class_name = $1
          AND ($2::text IS NULL OR a.class_type = $2)
          AND NOT EXISTS (
              SELECT 1 FROM asset_mapping m
              WHERE m.class_name = a.class_name
                AND m.class_type = a.class_type
                AND m.class_symbol = a.symbol
          )
    ),
    tgt AS (
        SELECT a.* FROM assets a
        WHERE a.class_name <> $1
          AND ($3::text IS NULL OR a.class_name = $3)
          AND ($4::text IS NULL OR a.class_type = $4)
    ),
    matched AS (
        -- Primary ID matches (indexed)
        SELECT {select_cols}
        FROM src s JOIN tgt t ON s.primary_id = t.primary_id
        WHERE s.primary_id IS NOT NULL AND {asset_class_clause}

        UNION ALL

        -- External ID matches (indexed)
        SELECT {select_cols}
        FROM src s JOIN tgt t ON s.external_id = t.external_id
        WHERE s.external_id IS NOT NULL AND {asset_class_clause}

        UNION ALL

        -- Symbol root matches (indexed)
        SELECT {select_cols}
        FROM src s JOIN tgt t ON s.sym_norm_root = t.sym_norm_root
        WHERE {asset_class_clause}

        UNION ALL

        -- Symbol full matches (indexed, catches cases where root differs)
        SELECT {select_cols}
        FROM src s JOIN tgt t ON s.sym_norm_full = t.sym_norm_full
        WHERE s.sym_norm_full <> s.sym_norm_root AND {asset_class_clause}
    ),
    deduplicated AS (
        SELECT DISTINCT ON (source_symbol, target_symbol)
            source_class, source_type, source_symbol, source_name,
            target_class, target_type, target_symbol, target_name,
            sym_norm_root,
            COALESCE(t_primary_id IS NOT NULL AND s_primary_id = t_primary_id, FALSE) AS id_match,
            COALESCE(t_ext_id IS NOT NULL AND s_ext_id = t_ext_id, FALSE) AS external_id_match,
            COALESCE(s_sym_full = t_sym_full OR s_sym_root = t_sym_root, FALSE) AS norm_match,
            COALESCE(s_base = t_base AND s_quote = t_quote, FALSE) AS base_quote_match,
            COALESCE(s_exchange = t_exchange, FALSE) AS exchange_match,
            {sym_sim_col} AS sym_root_similarity,
            {name_sim_col} AS name_similarity,
            {score_expr} AS score
        FROM matched
        ORDER BY source_symbol, target_symbol, {score_expr} DESC
    ),
    scored AS (
        SELECT d.*,
               tm.common_symbol AS target_common_symbol,
               COALESCE(tm.common_symbol, UPPER(d.sym_norm_root)) AS proposed_common_symbol,
               (tm.common_symbol IS NOT NULL) AS target_already_mapped
        FROM deduplicated d
        LEFT JOIN asset_mapping tm
          ON tm.class_name = d.target_class
         AND tm.class_type = d.target_type
         AND tm.class_symbol = d.target_symbol
        WHERE d.score >= $6
          AND ($5::text IS NULL
               OR d.source_symbol ILIKE $5
               OR d.source_name ILIKE $5
               OR d.target_symbol ILIKE $5
               OR d.target_name ILIKE $5)
    )
"#
  );

  if for_count {
    format!("{union_query}    SELECT COUNT(*) AS total FROM scored;")
  } else {
    format!(
      r#"{union_query}
    SELECT
        source_class, source_type, source_symbol, source_name,
        target_class, target_type, target_symbol, target_name,
        target_common_symbol, proposed_common_symbol, score,
        id_match, external_id_match, norm_match,
        base_quote_match, exchange_match,
        sym_root_similarity, name_similarity,
        target_already_mapped
    FROM scored
    WHERE ($7::float8 IS NULL
           OR score < $7
           OR (score = $7 AND source_symbol > $8)
           OR (score = $7 AND source_symbol = $8 AND target_symbol > $9))
    ORDER BY score DESC, source_symbol ASC, target_symbol ASC
    LIMIT $10;"#
    )
  }
}

fn is_missing_similarity(err: &diesel::result::Error) -> bool {
  matches!(err, diesel::result::Error::DatabaseError(_, info)
    if info.message().contains("similarity") && info.message().contains("does not exist"))
}

impl Registry {
  /// Serve mapping suggestions with scoring and cursor pagination.
  pub async fn asset_mapping_suggestions(
    &self,
    query: &SuggestionQuery,
  ) -> RegistryResult<SuggestionsResponse> {
    info!(
      "Suggestions: source={}, target={:?}, min_score={}, limit={}",
      query.source_class, query.target_class, query.min_score, query.limit
    );

    let cursor = match &query.cursor {
      Some(cursor) => Some(decode_cursor(cursor)?),
      None => None,
    };
    let search_pattern = query.search.as_ref().map(|s| format!("%{s}%"));
    let limit = query.limit.clamp(1, 200);

    let mut conn = self.pool.get().await?;

    let load = |sql: String| {
      let (cursor_score, cursor_src, cursor_tgt) = match &cursor {
        Some((score, src, tgt)) => (Some(*score), Some(src.clone()), Some(tgt.clone())),
        None => (None, None, None),
      };
      diesel::sql_query(sql)
        .bind::<Text, _>(query.source_class.clone())
        .bind::<Nullable<Text>, _>(query.source_type.clone())
        .bind::<Nullable<Text>, _>(query.target_class.clone())
        .bind::<Nullable<Text>, _>(query.target_type.clone())
        .bind::<Nullable<Text>, _>(search_pattern.clone())
        .bind::<Double, _>(query.min_score)
        .bind::<Nullable<Double>, _>(cursor_score)
        .bind::<Nullable<Text>, _>(cursor_src)
        .bind::<Nullable<Text>, _>(cursor_tgt)
        .bind::<BigInt, _>(limit + 1)
    };

    // pg_trgm may be missing; retry once with the similarity terms zeroed
    let mut records: Vec<SuggestionRow> =
      match load(build_sql(true, false)).load(&mut conn).await {
        Ok(records) => records,
        Err(e) if is_missing_similarity(&e) => {
          warn!("similarity() unavailable, retrying without pg_trgm.");
          load(build_sql(false, false)).load(&mut conn).await?
        }
        Err(e) => return Err(e.into()),
      };

    let has_more = records.len() as i64 > limit;
    if has_more {
      records.truncate(limit as usize);
    }

    let items: Vec<SuggestionItem> = records
      .into_iter()
      .map(|r| {
        // Proposals for unmapped targets are normalized to upper case; an
        // existing common symbol keeps its stored casing
        let proposed_common_symbol = if !r.target_already_mapped {
          r.proposed_common_symbol.map(|p| p.to_uppercase())
        } else {
          r.proposed_common_symbol
        };
        SuggestionItem {
          source_class: r.source_class,
          source_type: r.source_type,
          source_symbol: r.source_symbol,
          source_name: r.source_name,
          target_class: r.target_class,
          target_type: r.target_type,
          target_symbol: r.target_symbol,
          target_name: r.target_name,
          target_common_symbol: r.target_common_symbol,
          proposed_common_symbol,
          score: r.score,
          id_match: r.id_match,
          external_id_match: r.external_id_match,
          norm_match: r.norm_match,
          base_quote_match: r.base_quote_match,
          exchange_match: r.exchange_match,
          sym_root_similarity: r.sym_root_similarity,
          name_similarity: r.name_similarity,
          target_already_mapped: r.target_already_mapped,
        }
      })
      .collect();

    let next_cursor = if has_more {
      items.last().map(|last| encode_cursor(last.score, &last.source_symbol, &last.target_symbol))
    } else {
      None
    };

    let total = if query.include_total {
      let count = |sql: String| {
        diesel::sql_query(sql)
          .bind::<Text, _>(query.source_class.clone())
          .bind::<Nullable<Text>, _>(query.source_type.clone())
          .bind::<Nullable<Text>, _>(query.target_class.clone())
          .bind::<Nullable<Text>, _>(query.target_type.clone())
          .bind::<Nullable<Text>, _>(search_pattern.clone())
          .bind::<Double, _>(query.min_score)
      };
      match count(build_sql(true, true)).get_result::<CountRow>(&mut conn).await {
        Ok(row) => Some(row.total),
        Err(e) if is_missing_similarity(&e) => {
          match count(build_sql(false, true)).get_result::<CountRow>(&mut conn).await {
            Ok(row) => Some(row.total),
            Err(e) => {
              warn!("Error fetching suggestion count: {}", e);
              None
            }
          }
        }
        Err(e) => {
          warn!("Error fetching suggestion count: {}", e);
          None
        }
      }
    } else {
      None
    };

    info!("Returning {} suggestions (has_more={}, total={:?}).", items.len(), has_more, total);
    Ok(SuggestionsResponse { items, total, limit, next_cursor, has_more })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_sql_uses_union_all_branches() {
    let sql = build_sql(true, false);
    assert_eq!(sql.matches("UNION ALL").count(), 3);
    assert!(sql.contains("DISTINCT ON (source_symbol, target_symbol)"));
    assert!(sql.contains("ORDER BY score DESC, source_symbol ASC, target_symbol ASC"));
  }

  #[test]
  fn test_sql_without_similarity_has_no_trgm_calls() {
    let sql = build_sql(false, false);
    assert!(!sql.contains("similarity("));
  }

  #[test]
  fn test_count_sql_counts_scored_rows() {
    let sql = build_sql(true, true);
    assert!(sql.contains("SELECT COUNT(*) AS total FROM scored"));
    assert!(!sql.contains("LIMIT $10"));
  }
}
