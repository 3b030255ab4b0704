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

//! Automated cross-provider mapping from primary-ID relationships.
//!
//! Assets sharing a primary ID form a group; each group resolves to exactly
//! one `common_symbol` (an existing mapping's symbol when any, otherwise the
//! shortest normalized root). A candidate symbol already claimed by a
//! different primary ID is disambiguated as `SYMBOL:PRIMARY_ID`. Crypto
//! groups additionally pass through the provider's quote-currency
//! preference, which selects at most one of the provider's quote variants.

use diesel::sql_types::{Array, Nullable, Text};
use diesel_async::RunQueryDsl;
use std::collections::HashMap;
use tracing::{error, info};

use qh_database_postgres::models::registry::CodeRegistryRow;

use crate::error::RegistryResult;

/// One provider asset eligible for automated mapping.
#[derive(diesel::QueryableByName, Debug, Clone, PartialEq)]
pub struct MappingAsset {
  #[diesel(sql_type = Text)]
  pub class_name: String,
  #[diesel(sql_type = Text)]
  pub class_type: String,
  #[diesel(sql_type = Text)]
  pub symbol: String,
  #[diesel(sql_type = Text)]
  pub primary_id: String,
  #[diesel(sql_type = Nullable<Text>)]
  pub asset_class_group: Option<String>,
  #[diesel(sql_type = Nullable<Text>)]
  pub base_currency: Option<String>,
  #[diesel(sql_type = Nullable<Text>)]
  pub quote_currency: Option<String>,
  #[diesel(sql_type = Nullable<Text>)]
  pub sym_norm_root: Option<String>,
}

/// A potential mapping to be created.
#[derive(Debug, Clone, PartialEq)]
pub struct MappingCandidate {
  pub class_name: String,
  pub class_type: String,
  pub class_symbol: String,
  pub common_symbol: String,
  pub primary_id: String,
  pub asset_class_group: String,
  pub reasoning: String,
}

#[derive(diesel::QueryableByName, Debug, Clone)]
struct ExistingMappingRow {
  #[diesel(sql_type = Text)]
  class_name: String,
  #[diesel(sql_type = Text)]
  class_type: String,
  #[diesel(sql_type = Text)]
  class_symbol: String,
  #[diesel(sql_type = Text)]
  common_symbol: String,
  #[diesel(sql_type = Text)]
  primary_id: String,
}

#[derive(diesel::QueryableByName, Debug, Clone)]
struct SymbolClaimRow {
  #[diesel(sql_type = Text)]
  common_symbol: String,
  #[diesel(sql_type = Text)]
  primary_id: String,
}

const SELECT_PROVIDER_MAPPING_ASSETS: &str = r#"
    SELECT
        class_name, class_type, symbol, primary_id, asset_class_group,
        base_currency, quote_currency, sym_norm_root
    FROM assets
    WHERE primary_id IS NOT NULL
      AND (class_name = $1 AND class_type = $2)
    ORDER BY primary_id, class_name, class_type
"#;

const SELECT_EXISTING_MAPPINGS: &str = r#"
    SELECT am.class_name, am.class_type, am.class_symbol, am.common_symbol, a.primary_id
    FROM asset_mapping am
    JOIN assets a ON am.class_name = a.class_name
                  AND am.class_type = a.class_type
                  AND am.class_symbol = a.symbol
    WHERE a.primary_id = ANY($1)
"#;

const SELECT_SYMBOL_CLAIMS: &str = r#"
    SELECT DISTINCT ON (am.common_symbol) am.common_symbol, a.primary_id
    FROM asset_mapping am
    JOIN assets a ON am.class_name = a.class_name
                  AND am.class_type = a.class_type
                  AND am.class_symbol = a.symbol
    WHERE am.common_symbol = ANY($1)
    ORDER BY am.common_symbol, a.primary_id
"#;

/// Pick the common symbol for a group without an existing mapping: the
/// shortest non-null `sym_norm_root` (alphabetical tie-break) uppercased,
/// falling back to the first symbol uppercased.
pub fn determine_common_symbol(assets: &[&MappingAsset]) -> String {
  let best = assets
    .iter()
    .filter_map(|a| a.sym_norm_root.as_deref().filter(|r| !r.is_empty()))
    .min_by_key(|root| (root.len(), root.to_string()));
  match best {
    Some(root) => root.to_uppercase(),
    None => assets[0].symbol.to_uppercase(),
  }
}

/// Crypto provider selection: which of the provider's quote variants to map.
///
/// First match wins: a single unique quote currency maps directly; an exact
/// preferred-quote match beats the USD fallback; with no USD-ish quote at
/// all, the group contributes no candidate for this provider.
pub fn select_crypto_asset<'a>(
  provider_assets: &[&'a MappingAsset],
  preferred_quote: Option<&str>,
) -> (Option<&'a MappingAsset>, String) {
  let unique_quotes: std::collections::HashSet<&str> =
    provider_assets.iter().filter_map(|a| a.quote_currency.as_deref()).collect();

  if unique_quotes.len() == 1 {
    let selected = provider_assets[0];
    return (
      Some(selected),
      format!("Single quote currency available: {}", selected.quote_currency.as_deref().unwrap_or("")),
    );
  }

  if let Some(preferred) = preferred_quote {
    let selected = provider_assets
      .iter()
      .copied()
      .filter(|a| a.quote_currency.as_deref() == Some(preferred))
      .min_by_key(|a| a.symbol.clone());
    if let Some(selected) = selected {
      return (Some(selected), format!("Selected preferred quote: {preferred}"));
    }
  }

  let usd_fallback = provider_assets
    .iter()
    .copied()
    .filter(|a| a.quote_currency.as_deref().is_some_and(|q| q.contains("USD")))
    .min_by_key(|a| a.symbol.clone());
  if let Some(selected) = usd_fallback {
    return (
      Some(selected),
      format!("Selected USD fallback: {}", selected.quote_currency.as_deref().unwrap_or("")),
    );
  }

  (None, "No suitable USD quote currency available".to_string())
}

/// Resolve a cross-FIGI naming conflict.
///
/// When a freshly generated candidate symbol is already claimed by a
/// different primary ID, the candidate is rewritten as `SYMBOL:PRIMARY_ID`
/// so both identities keep distinct common symbols.
pub fn resolve_symbol_conflict(
  candidate: String,
  primary_id: &str,
  claims: &HashMap<String, String>,
) -> String {
  match claims.get(&candidate) {
    Some(claimant) if claimant != primary_id => {
      let unique = format!("{candidate}:{primary_id}");
      info!(
        "FIGI conflict resolved: '{}' is claimed by {}, using '{}' for {}",
        candidate, claimant, unique, primary_id
      );
      unique
    }
    _ => candidate,
  }
}

/// Utility for creating automated cross-provider asset mappings.
pub struct AutomatedMapper;

impl AutomatedMapper {
  /// Generate mapping candidates for all of one provider's identified assets.
  pub async fn generate_mapping_candidates_for_provider(
    &self,
    conn: &mut diesel_async::AsyncPgConnection,
    provider_name: &str,
    provider_type: &str,
  ) -> RegistryResult<Vec<MappingCandidate>> {
    let assets: Vec<MappingAsset> = diesel::sql_query(SELECT_PROVIDER_MAPPING_ASSETS)
      .bind::<Text, _>(provider_name)
      .bind::<Text, _>(provider_type)
      .load(conn)
      .await?;

    if assets.is_empty() {
      info!("No assets found for provider {} ({})", provider_name, provider_type);
      return Ok(vec![]);
    }

    // Group assets by (primary_id, asset_class_group)
    let mut groups: HashMap<(String, String), Vec<&MappingAsset>> = HashMap::new();
    for asset in &assets {
      let group = asset.asset_class_group.clone().unwrap_or_default();
      groups.entry((asset.primary_id.clone(), group)).or_default().push(asset);
    }

    // Load existing mappings touching any of these primary ids
    let primary_ids: Vec<String> = {
      let mut ids: Vec<String> = groups.keys().map(|(pid, _)| pid.clone()).collect();
      ids.sort();
      ids.dedup();
      ids
    };
    let existing: Vec<ExistingMappingRow> = diesel::sql_query(SELECT_EXISTING_MAPPINGS)
      .bind::<Array<Text>, _>(&primary_ids)
      .load(conn)
      .await?;

    let mut asset_lookup: HashMap<(String, String, String), String> = HashMap::new();
    let mut primary_id_lookup: HashMap<String, String> = HashMap::new();
    for row in existing {
      asset_lookup.insert(
        (row.class_name.clone(), row.class_type.clone(), row.class_symbol.clone()),
        row.common_symbol.clone(),
      );
      primary_id_lookup.entry(row.primary_id).or_insert(row.common_symbol);
    }

    // First pass: determine each group's candidate symbol
    let mut planned: Vec<((String, String), Vec<&MappingAsset>, String, bool)> = Vec::new();
    for ((primary_id, group_name), members) in groups {
      let existing_symbol = members
        .iter()
        .find_map(|a| {
          asset_lookup.get(&(a.class_name.clone(), a.class_type.clone(), a.symbol.clone()))
        })
        .or_else(|| primary_id_lookup.get(&primary_id))
        .cloned();
      match existing_symbol {
        Some(symbol) => planned.push(((primary_id, group_name), members, symbol, true)),
        None => {
          let symbol = determine_common_symbol(&members);
          planned.push(((primary_id, group_name), members, symbol, false));
        }
      }
    }

    // Cross-FIGI conflict check: which freshly generated symbols are already
    // claimed, and by whom
    let generated: Vec<String> = planned
      .iter()
      .filter(|(_, _, _, reused)| !reused)
      .map(|(_, _, symbol, _)| symbol.clone())
      .collect();
    let claims: HashMap<String, String> = if generated.is_empty() {
      HashMap::new()
    } else {
      let rows: Vec<SymbolClaimRow> = diesel::sql_query(SELECT_SYMBOL_CLAIMS)
        .bind::<Array<Text>, _>(&generated)
        .load(conn)
        .await?;
      rows.into_iter().map(|r| (r.common_symbol, r.primary_id)).collect()
    };

    let preferred_quote =
      CodeRegistryRow::crypto_quote_preference(conn, provider_name, provider_type).await?;

    let mut candidates = Vec::new();
    for ((primary_id, group_name), members, mut common_symbol, reused) in planned {
      if !reused {
        common_symbol = resolve_symbol_conflict(common_symbol, &primary_id, &claims);
      }

      if group_name == "crypto" {
        let (selected, reasoning) = select_crypto_asset(&members, preferred_quote.as_deref());
        if let Some(asset) = selected {
          candidates.push(MappingCandidate {
            class_name: asset.class_name.clone(),
            class_type: asset.class_type.clone(),
            class_symbol: asset.symbol.clone(),
            common_symbol: common_symbol.clone(),
            primary_id: primary_id.clone(),
            asset_class_group: group_name.clone(),
            reasoning,
          });
        }
      } else {
        let reasoning = if reused {
          "Reusing existing common_symbol".to_string()
        } else {
          "Securities group - all assets mapped".to_string()
        };
        for asset in &members {
          candidates.push(MappingCandidate {
            class_name: asset.class_name.clone(),
            class_type: asset.class_type.clone(),
            class_symbol: asset.symbol.clone(),
            common_symbol: common_symbol.clone(),
            primary_id: primary_id.clone(),
            asset_class_group: group_name.clone(),
            reasoning: reasoning.clone(),
          });
        }
      }
    }

    info!(
      "AutomatedMapper: Generated {} mapping candidates for provider {} ({})",
      candidates.len(),
      provider_name,
      provider_type
    );
    Ok(candidates)
  }
}

/// Apply mapping candidates: bulk insert with `ON CONFLICT DO NOTHING`,
/// each row under its own savepoint so one bad row does not poison the batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MappingApplyStats {
  pub created: usize,
  pub skipped: usize,
  pub failed: usize,
}

pub async fn apply_automated_mappings(
  conn: &mut diesel_async::AsyncPgConnection,
  candidates: &[MappingCandidate],
) -> RegistryResult<MappingApplyStats> {
  use diesel_async::AsyncConnection;
  use qh_database_postgres::models::mapping::{AssetMapping, NewAssetMapping};

  let mut stats = MappingApplyStats::default();
  if candidates.is_empty() {
    return Ok(stats);
  }

  conn
    .transaction::<_, diesel::result::Error, _>(|conn| {
      Box::pin(async move {
        for candidate in candidates {
          let row = NewAssetMapping {
            common_symbol: candidate.common_symbol.clone(),
            class_name: candidate.class_name.clone(),
            class_type: candidate.class_type.clone(),
            class_symbol: candidate.class_symbol.clone(),
            is_active: true,
          };
          // Nested transaction == savepoint around one insert attempt
          let inserted = conn
            .transaction::<_, diesel::result::Error, _>(|conn| {
              Box::pin(async move { AssetMapping::insert_candidate(conn, &row).await })
            })
            .await;
          match inserted {
            Ok(0) => stats.skipped += 1,
            Ok(_) => stats.created += 1,
            Err(e) => {
              error!("Error inserting mapping for {}: {}", candidate.class_symbol, e);
              stats.failed += 1;
            }
          }
        }
        Ok(stats)
      })
    })
    .await
    .map_err(Into::into)
}

#[cfg(test)]
mod tests {
  use super::*;
  use pretty_assertions::assert_eq;

  fn asset(symbol: &str, quote: Option<&str>, root: Option<&str>) -> MappingAsset {
    MappingAsset {
      class_name: "KRAKEN".to_string(),
      class_type: "provider".to_string(),
      symbol: symbol.to_string(),
      primary_id: "KKG00000DV14".to_string(),
      asset_class_group: Some("crypto".to_string()),
      base_currency: Some("BTC".to_string()),
      quote_currency: quote.map(String::from),
      sym_norm_root: root.map(String::from),
    }
  }

  #[test]
  fn test_single_quote_currency_wins_regardless_of_preference() {
    let a = asset("BTC/EUR", Some("EUR"), Some("btc"));
    let members = vec![&a];
    let (selected, reasoning) = select_crypto_asset(&members, Some("USD"));
    assert_eq!(selected.unwrap().symbol, "BTC/EUR");
    assert!(reasoning.contains("Single quote currency"));
  }

  #[test]
  fn test_preferred_quote_beats_usd_fallback() {
    let eur = asset("BTC/EUR", Some("EUR"), Some("btc"));
    let usd = asset("BTC/USD", Some("USD"), Some("btc"));
    let usdt = asset("BTC/USDT", Some("USDT"), Some("btc"));
    let members = vec![&eur, &usd, &usdt];
    let (selected, reasoning) = select_crypto_asset(&members, Some("EUR"));
    assert_eq!(selected.unwrap().symbol, "BTC/EUR");
    assert!(reasoning.contains("preferred quote: EUR"));
  }

  #[test]
  fn test_usd_fallback_picks_alphabetically_first() {
    let usdt = asset("BTC/USDT", Some("USDT"), Some("btc"));
    let usd = asset("BTC/USD", Some("USD"), Some("btc"));
    let eur = asset("BTC/EUR", Some("EUR"), Some("btc"));
    let members = vec![&usdt, &usd, &eur];
    let (selected, reasoning) = select_crypto_asset(&members, Some("GBP"));
    assert_eq!(selected.unwrap().symbol, "BTC/USD");
    assert!(reasoning.contains("USD fallback"));
  }

  #[test]
  fn test_no_suitable_quote_selects_nothing() {
    let eur = asset("BTC/EUR", Some("EUR"), Some("btc"));
    let gbp = asset("BTC/GBP", Some("GBP"), Some("btc"));
    let members = vec![&eur, &gbp];
    let (selected, reasoning) = select_crypto_asset(&members, None);
    assert!(selected.is_none());
    assert_eq!(reasoning, "No suitable USD quote currency available");
  }

  #[test]
  fn test_common_symbol_prefers_shortest_root() {
    let a = asset("BTCUSD.LONG", None, Some("btcusd"));
    let b = asset("BTC.X", None, Some("btc"));
    let members = vec![&a, &b];
    assert_eq!(determine_common_symbol(&members), "BTC");
  }

  #[test]
  fn test_common_symbol_alphabetical_tie_break() {
    let a = asset("ZZZ", None, Some("zzz"));
    let b = asset("AAA", None, Some("aaa"));
    let members = vec![&a, &b];
    assert_eq!(determine_common_symbol(&members), "AAA");
  }

  #[test]
  fn test_common_symbol_falls_back_to_first_symbol() {
    let a = asset("btc.nyse", None, None);
    let members = vec![&a];
    assert_eq!(determine_common_symbol(&members), "BTC.NYSE");
  }

  #[test]
  fn test_conflict_with_different_primary_id_gets_suffixed() {
    // "BTC" belongs to the crypto identity; the securities group must not
    // steal the name.
    let claims: HashMap<String, String> =
      [("BTC".to_string(), "KKG00000DV14".to_string())].into_iter().collect();
    let resolved = resolve_symbol_conflict("BTC".to_string(), "BBG000XYZ123", &claims);
    assert_eq!(resolved, "BTC:BBG000XYZ123");
  }

  #[test]
  fn test_conflict_with_same_primary_id_keeps_symbol() {
    let claims: HashMap<String, String> =
      [("AAPL".to_string(), "FIGI_AAPL".to_string())].into_iter().collect();
    let resolved = resolve_symbol_conflict("AAPL".to_string(), "FIGI_AAPL", &claims);
    assert_eq!(resolved, "AAPL");
  }

  #[test]
  fn test_unclaimed_symbol_passes_through() {
    let claims = HashMap::new();
    assert_eq!(resolve_symbol_conflict("AAPL".to_string(), "FIGI_AAPL", &claims), "AAPL");
  }
}
