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

//! The asset update pipeline: discovery, upsert, identity matching,
//! automated mapping, and (for index providers) membership sync.
//!
//! A single provider's refresh runs the whole chain and reports per-stage
//! counters; discovery failures set a non-200 status on the response, while
//! failures in the later stages degrade to warnings so the upsert results
//! survive. The all-providers variant never aborts a full run and finishes
//! with a global second-pass matcher sweep.

use diesel_async::AsyncConnection;
use qh_core::normalize_asset_class;
use qh_core::types::ASSET_CLASSES;
use qh_database_postgres::constraint_name;
use qh_database_postgres::models::asset::{Asset, AssetUpsert, UpsertOutcome};
use qh_database_postgres::models::registry::CodeRegistryRow;
use qh_providers::SymbolInfo;
use std::collections::{HashMap, HashSet};
use tracing::{info, warn};

use crate::Registry;
use crate::error::{RegistryError, RegistryResult};
use crate::mapper::apply_automated_mappings;
use crate::matcher::MatchResult;
use crate::membership::{SyncMode, sync_memberships_core};
use crate::schemas::UpdateAssetsResponse;

/// Constraint enforcing one identified securities asset per provider.
const SECURITIES_IDENTITY_CONSTRAINT: &str = "idx_assets_unique_securities_primary_id";

/// Outcome counters for one matcher apply pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MatchApplyStats {
  pub identified: usize,
  pub skipped: usize,
  pub failed: usize,
  pub constraint_rejected: usize,
}

/// Apply identity matcher results to the assets table.
///
/// The update is conditional on `primary_id IS NULL`, so provider-supplied
/// identities are never overwritten. A rejection by the securities
/// uniqueness constraint is an expected outcome, not an error: another asset
/// already claimed the identity.
pub async fn apply_identity_matches(
  conn: &mut diesel_async::AsyncPgConnection,
  matches: &[MatchResult],
) -> MatchApplyStats {
  let mut stats = MatchApplyStats::default();

  for m in matches {
    match Asset::apply_identity_match(conn, m.asset_id, &m.primary_id, m.confidence, &m.match_type)
      .await
    {
      Ok(0) => stats.skipped += 1,
      Ok(_) => stats.identified += 1,
      Err(e) if qh_database_postgres::is_unique_violation(&e) => {
        if constraint_name(&e) == Some(SECURITIES_IDENTITY_CONSTRAINT) {
          info!(
            "Identity rejected by constraint for asset {} (primary_id={}): another asset already has this identity",
            m.identity_symbol, m.primary_id
          );
          stats.constraint_rejected += 1;
        } else {
          warn!("Unexpected unique violation for asset {}: {}", m.asset_id, e);
          stats.failed += 1;
        }
      }
      Err(e) => {
        warn!("Failed to apply match for asset {}: {}", m.asset_id, e);
        stats.failed += 1;
      }
    }
  }
  stats
}

/// Convert a constituent payload into the discovery row shape so index
/// providers flow through the same upsert path as everyone else.
pub(crate) fn constituent_to_symbol_info(
  index_name: &str,
  c: &qh_providers::Constituent,
) -> SymbolInfo {
  SymbolInfo {
    provider: index_name.to_string(),
    provider_id: None,
    primary_id: None,
    isin: None,
    symbol: c.symbol.clone(),
    matcher_symbol: Some(c.matcher_symbol.clone().unwrap_or_else(|| c.symbol.clone())),
    name: Some(c.name.clone().unwrap_or_default()),
    exchange: Some(String::new()),
    asset_class: c.asset_class.clone(),
    base_currency: Some(c.base_currency.clone().unwrap_or_default()),
    quote_currency: Some(c.quote_currency.clone().unwrap_or_default()),
    country: None,
  }
}

impl Registry {
  /// Request-path wrapper: 404 for unregistered classes, error for a
  /// failed discovery, counters otherwise.
  pub async fn handle_update_assets(
    &self,
    class_name: &str,
    class_type: &str,
  ) -> RegistryResult<UpdateAssetsResponse> {
    {
      let mut conn = self.pool.get().await?;
      if CodeRegistryRow::registered_id(&mut conn, class_name, class_type).await?.is_none() {
        warn!("Class '{}' ({}) is not registered.", class_name, class_type);
        return Err(RegistryError::NotFound(format!(
          "Class '{class_name}' ({class_type}) is not registered."
        )));
      }
    }

    let stats = self.update_assets_for_provider(class_name, class_type).await;
    // 204 (no symbols) is a success shape; everything else non-200 is an error
    if stats.status != 200 && stats.status != 204 {
      let detail = stats.error.clone().unwrap_or_else(|| "Unknown error".to_string());
      return Err(match stats.status {
        404 => RegistryError::NotFound(detail),
        501 => RegistryError::Core(qh_core::Error::NotImplemented(detail)),
        502 | 503 => RegistryError::Upstream(detail),
        _ => RegistryError::Database(detail),
      });
    }
    Ok(stats)
  }

  /// Trigger asset updates for every registered class. Individual failures
  /// land in that class's response; the run itself never aborts. A global
  /// identity-matching pass at the end catches assets newly made matchable
  /// by sibling providers.
  pub async fn update_all_assets(&self) -> RegistryResult<Vec<UpdateAssetsResponse>> {
    info!("Triggering asset update for all registered providers.");
    let classes = {
      let mut conn = self.pool.get().await?;
      CodeRegistryRow::all_classes(&mut conn).await?
    };
    if classes.is_empty() {
      info!("No registered providers found.");
      return Ok(vec![]);
    }

    let mut responses = Vec::with_capacity(classes.len());
    for (class_name, class_type) in &classes {
      responses.push(self.update_assets_for_provider(class_name, class_type).await);
    }

    // Global second pass for anything still unidentified
    match self.pool.get().await {
      Ok(mut conn) => match self.matcher.identify_all_unidentified_assets(&mut conn).await {
        Ok(matches) if !matches.is_empty() => {
          let stats = apply_identity_matches(&mut conn, &matches).await;
          info!(
            "Global identity matching complete: identified={}, skipped={}",
            stats.identified, stats.skipped
          );
        }
        Ok(_) => {}
        Err(e) => warn!("Global identity matching failed: {}", e),
      },
      Err(e) => warn!("Global identity matching failed: {}", e),
    }

    Ok(responses)
  }

  /// Full refresh for one provider: discovery through DataHub, savepointed
  /// upserts, identity matching, automated mapping, and membership sync for
  /// index providers.
  pub async fn update_assets_for_provider(
    &self,
    class_name: &str,
    class_type: &str,
  ) -> UpdateAssetsResponse {
    let mut stats = UpdateAssetsResponse::new(class_name, class_type);

    let class_subtype = {
      let mut conn = match self.pool.get().await {
        Ok(conn) => conn,
        Err(e) => {
          stats.status = 500;
          stats.error = Some(format!("Database error: {e}"));
          return stats;
        }
      };
      match CodeRegistryRow::class_subtype_of(&mut conn, class_name, class_type).await {
        Ok(subtype) => subtype.flatten(),
        Err(e) => {
          stats.status = 500;
          stats.error = Some(format!("Database error: {e}"));
          return stats;
        }
      }
    };
    let is_index_provider = class_subtype.as_deref() == Some("IndexProvider");

    // Fetch available symbols / constituents from DataHub
    let mut constituent_weights: HashMap<String, Option<f64>> = HashMap::new();
    let symbol_info_list: Vec<SymbolInfo> = if is_index_provider {
      info!("Fetching constituents for IndexProvider {}", class_name);
      match self.fetch_constituents(class_name).await {
        Ok(constituents) if constituents.is_empty() => {
          warn!(
            "Empty constituents returned for IndexProvider '{}'. Preserving existing memberships.",
            class_name
          );
          stats.message =
            Some("No constituents returned from provider. Existing memberships preserved.".to_string());
          return stats;
        }
        Ok(constituents) => {
          for c in &constituents {
            constituent_weights.insert(c.symbol.clone(), c.weight);
          }
          constituents.iter().map(|c| constituent_to_symbol_info(class_name, c)).collect()
        }
        Err(e) => {
          stats.status = e.status();
          stats.error = Some(e.message().to_string());
          return stats;
        }
      }
    } else {
      match self.fetch_available_symbols(class_name).await {
        Ok(items) if items.is_empty() => {
          info!("No symbols returned from DataHub for provider {}.", class_name);
          stats.message = Some("No symbols returned from DataHub".to_string());
          stats.status = 204;
          return stats;
        }
        Ok(items) => items,
        Err(e) => {
          stats.status = e.status();
          stats.error = Some(e.message().to_string());
          return stats;
        }
      }
    };
    stats.total_symbols = symbol_info_list.len();

    // Upsert symbols, each row isolated in its own savepoint
    let upsert_result = {
      let mut conn = match self.pool.get().await {
        Ok(conn) => conn,
        Err(e) => {
          stats.status = 500;
          stats.error = Some(format!("Database error: {e}"));
          return stats;
        }
      };
      {
        let class_name = class_name.to_string();
        let class_type = class_type.to_string();
        let rows = &symbol_info_list;
        conn
          .transaction::<_, diesel::result::Error, _>(move |conn| {
              Box::pin(async move {
                let mut counters = (0usize, 0usize, 0usize); // added, updated, failed
                let mut processed: HashSet<String> = HashSet::new();
                for info in rows {
                  if info.symbol.is_empty() {
                    warn!("Symbol is empty: {:?}", info);
                    counters.2 += 1;
                    continue;
                  }
                  if processed.contains(&info.symbol) {
                    warn!("Duplicate symbol found in response: {}", info.symbol);
                    counters.2 += 1;
                    continue;
                  }

                  let normalized = normalize_asset_class(info.asset_class.as_deref());
                  if info.asset_class.is_some()
                    && !normalized
                      .as_deref()
                      .map(|ac| ASSET_CLASSES.contains(&ac))
                      .unwrap_or(false)
                  {
                    warn!(
                      "Skipping symbol {}: invalid asset_class '{:?}'",
                      info.symbol, info.asset_class
                    );
                    counters.2 += 1;
                    continue;
                  }

                  let row = AssetUpsert {
                    class_name: class_name.clone(),
                    class_type: class_type.clone(),
                    external_id: info.provider_id.clone(),
                    primary_id: info.primary_id.clone(),
                    symbol: info.symbol.clone(),
                    matcher_symbol: info
                      .matcher_symbol
                      .clone()
                      .unwrap_or_else(|| info.symbol.clone()),
                    name: info.name.clone(),
                    exchange: info.exchange.clone(),
                    asset_class: normalized,
                    base_currency: info.base_currency.clone(),
                    quote_currency: info.quote_currency.clone(),
                    country: info.country.clone(),
                  };

                  // Savepoint per row: one bad upsert neither aborts the
                  // batch nor poisons the transaction
                  let outcome = conn
                    .transaction::<_, diesel::result::Error, _>(|conn| {
                      Box::pin(async move { Asset::upsert_from_discovery(conn, &row).await })
                    })
                    .await;
                  match outcome {
                    Ok(UpsertOutcome::Inserted) => {
                      counters.0 += 1;
                      processed.insert(info.symbol.clone());
                    }
                    Ok(UpsertOutcome::Updated) => {
                      counters.1 += 1;
                      processed.insert(info.symbol.clone());
                    }
                    Err(e) => {
                      warn!("Error upserting symbol {} for {}: {}", info.symbol, class_name, e);
                      counters.2 += 1;
                    }
                  }
                }
                Ok(counters)
              })
            })
            .await
      }
    };

    match upsert_result {
      Ok((added, updated, failed)) => {
        stats.added_symbols = added;
        stats.updated_symbols = updated;
        stats.failed_symbols += failed;
      }
      Err(e) => {
        stats.status = 500;
        stats.error = Some(format!("Database error during upsert: {e}"));
        return stats;
      }
    }
    stats.processed_symbols = stats.added_symbols + stats.updated_symbols + stats.failed_symbols;
    info!(
      "Asset update summary for {} ({}): Added={}, Updated={}, Failed={}",
      class_name, class_type, stats.added_symbols, stats.updated_symbols, stats.failed_symbols
    );

    // Identity matching for unidentified assets
    match self.pool.get().await {
      Ok(mut conn) => {
        match self.matcher.identify_unidentified_assets(&mut conn, class_name, class_type).await {
          Ok(matches) if !matches.is_empty() => {
            let match_stats = apply_identity_matches(&mut conn, &matches).await;
            stats.identity_matched = match_stats.identified;
            stats.identity_skipped = match_stats.skipped;
            info!(
              "Identity matching for {}: identified={}, skipped={}, constraint_rejected={}",
              class_name,
              match_stats.identified,
              match_stats.skipped,
              match_stats.constraint_rejected
            );
          }
          Ok(_) => {}
          Err(e) => warn!("Identity matching failed for {}: {}", class_name, e),
        }
      }
      Err(e) => warn!("Identity matching failed for {}: {}", class_name, e),
    }

    // Automated mapping for newly identified assets
    match self.pool.get().await {
      Ok(mut conn) => {
        match self
          .mapper
          .generate_mapping_candidates_for_provider(&mut conn, class_name, class_type)
          .await
        {
          Ok(candidates) if !candidates.is_empty() => {
            match apply_automated_mappings(&mut conn, &candidates).await {
              Ok(mapping_stats) => {
                stats.mappings_created = mapping_stats.created;
                stats.mappings_skipped = mapping_stats.skipped;
                stats.mappings_failed = mapping_stats.failed;
                info!(
                  "Automated mapping complete for {}: created={}, skipped={}, failed={}",
                  class_name, mapping_stats.created, mapping_stats.skipped, mapping_stats.failed
                );
              }
              Err(e) => warn!("Automated mapping failed for {}: {}", class_name, e),
            }
          }
          Ok(_) => {
            info!("No mapping candidates generated for {} ({})", class_name, class_type);
          }
          Err(e) => warn!("Automated mapping failed for {}: {}", class_name, e),
        }
      }
      Err(e) => warn!("Automated mapping failed for {}: {}", class_name, e),
    }

    // Membership sync (IndexProvider only)
    if is_index_provider && !constituent_weights.is_empty() {
      info!("Starting membership sync for IndexProvider {}", class_name);
      let sync_result = {
        match self.pool.get().await {
          Ok(mut conn) => {
            let class_name = class_name.to_string();
            let class_type = class_type.to_string();
            let weights = &constituent_weights;
            conn
              .transaction::<_, diesel::result::Error, _>(move |conn| {
                Box::pin(async move {
                  sync_memberships_core(
                    conn,
                    &class_name,
                    &class_type,
                    weights,
                    SyncMode::ScdType2,
                    "api",
                  )
                  .await
                })
              })
              .await
              .map_err(|e| e.to_string())
          }
          Err(e) => Err(e.to_string()),
        }
      };
      match sync_result {
        Ok(sync) => {
          stats.members_added = sync.added;
          stats.members_removed = sync.removed;
          stats.members_unchanged = sync.unchanged;
          info!(
            "Membership sync complete for {}: added={}, removed={}, unchanged={}",
            class_name, stats.members_added, stats.members_removed, stats.members_unchanged
          );
        }
        Err(e) => {
          warn!("Membership sync failed for {}: {}", class_name, e);
          stats.message = Some(format!("Assets updated but membership sync failed: {e}"));
        }
      }
    }

    stats
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use qh_providers::Constituent;

  #[test]
  fn test_constituent_conversion_defaults_matcher_symbol() {
    let c = Constituent { symbol: "BTC".to_string(), weight: Some(0.3), ..Default::default() };
    let info = constituent_to_symbol_info("CCI30", &c);
    assert_eq!(info.provider, "CCI30");
    assert_eq!(info.symbol, "BTC");
    assert_eq!(info.matcher_symbol.as_deref(), Some("BTC"));
    assert!(info.primary_id.is_none());
  }

  #[test]
  fn test_constituent_conversion_keeps_explicit_fields() {
    let c = Constituent {
      symbol: "ETH".to_string(),
      weight: None,
      name: Some("Ethereum".to_string()),
      asset_class: Some("crypto".to_string()),
      matcher_symbol: Some("ETH-ALT".to_string()),
      base_currency: Some("ETH".to_string()),
      quote_currency: Some("USD".to_string()),
    };
    let info = constituent_to_symbol_info("CCI30", &c);
    assert_eq!(info.matcher_symbol.as_deref(), Some("ETH-ALT"));
    assert_eq!(info.name.as_deref(), Some("Ethereum"));
    assert_eq!(info.asset_class.as_deref(), Some("crypto"));
  }
}
