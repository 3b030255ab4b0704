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

//! Index membership synchronization.
//!
//! One diff algorithm powers both API-sourced indices and user-maintained
//! indices: incoming constituents against currently-active rows, with weight
//! changes handled either in place or as SCD-Type-2 close-and-reinsert.

use diesel_async::AsyncConnection;
use qh_core::normalize_asset_class;
use qh_core::types::ASSET_CLASSES;
use qh_database_postgres::models::asset::{Asset, AssetUpsert, UpsertOutcome};
use qh_database_postgres::models::mapping::CommonSymbol;
use qh_database_postgres::models::membership::IndexMembership;
use qh_database_postgres::models::registry::CodeRegistryRow;
use qh_providers::Constituent;
use std::collections::HashMap;
use tracing::info;

use crate::Registry;
use crate::error::{RegistryError, RegistryResult};
use crate::schemas::{IndexSyncResponse, UserIndexMember};

/// Weight-change handling mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncMode {
  InPlace,
  ScdType2,
}

/// Result of one membership synchronization.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MembershipSyncResult {
  pub added: usize,
  pub removed: usize,
  pub unchanged: usize,
  pub weights_updated: usize,
}

/// Compare two weights for equality within tolerance.
///
/// Both null means equal-weight on both sides; exactly one null is a change.
pub fn weights_equal(w1: Option<f64>, w2: Option<f64>) -> bool {
  match (w1, w2) {
    (None, None) => true,
    (Some(a), Some(b)) => (a - b).abs() < 1e-9,
    _ => false,
  }
}

/// Sync index memberships within an existing transaction.
///
/// The caller owns transaction management; every statement here joins the
/// caller's transaction. In SCD mode a weight change closes the old row and
/// inserts a new one, counting as a removal plus an addition on top of
/// `weights_updated`.
pub async fn sync_memberships_core(
  conn: &mut diesel_async::AsyncPgConnection,
  index_name: &str,
  index_type: &str,
  constituent_weights: &HashMap<String, Option<f64>>,
  mode: SyncMode,
  source: &str,
) -> Result<MembershipSyncResult, diesel::result::Error> {
  let mut result = MembershipSyncResult::default();

  let current_members = IndexMembership::active_by_asset_symbol(conn, index_name).await?;
  let current: HashMap<String, (i32, Option<f64>)> = current_members
    .into_iter()
    .filter_map(|m| m.member_key.clone().map(|key| (key, (m.id, m.weight))))
    .collect();

  let to_add: Vec<&String> =
    constituent_weights.keys().filter(|s| !current.contains_key(*s)).collect();
  let to_remove: Vec<String> =
    current.keys().filter(|s| !constituent_weights.contains_key(*s)).cloned().collect();
  let maybe_changed: Vec<&String> =
    constituent_weights.keys().filter(|s| current.contains_key(*s)).collect();

  if !to_remove.is_empty() {
    IndexMembership::close_asset_symbols(conn, index_name, &to_remove).await?;
    result.removed = to_remove.len();
    info!("Closed {} memberships for {}", to_remove.len(), index_name);
  }

  for symbol in &to_add {
    let weight = constituent_weights.get(*symbol).copied().flatten();
    IndexMembership::insert_asset_member(conn, index_name, index_type, symbol, weight, source)
      .await?;
    result.added += 1;
  }
  if !to_add.is_empty() {
    info!("Added {} memberships for {}", to_add.len(), index_name);
  }

  for symbol in maybe_changed {
    let (membership_id, current_weight) = current[symbol];
    let new_weight = constituent_weights.get(symbol).copied().flatten();

    if weights_equal(current_weight, new_weight) {
      result.unchanged += 1;
      continue;
    }
    match mode {
      SyncMode::ScdType2 => {
        IndexMembership::close_by_id(conn, membership_id).await?;
        IndexMembership::insert_asset_member(conn, index_name, index_type, symbol, new_weight, source)
          .await?;
        // SCD weight changes count as a removal plus an addition
        result.removed += 1;
        result.added += 1;
      }
      SyncMode::InPlace => {
        IndexMembership::update_weight(conn, membership_id, new_weight).await?;
      }
    }
    result.weights_updated += 1;
  }

  if result.weights_updated > 0 {
    let mode_name = match mode {
      SyncMode::ScdType2 => "SCD Type 2",
      SyncMode::InPlace => "in-place",
    };
    info!("Updated {} weights for {} ({})", result.weights_updated, index_name, mode_name);
  }

  Ok(result)
}

impl Registry {
  /// Registry side of `POST /api/registry/indices/{name}/sync`: upsert the
  /// constituent assets, then diff memberships in SCD-Type-2 mode.
  pub async fn sync_index_from_constituents(
    &self,
    index_name: &str,
    constituents: &[Constituent],
  ) -> RegistryResult<IndexSyncResponse> {
    info!("Syncing {} constituents for '{}'", constituents.len(), index_name);

    let mut conn = self.pool.get().await?;

    let subtype = CodeRegistryRow::class_subtype_of(&mut conn, index_name, "provider")
      .await?
      .ok_or_else(|| RegistryError::NotFound(format!("Index '{index_name}' not found")))?;
    if subtype.as_deref() != Some("IndexProvider") {
      return Err(RegistryError::PermissionDenied(format!(
        "Cannot sync UserIndex '{index_name}'. Use the members endpoint instead."
      )));
    }

    let index_name = index_name.to_string();
    let response = conn
      .transaction::<_, RegistryError, _>(|conn| {
        let index_name = index_name.clone();
        Box::pin(async move {
          let mut response = IndexSyncResponse {
            index_class_name: index_name.clone(),
            ..Default::default()
          };

          let mut constituent_weights: HashMap<String, Option<f64>> = HashMap::new();
          for c in constituents {
            let asset_class = normalize_asset_class(c.asset_class.as_deref())
              .filter(|ac| ASSET_CLASSES.contains(&ac.as_str()));
            let row = AssetUpsert {
              class_name: index_name.clone(),
              class_type: "provider".to_string(),
              external_id: None,
              primary_id: None,
              symbol: c.symbol.clone(),
              matcher_symbol: c.matcher_symbol.clone().unwrap_or_else(|| c.symbol.clone()),
              name: Some(c.name.clone().unwrap_or_default()),
              exchange: Some(String::new()),
              asset_class,
              base_currency: Some(c.base_currency.clone().unwrap_or_default()),
              quote_currency: Some(c.quote_currency.clone().unwrap_or_default()),
              country: None,
            };
            match Asset::upsert_from_discovery(conn, &row).await? {
              UpsertOutcome::Inserted => response.assets_created += 1,
              UpsertOutcome::Updated => response.assets_updated += 1,
            }
            constituent_weights.insert(c.symbol.clone(), c.weight);
          }

          let sync = sync_memberships_core(
            conn,
            &index_name,
            "provider",
            &constituent_weights,
            SyncMode::ScdType2,
            "api",
          )
          .await?;
          response.members_added = sync.added;
          response.members_removed = sync.removed;
          response.members_unchanged = sync.unchanged;
          Ok(response)
        })
      })
      .await?;

    info!("Sync complete for '{}': {:?}", response.index_class_name, response);
    Ok(response)
  }

  /// Replace a user index's members wholesale (source = manual).
  pub async fn replace_user_index_members(
    &self,
    index_name: &str,
    members: &[UserIndexMember],
  ) -> RegistryResult<Vec<qh_database_postgres::models::membership::IndexMembership>> {
    info!("Updating members for '{}'", index_name);

    let mut conn = self.pool.get().await?;

    let subtype = CodeRegistryRow::class_subtype_of(&mut conn, index_name, "provider")
      .await?
      .ok_or_else(|| RegistryError::NotFound(format!("Index '{index_name}' not found")))?;
    if subtype.as_deref() != Some("UserIndex") {
      return Err(RegistryError::PermissionDenied(format!(
        "Cannot update members for IndexProvider '{index_name}'. Use the sync endpoint instead."
      )));
    }

    let index_name = index_name.to_string();
    conn
      .transaction::<_, RegistryError, _>(|conn| {
        let index_name = index_name.clone();
        Box::pin(async move {
          let symbols: Vec<String> = members.iter().map(|m| m.common_symbol.clone()).collect();
          if !symbols.is_empty() {
            let existing = CommonSymbol::existing_among(conn, &symbols).await?;
            let missing: Vec<&String> =
              symbols.iter().filter(|s| !existing.contains(s)).collect();
            if !missing.is_empty() {
              return Err(RegistryError::Validation(format!(
                "Invalid common_symbols: {missing:?}"
              )));
            }
          }

          IndexMembership::close_all_active(conn, &index_name).await?;

          let mut inserted = Vec::with_capacity(members.len());
          for member in members {
            inserted.push(
              IndexMembership::insert_common_member(
                conn,
                &index_name,
                "provider",
                &member.common_symbol,
                member.weight,
              )
              .await?,
            );
          }
          Ok(inserted)
        })
      })
      .await
  }

  /// Create a UserIndex registry row.
  pub async fn create_user_index(
    &self,
    name: &str,
    description: Option<&str>,
  ) -> RegistryResult<CodeRegistryRow> {
    info!("Creating UserIndex '{}'", name);
    let mut conn = self.pool.get().await?;
    let prefs = description.map(|d| serde_json::json!({ "description": d }));
    CodeRegistryRow::create_user_index(&mut conn, name, prefs).await.map_err(|e| {
      if qh_database_postgres::is_unique_violation(&e) {
        RegistryError::Conflict(format!("Index '{name}' already exists"))
      } else {
        e.into()
      }
    })
  }

  /// Delete a UserIndex (memberships cascade). IndexProviders are protected.
  pub async fn delete_index(&self, index_name: &str) -> RegistryResult<()> {
    info!("Deleting index '{}'", index_name);
    let mut conn = self.pool.get().await?;

    let subtype = CodeRegistryRow::class_subtype_of(&mut conn, index_name, "provider")
      .await?
      .ok_or_else(|| RegistryError::NotFound(format!("Index '{index_name}' not found")))?;
    if subtype.as_deref() != Some("UserIndex") {
      return Err(RegistryError::PermissionDenied(format!(
        "Cannot delete IndexProvider '{index_name}'. Only UserIndex can be deleted."
      )));
    }

    CodeRegistryRow::delete_class(&mut conn, index_name, "provider").await?;
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_weights_equal_both_null() {
    assert!(weights_equal(None, None));
  }

  #[test]
  fn test_weights_equal_one_null_is_a_change() {
    assert!(!weights_equal(Some(0.5), None));
    assert!(!weights_equal(None, Some(0.5)));
  }

  #[test]
  fn test_weights_equal_within_tolerance() {
    assert!(weights_equal(Some(0.25), Some(0.25 + 1e-12)));
    assert!(weights_equal(Some(1.0 / 3.0), Some(0.333333333333333333)));
  }

  #[test]
  fn test_weights_different_beyond_tolerance() {
    assert!(!weights_equal(Some(0.25), Some(0.2500001)));
  }
}
