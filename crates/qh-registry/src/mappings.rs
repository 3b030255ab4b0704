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

//! Mapping maintenance: manual mapping CRUD and common-symbol renames.
//!
//! Constraint violations carry user-facing meaning here: a foreign-key
//! failure names the missing reference (registered class vs. asset), and a
//! unique violation distinguishes "provider symbol already mapped" from
//! "one mapping per provider per common symbol".

use qh_database_postgres::db_error::{is_foreign_key_violation, is_unique_violation};
use qh_database_postgres::models::mapping::{AssetMapping, CommonSymbol, NewAssetMapping};
use qh_database_postgres::constraint_name;
use tracing::{info, warn};

use crate::Registry;
use crate::error::{RegistryError, RegistryResult};

impl Registry {
  /// Create a mapping between a common symbol and a provider-specific
  /// asset symbol.
  pub async fn create_asset_mapping(
    &self,
    mapping: NewAssetMapping,
  ) -> RegistryResult<AssetMapping> {
    let mut conn = self.pool.get().await?;
    AssetMapping::create(&mut conn, &mapping).await.map_err(|e| {
      if is_foreign_key_violation(&e) {
        let constraint = constraint_name(&e).unwrap_or_default().to_string();
        warn!("Foreign key violation creating mapping. Constraint: {}", constraint);
        let mut message = "Failed to create mapping due to missing related entity. ".to_string();
        match constraint.as_str() {
          "fk_asset_mapping_class_name" => message.push_str(&format!(
            "The class '{}' ({}) is not registered.",
            mapping.class_name, mapping.class_type
          )),
          "fk_asset_mapping_to_assets" => message.push_str(&format!(
            "The asset '{}' for class '{}' ({}) does not exist.",
            mapping.class_symbol, mapping.class_name, mapping.class_type
          )),
          _ => message.push_str("A referenced entity does not exist."),
        }
        RegistryError::ForeignKey(message)
      } else if is_unique_violation(&e) {
        let constraint = constraint_name(&e).unwrap_or_default().to_string();
        warn!("Unique constraint violation creating mapping. Constraint: {}", constraint);
        let mut message = "Failed to create mapping due to a conflict. ".to_string();
        match constraint.as_str() {
          "asset_mapping_pkey" => message.push_str(&format!(
            "The provider symbol '{}' for class '{}' ({}) is already mapped.",
            mapping.class_symbol, mapping.class_name, mapping.class_type
          )),
          "uq_common_per_class" => message.push_str(&format!(
            "The common symbol '{}' is already mapped for class '{}' ({}).",
            mapping.common_symbol, mapping.class_name, mapping.class_type
          )),
          _ => message.push_str("This mapping would create a duplicate entry."),
        }
        RegistryError::Conflict(message)
      } else {
        e.into()
      }
    })
  }

  /// Delete a mapping identified by its provider coordinates.
  pub async fn delete_asset_mapping(
    &self,
    class_name: &str,
    class_type: &str,
    class_symbol: &str,
  ) -> RegistryResult<()> {
    let mut conn = self.pool.get().await?;
    let deleted = AssetMapping::delete(&mut conn, class_name, class_type, class_symbol).await?;
    if deleted == 0 {
      warn!("Asset mapping not found for deletion: {}/{}/{}", class_name, class_type, class_symbol);
      return Err(RegistryError::NotFound("Asset mapping not found".to_string()));
    }
    info!("Deleted asset mapping for {}/{}/{}", class_name, class_type, class_symbol);
    Ok(())
  }

  /// Rename a common symbol.
  ///
  /// The actual fan-out happens in the database: `asset_mapping` and
  /// `index_memberships` reference `common_symbols.symbol` with
  /// `ON UPDATE CASCADE`, so every referencing row follows the rename.
  pub async fn rename_common_symbol(&self, old_symbol: &str, new_symbol: &str) -> RegistryResult<()> {
    let new_symbol = new_symbol.trim();
    if new_symbol.is_empty() {
      return Err(RegistryError::Validation("new symbol must be a non-empty string".to_string()));
    }

    let mut conn = self.pool.get().await?;
    if !CommonSymbol::exists(&mut conn, old_symbol).await? {
      return Err(RegistryError::NotFound(format!("Common symbol '{old_symbol}' not found")));
    }
    if CommonSymbol::exists(&mut conn, new_symbol).await? {
      return Err(RegistryError::Conflict(format!("Common symbol '{new_symbol}' already exists")));
    }

    CommonSymbol::rename(&mut conn, old_symbol, new_symbol).await.map_err(|e| {
      if is_unique_violation(&e) {
        RegistryError::Conflict(format!("Common symbol '{new_symbol}' already exists"))
      } else {
        RegistryError::from(e)
      }
    })?;
    info!("Renamed common symbol '{}' to '{}'", old_symbol, new_symbol);
    Ok(())
  }
}
