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

//! Asset mappings and the canonical common-symbol table.
//!
//! `common_symbols.symbol` is referenced by `asset_mapping` and
//! `index_memberships` with `ON UPDATE CASCADE`, so a rename here fans out
//! through both referencing tables in one statement.

use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use serde::{Deserialize, Serialize};

use crate::schema::{asset_mapping, common_symbols};

#[derive(Queryable, Selectable, Identifiable, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[diesel(table_name = asset_mapping)]
#[diesel(primary_key(class_name, class_type, class_symbol))]
pub struct AssetMapping {
  pub common_symbol: String,
  pub class_name: String,
  pub class_type: String,
  pub class_symbol: String,
  pub is_active: bool,
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = asset_mapping)]
pub struct NewAssetMapping {
  pub common_symbol: String,
  pub class_name: String,
  pub class_type: String,
  pub class_symbol: String,
  pub is_active: bool,
}

impl AssetMapping {
  /// Plain insert; constraint violations surface to the caller for
  /// status-code mapping.
  pub async fn create(
    conn: &mut diesel_async::AsyncPgConnection,
    row: &NewAssetMapping,
  ) -> Result<AssetMapping, diesel::result::Error> {
    diesel::insert_into(asset_mapping::table).values(row).get_result(conn).await
  }

  /// Candidate insert used by the automated mapper. Returns 0 when the
  /// provider symbol is already mapped.
  pub async fn insert_candidate(
    conn: &mut diesel_async::AsyncPgConnection,
    row: &NewAssetMapping,
  ) -> Result<usize, diesel::result::Error> {
    diesel::insert_into(asset_mapping::table)
      .values(row)
      .on_conflict((asset_mapping::class_name, asset_mapping::class_type, asset_mapping::class_symbol))
      .do_nothing()
      .execute(conn)
      .await
  }

  pub async fn find(
    conn: &mut diesel_async::AsyncPgConnection,
    class_name: &str,
    class_type: &str,
    class_symbol: &str,
  ) -> Result<Option<AssetMapping>, diesel::result::Error> {
    asset_mapping::table
      .find((class_name, class_type, class_symbol))
      .first(conn)
      .await
      .optional()
  }

  pub async fn delete(
    conn: &mut diesel_async::AsyncPgConnection,
    class_name: &str,
    class_type: &str,
    class_symbol: &str,
  ) -> Result<usize, diesel::result::Error> {
    diesel::delete(asset_mapping::table.find((class_name, class_type, class_symbol)))
      .execute(conn)
      .await
  }
}

#[derive(Queryable, Selectable, Identifiable, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[diesel(table_name = common_symbols)]
#[diesel(primary_key(symbol))]
pub struct CommonSymbol {
  pub symbol: String,
  pub ref_count: i32,
}

impl CommonSymbol {
  pub async fn exists(
    conn: &mut diesel_async::AsyncPgConnection,
    name: &str,
  ) -> Result<bool, diesel::result::Error> {
    use diesel::dsl::exists;
    use diesel::select;

    select(exists(common_symbols::table.filter(common_symbols::symbol.eq(name))))
      .get_result(conn)
      .await
  }

  /// Which of `names` exist in the table. Used to validate user-index member
  /// lists before replacement.
  pub async fn existing_among(
    conn: &mut diesel_async::AsyncPgConnection,
    names: &[String],
  ) -> Result<Vec<String>, diesel::result::Error> {
    common_symbols::table
      .filter(common_symbols::symbol.eq_any(names))
      .select(common_symbols::symbol)
      .load(conn)
      .await
  }

  /// Rename a common symbol. The `ON UPDATE CASCADE` references propagate
  /// the new name to `asset_mapping` and `index_memberships`.
  pub async fn rename(
    conn: &mut diesel_async::AsyncPgConnection,
    old_symbol: &str,
    new_symbol: &str,
  ) -> Result<usize, diesel::result::Error> {
    diesel::update(common_symbols::table.filter(common_symbols::symbol.eq(old_symbol)))
      .set(common_symbols::symbol.eq(new_symbol))
      .execute(conn)
      .await
  }
}
