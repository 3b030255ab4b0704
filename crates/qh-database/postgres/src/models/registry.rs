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

//! Code registry rows: one per uploaded provider/broker/index class.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::sql_types::Text;
use diesel_async::RunQueryDsl;
use serde::{Deserialize, Serialize};

use crate::schema::{accepted_intervals, code_registry};

#[derive(Queryable, Selectable, Identifiable, Debug, Clone, Serialize, Deserialize)]
#[diesel(table_name = code_registry)]
pub struct CodeRegistryRow {
  pub id: i32,
  pub class_name: String,
  pub class_type: String,
  pub class_subtype: Option<String>,
  pub file_path: Option<String>,
  pub file_hash: Option<Vec<u8>>,
  pub nonce: Option<Vec<u8>>,
  pub ciphertext: Option<Vec<u8>>,
  pub preferences: Option<serde_json::Value>,
  pub uploaded_at: DateTime<Utc>,
}

/// Index-sync scheduling config for one IndexProvider.
#[derive(QueryableByName, Debug, Clone, PartialEq)]
pub struct IndexSyncConfig {
  #[diesel(sql_type = Text)]
  pub class_name: String,
  #[diesel(sql_type = Text)]
  pub sync_frequency: String,
}

impl CodeRegistryRow {
  /// The registered provider row for a class name, None when unregistered.
  pub async fn provider_row(
    conn: &mut diesel_async::AsyncPgConnection,
    name: &str,
  ) -> Result<Option<CodeRegistryRow>, diesel::result::Error> {
    code_registry::table
      .filter(code_registry::class_name.eq(name))
      .filter(code_registry::class_type.eq("provider"))
      .first(conn)
      .await
      .optional()
  }

  pub async fn registered_id(
    conn: &mut diesel_async::AsyncPgConnection,
    name: &str,
    kind: &str,
  ) -> Result<Option<i32>, diesel::result::Error> {
    code_registry::table
      .filter(code_registry::class_name.eq(name))
      .filter(code_registry::class_type.eq(kind))
      .select(code_registry::id)
      .first(conn)
      .await
      .optional()
  }

  pub async fn class_subtype_of(
    conn: &mut diesel_async::AsyncPgConnection,
    name: &str,
    kind: &str,
  ) -> Result<Option<Option<String>>, diesel::result::Error> {
    code_registry::table
      .filter(code_registry::class_name.eq(name))
      .filter(code_registry::class_type.eq(kind))
      .select(code_registry::class_subtype)
      .first(conn)
      .await
      .optional()
  }

  /// All registered (class_name, class_type) pairs.
  pub async fn all_classes(
    conn: &mut diesel_async::AsyncPgConnection,
  ) -> Result<Vec<(String, String)>, diesel::result::Error> {
    code_registry::table
      .select((code_registry::class_name, code_registry::class_type))
      .load(conn)
      .await
  }

  /// IndexProvider rows with their sync frequency preference, defaulted
  /// to weekly when unset.
  pub async fn index_sync_configs(
    conn: &mut diesel_async::AsyncPgConnection,
  ) -> Result<Vec<IndexSyncConfig>, diesel::result::Error> {
    diesel::sql_query(
      r#"
        SELECT class_name,
               COALESCE(preferences->'scheduling'->>'sync_frequency', '1w') AS sync_frequency
        FROM code_registry
        WHERE class_subtype = 'IndexProvider'
      "#,
    )
    .load(conn)
    .await
  }

  /// Crypto quote-currency preference for a provider, when configured.
  pub async fn crypto_quote_preference(
    conn: &mut diesel_async::AsyncPgConnection,
    name: &str,
    kind: &str,
  ) -> Result<Option<String>, diesel::result::Error> {
    use diesel::sql_types::Nullable;

    #[derive(QueryableByName)]
    struct PrefRow {
      #[diesel(sql_type = Nullable<Text>)]
      preferred_quote: Option<String>,
    }

    let row: Option<PrefRow> = diesel::sql_query(
      r#"
        SELECT preferences->'crypto'->>'preferred_quote_currency' AS preferred_quote
        FROM code_registry
        WHERE class_name = $1 AND class_type = $2
      "#,
    )
    .bind::<Text, _>(name)
    .bind::<Text, _>(kind)
    .get_result(conn)
    .await
    .optional()?;

    Ok(row.and_then(|r| r.preferred_quote).filter(|p| !p.is_empty()))
  }

  /// Create a UserIndex registry row. Unique violations surface to the caller.
  pub async fn create_user_index(
    conn: &mut diesel_async::AsyncPgConnection,
    name: &str,
    prefs: Option<serde_json::Value>,
  ) -> Result<CodeRegistryRow, diesel::result::Error> {
    diesel::insert_into(code_registry::table)
      .values((
        code_registry::class_name.eq(name),
        code_registry::class_type.eq("provider"),
        code_registry::class_subtype.eq("UserIndex"),
        code_registry::preferences.eq(prefs),
      ))
      .get_result(conn)
      .await
  }

  pub async fn delete_class(
    conn: &mut diesel_async::AsyncPgConnection,
    name: &str,
    kind: &str,
  ) -> Result<usize, diesel::result::Error> {
    diesel::delete(
      code_registry::table
        .filter(code_registry::class_name.eq(name))
        .filter(code_registry::class_type.eq(kind)),
    )
    .execute(conn)
    .await
  }
}

/// Cron template for an accepted interval, e.g. `1w` -> weekly Monday cron.
pub async fn accepted_interval_cron(
  conn: &mut diesel_async::AsyncPgConnection,
  interval_name: &str,
) -> Result<Option<String>, diesel::result::Error> {
  accepted_intervals::table
    .filter(accepted_intervals::interval.eq(interval_name))
    .select(accepted_intervals::cron)
    .first(conn)
    .await
    .optional()
}
