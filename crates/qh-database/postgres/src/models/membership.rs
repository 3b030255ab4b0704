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

//! Index membership rows (SCD Type 2).
//!
//! A membership is active while `valid_to IS NULL`; at most one active row
//! may exist per (index, member key). API-sourced indices key members by
//! `asset_symbol`, user indices by `common_symbol`.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use serde::{Deserialize, Serialize};

use crate::schema::index_memberships;

#[derive(Queryable, Selectable, Identifiable, Debug, Clone, Serialize, Deserialize)]
#[diesel(table_name = index_memberships)]
pub struct IndexMembership {
  pub id: i32,
  pub index_class_name: String,
  pub index_class_type: String,
  pub asset_class_name: Option<String>,
  pub asset_class_type: Option<String>,
  pub asset_symbol: Option<String>,
  pub common_symbol: Option<String>,
  pub weight: Option<f64>,
  pub source: String,
  pub valid_from: DateTime<Utc>,
  pub valid_to: Option<DateTime<Utc>>,
}

/// One currently-active member: (row id, member key, weight).
#[derive(Queryable, Debug, Clone, PartialEq)]
pub struct ActiveMember {
  pub id: i32,
  pub member_key: Option<String>,
  pub weight: Option<f64>,
}

impl IndexMembership {
  /// Active members of an API-sourced index, keyed by `asset_symbol`.
  pub async fn active_by_asset_symbol(
    conn: &mut diesel_async::AsyncPgConnection,
    index_name: &str,
  ) -> Result<Vec<ActiveMember>, diesel::result::Error> {
    use crate::schema::index_memberships::dsl::*;

    index_memberships
      .filter(index_class_name.eq(index_name))
      .filter(valid_to.is_null())
      .select((id, asset_symbol, weight))
      .load(conn)
      .await
  }

  /// Close the active rows for the given asset symbols.
  pub async fn close_asset_symbols(
    conn: &mut diesel_async::AsyncPgConnection,
    index_name: &str,
    symbols: &[String],
  ) -> Result<usize, diesel::result::Error> {
    use crate::schema::index_memberships::dsl::*;

    diesel::update(
      index_memberships
        .filter(index_class_name.eq(index_name))
        .filter(asset_symbol.eq_any(symbols))
        .filter(valid_to.is_null()),
    )
    .set(valid_to.eq(diesel::dsl::now))
    .execute(conn)
    .await
  }

  /// Close one active row by id.
  pub async fn close_by_id(
    conn: &mut diesel_async::AsyncPgConnection,
    membership_id: i32,
  ) -> Result<usize, diesel::result::Error> {
    use crate::schema::index_memberships::dsl::*;

    diesel::update(index_memberships.filter(id.eq(membership_id)))
      .set(valid_to.eq(diesel::dsl::now))
      .execute(conn)
      .await
  }

  /// Close every active row of an index (user-index full replacement).
  pub async fn close_all_active(
    conn: &mut diesel_async::AsyncPgConnection,
    index_name: &str,
  ) -> Result<usize, diesel::result::Error> {
    use crate::schema::index_memberships::dsl::*;

    diesel::update(
      index_memberships.filter(index_class_name.eq(index_name)).filter(valid_to.is_null()),
    )
    .set(valid_to.eq(diesel::dsl::now))
    .execute(conn)
    .await
  }

  /// Insert a new active membership for an API-sourced index member.
  pub async fn insert_asset_member(
    conn: &mut diesel_async::AsyncPgConnection,
    index_name: &str,
    index_type: &str,
    symbol: &str,
    member_weight: Option<f64>,
    member_source: &str,
  ) -> Result<usize, diesel::result::Error> {
    use crate::schema::index_memberships::dsl::*;

    diesel::insert_into(index_memberships)
      .values((
        index_class_name.eq(index_name),
        index_class_type.eq(index_type),
        asset_class_name.eq(index_name),
        asset_class_type.eq(index_type),
        asset_symbol.eq(symbol),
        weight.eq(member_weight),
        source.eq(member_source),
      ))
      .execute(conn)
      .await
  }

  /// Insert a new active membership for a user-index member, returning the row.
  pub async fn insert_common_member(
    conn: &mut diesel_async::AsyncPgConnection,
    index_name: &str,
    index_type: &str,
    member_common_symbol: &str,
    member_weight: Option<f64>,
  ) -> Result<IndexMembership, diesel::result::Error> {
    use crate::schema::index_memberships::dsl::*;

    diesel::insert_into(index_memberships)
      .values((
        index_class_name.eq(index_name),
        index_class_type.eq(index_type),
        common_symbol.eq(member_common_symbol),
        weight.eq(member_weight),
        source.eq("manual"),
      ))
      .get_result(conn)
      .await
  }

  /// In-place weight update for one active row.
  pub async fn update_weight(
    conn: &mut diesel_async::AsyncPgConnection,
    membership_id: i32,
    new_weight: Option<f64>,
  ) -> Result<usize, diesel::result::Error> {
    use crate::schema::index_memberships::dsl::*;

    diesel::update(index_memberships.filter(id.eq(membership_id)))
      .set(weight.eq(new_weight))
      .execute(conn)
      .await
  }
}
