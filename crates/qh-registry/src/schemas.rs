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

//! Response and request shapes for the Registry API surface.

use serde::{Deserialize, Serialize};

/// Summary of one asset-update run for a provider.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct UpdateAssetsResponse {
  pub class_name: String,
  pub class_type: String,
  pub total_symbols: usize,
  pub processed_symbols: usize,
  pub added_symbols: usize,
  pub updated_symbols: usize,
  pub failed_symbols: usize,
  pub identity_matched: usize,
  pub identity_skipped: usize,
  pub mappings_created: usize,
  pub mappings_skipped: usize,
  pub mappings_failed: usize,
  pub members_added: usize,
  pub members_removed: usize,
  pub members_unchanged: usize,
  pub status: u16,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub error: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub message: Option<String>,
}

impl UpdateAssetsResponse {
  pub fn new(class_name: &str, class_type: &str) -> Self {
    Self {
      class_name: class_name.to_string(),
      class_type: class_type.to_string(),
      status: 200,
      ..Default::default()
    }
  }
}

/// Counters returned by the index sync endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct IndexSyncResponse {
  pub index_class_name: String,
  pub assets_created: usize,
  pub assets_updated: usize,
  pub members_added: usize,
  pub members_removed: usize,
  pub members_unchanged: usize,
}

/// One proposed member for a user-maintained index.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserIndexMember {
  pub common_symbol: String,
  #[serde(default)]
  pub weight: Option<f64>,
}

/// One suggested source-to-target mapping with its score breakdown.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SuggestionItem {
  pub source_class: String,
  pub source_type: String,
  pub source_symbol: String,
  pub source_name: Option<String>,
  pub target_class: String,
  pub target_type: String,
  pub target_symbol: String,
  pub target_name: Option<String>,
  pub target_common_symbol: Option<String>,
  pub proposed_common_symbol: Option<String>,
  pub score: f64,
  pub id_match: bool,
  pub external_id_match: bool,
  pub norm_match: bool,
  pub base_quote_match: bool,
  pub exchange_match: bool,
  pub sym_root_similarity: f64,
  pub name_similarity: f64,
  pub target_already_mapped: bool,
}

/// Cursor-paginated suggestion listing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SuggestionsResponse {
  pub items: Vec<SuggestionItem>,
  pub total: Option<i64>,
  pub limit: i64,
  pub next_cursor: Option<String>,
  pub has_more: bool,
}

/// Query parameters for the suggestion scorer.
#[derive(Debug, Clone)]
pub struct SuggestionQuery {
  pub source_class: String,
  pub source_type: Option<String>,
  pub target_class: Option<String>,
  pub target_type: Option<String>,
  pub search: Option<String>,
  pub min_score: f64,
  pub limit: i64,
  pub cursor: Option<String>,
  pub include_total: bool,
}

impl Default for SuggestionQuery {
  fn default() -> Self {
    Self {
      source_class: String::new(),
      source_type: None,
      target_class: None,
      target_type: None,
      search: None,
      min_score: 30.0,
      limit: 50,
      cursor: None,
      include_total: false,
    }
  }
}
