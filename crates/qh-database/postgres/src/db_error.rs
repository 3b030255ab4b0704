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

//! Classification helpers for diesel database errors.
//!
//! Several flows branch on the exact violation kind: the bar insert protocol
//! falls back on duplicates, the identity matcher treats one specific
//! constraint as an expected outcome, and the mapping API maps constraint
//! names to user-facing messages.

use diesel::result::{DatabaseErrorKind, Error as DieselError};

pub fn is_unique_violation(err: &DieselError) -> bool {
  matches!(err, DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _))
}

pub fn is_foreign_key_violation(err: &DieselError) -> bool {
  matches!(err, DieselError::DatabaseError(DatabaseErrorKind::ForeignKeyViolation, _))
}

/// The violated constraint's name, when the backend reported one.
pub fn constraint_name(err: &DieselError) -> Option<&str> {
  match err {
    DieselError::DatabaseError(_, info) => info.constraint_name(),
    _ => None,
  }
}
