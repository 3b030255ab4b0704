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

//! Even interval boundary arithmetic for live bar collection cutoffs.

use chrono::{DateTime, Datelike, Days, NaiveDate, TimeZone, Utc};
use qh_core::Interval;

/// Calculate the next even interval boundary strictly after `now`.
///
/// Intraday intervals snap to the UTC epoch grid (5min marks at :00/:05/...,
/// 4h marks at 00/04/08/...); `1d` is the next UTC midnight, `1w` the next
/// Monday midnight, `1M` the first of the next month.
pub fn next_interval_boundary(interval: Interval, now: DateTime<Utc>) -> DateTime<Utc> {
  if let Some(mins) = interval.minutes() {
    let step = i64::from(mins) * 60;
    let next = (now.timestamp().div_euclid(step) + 1) * step;
    return Utc.timestamp_opt(next, 0).single().expect("valid boundary timestamp");
  }

  let today = now.date_naive();
  let next_day = match interval {
    Interval::Day1 => today.checked_add_days(Days::new(1)),
    Interval::Week1 => {
      let mut to_monday = u64::from((7 - today.weekday().num_days_from_monday()) % 7);
      if to_monday == 0 {
        to_monday = 7;
      }
      today.checked_add_days(Days::new(to_monday))
    }
    Interval::Month1 => {
      let (y, m) = if today.month() == 12 { (today.year() + 1, 1) } else { (today.year(), today.month() + 1) };
      NaiveDate::from_ymd_opt(y, m, 1)
    }
    _ => unreachable!("intraday intervals handled above"),
  };
  next_day
    .expect("valid boundary date")
    .and_hms_opt(0, 0, 0)
    .expect("valid midnight")
    .and_utc()
}

#[cfg(test)]
mod tests {
  use super::*;

  fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap()
  }

  #[test]
  fn test_one_minute_boundary() {
    assert_eq!(next_interval_boundary(Interval::Min1, at(2025, 6, 3, 10, 15, 30)), at(2025, 6, 3, 10, 16, 0));
  }

  #[test]
  fn test_five_minute_boundary() {
    assert_eq!(next_interval_boundary(Interval::Min5, at(2025, 6, 3, 10, 12, 0)), at(2025, 6, 3, 10, 15, 0));
    // An exact mark rolls to the next one
    assert_eq!(next_interval_boundary(Interval::Min5, at(2025, 6, 3, 10, 55, 0)), at(2025, 6, 3, 11, 0, 0));
  }

  #[test]
  fn test_thirty_minute_boundary_crosses_hour() {
    assert_eq!(next_interval_boundary(Interval::Min30, at(2025, 6, 3, 10, 45, 0)), at(2025, 6, 3, 11, 0, 0));
  }

  #[test]
  fn test_four_hour_boundary_crosses_midnight() {
    assert_eq!(next_interval_boundary(Interval::Hour4, at(2025, 6, 3, 22, 5, 0)), at(2025, 6, 4, 0, 0, 0));
    assert_eq!(next_interval_boundary(Interval::Hour4, at(2025, 6, 3, 13, 0, 0)), at(2025, 6, 3, 16, 0, 0));
  }

  #[test]
  fn test_daily_boundary_is_next_midnight() {
    assert_eq!(next_interval_boundary(Interval::Day1, at(2025, 6, 3, 0, 0, 0)), at(2025, 6, 4, 0, 0, 0));
  }

  #[test]
  fn test_weekly_boundary_is_next_monday() {
    // 2025-06-03 is a Tuesday; next Monday is 2025-06-09
    assert_eq!(next_interval_boundary(Interval::Week1, at(2025, 6, 3, 12, 0, 0)), at(2025, 6, 9, 0, 0, 0));
    // On a Monday, roll a full week forward
    assert_eq!(next_interval_boundary(Interval::Week1, at(2025, 6, 9, 1, 0, 0)), at(2025, 6, 16, 0, 0, 0));
  }

  #[test]
  fn test_monthly_boundary_handles_year_end() {
    assert_eq!(next_interval_boundary(Interval::Month1, at(2025, 12, 15, 9, 0, 0)), at(2026, 1, 1, 0, 0, 0));
    assert_eq!(next_interval_boundary(Interval::Month1, at(2025, 6, 3, 9, 0, 0)), at(2025, 7, 1, 0, 0, 0));
  }
}
