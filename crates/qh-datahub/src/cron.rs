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

//! Standard 5-field crontab parsing and the signed-offset trigger.
//!
//! Expressions are interpreted in UTC. The signed offset shifts the fire
//! time relative to the cron point: positive delays the job, negative fires
//! it early (live jobs use this to start receiving data before interval
//! close).

use chrono::{DateTime, Datelike, Duration, Timelike, Utc};

use crate::error::{DataHubError, DataHubResult};

/// Parsed 5-field crontab: minute hour day-of-month month day-of-week.
///
/// Fields are bitmasks. Day-of-week accepts 0-7 with both 0 and 7 meaning
/// Sunday. When day-of-month and day-of-week are both restricted, a day
/// matches if either does (standard cron semantics).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CronSchedule {
  minutes: u64,
  hours: u32,
  days_of_month: u32,
  months: u16,
  days_of_week: u8,
  dom_restricted: bool,
  dow_restricted: bool,
}

fn parse_field(field: &str, min: u32, max: u32) -> DataHubResult<(u64, bool)> {
  let mut mask: u64 = 0;
  let mut restricted = true;

  for item in field.split(',') {
    let (range, step) = match item.split_once('/') {
      Some((r, s)) => {
        let step: u32 = s
          .parse()
          .map_err(|_| DataHubError::Cron(format!("invalid step '{s}' in '{field}'")))?;
        if step == 0 {
          return Err(DataHubError::Cron(format!("zero step in '{field}'")));
        }
        (r, step)
      }
      None => (item, 1),
    };

    let (lo, hi) = if range == "*" {
      if step == 1 && field == "*" {
        restricted = false;
      }
      (min, max)
    } else if let Some((a, b)) = range.split_once('-') {
      let lo: u32 =
        a.parse().map_err(|_| DataHubError::Cron(format!("invalid value '{a}' in '{field}'")))?;
      let hi: u32 =
        b.parse().map_err(|_| DataHubError::Cron(format!("invalid value '{b}' in '{field}'")))?;
      (lo, hi)
    } else {
      let v: u32 = range
        .parse()
        .map_err(|_| DataHubError::Cron(format!("invalid value '{range}' in '{field}'")))?;
      (v, v)
    };

    if lo < min || hi > max || lo > hi {
      return Err(DataHubError::Cron(format!("value out of range [{min},{max}] in '{field}'")));
    }

    let mut v = lo;
    while v <= hi {
      mask |= 1 << v;
      v += step;
    }
  }

  Ok((mask, restricted))
}

impl CronSchedule {
  /// Parse a standard 5-field crontab string.
  pub fn from_crontab(expr: &str) -> DataHubResult<Self> {
    let fields: Vec<&str> = expr.split_whitespace().collect();
    if fields.len() != 5 {
      return Err(DataHubError::Cron(format!(
        "expected 5 fields, got {} in '{expr}'",
        fields.len()
      )));
    }

    let (minutes, _) = parse_field(fields[0], 0, 59)?;
    let (hours, _) = parse_field(fields[1], 0, 23)?;
    let (dom, dom_restricted) = parse_field(fields[2], 1, 31)?;
    let (months, _) = parse_field(fields[3], 1, 12)?;
    let (mut dow, dow_restricted) = parse_field(fields[4], 0, 7)?;
    // 7 is an alias for Sunday
    if dow & (1 << 7) != 0 {
      dow |= 1;
      dow &= !(1u64 << 7);
    }

    Ok(Self {
      minutes,
      hours: hours as u32,
      days_of_month: dom as u32,
      months: months as u16,
      days_of_week: dow as u8,
      dom_restricted,
      dow_restricted,
    })
  }

  fn day_matches(&self, date: chrono::NaiveDate) -> bool {
    let dom_ok = self.days_of_month & (1 << date.day()) != 0;
    // num_days_from_sunday: Sunday == 0, matching cron's day numbering
    let dow_ok = self.days_of_week & (1 << date.weekday().num_days_from_sunday()) != 0;
    match (self.dom_restricted, self.dow_restricted) {
      (true, true) => dom_ok || dow_ok,
      (true, false) => dom_ok,
      (false, true) => dow_ok,
      (false, false) => true,
    }
  }

  /// The next matching instant strictly after `after`, in UTC.
  pub fn next_after(&self, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let mut t = (after + Duration::minutes(1))
      .with_second(0)
      .and_then(|t| t.with_nanosecond(0))
      .expect("minute truncation");

    // Bounded scan; four years covers any satisfiable month/day combination
    for _ in 0..(4 * 366) {
      let date = t.date_naive();
      if self.months & (1 << date.month()) != 0 && self.day_matches(date) {
        for h in t.hour()..24 {
          if self.hours & (1 << h) == 0 {
            continue;
          }
          let first_minute = if h == t.hour() { t.minute() } else { 0 };
          for m in first_minute..60 {
            if self.minutes & (1 << m) != 0 {
              return Some(
                date.and_hms_opt(h, m, 0).expect("valid cron time").and_utc(),
              );
            }
          }
        }
      }
      t = date.succ_opt()?.and_hms_opt(0, 0, 0).expect("valid midnight").and_utc();
    }
    None
  }
}

/// A crontab trigger whose fire time is shifted by a signed number of
/// seconds relative to the cron point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OffsetCronTrigger {
  schedule: CronSchedule,
  offset_seconds: i64,
}

impl OffsetCronTrigger {
  pub fn from_crontab(expr: &str, offset_seconds: i64) -> DataHubResult<Self> {
    Ok(Self { schedule: CronSchedule::from_crontab(expr)?, offset_seconds })
  }

  /// Next fire time strictly after `now`.
  ///
  /// A fire at `cron_point + offset` is due after `now` exactly when the
  /// cron point is after `now - offset`, so the search runs in shifted time.
  pub fn next_fire(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let shifted = now - Duration::seconds(self.offset_seconds);
    self
      .schedule
      .next_after(shifted)
      .map(|cron_point| cron_point + Duration::seconds(self.offset_seconds))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::TimeZone;

  fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap()
  }

  #[test]
  fn test_every_minute() {
    let s = CronSchedule::from_crontab("* * * * *").unwrap();
    assert_eq!(s.next_after(at(2025, 6, 3, 10, 15, 30)), Some(at(2025, 6, 3, 10, 16, 0)));
  }

  #[test]
  fn test_daily_midnight() {
    let s = CronSchedule::from_crontab("0 0 * * *").unwrap();
    assert_eq!(s.next_after(at(2025, 6, 3, 10, 15, 0)), Some(at(2025, 6, 4, 0, 0, 0)));
    // An exact match is not "after"
    assert_eq!(s.next_after(at(2025, 6, 3, 0, 0, 0)), Some(at(2025, 6, 4, 0, 0, 0)));
  }

  #[test]
  fn test_step_minutes() {
    let s = CronSchedule::from_crontab("*/15 * * * *").unwrap();
    assert_eq!(s.next_after(at(2025, 6, 3, 10, 16, 0)), Some(at(2025, 6, 3, 10, 30, 0)));
  }

  #[test]
  fn test_weekly_monday() {
    // 2025-06-03 is a Tuesday; next Monday is 2025-06-09
    let s = CronSchedule::from_crontab("0 0 * * 1").unwrap();
    assert_eq!(s.next_after(at(2025, 6, 3, 12, 0, 0)), Some(at(2025, 6, 9, 0, 0, 0)));
  }

  #[test]
  fn test_sunday_alias_seven() {
    let s0 = CronSchedule::from_crontab("0 0 * * 0").unwrap();
    let s7 = CronSchedule::from_crontab("0 0 * * 7").unwrap();
    assert_eq!(s0.next_after(at(2025, 6, 3, 0, 0, 0)), s7.next_after(at(2025, 6, 3, 0, 0, 0)));
    // 2025-06-08 is a Sunday
    assert_eq!(s0.next_after(at(2025, 6, 3, 0, 0, 0)), Some(at(2025, 6, 8, 0, 0, 0)));
  }

  #[test]
  fn test_dom_and_dow_are_ored_when_both_restricted() {
    // 1st of month OR Monday. From Tue 2025-06-03, the next match is
    // Monday 2025-06-09 (before July 1st).
    let s = CronSchedule::from_crontab("0 0 1 * 1").unwrap();
    assert_eq!(s.next_after(at(2025, 6, 3, 0, 0, 0)), Some(at(2025, 6, 9, 0, 0, 0)));
  }

  #[test]
  fn test_month_rollover() {
    let s = CronSchedule::from_crontab("30 9 1 * *").unwrap();
    assert_eq!(s.next_after(at(2025, 6, 15, 0, 0, 0)), Some(at(2025, 7, 1, 9, 30, 0)));
  }

  #[test]
  fn test_ranges_and_lists() {
    let s = CronSchedule::from_crontab("0 9-17 * * 1-5").unwrap();
    // Friday 18:00 -> Monday 09:00
    assert_eq!(s.next_after(at(2025, 6, 6, 18, 0, 0)), Some(at(2025, 6, 9, 9, 0, 0)));

    let s = CronSchedule::from_crontab("0,30 * * * *").unwrap();
    assert_eq!(s.next_after(at(2025, 6, 3, 10, 1, 0)), Some(at(2025, 6, 3, 10, 30, 0)));
  }

  #[test]
  fn test_invalid_expressions_rejected() {
    assert!(CronSchedule::from_crontab("* * * *").is_err());
    assert!(CronSchedule::from_crontab("61 * * * *").is_err());
    assert!(CronSchedule::from_crontab("* 25 * * *").is_err());
    assert!(CronSchedule::from_crontab("*/0 * * * *").is_err());
    assert!(CronSchedule::from_crontab("a * * * *").is_err());
  }

  #[test]
  fn test_positive_offset_delays_fire() {
    // Daily midnight cron shifted one hour later
    let t = OffsetCronTrigger::from_crontab("0 0 * * *", 3600).unwrap();
    assert_eq!(t.next_fire(at(2025, 6, 3, 10, 0, 0)), Some(at(2025, 6, 4, 1, 0, 0)));
  }

  #[test]
  fn test_negative_offset_fires_early() {
    // Live jobs begin 30 seconds before the cron point
    let t = OffsetCronTrigger::from_crontab("0 0 * * *", -30).unwrap();
    assert_eq!(t.next_fire(at(2025, 6, 3, 10, 0, 0)), Some(at(2025, 6, 3, 23, 59, 30)));
  }

  #[test]
  fn test_negative_offset_window_straddles_cron_point() {
    // 23:59:45 is after today's shifted fire; the next one belongs to
    // tomorrow's cron point.
    let t = OffsetCronTrigger::from_crontab("0 0 * * *", -30).unwrap();
    assert_eq!(t.next_fire(at(2025, 6, 3, 23, 59, 45)), Some(at(2025, 6, 4, 23, 59, 30)));
  }
}
