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

//! Trading calendar with custom support for crypto and forex markets.
//!
//! Provides a unified interface for checking market status by MIC (ISO 10383)
//! across stock exchanges, cryptocurrencies, and forex. Unknown MICs default
//! to "always open" so discovery of new markets is never starved.

use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, Utc, Weekday};
use chrono_tz::Tz;
use once_cell::sync::Lazy;
use std::collections::HashMap;
use tracing::warn;

/// Session definition for one market.
///
/// `weekmask` is indexed Monday..Sunday. Session times are in the market's
/// local timezone.
#[derive(Debug, Clone)]
pub struct CalendarSpec {
  pub mic: &'static str,
  pub tz: Tz,
  pub weekmask: [bool; 7],
  pub open: NaiveTime,
  pub close: NaiveTime,
}

const WEEKDAYS: [bool; 7] = [true, true, true, true, true, false, false];
const ALL_DAYS: [bool; 7] = [true, true, true, true, true, true, true];
// Mon-Fri plus Sunday so the forex open minute is captured
const FX_DAYS: [bool; 7] = [true, true, true, true, true, false, true];

fn full_day() -> (NaiveTime, NaiveTime) {
  (
    NaiveTime::from_hms_opt(0, 0, 0).expect("valid time"),
    NaiveTime::from_hms_opt(23, 59, 59).expect("valid time"),
  )
}

fn session(open_h: u32, open_m: u32, close_h: u32, close_m: u32) -> (NaiveTime, NaiveTime) {
  (
    NaiveTime::from_hms_opt(open_h, open_m, 0).expect("valid time"),
    NaiveTime::from_hms_opt(close_h, close_m, 0).expect("valid time"),
  )
}

/// Process-wide calendar registry, built lazily on first lookup.
static CALENDARS: Lazy<HashMap<&'static str, CalendarSpec>> = Lazy::new(|| {
  let mut m = HashMap::new();
  let mut add = |mic: &'static str, tz: Tz, weekmask: [bool; 7], times: (NaiveTime, NaiveTime)| {
    m.insert(mic, CalendarSpec { mic, tz, weekmask, open: times.0, close: times.1 });
  };

  // 24/7 cryptocurrency trading
  add("CRYPTO", chrono_tz::UTC, ALL_DAYS, full_day());
  // 24/5 forex, standard Sunday 5pm ET to Friday 5pm ET
  add("XFX", chrono_tz::America::New_York, FX_DAYS, full_day());

  // Major equity venues, regular sessions only
  add("XNYS", chrono_tz::America::New_York, WEEKDAYS, session(9, 30, 16, 0));
  add("XNAS", chrono_tz::America::New_York, WEEKDAYS, session(9, 30, 16, 0));
  add("ARCX", chrono_tz::America::New_York, WEEKDAYS, session(9, 30, 16, 0));
  add("XTSE", chrono_tz::America::Toronto, WEEKDAYS, session(9, 30, 16, 0));
  add("XLON", chrono_tz::Europe::London, WEEKDAYS, session(8, 0, 16, 30));
  add("XETR", chrono_tz::Europe::Berlin, WEEKDAYS, session(9, 0, 17, 30));
  add("XPAR", chrono_tz::Europe::Paris, WEEKDAYS, session(9, 0, 17, 30));
  add("XAMS", chrono_tz::Europe::Amsterdam, WEEKDAYS, session(9, 0, 17, 30));
  add("XBRU", chrono_tz::Europe::Brussels, WEEKDAYS, session(9, 0, 17, 30));
  add("XSWX", chrono_tz::Europe::Zurich, WEEKDAYS, session(9, 0, 17, 30));
  add("XTKS", chrono_tz::Asia::Tokyo, WEEKDAYS, session(9, 0, 15, 0));
  add("XHKG", chrono_tz::Asia::Hong_Kong, WEEKDAYS, session(9, 30, 16, 0));
  add("XASX", chrono_tz::Australia::Sydney, WEEKDAYS, session(10, 0, 16, 0));

  m
});

fn weekday_index(day: Weekday) -> usize {
  day.num_days_from_monday() as usize
}

/// Unified market-status interface keyed by MIC.
pub struct TradingCalendar;

impl TradingCalendar {
  fn get_calendar(mic: &str) -> Option<&'static CalendarSpec> {
    let spec = CALENDARS.get(mic.to_uppercase().as_str());
    if spec.is_none() {
      warn!("Calendar not found for MIC: {}. Defaulting to 'Always Open'.", mic);
    }
    spec
  }

  /// Check if the market for the given MIC is currently open.
  ///
  /// Used primarily by live data providers to decide whether a connection
  /// should be established. Defaults to `true` if the MIC is unknown.
  pub fn is_open_now(mic: &str) -> bool {
    Self::is_open_at(mic, Utc::now())
  }

  /// Check if the market is open at the given instant.
  pub fn is_open_at(mic: &str, at: DateTime<Utc>) -> bool {
    let Some(cal) = Self::get_calendar(mic) else {
      return true;
    };
    let local = at.with_timezone(&cal.tz);
    let day_ok = cal.weekmask[weekday_index(local.weekday())];
    let t = local.time();
    day_ok && t >= cal.open && t <= cal.close
  }

  /// Check if the given date is a valid trading session for the MIC.
  ///
  /// Used primarily by historical data providers to decide whether a pull
  /// should run for a specific date. Defaults to `true` if the MIC is unknown.
  pub fn is_session(mic: &str, day: NaiveDate) -> bool {
    let Some(cal) = Self::get_calendar(mic) else {
      return true;
    };
    cal.weekmask[weekday_index(day.weekday())]
  }

  /// Check if there were any trading sessions between two dates (inclusive).
  ///
  /// Used to decide whether a gap in historical data contains any sessions
  /// worth pulling. Defaults to `true` if the MIC is unknown.
  pub fn has_sessions_in_range(mic: &str, start: NaiveDate, end: NaiveDate) -> bool {
    let Some(cal) = Self::get_calendar(mic) else {
      return true;
    };
    if start > end {
      return false;
    }
    // A full week always contains a session for a non-empty weekmask
    if (end - start).num_days() >= 6 {
      return cal.weekmask.iter().any(|d| *d);
    }
    let mut day = start;
    while day <= end {
      if cal.weekmask[weekday_index(day.weekday())] {
        return true;
      }
      day = day.succ_opt().expect("date in range");
    }
    false
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::TimeZone;

  fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
  }

  #[test]
  fn test_crypto_is_always_open() {
    // Saturday 03:00 UTC
    let at = Utc.with_ymd_and_hms(2025, 12, 20, 3, 0, 0).unwrap();
    assert!(TradingCalendar::is_open_at("CRYPTO", at));
    assert!(TradingCalendar::is_session("CRYPTO", date(2025, 12, 20)));
  }

  #[test]
  fn test_unknown_mic_defaults_to_open() {
    assert!(TradingCalendar::is_open_now("XXXX"));
    assert!(TradingCalendar::is_session("XXXX", date(2025, 12, 20)));
    assert!(TradingCalendar::has_sessions_in_range("XXXX", date(2025, 12, 20), date(2025, 12, 20)));
  }

  #[test]
  fn test_equity_weekend_is_not_a_session() {
    assert!(!TradingCalendar::is_session("XNAS", date(2025, 12, 20))); // Saturday
    assert!(!TradingCalendar::is_session("XNAS", date(2025, 12, 21))); // Sunday
    assert!(TradingCalendar::is_session("XNAS", date(2025, 12, 19))); // Friday
  }

  #[test]
  fn test_saturday_only_range_has_no_sessions() {
    assert!(!TradingCalendar::has_sessions_in_range("XNAS", date(2025, 12, 20), date(2025, 12, 20)));
  }

  #[test]
  fn test_range_spanning_friday_has_sessions() {
    assert!(TradingCalendar::has_sessions_in_range("XNAS", date(2025, 12, 18), date(2025, 12, 20)));
  }

  #[test]
  fn test_full_week_range_always_has_sessions() {
    assert!(TradingCalendar::has_sessions_in_range("XNAS", date(2025, 12, 1), date(2025, 12, 31)));
  }

  #[test]
  fn test_inverted_range_is_empty() {
    assert!(!TradingCalendar::has_sessions_in_range("XNAS", date(2025, 12, 20), date(2025, 12, 19)));
  }

  #[test]
  fn test_equity_session_hours() {
    // Tuesday 2025-12-16 at 15:00 UTC == 10:00 New York, inside the session
    let open = Utc.with_ymd_and_hms(2025, 12, 16, 15, 0, 0).unwrap();
    assert!(TradingCalendar::is_open_at("XNAS", open));
    // Tuesday at 03:00 UTC == 22:00 Monday New York, outside the session
    let closed = Utc.with_ymd_and_hms(2025, 12, 16, 3, 0, 0).unwrap();
    assert!(!TradingCalendar::is_open_at("XNAS", closed));
  }

  #[test]
  fn test_forex_includes_sunday_excludes_saturday() {
    assert!(TradingCalendar::is_session("XFX", date(2025, 12, 21))); // Sunday
    assert!(!TradingCalendar::is_session("XFX", date(2025, 12, 20))); // Saturday
  }

  #[test]
  fn test_mic_lookup_is_case_insensitive() {
    assert!(!TradingCalendar::is_session("xnas", date(2025, 12, 20)));
  }
}
