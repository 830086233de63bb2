//! Timezone resolution and next-fire computation
//!
//! Pure functions, no I/O. The scheduler and the acknowledgment path both
//! derive "today" and the next fire instant from here so the two can never
//! disagree about calendar days.
//!
//! - **Version**: 1.1.0
//! - **Since**: 0.3.0
//!
//! ## Changelog
//! - 1.1.0: DST-gap handling (nonexistent local times shift forward one hour)
//! - 1.0.0: Initial release

use anyhow::Result;
use chrono::{DateTime, Duration, LocalResult, NaiveDate, TimeZone, Utc};
use chrono_tz::Tz;

use crate::core::error::BotError;

use super::types::TimeOfDay;

/// Resolve an IANA zone name.
pub fn resolve_timezone(name: &str) -> Result<Tz> {
    name.parse::<Tz>()
        .map_err(|_| BotError::validation(format!("unknown timezone: {name}")))
}

/// Current wall-clock time in the given zone.
pub fn now_in(zone: Tz) -> DateTime<Tz> {
    Utc::now().with_timezone(&zone)
}

/// The next instant at which a reminder set for `at` should fire, given `now`
/// in the reminder's own timezone.
///
/// Today at `at` if that instant is strictly in the future, otherwise
/// tomorrow. The exact minute counts as already past: a reminder for 09:00
/// queried at 09:00:00 returns tomorrow, never "now".
pub fn next_fire_instant(now: DateTime<Tz>, at: TimeOfDay) -> DateTime<Tz> {
    let today = now.date_naive();
    let candidate = instant_on(now.timezone(), today, at);
    if candidate <= now {
        instant_on(now.timezone(), today + Duration::days(1), at)
    } else {
        candidate
    }
}

/// Minutes from `now` until the next fire of `at`. Used by the catch-up check.
pub fn minutes_until_next_fire(now: DateTime<Tz>, at: TimeOfDay) -> i64 {
    (next_fire_instant(now, at) - now).num_minutes()
}

/// Materialize `date` + `at` in `zone`.
///
/// Local times erased by a DST spring-forward shift one hour later; ambiguous
/// times during a fall-back take the earlier instant.
fn instant_on(zone: Tz, date: NaiveDate, at: TimeOfDay) -> DateTime<Tz> {
    let naive = date.and_time(at.naive());
    match zone.from_local_datetime(&naive) {
        LocalResult::Single(dt) => dt,
        LocalResult::Ambiguous(earlier, _) => earlier,
        LocalResult::None => match zone.from_local_datetime(&(naive + Duration::hours(1))) {
            LocalResult::Single(dt) => dt,
            LocalResult::Ambiguous(earlier, _) => earlier,
            LocalResult::None => zone.from_utc_datetime(&naive),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono_tz::America::New_York;
    use chrono_tz::Asia::Tashkent;

    fn tod(s: &str) -> TimeOfDay {
        s.parse().unwrap()
    }

    #[test]
    fn test_future_time_fires_today() {
        let now = Tashkent.with_ymd_and_hms(2026, 8, 6, 7, 55, 0).unwrap();
        let next = next_fire_instant(now, tod("08:00"));
        assert_eq!(next, Tashkent.with_ymd_and_hms(2026, 8, 6, 8, 0, 0).unwrap());
        assert_eq!(minutes_until_next_fire(now, tod("08:00")), 5);
    }

    #[test]
    fn test_past_time_fires_tomorrow() {
        let now = Tashkent.with_ymd_and_hms(2026, 8, 6, 9, 30, 0).unwrap();
        let next = next_fire_instant(now, tod("08:00"));
        assert_eq!(next, Tashkent.with_ymd_and_hms(2026, 8, 7, 8, 0, 0).unwrap());
    }

    #[test]
    fn test_exact_minute_counts_as_past() {
        // On the exact minute the fire goes to tomorrow, not "now".
        let now = Tashkent.with_ymd_and_hms(2026, 8, 6, 9, 0, 0).unwrap();
        let next = next_fire_instant(now, tod("09:00"));
        assert_eq!(next, Tashkent.with_ymd_and_hms(2026, 8, 7, 9, 0, 0).unwrap());
    }

    #[test]
    fn test_one_second_past_the_minute() {
        let now = Tashkent.with_ymd_and_hms(2026, 8, 6, 9, 0, 1).unwrap();
        let next = next_fire_instant(now, tod("09:00"));
        assert_eq!(next, Tashkent.with_ymd_and_hms(2026, 8, 7, 9, 0, 0).unwrap());
    }

    #[test]
    fn test_midnight_rollover() {
        let now = Tashkent.with_ymd_and_hms(2026, 8, 6, 23, 59, 30).unwrap();
        let next = next_fire_instant(now, tod("00:00"));
        assert_eq!(next, Tashkent.with_ymd_and_hms(2026, 8, 7, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_dst_gap_shifts_forward() {
        // 2026-03-08 02:30 does not exist in New York (spring forward).
        let now = New_York.with_ymd_and_hms(2026, 3, 8, 1, 0, 0).unwrap();
        let next = next_fire_instant(now, tod("02:30"));
        assert_eq!(next, New_York.with_ymd_and_hms(2026, 3, 8, 3, 30, 0).unwrap());
    }

    #[test]
    fn test_resolve_timezone() {
        assert!(resolve_timezone("Asia/Tashkent").is_ok());
        assert!(resolve_timezone("Europe/London").is_ok());
        assert!(resolve_timezone("Mars/Olympus").is_err());
        assert!(resolve_timezone("").is_err());
    }
}
