// src/ranking/window.rs

use chrono::{DateTime, Datelike, Duration, FixedOffset, Offset, TimeZone, Utc};
use chrono_tz::Tz;
use serde::Serialize;

/// Zone whose calendar defines the trending week.
pub const DEFAULT_WEEK_ZONE: &str = "Asia/Jerusalem";

/// Calendar week used to scope weekly engagement: local Sunday 00:00 up to
/// (excluding) the following Sunday 00:00, expressed in UTC.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WeekWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    /// Zone offset sampled at the reference instant, as `±HH:MM`.
    pub utc_offset: String,
}

impl WeekWindow {
    /// Resolves the week containing `reference` in `zone`.
    ///
    /// The zone offset is sampled once at `reference` and reused for the
    /// local midnight of every day walked back. When a DST change falls
    /// between Sunday and the reference day, `start` lands one hour off the
    /// true local midnight.
    pub fn containing(reference: DateTime<Utc>, zone: Tz) -> Self {
        let offset = zone.offset_from_utc_datetime(&reference.naive_utc()).fix();
        let local = reference.with_timezone(&offset);
        let days_since_sunday = i64::from(local.weekday().num_days_from_sunday());

        let local_midnight = local.date_naive().and_hms_opt(0, 0, 0).unwrap_or_default();
        let midnight_utc = local_midnight - Duration::seconds(i64::from(offset.local_minus_utc()));
        let start = midnight_utc.and_utc() - Duration::days(days_since_sunday);

        Self {
            start,
            end: start + Duration::days(7),
            utc_offset: format_offset(offset),
        }
    }

    /// Half-open membership test: `start <= at < end`.
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.start <= at && at < self.end
    }
}

/// Parses an IANA zone name, falling back to UTC (`+00:00`).
pub fn resolve_zone(name: &str) -> Tz {
    name.trim().parse::<Tz>().unwrap_or_else(|e| {
        tracing::warn!("Unknown week timezone {:?} ({}), using UTC", name, e);
        Tz::UTC
    })
}

/// Formats a fixed offset as `±HH:MM`.
pub fn format_offset(offset: FixedOffset) -> String {
    let seconds = offset.local_minus_utc();
    let sign = if seconds < 0 { '-' } else { '+' };
    let minutes = seconds.abs() / 60;
    format!("{}{:02}:{:02}", sign, minutes / 60, minutes % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    fn jerusalem() -> Tz {
        resolve_zone(DEFAULT_WEEK_ZONE)
    }

    #[test]
    fn winter_week_starts_sunday_local_midnight() {
        // Wednesday 2024-03-20 14:00 in Israel (UTC+2)
        let w = WeekWindow::containing(at(2024, 3, 20, 12, 0), jerusalem());
        assert_eq!(w.start, at(2024, 3, 16, 22, 0));
        assert_eq!(w.end, at(2024, 3, 23, 22, 0));
        assert_eq!(w.utc_offset, "+02:00");
    }

    #[test]
    fn summer_week_uses_summer_offset() {
        let w = WeekWindow::containing(at(2024, 7, 10, 9, 0), jerusalem());
        assert_eq!(w.start, at(2024, 7, 6, 21, 0));
        assert_eq!(w.utc_offset, "+03:00");
    }

    #[test]
    fn window_is_always_seven_days() {
        let zone = jerusalem();
        let mut t = at(2024, 1, 1, 0, 0);
        while t < at(2025, 1, 1, 0, 0) {
            let w = WeekWindow::containing(t, zone);
            assert_eq!(w.end - w.start, Duration::days(7));
            t += Duration::hours(7);
        }
    }

    #[test]
    fn same_local_week_gives_same_window() {
        let zone = jerusalem();
        let sunday_start = WeekWindow::containing(at(2024, 3, 16, 22, 0), zone);
        let saturday_late = WeekWindow::containing(at(2024, 3, 23, 21, 59), zone);
        assert_eq!(sunday_start, saturday_late);
        assert!(saturday_late.contains(at(2024, 3, 23, 21, 59)));

        let next = WeekWindow::containing(at(2024, 3, 23, 22, 0), zone);
        assert_eq!(next.start, at(2024, 3, 23, 22, 0));
        assert!(!sunday_start.contains(next.start));
    }

    #[test]
    fn dst_change_inside_week_keeps_single_offset_sample() {
        // Clocks moved forward on Friday 2024-03-29. Saturday samples +03:00,
        // so the start is one hour before the true Sunday midnight (22:00Z).
        let w = WeekWindow::containing(at(2024, 3, 30, 10, 0), jerusalem());
        assert_eq!(w.utc_offset, "+03:00");
        assert_eq!(w.start, at(2024, 3, 23, 21, 0));
    }

    #[test]
    fn unknown_zone_falls_back_to_utc() {
        let zone = resolve_zone("Mars/Olympus_Mons");
        let w = WeekWindow::containing(at(2024, 3, 20, 12, 0), zone);
        assert_eq!(w.utc_offset, "+00:00");
        assert_eq!(w.start, at(2024, 3, 17, 0, 0));
    }

    #[test]
    fn negative_offsets_are_signed() {
        let offset = FixedOffset::west_opt(3 * 3600 + 30 * 60).unwrap();
        assert_eq!(format_offset(offset), "-03:30");
    }
}
