use crate::config::ScheduleConfig;
use chrono::{DateTime, Duration, LocalResult, TimeZone};
use chrono_tz::Tz;

/// Next occurrence of the configured fire time strictly after `now`. A fire
/// instant landing in a DST gap rolls forward an hour; an ambiguous instant
/// resolves to the earlier of the two.
pub(crate) fn next_fire_after(now: DateTime<Tz>, schedule: &ScheduleConfig) -> DateTime<Tz> {
    let tz = schedule.timezone;
    let mut date = now.date_naive();

    for _ in 0..3 {
        if let Some(naive) = date.and_hms_opt(schedule.fire_hour, schedule.fire_minute, 0) {
            let candidate = match tz.from_local_datetime(&naive) {
                LocalResult::Single(instant) => Some(instant),
                LocalResult::Ambiguous(earlier, _later) => Some(earlier),
                LocalResult::None => tz.from_local_datetime(&(naive + Duration::hours(1))).earliest(),
            };
            if let Some(instant) = candidate {
                if instant > now {
                    return instant;
                }
            }
        }
        match date.succ_opt() {
            Some(next) => date = next,
            None => break,
        }
    }

    // Unreachable for any real calendar; keeps the signature total.
    now + Duration::days(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;
    use chrono_tz::Europe::Sofia;

    fn schedule(hour: u32, minute: u32) -> ScheduleConfig {
        ScheduleConfig::new("Europe/Sofia", hour, minute).unwrap()
    }

    fn sofia(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Tz> {
        Sofia.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
    }

    #[test]
    fn fires_later_today_when_still_ahead() {
        let next = next_fire_after(sofia(2026, 8, 29, 7, 0), &schedule(12, 10));
        assert_eq!(next, sofia(2026, 8, 29, 12, 10));
    }

    #[test]
    fn fires_tomorrow_when_already_past() {
        let next = next_fire_after(sofia(2026, 8, 29, 13, 0), &schedule(12, 10));
        assert_eq!(next, sofia(2026, 8, 30, 12, 10));
    }

    #[test]
    fn exact_fire_instant_schedules_next_day() {
        let fire = sofia(2026, 8, 29, 12, 10);
        let next = next_fire_after(fire, &schedule(12, 10));
        assert_eq!(next, sofia(2026, 8, 30, 12, 10));
    }

    #[test]
    fn consecutive_fires_are_a_wall_clock_day_apart() {
        let first = next_fire_after(sofia(2026, 8, 28, 23, 59), &schedule(8, 0));
        let second = next_fire_after(first, &schedule(8, 0));
        assert_eq!(second - first, Duration::hours(24));
        assert_eq!(second.hour(), 8);
        assert_eq!(second.minute(), 0);
    }

    #[test]
    fn spring_forward_gap_rolls_the_fire_an_hour_later() {
        // 2026-03-29 03:00 EET jumps to 04:00 EEST in Sofia; 03:30 never
        // happens that day.
        let next = next_fire_after(sofia(2026, 3, 28, 12, 0), &schedule(3, 30));
        assert_eq!(next, sofia(2026, 3, 29, 4, 30));
    }

    #[test]
    fn spring_forward_day_is_23_wall_clock_hours() {
        let before = next_fire_after(sofia(2026, 3, 28, 1, 0), &schedule(8, 0));
        let after = next_fire_after(before, &schedule(8, 0));
        assert_eq!(after - before, Duration::hours(23));
        assert_eq!(after.hour(), 8);
    }

    #[test]
    fn fall_back_ambiguity_takes_the_earlier_instant() {
        // 2026-10-25 04:00 EEST falls back to 03:00 EET; 03:30 occurs twice.
        let next = next_fire_after(sofia(2026, 10, 24, 12, 0), &schedule(3, 30));
        let expected = Sofia
            .with_ymd_and_hms(2026, 10, 25, 3, 30, 0)
            .earliest()
            .unwrap();
        assert_eq!(next, expected);
    }
}
