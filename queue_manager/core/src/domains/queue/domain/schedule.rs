//! Business-hours / date-window evaluation (spec.md §4.11).

use super::model::{BusinessHours, Schedule};
use chrono::{DateTime, Datelike, Duration, TimeZone, Utc};
use chrono_tz::Tz;

/// `is_queue_active(now)` (spec.md §4.11).
pub fn is_active(schedule: &Schedule, now: DateTime<Utc>) -> bool {
    if let Some(start) = schedule.start_date {
        if now < start {
            return false;
        }
    }
    if let Some(end) = schedule.end_date {
        if now > end {
            return false;
        }
    }

    if !schedule.specific_dates.is_empty() {
        return schedule.specific_dates.contains(&now.date_naive());
    }

    match &schedule.business_hours {
        Some(hours) => business_hours_active(hours, now),
        None => true,
    }
}

fn business_hours_active(hours: &BusinessHours, now: DateTime<Utc>) -> bool {
    let Ok(tz): Result<Tz, _> = hours.time_zone.parse() else {
        tracing::warn!(tz = %hours.time_zone, "unparseable time zone, treating queue as closed");
        return false;
    };
    let local = now.with_timezone(&tz);
    let weekday = local.weekday();
    let time = local.time();

    hours.working_days.contains(&weekday) && time >= hours.start_time && time <= hours.end_time
}

/// `next_activation_time(now)` (spec.md §4.11): nearest future instant at
/// which `is_active` flips to true. Scans forward minute by minute up to 14
/// days; queues whose schedule never reopens (e.g. a past `end_date`) return
/// `None`.
pub fn next_activation_time(schedule: &Schedule, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    if let Some(end) = schedule.end_date {
        if now > end {
            return None;
        }
    }

    let horizon = now + Duration::days(14);
    let mut candidate = align_to_minute(now) + Duration::minutes(1);
    while candidate <= horizon {
        if is_active(schedule, candidate) {
            return Some(candidate);
        }
        candidate += Duration::minutes(1);
    }
    None
}

fn align_to_minute(instant: DateTime<Utc>) -> DateTime<Utc> {
    Utc.timestamp_opt(instant.timestamp() - instant.timestamp() % 60, 0).single().unwrap_or(instant)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::queue::domain::model::BusinessHours;
    use chrono::{NaiveTime, Timelike, Weekday};

    fn weekday_9_to_5_utc() -> BusinessHours {
        BusinessHours::new(
            NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            NaiveTime::from_hms_opt(17, 0, 0).unwrap(),
            vec![Weekday::Mon, Weekday::Tue, Weekday::Wed, Weekday::Thu, Weekday::Fri],
            "UTC".into(),
        )
        .unwrap()
    }

    #[test]
    fn empty_working_days_rejected_at_construction() {
        let err = BusinessHours::new(
            NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            NaiveTime::from_hms_opt(17, 0, 0).unwrap(),
            vec![],
            "UTC".into(),
        );
        assert!(err.is_err());
    }

    #[test]
    fn saturday_is_closed_and_next_activation_is_monday_nine() {
        let schedule = Schedule { business_hours: Some(weekday_9_to_5_utc()), ..Default::default() };
        // Saturday 2026-08-01 10:00 UTC (confirmed Saturday).
        let saturday = Utc.with_ymd_and_hms(2026, 8, 1, 10, 0, 0).unwrap();
        assert!(!is_active(&schedule, saturday));

        let next = next_activation_time(&schedule, saturday).unwrap();
        assert_eq!(next.weekday(), Weekday::Mon);
        assert_eq!(next.time().hour(), 9);
    }

    #[test]
    fn weekday_within_hours_is_active() {
        let schedule = Schedule { business_hours: Some(weekday_9_to_5_utc()), ..Default::default() };
        let tuesday_noon = Utc.with_ymd_and_hms(2026, 8, 4, 12, 0, 0).unwrap();
        assert!(is_active(&schedule, tuesday_noon));
    }

    #[test]
    fn no_schedule_is_always_active() {
        let schedule = Schedule::default();
        assert!(is_active(&schedule, Utc::now()));
    }

    #[test]
    fn specific_dates_override_business_hours() {
        let mut schedule = Schedule { business_hours: Some(weekday_9_to_5_utc()), ..Default::default() };
        let saturday = Utc.with_ymd_and_hms(2026, 8, 1, 10, 0, 0).unwrap();
        schedule.specific_dates = vec![saturday.date_naive()];
        assert!(is_active(&schedule, saturday));

        let sunday = Utc.with_ymd_and_hms(2026, 8, 2, 10, 0, 0).unwrap();
        assert!(!is_active(&schedule, sunday));
    }

    #[test]
    fn outside_start_end_date_window_is_closed() {
        let schedule = Schedule {
            start_date: Some(Utc.with_ymd_and_hms(2026, 9, 1, 0, 0, 0).unwrap()),
            ..Default::default()
        };
        assert!(!is_active(&schedule, Utc::now()));
    }
}
