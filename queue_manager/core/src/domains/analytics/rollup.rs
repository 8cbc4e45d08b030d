//! Analytics rollup (spec.md §4.13). Pure functions of a session stream;
//! deterministic for a fixed input set, no I/O.

use crate::domains::queue::domain::model::{SessionStatus, UserSession};
use chrono::{DateTime, Duration, Timelike, Utc};
use serde::Serialize;
use shared_types::TimeRange;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BucketGranularity {
    Hourly,
    Daily,
}

#[derive(Debug, Clone, Serialize)]
pub struct Bucket {
    pub bucket_start: DateTime<Utc>,
    pub new: u64,
    pub released: u64,
    pub avg_wait_seconds: Option<f64>,
    pub still_waiting: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalyticsBundle {
    pub waiting: u64,
    pub serving: u64,
    pub released: u64,
    pub dropped: u64,
    pub avg_wait_seconds: Option<f64>,
    pub avg_serve_seconds: Option<f64>,
    pub throughput_per_hour: f64,
    pub peak_throughput_per_hour: f64,
    pub buckets: Vec<Bucket>,
}

/// `analytics(queue_id, range)` (spec.md §6, computed per §4.13). `sessions`
/// is every session whose `enqueued_at` falls in `range`, already
/// tenant/queue scoped by the caller.
pub fn rollup(sessions: &[UserSession], range: TimeRange, granularity: BucketGranularity) -> AnalyticsBundle {
    let waiting = count(sessions, SessionStatus::Waiting);
    let serving = count(sessions, SessionStatus::Serving);
    let released = count(sessions, SessionStatus::Released);
    let dropped = count(sessions, SessionStatus::Dropped);

    let avg_wait_seconds = mean_duration_seconds(sessions.iter().filter_map(|s| {
        if s.status != SessionStatus::Released {
            return None;
        }
        s.released_at.map(|r| r - s.enqueued_at)
    }));

    let avg_serve_seconds = mean_duration_seconds(sessions.iter().filter_map(|s| {
        if s.status != SessionStatus::Released {
            return None;
        }
        match (s.served_at, s.released_at) {
            (Some(served), Some(released)) => Some(released - served),
            _ => None,
        }
    }));

    let window_hours = (range.duration_seconds() / 3600.0).max(1e-9);
    let throughput_per_hour = released as f64 / window_hours;

    let buckets = bucketize(sessions, range, granularity);
    let peak_throughput_per_hour = buckets
        .iter()
        .map(|b| b.released as f64 / bucket_hours(granularity))
        .fold(0.0_f64, f64::max);

    AnalyticsBundle {
        waiting,
        serving,
        released,
        dropped,
        avg_wait_seconds,
        avg_serve_seconds,
        throughput_per_hour,
        peak_throughput_per_hour,
        buckets,
    }
}

fn count(sessions: &[UserSession], status: SessionStatus) -> u64 {
    sessions.iter().filter(|s| s.status == status).count() as u64
}

fn mean_duration_seconds(durations: impl Iterator<Item = Duration>) -> Option<f64> {
    let (sum_ms, count) = durations.fold((0i64, 0u64), |(sum, count), d| (sum + d.num_milliseconds(), count + 1));
    if count == 0 {
        None
    } else {
        Some(sum_ms as f64 / 1000.0 / count as f64)
    }
}

fn bucket_hours(granularity: BucketGranularity) -> f64 {
    match granularity {
        BucketGranularity::Hourly => 1.0,
        BucketGranularity::Daily => 24.0,
    }
}

fn bucket_start(instant: DateTime<Utc>, granularity: BucketGranularity) -> DateTime<Utc> {
    match granularity {
        BucketGranularity::Hourly => instant.date_naive().and_hms_opt(instant.time().hour(), 0, 0).unwrap().and_utc(),
        BucketGranularity::Daily => instant.date_naive().and_hms_opt(0, 0, 0).unwrap().and_utc(),
    }
}

fn bucketize(sessions: &[UserSession], range: TimeRange, granularity: BucketGranularity) -> Vec<Bucket> {
    let mut buckets: BTreeMap<DateTime<Utc>, (u64, u64, Vec<Duration>, u64)> = BTreeMap::new();
    let step = match granularity {
        BucketGranularity::Hourly => Duration::hours(1),
        BucketGranularity::Daily => Duration::days(1),
    };

    let mut cursor = bucket_start(range.start, granularity);
    while cursor < range.end {
        buckets.entry(cursor).or_default();
        cursor += step;
    }

    for session in sessions {
        if range.contains(session.enqueued_at) {
            let key = bucket_start(session.enqueued_at, granularity);
            let entry = buckets.entry(key).or_default();
            entry.0 += 1;
        }
        if session.status == SessionStatus::Released {
            if let Some(released_at) = session.released_at {
                if range.contains(released_at) {
                    let key = bucket_start(released_at, granularity);
                    let entry = buckets.entry(key).or_default();
                    entry.1 += 1;
                    entry.2.push(released_at - session.enqueued_at);
                }
            }
        }
        if session.status == SessionStatus::Waiting && range.contains(session.enqueued_at) {
            let key = bucket_start(session.enqueued_at, granularity);
            buckets.entry(key).or_default().3 += 1;
        }
    }

    buckets
        .into_iter()
        .map(|(bucket_start, (new, released, waits, still_waiting))| Bucket {
            bucket_start,
            new,
            released,
            avg_wait_seconds: mean_duration_seconds(waits.into_iter()),
            still_waiting,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::queue::domain::model::Priority;
    use shared_types::Id;

    fn released_session(enqueued_at: DateTime<Utc>, wait_secs: i64) -> UserSession {
        let mut s = UserSession::new(Id::new_v4(), Id::new_v4(), "u".into(), Priority::Standard, serde_json::Value::Null, enqueued_at);
        s.status = SessionStatus::Released;
        s.released_at = Some(enqueued_at + Duration::seconds(wait_secs));
        s
    }

    #[test]
    fn avg_wait_is_mean_of_released_wait_times() {
        let base = Utc::now();
        let sessions = vec![released_session(base, 10), released_session(base, 20)];
        let range = TimeRange { start: base - Duration::hours(1), end: base + Duration::hours(1) };

        let bundle = rollup(&sessions, range, BucketGranularity::Hourly);
        assert_eq!(bundle.avg_wait_seconds, Some(15.0));
        assert_eq!(bundle.released, 2);
    }

    #[test]
    fn throughput_divides_by_window_hours() {
        let base = Utc::now();
        let sessions: Vec<_> = (0..10).map(|_| released_session(base, 5)).collect();
        let range = TimeRange { start: base - Duration::hours(2), end: base + Duration::hours(2) };

        let bundle = rollup(&sessions, range, BucketGranularity::Hourly);
        assert_eq!(bundle.throughput_per_hour, 10.0 / 4.0);
    }

    #[test]
    fn empty_stream_yields_no_averages() {
        let range = TimeRange { start: Utc::now() - Duration::hours(1), end: Utc::now() };
        let bundle = rollup(&[], range, BucketGranularity::Hourly);
        assert_eq!(bundle.avg_wait_seconds, None);
        assert_eq!(bundle.released, 0);
    }
}
