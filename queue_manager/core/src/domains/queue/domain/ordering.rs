//! Waiting-line ordering (spec.md §4.8.1, §4.8.5).
//!
//! Logical order: priority descending, then `enqueued_at` ascending, then
//! `session_id` ascending as a final deterministic tie-break. `position` is
//! a 1-based rank recomputed from scratch on every insert/remove; at the
//! sizes a single queue realistically holds, the `O(N log N)` sort this
//! costs is cheaper than maintaining an indexed tree and far less error-prone.

use super::model::UserSession;
use std::cmp::Ordering;

pub fn compare(a: &UserSession, b: &UserSession) -> Ordering {
    b.priority
        .cmp(&a.priority)
        .then_with(|| a.enqueued_at.cmp(&b.enqueued_at))
        .then_with(|| a.session_id.cmp(&b.session_id))
}

/// Re-rank a snapshot of a queue's Waiting sessions, returning
/// `(session_id, new_position)` pairs in rank order. Callers persist each
/// pair via an optimistic update (spec.md §4.8.5); this function is pure and
/// does not touch the store.
pub fn recompute_positions(mut waiting: Vec<UserSession>) -> Vec<UserSession> {
    waiting.sort_by(compare);
    for (idx, session) in waiting.iter_mut().enumerate() {
        session.position = (idx + 1) as u64;
    }
    waiting
}

/// Verifies the spec.md §4.8.6 contiguity invariant: positions of Waiting
/// sessions form `1..W` with no gaps or duplicates. Used by the releaser's
/// startup self-heal check (spec.md §4.8.7).
pub fn is_contiguous(waiting: &[UserSession]) -> bool {
    let mut positions: Vec<u64> = waiting.iter().map(|s| s.position).collect();
    positions.sort_unstable();
    positions.iter().enumerate().all(|(idx, &pos)| pos == (idx + 1) as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::queue::domain::model::{Priority, SessionStatus};
    use chrono::{Duration, Utc};
    use shared_types::Id;

    fn session(priority: Priority, offset_secs: i64) -> UserSession {
        let now = Utc::now();
        UserSession::new(
            Id::new_v4(),
            Id::new_v4(),
            "u".into(),
            priority,
            serde_json::Value::Null,
            now + Duration::seconds(offset_secs),
        )
    }

    #[test]
    fn priority_dominates_arrival_order() {
        let alice = session(Priority::Standard, 0);
        let bob = session(Priority::VIP, 1);
        let ranked = recompute_positions(vec![alice.clone(), bob.clone()]);

        let bob_ranked = ranked.iter().find(|s| s.session_id == bob.session_id).unwrap();
        let alice_ranked = ranked.iter().find(|s| s.session_id == alice.session_id).unwrap();
        assert_eq!(bob_ranked.position, 1);
        assert_eq!(alice_ranked.position, 2);
    }

    #[test]
    fn ties_break_on_earlier_arrival() {
        let first = session(Priority::Standard, 0);
        let second = session(Priority::Standard, 5);
        let ranked = recompute_positions(vec![second.clone(), first.clone()]);

        assert_eq!(ranked[0].session_id, first.session_id);
        assert_eq!(ranked[1].session_id, second.session_id);
    }

    #[test]
    fn positions_are_contiguous_after_recompute() {
        let sessions: Vec<_> = (0..5).map(|i| session(Priority::Standard, i)).collect();
        let ranked = recompute_positions(sessions);
        assert!(is_contiguous(&ranked));
    }

    #[test]
    fn drop_closes_the_gap() {
        let u1 = session(Priority::Standard, 0);
        let u2 = session(Priority::Standard, 1);
        let u3 = session(Priority::Standard, 2);
        let mut ranked = recompute_positions(vec![u1.clone(), u2.clone(), u3.clone()]);
        assert_eq!(ranked[1].session_id, u2.session_id);

        ranked.retain(|s| s.session_id != u2.session_id);
        let after = recompute_positions(ranked);
        assert_eq!(after.iter().find(|s| s.session_id == u1.session_id).unwrap().position, 1);
        assert_eq!(after.iter().find(|s| s.session_id == u3.session_id).unwrap().position, 2);
    }

    proptest::proptest! {
        #[test]
        fn recompute_always_yields_a_contiguous_permutation(n in 0usize..50) {
            let sessions: Vec<_> = (0..n).map(|i| session(Priority::Standard, i as i64)).collect();
            let ranked = recompute_positions(sessions);
            proptest::prop_assert!(is_contiguous(&ranked));
        }
    }
}
