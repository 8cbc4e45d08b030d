/// Outcome of a rate-limit check, matching the `{allowed, remaining,
/// reset_at}` shape from spec.md §4.6.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitResult {
    pub allowed: bool,
    pub remaining: u32,
    /// Unix timestamp (seconds) at which the window resets.
    pub reset_at: i64,
}

impl RateLimitResult {
    /// A cache-outage result: always allowed, remaining reported at the
    /// full limit since the real count is unknown.
    pub fn fail_open(limit: u32) -> Self {
        Self { allowed: true, remaining: limit, reset_at: chrono::Utc::now().timestamp() }
    }
}
