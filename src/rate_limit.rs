use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

pub const MAX_REQUESTS: u32 = 2;
pub const WINDOW_SECS: u64 = 5 * 60;
// Longest accepted window, one year
pub const MAX_WINDOW_SECS: u64 = 365 * 24 * 60 * 60;

// Usage window - tracks admitted requests per client key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UsageWindow {
    pub count: u32,
    pub window_end: DateTime<Utc>,
}

impl UsageWindow {
    fn open(now: DateTime<Utc>, window: Duration) -> Self {
        Self {
            count: 1,
            // saturate instead of panicking on absurd windows
            window_end: now
                .checked_add_signed(window)
                .unwrap_or(DateTime::<Utc>::MAX_UTC),
        }
    }

    // a request at exactly window_end still belongs to this window
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.window_end
    }
}

// Outcome of one admission check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    pub allowed: bool,
    pub remaining: u32,
    pub reset_time: DateTime<Utc>,
}

impl Decision {
    // Whole seconds until the window resets, rounded up
    pub fn retry_after_secs(&self, now: DateTime<Utc>) -> i64 {
        let millis = (self.reset_time - now).num_milliseconds().max(0);
        (millis + 999) / 1000
    }
}

/// Fixed-window rate limiter keyed by client key.
///
/// The check-and-update for one key runs under the DashMap shard lock held by
/// the entry guard, so concurrent requests from the same key cannot both open
/// a fresh window. Expired windows are swept only when a new window is opened.
pub struct RateLimiter {
    windows: DashMap<String, UsageWindow>,
    max_requests: u32,
    window: Duration,
}

impl RateLimiter {
    /// A zero `max_requests` denies everything; a negative window is treated
    /// as zero.
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            windows: DashMap::new(),
            max_requests,
            window: window.max(Duration::zero()),
        }
    }

    pub fn max_requests(&self) -> u32 {
        self.max_requests
    }

    // Number of windows currently tracked (live or not yet swept)
    pub fn tracked(&self) -> usize {
        self.windows.len()
    }

    pub fn window_for(&self, key: &str) -> Option<UsageWindow> {
        self.windows.get(key).map(|w| *w)
    }

    pub fn check(&self, key: &str, now: DateTime<Utc>) -> Decision {
        if self.max_requests == 0 {
            return Decision {
                allowed: false,
                remaining: 0,
                reset_time: now
                    .checked_add_signed(self.window)
                    .unwrap_or(DateTime::<Utc>::MAX_UTC),
            };
        }

        let (decision, opened) = match self.windows.entry(key.to_owned()) {
            Entry::Vacant(vacant) => {
                let fresh = UsageWindow::open(now, self.window);
                vacant.insert(fresh);
                (self.first_of_window(fresh), true)
            }
            Entry::Occupied(mut occupied) => {
                let current = occupied.get_mut();
                if current.is_expired(now) {
                    let fresh = UsageWindow::open(now, self.window);
                    *current = fresh;
                    (self.first_of_window(fresh), true)
                } else if current.count >= self.max_requests {
                    // denied attempts do not consume quota
                    let denied = Decision {
                        allowed: false,
                        remaining: 0,
                        reset_time: current.window_end,
                    };
                    (denied, false)
                } else {
                    current.count += 1;
                    let admitted = Decision {
                        allowed: true,
                        remaining: self.max_requests - current.count,
                        reset_time: current.window_end,
                    };
                    (admitted, false)
                }
            }
        };

        // shard guard is released here; retain() locks every shard
        if opened {
            let swept = self.sweep(now);
            if swept > 0 {
                tracing::debug!(swept, remaining_windows = self.tracked(), "swept expired rate limit windows");
            }
        }

        decision
    }

    // Drop every window that has expired at `now`, returns how many went away
    pub fn sweep(&self, now: DateTime<Utc>) -> usize {
        let before = self.windows.len();
        self.windows.retain(|_, window| !window.is_expired(now));
        before.saturating_sub(self.windows.len())
    }

    fn first_of_window(&self, window: UsageWindow) -> Decision {
        Decision {
            allowed: true,
            remaining: self.max_requests.saturating_sub(1),
            reset_time: window.window_end,
        }
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(MAX_REQUESTS, Duration::seconds(WINDOW_SECS as i64))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::sync::Arc;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap()
    }

    fn secs(n: i64) -> Duration {
        Duration::seconds(n)
    }

    #[test]
    fn third_request_in_window_is_denied() {
        let limiter = RateLimiter::default();
        let start = t0();

        let first = limiter.check("a", start);
        assert!(first.allowed);
        assert_eq!(first.remaining, 1);
        assert_eq!(first.reset_time, start + secs(300));

        let second = limiter.check("a", start + secs(1));
        assert!(second.allowed);
        assert_eq!(second.remaining, 0);
        assert_eq!(second.reset_time, first.reset_time);

        let third = limiter.check("a", start + secs(2));
        assert!(!third.allowed);
        assert_eq!(third.remaining, 0);
        assert_eq!(third.reset_time, first.reset_time);
    }

    #[test]
    fn expired_window_starts_over() {
        let limiter = RateLimiter::default();
        let start = t0();
        limiter.check("a", start);
        limiter.check("a", start);
        assert!(!limiter.check("a", start).allowed);

        let later = start + secs(301);
        let again = limiter.check("a", later);
        assert!(again.allowed);
        assert_eq!(again.remaining, 1);
        assert_eq!(again.reset_time, later + secs(300));
        assert_eq!(limiter.window_for("a").map(|w| w.count), Some(1));
    }

    #[test]
    fn request_exactly_at_window_end_stays_in_old_window() {
        let limiter = RateLimiter::default();
        let start = t0();
        limiter.check("a", start);
        limiter.check("a", start);

        let at_edge = limiter.check("a", start + secs(300));
        assert!(!at_edge.allowed);
        assert_eq!(at_edge.reset_time, start + secs(300));

        let past_edge = limiter.check("a", start + secs(300) + Duration::milliseconds(1));
        assert!(past_edge.allowed);
    }

    #[test]
    fn keys_do_not_interfere() {
        let limiter = RateLimiter::default();
        let start = t0();
        limiter.check("a", start);
        limiter.check("a", start);
        assert!(!limiter.check("a", start).allowed);

        let other = limiter.check("b", start);
        assert!(other.allowed);
        assert_eq!(other.remaining, 1);
    }

    #[test]
    fn denial_does_not_consume_quota() {
        let limiter = RateLimiter::default();
        let start = t0();
        limiter.check("a", start);
        limiter.check("a", start);

        let first_denial = limiter.check("a", start + secs(5));
        for i in 6..20 {
            assert_eq!(limiter.check("a", start + secs(i)), first_denial);
        }
        assert_eq!(limiter.window_for("a").map(|w| w.count), Some(2));
    }

    #[test]
    fn opening_a_window_sweeps_expired_entries_only() {
        let limiter = RateLimiter::default();
        let start = t0();
        limiter.check("stale", start);
        limiter.check("live", start + secs(200));
        assert_eq!(limiter.tracked(), 2);

        // stale expired at +300, live lasts until +500
        limiter.check("newcomer", start + secs(400));

        assert!(limiter.window_for("stale").is_none());
        assert_eq!(
            limiter.window_for("live"),
            Some(UsageWindow {
                count: 1,
                window_end: start + secs(500)
            })
        );
        assert!(limiter.window_for("newcomer").is_some());
    }

    #[test]
    fn increment_and_deny_paths_do_not_sweep() {
        let limiter = RateLimiter::default();
        let start = t0();
        limiter.check("stale", start);
        limiter.check("busy", start + secs(250));

        // increments and denials for "busy" after "stale" expired
        limiter.check("busy", start + secs(310));
        limiter.check("busy", start + secs(320));
        assert!(limiter.window_for("stale").is_some());

        // a stale key that is hit again is replaced even without a sweep
        let revived = limiter.check("stale", start + secs(330));
        assert!(revived.allowed);
        assert_eq!(revived.remaining, 1);
    }

    #[test]
    fn replacing_an_expired_window_sweeps_other_keys() {
        let limiter = RateLimiter::default();
        let start = t0();
        limiter.check("a", start);
        limiter.check("b", start + secs(10));
        limiter.check("c", start + secs(250));

        // "a" ended at +300, "b" at +310, "c" lasts until +550
        let revived = limiter.check("a", start + secs(320));
        assert!(revived.allowed);
        assert_eq!(revived.reset_time, start + secs(620));

        assert!(limiter.window_for("b").is_none());
        assert_eq!(limiter.window_for("c").map(|w| w.window_end), Some(start + secs(550)));
        assert_eq!(limiter.window_for("a").map(|w| w.count), Some(1));
        assert_eq!(limiter.tracked(), 2);
    }

    #[test]
    fn huge_window_saturates_instead_of_panicking() {
        let limiter = RateLimiter::new(2, Duration::try_seconds(10_000_000_000_000).unwrap());
        let start = t0();

        let first = limiter.check("k", start);
        assert!(first.allowed);
        assert_eq!(first.reset_time, DateTime::<Utc>::MAX_UTC);
        limiter.check("k", start + secs(1));
        assert!(!limiter.check("k", start + secs(2)).allowed);
    }

    #[test]
    fn negative_window_does_not_disable_limit_within_an_instant() {
        let limiter = RateLimiter::new(2, Duration::seconds(-1));
        let start = t0();

        limiter.check("k", start);
        limiter.check("k", start);
        assert!(!limiter.check("k", start).allowed);
    }

    #[test]
    fn zero_limit_denies_everything() {
        let limiter = RateLimiter::new(0, Duration::minutes(5));
        let decision = limiter.check("k", t0());
        assert!(!decision.allowed);
        assert_eq!(decision.remaining, 0);
        assert_eq!(limiter.tracked(), 0);
    }

    #[test]
    fn retry_after_rounds_up() {
        let decision = Decision {
            allowed: false,
            remaining: 0,
            reset_time: t0() + secs(300),
        };
        assert_eq!(decision.retry_after_secs(t0() + secs(20)), 280);
        assert_eq!(decision.retry_after_secs(t0() + Duration::milliseconds(20_500)), 280);
        assert_eq!(decision.retry_after_secs(t0() + secs(400)), 0);
    }

    #[test]
    fn scenario_from_one_address() {
        let limiter = RateLimiter::new(2, Duration::minutes(5));
        let start = t0();
        let key = "1.2.3.4";

        let d = limiter.check(key, start);
        assert!(d.allowed && d.remaining == 1);

        let d = limiter.check(key, start + secs(10));
        assert!(d.allowed && d.remaining == 0);

        let now = start + secs(20);
        let d = limiter.check(key, now);
        assert!(!d.allowed && d.remaining == 0);
        assert_eq!(d.retry_after_secs(now), 280);

        let d = limiter.check(key, start + secs(301));
        assert!(d.allowed && d.remaining == 1);
    }

    #[test]
    fn concurrent_first_requests_admit_at_most_max() {
        let limiter = Arc::new(RateLimiter::new(2, Duration::minutes(5)));
        let now = t0();

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let limiter = Arc::clone(&limiter);
                std::thread::spawn(move || limiter.check("racer", now).allowed)
            })
            .collect();

        let admitted = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|allowed| *allowed)
            .count();
        assert_eq!(admitted, 2);
    }
}
