//! The adaptive per-run item quota. Every aggregator run asks "how many
//! items should I pull this time" rather than "pull everything" — this
//! spreads a feed's `daily_limit` across the day instead of front-loading
//! it into the first run after midnight, while still guaranteeing the
//! target is reachable even if earlier runs under-collected.

use chrono::{DateTime, Timelike, Utc};

/// Pure function of the current time, the feed's daily target, and how
/// many items have already been collected today. Deterministic given its
/// inputs, which is what makes it unit-testable without a live clock.
pub fn current_run_limit(now: DateTime<Utc>, daily_limit: i64, collected_today: i64) -> i64 {
    if daily_limit <= 0 || collected_today >= daily_limit {
        return 0;
    }

    let midnight = now.date_naive().and_hms_opt(0, 0, 0).unwrap();
    let seconds_since_midnight = (now.naive_utc() - midnight).num_seconds().max(0);

    let target_quota = ((daily_limit as f64) * (seconds_since_midnight as f64) / 86_400.0).ceil() as i64;
    let remaining_total = daily_limit - collected_today;
    let gap_to_target = (target_quota - collected_today).max(0);
    let base_allowance = (daily_limit / 48).max(1);
    let proportional_allowance = ((remaining_total as f64) * 0.2) as i64;

    let mut run_limit = base_allowance.max(gap_to_target).max(proportional_allowance);

    if now.hour() < 10 {
        run_limit = run_limit.max(((remaining_total as f64) * 0.4) as i64);
    }

    run_limit.min(remaining_total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn zero_once_daily_limit_reached() {
        let now = Utc.with_ymd_and_hms(2026, 7, 26, 12, 0, 0).unwrap();
        assert_eq!(current_run_limit(now, 50, 50), 0);
        assert_eq!(current_run_limit(now, 50, 60), 0);
    }

    #[test]
    fn early_morning_run_gets_larger_allowance() {
        let morning = Utc.with_ymd_and_hms(2026, 7, 26, 5, 0, 0).unwrap();
        let afternoon = Utc.with_ymd_and_hms(2026, 7, 26, 15, 0, 0).unwrap();
        let morning_limit = current_run_limit(morning, 100, 0);
        let afternoon_limit = current_run_limit(afternoon, 100, 0);
        assert!(morning_limit >= 40);
        assert!(afternoon_limit <= morning_limit);
    }

    #[test]
    fn never_exceeds_remaining_total() {
        let now = Utc.with_ymd_and_hms(2026, 7, 26, 23, 0, 0).unwrap();
        let limit = current_run_limit(now, 100, 95);
        assert!(limit <= 5);
    }

    #[test]
    fn base_allowance_is_at_least_one() {
        let now = Utc.with_ymd_and_hms(2026, 7, 26, 23, 59, 0).unwrap();
        let limit = current_run_limit(now, 1, 0);
        assert_eq!(limit, 1);
    }
}
