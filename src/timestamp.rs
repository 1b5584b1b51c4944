use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

const MINUTE: u32 = 60;
const HOUR: u32 = 60 * MINUTE;
const DAY: u32 = 24 * HOUR;

/// unix timestamp in seconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(pub u32);

impl Timestamp {
    pub fn now() -> Self {
        Self(Utc::now().timestamp() as u32)
    }

    /// `days` before now, saturating at the epoch
    pub fn days_ago(days: u32) -> Self {
        Self(Self::now().0.saturating_sub(days.saturating_mul(DAY)))
    }

    pub fn to_datetime(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.0 as i64, 0).unwrap_or_default()
    }

    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self(dt.timestamp() as u32)
    }

    /// human readable age relative to `now`, e.g. "5m ago"
    pub fn format_relative(&self, now: Timestamp) -> String {
        let elapsed = now.0.saturating_sub(self.0);
        if elapsed < MINUTE {
            "just now".to_string()
        } else if elapsed < HOUR {
            format!("{}m ago", elapsed / MINUTE)
        } else if elapsed < DAY {
            format!("{}h ago", elapsed / HOUR)
        } else if elapsed < 7 * DAY {
            format!("{}d ago", elapsed / DAY)
        } else {
            self.to_datetime().format("%Y-%m-%d").to_string()
        }
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for Timestamp {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

impl From<Timestamp> for u32 {
    fn from(timestamp: Timestamp) -> Self {
        timestamp.0
    }
}

impl From<i64> for Timestamp {
    fn from(value: i64) -> Self {
        Self(value as u32)
    }
}

impl Default for Timestamp {
    fn default() -> Self {
        Timestamp::now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_relative() {
        let now = Timestamp(1_700_000_000);
        let cases = vec![
            (0, "just now"),
            (59, "just now"),
            (60, "1m ago"),
            (59 * 60, "59m ago"),
            (3600, "1h ago"),
            (23 * 3600 + 3599, "23h ago"),
            (86400, "1d ago"),
            (6 * 86400, "6d ago"),
        ];

        for (ago, expected) in cases {
            assert_eq!(
                Timestamp(now.0 - ago).format_relative(now),
                expected,
                "failed for {}s ago",
                ago
            );
        }

        // a week or more falls back to the date
        assert_eq!(Timestamp(0).format_relative(now), "1970-01-01");
    }

    #[test]
    fn test_future_is_just_now() {
        let now = Timestamp(100);
        assert_eq!(Timestamp(500).format_relative(now), "just now");
    }

    #[test]
    fn test_days_ago() {
        let past = Timestamp::days_ago(90);
        let after = Timestamp::now();
        assert!(after.0 - past.0 >= 90 * 86400);
        assert!(after.0 - past.0 <= 90 * 86400 + 5);
    }
}
