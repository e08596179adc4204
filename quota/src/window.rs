//! Trailing usage windows.

use attest_types::Timestamp;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const HOUR_SECS: u64 = 3600;
pub const DAY_SECS: u64 = 24 * HOUR_SECS;
pub const MONTH_SECS: u64 = 30 * DAY_SECS;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Window {
    Hour,
    Day,
    Month,
}

impl Window {
    /// Tightest first.
    pub const ALL: [Window; 3] = [Window::Hour, Window::Day, Window::Month];

    pub fn secs(&self) -> u64 {
        match self {
            Window::Hour => HOUR_SECS,
            Window::Day => DAY_SECS,
            Window::Month => MONTH_SECS,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Window::Hour => "hourly",
            Window::Day => "daily",
            Window::Month => "monthly",
        }
    }
}

impl fmt::Display for Window {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Usage inside one trailing window.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowUsage {
    pub count: u32,
    /// Oldest event still inside the window.
    pub oldest: Option<Timestamp>,
}

impl WindowUsage {
    /// When the oldest event leaves the window and frees a slot.
    pub fn reset_at(&self, window: Window, now: Timestamp) -> Timestamp {
        self.oldest.unwrap_or(now).plus_secs(window.secs())
    }
}

/// Counts for all three windows, as returned by one aggregate query.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageWindows {
    pub hour: WindowUsage,
    pub day: WindowUsage,
    pub month: WindowUsage,
}

impl UsageWindows {
    pub fn get(&self, window: Window) -> WindowUsage {
        match window {
            Window::Hour => self.hour,
            Window::Day => self.day,
            Window::Month => self.month,
        }
    }

    fn get_mut(&mut self, window: Window) -> &mut WindowUsage {
        match window {
            Window::Hour => &mut self.hour,
            Window::Day => &mut self.day,
            Window::Month => &mut self.month,
        }
    }

    /// Fold event timestamps into the three windows ending at `now`.
    /// Events older than a month or in the future are ignored.
    pub fn tally(events: impl IntoIterator<Item = Timestamp>, now: Timestamp) -> Self {
        let mut windows = Self::default();
        for at in events {
            if at > now {
                continue;
            }
            let age = at.elapsed_since(now);
            for window in Window::ALL {
                if age < window.secs() {
                    let usage = windows.get_mut(window);
                    usage.count += 1;
                    usage.oldest = Some(usage.oldest.map_or(at, |o| o.min(at)));
                }
            }
        }
        windows
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_land_in_every_window_that_covers_them() {
        let now = Timestamp::new(10 * DAY_SECS);
        let events = [
            now.minus_secs(60),
            now.minus_secs(2 * HOUR_SECS),
            now.minus_secs(3 * DAY_SECS),
            now.minus_secs(MONTH_SECS + 1),
        ];
        let w = UsageWindows::tally(events, now);
        assert_eq!(w.hour.count, 1);
        assert_eq!(w.day.count, 2);
        assert_eq!(w.month.count, 3);
        assert_eq!(w.hour.oldest, Some(now.minus_secs(60)));
        assert_eq!(w.month.oldest, Some(now.minus_secs(3 * DAY_SECS)));
    }

    #[test]
    fn reset_is_oldest_event_plus_window() {
        let now = Timestamp::new(100_000);
        let w = UsageWindows::tally([now.minus_secs(600)], now);
        assert_eq!(
            w.hour.reset_at(Window::Hour, now),
            now.minus_secs(600).plus_secs(HOUR_SECS)
        );
    }
}
