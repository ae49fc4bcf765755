//! Service-level targets per ticket priority.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;

/// Ticket priority, used to pick an SLA duration.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq, Hash, strum::AsRefStr, strum::EnumString, strum::EnumIter)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
}

/// A duration expressed the way it is edited: days + hours + minutes.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SlaDuration {
    #[serde(default)]
    pub days: u32,
    #[serde(default)]
    pub hours: u32,
    #[serde(default)]
    pub minutes: u32,
}

impl SlaDuration {
    pub fn new(
        days: u32,
        hours: u32,
        minutes: u32,
    ) -> Self {
        Self {
            days,
            hours,
            minutes,
        }
    }

    pub fn is_zero(&self) -> bool {
        self.days == 0 && self.hours == 0 && self.minutes == 0
    }

    /// `None` when the parts do not fit in a chrono duration.
    pub fn as_duration(&self) -> Option<Duration> {
        Duration::try_days(self.days.into())?
            .checked_add(&Duration::try_hours(self.hours.into())?)?
            .checked_add(&Duration::try_minutes(self.minutes.into())?)
    }

    /// Total length in days, rounded down.
    pub fn whole_days(&self) -> u64 {
        u64::from(self.days) + u64::from(self.hours) / 24 + u64::from(self.minutes) / (24 * 60)
    }
}

/// Longest SLA a workflow may carry, in days.
pub const MAX_SLA_DAYS: u64 = 3650;

/// SLA durations for the four priorities. A zero duration means "no target".
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SlaPolicy {
    #[serde(default)]
    pub low: SlaDuration,
    #[serde(default)]
    pub medium: SlaDuration,
    #[serde(default)]
    pub high: SlaDuration,
    #[serde(default)]
    pub urgent: SlaDuration,
}

impl SlaPolicy {
    pub fn get(
        &self,
        priority: Priority,
    ) -> SlaDuration {
        match priority {
            Priority::Low => self.low,
            Priority::Medium => self.medium,
            Priority::High => self.high,
            Priority::Urgent => self.urgent,
        }
    }

    pub fn duration_for(
        &self,
        priority: Priority,
    ) -> Option<Duration> {
        let sla = self.get(priority);
        if sla.is_zero() {
            return None;
        }
        sla.as_duration()
    }

    /// Priorities whose duration is longer than [`MAX_SLA_DAYS`].
    pub fn out_of_range(&self) -> Vec<Priority> {
        Priority::iter().filter(|p| self.get(*p).whole_days() > MAX_SLA_DAYS).collect()
    }

    /// When a ticket opened at `opened_at` breaches its SLA. `None` when the
    /// priority has no target or the deadline falls outside the calendar range.
    pub fn deadline(
        &self,
        priority: Priority,
        opened_at: DateTime<Utc>,
    ) -> Option<DateTime<Utc>> {
        self.duration_for(priority).and_then(|d| opened_at.checked_add_signed(d))
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn test_duration_sums_parts() {
        let sla = SlaDuration::new(1, 2, 30);
        assert_eq!(sla.as_duration(), Some(Duration::minutes(24 * 60 + 2 * 60 + 30)));
    }

    #[test]
    fn test_deadline_past_calendar_range() {
        let policy = SlaPolicy {
            high: SlaDuration::new(200_000_000, 0, 0),
            ..Default::default()
        };
        let opened = Utc.with_ymd_and_hms(2026, 1, 5, 8, 0, 0).unwrap();

        assert!(policy.duration_for(Priority::High).is_some());
        assert_eq!(policy.deadline(Priority::High, opened), None);
        assert_eq!(policy.out_of_range(), vec![Priority::High]);
    }

    #[test]
    fn test_hours_count_toward_range() {
        let policy = SlaPolicy {
            low: SlaDuration::new(MAX_SLA_DAYS as u32, 24, 0),
            urgent: SlaDuration::new(MAX_SLA_DAYS as u32, 23, 59),
            ..Default::default()
        };
        assert_eq!(policy.out_of_range(), vec![Priority::Low]);
    }

    #[test]
    fn test_deadline_per_priority() {
        let policy = SlaPolicy {
            urgent: SlaDuration::new(0, 4, 0),
            high: SlaDuration::new(1, 0, 0),
            ..Default::default()
        };
        let opened = Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap();

        assert_eq!(policy.deadline(Priority::Urgent, opened), Some(Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()));
        assert_eq!(policy.deadline(Priority::High, opened), Some(Utc.with_ymd_and_hms(2024, 3, 2, 8, 0, 0).unwrap()));
        assert_eq!(policy.deadline(Priority::Low, opened), None);
    }

    #[test]
    fn test_priority_parse() {
        assert_eq!("urgent".parse::<Priority>().unwrap(), Priority::Urgent);
        assert_eq!(Priority::Low.as_ref(), "low");
    }
}
