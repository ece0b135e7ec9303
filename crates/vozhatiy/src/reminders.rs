//! Reminder bucketing relative to "now".

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::records::Note;

/// When a reminder fires relative to the current moment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReminderBucket {
    /// Trigger time already passed.
    Overdue,
    /// Fires later today.
    DueToday,
    /// Fires on a later day, within the horizon.
    Upcoming,
}

impl std::fmt::Display for ReminderBucket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Overdue => write!(f, "overdue"),
            Self::DueToday => write!(f, "today"),
            Self::Upcoming => write!(f, "upcoming"),
        }
    }
}

/// A note with a trigger time, placed in its bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Reminder {
    /// The underlying note.
    pub note: Note,
    /// Trigger time in milliseconds.
    pub remind_at: i64,
    /// Where the trigger time falls relative to now.
    pub bucket: ReminderBucket,
}

/// Latest trigger time, in milliseconds, that falls within `horizon` of `now`.
///
/// A horizon reaching past the representable calendar means no limit.
#[must_use]
pub fn horizon_limit(now: DateTime<Utc>, horizon: Duration) -> i64 {
    now.checked_add_signed(horizon)
        .map_or(i64::MAX, |limit| limit.timestamp_millis())
}

/// Bucket every reminder among `notes` that fires no later than
/// `now + horizon`.
///
/// Overdue reminders are always kept. Of the rest, those on the UTC calendar
/// day of `now` are due today, later ones upcoming. Notes without a trigger
/// time are left out. The result is ordered by trigger time; equal times keep
/// input order.
#[must_use]
pub fn classify(notes: &[Note], now: DateTime<Utc>, horizon: Duration) -> Vec<Reminder> {
    let now_ms = now.timestamp_millis();
    let limit = horizon_limit(now, horizon);
    let today = now.date_naive();

    let mut reminders: Vec<Reminder> = notes
        .iter()
        .filter_map(|note| {
            let remind_at = note.remind_at?;
            let bucket = if remind_at < now_ms {
                ReminderBucket::Overdue
            } else if remind_at > limit {
                return None;
            } else if DateTime::from_timestamp_millis(remind_at)
                .is_some_and(|at| at.date_naive() == today)
            {
                ReminderBucket::DueToday
            } else {
                ReminderBucket::Upcoming
            };
            Some(Reminder {
                note: note.clone(),
                remind_at,
                bucket,
            })
        })
        .collect();

    reminders.sort_by_key(|r| r.remind_at);
    reminders
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn note(id: i64, remind_at: Option<i64>) -> Note {
        Note {
            id,
            title: format!("Note {id}"),
            body: String::new(),
            created_at: 0,
            remind_at,
        }
    }

    fn noon() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 7, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_buckets() {
        let now = noon();
        let ms = |dt: DateTime<Utc>| dt.timestamp_millis();
        let notes = vec![
            note(1, Some(ms(now - Duration::hours(2)))),
            note(2, Some(ms(now + Duration::hours(3)))),
            note(3, Some(ms(now + Duration::hours(20)))),
            note(4, Some(ms(now + Duration::days(5)))),
            note(5, None),
        ];

        let reminders = classify(&notes, now, Duration::hours(24));
        let buckets: Vec<(i64, ReminderBucket)> =
            reminders.iter().map(|r| (r.note.id, r.bucket)).collect();
        assert_eq!(
            buckets,
            vec![
                (1, ReminderBucket::Overdue),
                (2, ReminderBucket::DueToday),
                (3, ReminderBucket::Upcoming),
            ]
        );
    }

    #[test]
    fn test_horizon_applies_to_today() {
        let now = noon();
        let soon = (now + Duration::minutes(30)).timestamp_millis();
        let late_today = (now + Duration::hours(11)).timestamp_millis();
        let reminders = classify(
            &[note(1, Some(late_today)), note(2, Some(soon))],
            now,
            Duration::hours(1),
        );
        assert_eq!(reminders.len(), 1);
        assert_eq!(reminders[0].note.id, 2);
        assert_eq!(reminders[0].bucket, ReminderBucket::DueToday);
    }

    #[test]
    fn test_huge_horizon_means_no_limit() {
        let now = noon();
        let horizon = Duration::hours(i64::from(u32::MAX));
        assert_eq!(horizon_limit(now, horizon), i64::MAX);

        let far = (now + Duration::days(3_650)).timestamp_millis();
        let reminders = classify(&[note(1, Some(far))], now, horizon);
        assert_eq!(reminders[0].bucket, ReminderBucket::Upcoming);
    }

    #[test]
    fn test_horizon_limit() {
        let now = noon();
        assert_eq!(
            horizon_limit(now, Duration::hours(2)),
            (now + Duration::hours(2)).timestamp_millis()
        );
    }

    #[test]
    fn test_sorted_by_trigger_time() {
        let now = noon();
        let base = now.timestamp_millis();
        let notes = vec![note(1, Some(base + 5_000)), note(2, Some(base - 5_000))];
        let ids: Vec<i64> = classify(&notes, now, Duration::hours(1))
            .iter()
            .map(|r| r.note.id)
            .collect();
        assert_eq!(ids, vec![2, 1]);
    }

    #[test]
    fn test_no_reminders() {
        assert!(classify(&[note(1, None)], noon(), Duration::hours(24)).is_empty());
    }

    #[test]
    fn test_bucket_display() {
        assert_eq!(ReminderBucket::Overdue.to_string(), "overdue");
        assert_eq!(ReminderBucket::DueToday.to_string(), "today");
        assert_eq!(ReminderBucket::Upcoming.to_string(), "upcoming");
    }
}
