//! Plain-text rendering of reports and records.

use std::fmt::Write;

use chrono::DateTime;

use crate::analytics::{AggregationWindow, LeaderboardEntry, ReportView};
use crate::reminders::Reminder;
use crate::report::ReportOutcome;

/// Format a millisecond timestamp as `YYYY-MM-DD HH:MM` (UTC).
#[must_use]
pub fn format_timestamp(millis: i64) -> String {
    DateTime::from_timestamp_millis(millis)
        .map_or_else(|| millis.to_string(), |at| at.format("%Y-%m-%d %H:%M").to_string())
}

fn window_label(window: &AggregationWindow) -> String {
    match (window.first_date(), window.last_date()) {
        (Some(first), Some(last)) => format!("{first} .. {last}"),
        _ => format!("{} .. {}", window.start(), window.end()),
    }
}

/// Render one view of a report outcome, followed by any degradation notes.
#[must_use]
pub fn render_outcome(outcome: &ReportOutcome, view: &ReportView) -> String {
    let mut output = String::new();
    let window = &outcome.report.window;

    let _ = writeln!(output, "Attendance report: {}", window_label(window));
    let _ = writeln!(output);

    if let Some(message) = &outcome.message {
        let _ = writeln!(output, "{message}");
        let _ = writeln!(output);
    }

    output.push_str(&render_view(view, window));

    if outcome.is_degraded() {
        let _ = writeln!(output);
        let _ = writeln!(output, "Some data could not be read:");
        for failure in &outcome.failures {
            let _ = writeln!(output, "  - {:?}: {}", failure.target, failure.message);
        }
    }

    output
}

/// Render a single report view.
#[must_use]
pub fn render_view(view: &ReportView, window: &AggregationWindow) -> String {
    let mut output = String::new();

    match view {
        ReportView::Overview(overview) => {
            let _ = writeln!(output, "Overall rate:  {}%", overview.overall_rate);
            let _ = writeln!(
                output,
                "Marks:         {} present of {}",
                overview.total_present, overview.total_records
            );
            let _ = writeln!(output, "Events:        {}", overview.event_count);
            let _ = writeln!(output, "Children:      {}", overview.child_count);
            let _ = writeln!(output, "Squads:        {}", overview.squad_count);
            if let Some(child) = &overview.best_child {
                let _ = writeln!(output, "Best child:    {} ({}%)", child.name, child.rate);
            }
            if let Some(event) = &overview.best_event {
                let _ = writeln!(output, "Best event:    {} ({}%)", event.title, event.rate);
            }
        }
        ReportView::Squads(squads) => {
            if squads.is_empty() {
                let _ = writeln!(output, "No squads with attendance in this range.");
            }
            for squad in squads {
                let _ = writeln!(
                    output,
                    "{:<20} {:>3}%  children: {:<3} present: {:<4} absent: {}",
                    squad.squad,
                    squad.rate,
                    squad.child_count,
                    squad.total_present,
                    squad.total_absent
                );
            }
        }
        ReportView::Events(events) => {
            if events.is_empty() {
                let _ = writeln!(output, "No events in this range.");
            }
            for event in events {
                let _ = writeln!(
                    output,
                    "{}  {:<24} {:>3}%  ({} present, {} absent)",
                    format_timestamp(event.starts_at),
                    event.title,
                    event.rate,
                    event.present,
                    event.absent
                );
            }
        }
        ReportView::Children(children) => {
            if children.is_empty() {
                let _ = writeln!(output, "No attendance marks in this range.");
            }
            for (index, child) in children.iter().enumerate() {
                let _ = writeln!(
                    output,
                    "{:>3}. {:<24} {:<16} {:>3}%  ({} of {})",
                    index + 1,
                    child.name,
                    child.squad,
                    child.rate,
                    child.attended,
                    child.attended + child.missed
                );
            }
        }
        ReportView::Timeline(days) => {
            if days.is_empty() {
                let _ = writeln!(output, "No events in this range.");
            }
            for day in days {
                let label = window
                    .date_of(day.day_index)
                    .map_or_else(|| format!("day {}", day.day_index), |date| date.to_string());
                let _ = writeln!(
                    output,
                    "{label}  {:>3}%  ({} events)",
                    day.mean_rate, day.event_count
                );
            }
        }
        ReportView::Leaderboard(entries) => output.push_str(&render_leaderboard(entries)),
    }

    output
}

/// Render leaderboard rows, one per child.
#[must_use]
pub fn render_leaderboard(entries: &[LeaderboardEntry]) -> String {
    let mut output = String::new();

    if entries.is_empty() {
        let _ = writeln!(output, "No achievements yet.");
    }
    for entry in entries {
        let _ = writeln!(
            output,
            "{:>3}. {:<24} {:<16} {} pts",
            entry.rank, entry.name, entry.squad, entry.total_points
        );
    }

    output
}

/// Render reminders grouped by bucket, in trigger order.
#[must_use]
pub fn render_reminders(reminders: &[Reminder]) -> String {
    let mut output = String::new();

    if reminders.is_empty() {
        let _ = writeln!(output, "No reminders due.");
        return output;
    }

    for reminder in reminders {
        let _ = writeln!(
            output,
            "[{:<8}] {}  #{} {}",
            reminder.bucket.to_string(),
            format_timestamp(reminder.remind_at),
            reminder.note.id,
            reminder.note.title
        );
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::{
        AttendanceReport, ChildAttendanceSummary, DayMeanMode, DayPoint, ReportTab,
    };
    use crate::records::Note;
    use crate::reminders::ReminderBucket;
    use crate::report::{FetchFailure, FetchTarget, EVENTS_FAILED_MESSAGE};

    fn window() -> AggregationWindow {
        AggregationWindow::from_dates(
            chrono::NaiveDate::from_ymd_opt(2026, 7, 1).unwrap(),
            chrono::NaiveDate::from_ymd_opt(2026, 7, 3).unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn test_format_timestamp() {
        assert_eq!(format_timestamp(1_782_901_800_000), "2026-07-01 10:30");
    }

    #[test]
    fn test_render_overview() {
        let mut report = AttendanceReport::empty(window(), DayMeanMode::Deferred);
        report.overall_rate = 67;
        report.total_present = 4;
        report.total_records = 6;

        let text = render_view(&report.view(ReportTab::Overview, None), &report.window);
        assert!(text.contains("Overall rate:  67%"));
        assert!(text.contains("4 present of 6"));
    }

    #[test]
    fn test_render_children_numbers_rows() {
        let mut report = AttendanceReport::empty(window(), DayMeanMode::Deferred);
        report.children = vec![ChildAttendanceSummary {
            child_id: 1,
            name: "Masha".to_string(),
            squad: "Eagles".to_string(),
            attended: 2,
            missed: 1,
            rate: 67,
        }];

        let text = render_view(&report.view(ReportTab::Children, None), &report.window);
        assert!(text.contains("1. Masha"));
        assert!(text.contains("(2 of 3)"));
    }

    #[test]
    fn test_render_timeline_uses_dates() {
        let mut report = AttendanceReport::empty(window(), DayMeanMode::Deferred);
        report.daily = vec![DayPoint {
            day_index: 2,
            event_count: 1,
            mean_rate: 50,
        }];

        let text = render_view(&report.view(ReportTab::Timeline, None), &report.window);
        assert!(text.contains("2026-07-03"));
        assert!(text.contains("50%"));
    }

    #[test]
    fn test_render_empty_views() {
        let report = AttendanceReport::empty(window(), DayMeanMode::Deferred);
        let text = render_view(&report.view(ReportTab::Events, None), &report.window);
        assert!(text.contains("No events"));
    }

    #[test]
    fn test_render_outcome_degraded() {
        let outcome = ReportOutcome {
            report: AttendanceReport::empty(window(), DayMeanMode::Deferred),
            failures: vec![FetchFailure {
                target: FetchTarget::Events,
                message: "disk on fire".to_string(),
            }],
            message: Some(EVENTS_FAILED_MESSAGE.to_string()),
        };

        let view = outcome.report.view(ReportTab::Overview, None);
        let text = render_outcome(&outcome, &view);
        assert!(text.contains("2026-07-01 .. 2026-07-03"));
        assert!(text.contains(EVENTS_FAILED_MESSAGE));
        assert!(text.contains("disk on fire"));
    }

    #[test]
    fn test_render_leaderboard() {
        let entries = vec![LeaderboardEntry {
            rank: 1,
            child_id: 2,
            name: "Petya".to_string(),
            squad: "Owls".to_string(),
            total_points: 12,
        }];

        let text = render_leaderboard(&entries);
        assert!(text.contains("1. Petya"));
        assert!(text.contains("12 pts"));
        assert!(render_leaderboard(&[]).contains("No achievements"));
    }

    #[test]
    fn test_render_reminders() {
        let reminder = Reminder {
            note: Note {
                id: 4,
                title: "Call parents".to_string(),
                body: String::new(),
                created_at: 0,
                remind_at: Some(1_782_901_800_000),
            },
            remind_at: 1_782_901_800_000,
            bucket: ReminderBucket::DueToday,
        };

        let text = render_reminders(&[reminder]);
        assert!(text.contains("today"));
        assert!(text.contains("#4 Call parents"));
        assert!(render_reminders(&[]).contains("No reminders"));
    }
}
