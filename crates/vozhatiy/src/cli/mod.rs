//! Command-line interface for vozhatiy.
//!
//! This module provides the CLI structure, argument parsers and plain-text
//! rendering for the `vozhatiy` binary.

mod commands;
pub mod render;

use std::path::PathBuf;

use chrono::{DateTime, NaiveDateTime};
use clap::{Parser, Subcommand};

pub use commands::{
    AchievementCommand, AttendanceCommand, ChildCommand, ConfigCommand, EventCommand,
    EventStatusArg, NoteCommand, OutputFormat, ReportCommand, ReportViewArg, StatusCommand,
};

/// vozhatiy - Camp attendance and activity tracker
///
/// Keeps children, squads, events, attendance marks, achievements and notes
/// in a local database and derives attendance statistics over date ranges.
#[derive(Debug, Parser)]
#[command(name = "vozhatiy")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to custom configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v for info, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Manage children
    #[command(subcommand)]
    Child(ChildCommand),

    /// Manage events
    #[command(subcommand)]
    Event(EventCommand),

    /// Record and inspect attendance
    #[command(subcommand)]
    Attendance(AttendanceCommand),

    /// Award and list achievements
    #[command(subcommand)]
    Achievement(AchievementCommand),

    /// Manage notes and reminders
    #[command(subcommand)]
    Note(NoteCommand),

    /// Build an attendance report for a date range
    Report(ReportCommand),

    /// Show database status
    Status(StatusCommand),

    /// View or validate configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> crate::logging::Verbosity {
        crate::logging::Verbosity::from_flags(self.quiet, self.verbose)
    }
}

/// Parse a UTC timestamp into milliseconds since the epoch.
///
/// Accepts RFC 3339 (`2026-07-01T10:00:00Z`) as well as the shorter
/// `2026-07-01 10:00` and `2026-07-01T10:00`, read as UTC.
///
/// # Errors
///
/// Returns a message suitable for clap when no format matches.
pub fn parse_timestamp(value: &str) -> Result<i64, String> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Ok(parsed.timestamp_millis());
    }

    ["%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .map(|naive| naive.and_utc().timestamp_millis())
        .ok_or_else(|| format!("invalid time '{value}', expected e.g. 2026-07-01 10:00"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn status_cli(verbose: u8, quiet: bool) -> Cli {
        Cli {
            config: None,
            verbose,
            quiet,
            command: Command::Status(StatusCommand { json: false }),
        }
    }

    #[test]
    fn test_cli_name() {
        let cli = Cli::command();
        assert_eq!(cli.get_name(), "vozhatiy");
    }

    #[test]
    fn test_verbosity_quiet() {
        assert_eq!(
            status_cli(0, true).verbosity(),
            crate::logging::Verbosity::Quiet
        );
    }

    #[test]
    fn test_verbosity_normal() {
        assert_eq!(
            status_cli(0, false).verbosity(),
            crate::logging::Verbosity::Normal
        );
    }

    #[test]
    fn test_verbosity_verbose() {
        assert_eq!(
            status_cli(1, false).verbosity(),
            crate::logging::Verbosity::Verbose
        );
    }

    #[test]
    fn test_verbosity_trace() {
        assert_eq!(
            status_cli(2, false).verbosity(),
            crate::logging::Verbosity::Trace
        );
    }

    #[test]
    fn test_cli_verify() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_child_add() {
        let args = vec!["vozhatiy", "child", "add", "Masha", "--squad", "Eagles", "--age", "11"];
        let cli = Cli::try_parse_from(args).unwrap();
        match cli.command {
            Command::Child(ChildCommand::Add { name, squad, age }) => {
                assert_eq!(name, "Masha");
                assert_eq!(squad, "Eagles");
                assert_eq!(age, 11);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_event_add() {
        let args = vec![
            "vozhatiy",
            "event",
            "add",
            "Morning run",
            "--start",
            "2026-07-01 07:30",
        ];
        let cli = Cli::try_parse_from(args).unwrap();
        match cli.command {
            Command::Event(EventCommand::Add {
                start, end, status, ..
            }) => {
                assert_eq!(start, parse_timestamp("2026-07-01T07:30:00Z").unwrap());
                assert!(end.is_none());
                assert_eq!(status, EventStatusArg::Draft);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_event_add_rejects_bad_time() {
        let args = vec!["vozhatiy", "event", "add", "Hike", "--start", "tomorrow"];
        assert!(Cli::try_parse_from(args).is_err());
    }

    #[test]
    fn test_parse_attendance_mark_absent() {
        let args = vec![
            "vozhatiy", "attendance", "mark", "--event", "3", "--child", "7", "--absent",
        ];
        let cli = Cli::try_parse_from(args).unwrap();
        assert!(matches!(
            cli.command,
            Command::Attendance(AttendanceCommand::Mark {
                event: 3,
                child: 7,
                absent: true,
                ..
            })
        ));
    }

    #[test]
    fn test_parse_report() {
        let args = vec![
            "vozhatiy",
            "report",
            "--from",
            "2026-07-01",
            "--to",
            "2026-07-03",
            "--view",
            "children",
            "--top",
            "3",
            "--format",
            "json",
        ];
        let cli = Cli::try_parse_from(args).unwrap();
        let Command::Report(report) = cli.command else {
            panic!("expected report command");
        };
        assert_eq!(
            report.from,
            chrono::NaiveDate::from_ymd_opt(2026, 7, 1)
        );
        assert_eq!(report.view, ReportViewArg::Children);
        assert_eq!(report.top, Some(3));
        assert_eq!(report.format, OutputFormat::Json);
    }

    #[test]
    fn test_parse_report_defaults() {
        let cli = Cli::try_parse_from(vec!["vozhatiy", "report"]).unwrap();
        let Command::Report(report) = cli.command else {
            panic!("expected report command");
        };
        assert!(report.from.is_none());
        assert!(report.to.is_none());
        assert_eq!(report.view, ReportViewArg::Overview);
        assert_eq!(report.format, OutputFormat::Plain);
    }

    #[test]
    fn test_parse_achievement_negative_points() {
        let args = vec![
            "vozhatiy",
            "achievement",
            "award",
            "--child",
            "1",
            "Late for lineup",
            "--points",
            "-2",
        ];
        let cli = Cli::try_parse_from(args).unwrap();
        assert!(matches!(
            cli.command,
            Command::Achievement(AchievementCommand::Award { points: -2, .. })
        ));
    }

    #[test]
    fn test_parse_status() {
        let cli = Cli::try_parse_from(vec!["vozhatiy", "status"]).unwrap();
        assert!(matches!(cli.command, Command::Status(_)));
    }

    #[test]
    fn test_parse_with_config() {
        let args = vec!["vozhatiy", "-c", "/custom/config.toml", "status"];
        let cli = Cli::try_parse_from(args).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/custom/config.toml")));
    }

    #[test]
    fn test_parse_with_verbose() {
        let cli = Cli::try_parse_from(vec!["vozhatiy", "-vv", "status"]).unwrap();
        assert_eq!(cli.verbose, 2);
    }

    #[test]
    fn test_parse_timestamp_formats() {
        let expected = 1_782_901_800_000;
        assert_eq!(parse_timestamp("2026-07-01 10:30"), Ok(expected));
        assert_eq!(parse_timestamp("2026-07-01T10:30"), Ok(expected));
        assert_eq!(parse_timestamp("2026-07-01 10:30:00"), Ok(expected));
        assert_eq!(parse_timestamp("2026-07-01T10:30:00Z"), Ok(expected));
        assert_eq!(parse_timestamp("2026-07-01T13:30:00+03:00"), Ok(expected));
    }

    #[test]
    fn test_parse_timestamp_invalid() {
        let err = parse_timestamp("yesterday").unwrap_err();
        assert!(err.contains("yesterday"));
    }
}
