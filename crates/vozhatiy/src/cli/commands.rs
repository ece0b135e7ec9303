//! CLI command definitions.
//!
//! This module defines the structure of all CLI subcommands.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Subcommand, ValueEnum};

use super::parse_timestamp;

/// Children management commands.
#[derive(Debug, Subcommand)]
pub enum ChildCommand {
    /// Register a child
    Add {
        /// Display name
        name: String,

        /// Squad label
        #[arg(short, long)]
        squad: String,

        /// Age in years
        #[arg(short, long)]
        age: u32,
    },

    /// List all children
    List {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Remove a child with their marks and achievements
    Remove {
        /// Child id
        id: i64,
    },
}

/// Event management commands.
#[derive(Debug, Subcommand)]
pub enum EventCommand {
    /// Schedule an event
    Add {
        /// Event title
        title: String,

        /// Start time ("2026-07-01 10:00" or RFC 3339), UTC
        #[arg(long, value_parser = parse_timestamp)]
        start: i64,

        /// End time; defaults to one hour after the start
        #[arg(long, value_parser = parse_timestamp)]
        end: Option<i64>,

        /// Initial status
        #[arg(long, value_enum, default_value = "draft")]
        status: EventStatusArg,
    },

    /// List events in a date range
    List {
        /// First day (YYYY-MM-DD); defaults to the configured range
        #[arg(long)]
        from: Option<NaiveDate>,

        /// Last day (YYYY-MM-DD); defaults to today
        #[arg(long)]
        to: Option<NaiveDate>,

        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Change an event's status
    Status {
        /// Event id
        id: i64,

        /// New status
        #[arg(value_enum)]
        status: EventStatusArg,
    },

    /// Remove an event with its marks
    Remove {
        /// Event id
        id: i64,
    },
}

/// Attendance commands.
#[derive(Debug, Subcommand)]
pub enum AttendanceCommand {
    /// Mark a child present (or absent) at an event
    Mark {
        /// Event id
        #[arg(short, long)]
        event: i64,

        /// Child id
        #[arg(long)]
        child: i64,

        /// Mark the child absent instead of present
        #[arg(long)]
        absent: bool,

        /// Free-text note
        #[arg(short, long)]
        note: Option<String>,
    },

    /// Show marks for an event
    Show {
        /// Event id
        event: i64,

        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },
}

/// Achievement commands.
#[derive(Debug, Subcommand)]
pub enum AchievementCommand {
    /// Award points to a child
    Award {
        /// Child id
        #[arg(long)]
        child: i64,

        /// What the award is for
        title: String,

        /// Points granted
        #[arg(short, long, default_value = "1", allow_negative_numbers = true)]
        points: i64,
    },

    /// List a child's awards
    List {
        /// Child id
        child: i64,
    },

    /// Show the points leaderboard
    Leaderboard {
        /// Maximum number of entries; defaults to the configured top N
        #[arg(short, long)]
        limit: Option<usize>,
    },
}

/// Note and reminder commands.
#[derive(Debug, Subcommand)]
pub enum NoteCommand {
    /// Write a note
    Add {
        /// Short title
        title: String,

        /// Note body
        #[arg(short, long, default_value = "")]
        body: String,

        /// Turn the note into a reminder firing at this time
        #[arg(long, value_parser = parse_timestamp)]
        remind_at: Option<i64>,
    },

    /// List all notes
    List,

    /// Remove a note
    Remove {
        /// Note id
        id: i64,
    },

    /// Show overdue, today's and upcoming reminders
    Reminders {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },
}

/// Report command arguments.
#[derive(Debug, Args)]
pub struct ReportCommand {
    /// First day (YYYY-MM-DD); defaults to the configured range
    #[arg(long)]
    pub from: Option<NaiveDate>,

    /// Last day (YYYY-MM-DD); defaults to today
    #[arg(long)]
    pub to: Option<NaiveDate>,

    /// Which part of the report to show
    #[arg(long, value_enum, default_value = "overview")]
    pub view: ReportViewArg,

    /// Limit ranked views to the top N entries
    #[arg(long)]
    pub top: Option<usize>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "plain")]
    pub format: OutputFormat,
}

/// Status command arguments.
#[derive(Debug, Args)]
pub struct StatusCommand {
    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Configuration commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show the configuration file path
    Path,

    /// Validate configuration
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}

/// Event status argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum EventStatusArg {
    /// Planned
    Draft,
    /// Announced or in progress
    Active,
    /// Finished
    Completed,
}

impl From<EventStatusArg> for crate::records::EventStatus {
    fn from(arg: EventStatusArg) -> Self {
        match arg {
            EventStatusArg::Draft => Self::Draft,
            EventStatusArg::Active => Self::Active,
            EventStatusArg::Completed => Self::Completed,
        }
    }
}

/// Report view argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ReportViewArg {
    /// Headline numbers
    Overview,
    /// Per-squad breakdown
    Squads,
    /// Per-event breakdown
    Events,
    /// Per-child breakdown
    Children,
    /// Day-by-day series
    Timeline,
    /// Achievement leaderboard
    Leaderboard,
}

impl From<ReportViewArg> for crate::analytics::ReportTab {
    fn from(arg: ReportViewArg) -> Self {
        match arg {
            ReportViewArg::Overview => Self::Overview,
            ReportViewArg::Squads => Self::Squads,
            ReportViewArg::Events => Self::Events,
            ReportViewArg::Children => Self::Children,
            ReportViewArg::Timeline => Self::Timeline,
            ReportViewArg::Leaderboard => Self::Leaderboard,
        }
    }
}

/// Output format for commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Plain text output
    #[default]
    Plain,
    /// JSON output
    Json,
}
