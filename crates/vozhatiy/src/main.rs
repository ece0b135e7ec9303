//! `vozhatiy` - CLI for the camp attendance tracker
//!
//! This binary manages the camp database and prints attendance reports.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::{NaiveDate, Utc};
use clap::Parser;
use tracing::{debug, info};

use vozhatiy::analytics::{self, AggregationWindow, ReportTab};
use vozhatiy::cli::render::{
    format_timestamp, render_leaderboard, render_outcome, render_reminders,
};
use vozhatiy::cli::{
    AchievementCommand, AttendanceCommand, ChildCommand, Cli, Command, ConfigCommand,
    EventCommand, NoteCommand, OutputFormat, ReportCommand,
};
use vozhatiy::records::{NewChild, NewEvent, NewNote};
use vozhatiy::{init_logging, reminders, Config, ReportController, Storage};

/// Default event length when no end time is given.
const DEFAULT_EVENT_MILLIS: i64 = 60 * 60 * 1000;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    init_logging(cli.verbosity());

    // Load configuration
    let config = Config::load_from(cli.config.clone()).context("failed to load configuration")?;

    // Config commands work without a database
    if let Command::Config(config_cmd) = cli.command {
        return handle_config(&config, config_cmd);
    }

    let database_path = config.database_path();
    let storage = Storage::open(&database_path)
        .with_context(|| format!("failed to open database at {}", database_path.display()))?;
    debug!(path = %database_path.display(), "Storage ready");

    match cli.command {
        Command::Child(cmd) => handle_child(&storage, cmd),
        Command::Event(cmd) => handle_event(&storage, &config, cmd),
        Command::Attendance(cmd) => handle_attendance(&storage, cmd),
        Command::Achievement(cmd) => handle_achievement(&storage, &config, cmd),
        Command::Note(cmd) => handle_note(&storage, &config, cmd),
        Command::Report(cmd) => handle_report(storage, &config, cmd).await,
        Command::Status(status_cmd) => handle_status(&storage, &config, status_cmd.json),
        Command::Config(_) => Ok(()),
    }
}

fn today() -> NaiveDate {
    Utc::now().date_naive()
}

/// Resolve `--from`/`--to` into a window, filling gaps from the configured
/// default range ending today.
fn resolve_window(
    config: &Config,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
) -> Result<AggregationWindow> {
    let window = match (from, to) {
        (Some(from), Some(to)) => AggregationWindow::from_dates(from, to)?,
        (Some(from), None) => AggregationWindow::from_dates(from, today().max(from))?,
        (None, to) => {
            AggregationWindow::last_days(to.unwrap_or_else(today), config.analytics.default_range_days)?
        }
    };
    Ok(window)
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn handle_child(storage: &Storage, cmd: ChildCommand) -> Result<()> {
    match cmd {
        ChildCommand::Add { name, squad, age } => {
            let child = storage.insert_child(&NewChild { name, squad, age })?;
            info!(child_id = child.id, "Child registered");
            println!("Added child #{}: {} ({})", child.id, child.name, child.squad);
        }
        ChildCommand::List { json } => {
            let children = storage.list_children()?;
            if json {
                return print_json(&children);
            }
            if children.is_empty() {
                println!("No children registered.");
            }
            for child in children {
                println!(
                    "#{:<4} {:<24} {:<16} age {}",
                    child.id, child.name, child.squad, child.age
                );
            }
        }
        ChildCommand::Remove { id } => {
            if !storage.delete_child(id)? {
                bail!("child #{id} not found");
            }
            println!("Removed child #{id}");
        }
    }
    Ok(())
}

fn handle_event(storage: &Storage, config: &Config, cmd: EventCommand) -> Result<()> {
    match cmd {
        EventCommand::Add {
            title,
            start,
            end,
            status,
        } => {
            let event = storage.insert_event(&NewEvent {
                title,
                starts_at: start,
                ends_at: end.unwrap_or(start + DEFAULT_EVENT_MILLIS),
                status: status.into(),
            })?;
            info!(event_id = event.id, "Event scheduled");
            println!(
                "Added event #{}: {} at {}",
                event.id,
                event.title,
                format_timestamp(event.starts_at)
            );
        }
        EventCommand::List { from, to, json } => {
            let window = resolve_window(config, from, to)?;
            let events = storage.events_in_range(window.start(), window.end())?;
            if json {
                return print_json(&events);
            }
            if events.is_empty() {
                println!("No events in this range.");
            }
            for event in events {
                println!(
                    "#{:<4} {}  {:<24} {}",
                    event.id,
                    format_timestamp(event.starts_at),
                    event.title,
                    event.status
                );
            }
        }
        EventCommand::Status { id, status } => {
            storage.set_event_status(id, status.into())?;
            println!("Event #{id} is now {}", vozhatiy::EventStatus::from(status));
        }
        EventCommand::Remove { id } => {
            if !storage.delete_event(id)? {
                bail!("event #{id} not found");
            }
            println!("Removed event #{id}");
        }
    }
    Ok(())
}

fn handle_attendance(storage: &Storage, cmd: AttendanceCommand) -> Result<()> {
    match cmd {
        AttendanceCommand::Mark {
            event,
            child,
            absent,
            note,
        } => {
            let record = storage.mark_attendance(child, event, !absent, note.as_deref())?;
            println!(
                "Marked child #{} {} at event #{}",
                record.child_id,
                if record.present { "present" } else { "absent" },
                record.event_id
            );
        }
        AttendanceCommand::Show { event, json } => {
            let Some(details) = storage.get_event(event)? else {
                bail!("event #{event} not found");
            };
            let marks = storage.attendance_for_event(event)?;
            if json {
                return print_json(&marks);
            }
            println!("{} ({})", details.title, format_timestamp(details.starts_at));
            if marks.is_empty() {
                println!("No marks yet.");
            }
            for mark in marks {
                let name = storage
                    .get_child(mark.child_id)?
                    .map_or_else(|| format!("#{}", mark.child_id), |child| child.name);
                println!(
                    "  {:<24} {:<8} {}",
                    name,
                    if mark.present { "present" } else { "absent" },
                    mark.note.unwrap_or_default()
                );
            }
        }
    }
    Ok(())
}

fn handle_achievement(storage: &Storage, config: &Config, cmd: AchievementCommand) -> Result<()> {
    match cmd {
        AchievementCommand::Award {
            child,
            title,
            points,
        } => {
            let award = storage.award_achievement(child, &title, points)?;
            println!(
                "Awarded {} pts to child #{} for {}",
                award.points, award.child_id, award.title
            );
        }
        AchievementCommand::List { child } => {
            let awards = storage.achievements_for_child(child)?;
            if awards.is_empty() {
                println!("No achievements for child #{child}.");
            }
            for award in awards {
                println!(
                    "{}  {:<32} {:>4} pts",
                    format_timestamp(award.awarded_at),
                    award.title,
                    award.points
                );
            }
        }
        AchievementCommand::Leaderboard { limit } => {
            let mut board =
                analytics::leaderboard(&storage.list_children()?, &storage.achievement_tallies()?);
            board.truncate(limit.unwrap_or(config.analytics.top_n));
            print!("{}", render_leaderboard(&board));
        }
    }
    Ok(())
}

fn handle_note(storage: &Storage, config: &Config, cmd: NoteCommand) -> Result<()> {
    match cmd {
        NoteCommand::Add {
            title,
            body,
            remind_at,
        } => {
            let note = storage.insert_note(&NewNote {
                title,
                body,
                remind_at,
            })?;
            match note.remind_at {
                Some(at) => println!("Added reminder #{} for {}", note.id, format_timestamp(at)),
                None => println!("Added note #{}", note.id),
            }
        }
        NoteCommand::List => {
            let notes = storage.list_notes()?;
            if notes.is_empty() {
                println!("No notes.");
            }
            for note in notes {
                println!("#{:<4} {}  {}", note.id, format_timestamp(note.created_at), note.title);
                if !note.body.is_empty() {
                    println!("      {}", note.body);
                }
            }
        }
        NoteCommand::Remove { id } => {
            if !storage.delete_note(id)? {
                bail!("note #{id} not found");
            }
            println!("Removed note #{id}");
        }
        NoteCommand::Reminders { json } => {
            let now = Utc::now();
            let horizon = config.reminder_horizon();
            let notes = storage.reminders_until(reminders::horizon_limit(now, horizon))?;
            let due = reminders::classify(&notes, now, horizon);
            if json {
                return print_json(&due);
            }
            print!("{}", render_reminders(&due));
        }
    }
    Ok(())
}

async fn handle_report(storage: Storage, config: &Config, cmd: ReportCommand) -> Result<()> {
    let window = resolve_window(config, cmd.from, cmd.to)?;
    let tab = ReportTab::from(cmd.view);
    let limit = cmd.top.or_else(|| {
        matches!(tab, ReportTab::Leaderboard).then_some(config.analytics.top_n)
    });

    let mut controller = ReportController::new(Arc::new(storage), config.analytics.day_mean_mode);
    controller.request(window);
    let Some(outcome) = controller.wait_ready().await else {
        bail!("report request was cancelled");
    };

    let view = outcome.report.view(tab, limit);
    match cmd.format {
        OutputFormat::Json => {
            let document = serde_json::json!({
                "window": outcome.report.window,
                "day_mean_mode": outcome.report.day_mean_mode,
                "report": view,
                "failures": outcome.failures,
                "message": outcome.message,
            });
            print_json(&document)
        }
        OutputFormat::Plain => {
            print!("{}", render_outcome(&outcome, &view));
            Ok(())
        }
    }
}

fn handle_status(storage: &Storage, config: &Config, json: bool) -> Result<()> {
    let stats = storage.stats()?;
    if json {
        let status = serde_json::json!({
            "database_path": storage.path(),
            "day_mean_mode": config.analytics.day_mean_mode,
            "stats": stats,
        });
        return print_json(&status);
    }

    println!("vozhatiy status");
    println!("---------------");
    println!("Database:      {}", storage.path().display());
    println!("Size:          {} bytes", stats.db_size_bytes);
    println!("Children:      {}", stats.children);
    println!("Events:        {}", stats.events);
    println!("Marks:         {}", stats.attendance_records);
    println!("Achievements:  {}", stats.achievements);
    println!("Notes:         {}", stats.notes);
    Ok(())
}

fn handle_config(config: &Config, cmd: ConfigCommand) -> Result<()> {
    match cmd {
        ConfigCommand::Show { json } => {
            if json {
                return print_json(config);
            }
            println!("Current Configuration");
            println!("=====================");
            println!();
            println!("[Storage]");
            println!("  Database path:      {}", config.database_path().display());
            println!();
            println!("[Analytics]");
            println!("  Day mean mode:      {}", config.analytics.day_mean_mode);
            println!("  Top N:              {}", config.analytics.top_n);
            println!(
                "  Default range days: {}",
                config.analytics.default_range_days
            );
            println!();
            println!("[Reminders]");
            println!("  Horizon (hours):    {}", config.reminders.horizon_hours);
        }
        ConfigCommand::Path => {
            println!("{}", Config::default_config_path().display());
        }
        ConfigCommand::Validate { file } => {
            let path = file.unwrap_or_else(Config::default_config_path);
            println!("Validating configuration: {}", path.display());
            match Config::load_from(Some(path)) {
                Ok(_) => println!("Configuration is valid."),
                Err(e) => println!("Configuration error: {e}"),
            }
        }
    }
    Ok(())
}
