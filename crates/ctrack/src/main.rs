//! `ctrack` - CLI for the ctrack time and mileage log
//!
//! This binary opens the project database, loads the document through the
//! persistence layer, and runs one command against it.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use anyhow::{bail, Context};
use chrono::Local;
use clap::Parser;
use tracing::debug;

use ctrack::calendar::MonthView;
use ctrack::cli::{
    parse_day, parse_interval_spec, Cli, Command, ConfigCommand, DayCommand, LogCommand,
    ShowCommand, TitleCommand,
};
use ctrack::{
    format_duration, format_miles, init_logging, Config, EntryEditor, MemoryStore, MonthCursor,
    Persistence, SaveOutcome, SqliteStore, Tracker,
};

type App = Tracker<Persistence<SqliteStore, MemoryStore>>;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    init_logging(cli.verbosity());

    // Load configuration
    let config = Config::load_from(cli.config.clone())?;

    // Execute the command
    match cli.command {
        Command::Show(cmd) => handle_show(&mut open_tracker(&config)?, &cmd),
        Command::Log(cmd) => handle_log(&mut open_tracker(&config)?, &cmd),
        Command::Day(cmd) => handle_day(&open_tracker(&config)?, &cmd),
        Command::Title(cmd) => handle_title(&mut open_tracker(&config)?, &cmd),
        Command::Backups => handle_backups(&open_tracker(&config)?),
        Command::Config(config_cmd) => handle_config(&config, config_cmd),
    }
}

fn open_tracker(config: &Config) -> anyhow::Result<App> {
    let path = config.database_path();
    debug!("Opening database at {}", path.display());
    let primary = SqliteStore::open(&path)
        .with_context(|| format!("could not open database {}", path.display()))?;

    let fallback = if config.storage.session_fallback {
        MemoryStore::new()
    } else {
        MemoryStore::unavailable()
    };

    let persistence = Persistence::new(primary, fallback)
        .with_default_title(config.project.default_title.clone());
    Ok(Tracker::open(persistence, Local::now().date_naive()))
}

fn handle_show(tracker: &mut App, cmd: &ShowCommand) -> anyhow::Result<()> {
    if let Some(month) = &cmd.month {
        tracker.show_month(MonthCursor::parse(month)?);
    }
    let view = tracker.month_view();

    if cmd.json {
        let days: Vec<_> = view
            .days
            .iter()
            .filter_map(|cell| {
                cell.totals.map(|totals| {
                    serde_json::json!({
                        "date": cell.date,
                        "hours": totals.hours,
                        "miles": totals.miles,
                    })
                })
            })
            .collect();
        let output = serde_json::json!({
            "project": tracker.project_title(),
            "month": view.cursor.to_string(),
            "days": days,
            "totals": view.totals,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!("{} - {}", tracker.project_title(), view.cursor.label());
    println!();
    print_grid(&view);
    println!();

    let logged: Vec<_> = view
        .days
        .iter()
        .filter_map(|cell| cell.totals.map(|totals| (cell, totals)))
        .collect();
    if logged.is_empty() {
        println!("Nothing logged this month.");
    } else {
        for (cell, totals) in logged {
            println!(
                "  {}  {:>6}  {:>8}",
                cell.date.format("%a %d"),
                format_duration(totals.hours),
                format_miles(totals.miles)
            );
        }
    }
    println!();
    println!(
        "Month total: {}  {}",
        format_duration(view.totals.hours),
        format_miles(view.totals.miles)
    );
    Ok(())
}

/// Sunday-first grid. Logged days carry a `*`, today is bracketed.
fn print_grid(view: &MonthView) {
    println!("  Su   Mo   Tu   We   Th   Fr   Sa");
    for week in view.weeks() {
        let line: String = week
            .iter()
            .map(|slot| match slot {
                None => "     ".to_string(),
                Some(cell) => {
                    let mark = if cell.totals.is_some() { '*' } else { ' ' };
                    if cell.is_today {
                        format!("[{:>2}]{mark}", cell.day)
                    } else {
                        format!(" {:>2} {mark}", cell.day)
                    }
                }
            })
            .collect();
        println!("{}", line.trim_end());
    }
}

fn handle_log(tracker: &mut App, cmd: &LogCommand) -> anyhow::Result<()> {
    let date = parse_day(&cmd.date, tracker.today())?;

    let mut editor = EntryEditor::open(date, None);
    for (i, spec) in cmd.intervals.iter().enumerate() {
        if i > 0 {
            editor.add_interval();
        }
        *editor.current_mut() = parse_interval_spec(spec)?;
    }

    let outcome = tracker.save_entry(&editor)?;
    let totals = editor.preview_totals();
    println!(
        "Logged {date}: {} {}",
        format_duration(totals.hours),
        format_miles(totals.miles)
    );
    report_outcome(outcome);
    Ok(())
}

fn handle_day(tracker: &App, cmd: &DayCommand) -> anyhow::Result<()> {
    let date = parse_day(&cmd.date, tracker.today())?;
    let entry = tracker.entry(date);

    if cmd.json {
        let output = serde_json::json!({ "date": date, "entry": entry });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    let Some(entry) = entry else {
        println!("Nothing logged for {date}.");
        return Ok(());
    };

    println!("{}", date.format("%A, %B %-d, %Y"));
    if entry.has_intervals() {
        for (i, interval) in entry.intervals.iter().enumerate() {
            println!(
                "  {}. {}-{}  {:>6}  {:>8}",
                i + 1,
                interval.start_time,
                interval.end_time,
                format_duration(interval.hours),
                format_miles(interval.miles)
            );
        }
    } else if let (Some(start), Some(end)) = (&entry.start_time, &entry.end_time) {
        println!("  {start}-{end}");
    }
    println!(
        "Total: {}  {}",
        format_duration(entry.hours),
        format_miles(entry.miles)
    );
    Ok(())
}

fn handle_title(tracker: &mut App, cmd: &TitleCommand) -> anyhow::Result<()> {
    match cmd.title.as_deref() {
        None => println!("{}", tracker.project_title()),
        Some(title) => {
            let title = title.trim();
            if title.is_empty() {
                bail!("project title must not be empty");
            }
            let outcome = tracker.set_project_title(title);
            println!("Project renamed to '{title}'.");
            report_outcome(outcome);
        }
    }
    Ok(())
}

fn handle_backups(tracker: &App) -> anyhow::Result<()> {
    let backups = tracker.store().list_backups()?;
    if backups.is_empty() {
        println!("No backups.");
    }
    for key in backups {
        println!("{key}");
    }
    Ok(())
}

fn report_outcome(outcome: SaveOutcome) {
    match outcome {
        SaveOutcome::Primary => {}
        SaveOutcome::Fallback => {
            eprintln!("Warning: database write failed; changes kept for this run only.");
        }
        SaveOutcome::Dropped => eprintln!("Warning: changes could not be saved."),
        SaveOutcome::ReadOnly => {
            eprintln!("Warning: the database was written by a newer ctrack; changes not saved.");
        }
    }
}

fn handle_config(config: &Config, cmd: ConfigCommand) -> anyhow::Result<()> {
    match cmd {
        ConfigCommand::Show { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(config)?);
            } else {
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[Storage]");
                println!("  Database path:      {}", config.database_path().display());
                println!("  Session fallback:   {}", config.storage.session_fallback);
                println!();
                println!("[Project]");
                println!("  Default title:      {}", config.project.default_title);
            }
        }
        ConfigCommand::Path => {
            println!("{}", Config::default_config_path().display());
        }
        ConfigCommand::Validate { file } => {
            let path = file.unwrap_or_else(Config::default_config_path);
            println!("Validating configuration: {}", path.display());
            Config::load_from(Some(path.clone()))
                .with_context(|| format!("invalid configuration in {}", path.display()))?;
            println!("Configuration is valid.");
        }
    }
    Ok(())
}
