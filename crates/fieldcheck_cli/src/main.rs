//! FieldCheck command-line driver.
//!
//! # Responsibility
//! - Run the inspection use-cases against a local database file.
//! - Keep output line-oriented so it can be piped or diffed.
//!
//! # Invariants
//! - The reference instant is established before any command reads the clock.

use clap::{Parser, Subcommand, ValueEnum};
use fieldcheck_core::clock::simulated_date;
use fieldcheck_core::db::open_db;
use fieldcheck_core::tabular::{backup_file_name, SpreadsheetFormat};
use fieldcheck_core::{
    default_log_level, format_for_display, init_logging, DateSummary, DetailRecord,
    FilePhotoCapture, InspectionOutcome, InspectionService, Judgment, JudgmentBucket,
    PhotoService, ResolvedPartition, SearchScope, SettingsService, SqliteKeyValueStore,
    SqlitePhotoStore, SystemClock,
};
use log::info;
use std::error::Error;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

const DEFAULT_DB_PATH: &str = "fieldcheck.sqlite3";

type CliResult = Result<(), Box<dyn Error>>;

#[derive(Debug, Parser)]
#[command(name = "fieldcheck")]
#[command(about = "Field inspection records on a simulated clock")]
struct Cli {
    /// Database file.
    #[arg(long, global = true, env = "FIELDCHECK_DB_PATH", default_value = DEFAULT_DB_PATH)]
    db: PathBuf,
    /// Absolute directory for rolling log files. Logging stays off when omitted.
    #[arg(long, global = true)]
    log_dir: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Prints core linkage info.
    Ping,
    /// Prints the simulated time.
    Clock,
    /// Stores a new anchor date (YYYY-MM-DD) and time (HH:mm).
    SetAnchor { date: String, time: String },
    /// Restarts simulated time from the stored anchor.
    ResetReference,
    /// Imports an .xlsx or CSV spreadsheet, replacing detail rows.
    Import { path: PathBuf },
    /// Adds a detail row by hand from COLUMN=VALUE pairs.
    Create {
        #[arg(required = true, value_parser = parse_field)]
        fields: Vec<(String, String)>,
    },
    /// Lists detail rows containing TERM.
    Search {
        term: String,
        /// Restrict matching to one column.
        #[arg(long)]
        column: Option<String>,
    },
    /// Saves the inspection of one record.
    Inspect {
        record_id: String,
        #[arg(long, value_enum)]
        judgment: Option<JudgmentArg>,
        /// fit | unfit | absent_closed | other
        #[arg(long)]
        result: Option<String>,
        /// Effective date, YYYY-MM-DD. Defaults to the simulated date for new inspections.
        #[arg(long)]
        date: Option<String>,
        #[arg(long)]
        memo: Option<String>,
    },
    /// Captures a photo from an image file and attaches it to a record.
    Photo { record_id: String, image: PathBuf },
    /// Prints per-date summaries, or the partitions of one date.
    Summary {
        date: Option<String>,
        #[arg(long, value_enum)]
        judgment: Option<JudgmentArg>,
    },
    /// Writes the combined export; `.csv` paths get CSV, anything else .xlsx.
    Export { path: Option<PathBuf> },
    /// Removes detail rows and inspections. Time settings and photos are kept.
    Clear,
}

impl Command {
    fn name(&self) -> &'static str {
        match self {
            Self::Ping => "ping",
            Self::Clock => "clock",
            Self::SetAnchor { .. } => "set-anchor",
            Self::ResetReference => "reset-reference",
            Self::Import { .. } => "import",
            Self::Create { .. } => "create",
            Self::Search { .. } => "search",
            Self::Inspect { .. } => "inspect",
            Self::Photo { .. } => "photo",
            Self::Summary { .. } => "summary",
            Self::Export { .. } => "export",
            Self::Clear => "clear",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum JudgmentArg {
    Yes,
    No,
}

impl From<JudgmentArg> for Judgment {
    fn from(value: JudgmentArg) -> Self {
        match value {
            JudgmentArg::Yes => Self::Yes,
            JudgmentArg::No => Self::No,
        }
    }
}

impl From<JudgmentArg> for JudgmentBucket {
    fn from(value: JudgmentArg) -> Self {
        match value {
            JudgmentArg::Yes => Self::Yes,
            JudgmentArg::No => Self::No,
        }
    }
}

fn parse_field(raw: &str) -> Result<(String, String), String> {
    let (column, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected COLUMN=VALUE, got `{raw}`"))?;
    if column.trim().is_empty() {
        return Err(format!("column name is blank in `{raw}`"));
    }
    Ok((column.to_string(), value.to_string()))
}

fn export_format(path: &Path) -> SpreadsheetFormat {
    path.extension()
        .and_then(|ext| ext.to_str())
        .and_then(SpreadsheetFormat::from_extension)
        .unwrap_or(SpreadsheetFormat::Xlsx)
}

fn main() -> ExitCode {
    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> CliResult {
    if let Some(log_dir) = cli.log_dir.as_deref() {
        init_logging(default_log_level(), log_dir)?;
    }
    info!(
        "event=cli_command module=cli status=start command={}",
        cli.command.name()
    );

    let conn = open_db(&cli.db)?;
    let store = SqliteKeyValueStore::new(&conn);
    let settings = SettingsService::new(store, SystemClock);
    settings.ensure_reference_instant()?;
    let clock = settings.clock()?;
    let inspections = InspectionService::new(store, &clock);

    match cli.command {
        Command::Ping => {
            println!("fieldcheck_core ping={}", fieldcheck_core::ping());
            println!("fieldcheck_core version={}", fieldcheck_core::core_version());
            println!("db={}", cli.db.display());
        }
        Command::Clock => {
            if let Err(err) = clock.try_now() {
                eprintln!("warning: {err}; showing real time");
            }
            println!("{}", format_for_display(clock.now()));
        }
        Command::SetAnchor { date, time } => {
            let anchor = settings.save_anchor(&date, &time)?;
            println!("anchor={} {}", anchor.anchor_date, anchor.anchor_time);
            println!("now={}", format_for_display(settings.clock()?.now()));
        }
        Command::ResetReference => {
            settings.reset_reference_instant()?;
            println!("now={}", format_for_display(settings.clock()?.now()));
        }
        Command::Import { path } => {
            let bytes = std::fs::read(&path)?;
            let count = inspections.import_records(&bytes)?;
            println!("imported {count} row(s) from {}", path.display());
        }
        Command::Create { fields } => {
            let record = inspections.create_record(fields)?;
            println!("created {}", record_line(&record));
        }
        Command::Search { term, column } => {
            let scope = column.map_or(SearchScope::All, SearchScope::Column);
            for record in inspections.search_records(&term, &scope)? {
                println!("{}", record_line(&record));
            }
        }
        Command::Inspect {
            record_id,
            judgment,
            result,
            date,
            memo,
        } => {
            let mut inspection = inspections.open_inspection(&record_id)?;
            if let Some(judgment) = judgment {
                inspection.judgment = Some(judgment.into());
            }
            if let Some(result) = result {
                let outcome = InspectionOutcome::parse(&result)
                    .ok_or_else(|| format!("unknown inspection result `{result}`"))?;
                inspection.inspection_result = Some(outcome);
            }
            if let Some(date) = date {
                inspection.date = date;
            }
            if let Some(memo) = memo {
                inspection.memo = memo;
            }
            let saved = inspections.save_inspection(inspection)?;
            println!(
                "saved {} date={} updated={}",
                saved.id,
                saved.date,
                saved.updated_at.map(format_for_display).unwrap_or_default()
            );
        }
        Command::Photo { record_id, image } => {
            let photos = PhotoService::new(
                SqlitePhotoStore::new(&conn),
                FilePhotoCapture::new(image),
            );
            let inspection = inspections.open_inspection(&record_id)?;
            let name = photos.capture_and_store(clock.now())?;
            photos.attach_photo(inspection, &name, |updated| {
                inspections.save_inspection(updated)
            })?;
            println!("attached {name} to {record_id}");
        }
        Command::Summary { date: None, .. } => {
            for summary in inspections.summaries()? {
                println!("{}", summary_line(&summary));
            }
        }
        Command::Summary {
            date: Some(date),
            judgment,
        } => {
            let buckets = match judgment {
                Some(judgment) => vec![JudgmentBucket::from(judgment)],
                None => vec![JudgmentBucket::Yes, JudgmentBucket::No],
            };
            for bucket in buckets {
                let resolved = inspections.resolve(&date, bucket)?;
                print_partition(&date, bucket, &resolved);
            }
        }
        Command::Export { path } => {
            let path = path.unwrap_or_else(|| {
                PathBuf::from(backup_file_name(
                    &simulated_date(clock.now()),
                    SpreadsheetFormat::Xlsx,
                ))
            });
            let bytes = inspections.export_records(export_format(&path))?;
            std::fs::write(&path, bytes)?;
            println!("exported to {}", path.display());
        }
        Command::Clear => {
            inspections.clear_all()?;
            println!("cleared records and inspections");
        }
    }
    Ok(())
}

fn record_line(record: &DetailRecord) -> String {
    let mut line = record.id.clone();
    for (column, value) in &record.fields {
        line.push('\t');
        line.push_str(column);
        line.push('=');
        line.push_str(value);
    }
    line
}

fn summary_line(summary: &DateSummary) -> String {
    format!(
        "{} fit={} unfit={} absent_closed={} other={} yes={} no={}",
        summary.date,
        summary.counts.fit,
        summary.counts.unfit,
        summary.counts.absent_closed,
        summary.counts.other,
        summary.yes_items.len(),
        summary.no_items.len()
    )
}

fn print_partition(date: &str, bucket: JudgmentBucket, resolved: &ResolvedPartition) {
    let label = match bucket {
        JudgmentBucket::Yes => "yes",
        JudgmentBucket::No => "no",
    };
    println!("# {date} {label} ({})", resolved.entries.len());
    for entry in &resolved.entries {
        println!(
            "{}\tresult={}\tat={}\tmemo={}",
            record_line(&entry.detail),
            entry
                .inspection
                .inspection_result
                .map_or("", InspectionOutcome::as_str),
            entry
                .inspection
                .activity_instant()
                .map(format_for_display)
                .unwrap_or_default(),
            entry.inspection.memo
        );
    }
    if resolved.dropped > 0 {
        eprintln!(
            "warning: {} listed record(s) could not be loaded",
            resolved.dropped
        );
    }
}
