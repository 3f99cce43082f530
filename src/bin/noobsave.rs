//! # NoobSave CLI
//!
//! Command-line front end for the NoobSave engine.
//!
//! ## Usage
//! ```bash
//! # Catalog everything under ./archive now
//! noobsave sync
//!
//! # Keep saving in the background until Ctrl-C
//! noobsave watch --tick 5s
//!
//! # Bring back deleted files
//! noobsave restore
//! noobsave restore --subdir docs
//!
//! # Adjust what gets saved
//! noobsave settings extensions .pdf .md
//! noobsave settings interval 2m
//! ```

use clap::{Parser, Subcommand};
use colored::*;
use humantime::format_duration;
use noobsave::utils::format_bytes;
use noobsave::{NoobSaveError, Result, SyncEngine, SyncEngineBuilder};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// NoobSave - keep a catalog of your files and restore them when they vanish
#[derive(Parser)]
#[command(name = "noobsave")]
#[command(version)]
#[command(about = "Catalog a directory tree in a database and restore missing files from it")]
#[command(long_about = None)]
struct Cli {
    /// Where the catalog database and settings live
    #[arg(long, global = true, default_value = ".noobsave")]
    data_dir: PathBuf,

    /// Save root used when no override is configured
    #[arg(long, global = true, default_value = "archive")]
    default_save_path: PathBuf,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Reconcile the save root into the catalog now
    Sync,

    /// Run scheduled saving until interrupted
    Watch {
        /// Scheduler tick period (e.g. 5s, 500ms)
        #[arg(long)]
        tick: Option<humantime::Duration>,
    },

    /// List catalog entries
    #[command(alias = "ls")]
    List {
        /// Show detailed info
        #[arg(short, long)]
        detailed: bool,

        /// Limit results
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Show one entry
    Show {
        /// Entry id or unique id prefix
        id: String,

        /// Print the stored content as text
        #[arg(long)]
        content: bool,
    },

    /// Delete an entry from disk and from the catalog
    #[command(alias = "rm")]
    Delete {
        /// Entry id or unique id prefix
        id: String,
    },

    /// Restore cataloged files missing from disk
    #[command(alias = "rs")]
    Restore {
        /// Only restore this sub-directory ("" for root-level files)
        #[arg(long)]
        subdir: Option<String>,
    },

    /// List sub-directories that hold cataloged files
    Subdirs,

    /// Write an entry's content to a new file
    Export {
        /// Entry id or unique id prefix
        id: String,

        /// Destination file, or a directory to place it in
        dest: PathBuf,
    },

    /// Inspect or change auto-save settings
    Settings {
        #[command(subcommand)]
        action: SettingsCommand,
    },
}

#[derive(Subcommand)]
enum SettingsCommand {
    /// Print the current settings
    Show,
    /// Turn scheduled saving on
    Enable,
    /// Turn scheduled saving off
    Disable,
    /// Minimum time between scheduled passes (milliseconds or e.g. 90s)
    Interval {
        #[arg(value_parser = parse_interval)]
        interval: Duration,
    },
    /// Replace the extension allow-list
    Extensions {
        /// Suffixes such as .pdf or txt
        #[arg(required = true)]
        extensions: Vec<String>,
    },
    /// Override the save root with an existing directory
    SavePath { dir: PathBuf },
    /// Go back to the default save root
    ClearSavePath,
}

fn main() {
    let cli = Cli::parse();

    // Set up logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if std::env::var("NO_COLOR").is_ok() {
        colored::control::set_override(false);
    }

    if let Err(e) = run(cli) {
        eprintln!("{}: {}", "Error".red().bold(), e.user_message());
        std::process::exit(1);
    }
}

/// Main command runner
fn run(cli: Cli) -> Result<()> {
    let engine = SyncEngineBuilder::new()
        .data_dir(&cli.data_dir)
        .default_save_path(&cli.default_save_path)
        .build()?;

    match cli.command {
        Commands::Sync => cmd_sync(&engine),
        Commands::Watch { tick } => cmd_watch(&engine, tick.map(Into::into)),
        Commands::List { detailed, limit } => cmd_list(&engine, detailed, limit),
        Commands::Show { id, content } => cmd_show(&engine, &id, content),
        Commands::Delete { id } => cmd_delete(&engine, &id),
        Commands::Restore { subdir } => cmd_restore(&engine, subdir),
        Commands::Subdirs => cmd_subdirs(&engine),
        Commands::Export { id, dest } => cmd_export(&engine, &id, dest),
        Commands::Settings { action } => cmd_settings(&engine, action),
    }
}

fn cmd_sync(engine: &SyncEngine) -> Result<()> {
    let root = engine.effective_save_path()?;
    println!("{} {}", "Syncing".blue().bold(), root.display().to_string().cyan());

    let report = engine.trigger_sync()?;

    println!(
        "{} {} files processed in {}",
        "✓".green().bold(),
        report.processed,
        format_duration(Duration::from_millis(report.duration_ms))
    );
    println!(
        "  New: {} | Updated: {} | Unchanged: {}",
        report.inserted.to_string().green(),
        report.updated.to_string().yellow(),
        report.unchanged.to_string().dimmed()
    );
    if report.skipped > 0 || report.ignored > 0 {
        println!(
            "  Skipped: {} | Ignored: {}",
            report.skipped.to_string().yellow(),
            report.ignored.to_string().dimmed()
        );
    }
    print_warnings(&report.warnings);
    Ok(())
}

fn cmd_watch(engine: &SyncEngine, tick: Option<Duration>) -> Result<()> {
    let period = tick.unwrap_or(engine.config().tick_period);
    let settings = engine.settings()?;

    println!(
        "{} {} (tick {}, interval {})",
        "Watching".blue().bold(),
        settings
            .effective_save_path(&engine.config().default_save_path)
            .display()
            .to_string()
            .cyan(),
        format_duration(period),
        format_duration(settings.interval())
    );
    if !settings.auto_save_enabled {
        println!(
            "{}",
            "Auto-save is disabled; enable it with `noobsave settings enable`".yellow()
        );
    }
    println!("{}", "Press Ctrl-C to stop".dimmed());

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    let gate = engine.scheduler();
    let state = gate.clone();
    runtime.block_on(async move {
        let handle = gate.spawn(period);
        let signal = tokio::signal::ctrl_c().await;
        handle.shutdown().await;
        signal
    })?;

    println!(
        "{} Stopped after {} scheduled passes",
        "✓".green().bold(),
        state.state().runs
    );
    Ok(())
}

fn cmd_list(engine: &SyncEngine, detailed: bool, limit: Option<usize>) -> Result<()> {
    let entries = engine.list_all_entries()?;

    if entries.is_empty() {
        println!("{}", "No entries found.".yellow());
        return Ok(());
    }

    println!("{}", "Catalog:".blue().bold());
    println!();

    let display_count = limit.unwrap_or(entries.len()).min(entries.len());

    for entry in entries.iter().take(display_count) {
        print!("  {} ", entry.short_id().yellow().bold());
        print!(
            "{} ",
            entry
                .modified_at
                .format("%Y-%m-%d %H:%M:%S")
                .to_string()
                .dimmed()
        );
        print!("{} ", entry.name.cyan());
        println!("{}", format_bytes(entry.size()).dimmed());

        if detailed {
            println!("      Path: {}", entry.path.display().to_string().dimmed());
            println!("      Type: {}", entry.mime_type.dimmed());
            println!(
                "      Added: {}",
                entry.added_at.format("%Y-%m-%d %H:%M:%S").to_string().dimmed()
            );
        }
    }

    if display_count < entries.len() {
        println!(
            "\n{}",
            format!("Showing {} of {} entries", display_count, entries.len()).dimmed()
        );
    }
    Ok(())
}

fn cmd_show(engine: &SyncEngine, id: &str, content: bool) -> Result<()> {
    let entry = engine.resolve_entry(id)?;

    println!("{} {}", "Entry".blue().bold(), entry.name.cyan().bold());
    println!("  ID:       {}", entry.id.as_deref().unwrap_or("-").yellow());
    println!("  Path:     {}", entry.path.display());
    println!("  Type:     {}", entry.mime_type);
    println!("  Size:     {}", format_bytes(entry.size()));
    println!("  SHA-256:  {}", entry.content_digest().dimmed());
    println!("  Added:    {}", entry.added_at.format("%Y-%m-%d %H:%M:%S %Z"));
    println!("  Modified: {}", entry.modified_at.format("%Y-%m-%d %H:%M:%S %Z"));

    let root = engine.effective_save_path()?;
    match noobsave::classify::subdir_of(&entry.path, &root) {
        noobsave::Subdirectory::Root => println!("  Location: {}", "save root".green()),
        noobsave::Subdirectory::Named(name) => println!("  Location: {}", name.green()),
        noobsave::Subdirectory::Unknown => {
            println!("  Location: {}", "outside the save root".yellow())
        }
    }

    if content {
        println!();
        println!("{}", String::from_utf8_lossy(&entry.content));
    }
    Ok(())
}

fn cmd_delete(engine: &SyncEngine, id: &str) -> Result<()> {
    let entry = engine.resolve_entry(id)?;
    engine.delete_entry(&entry)?;
    println!(
        "{} Deleted {} ({})",
        "✓".green().bold(),
        entry.name.cyan(),
        entry.short_id().yellow()
    );
    Ok(())
}

fn cmd_restore(engine: &SyncEngine, subdir: Option<String>) -> Result<()> {
    let result = match &subdir {
        Some(name) => {
            let label = if name.is_empty() { "save root" } else { name.as_str() };
            println!("{} {}", "Restoring".blue().bold(), label.cyan());
            engine.restore_subdirectory(name)?
        }
        None => {
            println!("{}", "Restoring all missing files".blue().bold());
            engine.restore_all_missing()?
        }
    };

    println!(
        "{} Restored {} files ({}) in {}",
        "✓".green().bold(),
        result.files_restored,
        format_bytes(result.bytes_written),
        format_duration(Duration::from_millis(result.duration_ms))
    );
    if result.files_skipped_existing > 0 {
        println!(
            "  Already present: {}",
            result.files_skipped_existing.to_string().dimmed()
        );
    }
    if result.files_failed > 0 {
        println!("  Failed: {}", result.files_failed.to_string().red());
    }
    print_warnings(&result.warnings);
    Ok(())
}

fn cmd_subdirs(engine: &SyncEngine) -> Result<()> {
    let dirs = engine.list_known_subdirectories()?;
    if dirs.is_empty() {
        println!("{}", "No sub-directories hold cataloged files.".yellow());
        return Ok(());
    }
    for dir in dirs {
        println!("  {}", dir.cyan());
    }
    Ok(())
}

fn cmd_export(engine: &SyncEngine, id: &str, dest: PathBuf) -> Result<()> {
    let entry = engine.resolve_entry(id)?;
    let id = entry
        .id
        .as_deref()
        .ok_or_else(|| NoobSaveError::EntryNotFound(entry.name.clone()))?;
    let written = engine.export_entry(id, &dest)?;
    println!(
        "{} Exported {} to {}",
        "✓".green().bold(),
        entry.name.cyan(),
        written.display().to_string().cyan()
    );
    Ok(())
}

fn cmd_settings(engine: &SyncEngine, action: SettingsCommand) -> Result<()> {
    match action {
        SettingsCommand::Show => {}
        SettingsCommand::Enable => engine.update_auto_save(true)?,
        SettingsCommand::Disable => engine.update_auto_save(false)?,
        SettingsCommand::Interval { interval } => engine.update_interval(interval)?,
        SettingsCommand::Extensions { extensions } => {
            engine.update_extensions(extensions.iter().map(|e| normalize_extension(e)).collect())?
        }
        SettingsCommand::SavePath { dir } => engine.update_save_path(&dir)?,
        SettingsCommand::ClearSavePath => engine.clear_save_path()?,
    }

    let settings = engine.settings()?;
    let enabled = if settings.auto_save_enabled {
        "enabled".green()
    } else {
        "disabled".red()
    };
    println!("{}", "Settings:".blue().bold());
    println!("  Auto-save:  {}", enabled);
    println!("  Interval:   {}", format_duration(settings.interval()));
    println!("  Extensions: {}", settings.allowed_extensions.join(" ").cyan());
    match &settings.save_path {
        Some(path) => println!("  Save path:  {}", path.display().to_string().cyan()),
        None => println!(
            "  Save path:  {} {}",
            engine.config().default_save_path.display().to_string().cyan(),
            "(default)".dimmed()
        ),
    }
    Ok(())
}

fn print_warnings(warnings: &[noobsave::PassWarning]) {
    if warnings.is_empty() {
        return;
    }
    println!("\n{} {}", "Warnings:".yellow().bold(), warnings.len());
    for warning in warnings.iter().take(10) {
        println!("  {} {}", "!".yellow(), warning);
    }
    if warnings.len() > 10 {
        println!("  {}", format!("... and {} more", warnings.len() - 10).dimmed());
    }
}

/// Accept `.pdf` and `pdf` alike
fn normalize_extension(ext: &str) -> String {
    let trimmed = ext.trim();
    if trimmed.starts_with('.') {
        trimmed.to_string()
    } else {
        format!(".{}", trimmed)
    }
}

/// Bare numbers are milliseconds, anything else goes through humantime
fn parse_interval(raw: &str) -> std::result::Result<Duration, String> {
    if let Ok(ms) = raw.parse::<u64>() {
        return Ok(Duration::from_millis(ms));
    }
    humantime::parse_duration(raw).map_err(|e| format!("invalid interval '{}': {}", raw, e))
}
