//! bosstimer CLI - Track boss respawn timers across server channels
//!
//! Keeps a local table collection in a JSON store and exchanges it with
//! other players through portable backup blobs.

use std::collections::HashMap;
use std::env;
use std::io::{self, IsTerminal, Read, Write};
use std::path::{Path, PathBuf};

use bosstimer_core::codec;
use bosstimer_core::merge::{apply_choices, merge_tables};
use bosstimer_core::models::MAX_CHANNELS;
use bosstimer_core::util::host_timezone;
use bosstimer_core::{BossTable, ConflictChoice, MergePreview};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::aot::Generator;
use clap_complete::{generate, shells};
use serde::Serialize;
use thiserror::Error;

#[derive(Parser)]
#[command(name = "bosstimer")]
#[command(about = "Track boss respawn timers across server channels")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Optional path to the local table store
    #[arg(long, value_name = "PATH")]
    store: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new boss table
    #[command(alias = "new")]
    Add {
        /// Boss name
        boss: String,
        /// Number of channels to track
        #[arg(short, long, default_value = "1")]
        channels: u32,
    },
    /// Set or clear a channel's timer
    Set {
        /// Boss name
        boss: String,
        /// Channel number
        channel: u32,
        /// Kill timestamp (Unix ms)
        #[arg(long, value_name = "MS")]
        killed_at: Option<i64>,
        /// Earliest respawn timestamp (Unix ms)
        #[arg(long, value_name = "MS")]
        earliest: Option<i64>,
        /// Latest respawn timestamp (Unix ms)
        #[arg(long, value_name = "MS")]
        latest: Option<i64>,
        /// Reset the channel before applying any new values
        #[arg(long)]
        clear: bool,
    },
    /// List tracked boss tables
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Export all tables as a portable backup blob
    Export {
        /// Optional output path (stdout when omitted)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
    /// Import a backup blob and merge it into the local tables
    Import {
        /// Optional input path (stdin when omitted)
        #[arg(value_name = "PATH")]
        input: Option<PathBuf>,
        /// Which side wins when both hold different timer data
        #[arg(long, value_enum, default_value_t = Prefer::Mine)]
        prefer: Prefer,
        /// Show the merge outcome without writing the store
        #[arg(long)]
        dry_run: bool,
    },
    /// Generate shell completion scripts
    Completions {
        /// Target shell
        #[arg(value_enum)]
        shell: CompletionShell,
        /// Optional output path (stdout when omitted)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
}

#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Core(#[from] bosstimer_core::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("Boss name cannot be empty")]
    EmptyBossName,
    #[error("No table found for boss: {0}")]
    BossNotFound(String),
    #[error("A table for boss '{0}' already exists")]
    BossAlreadyExists(String),
    #[error("Channel {0} is out of range (this table tracks {1} channels)")]
    ChannelOutOfRange(u32, u32),
    #[error("Nothing to set; pass --killed-at, --earliest, --latest, or --clear")]
    EmptyTimerUpdate,
    #[error("No backup input; pass a file path or pipe the blob on stdin")]
    EmptyBackupInput,
    #[error("Store file is not a table collection: {0}")]
    InvalidStore(String),
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
enum Prefer {
    Mine,
    Theirs,
}

impl From<Prefer> for ConflictChoice {
    fn from(prefer: Prefer) -> Self {
        match prefer {
            Prefer::Mine => Self::Mine,
            Prefer::Theirs => Self::Theirs,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
enum CompletionShell {
    Bash,
    Zsh,
    Fish,
}

fn main() {
    if let Err(error) = run() {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("bosstimer=info".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();
    let store_path = resolve_store_path(cli.store);

    match cli.command {
        Commands::Add { boss, channels } => run_add(&boss, channels, &store_path)?,
        Commands::Set {
            boss,
            channel,
            killed_at,
            earliest,
            latest,
            clear,
        } => {
            let update = TimerUpdate {
                killed_at,
                earliest,
                latest,
                clear,
            };
            run_set(&boss, channel, &update, &store_path)?;
        }
        Commands::List { json } => run_list(json, &store_path)?,
        Commands::Export { output } => run_export(output.as_deref(), &store_path)?,
        Commands::Import {
            input,
            prefer,
            dry_run,
        } => run_import(input.as_deref(), prefer, dry_run, &store_path)?,
        Commands::Completions { shell, output } => run_completions(shell, output.as_deref())?,
    }

    Ok(())
}

fn run_add(boss: &str, channels: u32, store_path: &Path) -> Result<(), CliError> {
    let boss = normalize_boss_name(boss)?;
    let mut tables = load_tables(store_path)?;

    if tables.iter().any(|table| table.boss_name == boss) {
        return Err(CliError::BossAlreadyExists(boss));
    }

    let table = BossTable::new(boss, channels.clamp(1, MAX_CHANNELS));
    println!("{}", table.id);
    tables.push(table);
    save_tables(store_path, &tables)
}

#[derive(Debug, Clone, Copy)]
struct TimerUpdate {
    killed_at: Option<i64>,
    earliest: Option<i64>,
    latest: Option<i64>,
    clear: bool,
}

impl TimerUpdate {
    const fn is_empty(&self) -> bool {
        self.killed_at.is_none() && self.earliest.is_none() && self.latest.is_none() && !self.clear
    }
}

fn run_set(
    boss: &str,
    channel: u32,
    update: &TimerUpdate,
    store_path: &Path,
) -> Result<(), CliError> {
    if update.is_empty() {
        return Err(CliError::EmptyTimerUpdate);
    }

    let boss = normalize_boss_name(boss)?;
    let mut tables = load_tables(store_path)?;
    let table = tables
        .iter_mut()
        .find(|table| table.boss_name == boss)
        .ok_or_else(|| CliError::BossNotFound(boss.clone()))?;

    let channels_count = table.channels_count;
    let slot = table
        .channel_mut(channel)
        .ok_or(CliError::ChannelOutOfRange(channel, channels_count))?;

    if update.clear {
        slot.clear();
    }
    if let Some(killed_at) = update.killed_at {
        slot.killed_at = Some(killed_at);
    }
    if let Some(earliest) = update.earliest {
        slot.earliest_respawn_at = Some(earliest);
    }
    if let Some(latest) = update.latest {
        slot.latest_respawn_at = Some(latest);
    }

    println!("{boss} ch{channel}");
    save_tables(store_path, &tables)
}

#[derive(Debug, Serialize)]
struct TableListItem {
    id: String,
    boss_name: String,
    channels_count: u32,
    armed_channels: usize,
    next_respawn_at: Option<i64>,
}

fn run_list(as_json: bool, store_path: &Path) -> Result<(), CliError> {
    let tables = load_tables(store_path)?;

    if as_json {
        let items = tables
            .iter()
            .map(table_to_list_item)
            .collect::<Vec<TableListItem>>();
        println!("{}", serde_json::to_string_pretty(&items)?);
    } else {
        for line in format_table_lines(&tables) {
            println!("{line}");
        }
    }

    Ok(())
}

fn run_export(output_path: Option<&Path>, store_path: &Path) -> Result<(), CliError> {
    let tables = load_tables(store_path)?;
    let blob = codec::encode(&tables, &host_timezone())?;

    if let Some(path) = output_path {
        std::fs::write(path, blob)?;
        println!("{}", path.display());
    } else {
        println!("{blob}");
    }

    Ok(())
}

fn run_import(
    input_path: Option<&Path>,
    prefer: Prefer,
    dry_run: bool,
    store_path: &Path,
) -> Result<(), CliError> {
    let blob = read_backup_input(input_path)?;
    let decoded = codec::decode(&blob, &host_timezone())?;
    for warning in &decoded.warnings {
        eprintln!("warning: {warning}");
    }

    let tables = load_tables(store_path)?;
    let preview = merge_tables(&tables, &decoded.payload.tables);
    tracing::info!(
        "merged {} imported tables into {} local ones ({} conflicts)",
        decoded.payload.tables.len(),
        tables.len(),
        preview.conflicts.len()
    );

    if dry_run {
        print_merge_summary(&preview);
        return Ok(());
    }

    let choices = preview
        .conflicts
        .iter()
        .map(|conflict| (conflict.id.clone(), ConflictChoice::from(prefer)))
        .collect::<HashMap<_, _>>();
    let resolved = apply_choices(&preview, &choices);

    save_tables(store_path, &resolved)?;
    println!(
        "Imported {} tables ({} conflicts resolved as {:?})",
        decoded.payload.tables.len(),
        preview.conflicts.len(),
        prefer
    );
    Ok(())
}

fn print_merge_summary(preview: &MergePreview) {
    if preview.is_clean() {
        println!("Merge is clean: {} tables", preview.merged_tables.len());
        return;
    }

    println!("{} conflicts:", preview.conflicts.len());
    for conflict in &preview.conflicts {
        println!(
            "  {} ch{}: mine {} / theirs {}",
            conflict.boss_name,
            conflict.channel,
            describe_timer(&conflict.mine),
            describe_timer(&conflict.theirs)
        );
    }
}

fn describe_timer(timer: &bosstimer_core::ChannelTimer) -> String {
    let mut parts = Vec::new();
    if let Some(killed_at) = timer.killed_at {
        parts.push(format!("killed@{killed_at}"));
    }
    if let Some(earliest) = timer.earliest_respawn_at {
        parts.push(format!("earliest@{earliest}"));
    }
    if let Some(latest) = timer.latest_respawn_at {
        parts.push(format!("latest@{latest}"));
    }
    if parts.is_empty() {
        "unset".to_string()
    } else {
        parts.join(" ")
    }
}

fn run_completions(shell: CompletionShell, output_path: Option<&Path>) -> Result<(), CliError> {
    let mut command = Cli::command();
    let mut buffer = Vec::new();

    match shell {
        CompletionShell::Bash => generate_for_shell(shells::Bash, &mut command, &mut buffer),
        CompletionShell::Zsh => generate_for_shell(shells::Zsh, &mut command, &mut buffer),
        CompletionShell::Fish => generate_for_shell(shells::Fish, &mut command, &mut buffer),
    }

    if let Some(path) = output_path {
        std::fs::write(path, &buffer)?;
        println!("{}", path.display());
    } else {
        io::stdout().write_all(&buffer)?;
    }

    Ok(())
}

fn generate_for_shell<G: Generator>(
    generator: G,
    command: &mut clap::Command,
    buffer: &mut Vec<u8>,
) {
    generate(generator, command, "bosstimer", buffer);
}

fn table_to_list_item(table: &BossTable) -> TableListItem {
    TableListItem {
        id: table.id.clone(),
        boss_name: table.boss_name.clone(),
        channels_count: table.channels_count,
        armed_channels: table.armed_channels(),
        next_respawn_at: next_respawn_at(table),
    }
}

fn format_table_lines(tables: &[BossTable]) -> Vec<String> {
    let now_ms = chrono::Utc::now().timestamp_millis();
    tables
        .iter()
        .map(|table| {
            let short_id = table.id.chars().take(13).collect::<String>();
            let armed = table.armed_channels();
            let next = next_respawn_at(table).map_or_else(
                || "no timers".to_string(),
                |at| format!("next spawn {}", format_offset(at, now_ms)),
            );

            format!(
                "{short_id:<13}  {:<24}  {armed}/{} armed  {next}",
                table.boss_name, table.channels_count
            )
        })
        .collect()
}

/// Earliest upcoming respawn across all channels of a table.
fn next_respawn_at(table: &BossTable) -> Option<i64> {
    table
        .channels
        .iter()
        .filter_map(|timer| timer.earliest_respawn_at)
        .min()
}

fn format_offset(timestamp_ms: i64, now_ms: i64) -> String {
    let diff = timestamp_ms.saturating_sub(now_ms);
    let magnitude = diff.unsigned_abs();
    let minute = 60_000;
    let hour = 60 * minute;
    let day = 24 * hour;

    let amount = if magnitude < minute {
        "under 1m".to_string()
    } else if magnitude < hour {
        format!("{}m", magnitude / minute)
    } else if magnitude < day {
        format!("{}h", magnitude / hour)
    } else {
        format!("{}d", magnitude / day)
    };

    if diff >= 0 {
        format!("in {amount}")
    } else {
        format!("{amount} ago")
    }
}

fn normalize_boss_name(boss: &str) -> Result<String, CliError> {
    let trimmed = boss.trim();
    if trimmed.is_empty() {
        Err(CliError::EmptyBossName)
    } else {
        Ok(trimmed.to_string())
    }
}

fn read_backup_input(input_path: Option<&Path>) -> Result<String, CliError> {
    if let Some(path) = input_path {
        return Ok(std::fs::read_to_string(path)?);
    }

    let stdin = io::stdin();
    if stdin.is_terminal() {
        return Err(CliError::EmptyBackupInput);
    }

    let mut buffer = String::new();
    stdin.lock().read_to_string(&mut buffer)?;
    if buffer.trim().is_empty() {
        Err(CliError::EmptyBackupInput)
    } else {
        Ok(buffer)
    }
}

fn load_tables(path: &Path) -> Result<Vec<BossTable>, CliError> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let raw = std::fs::read_to_string(path)?;
    serde_json::from_str(&raw).map_err(|error| CliError::InvalidStore(error.to_string()))
}

fn save_tables(path: &Path, tables: &[BossTable]) -> Result<(), CliError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    std::fs::write(path, serde_json::to_string_pretty(tables)?)?;
    Ok(())
}

fn resolve_store_path(cli_store_path: Option<PathBuf>) -> PathBuf {
    cli_store_path
        .or_else(|| env::var_os("BOSSTIMER_STORE").map(PathBuf::from))
        .unwrap_or_else(default_store_path)
}

fn default_store_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("bosstimer")
        .join("tables.json")
}
