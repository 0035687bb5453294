use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use synclattes_core::{AppConfig, Database, ExitCode, GroupFilter, RevisionId, RevisionStore, SyncError};
use synclattes_dedup::{
    scan_pending_groups, DedupError, DedupReport, Deduplicator, Reassigner, ScanOptions,
    ScoreElection,
};

// ─── CLI Definition ─────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name = "synclattes",
    about = "Duplicate reconciliation for productions harvested from Lattes CVs",
    version,
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output in JSON format. Also enabled by setting SYNCLATTES_JSON=1.
    #[arg(long, global = true)]
    json: bool,

    /// Config file to use instead of the default location.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Write the default config file and create the database.
    Init,

    /// Detect duplicates among pending revisions and re-elect group mains.
    Dedup {
        /// Skip re-election.
        #[arg(long, conflicts_with = "reelect_only")]
        detect_only: bool,
        /// Skip detection.
        #[arg(long)]
        reelect_only: bool,
    },

    /// List stored duplicate groups.
    Scan {
        /// Include mains nothing points at.
        #[arg(long)]
        include_single: bool,
        /// Include mains removed at the source.
        #[arg(long)]
        include_removed: bool,
        /// Include groups that are fully synchronized.
        #[arg(long)]
        include_synced: bool,
        /// Only groups whose main id is greater than this.
        #[arg(long)]
        after: Option<RevisionId>,
        #[arg(long)]
        batch_size: Option<usize>,
    },

    /// Show the stored group a revision belongs to.
    Group { revision: RevisionId },

    /// Verify that no duplicate pointer targets another duplicate.
    Check,

    /// Make MAIN the main revision of a group.
    Reassign {
        #[arg(long)]
        main: RevisionId,
        /// Group members, MAIN included.
        #[arg(required = true)]
        members: Vec<RevisionId>,
    },

    /// Config management.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration.
    Show,
    /// Print the config file location.
    Path,
}

// ─── Main ────────────────────────────────────────────────────────────────────

fn main() {
    let start = Instant::now();
    let cli = Cli::parse();
    let json_output = cli.json || std::env::var("SYNCLATTES_JSON").as_deref() == Ok("1");

    if let Err(err) = run(cli, json_output, start) {
        let code = exit_code(&err);
        let printed = json_output
            && print_json(&serde_json::json!({
                "status": "error",
                "error": format!("{code:?}"),
                "message": format!("{err:#}"),
                "meta": { "duration_ms": start.elapsed().as_millis() }
            }))
            .is_ok();
        if !printed {
            eprintln!("error: {err:#}");
        }
        std::process::exit(code as i32);
    }
}

fn run(cli: Cli, json_output: bool, start: Instant) -> Result<()> {
    let config_path = cli.config.clone().unwrap_or_else(AppConfig::config_path);
    let config = AppConfig::load_from(&config_path)
        .with_context(|| format!("loading {}", config_path.display()))?;
    init_tracing(&config);
    tracing::debug!(config = %config_path.display(), "configuration loaded");

    match cli.command {
        // ── Init ───────────────────────────────────────────────────────────
        Commands::Init => {
            let created = !config_path.exists();
            if created {
                config.save_to(&config_path)?;
            }
            let db = open_db(&config)?;
            let versions = db.schema_versions()?;
            let dur = start.elapsed().as_millis();

            if json_output {
                print_json(&serde_json::json!({
                    "status": "ok",
                    "data": {
                        "config": config_path,
                        "config_created": created,
                        "database": config.database_path(),
                        "schema_versions": versions,
                    },
                    "meta": { "duration_ms": dur }
                }))?;
            } else {
                let state = if created { "created" } else { "exists" };
                println!("Config:   {} ({state})", config_path.display());
                println!("Database: {} (schema {versions:?})", config.database_path().display());
            }
        }

        // ── Dedup ──────────────────────────────────────────────────────────
        Commands::Dedup {
            detect_only,
            reelect_only,
        } => {
            let db = open_db(&config)?;
            let policy = ScoreElection::new(config.election.clone());
            let dedup = Deduplicator::new(&db, config.dedup.clone(), policy);

            let report = if detect_only {
                dedup.detect()?
            } else if reelect_only {
                dedup.reelect()?
            } else {
                dedup.run()?
            };
            let dur = start.elapsed().as_millis();

            if json_output {
                print_json(&serde_json::json!({
                    "status": "ok",
                    "data": report,
                    "meta": { "duration_ms": dur }
                }))?;
            } else {
                print_report(&report);
            }
        }

        // ── Scan ───────────────────────────────────────────────────────────
        Commands::Scan {
            include_single,
            include_removed,
            include_synced,
            after,
            batch_size,
        } => {
            let db = open_db(&config)?;
            let options = ScanOptions {
                filter: GroupFilter {
                    exclude_deleted_meta: !include_removed,
                    exclude_single_revisions: !include_single,
                    only_pending_sync: !include_synced,
                },
                batch_size: batch_size.unwrap_or(config.dedup.batch_size),
                start_after: after,
            };

            let mut groups = Vec::new();
            let mut scanner = scan_pending_groups(&db, options);
            while let Some(group) = scanner.next() {
                match group {
                    Ok(group) => groups.push(group),
                    Err(e) => {
                        let resume = scanner
                            .last_main_id()
                            .map_or_else(String::new, |id| format!(" (resume with --after {id})"));
                        return Err(anyhow::Error::new(e).context(format!("scan interrupted{resume}")));
                    }
                }
            }
            let dur = start.elapsed().as_millis();

            if json_output {
                let items: Vec<_> = groups
                    .iter()
                    .map(|g| {
                        serde_json::json!({
                            "main": g.main.id,
                            "members": g.ids(),
                            "title": g.main.meta.as_ref().and_then(|m| m.title()),
                        })
                    })
                    .collect();
                print_json(&serde_json::json!({
                    "status": "ok",
                    "data": { "items": items, "total": groups.len() },
                    "meta": { "duration_ms": dur }
                }))?;
            } else if groups.is_empty() {
                println!("No duplicate groups.");
            } else {
                for group in &groups {
                    let title = group
                        .main
                        .meta
                        .as_ref()
                        .and_then(|m| m.title())
                        .unwrap_or("(removed)");
                    let others: Vec<String> = group.others.iter().map(|r| r.id.to_string()).collect();
                    println!("{:>8}  {:<50}  <- {}", group.main.id, truncate(title, 50), others.join(", "));
                }
                println!("{} group(s)", groups.len());
            }
        }

        // ── Group ──────────────────────────────────────────────────────────
        Commands::Group { revision } => {
            let db = open_db(&config)?;
            let members = db.fetch_group_of(revision)?;
            if members.is_empty() {
                return Err(SyncError::RevisionNotFound(revision).into());
            }
            let dur = start.elapsed().as_millis();

            if json_output {
                print_json(&serde_json::json!({
                    "status": "ok",
                    "data": { "items": members },
                    "meta": { "duration_ms": dur }
                }))?;
            } else {
                for member in &members {
                    let marker = if member.is_main_candidate() { "*" } else { " " };
                    let title = member.meta.as_ref().and_then(|m| m.title()).unwrap_or("(removed)");
                    println!("{marker}{:>8}  item {:<8}  {}", member.id, member.item_id, title);
                }
            }
        }

        // ── Check ──────────────────────────────────────────────────────────
        Commands::Check => {
            let db = open_db(&config)?;
            Reassigner::new(&db).check_group_integrity()?;
            let dur = start.elapsed().as_millis();

            if json_output {
                print_json(&serde_json::json!({
                    "status": "ok",
                    "data": { "chained_pointers": 0 },
                    "meta": { "duration_ms": dur }
                }))?;
            } else {
                println!("Duplicate pointers are consistent ✓");
            }
        }

        // ── Reassign ───────────────────────────────────────────────────────
        Commands::Reassign { main, members } => {
            let db = open_db(&config)?;
            Reassigner::new(&db).reassign(&members, main)?;
            let dur = start.elapsed().as_millis();

            if json_output {
                print_json(&serde_json::json!({
                    "status": "ok",
                    "data": { "main": main, "members": members },
                    "meta": { "duration_ms": dur }
                }))?;
            } else {
                println!("Revision {main} is now the main of {} revision(s)", members.len());
            }
        }

        // ── Config ─────────────────────────────────────────────────────────
        Commands::Config { action } => match action {
            ConfigAction::Show => {
                if json_output {
                    print_json(&serde_json::json!({ "status": "ok", "data": config }))?;
                } else {
                    print!("{}", config.to_toml_string()?);
                }
            }
            ConfigAction::Path => {
                if json_output {
                    print_json(&serde_json::json!({ "status": "ok", "data": { "path": config_path } }))?;
                } else {
                    println!("{}", config_path.display());
                }
            }
        },
    }

    Ok(())
}

// ─── Helpers ────────────────────────────────────────────────────────────────

/// `RUST_LOG` wins over the `[logging] filter` setting.
fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn exit_code(err: &anyhow::Error) -> ExitCode {
    if let Some(e) = err.downcast_ref::<DedupError>() {
        e.exit_code()
    } else if let Some(e) = err.downcast_ref::<SyncError>() {
        e.exit_code()
    } else {
        ExitCode::GeneralError
    }
}

fn print_json(val: &serde_json::Value) -> Result<()> {
    write_json(&mut std::io::stdout().lock(), val)
}

/// Unlike `println!`, reports a closed or failing writer instead of panicking.
fn write_json(out: &mut impl Write, val: &serde_json::Value) -> Result<()> {
    writeln!(out, "{}", serde_json::to_string_pretty(val)?)?;
    out.flush()?;
    Ok(())
}

fn print_report(report: &DedupReport) {
    println!("Deduplication finished:");
    println!("  Revisions examined: {}", report.revisions_examined);
    println!("  Groups formed:      {}", report.groups_formed);
    println!("  Groups scanned:     {}", report.groups_scanned);
    println!("  Groups re-elected:  {}", report.groups_reelected);
    println!("  Reassignments:      {}", report.reassignments);
}

fn open_db(config: &AppConfig) -> Result<Database> {
    let db_path = config.database_path();
    ensure_parent(&db_path)?;
    Ok(Database::open(&db_path)?)
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    Ok(())
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let cut: String = text.chars().take(max.saturating_sub(1)).collect();
        format!("{cut}…")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct ClosedPipe;

    impl Write for ClosedPipe {
        fn write(&mut self, _: &[u8]) -> std::io::Result<usize> {
            Err(std::io::ErrorKind::BrokenPipe.into())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn json_write_failure_is_returned() {
        let val = serde_json::json!({ "status": "error" });
        assert!(write_json(&mut ClosedPipe, &val).is_err());

        let mut buf = Vec::new();
        write_json(&mut buf, &val).unwrap();
        let back: serde_json::Value = serde_json::from_slice(&buf).unwrap();
        assert_eq!(back, val);
    }

    #[test]
    fn exit_code_follows_the_library_error() {
        let err = anyhow::Error::new(DedupError::ConsistencyViolation { count: 2 });
        assert_eq!(exit_code(&err), ExitCode::Conflict);

        let err = anyhow::Error::new(SyncError::RevisionNotFound(9)).context("group");
        assert_eq!(exit_code(&err), ExitCode::NotFound);

        assert_eq!(exit_code(&anyhow::anyhow!("other")), ExitCode::GeneralError);
    }
}
