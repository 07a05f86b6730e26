//! pkgsplit CLI - decomposes stored-procedure package sources into
//! standalone, unit-qualified objects

#![deny(warnings)]

// Global invariants enforced:
// - Deterministic output ordering
// - Identical input yields byte-for-byte identical output

use anyhow::Context;
use clap::{Parser, Subcommand};
use pkgsplit_core::config;
use pkgsplit_core::{
    decompose_all_with_config, decompose_one_with_config, render_json, render_text,
};
use std::io::Read;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "pkgsplit")]
#[command(about = "Decompose stored-procedure packages into standalone objects")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Decompose package source and report the plan
    Decompose {
        /// Path to a source file, or `-` for stdin
        path: PathBuf,

        /// Decompose only the named unit (case-insensitive)
        #[arg(long)]
        unit: Option<String>,

        /// Output format
        #[arg(long, default_value = "text")]
        format: OutputFormat,

        /// Path to config file (default: auto-discover)
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Write each planned standalone object to its own file
    Split {
        /// Path to a source file, or `-` for stdin
        path: PathBuf,

        /// Directory to write the object files into
        #[arg(long, default_value = "pkgsplit_out")]
        out_dir: PathBuf,

        /// Report what would be written without writing anything
        #[arg(long)]
        dry_run: bool,

        /// Path to config file (default: auto-discover)
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Validate a configuration file
    #[command(name = "config")]
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Validate a config file without running a decomposition
    Validate {
        /// Path to config file (default: auto-discover from current directory)
        #[arg(long)]
        path: Option<PathBuf>,
    },
    /// Show the resolved configuration (merged defaults + config file)
    Show {
        /// Path to config file (default: auto-discover from current directory)
        #[arg(long)]
        path: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Decompose {
            path,
            unit,
            format,
            config: config_path,
        } => {
            let source = read_source(&path)?;
            let resolved = load_config(&path, config_path.as_deref())?;

            if let Some(ref p) = resolved.config_path {
                eprintln!("Using config: {}", p.display());
            }

            let results = match unit {
                Some(name) => {
                    let result = decompose_one_with_config(&source, &name, Some(&resolved));
                    let mut single = pkgsplit_core::IndexMap::new();
                    single.insert(result.unit_name.clone(), result);
                    single
                }
                None => decompose_all_with_config(&source, Some(&resolved)),
            };

            match format {
                OutputFormat::Text => print!("{}", render_text(&results)),
                OutputFormat::Json => println!("{}", render_json(&results)),
            }
        }
        Commands::Split {
            path,
            out_dir,
            dry_run,
            config: config_path,
        } => {
            let source = read_source(&path)?;
            let resolved = load_config(&path, config_path.as_deref())?;
            let results = decompose_all_with_config(&source, Some(&resolved));

            let mut written = 0usize;
            let mut stubs = 0usize;
            for result in results.values() {
                for (member, entry) in result.members.iter().zip(&result.decomposition_plan) {
                    let file_name = format!("{}.sql", entry.target_object_name.to_lowercase());
                    let target = out_dir.join(&file_name);
                    if entry.source_text.trim().is_empty() {
                        eprintln!(
                            "Warning: skipping {} (no source text captured)",
                            entry.target_object_name
                        );
                        continue;
                    }
                    if member.is_stub() {
                        stubs += 1;
                    }
                    if dry_run {
                        println!("Would write {}", target.display());
                    } else {
                        write_object_file(&target, &entry.source_text)?;
                        println!("Wrote {}", target.display());
                    }
                    written += 1;
                }
            }

            if dry_run {
                println!("Dry-run: would write {} object file(s)", written);
            } else {
                println!("Wrote {} object file(s)", written);
            }
            if stubs > 0 {
                println!(
                    "Note: {} object(s) were declared but never implemented; their files carry the declaration only",
                    stubs
                );
            }
        }
        Commands::Config { action } => match action {
            ConfigAction::Validate { path } => {
                let project_root = std::env::current_dir()?;
                match config::load_and_resolve(&project_root, path.as_deref()) {
                    Ok(resolved) => {
                        if let Some(ref p) = resolved.config_path {
                            println!("Config valid: {}", p.display());
                        } else {
                            println!("No config file found. Using defaults.");
                        }
                    }
                    Err(e) => {
                        eprintln!("Config validation failed: {:#}", e);
                        std::process::exit(1);
                    }
                }
            }
            ConfigAction::Show { path } => {
                let project_root = std::env::current_dir()?;
                let resolved = config::load_and_resolve(&project_root, path.as_deref())
                    .context("failed to load configuration")?;

                println!("Configuration:");
                if let Some(ref p) = resolved.config_path {
                    println!("  Source: {}", p.display());
                } else {
                    println!("  Source: defaults (no config file found)");
                }
                println!();
                println!("Unit filters:");
                println!(
                    "  include: {}",
                    if resolved.include.is_some() {
                        "custom patterns"
                    } else {
                        "all units"
                    }
                );
                println!(
                    "  exclude: {}",
                    if resolved.exclude.is_empty() {
                        "none".to_string()
                    } else {
                        format!("{} pattern(s)", resolved.exclude.len())
                    }
                );
                println!();
                println!("Scan limits:");
                println!("  forward_window: {}", resolved.limits.forward_window);
                println!("  return_window: {}", resolved.limits.return_window);
            }
        },
    }

    Ok(())
}

/// Read source text from a file, or from stdin when the path is `-`
fn read_source(path: &Path) -> anyhow::Result<String> {
    if path == Path::new("-") {
        let mut buffer = String::new();
        std::io::stdin()
            .read_to_string(&mut buffer)
            .context("failed to read source from stdin")?;
        return Ok(buffer);
    }
    if !path.exists() {
        anyhow::bail!("Path does not exist: {}", path.display());
    }
    std::fs::read_to_string(path)
        .with_context(|| format!("failed to read source file: {}", path.display()))
}

/// Load configuration relative to the source file's directory, falling
/// back to the current directory for stdin input
fn load_config(
    source_path: &Path,
    explicit: Option<&Path>,
) -> anyhow::Result<pkgsplit_core::ResolvedConfig> {
    let project_root = if source_path == Path::new("-") {
        std::env::current_dir()?
    } else {
        source_path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(|p| p.to_path_buf())
            .unwrap_or(std::env::current_dir()?)
    };
    config::load_and_resolve(&project_root, explicit).context("failed to load configuration")
}

/// Write one object file with the atomic temp + rename pattern
fn write_object_file(path: &Path, source_text: &str) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    let temp_path = path.with_extension("sql.tmp");
    let mut contents = String::with_capacity(source_text.len() + 1);
    contents.push_str(source_text);
    if !contents.ends_with('\n') {
        contents.push('\n');
    }
    std::fs::write(&temp_path, contents)
        .with_context(|| format!("Failed to write temporary file: {}", temp_path.display()))?;
    std::fs::rename(&temp_path, path)
        .with_context(|| format!("Failed to rename temporary file to: {}", path.display()))?;

    Ok(())
}
