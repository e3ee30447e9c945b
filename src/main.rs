//! Caseload CLI - normalize grant-application extracts
//!
//! # Main Commands
//!
//! ```bash
//! caseload normalize input.csv          # Normalize an extract to canonical CSV
//! caseload refresh                      # Regenerate the derived cache if stale
//! caseload manifest input.csv           # Show which canonical fields populate
//! ```
//!
//! # Debug Commands (for development)
//!
//! ```bash
//! caseload parse input.csv              # Just parse the raw table to JSON
//! caseload fields                       # Show canonical fields and their aliases
//! ```

use clap::{Parser, Subcommand};
use caseload::{
    cache, normalize_file, parser, report::{log_info, log_success, log_warning},
    CanonicalField, CanonicalSet, NormalizeOptions, ALIAS_TABLE,
};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "caseload")]
#[command(about = "Normalize grant-application spreadsheets into canonical records", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a raw extract and output its rows as JSON
    Parse {
        /// Input delimited file
        input: PathBuf,

        /// Delimiter (auto-detect if not specified)
        #[arg(short, long)]
        delimiter: Option<char>,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Normalize an extract into the canonical table
    Normalize {
        /// Input delimited file
        input: PathBuf,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Emit JSON records instead of canonical CSV
        #[arg(long)]
        json: bool,

        /// Year used for age computation (default: current year)
        #[arg(long)]
        reference_year: Option<i32>,
    },

    /// Regenerate the derived cache file when the raw input is newer
    Refresh {
        /// Raw input path (default: $CASELOAD_INPUT or data/raw/applications.csv)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Cache path (default: $CASELOAD_CACHE or data/processed/normalized.csv)
        #[arg(short, long)]
        cache: Option<PathBuf>,

        /// Rebuild even when the cache is fresh
        #[arg(short, long)]
        force: bool,

        /// Year used for age computation (default: current year)
        #[arg(long)]
        reference_year: Option<i32>,
    },

    /// Print the population manifest for an extract as JSON
    Manifest {
        /// Input delimited file
        input: PathBuf,

        /// Year used for age computation (default: current year)
        #[arg(long)]
        reference_year: Option<i32>,
    },

    /// List canonical fields and the raw-name aliases that supply them
    Fields,
}

fn main() {
    // Load .env file (if present)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Parse {
            input,
            delimiter,
            output,
        } => cmd_parse(&input, delimiter, output.as_deref()),

        Commands::Normalize {
            input,
            output,
            json,
            reference_year,
        } => cmd_normalize(&input, output.as_deref(), json, reference_year),

        Commands::Refresh {
            input,
            cache,
            force,
            reference_year,
        } => cmd_refresh(input, cache, force, reference_year),

        Commands::Manifest {
            input,
            reference_year,
        } => cmd_manifest(&input, reference_year),

        Commands::Fields => cmd_fields(),
    };

    if let Err(e) = result {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}

fn cmd_parse(
    input: &Path,
    delimiter: Option<char>,
    output: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    log_info(format!("Parsing: {}", input.display()));

    let table = match delimiter {
        Some(d) => {
            let bytes = fs::read(input)?;
            let encoding = parser::detect_encoding(&bytes);
            let content = parser::decode_content(&bytes, &encoding)?;
            parser::read_str(&content, d, encoding)?
        }
        None => parser::read_file(input)?,
    };

    log_info(format!("Encoding: {}", table.encoding));
    log_info(format!(
        "Delimiter: '{}'{}",
        format_delimiter(table.delimiter),
        if delimiter.is_none() { " (auto-detected)" } else { "" }
    ));
    log_info(format!("Columns: {}", table.headers.join(", ")));
    log_success(format!("Parsed {} rows", table.len()));

    let json = serde_json::to_string_pretty(&table.rows)?;
    write_output(&json, output)?;

    Ok(())
}

fn cmd_normalize(
    input: &Path,
    output: Option<&Path>,
    json: bool,
    reference_year: Option<i32>,
) -> Result<(), Box<dyn std::error::Error>> {
    log_info(format!("Normalizing: {}", input.display()));

    let options = NormalizeOptions { reference_year };
    let set = normalize_file(input, &options)?;

    report_manifest(&set);

    let payload = if json {
        serde_json::to_string_pretty(&set.records)?
    } else {
        cache::to_csv_string(&set)?
    };
    write_output(&payload, output)?;

    Ok(())
}

fn cmd_refresh(
    input: Option<PathBuf>,
    cache_path: Option<PathBuf>,
    force: bool,
    reference_year: Option<i32>,
) -> Result<(), Box<dyn std::error::Error>> {
    let input = input.unwrap_or_else(|| env_path("CASELOAD_INPUT", cache::DEFAULT_INPUT));
    let cache_path = cache_path.unwrap_or_else(|| env_path("CASELOAD_CACHE", cache::DEFAULT_CACHE));

    log_info(format!(
        "Refreshing cache: {} -> {}",
        input.display(),
        cache_path.display()
    ));

    let options = NormalizeOptions { reference_year };
    match cache::refresh(&input, &cache_path, &options, force)? {
        cache::RefreshOutcome::Fresh => {
            log_success("Cache is up to date; nothing written");
        }
        cache::RefreshOutcome::Rebuilt { rows, populated } => {
            log_success(format!(
                "Rebuilt cache: {} rows, {} of {} canonical fields populated",
                rows,
                populated,
                CanonicalField::ALL.len()
            ));
        }
    }

    Ok(())
}

fn cmd_manifest(
    input: &Path,
    reference_year: Option<i32>,
) -> Result<(), Box<dyn std::error::Error>> {
    let options = NormalizeOptions { reference_year };
    let set = normalize_file(input, &options)?;

    report_manifest(&set);

    let json = serde_json::to_string_pretty(&set.manifest)?;
    println!("{}", json);
    Ok(())
}

fn cmd_fields() -> Result<(), Box<dyn std::error::Error>> {
    println!("Canonical fields and accepted raw-name aliases:\n");
    for field in CanonicalField::ALL {
        match ALIAS_TABLE.iter().find(|(f, _)| *f == field) {
            Some((_, variants)) => {
                println!("  {:<22} <- {}", field.as_str(), variants.join(", "));
            }
            None => {
                println!("  {:<22} (derived)", field.as_str());
            }
        }
    }
    Ok(())
}

/// Summarize a run for stderr, flagging what a consumer should check.
fn report_manifest(set: &CanonicalSet) {
    log_success(format!("Normalized {} rows", set.len()));
    log_info(set.manifest.summary());

    let missing: Vec<&str> = CanonicalField::ALL
        .iter()
        .filter(|f| !set.manifest.is_populated(**f))
        .map(|f| f.as_str())
        .collect();
    if !missing.is_empty() {
        log_warning(format!("Absent canonical fields: {}", missing.join(", ")));
    }
    for (field, count) in &set.manifest.unparseable {
        log_warning(format!("{}: {} unparseable cells", field, count));
    }
}

fn format_delimiter(d: char) -> String {
    match d {
        '\t' => "\\t".to_string(),
        c => c.to_string(),
    }
}

fn env_path(var: &str, default: &str) -> PathBuf {
    std::env::var(var)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(default))
}

fn write_output(content: &str, path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    match path {
        Some(p) => {
            fs::write(p, content)?;
            log_success(format!("Output written to: {}", p.display()));
        }
        None => {
            println!("{}", content);
        }
    }
    Ok(())
}
