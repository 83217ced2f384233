use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use exif_maker_notes::{config, exif, pipeline};

#[derive(Parser, Debug)]
#[command(
    name = "exif-mn",
    version,
    about = "Fix EXIF metadata gaps from vendor maker notes — timezone, lens identity, 35mm equivalents, and exposure compensation"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List all EXIF metadata for photos
    List {
        /// Photo files or directories
        #[arg(value_name = "PATH", required = true)]
        paths: Vec<PathBuf>,
    },

    /// Apply the maker-note fixes to photos
    Fix {
        /// Photo files or directories
        #[arg(value_name = "PATH", required = true)]
        paths: Vec<PathBuf>,

        /// Preview changes without writing to files
        #[arg(long)]
        dry_run: bool,

        /// Exposure-compensation record file (filename,value per line)
        #[arg(long, value_name = "FILE")]
        exposure: Option<PathBuf>,

        /// Require the exposure map and the batch to match one-to-one
        #[arg(long, requires = "exposure")]
        strict: bool,

        /// Path to config file (default: config.json next to binary)
        #[arg(short, long, value_name = "FILE")]
        config: Option<PathBuf>,
    },

    /// Restore photos from their _original backups
    Restore {
        /// Photo files or directories
        #[arg(value_name = "PATH", required = true)]
        paths: Vec<PathBuf>,
    },

    /// Show or edit configuration
    Config {
        /// Configuration key to get or set
        key: Option<String>,

        /// Value to set the key to
        value: Option<String>,

        /// Configuration file location (default: config.json next to binary)
        #[arg(short = 'f', long = "file", value_name = "FILE")]
        file: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .init();

    match cli.command {
        Command::List { paths } => run_list(&paths),
        Command::Fix {
            paths,
            dry_run,
            exposure,
            strict,
            config,
        } => run_fix(&paths, config.as_deref(), dry_run, exposure, strict),
        Command::Restore { paths } => run_restore(&paths),
        Command::Config { key, value, file } => run_config(key, value, file.as_deref()),
    }
}

fn run_list(paths: &[PathBuf]) -> Result<()> {
    let photos = pipeline::collect_photos(paths);
    if photos.is_empty() {
        anyhow::bail!("No supported photo files found in the specified paths.");
    }

    let records = exif::read_metadata(&photos)?;
    for (photo, record) in photos.iter().zip(&records) {
        log::info!("Metadata for {}:", photo.display());
        for (tag, value) in record.iter() {
            log::info!("  {tag}: {value}");
        }
    }

    Ok(())
}

fn run_fix(
    paths: &[PathBuf],
    config_path: Option<&std::path::Path>,
    dry_run: bool,
    exposure: Option<PathBuf>,
    strict: bool,
) -> Result<()> {
    let config = config::Config::load(config_path)?;

    let photos = pipeline::collect_photos(paths);
    if photos.is_empty() {
        anyhow::bail!("No supported photo files found in the specified paths.");
    }

    log::info!("Found {} photo(s) to process", photos.len());
    if dry_run {
        log::info!("DRY RUN — no files will be modified");
    }

    let options = pipeline::FixOptions {
        dry_run,
        exposure,
        strict,
    };
    let outcomes = pipeline::apply_fixes(&photos, &config, &options)?;

    let written = outcomes.iter().filter(|o| o.written).count();
    let pending = outcomes
        .iter()
        .filter(|o| !o.written && !o.patch.is_empty())
        .count();
    let skipped = outcomes.iter().filter(|o| o.skipped).count();
    let clean = outcomes.len() - written - pending - skipped;

    if dry_run {
        log::info!("Done: {pending} photo(s) would be fixed, {clean} clean, {skipped} already corrected");
    } else {
        log::info!("Done: {written} photo(s) fixed, {clean} clean, {skipped} already corrected");
    }

    Ok(())
}

fn run_restore(paths: &[PathBuf]) -> Result<()> {
    let photos = pipeline::collect_photos(paths);
    if photos.is_empty() {
        anyhow::bail!("No supported photo files found in the specified paths.");
    }

    let restored = pipeline::restore(&photos)?;
    log::info!("Done: {restored} photo(s) restored");
    Ok(())
}

fn run_config(
    key: Option<String>,
    value: Option<String>,
    file: Option<&std::path::Path>,
) -> Result<()> {
    let mut configuration = config::Config::load(file)?;

    match (key, value) {
        (None, _) => {
            for (k, v) in configuration.entries() {
                println!("{k} = {v}");
            }
        }
        (Some(key), None) => {
            println!("{}", configuration.get_key(&key)?);
        }
        (Some(key), Some(value)) => {
            configuration.set_key(&key, &value)?;
            configuration.save(file)?;
        }
    }

    Ok(())
}
