#![forbid(unsafe_code)]

mod dat;
mod ui;

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use dat::{CollisionPolicy, DatResult, ExtractConfig, ExtractReport, RepackConfig, RepackReport};

#[derive(Debug, Parser)]
#[command(name = "cedat", version, about = "Unpack and repack fingerprint-indexed .dat archives")]
struct Cli {
    /// Debug logging (RUST_LOG takes precedence).
    #[arg(short, long, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Interactive wizard for unpacking or repacking (terminal).
    Ui,

    /// Extract a .dat archive into a directory.
    Unpack {
        /// Input archive.
        archive: PathBuf,
        /// Output directory.
        output: PathBuf,
        /// Name list; learned names are appended to it.
        #[arg(default_value = dat::DEFAULT_NAME_LIST)]
        name_list: PathBuf,
        /// Which name wins when two names share a fingerprint.
        #[arg(long, value_enum, default_value_t = CollisionPolicy::OverwriteLast)]
        collisions: CollisionPolicy,
        /// Extension registered with a recovered name (repeatable, default EVO and DDS).
        #[arg(long = "companion", value_name = "EXT")]
        companions: Vec<String>,
    },

    /// Build a .dat archive from a directory.
    Repack {
        /// Input directory.
        input: PathBuf,
        /// Output archive.
        archive: PathBuf,
        /// Name list used to map relative paths back to fingerprints.
        #[arg(default_value = dat::DEFAULT_NAME_LIST)]
        name_list: PathBuf,
        #[arg(long, value_enum, default_value_t = CollisionPolicy::OverwriteLast)]
        collisions: CollisionPolicy,
    },

    /// List table entries with their known names.
    List {
        archive: PathBuf,
        #[arg(default_value = dat::DEFAULT_NAME_LIST)]
        name_list: PathBuf,
        #[arg(long, value_enum, default_value_t = CollisionPolicy::OverwriteLast)]
        collisions: CollisionPolicy,
    },

    /// Check that every blob lies inside the archive.
    Verify { archive: PathBuf },

    /// Print the fingerprints of names.
    Hash {
        #[arg(required = true)]
        names: Vec<String>,
    },

    /// Guess extensions of loose files the way unpack does.
    Sniff {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
}

fn init_logging(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "info" }));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Prints the unpack summary. Returns false if any entry failed.
pub(crate) fn print_extract(report: &ExtractReport) -> bool {
    println!(
        "unpacked {}/{} entries (known {}, learned {}, unknown {})",
        report.extracted(),
        report.entries,
        report.known,
        report.learned,
        report.unknown
    );
    for f in &report.failures {
        println!("  failed {} ({}): {}", f.fingerprint, dat::hex(f.fingerprint), f.error);
    }
    report.failures.is_empty()
}

/// Prints the repack summary. Returns false if any file was skipped.
pub(crate) fn print_repack(report: &RepackReport, archive: &Path) -> bool {
    println!(
        "packed {} files into {} ({} bytes)",
        report.packed,
        archive.display(),
        report.bytes
    );
    for s in &report.skipped {
        println!("  skipped {}: {}", s.path, s.reason);
    }
    report.skipped.is_empty()
}

fn list(archive: &Path, name_list: &Path, collisions: CollisionPolicy) -> DatResult<bool> {
    let catalog = dat::NameCatalog::load(name_list, collisions)?;
    let entries = dat::entries(archive, &catalog)?;
    for e in &entries {
        println!(
            "{} {:>10} off={} len={} {}",
            dat::hex(e.fingerprint),
            e.fingerprint,
            e.offset,
            e.size,
            e.name.as_deref().unwrap_or("?")
        );
    }
    let known = entries.iter().filter(|e| e.name.is_some()).count();
    println!(
        "{} entries, {known} named ({} names listed, {} fingerprints, {} collisions)",
        entries.len(),
        catalog.loaded(),
        catalog.len(),
        catalog.collisions().len()
    );
    for c in catalog.collisions() {
        println!(
            "  collision {} line {}: kept {}, dropped {}",
            dat::hex(c.fingerprint),
            c.line,
            c.kept,
            c.dropped
        );
    }
    Ok(true)
}

fn sniff(files: &[PathBuf]) -> DatResult<bool> {
    for f in files {
        let data = std::fs::read(f)?;
        let s = dat::classify(&data);
        match s.recovered_name {
            Some(name) => println!("{}: {} (name {name})", f.display(), s.extension),
            None => println!("{}: {}", f.display(), s.extension),
        }
    }
    Ok(true)
}

fn run(cmd: Command) -> DatResult<bool> {
    match cmd {
        Command::Ui => ui::run(),
        Command::Unpack {
            archive,
            output,
            name_list,
            collisions,
            companions,
        } => {
            let mut cfg = ExtractConfig::new(archive, output);
            cfg.name_list = Some(name_list);
            cfg.collisions = collisions;
            if !companions.is_empty() {
                cfg.companions = companions;
            }
            Ok(print_extract(&dat::extract(&cfg)?))
        }
        Command::Repack {
            input,
            archive,
            name_list,
            collisions,
        } => {
            let mut cfg = RepackConfig::new(input, archive);
            cfg.name_list = Some(name_list);
            cfg.collisions = collisions;
            Ok(print_repack(&dat::repack(&cfg)?, &cfg.output))
        }
        Command::List {
            archive,
            name_list,
            collisions,
        } => list(&archive, &name_list, collisions),
        Command::Verify { archive } => {
            let report = dat::verify(&archive)?;
            println!("ok: {} entries, {} bytes", report.entries, report.file_len);
            Ok(true)
        }
        Command::Hash { names } => {
            for name in &names {
                let (lo, up) = dat::case_pair(name);
                println!("{name}: lower {lo} ({}) upper {up} ({})", dat::hex(lo), dat::hex(up));
            }
            Ok(true)
        }
        Command::Sniff { files } => sniff(&files),
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli.cmd) {
        Ok(true) => {}
        Ok(false) => std::process::exit(2),
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(1);
        }
    }
}
