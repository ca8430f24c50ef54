#![forbid(unsafe_code)]

use crate::dat::{self, CollisionPolicy, DatError, DatResult, ExtractConfig, RepackConfig};
use inquire::{Confirm, InquireError, Select, Text};
use std::path::{Path, PathBuf};

const UNPACK: &str = "Unpack a .dat archive";
const REPACK: &str = "Repack a directory";

fn prompt_err(e: InquireError) -> DatError {
    DatError::Io(std::io::Error::new(std::io::ErrorKind::Other, e))
}

fn ensure_dat_ext(p: &Path) -> PathBuf {
    if p.extension().and_then(|e| e.to_str()).unwrap_or("") == "dat" {
        return p.to_path_buf();
    }
    let mut s = p.to_string_lossy().to_string();
    if !s.ends_with('.') {
        s.push('.');
    }
    s.push_str("dat");
    PathBuf::from(s)
}

fn split_exts(s: &str) -> Vec<String> {
    s.split(',')
        .map(|x| x.trim().trim_start_matches('.'))
        .filter(|x| !x.is_empty())
        .map(|x| x.to_string())
        .collect()
}

fn ask_collisions() -> DatResult<CollisionPolicy> {
    let choice = Select::new(
        "When two names share a fingerprint",
        vec!["keep the last name", "keep the first name"],
    )
    .prompt()
    .map_err(prompt_err)?;
    Ok(if choice == "keep the first name" {
        CollisionPolicy::KeepFirst
    } else {
        CollisionPolicy::OverwriteLast
    })
}

fn ask_name_list() -> DatResult<PathBuf> {
    Text::new("Name list")
        .with_default(dat::DEFAULT_NAME_LIST)
        .prompt()
        .map(PathBuf::from)
        .map_err(prompt_err)
}

fn confirm() -> DatResult<bool> {
    Confirm::new("Proceed?")
        .with_default(true)
        .prompt()
        .map_err(prompt_err)
}

fn unpack_wizard() -> DatResult<bool> {
    let archive = Text::new("Input .dat archive")
        .with_default("./mission01.dat")
        .prompt()
        .map(PathBuf::from)
        .map_err(prompt_err)?;

    let default_out = archive.with_extension("");
    let output = Text::new("Output directory")
        .with_default(&default_out.to_string_lossy())
        .prompt()
        .map(PathBuf::from)
        .map_err(prompt_err)?;

    let name_list = ask_name_list()?;
    let collisions = ask_collisions()?;

    let companions_raw = Text::new("Companion extensions for recovered names (comma-separated)")
        .with_default(&dat::default_companions().join(","))
        .prompt()
        .map_err(prompt_err)?;
    let companions = split_exts(&companions_raw);

    println!("\nUnpack summary:");
    println!("  archive   : {}", archive.display());
    println!("  output    : {}", output.display());
    println!("  name list : {}", name_list.display());
    println!("  collisions: {collisions:?}");
    println!(
        "  companions: {}",
        if companions.is_empty() { "<none>".to_string() } else { companions.join(", ") }
    );

    if !confirm()? {
        return Ok(true);
    }

    let cfg = ExtractConfig {
        archive,
        output,
        name_list: Some(name_list),
        collisions,
        companions,
    };
    Ok(crate::print_extract(&dat::extract(&cfg)?))
}

fn repack_wizard() -> DatResult<bool> {
    let input = Text::new("Input directory")
        .with_default("./mission01")
        .prompt()
        .map(PathBuf::from)
        .map_err(prompt_err)?;

    let output_raw = Text::new("Output .dat file")
        .with_default("./modified/mission01.dat")
        .prompt()
        .map_err(prompt_err)?;
    let output = ensure_dat_ext(Path::new(&output_raw));

    let name_list = ask_name_list()?;
    let collisions = ask_collisions()?;

    println!("\nRepack summary:");
    println!("  input     : {}", input.display());
    println!("  output    : {}", output.display());
    println!("  name list : {}", name_list.display());
    println!("  collisions: {collisions:?}");

    if !confirm()? {
        return Ok(true);
    }

    let cfg = RepackConfig {
        input,
        output,
        name_list: Some(name_list),
        collisions,
    };
    Ok(crate::print_repack(&dat::repack(&cfg)?, &cfg.output))
}

pub fn run() -> DatResult<bool> {
    println!("CEDAT Wizard\n");

    let op = Select::new("Operation", vec![UNPACK, REPACK])
        .prompt()
        .map_err(prompt_err)?;

    if op == UNPACK {
        unpack_wizard()
    } else {
        repack_wizard()
    }
}
