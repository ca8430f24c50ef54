#![forbid(unsafe_code)]

use std::collections::{HashMap, HashSet};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read, Seek};
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::dat::build::{write_archive, BlobSource, PendingEntry};
use crate::dat::catalog::{CollisionPolicy, NameCatalog, ReverseIndex};
use crate::dat::config::{ExtractConfig, RepackConfig};
use crate::dat::error::{DatError, DatResult};
use crate::dat::format::{table_len, Entry, EntryInfo};
use crate::dat::path::{fingerprint_from_stem, has_extension, normalize_rel_path, sanitize};
use crate::dat::read::{read_blob, read_table};
use crate::dat::sniff::classify;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Naming {
    /// Name came from the catalog.
    Known,
    /// Name was recovered from the blob, added to the catalog and hashes to
    /// the entry's fingerprint.
    Learned,
    /// Saved under the literal fingerprint plus a sniffed extension.
    Unknown,
}

#[derive(Debug, Clone)]
pub struct EntryFailure {
    pub fingerprint: u32,
    pub error: String,
}

#[derive(Debug, Clone, Default)]
pub struct ExtractReport {
    /// Unique entries in the table.
    pub entries: usize,
    pub known: usize,
    pub learned: usize,
    pub unknown: usize,
    pub failures: Vec<EntryFailure>,
}

impl ExtractReport {
    pub fn extracted(&self) -> usize {
        self.known + self.learned + self.unknown
    }
}

#[derive(Debug, Clone)]
pub struct SkippedFile {
    pub path: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default)]
pub struct RepackReport {
    pub packed: usize,
    pub bytes: u64,
    pub skipped: Vec<SkippedFile>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerifyReport {
    pub entries: usize,
    pub file_len: u64,
}

fn open_catalog(name_list: Option<&Path>, policy: CollisionPolicy) -> DatResult<NameCatalog> {
    match name_list {
        Some(p) => NameCatalog::load(p, policy),
        None => Ok(NameCatalog::empty(policy)),
    }
}

fn open_archive(archive: &Path) -> DatResult<BufReader<File>> {
    if !archive.is_file() {
        return Err(DatError::MissingInput(archive.to_path_buf()));
    }
    Ok(BufReader::new(File::open(archive)?))
}

/// Unpacks every table entry into `cfg.output`.
///
/// Entries that cannot be read or written are reported and skipped.
pub fn extract(cfg: &ExtractConfig) -> DatResult<ExtractReport> {
    let mut f = open_archive(&cfg.archive)?;
    let mut catalog = open_catalog(cfg.name_list.as_deref(), cfg.collisions)?;

    let entries = read_table(&mut f)?;
    if catalog.is_empty() {
        warn!("catalog is empty, every blob will be named by sniffing");
    }
    fs::create_dir_all(&cfg.output)?;
    info!(
        entries = entries.len(),
        "unpacking {} => {}",
        cfg.archive.display(),
        cfg.output.display()
    );

    let mut report = ExtractReport {
        entries: entries.len(),
        ..ExtractReport::default()
    };
    let mut written: HashSet<PathBuf> = HashSet::new();

    for e in &entries {
        match extract_entry(&mut f, e, &mut catalog, cfg) {
            Ok((rel, naming)) => {
                if !written.insert(rel.clone()) {
                    warn!(fingerprint = e.fingerprint, "{} was written twice", rel.display());
                }
                match naming {
                    Naming::Known => report.known += 1,
                    Naming::Learned => report.learned += 1,
                    Naming::Unknown => report.unknown += 1,
                }
            }
            Err(err) => {
                warn!(fingerprint = e.fingerprint, "failed to extract entry: {err}");
                report.failures.push(EntryFailure {
                    fingerprint: e.fingerprint,
                    error: err.to_string(),
                });
            }
        }
    }

    info!(
        extracted = report.extracted(),
        learned = report.learned,
        failed = report.failures.len(),
        "unpack finished"
    );
    Ok(report)
}

fn extract_entry<R: Read + Seek>(
    f: &mut R,
    e: &Entry,
    catalog: &mut NameCatalog,
    cfg: &ExtractConfig,
) -> DatResult<(PathBuf, Naming)> {
    let data = read_blob(f, e)?;
    let fp = e.fingerprint;

    let known = catalog
        .resolve(fp)
        .filter(|n| has_extension(n))
        .and_then(sanitize);

    let (rel, naming) = match known {
        Some(rel) => (rel, Naming::Known),
        None => {
            let sniff = classify(&data);
            let learned = sniff
                .recovered_name
                .and_then(|name| learn_name(catalog, fp, &name, &cfg.companions));
            match learned {
                Some(rel) => (rel, Naming::Learned),
                None => (
                    PathBuf::from(format!("{fp}.{}", sniff.extension)),
                    Naming::Unknown,
                ),
            }
        }
    };

    let out_path = cfg.output.join(&rel);
    if let Some(parent) = out_path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&out_path, &data)?;
    debug!(fingerprint = fp, size = e.size, "extracted {}", rel.display());

    Ok((rel, naming))
}

/// Records a recovered name and returns the path to save the blob under, if
/// the name hashes to `fp`. Otherwise the blob keeps its fingerprint name so
/// repacking restores the same fingerprint.
fn learn_name(
    catalog: &mut NameCatalog,
    fp: u32,
    name: &str,
    companions: &[String],
) -> Option<PathBuf> {
    if sanitize(name).is_none() {
        info!(fingerprint = fp, "recovered internal name {name:?} is not a usable path");
        return None;
    }
    let line = match catalog.learn(fp, name, companions) {
        Ok(line) => line,
        Err(err) => {
            warn!(fingerprint = fp, "could not record learned name {name}: {err}");
            NameCatalog::line_for(fp, name, companions)
        }
    };
    match line.as_deref().and_then(sanitize) {
        Some(rel) => {
            info!(fingerprint = fp, "recovered internal name {name}");
            Some(rel)
        }
        None => {
            info!(
                fingerprint = fp,
                "recovered internal name {name} does not hash to this entry, keeping the fingerprint name"
            );
            None
        }
    }
}

fn file_fingerprint(index: &ReverseIndex, rel: &str) -> DatResult<u32> {
    if let Some(fp) = index.pack_fingerprint(rel) {
        if index.cataloged_fingerprint(rel).is_some_and(|c| c != fp) {
            debug!(fingerprint = fp, "{rel} is listed in upper case, packing the lower-case hash");
        }
        return Ok(fp);
    }
    fingerprint_from_stem(rel)
}

/// Packs every file under `cfg.input` into `cfg.output`.
///
/// Files that are neither listed in the catalog nor named after a literal
/// fingerprint are skipped and reported.
pub fn repack(cfg: &RepackConfig) -> DatResult<RepackReport> {
    if !cfg.input.is_dir() {
        return Err(DatError::MissingInput(cfg.input.clone()));
    }
    let catalog = open_catalog(cfg.name_list.as_deref(), cfg.collisions)?;
    let index = catalog.reverse_index();
    if index.is_empty() {
        warn!("catalog is empty, only fingerprint-named files can be packed");
    } else {
        debug!(names = index.len(), "reverse index built");
    }

    let mut report = RepackReport::default();
    let mut pending: Vec<PendingEntry> = Vec::new();

    for ent in WalkDir::new(&cfg.input).follow_links(false).sort_by_file_name() {
        let ent = ent.map_err(|e| {
            let msg = e.to_string();
            let io = e
                .into_io_error()
                .unwrap_or_else(|| std::io::Error::new(std::io::ErrorKind::Other, msg));
            DatError::Io(io)
        })?;

        if !ent.file_type().is_file() {
            continue;
        }

        let rel = normalize_rel_path(&cfg.input, ent.path())?;
        let sized = file_fingerprint(&index, &rel).and_then(|fp| {
            let len = ent.metadata().map_err(|e| DatError::Invalid(e.to_string()))?.len();
            let size = u32::try_from(len)
                .map_err(|_| DatError::Invalid(format!("{rel} is larger than 4 GiB")))?;
            Ok((fp, size))
        });

        match sized {
            Ok((fingerprint, size)) => pending.push(PendingEntry {
                fingerprint,
                size,
                source: BlobSource::File(ent.path().to_path_buf()),
            }),
            Err(err) => {
                warn!("skipping {rel}: {err}");
                report.skipped.push(SkippedFile {
                    path: rel,
                    reason: err.to_string(),
                });
            }
        }
    }

    let mut seen: HashMap<u32, usize> = HashMap::new();
    for p in &pending {
        *seen.entry(p.fingerprint).or_default() += 1;
    }
    for (fp, n) in seen.into_iter().filter(|(_, n)| *n > 1) {
        warn!(fingerprint = fp, "{n} files share one fingerprint; readers keep only the first");
    }

    info!(
        files = pending.len(),
        "repacking {} => {}",
        cfg.input.display(),
        cfg.output.display()
    );

    if let Some(parent) = cfg.output.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let mut out = BufWriter::new(File::create(&cfg.output)?);
    let entries = write_archive(&mut out, &pending)?;

    report.packed = entries.len();
    report.bytes = entries.last().map_or(table_len(0), Entry::end);
    info!(
        packed = report.packed,
        skipped = report.skipped.len(),
        "wrote {}",
        cfg.output.display()
    );
    Ok(report)
}

/// Reads the table (without extracting blobs) and resolves names.
pub fn entries(archive: &Path, catalog: &NameCatalog) -> DatResult<Vec<EntryInfo>> {
    let mut f = open_archive(archive)?;
    let entries = read_table(&mut f)?;
    Ok(entries
        .into_iter()
        .map(|e| EntryInfo {
            fingerprint: e.fingerprint,
            offset: e.offset,
            size: e.size,
            name: catalog.resolve(e.fingerprint).map(str::to_string),
        })
        .collect())
}

/// Checks that every blob lies after the table and inside the file.
pub fn verify(archive: &Path) -> DatResult<VerifyReport> {
    let mut f = open_archive(archive)?;
    let file_len = f.get_ref().metadata()?.len();
    let entries = read_table(&mut f)?;
    let table_end = table_len(entries.len());

    for e in &entries {
        if u64::from(e.offset) < table_end && e.size > 0 {
            return Err(DatError::Invalid(format!(
                "blob {} at {} overlaps the table",
                e.fingerprint, e.offset
            )));
        }
        if e.end() > file_len {
            return Err(DatError::Invalid(format!(
                "blob {} ends at {} past end of file ({file_len})",
                e.fingerprint,
                e.end()
            )));
        }
    }

    Ok(VerifyReport {
        entries: entries.len(),
        file_len,
    })
}
