#![forbid(unsafe_code)]

//! Fingerprint to name catalog, backed by a plain text name list.
//!
//! Every listed name is registered under two fingerprints, the hash of its
//! lower-cased and of its upper-cased form. Names learned at runtime are
//! appended to the list so the next load finds them without sniffing.

use std::collections::{HashMap, HashSet};
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::dat::error::DatResult;
use crate::dat::hash::{case_pair, fingerprint};
use crate::dat::path::path_key;

/// What happens when two different names land on the same fingerprint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum CollisionPolicy {
    /// The later name replaces the earlier one.
    #[default]
    OverwriteLast,
    /// The earlier name stays; the later one is dropped.
    KeepFirst,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Collision {
    pub fingerprint: u32,
    pub kept: String,
    pub dropped: String,
    /// 1-based line in the name list.
    pub line: usize,
}

#[derive(Debug, Default)]
pub struct NameCatalog {
    names: HashMap<u32, String>,
    collisions: Vec<Collision>,
    policy: CollisionPolicy,
    backing: Option<PathBuf>,
    listed: HashSet<String>,
    loaded: usize,
    /// Last line number seen in the list, blank lines included.
    lines: usize,
    /// The list does not end with a newline.
    unterminated: bool,
}

impl NameCatalog {
    pub fn empty(policy: CollisionPolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    /// Loads the name list at `path`. A missing file yields an empty catalog
    /// that still appends learned names to `path`.
    pub fn load(path: &Path, policy: CollisionPolicy) -> DatResult<Self> {
        let mut cat = Self::empty(policy);
        cat.backing = Some(path.to_path_buf());

        let bytes = match fs::read(path) {
            Ok(b) => b,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                warn!("name list {} not found, starting with an empty catalog", path.display());
                return Ok(cat);
            }
            Err(e) => return Err(e.into()),
        };

        let text = String::from_utf8_lossy(&bytes);
        cat.unterminated = !text.is_empty() && !text.ends_with('\n');
        cat.extend_lines(text.lines().enumerate().map(|(i, l)| (i + 1, l)));

        info!(
            names = cat.loaded,
            collisions = cat.collisions.len(),
            "loaded name list {}",
            path.display()
        );
        Ok(cat)
    }

    /// Builds a catalog from in-memory names, without a backing file.
    #[cfg(test)]
    pub fn from_names<'a, I>(names: I, policy: CollisionPolicy) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut cat = Self::empty(policy);
        cat.extend_lines(names.into_iter().enumerate().map(|(i, l)| (i + 1, l)));
        cat
    }

    fn extend_lines<'a>(&mut self, lines: impl Iterator<Item = (usize, &'a str)>) {
        for (line, raw) in lines {
            self.lines = line;
            let name = raw.trim();
            if !name.is_empty() {
                self.register(line, name);
            }
        }
    }

    fn register(&mut self, line: usize, name: &str) {
        let (lo, up) = case_pair(name);
        self.insert(lo, name, line);
        self.insert(up, name, line);
        self.listed.insert(name.to_string());
        self.loaded += 1;
    }

    fn insert(&mut self, fp: u32, name: &str, line: usize) {
        let Some(existing) = self.names.get(&fp).cloned() else {
            self.names.insert(fp, name.to_string());
            return;
        };
        if existing == name {
            return;
        }

        let collision = match self.policy {
            CollisionPolicy::OverwriteLast => {
                self.names.insert(fp, name.to_string());
                Collision {
                    fingerprint: fp,
                    kept: name.to_string(),
                    dropped: existing,
                    line,
                }
            }
            CollisionPolicy::KeepFirst => Collision {
                fingerprint: fp,
                kept: existing,
                dropped: name.to_string(),
                line,
            },
        };
        warn!(
            line,
            fingerprint = fp,
            "name collision: {} <-> {}",
            collision.kept,
            collision.dropped
        );
        self.collisions.push(collision);
    }

    pub fn resolve(&self, fp: u32) -> Option<&str> {
        self.names.get(&fp).map(String::as_str)
    }

    /// Non-blank names read from the list.
    pub fn loaded(&self) -> usize {
        self.loaded
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn collisions(&self) -> &[Collision] {
        &self.collisions
    }

    /// Inverts the mapping. Names that lost a collision are absent.
    pub fn reverse_index(&self) -> ReverseIndex {
        let mut by_key = HashMap::with_capacity(self.names.len());
        for (&fp, name) in &self.names {
            by_key
                .entry(path_key(name))
                .or_insert_with(|| ReverseEntry {
                    name: name.clone(),
                    fingerprint: fp,
                });
        }
        ReverseIndex { by_key }
    }

    /// The `name.EXT` line that `fp` is a fingerprint of, in either case.
    pub fn line_for(fp: u32, name: &str, companions: &[String]) -> Option<String> {
        companions
            .iter()
            .map(|ext| format!("{name}.{ext}"))
            .find(|line| {
                let (lo, up) = case_pair(line);
                fp == lo || fp == up
            })
    }

    /// Registers `name.EXT` for every companion under both case fingerprints
    /// and appends the lines the list does not hold yet.
    ///
    /// Returns the line `fp` resolves to, or `None` when the recovered name
    /// does not hash to `fp`. The in-memory mapping is updated even if the
    /// append fails.
    pub fn learn(&mut self, fp: u32, name: &str, companions: &[String]) -> DatResult<Option<String>> {
        let mut fresh = String::new();
        for ext in companions {
            let line = format!("{name}.{ext}");
            if self.listed.contains(&line) {
                continue;
            }
            self.lines += 1;
            self.register(self.lines, &line);
            fresh.push_str(&line);
            fresh.push('\n');
        }

        let covering = Self::line_for(fp, name, companions);
        match &covering {
            Some(line) => debug!(fingerprint = fp, "learned name {line}"),
            None => debug!(fingerprint = fp, "{name} does not hash to this fingerprint"),
        }

        let Some(path) = &self.backing else {
            return Ok(covering);
        };
        if fresh.is_empty() {
            return Ok(covering);
        }
        if self.unterminated {
            fresh.insert(0, '\n');
        }

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let mut f = OpenOptions::new().create(true).append(true).open(path)?;
        f.write_all(fresh.as_bytes())?;
        self.unterminated = false;

        Ok(covering)
    }
}

#[derive(Debug, Clone)]
struct ReverseEntry {
    name: String,
    fingerprint: u32,
}

/// Name to fingerprint lookup used when repacking.
#[derive(Debug, Clone, Default)]
pub struct ReverseIndex {
    by_key: HashMap<String, ReverseEntry>,
}

impl ReverseIndex {
    /// The catalog name matching a relative path, ignoring case and separator style.
    pub fn name_for(&self, rel_path: &str) -> Option<&str> {
        self.by_key.get(&path_key(rel_path)).map(|e| e.name.as_str())
    }

    /// The fingerprint the catalog had for this name.
    pub fn cataloged_fingerprint(&self, rel_path: &str) -> Option<u32> {
        self.by_key.get(&path_key(rel_path)).map(|e| e.fingerprint)
    }

    /// Fingerprint to pack a known file under: the lower-case hash of its catalog name.
    pub fn pack_fingerprint(&self, rel_path: &str) -> Option<u32> {
        self.name_for(rel_path)
            .map(|name| fingerprint(&name.to_lowercase()))
    }

    pub fn len(&self) -> usize {
        self.by_key.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }
}
