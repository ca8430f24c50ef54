#![forbid(unsafe_code)]

use std::path::PathBuf;

use crate::dat::catalog::CollisionPolicy;

/// Name list used when none is given.
pub const DEFAULT_NAME_LIST: &str = "data/FileNames.list";

/// Extensions registered together for a name recovered from an embedded object.
pub const DEFAULT_COMPANIONS: [&str; 2] = ["EVO", "DDS"];

pub fn default_companions() -> Vec<String> {
    DEFAULT_COMPANIONS.iter().map(|s| s.to_string()).collect()
}

#[derive(Debug, Clone)]
pub struct ExtractConfig {
    pub archive: PathBuf,
    pub output: PathBuf,
    /// `None` runs without a catalog; learned names then stay in memory.
    pub name_list: Option<PathBuf>,
    pub collisions: CollisionPolicy,
    pub companions: Vec<String>,
}

impl ExtractConfig {
    pub fn new(archive: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self {
            archive: archive.into(),
            output: output.into(),
            name_list: Some(PathBuf::from(DEFAULT_NAME_LIST)),
            collisions: CollisionPolicy::default(),
            companions: default_companions(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RepackConfig {
    pub input: PathBuf,
    pub output: PathBuf,
    pub name_list: Option<PathBuf>,
    pub collisions: CollisionPolicy,
}

impl RepackConfig {
    pub fn new(input: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
            name_list: Some(PathBuf::from(DEFAULT_NAME_LIST)),
            collisions: CollisionPolicy::default(),
        }
    }
}
