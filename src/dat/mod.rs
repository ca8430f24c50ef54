#![forbid(unsafe_code)]

mod build;
mod catalog;
mod config;
mod error;
mod format;
mod hash;
mod io;
mod ops;
mod path;
mod read;
mod sniff;

pub use catalog::{CollisionPolicy, NameCatalog};
pub use config::{default_companions, ExtractConfig, RepackConfig, DEFAULT_NAME_LIST};
pub use error::{DatError, DatResult};
pub use hash::{case_pair, hex};
pub use ops::{entries, extract, repack, verify, ExtractReport, RepackReport};
pub use sniff::classify;
