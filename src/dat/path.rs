#![forbid(unsafe_code)]

use std::path::{Path, PathBuf};

use crate::dat::error::{DatError, DatResult};

const ILLEGAL: &[char] = &['<', '>', ':', '"', '|', '?', '*'];

pub fn normalize_rel_path(input_root: &Path, file_path: &Path) -> DatResult<String> {
    let rel = file_path
        .strip_prefix(input_root)
        .map_err(|_| DatError::Outside(file_path.to_string_lossy().into_owned()))?;

    let mut out = String::new();
    for (i, comp) in rel.components().enumerate() {
        if i != 0 {
            out.push('/');
        }
        out.push_str(&comp.as_os_str().to_string_lossy());
    }
    out = out.replace('\\', "/");

    if out.is_empty() {
        return Err(DatError::Invalid("empty relative path".into()));
    }

    Ok(out)
}

/// Safe path components of a catalog name. Both `/` and `\` separate
/// components; illegal characters are dropped, as are empty, `.` and `..`
/// components.
fn components(name: &str) -> impl Iterator<Item = String> + '_ {
    name.split(['/', '\\'])
        .map(|c| c.chars().filter(|ch| !ILLEGAL.contains(ch) && !ch.is_control()).collect::<String>())
        .filter(|c| !c.is_empty() && c != "." && c != "..")
}

/// Relative output path for a catalog name, or `None` if nothing usable remains.
pub fn sanitize(name: &str) -> Option<PathBuf> {
    let path: PathBuf = components(name).collect();
    (!path.as_os_str().is_empty()).then_some(path)
}

/// Lookup key matching a catalog name to a file found on disk.
pub fn path_key(name: &str) -> String {
    components(name).collect::<Vec<_>>().join("/").to_lowercase()
}

/// True if the last component of `name` has an extension.
pub fn has_extension(name: &str) -> bool {
    let file = name.rsplit(['/', '\\']).next().unwrap_or(name);
    matches!(file.rfind('.'), Some(i) if i > 0 && i + 1 < file.len())
}

/// Parses the literal fingerprint saved as a file name, e.g. `3794127461.bin`.
pub fn fingerprint_from_stem(rel_path: &str) -> DatResult<u32> {
    let file = rel_path.rsplit('/').next().unwrap_or(rel_path);
    let stem = file.split('.').next().unwrap_or(file);
    stem.parse::<u32>()
        .map_err(|_| DatError::Unresolved(rel_path.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rel_path_uses_forward_slashes() {
        let root = Path::new("/data/in");
        let rel = normalize_rel_path(root, &root.join("models").join("tank.evo")).unwrap();
        assert_eq!(rel, "models/tank.evo");

        assert!(matches!(
            normalize_rel_path(root, Path::new("/elsewhere/x")),
            Err(DatError::Outside(_))
        ));
    }

    #[test]
    fn sanitize_keeps_directories_and_drops_illegal() {
        assert_eq!(
            sanitize("Models\\Tank?.evo").unwrap(),
            Path::new("Models").join("Tank.evo")
        );
        assert_eq!(
            sanitize("a/../b/./c:d.txt").unwrap(),
            Path::new("a").join("b").join("cd.txt")
        );
        assert_eq!(sanitize("/abs/name.dds").unwrap(), Path::new("abs").join("name.dds"));
        assert!(sanitize("..").is_none());
        assert!(sanitize("???").is_none());
    }

    #[test]
    fn keys_ignore_separator_and_case() {
        assert_eq!(path_key("Models\\Tank.EVO"), "models/tank.evo");
        assert_eq!(path_key("models/tank.evo"), "models/tank.evo");
        assert_eq!(path_key("a/b?.txt"), "a/b.txt");
    }

    #[test]
    fn extension_detection() {
        assert!(has_extension("textures/stone.dds"));
        assert!(has_extension("a.b\\c.txt"));
        assert!(!has_extension("a.b\\c"));
        assert!(!has_extension("textures/stone"));
        assert!(!has_extension(".hidden"));
        assert!(!has_extension("trailing."));
    }

    #[test]
    fn stem_fingerprints() {
        assert_eq!(fingerprint_from_stem("3794127461.bin").unwrap(), 3_794_127_461);
        assert_eq!(fingerprint_from_stem("sub/360.eobj").unwrap(), 360);
        assert_eq!(fingerprint_from_stem("42").unwrap(), 42);
        assert!(matches!(
            fingerprint_from_stem("textures/stone.dds"),
            Err(DatError::Unresolved(_))
        ));
        assert!(fingerprint_from_stem("99999999999.bin").is_err());
    }
}
