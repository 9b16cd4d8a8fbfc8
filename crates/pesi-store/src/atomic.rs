//! Atomic file replacement.

use std::fs;
use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;

use crate::StoreError;

/// Replace `path` with `bytes` so readers see either the old or the new
/// content, never a partial write.
///
/// Writes to a temp file in the same directory, syncs it, then renames over
/// the target. Parent directories are created as needed.
pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
    let dir = path
        .parent()
        .ok_or_else(|| StoreError::Other(format!("{} has no parent directory", path.display())))?;
    fs::create_dir_all(dir).map_err(|e| StoreError::io(dir, e))?;

    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| StoreError::io(dir, e))?;
    tmp.write_all(bytes).map_err(|e| StoreError::io(tmp.path(), e))?;
    tmp.as_file()
        .sync_all()
        .map_err(|e| StoreError::io(tmp.path(), e))?;
    tmp.persist(path).map_err(|e| StoreError::io(path, e.error))?;
    Ok(())
}

/// Make a string safe to use as a single path component.
///
/// Separators become `-`, matching how case numbers like `081/CR/0123` are
/// stored on disk.
pub fn safe_component(s: &str) -> String {
    let replaced: String = s
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '\0' => '-',
            _ => c,
        })
        .collect();
    if replaced.is_empty() || replaced.chars().all(|c| c == '.') {
        return "_".to_string();
    }
    replaced
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_creates_parents_and_replaces() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("a").join("b").join("file.json");

        write_atomic(&path, b"first").unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"first");

        write_atomic(&path, b"second").unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"second");

        // Only the target remains; no stray temp files.
        let entries: Vec<_> = fs::read_dir(path.parent().unwrap()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn safe_component_replaces_separators() {
        assert_eq!(safe_component("081/CR/0123"), "081-CR-0123");
        assert_eq!(safe_component("a\\b:c"), "a-b-c");
        assert_eq!(safe_component(".."), "_");
        assert_eq!(safe_component("  "), "_");
        assert_eq!(safe_component("काठमाडौं"), "काठमाडौं");
    }
}
