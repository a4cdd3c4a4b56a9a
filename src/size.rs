// SPDX-License-Identifier: Apache-2.0
//! Folder size scanning.

use log::warn;
use std::path::Path;
use walkdir::WalkDir;

/// Sum the sizes of all regular files under `path`.  Symbolic links are
/// not followed, and count for nothing.  Entries that can't be read are
/// logged and skipped, so a missing tree has size 0.
pub fn folder_size<P: AsRef<Path>>(path: P) -> u64 {
    let mut total = 0;
    for entry in WalkDir::new(path.as_ref()).follow_links(false) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                warn!("Skipping while sizing {}: {}", path.as_ref().display(), err);
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        match entry.metadata() {
            Ok(meta) => total += meta.len(),
            Err(err) => warn!("Unable to stat {}: {}", entry.path().display(), err),
        }
    }
    total
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::os::unix::fs::symlink;

    #[test]
    fn only_symlink() {
        let outside = tempfile::tempdir().unwrap();
        let target = outside.path().join("big");
        fs::write(&target, vec![0u8; 4096]).unwrap();

        let dir = tempfile::tempdir().unwrap();
        symlink(&target, dir.path().join("link")).unwrap();
        assert_eq!(folder_size(dir.path()), 0);
    }

    #[test]
    fn file_and_symlink() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("data");
        fs::write(&file, vec![1u8; 1234]).unwrap();
        symlink(&file, dir.path().join("link")).unwrap();
        assert_eq!(folder_size(dir.path()), 1234);
    }

    #[test]
    fn nested_directories() {
        let dir = tempfile::tempdir().unwrap();
        let deep = dir.path().join("a").join("b");
        fs::create_dir_all(&deep).unwrap();
        fs::write(dir.path().join("top"), b"12345").unwrap();
        fs::write(deep.join("bottom"), b"678").unwrap();
        symlink(dir.path().join("a"), dir.path().join("loop")).unwrap();
        assert_eq!(folder_size(dir.path()), 8);
    }

    #[test]
    fn missing_tree() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(folder_size(dir.path().join("nope")), 0);
    }
}
