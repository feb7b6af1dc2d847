use std::fs;
use std::io;
use std::path::Path;

use tracing::warn;
use zip::ZipArchive;

use crate::domain::SubjectId;
use crate::error::MmashError;

/// Expands `zip_path` into `target_dir`, returning the number of entries written.
///
/// Entry names that are absolute or climb out through `..` are refused, so an
/// archive can never write outside `target_dir`.
pub fn extract_zip(zip_path: &Path, target_dir: &Path) -> Result<usize, MmashError> {
    let file = fs::File::open(zip_path)
        .map_err(|err| MmashError::Filesystem(format!("open zip {}: {err}", zip_path.display())))?;
    let mut archive = ZipArchive::new(file).map_err(|err| MmashError::Archive(err.to_string()))?;

    for i in 0..archive.len() {
        let mut entry = archive
            .by_index(i)
            .map_err(|err| MmashError::Archive(err.to_string()))?;
        let entry_path = match entry.enclosed_name() {
            Some(path) => target_dir.join(path),
            None => {
                return Err(MmashError::Archive(format!(
                    "zip entry escapes target directory: {}",
                    entry.name()
                )));
            }
        };

        if entry.is_dir() {
            fs::create_dir_all(&entry_path)
                .map_err(|err| MmashError::Filesystem(err.to_string()))?;
            continue;
        }

        if let Some(parent) = entry_path.parent() {
            fs::create_dir_all(parent).map_err(|err| MmashError::Filesystem(err.to_string()))?;
        }
        let mut outfile =
            fs::File::create(&entry_path).map_err(|err| MmashError::Filesystem(err.to_string()))?;
        io::copy(&mut entry, &mut outfile).map_err(|err| MmashError::Archive(err.to_string()))?;
    }
    Ok(archive.len())
}

/// Immediate child directories of `root`, sorted by name.
///
/// Files and symbolic links are left out; so are names that are not UTF-8.
pub fn list_subject_dirs(root: &Path) -> Result<Vec<SubjectId>, MmashError> {
    let entries = fs::read_dir(root)
        .map_err(|err| MmashError::Filesystem(format!("read {}: {err}", root.display())))?;

    let mut subjects = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|err| MmashError::Filesystem(err.to_string()))?;
        let file_type = entry
            .file_type()
            .map_err(|err| MmashError::Filesystem(err.to_string()))?;
        if !file_type.is_dir() {
            continue;
        }
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            warn!(path = %entry.path().display(), "skipping non UTF-8 subject directory");
            continue;
        };
        match name.parse::<SubjectId>() {
            Ok(subject) => subjects.push(subject),
            Err(err) => warn!(path = %entry.path().display(), %err, "skipping subject directory"),
        }
    }
    subjects.sort();
    Ok(subjects)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lists_only_directories_in_order() {
        let temp = tempfile::tempdir().unwrap();
        for name in ["user_2", "user_10", "user_1"] {
            fs::create_dir(temp.path().join(name)).unwrap();
        }
        fs::write(temp.path().join("README.txt"), b"notes").unwrap();

        let subjects = list_subject_dirs(temp.path()).unwrap();
        let names = subjects.iter().map(SubjectId::as_str).collect::<Vec<_>>();
        assert_eq!(names, ["user_1", "user_10", "user_2"]);
    }

    #[cfg(unix)]
    #[test]
    fn symlinked_directories_are_skipped() {
        let temp = tempfile::tempdir().unwrap();
        fs::create_dir(temp.path().join("user_1")).unwrap();
        std::os::unix::fs::symlink(temp.path().join("user_1"), temp.path().join("user_9"))
            .unwrap();

        let subjects = list_subject_dirs(temp.path()).unwrap();
        assert_eq!(subjects.len(), 1);
        assert_eq!(subjects[0].as_str(), "user_1");
    }

    #[cfg(unix)]
    #[test]
    fn backslash_names_are_subjects() {
        let temp = tempfile::tempdir().unwrap();
        fs::create_dir(temp.path().join("user\\5")).unwrap();
        fs::create_dir(temp.path().join("user_1")).unwrap();

        let subjects = list_subject_dirs(temp.path()).unwrap();
        let names = subjects.iter().map(SubjectId::as_str).collect::<Vec<_>>();
        assert_eq!(names, ["user\\5", "user_1"]);
    }

    #[test]
    fn empty_root_yields_no_subjects() {
        let temp = tempfile::tempdir().unwrap();
        assert!(list_subject_dirs(temp.path()).unwrap().is_empty());
    }
}
