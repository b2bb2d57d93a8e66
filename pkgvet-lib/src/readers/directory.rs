//! Directory reader: walks a root and scans every recognized manifest.

use super::lockfile::parse_manifest;
use super::{PackageReader, ReaderControl};
use crate::Result;
use crate::models::{Manifest, ManifestKind, Package};
use camino::{Utf8Path, Utf8PathBuf};
use ohno::app_err;
use walkdir::WalkDir;

const LOG_TARGET: &str = "   readers";

/// Directories that never contain the project's own manifests.
const SKIPPED_DIRS: &[&str] = &[".git", "node_modules", "vendor", "target"];

/// Walks a directory tree, recognizing supported manifests by file name and
/// delegating to the lockfile parsers.
pub struct DirectoryReader {
    root: Utf8PathBuf,
}

impl DirectoryReader {
    #[must_use]
    pub fn new(root: impl Into<Utf8PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl PackageReader for DirectoryReader {
    fn name(&self) -> &str {
        "directory"
    }

    fn enumerate(&mut self, callback: &mut dyn FnMut(&Manifest, Package) -> Result<ReaderControl>) -> Result<()> {
        if !self.root.is_dir() {
            return Err(app_err!("'{}' is not a readable directory", self.root));
        }

        let walker = WalkDir::new(&self.root).sort_by_file_name().into_iter().filter_entry(|entry| {
            let name = entry.file_name().to_string_lossy();
            !(entry.file_type().is_dir() && SKIPPED_DIRS.contains(&name.as_ref()))
        });

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    log::warn!(target: LOG_TARGET, "skipping unreadable entry under '{}': {e}", self.root);
                    continue;
                }
            };

            if !entry.file_type().is_file() {
                continue;
            }

            let Some(kind) = entry.file_name().to_str().and_then(ManifestKind::from_file_name) else {
                continue;
            };

            let Some(path) = Utf8Path::from_path(entry.path()) else {
                log::warn!(target: LOG_TARGET, "skipping non-UTF-8 path {}", entry.path().display());
                continue;
            };

            let manifest = Manifest::new(kind, path);
            match parse_manifest(&manifest) {
                Ok(packages) => {
                    for package in packages {
                        if callback(&manifest, package)? == ReaderControl::Stop {
                            return Ok(());
                        }
                    }
                }
                Err(e) => {
                    log::warn!(target: LOG_TARGET, "skipping manifest '{path}': {e:#}");
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    #[cfg_attr(miri, ignore = "Miri cannot call tempfile syscalls")]
    fn test_walk_discovers_nested_manifests() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("requirements.txt"), "django==2.0.0\n").unwrap();
        fs::create_dir_all(dir.path().join("services/api")).unwrap();
        fs::write(dir.path().join("services/api/go.mod"), "module m\n\nrequire github.com/pkg/errors v0.9.1\n").unwrap();
        fs::write(dir.path().join("README.md"), "docs\n").unwrap();

        let mut reader = DirectoryReader::new(Utf8PathBuf::try_from(dir.path().to_path_buf()).unwrap());

        let mut seen = Vec::new();
        reader
            .enumerate(&mut |manifest, package| {
                seen.push(format!("{}:{}", manifest.kind(), package.id()));
                Ok(ReaderControl::Continue)
            })
            .unwrap();

        seen.sort();
        assert_eq!(
            seen,
            vec![
                "go.mod:github.com/pkg/errors@v0.9.1 (go)",
                "requirements.txt:django@2.0.0 (pypi)"
            ]
        );
    }

    #[test]
    #[cfg_attr(miri, ignore = "Miri cannot call tempfile syscalls")]
    fn test_skips_dependency_install_dirs() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("node_modules/dep")).unwrap();
        fs::write(dir.path().join("node_modules/dep/requirements.txt"), "evil==1.0\n").unwrap();
        fs::write(dir.path().join("requirements.txt"), "django==2.0.0\n").unwrap();

        let mut reader = DirectoryReader::new(Utf8PathBuf::try_from(dir.path().to_path_buf()).unwrap());

        let mut seen = Vec::new();
        reader
            .enumerate(&mut |_, package| {
                seen.push(package.id().to_string());
                Ok(ReaderControl::Continue)
            })
            .unwrap();

        assert_eq!(seen, vec!["django@2.0.0 (pypi)"]);
    }

    #[test]
    #[cfg_attr(miri, ignore = "Miri cannot call tempfile syscalls")]
    fn test_malformed_manifest_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("package-lock.json"), "{broken").unwrap();
        fs::write(dir.path().join("requirements.txt"), "django==2.0.0\n").unwrap();

        let mut reader = DirectoryReader::new(Utf8PathBuf::try_from(dir.path().to_path_buf()).unwrap());

        let mut seen = Vec::new();
        reader
            .enumerate(&mut |_, package| {
                seen.push(package.id().to_string());
                Ok(ReaderControl::Continue)
            })
            .unwrap();

        assert_eq!(seen, vec!["django@2.0.0 (pypi)"]);
    }

    #[test]
    fn test_unreadable_root_fails() {
        let mut reader = DirectoryReader::new("/nonexistent/root");
        let err = reader.enumerate(&mut |_, _| Ok(ReaderControl::Continue)).unwrap_err();
        assert!(err.to_string().contains("not a readable directory"));
    }

    #[test]
    #[cfg_attr(miri, ignore = "Miri cannot call tempfile syscalls")]
    fn test_stop_aborts_walk() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("requirements.txt"), "a==1.0\nb==2.0\nc==3.0\n").unwrap();

        let mut reader = DirectoryReader::new(Utf8PathBuf::try_from(dir.path().to_path_buf()).unwrap());

        let mut seen = 0;
        reader
            .enumerate(&mut |_, _| {
                seen += 1;
                Ok(ReaderControl::Stop)
            })
            .unwrap();

        assert_eq!(seen, 1);
    }
}
