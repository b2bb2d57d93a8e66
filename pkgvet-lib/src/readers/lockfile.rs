//! Parsers for the supported lockfile formats.

use super::{PackageReader, ReaderControl};
use crate::Result;
use crate::models::{Ecosystem, Manifest, ManifestKind, Package, PackageId};
use camino::Utf8PathBuf;
use ohno::{IntoAppError, app_err};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;

const LOG_TARGET: &str = "   readers";

/// Reads packages from explicitly named lockfiles.
///
/// The kind of each file is detected from its name; an unrecognized or
/// unreadable path is an error (the caller named it explicitly), while a
/// recognized file that fails to parse is logged and skipped.
pub struct LockfileReader {
    paths: Vec<Utf8PathBuf>,
}

impl LockfileReader {
    #[must_use]
    pub fn new(paths: impl IntoIterator<Item = Utf8PathBuf>) -> Self {
        Self {
            paths: paths.into_iter().collect(),
        }
    }
}

impl PackageReader for LockfileReader {
    fn name(&self) -> &str {
        "lockfiles"
    }

    fn enumerate(&mut self, callback: &mut dyn FnMut(&Manifest, Package) -> Result<ReaderControl>) -> Result<()> {
        for path in &self.paths {
            let file_name = path.file_name().unwrap_or_default();
            let kind = ManifestKind::from_file_name(file_name)
                .ok_or_else(|| app_err!("'{path}' is not a recognized dependency manifest"))?;

            let manifest = Manifest::new(kind, path.clone());
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

/// Parse one manifest file into its declared packages.
pub(crate) fn parse_manifest(manifest: &Manifest) -> Result<Vec<Package>> {
    let path = manifest.path();
    let text = fs::read_to_string(path).into_app_err_with(|| format!("reading manifest '{path}'"))?;

    let packages = match manifest.kind() {
        ManifestKind::RequirementsTxt => parse_requirements_txt(&text),
        ManifestKind::PackageLockJson => parse_package_lock_json(&text)?,
        ManifestKind::CargoLock => parse_cargo_lock(&text)?,
        ManifestKind::GemfileLock => parse_gemfile_lock(&text),
        ManifestKind::GoMod => parse_go_mod(&text),
        ManifestKind::JsonDump => return Err(app_err!("JSON dumps are replayed by the dump reader, not parsed as manifests")),
    };

    log::debug!(target: LOG_TARGET, "parsed {} package(s) from '{path}'", packages.len());
    Ok(packages)
}

/// Parse pip's `requirements.txt`: only exact `name==version` pins are
/// scannable; everything else (options, ranges, editable installs) is
/// skipped.
fn parse_requirements_txt(text: &str) -> Vec<Package> {
    let mut packages = Vec::new();

    for line in text.lines() {
        // Strip comments and environment markers
        let line = line.split('#').next().unwrap_or_default();
        let line = line.split(';').next().unwrap_or_default().trim();

        if line.is_empty() || line.starts_with('-') {
            continue;
        }

        let Some((name, version)) = line.split_once("==") else {
            log::debug!(target: LOG_TARGET, "skipping non-pinned requirement '{line}'");
            continue;
        };

        // Drop any extras qualifier: `requests[socks]==2.31.0`
        let name = name.split('[').next().unwrap_or_default().trim();
        let version = version.trim();
        if name.is_empty() || version.is_empty() {
            continue;
        }

        packages.push(Package::new(PackageId::new(Ecosystem::Pypi, name, version)));
    }

    packages
}

#[derive(Debug, Deserialize)]
struct NpmLock {
    /// v2/v3 lockfiles: flat map keyed by install path.
    #[serde(default)]
    packages: BTreeMap<String, NpmLockEntry>,

    /// v1 lockfiles: nested dependency tree.
    #[serde(default)]
    dependencies: BTreeMap<String, NpmDependency>,
}

#[derive(Debug, Deserialize)]
struct NpmLockEntry {
    version: Option<String>,

    #[serde(default)]
    link: bool,
}

#[derive(Debug, Deserialize)]
struct NpmDependency {
    version: Option<String>,

    #[serde(default)]
    dependencies: BTreeMap<String, NpmDependency>,
}

/// Parse npm's `package-lock.json` (v2/v3 `packages` map, with the v1
/// `dependencies` tree as fallback).
fn parse_package_lock_json(text: &str) -> Result<Vec<Package>> {
    let lock: NpmLock = serde_json::from_str(text).into_app_err("parsing package-lock.json")?;

    let mut packages = Vec::new();

    if lock.packages.is_empty() {
        collect_npm_v1(&lock.dependencies, &mut packages);
        return Ok(packages);
    }

    for (install_path, entry) in &lock.packages {
        // The "" key is the root project itself; links point into the workspace.
        if install_path.is_empty() || entry.link {
            continue;
        }

        let Some(version) = &entry.version else {
            continue;
        };

        let name = install_path.rsplit("node_modules/").next().unwrap_or(install_path);
        packages.push(Package::new(PackageId::new(Ecosystem::Npm, name, version.as_str())));
    }

    Ok(packages)
}

fn collect_npm_v1(dependencies: &BTreeMap<String, NpmDependency>, packages: &mut Vec<Package>) {
    for (name, dependency) in dependencies {
        if let Some(version) = &dependency.version {
            packages.push(Package::new(PackageId::new(Ecosystem::Npm, name.as_str(), version.as_str())));
        }
        collect_npm_v1(&dependency.dependencies, packages);
    }
}

#[derive(Debug, Deserialize)]
struct CargoLockFile {
    #[serde(default)]
    package: Vec<CargoLockPackage>,
}

#[derive(Debug, Deserialize)]
struct CargoLockPackage {
    name: String,
    version: String,
}

/// Parse `Cargo.lock` (`[[package]]` entries).
fn parse_cargo_lock(text: &str) -> Result<Vec<Package>> {
    let lock: CargoLockFile = toml::from_str(text).into_app_err("parsing Cargo.lock")?;

    Ok(lock
        .package
        .into_iter()
        .map(|p| Package::new(PackageId::new(Ecosystem::Cargo, p.name, p.version)))
        .collect())
}

/// Parse bundler's `Gemfile.lock`: resolved gems sit in the GEM section's
/// `specs:` block at four-space indent as `name (version)`.
fn parse_gemfile_lock(text: &str) -> Vec<Package> {
    let mut packages = Vec::new();
    let mut in_gem_specs = false;

    for line in text.lines() {
        if !line.starts_with(' ') {
            in_gem_specs = line == "GEM";
            continue;
        }

        if !in_gem_specs {
            continue;
        }

        // Exactly four spaces: a resolved gem. Deeper indents are
        // unresolved dependency declarations.
        if let Some(entry) = line.strip_prefix("    ")
            && !entry.starts_with(' ')
            && let Some((name, rest)) = entry.split_once(" (")
            && let Some(version) = rest.strip_suffix(')')
        {
            packages.push(Package::new(PackageId::new(Ecosystem::Rubygems, name.trim(), version.trim())));
        }
    }

    packages
}

/// Parse `go.mod` require directives (block and single-line forms).
fn parse_go_mod(text: &str) -> Vec<Package> {
    let mut packages = Vec::new();
    let mut in_require_block = false;

    for line in text.lines() {
        let line = line.split("//").next().unwrap_or_default().trim();

        if line.is_empty() {
            continue;
        }

        if in_require_block {
            if line == ")" {
                in_require_block = false;
                continue;
            }
            push_go_requirement(line, &mut packages);
            continue;
        }

        if line == "require (" {
            in_require_block = true;
        } else if let Some(rest) = line.strip_prefix("require ") {
            push_go_requirement(rest.trim(), &mut packages);
        }
    }

    packages
}

fn push_go_requirement(line: &str, packages: &mut Vec<Package>) {
    let mut parts = line.split_whitespace();
    if let (Some(module), Some(version)) = (parts.next(), parts.next()) {
        packages.push(Package::new(PackageId::new(Ecosystem::Go, module, version)));
    }
}
