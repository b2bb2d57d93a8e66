use super::Ecosystem;
use camino::{Utf8Path, Utf8PathBuf};
use core::fmt::{Display, Formatter, Result as FmtResult};
use serde::{Deserialize, Serialize};
use strum::{Display as StrumDisplay, EnumIter, EnumString};

/// The kind of dependency manifest a file was recognized as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, StrumDisplay, EnumString, EnumIter, Serialize, Deserialize)]
pub enum ManifestKind {
    #[strum(serialize = "requirements.txt")]
    #[serde(rename = "requirements.txt")]
    RequirementsTxt,

    #[strum(serialize = "package-lock.json")]
    #[serde(rename = "package-lock.json")]
    PackageLockJson,

    #[strum(serialize = "Cargo.lock")]
    #[serde(rename = "Cargo.lock")]
    CargoLock,

    #[strum(serialize = "Gemfile.lock")]
    #[serde(rename = "Gemfile.lock")]
    GemfileLock,

    #[strum(serialize = "go.mod")]
    #[serde(rename = "go.mod")]
    GoMod,

    /// A JSON dump produced by a previous scan, replayed by the dump reader.
    #[strum(serialize = "json-dump")]
    #[serde(rename = "json-dump")]
    JsonDump,
}

impl ManifestKind {
    /// Recognize a manifest kind from a file name.
    #[must_use]
    pub fn from_file_name(name: &str) -> Option<Self> {
        match name {
            "requirements.txt" => Some(Self::RequirementsTxt),
            "package-lock.json" => Some(Self::PackageLockJson),
            "Cargo.lock" => Some(Self::CargoLock),
            "Gemfile.lock" => Some(Self::GemfileLock),
            "go.mod" => Some(Self::GoMod),
            _ => None,
        }
    }

    /// The registry that packages declared in this manifest belong to.
    #[must_use]
    pub const fn ecosystem(self) -> Option<Ecosystem> {
        match self {
            Self::RequirementsTxt => Some(Ecosystem::Pypi),
            Self::PackageLockJson => Some(Ecosystem::Npm),
            Self::CargoLock => Some(Ecosystem::Cargo),
            Self::GemfileLock => Some(Ecosystem::Rubygems),
            Self::GoMod => Some(Ecosystem::Go),
            Self::JsonDump => None,
        }
    }
}

/// A dependency manifest discovered on disk (or replayed from a dump).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Manifest {
    kind: ManifestKind,
    path: Utf8PathBuf,
}

impl Manifest {
    #[must_use]
    pub fn new(kind: ManifestKind, path: impl Into<Utf8PathBuf>) -> Self {
        Self { kind, path: path.into() }
    }

    #[must_use]
    pub const fn kind(&self) -> ManifestKind {
        self.kind
    }

    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }
}

impl Display for Manifest {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{} [{}]", self.path, self.kind)
    }
}
