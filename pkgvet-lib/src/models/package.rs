use super::{Ecosystem, Insight};
use core::cmp::Ordering;
use core::fmt::{Display, Formatter, Result as FmtResult};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// The identity of a discovered package: `(ecosystem, name, version)`.
///
/// Versions are opaque strings; their interpretation differs per registry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PackageId {
    ecosystem: Ecosystem,
    name: Arc<str>,
    version: Arc<str>,
}

impl PackageId {
    #[must_use]
    pub fn new(ecosystem: Ecosystem, name: impl Into<Arc<str>>, version: impl Into<Arc<str>>) -> Self {
        Self {
            ecosystem,
            name: name.into(),
            version: version.into(),
        }
    }

    #[must_use]
    pub const fn ecosystem(&self) -> Ecosystem {
        self.ecosystem
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }
}

impl Display for PackageId {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}@{} ({})", self.name(), self.version(), self.ecosystem())
    }
}

impl PartialOrd for PackageId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PackageId {
    fn cmp(&self, other: &Self) -> Ordering {
        self.ecosystem
            .cmp(&other.ecosystem)
            .then_with(|| self.name().cmp(other.name()))
            .then_with(|| self.version().cmp(other.version()))
    }
}

/// A package discovered in a manifest, optionally enriched with an [`Insight`].
///
/// The insight is attached at most once, before the package enters the
/// analyzer chain; analyzers and reporters observe it read-only.
#[derive(Debug, Clone)]
pub struct Package {
    id: PackageId,
    insight: Option<Arc<Insight>>,
}

impl Package {
    #[must_use]
    pub const fn new(id: PackageId) -> Self {
        Self { id, insight: None }
    }

    #[must_use]
    pub const fn with_insight(id: PackageId, insight: Arc<Insight>) -> Self {
        Self { id, insight: Some(insight) }
    }

    #[must_use]
    pub const fn id(&self) -> &PackageId {
        &self.id
    }

    #[must_use]
    pub fn insight(&self) -> Option<&Insight> {
        self.insight.as_deref()
    }

    /// Attach an enrichment payload, consuming the un-enriched package.
    #[must_use]
    pub fn enriched(mut self, insight: Option<Arc<Insight>>) -> Self {
        self.insight = insight;
        self
    }
}
