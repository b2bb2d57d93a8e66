//! JSON dump reporter: persists the enriched package stream for later replay.

use super::{Reporter, ScanSummary};
use crate::Result;
use crate::analyzers::FilterMatchEvent;
use crate::models::{Manifest, Package};
use crate::policy::FilterFact;
use crate::readers::DumpRecord;
use camino::Utf8PathBuf;
use ohno::IntoAppError;
use std::collections::BTreeMap;
use std::fs;

const LOG_TARGET: &str = " reporters";

/// Buffers one dump record per package and writes the dump directory on
/// finish: one newline-delimited JSON file per manifest, replayable by the
/// dump reader. Nothing touches disk before `on_finish`.
pub struct JsonDumpReporter {
    dir: Utf8PathBuf,
    records_by_manifest: BTreeMap<Manifest, Vec<String>>,
}

impl JsonDumpReporter {
    #[must_use]
    pub fn new(dir: impl Into<Utf8PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            records_by_manifest: BTreeMap::new(),
        }
    }
}

impl Reporter for JsonDumpReporter {
    fn name(&self) -> &str {
        "json-dump"
    }

    fn on_package(&mut self, manifest: &Manifest, package: &Package) -> Result<()> {
        let record = DumpRecord {
            manifest: manifest.clone(),
            package: FilterFact::project(package),
        };

        let line = serde_json::to_string(&record).into_app_err("serializing dump record")?;
        self.records_by_manifest.entry(manifest.clone()).or_default().push(line);
        Ok(())
    }

    fn on_filter_match(&mut self, _manifest: &Manifest, _package: &Package, _event: &FilterMatchEvent) -> Result<()> {
        Ok(())
    }

    fn on_finish(&mut self, _summary: &ScanSummary) -> Result<()> {
        fs::create_dir_all(&self.dir).into_app_err_with(|| format!("creating dump directory '{}'", self.dir))?;

        for (index, (manifest, lines)) in self.records_by_manifest.iter().enumerate() {
            let file_name = format!("{index:03}-{}.ndjson", slugify(manifest.path().as_str()));
            let path = self.dir.join(file_name);

            let mut contents = lines.join("\n");
            contents.push('\n');
            fs::write(&path, contents).into_app_err_with(|| format!("writing dump file '{path}'"))?;
        }

        log::info!(
            target: LOG_TARGET,
            "dumped {} manifest(s) to '{}'",
            self.records_by_manifest.len(),
            self.dir
        );
        Ok(())
    }
}

/// Reduce a manifest path to a file-name-safe slug.
fn slugify(path: &str) -> String {
    let mut slug = String::with_capacity(path.len());
    let mut last_dash = true;

    for c in path.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
            last_dash = false;
        } else if !last_dash {
            slug.push('-');
            last_dash = true;
        }
    }

    while slug.ends_with('-') {
        let _ = slug.pop();
    }

    slug
}
