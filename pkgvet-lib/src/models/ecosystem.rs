use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

/// A package registry a dependency can originate from.
///
/// The lowercase string form is part of the external contract: it appears in
/// the filter fact schema, in JSON dumps, and in exceptions files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, EnumString, EnumIter, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Ecosystem {
    Npm,
    Pypi,
    Maven,
    Rubygems,
    Go,
    Nuget,
    Cargo,
}
