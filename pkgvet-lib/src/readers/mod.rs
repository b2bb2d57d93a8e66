//! Manifest discovery and package enumeration
//!
//! Readers produce the finite stream of `(manifest, package)` pairs the
//! scan pipeline consumes. Three variants exist: explicit lockfile paths
//! ([`LockfileReader`]), a recursive directory walk ([`DirectoryReader`]),
//! and replay of a previous scan's JSON dump ([`DumpReader`]).
//!
//! # Implementation Model
//!
//! Enumeration is callback-driven: the reader invokes the callback once per
//! discovered package and stops cleanly when the callback returns
//! [`ReaderControl::Stop`] (used for cancellation and backpressure
//! shutdown). A manifest that fails to parse is logged and skipped; a
//! completely unreadable root fails the reader.

mod directory;
mod dump;
mod lockfile;

pub use directory::DirectoryReader;
pub use dump::{DumpReader, DumpRecord};
pub use lockfile::LockfileReader;

use crate::Result;
use crate::models::{Manifest, Package};

/// Flow control returned by enumeration callbacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReaderControl {
    Continue,
    Stop,
}

/// A source of `(manifest, package)` pairs.
pub trait PackageReader {
    fn name(&self) -> &str;

    /// Invoke `callback` once per discovered package.
    ///
    /// Traversal stops cleanly when the callback returns
    /// [`ReaderControl::Stop`]; callback errors abort the reader.
    fn enumerate(&mut self, callback: &mut dyn FnMut(&Manifest, Package) -> Result<ReaderControl>) -> Result<()>;
}
