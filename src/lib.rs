pub mod archive;
pub mod config;
pub mod db;
pub mod error;
pub mod import;
pub mod logging;
pub mod migrate;
pub mod query;

#[cfg(test)]
mod test_support;

pub use config::{EntitySelection, ImportConfig, SourceEncoding};
pub use error::{ImportError, ImportResult};
pub use import::{run_import, EntityKind, ImportReport, ImportState, Importer};
