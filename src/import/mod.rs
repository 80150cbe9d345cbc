mod kind;
pub mod orchestrate;
mod pass;
pub mod record;
mod references;
pub mod report;
mod rows;
mod store;
mod table_order;

pub use kind::EntityKind;
pub use orchestrate::{run_import, ImportState, Importer};
pub use pass::EntitySummary;
pub use record::{parse_line, parse_record, LineParser, RawRecord, RowAt};
pub use report::{write_import_report, EntityReport, ImportReport};
