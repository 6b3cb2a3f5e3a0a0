pub mod grouping;
mod importer;
pub mod parser;

pub use importer::{HistoryImporter, ImportSummary};
pub use parser::{parse_date, parse_duration, parse_row, ImportRow, MIN_FIELDS};
