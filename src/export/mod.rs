//! Portable record formats
//!
//! Serializes captured tables into the forms stored inside archives:
//! - JSON: per-table row arrays and the combined database map
//! - CSV: a spreadsheet-friendly sibling of each non-empty table

pub mod csv;
pub mod json;

pub use self::csv::rows_to_csv;
pub use self::json::{complete_database_json, parse_complete_database, parse_table_rows, table_json};
