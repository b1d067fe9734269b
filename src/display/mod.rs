//! Display formatting for terminal output
//!
//! Provides utilities for formatting backup catalogs, statistics, and
//! operation reports for terminal display.

pub mod backup;

pub use backup::{
    format_backup_list, format_duration, format_index, format_restore_report,
    format_retention_report, format_size, format_statistics,
};
