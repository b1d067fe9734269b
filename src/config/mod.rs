//! Configuration module for civic-backup
//!
//! This module provides configuration management including:
//! - Platform-aware path resolution
//! - Operator settings persistence
//! - The resolved storage layout injected into each component

pub mod layout;
pub mod paths;
pub mod settings;

pub use layout::StorageLayout;
pub use paths::CivicPaths;
pub use settings::{AppendPolicy, Settings};
