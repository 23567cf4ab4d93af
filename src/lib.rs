//! # Interim Report Library
//!
//! Resolves a student email to the qualitative grades reported for each of
//! their classes, through a paginated, rate-limited school-information-system
//! API, and prepares the rows for export and trend charts.
//!
//! Modules:
//! - `config`: service configuration, loading and validation
//! - `cache`: bearer token cache
//! - `sources`: token exchange, paginated fetcher, rate-limit window
//! - `pipeline`: lookup chain and class exclusion filter
//! - `parser`: typed response schemas and the grade row flattener
//! - `index`: local student directory snapshot
//! - `report`: per-class trend tables

pub mod config;
pub mod cache;
pub mod sources;
pub mod resilience;
pub mod parser;
pub mod pipeline;
pub mod index;
pub mod sinks;
pub mod report;
pub mod service;
pub mod observability;
pub mod server;
pub mod helpers;
pub mod utils;
pub mod error;

#[cfg(test)]
mod tests;

pub use crate::config::types::ServiceConfig;
pub use crate::error::{ReportError, Result};
pub use crate::parser::flatten::GradeRow;
pub use crate::service::grade_service::GradeService;
