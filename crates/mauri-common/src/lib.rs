//! mauri-common: Shared types, errors, and configuration used across all Mauri crates.
//!
//! - `catalog`: pest, submission and user records
//! - `facets`: comma-separated facet strings modelled as ordered sets
//! - `query`: the public search / facet filter
//! - `config`: `mauri.toml` + environment loading

pub mod catalog;
pub mod config;
pub mod error;
pub mod facets;
pub mod query;

// Re-export commonly used types
pub use catalog::{NewPest, Pest, PestPatch, Role, Severity, Submission, NewSubmission, User, UpsertUser};
pub use config::Config;
pub use error::{MauriError, Result};
pub use facets::FacetSet;
pub use query::PestQuery;
