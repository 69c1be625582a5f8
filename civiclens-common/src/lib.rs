//! # CivicLens Common Library
//!
//! Shared code for the CivicLens audit service including:
//! - Audit data model (verdict records, evidence, claim shapes)
//! - Configuration loading
//! - Common error types
//! - Timestamp utilities

pub mod audit;
pub mod config;
pub mod error;
pub mod time;

pub use audit::{
    AnalysisSource, AuditResult, DocumentEvidence, NormalizedClaim, Verdict, MISMATCH_CLAIM,
};
pub use error::{Error, Result};
