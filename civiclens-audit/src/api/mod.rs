//! HTTP API handlers for civiclens-audit

pub mod analyze;
pub mod health;
pub mod report;
pub mod session;

pub use analyze::analyze;
pub use health::health_routes;
pub use report::get_report;
pub use session::{get_state, run_audit, seek, upload_pdf, upload_video};
