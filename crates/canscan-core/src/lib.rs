//! canscan-core - Core types and collaborator traits for CAN bus security scans
//!
//! This crate holds the data model shared by the scan client, the mock backend
//! and the CLI, plus the traits through which a scan controller reaches the
//! outside world (notifications, the activity log and the report service).

pub mod collaborators;
pub mod error;
pub mod models;

pub use collaborators::{ActivityLog, BoundedActivityLog, NotificationSink, ReportService};
pub use error::{ReportError, ReportResult};
pub use models::*;
