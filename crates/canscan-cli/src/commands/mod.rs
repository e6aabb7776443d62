//! Command implementations for canscan

pub mod health;
pub mod history;
pub mod report;
pub mod scan;

pub use health::health;
pub use history::{clear_history, history};
pub use report::report;
pub use scan::scan;
