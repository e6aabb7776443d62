//! HTTP handlers for the mock backend

pub mod results;
pub mod scan;
