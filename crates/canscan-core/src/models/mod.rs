//! Shared data models for scans

mod log;
mod notification;
mod request;
mod result;

pub use log::*;
pub use notification::*;
pub use request::*;
pub use result::*;
