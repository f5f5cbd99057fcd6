//! HTTP request handlers organized by domain
//!
//! Each submodule contains handlers for a specific API area.

pub mod expense_tracker;
pub mod general;

// Re-export all handlers for use in router
pub use expense_tracker::*;
pub use general::*;
