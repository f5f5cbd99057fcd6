//! CLI command implementations
//!
//! Commands are organized by domain:
//! - `interpret` - Run the interpreter once from the terminal
//! - `period` - Time-period resolution
//! - `prompts` - Prompt library management commands
//! - `serve` - Web server command

pub mod interpret;
pub mod period;
pub mod prompts;
pub mod serve;

// Re-export command functions for main.rs
pub use interpret::*;
pub use period::*;
pub use prompts::*;
pub use serve::*;
