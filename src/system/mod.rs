//! System-level modules
//!
//! - Logging initialization
//! - Shutdown handling (Ctrl+C, final storage flush)

pub mod logging;
pub mod shutdown;
