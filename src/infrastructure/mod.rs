//! Infrastructure layer - Port implementations
//!
//! Concrete implementations of the engine ports on ESP32 hardware, plus the
//! embassy tasks that drive them.

pub mod adapters;
pub mod config;
pub mod drivers;
pub mod tasks;
pub mod types;
