//! Serial port access and the bounded-duration monitor
//!
//! This module provides functionality for:
//! - Listing available serial ports (USB-to-serial adapters)
//! - Opening a port with an exclusive, scoped connection
//! - Streaming decoded device output to the console for a fixed window

pub mod monitor;
pub mod port;

pub use monitor::{MonitorConfig, Outcome};
pub use port::{PortConfig, SerialConnection, SerialSource};
