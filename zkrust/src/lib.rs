//! # zkrust
//!
//! Async client for ZKTeco time-attendance and access-control terminals
//! speaking the UDP protocol on port 4370.
//!
//! ## Features
//!
//! - Session handshake with reply-id tracking
//! - User table, attendance log and biometric template transfers
//! - Door relay control and status
//! - Real-time event monitoring with pluggable handlers
//!
//! ## Quick Start
//!
//! ```no_run
//! use zkrust::Device;
//!
//! #[tokio::main]
//! async fn main() -> zkrust::Result<()> {
//!     // Connect to device
//!     let mut device = Device::new("192.168.1.201:4370".parse()?);
//!     device.connect().await?;
//!
//!     // Read the attendance log
//!     for record in device.get_attendance().await? {
//!         println!("{}", record);
//!     }
//!
//!     // Disconnect
//!     device.disconnect().await?;
//!
//!     Ok(())
//! }
//! ```

pub mod attendance;
pub mod biometrics;
pub mod config;
pub mod device;
pub mod dispatch;
pub mod door;
pub mod error;
pub mod monitor;
pub mod users;

#[cfg(test)]
mod mock;

// Re-exports
pub use config::DeviceConfig;
pub use device::Device;
pub use dispatch::{Dispatcher, StreamLayout};
pub use error::{Error, Result};
pub use monitor::{EventMonitor, MonitorHandle};

// Re-export types
pub use zkrust_core::{Command, EventFlags, Packet, Session};
pub use zkrust_types::{
    AttendanceRecord, BiometricTemplate, DeviceEvent, DeviceInfo, DoorAction, DoorStatus,
    Endpoint, EventKind, TemplateKind, UserRecord,
};
