//! Device information structures

use std::fmt;

/// Identification strings reported by a terminal
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DeviceInfo {
    /// Device serial number
    pub serial_number: String,

    /// Firmware version string
    pub firmware_version: String,

    /// Fingerprint algorithm version
    pub fingerprint_version: Option<String>,

    /// Platform name
    pub platform: Option<String>,

    /// Device name
    pub device_name: Option<String>,

    /// Operating system version
    pub os_version: Option<String>,
}

impl DeviceInfo {
    pub fn new(serial_number: impl Into<String>, firmware_version: impl Into<String>) -> Self {
        Self {
            serial_number: serial_number.into(),
            firmware_version: firmware_version.into(),
            ..Self::default()
        }
    }
}

impl fmt::Display for DeviceInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Device[SN: {}, FW: {}",
            self.serial_number, self.firmware_version
        )?;
        if let Some(name) = &self.device_name {
            write!(f, ", Name: {}", name)?;
        }
        if let Some(platform) = &self.platform {
            write!(f, ", Platform: {}", platform)?;
        }
        f.write_str("]")
    }
}

/// Value of an option reply
///
/// Replies usually echo the key (`~SerialNumber=ABC123`) and carry trailing
/// NULs; both are removed.
pub fn option_value(reply: &[u8]) -> String {
    let text = String::from_utf8_lossy(crate::field::until_nul(reply)).into_owned();
    match text.split_once('=') {
        Some((_, value)) => value.trim().to_string(),
        None => text.trim().to_string(),
    }
}
