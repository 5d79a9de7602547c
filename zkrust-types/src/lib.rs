//! Record codecs and data types for zkrust
//!
//! Every codec here is a pure function over byte slices: decoders never read
//! past the end of their input and report short or malformed data through
//! [`Error`], an `Option` or an empty `Vec`.

pub mod attendance;
pub mod device_info;
pub mod door;
pub mod endpoint;
pub mod error;
pub mod event;
mod field;
pub mod template;
pub mod timestamp;
pub mod user;

pub use attendance::{AttendanceRecord, decode_attendance};
pub use device_info::DeviceInfo;
pub use door::{DoorAction, DoorStatus};
pub use endpoint::Endpoint;
pub use error::{Error, Result};
pub use event::{DeviceEvent, EventKind};
pub use template::{BiometricTemplate, TemplateKind};
pub use user::{UserRecord, decode_users};
