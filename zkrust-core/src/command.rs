//! Protocol command catalog

use std::fmt;

use crate::error::{Error, Result};

/// Declares the catalog once: enum variant, wire code and manual name.
macro_rules! commands {
    ($( $(#[$meta:meta])* $variant:ident = $code:literal => $name:literal, )+) => {
        /// Protocol command codes
        ///
        /// Request codes sent by the client and the acknowledgement codes the
        /// terminal answers with.
        #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
        #[repr(u16)]
        pub enum Command {
            $( $(#[$meta])* $variant = $code, )+
        }

        impl Command {
            /// Name used by the vendor protocol manual
            pub fn name(self) -> &'static str {
                match self {
                    $( Self::$variant => $name, )+
                }
            }
        }

        impl TryFrom<u16> for Command {
            type Error = Error;

            fn try_from(value: u16) -> Result<Self> {
                match value {
                    $( $code => Ok(Self::$variant), )+
                    _ => Err(Error::UnknownCommand(value)),
                }
            }
        }
    };
}

commands! {
    // Session
    Connect = 1000 => "CMD_CONNECT",
    Exit = 1001 => "CMD_EXIT",
    EnableDevice = 1002 => "CMD_ENABLEDEVICE",
    DisableDevice = 1003 => "CMD_DISABLEDEVICE",
    Restart = 1004 => "CMD_RESTART",
    PowerOff = 1005 => "CMD_POWEROFF",
    Sleep = 1006 => "CMD_SLEEP",
    Resume = 1007 => "CMD_RESUME",
    TestVoice = 1017 => "CMD_TESTVOICE",

    // Device information
    GetVersion = 1100 => "CMD_GET_VERSION",
    /// Vendor option query, payload is an ASCII key such as `~SerialNumber`
    OptionsRrq = 11 => "CMD_OPTIONS_RRQ",

    // Bulk transfer
    PrepareData = 1500 => "CMD_PREPARE_DATA",
    Data = 1501 => "CMD_DATA",
    FreeData = 1502 => "CMD_FREE_DATA",

    // Users and templates
    UserWrq = 8 => "CMD_USER_WRQ",
    UserTempRrq = 9 => "CMD_USERTEMP_RRQ",
    UserTempWrq = 10 => "CMD_USERTEMP_WRQ",
    ClearData = 14 => "CMD_CLEAR_DATA",
    DeleteUser = 18 => "CMD_DELETE_USER",
    DeleteUserTemp = 19 => "CMD_DELETE_USERTEMP",
    ClearAdmin = 20 => "CMD_CLEAR_ADMIN",

    // Attendance log
    AttLogRrq = 13 => "CMD_ATTLOG_RRQ",
    ClearAttLog = 15 => "CMD_CLEAR_ATTLOG",

    // Door relay
    /// Door control, payload `door_id + action + 0 + 0`
    Unlock = 31 => "CMD_UNLOCK",
    DoorStateRrq = 75 => "CMD_DOORSTATE_RRQ",

    // LCD
    WriteLcd = 66 => "CMD_WRITE_LCD",
    ClearLcd = 67 => "CMD_CLEAR_LCD",

    // Clock
    GetTime = 201 => "CMD_GET_TIME",
    SetTime = 202 => "CMD_SET_TIME",

    // Real-time events
    RegEvent = 500 => "CMD_REG_EVENT",

    // Acknowledgements (device to client)
    AckOk = 2000 => "CMD_ACK_OK",
    AckError = 2001 => "CMD_ACK_ERROR",
    AckData = 2002 => "CMD_ACK_DATA",
    AckRetry = 2003 => "CMD_ACK_RETRY",
    AckRepeat = 2004 => "CMD_ACK_REPEAT",
    AckUnauth = 2005 => "CMD_ACK_UNAUTH",
    AckUnknown = 0xFFFF => "CMD_ACK_UNKNOWN",
    AckErrorCmd = 0xFFFD => "CMD_ACK_ERROR_CMD",
    AckErrorInit = 0xFFFC => "CMD_ACK_ERROR_INIT",
    AckErrorData = 0xFFFB => "CMD_ACK_ERROR_DATA",
}

impl Command {
    /// Check if this is a request command (from PC to device)
    pub fn is_request(self) -> bool {
        !self.is_response()
    }

    /// Check if this is a response command (from device to PC)
    pub fn is_response(self) -> bool {
        matches!(
            self,
            Self::AckOk
                | Self::AckError
                | Self::AckData
                | Self::AckRetry
                | Self::AckRepeat
                | Self::AckUnauth
                | Self::AckUnknown
                | Self::AckErrorCmd
                | Self::AckErrorInit
                | Self::AckErrorData
        )
    }

    /// Check if this is a success response
    pub fn is_success(self) -> bool {
        matches!(self, Self::AckOk | Self::AckData | Self::PrepareData | Self::Data)
    }

    /// Check if the device refused the request
    pub fn is_error(self) -> bool {
        matches!(
            self,
            Self::AckError
                | Self::AckUnknown
                | Self::AckErrorCmd
                | Self::AckErrorInit
                | Self::AckErrorData
        )
    }
}

impl From<Command> for u16 {
    fn from(cmd: Command) -> u16 {
        cmd as u16
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name(), *self as u16)
    }
}
