//! AT command vocabulary and vendor command tables
//!
//! Reference: USR 5637 user guide, command reference section. Conexant
//! (Zoom 3095) chipsets differ only in the entries of [`CommandTable`].

pub const AT: &str = "AT";
pub const RESET: &str = "ATZ";
pub const GET_PRODUCT_CODE: &str = "ATI0";
pub const GET_FIRMWARE_ID: &str = "ATI3";
pub const GET_PATCH_LEVEL_CONEXANT: &str = "AT-PV";
pub const GET_SETTINGS: &str = "AT&V";
pub const SAVE_PROFILE: &str = "AT&W0";
pub const DISABLE_ECHO: &str = "ATE0";
pub const ENABLE_VERBOSE_CODES: &str = "ATV1";
pub const ENTER_VOICE_MODE: &str = "AT+FCLASS=8";
pub const ENTER_VOICE_RECEIVE_STATE: &str = "AT+VRX";
pub const ENTER_VOICE_TRANSMIT_STATE: &str = "AT+VTX";
/// 1.2 second beep
pub const SEND_BEEP: &str = "AT+VTS=[900,900,120]";
/// Telephone answering device off-hook, connected to telco
pub const TAD_OFF_HOOK: &str = "AT+VLS=1";
pub const GO_ON_HOOK: &str = "ATH0";

/// `<DLE><ETX>`: end of voice transmit data
pub const END_VOICE_TX: &str = "\u{10}\u{3}";
/// `<DLE>!`: end of voice receive data
pub const END_VOICE_RX: &str = "\u{10}!";

pub const OK: &str = "OK";
pub const CONNECT: &str = "CONNECT";
pub const ERROR: &str = "ERROR";

/// Product code reported by `ATI0` on a USR 5637
const USR_PRODUCT_CODE: &str = "5601";
/// Product code reported by `ATI0` on Conexant based modems
const CONEXANT_PRODUCT_CODE: &str = "56000";

/// Modem chipset family
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Vendor {
    /// US Robotics 5637
    UsRobotics,
    /// Conexant chipset (Zoom 3095 and friends)
    Conexant,
    /// Unrecognised product code that accepted voice mode
    Unknown,
}

impl Vendor {
    /// Identify the vendor from an `ATI0` response
    ///
    /// Returns `None` when the product code is not one of the known ones.
    #[must_use]
    pub fn from_product_code(response: &str) -> Option<Self> {
        if response.contains(CONEXANT_PRODUCT_CODE) {
            Some(Self::Conexant)
        } else if response.contains(USR_PRODUCT_CODE) {
            Some(Self::UsRobotics)
        } else {
            None
        }
    }

    /// The command table to use with this vendor
    #[must_use]
    pub const fn commands(self) -> CommandTable {
        match self {
            Self::Conexant => CommandTable::CONEXANT,
            Self::UsRobotics | Self::Unknown => CommandTable::USR,
        }
    }
}

impl std::fmt::Display for Vendor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UsRobotics => write!(f, "USR"),
            Self::Conexant => write!(f, "CONEXANT"),
            Self::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

/// Commands whose syntax differs between chipsets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandTable {
    /// 8-bit linear, 8 kHz
    pub set_compression: &'static str,
    pub disable_silence_detection: &'static str,
    pub silence_detection_5s: &'static str,
    pub silence_detection_10s: &'static str,
    pub enable_caller_id: &'static str,
}

impl CommandTable {
    pub const USR: Self = Self {
        set_compression: "AT+VSM=128,8000",
        disable_silence_detection: "AT+VSD=128,0",
        silence_detection_5s: "AT+VSD=128,50",
        silence_detection_10s: "AT+VSD=128,100",
        enable_caller_id: "AT+VCID=1",
    };

    pub const CONEXANT: Self = Self {
        // 1 = 8-bit unsigned pcm
        set_compression: "AT+VSM=1,8000,0,0",
        disable_silence_detection: "AT+VSD=0,0",
        silence_detection_5s: "AT+VSD=0,50",
        silence_detection_10s: "AT+VSD=0,100",
        enable_caller_id: "AT-SCID=1;+VCID=1;-STE=3",
    };
}
