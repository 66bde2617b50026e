use std::fmt::{Display, Formatter};
use serde::{Deserialize, Serialize};

/// Network type, values match the C header.
#[repr(u8)]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
pub enum NetworkType {
    #[default]
    Invalid = 0,
    /// Statuses that are never transferred to the client application.
    Internal = 1,
    Can = 2,
    Lin = 3,
    FlexRay = 4,
    Most = 5,
    Ethernet = 6,
    LsftCan = 7,
    SwCan = 8,
    Iso9141 = 9,
    I2c = 10,
    /// Only used as a filter flag.
    Any = 0xFE,
    Other = 0xFF,
}

impl From<u8> for NetworkType {
    fn from(value: u8) -> Self {
        match value {
            1 => Self::Internal,
            2 => Self::Can,
            3 => Self::Lin,
            4 => Self::FlexRay,
            5 => Self::Most,
            6 => Self::Ethernet,
            7 => Self::LsftCan,
            8 => Self::SwCan,
            9 => Self::Iso9141,
            10 => Self::I2c,
            0xFE => Self::Any,
            0xFF => Self::Other,
            _ => Self::Invalid,
        }
    }
}

macro_rules! net_ids {
    ($($name:ident = $value:literal,)+) => {
        impl NetId {
            $(pub const $name: Self = Self($value);)+

            /// Symbolic name of a known network id.
            pub fn name(&self) -> Option<&'static str> {
                match self.0 {
                    $($value => Some(stringify!($name)),)+
                    _ => None,
                }
            }
        }
    };
}

/// Logical channel identifier within a device.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
#[serde(transparent)]
pub struct NetId(pub u16);

impl Default for NetId {
    #[inline]
    fn default() -> Self {
        Self::INVALID
    }
}

net_ids! {
    DEVICE = 0,
    HSCAN = 1,
    MSCAN = 2,
    SWCAN = 3,
    LSFTCAN = 4,
    FORDSCP = 5,
    J1708 = 6,
    AUX = 7,
    J1850VPW = 8,
    ISO9141 = 9,
    ISOPIC = 10,
    MAIN51 = 11,
    RED = 12,
    SCI = 13,
    ISO9141_2 = 14,
    ISO14230 = 15,
    LIN = 16,
    OP_ETHERNET1 = 17,
    OP_ETHERNET2 = 18,
    OP_ETHERNET3 = 19,
    RED_EXT_MEMORYREAD = 20,
    RED_INT_MEMORYREAD = 21,
    RED_DFLASH_READ = 22,
    NEOMEMORY_SD_READ = 23,
    CAN_ERRBITS = 24,
    NEOMEMORY_WRITE_DONE = 25,
    RED_WAVE_CAN1_LOGICAL = 26,
    RED_WAVE_CAN2_LOGICAL = 27,
    RED_WAVE_LIN1_LOGICAL = 28,
    RED_WAVE_LIN2_LOGICAL = 29,
    RED_WAVE_LIN1_ANALOG = 30,
    RED_WAVE_LIN2_ANALOG = 31,
    RED_WAVE_MISC_ANALOG = 32,
    RED_WAVE_MISCDIO2_LOGICAL = 33,
    RED_NETWORK_COM_ENABLE_EX = 34,
    RED_NEOVI_NETWORK = 35,
    RED_READ_BAUD_SETTINGS = 36,
    RED_OLDFORMAT = 37,
    RED_SCOPE_CAPTURE = 38,
    RED_HARDWARE_EXCEP = 39,
    RED_GET_RTC = 40,
    ISO9141_3 = 41,
    HSCAN2 = 42,
    HSCAN3 = 44,
    OP_ETHERNET4 = 45,
    OP_ETHERNET5 = 46,
    ISO9141_4 = 47,
    LIN2 = 48,
    LIN3 = 49,
    LIN4 = 50,
    RED_APP_ERROR = 52,
    CGI = 53,
    RESET_STATUS = 54,
    FB_STATUS = 55,
    APP_SIGNAL_STATUS = 56,
    READ_DATALINK_CM_TX_MSG = 57,
    READ_DATALINK_CM_RX_MSG = 58,
    LOGGING_OVERFLOW = 59,
    READ_SETTINGS = 60,
    HSCAN4 = 61,
    HSCAN5 = 62,
    RS232 = 63,
    UART = 64,
    UART2 = 65,
    UART3 = 66,
    UART4 = 67,
    SWCAN2 = 68,
    ETHERNET_DAQ = 69,
    DATA_TO_HOST = 70,
    TEXTAPI_TO_HOST = 71,
    OP_ETHERNET6 = 73,
    RED_VBAT = 74,
    OP_ETHERNET7 = 75,
    OP_ETHERNET8 = 76,
    OP_ETHERNET9 = 77,
    OP_ETHERNET10 = 78,
    OP_ETHERNET11 = 79,
    FLEXRAY1A = 80,
    FLEXRAY1B = 81,
    FLEXRAY2A = 82,
    FLEXRAY2B = 83,
    LIN5 = 84,
    FLEXRAY = 85,
    FLEXRAY2 = 86,
    OP_ETHERNET12 = 87,
    I2C = 88,
    MOST25 = 90,
    MOST50 = 91,
    MOST150 = 92,
    ETHERNET = 93,
    GMFSA = 94,
    TCP = 95,
    HSCAN6 = 96,
    HSCAN7 = 97,
    LIN6 = 98,
    LSFTCAN2 = 99,
    LOGICAL_DISK_INFO = 187,
    WIVI_COMMAND = 221,
    SCRIPT_STATUS = 224,
    ETH_PHY_CONTROL = 239,
    EXTENDED_COMMAND = 240,
    FLEXRAY_CONTROL = 243,
    COREMINI_PRELOAD = 244,
    HW_COM_LATENCY_TEST = 512,
    DEVICE_STATUS = 513,
    UDP = 514,
    FORWARDED_MESSAGE = 516,
    I2C2 = 517,
    I2C3 = 518,
    I2C4 = 519,
    ETHERNET2 = 520,
    ANY = 0xFFFE,
    INVALID = 0xFFFF,
}

impl NetId {
    /// The network type carried on this network id.
    pub fn network_type(&self) -> NetworkType {
        match *self {
            Self::HSCAN | Self::MSCAN | Self::HSCAN2 | Self::HSCAN3 | Self::HSCAN4
            | Self::HSCAN5 | Self::HSCAN6 | Self::HSCAN7 => NetworkType::Can,
            Self::LSFTCAN | Self::LSFTCAN2 => NetworkType::LsftCan,
            Self::SWCAN | Self::SWCAN2 => NetworkType::SwCan,
            Self::LIN | Self::LIN2 | Self::LIN3 | Self::LIN4 | Self::LIN5
            | Self::LIN6 => NetworkType::Lin,
            Self::FLEXRAY | Self::FLEXRAY2 | Self::FLEXRAY1A | Self::FLEXRAY1B
            | Self::FLEXRAY2A | Self::FLEXRAY2B => NetworkType::FlexRay,
            Self::MOST25 | Self::MOST50 | Self::MOST150 => NetworkType::Most,
            Self::ETHERNET | Self::ETHERNET2 | Self::ETHERNET_DAQ | Self::OP_ETHERNET1
            | Self::OP_ETHERNET2 | Self::OP_ETHERNET3 | Self::OP_ETHERNET4 | Self::OP_ETHERNET5
            | Self::OP_ETHERNET6 | Self::OP_ETHERNET7 | Self::OP_ETHERNET8 | Self::OP_ETHERNET9
            | Self::OP_ETHERNET10 | Self::OP_ETHERNET11 | Self::OP_ETHERNET12 => NetworkType::Ethernet,
            Self::ISO9141 | Self::ISO9141_2 | Self::ISO9141_3 | Self::ISO9141_4 => NetworkType::Iso9141,
            Self::I2C | Self::I2C2 | Self::I2C3 | Self::I2C4 => NetworkType::I2c,
            Self::DEVICE | Self::RED | Self::MAIN51 | Self::RED_EXT_MEMORYREAD
            | Self::RED_INT_MEMORYREAD | Self::RED_DFLASH_READ | Self::NEOMEMORY_SD_READ
            | Self::CAN_ERRBITS | Self::NEOMEMORY_WRITE_DONE | Self::RED_GET_RTC
            | Self::RED_APP_ERROR | Self::RESET_STATUS | Self::READ_SETTINGS
            | Self::LOGICAL_DISK_INFO | Self::WIVI_COMMAND | Self::SCRIPT_STATUS
            | Self::ETH_PHY_CONTROL | Self::EXTENDED_COMMAND | Self::FLEXRAY_CONTROL
            | Self::COREMINI_PRELOAD | Self::HW_COM_LATENCY_TEST | Self::DEVICE_STATUS => NetworkType::Internal,
            Self::ANY => NetworkType::Any,
            Self::INVALID => NetworkType::Invalid,
            _ => NetworkType::Other,
        }
    }

    #[inline]
    pub fn is_valid(&self) -> bool {
        *self != Self::INVALID && *self != Self::ANY
    }
}

impl From<u16> for NetId {
    #[inline]
    fn from(value: u16) -> Self {
        Self(value)
    }
}

impl Display for NetId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.name() {
            Some(name) => f.write_str(name),
            None => write!(f, "NetId({})", self.0),
        }
    }
}

/// Pick the `number`-th (starting from 1) network of `r#type` out of `networks`.
///
/// Lets clients enumerate networks without knowing the device: the second CAN
/// network of one device may be `HSCAN2` while on another it is `MSCAN`.
pub fn network_by_number(networks: &[NetId], r#type: NetworkType, number: u32) -> NetId {
    if number == 0 {
        return NetId::INVALID;
    }

    networks.iter()
        .filter(|n| r#type == NetworkType::Any || n.network_type() == r#type)
        .nth(number as usize - 1)
        .copied()
        .unwrap_or(NetId::INVALID)
}
