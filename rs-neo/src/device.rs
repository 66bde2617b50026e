use std::fmt::{Display, Formatter};
use derive_getters::Getters;
use serde::{Deserialize, Serialize};

use crate::{EventType, NeoError, Serial};

macro_rules! device_types {
    ($($name:ident = $code:literal => $product:literal,)+) => {
        /// Hardware family tag, codes match the C header.
        #[repr(u32)]
        #[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
        pub enum DeviceType {
            #[default]
            Unknown = 0x0000_0000,
            $($name = $code,)+
        }

        impl DeviceType {
            /// Friendly product name of the family.
            pub fn product_name(&self) -> &'static str {
                match self {
                    Self::Unknown => "Unknown",
                    $(Self::$name => $product,)+
                }
            }

            #[inline]
            pub fn code(&self) -> u32 {
                *self as u32
            }
        }

        impl From<u32> for DeviceType {
            fn from(value: u32) -> Self {
                match value {
                    $($code => Self::$name,)+
                    _ => Self::Unknown,
                }
            }
        }
    };
}

device_types! {
    Blue = 0x0000_0001 => "neoVI BLUE",
    EcuAvb = 0x0000_0002 => "ECU AVB/TSN",
    RadSupermoon = 0x0000_0003 => "RAD-Supermoon",
    DwVcan = 0x0000_0004 => "DW_VCAN",
    RadMoon2 = 0x0000_0005 => "RAD-Moon 2",
    RadMars = 0x0000_0006 => "RAD-Mars",
    Vcan41 = 0x0000_0007 => "ValueCAN 4-1",
    Fire = 0x0000_0008 => "neoVI FIRE",
    RadPluto = 0x0000_0009 => "RAD-Pluto",
    Vcan42El = 0x0000_000a => "ValueCAN 4-2EL",
    RadIoCanHub = 0x0000_000b => "RAD-IO2 CANHub",
    NeoEcu12 = 0x0000_000c => "neoECU 12",
    Obd2LcBadge = 0x0000_000d => "neoOBD2 LC BADGE",
    RadMoonDuo = 0x0000_000e => "RAD-Moon Duo",
    Fire3 = 0x0000_000f => "neoVI FIRE 3",
    Vcan3 = 0x0000_0010 => "ValueCAN 3",
    RadJupiter = 0x0000_0011 => "RAD-Jupiter",
    Vcan4Ind = 0x0000_0012 => "ValueCAN 4 Industrial",
    RadGigastar = 0x0000_0013 => "RAD-Gigastar",
    Red2 = 0x0000_0014 => "neoVI RED 2",
    EtherBadge = 0x0000_0016 => "EtherBADGE",
    RadEpsilon = 0x0000_0018 => "RAD-Epsilon",
    Red = 0x0000_0040 => "neoVI RED",
    Ecu = 0x0000_0080 => "neoECU",
    Ievb = 0x0000_0100 => "IEVB",
    Pendant = 0x0000_0200 => "Pendant",
    Obd2Pro = 0x0000_0400 => "neoOBD2 PRO",
    EcuChipUart = 0x0000_0800 => "neoECU Chip UART",
    Plasma = 0x0000_1000 => "neoVI PLASMA",
    NeoAnalog = 0x0000_4000 => "NEOAnalog",
    CtObd = 0x0000_8000 => "CT_OBD",
    Ion = 0x0004_0000 => "neoVI ION",
    RadStar = 0x0008_0000 => "RADStar",
    Vcan44 = 0x0020_0000 => "ValueCAN 4-4",
    Vcan42 = 0x0040_0000 => "ValueCAN 4-2",
    CmProbe = 0x0080_0000 => "CMProbe",
    Eevb = 0x0100_0000 => "Intrepid Ethernet Evaluation Board",
    VcanRf = 0x0200_0000 => "ValueCAN.rf",
    Fire2 = 0x0400_0000 => "neoVI FIRE 2",
    Flex = 0x0800_0000 => "neoVI Flex",
    RadGalaxy = 0x1000_0000 => "RAD-Galaxy",
    RadStar2 = 0x2000_0000 => "RAD-Star 2",
    VividCan = 0x4000_0000 => "VividCAN",
    Obd2Sim = 0x8000_0000 => "neoOBD2 SIM",
}

impl Display for DeviceType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.product_name())
    }
}

/// Digital IO kinds, values match the C header.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum IoType {
    EthActivation = 0,
    UsbHostPower = 1,
    BackupPowerEnable = 2,
    BackupPowerGood = 3,
    Misc = 4,
    EMisc = 5,
}

impl TryFrom<u32> for IoType {
    type Error = NeoError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::EthActivation),
            1 => Ok(Self::UsbHostPower),
            2 => Ok(Self::BackupPowerEnable),
            3 => Ok(Self::BackupPowerGood),
            4 => Ok(Self::Misc),
            5 => Ok(Self::EMisc),
            _ => Err(NeoError::Api(EventType::ParameterOutOfRange)),
        }
    }
}

/// Refers to one discovered device.
///
/// Handles are cheap to copy. Once the device is closed, or dropped by a new
/// discovery before being opened, every copy of the handle becomes invalid and
/// is rejected with `InvalidNeoDevice`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Getters)]
pub struct DeviceHandle {
    #[getter(skip)]
    pub(crate) index: u32,
    #[getter(skip)]
    pub(crate) generation: u32,
    #[getter(copy)]
    device_type: DeviceType,
    #[getter(copy)]
    serial: Serial,
}

impl DeviceHandle {
    pub(crate) fn new(index: u32, generation: u32, device_type: DeviceType, serial: Serial) -> Self {
        Self { index, generation, device_type, serial }
    }

    /// `"<product name> <serial>"`, e.g. `neoVI FIRE 2 CY2285`.
    pub fn describe(&self) -> String {
        format!("{} {}", self.device_type.product_name(), self.serial)
    }
}

impl Display for DeviceHandle {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.device_type.product_name(), self.serial)
    }
}

/// Lifecycle flags of an opened or discovered device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct DeviceState {
    pub(crate) open: bool,
    pub(crate) online: bool,
    pub(crate) write_blocks: bool,
}

impl DeviceState {
    pub(crate) fn new(write_blocks: bool) -> Self {
        Self { open: false, online: false, write_blocks }
    }
}
