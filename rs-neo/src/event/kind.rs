use std::fmt::{Display, Formatter};

/// Event severity, values match the C header.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Info = 0x10,
    Warning = 0x20,
    Error = 0x30,
}

impl Display for Severity {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Info => f.write_str("info"),
            Self::Warning => f.write_str("warning"),
            Self::Error => f.write_str("error"),
        }
    }
}

impl TryFrom<u8> for Severity {
    type Error = u8;
    fn try_from(value: u8) -> Result<Self, u8> {
        match value {
            0x10 => Ok(Self::Info),
            0x20 => Ok(Self::Warning),
            0x30 => Ok(Self::Error),
            v => Err(v),
        }
    }
}

macro_rules! event_types {
    ($($name:ident = $code:literal => $desc:literal,)+) => {
        /// Every condition the API can report, with the codes of the C header.
        #[repr(u32)]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum EventType {
            $($name = $code,)+
        }

        impl EventType {
            /// Human readable description of the event.
            pub fn description(&self) -> &'static str {
                match self {
                    $(Self::$name => $desc,)+
                }
            }

            #[inline]
            pub fn code(&self) -> u32 {
                *self as u32
            }
        }

        impl From<u32> for EventType {
            fn from(value: u32) -> Self {
                match value {
                    $($code => Self::$name,)+
                    _ => Self::Unknown,
                }
            }
        }
    };
}

event_types! {
    // API events
    InvalidNeoDevice = 0x1000 => "The provided device handle was invalid.",
    RequiredParameterNull = 0x1001 => "A required parameter was NULL.",
    BufferInsufficient = 0x1002 => "The provided buffer was insufficient. No data was written.",
    OutputTruncated = 0x1003 => "The output was too large for the provided buffer and has been truncated.",
    ParameterOutOfRange = 0x1004 => "A parameter was out of range.",
    DeviceCurrentlyOpen = 0x1005 => "The device is currently open.",
    DeviceCurrentlyClosed = 0x1006 => "The device is currently closed.",
    DeviceCurrentlyOnline = 0x1007 => "The device is currently online.",
    DeviceCurrentlyOffline = 0x1008 => "The device is currently offline.",
    DeviceCurrentlyPolling = 0x1009 => "The device is currently polling for messages.",
    DeviceNotCurrentlyPolling = 0x1010 => "The device is not currently polling for messages.",
    UnsupportedTXNetwork = 0x1011 => "Message network is not a supported TX network.",
    MessageMaxLengthExceeded = 0x1012 => "The message was too long.",
    ValueNotYetPresent = 0x1013 => "The value is not yet present.",
    Timeout = 0x1014 => "The timeout was reached.",
    WiVINotSupported = 0x1015 => "Wireless neoVI functions are not supported on this device.",

    // Device events
    PollingMessageOverflow = 0x2000 => "Too many messages have been received for the polling message buffer, some have been lost!",
    NoSerialNumber = 0x2001 => "Communication could not be established with the device. Perhaps it is not powered with 12 volts?",
    IncorrectSerialNumber = 0x2002 => "The device did not return the expected serial number!",
    SettingsReadError = 0x2003 => "The device settings could not be read.",
    SettingsVersionError = 0x2004 => "The settings version is incorrect, please update your firmware with neoVI Explorer.",
    SettingsLengthError = 0x2005 => "The settings length is incorrect, please update your firmware with neoVI Explorer.",
    SettingsChecksumError = 0x2006 => "The settings checksum is incorrect, attempting to set defaults may remedy this issue.",
    SettingsNotAvailable = 0x2007 => "Settings are not available for this device.",
    SettingsReadOnly = 0x2008 => "Settings are read-only for this device.",
    CANSettingsNotAvailable = 0x2009 => "CAN settings are not available for this device.",
    CANFDSettingsNotAvailable = 0x2010 => "CANFD settings are not available for this device.",
    LSFTCANSettingsNotAvailable = 0x2011 => "LSFTCAN settings are not available for this device.",
    SWCANSettingsNotAvailable = 0x2012 => "SWCAN settings are not available for this device.",
    BaudrateNotFound = 0x2013 => "The baudrate was not found.",
    UnexpectedNetworkType = 0x2014 => "The network type was not found.",
    DeviceFirmwareOutOfDate = 0x2015 => "The device firmware is out of date. New API functionality may not be supported.",
    SettingsStructureMismatch = 0x2016 => "The settings structure does not match the expected size for this device.",
    SettingsStructureTruncated = 0x2017 => "The settings structure was truncated.",
    NoDeviceResponse = 0x2018 => "Expected a response from the device but none were found.",
    MessageFormattingError = 0x2019 => "The message was not properly formed.",
    CANFDNotSupported = 0x2020 => "This device does not support CANFD.",
    RTRNotSupported = 0x2021 => "RTR is not supported with CANFD.",
    DeviceDisconnected = 0x2022 => "The device was disconnected.",
    OnlineNotSupported = 0x2023 => "This device does not support going online.",
    TerminationNotSupportedDevice = 0x2024 => "This device does not support software selectable termination.",
    TerminationNotSupportedNetwork = 0x2025 => "This network does not support software selectable termination on this device.",
    AnotherInTerminationGroupEnabled = 0x2026 => "A mutually exclusive network already has termination enabled.",
    NoSerialNumberFW = 0x2027 => "Communication could not be established with the device. A firmware update was already attempted.",
    NoSerialNumber12V = 0x2028 => "Communication could not be established with the device. Perhaps it is not powered with 12 volts?",
    NoSerialNumberFW12V = 0x2029 => "Communication could not be established with the device. A firmware update was already attempted, perhaps it is not powered with 12 volts?",
    EthPhyRegisterControlNotAvailable = 0x2030 => "Ethernet PHY register control is not available for this device.",
    DiskNotSupported = 0x2031 => "This device does not support accessing the specified disk.",
    EOFReached = 0x2032 => "The requested length exceeds the available data from this disk.",
    SettingsDefaultsUsed = 0x2033 => "The device settings could not be loaded, the default settings have been applied.",
    AtomicOperationRetried = 0x2034 => "An operation failed to be atomically completed, but will be retried.",
    AtomicOperationCompletedNonatomically = 0x2035 => "An ideally-atomic operation was completed nonatomically.",
    WiVIStackRefreshFailed = 0x2036 => "The Wireless neoVI stack encountered a communication error.",
    WiVIUploadStackOverflow = 0x2037 => "The Wireless neoVI upload stack has encountered an overflow condition.",
    I2CMessageExceedsMaxLength = 0x2038 => "The I2C message was too long.",

    // Transport events
    FailedToRead = 0x3000 => "A read operation failed.",
    FailedToWrite = 0x3001 => "A write operation failed.",
    DriverFailedToOpen = 0x3002 => "The device driver encountered a low-level error while opening the device.",
    DriverFailedToClose = 0x3003 => "The device driver encountered a low-level error while closing the device.",
    PacketChecksumError = 0x3004 => "There was a checksum error while decoding a packet. The packet was dropped.",
    TransmitBufferFull = 0x3005 => "The transmit buffer is full and the device is set to non-blocking.",
    DeviceInUse = 0x3006 => "The device is currently in use by another program.",
    PCAPCouldNotStart = 0x3102 => "The PCAP driver could not be started. Ethernet devices will not be found.",
    PCAPCouldNotFindDevices = 0x3103 => "The PCAP driver failed to find devices. Ethernet devices will not be found.",
    PacketDecodingError = 0x3104 => "There was an error decoding a packet from the device.",

    NoErrorFound = 0xFFFF_FFFD => "No errors were found.",
    TooManyEvents = 0xFFFF_FFFE => "Too many events have occurred. The list has been truncated.",
    Unknown = 0xFFFF_FFFF => "An unknown internal error occurred.",
}

impl Display for EventType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}(0x{:04X}): {}", self, self.code(), self.description())
    }
}
