/// The max sizeof can-frame's data.
pub const MAX_FRAME_SIZE: usize = 8;
/// The max sizeof canfd-frame's data.
pub const MAX_FD_FRAME_SIZE: usize = 64;

/// Pause between attempts of a blocking write on a full transmit buffer, in milliseconds.
pub(crate) const TRANSMIT_RETRY_MS: u64 = 1;

/// Default number of messages held by a device's polling buffer.
pub const DEFAULT_POLLING_MESSAGE_LIMIT: usize = 20_000;
/// Default number of events held before `TooManyEvents` is flagged.
pub const DEFAULT_EVENT_LIMIT: usize = 10_000;
/// Event limits must be strictly greater than this value.
pub const MIN_EVENT_LIMIT: usize = 10;

/// Serial numbers are always 6 characters or fewer.
pub const SERIAL_LENGTH: usize = 6;
/// The smallest serial number that is rendered in base-36 (`0A0000`).
pub const MIN_BASE36_SERIAL: u32 = 16_796_160;
/// The largest serial number representable in 6 base-36 digits (`ZZZZZZ`).
pub const MAX_SERIAL: u32 = 2_176_782_335;
/// Numeric serial numbers above this value do not fit in 6 decimal digits.
pub const MAX_DECIMAL_SERIAL: u32 = 999_999;

/// Returned by `add_message_callback` when the device is invalid.
pub const INVALID_CALLBACK_ID: i32 = -1;

pub(crate) const NEO_ENV: &str = "neo.env";
pub(crate) const NEO_CONFIG_VAR: &str = "NEO_CONFIG";
pub(crate) const NEO_CONFIG_DEFAULT: &str = "neo.cfg.yaml";
