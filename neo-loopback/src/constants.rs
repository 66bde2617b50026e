pub(crate) const LOOPBACK_ENV: &str = "loopback.env";
pub(crate) const LOOPBACK_CONFIG_VAR: &str = "NEO_LOOPBACK_CONFIG";
pub(crate) const LOOPBACK_CONFIG_DEFAULT: &str = "loopback.cfg.yaml";

/// Version tag at the head of the settings structure.
pub const SETTINGS_VERSION: u16 = 1;
/// Settings structure header: version and total length.
pub const SETTINGS_HEADER_SIZE: usize = 4;
/// Per CAN network block: netid, termination, reserved, baudrate, FD baudrate.
pub const SETTINGS_CHANNEL_SIZE: usize = 12;

pub const DEFAULT_BAUDRATE: u32 = 500_000;
pub const DEFAULT_FD_BAUDRATE: u32 = 2_000_000;

pub const BAUDRATES: [u32; 11] = [
    10_000, 20_000, 33_333, 50_000, 62_500, 83_333, 125_000, 250_000, 500_000, 800_000, 1_000_000,
];
pub const FD_BAUDRATES: [u32; 6] = [1_000_000, 2_000_000, 4_000_000, 5_000_000, 8_000_000, 10_000_000];

pub const DEFAULT_TX_BUFFER: usize = 1024;
pub const DEFAULT_TIMESTAMP_RESOLUTION: u16 = 25;
/// Idle poll interval of the echo worker.
pub(crate) const WORKER_INTERVAL_MS: u64 = 10;
