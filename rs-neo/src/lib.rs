//! **`rs-neo`**, the core of a vehicle-network interface library.
//!
//! Devices are discovered and driven through [`NeoApi`]. Received traffic lands in
//! a bounded polling buffer per device and is handed to message callbacks; every
//! condition the library or a device raises is recorded as an [`Event`].
//! Hardware access lives behind the [`DeviceFinder`] and [`DeviceDriver`] traits.

mod constants;
pub use constants::*;
mod serial;
pub use serial::*;
mod network;
pub use network::*;
mod message;
pub use message::*;
mod device;
pub use device::*;
mod event;
pub use event::*;
mod callback;
pub use callback::*;
mod driver;
pub use driver::*;
mod api;
pub use api::*;

pub mod config;
pub use config::{NeoConfig, Version};
pub mod error;
pub use error::{NeoError, NeoResult};
pub mod queue;
pub mod raw;
pub mod utils;

mod registry;
mod settings;
