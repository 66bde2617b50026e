//! **`neo-loopback`**, an in-process device driver for `rs-neo`.
//!
//! Each simulated device echoes every transmitted frame back as received traffic
//! and keeps its settings structure in memory across open and close.

mod config;
pub use config::*;
mod constants;
pub use constants::*;
mod device;
pub use device::{Injector, LoopbackDevice};
mod finder;
pub use finder::*;
mod settings;
pub use settings::*;
