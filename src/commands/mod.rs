//! Typed wrappers over known router commands

pub mod band_lock;
pub mod status;

pub use band_lock::{lock_band, BandLock};
pub use status::{device_status, DeviceStatus};
