//! Sony controllers over HID.
//!
//! [`DeviceContainer`] owns the opened controllers keyed by controller id,
//! [`DeviceManager`] polls them and forwards input to a [`MessageHandler`],
//! and [`proxy`] exposes range-checked calls for a host application.

mod error;

pub mod backend;
pub mod container;
pub mod discovery;
pub mod handler;
pub mod manager;
pub mod proxy;
pub mod settings;
#[cfg(test)]
mod testing;

use dualsense::DualSenseDriver;
use dualshock::DS4Driver;
use hidapi::{DeviceInfo, HidApi};
use sony_gamepad_sys::{GamepadDevice, GamepadDriver};

pub use sony_gamepad_sys as sys;

pub use backend::{Backend, HidapiBackend};
pub use container::DeviceContainer;
pub use discovery::{find_devices, DeviceContext};
pub use error::*;
pub use handler::{ConnectionState, MessageHandler};
pub use manager::DeviceManager;
pub use settings::{ManagerSetting, ManagerSettings};

/// Opens the device with the first driver accepting it.
pub fn open_gamepad(
    api: &HidApi,
    device_info: &DeviceInfo,
) -> Result<Box<dyn GamepadDevice + 'static>> {
    let mut drivers: Vec<Box<dyn GamepadDriver>> =
        vec![Box::new(DualSenseDriver), Box::new(DS4Driver)];
    for driver in drivers.drain(..) {
        if let Some(device) = driver.init(api, device_info)? {
            return Ok(device);
        }
    }
    Err(GamepadError::UnsupportedDevice {
        vendor: device_info.vendor_id(),
        product: device_info.product_id(),
    })
}
