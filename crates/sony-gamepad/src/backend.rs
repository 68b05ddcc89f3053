//! Where controllers come from.
//!
//! The container only sees this trait, so it can run on something other
//! than a live [`HidApi`].

use hidapi::HidApi;
use sony_gamepad_sys::GamepadDevice;

use crate::{discovery, open_gamepad, DeviceContext, Result};

pub trait Backend {
    /// Enumerates the supported controllers, in a stable order.
    fn find_devices(&mut self) -> Result<Vec<DeviceContext>>;
    /// `Ok(None)` when the device went away.
    fn open(&mut self, context: &DeviceContext) -> Result<Option<Box<dyn GamepadDevice>>>;
}

pub struct HidapiBackend {
    api: HidApi,
}

impl HidapiBackend {
    pub fn new() -> Result<HidapiBackend> {
        Ok(HidapiBackend {
            api: HidApi::new()?,
        })
    }

    pub fn api(&self) -> &HidApi {
        &self.api
    }
}

impl Backend for HidapiBackend {
    fn find_devices(&mut self) -> Result<Vec<DeviceContext>> {
        self.api.refresh_devices()?;
        Ok(discovery::find_devices(&self.api))
    }

    fn open(&mut self, context: &DeviceContext) -> Result<Option<Box<dyn GamepadDevice>>> {
        match self
            .api
            .device_list()
            .find(|info| info.path() == context.path.as_c_str())
        {
            Some(info) => open_gamepad(&self.api, info).map(Some),
            None => Ok(None),
        }
    }
}
