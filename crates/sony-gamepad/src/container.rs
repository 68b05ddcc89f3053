use std::collections::BTreeMap;

use sony_gamepad_sys::GamepadDevice;
use tracing::{debug, info, instrument, warn};

use crate::{Backend, DeviceContext, GamepadError, HidapiBackend, ManagerSettings, Result};

/// Opened controllers, keyed by controller id.
///
/// Ids are the discovery index of the device, so a controller that comes
/// back after a disconnection gets its id again when it keeps its place in
/// the enumeration.
pub struct DeviceContainer<B = HidapiBackend> {
    backend: B,
    instances: BTreeMap<u32, Box<dyn GamepadDevice>>,
    max_controllers: usize,
    read_timeout: i32,
}

impl<B: Backend> DeviceContainer<B> {
    pub fn new(backend: B, settings: &ManagerSettings) -> DeviceContainer<B> {
        DeviceContainer {
            backend,
            instances: BTreeMap::new(),
            max_controllers: settings.max_controllers,
            read_timeout: settings.read_timeout_ms(),
        }
    }

    /// Applies to the controllers opened from now on.
    pub fn configure(&mut self, settings: &ManagerSettings) {
        self.max_controllers = settings.max_controllers;
        self.read_timeout = settings.read_timeout_ms();
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// Drops every instance and opens all the controllers plugged in.
    ///
    /// Opens nothing when more than `max_controllers` are found.
    #[instrument(level = "info", skip(self), err)]
    pub fn create_library_instances(&mut self) -> Result<usize> {
        self.remove_all_library_instances();
        let contexts = self.backend.find_devices()?;
        if contexts.is_empty() {
            warn!("no controller found");
            return Ok(0);
        }
        if contexts.len() > self.max_controllers {
            warn!(
                found = contexts.len(),
                max = self.max_controllers,
                "too many controllers"
            );
            return Ok(0);
        }
        for (id, context) in contexts.iter().enumerate() {
            let id = id as u32;
            match self.open(id, context) {
                Ok(Some(device)) => {
                    self.instances.insert(id, device);
                }
                Ok(None) => debug!(?context, "skipping device"),
                Err(e) => warn!(error = %e, ?context, "failed to open device"),
            }
        }
        info!(count = self.instances.len(), "controllers ready");
        Ok(self.instances.len())
    }

    fn create_library_instance(&mut self, id: u32) -> Result<bool> {
        let contexts = self.backend.find_devices()?;
        let context = match contexts.get(id as usize) {
            Some(context) => context,
            None => return Ok(false),
        };
        match self.open(id, context)? {
            Some(device) => {
                self.instances.insert(id, device);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn open(&mut self, id: u32, context: &DeviceContext) -> Result<Option<Box<dyn GamepadDevice>>> {
        let mut device = match self.backend.open(context)? {
            Some(device) => device,
            None => return Ok(None),
        };
        if !device.is_connected() {
            return Ok(None);
        }
        device.set_controller_id(id);
        device.set_read_timeout(self.read_timeout);
        device.initialize()?;
        Ok(Some(device))
    }

    /// The connected controller at `id`.
    pub fn library_instance(&mut self, id: u32) -> Result<&mut (dyn GamepadDevice + 'static)> {
        match self.instances.get_mut(&id) {
            Some(device) if device.is_connected() => Ok(&mut **device),
            Some(_) => Err(GamepadError::Disconnected(id)),
            None => Err(GamepadError::NotFound(id)),
        }
    }

    /// Only returns connected controllers.
    pub fn get_library_instance(&mut self, id: u32) -> Option<&mut (dyn GamepadDevice + 'static)> {
        self.library_instance(id).ok()
    }

    /// Like [`Self::get_library_instance`], but a disconnected or missing
    /// controller is looked up again at its discovery index.
    #[instrument(level = "debug", skip(self), err)]
    pub fn get_library_or_reconnect(
        &mut self,
        id: u32,
    ) -> Result<Option<&mut (dyn GamepadDevice + 'static)>> {
        if self.instances.get(&id).map_or(false, |d| !d.is_connected()) {
            self.remove_library_instance(id);
        }
        if !self.instances.contains_key(&id) {
            if !self.create_library_instance(id)? {
                return Ok(None);
            }
            info!(controller_id = id, "controller reconnected");
        }
        // Moving `self` makes the `#[instrument(err)]` closure `FnOnce`, so
        // the returned borrow can outlive it.
        let this = self;
        Ok(this.get_library_instance(id))
    }

    pub fn remove_library_instance(&mut self, id: u32) -> bool {
        match self.instances.remove(&id) {
            Some(mut device) => {
                device.shutdown();
                true
            }
            None => false,
        }
    }

    pub fn remove_all_library_instances(&mut self) {
        for (_, mut device) in std::mem::take(&mut self.instances) {
            device.shutdown();
        }
    }

    pub fn allocated_devices(&self) -> usize {
        self.instances.len()
    }

    /// Every allocated id, connected or not, in increasing order.
    pub fn controller_ids(&self) -> Vec<u32> {
        self.instances.keys().copied().collect()
    }

    pub(crate) fn instances_mut(
        &mut self,
    ) -> impl Iterator<Item = (u32, &mut (dyn GamepadDevice + 'static))> + '_ {
        self.instances
            .iter_mut()
            .map(|(id, device)| (*id, &mut **device))
    }
}
