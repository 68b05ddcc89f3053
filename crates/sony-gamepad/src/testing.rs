use std::{ffi::CString, time::Duration};

use cgmath::Vector3;
use dualsense::DualSense;
use dualshock::DS4;
use sony_gamepad_sys::{
    testing::FakeHid, AnalogAxis, DeviceType, GamepadDevice, GamepadKey, TouchPoint,
    SONY_VENDOR_ID,
};

use crate::{
    Backend, ConnectionState, DeviceContainer, DeviceContext, DeviceManager, ManagerSettings,
    MessageHandler, Result,
};

pub const POLL: Duration = Duration::from_millis(33);

/// Controllers plugged in as [`FakeHid`]s.
#[derive(Default)]
pub struct FakeBackend {
    devices: Vec<(DeviceContext, FakeHid)>,
}

impl FakeBackend {
    fn add(&mut self, path: &str, product_id: u16) -> FakeHid {
        let path = CString::new(path).unwrap();
        let context = DeviceContext::new(&path, SONY_VENDOR_ID, product_id).unwrap();
        let hid = FakeHid::new();
        self.devices.push((context, hid.clone()));
        hid
    }

    pub fn add_dualsense(&mut self, path: &str) -> FakeHid {
        self.add(path, 0x0CE6)
    }

    pub fn add_ds4(&mut self, path: &str) -> FakeHid {
        self.add(path, 0x09CC)
    }

    /// Same place in the enumeration, new handle.
    pub fn replace(&mut self, index: usize) -> FakeHid {
        let hid = FakeHid::new();
        self.devices[index].1 = hid.clone();
        hid
    }

    pub fn unplug(&mut self, index: usize) {
        self.devices.remove(index);
    }
}

impl Backend for FakeBackend {
    fn find_devices(&mut self) -> Result<Vec<DeviceContext>> {
        Ok(self.devices.iter().map(|(context, _)| context.clone()).collect())
    }

    fn open(&mut self, context: &DeviceContext) -> Result<Option<Box<dyn GamepadDevice>>> {
        let hid = match self.devices.iter().find(|(c, _)| c == context) {
            Some((_, hid)) => hid.clone(),
            None => return Ok(None),
        };
        let device: Box<dyn GamepadDevice> = match context.device_type {
            DeviceType::DualShock4 => Box::new(DS4::new(hid, context.connection)?),
            _ => Box::new(DualSense::new(hid, context.product_id, context.connection)?),
        };
        Ok(Some(device))
    }
}

pub fn container(backend: FakeBackend) -> DeviceContainer<FakeBackend> {
    DeviceContainer::new(backend, &ManagerSettings::default())
}

/// DualSense USB input report, `fill` gets the state block.
///
/// Sticks centered, nothing pressed, no finger on the touchpad.
pub fn dualsense_input(fill: impl FnOnce(&mut [u8])) -> Vec<u8> {
    let mut report = vec![0u8; 64];
    report[0] = 0x01;
    report[1..5].copy_from_slice(&[128, 127, 128, 127]);
    report[8] = 0x08;
    report[1 + 32] = 0x80;
    report[1 + 36] = 0x80;
    fill(&mut report[1..]);
    report
}

/// Manager over a single USB DualSense at id 0, its connection already
/// reported.
pub fn manager() -> (DeviceManager<FakeBackend>, FakeHid, Recorder) {
    let mut backend = FakeBackend::default();
    let hid = backend.add_dualsense("a");
    let mut manager = DeviceManager::new(backend, ManagerSettings::default());
    let mut recorder = Recorder::default();
    assert_eq!(manager.create_library_instances(&mut recorder).unwrap(), 1);
    assert_eq!(
        recorder.events,
        vec![Event::Connection(0, ConnectionState::Connected)]
    );
    recorder.events.clear();
    (manager, hid, recorder)
}

pub fn cross(pressed: bool) -> Vec<u8> {
    dualsense_input(|s| s[7] = if pressed { 0x08 | 0x20 } else { 0x08 })
}

#[derive(Debug, PartialEq)]
pub enum Event {
    Pressed(u32, GamepadKey),
    Released(u32, GamepadKey),
    TouchStarted(u32, u8),
    TouchEnded(u32, u8),
    Motion(u32, Vector3<f64>),
    Connection(u32, ConnectionState),
}

/// Keeps every event, analog values apart.
#[derive(Default)]
pub struct Recorder {
    pub events: Vec<Event>,
    pub analogs: Vec<(u32, AnalogAxis, f64)>,
}

impl MessageHandler for Recorder {
    fn on_button_pressed(&mut self, controller_id: u32, key: GamepadKey) {
        self.events.push(Event::Pressed(controller_id, key));
    }

    fn on_button_released(&mut self, controller_id: u32, key: GamepadKey) {
        self.events.push(Event::Released(controller_id, key));
    }

    fn on_analog(&mut self, controller_id: u32, axis: AnalogAxis, value: f64) {
        self.analogs.push((controller_id, axis, value));
    }

    fn on_touch_started(&mut self, controller_id: u32, point: &TouchPoint) {
        self.events.push(Event::TouchStarted(controller_id, point.id));
    }

    fn on_touch_ended(&mut self, controller_id: u32, point: &TouchPoint) {
        self.events.push(Event::TouchEnded(controller_id, point.id));
    }

    fn on_motion(
        &mut self,
        controller_id: u32,
        _tilt: Vector3<f64>,
        _gyro: Vector3<f64>,
        gravity: Vector3<f64>,
        _accel: Vector3<f64>,
    ) {
        self.events.push(Event::Motion(controller_id, gravity));
    }

    fn on_connection_change(&mut self, controller_id: u32, state: ConnectionState) {
        self.events.push(Event::Connection(controller_id, state));
    }
}
