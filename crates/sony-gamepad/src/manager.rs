use std::{collections::BTreeMap, time::Duration};

use sony_gamepad_sys::{
    AnalogAxis, Color, DeviceProperty, ForceFeedbackValues, GamepadDevice, Hand,
    HapticFeedbackValues, KeyStatus, Report,
};
use tracing::{debug, error, instrument};

use crate::{
    handler::{ButtonTracker, TouchEvent, TouchTracker},
    Backend, ConnectionState, DeviceContainer, HidapiBackend, ManagerSetting, ManagerSettings,
    MessageHandler, Result,
};

enum Poll {
    Report {
        report: Report,
        touch: bool,
        motion: bool,
    },
    Disconnected,
}

/// Polls the controllers of a [`DeviceContainer`] and forwards their input.
///
/// The host drives it by calling [`DeviceManager::tick`] from its own loop.
pub struct DeviceManager<B = HidapiBackend> {
    container: DeviceContainer<B>,
    settings: ManagerSettings,
    accumulator: Duration,
    states: BTreeMap<u32, ConnectionState>,
    buttons: BTreeMap<u32, ButtonTracker>,
    touch: BTreeMap<u32, TouchTracker>,
}

impl<B: Backend> DeviceManager<B> {
    pub fn new(backend: B, settings: ManagerSettings) -> DeviceManager<B> {
        DeviceManager {
            container: DeviceContainer::new(backend, &settings),
            settings,
            accumulator: Duration::from_secs(0),
            states: BTreeMap::new(),
            buttons: BTreeMap::new(),
            touch: BTreeMap::new(),
        }
    }

    pub fn container(&self) -> &DeviceContainer<B> {
        &self.container
    }

    pub fn container_mut(&mut self) -> &mut DeviceContainer<B> {
        &mut self.container
    }

    pub fn settings(&self) -> &ManagerSettings {
        &self.settings
    }

    pub fn apply_setting(&mut self, setting: ManagerSetting) {
        self.settings.apply(setting);
        self.container.configure(&self.settings);
    }

    /// Reopens every controller and reports each of them as connected.
    ///
    /// The controllers known before are reported disconnected first.
    pub fn create_library_instances(&mut self, handler: &mut dyn MessageHandler) -> Result<usize> {
        let known: Vec<u32> = self.states.keys().copied().collect();
        for id in known {
            self.disconnect(id, handler);
        }
        self.states.clear();
        self.buttons.clear();
        self.touch.clear();
        let count = self.container.create_library_instances()?;
        for id in self.container.controller_ids() {
            self.set_state(id, ConnectionState::Connected, handler);
        }
        Ok(count)
    }

    pub fn tick(&mut self, dt: Duration, handler: &mut dyn MessageHandler) {
        if self.settings.lazy {
            return;
        }
        self.accumulator += dt;
        if self.accumulator < self.settings.poll_interval {
            return;
        }
        self.accumulator = Duration::from_secs(0);

        let polls: Vec<(u32, Poll)> = self
            .container
            .instances_mut()
            .map(|(id, device)| (id, poll(id, device)))
            .collect();
        for (id, poll) in polls {
            match poll {
                Poll::Report {
                    report,
                    touch,
                    motion,
                } => self.dispatch(id, &report, touch, motion, handler),
                Poll::Disconnected => self.disconnect(id, handler),
            }
        }
    }

    fn dispatch(
        &mut self,
        id: u32,
        report: &Report,
        touch: bool,
        motion: bool,
        handler: &mut dyn MessageHandler,
    ) {
        for &axis in AnalogAxis::ALL.iter() {
            handler.on_analog(id, axis, report.analog(axis));
        }
        for (key, status) in self.buttons.entry(id).or_default().update(&report.keys) {
            match status {
                KeyStatus::Pressed => handler.on_button_pressed(id, key),
                KeyStatus::Released => handler.on_button_released(id, key),
            }
        }
        if let (true, Some(points)) = (touch, &report.touch) {
            for event in self.touch.entry(id).or_default().update(points) {
                match event {
                    TouchEvent::Started(point) => handler.on_touch_started(id, &point),
                    TouchEvent::Ended(point) => handler.on_touch_ended(id, &point),
                }
            }
        }
        if let (true, Some(m)) = (motion, &report.motion) {
            handler.on_motion(
                id,
                m.tilt(),
                m.rotation_speed.as_vec(),
                m.gravity(),
                m.acceleration.as_vec(),
            );
        }
    }

    fn set_state(&mut self, id: u32, state: ConnectionState, handler: &mut dyn MessageHandler) {
        if self.states.insert(id, state) != Some(state) {
            debug!(controller_id = id, ?state, "connection changed");
            handler.on_connection_change(id, state);
        }
    }

    /// `None` while lazy, nothing is sent to the controllers then.
    fn device(&mut self, id: u32) -> Option<&mut (dyn GamepadDevice + 'static)> {
        if self.settings.lazy {
            None
        } else {
            self.container.get_library_instance(id)
        }
    }

    #[instrument(level = "debug", skip(self), err)]
    pub fn set_device_property(&mut self, id: u32, property: &DeviceProperty) -> Result<()> {
        let device = match self.device(id) {
            Some(device) => device,
            None => return Ok(()),
        };
        match property {
            DeviceProperty::LightColor(color) => device.set_lightbar(*color)?,
            DeviceProperty::TriggerResistance(resistance) => {
                if let Some(triggers) = device.triggers() {
                    triggers.set_trigger_property(resistance)?;
                }
            }
        }
        Ok(())
    }

    pub fn set_haptic_feedback_values(
        &mut self,
        id: u32,
        hand: Hand,
        values: &HapticFeedbackValues,
    ) -> Result<()> {
        if let Some(triggers) = self.device(id).and_then(|d| d.triggers()) {
            triggers.set_haptic_feedback(hand, values)?;
        }
        Ok(())
    }

    pub fn set_channel_values(&mut self, id: u32, values: &ForceFeedbackValues) -> Result<()> {
        if let Some(device) = self.device(id) {
            device.set_vibration(values)?;
        }
        Ok(())
    }

    pub fn set_light_color(&mut self, id: u32, color: Color) -> Result<()> {
        if let Some(device) = self.device(id) {
            device.set_lightbar(color)?;
        }
        Ok(())
    }

    pub fn reset_light_color(&mut self, id: u32) -> Result<()> {
        self.set_light_color(id, Color::BLUE)
    }

    /// Reopens the controller if needed, true once it is connected.
    pub fn reconnect(&mut self, id: u32, handler: &mut dyn MessageHandler) -> Result<bool> {
        let connected = self.container.get_library_or_reconnect(id)?.is_some();
        if connected {
            self.set_state(id, ConnectionState::Connected, handler);
        }
        Ok(connected)
    }

    /// Releases the keys still held by the controller and drops its
    /// instance. Only a controller reported connected is reported
    /// disconnected.
    pub fn disconnect(&mut self, id: u32, handler: &mut dyn MessageHandler) {
        if let Some(mut tracker) = self.buttons.remove(&id) {
            for key in tracker.release_all() {
                handler.on_button_released(id, key);
            }
        }
        self.touch.remove(&id);
        self.container.remove_library_instance(id);
        if self.states.get(&id) == Some(&ConnectionState::Connected) {
            self.set_state(id, ConnectionState::Disconnected, handler);
        }
    }
}

fn poll(id: u32, device: &mut dyn GamepadDevice) -> Poll {
    if !device.is_connected() {
        return Poll::Disconnected;
    }
    match device.recv() {
        Ok(report) => Poll::Report {
            report,
            touch: device.touch_enabled(),
            motion: device.motion_enabled(),
        },
        Err(e) => {
            error!(controller_id = id, error = %e, "lost controller");
            Poll::Disconnected
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{cross, dualsense_input, manager, Event, POLL};
    use sony_gamepad_sys::{DeviceType, GamepadKey, TriggerResistance};

    #[test]
    fn polls_on_interval() {
        let (mut manager, hid, mut recorder) = manager();
        hid.push_input(&cross(true));
        manager.tick(Duration::from_millis(10), &mut recorder);
        assert!(recorder.events.is_empty());
        assert!(recorder.analogs.is_empty());

        manager.tick(Duration::from_millis(30), &mut recorder);
        assert_eq!(recorder.events, vec![Event::Pressed(0, GamepadKey::Cross)]);
        assert_eq!(recorder.analogs.len(), AnalogAxis::ALL.len());

        // The accumulator restarts after a poll.
        hid.push_input(&cross(false));
        manager.tick(Duration::from_millis(10), &mut recorder);
        assert_eq!(recorder.events.len(), 1);
        manager.tick(POLL, &mut recorder);
        assert_eq!(recorder.events[1], Event::Released(0, GamepadKey::Cross));
    }

    #[test]
    fn lazy_manager_does_nothing() {
        let (mut manager, hid, mut recorder) = manager();
        manager.apply_setting(ManagerSetting::Lazy(true));
        hid.push_input(&cross(true));
        hid.clear_writes();
        manager.tick(POLL, &mut recorder);
        manager.set_light_color(0, Color::RED).unwrap();
        assert!(recorder.events.is_empty());
        assert!(hid.writes().is_empty());
    }

    #[test]
    fn touch_and_motion_need_enabling() {
        let (mut manager, hid, mut recorder) = manager();
        let input = || {
            dualsense_input(|s| {
                s[23..25].copy_from_slice(&8192i16.to_le_bytes());
                s[32] = 5;
            })
        };
        hid.push_input(&input());
        manager.tick(POLL, &mut recorder);
        assert!(recorder.events.is_empty());

        let device = manager.container_mut().get_library_instance(0).unwrap();
        device.set_touch(true);
        device.set_motion(true);
        hid.push_input(&input());
        manager.tick(POLL, &mut recorder);
        assert_eq!(recorder.events[0], Event::TouchStarted(0, 5));
        match recorder.events[1] {
            Event::Motion(0, gravity) => assert!((gravity.y - 9.81).abs() < 1e-9),
            ref other => panic!("unexpected event {:?}", other),
        }

        hid.push_input(&dualsense_input(|_| ()));
        manager.tick(POLL, &mut recorder);
        assert_eq!(recorder.events[2], Event::TouchEnded(0, 0));
    }

    #[test]
    fn read_failure_disconnects_once() {
        let (mut manager, hid, mut recorder) = manager();
        hid.push_input(&cross(true));
        manager.tick(POLL, &mut recorder);
        hid.unplug();
        manager.tick(POLL, &mut recorder);
        manager.tick(POLL, &mut recorder);
        assert_eq!(
            recorder.events,
            vec![
                Event::Pressed(0, GamepadKey::Cross),
                Event::Released(0, GamepadKey::Cross),
                Event::Connection(0, ConnectionState::Disconnected),
            ]
        );
        assert_eq!(manager.container().allocated_devices(), 0);
    }

    #[test]
    fn reconnect_notifies() {
        let (mut manager, hid, mut recorder) = manager();
        hid.unplug();
        manager.tick(POLL, &mut recorder);
        manager.container_mut().backend_mut().replace(0);
        assert!(manager.reconnect(0, &mut recorder).unwrap());
        assert!(manager.reconnect(0, &mut recorder).unwrap());
        assert_eq!(
            recorder.events,
            vec![
                Event::Connection(0, ConnectionState::Disconnected),
                Event::Connection(0, ConnectionState::Connected),
            ]
        );

        manager.container_mut().backend_mut().unplug(0);
        manager.container_mut().remove_library_instance(0);
        assert!(!manager.reconnect(0, &mut recorder).unwrap());
    }

    #[test]
    fn write_failure_removes_instance() {
        let (mut manager, hid, mut recorder) = manager();
        hid.unplug();
        assert!(manager.set_light_color(0, Color::RED).is_err());
        manager.tick(POLL, &mut recorder);
        manager.tick(POLL, &mut recorder);
        assert_eq!(
            recorder.events,
            vec![Event::Connection(0, ConnectionState::Disconnected)]
        );
        assert_eq!(manager.container().allocated_devices(), 0);
    }

    #[test]
    fn rescan_releases_previous_controllers() {
        let (mut manager, hid, mut recorder) = manager();
        hid.push_input(&cross(true));
        manager.tick(POLL, &mut recorder);
        manager.container_mut().backend_mut().unplug(0);
        manager.container_mut().backend_mut().add_ds4("b");
        assert_eq!(manager.create_library_instances(&mut recorder).unwrap(), 1);
        assert_eq!(
            recorder.events,
            vec![
                Event::Pressed(0, GamepadKey::Cross),
                Event::Released(0, GamepadKey::Cross),
                Event::Connection(0, ConnectionState::Disconnected),
                Event::Connection(0, ConnectionState::Connected),
            ]
        );
        let device = manager.container_mut().get_library_instance(0).unwrap();
        assert_eq!(device.device_type(), DeviceType::DualShock4);
    }

    #[test]
    fn light_color_and_reset() {
        let (mut manager, hid, _recorder) = manager();
        manager.set_light_color(0, Color::RED).unwrap();
        assert_eq!(hid.last_write().unwrap()[45..48], [255, 0, 0]);
        manager
            .set_device_property(0, &DeviceProperty::LightColor(Color::GREEN))
            .unwrap();
        assert_eq!(hid.last_write().unwrap()[45..48], [0, 255, 0]);
        manager.reset_light_color(0).unwrap();
        assert_eq!(hid.last_write().unwrap()[45..48], [0, 0, 255]);
    }

    #[test]
    fn missing_controller_is_ignored() {
        let (mut manager, _hid, _recorder) = manager();
        let values = ForceFeedbackValues {
            left_large: 1.,
            ..Default::default()
        };
        manager.set_channel_values(4, &values).unwrap();
        manager
            .set_device_property(
                4,
                &DeviceProperty::TriggerResistance(TriggerResistance::default()),
            )
            .unwrap();
    }

    #[test]
    fn trigger_property_reaches_dualsense() {
        let (mut manager, hid, _recorder) = manager();
        manager
            .set_device_property(
                0,
                &DeviceProperty::TriggerResistance(TriggerResistance {
                    start_strength: 8,
                    end_strength: 8,
                    affected: Hand::Right,
                    ..Default::default()
                }),
            )
            .unwrap();
        // Right trigger effect, feedback mode.
        assert_eq!(hid.last_write().unwrap()[11], 0x21);
    }
}
