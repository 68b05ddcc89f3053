use cgmath::Vector3;
use enum_map::EnumMap;
use sony_gamepad_sys::{AnalogAxis, GamepadKey, KeyStatus, TouchPoint};

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ConnectionState {
    Connected,
    Disconnected,
}

/// Receives the input of every polled controller.
pub trait MessageHandler {
    fn on_button_pressed(&mut self, controller_id: u32, key: GamepadKey);
    fn on_button_released(&mut self, controller_id: u32, key: GamepadKey);
    /// Sticks in -1 ... 1, triggers in 0 ... 1. Sent on every poll.
    fn on_analog(&mut self, controller_id: u32, axis: AnalogAxis, value: f64);

    /// Sent on every poll while the finger stays down.
    fn on_touch_started(&mut self, controller_id: u32, point: &TouchPoint) {
        let _ = (controller_id, point);
    }
    fn on_touch_ended(&mut self, controller_id: u32, point: &TouchPoint) {
        let _ = (controller_id, point);
    }

    /// `tilt` is acceleration plus rotation, `gravity` is in m/s², `gyro`
    /// in deg/s and `accel` in g.
    fn on_motion(
        &mut self,
        controller_id: u32,
        tilt: Vector3<f64>,
        gyro: Vector3<f64>,
        gravity: Vector3<f64>,
        accel: Vector3<f64>,
    ) {
        let _ = (controller_id, tilt, gyro, gravity, accel);
    }

    fn on_connection_change(&mut self, controller_id: u32, state: ConnectionState) {
        let _ = (controller_id, state);
    }
}

/// Turns key states into press and release edges.
#[derive(Debug, Clone, Default)]
pub struct ButtonTracker {
    keys: EnumMap<GamepadKey, KeyStatus>,
}

impl ButtonTracker {
    pub fn update(
        &mut self,
        keys: &EnumMap<GamepadKey, KeyStatus>,
    ) -> Vec<(GamepadKey, KeyStatus)> {
        let changes = keys
            .iter()
            .filter(|(key, status)| self.keys[*key] != **status)
            .map(|(key, status)| (key, *status))
            .collect();
        self.keys = keys.clone();
        changes
    }

    /// Keys still held, which are then forgotten.
    pub fn release_all(&mut self) -> Vec<GamepadKey> {
        let held = self
            .keys
            .iter()
            .filter(|(_, status)| **status == KeyStatus::Pressed)
            .map(|(key, _)| key)
            .collect();
        self.keys = EnumMap::default();
        held
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum TouchEvent {
    Started(TouchPoint),
    Ended(TouchPoint),
}

#[derive(Debug, Clone, Default)]
pub struct TouchTracker {
    active: [bool; 2],
}

impl TouchTracker {
    pub fn update(&mut self, points: &[TouchPoint; 2]) -> Vec<TouchEvent> {
        let mut events = Vec::new();
        for (was_active, point) in self.active.iter_mut().zip(points) {
            if point.active {
                events.push(TouchEvent::Started(*point));
            } else if *was_active {
                events.push(TouchEvent::Ended(*point));
            }
            *was_active = point.active;
        }
        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_changes_are_reported() {
        let mut tracker = ButtonTracker::default();
        let mut keys = EnumMap::default();
        assert!(tracker.update(&keys).is_empty());

        keys[GamepadKey::Cross] = KeyStatus::Pressed;
        assert_eq!(
            tracker.update(&keys),
            vec![(GamepadKey::Cross, KeyStatus::Pressed)]
        );
        assert!(tracker.update(&keys).is_empty());

        keys[GamepadKey::Cross] = KeyStatus::Released;
        keys[GamepadKey::Mic] = KeyStatus::Pressed;
        assert_eq!(
            tracker.update(&keys),
            vec![
                (GamepadKey::Cross, KeyStatus::Released),
                (GamepadKey::Mic, KeyStatus::Pressed),
            ]
        );
        assert_eq!(tracker.release_all(), vec![GamepadKey::Mic]);
        assert!(tracker.release_all().is_empty());
    }

    #[test]
    fn touch_ends_once() {
        let down = TouchPoint {
            id: 3,
            active: true,
            x: 100,
            y: 200,
        };
        let up = TouchPoint {
            active: false,
            ..down
        };
        let idle = TouchPoint::default();
        let mut tracker = TouchTracker::default();
        assert!(tracker.update(&[idle, idle]).is_empty());
        assert_eq!(tracker.update(&[down, idle]), vec![TouchEvent::Started(down)]);
        assert_eq!(tracker.update(&[down, idle]), vec![TouchEvent::Started(down)]);
        assert_eq!(tracker.update(&[up, idle]), vec![TouchEvent::Ended(up)]);
        assert!(tracker.update(&[up, idle]).is_empty());
    }
}
