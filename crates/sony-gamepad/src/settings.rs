use std::time::Duration;

pub const MAX_CONTROLLERS: usize = 8;

#[derive(Debug, Clone, PartialEq)]
pub struct ManagerSettings {
    /// Minimum time between two polls of the controllers.
    pub poll_interval: Duration,
    /// Nothing is polled or sent while set.
    pub lazy: bool,
    pub max_controllers: usize,
    /// Wait for the first input report of a poll. Zero never blocks.
    pub read_timeout: Duration,
}

impl Default for ManagerSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(33),
            lazy: false,
            max_controllers: MAX_CONTROLLERS,
            read_timeout: Duration::from_millis(0),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ManagerSetting {
    PollInterval(Duration),
    Lazy(bool),
    MaxControllers(usize),
    ReadTimeout(Duration),
}

impl ManagerSettings {
    pub fn apply(&mut self, setting: ManagerSetting) {
        match setting {
            ManagerSetting::PollInterval(i) => self.poll_interval = i,
            ManagerSetting::Lazy(l) => self.lazy = l,
            ManagerSetting::MaxControllers(m) => self.max_controllers = m,
            ManagerSetting::ReadTimeout(t) => self.read_timeout = t,
        }
    }

    /// In the unit of [`sony_gamepad_sys::GamepadDevice::set_read_timeout`].
    pub fn read_timeout_ms(&self) -> i32 {
        self.read_timeout.as_millis().min(i32::MAX as u128) as i32
    }
}

#[test]
fn apply_overrides_defaults() {
    let mut settings = ManagerSettings::default();
    assert_eq!(settings.poll_interval, Duration::from_millis(33));
    settings.apply(ManagerSetting::Lazy(true));
    settings.apply(ManagerSetting::ReadTimeout(Duration::from_secs(2)));
    assert!(settings.lazy);
    assert_eq!(settings.read_timeout_ms(), 2000);
    assert_eq!(settings.max_controllers, MAX_CONTROLLERS);
}
