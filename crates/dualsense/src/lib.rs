mod triggers;

use anyhow::{bail, ensure, Context, Result};
use dualsense_sys::{
    input::{BTSimpleReport, Buttons, InputReport, InputReportId, InputState},
    output::{OutputState, FEATURE_MODE_DEFAULT, FEATURE_MODE_RESET},
    ConnectionType, DS_REPORT_RATE, FEATURE_REPORT_CALIBRATION, FEATURE_REPORT_CALIBRATION_SIZE,
    HID_PRODUCT_ID_DUALSENSE, HID_PRODUCT_ID_EDGE, HID_VENDOR_ID,
};
use hidapi::{HidApi, HidDevice};
use sony_gamepad_sys::{
    validate::to_255, Color, DeviceSettings, DeviceType, ForceFeedbackValues, GamepadDevice,
    GamepadDriver, GamepadKey, HidIo, KeyStatus, LedBrightness, LedMic, LedPlayer, Motion, Report,
    TriggerDevice, VibrationMode,
};
use tracing::{debug, error, info, instrument, trace, warn};

pub use dualsense_sys;

/// How long to wait for the first report when guessing the transport.
const PROBE_TIMEOUT: i32 = 100;

pub struct DualSenseDriver;

impl GamepadDriver for DualSenseDriver {
    fn init(
        &self,
        api: &HidApi,
        device_info: &hidapi::DeviceInfo,
    ) -> Result<Option<Box<dyn GamepadDevice>>> {
        if device_info.vendor_id() == HID_VENDOR_ID
            && [HID_PRODUCT_ID_DUALSENSE, HID_PRODUCT_ID_EDGE].contains(&device_info.product_id())
        {
            let connection = ConnectionType::from_path(&device_info.path().to_string_lossy());
            let device = device_info.open_device(api)?;
            Ok(Some(Box::new(DualSense::new(
                device,
                device_info.product_id(),
                connection,
            )?)))
        } else {
            Ok(None)
        }
    }
}

pub struct DualSense<D = HidDevice> {
    device: D,
    device_type: DeviceType,
    connection: ConnectionType,
    controller_id: u32,
    connected: bool,
    output: OutputState,
    last: Report,
    read_timeout: i32,
    touch: bool,
    motion: bool,
}

impl<D: HidIo> DualSense<D> {
    /// `connection` is a hint, the size of the first report takes precedence.
    #[instrument(level = "info", skip(device), err)]
    pub fn new(device: D, product_id: u16, connection: ConnectionType) -> Result<DualSense<D>> {
        let device_type = DeviceType::from_product_id(product_id);
        ensure!(
            matches!(device_type, DeviceType::DualSense | DeviceType::DualSenseEdge),
            "not a DualSense: 0x{:04x}",
            product_id
        );
        let mut dualsense = DualSense {
            device,
            device_type,
            connection,
            controller_id: 0,
            connected: true,
            output: OutputState::default(),
            last: Report::empty(DS_REPORT_RATE),
            read_timeout: 0,
            touch: false,
            motion: false,
        };
        dualsense.enable_full_reports()?;
        dualsense.probe_connection()?;
        let model = if device_type == DeviceType::DualSenseEdge {
            "DualSense Edge"
        } else {
            "DualSense"
        };
        info!(model, connection = ?dualsense.connection, "initializing device");
        Ok(dualsense)
    }

    /// Over Bluetooth the controller only sends the simple report until the
    /// calibration is requested.
    #[instrument(level = "debug", skip(self), err)]
    fn enable_full_reports(&mut self) -> Result<()> {
        let mut buf = [0u8; FEATURE_REPORT_CALIBRATION_SIZE];
        buf[0] = FEATURE_REPORT_CALIBRATION;
        match self.device.get_feature_report(&mut buf) {
            Ok(len) => {
                trace!(feature_report = %hex::encode(&buf[..len.min(buf.len())]));
                Ok(())
            }
            Err(e) if self.connection == ConnectionType::Bluetooth => {
                Err(e).context("requesting the calibration report")
            }
            Err(e) => {
                warn!(error = %e, "could not read the calibration report");
                Ok(())
            }
        }
    }

    fn probe_connection(&mut self) -> Result<()> {
        let mut report = InputReport::new();
        let nb_read = self
            .device
            .read_timeout(report.as_bytes_mut(), PROBE_TIMEOUT)
            .context("reading the first input report")?;
        if nb_read > 0 {
            self.handle_report(&report, nb_read);
        }
        Ok(())
    }

    pub fn output(&self) -> &OutputState {
        &self.output
    }

    pub fn output_mut(&mut self) -> &mut OutputState {
        &mut self.output
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    #[instrument(level = "trace", skip(self), err)]
    pub fn send_out(&mut self) -> Result<()> {
        if !self.connected {
            return Ok(());
        }
        let report = self.output.report(self.connection);
        trace!(out_report = %hex::encode(report.as_bytes()));
        match self.device.write(report.as_bytes()) {
            Ok(nb_written) => {
                ensure!(
                    nb_written == report.byte_size(),
                    "short write: {} < {}",
                    nb_written,
                    report.byte_size()
                );
                Ok(())
            }
            Err(e) => {
                error!(error = %e, "failed to write output report");
                self.connected = false;
                Err(e).context("writing output report")
            }
        }
    }

    /// Reads every pending report and keeps the newest.
    #[instrument(level = "trace", skip(self), err)]
    pub fn recv(&mut self) -> Result<Report> {
        if !self.connected {
            bail!("DualSense {} is disconnected", self.controller_id);
        }
        let mut newest = None;
        let mut timeout = self.read_timeout;
        loop {
            let mut report = InputReport::new();
            let nb_read = match self.device.read_timeout(report.as_bytes_mut(), timeout) {
                Ok(nb_read) => nb_read,
                Err(e) => {
                    error!(error = %e, "failed to read input report");
                    self.connected = false;
                    return Err(e).context("reading input report");
                }
            };
            if nb_read == 0 {
                break;
            }
            trace!(in_report = %hex::encode(&report.as_bytes()[..nb_read]));
            newest = Some((report, nb_read));
            timeout = 0;
        }
        if let Some((report, nb_read)) = newest {
            self.handle_report(&report, nb_read);
        }
        Ok(self.last.clone())
    }

    fn handle_report(&mut self, report: &InputReport, nb_read: usize) {
        let conn = InputReport::conn_type(nb_read);
        if conn != ConnectionType::Unrecognized && conn != self.connection {
            debug!(?conn, "connection type from report size");
            self.connection = conn;
        }
        if !report.validate() {
            warn!("bluetooth input report with invalid CRC");
            return;
        }
        match (self.connection, report.id().try_into()) {
            (ConnectionType::Bluetooth, Some(InputReportId::Simple)) => {
                if let Some(simple) = report.bt_simple() {
                    self.last = simple_report(simple, &self.last);
                }
            }
            _ => match report.state(self.connection) {
                Some(state) => self.last = full_report(state),
                None => warn!(id = ?report.id(), "unexpected input report"),
            },
        }
    }

    pub fn set_lightbar(&mut self, color: Color) -> Result<()> {
        if self.output.lightbar != color {
            self.output.lightbar = color;
            self.send_out()?;
        }
        Ok(())
    }

    pub fn set_player_led(&mut self, led: LedPlayer, brightness: LedBrightness) -> Result<()> {
        if self.output.player_led != led || self.output.player_brightness != brightness {
            self.output.player_led = led;
            self.output.player_brightness = brightness;
            self.send_out()?;
        }
        Ok(())
    }

    pub fn set_mic_led(&mut self, led: LedMic) -> Result<()> {
        if self.output.mic_led != led {
            self.output.mic_led = led;
            self.send_out()?;
        }
        Ok(())
    }

    pub fn set_vibration(&mut self, values: &ForceFeedbackValues) -> Result<()> {
        let left = to_255(values.left());
        let right = to_255(values.right());
        if self.output.rumble_left != left || self.output.rumble_right != right {
            self.output.rumble_left = left;
            self.output.rumble_right = right;
            self.send_out()?;
        }
        Ok(())
    }

    #[instrument(level = "info", skip(self), err)]
    pub fn settings(&mut self, settings: &DeviceSettings) -> Result<()> {
        self.output.apply_settings(settings);
        self.send_out()
    }

    #[instrument(level = "debug", skip(self), err)]
    pub fn stop_all(&mut self) -> Result<()> {
        if self.connection == ConnectionType::Bluetooth {
            self.output.feature.vibration_mode = VibrationMode::DefaultRumble as u8;
            self.output.feature.feature_mode = FEATURE_MODE_RESET;
            self.send_out()?;
        }
        self.output.feature.vibration_mode = VibrationMode::DefaultRumble as u8;
        self.output.feature.feature_mode = FEATURE_MODE_DEFAULT;
        self.output.player_brightness = LedBrightness::High;
        if let Some((color, led)) = identity(self.controller_id) {
            self.output.lightbar = color;
            self.output.player_led = led;
        }
        self.send_out()
    }
}

/// Lightbar and player LEDs telling controllers apart.
pub fn identity(controller_id: u32) -> Option<(Color, LedPlayer)> {
    match controller_id {
        0 => Some((Color::BLUE, LedPlayer::One)),
        1 => Some((Color::RED, LedPlayer::Two)),
        2 => Some((Color::GREEN, LedPlayer::Three)),
        3 => Some((Color::WHITE, LedPlayer::All)),
        _ => None,
    }
}

fn keys(b: &Buttons<[u8; 3]>) -> enum_map::EnumMap<GamepadKey, KeyStatus> {
    let dpad = b.dpad();
    enum_map::enum_map! {
        GamepadKey::Cross => b.cross().into(),
        GamepadKey::Square => b.square().into(),
        GamepadKey::Circle => b.circle().into(),
        GamepadKey::Triangle => b.triangle().into(),
        GamepadKey::DPadUp => dpad.up().into(),
        GamepadKey::DPadDown => dpad.down().into(),
        GamepadKey::DPadLeft => dpad.left().into(),
        GamepadKey::DPadRight => dpad.right().into(),
        GamepadKey::L1 => b.l1().into(),
        GamepadKey::R1 => b.r1().into(),
        GamepadKey::L2 => b.l2().into(),
        GamepadKey::R2 => b.r2().into(),
        GamepadKey::L3 => b.l3().into(),
        GamepadKey::R3 => b.r3().into(),
        GamepadKey::Options => b.options().into(),
        GamepadKey::Create => b.create().into(),
        GamepadKey::PlayStation => b.ps().into(),
        GamepadKey::TouchPad => b.touchpad().into(),
        GamepadKey::Mic => b.mic().into(),
        GamepadKey::FnLeft => b.fn_left().into(),
        GamepadKey::FnRight => b.fn_right().into(),
        GamepadKey::PaddleLeft => b.paddle_left().into(),
        GamepadKey::PaddleRight => b.paddle_right().into(),
    }
}

fn full_report(state: &InputState) -> Report {
    Report {
        keys: keys(&state.buttons),
        left_stick: state.left_stick.normalize(),
        right_stick: state.right_stick.normalize(),
        left_trigger: state.left_trigger.normalize(),
        right_trigger: state.right_trigger.normalize(),
        motion: Some(Motion {
            rotation_speed: state.gyro.normalize().into(),
            acceleration: state.accel.normalize().into(),
        }),
        touch: Some(state.touch_points()),
        battery: state.status.battery(),
        headset_connected: state.peripherals.headset(),
        frequency: DS_REPORT_RATE,
    }
}

/// The simple report has no sensor, keep the last known battery.
fn simple_report(simple: &BTSimpleReport, last: &Report) -> Report {
    Report {
        keys: keys(&simple.buttons),
        left_stick: simple.left_stick.normalize(),
        right_stick: simple.right_stick.normalize(),
        left_trigger: simple.left_trigger.normalize(),
        right_trigger: simple.right_trigger.normalize(),
        motion: None,
        touch: None,
        battery: last.battery,
        headset_connected: last.headset_connected,
        frequency: DS_REPORT_RATE,
    }
}

impl<D: HidIo + 'static> GamepadDevice for DualSense<D> {
    fn recv(&mut self) -> Result<Report> {
        DualSense::recv(self)
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn connection(&self) -> ConnectionType {
        self.connection
    }

    fn device_type(&self) -> DeviceType {
        self.device_type
    }

    fn controller_id(&self) -> u32 {
        self.controller_id
    }

    fn set_controller_id(&mut self, id: u32) {
        self.controller_id = id;
    }

    fn initialize(&mut self) -> Result<()> {
        DualSense::stop_all(self)
    }

    fn set_lightbar(&mut self, color: Color) -> Result<()> {
        DualSense::set_lightbar(self, color)
    }

    fn set_player_led(&mut self, led: LedPlayer, brightness: LedBrightness) -> Result<()> {
        DualSense::set_player_led(self, led, brightness)
    }

    fn set_mic_led(&mut self, led: LedMic) -> Result<()> {
        DualSense::set_mic_led(self, led)
    }

    fn set_vibration(&mut self, values: &ForceFeedbackValues) -> Result<()> {
        DualSense::set_vibration(self, values)
    }

    fn settings(&mut self, settings: &DeviceSettings) -> Result<()> {
        DualSense::settings(self, settings)
    }

    fn stop_all(&mut self) -> Result<()> {
        DualSense::stop_all(self)
    }

    fn send_out(&mut self) -> Result<()> {
        DualSense::send_out(self)
    }

    fn battery(&self) -> f32 {
        self.last.battery.level
    }

    fn set_touch(&mut self, enable: bool) {
        self.touch = enable;
    }

    fn touch_enabled(&self) -> bool {
        self.touch
    }

    fn set_motion(&mut self, enable: bool) {
        self.motion = enable;
    }

    fn motion_enabled(&self) -> bool {
        self.motion
    }

    fn set_read_timeout(&mut self, timeout: i32) {
        self.read_timeout = timeout;
    }

    fn triggers(&mut self) -> Option<&mut dyn TriggerDevice> {
        Some(self)
    }

    fn shutdown(&mut self) {
        debug!(controller_id = self.controller_id, "shutting down");
        self.connected = false;
        self.output = OutputState::default();
        self.last = Report::empty(DS_REPORT_RATE);
    }

    fn as_any(&mut self) -> &mut dyn std::any::Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sony_gamepad_sys::{crc, testing::FakeHid, AudioSwitch};

    pub(crate) fn usb_input(fill: impl FnOnce(&mut [u8])) -> Vec<u8> {
        let mut report = vec![0u8; 64];
        report[0] = 0x01;
        report[1..5].copy_from_slice(&[128, 127, 128, 127]);
        report[8] = 0x08;
        fill(&mut report[1..]);
        report
    }

    pub(crate) fn bt_input(fill: impl FnOnce(&mut [u8])) -> Vec<u8> {
        let mut report = vec![0u8; 78];
        report[0] = 0x31;
        report[2..6].copy_from_slice(&[128, 127, 128, 127]);
        report[9] = 0x08;
        fill(&mut report[2..]);
        let crc = crc::checksum(crc::INPUT_SEED, &report[..74]);
        report[74..].copy_from_slice(&crc.to_le_bytes());
        report
    }

    pub(crate) fn usb_dualsense() -> (DualSense<FakeHid>, FakeHid) {
        let hid = FakeHid::new();
        hid.push_input(&usb_input(|_| ()));
        let ds = DualSense::new(hid.clone(), HID_PRODUCT_ID_DUALSENSE, ConnectionType::Usb)
            .unwrap();
        (ds, hid)
    }

    #[test]
    fn rejects_other_products() {
        assert!(DualSense::new(FakeHid::new(), 0x05C4, ConnectionType::Usb).is_err());
    }

    #[test]
    fn init_requests_calibration() {
        let (ds, hid) = usb_dualsense();
        assert_eq!(hid.feature_reads(), vec![FEATURE_REPORT_CALIBRATION]);
        assert_eq!(ds.connection, ConnectionType::Usb);
        assert!(hid.writes().is_empty());
        assert_eq!(
            GamepadDevice::device_type(&ds),
            sony_gamepad_sys::DeviceType::DualSense
        );
    }

    #[test]
    fn transport_from_report_size() {
        let hid = FakeHid::new();
        hid.push_input(&bt_input(|_| ()));
        let ds = DualSense::new(hid, HID_PRODUCT_ID_EDGE, ConnectionType::Usb).unwrap();
        assert_eq!(ds.connection, ConnectionType::Bluetooth);
        assert_eq!(ds.device_type, DeviceType::DualSenseEdge);
    }

    #[test]
    fn recv_keeps_newest_report() {
        let (mut ds, hid) = usb_dualsense();
        hid.push_input(&usb_input(|d| d[7] = 0x08 | 0x20));
        hid.push_input(&usb_input(|d| {
            d[7] = 0x08 | 0x80;
            d[5] = 128;
        }));
        let report = ds.recv().unwrap();
        assert_eq!(report.keys[GamepadKey::Triangle], KeyStatus::Pressed);
        assert_eq!(report.keys[GamepadKey::Cross], KeyStatus::Released);
        assert_eq!(report.right_trigger, 0.5);

        // Nothing pending, same state.
        let report = ds.recv().unwrap();
        assert_eq!(report.keys[GamepadKey::Triangle], KeyStatus::Pressed);
    }

    #[test]
    fn bluetooth_reports() {
        let hid = FakeHid::new();
        hid.push_input(&bt_input(|d| d[52] = 0x05));
        let mut ds = DualSense::new(hid.clone(), HID_PRODUCT_ID_DUALSENSE, ConnectionType::Bluetooth)
            .unwrap();
        assert_eq!(GamepadDevice::battery(&ds), 55.);

        let mut corrupted = bt_input(|d| d[7] = 0x28);
        corrupted[74] ^= 0xFF;
        hid.push_input(&corrupted);
        let report = ds.recv().unwrap();
        assert_eq!(report.keys[GamepadKey::Cross], KeyStatus::Released);

        // Simple report, before the calibration took effect.
        let mut simple = vec![0u8; 10];
        simple[0] = 0x01;
        simple[1..5].copy_from_slice(&[128, 127, 128, 127]);
        simple[5] = 0x08 | 0x10;
        hid.push_input(&simple);
        let report = ds.recv().unwrap();
        assert_eq!(report.keys[GamepadKey::Square], KeyStatus::Pressed);
        assert!(report.motion.is_none());
        assert_eq!(report.battery.level, 55.);
        assert_eq!(ds.connection, ConnectionType::Bluetooth);
    }

    #[test]
    fn unplugged_device_disconnects() {
        let (mut ds, hid) = usb_dualsense();
        hid.unplug();
        assert!(ds.recv().is_err());
        assert!(!GamepadDevice::is_connected(&ds));
        assert!(ds.recv().is_err());
        // Output is dropped silently once disconnected.
        assert!(ds.set_lightbar(Color::RED).is_ok());
    }

    #[test]
    fn setters_only_send_changes() {
        let (mut ds, hid) = usb_dualsense();
        ds.set_lightbar(Color::RED).unwrap();
        ds.set_lightbar(Color::RED).unwrap();
        assert_eq!(hid.writes().len(), 1);
        let out = hid.last_write().unwrap();
        assert_eq!(out.len(), 63);
        assert_eq!(out[45..48], [255, 0, 0]);

        ds.set_player_led(LedPlayer::Three, LedBrightness::Low).unwrap();
        ds.set_player_led(LedPlayer::Three, LedBrightness::Low).unwrap();
        ds.set_mic_led(LedMic::On).unwrap();
        ds.set_mic_led(LedMic::On).unwrap();
        assert_eq!(hid.writes().len(), 3);
        let out = hid.last_write().unwrap();
        assert_eq!(out[1 + 42], 0x02);
        assert_eq!(out[1 + 43], 0x15 | 0x20);
        assert_eq!(out[1 + 8], 0x01);
    }

    #[test]
    fn vibration_takes_strongest_motor() {
        let (mut ds, hid) = usb_dualsense();
        let values = ForceFeedbackValues {
            left_large: 0.2,
            left_small: 1.0,
            right_large: 0.5,
            right_small: -1.0,
        };
        ds.set_vibration(&values).unwrap();
        ds.set_vibration(&values).unwrap();
        assert_eq!(hid.writes().len(), 1);
        let out = hid.last_write().unwrap();
        assert_eq!(out[1 + 2], 127);
        assert_eq!(out[1 + 3], 255);
    }

    #[test]
    fn settings_are_sent() {
        let (mut ds, hid) = usb_dualsense();
        ds.settings(&DeviceSettings {
            audio_headset: AudioSwitch::On,
            audio_speaker: AudioSwitch::On,
            audio_volume: 40,
            ..DeviceSettings::default()
        })
        .unwrap();
        let out = hid.last_write().unwrap();
        assert_eq!(out[1], 0xFF);
        assert_eq!(out[1 + 4..1 + 8], [40, 40, 0, 0x21]);
        assert_eq!(out[1 + 36], 0x40);
    }

    #[test]
    fn stop_all_identifies_controller() {
        let (mut ds, hid) = usb_dualsense();
        ds.set_controller_id(1);
        ds.stop_all().unwrap();
        assert_eq!(hid.writes().len(), 1);
        let out = hid.last_write().unwrap();
        assert_eq!(out[1..3], [0xFF, 0xF7]);
        assert_eq!(out[1 + 42], 0x00);
        assert_eq!(out[1 + 43], 0x0A | 0x20);
        assert_eq!(out[45..48], [255, 0, 0]);
    }

    #[test]
    fn initialize_lights_up_controller() {
        let (mut ds, hid) = usb_dualsense();
        ds.set_controller_id(2);
        GamepadDevice::initialize(&mut ds).unwrap();
        let out = hid.last_write().unwrap();
        assert_eq!(out[45..48], [0, 255, 0]);
        assert_eq!(ds.output().player_led, LedPlayer::Three);
    }

    #[test]
    fn stop_all_resets_over_bluetooth() {
        let hid = FakeHid::new();
        hid.push_input(&bt_input(|_| ()));
        let mut ds = DualSense::new(hid.clone(), HID_PRODUCT_ID_DUALSENSE, ConnectionType::Bluetooth)
            .unwrap();
        ds.stop_all().unwrap();
        let writes = hid.writes();
        assert_eq!(writes.len(), 2);
        assert_eq!(writes[0][..4], [0x31, 0x02, 0xFF, 0x5F]);
        assert_eq!(writes[1][..4], [0x31, 0x02, 0xFF, 0xF7]);
        assert_eq!(writes[1][2 + 44..2 + 47], [0, 0, 255]);
        assert!(crc::verify(crc::OUTPUT_SEED, &writes[1]));
    }

    #[test]
    fn shutdown_clears_state() {
        let (mut ds, _hid) = usb_dualsense();
        ds.set_lightbar(Color::GREEN).unwrap();
        GamepadDevice::shutdown(&mut ds);
        assert!(!ds.connected);
        assert_eq!(ds.output, OutputState::default());
    }
}
