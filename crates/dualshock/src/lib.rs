use anyhow::{bail, ensure, Context, Result};
use dualshock_sys::{
    input::{Buttons, InputReport, InputReportId, InputState, SimpleReport},
    output::OutputState,
    ConnectionType, DS4_REPORT_RATE, FEATURE_REPORT_CALIBRATION, FEATURE_REPORT_CALIBRATION_SIZE,
    HID_PRODUCT_ID_NEW, HID_PRODUCT_ID_OLD, HID_VENDOR_ID,
};
use hidapi::{HidApi, HidDevice};
use sony_gamepad_sys::{
    validate::to_255, Color, DeviceType, ForceFeedbackValues, GamepadDevice, GamepadDriver,
    GamepadKey, HidIo, KeyStatus, LedBrightness, LedMic, LedPlayer, Motion, Report,
};
use tracing::{debug, error, info, instrument, trace, warn};

pub use dualshock_sys;

const PROBE_TIMEOUT: i32 = 100;

pub struct DS4Driver;

impl GamepadDriver for DS4Driver {
    fn init(
        &self,
        api: &HidApi,
        device_info: &hidapi::DeviceInfo,
    ) -> Result<Option<Box<dyn GamepadDevice>>> {
        if device_info.vendor_id() == HID_VENDOR_ID
            && [HID_PRODUCT_ID_OLD, HID_PRODUCT_ID_NEW].contains(&device_info.product_id())
        {
            let connection = ConnectionType::from_path(&device_info.path().to_string_lossy());
            let device = device_info.open_device(api)?;
            Ok(Some(Box::new(DS4::new(device, connection)?)))
        } else {
            Ok(None)
        }
    }
}

pub struct DS4<D = HidDevice> {
    device: D,
    connection: ConnectionType,
    controller_id: u32,
    connected: bool,
    output: OutputState,
    last: Report,
    read_timeout: i32,
    touch: bool,
    motion: bool,
}

impl<D: HidIo> DS4<D> {
    #[instrument(level = "info", skip(device), err)]
    pub fn new(device: D, connection: ConnectionType) -> Result<DS4<D>> {
        let mut ds4 = DS4 {
            device,
            connection,
            controller_id: 0,
            connected: true,
            output: OutputState::default(),
            last: Report::empty(DS4_REPORT_RATE),
            read_timeout: 0,
            touch: false,
            motion: false,
        };
        ds4.enable_full_reports()?;
        let mut report = InputReport::new();
        let nb_read = ds4
            .device
            .read_timeout(report.as_bytes_mut(), PROBE_TIMEOUT)
            .context("reading the first input report")?;
        if nb_read > 0 {
            ds4.handle_report(&report, nb_read);
        }
        info!(model = "DualShock 4", connection = ?ds4.connection, "initializing device");
        Ok(ds4)
    }

    fn enable_full_reports(&mut self) -> Result<()> {
        let mut buf = [0u8; FEATURE_REPORT_CALIBRATION_SIZE];
        buf[0] = FEATURE_REPORT_CALIBRATION;
        match self.device.get_feature_report(&mut buf) {
            Ok(_) => Ok(()),
            Err(e) if self.connection == ConnectionType::Bluetooth => {
                Err(e).context("requesting the calibration report")
            }
            Err(e) => {
                warn!(error = %e, "could not read the calibration report");
                Ok(())
            }
        }
    }

    pub fn output(&self) -> &OutputState {
        &self.output
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

    #[instrument(level = "trace", skip(self), err)]
    pub fn recv(&mut self) -> Result<Report> {
        if !self.connected {
            bail!("DualShock 4 {} is disconnected", self.controller_id);
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

    /// Always sent, the flash timing restarts on every write.
    pub fn set_lightbar_flash(&mut self, color: Color, on: f32, off: f32) -> Result<()> {
        self.output.lightbar = color;
        self.output.flash_on = to_255(on);
        self.output.flash_off = to_255(off);
        self.send_out()
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
        GamepadKey::Create => b.share().into(),
        GamepadKey::PlayStation => b.ps().into(),
        GamepadKey::TouchPad => b.touchpad().into(),
        GamepadKey::Mic
        | GamepadKey::FnLeft
        | GamepadKey::FnRight
        | GamepadKey::PaddleLeft
        | GamepadKey::PaddleRight => KeyStatus::Released,
    }
}

fn full_report(state: &InputState) -> Report {
    let base = &state.base;
    Report {
        keys: keys(&base.buttons),
        left_stick: base.left_stick.normalize(),
        right_stick: base.right_stick.normalize(),
        left_trigger: base.left_trigger.normalize(),
        right_trigger: base.right_trigger.normalize(),
        motion: Some(Motion {
            rotation_speed: state.gyro.normalize().into(),
            acceleration: state.accel.normalize().into(),
        }),
        touch: Some(state.touch_points()),
        battery: state.status.battery(),
        headset_connected: state.status.headphones(),
        frequency: DS4_REPORT_RATE,
    }
}

fn simple_report(simple: &SimpleReport, last: &Report) -> Report {
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
        frequency: DS4_REPORT_RATE,
    }
}

impl<D: HidIo + 'static> GamepadDevice for DS4<D> {
    fn recv(&mut self) -> Result<Report> {
        DS4::recv(self)
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn connection(&self) -> ConnectionType {
        self.connection
    }

    fn device_type(&self) -> DeviceType {
        DeviceType::DualShock4
    }

    fn controller_id(&self) -> u32 {
        self.controller_id
    }

    fn set_controller_id(&mut self, id: u32) {
        self.controller_id = id;
    }

    fn initialize(&mut self) -> Result<()> {
        self.set_lightbar_flash(Color::GREEN, 0., 0.)
    }

    fn set_lightbar(&mut self, color: Color) -> Result<()> {
        self.set_lightbar_flash(color, 0., 0.)
    }

    fn set_lightbar_flash(&mut self, color: Color, on: f32, off: f32) -> Result<()> {
        DS4::set_lightbar_flash(self, color, on, off)
    }

    fn set_player_led(&mut self, _led: LedPlayer, _brightness: LedBrightness) -> Result<()> {
        Ok(())
    }

    fn set_mic_led(&mut self, _led: LedMic) -> Result<()> {
        Ok(())
    }

    fn set_vibration(&mut self, values: &ForceFeedbackValues) -> Result<()> {
        DS4::set_vibration(self, values)
    }

    fn stop_all(&mut self) -> Result<()> {
        self.send_out()
    }

    fn send_out(&mut self) -> Result<()> {
        DS4::send_out(self)
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

    fn shutdown(&mut self) {
        debug!(controller_id = self.controller_id, "shutting down");
        self.connected = false;
        self.output = OutputState::default();
        self.last = Report::empty(DS4_REPORT_RATE);
    }

    fn as_any(&mut self) -> &mut dyn std::any::Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sony_gamepad_sys::{crc, testing::FakeHid};

    fn usb_input(fill: impl FnOnce(&mut [u8])) -> Vec<u8> {
        let mut report = vec![0u8; 64];
        report[0] = 0x01;
        report[1..5].copy_from_slice(&[128, 127, 128, 127]);
        report[5] = 0x08;
        fill(&mut report[1..]);
        report
    }

    fn bt_input(fill: impl FnOnce(&mut [u8])) -> Vec<u8> {
        let mut report = vec![0u8; 78];
        report[0] = 0x11;
        report[3..7].copy_from_slice(&[128, 127, 128, 127]);
        report[7] = 0x08;
        fill(&mut report[3..]);
        let crc = crc::checksum(crc::INPUT_SEED, &report[..74]);
        report[74..].copy_from_slice(&crc.to_le_bytes());
        report
    }

    fn usb_ds4() -> (DS4<FakeHid>, FakeHid) {
        let hid = FakeHid::new();
        hid.push_input(&usb_input(|_| ()));
        let ds4 = DS4::new(hid.clone(), ConnectionType::Usb).unwrap();
        (ds4, hid)
    }

    #[test]
    fn init_requests_calibration() {
        let (ds4, hid) = usb_ds4();
        assert_eq!(hid.feature_reads(), vec![FEATURE_REPORT_CALIBRATION]);
        assert_eq!(ds4.connection, ConnectionType::Usb);
        assert!(hid.writes().is_empty());
    }

    #[test]
    fn initialize_turns_lightbar_green() {
        let (mut ds4, hid) = usb_ds4();
        GamepadDevice::initialize(&mut ds4).unwrap();
        let out = hid.last_write().unwrap();
        assert_eq!(out.len(), 32);
        assert_eq!(out[0], 0x05);
        assert_eq!(out[6..9], [0, 255, 0]);
    }

    #[test]
    fn usb_input_report() {
        let (mut ds4, hid) = usb_ds4();
        hid.push_input(&usb_input(|d| {
            // Hat up, cross.
            d[4] = 0x20;
            d[5] = 0x20;
            d[29] = 0x10 | 0x05;
        }));
        let report = ds4.recv().unwrap();
        assert_eq!(report.keys[GamepadKey::Cross], KeyStatus::Pressed);
        assert_eq!(report.keys[GamepadKey::DPadUp], KeyStatus::Pressed);
        assert_eq!(report.keys[GamepadKey::Options], KeyStatus::Pressed);
        assert_eq!(report.keys[GamepadKey::Mic], KeyStatus::Released);
        assert_eq!(report.battery.level, 55.);
        assert!(report.battery.charging);
        assert!(report.motion.is_some());
    }

    #[test]
    fn bluetooth_input_report() {
        let hid = FakeHid::new();
        hid.push_input(&bt_input(|d| d[4] = 0x08 | 0x10));
        let mut ds4 = DS4::new(hid.clone(), ConnectionType::Usb).unwrap();
        assert_eq!(ds4.connection, ConnectionType::Bluetooth);
        assert_eq!(ds4.last.keys[GamepadKey::Square], KeyStatus::Pressed);

        let mut corrupted = bt_input(|d| d[4] = 0x08 | 0x80);
        corrupted[75] ^= 0xFF;
        hid.push_input(&corrupted);
        let report = ds4.recv().unwrap();
        assert_eq!(report.keys[GamepadKey::Triangle], KeyStatus::Released);
        assert_eq!(report.keys[GamepadKey::Square], KeyStatus::Pressed);
    }

    #[test]
    fn bluetooth_output_report() {
        let hid = FakeHid::new();
        hid.push_input(&bt_input(|_| ()));
        let mut ds4 = DS4::new(hid.clone(), ConnectionType::Bluetooth).unwrap();
        ds4.set_lightbar_flash(Color::RED, 1., 0.5).unwrap();
        let out = hid.last_write().unwrap();
        assert_eq!(out.len(), 78);
        assert_eq!(out[..3], [0x11, 0xC0, 0x00]);
        assert_eq!(out[3], 0x07);
        assert_eq!(out[8..13], [255, 0, 0, 255, 127]);
        assert!(crc::verify(crc::OUTPUT_SEED, &out));
    }

    #[test]
    fn vibration_only_sent_on_change() {
        let (mut ds4, hid) = usb_ds4();
        let values = ForceFeedbackValues {
            left_large: 1.,
            right_small: 0.5,
            ..Default::default()
        };
        ds4.set_vibration(&values).unwrap();
        ds4.set_vibration(&values).unwrap();
        assert_eq!(hid.writes().len(), 1);
        let out = hid.last_write().unwrap();
        assert_eq!(out[4..6], [127, 255]);
    }

    #[test]
    fn leds_are_ignored() {
        let (mut ds4, hid) = usb_ds4();
        ds4.set_player_led(LedPlayer::All, LedBrightness::High).unwrap();
        ds4.set_mic_led(LedMic::Pulse).unwrap();
        assert!(hid.writes().is_empty());
        assert!(ds4.triggers().is_none());
        ds4.stop_all().unwrap();
        assert_eq!(hid.writes().len(), 1);
    }

    #[test]
    fn unplugged_device_disconnects() {
        let (mut ds4, hid) = usb_ds4();
        hid.unplug();
        assert!(ds4.recv().is_err());
        assert!(!ds4.is_connected());
        assert!(ds4.set_lightbar(Color::BLUE).is_ok());
    }
}
