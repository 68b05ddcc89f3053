mod opts;

use std::{collections::HashMap, thread::sleep, time::Duration};

use anyhow::Result;
use cgmath::Vector3;
use clap::Parser;
use colored::Colorize;
use opts::{Effect, Opts, SubCommand};
use sony_gamepad::{
    proxy,
    sys::{AnalogAxis, DeviceSettings, ForceFeedbackValues, GamepadKey, Hand, TouchPoint},
    Backend, ConnectionState, DeviceManager, HidapiBackend, ManagerSettings, MessageHandler,
};
use tracing::{debug, info};
use tracing_subscriber::{fmt::format::FmtSpan, EnvFilter};

/// Smallest analog change worth printing.
const ANALOG_STEP: f64 = 0.05;

fn init_logging() {
    let flag = |name: &str| std::env::var(name).map_or(false, |v| v == "1");
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let span_events = if flag("LOG_TIMING") {
        FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_span_events(span_events);
    if flag("LOG_PRETTY") {
        builder.pretty().init();
    } else {
        builder.init();
    }
}

fn main() -> Result<()> {
    init_logging();
    let opts = Opts::parse();
    let poll = Duration::from_millis(opts.poll_ms);
    let settings = ManagerSettings {
        poll_interval: poll,
        ..Default::default()
    };
    let mut manager = DeviceManager::new(HidapiBackend::new()?, settings);
    let mut printer = Printer::default();

    if let SubCommand::List = opts.subcmd {
        return list(&mut manager);
    }

    let id = opts.controller;
    loop {
        manager.create_library_instances(&mut printer)?;
        match manager.container_mut().library_instance(id) {
            Ok(device) => {
                info!(
                    controller_id = id,
                    device = ?device.device_type(),
                    connection = ?device.connection(),
                    "using controller"
                );
                break;
            }
            Err(e) if opts.wait => debug!(error = %e, "waiting for the controller"),
            Err(e) => return Err(e.into()),
        }
        sleep(Duration::from_secs(1));
    }

    match opts.subcmd {
        SubCommand::List => unreachable!(),
        SubCommand::Monitor(monitor) => {
            if let Some(device) = manager.container_mut().get_library_instance(id) {
                device.set_touch(monitor.touch);
                device.set_motion(monitor.motion);
            }
            printer.verbose = true;
            while printer.connected(id) {
                manager.tick(poll, &mut printer);
                sleep(poll);
            }
        }
        SubCommand::Battery => {
            manager.tick(poll, &mut printer);
            let level = proxy::level_battery_device(manager.container_mut(), id);
            println!("{}%", level);
        }
        SubCommand::Lightbar(l) => {
            proxy::led_color_effects(manager.container_mut(), id, l.color, l.on, l.off)?
        }
        SubCommand::PlayerLed(p) => proxy::led_player_effects(
            manager.container_mut(),
            id,
            p.led.into(),
            p.brightness.into(),
        )?,
        SubCommand::MicLed(m) => {
            proxy::led_mic_effects(manager.container_mut(), id, m.led.into())?
        }
        SubCommand::Rumble(r) => {
            let values = ForceFeedbackValues {
                left_large: r.left,
                right_large: r.right,
                ..Default::default()
            };
            manager.set_channel_values(id, &values)?;
            sleep(Duration::from_millis(r.duration_ms));
            manager.set_channel_values(id, &ForceFeedbackValues::default())?;
        }
        SubCommand::Trigger(t) => trigger(&mut manager, id, t.hand.into(), t.effect)?,
        SubCommand::Settings(s) => {
            let mut settings = DeviceSettings::default();
            for change in s.changes() {
                settings.apply(change);
            }
            proxy::device_settings(manager.container_mut(), id, &settings)?;
        }
        SubCommand::Reset => proxy::reset_effects(manager.container_mut(), id)?,
    }
    debug!(controller_id = id, "done");
    Ok(())
}

fn list<B: Backend>(manager: &mut DeviceManager<B>) -> Result<()> {
    let devices = manager.container_mut().backend_mut().find_devices()?;
    if devices.is_empty() {
        eprintln!("No device found");
    }
    for (id, device) in devices.iter().enumerate() {
        println!(
            "{} {:?} over {:?}: {}",
            id.to_string().bold(),
            device.device_type,
            device.connection,
            device.path.to_string_lossy()
        );
    }
    Ok(())
}

fn trigger<B: Backend>(
    manager: &mut DeviceManager<B>,
    id: u32,
    hand: Hand,
    effect: Effect,
) -> Result<()> {
    let c = manager.container_mut();
    match effect {
        Effect::Off => proxy::stop_trigger_effect(c, id, hand)?,
        Effect::Feedback { begin, middle, end } => {
            proxy::set_feedback(c, id, begin, middle, end, hand)?
        }
        Effect::Resistance {
            start,
            end,
            strength,
        } => proxy::resistance(c, id, start, end, strength, hand)?,
        Effect::AutomaticGun {
            begin,
            middle,
            end,
            keep,
        } => proxy::automatic_gun(c, id, begin, middle, end, hand, keep)?,
        Effect::Continuous { start, strength } => {
            proxy::continuous_resistance(c, id, start, strength, hand)?
        }
        Effect::Galloping {
            start,
            end,
            first_foot,
            second_foot,
            frequency,
        } => proxy::galloping(c, id, start, end, first_foot, second_foot, frequency, hand)?,
        Effect::Machine {
            start,
            end,
            amplitude_begin,
            amplitude_end,
            frequency,
            period,
        } => proxy::machine(
            c,
            id,
            start,
            end,
            amplitude_begin,
            amplitude_end,
            frequency,
            period,
            hand,
        )?,
        Effect::Weapon {
            start,
            end,
            strength,
        } => proxy::weapon(c, id, start, end, strength, hand)?,
        Effect::Bow {
            start,
            end,
            begin_strength,
            end_strength,
        } => proxy::bow(c, id, start, end, begin_strength, end_strength, hand)?,
    }
    Ok(())
}

/// Prints events as they come. Silent until `verbose` is set, except for
/// connection changes.
#[derive(Default)]
struct Printer {
    verbose: bool,
    states: HashMap<u32, ConnectionState>,
    analogs: HashMap<(u32, &'static str), f64>,
}

impl Printer {
    fn connected(&self, id: u32) -> bool {
        self.states.get(&id) == Some(&ConnectionState::Connected)
    }
}

fn key_label(key: GamepadKey) -> String {
    match key.alias() {
        Some(alias) => format!("{} ({})", key, alias),
        None => key.to_string(),
    }
}

fn axis_name(axis: AnalogAxis) -> &'static str {
    match axis {
        AnalogAxis::LeftX => "LeftX",
        AnalogAxis::LeftY => "LeftY",
        AnalogAxis::RightX => "RightX",
        AnalogAxis::RightY => "RightY",
        AnalogAxis::LeftTrigger => "LeftTrigger",
        AnalogAxis::RightTrigger => "RightTrigger",
    }
}

impl MessageHandler for Printer {
    fn on_button_pressed(&mut self, controller_id: u32, key: GamepadKey) {
        if self.verbose {
            println!("{} {} {}", controller_id, key_label(key), "pressed".green());
        }
    }

    fn on_button_released(&mut self, controller_id: u32, key: GamepadKey) {
        if self.verbose {
            println!("{} {} {}", controller_id, key_label(key), "released".red());
        }
    }

    fn on_analog(&mut self, controller_id: u32, axis: AnalogAxis, value: f64) {
        let name = axis_name(axis);
        let last = self.analogs.entry((controller_id, name)).or_insert(0.);
        if (value - *last).abs() >= ANALOG_STEP {
            *last = value;
            if self.verbose {
                println!("{} {} {:.2}", controller_id, name.blue(), value);
            }
        }
    }

    fn on_touch_started(&mut self, controller_id: u32, point: &TouchPoint) {
        if self.verbose {
            println!(
                "{} touch {} at {}x{}",
                controller_id,
                point.id.to_string().yellow(),
                point.x,
                point.y
            );
        }
    }

    fn on_touch_ended(&mut self, controller_id: u32, point: &TouchPoint) {
        if self.verbose {
            println!("{} touch {} ended", controller_id, point.id.to_string().yellow());
        }
    }

    fn on_motion(
        &mut self,
        controller_id: u32,
        _tilt: Vector3<f64>,
        gyro: Vector3<f64>,
        gravity: Vector3<f64>,
        _accel: Vector3<f64>,
    ) {
        if self.verbose {
            println!(
                "{} gyro {:>7.1} {:>7.1} {:>7.1} gravity {:>5.2} {:>5.2} {:>5.2}",
                controller_id, gyro.x, gyro.y, gyro.z, gravity.x, gravity.y, gravity.z
            );
        }
    }

    fn on_connection_change(&mut self, controller_id: u32, state: ConnectionState) {
        self.states.insert(controller_id, state);
        let state = match state {
            ConnectionState::Connected => "connected".green(),
            ConnectionState::Disconnected => "disconnected".red(),
        };
        eprintln!("controller {} {}", controller_id, state);
    }
}
