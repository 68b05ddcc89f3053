//! Calls a host makes on a controller id.
//!
//! Positions and strengths come in as plain integers, values outside
//! 0 ... 8 are replaced by the default of the call. An unknown or
//! disconnected controller turns every call into a no-op.
//!
//! Connection calls go through the [`DeviceManager`] so the handler hears
//! about them.

use sony_gamepad_sys::{
    validate::validate_max_position, Color, DeviceSettings, ForceFeedbackValues, GamepadDevice,
    Hand, LedBrightness, LedMic, LedPlayer, TriggerDevice,
};

use crate::{Backend, DeviceContainer, DeviceManager, MessageHandler, Result};

/// `value` if it is a valid position or strength, else `default`.
fn checked(value: i32, default: u8) -> u8 {
    if validate_max_position(value) {
        value as u8
    } else {
        default
    }
}

fn with_device<B: Backend>(
    container: &mut DeviceContainer<B>,
    controller_id: u32,
    f: impl FnOnce(&mut (dyn GamepadDevice + 'static)) -> anyhow::Result<()>,
) -> Result<()> {
    if let Some(device) = container.get_library_instance(controller_id) {
        f(device)?;
    }
    Ok(())
}

fn with_triggers<B: Backend>(
    container: &mut DeviceContainer<B>,
    controller_id: u32,
    f: impl FnOnce(&mut dyn TriggerDevice) -> anyhow::Result<()>,
) -> Result<()> {
    if let Some(triggers) = container
        .get_library_instance(controller_id)
        .and_then(|device| device.triggers())
    {
        f(triggers)?;
    }
    Ok(())
}

pub fn device_settings<B: Backend>(
    container: &mut DeviceContainer<B>,
    controller_id: u32,
    settings: &DeviceSettings,
) -> Result<()> {
    with_device(container, controller_id, |d| d.settings(settings))
}

/// Reopens the controller when it went away.
pub fn device_is_connected<B: Backend>(
    manager: &mut DeviceManager<B>,
    controller_id: u32,
    handler: &mut dyn MessageHandler,
) -> Result<bool> {
    manager.reconnect(controller_id, handler)
}

pub fn device_reconnect<B: Backend>(
    manager: &mut DeviceManager<B>,
    controller_id: u32,
    handler: &mut dyn MessageHandler,
) -> Result<bool> {
    device_is_connected(manager, controller_id, handler)
}

/// Always true, the instance is gone afterward whether it existed or not.
pub fn device_disconnect<B: Backend>(
    manager: &mut DeviceManager<B>,
    controller_id: u32,
    handler: &mut dyn MessageHandler,
) -> bool {
    manager.disconnect(controller_id, handler);
    true
}

/// Percent, 0 for a missing controller.
pub fn level_battery_device<B: Backend>(
    container: &mut DeviceContainer<B>,
    controller_id: u32,
) -> f32 {
    container
        .get_library_instance(controller_id)
        .map_or(0., |device| device.battery())
}

/// Envelope of the audio played on the controller, averaged over
/// `num_wave_instances` sounds.
#[allow(clippy::too_many_arguments)]
pub fn set_vibration_from_audio<B: Backend>(
    container: &mut DeviceContainer<B>,
    controller_id: u32,
    average_envelope: f32,
    max_envelope: f32,
    num_wave_instances: u32,
    envelope_multiplier: f32,
    peak_multiplier: f32,
    threshold: f32,
    exponent: f32,
    base_multiplier: f32,
) -> Result<()> {
    let n = num_wave_instances as f32;
    let values = ForceFeedbackValues {
        left_large: (average_envelope * envelope_multiplier * n).max(0.).min(1.),
        right_large: (max_envelope * peak_multiplier * n).max(0.).min(1.),
        ..Default::default()
    };
    with_triggers(container, controller_id, |t| {
        t.set_vibration_audio_based(&values, threshold, exponent, base_multiplier)
    })
}

pub fn set_feedback<B: Backend>(
    container: &mut DeviceContainer<B>,
    controller_id: u32,
    begin_strength: i32,
    middle_strength: i32,
    end_strength: i32,
    hand: Hand,
) -> Result<()> {
    let strength = |s: i32| s.max(0).min(8) as u8;
    with_triggers(container, controller_id, |t| {
        t.set_resistance(
            strength(begin_strength),
            strength(middle_strength),
            strength(end_strength),
            hand,
        )
    })
}

pub fn resistance<B: Backend>(
    container: &mut DeviceContainer<B>,
    controller_id: u32,
    start_position: i32,
    end_position: i32,
    strength: i32,
    hand: Hand,
) -> Result<()> {
    let (start, end, strength) = (
        checked(start_position, 0),
        checked(end_position, 8),
        checked(strength, 8),
    );
    with_triggers(container, controller_id, |t| {
        t.set_section_resistance(start, end, strength, hand)
    })
}

pub fn automatic_gun<B: Backend>(
    container: &mut DeviceContainer<B>,
    controller_id: u32,
    begin_strength: i32,
    middle_strength: i32,
    end_strength: i32,
    hand: Hand,
    keep_effect: bool,
) -> Result<()> {
    let (begin, middle, end) = (
        checked(begin_strength, 8),
        checked(middle_strength, 8),
        checked(end_strength, 8),
    );
    with_triggers(container, controller_id, |t| {
        t.set_automatic_gun(begin, middle, end, hand, keep_effect)
    })
}

pub fn continuous_resistance<B: Backend>(
    container: &mut DeviceContainer<B>,
    controller_id: u32,
    start_position: i32,
    strength: i32,
    hand: Hand,
) -> Result<()> {
    let (start, strength) = (checked(start_position, 0), checked(strength, 8));
    with_triggers(container, controller_id, |t| {
        t.set_continuous_resistance(start, strength, hand)
    })
}

#[allow(clippy::too_many_arguments)]
pub fn galloping<B: Backend>(
    container: &mut DeviceContainer<B>,
    controller_id: u32,
    start_position: i32,
    end_position: i32,
    first_foot: i32,
    second_foot: i32,
    frequency: f32,
    hand: Hand,
) -> Result<()> {
    let (start, end, first, second) = (
        checked(start_position, 0),
        checked(end_position, 8),
        checked(first_foot, 0),
        checked(second_foot, 8),
    );
    with_triggers(container, controller_id, |t| {
        t.set_galloping(start, end, first, second, frequency, hand)
    })
}

#[allow(clippy::too_many_arguments)]
pub fn machine<B: Backend>(
    container: &mut DeviceContainer<B>,
    controller_id: u32,
    start_position: i32,
    end_position: i32,
    amplitude_begin: i32,
    amplitude_end: i32,
    frequency: f32,
    period: f32,
    hand: Hand,
) -> Result<()> {
    let (start, end, begin, last) = (
        checked(start_position, 0),
        checked(end_position, 8),
        checked(amplitude_begin, 1),
        checked(amplitude_end, 7),
    );
    with_triggers(container, controller_id, |t| {
        t.set_machine(start, end, begin, last, frequency, period, hand)
    })
}

pub fn weapon<B: Backend>(
    container: &mut DeviceContainer<B>,
    controller_id: u32,
    start_position: i32,
    end_position: i32,
    strength: i32,
    hand: Hand,
) -> Result<()> {
    let (start, end, strength) = (
        checked(start_position, 0),
        checked(end_position, 8),
        checked(strength, 8),
    );
    with_triggers(container, controller_id, |t| {
        t.set_weapon(start, end, strength, hand)
    })
}

pub fn bow<B: Backend>(
    container: &mut DeviceContainer<B>,
    controller_id: u32,
    start_position: i32,
    end_position: i32,
    begin_strength: i32,
    end_strength: i32,
    hand: Hand,
) -> Result<()> {
    let (start, end, begin, last) = (
        checked(start_position, 0),
        checked(end_position, 8),
        checked(begin_strength, 0),
        checked(end_strength, 8),
    );
    with_triggers(container, controller_id, |t| {
        t.set_bow(start, end, begin, last, hand)
    })
}

/// `brightness_time` and `toggle_time` are the on and off durations of a
/// blink, in seconds. Ignored by the DualSense.
pub fn led_color_effects<B: Backend>(
    container: &mut DeviceContainer<B>,
    controller_id: u32,
    color: Color,
    brightness_time: f32,
    toggle_time: f32,
) -> Result<()> {
    with_device(container, controller_id, |d| {
        d.set_lightbar_flash(color, brightness_time, toggle_time)
    })
}

pub fn led_player_effects<B: Backend>(
    container: &mut DeviceContainer<B>,
    controller_id: u32,
    led: LedPlayer,
    brightness: LedBrightness,
) -> Result<()> {
    with_device(container, controller_id, |d| d.set_player_led(led, brightness))
}

pub fn led_mic_effects<B: Backend>(
    container: &mut DeviceContainer<B>,
    controller_id: u32,
    led: LedMic,
) -> Result<()> {
    with_device(container, controller_id, |d| d.set_mic_led(led))
}

pub fn enable_touch<B: Backend>(container: &mut DeviceContainer<B>, controller_id: u32, enable: bool) {
    if let Some(device) = container.get_library_instance(controller_id) {
        device.set_touch(enable);
    }
}

/// Acceleration and rotation are reported together, enabling either
/// enables both.
pub fn enable_accelerometer_values<B: Backend>(
    container: &mut DeviceContainer<B>,
    controller_id: u32,
    enable: bool,
) {
    if let Some(device) = container.get_library_instance(controller_id) {
        device.set_motion(enable);
    }
}

pub fn enable_gyroscope_values<B: Backend>(
    container: &mut DeviceContainer<B>,
    controller_id: u32,
    enable: bool,
) {
    enable_accelerometer_values(container, controller_id, enable)
}

pub fn no_resistance<B: Backend>(
    container: &mut DeviceContainer<B>,
    controller_id: u32,
    hand: Hand,
) -> Result<()> {
    stop_trigger_effect(container, controller_id, hand)
}

pub fn stop_trigger_effect<B: Backend>(
    container: &mut DeviceContainer<B>,
    controller_id: u32,
    hand: Hand,
) -> Result<()> {
    with_triggers(container, controller_id, |t| t.stop_trigger(hand))
}

pub fn stop_all_triggers_effects<B: Backend>(
    container: &mut DeviceContainer<B>,
    controller_id: u32,
) -> Result<()> {
    stop_trigger_effect(container, controller_id, Hand::Any)
}

/// Back to the lights of the controller id and the default feature mode.
pub fn reset_effects<B: Backend>(container: &mut DeviceContainer<B>, controller_id: u32) -> Result<()> {
    with_device(container, controller_id, |d| d.stop_all())
}
