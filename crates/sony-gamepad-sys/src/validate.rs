//! Range checks and conversions shared by every driver.

pub const MAX_POSITION: i32 = 8;
pub const MAX_FORCE: i32 = 8;

pub fn validate_max_position(position: i32) -> bool {
    (0..=MAX_POSITION).contains(&position)
}

pub fn validate_max_force(force: i32) -> bool {
    (0..=MAX_FORCE).contains(&force)
}

pub fn validate_max_frequency(frequency: f32) -> bool {
    (0. ..=1.).contains(&frequency)
}

/// Maps 0 ... 1 to 0 ... 255.
pub fn to_255(value: f32) -> u8 {
    if value.is_nan() || value <= 0. {
        0
    } else if value >= 1. {
        255
    } else {
        (value * 255.) as u8
    }
}

/// Maps 0 ... `max` to 0 ... 255.
pub fn to_255_scaled(value: u8, max: u8) -> u8 {
    if value == 0 {
        0
    } else if value >= max {
        255
    } else {
        (value as u32 * 255 / max as u32) as u8
    }
}

/// Response curve for audio-driven rumble: silent below `threshold`, then
/// `base_multiplier * normalized^exponent`.
pub fn audio_intensity(input: f32, threshold: f32, exponent: f32, base_multiplier: f32) -> f32 {
    if input < threshold || threshold >= 1. {
        return 0.;
    }
    let normalized = (input - threshold) / (1. - threshold);
    base_multiplier * normalized.powf(exponent)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ranges() {
        assert!(validate_max_position(0));
        assert!(validate_max_position(8));
        assert!(!validate_max_position(9));
        assert!(!validate_max_force(-1));
        assert!(validate_max_frequency(0.5));
        assert!(!validate_max_frequency(1.5));
    }

    #[test]
    fn scale_to_byte() {
        assert_eq!(to_255(-3.), 0);
        assert_eq!(to_255(0.05), 12);
        assert_eq!(to_255(0.5), 127);
        assert_eq!(to_255(1.), 255);
        assert_eq!(to_255(f32::NAN), 0);
        assert_eq!(to_255_scaled(0, 8), 0);
        assert_eq!(to_255_scaled(4, 8), 127);
        assert_eq!(to_255_scaled(9, 9), 255);
        assert_eq!(to_255_scaled(12, 8), 255);
    }

    #[test]
    fn audio_curve() {
        assert_eq!(audio_intensity(0.01, 0.015, 2., 1.5), 0.);
        assert_eq!(audio_intensity(0.015, 0.015, 2., 1.5), 0.);
        assert!((audio_intensity(1., 0.015, 2., 1.5) - 1.5).abs() < 1e-6);
        let mid = audio_intensity(0.5075, 0.015, 2., 1.5);
        assert!((mid - 0.375).abs() < 1e-4);
    }
}
