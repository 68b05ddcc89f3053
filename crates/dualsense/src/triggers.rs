use anyhow::Result;
use dualsense_sys::trigger::TriggerEffect;
use sony_gamepad_sys::{
    validate::{audio_intensity, to_255},
    ForceFeedbackValues, Hand, HapticFeedbackValues, HidIo, TriggerDevice, TriggerResistance,
};
use tracing::instrument;

use crate::DualSense;

impl<D: HidIo> DualSense<D> {
    fn apply_trigger(&mut self, hand: Hand, effect: TriggerEffect) -> Result<()> {
        if hand.left() {
            self.output.left_trigger = effect;
        }
        if hand.right() {
            self.output.right_trigger = effect;
        }
        self.send_out()
    }
}

impl<D: HidIo + 'static> TriggerDevice for DualSense<D> {
    #[instrument(level = "debug", skip(self), err)]
    fn set_trigger_property(&mut self, resistance: &TriggerResistance) -> Result<()> {
        self.apply_trigger(
            resistance.affected,
            TriggerEffect::section_resistance(resistance),
        )
    }

    #[instrument(level = "debug", skip(self), err)]
    fn set_haptic_feedback(&mut self, hand: Hand, values: &HapticFeedbackValues) -> Result<()> {
        let frequency = to_255(values.frequency);
        if hand.left() {
            self.output.left_trigger.set_frequency(frequency);
        }
        if hand.right() {
            self.output.right_trigger.set_frequency(frequency);
        }
        self.send_out()
    }

    fn set_resistance(&mut self, begin: u8, middle: u8, end: u8, hand: Hand) -> Result<()> {
        self.apply_trigger(hand, TriggerEffect::resistance(begin, middle, end))
    }

    fn set_automatic_gun(
        &mut self,
        begin: u8,
        middle: u8,
        end: u8,
        hand: Hand,
        keep_effect: bool,
    ) -> Result<()> {
        self.apply_trigger(
            hand,
            TriggerEffect::automatic_gun(begin, middle, end, keep_effect),
        )
    }

    fn set_continuous_resistance(&mut self, start: u8, strength: u8, hand: Hand) -> Result<()> {
        self.apply_trigger(hand, TriggerEffect::continuous_resistance(start, strength))
    }

    fn set_galloping(
        &mut self,
        start: u8,
        end: u8,
        first_foot: u8,
        second_foot: u8,
        frequency: f32,
        hand: Hand,
    ) -> Result<()> {
        self.apply_trigger(
            hand,
            TriggerEffect::galloping(start, end, first_foot, second_foot, frequency),
        )
    }

    #[allow(clippy::too_many_arguments)]
    fn set_machine(
        &mut self,
        start: u8,
        end: u8,
        amplitude_begin: u8,
        amplitude_end: u8,
        frequency: f32,
        period: f32,
        hand: Hand,
    ) -> Result<()> {
        self.apply_trigger(
            hand,
            TriggerEffect::machine(start, end, amplitude_begin, amplitude_end, frequency, period),
        )
    }

    fn set_weapon(&mut self, start: u8, end: u8, strength: u8, hand: Hand) -> Result<()> {
        self.apply_trigger(hand, TriggerEffect::weapon(start, end, strength))
    }

    fn set_bow(
        &mut self,
        start: u8,
        end: u8,
        begin_strength: u8,
        end_strength: u8,
        hand: Hand,
    ) -> Result<()> {
        self.apply_trigger(
            hand,
            TriggerEffect::bow(start, end, begin_strength, end_strength),
        )
    }

    fn stop_trigger(&mut self, hand: Hand) -> Result<()> {
        self.apply_trigger(hand, TriggerEffect::Off)
    }

    /// Always sent, the envelope changes on every audio frame.
    fn set_vibration_audio_based(
        &mut self,
        values: &ForceFeedbackValues,
        threshold: f32,
        exponent: f32,
        base_multiplier: f32,
    ) -> Result<()> {
        let curve = |v| to_255(audio_intensity(v, threshold, exponent, base_multiplier));
        self.output.rumble_left = curve(values.left());
        self.output.rumble_right = curve(values.right());
        self.send_out()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::usb_dualsense;
    use dualsense_sys::trigger::TriggerMode;

    const RIGHT: usize = 11;
    const LEFT: usize = 22;

    #[test]
    fn effect_lands_on_selected_trigger() {
        let (mut ds, hid) = usb_dualsense();
        ds.set_weapon(2, 6, 8, Hand::Right).unwrap();
        let out = hid.last_write().unwrap();
        assert_eq!(out[RIGHT], TriggerMode::Weapon as u8);
        assert_eq!(out[LEFT], TriggerMode::Off as u8);
        assert_eq!(ds.output().left_trigger, TriggerEffect::Off);
    }

    #[test]
    fn any_hand_sets_both() {
        let (mut ds, hid) = usb_dualsense();
        ds.set_continuous_resistance(0, 8, Hand::Any).unwrap();
        let out = hid.last_write().unwrap();
        assert_eq!(out[RIGHT], TriggerMode::ContinuousResistance as u8);
        assert_eq!(out[LEFT], TriggerMode::ContinuousResistance as u8);
        assert_eq!(out[LEFT + 2], 226);
    }

    #[test]
    fn stop_only_clears_one_side() {
        let (mut ds, hid) = usb_dualsense();
        ds.set_resistance(8, 8, 8, Hand::Any).unwrap();
        ds.stop_trigger(Hand::Left).unwrap();
        let out = hid.last_write().unwrap();
        assert_eq!(out[LEFT], TriggerMode::Off as u8);
        assert_eq!(out[RIGHT], TriggerMode::Feedback as u8);
    }

    #[test]
    fn trigger_property_ramps() {
        let (mut ds, _hid) = usb_dualsense();
        ds.set_trigger_property(&TriggerResistance {
            start_position: 2,
            end_position: 6,
            start_strength: 0,
            end_strength: 8,
            affected: Hand::Left,
        })
        .unwrap();
        assert_eq!(
            ds.output().left_trigger,
            TriggerEffect::Feedback {
                strengths: [0, 0, 0, 2, 4, 6, 8, 0, 0, 0],
            }
        );
    }

    #[test]
    fn haptic_frequency_updates_vibrating_effects() {
        let (mut ds, _hid) = usb_dualsense();
        ds.set_galloping(0, 8, 1, 5, 0.1, Hand::Right).unwrap();
        ds.set_weapon(2, 6, 8, Hand::Left).unwrap();
        ds.set_haptic_feedback(
            Hand::Any,
            &HapticFeedbackValues {
                frequency: 1.,
                amplitude: 1.,
            },
        )
        .unwrap();
        match ds.output().right_trigger {
            TriggerEffect::Galloping { frequency, .. } => assert_eq!(frequency, 255),
            other => panic!("unexpected effect {:?}", other),
        }
        assert_eq!(ds.output().left_trigger, TriggerEffect::weapon(2, 6, 8));
    }

    #[test]
    fn audio_based_vibration_is_always_sent() {
        let (mut ds, hid) = usb_dualsense();
        hid.clear_writes();
        let silent = ForceFeedbackValues::default();
        ds.set_vibration_audio_based(&silent, 0.015, 2., 1.5).unwrap();
        ds.set_vibration_audio_based(&silent, 0.015, 2., 1.5).unwrap();
        assert_eq!(hid.writes().len(), 2);

        let loud = ForceFeedbackValues {
            left_large: 1.,
            ..Default::default()
        };
        ds.set_vibration_audio_based(&loud, 0.015, 2., 1.5).unwrap();
        assert_eq!(ds.output().rumble_left, 255);
        assert_eq!(ds.output().rumble_right, 0);
    }
}
