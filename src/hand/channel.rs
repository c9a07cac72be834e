//! Finger channel state
//!
//! Holds everything the hand knows about each digit: the debounced button state,
//! the last raw pressure, the value currently driving the animation and the values
//! saved around an override.

use crate::hand::digit::{Digit, DigitMap, FingerTarget};
use std::ops::{Index, IndexMut};
use tracing::debug;

/// Override lifecycle of a single digit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverrideState {
    /// Input drives the digit
    #[default]
    None,
    /// An interaction forces the digit towards `forced_axis`
    Overriding,
    /// Released by a touch or grab exit; returns to `None` once settled
    JustReleased,
    /// Released by a use exit; keeps forcing until a touch exit clears it
    HeldReleased,
}

/// Per-digit input and override state
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FingerChannel {
    pub is_pressed: bool,
    pub pressure_changed: bool,
    pub axis: f32,
    pub raw_axis: f32,
    pub untouched_axis: f32,
    pub saved_axis: f32,
    pub forced_axis: f32,
    pub override_state: OverrideState,
}

impl FingerChannel {
    pub fn is_overridden(&self) -> bool {
        self.override_state != OverrideState::None
    }

    /// User intent on this digit, which outranks any forced pose
    pub fn is_button_active(&self) -> bool {
        self.is_pressed || self.raw_axis > 0.0
    }
}

/// The five finger channels of one hand
#[derive(Debug, Clone, Default)]
pub struct FingerChannels {
    channels: DigitMap<FingerChannel>,
}

impl FingerChannels {
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies a digital button edge to every digit of `target`
    ///
    /// The pressed state is always recorded so precedence checks see the real
    /// user state; the dirty flag is only raised while the digit is free.
    pub fn on_button_event(&mut self, target: FingerTarget, pressure: f32) {
        let pressed = pressure != 0.0;
        for digit in target.digits() {
            let channel = &mut self.channels[*digit];
            channel.is_pressed = pressed;
            if channel.is_overridden() {
                debug!(
                    "{} button {} while overridden, animation untouched",
                    digit,
                    if pressed { "pressed" } else { "released" }
                );
                continue;
            }
            channel.pressure_changed = true;
        }
    }

    /// Applies a continuous pressure reading to every digit of `target`
    pub fn on_axis_event(&mut self, target: FingerTarget, pressure: f32) {
        let pressure = pressure.clamp(0.0, 1.0);
        for digit in target.digits() {
            let channel = &mut self.channels[*digit];
            channel.raw_axis = pressure;
            if !channel.is_overridden() {
                channel.axis = pressure;
            }
        }
    }

    pub fn is_button_active(&self, digit: Digit) -> bool {
        self.channels[digit].is_button_active()
    }

    /// Current animation value of every digit
    pub fn axes(&self) -> DigitMap<f32> {
        self.channels.map(|_, channel| channel.axis)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Digit, &FingerChannel)> {
        self.channels.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (Digit, &mut FingerChannel)> {
        self.channels.iter_mut()
    }
}

impl Index<Digit> for FingerChannels {
    type Output = FingerChannel;

    fn index(&self, digit: Digit) -> &FingerChannel {
        &self.channels[digit]
    }
}

impl IndexMut<Digit> for FingerChannels {
    fn index_mut(&mut self, digit: Digit) -> &mut FingerChannel {
        &mut self.channels[digit]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn button_press_marks_digit_dirty() {
        let mut channels = FingerChannels::new();
        channels.on_button_event(FingerTarget::Digit(Digit::Index), 1.0);

        assert!(channels[Digit::Index].is_pressed);
        assert!(channels[Digit::Index].pressure_changed);
        assert!(!channels[Digit::Thumb].pressure_changed);
    }

    #[test]
    fn three_finger_button_updates_three_digits() {
        let mut channels = FingerChannels::new();
        channels.on_button_event(FingerTarget::ThreeFinger, 1.0);

        for digit in [Digit::Middle, Digit::Ring, Digit::Pinky] {
            assert!(channels[digit].is_pressed);
        }
        assert!(!channels[Digit::Index].is_pressed);
    }

    #[test]
    fn overridden_digit_ignores_button_edge_for_animation() {
        let mut channels = FingerChannels::new();
        channels[Digit::Thumb].override_state = OverrideState::Overriding;
        channels.on_button_event(FingerTarget::Digit(Digit::Thumb), 1.0);

        assert!(channels[Digit::Thumb].is_pressed);
        assert!(!channels[Digit::Thumb].pressure_changed);
    }

    #[test]
    fn axis_event_passes_through_when_free() {
        let mut channels = FingerChannels::new();
        for pressure in [0.0, 0.25, 0.5, 1.0] {
            channels.on_axis_event(FingerTarget::Digit(Digit::Index), pressure);
            assert_eq!(channels[Digit::Index].axis, pressure);
            assert_eq!(channels[Digit::Index].raw_axis, pressure);
        }
    }

    #[test]
    fn axis_event_only_updates_raw_while_overridden() {
        let mut channels = FingerChannels::new();
        channels[Digit::Ring].override_state = OverrideState::Overriding;
        channels[Digit::Ring].axis = 0.5;
        channels.on_axis_event(FingerTarget::Digit(Digit::Ring), 0.75);

        assert_eq!(channels[Digit::Ring].axis, 0.5);
        assert_eq!(channels[Digit::Ring].raw_axis, 0.75);
    }

    #[test]
    fn axis_input_is_clamped() {
        let mut channels = FingerChannels::new();
        channels.on_axis_event(FingerTarget::Digit(Digit::Pinky), 1.5);
        assert_eq!(channels[Digit::Pinky].axis, 1.0);
        channels.on_axis_event(FingerTarget::Digit(Digit::Pinky), -0.2);
        assert_eq!(channels[Digit::Pinky].axis, 0.0);
    }

    #[test]
    fn button_active_from_press_or_raw_pressure() {
        let mut channels = FingerChannels::new();
        assert!(!channels.is_button_active(Digit::Middle));

        channels.on_axis_event(FingerTarget::Digit(Digit::Middle), 0.1);
        assert!(channels.is_button_active(Digit::Middle));

        channels.on_axis_event(FingerTarget::Digit(Digit::Middle), 0.0);
        channels.on_button_event(FingerTarget::Digit(Digit::Middle), 1.0);
        assert!(channels.is_button_active(Digit::Middle));
    }
}
